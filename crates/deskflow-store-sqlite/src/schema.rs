//! SQL schema for the Deskflow SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS request_types (
    type_id              TEXT PRIMARY KEY,
    name                 TEXT NOT NULL UNIQUE,
    code                 TEXT NOT NULL UNIQUE,
    active               INTEGER NOT NULL DEFAULT 1,
    complex_priority     INTEGER NOT NULL DEFAULT 0,
    default_priority     INTEGER NOT NULL DEFAULT 3,   -- level code 0..5
    default_impact       INTEGER NOT NULL DEFAULT 2,   -- code 0..3
    default_urgency      INTEGER NOT NULL DEFAULT 2,   -- code 0..3
    default_request_text TEXT,
    sequence_prefix      TEXT,
    notify_created       INTEGER NOT NULL DEFAULT 1,
    notify_assigned      INTEGER NOT NULL DEFAULT 1,
    notify_closed        INTEGER NOT NULL DEFAULT 1,
    notify_reopened      INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS stages (
    stage_id  TEXT PRIMARY KEY,
    type_id   TEXT NOT NULL REFERENCES request_types(type_id),
    name      TEXT NOT NULL,
    code      TEXT NOT NULL,
    sequence  INTEGER NOT NULL,
    closed    INTEGER NOT NULL DEFAULT 0,
    UNIQUE (type_id, code)
);

CREATE TABLE IF NOT EXISTS routes (
    route_id              TEXT PRIMARY KEY,
    type_id               TEXT NOT NULL REFERENCES request_types(type_id),
    name                  TEXT,
    stage_from            TEXT NOT NULL REFERENCES stages(stage_id),
    stage_to              TEXT NOT NULL REFERENCES stages(stage_id),
    close                 INTEGER NOT NULL DEFAULT 0,
    default_response_text TEXT,
    website_published     INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS parties (
    party_id TEXT PRIMARY KEY,
    name     TEXT NOT NULL,
    email    TEXT
);

CREATE TABLE IF NOT EXISTS requests (
    request_id     TEXT PRIMARY KEY,
    name           TEXT NOT NULL UNIQUE,
    type_id        TEXT NOT NULL REFERENCES request_types(type_id),
    stage_id       TEXT NOT NULL REFERENCES stages(stage_id),
    category_id    TEXT,
    priority_kind  TEXT NOT NULL,    -- 'direct' | 'derived'
    priority_level INTEGER,          -- level code when direct
    impact         INTEGER,          -- codes when derived
    urgency        INTEGER,
    kanban_state   TEXT NOT NULL DEFAULT 'normal',
    user_id        TEXT,
    author_id      TEXT NOT NULL,
    partner_id     TEXT,
    request_text   TEXT NOT NULL,
    response_text  TEXT,
    deadline_date  TEXT,             -- ISO 8601 date
    date_created   TEXT NOT NULL,    -- ISO 8601 UTC
    date_assigned  TEXT,
    date_moved     TEXT,
    date_closed    TEXT,
    created_by     TEXT NOT NULL,
    moved_by       TEXT,
    closed_by      TEXT,
    last_route_id  TEXT,
    version        INTEGER NOT NULL DEFAULT 0
);

-- Event records are append-only: created by the lifecycle engine, never
-- updated, deleted only by the retention vacuum. The autoincrement `seq`
-- breaks ordering ties between events sharing one timestamp.
CREATE TABLE IF NOT EXISTS events (
    seq          INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id     TEXT NOT NULL UNIQUE,
    request_id   TEXT NOT NULL REFERENCES requests(request_id),
    event_code   TEXT NOT NULL,   -- discriminant of EventData variant
    payload_json TEXT NOT NULL,   -- JSON payload (inner data only)
    date         TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    user_id      TEXT NOT NULL
);

-- Per-prefix counters backing generated request names.
CREATE TABLE IF NOT EXISTS sequences (
    prefix TEXT PRIMARY KEY,
    value  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS timesheet_lines (
    line_id    TEXT PRIMARY KEY,
    request_id TEXT NOT NULL REFERENCES requests(request_id),
    user_id    TEXT NOT NULL,
    date_start TEXT NOT NULL,
    date_end   TEXT,
    amount     REAL NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS stages_type_idx     ON stages(type_id);
CREATE INDEX IF NOT EXISTS routes_type_idx     ON routes(type_id);
CREATE INDEX IF NOT EXISTS routes_from_idx     ON routes(stage_from);
CREATE INDEX IF NOT EXISTS requests_type_idx   ON requests(type_id);
CREATE INDEX IF NOT EXISTS requests_stage_idx  ON requests(stage_id);
CREATE INDEX IF NOT EXISTS events_request_idx  ON events(request_id);
CREATE INDEX IF NOT EXISTS events_date_idx     ON events(date);
CREATE INDEX IF NOT EXISTS timesheet_request_idx ON timesheet_lines(request_id);

-- At most one running line per user.
CREATE UNIQUE INDEX IF NOT EXISTS timesheet_running_user_idx
    ON timesheet_lines(user_id) WHERE date_end IS NULL;

PRAGMA user_version = 1;
";
