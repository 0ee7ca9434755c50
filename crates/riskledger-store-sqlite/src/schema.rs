//! SQL schema for the riskledger SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per tracked risk or issue.
CREATE TABLE IF NOT EXISTS masters (
    entity_id     TEXT PRIMARY KEY,   -- '{project}-{R|I}{NNN}', never reused
    kind          TEXT NOT NULL,      -- 'risk' | 'issue'
    project_code  TEXT NOT NULL,
    title         TEXT NOT NULL,
    description   TEXT,
    category      TEXT,
    sub_category  TEXT,
    created_at    TEXT NOT NULL,
    created_by    TEXT,
    is_active     INTEGER NOT NULL DEFAULT 1,
    current_state TEXT NOT NULL,      -- JSON-encoded CurrentState
    updated_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS masters_project_active_idx ON masters(project_code, is_active);
CREATE INDEX IF NOT EXISTS masters_kind_active_idx    ON masters(kind, is_active);

-- Snapshots are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
-- entity_id is not a foreign key; integrity is kept by the application.
CREATE TABLE IF NOT EXISTS snapshots (
    snapshot_id          TEXT PRIMARY KEY,
    entity_id            TEXT NOT NULL,
    kind                 TEXT NOT NULL,
    snapshot_date        TEXT NOT NULL,   -- fixed-width RFC 3339 UTC
    month                TEXT NOT NULL,   -- 'YYYY-MM'
    bi_week_period       TEXT NOT NULL,   -- 'YYYY-MM-W1' | 'YYYY-MM-W2'
    status               TEXT NOT NULL,
    -- risk values
    probability          REAL,
    impact_rating        REAL,
    emv                  REAL,
    risk_score           REAL,
    budget_contingency   REAL,
    mitigation_plan      TEXT,
    contingency_plan     TEXT,
    -- issue values
    priority             TEXT,
    impact               TEXT,
    response             TEXT,
    category             TEXT,
    sub_category         TEXT,
    resolution           TEXT,
    days_open            INTEGER,
    -- shared values
    impact_value         REAL,
    owner                TEXT,
    due_date             TEXT,
    -- history
    changed_fields       TEXT,            -- JSON array or NULL
    previous_snapshot_id TEXT,
    captured_by          TEXT NOT NULL,   -- 'migration' | 'auto' | 'manual'
    notes                TEXT
);

CREATE INDEX IF NOT EXISTS snapshots_entity_date_idx  ON snapshots(entity_id, snapshot_date);
CREATE INDEX IF NOT EXISTS snapshots_month_entity_idx ON snapshots(month, entity_id);
CREATE INDEX IF NOT EXISTS snapshots_period_idx       ON snapshots(bi_week_period);

-- At most one periodic snapshot per entity and bi-weekly period.
CREATE UNIQUE INDEX IF NOT EXISTS snapshots_periodic_uniq
    ON snapshots(entity_id, bi_week_period)
    WHERE captured_by IN ('migration', 'auto');

-- Last sequence number handed out per project and kind.
CREATE TABLE IF NOT EXISTS id_counters (
    project_code TEXT NOT NULL,
    kind         TEXT NOT NULL,
    last_seq     INTEGER NOT NULL,
    PRIMARY KEY (project_code, kind)
);

-- Flat records written by the CRUD layer, kept as raw JSON documents.
CREATE TABLE IF NOT EXISTS legacy_records (
    legacy_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    kind        TEXT NOT NULL,
    doc         TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS legacy_records_kind_idx ON legacy_records(kind);

PRAGMA user_version = 1;
";
