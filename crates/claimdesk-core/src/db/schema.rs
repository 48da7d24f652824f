//! Canonical SQLite schema for claimdesk.
//!
//! - `claims` owns `work_orders`, `claim_logs`, `claim_photos`, and
//!   `claim_closures`; all four cascade on claim deletion
//! - `vendors` and `assignees` share one contact shape; work orders keep a
//!   nullable reference to each
//! - `claim_logs` is append-only and ordered by `created_at_us` (UTC micros),
//!   while `timestamp` keeps the local wall-clock value for display
//! - `users` and `sessions` back login

/// Migration v1: core tables.
pub const MIGRATION_V1_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY,
    email TEXT NOT NULL UNIQUE CHECK (email = lower(email) AND length(trim(email)) > 0),
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    password_hash TEXT NOT NULL,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS vendors (
    contact_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    contact_number TEXT,
    email TEXT
);

CREATE TABLE IF NOT EXISTS assignees (
    contact_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    contact_number TEXT,
    email TEXT
);

CREATE TABLE IF NOT EXISTS claims (
    claim_id INTEGER PRIMARY KEY,
    address TEXT NOT NULL CHECK (length(trim(address)) > 0),
    homeowner_name TEXT,
    homeowner_email TEXT,
    homeowner_phone TEXT,
    cobuyer_name TEXT,
    cobuyer_email TEXT,
    cobuyer_phone TEXT,
    warranty_type TEXT,
    issue_description TEXT,
    status TEXT NOT NULL DEFAULT 'Open'
        CHECK (status IN ('Open', 'Scheduled', 'Deferred', 'Closed')),
    date_reported TEXT NOT NULL,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS claim_photos (
    photo_id INTEGER PRIMARY KEY,
    claim_id INTEGER NOT NULL REFERENCES claims(claim_id) ON DELETE CASCADE,
    filename TEXT NOT NULL CHECK (length(trim(filename)) > 0)
);

CREATE TABLE IF NOT EXISTS work_orders (
    work_order_id INTEGER PRIMARY KEY,
    claim_id INTEGER NOT NULL REFERENCES claims(claim_id) ON DELETE CASCADE,
    vendor_id INTEGER REFERENCES vendors(contact_id) ON DELETE SET NULL,
    assignee_id INTEGER REFERENCES assignees(contact_id) ON DELETE SET NULL,
    scheduled_date TEXT,
    scheduled_time TEXT,
    status TEXT NOT NULL DEFAULT 'Scheduled',
    notes TEXT,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS claim_logs (
    log_id INTEGER PRIMARY KEY,
    claim_id INTEGER NOT NULL REFERENCES claims(claim_id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(user_id),
    timestamp TEXT NOT NULL,
    created_at_us INTEGER NOT NULL,
    action TEXT NOT NULL CHECK (length(trim(action)) > 0)
);

CREATE TABLE IF NOT EXISTS claim_closures (
    closure_id INTEGER PRIMARY KEY,
    claim_id INTEGER NOT NULL REFERENCES claims(claim_id) ON DELETE CASCADE,
    reasons TEXT,
    notes TEXT,
    timestamp TEXT NOT NULL,
    created_at_us INTEGER NOT NULL
);
"#;

/// Migration v2: read-path indexes.
pub const MIGRATION_V2_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_claims_status
    ON claims(status);

CREATE INDEX IF NOT EXISTS idx_work_orders_claim_date
    ON work_orders(claim_id, scheduled_date);

CREATE INDEX IF NOT EXISTS idx_work_orders_scheduled_date
    ON work_orders(scheduled_date);

CREATE INDEX IF NOT EXISTS idx_claim_logs_claim_created
    ON claim_logs(claim_id, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_claim_photos_claim
    ON claim_photos(claim_id);

CREATE INDEX IF NOT EXISTS idx_claim_closures_claim
    ON claim_closures(claim_id);

CREATE INDEX IF NOT EXISTS idx_sessions_user
    ON sessions(user_id);
"#;

/// Indexes expected by the dashboard, calendar, and log query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_claims_status",
    "idx_work_orders_claim_date",
    "idx_work_orders_scheduled_date",
    "idx_claim_logs_claim_created",
    "idx_claim_photos_claim",
    "idx_claim_closures_claim",
    "idx_sessions_user",
];
