//! Database schema and migrations for FileVault.
//!
//! Migrations run in order the first time a database is opened or upgraded.

/// Database migrations.
///
/// Each entry is one SQL script. The `schema_version` table records how many
/// have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: users
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    email       TEXT NOT NULL UNIQUE,
    password    TEXT NOT NULL,           -- Argon2 hash
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
    // v2: file and folder entries
    r#"
CREATE TABLE files (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id),
    name        TEXT NOT NULL,
    type        TEXT NOT NULL CHECK (type IN ('folder', 'file', 'image')),
    parent_id   INTEGER NOT NULL DEFAULT 0,   -- 0 is the root
    is_public   INTEGER NOT NULL DEFAULT 0,
    local_path  TEXT,                         -- blob location, never exposed
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    CHECK (type <> 'folder' OR local_path IS NULL)
);

CREATE INDEX idx_files_user_parent ON files(user_id, parent_id);
"#,
    // v3: session tokens
    r#"
CREATE TABLE sessions (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id),
    token       TEXT NOT NULL UNIQUE,
    expires_at  TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    revoked_at  TEXT
);

CREATE INDEX idx_sessions_expires_at ON sessions(expires_at);
"#,
    // v4: background job queue
    r#"
CREATE TABLE jobs (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    queue         TEXT NOT NULL,
    payload       TEXT NOT NULL,
    status        TEXT NOT NULL DEFAULT 'queued',  -- queued, running, completed, failed
    attempts      INTEGER NOT NULL DEFAULT 0,
    max_attempts  INTEGER NOT NULL DEFAULT 3,
    last_error    TEXT,
    available_at  TEXT NOT NULL DEFAULT (datetime('now')),
    created_at    TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at    TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_jobs_queue_status ON jobs(queue, status, id);
"#,
];
