//! SQL schema for the Herald SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS notifications (
    notification_id   TEXT PRIMARY KEY,
    recipient_id      TEXT NOT NULL,
    sender_id         TEXT,
    title             TEXT NOT NULL,
    message           TEXT NOT NULL,
    title_folded      TEXT NOT NULL,   -- lowercased copies for search
    message_folded    TEXT NOT NULL,
    notification_type TEXT NOT NULL,
    category          TEXT NOT NULL,
    priority          TEXT NOT NULL,   -- 'low' | 'medium' | 'high' | 'urgent'
    is_read           INTEGER NOT NULL DEFAULT 0,
    read_at           TEXT,
    action_url        TEXT,
    action_text       TEXT,
    entity_type       TEXT,            -- NULL together with entity_id
    entity_id         TEXT,
    metadata          TEXT NOT NULL DEFAULT '{}',
    delivery_methods  TEXT NOT NULL DEFAULT '[\"in-app\"]',
    delivery_status   TEXT NOT NULL,   -- JSON, one object per channel
    scheduled_for     TEXT,
    expires_at        TEXT NOT NULL,   -- RFC 3339 UTC, microsecond precision
    is_active         INTEGER NOT NULL DEFAULT 1,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    CHECK ((entity_type IS NULL) = (entity_id IS NULL))
);

CREATE INDEX IF NOT EXISTS notifications_recipient_read_idx
    ON notifications(recipient_id, is_read, created_at);
CREATE INDEX IF NOT EXISTS notifications_recipient_type_idx
    ON notifications(recipient_id, notification_type, created_at);
CREATE INDEX IF NOT EXISTS notifications_recipient_category_idx
    ON notifications(recipient_id, category, created_at);
CREATE INDEX IF NOT EXISTS notifications_priority_idx
    ON notifications(priority, created_at);
CREATE INDEX IF NOT EXISTS notifications_expires_idx
    ON notifications(expires_at);
CREATE INDEX IF NOT EXISTS notifications_created_idx
    ON notifications(created_at);

PRAGMA user_version = 1;
";
