//! Table definitions for the license store.
//!
//! Timestamps are Unix seconds. JSON documents are stored as TEXT and must
//! pass `json_valid`. Status and method columns are open strings; nothing
//! here constrains their values.

pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id TEXT PRIMARY KEY NOT NULL,
    provider TEXT NOT NULL,
    provider_order_id TEXT NOT NULL UNIQUE,
    amount_cents INTEGER,
    currency TEXT,
    customer_phone TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at INTEGER NOT NULL DEFAULT (unixepoch())
);

CREATE TABLE IF NOT EXISTS licenses (
    id TEXT PRIMARY KEY NOT NULL,
    license_key TEXT NOT NULL UNIQUE,
    product_sku TEXT,
    order_id TEXT REFERENCES orders(id),
    issued_to TEXT,
    issued_phone TEXT,
    issued_email TEXT,
    issued_at INTEGER NOT NULL DEFAULT (unixepoch()),
    expires_at INTEGER,
    status TEXT NOT NULL DEFAULT 'valid',
    activated INTEGER NOT NULL DEFAULT 0,
    activated_at INTEGER,
    metadata TEXT CHECK (metadata IS NULL OR json_valid(metadata))
);

-- phone is nullable: email-only messages carry no phone number
CREATE TABLE IF NOT EXISTS sms_messages (
    id TEXT PRIMARY KEY NOT NULL,
    phone TEXT,
    email TEXT,
    message TEXT NOT NULL,
    method TEXT NOT NULL DEFAULT 'sms',
    license_id TEXT REFERENCES licenses(id),
    status TEXT NOT NULL DEFAULT 'queued',
    attempts INTEGER NOT NULL DEFAULT 0,
    last_attempt_at INTEGER,
    sent_at INTEGER,
    response_json TEXT CHECK (response_json IS NULL OR json_valid(response_json)),
    created_at INTEGER NOT NULL DEFAULT (unixepoch())
);

CREATE INDEX IF NOT EXISTS idx_sms_messages_status ON sms_messages(status);
CREATE INDEX IF NOT EXISTS idx_sms_messages_created_at ON sms_messages(created_at);

CREATE TABLE IF NOT EXISTS license_activations (
    id TEXT PRIMARY KEY NOT NULL,
    license_id TEXT NOT NULL REFERENCES licenses(id),
    terminal_id TEXT NOT NULL,
    activated_at INTEGER NOT NULL DEFAULT (unixepoch())
);
"#;

/// Columns every table must carry for the crate's queries to work.
pub const EXPECTED_TABLES: &[(&str, &[&str])] = &[
    (
        "orders",
        &[
            "id",
            "provider",
            "provider_order_id",
            "amount_cents",
            "currency",
            "customer_phone",
            "status",
            "created_at",
        ],
    ),
    (
        "licenses",
        &[
            "id",
            "license_key",
            "product_sku",
            "order_id",
            "issued_to",
            "issued_phone",
            "issued_email",
            "issued_at",
            "expires_at",
            "status",
            "activated",
            "activated_at",
            "metadata",
        ],
    ),
    (
        "sms_messages",
        &[
            "id",
            "phone",
            "email",
            "message",
            "method",
            "license_id",
            "status",
            "attempts",
            "last_attempt_at",
            "sent_at",
            "response_json",
            "created_at",
        ],
    ),
    (
        "license_activations",
        &["id", "license_id", "terminal_id", "activated_at"],
    ),
];

/// (index name, table name)
pub const EXPECTED_INDEXES: &[(&str, &str)] = &[
    ("idx_sms_messages_status", "sms_messages"),
    ("idx_sms_messages_created_at", "sms_messages"),
];
