//! v001 -- Initial schema creation.
//!
//! Creates the account tables (`auth_users`, `sessions`), the marketplace
//! tables (`profiles`, `categories`, `products`, `product_images`,
//! `interests`, `messages`, `exchanges`) and seeds the category list.

use rusqlite::{params, Connection};
use uuid::Uuid;

use cycleit_shared::constants::DEFAULT_CATEGORIES;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Accounts & sessions
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS auth_users (
    id            TEXT PRIMARY KEY NOT NULL,       -- UUID v4
    email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,                   -- argon2 PHC string
    created_at    TEXT NOT NULL                    -- RFC-3339
);

CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY NOT NULL,          -- BLAKE3 of the bearer token
    user_id    TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES auth_users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);

-- ----------------------------------------------------------------
-- Profiles (1:1 with auth_users)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS profiles (
    id         TEXT PRIMARY KEY NOT NULL,
    username   TEXT NOT NULL UNIQUE COLLATE NOCASE,
    full_name  TEXT,
    bio        TEXT,
    location   TEXT,
    avatar_url TEXT,
    created_at TEXT NOT NULL,

    FOREIGN KEY (id) REFERENCES auth_users(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Categories (reference data)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS categories (
    id   TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL UNIQUE
);

-- ----------------------------------------------------------------
-- Products (listings)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS products (
    id               TEXT PRIMARY KEY NOT NULL,
    owner_id         TEXT NOT NULL,
    title            TEXT NOT NULL,
    description      TEXT NOT NULL,
    category_id      TEXT NOT NULL,
    condition        TEXT NOT NULL
                     CHECK (condition IN ('new', 'like-new', 'good', 'acceptable')),
    desired_exchange TEXT,
    location         TEXT,
    is_active        INTEGER NOT NULL DEFAULT 1,   -- boolean 0/1
    created_at       TEXT NOT NULL,

    FOREIGN KEY (owner_id) REFERENCES profiles(id) ON DELETE CASCADE,
    FOREIGN KEY (category_id) REFERENCES categories(id)
);

CREATE INDEX IF NOT EXISTS idx_products_active_created
    ON products(is_active, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_products_owner ON products(owner_id);

CREATE TABLE IF NOT EXISTS product_images (
    id            TEXT PRIMARY KEY NOT NULL,
    product_id    TEXT NOT NULL,
    object_key    TEXT NOT NULL,                   -- key inside the product-images bucket
    image_url     TEXT NOT NULL,
    display_order INTEGER NOT NULL,

    FOREIGN KEY (product_id) REFERENCES products(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_product_images_product
    ON product_images(product_id, display_order);

-- ----------------------------------------------------------------
-- Interests
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS interests (
    id         TEXT PRIMARY KEY NOT NULL,
    product_id TEXT NOT NULL,
    user_id    TEXT NOT NULL,
    message    TEXT,
    created_at TEXT NOT NULL,

    UNIQUE (product_id, user_id),
    FOREIGN KEY (product_id) REFERENCES products(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES profiles(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id           TEXT PRIMARY KEY NOT NULL,
    sender_id    TEXT NOT NULL,
    recipient_id TEXT NOT NULL,
    product_id   TEXT,                             -- nullable FK -> products(id)
    content      TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    is_read      INTEGER NOT NULL DEFAULT 0,

    FOREIGN KEY (sender_id) REFERENCES profiles(id) ON DELETE CASCADE,
    FOREIGN KEY (recipient_id) REFERENCES profiles(id) ON DELETE CASCADE,
    FOREIGN KEY (product_id) REFERENCES products(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_messages_recipient ON messages(recipient_id, is_read);

-- ----------------------------------------------------------------
-- Exchanges
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS exchanges (
    id              TEXT PRIMARY KEY NOT NULL,
    product_id      TEXT NOT NULL,
    owner_id        TEXT NOT NULL,
    counterparty_id TEXT NOT NULL,
    status          TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'confirmed', 'completed', 'cancelled')),
    created_at      TEXT NOT NULL,
    confirmed_at    TEXT,
    completed_at    TEXT,

    CHECK (owner_id <> counterparty_id),
    FOREIGN KEY (product_id) REFERENCES products(id) ON DELETE CASCADE,
    FOREIGN KEY (owner_id) REFERENCES profiles(id) ON DELETE CASCADE,
    FOREIGN KEY (counterparty_id) REFERENCES profiles(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_exchanges_owner ON exchanges(owner_id);
CREATE INDEX IF NOT EXISTS idx_exchanges_counterparty ON exchanges(counterparty_id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)?;

    for name in DEFAULT_CATEGORIES {
        conn.execute(
            "INSERT OR IGNORE INTO categories (id, name) VALUES (?1, ?2)",
            params![Uuid::new_v4().to_string(), name],
        )?;
    }
    tracing::debug!(count = DEFAULT_CATEGORIES.len(), "seeded categories");

    Ok(())
}
