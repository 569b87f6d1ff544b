//! Accounts and sessions.

use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Account, Profile, SessionRecord};
use crate::rows::{ts, ts_at, uuid_at};

impl Database {
    /// Insert an account and its profile atomically.
    pub fn create_account(&self, account: &Account, profile: &Profile) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;

        tx.execute(
            "INSERT INTO auth_users (id, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                account.id.to_string(),
                account.email,
                account.password_hash,
                ts(&account.created_at),
            ],
        )
        .map_err(|e| StoreError::from_write(e, "email already registered"))?;

        tx.execute(
            "INSERT INTO profiles (id, username, full_name, bio, location, avatar_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                profile.id.to_string(),
                profile.username,
                profile.full_name,
                profile.bio,
                profile.location,
                profile.avatar_url,
                ts(&profile.created_at),
            ],
        )
        .map_err(|e| StoreError::from_write(e, "username already taken"))?;

        tx.commit()?;
        Ok(())
    }

    pub fn find_account_by_email(&self, email: &str) -> Result<Account> {
        self.conn()
            .query_row(
                "SELECT id, email, password_hash, created_at
                 FROM auth_users WHERE email = ?1",
                params![email.trim()],
                |row| {
                    Ok(Account {
                        id: uuid_at(row, 0)?,
                        email: row.get(1)?,
                        password_hash: row.get(2)?,
                        created_at: ts_at(row, 3)?,
                    })
                },
            )
            .map_err(StoreError::from_query)
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    pub fn insert_session(&self, session: &SessionRecord) -> Result<()> {
        self.conn().execute(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session.token_hash,
                session.user_id.to_string(),
                ts(&session.created_at),
                ts(&session.expires_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_session(&self, token_hash: &str) -> Result<SessionRecord> {
        self.conn()
            .query_row(
                "SELECT token_hash, user_id, created_at, expires_at
                 FROM sessions WHERE token_hash = ?1",
                params![token_hash],
                |row| {
                    Ok(SessionRecord {
                        token_hash: row.get(0)?,
                        user_id: uuid_at(row, 1)?,
                        created_at: ts_at(row, 2)?,
                        expires_at: ts_at(row, 3)?,
                    })
                },
            )
            .map_err(StoreError::from_query)
    }

    pub fn delete_session(&self, token_hash: &str) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM sessions WHERE token_hash = ?1",
            params![token_hash],
        )?;
        Ok(affected > 0)
    }

    /// Remove every session that expired at or before `now`.
    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        let affected = self.conn().execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            params![ts(&now)],
        )?;
        Ok(affected)
    }
}
