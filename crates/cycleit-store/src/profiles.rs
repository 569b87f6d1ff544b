//! CRUD operations for [`Profile`] records.

use rusqlite::params;
use uuid::Uuid;

use cycleit_shared::protocol::ProfileUpdate;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Profile, ProfileSummary};
use crate::rows::{ts_at, uuid_at};

impl Database {
    pub fn get_profile(&self, id: Uuid) -> Result<Profile> {
        self.conn()
            .query_row(
                "SELECT id, username, full_name, bio, location, avatar_url, created_at
                 FROM profiles WHERE id = ?1",
                params![id.to_string()],
                row_to_profile,
            )
            .map_err(StoreError::from_query)
    }

    pub fn get_profile_summary(&self, id: Uuid) -> Result<ProfileSummary> {
        self.conn()
            .query_row(
                "SELECT id, username, full_name, avatar_url FROM profiles WHERE id = ?1",
                params![id.to_string()],
                |row| row_to_summary(row, 0),
            )
            .map_err(StoreError::from_query)
    }

    /// Overwrite the editable profile fields and return the stored row.
    pub fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<Profile> {
        let affected = self
            .conn()
            .execute(
                "UPDATE profiles
                 SET username = ?1, full_name = ?2, bio = ?3, location = ?4
                 WHERE id = ?5",
                params![
                    update.username,
                    update.full_name,
                    update.bio,
                    update.location,
                    id.to_string(),
                ],
            )
            .map_err(|e| StoreError::from_write(e, "username already taken"))?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_profile(id)
    }

    pub fn set_avatar_url(&self, id: Uuid, avatar_url: &str) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE profiles SET avatar_url = ?1 WHERE id = ?2",
            params![avatar_url, id.to_string()],
        )?;
        Ok(affected > 0)
    }
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: uuid_at(row, 0)?,
        username: row.get(1)?,
        full_name: row.get(2)?,
        bio: row.get(3)?,
        location: row.get(4)?,
        avatar_url: row.get(5)?,
        created_at: ts_at(row, 6)?,
    })
}

/// Map four consecutive columns `id, username, full_name, avatar_url`
/// starting at `start`. Joined queries embed summaries this way.
pub(crate) fn row_to_summary(row: &rusqlite::Row<'_>, start: usize) -> rusqlite::Result<ProfileSummary> {
    Ok(ProfileSummary {
        id: uuid_at(row, start)?,
        username: row.get(start + 1)?,
        full_name: row.get(start + 2)?,
        avatar_url: row.get(start + 3)?,
    })
}
