use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::OptionalExtension;
use uuid::Uuid;

use orkut_types::{Profile, UpdateProfileRequest};

use crate::avatar::avatar_color;
use crate::db::{datetime_at, uuid_at, DbPool};

pub struct ProfileRepository {
    pool: DbPool,
}

impl ProfileRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a user's profile joined with their username
    pub fn get(&self, user_id: &Uuid) -> Result<Option<Profile>> {
        let conn = self.pool.get()?;
        let profile = conn
            .query_row(
                "SELECT p.user_id, u.username, p.display_name, p.bio, p.birthday, p.city,
                        p.country, p.relationship_status, p.interests, p.photo_url, p.updated_at
                 FROM profiles p
                 JOIN users u ON u.id = p.user_id
                 WHERE p.user_id = ?",
                [user_id.to_string()],
                |row| {
                    let username: String = row.get(1)?;
                    Ok(Profile {
                        user_id: uuid_at(row, 0)?,
                        avatar_color: avatar_color(&username).to_string(),
                        username,
                        display_name: row.get(2)?,
                        bio: row.get(3)?,
                        birthday: row.get(4)?,
                        city: row.get(5)?,
                        country: row.get(6)?,
                        relationship_status: row.get(7)?,
                        interests: row.get(8)?,
                        photo_url: row.get(9)?,
                        updated_at: datetime_at(row, 10)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    /// Replace every editable field with the request's values (absent → NULL)
    pub fn replace(&self, user_id: &Uuid, fields: &UpdateProfileRequest) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO profiles (user_id, display_name, bio, birthday, city, country,
                                   relationship_status, interests, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                display_name = excluded.display_name,
                bio = excluded.bio,
                birthday = excluded.birthday,
                city = excluded.city,
                country = excluded.country,
                relationship_status = excluded.relationship_status,
                interests = excluded.interests,
                updated_at = excluded.updated_at",
            (
                user_id.to_string(),
                &fields.display_name,
                &fields.bio,
                &fields.birthday,
                &fields.city,
                &fields.country,
                &fields.relationship_status,
                &fields.interests,
                Utc::now().to_rfc3339(),
            ),
        )
        .context("Failed to replace profile")?;
        Ok(())
    }

    /// Update only the fields present in the request
    pub fn update(&self, user_id: &Uuid, fields: &UpdateProfileRequest) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE profiles SET
                display_name = coalesce(?, display_name),
                bio = coalesce(?, bio),
                birthday = coalesce(?, birthday),
                city = coalesce(?, city),
                country = coalesce(?, country),
                relationship_status = coalesce(?, relationship_status),
                interests = coalesce(?, interests),
                updated_at = ?
             WHERE user_id = ?",
            (
                &fields.display_name,
                &fields.bio,
                &fields.birthday,
                &fields.city,
                &fields.country,
                &fields.relationship_status,
                &fields.interests,
                Utc::now().to_rfc3339(),
                user_id.to_string(),
            ),
        )
        .context("Failed to update profile")?;
        Ok(())
    }

    pub fn set_photo_url(&self, user_id: &Uuid, photo_url: &str) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE profiles SET photo_url = ?, updated_at = ? WHERE user_id = ?",
            (photo_url, Utc::now().to_rfc3339(), user_id.to_string()),
        )
        .context("Failed to update profile photo")?;
        Ok(())
    }
}
