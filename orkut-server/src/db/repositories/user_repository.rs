use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::OptionalExtension;
use uuid::Uuid;

use orkut_types::{User, UserSearchResult};

use crate::db::{datetime_at, uuid_at, DbPool};

const USER_COLUMNS: &str = "id, username, email, created_at";

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_at(row, 0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        created_at: datetime_at(row, 3)?,
    })
}

pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a user together with an empty profile, atomically
    pub fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        display_name: Option<&str>,
    ) -> Result<User> {
        let mut conn = self.pool.get()?;
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO users (id, username, email, password_hash, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                user.id.to_string(),
                &user.username,
                &user.email,
                password_hash,
                user.created_at.to_rfc3339(),
            ),
        )
        .context("Failed to create user")?;
        tx.execute(
            "INSERT INTO profiles (user_id, display_name, updated_at) VALUES (?, ?, ?)",
            (user.id.to_string(), display_name, user.created_at.to_rfc3339()),
        )
        .context("Failed to create profile")?;
        tx.commit()?;

        Ok(user)
    }

    /// Get user by ID
    pub fn get_by_id(&self, user_id: &Uuid) -> Result<Option<User>> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
                [user_id.to_string()],
                map_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Get user by username (case-insensitive)
    pub fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS),
                [username],
                map_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Get user by email (case-insensitive)
    pub fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS),
                [email],
                map_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Look up the account and its password hash by email or username
    pub fn get_credentials(&self, login: &str) -> Result<Option<(User, String)>> {
        let conn = self.pool.get()?;
        let found = conn
            .query_row(
                &format!(
                    "SELECT {}, password_hash FROM users WHERE email = ?1 OR username = ?1",
                    USER_COLUMNS
                ),
                [login],
                |row| Ok((map_user(row)?, row.get::<_, String>(4)?)),
            )
            .optional()?;
        Ok(found)
    }

    /// Search users by username or display name substring
    pub fn search(&self, query: &str) -> Result<Vec<UserSearchResult>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT u.id, u.username, p.display_name
             FROM users u
             LEFT JOIN profiles p ON p.user_id = u.id
             WHERE instr(lower(u.username), lower(?1)) > 0
                OR instr(lower(coalesce(p.display_name, '')), lower(?1)) > 0
             ORDER BY u.username",
        )?;

        let users = stmt
            .query_map([query], |row| {
                Ok(UserSearchResult {
                    id: uuid_at(row, 0)?,
                    username: row.get(1)?,
                    display_name: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(users)
    }
}
