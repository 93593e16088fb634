use anyhow::{Context, Result};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use orkut_types::Scrap;

use crate::db::{datetime_at, uuid_at, DbPool};

pub struct ScrapRepository {
    pool: DbPool,
}

impl ScrapRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn create(&self, scrap: &Scrap) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO scraps (id, from_user_id, to_user_id, content, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                scrap.id.to_string(),
                scrap.from_user_id.to_string(),
                scrap.to_user_id.to_string(),
                &scrap.content,
                scrap.created_at.to_rfc3339(),
            ),
        )
        .context("Failed to create scrap")?;
        Ok(())
    }

    pub fn get_by_id(&self, scrap_id: &Uuid) -> Result<Option<Scrap>> {
        let conn = self.pool.get()?;
        let scrap = conn
            .query_row(
                "SELECT s.id, s.from_user_id, u.username, s.to_user_id, s.content, s.created_at
                 FROM scraps s
                 JOIN users u ON u.id = s.from_user_id
                 WHERE s.id = ?",
                [scrap_id.to_string()],
                map_scrap,
            )
            .optional()?;
        Ok(scrap)
    }

    /// Scraps on a user's wall, newest first
    pub fn list_for_user(&self, user_id: &Uuid, limit: i64, offset: i64) -> Result<Vec<Scrap>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT s.id, s.from_user_id, u.username, s.to_user_id, s.content, s.created_at
             FROM scraps s
             JOIN users u ON u.id = s.from_user_id
             WHERE s.to_user_id = ?
             ORDER BY s.created_at DESC
             LIMIT ? OFFSET ?",
        )?;

        let scraps = stmt
            .query_map((user_id.to_string(), limit, offset), map_scrap)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(scraps)
    }

    pub fn delete(&self, scrap_id: &Uuid) -> Result<usize> {
        let conn = self.pool.get()?;
        let rows = conn
            .execute("DELETE FROM scraps WHERE id = ?", [scrap_id.to_string()])
            .context("Failed to delete scrap")?;
        Ok(rows)
    }

    pub fn count_for_user(&self, user_id: &Uuid) -> Result<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM scraps WHERE to_user_id = ?",
            [user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn map_scrap(row: &rusqlite::Row<'_>) -> rusqlite::Result<Scrap> {
    Ok(Scrap {
        id: uuid_at(row, 0)?,
        from_user_id: uuid_at(row, 1)?,
        from_username: row.get(2)?,
        to_user_id: uuid_at(row, 3)?,
        content: row.get(4)?,
        created_at: datetime_at(row, 5)?,
    })
}
