use anyhow::{Context, Result};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use orkut_types::Comment;

use crate::db::{datetime_at, uuid_at, DbPool};

pub struct CommentRepository {
    pool: DbPool,
}

impl CommentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn create(&self, comment: &Comment) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO post_comments (id, post_id, author_id, content, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                comment.id.to_string(),
                comment.post_id.to_string(),
                comment.author_id.to_string(),
                &comment.content,
                comment.created_at.to_rfc3339(),
            ),
        )
        .context("Failed to create comment")?;
        Ok(())
    }

    pub fn get_by_id(&self, comment_id: &Uuid) -> Result<Option<Comment>> {
        let conn = self.pool.get()?;
        let comment = conn
            .query_row(
                "SELECT c.id, c.post_id, c.author_id, u.username, c.content, c.created_at
                 FROM post_comments c
                 JOIN users u ON u.id = c.author_id
                 WHERE c.id = ?",
                [comment_id.to_string()],
                map_comment,
            )
            .optional()?;
        Ok(comment)
    }

    /// Comments on a post, oldest first
    pub fn list_for_post(&self, post_id: &Uuid) -> Result<Vec<Comment>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.post_id, c.author_id, u.username, c.content, c.created_at
             FROM post_comments c
             JOIN users u ON u.id = c.author_id
             WHERE c.post_id = ?
             ORDER BY c.created_at ASC",
        )?;

        let comments = stmt
            .query_map([post_id.to_string()], map_comment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    pub fn delete(&self, comment_id: &Uuid) -> Result<usize> {
        let conn = self.pool.get()?;
        let rows = conn
            .execute("DELETE FROM post_comments WHERE id = ?", [comment_id.to_string()])
            .context("Failed to delete comment")?;
        Ok(rows)
    }
}

fn map_comment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: uuid_at(row, 0)?,
        post_id: uuid_at(row, 1)?,
        author_id: uuid_at(row, 2)?,
        author_username: row.get(3)?,
        content: row.get(4)?,
        created_at: datetime_at(row, 5)?,
    })
}
