use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{OptionalExtension, ToSql};
use uuid::Uuid;

use orkut_types::Post;

use crate::db::{datetime_at, uuid_at, DbPool};

/// Which posts a listing should include
pub enum PostFilter<'a> {
    All,
    Author(&'a Uuid),
    /// The user's own posts plus their accepted friends'
    FeedOf(&'a Uuid),
}

// ?1 is always the viewer id (or '' when anonymous)
const POST_SELECT: &str = "
    SELECT p.id, p.author_id, u.username, p.content, p.created_at, p.updated_at,
           (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS like_count,
           (SELECT COUNT(*) FROM post_comments c WHERE c.post_id = p.id) AS comment_count,
           EXISTS(SELECT 1 FROM post_likes l WHERE l.post_id = p.id AND l.user_id = ?1) AS liked_by_me
    FROM posts p
    JOIN users u ON p.author_id = u.id";

fn map_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: uuid_at(row, 0)?,
        author_id: uuid_at(row, 1)?,
        author_username: row.get(2)?,
        content: row.get(3)?,
        created_at: datetime_at(row, 4)?,
        updated_at: datetime_at(row, 5)?,
        like_count: row.get(6)?,
        comment_count: row.get(7)?,
        liked_by_me: row.get(8)?,
    })
}

fn viewer_param(viewer: Option<&Uuid>) -> String {
    viewer.map(|id| id.to_string()).unwrap_or_default()
}

pub struct PostRepository {
    pool: DbPool,
}

impl PostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new post
    pub fn create(&self, post: &Post) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO posts (id, author_id, content, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                post.id.to_string(),
                post.author_id.to_string(),
                &post.content,
                post.created_at.to_rfc3339(),
                post.updated_at.to_rfc3339(),
            ),
        )
        .context("Failed to create post")?;
        Ok(())
    }

    /// Get a single post by ID
    pub fn get_by_id(&self, post_id: &Uuid, viewer: Option<&Uuid>) -> Result<Option<Post>> {
        let conn = self.pool.get()?;
        let post = conn
            .query_row(
                &format!("{} WHERE p.id = ?2", POST_SELECT),
                (viewer_param(viewer), post_id.to_string()),
                map_post,
            )
            .optional()?;
        Ok(post)
    }

    /// List posts newest first
    pub fn list(
        &self,
        filter: PostFilter<'_>,
        viewer: Option<&Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>> {
        let conn = self.pool.get()?;

        let viewer = viewer_param(viewer);
        let (where_clause, subject) = match filter {
            PostFilter::All => ("", None),
            PostFilter::Author(id) => ("WHERE p.author_id = ?4", Some(id.to_string())),
            PostFilter::FeedOf(id) => (
                "WHERE p.author_id = ?4 OR p.author_id IN (
                    SELECT CASE WHEN requester_id = ?4 THEN addressee_id ELSE requester_id END
                    FROM friendships
                    WHERE (requester_id = ?4 OR addressee_id = ?4) AND status = 'accepted')",
                Some(id.to_string()),
            ),
        };

        let query = format!(
            "{} {} ORDER BY p.created_at DESC LIMIT ?2 OFFSET ?3",
            POST_SELECT, where_clause
        );
        let mut stmt = conn.prepare(&query)?;

        let mut params: Vec<&dyn ToSql> = vec![&viewer, &limit, &offset];
        if let Some(subject) = subject.as_ref() {
            params.push(subject);
        }

        let posts = stmt
            .query_map(params.as_slice(), map_post)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(posts)
    }

    pub fn update_content(&self, post_id: &Uuid, content: &str) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE posts SET content = ?, updated_at = ? WHERE id = ?",
            (content, Utc::now().to_rfc3339(), post_id.to_string()),
        )
        .context("Failed to update post")?;
        Ok(())
    }

    /// Delete a post (cascade removes likes and comments)
    pub fn delete(&self, post_id: &Uuid) -> Result<usize> {
        let conn = self.pool.get()?;
        let rows = conn
            .execute("DELETE FROM posts WHERE id = ?", [post_id.to_string()])
            .context("Failed to delete post")?;
        Ok(rows)
    }

    /// Like a post; liking twice is a no-op
    pub fn like(&self, post_id: &Uuid, user_id: &Uuid) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT OR IGNORE INTO post_likes (post_id, user_id, created_at) VALUES (?, ?, ?)",
            (post_id.to_string(), user_id.to_string(), Utc::now().to_rfc3339()),
        )
        .context("Failed to like post")?;
        Ok(())
    }

    pub fn unlike(&self, post_id: &Uuid, user_id: &Uuid) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "DELETE FROM post_likes WHERE post_id = ? AND user_id = ?",
            (post_id.to_string(), user_id.to_string()),
        )
        .context("Failed to unlike post")?;
        Ok(())
    }

    /// Get post count for a user
    pub fn count_by_author(&self, user_id: &Uuid) -> Result<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE author_id = ?",
            [user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
