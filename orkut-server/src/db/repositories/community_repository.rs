use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::OptionalExtension;
use uuid::Uuid;

use orkut_types::{Community, CommunityMember, CommunityRole, CommunitySearchResult};

use crate::db::{datetime_at, uuid_at, DbPool};

const COMMUNITY_SELECT: &str = "
    SELECT c.id, c.name, c.description, c.category, c.owner_id, c.created_at,
           (SELECT COUNT(*) FROM community_members m WHERE m.community_id = c.id) AS member_count
    FROM communities c";

fn map_community(row: &rusqlite::Row<'_>) -> rusqlite::Result<Community> {
    Ok(Community {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        owner_id: uuid_at(row, 4)?,
        created_at: datetime_at(row, 5)?,
        member_count: row.get(6)?,
    })
}

pub struct CommunityRepository {
    pool: DbPool,
}

impl CommunityRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a community and make its owner the first admin
    pub fn create(&self, community: &Community) -> Result<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO communities (id, name, description, category, owner_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                community.id.to_string(),
                &community.name,
                &community.description,
                &community.category,
                community.owner_id.to_string(),
                community.created_at.to_rfc3339(),
            ),
        )
        .context("Failed to create community")?;
        tx.execute(
            "INSERT INTO community_members (community_id, user_id, role, joined_at)
             VALUES (?, ?, 'admin', ?)",
            (
                community.id.to_string(),
                community.owner_id.to_string(),
                community.created_at.to_rfc3339(),
            ),
        )
        .context("Failed to add community owner")?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_by_id(&self, community_id: &Uuid) -> Result<Option<Community>> {
        let conn = self.pool.get()?;
        let community = conn
            .query_row(
                &format!("{} WHERE c.id = ?", COMMUNITY_SELECT),
                [community_id.to_string()],
                map_community,
            )
            .optional()?;
        Ok(community)
    }

    /// Case-insensitive lookup by name
    pub fn get_by_name(&self, name: &str) -> Result<Option<Community>> {
        let conn = self.pool.get()?;
        let community = conn
            .query_row(
                &format!("{} WHERE c.name = ?", COMMUNITY_SELECT),
                [name],
                map_community,
            )
            .optional()?;
        Ok(community)
    }

    /// Largest communities first
    pub fn list(&self, limit: i64, offset: i64) -> Result<Vec<Community>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY member_count DESC, c.name ASC LIMIT ? OFFSET ?",
            COMMUNITY_SELECT
        ))?;
        let communities = stmt
            .query_map((limit, offset), map_community)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(communities)
    }

    pub fn delete(&self, community_id: &Uuid) -> Result<usize> {
        let conn = self.pool.get()?;
        let rows = conn
            .execute("DELETE FROM communities WHERE id = ?", [community_id.to_string()])
            .context("Failed to delete community")?;
        Ok(rows)
    }

    /// Add a member. Returns false if they already belonged.
    pub fn join(&self, community_id: &Uuid, user_id: &Uuid) -> Result<bool> {
        let conn = self.pool.get()?;
        let rows = conn
            .execute(
                "INSERT OR IGNORE INTO community_members (community_id, user_id, role, joined_at)
                 VALUES (?, ?, 'member', ?)",
                (
                    community_id.to_string(),
                    user_id.to_string(),
                    Utc::now().to_rfc3339(),
                ),
            )
            .context("Failed to join community")?;
        Ok(rows > 0)
    }

    pub fn leave(&self, community_id: &Uuid, user_id: &Uuid) -> Result<usize> {
        let conn = self.pool.get()?;
        let rows = conn
            .execute(
                "DELETE FROM community_members WHERE community_id = ? AND user_id = ?",
                (community_id.to_string(), user_id.to_string()),
            )
            .context("Failed to leave community")?;
        Ok(rows)
    }

    /// The user's role, or None when they are not a member
    pub fn get_role(&self, community_id: &Uuid, user_id: &Uuid) -> Result<Option<CommunityRole>> {
        let conn = self.pool.get()?;
        let role: Option<String> = conn
            .query_row(
                "SELECT role FROM community_members WHERE community_id = ? AND user_id = ?",
                (community_id.to_string(), user_id.to_string()),
                |row| row.get(0),
            )
            .optional()?;
        Ok(role.map(|r| CommunityRole::parse(&r).unwrap_or_default()))
    }

    pub fn set_role(&self, community_id: &Uuid, user_id: &Uuid, role: CommunityRole) -> Result<usize> {
        let conn = self.pool.get()?;
        let rows = conn
            .execute(
                "UPDATE community_members SET role = ? WHERE community_id = ? AND user_id = ?",
                (role.as_str(), community_id.to_string(), user_id.to_string()),
            )
            .context("Failed to update member role")?;
        Ok(rows)
    }

    pub fn admin_count(&self, community_id: &Uuid) -> Result<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM community_members WHERE community_id = ? AND role = 'admin'",
            [community_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Members in join order
    pub fn members(&self, community_id: &Uuid) -> Result<Vec<CommunityMember>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT m.community_id, m.user_id, u.username, m.role, m.joined_at
             FROM community_members m
             JOIN users u ON u.id = m.user_id
             WHERE m.community_id = ?
             ORDER BY m.joined_at ASC",
        )?;

        let members = stmt
            .query_map([community_id.to_string()], |row| {
                let role: String = row.get(3)?;
                Ok(CommunityMember {
                    community_id: uuid_at(row, 0)?,
                    user_id: uuid_at(row, 1)?,
                    username: row.get(2)?,
                    role: CommunityRole::parse(&role).unwrap_or_default(),
                    joined_at: datetime_at(row, 4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(members)
    }

    /// Search communities by name substring
    pub fn search(&self, query: &str) -> Result<Vec<CommunitySearchResult>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.name,
                    (SELECT COUNT(*) FROM community_members m WHERE m.community_id = c.id)
             FROM communities c
             WHERE instr(lower(c.name), lower(?1)) > 0
             ORDER BY c.name",
        )?;

        let results = stmt
            .query_map([query], |row| {
                Ok(CommunitySearchResult {
                    id: uuid_at(row, 0)?,
                    name: row.get(1)?,
                    member_count: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(results)
    }
}
