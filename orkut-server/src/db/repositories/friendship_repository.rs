use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::OptionalExtension;
use uuid::Uuid;

use orkut_types::{FriendInfo, Friendship, FriendshipStatus};

use crate::db::{datetime_at, uuid_at, DbPool};

pub struct FriendshipRepository {
    pool: DbPool,
}

impl FriendshipRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Find the friendship row between two users, whichever side requested it
    pub fn find_between(&self, user_a: &Uuid, user_b: &Uuid) -> Result<Option<Friendship>> {
        let conn = self.pool.get()?;
        let friendship = conn
            .query_row(
                "SELECT requester_id, addressee_id, status, created_at, updated_at
                 FROM friendships
                 WHERE (requester_id = ?1 AND addressee_id = ?2)
                    OR (requester_id = ?2 AND addressee_id = ?1)",
                (user_a.to_string(), user_b.to_string()),
                |row| {
                    let status: String = row.get(2)?;
                    Ok(Friendship {
                        requester_id: uuid_at(row, 0)?,
                        addressee_id: uuid_at(row, 1)?,
                        status: FriendshipStatus::parse(&status)
                            .unwrap_or(FriendshipStatus::Pending),
                        created_at: datetime_at(row, 3)?,
                        updated_at: datetime_at(row, 4)?,
                    })
                },
            )
            .optional()?;
        Ok(friendship)
    }

    /// Insert a pending request, replacing a previously declined one
    pub fn create_request(&self, requester_id: &Uuid, addressee_id: &Uuid) -> Result<()> {
        let mut conn = self.pool.get()?;
        let now = Utc::now().to_rfc3339();

        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM friendships
             WHERE status = 'declined'
               AND ((requester_id = ?1 AND addressee_id = ?2)
                 OR (requester_id = ?2 AND addressee_id = ?1))",
            (requester_id.to_string(), addressee_id.to_string()),
        )?;
        tx.execute(
            "INSERT INTO friendships (requester_id, addressee_id, status, created_at, updated_at)
             VALUES (?, ?, 'pending', ?, ?)",
            (requester_id.to_string(), addressee_id.to_string(), &now, &now),
        )
        .context("Failed to create friend request")?;
        tx.commit()?;

        Ok(())
    }

    /// Answer a pending request sent by `requester_id` to `addressee_id`.
    /// Returns false when no such pending request exists.
    pub fn respond(
        &self,
        requester_id: &Uuid,
        addressee_id: &Uuid,
        status: FriendshipStatus,
    ) -> Result<bool> {
        let conn = self.pool.get()?;
        let rows = conn
            .execute(
                "UPDATE friendships SET status = ?, updated_at = ?
                 WHERE requester_id = ? AND addressee_id = ? AND status = 'pending'",
                (
                    status.as_str(),
                    Utc::now().to_rfc3339(),
                    requester_id.to_string(),
                    addressee_id.to_string(),
                ),
            )
            .context("Failed to respond to friend request")?;
        Ok(rows > 0)
    }

    /// Remove the relationship in either direction (unfriend or cancel)
    pub fn remove(&self, user_a: &Uuid, user_b: &Uuid) -> Result<usize> {
        let conn = self.pool.get()?;
        let rows = conn
            .execute(
                "DELETE FROM friendships
                 WHERE status <> 'declined'
                   AND ((requester_id = ?1 AND addressee_id = ?2)
                     OR (requester_id = ?2 AND addressee_id = ?1))",
                (user_a.to_string(), user_b.to_string()),
            )
            .context("Failed to remove friendship")?;
        Ok(rows)
    }

    /// Accepted friends of a user, most recent first
    pub fn list_friends(&self, user_id: &Uuid) -> Result<Vec<FriendInfo>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT u.id, u.username, p.display_name, p.photo_url, f.updated_at
             FROM friendships f
             JOIN users u ON u.id = CASE WHEN f.requester_id = ?1 THEN f.addressee_id
                                         ELSE f.requester_id END
             LEFT JOIN profiles p ON p.user_id = u.id
             WHERE (f.requester_id = ?1 OR f.addressee_id = ?1) AND f.status = 'accepted'
             ORDER BY f.updated_at DESC",
        )?;

        let friends = stmt
            .query_map([user_id.to_string()], map_friend_info)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(friends)
    }

    /// Pending requests waiting on this user
    pub fn list_incoming_requests(&self, user_id: &Uuid) -> Result<Vec<FriendInfo>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT u.id, u.username, p.display_name, p.photo_url, f.created_at
             FROM friendships f
             JOIN users u ON u.id = f.requester_id
             LEFT JOIN profiles p ON p.user_id = u.id
             WHERE f.addressee_id = ? AND f.status = 'pending'
             ORDER BY f.created_at DESC",
        )?;

        let requests = stmt
            .query_map([user_id.to_string()], map_friend_info)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(requests)
    }

    pub fn friend_count(&self, user_id: &Uuid) -> Result<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM friendships
             WHERE (requester_id = ?1 OR addressee_id = ?1) AND status = 'accepted'",
            [user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn map_friend_info(row: &rusqlite::Row<'_>) -> rusqlite::Result<FriendInfo> {
    Ok(FriendInfo {
        user_id: uuid_at(row, 0)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        photo_url: row.get(3)?,
        since: datetime_at(row, 4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::UserRepository;
    use crate::db::Database;

    fn setup() -> (FriendshipRepository, Uuid, Uuid, Uuid) {
        let db = Database::in_memory().expect("Failed to create test database");
        let users = UserRepository::new(db.pool.clone());
        let ana = users.create("ana", "ana@orkut.com", "h", None).unwrap().id;
        let bia = users.create("bia", "bia@orkut.com", "h", None).unwrap().id;
        let caio = users.create("caio", "caio@orkut.com", "h", None).unwrap().id;
        (FriendshipRepository::new(db.pool), ana, bia, caio)
    }

    #[test]
    fn test_request_then_accept() {
        let (repo, ana, bia, _) = setup();
        repo.create_request(&ana, &bia).unwrap();
        assert_eq!(repo.friend_count(&ana).unwrap(), 0);

        let incoming = repo.list_incoming_requests(&bia).unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].username, "ana");

        // only the addressee side matches
        assert!(!repo.respond(&bia, &ana, FriendshipStatus::Accepted).unwrap());
        assert!(repo.respond(&ana, &bia, FriendshipStatus::Accepted).unwrap());

        let friendship = repo.find_between(&bia, &ana).unwrap().unwrap();
        assert_eq!(friendship.status, FriendshipStatus::Accepted);
        assert_eq!(repo.friend_count(&ana).unwrap(), 1);
        assert_eq!(repo.list_friends(&bia).unwrap()[0].user_id, ana);
    }

    #[test]
    fn test_duplicate_request_rejected() {
        let (repo, ana, bia, _) = setup();
        repo.create_request(&ana, &bia).unwrap();
        assert!(repo.create_request(&ana, &bia).is_err());
    }

    #[test]
    fn test_declined_request_can_be_resent() {
        let (repo, ana, bia, _) = setup();
        repo.create_request(&ana, &bia).unwrap();
        repo.respond(&ana, &bia, FriendshipStatus::Declined).unwrap();

        repo.create_request(&ana, &bia).expect("re-request after decline");
        let friendship = repo.find_between(&ana, &bia).unwrap().unwrap();
        assert_eq!(friendship.status, FriendshipStatus::Pending);
    }

    #[test]
    fn test_list_and_remove_friends() {
        let (repo, ana, bia, caio) = setup();
        repo.create_request(&ana, &bia).unwrap();
        repo.respond(&ana, &bia, FriendshipStatus::Accepted).unwrap();
        repo.create_request(&caio, &ana).unwrap();
        repo.respond(&caio, &ana, FriendshipStatus::Accepted).unwrap();

        let mut ids: Vec<Uuid> = repo.list_friends(&ana).unwrap().iter().map(|f| f.user_id).collect();
        ids.sort();
        let mut expected = vec![bia, caio];
        expected.sort();
        assert_eq!(ids, expected);

        assert_eq!(repo.remove(&bia, &ana).unwrap(), 1);
        assert_eq!(repo.friend_count(&ana).unwrap(), 1);
        assert_eq!(repo.remove(&bia, &ana).unwrap(), 0);
    }

    #[test]
    fn test_self_friendship_rejected_by_schema() {
        let (repo, ana, _, _) = setup();
        assert!(repo.create_request(&ana, &ana).is_err());
    }
}
