use anyhow::{Context, Result};
use uuid::Uuid;

use orkut_types::{ConversationSummary, Message};

use crate::db::{datetime_at, uuid_at, DbPool};

pub struct MessageRepository {
    pool: DbPool,
}

impl MessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new private message
    pub fn create(&self, message: &Message) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO messages (id, from_user_id, to_user_id, content, created_at, is_read)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                message.id.to_string(),
                message.from_user_id.to_string(),
                message.to_user_id.to_string(),
                &message.content,
                message.created_at.to_rfc3339(),
                message.is_read,
            ),
        )
        .context("Failed to create message")?;
        Ok(())
    }

    /// Thread between two users as seen by `user_id`, oldest first.
    /// Messages the user deleted on their side are left out.
    pub fn conversation(&self, user_id: &Uuid, other_user_id: &Uuid) -> Result<Vec<Message>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT m.id, m.from_user_id, m.to_user_id, fu.username, tu.username,
                    m.content, m.created_at, m.is_read
             FROM messages m
             JOIN users fu ON fu.id = m.from_user_id
             JOIN users tu ON tu.id = m.to_user_id
             WHERE (m.from_user_id = ?1 AND m.to_user_id = ?2 AND m.deleted_by_sender = 0)
                OR (m.from_user_id = ?2 AND m.to_user_id = ?1 AND m.deleted_by_recipient = 0)
             ORDER BY m.created_at ASC",
        )?;

        let messages = stmt
            .query_map((user_id.to_string(), other_user_id.to_string()), |row| {
                Ok(Message {
                    id: uuid_at(row, 0)?,
                    from_user_id: uuid_at(row, 1)?,
                    to_user_id: uuid_at(row, 2)?,
                    from_username: row.get(3)?,
                    to_username: row.get(4)?,
                    content: row.get(5)?,
                    created_at: datetime_at(row, 6)?,
                    is_read: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(messages)
    }

    /// One entry per conversation partner, most recently active first
    pub fn conversation_summaries(&self, user_id: &Uuid) -> Result<Vec<ConversationSummary>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "WITH visible AS (
                SELECT m.*,
                       CASE WHEN m.from_user_id = ?1 THEN m.to_user_id ELSE m.from_user_id END AS other_id
                FROM messages m
                WHERE (m.from_user_id = ?1 AND m.deleted_by_sender = 0)
                   OR (m.to_user_id = ?1 AND m.deleted_by_recipient = 0)
             )
             SELECT v.other_id, u.username, v.content, v.created_at,
                    (SELECT COUNT(*) FROM visible w
                     WHERE w.other_id = v.other_id AND w.to_user_id = ?1 AND w.is_read = 0)
             FROM visible v
             JOIN users u ON u.id = v.other_id
             WHERE v.created_at = (SELECT MAX(w.created_at) FROM visible w WHERE w.other_id = v.other_id)
             GROUP BY v.other_id
             ORDER BY v.created_at DESC",
        )?;

        let summaries = stmt
            .query_map([user_id.to_string()], |row| {
                let unread: i64 = row.get(4)?;
                Ok(ConversationSummary {
                    other_user_id: uuid_at(row, 0)?,
                    other_username: row.get(1)?,
                    last_message: row.get(2)?,
                    last_message_at: datetime_at(row, 3)?,
                    unread_count: unread as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(summaries)
    }

    /// Mark everything `other_user_id` sent to `user_id` as read
    pub fn mark_as_read(&self, user_id: &Uuid, other_user_id: &Uuid) -> Result<usize> {
        let conn = self.pool.get()?;
        let rows = conn
            .execute(
                "UPDATE messages SET is_read = 1
                 WHERE to_user_id = ? AND from_user_id = ? AND is_read = 0 AND deleted_by_recipient = 0",
                (user_id.to_string(), other_user_id.to_string()),
            )
            .context("Failed to mark messages as read")?;
        Ok(rows)
    }

    /// Hide the thread from `user_id` only; the other side keeps its copy
    pub fn delete_conversation(&self, user_id: &Uuid, other_user_id: &Uuid) -> Result<usize> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        let sent = tx
            .execute(
                "UPDATE messages SET deleted_by_sender = 1
                 WHERE from_user_id = ? AND to_user_id = ? AND deleted_by_sender = 0",
                (user_id.to_string(), other_user_id.to_string()),
            )
            .context("Failed to mark sent messages as deleted")?;

        let received = tx
            .execute(
                "UPDATE messages SET deleted_by_recipient = 1
                 WHERE to_user_id = ? AND from_user_id = ? AND deleted_by_recipient = 0",
                (user_id.to_string(), other_user_id.to_string()),
            )
            .context("Failed to mark received messages as deleted")?;

        tx.commit()?;
        Ok(sent + received)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::UserRepository;
    use crate::db::Database;
    use chrono::{Duration, Utc};

    fn setup() -> (MessageRepository, Uuid, Uuid, Uuid) {
        let db = Database::in_memory().expect("Failed to create test database");
        let users = UserRepository::new(db.pool.clone());
        let ana = users.create("ana", "ana@orkut.com", "h", None).unwrap().id;
        let bia = users.create("bia", "bia@orkut.com", "h", None).unwrap().id;
        let caio = users.create("caio", "caio@orkut.com", "h", None).unwrap().id;
        (MessageRepository::new(db.pool), ana, bia, caio)
    }

    fn send(repo: &MessageRepository, from: Uuid, to: Uuid, content: &str, minutes_ago: i64) {
        repo.create(&Message {
            id: Uuid::new_v4(),
            from_user_id: from,
            to_user_id: to,
            from_username: String::new(),
            to_username: String::new(),
            content: content.to_string(),
            created_at: Utc::now() - Duration::minutes(minutes_ago),
            is_read: false,
        })
        .unwrap();
    }

    #[test]
    fn test_conversation_oldest_first() {
        let (repo, ana, bia, _) = setup();
        send(&repo, ana, bia, "oi", 3);
        send(&repo, bia, ana, "oiii", 2);
        send(&repo, ana, bia, "tudo bem?", 1);

        let thread = repo.conversation(&bia, &ana).unwrap();
        let contents: Vec<_> = thread.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["oi", "oiii", "tudo bem?"]);
        assert_eq!(thread[1].from_username, "bia");
        assert_eq!(thread[1].to_username, "ana");
    }

    #[test]
    fn test_summaries_and_unread() {
        let (repo, ana, bia, caio) = setup();
        send(&repo, bia, ana, "primeira", 10);
        send(&repo, bia, ana, "segunda", 9);
        send(&repo, caio, ana, "e aí", 5);
        send(&repo, ana, bia, "respondi", 1);

        let summaries = repo.conversation_summaries(&ana).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].other_username, "bia");
        assert_eq!(summaries[0].last_message, "respondi");
        assert_eq!(summaries[0].unread_count, 2);
        assert_eq!(summaries[1].other_user_id, caio);
        assert_eq!(summaries[1].unread_count, 1);

        assert_eq!(repo.mark_as_read(&ana, &bia).unwrap(), 2);
        let summaries = repo.conversation_summaries(&ana).unwrap();
        assert_eq!(summaries[0].unread_count, 0);
        assert_eq!(summaries[1].unread_count, 1);
        // sender side is untouched
        assert_eq!(repo.conversation_summaries(&bia).unwrap()[0].unread_count, 1);
    }

    #[test]
    fn test_soft_delete_is_one_sided() {
        let (repo, ana, bia, _) = setup();
        send(&repo, ana, bia, "segredo", 2);
        send(&repo, bia, ana, "ok", 1);

        assert_eq!(repo.delete_conversation(&ana, &bia).unwrap(), 2);
        assert!(repo.conversation(&ana, &bia).unwrap().is_empty());
        assert!(repo.conversation_summaries(&ana).unwrap().is_empty());
        assert_eq!(repo.conversation(&bia, &ana).unwrap().len(), 2);

        send(&repo, bia, ana, "voltei", 0);
        let thread = repo.conversation(&ana, &bia).unwrap();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].content, "voltei");
    }
}
