use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use uuid::Uuid;

use orkut_types::{Community, FriendshipStatus, Post, Scrap, UpdateProfileRequest};

use super::repositories::{
    CommunityRepository, FriendshipRepository, PostRepository, ProfileRepository, ScrapRepository,
    UserRepository,
};
use super::Database;
use crate::password::hash_password;

/// Password shared by every demo account
pub const DEMO_PASSWORD: &str = "orkut123";

/// (username, display name, city, relationship status)
const DEMO_USERS: &[(&str, &str, &str, &str)] = &[
    ("ana", "Ana Paula", "Porto Alegre", "single"),
    ("bia", "Beatriz", "São Paulo", "it's complicated"),
    ("caio", "Caio", "Recife", "married"),
    ("duda", "Maria Eduarda", "Belo Horizonte", "committed"),
    ("edu", "Eduardo", "Curitiba", "single"),
];

/// What a seeding run created
#[derive(Debug, Default, PartialEq)]
pub struct SeedSummary {
    pub users: usize,
    pub friendships: usize,
    pub scraps: usize,
    pub posts: usize,
    pub communities: usize,
}

impl Database {
    /// Populate demo accounts and some activity. Does nothing if they already exist.
    ///
    /// All or nothing: when a step fails, the accounts created so far are
    /// deleted again, taking every row they own with them.
    pub fn seed_demo_data(&self) -> Result<SeedSummary> {
        let users = UserRepository::new(self.pool.clone());
        if users.get_by_username(DEMO_USERS[0].0)?.is_some() {
            tracing::info!("Demo data already present, skipping seed");
            return Ok(SeedSummary::default());
        }

        let mut ids = Vec::with_capacity(DEMO_USERS.len());
        match self.insert_demo_data(&mut ids) {
            Ok(summary) => {
                tracing::info!("Seeded demo data: {:?}", summary);
                Ok(summary)
            }
            Err(e) => {
                tracing::warn!("Seeding failed, removing {} partial demo users", ids.len());
                self.remove_users(&ids)?;
                Err(e)
            }
        }
    }

    fn remove_users(&self, ids: &[Uuid]) -> Result<()> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        for id in ids {
            tx.execute("DELETE FROM users WHERE id = ?", [id.to_string()])
                .context("Failed to remove partial demo user")?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Create the demo rows, pushing each new user id into `ids` as it goes
    fn insert_demo_data(&self, ids: &mut Vec<Uuid>) -> Result<SeedSummary> {
        let pool = self.pool.clone();
        let users = UserRepository::new(pool.clone());
        let mut summary = SeedSummary::default();

        let password_hash = hash_password(DEMO_PASSWORD)?;
        let profiles = ProfileRepository::new(pool.clone());

        for (username, display_name, city, status) in DEMO_USERS {
            let user = users.create(
                username,
                &format!("{}@orkut.com", username),
                &password_hash,
                Some(*display_name),
            )?;
            ids.push(user.id);
            profiles.update(
                &user.id,
                &UpdateProfileRequest {
                    city: Some(city.to_string()),
                    country: Some("Brasil".to_string()),
                    relationship_status: Some(status.to_string()),
                    ..Default::default()
                },
            )?;
            summary.users += 1;
        }

        let friendships = FriendshipRepository::new(pool.clone());
        for (a, b) in [(0, 1), (0, 2), (1, 3), (2, 4)] {
            friendships.create_request(&ids[a], &ids[b])?;
            friendships.respond(&ids[a], &ids[b], FriendshipStatus::Accepted)?;
            summary.friendships += 1;
        }
        // one request left waiting
        friendships.create_request(&ids[3], &ids[0])?;
        summary.friendships += 1;

        let now = Utc::now();
        let scraps = ScrapRepository::new(pool.clone());
        for (i, (from, to, content)) in [
            (1, 0, "Saudades de você!! Passa aqui no meu perfil :)"),
            (2, 0, "Feliz aniversário! Tudo de bom pra você"),
            (0, 1, "Oi sumida! Bora marcar aquele café?"),
        ]
        .iter()
        .enumerate()
        {
            scraps.create(&Scrap {
                id: Uuid::new_v4(),
                from_user_id: ids[*from],
                from_username: String::new(),
                to_user_id: ids[*to],
                content: content.to_string(),
                created_at: now - Duration::minutes(30 - i as i64),
            })?;
            summary.scraps += 1;
        }

        let posts = PostRepository::new(pool.clone());
        for (i, (author, content)) in [
            (0, "Voltei pro orkut! Quem lembra das comunidades?"),
            (1, "Alguém sabe como muda o tema do perfil?"),
            (4, "Depoimento não é scrap, gente."),
        ]
        .iter()
        .enumerate()
        {
            let at = now - Duration::minutes(20 - i as i64);
            posts.create(&Post {
                id: Uuid::new_v4(),
                author_id: ids[*author],
                author_username: String::new(),
                content: content.to_string(),
                created_at: at,
                updated_at: at,
                like_count: 0,
                comment_count: 0,
                liked_by_me: false,
            })?;
            summary.posts += 1;
        }

        let communities = CommunityRepository::new(pool);
        let community = Community {
            id: Uuid::new_v4(),
            name: "Eu odeio acordar cedo".to_string(),
            description: Some("Para quem sofre toda manhã".to_string()),
            category: Some("Humor".to_string()),
            owner_id: ids[0],
            member_count: 0,
            created_at: now,
        };
        communities.create(&community)?;
        for member in &ids[1..] {
            communities.join(&community.id, member)?;
        }
        summary.communities += 1;

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::verify_password;

    #[test]
    fn test_seed_demo_data() {
        let db = Database::in_memory().expect("Failed to create database");
        let summary = db.seed_demo_data().expect("Failed to seed demo data");

        assert_eq!(summary.users, DEMO_USERS.len());
        assert_eq!(summary.communities, 1);

        let (_, hash) = UserRepository::new(db.pool.clone())
            .get_credentials("ana@orkut.com")
            .unwrap()
            .expect("demo user exists");
        assert!(verify_password(DEMO_PASSWORD, &hash));

        let counts = db.table_counts().unwrap();
        let members = counts
            .iter()
            .find(|(table, _)| *table == "community_members")
            .map(|(_, count)| *count);
        assert_eq!(members, Some(DEMO_USERS.len() as i64));
    }

    #[test]
    fn test_seed_is_idempotent() {
        let db = Database::in_memory().unwrap();
        db.seed_demo_data().unwrap();
        let second = db.seed_demo_data().unwrap();
        assert_eq!(second, SeedSummary::default());
    }

    #[test]
    fn test_failed_seed_leaves_nothing_behind() {
        let db = Database::in_memory().unwrap();
        let users = UserRepository::new(db.pool.clone());
        // a real account holding one of the demo usernames stops the run halfway
        let duda = users.create("duda", "duda@example.com", "h", None).unwrap();

        assert!(db.seed_demo_data().is_err());
        assert!(users.get_by_username("ana").unwrap().is_none());
        assert!(users.get_by_username("duda").unwrap().is_some());

        let counts = db.table_counts().unwrap();
        let count = |name: &str| counts.iter().find(|(t, _)| *t == name).map(|(_, c)| *c);
        assert_eq!(count("users"), Some(1));
        assert_eq!(count("profiles"), Some(1));

        // once the clash is gone a fresh run completes
        db.connection()
            .unwrap()
            .execute("DELETE FROM users WHERE id = ?", [duda.id.to_string()])
            .unwrap();
        let summary = db.seed_demo_data().unwrap();
        assert_eq!(summary.users, DEMO_USERS.len());
    }
}
