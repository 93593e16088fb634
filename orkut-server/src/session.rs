use crate::db::Database;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims carried by every bearer token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Session id, the key into the `sessions` table
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and checks bearer tokens.
///
/// Tokens are HS256 JWTs, and every token's `jti` is also stored in the
/// `sessions` table. A token is only accepted while its row exists and has
/// not expired, so logging out revokes it even though the signature would
/// still verify.
#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl SessionManager {
    pub fn new(db: Database, secret: &str, lifetime_days: i64) -> Self {
        Self {
            db,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::days(lifetime_days),
        }
    }

    /// Create a new session for a user and return its signed token
    pub fn create_session(&self, user_id: Uuid) -> Result<String> {
        let token_id = Uuid::new_v4();
        let created_at = Utc::now();
        let expires_at = created_at + self.lifetime;

        let claims = Claims {
            sub: user_id.to_string(),
            jti: token_id.to_string(),
            iat: created_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("Failed to sign session token")?;

        let conn = self.db.connection()?;
        conn.execute(
            "INSERT INTO sessions (token_id, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                token_id.to_string(),
                user_id.to_string(),
                created_at.to_rfc3339(),
                expires_at.to_rfc3339(),
            ],
        )
        .context("Failed to create session")?;

        tracing::info!("Created session for user {}", user_id);
        Ok(token)
    }

    /// Validate a token and return the user it belongs to
    pub fn validate_session(&self, token: &str) -> Result<Uuid> {
        let claims = self.decode_claims(token)?;

        let conn = self.db.connection()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT user_id, expires_at FROM sessions WHERE token_id = ?1",
                rusqlite::params![claims.jti],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        drop(conn);

        let (user_id_str, expires_at_str) = row.context("Session not found")?;

        let expires_at = DateTime::parse_from_rfc3339(&expires_at_str)
            .context("Failed to parse expiry time")?
            .with_timezone(&Utc);

        if Utc::now() > expires_at {
            self.delete_session_by_id(&claims.jti)?;
            anyhow::bail!("Session has expired");
        }

        let user_id = Uuid::parse_str(&user_id_str).context("Failed to parse user ID")?;
        if user_id.to_string() != claims.sub {
            anyhow::bail!("Token subject does not match session");
        }

        Ok(user_id)
    }

    /// Delete the session behind a token (logout)
    pub fn delete_session(&self, token: &str) -> Result<()> {
        let claims = self.decode_claims(token)?;
        self.delete_session_by_id(&claims.jti)
    }

    fn delete_session_by_id(&self, token_id: &str) -> Result<()> {
        let conn = self.db.connection()?;
        let rows_affected = conn
            .execute(
                "DELETE FROM sessions WHERE token_id = ?1",
                rusqlite::params![token_id],
            )
            .context("Failed to delete session")?;

        if rows_affected > 0 {
            tracing::info!("Deleted session");
        }

        Ok(())
    }

    /// Remove every session past its expiry time. Returns how many were removed.
    pub fn cleanup_expired_sessions(&self) -> Result<usize> {
        let conn = self.db.connection()?;
        let now = Utc::now().to_rfc3339();

        let rows_affected = conn
            .execute(
                "DELETE FROM sessions WHERE expires_at < ?1",
                rusqlite::params![now],
            )
            .context("Failed to cleanup expired sessions")?;

        if rows_affected > 0 {
            tracing::info!("Cleaned up {} expired sessions", rows_affected);
        }

        Ok(rows_affected)
    }

    fn decode_claims(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .context("Invalid session token")?;
        Ok(data.claims)
    }
}
