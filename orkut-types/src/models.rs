use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::{CommunityRole, FriendshipStatus, Relationship};

// RFC3339 strings on the wire for every timestamp
mod datetime_format {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = date.to_rfc3339();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<DateTime<Utc>>().map_err(serde::de::Error::custom)
    }
}

/// Public account record. The password hash never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    #[serde(default)]
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    /// `YYYY-MM-DD`
    pub birthday: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub relationship_status: Option<String>,
    pub interests: Option<String>,
    pub photo_url: Option<String>,
    /// Fallback avatar background, derived from the username
    #[serde(default)]
    pub avatar_color: String,
    #[serde(with = "datetime_format")]
    pub updated_at: DateTime<Utc>,
}

/// Profile page payload: the profile plus counters and the viewer's relationship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub profile: Profile,
    pub friend_count: usize,
    pub scrap_count: usize,
    pub post_count: usize,
    pub relationship: Relationship,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friendship {
    pub requester_id: Uuid,
    pub addressee_id: Uuid,
    pub status: FriendshipStatus,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "datetime_format")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendInfo {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    #[serde(with = "datetime_format")]
    pub since: DateTime<Utc>,
}

/// A wall post left by one user on another user's profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scrap {
    pub id: Uuid,
    pub from_user_id: Uuid,
    #[serde(default)]
    pub from_username: String,
    pub to_user_id: Uuid,
    pub content: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

/// Status update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub content: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "datetime_format")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub comment_count: i64,
    /// Whether the authenticated viewer liked this post
    #[serde(default)]
    pub liked_by_me: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    #[serde(default)]
    pub author_username: String,
    pub content: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Community {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub owner_id: Uuid,
    #[serde(default)]
    pub member_count: i64,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityMember {
    pub community_id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub username: String,
    pub role: CommunityRole,
    #[serde(with = "datetime_format")]
    pub joined_at: DateTime<Utc>,
}

/// Private message between two users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    #[serde(default)]
    pub from_username: String,
    #[serde(default)]
    pub to_username: String,
    pub content: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub other_user_id: Uuid,
    pub other_username: String,
    pub last_message: String,
    #[serde(with = "datetime_format")]
    pub last_message_at: DateTime<Utc>,
    pub unread_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upload {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub url: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSearchResult {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunitySearchResult {
    pub id: Uuid,
    pub name: String,
    pub member_count: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub users: Vec<UserSearchResult>,
    pub communities: Vec<CommunitySearchResult>,
}

// Request/Response types for API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Email address or username
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interests: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePostRequest {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateScrapRequest {
    pub to_user_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommunityRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMemberRoleRequest {
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub to_user_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadPhotoRequest {
    pub file_name: String,
    pub content_type: String,
    /// Base64 payload, optionally prefixed as a `data:` URL
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadPhotoResponse {
    pub upload: Upload,
    pub photo_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_profile_request_omits_absent_fields() {
        let req = UpdateProfileRequest {
            bio: Some("saudades".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({ "bio": "saudades" }));
    }

    #[test]
    fn timestamps_are_rfc3339_strings() {
        let scrap = Scrap {
            id: Uuid::new_v4(),
            from_user_id: Uuid::new_v4(),
            from_username: "ana".to_string(),
            to_user_id: Uuid::new_v4(),
            content: "oi!".to_string(),
            created_at: "2004-01-24T10:00:00Z".parse().unwrap(),
        };
        let json = serde_json::to_value(&scrap).unwrap();
        assert_eq!(json["created_at"], "2004-01-24T10:00:00+00:00");

        let back: Scrap = serde_json::from_value(json).unwrap();
        assert_eq!(back.created_at, scrap.created_at);
    }

    #[test]
    fn profile_view_flattens_profile_fields() {
        let view = ProfileView {
            profile: Profile {
                user_id: Uuid::nil(),
                username: "ana".to_string(),
                display_name: Some("Ana".to_string()),
                bio: None,
                birthday: None,
                city: None,
                country: Some("Brasil".to_string()),
                relationship_status: None,
                interests: None,
                photo_url: None,
                avatar_color: "#e91e63".to_string(),
                updated_at: Utc::now(),
            },
            friend_count: 3,
            scrap_count: 1,
            post_count: 0,
            relationship: Relationship::Friends,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["username"], "ana");
        assert_eq!(json["friend_count"], 3);
        assert_eq!(json["relationship"], "friends");
    }
}
