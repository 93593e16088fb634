use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Declined,
}

impl FriendshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendshipStatus::Pending => "pending",
            FriendshipStatus::Accepted => "accepted",
            FriendshipStatus::Declined => "declined",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(FriendshipStatus::Pending),
            "accepted" => Some(FriendshipStatus::Accepted),
            "declined" => Some(FriendshipStatus::Declined),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommunityRole {
    #[default]
    Member,
    Admin,
    Moderator,
}

impl CommunityRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommunityRole::Member => "member",
            CommunityRole::Admin => "admin",
            CommunityRole::Moderator => "moderator",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "member" => Some(CommunityRole::Member),
            "admin" => Some(CommunityRole::Admin),
            "moderator" => Some(CommunityRole::Moderator),
            _ => None,
        }
    }
}

/// What the viewer is to the profile owner, from the viewer's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    #[serde(rename = "self")]
    Self_,
    Friends,
    RequestSent,
    RequestReceived,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Users,
    Communities,
    #[default]
    All,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Users => "users",
            SearchKind::Communities => "communities",
            SearchKind::All => "all",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "users" => Some(SearchKind::Users),
            "communities" => Some(SearchKind::Communities),
            "all" => Some(SearchKind::All),
            _ => None,
        }
    }

    pub fn includes_users(&self) -> bool {
        matches!(self, SearchKind::Users | SearchKind::All)
    }

    pub fn includes_communities(&self) -> bool {
        matches!(self, SearchKind::Communities | SearchKind::All)
    }
}

/// Relationship statuses a profile may advertise.
pub const RELATIONSHIP_STATUSES: &[&str] = &[
    "single",
    "committed",
    "married",
    "open marriage",
    "open relationship",
    "it's complicated",
];
