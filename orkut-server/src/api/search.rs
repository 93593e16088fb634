use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    api::{ApiError, ApiResult},
    db::{
        page,
        repositories::{CommunityRepository, UserRepository},
    },
    state::AppState,
};
use orkut_types::{SearchKind, SearchResults};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/search?q=&type=users|communities|all&limit=
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<SearchResults>> {
    let q = query.q.as_deref().map(str::trim).unwrap_or_default();
    if q.is_empty() {
        return Err(ApiError::BadRequest("Search query cannot be empty".to_string()));
    }

    let kind = match query.kind.as_deref() {
        None => SearchKind::default(),
        Some(raw) => SearchKind::parse(raw).ok_or_else(|| {
            ApiError::BadRequest("type must be one of: users, communities, all".to_string())
        })?,
    };
    let (limit, _) = page(query.limit, None, 20);
    let limit = limit as usize;

    let pool = state.db.pool.clone();
    let mut results = SearchResults::default();

    if kind.includes_users() {
        let mut users = UserRepository::new(pool.clone()).search(q)?;
        rank_exact_first(&mut users, q, |u| u.username.as_str());
        users.truncate(limit);
        results.users = users;
    }

    if kind.includes_communities() {
        let mut communities = CommunityRepository::new(pool).search(q)?;
        rank_exact_first(&mut communities, q, |c| c.name.as_str());
        communities.truncate(limit);
        results.communities = communities;
    }

    Ok(Json(results))
}

/// Exact (case-insensitive) matches first, then alphabetical
fn rank_exact_first<T>(items: &mut [T], query: &str, key: impl Fn(&T) -> &str) {
    let query = query.to_lowercase();
    items.sort_by_cached_key(|item| {
        let name = key(item).to_lowercase();
        (name != query, name)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_comes_first() {
        let mut names = vec!["anabela", "Ana", "mariana", "banana"];
        rank_exact_first(&mut names, "ana", |n| *n);
        assert_eq!(names, vec!["Ana", "anabela", "banana", "mariana"]);
    }

    #[test]
    fn without_exact_match_order_is_alphabetical() {
        let mut names = vec!["Zeca", "beto", "Alberto"];
        rank_exact_first(&mut names, "bet", |n| *n);
        assert_eq!(names, vec!["Alberto", "beto", "Zeca"]);
    }
}
