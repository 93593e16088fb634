use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::{ApiError, ApiResult};
use orkut_types::*;

/// API client for communicating with the Orkut server
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client. `base_url` is the server root, without `/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Helper to add the bearer token to a request if available
    fn add_auth_header(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Helper to handle API responses
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> ApiResult<T> {
        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            return Ok(serde_json::from_str(&body)?);
        }
        Err(Self::error_for(status, response).await)
    }

    /// Like `handle_response` for endpoints answering 204 No Content
    async fn handle_empty(&self, response: reqwest::Response) -> ApiResult<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(Self::error_for(status, response).await)
    }

    async fn error_for(status: StatusCode, response: reqwest::Response) -> ApiError {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        // Prefer the message from the server's JSON error body
        let message = match serde_json::from_str::<ErrorResponse>(&error_text) {
            Ok(body) => body.message.unwrap_or(body.error),
            Err(_) if error_text.contains("<html>") || error_text.contains("<!DOCTYPE") => format!(
                "Server returned {} error. Please check the server URL.",
                status.as_u16()
            ),
            Err(_) => error_text,
        };

        match status {
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
            StatusCode::BAD_REQUEST => ApiError::BadRequest(message),
            StatusCode::CONFLICT => ApiError::Conflict(message),
            _ => ApiError::Api(format!("{} ({})", message, status.as_u16())),
        }
    }

    // Accounts

    /// Register and keep the returned token
    pub async fn register(&mut self, request: &RegisterRequest) -> ApiResult<AuthResponse> {
        let response = self.client.post(self.url("/register")).json(request).send().await?;
        let auth: AuthResponse = self.handle_response(response).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    /// Log in with a username or email and keep the returned token
    pub async fn login(&mut self, login: &str, password: &str) -> ApiResult<AuthResponse> {
        let request = LoginRequest {
            login: login.to_string(),
            password: password.to_string(),
        };
        let response = self.client.post(self.url("/login")).json(&request).send().await?;
        let auth: AuthResponse = self.handle_response(response).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    pub async fn logout(&mut self) -> ApiResult<()> {
        let req = self.add_auth_header(self.client.post(self.url("/logout")));
        let response = req.send().await?;
        self.handle_empty(response).await?;
        self.token = None;
        Ok(())
    }

    pub async fn me(&self) -> ApiResult<User> {
        let req = self.add_auth_header(self.client.get(self.url("/me")));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    // Profile

    /// Profile page of `user_id`, or of the signed-in user
    pub async fn get_profile(&self, user_id: Option<Uuid>) -> ApiResult<ProfileView> {
        let mut url = self.url("/profile");
        if let Some(id) = user_id {
            url.push_str(&format!("?user_id={}", id));
        }
        let req = self.add_auth_header(self.client.get(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    pub async fn update_profile(&self, request: &UpdateProfileRequest) -> ApiResult<ProfileView> {
        let req = self.add_auth_header(self.client.put(self.url("/profile")).json(request));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    pub async fn upload_photo(&self, request: &UploadPhotoRequest) -> ApiResult<UploadPhotoResponse> {
        let req = self.add_auth_header(self.client.post(self.url("/upload-photo")).json(request));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    // Posts

    /// Posts newest first: by `user_id` when given, otherwise the feed
    pub async fn get_posts(&self, user_id: Option<Uuid>, limit: Option<i64>) -> ApiResult<Vec<Post>> {
        let mut url = self.url("/posts");
        let mut params = vec![];

        if let Some(id) = user_id {
            params.push(format!("user_id={}", id));
        }
        if let Some(l) = limit {
            params.push(format!("limit={}", l));
        }

        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }

        let req = self.add_auth_header(self.client.get(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    pub async fn create_post(&self, content: &str) -> ApiResult<Post> {
        let request = CreatePostRequest {
            content: content.to_string(),
        };
        let req = self.add_auth_header(self.client.post(self.url("/posts")).json(&request));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    pub async fn delete_post(&self, post_id: Uuid) -> ApiResult<()> {
        let url = self.url(&format!("/posts/{}", post_id));
        let req = self.add_auth_header(self.client.delete(&url));
        let response = req.send().await?;
        self.handle_empty(response).await
    }

    pub async fn like_post(&self, post_id: Uuid) -> ApiResult<Post> {
        let url = self.url(&format!("/posts/{}/like", post_id));
        let req = self.add_auth_header(self.client.post(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    pub async fn unlike_post(&self, post_id: Uuid) -> ApiResult<Post> {
        let url = self.url(&format!("/posts/{}/like", post_id));
        let req = self.add_auth_header(self.client.delete(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    pub async fn get_comments(&self, post_id: Uuid) -> ApiResult<Vec<Comment>> {
        let url = self.url(&format!("/posts/{}/comments", post_id));
        let req = self.add_auth_header(self.client.get(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    pub async fn create_comment(&self, post_id: Uuid, content: &str) -> ApiResult<Comment> {
        let url = self.url(&format!("/posts/{}/comments", post_id));
        let request = CreateCommentRequest {
            content: content.to_string(),
        };
        let req = self.add_auth_header(self.client.post(&url).json(&request));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    // Scraps

    pub async fn get_scraps(&self, user_id: Uuid) -> ApiResult<Vec<Scrap>> {
        let url = self.url(&format!("/scraps?user_id={}", user_id));
        let req = self.add_auth_header(self.client.get(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    pub async fn create_scrap(&self, to_user_id: Uuid, content: &str) -> ApiResult<Scrap> {
        let request = CreateScrapRequest {
            to_user_id,
            content: content.to_string(),
        };
        let req = self.add_auth_header(self.client.post(self.url("/scraps")).json(&request));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    // Friends

    pub async fn get_friends(&self, user_id: Option<Uuid>) -> ApiResult<Vec<FriendInfo>> {
        let mut url = self.url("/friends");
        if let Some(id) = user_id {
            url.push_str(&format!("?user_id={}", id));
        }
        let req = self.add_auth_header(self.client.get(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    pub async fn get_friend_requests(&self) -> ApiResult<Vec<FriendInfo>> {
        let req = self.add_auth_header(self.client.get(self.url("/friends/requests")));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    pub async fn send_friend_request(&self, user_id: Uuid) -> ApiResult<Friendship> {
        let url = self.url(&format!("/friends/{}", user_id));
        let req = self.add_auth_header(self.client.post(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    pub async fn accept_friend_request(&self, user_id: Uuid) -> ApiResult<Friendship> {
        let url = self.url(&format!("/friends/{}/accept", user_id));
        let req = self.add_auth_header(self.client.post(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    pub async fn remove_friend(&self, user_id: Uuid) -> ApiResult<()> {
        let url = self.url(&format!("/friends/{}", user_id));
        let req = self.add_auth_header(self.client.delete(&url));
        let response = req.send().await?;
        self.handle_empty(response).await
    }

    // Communities

    pub async fn get_communities(&self) -> ApiResult<Vec<Community>> {
        let response = self.client.get(self.url("/communities")).send().await?;
        self.handle_response(response).await
    }

    pub async fn create_community(&self, request: &CreateCommunityRequest) -> ApiResult<Community> {
        let req = self.add_auth_header(self.client.post(self.url("/communities")).json(request));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    pub async fn join_community(&self, community_id: Uuid) -> ApiResult<Community> {
        let url = self.url(&format!("/communities/{}/join", community_id));
        let req = self.add_auth_header(self.client.post(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    pub async fn leave_community(&self, community_id: Uuid) -> ApiResult<()> {
        let url = self.url(&format!("/communities/{}/join", community_id));
        let req = self.add_auth_header(self.client.delete(&url));
        let response = req.send().await?;
        self.handle_empty(response).await
    }

    // Messages

    pub async fn get_conversations(&self) -> ApiResult<Vec<ConversationSummary>> {
        let req = self.add_auth_header(self.client.get(self.url("/messages")));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    pub async fn get_conversation(&self, user_id: Uuid) -> ApiResult<Vec<Message>> {
        let url = self.url(&format!("/messages/{}", user_id));
        let req = self.add_auth_header(self.client.get(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    pub async fn send_message(&self, to_user_id: Uuid, content: &str) -> ApiResult<Message> {
        let request = SendMessageRequest {
            to_user_id,
            content: content.to_string(),
        };
        let req = self.add_auth_header(self.client.post(self.url("/messages")).json(&request));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    // Search

    pub async fn search(&self, query: &str, kind: SearchKind) -> ApiResult<SearchResults> {
        let url = self.url(&format!(
            "/search?q={}&type={}",
            urlencoding::encode(query),
            kind.as_str()
        ));
        let response = self.client.get(&url).send().await?;
        self.handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_are_rooted_under_api() {
        let client = ApiClient::new("http://localhost:3000/");
        assert_eq!(client.base_url(), "http://localhost:3000");
        assert_eq!(client.url("/posts"), "http://localhost:3000/api/posts");
    }

    #[test]
    fn test_token_management() {
        let mut client = ApiClient::new("http://localhost:3000");
        assert!(client.token().is_none());
        client.set_token(Some("abc".to_string()));
        assert_eq!(client.token(), Some("abc"));
    }
}
