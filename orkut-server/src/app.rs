use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{api, rate_limit, rate_limit::RateLimiter, state::AppState};

/// Build the full HTTP application around `state`
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let rate_limiter = RateLimiter::new(
        state.settings.rate_limit.max_requests,
        state.settings.rate_limit.window_seconds,
    );

    // base64 inflates payloads by 4/3, plus room for the JSON envelope
    let upload_body_limit = state.settings.uploads.max_bytes / 3 * 4 + 64 * 1024;
    let uploads_dir = state.settings.uploads.dir.clone();

    let api = Router::new()
        // Accounts
        .route("/register", post(api::auth::register))
        .route("/login", post(api::auth::login))
        .route("/logout", post(api::auth::logout))
        .route("/me", get(api::auth::me))
        // Profile
        .route(
            "/profile",
            get(api::profile::get_profile)
                .post(api::profile::replace_profile)
                .put(api::profile::update_profile),
        )
        // Posts
        .route("/posts", get(api::posts::get_posts).post(api::posts::create_post))
        .route(
            "/posts/:id",
            get(api::posts::get_post)
                .put(api::posts::update_post)
                .delete(api::posts::delete_post),
        )
        .route(
            "/posts/:id/like",
            post(api::posts::like_post).delete(api::posts::unlike_post),
        )
        .route(
            "/posts/:id/comments",
            get(api::comments::get_comments).post(api::comments::create_comment),
        )
        .route("/comments/:id", delete(api::comments::delete_comment))
        // Scraps
        .route("/scraps", get(api::scraps::get_scraps).post(api::scraps::create_scrap))
        .route("/scraps/:id", delete(api::scraps::delete_scrap))
        // Friends
        .route("/friends", get(api::friends::list_friends))
        .route("/friends/requests", get(api::friends::list_requests))
        .route(
            "/friends/:user_id",
            post(api::friends::send_request).delete(api::friends::remove_friend),
        )
        .route("/friends/:user_id/accept", post(api::friends::accept_request))
        .route("/friends/:user_id/decline", post(api::friends::decline_request))
        // Communities
        .route(
            "/communities",
            get(api::communities::list_communities).post(api::communities::create_community),
        )
        .route(
            "/communities/:id",
            get(api::communities::get_community).delete(api::communities::delete_community),
        )
        .route(
            "/communities/:id/join",
            post(api::communities::join_community).delete(api::communities::leave_community),
        )
        .route("/communities/:id/members", get(api::communities::list_members))
        .route(
            "/communities/:id/members/:user_id",
            put(api::communities::update_member_role),
        )
        // Messages
        .route(
            "/messages",
            get(api::messages::get_conversations).post(api::messages::send_message),
        )
        .route(
            "/messages/:user_id",
            get(api::messages::get_conversation).delete(api::messages::delete_conversation),
        )
        .route("/messages/:user_id/read", post(api::messages::mark_read))
        // Search
        .route("/search", get(api::search::search))
        // Upload
        .route(
            "/upload-photo",
            post(api::upload::upload_photo).layer(DefaultBodyLimit::max(upload_body_limit)),
        );

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .with_state(state)
        .layer(middleware::from_fn(rate_limit::rate_limit_middleware))
        .layer(axum::Extension(rate_limiter))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn health_check() -> &'static str {
    "OK"
}
