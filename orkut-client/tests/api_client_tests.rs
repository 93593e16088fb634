// ApiClient against a real orkut-server listening on a local port

use tempfile::TempDir;
use uuid::Uuid;

use orkut_client::{ApiClient, ApiError, LocalStore, PendingOp, SaveOutcome, SmartSave, SyncTransport};
use orkut_server::{app::build_router, config::Settings, db::Database, state::AppState};
use orkut_types::{RegisterRequest, SearchKind};

struct TestServer {
    base_url: String,
    uploads: TempDir,
}

async fn spawn_server() -> TestServer {
    let uploads = TempDir::new().unwrap();
    let mut settings = Settings::default_settings().unwrap();
    settings.uploads.dir = uploads.path().to_string_lossy().into_owned();

    let db = Database::in_memory().unwrap();
    let router = build_router(AppState::new(db, settings));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{}", addr),
        uploads,
    }
}

fn registration(username: &str) -> RegisterRequest {
    RegisterRequest {
        username: username.to_string(),
        email: format!("{}@orkut.com", username),
        password: "orkut123".to_string(),
        display_name: Some(format!("{} da Silva", username)),
    }
}

#[tokio::test]
async fn test_register_post_and_delete_through_push() {
    let server = spawn_server().await;
    let mut client = ApiClient::new(&server.base_url);

    let auth = client.register(&registration("ana")).await.unwrap();
    assert_eq!(client.token(), Some(auth.token.as_str()));
    assert_eq!(client.me().await.unwrap().id, auth.user.id);

    let post = client.create_post("Voltei pro orkut!").await.unwrap();
    assert_eq!(post.author_id, auth.user.id);

    let posts = client.get_posts(Some(auth.user.id), Some(10)).await.unwrap();
    assert_eq!(posts.len(), 1);

    // 204 No Content through the sync transport
    client
        .push(&PendingOp::DeletePost { post_id: post.id })
        .await
        .unwrap();
    assert!(client.get_posts(Some(auth.user.id), None).await.unwrap().is_empty());

    let err = client
        .push(&PendingOp::DeletePost { post_id: post.id })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)), "{:?}", err);
}

#[tokio::test]
async fn test_error_statuses_map_to_variants() {
    let server = spawn_server().await;
    let mut client = ApiClient::new(&server.base_url);
    client.register(&registration("ana")).await.unwrap();

    let mut other = ApiClient::new(&server.base_url);
    match other.register(&registration("ana")).await {
        Err(ApiError::Conflict(message)) => assert!(!message.is_empty()),
        other => panic!("expected a conflict, got {:?}", other),
    }

    let err = client.delete_post(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)), "{:?}", err);

    let err = client.create_post("   ").await.unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)), "{:?}", err);

    let err = other.me().await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)), "{:?}", err);

    client.logout().await.unwrap();
    assert!(client.token().is_none());
    client.set_token(Some("stale".to_string()));
    let err = client.me().await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)), "{:?}", err);
}

#[tokio::test]
async fn test_query_strings_reach_the_server() {
    let server = spawn_server().await;
    let mut ana = ApiClient::new(&server.base_url);
    let ana_id = ana.register(&registration("ana")).await.unwrap().user.id;
    let mut bia = ApiClient::new(&server.base_url);
    bia.register(&registration("bia")).await.unwrap();

    bia.create_scrap(ana_id, "Saudades!").await.unwrap();
    let wall = bia.get_scraps(ana_id).await.unwrap();
    assert_eq!(wall.len(), 1);
    assert_eq!(wall[0].content, "Saudades!");

    // spaces in the query must be encoded
    let results = bia.search("ana da", SearchKind::Users).await.unwrap();
    assert_eq!(results.users.len(), 1);
    assert_eq!(results.users[0].id, ana_id);
    assert!(results.communities.is_empty());

    let profile = bia.get_profile(Some(ana_id)).await.unwrap();
    assert_eq!(profile.profile.username, "ana");
}

#[tokio::test]
async fn test_unexpected_body_is_serialization_error() {
    let server = spawn_server().await;
    // a static file standing where the client expects a JSON list
    std::fs::create_dir_all(server.uploads.path().join("api")).unwrap();
    std::fs::write(server.uploads.path().join("api").join("communities"), "not json").unwrap();

    let client = ApiClient::new(format!("{}/uploads", server.base_url));
    let err = client.get_communities().await.unwrap_err();
    assert!(matches!(err, ApiError::Serialization(_)), "{:?}", err);
}

#[tokio::test]
async fn test_smart_save_delivers_through_api_client() {
    let server = spawn_server().await;
    let mut client = ApiClient::new(&server.base_url);
    let ana_id = client.register(&registration("ana")).await.unwrap().user.id;

    let temp_dir = TempDir::new().unwrap();
    let smart_save = SmartSave::new(client, LocalStore::at(temp_dir.path().join("smartsave.json"))).unwrap();

    let outcome = smart_save
        .save(PendingOp::CreatePost {
            content: "Postado pelo SmartSave".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(outcome, SaveOutcome::Synced);
    assert!(smart_save.pending().await.is_empty());

    let posts = smart_save.transport().get_posts(Some(ana_id), None).await.unwrap();
    assert_eq!(posts[0].content, "Postado pelo SmartSave");
}
