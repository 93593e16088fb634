// Integration tests for posts, scraps, friendships, communities, messages and search

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::TestApp;

fn strings(items: &Value, key: &str) -> Vec<String> {
    items
        .as_array()
        .expect("expected a JSON array")
        .iter()
        .map(|item| item[key].as_str().unwrap_or_default().to_string())
        .collect()
}

async fn befriend(app: &TestApp, (a_id, a): (&str, &str), (b_id, b): (&str, &str)) {
    let (status, _) = app.post(&format!("/api/friends/{}", b_id), Some(a), json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .post(&format!("/api/friends/{}/accept", a_id), Some(b), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_post_lifecycle() {
    let app = TestApp::new();
    let (_, ana) = app.register("ana").await;
    let (_, bia) = app.register("bia").await;

    let (status, post) = app
        .post("/api/posts", Some(&ana), json!({"content": "Voltei pro orkut!"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let post_id = post["id"].as_str().unwrap().to_string();
    assert_eq!(post["author_username"], "ana");
    assert_eq!(post["like_count"], 0);

    let (status, _) = app.post("/api/posts", Some(&ana), json!({"content": "   "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // liking twice counts once
    let like_uri = format!("/api/posts/{}/like", post_id);
    app.post(&like_uri, Some(&bia), json!({})).await;
    let (status, liked) = app.post(&like_uri, Some(&bia), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(liked["like_count"], 1);
    assert_eq!(liked["liked_by_me"], true);

    let (_, seen_by_author) = app.get(&format!("/api/posts/{}", post_id), Some(&ana)).await;
    assert_eq!(seen_by_author["like_count"], 1);
    assert_eq!(seen_by_author["liked_by_me"], false);

    let (_, unliked) = app.delete(&like_uri, Some(&bia)).await;
    assert_eq!(unliked["like_count"], 0);

    let post_uri = format!("/api/posts/{}", post_id);
    let (status, _) = app.put(&post_uri, Some(&bia), json!({"content": "hackeado"})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&post_uri, Some(&bia)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, edited) = app.put(&post_uri, Some(&ana), json!({"content": "Editado"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["content"], "Editado");

    let (status, _) = app.delete(&post_uri, Some(&ana)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&post_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/api/posts/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_feed_contains_own_and_friends_posts() {
    let app = TestApp::new();
    let (ana_id, ana) = app.register("ana").await;
    let (bia_id, bia) = app.register("bia").await;
    let (_, caio) = app.register("caio").await;
    befriend(&app, (&ana_id, &ana), (&bia_id, &bia)).await;

    app.post("/api/posts", Some(&ana), json!({"content": "post da ana"})).await;
    app.post("/api/posts", Some(&bia), json!({"content": "post da bia"})).await;
    app.post("/api/posts", Some(&caio), json!({"content": "post do caio"})).await;

    let (status, feed) = app.get("/api/posts", Some(&ana)).await;
    assert_eq!(status, StatusCode::OK);
    let mut contents = strings(&feed, "content");
    contents.sort();
    assert_eq!(contents, vec!["post da ana", "post da bia"]);

    let (_, everything) = app.get("/api/posts", None).await;
    assert_eq!(everything.as_array().unwrap().len(), 3);

    let (_, by_bia) = app.get(&format!("/api/posts?user_id={}", bia_id), None).await;
    assert_eq!(strings(&by_bia, "content"), vec!["post da bia"]);
}

#[tokio::test]
async fn test_comments() {
    let app = TestApp::new();
    let (_, ana) = app.register("ana").await;
    let (_, bia) = app.register("bia").await;
    let (_, caio) = app.register("caio").await;

    let (_, post) = app.post("/api/posts", Some(&ana), json!({"content": "Comentem"})).await;
    let comments_uri = format!("/api/posts/{}/comments", post["id"].as_str().unwrap());

    let (status, first) = app.post(&comments_uri, Some(&bia), json!({"content": "primeiro!"})).await;
    assert_eq!(status, StatusCode::CREATED);
    app.post(&comments_uri, Some(&caio), json!({"content": "segundo"})).await;

    let (_, listed) = app.get(&comments_uri, None).await;
    assert_eq!(listed.as_array().unwrap().len(), 2);

    let comment_uri = format!("/api/comments/{}", first["id"].as_str().unwrap());
    let (status, _) = app.delete(&comment_uri, Some(&caio)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // the post author may moderate the thread
    let (status, _) = app.delete(&comment_uri, Some(&ana)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, listed) = app.get(&comments_uri, None).await;
    assert_eq!(strings(&listed, "content"), vec!["segundo"]);

    let (status, _) = app
        .post(
            &format!("/api/posts/{}/comments", uuid::Uuid::new_v4()),
            Some(&bia),
            json!({"content": "oi"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_scraps() {
    let app = TestApp::new();
    let (ana_id, ana) = app.register("ana").await;
    let (_, bia) = app.register("bia").await;
    let (_, caio) = app.register("caio").await;

    let (status, scrap) = app
        .post("/api/scraps", Some(&bia), json!({"to_user_id": ana_id, "content": "Saudades!"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(scrap["from_username"], "bia");

    let (status, _) = app
        .post(
            "/api/scraps",
            Some(&bia),
            json!({"to_user_id": uuid::Uuid::new_v4(), "content": "alguém aí?"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, wall) = app.get(&format!("/api/scraps?user_id={}", ana_id), None).await;
    assert_eq!(strings(&wall, "content"), vec!["Saudades!"]);

    let (_, view) = app.get("/api/profile", Some(&ana)).await;
    assert_eq!(view["scrap_count"], 1);

    let scrap_uri = format!("/api/scraps/{}", scrap["id"].as_str().unwrap());
    let (status, _) = app.delete(&scrap_uri, Some(&caio)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&scrap_uri, Some(&ana)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, wall) = app.get("/api/scraps", Some(&ana)).await;
    assert!(wall.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_friend_requests() {
    let app = TestApp::new();
    let (ana_id, ana) = app.register("ana").await;
    let (bia_id, bia) = app.register("bia").await;
    let (caio_id, caio) = app.register("caio").await;

    let (status, _) = app.post(&format!("/api/friends/{}", ana_id), Some(&ana), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, request) = app.post(&format!("/api/friends/{}", bia_id), Some(&ana), json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(request["status"], "pending");

    let (status, _) = app.post(&format!("/api/friends/{}", bia_id), Some(&ana), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, view) = app.get(&format!("/api/profile?user_id={}", bia_id), Some(&ana)).await;
    assert_eq!(view["relationship"], "request_sent");

    let (_, incoming) = app.get("/api/friends/requests", Some(&bia)).await;
    assert_eq!(strings(&incoming, "username"), vec!["ana"]);

    // asking back accepts the waiting request
    let (status, accepted) = app.post(&format!("/api/friends/{}", ana_id), Some(&bia), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "accepted");

    let (status, _) = app.post(&format!("/api/friends/{}", ana_id), Some(&bia), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, friends) = app.get("/api/friends", Some(&ana)).await;
    assert_eq!(strings(&friends, "username"), vec!["bia"]);

    app.post(&format!("/api/friends/{}", caio_id), Some(&ana), json!({})).await;
    let (status, declined) = app
        .post(&format!("/api/friends/{}/decline", ana_id), Some(&caio), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(declined["status"], "declined");

    let (status, _) = app
        .post(&format!("/api/friends/{}/accept", ana_id), Some(&caio), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.delete(&format!("/api/friends/{}", bia_id), Some(&ana)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, friends) = app.get(&format!("/api/friends?user_id={}", bia_id), None).await;
    assert!(friends.as_array().unwrap().is_empty());

    let (status, _) = app.delete(&format!("/api/friends/{}", bia_id), Some(&ana)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_communities() {
    let app = TestApp::new();
    let (_, ana) = app.register("ana").await;
    let (bia_id, bia) = app.register("bia").await;

    let (status, community) = app
        .post(
            "/api/communities",
            Some(&ana),
            json!({"name": "Eu odeio acordar cedo", "category": "Humor"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = community["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .post("/api/communities", Some(&bia), json!({"name": "eu odeio ACORDAR cedo"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, joined) = app
        .post(&format!("/api/communities/{}/join", id), Some(&bia), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(joined["member_count"], 2);

    let (_, members) = app.get(&format!("/api/communities/{}/members", id), None).await;
    assert_eq!(strings(&members, "role"), vec!["admin", "member"]);

    // the only admin cannot walk away
    let (status, _) = app.delete(&format!("/api/communities/{}/join", id), Some(&ana)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.delete(&format!("/api/communities/{}", id), Some(&bia)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let role_uri = format!("/api/communities/{}/members/{}", id, bia_id);
    let (status, _) = app.put(&role_uri, Some(&bia), json!({"role": "admin"})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.put(&role_uri, Some(&ana), json!({"role": "king"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.put(&role_uri, Some(&ana), json!({"role": "admin"})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.delete(&format!("/api/communities/{}/join", id), Some(&ana)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, community) = app.get(&format!("/api/communities/{}", id), None).await;
    assert_eq!(community["member_count"], 1);

    let (status, _) = app.delete(&format!("/api/communities/{}", id), Some(&bia)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/api/communities/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_messages() {
    let app = TestApp::new();
    let (ana_id, ana) = app.register("ana").await;
    let (bia_id, bia) = app.register("bia").await;

    let (status, _) = app
        .post("/api/messages", Some(&ana), json!({"to_user_id": ana_id, "content": "eu"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for content in ["oi bia", "tudo bem?"] {
        let (status, _) = app
            .post("/api/messages", Some(&ana), json!({"to_user_id": bia_id, "content": content}))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, inbox) = app.get("/api/messages", Some(&bia)).await;
    assert_eq!(inbox.as_array().unwrap().len(), 1);
    assert_eq!(inbox[0]["other_username"], "ana");
    assert_eq!(inbox[0]["unread_count"], 2);

    let (status, thread) = app.get(&format!("/api/messages/{}", ana_id), Some(&bia)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(thread.as_array().unwrap().len(), 2);

    // opening the thread marks it read
    let (_, inbox) = app.get("/api/messages", Some(&bia)).await;
    assert_eq!(inbox[0]["unread_count"], 0);

    let (status, _) = app
        .post(&format!("/api/messages/{}/read", ana_id), Some(&bia), json!({}))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // deleting hides the thread for bia only
    let (status, _) = app.delete(&format!("/api/messages/{}", ana_id), Some(&bia)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, inbox) = app.get("/api/messages", Some(&bia)).await;
    assert!(inbox.as_array().unwrap().is_empty());
    let (_, thread) = app.get(&format!("/api/messages/{}", bia_id), Some(&ana)).await;
    assert_eq!(thread.as_array().unwrap().len(), 2);

    let (status, _) = app
        .get(&format!("/api/messages/{}", uuid::Uuid::new_v4()), Some(&ana))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search() {
    let app = TestApp::new();
    let (_, ana) = app.register("anabela").await;
    app.register("ana").await;
    app.register("mariana").await;
    app.post("/api/communities", Some(&ana), json!({"name": "Fãs de Ana Maria"}))
        .await;

    let (status, _) = app.get("/api/search?q=%20%20", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/api/search?q=ana&type=photos", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, results) = app.get("/api/search?q=ANA", None).await;
    assert_eq!(status, StatusCode::OK);
    let users = strings(&results["users"], "username");
    assert_eq!(users.len(), 3);
    assert_eq!(users[0], "ana");
    assert_eq!(strings(&results["communities"], "name"), vec!["Fãs de Ana Maria"]);

    let (_, results) = app.get("/api/search?q=ana&type=users&limit=1", None).await;
    assert_eq!(strings(&results["users"], "username"), vec!["ana"]);
    assert!(results["communities"].as_array().unwrap().is_empty());
}
