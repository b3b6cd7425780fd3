//! End-to-end HTTP tests over the full app: guard, store, mutation API and
//! broadcast hub wired the same way the binary wires them.

use actix::Actor;
use actix_web::web::Data;
use actix_web::{App, test};
use chrono::Utc;
use serde_json::{Value, json};

use huddle::auth;
use huddle::config::Config;
use huddle::db::Db;
use huddle::models::TOMBSTONE;
use huddle::routes;
use huddle::ws::server::BroadcastHub;

fn test_config() -> Config {
    Config {
        jwt_secret: Some("test-secret".into()),
        ..Config::default()
    }
}

async fn seed_world(db: &Db) {
    let now = Utc::now();
    sqlx::query("INSERT INTO servers(id, name, created_at) VALUES ('srv', 'srv', ?)")
        .bind(now)
        .execute(&db.0)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO channels(id, server_id, name, kind, created_at) VALUES ('general', 'srv', 'general', 'text', ?)",
    )
    .bind(now)
    .execute(&db.0)
    .await
    .unwrap();
}

async fn seed_member(db: &Db, member_id: &str, profile_id: &str, role: &str) {
    sqlx::query(
        "INSERT INTO members(id, profile_id, server_id, role, created_at) VALUES (?, ?, 'srv', ?, ?)",
    )
    .bind(member_id)
    .bind(profile_id)
    .bind(role)
    .bind(Utc::now())
    .execute(&db.0)
    .await
    .unwrap();
}

macro_rules! spawn_app {
    ($cfg:expr, $db:expr) => {{
        let hub = BroadcastHub::new().start();
        test::init_service(
            App::new()
                .app_data(Data::new($cfg.clone()))
                .app_data(Data::new($db.clone()))
                .app_data(Data::new(hub))
                .configure(routes::configure),
        )
        .await
    }};
}

fn bearer(cfg: &Config, profile_id: &str) -> String {
    format!("Bearer {}", auth::create_access_token(profile_id, cfg).unwrap())
}

#[actix_web::test]
async fn message_lifecycle_roundtrip() {
    let cfg = test_config();
    let db = Db::connect_in_memory().await.unwrap();
    seed_world(&db).await;
    seed_member(&db, "mem-alice", "alice", "guest").await;
    let app = spawn_app!(cfg, db);
    let token = bearer(&cfg, "alice");

    // Create.
    let req = test::TestRequest::post()
        .uri("/api/servers/srv/channels/general/messages")
        .insert_header(("Authorization", token.clone()))
        .set_json(json!({ "content": "hi" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["content"], "hi");
    assert_eq!(created["deleted"], false);
    let msg_id = created["id"].as_str().unwrap().to_string();

    // Page shows it.
    let req = test::TestRequest::get()
        .uri("/api/servers/srv/channels/general/messages?limit=10")
        .insert_header(("Authorization", token.clone()))
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["items"][0]["id"], msg_id.as_str());
    assert!(page["next_cursor"].is_null());

    // Edit.
    let req = test::TestRequest::patch()
        .uri(&format!("/api/messages/{msg_id}"))
        .insert_header(("Authorization", token.clone()))
        .set_json(json!({ "content": "hi there" }))
        .to_request();
    let edited: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(edited["content"], "hi there");
    let created_at = edited["created_at"].as_str().unwrap();
    let updated_at = edited["updated_at"].as_str().unwrap();
    assert!(updated_at > created_at);

    // Page reflects the edit.
    let req = test::TestRequest::get()
        .uri("/api/servers/srv/channels/general/messages")
        .insert_header(("Authorization", token.clone()))
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["items"][0]["content"], "hi there");

    // Delete tombstones, the entry stays in the sequence.
    let req = test::TestRequest::delete()
        .uri(&format!("/api/messages/{msg_id}"))
        .insert_header(("Authorization", token.clone()))
        .to_request();
    let deleted: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(deleted["deleted"], true);
    assert_eq!(deleted["content"], TOMBSTONE);

    let req = test::TestRequest::get()
        .uri("/api/servers/srv/channels/general/messages")
        .insert_header(("Authorization", token))
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    let items = page["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], msg_id.as_str());
    assert_eq!(items[0]["content"], TOMBSTONE);
    assert!(items[0]["file_url"].is_null());
}

#[actix_web::test]
async fn missing_or_bad_token_is_401() {
    let cfg = test_config();
    let db = Db::connect_in_memory().await.unwrap();
    seed_world(&db).await;
    let app = spawn_app!(cfg, db);

    let req = test::TestRequest::post()
        .uri("/api/servers/srv/channels/general/messages")
        .set_json(json!({ "content": "hi" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let req = test::TestRequest::post()
        .uri("/api/servers/srv/channels/general/messages")
        .insert_header(("Authorization", "Bearer not-a-token"))
        .set_json(json!({ "content": "hi" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn non_member_gets_404() {
    let cfg = test_config();
    let db = Db::connect_in_memory().await.unwrap();
    seed_world(&db).await;
    let app = spawn_app!(cfg, db);

    // Identity resolves, but there is no membership on the server.
    let req = test::TestRequest::post()
        .uri("/api/servers/srv/channels/general/messages")
        .insert_header(("Authorization", bearer(&cfg, "stranger")))
        .set_json(json!({ "content": "hi" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn channel_must_belong_to_the_guarded_server() {
    let cfg = test_config();
    let db = Db::connect_in_memory().await.unwrap();
    seed_world(&db).await;
    seed_member(&db, "mem-alice", "alice", "guest").await;

    // A second server with its own channel and member.
    let now = Utc::now();
    sqlx::query("INSERT INTO servers(id, name, created_at) VALUES ('srv2', 'srv2', ?)")
        .bind(now)
        .execute(&db.0)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO channels(id, server_id, name, kind, created_at) VALUES ('lounge', 'srv2', 'lounge', 'text', ?)",
    )
    .bind(now)
    .execute(&db.0)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO members(id, profile_id, server_id, role, created_at) VALUES ('mem-mallory', 'mallory', 'srv2', 'guest', ?)",
    )
    .bind(now)
    .execute(&db.0)
    .await
    .unwrap();

    let app = spawn_app!(cfg, db);

    // Alice writes in her own channel.
    let req = test::TestRequest::post()
        .uri("/api/servers/srv/channels/general/messages")
        .insert_header(("Authorization", bearer(&cfg, "alice")))
        .set_json(json!({ "content": "private stuff" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    // A member of srv2 cannot page srv's channel through their own server.
    let req = test::TestRequest::get()
        .uri("/api/servers/srv2/channels/general/messages")
        .insert_header(("Authorization", bearer(&cfg, "mallory")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    // Nor post into it.
    let req = test::TestRequest::post()
        .uri("/api/servers/srv2/channels/general/messages")
        .insert_header(("Authorization", bearer(&cfg, "mallory")))
        .set_json(json!({ "content": "hello from next door" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    // A channel that exists nowhere is 404, not an empty page.
    let req = test::TestRequest::get()
        .uri("/api/servers/srv/channels/no-such-channel/messages")
        .insert_header(("Authorization", bearer(&cfg, "alice")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
async fn empty_message_is_400() {
    let cfg = test_config();
    let db = Db::connect_in_memory().await.unwrap();
    seed_world(&db).await;
    seed_member(&db, "mem-alice", "alice", "guest").await;
    let app = spawn_app!(cfg, db);

    let req = test::TestRequest::post()
        .uri("/api/servers/srv/channels/general/messages")
        .insert_header(("Authorization", bearer(&cfg, "alice")))
        .set_json(json!({ "content": "   " }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    // Attachment alone passes validation.
    let req = test::TestRequest::post()
        .uri("/api/servers/srv/channels/general/messages")
        .insert_header(("Authorization", bearer(&cfg, "alice")))
        .set_json(json!({ "file_url": "/f/cat.png" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
async fn mutation_authorization_over_http() {
    let cfg = test_config();
    let db = Db::connect_in_memory().await.unwrap();
    seed_world(&db).await;
    seed_member(&db, "mem-alice", "alice", "guest").await;
    seed_member(&db, "mem-bob", "bob", "guest").await;
    seed_member(&db, "mem-carol", "carol", "admin").await;
    let app = spawn_app!(cfg, db);

    let req = test::TestRequest::post()
        .uri("/api/servers/srv/channels/general/messages")
        .insert_header(("Authorization", bearer(&cfg, "alice")))
        .set_json(json!({ "content": "mine" }))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let msg_id = created["id"].as_str().unwrap().to_string();

    // Guest non-author: 403 on edit and delete.
    let req = test::TestRequest::patch()
        .uri(&format!("/api/messages/{msg_id}"))
        .insert_header(("Authorization", bearer(&cfg, "bob")))
        .set_json(json!({ "content": "hijack" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);
    let req = test::TestRequest::delete()
        .uri(&format!("/api/messages/{msg_id}"))
        .insert_header(("Authorization", bearer(&cfg, "bob")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    // Admin non-author: allowed.
    let req = test::TestRequest::delete()
        .uri(&format!("/api/messages/{msg_id}"))
        .insert_header(("Authorization", bearer(&cfg, "carol")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    // Already deleted: mutations see no message.
    let req = test::TestRequest::delete()
        .uri(&format!("/api/messages/{msg_id}"))
        .insert_header(("Authorization", bearer(&cfg, "alice")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
    let req = test::TestRequest::patch()
        .uri(&format!("/api/messages/{msg_id}"))
        .insert_header(("Authorization", bearer(&cfg, "alice")))
        .set_json(json!({ "content": "undo?" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
async fn unknown_message_is_404() {
    let cfg = test_config();
    let db = Db::connect_in_memory().await.unwrap();
    seed_world(&db).await;
    seed_member(&db, "mem-alice", "alice", "guest").await;
    let app = spawn_app!(cfg, db);

    let req = test::TestRequest::patch()
        .uri("/api/messages/no-such-id")
        .insert_header(("Authorization", bearer(&cfg, "alice")))
        .set_json(json!({ "content": "x" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
async fn cursor_pagination_over_http() {
    let cfg = test_config();
    let db = Db::connect_in_memory().await.unwrap();
    seed_world(&db).await;
    seed_member(&db, "mem-alice", "alice", "guest").await;
    let app = spawn_app!(cfg, db);
    let token = bearer(&cfg, "alice");

    let mut all_ids = Vec::new();
    for i in 0..15 {
        let req = test::TestRequest::post()
            .uri("/api/servers/srv/channels/general/messages")
            .insert_header(("Authorization", token.clone()))
            .set_json(json!({ "content": format!("m{i}") }))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        all_ids.push(created["id"].as_str().unwrap().to_string());
    }

    // First page: default limit 10, cursor present.
    let req = test::TestRequest::get()
        .uri("/api/servers/srv/channels/general/messages")
        .insert_header(("Authorization", token.clone()))
        .to_request();
    let page1: Value = test::call_and_read_body_json(&app, req).await;
    let items1 = page1["items"].as_array().unwrap();
    assert_eq!(items1.len(), 10);
    let cursor = page1["next_cursor"].as_str().unwrap().to_string();
    assert_eq!(cursor, items1[9]["id"].as_str().unwrap());

    // Second page: the remaining 5, exhausted marker.
    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/servers/srv/channels/general/messages?cursor={cursor}"
        ))
        .insert_header(("Authorization", token))
        .to_request();
    let page2: Value = test::call_and_read_body_json(&app, req).await;
    let items2 = page2["items"].as_array().unwrap();
    assert_eq!(items2.len(), 5);
    assert!(page2["next_cursor"].is_null());

    // Exactly once across both pages.
    let mut seen: Vec<String> = items1
        .iter()
        .chain(items2.iter())
        .map(|m| m["id"].as_str().unwrap().to_string())
        .collect();
    seen.sort();
    let mut expected = all_ids.clone();
    expected.sort();
    assert_eq!(seen, expected);
}

#[actix_web::test]
async fn nonce_is_echoed_on_create() {
    let cfg = test_config();
    let db = Db::connect_in_memory().await.unwrap();
    seed_world(&db).await;
    seed_member(&db, "mem-alice", "alice", "guest").await;
    let app = spawn_app!(cfg, db);

    let req = test::TestRequest::post()
        .uri("/api/servers/srv/channels/general/messages")
        .insert_header(("Authorization", bearer(&cfg, "alice")))
        .set_json(json!({ "content": "hello", "nonce": "client-42" }))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(created["nonce"], "client-42");
}
