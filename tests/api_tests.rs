use axum::{
    Router,
    body::Body,
    extract::Query,
    http::{HeaderMap, Request, StatusCode, header},
    routing::get as get_route,
};
use std::collections::HashMap;
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;
use zeexclub::api::AppState;
use zeexclub::config::Config;
use zeexclub::db::migrator::m20240102_seed_admin::DEFAULT_API_KEY;
use zeexclub::models::{
    NewEpisode, NewSeason, NewShow, ShowKind, UploadStatus, UploadTaskUpdate,
};

async fn spawn_app() -> (Arc<AppState>, Router) {
    spawn_app_with(|_| {}).await
}

async fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> (Arc<AppState>, Router) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.scheduler.enabled = false;
    configure(&mut config);

    let state = zeexclub::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    let router = zeexclub::api::router(state.clone()).await;
    (state, router)
}

fn new_show(tmdb_id: i32, title: &str, kind: ShowKind) -> NewShow {
    NewShow {
        tmdb_id,
        title: title.to_string(),
        kind,
        overview: Some("Une histoire d'espions à Paris".to_string()),
        poster_path: Some("/poster.jpg".to_string()),
        backdrop_path: None,
        release_date: Some("2015-04-27".to_string()),
        genres: vec!["Drame".to_string(), "Thriller".to_string()],
        runtime: Some(52),
        rating: Some(8.2),
        language: Some("fr".to_string()),
    }
}

async fn seed_show(state: &AppState, tmdb_id: i32, title: &str, kind: ShowKind) -> i32 {
    state
        .store()
        .create_show(&new_show(tmdb_id, title, kind))
        .await
        .unwrap()
        .unwrap()
        .id
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_key(uri: &str, key: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("X-Api-Key", key)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, key: Option<&str>, body: &serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = key {
        builder = builder.header("X-Api-Key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn register(app: &Router, username: &str) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/auth/register",
            None,
            &serde_json::json!({ "username": username, "password": "motdepasse123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["api_key"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoints() {
    let (_, app) = spawn_app().await;

    for uri in ["/", "/api/health"] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "healthy");
        assert_eq!(body["data"]["dependencies"][0]["name"], "database");
        assert_eq!(body["data"]["dependencies"][0]["status"], "up");
    }
}

#[tokio::test]
async fn test_genres_are_static() {
    let (_, app) = spawn_app().await;
    let (status, body) = send(&app, get("/api/genres")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 19);
}

#[tokio::test]
async fn test_show_listing_normalizes_pagination() {
    let (state, app) = spawn_app().await;
    seed_show(&state, 1, "Le Bureau des Légendes", ShowKind::Series).await;
    seed_show(&state, 2, "Intouchables", ShowKind::Movie).await;

    let (status, body) = send(&app, get("/api/shows?page=0&limit=500")).await;
    assert_eq!(status, StatusCode::OK);
    let pagination = &body["data"]["pagination"];
    assert_eq!(pagination["page"], 1);
    assert_eq!(pagination["limit"], 100);
    assert_eq!(pagination["total"], 2);
    assert_eq!(pagination["has_next"], false);

    let (_, body) = send(&app, get("/api/shows?type=movie")).await;
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Intouchables");
    assert!(
        items[0]["poster_url"]
            .as_str()
            .unwrap()
            .ends_with("/w500/poster.jpg")
    );

    let (status, _) = send(&app, get("/api/shows?type=anime")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_show_details_and_errors() {
    let (state, app) = spawn_app().await;
    let id = seed_show(&state, 3, "Dix pour cent", ShowKind::Series).await;

    let (status, body) = send(&app, get(&format!("/api/shows/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Dix pour cent");

    let (status, body) = send(&app, get("/api/shows/9999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, get("/api/shows/0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get(&format!("/api/shows/{id}/episodes?season=7"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_validates_query() {
    let (state, app) = spawn_app().await;
    seed_show(&state, 4, "Lupin", ShowKind::Series).await;

    let (status, _) = send(&app, get("/api/shows/search?q=a")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, get("/api/shows/search?q=lupin")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["query"], "lupin");
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["results"][0]["title"], "Lupin");
}

#[tokio::test]
async fn test_legacy_video_and_folder_routes() {
    let (state, app) = spawn_app().await;
    let id = seed_show(&state, 5, "Les Revenants", ShowKind::Series).await;

    let (status, body) = send(&app, get("/api/videos/recent")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], id);

    let (_, body) = send(&app, get("/api/videos/search?q=Revenants&rating=8")).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = send(&app, get("/api/videos/search?q=Revenants&rating=9")).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, body) = send(&app, get("/api/folders")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], "Les Revenants");
    assert_eq!(body["data"][0]["type"], "series");
}

#[tokio::test]
async fn test_trending_rejects_unknown_window() {
    let (_, app) = spawn_app().await;

    let (status, body) = send(&app, get("/api/trending?time_window=day")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["time_window"], "day");

    let (status, _) = send(&app, get("/api/trending?time_window=month")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/api/trending?limit=51")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let (_, app) = spawn_app().await;

    let (status, _) = send(&app, get("/api/admin/stats")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, get_with_key("/api/admin/stats", "wrong-key")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let user_key = register(&app, "spectateur").await;
    let (status, _) = send(&app, get_with_key("/api/admin/stats", &user_key)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, get_with_key("/api/admin/stats", DEFAULT_API_KEY)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["users"], 2);
}

#[tokio::test]
async fn test_admin_builds_catalog_tree() {
    let (state, app) = spawn_app().await;
    let show_id = seed_show(&state, 6, "Engrenages", ShowKind::Series).await;

    let (status, season) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/admin/shows/{show_id}/seasons"),
            Some(DEFAULT_API_KEY),
            &serde_json::json!({ "season_number": 1 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let season_id = season["data"]["id"].as_i64().unwrap();

    let (status, episode) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/admin/seasons/{season_id}/episodes"),
            Some(DEFAULT_API_KEY),
            &serde_json::json!({ "episode_number": 1, "title": "Pilote" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let episode_id = episode["data"]["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/admin/episodes/{episode_id}/sources"),
            Some(DEFAULT_API_KEY),
            &serde_json::json!({ "server_name": "telegram", "link": "", "file_id": "../etc" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/admin/episodes/{episode_id}/sources"),
            Some(DEFAULT_API_KEY),
            &serde_json::json!({ "server_name": "telegram", "link": "", "file_id": "BAACAgQ_x-1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, get(&format!("/api/episodes/{episode_id}/sources"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["sources"][0]["direct_link"],
        "/api/stream/telegram/BAACAgQ_x-1"
    );

    let (status, body) = send(&app, get(&format!("/api/shows/{show_id}/episodes?season=1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["episodes"][0]["title"], "Pilote");

    let (status, _) = send(&app, get(&format!("/api/shows/{show_id}/episodes?season=2"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/admin/shows/{show_id}"))
        .header("X-Api-Key", DEFAULT_API_KEY)
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, get(&format!("/api/episodes/{episode_id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_watchlist_flow() {
    let (state, app) = spawn_app().await;
    let show_id = seed_show(&state, 7, "Baron Noir", ShowKind::Series).await;
    let key = register(&app, "amelie").await;

    let (status, _) = send(&app, get("/api/user/watchlist")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/user/watchlist/add",
            Some(&key),
            &serde_json::json!({ "video_id": show_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["added"], true);

    let (_, body) = send(&app, get_with_key("/api/user/watchlist", &key)).await;
    assert_eq!(body["data"][0]["video_id"], show_id);

    let remove = |key: &str| {
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/user/watchlist/{show_id}"))
            .header("X-Api-Key", key)
            .body(Body::empty())
            .unwrap()
    };
    let (status, _) = send(&app, remove(&key)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, remove(&key)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_history_progress_and_clear() {
    let (state, app) = spawn_app().await;
    let show_id = seed_show(&state, 9, "Dix pour cent", ShowKind::Series).await;
    let key = register(&app, "camille").await;

    let update = |progress: i32, completed: bool| {
        json_request(
            "POST",
            "/api/user/history/update",
            Some(&key),
            &serde_json::json!({ "video_id": show_id, "progress": progress, "completed": completed }),
        )
    };
    let (status, _) = send(&app, update(120, false)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, update(2700, true)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, get_with_key("/api/user/history", &key)).await;
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["progress"], 2700);
    assert_eq!(entries[0]["completed"], true);

    let (_, body) = send(&app, get_with_key("/api/user/history?completed=false", &key)).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let clear = Request::builder()
        .method("DELETE")
        .uri("/api/user/history")
        .header("X-Api-Key", &key)
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, clear).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, get_with_key("/api/user/history", &key)).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_comment_deletion_is_restricted() {
    let (state, app) = spawn_app().await;
    let show_id = seed_show(&state, 8, "Kaamelott", ShowKind::Series).await;
    let author = register(&app, "arthur").await;
    let other = register(&app, "perceval").await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/comments/post",
            Some(&author),
            &serde_json::json!({ "video_id": show_id, "text": "C'est pas faux" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(&app, get(&format!("/api/comments/{show_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["username"], "arthur");

    let delete = |key: &str| {
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/comments/{comment_id}"))
            .header("X-Api-Key", key)
            .body(Body::empty())
            .unwrap()
    };
    let (status, _) = send(&app, delete(&other)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, delete(DEFAULT_API_KEY)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_stream_rejects_bad_ids_and_missing_token() {
    let (_, app) = spawn_app().await;

    let (status, _) = send(&app, get("/api/stream/telegram/abc.def")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, get("/api/stream/telegram/BAACAgQ_x-1")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let (_, app) = spawn_app().await;
    register(&app, "camille").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            &serde_json::json!({ "username": "camille", "password": "motdepasse123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .unwrap()
        .to_string();

    let request = Request::builder()
        .uri("/api/auth/me")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "camille");

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            &serde_json::json!({ "username": "camille", "password": "mauvais-mot" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_show_listing_survives_huge_page() {
    let (state, app) = spawn_app().await;
    seed_show(&state, 10, "Les Revenants", ShowKind::Series).await;

    let (status, body) = send(&app, get("/api/shows?page=9223372036854775807&limit=100")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["items"].as_array().unwrap().is_empty());
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["pagination"]["has_next"], false);
}

#[tokio::test]
async fn test_genre_and_search_filters_match_substrings() {
    let (state, app) = spawn_app().await;
    let mut dune = new_show(11, "Dune", ShowKind::Movie);
    dune.genres = vec!["Science-Fiction".to_string()];
    state.store().create_show(&dune).await.unwrap().unwrap();
    seed_show(&state, 12, "Lupin", ShowKind::Series).await;

    let (status, body) = send(&app, get("/api/shows?genre=Science")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["title"], "Dune");

    let (_, body) = send(&app, get("/api/videos/search?genre=Fiction")).await;
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Dune");

    // A bare wildcard is matched literally.
    let (_, body) = send(&app, get("/api/shows?search=%25")).await;
    assert_eq!(body["data"]["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_health_hides_database_error_outside_debug() {
    let (state, app) = spawn_app().await;
    state.store().conn.close_by_ref().await.unwrap();

    let (status, body) = send(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "degraded");
    let database = &body["data"]["dependencies"][0];
    assert_eq!(database["status"], "down");
    assert!(database.get("detail").is_none());
}

#[tokio::test]
async fn test_admin_can_rotate_key_and_change_password() {
    let (_, app) = spawn_app().await;

    let (status, body) = send(&app, get_with_key("/api/auth/api-key", DEFAULT_API_KEY)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["api_key"], DEFAULT_API_KEY);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/api-key/regenerate",
            Some(DEFAULT_API_KEY),
            &serde_json::json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let new_key = body["data"]["api_key"].as_str().unwrap().to_string();
    assert_ne!(new_key, DEFAULT_API_KEY);

    let (status, _) = send(&app, get_with_key("/api/auth/me", DEFAULT_API_KEY)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, get_with_key("/api/admin/stats", &new_key)).await;
    assert_eq!(status, StatusCode::OK);

    let change = |current: &str, new: &str| {
        json_request(
            "PUT",
            "/api/auth/password",
            Some(&new_key),
            &serde_json::json!({ "current_password": current, "new_password": new }),
        )
    };
    let (status, _) = send(&app, change("pas-le-bon", "nouveau-secret")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, change("password", "court")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, change("password", "nouveau-secret")).await;
    assert_eq!(status, StatusCode::OK);

    let login = |password: &str| {
        json_request(
            "POST",
            "/api/auth/login",
            None,
            &serde_json::json!({ "username": "admin", "password": password }),
        )
    };
    let (status, _) = send(&app, login("password")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = send(&app, login("nouveau-secret")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["api_key"], new_key.as_str());
}

#[tokio::test]
async fn test_auth_key_routes_require_authentication() {
    let (_, app) = spawn_app().await;

    let (status, _) = send(&app, get("/api/auth/api-key")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let key = register(&app, "ines").await;
    let (status, body) = send(&app, get_with_key("/api/auth/api-key", &key)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["api_key"], key.as_str());
}

#[tokio::test]
async fn test_retrying_completed_upload_is_a_conflict() {
    let (state, app) = spawn_app().await;
    let show_id = seed_show(&state, 13, "Heat", ShowKind::Movie).await;
    let season = state
        .store()
        .create_season(show_id, &NewSeason::numbered(0))
        .await
        .unwrap()
        .unwrap();
    let episode = state
        .store()
        .create_episode(season.id, &NewEpisode::numbered(1))
        .await
        .unwrap()
        .unwrap();
    let task = state
        .store()
        .create_upload_task(episode.id, "BAACAgQ_x-1", "Heat")
        .await
        .unwrap();
    state
        .store()
        .update_upload_task(
            task.id,
            &UploadTaskUpdate {
                status: Some(UploadStatus::Completed),
                progress: Some(100),
                filemoon_code: Some("abc123".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let retry = json_request(
        "POST",
        &format!("/api/admin/uploads/{}/retry", task.id),
        Some(DEFAULT_API_KEY),
        &serde_json::json!({}),
    );
    let (status, body) = send(&app, retry).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let stored = state.store().get_upload_task(task.id).await.unwrap().unwrap();
    assert_eq!(stored.status, UploadStatus::Completed);
    assert_eq!(stored.filemoon_code.as_deref(), Some("abc123"));

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/admin/uploads/9999/retry",
            Some(DEFAULT_API_KEY),
            &serde_json::json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

const VIDEO_BYTES: &[u8] = b"0123456789";

/// Bot API stand-in: `BAAC-sized` reports its size, `BAAC-unsized` does not.
async fn spawn_bot_api() -> String {
    let router = Router::new()
        .route(
            "/bot123:abc/getFile",
            get_route(|Query(q): Query<HashMap<String, String>>| async move {
                match q.get("file_id").map(String::as_str) {
                    Some("BAAC-sized") => (
                        StatusCode::OK,
                        r#"{"ok":true,"result":{"file_id":"BAAC-sized","file_size":10,"file_path":"videos/sized.mp4"}}"#,
                    ),
                    Some("BAAC-unsized") => (
                        StatusCode::OK,
                        r#"{"ok":true,"result":{"file_id":"BAAC-unsized","file_path":"videos/unsized.mp4"}}"#,
                    ),
                    _ => (
                        StatusCode::BAD_REQUEST,
                        r#"{"ok":false,"description":"Bad Request: invalid file_id"}"#,
                    ),
                }
            }),
        )
        .route(
            "/file/bot123:abc/videos/sized.mp4",
            get_route(|headers: HeaderMap| async move {
                let range = headers
                    .get(header::RANGE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.strip_prefix("bytes="))
                    .and_then(|v| v.split_once('-'))
                    .and_then(|(a, b)| Some((a.parse::<usize>().ok()?, b.parse::<usize>().ok()?)));
                match range {
                    Some((start, end)) => (
                        StatusCode::PARTIAL_CONTENT,
                        VIDEO_BYTES[start..=end].to_vec(),
                    ),
                    None => (StatusCode::OK, VIDEO_BYTES.to_vec()),
                }
            }),
        )
        .route(
            "/file/bot123:abc/videos/unsized.mp4",
            get_route(|| async { VIDEO_BYTES.to_vec() }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn spawn_streaming_app() -> Router {
    let base = spawn_bot_api().await;
    let (_, app) = spawn_app_with(|config| {
        config.telegram.bot_token = "123:abc".to_string();
        config.telegram.api_base_url = base;
    })
    .await;
    app
}

async fn stream(app: &Router, uri: &str, range: Option<&str>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let mut builder = Request::builder().uri(uri);
    if let Some(range) = range {
        builder = builder.header(header::RANGE, range);
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body.to_vec())
}

#[tokio::test]
async fn test_stream_serves_ranges_from_telegram() {
    let app = spawn_streaming_app().await;

    let (status, headers, body) = stream(&app, "/api/stream/telegram/BAAC-sized", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_LENGTH], "10");
    assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
    assert_eq!(body, VIDEO_BYTES);

    let (status, headers, body) =
        stream(&app, "/api/stream/telegram/BAAC-sized", Some("bytes=2-5")).await;
    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(headers[header::CONTENT_RANGE], "bytes 2-5/10");
    assert_eq!(headers[header::CONTENT_LENGTH], "4");
    assert_eq!(body, b"2345");

    let (status, headers, body) =
        stream(&app, "/api/stream/telegram/BAAC-sized", Some("bytes=-3")).await;
    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(headers[header::CONTENT_RANGE], "bytes 7-9/10");
    assert_eq!(body, b"789");

    let (status, headers, _) =
        stream(&app, "/api/stream/telegram/BAAC-sized", Some("bytes=10-")).await;
    assert_eq!(status, StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(headers[header::CONTENT_RANGE], "bytes */10");

    let (status, _, _) = stream(&app, "/api/stream/telegram/BAAC-missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stream_without_known_size_ignores_range() {
    let app = spawn_streaming_app().await;

    for range in [None, Some("bytes=0-"), Some("bytes=5-9")] {
        let (status, headers, body) =
            stream(&app, "/api/stream/telegram/BAAC-unsized", range).await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers.get(header::CONTENT_LENGTH).is_none());
        assert!(headers.get(header::CONTENT_RANGE).is_none());
        assert_eq!(body, VIDEO_BYTES);
    }
}
