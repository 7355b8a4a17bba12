use arena_api::middleware::issue_token;
use arena_api::{app, AppState, AuthConfig};
use arena_catalog::RateThresholds;
use arena_core::{InteractionService, ListingService, MemoryStore};
use arena_interaction::{Aggregator, DedupGuard};
use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "test-secret";

fn test_app() -> Router {
    let store = Arc::new(MemoryStore::new());
    let thresholds = RateThresholds::new(100.0, 500.0, 2000.0).unwrap();

    let state = AppState {
        listings: Arc::new(ListingService::new(
            store.clone(),
            store.clone(),
            thresholds,
            Aggregator::new(30),
        )),
        interactions: Arc::new(InteractionService::new(
            store.clone(),
            store,
            DedupGuard::from_hours(24),
        )),
        auth: AuthConfig {
            secret: SECRET.to_string(),
        },
    };

    app(state).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))))
}

fn token(user: Uuid) -> String {
    issue_token(SECRET, user, 3600).unwrap()
}

async fn send(app: &Router, method: Method, uri: &str, user: Option<Uuid>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(user)));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create(app: &Router, owner: Uuid, name: &str, mode: &str, base_rate: f64) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/listings",
        Some(owner),
        Some(json!({
            "name": name,
            "website": "https://example.org",
            "episode": 16.2,
            "mode": mode,
            "configs": { "base_exp_rate": base_rate },
            "tags": ["pvp"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

fn slugs(body: &Value) -> Vec<String> {
    body["listings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["slug"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_index_lists_created_listings() {
    let app = test_app();
    let listing = create(&app, Uuid::new_v4(), "Prontera RO", "renewal", 50.0).await;
    assert_eq!(listing["statistics"]["rank"], 1);

    let (status, body) = send(&app, Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(slugs(&body), vec!["prontera-ro"]);
    assert_eq!(body["listings"][0]["exp_rate_title"], "Low Rate");
    assert_eq!(body["listings"][0]["votes_count"], 0);
}

#[tokio::test]
async fn test_vote_once_per_cooldown() {
    let app = test_app();
    create(&app, Uuid::new_v4(), "Prontera RO", "renewal", 50.0).await;

    let (status, _) = send(&app, Method::POST, "/listing/prontera-ro/vote", None, None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, Method::POST, "/listing/prontera-ro/vote", None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "You already voted for this listing recently.");

    // A signed-in user is a different actor from the bare address.
    let (status, _) = send(&app, Method::POST, "/listing/prontera-ro/vote", Some(Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, profile) = send(&app, Method::GET, "/listing/prontera-ro", None, None).await;
    assert_eq!(profile["listing"]["votes_count"], 2);
}

#[tokio::test]
async fn test_servers_filter_and_sort() {
    let app = test_app();
    let owner = Uuid::new_v4();
    create(&app, owner, "Alpha", "renewal", 50.0).await;
    create(&app, owner, "Beta", "classic", 50.0).await;
    create(&app, owner, "Gamma", "renewal", 3000.0).await;
    create(&app, owner, "Delta", "renewal", 80.0).await;

    send(&app, Method::POST, "/listing/delta/vote", None, None).await;

    let (status, body) = send(&app, Method::GET, "/servers/low-rate/renewal/votes_count/desc", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(slugs(&body), vec!["delta", "alpha"]);

    let (_, body) = send(&app, Method::GET, "/servers/all/all/any/asc?limit=2", None, None).await;
    assert_eq!(slugs(&body), vec!["alpha", "beta"]);

    let (_, body) = send(&app, Method::GET, "/servers/super-high-rate", None, None).await;
    assert_eq!(slugs(&body), vec!["gamma"]);

    let (_, body) = send(&app, Method::GET, "/servers?tag=woe", None, None).await;
    assert!(slugs(&body).is_empty());
}

#[tokio::test]
async fn test_unknown_sort_column_is_bad_request() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/servers/all/all/owner_id/desc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let allowed = body["allowed"].as_array().unwrap();
    assert!(allowed.contains(&json!("votes_count")));

    let (status, body) = send(&app, Method::GET, "/servers/all/hardcore", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["allowed"].as_array().unwrap().contains(&json!("pre-renewal")));
}

#[tokio::test]
async fn test_segments_are_case_insensitive() {
    let app = test_app();
    let owner = Uuid::new_v4();
    create(&app, owner, "Alpha", "renewal", 50.0).await;
    create(&app, owner, "Beta", "renewal", 50.0).await;
    send(&app, Method::POST, "/listing/beta/vote", None, None).await;

    let (status, body) = send(&app, Method::GET, "/servers/all/renewal/Votes_Count", None, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(slugs(&body), vec!["beta", "alpha"]);

    let (status, body) = send(&app, Method::GET, "/servers/LOW-RATE/RENEWAL/VOTES_COUNT/ASC", None, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(slugs(&body), vec!["alpha", "beta"]);
}

#[tokio::test]
async fn test_malformed_input_gets_json_error() {
    let app = test_app();
    create(&app, Uuid::new_v4(), "Prontera RO", "renewal", 50.0).await;
    let author = Uuid::new_v4();

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/listing/prontera-ro/reviews/not-a-uuid",
        Some(author),
        Some(json!({ "score": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");

    let (status, body) = send(&app, Method::GET, "/servers?limit=lots", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");

    let (status, body) = send(
        &app,
        Method::POST,
        "/listing/prontera-ro/reviews",
        Some(author),
        Some(json!({ "message": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string(), "{body}");
}

#[tokio::test]
async fn test_review_lifecycle() {
    let app = test_app();
    create(&app, Uuid::new_v4(), "Prontera RO", "renewal", 50.0).await;
    let author = Uuid::new_v4();
    let review = json!({ "message": "Stable and friendly staff", "score": 5 });

    let (status, _) = send(&app, Method::POST, "/listing/prontera-ro/reviews", None, Some(review.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, created) = send(&app, Method::POST, "/listing/prontera-ro/reviews", Some(author), Some(review.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::POST, "/listing/prontera-ro/reviews", Some(author), Some(review)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "You already made a review on this listing.");

    let uri = format!("/listing/prontera-ro/reviews/{id}");
    let (status, _) = send(&app, Method::PATCH, &uri, Some(Uuid::new_v4()), Some(json!({ "score": 1 }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = send(&app, Method::PATCH, &uri, Some(author), Some(json!({ "score": 3 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["score"], 3);
    assert_eq!(updated["created_at"], created["created_at"]);

    let (_, profile) = send(&app, Method::GET, "/listing/prontera-ro", None, None).await;
    assert_eq!(profile["listing"]["average_score"], 3.0);
    assert_eq!(profile["reviews"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::DELETE, &uri, Some(author), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, profile) = send(&app, Method::GET, "/listing/prontera-ro", None, None).await;
    assert_eq!(profile["listing"]["average_score"], Value::Null);
}

#[tokio::test]
async fn test_review_score_out_of_range() {
    let app = test_app();
    create(&app, Uuid::new_v4(), "Prontera RO", "renewal", 50.0).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/listing/prontera-ro/reviews",
        Some(Uuid::new_v4()),
        Some(json!({ "message": "wow", "score": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_token_rejected() {
    let app = test_app();
    let request = Request::builder()
        .uri("/")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_owner_only_config_update() {
    let app = test_app();
    let owner = Uuid::new_v4();
    create(&app, owner, "Prontera RO", "renewal", 50.0).await;

    let configs = json!({ "base_exp_rate": 1000.0 });
    let (status, _) = send(&app, Method::PATCH, "/listing/prontera-ro/configs", Some(Uuid::new_v4()), Some(configs.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, listing) = send(&app, Method::PATCH, "/listing/prontera-ro/configs", Some(owner), Some(configs)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["statistics"]["rank"], 1);

    let (_, body) = send(&app, Method::GET, "/servers/high-rate", None, None).await;
    assert_eq!(slugs(&body), vec!["prontera-ro"]);
}

#[tokio::test]
async fn test_unknown_listing_is_not_found() {
    let app = test_app();
    let (status, _) = send(&app, Method::GET, "/listing/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::POST, "/listing/nowhere/click", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
