//! End-to-end tests for the REST surface
//!
//! Each test runs the full router against a fresh SQLite file.

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, header::CONTENT_TYPE, Method, Request, StatusCode},
};
use chrono::{Duration, Utc};
use movie_api::{
    api::{self, AppState},
    auth::{models::Role, AccountStore, CredentialVerifier, TokenCodec},
    db::Database,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    _dir: TempDir,
    db: Arc<Database>,
    state: AppState,
}

impl TestApp {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movie_api.db");
        let db = Arc::new(Database::open(path.to_str().unwrap()).unwrap());
        let state = AppState::new(
            db.clone(),
            Arc::new(TokenCodec::new("integration-test-secret")),
            CredentialVerifier::new(4),
        );
        Self {
            _dir: dir,
            db,
            state,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        authorization: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = api::router(self.state.clone())
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    async fn send_json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let bearer = token.map(|t| format!("Bearer {t}"));
        let (status, bytes) = self.send(method, uri, bearer.as_deref(), body).await;
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    /// Register and log in; returns (account id, token)
    async fn signup(&self, email: &str) -> (Uuid, String) {
        let (status, created) = self
            .send_json(
                Method::POST,
                "/users",
                None,
                Some(json!({
                    "firstName": "Test",
                    "lastName": "User",
                    "email": email,
                    "password": "password123",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = Uuid::parse_str(created["id"].as_str().unwrap()).unwrap();

        let (status, login) = self
            .send_json(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": email, "password": "password123" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        (id, login["token"].as_str().unwrap().to_string())
    }

    fn set_role(&self, id: Uuid, role: Role) {
        let mut account = self.db.find_by_id(&id).unwrap().unwrap();
        account.role = role;
        self.db.save(&account).unwrap();
    }

    async fn create_movie(&self, admin_token: &str, title: &str) -> Uuid {
        let (status, movie) = self
            .send_json(
                Method::POST,
                "/movies",
                Some(admin_token),
                Some(json!({ "title": title, "year": 1999, "director": "Someone" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        Uuid::parse_str(movie["id"].as_str().unwrap()).unwrap()
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();
    let (status, body) = app.send_json(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_register_and_login() {
    let app = TestApp::new();
    let (id, token) = app.signup("Ada@Example.com").await;

    let (status, me) = app
        .send_json(Method::GET, &format!("/users/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ada@example.com");
    assert_eq!(me["role"], "user");
    assert!(me.get("passwordHash").is_none());
    assert!(me["lastLogin"].is_string());

    let (status, _) = app
        .send_json(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send_json(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "password123" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let app = TestApp::new();
    app.signup("ada@example.com").await;

    let (status, _) = app
        .send_json(
            Method::POST,
            "/users",
            None,
            Some(json!({
                "firstName": "Other",
                "lastName": "Person",
                "email": " ADA@example.com ",
                "password": "password123",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_missing_and_malformed_tokens() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/movies", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(String::from_utf8(body).unwrap(), "bearer token is required");

    for header in ["Basic abc", "Bearer", "Bearer not.a.jwt", "Bearer a b"] {
        let (status, body) = app.send(Method::GET, "/movies", Some(header), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "header {header:?}");
        assert_eq!(String::from_utf8(body).unwrap(), "Unauthorized");
    }
}

#[tokio::test]
async fn test_expired_and_foreign_tokens_rejected() {
    let app = TestApp::new();
    let (id, _) = app.signup("ada@example.com").await;

    let expired = app
        .state
        .codec
        .issue_at(id, "ada@example.com", Utc::now() - Duration::hours(48))
        .unwrap();
    let (status, _) = app
        .send_json(Method::GET, "/movies", Some(&expired.token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let foreign = TokenCodec::new("some-other-secret").issue(id).unwrap();
    let (status, _) = app
        .send_json(Method::GET, "/movies", Some(&foreign.token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_role_is_checked_live() {
    let app = TestApp::new();
    let (id, token) = app.signup("ada@example.com").await;
    let body = json!({ "title": "Heat" });

    let (status, _) = app
        .send_json(Method::POST, "/movies", Some(&token), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Same token, promoted account
    app.set_role(id, Role::Admin);
    let (status, _) = app
        .send_json(Method::POST, "/movies", Some(&token), Some(body))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    app.set_role(id, Role::User);
    let (status, _) = app
        .send_json(
            Method::POST,
            "/movies",
            Some(&token),
            Some(json!({ "title": "Ronin" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(app.db.find_movie_by_title("Ronin").unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_movie_title_conflicts() {
    let app = TestApp::new();
    let (id, token) = app.signup("admin@example.com").await;
    app.set_role(id, Role::Admin);

    let first = app.create_movie(&token, "Heat").await;
    let (status, _) = app
        .send_json(
            Method::POST,
            "/movies",
            Some(&token),
            Some(json!({ "title": "Heat" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let second = app.create_movie(&token, "Ronin").await;
    let (status, _) = app
        .send_json(
            Method::PUT,
            &format!("/movies/{second}"),
            Some(&token),
            Some(json!({ "title": "Heat" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send_json(Method::DELETE, &format!("/movies/{first}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app
        .send_json(Method::GET, &format!("/movies/{first}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_review_ownership_enforced_before_write() {
    let app = TestApp::new();
    let (admin_id, admin_token) = app.signup("admin@example.com").await;
    app.set_role(admin_id, Role::Admin);
    let movie = app.create_movie(&admin_token, "Heat").await;

    let (ada, ada_token) = app.signup("ada@example.com").await;
    let (bob, bob_token) = app.signup("bob@example.com").await;

    // Ada posting as Bob
    let (status, _) = app
        .send_json(
            Method::POST,
            "/reviews",
            Some(&ada_token),
            Some(json!({ "movieId": movie, "userId": bob, "review": "Fake", "rating": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(app.db.reviews_for_movie(&movie).unwrap().is_empty());

    let (status, review) = app
        .send_json(
            Method::POST,
            "/reviews",
            Some(&ada_token),
            Some(json!({ "movieId": movie, "userId": ada, "review": "Great", "rating": 9 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let review_id = Uuid::parse_str(review["id"].as_str().unwrap()).unwrap();

    // Bob editing Ada's review
    let (status, _) = app
        .send_json(
            Method::PUT,
            &format!("/reviews/{review_id}"),
            Some(&bob_token),
            Some(json!({ "review": "Terrible", "rating": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let stored = app.db.find_review(&review_id).unwrap().unwrap();
    assert_eq!(stored.content, "Great");

    // Admins are not implicit owners
    let (status, _) = app
        .send_json(
            Method::PUT,
            &format!("/reviews/{review_id}"),
            Some(&admin_token),
            Some(json!({ "review": "Edited", "rating": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, updated) = app
        .send_json(
            Method::PUT,
            &format!("/reviews/{review_id}"),
            Some(&ada_token),
            Some(json!({ "review": "Still great", "rating": 8 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["content"], "Still great");
}

#[tokio::test]
async fn test_user_update_requires_owner() {
    let app = TestApp::new();
    let (ada, ada_token) = app.signup("ada@example.com").await;
    let (_bob, bob_token) = app.signup("bob@example.com").await;
    let body = json!({ "firstName": "Ada", "lastName": "Lovelace", "email": "ada@example.com" });

    let (status, _) = app
        .send_json(
            Method::PUT,
            &format!("/users/{ada}"),
            Some(&bob_token),
            Some(body.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.db.find_by_id(&ada).unwrap().unwrap().last_name, "User");

    // Unknown ids are refused the same way as foreign ones
    let (status, _) = app
        .send_json(
            Method::PUT,
            &format!("/users/{}", Uuid::new_v4()),
            Some(&bob_token),
            Some(body.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send_json(
            Method::PUT,
            &format!("/users/{ada}"),
            Some(&ada_token),
            Some(json!({ "firstName": "Ada", "lastName": "Lovelace", "email": "bob@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, updated) = app
        .send_json(Method::PUT, &format!("/users/{ada}"), Some(&ada_token), Some(body))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["lastName"], "Lovelace");
}

#[tokio::test]
async fn test_ratings_recomputed() {
    let app = TestApp::new();
    let (admin_id, admin_token) = app.signup("admin@example.com").await;
    app.set_role(admin_id, Role::Admin);
    let movie = app.create_movie(&admin_token, "Heat").await;

    let (ada, ada_token) = app.signup("ada@example.com").await;
    let (bob, bob_token) = app.signup("bob@example.com").await;

    let (status, _) = app
        .send_json(
            Method::POST,
            "/reviews",
            Some(&ada_token),
            Some(json!({ "movieId": movie, "userId": ada, "review": "Good", "rating": 8 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, bob_review) = app
        .send_json(
            Method::POST,
            "/reviews",
            Some(&bob_token),
            Some(json!({ "movieId": movie, "userId": bob, "review": "Fine", "rating": 6 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, listed) = app
        .send_json(Method::GET, &format!("/movies/{movie}"), Some(&ada_token), None)
        .await;
    assert_eq!(listed["nrOfRatings"], 2);
    assert!((listed["avgRating"].as_f64().unwrap() - 7.0).abs() < 1e-9);
    assert_eq!(listed["reviews"].as_array().unwrap().len(), 2);

    let (status, _) = app
        .send_json(
            Method::POST,
            "/reviews",
            Some(&ada_token),
            Some(json!({ "movieId": movie, "userId": ada, "review": "Too high", "rating": 11 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Only admins delete reviews
    let review_id = bob_review["id"].as_str().unwrap();
    let (status, _) = app
        .send_json(
            Method::DELETE,
            &format!("/reviews/{review_id}"),
            Some(&bob_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .send_json(
            Method::DELETE,
            &format!("/reviews/{review_id}"),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let stored = app.db.find_movie(&movie).unwrap().unwrap();
    assert_eq!(stored.nr_of_ratings, 1);
    assert!((stored.avg_rating - 8.0).abs() < 1e-9);

    // Deleting an account drops its reviews
    let (status, _) = app
        .send_json(Method::DELETE, &format!("/users/{ada}"), Some(&admin_token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let stored = app.db.find_movie(&movie).unwrap().unwrap();
    assert_eq!(stored.nr_of_ratings, 0);

    let (status, reviews) = app
        .send_json(Method::GET, &format!("/reviews/{movie}"), Some(&admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(reviews.as_array().unwrap().is_empty());
}
