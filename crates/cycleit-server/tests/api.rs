//! Router-level tests driving the full HTTP surface in-process.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use cycleit_server::{build_router, AppState, ServerConfig};

const BOUNDARY: &str = "cycleit-test-boundary";

struct TestApp {
    router: Router,
    _dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = ServerConfig {
            database_path: Some(dir.path().join("cycleit.db")),
            blob_storage_path: dir.path().join("storage"),
            max_image_size: 64 * 1024,
            ..Default::default()
        };
        let state = AppState::open(config).await.unwrap();
        Self {
            router: build_router(state),
            _dir: dir,
        }
    }

    async fn call(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn raw(&self, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, bytes.to_vec())
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(request(Method::GET, uri, token, None)).await
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        self.call(request(method, uri, token, Some(body))).await
    }

    /// Sign up and return (user id, token).
    async fn sign_up(&self, username: &str) -> (String, String) {
        let (status, body) = self
            .send(
                Method::POST,
                "/auth/signup",
                None,
                json!({
                    "email": format!("{username}@example.com"),
                    "password": "hunter22",
                    "username": username,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["user_id"].as_str().unwrap().to_string(),
            body["access_token"].as_str().unwrap().to_string(),
        )
    }

    async fn first_category(&self) -> String {
        let (_, cats) = self.get("/categories", None).await;
        cats[0]["id"].as_str().unwrap().to_string()
    }

    async fn create_listing(
        &self,
        token: &str,
        title: &str,
        images: &[(&str, &[u8])],
    ) -> (StatusCode, Value) {
        let category = self.first_category().await;
        let fields = [
            ("title", title),
            ("description", "Well kept, recently serviced"),
            ("category_id", category.as_str()),
            ("condition", "good"),
            ("desired_exchange", "A guitar"),
        ];
        self.call(multipart(Method::POST, "/listings", token, &fields, "images", images))
            .await
    }
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn multipart(
    method: Method,
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    file_field: &str,
    files: &[(&str, &[u8])],
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (file_name, data) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{file_field}\"; \
                 filename=\"{file_name}\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn storage_path(url: &str) -> &str {
    url.strip_prefix("http://localhost:8080").unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn session_lifecycle() {
    let app = TestApp::new().await;
    let (user_id, token) = app.sign_up("alice").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/auth/signup",
            None,
            json!({ "email": "ALICE@example.com", "password": "hunter22", "username": "alice2" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.get("/auth/session", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], user_id.as_str());
    assert_eq!(body["username"], "alice");
    assert!(body.get("access_token").is_none());

    let (status, _) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            json!({ "email": "alice@example.com", "password": "wrong-one" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            json!({ "email": "alice@example.com", "password": "hunter22" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let second = body["access_token"].as_str().unwrap().to_string();
    assert_ne!(second, token);

    let (status, _) = app.call(request(Method::POST, "/auth/logout", Some(&token), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get("/auth/session", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // the other session is untouched
    let (status, _) = app.get("/auth/session", Some(&second)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn gated_routes_reject_anonymous_callers() {
    let app = TestApp::new().await;
    for uri in ["/me/listings", "/messages/conversations", "/exchanges", "/profile", "/dashboard"] {
        let (status, body) = app.get(uri, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert!(body["error"].is_string());
    }
    let (status, _) = app.get("/profile", Some("deadbeef")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn road_bike_exchange_flow() {
    let app = TestApp::new().await;
    let (alice, alice_token) = app.sign_up("alice").await;
    let (bob, bob_token) = app.sign_up("bob").await;

    // alice lists a bike with two photos
    let (status, created) = app
        .create_listing(
            &alice_token,
            "Road Bike",
            &[("front.jpg", &b"front-bytes"[..]), ("side.JPG", &b"side-bytes"[..])],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["failed_uploads"], json!([]));
    let listing_id = created["listing"]["id"].as_str().unwrap().to_string();
    let images = created["listing"]["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0]["display_order"], 0);

    // stored images are served publicly
    let url = images[1]["image_url"].as_str().unwrap();
    assert!(url.ends_with("-1.jpg"));
    let (status, content_type, bytes) = app.raw(storage_path(url)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(bytes, b"side-bytes");

    // bob finds it in the directory
    let (status, found) = app.get("/listings?search=road&condition=good", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["owner"]["username"], "alice");
    let (_, none) = app.get("/listings?condition=new", None).await;
    assert!(none.as_array().unwrap().is_empty());

    // bob is interested and says so
    let interest_uri = format!("/listings/{listing_id}/interest");
    let (status, _) = app
        .send(
            Method::POST,
            &interest_uri,
            Some(&bob_token),
            json!({ "message": "Would you swap for a guitar?" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, interested) = app.get(&interest_uri, Some(&bob_token)).await;
    assert_eq!(interested["interested"], true);

    // alice sees one unread conversation about the bike
    let (_, inbox) = app.get("/messages/conversations", Some(&alice_token)).await;
    assert_eq!(inbox.as_array().unwrap().len(), 1);
    assert_eq!(inbox[0]["other_user"]["username"], "bob");
    assert_eq!(inbox[0]["unread_count"], 1);
    assert_eq!(inbox[0]["product_id"], listing_id.as_str());

    // bob's own message never counts as unread for him
    let (_, inbox) = app.get("/messages/conversations", Some(&bob_token)).await;
    assert_eq!(inbox.as_array().unwrap().len(), 1);
    assert_eq!(inbox[0]["other_user_id"], alice.as_str());
    assert_eq!(inbox[0]["unread_count"], 0);

    let (_, stats) = app.get("/dashboard", Some(&alice_token)).await;
    assert_eq!(stats["unread_messages"], 1);
    assert_eq!(stats["my_listings"], 1);

    // opening the thread reads it
    let (status, thread) = app
        .get(&format!("/messages/conversations/{bob}"), Some(&alice_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(thread.as_array().unwrap().len(), 1);
    let (_, inbox) = app.get("/messages/conversations", Some(&alice_token)).await;
    assert_eq!(inbox[0]["unread_count"], 0);

    // alice replies
    let (status, _) = app
        .send(
            Method::POST,
            "/messages",
            Some(&alice_token),
            json!({ "recipient_id": bob, "content": "  Sure, come by Saturday  ", "product_id": listing_id }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, thread) = app
        .get(&format!("/messages/conversations/{alice}"), Some(&bob_token))
        .await;
    assert_eq!(thread[1]["content"], "Sure, come by Saturday");

    // bob starts the exchange, alice confirms, bob completes
    let (status, exchange) = app
        .send(Method::POST, "/exchanges", Some(&bob_token), json!({ "product_id": listing_id }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{exchange}");
    assert_eq!(exchange["status"], "pending");
    assert_eq!(exchange["owner"]["username"], "alice");
    assert_eq!(exchange["counterparty"]["username"], "bob");
    assert_eq!(exchange["product_title"], "Road Bike");
    let exchange_uri = format!("/exchanges/{}", exchange["id"].as_str().unwrap());

    // a second one for the same pair is refused, whoever starts it
    let (status, _) = app
        .send(
            Method::POST,
            "/exchanges",
            Some(&alice_token),
            json!({ "product_id": listing_id, "counterparty_id": bob }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, confirmed) = app
        .send(Method::PATCH, &exchange_uri, Some(&alice_token), json!({ "status": "confirmed" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "confirmed");
    assert!(confirmed["confirmed_at"].is_string());

    let (status, completed) = app
        .send(Method::PATCH, &exchange_uri, Some(&bob_token), json!({ "status": "completed" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(completed["completed_at"].is_string());

    // terminal states stay terminal
    let (status, body) = app
        .send(Method::PATCH, &exchange_uri, Some(&alice_token), json!({ "status": "pending" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("completed"));

    let (_, board) = app.get("/exchanges", Some(&alice_token)).await;
    assert!(board["active"].as_array().unwrap().is_empty());
    assert_eq!(board["completed"].as_array().unwrap().len(), 1);

    let (_, stats) = app.get("/dashboard", Some(&bob_token)).await;
    assert_eq!(stats["completed_exchanges"], 1);
    assert_eq!(stats["active_exchanges"], 0);
}

#[tokio::test]
async fn failed_image_is_skipped_and_reported() {
    let app = TestApp::new().await;
    let (_, token) = app.sign_up("alice").await;

    let (status, created) = app
        .create_listing(
            &token,
            "Lamp",
            &[("a.jpg", &b"aaa"[..]), ("broken.jpg", &b""[..]), ("c.png", &b"ccc"[..])],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["failed_uploads"], json!([1]));
    assert_eq!(created["uploaded"].as_array().unwrap().len(), 2);

    let orders: Vec<i64> = created["listing"]["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["display_order"].as_i64().unwrap())
        .collect();
    assert_eq!(orders, vec![0, 2]);
}

#[tokio::test]
async fn extra_images_are_dropped() {
    let app = TestApp::new().await;
    let (_, token) = app.sign_up("alice").await;

    let images: Vec<(&str, &[u8])> = vec![
        ("1.jpg", &b"one"[..]),
        ("2.jpg", &b"two"[..]),
        ("3.jpg", &b"three"[..]),
        ("4.jpg", &b"four"[..]),
        ("5.jpg", &b"five"[..]),
        ("6.jpg", &b"six"[..]),
    ];
    let (status, created) = app.create_listing(&token, "Tent", &images).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["uploaded"].as_array().unwrap().len(), 5);
    assert_eq!(created["failed_uploads"], json!([]));
    assert_eq!(created["listing"]["images"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn listing_validation() {
    let app = TestApp::new().await;
    let (_, token) = app.sign_up("alice").await;

    let (status, _) = app.create_listing(&token, "   ", &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let fields = [
        ("title", "Desk"),
        ("description", "Oak"),
        ("category_id", "00000000-0000-0000-0000-000000000000"),
        ("condition", "good"),
    ];
    let (status, body) = app
        .call(multipart(Method::POST, "/listings", &token, &fields, "images", &[]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("category"));
}

#[tokio::test]
async fn owner_controls_listing() {
    let app = TestApp::new().await;
    let (_, alice_token) = app.sign_up("alice").await;
    let (_, bob_token) = app.sign_up("bob").await;

    let (_, created) = app
        .create_listing(&alice_token, "Sofa", &[("sofa.jpg", &b"sofa"[..])])
        .await;
    let id = created["listing"]["id"].as_str().unwrap().to_string();
    let uri = format!("/listings/{id}");
    let image_url = created["listing"]["images"][0]["image_url"]
        .as_str()
        .unwrap()
        .to_string();

    // interest rules
    let (status, _) = app
        .send(Method::POST, &format!("{uri}/interest"), Some(&alice_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .send(Method::POST, &format!("{uri}/interest"), Some(&bob_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .send(Method::POST, &format!("{uri}/interest"), Some(&bob_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    // no message means no conversation
    let (_, inbox) = app.get("/messages/conversations", Some(&alice_token)).await;
    assert!(inbox.as_array().unwrap().is_empty());

    // deactivation hides it from everyone but the owner
    let (status, _) = app
        .send(Method::PATCH, &uri, Some(&bob_token), json!({ "is_active": false }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app
        .send(Method::PATCH, &uri, Some(&alice_token), json!({ "is_active": false }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], false);

    let (_, directory) = app.get("/listings", None).await;
    assert!(directory.as_array().unwrap().is_empty());
    let (status, _) = app.get(&uri, Some(&bob_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&uri, Some(&alice_token)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, mine) = app.get("/me/listings", Some(&alice_token)).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    // only the owner deletes, and the photo goes too
    let (status, _) = app.call(request(Method::DELETE, &uri, Some(&bob_token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.call(request(Method::DELETE, &uri, Some(&alice_token), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&uri, Some(&alice_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = app.raw(storage_path(&image_url)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn exchanges_are_private_to_participants() {
    let app = TestApp::new().await;
    let (alice, alice_token) = app.sign_up("alice").await;
    let (_, bob_token) = app.sign_up("bob").await;
    let (_, carol_token) = app.sign_up("carol").await;

    let (_, created) = app.create_listing(&alice_token, "Kettle", &[]).await;
    let product = created["listing"]["id"].as_str().unwrap().to_string();

    // the owner must say who with
    let (status, _) = app
        .send(Method::POST, "/exchanges", Some(&alice_token), json!({ "product_id": product }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .send(
            Method::POST,
            "/exchanges",
            Some(&alice_token),
            json!({ "product_id": product, "counterparty_id": alice }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, exchange) = app
        .send(Method::POST, "/exchanges", Some(&bob_token), json!({ "product_id": product }))
        .await;
    let uri = format!("/exchanges/{}", exchange["id"].as_str().unwrap());

    let (status, _) = app
        .send(Method::PATCH, &uri, Some(&carol_token), json!({ "status": "cancelled" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, board) = app.get("/exchanges", Some(&carol_token)).await;
    assert!(board["active"].as_array().unwrap().is_empty());

    let (status, cancelled) = app
        .send(Method::PATCH, &uri, Some(&bob_token), json!({ "status": "cancelled" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    let (_, board) = app.get("/exchanges", Some(&alice_token)).await;
    assert_eq!(board["cancelled"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn messaging_rules() {
    let app = TestApp::new().await;
    let (alice, alice_token) = app.sign_up("alice").await;
    let (bob, _) = app.sign_up("bob").await;

    let (status, _) = app
        .send(Method::POST, "/messages", Some(&alice_token), json!({ "recipient_id": bob, "content": "   " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .send(Method::POST, "/messages", Some(&alice_token), json!({ "recipient_id": alice, "content": "hi me" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .send(
            Method::POST,
            "/messages",
            Some(&alice_token),
            json!({ "recipient_id": "6f1c8a53-0000-4000-8000-000000000000", "content": "hello?" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(
            Method::POST,
            "/messages",
            Some(&alice_token),
            json!({
                "recipient_id": bob,
                "product_id": "6f1c8a53-0000-4000-8000-000000000000",
                "content": "about that bike",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found: product not found");
}

#[tokio::test]
async fn profile_and_avatar() {
    let app = TestApp::new().await;
    let (_, alice_token) = app.sign_up("alice").await;
    app.sign_up("bob").await;

    let (status, profile) = app
        .send(
            Method::PUT,
            "/profile",
            Some(&alice_token),
            json!({ "username": "alice_rides", "full_name": "Alice Martin", "location": "Lyon" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["username"], "alice_rides");
    assert_eq!(profile["location"], "Lyon");

    let (status, _) = app
        .send(Method::PUT, "/profile", Some(&alice_token), json!({ "username": "bob" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, uploaded) = app
        .call(multipart(
            Method::PUT,
            "/profile/avatar",
            &alice_token,
            &[],
            "file",
            &[("me.png", &b"first"[..])],
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let url = uploaded["avatar_url"].as_str().unwrap().to_string();
    assert!(url.ends_with("/avatar.png"));

    // re-upload overwrites in place
    app.call(multipart(
        Method::PUT,
        "/profile/avatar",
        &alice_token,
        &[],
        "file",
        &[("me.png", &b"second"[..])],
    ))
    .await;
    let (_, _, bytes) = app.raw(storage_path(&url)).await;
    assert_eq!(bytes, b"second");

    let (_, profile) = app.get("/profile", Some(&alice_token)).await;
    assert_eq!(profile["avatar_url"], url.as_str());
}
