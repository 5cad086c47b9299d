mod common;

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use sonic_rs::{JsonValueTrait, Value};
use tower::ServiceExt;

use rotorgate::{
    repositories::{AttemptCounter, UserStore},
    routes,
};

use common::{TestContext, PASSWORD};

struct Reply {
    status: StatusCode,
    set_cookie: Option<String>,
    body: Value,
}

impl Reply {
    /// Value of the refresh cookie set by the response, if any.
    fn session_cookie(&self) -> Option<String> {
        let raw = self.set_cookie.as_deref()?;
        let pair = raw.split(';').next()?;
        pair.strip_prefix("refresh_session_id=").map(str::to_string)
    }
}

async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        sonic_rs::json!(null)
    } else {
        sonic_rs::from_slice(&bytes).unwrap()
    };

    Reply {
        status,
        set_cookie,
        body,
    }
}

fn post_json(uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(id) = cookie {
        builder = builder.header(header::COOKIE, format!("refresh_session_id={}", id));
    }
    builder
        .body(Body::from(sonic_rs::to_string(&body).unwrap()))
        .unwrap()
}

fn from_ip(mut request: Request<Body>, last_octet: u8) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, last_octet], 50000))));
    request
}

fn login_request(password: &str) -> Request<Body> {
    post_json(
        "/api/auth/login",
        sonic_rs::json!({"email": "alice@example.com", "password": password, "fingerprint": "fp1"}),
        None,
    )
}

async fn register_and_login(app: &Router, fingerprint: &str) -> Reply {
    let registered = send(
        app,
        post_json(
            "/api/auth/register",
            sonic_rs::json!({"username": "alice", "email": "alice@example.com", "password": PASSWORD}),
            None,
        ),
    )
    .await;
    assert_eq!(registered.status, StatusCode::CREATED);

    send(
        app,
        post_json(
            "/api/auth/login",
            sonic_rs::json!({"email": "alice@example.com", "password": PASSWORD, "fingerprint": fingerprint}),
            None,
        ),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_returns_public_user() {
        let context = TestContext::new();
        let app = routes::router(context.state.clone());

        let reply = send(
            &app,
            post_json(
                "/api/auth/register",
                sonic_rs::json!({"username": "alice", "email": "alice@example.com", "password": PASSWORD}),
                None,
            ),
        )
        .await;

        assert_eq!(reply.status, StatusCode::CREATED);
        assert_eq!(reply.body["username"].as_str(), Some("alice"));
        assert!(reply.body.get("hashed_password").is_none());

        let again = send(
            &app,
            post_json(
                "/api/auth/register",
                sonic_rs::json!({"username": "alice", "email": "alice@example.com", "password": PASSWORD}),
                None,
            ),
        )
        .await;
        assert_eq!(again.status, StatusCode::CONFLICT);
        assert_eq!(again.body["error"].as_str(), Some("User already exists"));
    }

    #[tokio::test]
    async fn test_register_rejects_weak_password() {
        let context = TestContext::new();
        let app = routes::router(context.state.clone());

        let reply = send(
            &app,
            post_json(
                "/api/auth/register",
                sonic_rs::json!({"username": "alice", "email": "alice@example.com", "password": "short"}),
                None,
            ),
        )
        .await;

        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_sets_http_only_cookie() {
        let context = TestContext::new();
        let app = routes::router(context.state.clone());

        let login = register_and_login(&app, "fp1").await;

        assert_eq!(login.status, StatusCode::OK);
        assert_eq!(login.body["token_type"].as_str(), Some("Bearer"));
        assert!(login.body["access_token"].as_str().is_some());

        let cookie = login.set_cookie.clone().unwrap();
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Path=/api/auth"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(login.session_cookie().is_some());
    }

    #[tokio::test]
    async fn test_login_failures_share_one_message() {
        let context = TestContext::new();
        let app = routes::router(context.state.clone());
        register_and_login(&app, "fp1").await;

        let unknown = send(
            &app,
            post_json(
                "/api/auth/login",
                sonic_rs::json!({"email": "bob@example.com", "password": PASSWORD, "fingerprint": "fp1"}),
                None,
            ),
        )
        .await;
        let wrong = send(
            &app,
            post_json(
                "/api/auth/login",
                sonic_rs::json!({"email": "alice@example.com", "password": "Wr0ngPassword", "fingerprint": "fp1"}),
                None,
            ),
        )
        .await;

        assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.body, wrong.body);
        assert!(unknown.set_cookie.is_none());
    }

    #[tokio::test]
    async fn test_refresh_rotates_cookie_and_rejects_replay() {
        let context = TestContext::new();
        let app = routes::router(context.state.clone());

        let login = register_and_login(&app, "fp1").await;
        let s1 = login.session_cookie().unwrap();

        let rotated = send(
            &app,
            post_json("/api/auth/refresh", sonic_rs::json!({"fingerprint": "fp1"}), Some(&s1)),
        )
        .await;
        assert_eq!(rotated.status, StatusCode::OK);
        let s2 = rotated.session_cookie().unwrap();
        assert_ne!(s1, s2);

        let replay = send(
            &app,
            post_json("/api/auth/refresh", sonic_rs::json!({"fingerprint": "fp1"}), Some(&s1)),
        )
        .await;
        assert_eq!(replay.status, StatusCode::UNAUTHORIZED);
        assert_eq!(replay.body["error"].as_str(), Some("Invalid refresh session"));

        let stolen = send(
            &app,
            post_json("/api/auth/refresh", sonic_rs::json!({"fingerprint": "fp2"}), Some(&s2)),
        )
        .await;
        assert_eq!(stolen.status, StatusCode::UNAUTHORIZED);
        assert_eq!(stolen.body, replay.body);
    }

    #[tokio::test]
    async fn test_rejected_refresh_clears_cookie() {
        let context = TestContext::new();
        let app = routes::router(context.state.clone());

        let login = register_and_login(&app, "fp1").await;
        let s1 = login.session_cookie().unwrap();

        let wrong_device = send(
            &app,
            post_json("/api/auth/refresh", sonic_rs::json!({"fingerprint": "fp2"}), Some(&s1)),
        )
        .await;
        assert_eq!(wrong_device.status, StatusCode::UNAUTHORIZED);

        let cleared = wrong_device.set_cookie.unwrap();
        assert!(cleared.starts_with("refresh_session_id=;"));
        assert!(cleared.contains("Max-Age=0"));
        assert!(cleared.contains("Path=/api/auth"));
    }

    #[tokio::test]
    async fn test_refresh_without_cookie_is_rejected() {
        let context = TestContext::new();
        let app = routes::router(context.state.clone());

        let reply = send(
            &app,
            post_json("/api/auth/refresh", sonic_rs::json!({"fingerprint": "fp1"}), None),
        )
        .await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

        let garbage = send(
            &app,
            post_json(
                "/api/auth/refresh",
                sonic_rs::json!({"fingerprint": "fp1"}),
                Some("not-a-session"),
            ),
        )
        .await;
        assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_requires_fresh_bearer_token() {
        let context = TestContext::new();
        let app = routes::router(context.state.clone());

        let login = register_and_login(&app, "fp1").await;
        let token = login.body["access_token"].as_str().unwrap().to_string();

        let me = |token: &str| {
            Request::builder()
                .uri("/api/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap()
        };

        let ok = send(&app, me(&token)).await;
        assert_eq!(ok.status, StatusCode::OK);
        assert_eq!(ok.body["email"].as_str(), Some("alice@example.com"));

        let missing = send(
            &app,
            Request::builder().uri("/api/auth/me").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

        context.clock.advance(chrono::Duration::minutes(8));
        let stale = send(&app, me(&token)).await;
        assert_eq!(stale.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let context = TestContext::new();
        let app = routes::router(context.state.clone());

        let login = register_and_login(&app, "fp1").await;
        let s1 = login.session_cookie().unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/logout")
            .header(header::COOKIE, format!("refresh_session_id={}", s1))
            .body(Body::empty())
            .unwrap();
        let reply = send(&app, request).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.set_cookie.unwrap().contains("Max-Age=0"));
        assert!(context.sessions.is_empty().await);

        let after = send(
            &app,
            post_json("/api/auth/refresh", sonic_rs::json!({"fingerprint": "fp1"}), Some(&s1)),
        )
        .await;
        assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_registration_is_capped_per_ip() {
        let context = TestContext::new();
        let app = routes::router(context.state.clone());

        for i in 0..5 {
            let reply = send(
                &app,
                from_ip(
                    post_json(
                        "/api/auth/register",
                        sonic_rs::json!({
                            "username": format!("user{}", i),
                            "email": format!("user{}@example.com", i),
                            "password": PASSWORD
                        }),
                        None,
                    ),
                    1,
                ),
            )
            .await;
            assert_eq!(reply.status, StatusCode::CREATED);
        }

        let capped = send(
            &app,
            from_ip(
                post_json(
                    "/api/auth/register",
                    sonic_rs::json!({"username": "user5", "email": "user5@example.com", "password": PASSWORD}),
                    None,
                ),
                1,
            ),
        )
        .await;
        assert_eq!(capped.status, StatusCode::TOO_MANY_REQUESTS);
        assert!(context.users.find_by_username("user5").await.unwrap().is_none());

        let other_ip = send(
            &app,
            from_ip(
                post_json(
                    "/api/auth/register",
                    sonic_rs::json!({"username": "user5", "email": "user5@example.com", "password": PASSWORD}),
                    None,
                ),
                2,
            ),
        )
        .await;
        assert_eq!(other_ip.status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_failed_logins_lock_only_the_guessing_ip() {
        let context = TestContext::new();
        let app = routes::router(context.state.clone());
        register_and_login(&app, "fp1").await;

        for _ in 0..5 {
            let reply = send(&app, from_ip(login_request("Wr0ngPassword"), 1)).await;
            assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        }

        let locked = send(&app, from_ip(login_request(PASSWORD), 1)).await;
        assert_eq!(locked.status, StatusCode::TOO_MANY_REQUESTS);
        assert!(locked.body["error"]
            .as_str()
            .unwrap()
            .starts_with("Too many failed login attempts"));

        // The account owner elsewhere is unaffected.
        let owner = send(&app, from_ip(login_request(PASSWORD), 2)).await;
        assert_eq!(owner.status, StatusCode::OK);

        context
            .clock
            .advance(chrono::Duration::seconds(rotorgate::middleware_layer::rate_limit::WINDOW_SECS));
        let after_window = send(&app, from_ip(login_request(PASSWORD), 1)).await;
        assert_eq!(after_window.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_successful_login_resets_failures() {
        let context = TestContext::new();
        let app = routes::router(context.state.clone());
        register_and_login(&app, "fp1").await;

        for _ in 0..4 {
            send(&app, from_ip(login_request("Wr0ngPassword"), 1)).await;
        }
        let ok = send(&app, from_ip(login_request(PASSWORD), 1)).await;
        assert_eq!(ok.status, StatusCode::OK);
        assert_eq!(context.attempts.count("rate_limit:login:10.0.0.1").await.unwrap(), 0);

        for _ in 0..4 {
            let reply = send(&app, from_ip(login_request("Wr0ngPassword"), 1)).await;
            assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        }
        let still_ok = send(&app, from_ip(login_request(PASSWORD), 1)).await;
        assert_eq!(still_ok.status, StatusCode::OK);
    }
}
