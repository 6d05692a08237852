//! Auth module tests against the assembled router.

use super::cookie::issue_token;
use super::{
    AdminSecret, AuthConfig, AuthState, Environment, LoginRateLimiter, MAX_SESSION_TTL_SECONDS,
    NoopRateLimiter, RateLimiter, require_admin,
};
use crate::{api, unix_now};
use anyhow::{Context, Result, anyhow};
use axum::{
    Extension, Router,
    body::{Body, to_bytes},
    http::{
        HeaderMap, Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, LOCATION, RETRY_AFTER, SET_COOKIE},
    },
    middleware,
    response::Response,
    routing::get,
};
use secrecy::SecretString;
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "ipeplataformadigital";

fn admin_secret() -> Result<AdminSecret> {
    AdminSecret::new(SecretString::from(SECRET.to_string())).map_err(|err| anyhow!(err))
}

fn state_with(config: AuthConfig, limiter: Arc<dyn RateLimiter>) -> Arc<AuthState> {
    Arc::new(AuthState::new(config, limiter))
}

fn default_state() -> Result<Arc<AuthState>> {
    Ok(state_with(
        AuthConfig::new(admin_secret()?),
        Arc::new(NoopRateLimiter),
    ))
}

fn login_request(body: &str) -> Result<Request<Body>> {
    Request::builder()
        .method("POST")
        .uri("/api/login")
        .header(CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::from(body.to_string()))
        .context("failed to build login request")
}

fn senha(password: &str) -> String {
    serde_json::json!({ "senha": password }).to_string()
}

async fn send(router: Router, request: Request<Body>) -> Result<Response> {
    router
        .oneshot(request)
        .await
        .context("router failed to respond")
}

async fn json_body(response: Response) -> Result<serde_json::Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn set_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn cookie_token(set_cookie: &str) -> Option<String> {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, value)| value.to_string())
}

#[tokio::test]
async fn login_with_configured_secret_sets_cookie() -> Result<()> {
    let response = send(api::app(default_state()?), login_request(&senha(SECRET))?).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = set_cookie(response.headers()).context("missing Set-Cookie")?;
    assert!(cookie.starts_with("admin-auth="));
    assert!(cookie.contains("; Path=/"));
    assert!(cookie.contains("; HttpOnly"));
    assert!(cookie.contains("; SameSite=Lax"));
    assert!(cookie.contains("; Max-Age=43200"));
    assert!(!cookie.contains("Secure"));
    assert!(!cookie.contains(SECRET));

    assert_eq!(json_body(response).await?, serde_json::json!({ "ok": true }));
    Ok(())
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() -> Result<()> {
    for password in ["suasenha123", "", "ipeplataformadigital ", "IPEPLATAFORMADIGITAL"] {
        let response = send(api::app(default_state()?), login_request(&senha(password))?).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{password}");
        assert!(response.headers().get(SET_COOKIE).is_none());
        assert_eq!(
            json_body(response).await?,
            serde_json::json!({ "error": "Unauthorized" })
        );
    }
    Ok(())
}

#[tokio::test]
async fn login_with_malformed_body_is_bad_request() -> Result<()> {
    let response = send(api::app(default_state()?), login_request("{\"password\":1}")?).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(SET_COOKIE).is_none());
    Ok(())
}

#[tokio::test]
async fn production_cookie_is_secure() -> Result<()> {
    let state = state_with(
        AuthConfig::new(admin_secret()?).with_environment(Environment::Production),
        Arc::new(NoopRateLimiter),
    );
    let response = send(api::app(state), login_request(&senha(SECRET))?).await?;
    let cookie = set_cookie(response.headers()).context("missing Set-Cookie")?;
    assert!(cookie.ends_with("; Secure"));
    Ok(())
}

#[tokio::test]
async fn logout_is_idempotent() -> Result<()> {
    let app = api::app(default_state()?);
    for _ in 0..3 {
        let request = Request::builder()
            .method("DELETE")
            .uri("/api/logout")
            .body(Body::empty())?;
        let response = send(app.clone(), request).await?;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = set_cookie(response.headers()).context("missing Set-Cookie")?;
        assert!(cookie.starts_with("admin-auth=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert_eq!(json_body(response).await?, serde_json::json!({ "ok": true }));
    }
    Ok(())
}

#[tokio::test]
async fn session_route_accepts_issued_cookie() -> Result<()> {
    let app = api::app(default_state()?);
    let login = send(app.clone(), login_request(&senha(SECRET))?).await?;
    let token = set_cookie(login.headers())
        .as_deref()
        .and_then(cookie_token)
        .context("missing token")?;

    let request = Request::builder()
        .uri("/api/admin/session")
        .header(COOKIE, format!("theme=dark; admin-auth={token}"))
        .body(Body::empty())?;
    let response = send(app, request).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await?;
    assert_eq!(body["ok"], true);
    let expires_at = body["expires_at"].as_i64().unwrap_or_default();
    assert!(expires_at > unix_now());
    Ok(())
}

#[tokio::test]
async fn longest_session_ttl_still_passes_the_guard() -> Result<()> {
    for ttl in [MAX_SESSION_TTL_SECONDS, 1_000_000_000_000, i64::MAX] {
        let state = state_with(
            AuthConfig::new(admin_secret()?).with_session_ttl_seconds(ttl),
            Arc::new(NoopRateLimiter),
        );
        let app = api::app(state);
        let login = send(app.clone(), login_request(&senha(SECRET))?).await?;
        assert_eq!(login.status(), StatusCode::OK);
        let cookie = set_cookie(login.headers()).context("missing Set-Cookie")?;
        assert!(
            cookie.contains(&format!("; Max-Age={MAX_SESSION_TTL_SECONDS}")),
            "{cookie}"
        );
        let token = cookie_token(&cookie).context("missing token")?;

        let request = Request::builder()
            .uri("/api/admin/session")
            .header(COOKIE, format!("admin-auth={token}"))
            .body(Body::empty())?;
        let response = send(app, request).await?;
        assert_eq!(response.status(), StatusCode::OK, "ttl {ttl}");
        let body = json_body(response).await?;
        let expires_at = body["expires_at"].as_i64().unwrap_or_default();
        assert!(expires_at <= unix_now() + MAX_SESSION_TTL_SECONDS);
    }
    Ok(())
}

#[tokio::test]
async fn session_route_rejects_bad_cookies() -> Result<()> {
    let state = default_state()?;
    let other = AdminSecret::new(SecretString::from("another-secret".to_string()))
        .map_err(|err| anyhow!(err))?;
    let now = unix_now();

    let forged = issue_token(&other, now, 60).context("token")?;
    let expired = issue_token(state.config().admin_secret(), now - 120, 60).context("token")?;
    let valid = issue_token(state.config().admin_secret(), now, 60).context("token")?;
    let (head, last) = valid.split_at(valid.len() - 1);
    let tampered = format!("{head}{}", if last == "A" { "B" } else { "A" });

    let cookies = [
        None,
        Some(SECRET.to_string()),
        Some("suasenha123".to_string()),
        Some(forged),
        Some(expired),
        Some(tampered),
    ];

    for cookie in cookies {
        let mut request = Request::builder().uri("/api/admin/session");
        if let Some(value) = &cookie {
            request = request.header(COOKIE, format!("admin-auth={value}"));
        }
        let response = send(api::app(state.clone()), request.body(Body::empty())?).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{cookie:?}");
        assert_eq!(
            json_body(response).await?,
            serde_json::json!({ "error": "Unauthorized" })
        );
    }
    Ok(())
}

#[tokio::test]
async fn guard_redirects_page_requests_to_login() -> Result<()> {
    let state = state_with(
        AuthConfig::new(admin_secret()?).with_login_path("/entrar".to_string()),
        Arc::new(NoopRateLimiter),
    );
    let pages = Router::new()
        .route("/admin/posts", get(|| async { "posts" }))
        .route_layer(middleware::from_fn(require_admin))
        .layer(Extension(state.clone()));

    let request = Request::builder()
        .uri("/admin/posts?draft=1")
        .body(Body::empty())?;
    let response = send(pages.clone(), request).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok()),
        Some("/entrar?next=%2Fadmin%2Fposts%3Fdraft%3D1")
    );

    let token = issue_token(state.config().admin_secret(), unix_now(), 60).context("token")?;
    let request = Request::builder()
        .uri("/admin/posts")
        .header(COOKIE, format!("admin-auth={token}"))
        .body(Body::empty())?;
    let response = send(pages, request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn public_routes_skip_the_guard() -> Result<()> {
    let app = api::app(default_state()?);
    for uri in ["/", "/health", "/openapi.json"] {
        let request = Request::builder().uri(uri).body(Body::empty())?;
        let response = send(app.clone(), request).await?;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
    Ok(())
}

#[tokio::test]
async fn repeated_failures_trigger_cooldown() -> Result<()> {
    let state = state_with(
        AuthConfig::new(admin_secret()?),
        Arc::new(LoginRateLimiter::default()),
    );
    let app = api::app(state);

    for _ in 0..5 {
        let response = send(app.clone(), login_request(&senha("wrong"))?).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // Even the right password is refused during the cooldown.
    let response = send(app, login_request(&senha(SECRET))?).await?;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().get(SET_COOKIE).is_none());
    assert!(response.headers().get(RETRY_AFTER).is_some());
    assert_eq!(
        json_body(response).await?,
        serde_json::json!({ "error": "Too Many Requests" })
    );
    Ok(())
}

#[tokio::test]
async fn eleventh_attempt_is_rate_limited() -> Result<()> {
    let state = state_with(
        AuthConfig::new(admin_secret()?),
        Arc::new(LoginRateLimiter::default()),
    );
    let app = api::app(state);

    for _ in 0..10 {
        let response = send(app.clone(), login_request("{}")?).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    let response = send(app, login_request(&senha(SECRET))?).await?;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    Ok(())
}

#[tokio::test]
async fn repeated_successful_logins_are_not_limited() -> Result<()> {
    let state = state_with(
        AuthConfig::new(admin_secret()?),
        Arc::new(LoginRateLimiter::default()),
    );
    let app = api::app(state);

    for _ in 0..20 {
        let response = send(app.clone(), login_request(&senha(SECRET))?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_some());
    }
    Ok(())
}
