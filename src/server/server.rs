use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    extract::Request,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::api::{self, AppState};
use super::embedded::Assets;
use crate::config::AppConfig;
use crate::github::GitHubClient;
use crate::llm::{GenerationProfile, IssueGenerator, OpenAiClient, OpenAiConfig};
use crate::session::SessionManager;

const PLACEHOLDER_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Issue Maker</title></head>
<body>
<h1>Issue Maker</h1>
<p>The API is running, but no frontend build was embedded. Put the built SPA in <code>static/</code> and rebuild.</p>
</body>
</html>
"#;

/// Configuration for the HTTP listener.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub dev_mode: bool,
}

/// Wire the long-lived clients from configuration.
pub fn build_state(config: &AppConfig) -> Result<AppState> {
    let github = GitHubClient::new(
        &config.github_api_base,
        &config.github_oauth_base,
        &config.github_client_id,
        &config.github_client_secret,
    )
    .context("Failed to build GitHub client")?;
    let llm = OpenAiClient::new(OpenAiConfig::from(&config.llm))
        .context("Failed to build LLM client")?;
    let generator = IssueGenerator::new(
        Arc::new(llm),
        &config.llm.model,
        GenerationProfile::for_kind(config.llm.profile),
    );

    Ok(AppState {
        sessions: SessionManager::with_ttl_minutes(
            &config.secret_key,
            config.session_ttl_minutes,
        ),
        github,
        generator,
        secure_cookies: config.production,
    })
}

/// Build the full application router with API routes and SPA serving.
pub fn build_router(state: Arc<AppState>) -> Router {
    api::api_router()
        .fallback(static_handler)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve embedded static files or fall back to index.html for SPA routing.
async fn static_handler(req: Request<Body>) -> Response {
    let path = req.uri().path().trim_start_matches('/');

    if !path.is_empty()
        && let Some(content) = Assets::get(path)
    {
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        return (
            [(header::CONTENT_TYPE, mime.as_ref().to_string())],
            content.data.into_owned(),
        )
            .into_response();
    }

    match Assets::get("index.html") {
        Some(content) => Html(String::from_utf8_lossy(&content.data).into_owned()).into_response(),
        None => (StatusCode::OK, Html(PLACEHOLDER_PAGE)).into_response(),
    }
}

/// Start the server and block until Ctrl+C.
pub async fn start_server(app_config: &AppConfig, config: ServerConfig) -> Result<()> {
    let state = Arc::new(build_state(app_config)?);

    let mut app = build_router(state);
    if config.dev_mode {
        tracing::warn!("Development mode: CORS allows any origin");
        app = app.layer(CorsLayer::permissive());
    }

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    tracing::info!(
        address = %local_addr,
        profile = %app_config.llm.profile,
        model = %app_config.llm.model,
        "Issue maker listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LlmSettings, ProfileKind};
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_config() -> AppConfig {
        AppConfig {
            secret_key: "secret".into(),
            github_client_id: "cid".into(),
            github_client_secret: "csecret".into(),
            github_api_base: "http://127.0.0.1:9".into(),
            github_oauth_base: "http://127.0.0.1:9".into(),
            llm: LlmSettings {
                api_key: "sk-test".into(),
                api_base: "http://127.0.0.1:9/v1".into(),
                model: "gpt-4o".into(),
                request_timeout_ms: 1_000,
                profile: ProfileKind::Extended,
            },
            host: "127.0.0.1".into(),
            port: 0,
            session_ttl_minutes: 30,
            production: true,
        }
    }

    fn test_router() -> Router {
        build_router(Arc::new(build_state(&test_config()).unwrap()))
    }

    #[test]
    fn test_build_state_follows_config() {
        let state = build_state(&test_config()).unwrap();
        assert!(state.secure_cookies);
        assert_eq!(state.generator.profile().name, "extended");
        assert_eq!(state.sessions.ttl().num_minutes(), 30);
        assert_eq!(state.github.client_id(), "cid");
    }

    #[test]
    fn test_build_state_rejects_blank_llm_key() {
        let mut config = test_config();
        config.llm.api_key = " ".into();
        assert!(build_state(&config).is_err());
    }

    #[tokio::test]
    async fn test_health_via_full_router() {
        let req = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();
        let resp = test_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_spa_fallback_serves_html() {
        let req = Request::builder()
            .uri("/some/client/route")
            .body(Body::empty())
            .unwrap();
        let resp = test_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/html"));
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&body).contains("<html"));
    }

    #[tokio::test]
    async fn test_root_serves_index() {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let resp = test_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_embedded_asset_gets_mime_type() {
        let req = Request::builder()
            .uri("/index.html")
            .body(Body::empty())
            .unwrap();
        let resp = test_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/html"));
    }

    #[tokio::test]
    async fn test_unknown_api_path_falls_through_to_spa() {
        let req = Request::builder()
            .uri("/api/debug")
            .body(Body::empty())
            .unwrap();
        let resp = test_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
