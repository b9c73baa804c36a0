use std::net::SocketAddr;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::store::{self, Collection};
use crate::{auth, photos, students};

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_origin.as_deref());
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(students::router())
                .merge(photos::router(max_upload_bytes))
                .route("/health", get(health))
                .route("/test", get(test_endpoint)),
        )
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

/// Session cookies only travel cross-origin with a credentialed policy, which
/// needs an explicit origin.
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let Some(origin) = origin else {
        return CorsLayer::permissive();
    };
    match origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        Err(e) => {
            tracing::warn!(%origin, error = %e, "invalid CORS_ORIGIN; falling back to permissive CORS");
            CorsLayer::permissive()
        }
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let store = &*state.store;
    let students: Vec<Value> = store::load(store, Collection::Students).await;
    let users: Vec<Value> = store::load(store, Collection::Users).await;
    Json(json!({
        "status": "ok",
        "timestamp": now_rfc3339(),
        "data_files": {
            "students": store.exists(Collection::Students).await,
            "users": store.exists(Collection::Users).await,
        },
        "data_counts": {
            "students": students.len(),
            "users": users.len(),
        },
    }))
}

async fn test_endpoint() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "API is working",
        "timestamp": now_rfc3339(),
    }))
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "5000".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
