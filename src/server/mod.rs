mod error;
pub mod server_config;

use std::{future::Future, io, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router
};
use log::{info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::backend::LedgerStore;
use crate::core::{contribution::parse_amount, Authenticator, LedgerError, LedgerResult};
use crate::service::LedgerService;

pub use error::ServerError;
pub use server_config::AppConfig;

/// What every handler gets: the ledger service and the login check.
pub struct AppState<S: LedgerStore> {
    service: Arc<LedgerService<S>>,
    auth: Arc<dyn Authenticator>
}

impl<S: LedgerStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        AppState { service: Arc::clone(&self.service), auth: Arc::clone(&self.auth) }
    }
}

impl<S: LedgerStore + 'static> AppState<S> {
    pub fn new(service: LedgerService<S>, auth: impl Authenticator + 'static) -> AppState<S> {
        AppState { service: Arc::new(service), auth: Arc::new(auth) }
    }

    pub fn service(&self) -> &LedgerService<S> {
        &self.service
    }

    /// Store access is blocking, so it runs off the async workers.
    async fn run<T, F>(&self, operation: F) -> Result<T, ServerError>
    where
        T: Send + 'static,
        F: FnOnce(&LedgerService<S>) -> LedgerResult<T> + Send + 'static
    {
        let service = Arc::clone(&self.service);
        let result = tokio::task::spawn_blocking(move || operation(&*service)).await??;
        Ok(result)
    }
}

pub fn router<S: LedgerStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/api/ping", get(ping))
        .route("/api/login", post(login::<S>))
        .route("/api/total", get(total::<S>))
        .route("/api/history", get(history::<S>))
        .route("/api/save", post(save::<S>))
        .route("/api/clear", post(clear::<S>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the API until `shutdown` resolves.
pub async fn serve<S: LedgerStore + 'static>(
    listener: TcpListener,
    state: AppState<S>,
    shutdown: impl Future<Output = ()> + Send + 'static
) -> io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn ping() -> Json<Value> {
    Json(json!({ "message": "Backend is working" }))
}

#[derive(Debug, Default, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String
}

async fn login<S: LedgerStore + 'static>(
    State(state): State<AppState<S>>,
    payload: Result<Json<LoginRequest>, JsonRejection>
) -> impl IntoResponse {
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    if state.auth.verify(&request.username, &request.password) {
        info!("login accepted for {}", request.username);
        (StatusCode::OK, Json(json!({ "success": true, "message": "Login successful" })))
    } else {
        warn!("login refused for {:?}", request.username);
        (StatusCode::UNAUTHORIZED, Json(json!({ "success": false, "message": "Invalid credentials" })))
    }
}

async fn total<S: LedgerStore + 'static>(State(state): State<AppState<S>>) -> Result<Json<Value>, ServerError> {
    let total = state.run(|service| service.total()).await?;
    Ok(Json(json!({ "total": total })))
}

async fn history<S: LedgerStore + 'static>(State(state): State<AppState<S>>) -> Result<Json<Value>, ServerError> {
    let history = state.run(|service| service.history()).await?;
    Ok(Json(json!({ "history": history })))
}

async fn save<S: LedgerStore + 'static>(
    State(state): State<AppState<S>>,
    payload: Result<Json<Value>, JsonRejection>
) -> Result<Json<Value>, ServerError> {
    let amount = match payload {
        Ok(Json(body)) => parse_amount(body.get("amount").unwrap_or(&Value::Null))?,
        Err(rejection) => {
            warn!("unreadable save request: {}", rejection);
            return Err(LedgerError::InvalidAmount.into());
        }
    };
    let total = state.run(move |service| service.save(amount)).await?;
    Ok(Json(json!({ "total": total })))
}

async fn clear<S: LedgerStore + 'static>(State(state): State<AppState<S>>) -> Result<Json<Value>, ServerError> {
    state.run(|service| service.clear()).await?;
    Ok(Json(json!({ "message": "Cleared" })))
}
