use crate::data::oracle_registry::{OracleRecord, OracleRegistry};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct SharedState {
    pub registry: Arc<OracleRegistry>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api", get(index))
        .route("/api/oracles", get(list_oracles))
        .with_state(Arc::new(state))
}

async fn start_http_server(addr: &str, state: SharedState) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

pub fn start_http_server_task(addr: &str, state: SharedState) -> JoinHandle<Result<()>> {
    let addr = addr.to_string();
    tokio::spawn(async move {
        start_http_server(&addr, state)
            .await
            .context("http server error")
    })
}

// handler

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMeta {
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOraclesResponse {
    pub message: String,
    pub data: Vec<OracleRecord>,
    pub meta: ListMeta,
}

async fn index() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "An API for use with your Dapp!".into(),
    })
}

async fn list_oracles(State(state): State<Arc<SharedState>>) -> Json<ListOraclesResponse> {
    let data = state.registry.snapshot().await;
    Json(ListOraclesResponse {
        message: "List of oracles retrieved successfully".into(),
        meta: ListMeta { total: data.len() },
        data,
    })
}
