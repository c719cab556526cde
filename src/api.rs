//! Read-only HTTP status endpoints.
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::routing::get;
use tokio_util::sync::CancellationToken;

use crate::manager::{ConditionStats, StatsSnapshot};
use crate::registry::{CustomResourceDefinition, PluginRegistry};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to bind status API to `{addr}`: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("status API failed: {0}")]
    Serve(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone)]
pub struct ApiState {
    stats: Arc<ConditionStats>,
    registry: &'static PluginRegistry,
}

impl ApiState {
    pub fn new(stats: Arc<ConditionStats>, registry: &'static PluginRegistry) -> Self {
        Self { stats, registry }
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn conditions(State(state): State<ApiState>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot())
}

async fn crds(State(state): State<ApiState>) -> Json<Vec<CustomResourceDefinition>> {
    let mut crds = state.registry.all_crds();
    crds.sort_by(|a, b| a.name.cmp(&b.name));
    Json(crds)
}

pub struct APIServer {
    router: axum::Router,
}

impl APIServer {
    pub fn new(state: ApiState) -> Self {
        let router = axum::Router::new()
            .route("/healthz", get(healthz))
            .route("/conditions", get(conditions))
            .route("/crds", get(crds))
            .with_state(state);
        Self { router }
    }

    /// Serves until `token` is cancelled.
    pub async fn listen(self, addr: SocketAddr, token: CancellationToken) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        log::info!("status API listening on {addr}");
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(token.cancelled_owned())
            .await
            .map_err(Error::Serve)
    }
}
