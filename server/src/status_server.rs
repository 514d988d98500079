// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::{net::SocketAddr, sync::Arc, time::SystemTime};

use axum::{extract::State, routing::get, Json, Router};
use canonical_error::{unavailable_error, CanonicalError};
use log::info;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::mount::{Mount, MountSnapshot};

/// HTTP routes exposing the mount for monitoring. `GET /status` returns a
/// JSON MountSnapshot.
pub fn status_router(mount: Arc<Mutex<Mount>>) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(mount)
}

async fn get_status(State(mount): State<Arc<Mutex<Mount>>>) -> Json<MountSnapshot> {
    let mut locked_mount = mount.lock().await;
    locked_mount.tick(SystemTime::now());
    Json(locked_mount.snapshot())
}

pub async fn serve_status(
    addr: SocketAddr,
    mount: Arc<Mutex<Mount>>,
) -> Result<(), CanonicalError> {
    let server = hyper::Server::try_bind(&addr).map_err(|e| {
        unavailable_error(&format!("Could not bind status server to {}: {}", addr, e))
    })?;
    info!("Serving mount status on http://{}/status", addr);
    server
        .serve(status_router(mount).into_make_service())
        .await
        .map_err(|e| unavailable_error(&format!("Status server failed: {}", e)))
}
