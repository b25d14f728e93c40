use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::catalog::GameCatalog;
use crate::player::{PlayerRepository, StoreError};
use crate::registry::SessionDirectory;
use crate::render::Renderer;

/// The collaborators every live session holds on to.
#[derive(Clone)]
pub struct CoreDeps {
    pub players: Arc<dyn PlayerRepository>,
    pub renderer: Arc<dyn Renderer>,
    pub directory: Arc<SessionDirectory>,
}

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<GameCatalog>,
    pub players: Arc<dyn PlayerRepository>,
    pub renderer: Arc<dyn Renderer>,
    pub directory: Arc<SessionDirectory>,
}

impl AppState {
    pub fn new(
        catalog: Arc<GameCatalog>,
        players: Arc<dyn PlayerRepository>,
        renderer: Arc<dyn Renderer>,
        directory: Arc<SessionDirectory>,
    ) -> Self {
        Self {
            catalog,
            players,
            renderer,
            directory,
        }
    }

    pub fn deps(&self) -> CoreDeps {
        CoreDeps {
            players: self.players.clone(),
            renderer: self.renderer.clone(),
            directory: self.directory.clone(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    /// The player store could not be reached. Transient; the user should try
    /// again later.
    #[error("Couldn't connect to the player database: {0}")]
    StoreUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A valid request the current session state rejects (not your turn,
    /// already queued, not the creator, ...).
    #[error("{0}")]
    Rejected(String),

    #[error("Internal server error")]
    Internal,
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(reason) => AppError::StoreUnavailable(reason),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::StoreUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Couldn't connect to the database! This is likely a temporary error, try again later!"
                    .to_string(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Rejected(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
