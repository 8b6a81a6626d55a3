// blueprint.rs — The mountable template blueprint.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::BlueprintConfig;
use crate::error::BlueprintError;
use crate::host::NotebookHost;
use crate::routes;

/// The notebook template blueprint: validated configuration plus the host's
/// four integration callbacks, served as an [`axum::Router`].
///
/// Immutable after construction; each request is an independent, stateless
/// sequence of delegated calls.
pub struct Blueprint<H: NotebookHost> {
    pub(crate) config: BlueprintConfig,
    pub(crate) host: H,
}

impl<H: NotebookHost> Blueprint<H> {
    pub fn new(config: BlueprintConfig, host: H) -> Self {
        Self { config, host }
    }

    /// Build the mountable router:
    ///
    /// - `GET  /`            list the enabled templates
    /// - `GET  /t/{*path}`   prepare an instance (destination + token)
    /// - `POST /t/{*path}`   create an instance (save + redirect)
    ///
    /// Nest it under a prefix of the host application's choice.
    pub fn router(self) -> Router {
        info!(
            template_dir = %self.config.template_dir.display(),
            templates = self.config.templates.len(),
            "notebook template blueprint mounted"
        );
        Router::new()
            .route("/", get(routes::list_templates::<H>))
            .route(
                "/t/{*path}",
                get(routes::prepare_instance::<H>).post(routes::create_instance::<H>),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::new(self))
    }

    /// Reject template names outside the configured list. Runs before any
    /// host callback, so a request for an unknown template invokes nothing.
    pub(crate) fn require_template(&self, name: &str) -> Result<(), BlueprintError> {
        if self.config.templates.iter().any(|t| t == name) {
            Ok(())
        } else {
            Err(BlueprintError::NotFound)
        }
    }
}
