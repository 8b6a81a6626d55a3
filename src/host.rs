// host.rs — The four host-supplied integration points of the blueprint.

use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

/// Host-defined location for a saved notebook.
///
/// The blueprint treats the value as opaque JSON and round-trips it through
/// the signed confirmation token unchanged. Two conventional keys are
/// inspected for the download fallback:
///
/// - `relative` — relative notebook path, used for the download filename
/// - `data` — any non-null value marks the destination as inline, so a
///   `None` JupyterHub URL serves the rendered notebook as an attachment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Destination(pub serde_json::Value);

impl Destination {
    /// The `relative` key, when present and a string.
    pub fn relative_path(&self) -> Option<&str> {
        self.0.get("relative").and_then(|v| v.as_str())
    }

    /// Whether the host marked this destination for inline download.
    pub fn wants_inline_download(&self) -> bool {
        self.0.get("data").is_some_and(|v| !v.is_null())
    }
}

/// The integration contract a host application implements to mount the
/// blueprint.
///
/// The blueprint validates the template name and orders these calls; all
/// actual behavior belongs to the implementor. Errors propagate unchanged
/// to the web layer, wrapped in the
/// [`BlueprintError`](crate::BlueprintError) variant for the step that
/// failed. No retries are performed.
#[async_trait]
pub trait NotebookHost: Send + Sync + 'static {
    /// Opaque identity of the authenticated caller. Passed to
    /// [`save_notebook_to_destination`](Self::save_notebook_to_destination)
    /// for authorization and attribution, otherwise untouched.
    type User: Send + Sync;

    /// Authenticate the incoming request. A failure maps to 401 and stops
    /// the request before any other callback runs.
    async fn handle_authentication(&self, headers: &HeaderMap) -> anyhow::Result<Self::User>;

    /// Resolve where a notebook with the given relative path should live.
    /// The relative path is the template path with `{placeholder}`
    /// occurrences substituted from the caller's parameters.
    async fn get_destination_for_notebook(&self, relative_path: &str)
        -> anyhow::Result<Destination>;

    /// Persist the rendered notebook (UTF-8 encoded nbformat JSON) at the
    /// destination. A failure maps to a storage error; whether anything was
    /// partially written is host-defined.
    async fn save_notebook_to_destination(
        &self,
        notebook: &[u8],
        destination: &Destination,
        user: &Self::User,
    ) -> anyhow::Result<()>;

    /// Build a browsable URL for the saved notebook, usually the JupyterHub
    /// base URL followed by `/user/{name}/` and the relative path.
    ///
    /// `Ok(None)` selects the inline download fallback when the destination
    /// carries a `data` key, or a plain created response otherwise.
    async fn get_jupyterhub_url_for_destination(
        &self,
        destination: &Destination,
    ) -> anyhow::Result<Option<String>>;
}
