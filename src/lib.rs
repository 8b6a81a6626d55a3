//! Blueprint for a Jupyter notebook templating server.
//!
//! The blueprint exposes a directory of notebook templates over HTTP,
//! renders a chosen template with caller-supplied parameters, hands the
//! rendered notebook to host-supplied persistence, and redirects the caller
//! to the notebook's location on the host's JupyterHub.
//!
//! All actual behavior — authentication, destination choice, persistence,
//! URL construction — belongs to the host application, which supplies it as
//! a [`NotebookHost`] implementation. The blueprint only orders those four
//! calls and validates the template name.
//!
//! ```no_run
//! use notebook_templates::{Blueprint, BlueprintConfig};
//! # use notebook_templates::{Destination, NotebookHost};
//! # use async_trait::async_trait;
//! # struct MyHost;
//! # #[async_trait]
//! # impl NotebookHost for MyHost {
//! #     type User = ();
//! #     async fn handle_authentication(&self, _: &axum::http::HeaderMap) -> anyhow::Result<()> { Ok(()) }
//! #     async fn get_destination_for_notebook(&self, _: &str) -> anyhow::Result<Destination> { unimplemented!() }
//! #     async fn save_notebook_to_destination(&self, _: &[u8], _: &Destination, _: &()) -> anyhow::Result<()> { Ok(()) }
//! #     async fn get_jupyterhub_url_for_destination(&self, _: &Destination) -> anyhow::Result<Option<String>> { Ok(None) }
//! # }
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = BlueprintConfig::new(
//!     "notebook_templates".into(),
//!     vec!["analysis.ipynb".into()],
//!     b"secret signing key".to_vec(),
//! )?;
//! let router = Blueprint::new(config, MyHost).router();
//! // nest `router` under any prefix of the host application's choice
//! # Ok(())
//! # }
//! ```

pub mod blueprint;
pub mod config;
pub mod error;
pub mod host;
pub mod notebook;
pub mod routes;
pub mod token;

pub use blueprint::Blueprint;
pub use config::BlueprintConfig;
pub use error::BlueprintError;
pub use host::{Destination, NotebookHost};
