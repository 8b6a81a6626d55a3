// demo.rs — Local demo host for the notebook template blueprint.
//
// No authentication; rendered notebooks are written under an output
// directory. With --jupyterhub-url the create step redirects there,
// otherwise it answers with a plain created response.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::http::HeaderMap;
use clap::Parser;
use rand_core::{OsRng, RngCore};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use notebook_templates::{notebook, Blueprint, BlueprintConfig, Destination, NotebookHost};

#[derive(Parser)]
#[command(
    name = "notebook-templates-demo",
    about = "Serve a directory of Jupyter notebook templates"
)]
struct Args {
    /// Port to listen on.
    #[arg(long, default_value_t = 8000)]
    port: u16,
    /// Directory containing the .ipynb templates.
    #[arg(long)]
    template_dir: PathBuf,
    /// Directory where rendered notebooks are written.
    #[arg(long, default_value = "notebook-output")]
    output_dir: PathBuf,
    /// JupyterHub base URL to redirect to after creation, e.g.
    /// https://hub.example.org/user/demo.
    #[arg(long)]
    jupyterhub_url: Option<String>,
    /// Token signing secret. A random per-process secret is generated when
    /// unset, which invalidates outstanding tokens on restart.
    #[arg(long, env = "NOTEBOOK_TEMPLATES_SECRET")]
    secret_key: Option<String>,
}

struct DemoHost {
    output_dir: PathBuf,
    jupyterhub_url: Option<String>,
}

#[async_trait]
impl NotebookHost for DemoHost {
    type User = ();

    async fn handle_authentication(&self, _headers: &HeaderMap) -> Result<()> {
        // The demo is open to anyone who can reach it.
        Ok(())
    }

    async fn get_destination_for_notebook(&self, relative_path: &str) -> Result<Destination> {
        let absolute = self.output_dir.join(relative_path);
        Ok(Destination(json!({
            "relative": relative_path,
            "absolute": absolute,
        })))
    }

    async fn save_notebook_to_destination(
        &self,
        notebook: &[u8],
        destination: &Destination,
        _user: &(),
    ) -> Result<()> {
        let path = destination
            .0
            .get("absolute")
            .and_then(|v| v.as_str())
            .context("destination has no absolute path")?;
        let path = PathBuf::from(path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, notebook).await?;
        info!(path = %path.display(), "notebook saved");
        Ok(())
    }

    async fn get_jupyterhub_url_for_destination(
        &self,
        destination: &Destination,
    ) -> Result<Option<String>> {
        let Some(base) = &self.jupyterhub_url else {
            return Ok(None);
        };
        let relative = destination
            .relative_path()
            .context("destination has no relative path")?;
        Ok(Some(format!("{}/{relative}", base.trim_end_matches('/'))))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let secret_key = match args.secret_key {
        Some(s) => s.into_bytes(),
        None => {
            let mut buf = vec![0u8; 32];
            OsRng.fill_bytes(&mut buf);
            buf
        }
    };

    let templates = notebook::scan_templates(&args.template_dir)?;
    let config = BlueprintConfig::new(args.template_dir, templates, secret_key)?;
    let host = DemoHost {
        output_dir: args.output_dir,
        jupyterhub_url: args.jupyterhub_url,
    };
    let router = Blueprint::new(config, host).router();

    let addr: SocketAddr = format!("127.0.0.1:{}", args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("notebook template server listening on http://{addr}");
    axum::serve(listener, router).await?;
    Ok(())
}
