// routes.rs — Blueprint route handlers.
//
// Each handler is one linear sequence of delegated calls with early exit:
// template check → authentication → destination → render → save → URL.
// A failure at any step stops the sequence; later callbacks never run.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::blueprint::Blueprint;
use crate::error::BlueprintError;
use crate::host::{Destination, NotebookHost};
use crate::{notebook, token};

/// `GET /` — the configured template list.
pub async fn list_templates<H: NotebookHost>(
    State(ctx): State<Arc<Blueprint<H>>>,
    headers: HeaderMap,
) -> Result<Json<Value>, BlueprintError> {
    ctx.host
        .handle_authentication(&headers)
        .await
        .map_err(BlueprintError::Unauthorized)?;
    Ok(Json(json!({ "templates": ctx.config.templates })))
}

#[derive(Deserialize, Default)]
pub struct PrepareQuery {
    /// JSON-encoded parameter object, e.g. `?params={"x":1}`.
    params: Option<String>,
}

/// `GET /t/{*path}` — resolve the destination for a template instance and
/// mint a confirmation token binding it to the caller's parameters.
pub async fn prepare_instance<H: NotebookHost>(
    State(ctx): State<Arc<Blueprint<H>>>,
    Path(path): Path<String>,
    Query(query): Query<PrepareQuery>,
    headers: HeaderMap,
) -> Result<Json<Value>, BlueprintError> {
    ctx.require_template(&path)?;
    ctx.host
        .handle_authentication(&headers)
        .await
        .map_err(BlueprintError::Unauthorized)?;

    let params = parse_params(query.params.as_deref())?;
    let relative = notebook::format_destination(&path, &params)?;
    let destination = ctx
        .host
        .get_destination_for_notebook(&relative)
        .await
        .map_err(BlueprintError::DestinationFailed)?;

    let token = token::mint(&path, &destination, &params, &ctx.config.secret_key)
        .map_err(|e| BlueprintError::Configuration(format!("token signing failed: {e}")))?;

    debug!(template = %path, relative = %relative, "prepared notebook instance");
    Ok(Json(json!({
        "template": path,
        "destination": destination,
        "params": params,
        "token": token,
    })))
}

#[derive(Deserialize, Default)]
pub struct CreateRequest {
    /// Confirmation token from the prepare step. Takes precedence over
    /// `params`: the destination bound at preparation time is reused.
    token: Option<String>,
    /// Parameters for single-shot creation without a prepare step.
    params: Option<Map<String, Value>>,
}

/// `POST /t/{*path}` — render the template, hand it to the host's save
/// callback, and redirect to its JupyterHub URL.
pub async fn create_instance<H: NotebookHost>(
    State(ctx): State<Arc<Blueprint<H>>>,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, BlueprintError> {
    ctx.require_template(&path)?;
    let user = ctx
        .host
        .handle_authentication(&headers)
        .await
        .map_err(BlueprintError::Unauthorized)?;

    let body: CreateRequest = if body.is_empty() {
        CreateRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|_| BlueprintError::InvalidParameters)?
    };
    let (destination, params) = match body.token {
        Some(raw) => {
            let t = token::verify(&raw, &ctx.config.secret_key, ctx.config.token_max_age)
                .map_err(BlueprintError::InvalidToken)?;
            if t.template != path {
                return Err(BlueprintError::InvalidToken(anyhow::anyhow!(
                    "token was minted for template {:?}",
                    t.template
                )));
            }
            (t.destination, t.params)
        }
        None => {
            let params = body.params.unwrap_or_default();
            let relative = notebook::format_destination(&path, &params)?;
            let destination = ctx
                .host
                .get_destination_for_notebook(&relative)
                .await
                .map_err(BlueprintError::DestinationFailed)?;
            (destination, params)
        }
    };

    let rendered = notebook::render_template(&ctx.config.template_path(&path), &params)
        .map_err(BlueprintError::RenderFailed)?;

    ctx.host
        .save_notebook_to_destination(&rendered, &destination, &user)
        .await
        .map_err(BlueprintError::StorageFailure)?;

    let url = ctx
        .host
        .get_jupyterhub_url_for_destination(&destination)
        .await
        .map_err(BlueprintError::UrlFailed)?;

    info!(template = %path, "notebook instance created");

    if let Some(url) = url {
        return Ok(Redirect::to(&url).into_response());
    }
    if destination.wants_inline_download() {
        return Ok(download_response(&destination, rendered));
    }
    Ok((StatusCode::CREATED, Json(json!({ "status": "created" }))).into_response())
}

/// Serve the rendered notebook as an attachment when the host has no
/// JupyterHub URL for it but marked the destination as inline.
fn download_response(destination: &Destination, rendered: Vec<u8>) -> Response {
    let filename = destination
        .relative_path()
        .and_then(|p| p.rsplit('/').next())
        .unwrap_or("notebook.ipynb")
        .replace('"', "");
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/vnd.jupyter".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        rendered,
    )
        .into_response()
}

/// The `params` query argument is a JSON-encoded object; anything else is
/// rejected rather than silently ignored.
fn parse_params(raw: Option<&str>) -> Result<Map<String, Value>, BlueprintError> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(BlueprintError::InvalidParameters),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_params_default_to_empty() {
        assert!(parse_params(None).unwrap().is_empty());
    }

    #[test]
    fn object_params_are_parsed() {
        let params = parse_params(Some(r#"{"x": 1}"#)).unwrap();
        assert_eq!(params.get("x"), Some(&json!(1)));
    }

    #[test]
    fn non_object_params_are_rejected() {
        for raw in ["[1]", "\"x\"", "not json", "3"] {
            assert!(matches!(
                parse_params(Some(raw)),
                Err(BlueprintError::InvalidParameters)
            ));
        }
    }

    #[test]
    fn download_filename_comes_from_the_relative_basename() {
        let d = Destination(json!({ "relative": "runs/ada/report.ipynb", "data": true }));
        let resp = download_response(&d, b"{}".to_vec());
        let disposition = resp
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(disposition, "attachment; filename=\"report.ipynb\"");
    }

    #[test]
    fn download_filename_falls_back_without_a_relative_path() {
        let d = Destination(json!({ "data": true }));
        let resp = download_response(&d, b"{}".to_vec());
        let disposition = resp
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(disposition.contains("notebook.ipynb"));
    }
}
