// config.rs — Blueprint configuration, validated once at construction.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::error::BlueprintError;
use crate::notebook;

/// Default lifetime of a confirmation token minted by the prepare step.
const DEFAULT_TOKEN_MAX_AGE: Duration = Duration::from_secs(30 * 60);

/// Configuration of the template blueprint.
///
/// Construct with [`BlueprintConfig::new`] or load from a TOML file with
/// [`BlueprintConfig::from_toml_file`]. Both validate eagerly: the template
/// directory must exist, the template list must be non-empty, every listed
/// template must be a safe relative path backed by a file, and the signing
/// secret must be non-empty. A handler never re-validates.
#[derive(Debug, Clone)]
pub struct BlueprintConfig {
    /// Directory containing the `.ipynb` template files.
    pub template_dir: PathBuf,
    /// Enabled template names, as paths relative to `template_dir`.
    pub templates: Vec<String>,
    /// Secret key for signing confirmation tokens.
    pub secret_key: Vec<u8>,
    /// Maximum age of a confirmation token before creation rejects it.
    pub token_max_age: Duration,
}

/// `blueprint.toml` schema for [`BlueprintConfig::from_toml_file`].
#[derive(Deserialize)]
struct TomlConfig {
    /// Template directory; relative paths are resolved against the TOML
    /// file's own directory.
    template_dir: PathBuf,
    /// Enabled templates. Omit to enable every `.ipynb` file found under
    /// `template_dir`.
    templates: Option<Vec<String>>,
    /// Token signing secret.
    secret_key: String,
    /// Token lifetime in seconds (default: 1800).
    token_max_age_secs: Option<u64>,
}

impl BlueprintConfig {
    /// Build a config with the default token lifetime.
    pub fn new(
        template_dir: PathBuf,
        templates: Vec<String>,
        secret_key: Vec<u8>,
    ) -> Result<Self, BlueprintError> {
        Self::with_token_max_age(template_dir, templates, secret_key, DEFAULT_TOKEN_MAX_AGE)
    }

    /// Build a config with an explicit token lifetime.
    pub fn with_token_max_age(
        template_dir: PathBuf,
        templates: Vec<String>,
        secret_key: Vec<u8>,
        token_max_age: Duration,
    ) -> Result<Self, BlueprintError> {
        let config = Self {
            template_dir,
            templates,
            secret_key,
            token_max_age,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load the config from a TOML file.
    ///
    /// When the file omits `templates`, every `.ipynb` file under the
    /// template directory is enabled.
    pub fn from_toml_file(path: &Path) -> Result<Self, BlueprintError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BlueprintError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let toml: TomlConfig = toml::from_str(&contents).map_err(|e| {
            BlueprintError::Configuration(format!("cannot parse {}: {e}", path.display()))
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let template_dir = if toml.template_dir.is_absolute() {
            toml.template_dir
        } else {
            base.join(toml.template_dir)
        };

        let templates = match toml.templates {
            Some(templates) => templates,
            None => notebook::scan_templates(&template_dir).map_err(|e| {
                BlueprintError::Configuration(format!(
                    "cannot scan {}: {e}",
                    template_dir.display()
                ))
            })?,
        };

        let token_max_age = toml
            .token_max_age_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_MAX_AGE);

        let config = Self::with_token_max_age(
            template_dir,
            templates,
            toml.secret_key.into_bytes(),
            token_max_age,
        )?;
        info!(
            path = %path.display(),
            templates = config.templates.len(),
            "blueprint config loaded"
        );
        Ok(config)
    }

    /// Absolute path of a configured template. Callers must have checked
    /// membership in [`templates`](Self::templates) first.
    pub fn template_path(&self, name: &str) -> PathBuf {
        self.template_dir.join(name)
    }

    fn validate(&self) -> Result<(), BlueprintError> {
        if !self.template_dir.is_dir() {
            return Err(BlueprintError::Configuration(format!(
                "template directory {} does not exist",
                self.template_dir.display()
            )));
        }
        if self.templates.is_empty() {
            return Err(BlueprintError::Configuration(
                "the template list is empty".into(),
            ));
        }
        for name in &self.templates {
            if !is_safe_relative_path(name) {
                return Err(BlueprintError::Configuration(format!(
                    "template name {name:?} must be a relative path without parent components"
                )));
            }
            if !self.template_dir.join(name).is_file() {
                return Err(BlueprintError::Configuration(format!(
                    "template {name:?} has no backing file in {}",
                    self.template_dir.display()
                )));
            }
        }
        if self.secret_key.is_empty() {
            return Err(BlueprintError::Configuration(
                "the signing secret is empty".into(),
            ));
        }
        Ok(())
    }
}

/// Template names come from configuration, not requests, but they are still
/// joined onto the template directory — reject anything that could escape it.
fn is_safe_relative_path(name: &str) -> bool {
    let path = Path::new(name);
    !name.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}
