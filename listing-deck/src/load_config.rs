/// `load_config` module: reads the static YAML config and injects the API token from the environment.
///
/// The YAML file carries no secrets. It names the design host, the listings to
/// insert and, optionally, how exports are requested and where extracted files
/// are saved. `DESIGN_API_TOKEN` is read from the environment (a `.env` file is
/// honoured through `dotenvy` in `main`).
///
/// # Errors
/// All failures are `anyhow::Error` with a message naming the failing step.
use anyhow::{Context, Result};
use listing_deck_core::config::{ExportSettings, FileType, DEFAULT_NAME_PREFIX};
use listing_deck_core::contract::Listing;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

pub const TOKEN_ENV: &str = "DESIGN_API_TOKEN";

#[derive(Debug)]
pub struct CliConfig {
    pub design: DesignSection,
    pub listings: Vec<Listing>,
    pub export: ExportSection,
    pub api_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DesignSection {
    pub base_url: String,
    /// Pins the target design. When absent the host's active design is used.
    #[serde(default)]
    pub design_id: Option<String>,
    /// Per-request timeout for the design API and every asset download.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl DesignSection {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportSection {
    pub accepted_file_types: Vec<FileType>,
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub name_prefix: String,
    pub output_dir: PathBuf,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            accepted_file_types: FileType::default_allow_list(),
            timeout_secs: 300,
            poll_interval_ms: 2000,
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            output_dir: PathBuf::from("./exports"),
        }
    }
}

impl ExportSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settings(&self) -> ExportSettings {
        ExportSettings {
            accepted_file_types: self.accepted_file_types.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            name_prefix: self.name_prefix.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    design: DesignSection,
    #[serde(default)]
    listings: Vec<Listing>,
    #[serde(default)]
    export: ExportSection,
}

/// Loads the YAML config at `path` and injects `DESIGN_API_TOKEN`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if raw.export.accepted_file_types.is_empty() {
        error!(config_path = ?path_ref, "Export allow-list is empty");
        anyhow::bail!("export.accepted_file_types must name at least one file type");
    }

    let api_token = env::var(TOKEN_ENV)
        .with_context(|| format!("{TOKEN_ENV} must be set in the environment"))?;

    info!(
        base_url = %raw.design.base_url,
        listings = raw.listings.len(),
        output_dir = ?raw.export.output_dir,
        "Configuration loaded"
    );

    Ok(CliConfig {
        design: raw.design,
        listings: raw.listings,
        export: raw.export,
        api_token,
    })
}
