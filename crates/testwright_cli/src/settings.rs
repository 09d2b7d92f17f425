//! Layered configuration: defaults, workspace settings file, environment, flags.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use testwright_core::{PipelineConfig, RetryPolicy, WriteOptions, DEFAULT_LIBRARY};
use testwright_llm::{ProviderConfig, ProviderKind};

use crate::commands::RunArgs;

/// Settings directory inside the workspace.
pub const SETTINGS_DIR: &str = ".testwright";

/// Settings file name inside [`SETTINGS_DIR`].
pub const SETTINGS_FILE: &str = "settings.json";

/// Contents of `.testwright/settings.json`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSettings {
    pub default_provider: Option<String>,
    pub default_model: Option<String>,
    pub base_url: Option<String>,
    pub max_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub backup: Option<bool>,
    pub library: Option<String>,
}

impl WorkspaceSettings {
    /// Load settings from the workspace, or defaults if there is no file.
    pub fn load(workspace_root: &Path) -> Result<Self> {
        let path = workspace_root.join(SETTINGS_DIR).join(SETTINGS_FILE);
        if !path.exists() {
            debug!("No settings file at {:?}", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid settings file {}", path.display()))
    }
}

/// Fully resolved configuration for one run.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub provider: ProviderConfig,
    pub pipeline: PipelineConfig,
}

/// Merge settings, environment and flags.
///
/// `env` is a lookup function so tests need not touch the process
/// environment.
pub fn resolve<F>(settings: &WorkspaceSettings, args: &RunArgs, env: F) -> Result<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    let explicit_kind = args
        .provider
        .clone()
        .or_else(|| env("TESTWRIGHT_PROVIDER"))
        .or_else(|| settings.default_provider.clone());

    let kind = match explicit_kind {
        Some(name) => name.parse::<ProviderKind>()?,
        // Fall back to OpenAI so the credential error names a concrete variable.
        None => ProviderKind::detect(&env).unwrap_or(ProviderKind::OpenAi),
    };

    let mut provider = ProviderConfig::new(kind).api_key(env(kind.api_key_env()));
    if let Some(model) = args
        .model
        .clone()
        .or_else(|| env("TESTWRIGHT_MODEL"))
        .or_else(|| settings.default_model.clone())
    {
        provider = provider.model(model);
    }
    if let Some(url) = env("TESTWRIGHT_BASE_URL").or_else(|| settings.base_url.clone()) {
        provider = provider.base_url(url);
    }

    let mut retry = RetryPolicy::default();
    if let Some(attempts) = args.max_attempts.or(settings.max_attempts) {
        retry = retry.max_attempts(attempts);
    }
    if let Some(ms) = settings.retry_delay_ms {
        retry = retry.delay(Duration::from_millis(ms));
    }
    retry = retry.skip_validation(args.skip_validation);

    let pipeline = PipelineConfig {
        library: settings
            .library
            .clone()
            .unwrap_or_else(|| DEFAULT_LIBRARY.to_string()),
        retry,
        write: WriteOptions {
            backup: !args.no_backup && settings.backup.unwrap_or(true),
            dry_run: args.dry_run,
        },
        run_timeout: args
            .timeout
            .or(settings.timeout_secs)
            .map(Duration::from_secs),
        ..PipelineConfig::default()
    };

    Ok(ResolvedConfig { provider, pipeline })
}
