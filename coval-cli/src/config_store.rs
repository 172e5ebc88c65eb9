use anyhow::Context;
use coval_core::CovalConfig;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> anyhow::Result<CovalConfig> {
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("read config: {}", self.path.display()))?;
        let cfg: CovalConfig = serde_json::from_slice(&bytes).context("decode config JSON")?;
        Ok(cfg)
    }
}

/// Command-line and environment values that take precedence over the file.
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// Builds the effective config and validates it before anything touches the
/// network.
pub fn resolve_config(
    store: Option<&ConfigStore>,
    overrides: ConfigOverrides,
) -> anyhow::Result<CovalConfig> {
    let mut cfg = match store {
        Some(store) => store.load()?,
        None => CovalConfig::default(),
    };

    if let Some(api_key) = overrides.api_key.filter(|k| !k.trim().is_empty()) {
        cfg.api_key = api_key;
    }
    if let Some(base_url) = overrides.base_url.filter(|u| !u.trim().is_empty()) {
        cfg.base_url = base_url.trim_end_matches('/').to_string();
    }

    cfg.validate().context("invalid Coval configuration")?;
    log::debug!("using config {cfg:?}");
    Ok(cfg)
}
