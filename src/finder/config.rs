use crate::error::FinderError;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_DATASOURCE: &str = "badc";

/// A local mirror laid out in the CMIP5 directory reference syntax.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasourceConfig {
    pub root: PathBuf,
    #[serde(default = "default_latest_dir")]
    pub latest_dir: String,
}

fn default_latest_dir() -> String {
    "latest".to_string()
}

impl Default for DatasourceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/badc/cmip5/data/cmip5/output1"),
            latest_dir: default_latest_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyndaConfig {
    pub bin: Option<String>,
    pub data_root: PathBuf,
    pub retries: usize,
    pub install_timeout_secs: Option<u64>,
}

impl Default for SyndaConfig {
    fn default() -> Self {
        Self {
            bin: None,
            data_root: PathBuf::from("/sdt/data"),
            retries: 1,
            install_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinderConfig {
    pub datasources: BTreeMap<String, DatasourceConfig>,
    pub synda: SyndaConfig,
}

impl Default for FinderConfig {
    fn default() -> Self {
        let mut datasources = BTreeMap::new();
        datasources.insert(DEFAULT_DATASOURCE.to_string(), DatasourceConfig::default());
        Self {
            datasources,
            synda: SyndaConfig::default(),
        }
    }
}

impl FinderConfig {
    pub fn datasource(&self, name: &str) -> Result<&DatasourceConfig, FinderError> {
        self.datasources.get(name).ok_or_else(|| {
            FinderError::InvalidConfig(format!(
                "unknown datasource `{name}` (known: {})",
                self.datasources
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialFinderConfig {
    datasources: Option<BTreeMap<String, DatasourceConfig>>,
    synda: Option<SyndaConfig>,
}

fn env_or_usize(var: &str, fallback: usize) -> usize {
    match env::var(var) {
        Ok(v) => v.trim().parse::<usize>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn env_optional_string(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn validate(cfg: &FinderConfig) -> Result<()> {
    if cfg.datasources.is_empty() {
        return Err(anyhow!("invalid datasources: at least one must be configured"));
    }
    for (name, ds) in &cfg.datasources {
        if name.trim().is_empty() || name.contains(char::is_whitespace) {
            return Err(anyhow!("invalid datasource name `{name}`"));
        }
        if ds.root.as_os_str().is_empty() {
            return Err(anyhow!("invalid datasource `{name}`: root cannot be empty"));
        }
        if ds.latest_dir.trim().is_empty() || ds.latest_dir.contains('/') {
            return Err(anyhow!(
                "invalid datasource `{name}`: latest_dir must be a single directory name"
            ));
        }
    }
    if cfg.synda.data_root.as_os_str().is_empty() {
        return Err(anyhow!("invalid synda data root: cannot be empty"));
    }
    if cfg.synda.retries > 10 {
        return Err(anyhow!("invalid synda retries: must be <= 10"));
    }
    if cfg.synda.install_timeout_secs == Some(0) {
        return Err(anyhow!("invalid synda install timeout: must be >= 1 second"));
    }
    Ok(())
}

pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("DATAFINDER_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let base = dirs::config_dir()?;
    Some(base.join("datafinder").join("datafinder.toml"))
}

fn merge_file_config(base: &mut FinderConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let parsed = parse_partial(&raw)
        .map_err(|err| anyhow!("failed to parse datafinder config {}: {err}", path.display()))?;
    apply_partial(base, parsed);
    Ok(())
}

fn parse_partial(raw: &str) -> Result<PartialFinderConfig, toml::de::Error> {
    toml::from_str(raw)
}

fn apply_partial(base: &mut FinderConfig, parsed: PartialFinderConfig) {
    if let Some(datasources) = parsed.datasources {
        base.datasources.extend(datasources);
    }
    if let Some(synda) = parsed.synda {
        base.synda = synda;
    }
}

fn apply_env(cfg: &mut FinderConfig) {
    if let Some(badc) = cfg.datasources.get_mut(DEFAULT_DATASOURCE) {
        badc.root = PathBuf::from(env_or_string(
            "DATAFINDER_BADC_ROOT",
            &badc.root.to_string_lossy(),
        ));
        badc.latest_dir = env_or_string("DATAFINDER_LATEST_DIR", &badc.latest_dir);
    }
    if let Some(bin) = env_optional_string("DATAFINDER_SYNDA_BIN") {
        cfg.synda.bin = Some(bin);
    }
    cfg.synda.data_root = PathBuf::from(env_or_string(
        "DATAFINDER_SYNDA_DATA_ROOT",
        &cfg.synda.data_root.to_string_lossy(),
    ));
    cfg.synda.retries = env_or_usize("DATAFINDER_SYNDA_RETRIES", cfg.synda.retries);
}

pub fn load_config() -> Result<FinderConfig> {
    let mut cfg = FinderConfig::default();
    merge_file_config(&mut cfg)?;
    apply_env(&mut cfg);
    validate(&cfg)?;
    Ok(cfg)
}
