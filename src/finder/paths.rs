use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct FinderPaths {
    pub finder_home: PathBuf,
    pub output_dir: PathBuf,
    pub logs_dir: PathBuf,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<FinderPaths> {
    let home = required_home_dir()?;
    let finder_home = env_or_default_path("DATAFINDER_HOME", home.join("datafinder"));
    let cwd = env::current_dir().context("current directory is not accessible")?;

    let output_dir = env_or_default_path("DATAFINDER_OUTPUT_DIR", cwd);
    let logs_dir = env_or_default_path("DATAFINDER_LOGS_DIR", finder_home.join("logs"));

    Ok(FinderPaths {
        finder_home,
        output_dir,
        logs_dir,
    })
}
