use anyhow::Result;
use std::collections::BTreeSet;
use std::env;

use crate::commands::CommandReport;
use crate::finder::config::{load_config, resolve_config_path};
use crate::finder::paths::resolve_paths;
use crate::synda::client::synda_available;

include!(concat!(env!("OUT_DIR"), "/datafinder_env_allowlist.rs"));

const ENV_PREFIX: &str = "DATAFINDER_";

/// `DATAFINDER_*` keys in `vars` that nothing in this binary reads.
pub fn unknown_env_keys<I>(vars: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let known = GENERATED_DATAFINDER_ENV_ALLOWLIST
        .iter()
        .copied()
        .collect::<BTreeSet<_>>();
    vars.into_iter()
        .filter(|k| k.starts_with(ENV_PREFIX) && !known.contains(k.as_str()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("finder_home={}", paths.finder_home.display()));
    report.detail(format!("output_dir={}", paths.output_dir.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));
    match resolve_config_path() {
        Some(path) if path.exists() => report.detail(format!("config_path={}", path.display())),
        Some(path) => report.detail(format!("config_path={} (absent, defaults)", path.display())),
        None => report.detail("config_path=none (defaults)"),
    }

    let cfg = match load_config() {
        Ok(cfg) => cfg,
        Err(err) => {
            report.issue(format!("config: {err:#}"));
            return Ok(report);
        }
    };

    for (name, ds) in &cfg.datasources {
        let state = if ds.root.is_dir() { "ok" } else { "missing" };
        report.detail(format!(
            "datasource={name} root={} latest_dir={} state={state}",
            ds.root.display(),
            ds.latest_dir
        ));
    }

    match synda_available(&cfg.synda) {
        Some(bin) => report.detail(format!("synda_bin={}", bin.display())),
        None => report.detail("synda_bin=unavailable (--synda will fail)"),
    }
    report.detail(format!("synda_data_root={}", cfg.synda.data_root.display()));
    report.detail(format!("synda_retries={}", cfg.synda.retries));

    for key in unknown_env_keys(env::vars().map(|(k, _)| k)) {
        report.issue(format!("unknown environment key {key}"));
    }

    Ok(report)
}
