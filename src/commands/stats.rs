use anyhow::Result;
use std::path::Path;

use crate::commands::CommandReport;
use crate::error::FinderWarnCode;
use crate::finder::manifest::Manifest;
use crate::finder::stats::RunStats;
use crate::finder::warn::{self, WarnEvent};

pub fn run(manifest_path: &Path) -> Result<CommandReport> {
    let mut report = CommandReport::new("stats");
    let (manifest, rejected) = Manifest::read(manifest_path)?;

    let path = manifest_path.to_string_lossy();
    for line in &rejected {
        warn::emit(WarnEvent {
            code: FinderWarnCode::W008ManifestLine,
            stage: "stats",
            descriptor: "na",
            path: &path,
            reason: line,
        });
    }

    report.detail(format!("manifest={}", manifest_path.display()));
    if !rejected.is_empty() {
        report.detail(format!("skipped_lines={}", rejected.len()));
    }
    for line in RunStats::from_manifest(&manifest).summary_lines() {
        report.detail(line);
    }
    Ok(report)
}
