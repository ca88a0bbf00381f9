use anyhow::Result;

use crate::cli::FindArgs;
use crate::commands::CommandReport;
use crate::error::FinderWarnCode;
use crate::finder::audit;
use crate::finder::config::load_config;
use crate::finder::local::LocalMirror;
use crate::finder::lock::RunLock;
use crate::finder::params::{DescriptorBatch, from_user_input, load_params_file};
use crate::finder::paths::resolve_paths;
use crate::finder::pipeline::{RunOptions, run_pipeline};
use crate::finder::source::RemoteIndex;
use crate::finder::stats::RunStats;
use crate::finder::warn::{self, WarnEvent};
use crate::synda::client::SyndaClient;

const USER_INPUT_NAME: &str = "user.txt";

fn load_descriptors(args: &FindArgs) -> Result<(DescriptorBatch, String)> {
    if let Some(path) = &args.params_file {
        let batch = load_params_file(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("params")
            .to_string();
        return Ok((batch, name));
    }
    let batch = from_user_input(&args.fileparams, &args.uservars)?;
    Ok((batch, USER_INPUT_NAME.to_string()))
}

pub fn run(args: &FindArgs) -> Result<CommandReport> {
    let mut paths = resolve_paths()?;
    if let Some(dir) = &args.output_dir {
        paths.output_dir = dir.clone();
    }
    let cfg = load_config()?;
    let mut report = CommandReport::new("find");

    if args.dryrun && !args.download {
        warn::emit(WarnEvent {
            code: FinderWarnCode::W009IgnoredFlag,
            stage: "args",
            descriptor: "na",
            path: "na",
            reason: "--dryrun has no effect without --download",
        });
        report.detail("dryrun ignored: --download not set");
    }

    let lock = RunLock::acquire(&paths.output_dir)?;
    report.detail(format!("lock={}", lock.path().display()));
    let (batch, manifest_name) = load_descriptors(args)?;

    for (line, err) in &batch.rejected {
        warn::emit(WarnEvent {
            code: FinderWarnCode::W002InvalidDescriptor,
            stage: "params",
            descriptor: line,
            path: &manifest_name,
            reason: &err.to_string(),
        });
        report.detail(format!("rejected descriptor `{line}`: {err}"));
    }
    if batch.descriptors.is_empty() {
        report.issue("no valid descriptors to resolve");
        return Ok(report);
    }

    audit::append_event(
        &paths,
        "find",
        "started",
        &format!(
            "{} descriptors, datasources={}, synda={}",
            batch.descriptors.len(),
            args.datasource.join(","),
            args.synda
        ),
    )?;

    let client = if args.synda {
        let client = SyndaClient::from_config(&cfg.synda)?;
        report.detail(format!("synda_bin={}", client.bin().display()));
        Some(client)
    } else {
        None
    };
    let remote = client.as_ref().map(|c| c as &dyn RemoteIndex);

    let opts = RunOptions {
        download: args.download,
        dry_run: args.dryrun,
        verbose: args.verbose,
        manifest_name,
    };

    report.detail(format!("descriptors={}", batch.descriptors.len()));
    for name in &args.datasource {
        let mirror = LocalMirror::new(name, cfg.datasource(name)?);
        mirror.ensure_available()?;

        let outcome = run_pipeline(&batch.descriptors, &mirror, remote, &paths.output_dir, &opts)?;
        let stats = RunStats::from_manifest(&outcome.manifest);

        report.detail(format!("datasource={name} root={}", mirror.root().display()));
        report.detail(format!(
            "manifest={} lines={}",
            outcome.manifest_path.display(),
            outcome.manifest.len()
        ));
        report.detail(format!("cache_dir={}", outcome.cache.dir.display()));
        for line in stats.summary_lines() {
            report.detail(line);
        }
        if outcome.remote_failures > 0 {
            report.detail(format!("remote_failures={}", outcome.remote_failures));
        }
        if args.verbose {
            for note in &outcome.notes {
                report.detail(note.clone());
            }
        }

        audit::append_event(
            &paths,
            "datasource",
            "ok",
            &format!(
                "{name}: complete={} incomplete={} missing={} manifest={}",
                stats.complete + stats.complete_with_gaps,
                stats.incomplete + stats.incomplete_with_gaps,
                stats.missing,
                outcome.manifest_path.display()
            ),
        )?;
    }

    audit::append_event(&paths, "find", "completed", "all datasources resolved")?;
    Ok(report)
}
