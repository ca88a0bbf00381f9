use crate::error::{FinderError, FinderWarnCode};
use crate::finder::dates::interval_from_path;
use crate::finder::descriptor::Descriptor;
use crate::finder::interval::classify;
use crate::finder::manifest::{Manifest, write_deduped_lines};
use crate::finder::reconcile::{CoverageResult, DiscoveredFile, FileOrigin, reconcile};
use crate::finder::source::{FileDiscovery, RemoteIndex};
use crate::finder::warn::{self, WarnEvent};
use crate::synda::records::{RemoteRecord, RemoteStatus};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub download: bool,
    pub dry_run: bool,
    pub verbose: bool,
    /// File name of the descriptor input, used to name the manifest.
    pub manifest_name: String,
}

/// The per-datasource intermediate cache directory.
#[derive(Debug, Clone)]
pub struct CacheLayout {
    pub dir: PathBuf,
    datasource: String,
}

impl CacheLayout {
    /// Recreate `<output_dir>/cache_files_<ds>/` empty.
    pub fn prepare(output_dir: &Path, datasource: &str) -> Result<Self> {
        let dir = output_dir.join(format!("cache_files_{datasource}"));
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .with_context(|| format!("failed to clear {}", dir.display()))?;
        }
        fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
        Ok(Self {
            dir,
            datasource: datasource.to_string(),
        })
    }

    fn file(&self, prefix: &str) -> PathBuf {
        self.dir.join(format!("{prefix}_{}.txt", self.datasource))
    }

    pub fn local(&self) -> PathBuf {
        self.file("cache_cmip5")
    }

    pub fn local_missing(&self) -> PathBuf {
        self.file("missing_cache_cmip5")
    }

    pub fn synda(&self) -> PathBuf {
        self.file("cache_cmip5_synda")
    }

    pub fn combined(&self) -> PathBuf {
        self.file("cache_cmip5_combined")
    }

    pub fn combined_missing(&self) -> PathBuf {
        self.file("missing_cache_cmip5_combined")
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
    pub cache: CacheLayout,
    pub results: Vec<CoverageResult>,
    pub remote_failures: usize,
    pub notes: Vec<String>,
}

#[derive(Default)]
struct CacheLines {
    local: Vec<String>,
    local_missing: Vec<String>,
    synda: Vec<String>,
    combined: Vec<String>,
    combined_missing: Vec<String>,
}

fn warn_skipped(descriptor_key: &str, result: &CoverageResult, stage: &str) {
    for skipped in &result.skipped {
        warn::emit(WarnEvent {
            code: FinderWarnCode::W001MalformedDate,
            stage,
            descriptor: descriptor_key,
            path: &skipped.path,
            reason: &skipped.reason,
        });
    }
}

fn discover_local(
    local: &dyn FileDiscovery,
    descriptor: &Descriptor,
) -> Result<Vec<DiscoveredFile>> {
    match local.discover_files(descriptor) {
        Ok(files) => Ok(files.into_iter().map(DiscoveredFile::local).collect()),
        Err(err) => {
            if matches!(
                err.downcast_ref::<FinderError>(),
                Some(FinderError::CollaboratorUnavailable(_))
            ) {
                return Err(err);
            }
            warn::emit(WarnEvent {
                code: FinderWarnCode::W003UnreadableDir,
                stage: "local",
                descriptor: &descriptor.key(),
                path: local.name(),
                reason: &format!("{err:#}"),
            });
            Ok(Vec::new())
        }
    }
}

struct RemotePass<'a> {
    remote: &'a dyn RemoteIndex,
    opts: &'a RunOptions,
}

impl RemotePass<'_> {
    /// Files the remote index contributes for `descriptor`, never one whose
    /// name is already among `local_names`.
    fn collect(
        &self,
        descriptor: &Descriptor,
        local_names: &BTreeSet<String>,
        notes: &mut Vec<String>,
    ) -> Result<Vec<DiscoveredFile>> {
        let key = descriptor.key();
        let records = self
            .remote
            .search_remote(&descriptor.model_data(), &descriptor.variable)?;

        let mut added = Vec::new();
        let mut seen = BTreeSet::new();
        for record in records {
            if record.model() != Some(descriptor.model.as_str()) {
                continue;
            }
            let Some(name) = record.file_name() else {
                continue;
            };
            if local_names.contains(&name) || !seen.insert(name.clone()) {
                continue;
            }
            let interval = match interval_from_path(&name) {
                Ok(interval) => interval,
                Err(err) => {
                    warn::emit(WarnEvent {
                        code: FinderWarnCode::W001MalformedDate,
                        stage: "remote",
                        descriptor: &key,
                        path: &record.file_id,
                        reason: &err.to_string(),
                    });
                    continue;
                }
            };
            let class = classify(
                interval.year1,
                interval.year2,
                descriptor.year1,
                descriptor.year2,
            );
            if !class.relevant {
                continue;
            }
            let Some(path) = self.remote.install_path(&record, &descriptor.variable) else {
                continue;
            };
            let Some(origin) = self.origin_for(&key, &record, notes) else {
                continue;
            };
            if self.opts.verbose {
                notes.push(format!("{key} remote {} {}", origin.as_str(), path));
            }
            added.push(DiscoveredFile { path, origin });
        }
        Ok(added)
    }

    fn origin_for(
        &self,
        key: &str,
        record: &RemoteRecord,
        notes: &mut Vec<String>,
    ) -> Option<FileOrigin> {
        match record.status {
            RemoteStatus::Done => Some(FileOrigin::Installed),
            RemoteStatus::New if !self.opts.download => {
                if self.opts.verbose {
                    notes.push(format!("{key} remote available {}", record.file_id));
                }
                None
            }
            RemoteStatus::New if self.opts.dry_run => Some(FileOrigin::NotYetInstalled),
            RemoteStatus::New => match self.remote.install_remote(&record.file_id) {
                Ok(()) => Some(FileOrigin::Installed),
                Err(err) => {
                    warn::emit(WarnEvent {
                        code: FinderWarnCode::W005InstallFailed,
                        stage: "remote",
                        descriptor: key,
                        path: &record.file_id,
                        reason: &format!("{err:#}"),
                    });
                    None
                }
            },
        }
    }
}

/// Resolve every descriptor against one local mirror and, when given, the
/// remote index. Writes the cache directory and the final manifest.
pub fn run_pipeline(
    descriptors: &[Descriptor],
    local: &dyn FileDiscovery,
    remote: Option<&dyn RemoteIndex>,
    output_dir: &Path,
    opts: &RunOptions,
) -> Result<RunOutcome> {
    let cache = CacheLayout::prepare(output_dir, local.name())?;
    let mut lines = CacheLines::default();
    let mut manifest = Manifest::new();
    let mut results = Vec::with_capacity(descriptors.len());
    let mut notes = Vec::new();
    let mut remote_failures = 0usize;

    for descriptor in descriptors {
        let key = descriptor.key();
        let discovered = discover_local(local, descriptor)?;
        let mut result = reconcile(descriptor, &discovered);
        warn_skipped(&key, &result, "local");

        for file in &result.files {
            lines.local.push(format!("{key} {}", file.path));
            if opts.verbose {
                notes.push(format!("{key} local {:?} {}", file.relation, file.path));
            }
        }
        if result.files.is_empty() {
            lines.local_missing.push(format!("{key} ERROR-MISSING"));
        } else if result.status.needs_remote() {
            for file in &result.files {
                lines.local_missing.push(format!("{key} INCOMPLETE {}", file.path));
            }
        }

        if let Some(remote) = remote.filter(|_| result.status.needs_remote()) {
            let local_names = discovered
                .iter()
                .map(|f| f.file_name().to_string())
                .collect::<BTreeSet<_>>();
            let pass = RemotePass { remote, opts };
            match pass.collect(descriptor, &local_names, &mut notes) {
                Ok(added) if !added.is_empty() => {
                    for file in &added {
                        lines
                            .synda
                            .push(format!("{key} {} {}", file.path, file.origin.as_str()));
                    }
                    let mut merged = discovered.clone();
                    merged.extend(added);
                    result = reconcile(descriptor, &merged);
                }
                Ok(_) => {}
                Err(err) => {
                    remote_failures += 1;
                    warn::emit(WarnEvent {
                        code: FinderWarnCode::W004RemoteFailed,
                        stage: "remote",
                        descriptor: &key,
                        path: "synda",
                        reason: &format!("{err:#}"),
                    });
                }
            }
        }

        if opts.verbose {
            notes.push(format!(
                "{key} {} full_file={}",
                result.status,
                result.has_full_file()
            ));
        }
        if result.status.has_gaps() {
            warn::emit(WarnEvent {
                code: FinderWarnCode::W007DataGaps,
                stage: "reconcile",
                descriptor: &key,
                path: "na",
                reason: "relevant files leave a gap inside the requested window",
            });
        }
        for file in &result.files {
            lines.combined.push(format!("{key} {}", file.path));
        }
        if result.files.is_empty() {
            lines.combined_missing.push(key.clone());
        }

        manifest.record(&result);
        results.push(result);
    }

    write_deduped_lines(&cache.local(), lines.local)?;
    write_deduped_lines(&cache.local_missing(), lines.local_missing)?;
    write_deduped_lines(&cache.synda(), lines.synda)?;
    write_deduped_lines(&cache.combined(), lines.combined)?;
    write_deduped_lines(&cache.combined_missing(), lines.combined_missing)?;

    let manifest_path = output_dir.join(format!("cache_{}-{}", opts.manifest_name, local.name()));
    manifest.write(&manifest_path)?;

    Ok(RunOutcome {
        manifest,
        manifest_path,
        cache,
        results,
        remote_failures,
        notes,
    })
}
