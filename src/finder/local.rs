use crate::error::{FinderError, FinderWarnCode};
use crate::finder::config::DatasourceConfig;
use crate::finder::descriptor::Descriptor;
use crate::finder::source::FileDiscovery;
use crate::finder::warn::{self, WarnEvent};
use anyhow::Result;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const WILDCARD: &str = "*";
const MAX_SCAN_DEPTH: usize = 16;

/// Directory components between `<experiment>` and `<ensemble>` for a
/// frequency/table. The flag is false for tables without a known layout.
pub fn table_components(table: &str) -> (Vec<&str>, bool) {
    match table {
        "3h" | "6h" | "day" | "cfDay" => (vec![table, WILDCARD, WILDCARD], true),
        "Amon" => (vec!["mon", "atmos", "Amon"], true),
        "Omon" => (vec!["mon", "ocean", "Omon"], true),
        "Lmon" => (vec!["mon", "land", "Lmon"], true),
        "LImon" => (vec!["mon", "landIce", "LImon"], true),
        "OImon" => (vec!["mon", "seaIce", "OImon"], true),
        "aero" => (vec!["mon", "aerosol", "aero"], true),
        other => (vec![other, WILDCARD, WILDCARD], false),
    }
}

/// A CMIP5 mirror laid out as
/// `<root>/<institute>/<model>/<experiment>/<table path>/<ensemble>/<latest>/<variable>/`.
#[derive(Debug, Clone)]
pub struct LocalMirror {
    name: String,
    root: PathBuf,
    latest_dir: String,
}

fn warn_dir(descriptor: &Descriptor, dir: &Path, err: &std::io::Error) {
    let reason = if err.kind() == ErrorKind::PermissionDenied {
        "permission denied".to_string()
    } else {
        err.to_string()
    };
    warn::emit(WarnEvent {
        code: FinderWarnCode::W003UnreadableDir,
        stage: "local",
        descriptor: &descriptor.key(),
        path: &dir.to_string_lossy(),
        reason: &reason,
    });
}

fn sorted_subdirs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        // is_dir follows symlinks.
        if path.is_dir() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn is_netcdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("nc"))
}

impl LocalMirror {
    pub fn new(name: &str, cfg: &DatasourceConfig) -> Self {
        Self {
            name: name.to_string(),
            root: cfg.root.clone(),
            latest_dir: cfg.latest_dir.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_available(&self) -> Result<(), FinderError> {
        if self.root.is_dir() {
            return Ok(());
        }
        Err(FinderError::CollaboratorUnavailable(format!(
            "datasource `{}` root is not a readable directory: {}",
            self.name,
            self.root.display()
        )))
    }

    fn relative_pattern(&self, descriptor: &Descriptor) -> Vec<String> {
        let (table, known) = table_components(&descriptor.frequency);
        if !known {
            warn::emit(WarnEvent {
                code: FinderWarnCode::W006GenericDrs,
                stage: "local",
                descriptor: &descriptor.key(),
                path: &self.root.to_string_lossy(),
                reason: "no directory layout for this table; using generalised path",
            });
        }
        let mut parts = vec![descriptor.experiment.clone()];
        parts.extend(table.into_iter().map(str::to_string));
        parts.push(descriptor.ensemble.clone());
        parts.push(self.latest_dir.clone());
        parts.push(descriptor.variable.clone());
        parts
    }

    /// Expand `pattern` below `base`, `*` matching any subdirectory.
    fn expand(&self, descriptor: &Descriptor, base: &Path, pattern: &[String]) -> Vec<PathBuf> {
        let mut frontier = vec![base.to_path_buf()];
        for part in pattern {
            let mut next = Vec::new();
            for dir in &frontier {
                if part == WILDCARD {
                    match sorted_subdirs(dir) {
                        Ok(children) => next.extend(children),
                        Err(err) => warn_dir(descriptor, dir, &err),
                    }
                } else {
                    let child = dir.join(part);
                    if child.is_dir() {
                        next.push(child);
                    }
                }
            }
            if next.is_empty() {
                return next;
            }
            frontier = next;
        }
        frontier
    }

    fn collect_netcdf(&self, descriptor: &Descriptor, dir: &Path, depth: usize, out: &mut Vec<String>) {
        if depth > MAX_SCAN_DEPTH {
            return;
        }
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn_dir(descriptor, dir, &err);
                return;
            }
        };
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(err) => {
                    warn_dir(descriptor, dir, &err);
                    continue;
                }
            };
            if path.is_dir() {
                self.collect_netcdf(descriptor, &path, depth + 1, out);
            } else if path.is_file() && is_netcdf(&path) {
                out.push(path.to_string_lossy().to_string());
            }
        }
    }
}

impl FileDiscovery for LocalMirror {
    fn name(&self) -> &str {
        &self.name
    }

    fn discover_files(&self, descriptor: &Descriptor) -> Result<Vec<String>> {
        self.ensure_available()?;
        let pattern = self.relative_pattern(descriptor);

        let mut files = Vec::new();
        let institutes = sorted_subdirs(&self.root).map_err(|err| {
            FinderError::CollaboratorUnavailable(format!(
                "cannot list {}: {err}",
                self.root.display()
            ))
        })?;
        for institute in institutes {
            let model_dir = institute.join(&descriptor.model);
            if !model_dir.is_dir() {
                continue;
            }
            for dir in self.expand(descriptor, &model_dir, &pattern) {
                self.collect_netcdf(descriptor, &dir, 0, &mut files);
            }
        }
        files.sort();
        files.dedup();
        Ok(files)
    }
}
