use crate::finder::coverage::aggregate;
use crate::finder::dates::interval_from_path;
use crate::finder::descriptor::Descriptor;
use crate::finder::interval::{Relation, classify};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    Complete,
    CompleteWithGaps,
    Incomplete,
    IncompleteWithGaps,
    Missing,
}

impl CoverageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::CompleteWithGaps => "complete_with_gaps",
            Self::Incomplete => "incomplete",
            Self::IncompleteWithGaps => "incomplete_with_gaps",
            Self::Missing => "missing",
        }
    }

    fn from_parts(complete: bool, has_gaps: bool) -> Self {
        match (complete, has_gaps) {
            (true, false) => Self::Complete,
            (true, true) => Self::CompleteWithGaps,
            (false, false) => Self::Incomplete,
            (false, true) => Self::IncompleteWithGaps,
        }
    }

    pub fn has_gaps(self) -> bool {
        matches!(self, Self::CompleteWithGaps | Self::IncompleteWithGaps)
    }

    /// Anything short of gap-free full coverage is worth a remote lookup.
    pub fn needs_remote(self) -> bool {
        self != Self::Complete
    }
}

impl fmt::Display for CoverageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoverageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "complete" => Ok(Self::Complete),
            "complete_with_gaps" => Ok(Self::CompleteWithGaps),
            "incomplete" => Ok(Self::Incomplete),
            "incomplete_with_gaps" => Ok(Self::IncompleteWithGaps),
            "missing" => Ok(Self::Missing),
            other => Err(format!("unknown coverage status `{other}`")),
        }
    }
}

/// Where a discovered path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileOrigin {
    Local,
    Installed,
    NotYetInstalled,
}

impl FileOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "LOCAL",
            Self::Installed => "INSTALLED",
            Self::NotYetInstalled => "NOT-YET-INSTALLED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredFile {
    pub path: String,
    pub origin: FileOrigin,
}

impl DiscoveredFile {
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            origin: FileOrigin::Local,
        }
    }

    pub fn file_name(&self) -> &str {
        file_name_of(&self.path)
    }
}

pub fn file_name_of(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedFile {
    pub path: String,
    pub origin: FileOrigin,
    pub relation: Relation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageResult {
    pub descriptor_key: String,
    pub status: CoverageStatus,
    pub fraction: Option<f64>,
    pub files: Vec<ResolvedFile>,
    pub skipped: Vec<SkippedFile>,
}

impl CoverageResult {
    pub fn missing(descriptor_key: impl Into<String>) -> Self {
        Self {
            descriptor_key: descriptor_key.into(),
            status: CoverageStatus::Missing,
            fraction: None,
            files: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn file_paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    /// Whether a single relevant file spans the whole requested window.
    pub fn has_full_file(&self) -> bool {
        self.files
            .iter()
            .any(|f| f.relation == Relation::FullyContains)
    }
}

/// Collapse entries whose file name repeats; the first occurrence wins.
pub fn dedup_by_file_name(files: &[DiscoveredFile]) -> Vec<DiscoveredFile> {
    let mut seen = BTreeSet::new();
    files
        .iter()
        .filter(|f| seen.insert(f.file_name().to_string()))
        .cloned()
        .collect()
}

pub fn reconcile(descriptor: &Descriptor, discovered: &[DiscoveredFile]) -> CoverageResult {
    let key = descriptor.key();
    let mut result = CoverageResult::missing(&key);

    let mut intervals = Vec::new();
    for file in dedup_by_file_name(discovered) {
        let interval = match interval_from_path(&file.path) {
            Ok(interval) => interval,
            Err(err) => {
                result.skipped.push(SkippedFile {
                    path: file.path.clone(),
                    reason: err.to_string(),
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
        intervals.push((interval.year1, interval.year2));
        result.files.push(ResolvedFile {
            path: file.path,
            origin: file.origin,
            relation: class.relation,
        });
    }

    // NoRelevantIntervals is the missing verdict, which `result` already holds.
    let Ok(coverage) = aggregate(&intervals, descriptor.year1, descriptor.year2) else {
        return result;
    };
    let complete = coverage.fraction >= 1.0;
    result.status = CoverageStatus::from_parts(complete, coverage.has_gaps);
    result.fraction = Some(coverage.fraction);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(year1: i32, year2: i32) -> Descriptor {
        Descriptor::new(
            "CMIP5",
            "MPI-ESM-LR",
            "Amon",
            "historical",
            "r1i1p1",
            year1,
            year2,
            "tas",
        )
        .expect("descriptor")
    }

    fn file(dir: &str, range: &str) -> DiscoveredFile {
        DiscoveredFile::local(format!(
            "{dir}/tas_Amon_MPI-ESM-LR_historical_r1i1p1_{range}.nc"
        ))
    }

    #[test]
    fn file_extending_left_completes_the_window() {
        let got = reconcile(&descriptor(1990, 1999), &[file("/a", "198501-199912")]);
        assert_eq!(got.status, CoverageStatus::Complete);
        assert_eq!(got.fraction, Some(1.0));
        assert_eq!(got.files.len(), 1);
    }

    #[test]
    fn file_inside_window_is_incomplete() {
        let got = reconcile(&descriptor(1990, 2000), &[file("/a", "199201-199812")]);
        assert_eq!(got.status, CoverageStatus::Incomplete);
        let fraction = got.fraction.expect("fraction");
        assert!((fraction - 0.6).abs() < 1e-9);
    }

    #[test]
    fn separated_files_are_complete_with_gaps() {
        let got = reconcile(
            &descriptor(1990, 2010),
            &[file("/a", "199001-199512"), file("/a", "200001-201012")],
        );
        assert_eq!(got.status, CoverageStatus::CompleteWithGaps);
        assert_eq!(got.fraction, Some(1.0));
        assert_eq!(got.files.len(), 2);
    }

    #[test]
    fn nothing_discovered_is_missing() {
        let got = reconcile(&descriptor(1990, 2000), &[]);
        assert_eq!(got.status, CoverageStatus::Missing);
        assert_eq!(got.fraction, None);
        assert!(got.files.is_empty());
    }

    #[test]
    fn only_disjoint_files_is_missing() {
        let got = reconcile(&descriptor(1990, 2000), &[file("/a", "185001-189912")]);
        assert_eq!(got.status, CoverageStatus::Missing);
        assert!(got.file_paths().is_empty());
    }

    #[test]
    fn malformed_names_are_skipped_not_fatal() {
        let got = reconcile(
            &descriptor(1990, 1999),
            &[
                DiscoveredFile::local("/a/tas_Amon_MPI-ESM-LR_historical_r1i1p1.nc"),
                file("/a", "199001-199912"),
            ],
        );
        assert_eq!(got.status, CoverageStatus::Complete);
        assert_eq!(got.skipped.len(), 1);
        assert_eq!(got.files.len(), 1);
    }

    #[test]
    fn repeated_file_names_keep_the_first_path() {
        let mut remote = file("/sdt/data", "199001-199912");
        remote.origin = FileOrigin::Installed;
        let got = reconcile(
            &descriptor(1990, 1999),
            &[file("/badc", "199001-199912"), remote],
        );
        assert_eq!(got.files.len(), 1);
        assert!(got.files[0].path.starts_with("/badc/"));
        assert_eq!(got.files[0].origin, FileOrigin::Local);
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            CoverageStatus::Complete,
            CoverageStatus::CompleteWithGaps,
            CoverageStatus::Incomplete,
            CoverageStatus::IncompleteWithGaps,
            CoverageStatus::Missing,
        ] {
            assert_eq!(status.as_str().parse::<CoverageStatus>(), Ok(status));
        }
    }
}
