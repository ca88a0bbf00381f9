use crate::finder::reconcile::{CoverageResult, CoverageStatus};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::Path;

/// One manifest line, as written and as read back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestEntry {
    pub descriptor_key: String,
    pub status: CoverageStatus,
    pub fraction: Option<f64>,
    pub file_paths: Vec<String>,
}

impl From<&CoverageResult> for ManifestEntry {
    fn from(result: &CoverageResult) -> Self {
        Self {
            descriptor_key: result.descriptor_key.clone(),
            status: result.status,
            fraction: result.fraction,
            file_paths: result.file_paths(),
        }
    }
}

/// Incomplete fractions are truncated, never rounded up to `1.00`.
fn format_fraction(status: CoverageStatus, fraction: Option<f64>) -> String {
    match status {
        CoverageStatus::Complete | CoverageStatus::CompleteWithGaps => "1.0".to_string(),
        _ => {
            // The epsilon keeps exact hundredths like 0.29 from flooring to 0.28.
            let hundredths = (fraction.unwrap_or(0.0) * 100.0 + 1e-9).floor().clamp(0.0, 99.0);
            format!("{:.2}", hundredths / 100.0)
        }
    }
}

impl ManifestEntry {
    pub fn line(&self) -> String {
        if self.status == CoverageStatus::Missing {
            return format!("{} missing", self.descriptor_key);
        }
        let files = serde_json::to_string(&self.file_paths).unwrap_or_else(|_| "[]".to_string());
        format!(
            "{} {} {} {}",
            self.descriptor_key,
            self.status,
            format_fraction(self.status, self.fraction),
            files
        )
    }

    pub fn parse_line(line: &str) -> Result<Self> {
        let mut parts = line.trim().splitn(4, ' ');
        let key = parts
            .next()
            .filter(|s| !s.is_empty())
            .context("manifest line has no descriptor key")?;
        let status = parts
            .next()
            .context("manifest line has no status")?
            .parse::<CoverageStatus>()
            .map_err(anyhow::Error::msg)?;
        if status == CoverageStatus::Missing {
            return Ok(Self {
                descriptor_key: key.to_string(),
                status,
                fraction: None,
                file_paths: Vec::new(),
            });
        }
        let fraction = parts
            .next()
            .context("manifest line has no fraction")?
            .parse::<f64>()
            .with_context(|| format!("invalid fraction in `{line}`"))?;
        let files = parts.next().unwrap_or("[]");
        let file_paths: Vec<String> = serde_json::from_str(files)
            .with_context(|| format!("invalid file list in `{line}`"))?;
        Ok(Self {
            descriptor_key: key.to_string(),
            status,
            fraction: Some(fraction),
            file_paths,
        })
    }
}

/// Descriptor key -> verdict for one run. A later pass over the same
/// descriptor replaces its earlier entry.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &CoverageResult) {
        self.entries
            .insert(result.descriptor_key.clone(), ManifestEntry::from(result));
    }

    pub fn entries(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Deduplicated, sorted output lines.
    pub fn lines(&self) -> Vec<String> {
        self.entries
            .values()
            .map(ManifestEntry::line)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn write(&self, path: &Path) -> Result<usize> {
        write_deduped_lines(path, self.lines())
    }

    /// Read a manifest back; lines that do not parse are returned separately.
    pub fn read(path: &Path) -> Result<(Self, Vec<String>)> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut manifest = Self::new();
        let mut rejected = Vec::new();
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            match ManifestEntry::parse_line(line) {
                Ok(entry) => {
                    manifest.entries.insert(entry.descriptor_key.clone(), entry);
                }
                Err(err) => rejected.push(format!("{line}: {err:#}")),
            }
        }
        Ok((manifest, rejected))
    }
}

/// Write `lines` to `path` deduplicated and sorted, replacing the file
/// atomically. Returns the number of lines written.
pub fn write_deduped_lines<I, S>(path: &Path, lines: I) -> Result<usize>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let unique = lines.into_iter().map(Into::into).collect::<BTreeSet<String>>();
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
    for line in &unique {
        writeln!(tmp, "{line}")?;
    }
    tmp.persist(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(unique.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(key: &str, status: CoverageStatus, fraction: Option<f64>, files: &[&str]) -> ManifestEntry {
        ManifestEntry {
            descriptor_key: key.to_string(),
            status,
            fraction,
            file_paths: files.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn lines_follow_the_manifest_format() {
        let complete = entry(
            "CMIP5_M_Amon_historical_r1i1p1_1990_1999_tas",
            CoverageStatus::Complete,
            Some(1.0),
            &["/a/tas_199001-199912.nc"],
        );
        assert_eq!(
            complete.line(),
            "CMIP5_M_Amon_historical_r1i1p1_1990_1999_tas complete 1.0 [\"/a/tas_199001-199912.nc\"]"
        );

        let partial = entry(
            "CMIP5_M_Amon_historical_r1i1p1_1990_2000_tas",
            CoverageStatus::Incomplete,
            Some(0.6),
            &["/a/tas_199201-199812.nc"],
        );
        assert!(partial.line().contains(" incomplete 0.60 "));

        let missing = entry(
            "CMIP5_M_Amon_historical_r1i1p1_1990_2000_pr",
            CoverageStatus::Missing,
            None,
            &[],
        );
        assert_eq!(missing.line(), "CMIP5_M_Amon_historical_r1i1p1_1990_2000_pr missing");
    }

    #[test]
    fn incomplete_fractions_truncate_below_one() {
        assert_eq!(format_fraction(CoverageStatus::Incomplete, Some(399.0 / 400.0)), "0.99");
        assert_eq!(format_fraction(CoverageStatus::Incomplete, Some(0.29)), "0.29");
        assert_eq!(format_fraction(CoverageStatus::IncompleteWithGaps, Some(0.6)), "0.60");
        assert_eq!(format_fraction(CoverageStatus::Incomplete, Some(0.004)), "0.00");
        assert_eq!(format_fraction(CoverageStatus::Complete, Some(1.0)), "1.0");
    }

    #[test]
    fn lines_parse_back() {
        let original = entry(
            "CMIP5_M_Amon_historical_r1i1p1_1990_2010_tas",
            CoverageStatus::CompleteWithGaps,
            Some(1.0),
            &["/a/x_199001-199512.nc", "/a/x_200001-201012.nc"],
        );
        let parsed = ManifestEntry::parse_line(&original.line()).expect("parse");
        assert_eq!(parsed, original);
        assert!(ManifestEntry::parse_line("KEY sideways 1.0 []").is_err());
    }

    #[test]
    fn write_dedups_and_sorts() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("nested/cache.txt");
        let written = write_deduped_lines(&path, ["b line", "a line", "b line"]).expect("write");
        assert_eq!(written, 2);
        let raw = fs::read_to_string(&path).expect("read");
        assert_eq!(raw, "a line\nb line\n");

        let again = write_deduped_lines(&path, ["a line", "a line"]).expect("rewrite");
        assert_eq!(again, 1);
        assert_eq!(fs::read_to_string(&path).expect("read"), "a line\n");
    }

    #[test]
    fn manifest_round_trips_through_disk() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("cache_params.txt-badc");
        let mut manifest = Manifest::new();
        let mut result = CoverageResult::missing("CMIP5_M_Amon_historical_r1i1p1_1990_2000_pr");
        manifest.record(&result);
        result.status = CoverageStatus::Incomplete;
        result.fraction = Some(0.25);
        result.descriptor_key = "CMIP5_M_Amon_historical_r1i1p1_1990_2000_tas".to_string();
        manifest.record(&result);
        assert_eq!(manifest.write(&path).expect("write"), 2);

        fs::write(
            &path,
            format!("{}garbage\n", fs::read_to_string(&path).expect("read")),
        )
        .expect("append garbage");
        let (back, rejected) = Manifest::read(&path).expect("read back");
        assert_eq!(back.len(), 2);
        assert_eq!(rejected.len(), 1);
        assert_eq!(
            back.entries()
                .find(|e| e.descriptor_key == "CMIP5_M_Amon_historical_r1i1p1_1990_2000_tas")
                .and_then(|e| e.fraction),
            Some(0.25)
        );
    }
}
