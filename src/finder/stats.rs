use crate::finder::descriptor::Descriptor;
use crate::finder::manifest::Manifest;
use crate::finder::reconcile::CoverageStatus;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelCounts {
    pub missing: usize,
    pub incomplete: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub total: usize,
    pub complete: usize,
    pub complete_with_gaps: usize,
    pub incomplete: usize,
    pub incomplete_with_gaps: usize,
    pub missing: usize,
    pub mean_incomplete_fraction: Option<f64>,
    pub per_model: BTreeMap<String, ModelCounts>,
}

fn model_of(key: &str) -> String {
    match Descriptor::from_key(key) {
        Ok(d) => d.model,
        Err(_) => key.split('_').nth(1).unwrap_or("unknown").to_string(),
    }
}

impl RunStats {
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let mut stats = Self::default();
        let mut fraction_sum = 0.0;
        let mut fraction_count = 0usize;

        for entry in manifest.entries() {
            stats.total += 1;
            let partial = matches!(
                entry.status,
                CoverageStatus::Incomplete | CoverageStatus::IncompleteWithGaps
            );
            match entry.status {
                CoverageStatus::Complete => stats.complete += 1,
                CoverageStatus::CompleteWithGaps => stats.complete_with_gaps += 1,
                CoverageStatus::Incomplete => stats.incomplete += 1,
                CoverageStatus::IncompleteWithGaps => stats.incomplete_with_gaps += 1,
                CoverageStatus::Missing => stats.missing += 1,
            }
            if partial {
                fraction_sum += entry.fraction.unwrap_or(0.0);
                fraction_count += 1;
            }
            if partial || entry.status == CoverageStatus::Missing {
                let counts = stats
                    .per_model
                    .entry(model_of(&entry.descriptor_key))
                    .or_default();
                if partial {
                    counts.incomplete += 1;
                } else {
                    counts.missing += 1;
                }
            }
        }

        if fraction_count > 0 {
            stats.mean_incomplete_fraction = Some(fraction_sum / fraction_count as f64);
        }
        stats
    }

    /// Human-readable summary, one fact per line.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("total={}", self.total),
            format!("complete={}", self.complete),
            format!("complete_with_gaps={}", self.complete_with_gaps),
            format!("incomplete={}", self.incomplete),
            format!("incomplete_with_gaps={}", self.incomplete_with_gaps),
            format!("missing={}", self.missing),
        ];
        match self.mean_incomplete_fraction {
            Some(mean) => lines.push(format!("mean_incomplete_fraction={mean:.2}")),
            None => lines.push("mean_incomplete_fraction=na".to_string()),
        }
        for (model, counts) in &self.per_model {
            lines.push(format!(
                "model={model} missing={} incomplete={}",
                counts.missing, counts.incomplete
            ));
        }
        lines
    }
}
