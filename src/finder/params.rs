use crate::error::FinderError;
use crate::finder::descriptor::Descriptor;
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Descriptors read from one input, plus the lines that were rejected.
#[derive(Debug, Clone, Default)]
pub struct DescriptorBatch {
    pub descriptors: Vec<Descriptor>,
    pub rejected: Vec<(String, FinderError)>,
}

/// Parse descriptor lines. Duplicates collapse and the batch comes back
/// sorted; blank lines and `#` comments are ignored.
pub fn parse_descriptor_lines(raw: &str) -> DescriptorBatch {
    let mut unique = BTreeSet::new();
    let mut rejected = Vec::new();
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match Descriptor::parse_line(trimmed) {
            Ok(d) => {
                unique.insert(d);
            }
            Err(err) => rejected.push((trimmed.to_string(), err)),
        }
    }
    DescriptorBatch {
        descriptors: unique.into_iter().collect(),
        rejected,
    }
}

pub fn load_params_file(path: &Path) -> Result<DescriptorBatch> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(parse_descriptor_lines(&raw))
}

/// Build descriptors from seven file parameters
/// (`project model frequency experiment ensemble year1 year2`) and a list of
/// variables, one descriptor per variable.
pub fn from_user_input(fileparams: &[String], variables: &[String]) -> Result<DescriptorBatch, FinderError> {
    if fileparams.len() != 7 {
        return Err(FinderError::InvalidDescriptor(format!(
            "expected 7 --fileparams (e.g. CMIP5 MPI-ESM-LR Amon historical r1i1p1 1980 2005), got {}",
            fileparams.len()
        )));
    }
    if variables.is_empty() {
        return Err(FinderError::InvalidDescriptor(
            "at least one --uservars variable is required".to_string(),
        ));
    }
    let lines = variables
        .iter()
        .map(|v| format!("{} {}", fileparams.join(" "), v))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(parse_descriptor_lines(&lines))
}
