use crate::error::FinderError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DESCRIPTOR_FIELDS: usize = 8;

/// Years a file name can encode (four-digit `%Y`).
const YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

/// One requested dataset: what to look for and over which years.
///
/// Field order matches the descriptor input format and the key layout:
/// `project model frequency experiment ensemble year1 year2 variable`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Descriptor {
    pub project: String,
    pub model: String,
    pub frequency: String,
    pub experiment: String,
    pub ensemble: String,
    pub year1: i32,
    pub year2: i32,
    pub variable: String,
}

fn parse_year(raw: &str, line: &str) -> Result<i32, FinderError> {
    raw.parse::<i32>()
        .map_err(|_| FinderError::InvalidDescriptor(format!("non-integer year `{raw}` in `{line}`")))
}

impl Descriptor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        project: &str,
        model: &str,
        frequency: &str,
        experiment: &str,
        ensemble: &str,
        year1: i32,
        year2: i32,
        variable: &str,
    ) -> Result<Self, FinderError> {
        for year in [year1, year2] {
            if !YEARS.contains(&year) {
                return Err(FinderError::InvalidDescriptor(format!(
                    "year {year} is outside {}..={}",
                    YEARS.start(),
                    YEARS.end()
                )));
            }
        }
        if year1 > year2 {
            return Err(FinderError::InvalidDescriptor(format!(
                "year1 {year1} is after year2 {year2}"
            )));
        }
        let fields = [project, model, frequency, experiment, ensemble, variable];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(FinderError::InvalidDescriptor(
                "descriptor fields cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            project: project.to_string(),
            model: model.to_string(),
            frequency: frequency.to_string(),
            experiment: experiment.to_string(),
            ensemble: ensemble.to_string(),
            year1,
            year2,
            variable: variable.to_string(),
        })
    }

    fn from_fields(fields: &[&str], source: &str) -> Result<Self, FinderError> {
        if fields.len() != DESCRIPTOR_FIELDS {
            return Err(FinderError::InvalidDescriptor(format!(
                "expected {DESCRIPTOR_FIELDS} fields, got {} in `{source}`",
                fields.len()
            )));
        }
        let year1 = parse_year(fields[5], source)?;
        let year2 = parse_year(fields[6], source)?;
        Self::new(
            fields[0], fields[1], fields[2], fields[3], fields[4], year1, year2, fields[7],
        )
    }

    /// Parse one whitespace-delimited input line.
    pub fn parse_line(line: &str) -> Result<Self, FinderError> {
        let fields = line.split_whitespace().collect::<Vec<_>>();
        Self::from_fields(&fields, line.trim())
    }

    /// Rebuild a descriptor from its key. Lossless only when no field
    /// contains an underscore.
    pub fn from_key(key: &str) -> Result<Self, FinderError> {
        let fields = key.split('_').collect::<Vec<_>>();
        Self::from_fields(&fields, key)
    }

    pub fn key(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}_{}_{}_{}",
            self.project,
            self.model,
            self.frequency,
            self.experiment,
            self.ensemble,
            self.year1,
            self.year2,
            self.variable
        )
    }

    /// Query string handed to the remote index, e.g. `CMIP5 MPI-ESM-LR Amon amip r1i1p1`.
    pub fn model_data(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.project, self.model, self.frequency, self.experiment, self.ensemble
        )
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}
