use crate::error::FinderError;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::path::Path;

/// A discovered file and the inclusive year range its name encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInterval {
    pub path: String,
    pub year1: i32,
    pub year2: i32,
}

fn malformed(token: &str, reason: &str) -> FinderError {
    FinderError::MalformedDateToken(format!("`{token}`: {reason}"))
}

fn parse_year(token: &str) -> Result<i32, FinderError> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(token, "not a numeric date"));
    }
    match token.len() {
        // yyyymm carries no day; pin it to the first of the month.
        6 => NaiveDate::parse_from_str(&format!("{token}01"), "%Y%m%d")
            .map(|d| d.year())
            .map_err(|err| malformed(token, &err.to_string())),
        8 => NaiveDate::parse_from_str(token, "%Y%m%d")
            .map(|d| d.year())
            .map_err(|err| malformed(token, &err.to_string())),
        12 => NaiveDateTime::parse_from_str(token, "%Y%m%d%H%M")
            .map(|d| d.year())
            .map_err(|err| malformed(token, &err.to_string())),
        other => Err(malformed(token, &format!("unknown width {other}"))),
    }
}

/// Extract the start and end years from a `<token1>-<token2>` date range.
pub fn parse_range(token1: &str, token2: &str) -> Result<(i32, i32), FinderError> {
    if token1.len() != token2.len() {
        return Err(FinderError::MalformedDateToken(format!(
            "`{token1}-{token2}`: tokens differ in width"
        )));
    }
    let year1 = parse_year(token1)?;
    let year2 = parse_year(token2)?;
    if year1 > year2 {
        return Err(FinderError::MalformedDateToken(format!(
            "`{token1}-{token2}`: range ends before it starts"
        )));
    }
    Ok((year1, year2))
}

/// Split `..._<token1>-<token2>.<ext>` into its two date tokens.
pub fn date_tokens(file_name: &str) -> Result<(&str, &str), FinderError> {
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _ext)) => stem,
        None => file_name,
    };
    let range = stem
        .rsplit('_')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| malformed(file_name, "no date range segment"))?;
    range
        .split_once('-')
        .ok_or_else(|| malformed(file_name, "date range is not `<start>-<end>`"))
}

pub fn interval_from_path(path: &str) -> Result<FileInterval, FinderError> {
    let file_name = Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| malformed(path, "path has no file name"))?;
    let (token1, token2) = date_tokens(file_name)?;
    let (year1, year2) = parse_range(token1, token2)?;
    Ok(FileInterval {
        path: path.to_string(),
        year1,
        year2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monthly_and_daily_tokens_yield_the_same_years() {
        assert_eq!(parse_range("199001", "199912").expect("yyyymm"), (1990, 1999));
        assert_eq!(
            parse_range("19900101", "19991231").expect("yyyymmdd"),
            (1990, 1999)
        );
        assert_eq!(
            parse_range("198204220511", "198212312359").expect("yyyymmddHHMM"),
            (1982, 1982)
        );
    }

    #[test]
    fn calendar_ranges_are_validated() {
        assert!(matches!(
            parse_range("199013", "199912"),
            Err(FinderError::MalformedDateToken(_))
        ));
        assert!(matches!(
            parse_range("19900230", "19991231"),
            Err(FinderError::MalformedDateToken(_))
        ));
        assert!(matches!(
            parse_range("199001012460", "199912312359"),
            Err(FinderError::MalformedDateToken(_))
        ));
    }

    #[test]
    fn unknown_or_mixed_widths_are_rejected() {
        assert!(parse_range("1990", "1999").is_err());
        assert!(parse_range("199001", "19991231").is_err());
        assert!(parse_range("19900a", "199912").is_err());
    }

    #[test]
    fn reversed_range_is_rejected() {
        assert!(parse_range("200001", "199912").is_err());
    }

    #[test]
    fn interval_from_path_reads_trailing_segment() {
        let got = interval_from_path(
            "/badc/cmip5/data/tas/tas_Amon_MPI-ESM-LR_historical_r1i1p1_185001-200512.nc",
        )
        .expect("interval");
        assert_eq!(got.year1, 1850);
        assert_eq!(got.year2, 2005);
    }

    #[test]
    fn interval_from_path_rejects_names_without_range() {
        assert!(interval_from_path("/data/fx/orog_fx_MPI-ESM-LR_historical_r0i0p0.nc").is_err());
        assert!(interval_from_path("/data/readme").is_err());
    }
}
