use crate::error::FinderError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coverage {
    pub fraction: f64,
    pub has_gaps: bool,
}

/// True when the sorted intervals leave at least one whole year uncovered
/// between their first start and last end.
fn detect_gaps(intervals: &[(i32, i32)]) -> bool {
    let mut sorted = intervals
        .iter()
        .map(|&(a, b)| (a.min(b), a.max(b)))
        .collect::<Vec<_>>();
    sorted.sort_unstable();

    let mut iter = sorted.into_iter();
    let Some((_, first_end)) = iter.next() else {
        return false;
    };
    let mut reach = first_end;
    for (start, end) in iter {
        if i64::from(start) > i64::from(reach) + 1 {
            return true;
        }
        reach = reach.max(end);
    }
    false
}

fn span_fraction(min: i32, max: i32, req_year1: i32, req_year2: i32) -> f64 {
    let (min, max) = (i64::from(min), i64::from(max));
    let (req_year1, req_year2) = (i64::from(req_year1), i64::from(req_year2));
    let span = req_year2 - req_year1;
    if span <= 0 {
        // Single-year request; any relevant interval covers it.
        return 1.0;
    }
    let covered = if min >= req_year1 && max <= req_year2 {
        max - min
    } else if min >= req_year1 && max >= req_year2 {
        req_year2 - min
    } else if min <= req_year1 && max <= req_year2 {
        max - req_year1
    } else {
        return 1.0;
    };
    (covered as f64 / span as f64).clamp(0.0, 1.0)
}

/// Fractional coverage of `[req_year1, req_year2]` by the relevant intervals.
///
/// Gapped coverage reports a fraction of `1.0` with `has_gaps` set; the gap
/// extent is not subtracted.
pub fn aggregate(
    relevant: &[(i32, i32)],
    req_year1: i32,
    req_year2: i32,
) -> Result<Coverage, FinderError> {
    if relevant.is_empty() {
        return Err(FinderError::NoRelevantIntervals);
    }

    let boundaries = relevant.iter().flat_map(|&(a, b)| [a, b]);
    let min = boundaries.clone().min().unwrap_or(req_year1);
    let max = boundaries.max().unwrap_or(req_year2);

    if relevant.len() > 1 && detect_gaps(relevant) {
        return Ok(Coverage {
            fraction: 1.0,
            has_gaps: true,
        });
    }

    Ok(Coverage {
        fraction: span_fraction(min, max, req_year1, req_year2),
        has_gaps: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn exact_window_is_complete() {
        let got = aggregate(&[(1990, 1999)], 1990, 1999).expect("aggregate");
        assert!(approx(got.fraction, 1.0));
        assert!(!got.has_gaps);
    }

    #[test]
    fn file_inside_window_covers_its_share() {
        let got = aggregate(&[(1992, 1998)], 1990, 2000).expect("aggregate");
        assert!(approx(got.fraction, 0.6));
        assert!(!got.has_gaps);
    }

    #[test]
    fn file_reaching_past_left_edge_counts_from_request_start() {
        let got = aggregate(&[(1985, 1999)], 1990, 1999).expect("aggregate");
        assert!(approx(got.fraction, 1.0));

        let got = aggregate(&[(1985, 1995)], 1990, 2000).expect("aggregate");
        assert!(approx(got.fraction, 0.5));
    }

    #[test]
    fn file_reaching_past_right_edge_counts_to_request_end() {
        let got = aggregate(&[(1996, 2010)], 1990, 2000).expect("aggregate");
        assert!(approx(got.fraction, 0.4));
    }

    #[test]
    fn file_spanning_both_edges_is_complete() {
        let got = aggregate(&[(1850, 2005)], 1990, 2000).expect("aggregate");
        assert!(approx(got.fraction, 1.0));
    }

    #[test]
    fn gapped_files_report_full_fraction_with_gap_flag() {
        let got = aggregate(&[(1990, 1995), (2000, 2010)], 1990, 2010).expect("aggregate");
        assert!(got.has_gaps);
        assert!(approx(got.fraction, 1.0));
    }

    #[test]
    fn consecutive_years_are_contiguous() {
        let got = aggregate(&[(1950, 1959), (1960, 1969), (1970, 1979)], 1950, 1979)
            .expect("aggregate");
        assert!(!got.has_gaps);
        assert!(approx(got.fraction, 1.0));
    }

    #[test]
    fn overlapping_files_are_contiguous() {
        let got = aggregate(&[(1990, 1996), (1994, 1998)], 1990, 2000).expect("aggregate");
        assert!(!got.has_gaps);
        assert!(approx(got.fraction, 0.8));
    }

    #[test]
    fn input_order_does_not_matter() {
        let forward = [(1990, 1995), (1996, 2000), (2003, 2010)];
        let mut reversed = forward;
        reversed.reverse();
        let shuffled = [(1996, 2000), (2003, 2010), (1990, 1995)];
        let a = aggregate(&forward, 1990, 2010).expect("forward");
        assert_eq!(a, aggregate(&reversed, 1990, 2010).expect("reversed"));
        assert_eq!(a, aggregate(&shuffled, 1990, 2010).expect("shuffled"));
        assert!(a.has_gaps);
    }

    #[test]
    fn single_year_request_is_covered_by_any_relevant_file() {
        let got = aggregate(&[(1995, 1995)], 1995, 1995).expect("aggregate");
        assert!(approx(got.fraction, 1.0));
    }

    #[test]
    fn extreme_windows_do_not_overflow() {
        let got = aggregate(&[(1990, 1999)], i32::MIN, i32::MAX).expect("aggregate");
        assert!(got.fraction > 0.0 && got.fraction < 1e-6);
        assert!(!got.has_gaps);
    }

    #[test]
    fn empty_input_has_no_relevant_intervals() {
        assert_eq!(
            aggregate(&[], 1990, 2000),
            Err(FinderError::NoRelevantIntervals)
        );
    }
}
