use serde::Serialize;

/// How a file's year range sits relative to the requested window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    FullyContains,
    FullyContained,
    LeftOverlap,
    RightOverlap,
    Disjoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub relation: Relation,
    pub relevant: bool,
    pub fully_contains: bool,
}

impl From<Relation> for Classification {
    fn from(relation: Relation) -> Self {
        Self {
            relation,
            relevant: relation != Relation::Disjoint,
            fully_contains: relation == Relation::FullyContains,
        }
    }
}

/// Classify `[file_year1, file_year2]` against `[req_year1, req_year2]`.
///
/// Bounds are inclusive years, so a file ending in the first requested year
/// (or starting in the last one) overlaps.
pub fn classify(file_year1: i32, file_year2: i32, req_year1: i32, req_year2: i32) -> Classification {
    let relation = if file_year1 <= req_year1 && file_year2 >= req_year2 {
        Relation::FullyContains
    } else if file_year1 >= req_year1 && file_year2 <= req_year2 {
        Relation::FullyContained
    } else if file_year2 < req_year1 || file_year1 > req_year2 {
        Relation::Disjoint
    } else if file_year1 < req_year1 {
        Relation::LeftOverlap
    } else {
        Relation::RightOverlap
    };
    relation.into()
}
