//! Relation priority scoring
//!
//! Weighted blend of raw citation volume, influential citations and recency.
//! The priority score decides which relations survive when a paper's cache is
//! full; it is never used for display ordering beyond that.

/// Weight of the normalized citation count
pub const CITATION_WEIGHT: f64 = 0.5;

/// Weight of the normalized influential citation count
pub const INFLUENTIAL_WEIGHT: f64 = 0.2;

/// Weight of the recency component
pub const YEAR_WEIGHT: f64 = 0.3;

/// Citation count at which the citation component saturates
pub const CITATION_SATURATION: f64 = 1000.0;

/// Influential citation count at which the influence component saturates
pub const INFLUENTIAL_SATURATION: f64 = 100.0;

/// Age difference (years) at which the recency component reaches zero
pub const YEAR_HORIZON: f64 = 50.0;

/// Reference year used unless configured otherwise
pub const DEFAULT_BASE_YEAR: i32 = 2024;

/// Pure priority scorer
#[derive(Debug, Clone, Copy)]
pub struct PriorityScorer {
    base_year: i32,
}

impl PriorityScorer {
    pub fn new(base_year: i32) -> Self {
        Self { base_year }
    }

    pub fn base_year(&self) -> i32 {
        self.base_year
    }

    /// Score in [0, 1]; absent inputs contribute 0
    pub fn score(
        &self,
        citation_count: Option<i32>,
        influential_citation_count: Option<i32>,
        year: Option<i32>,
    ) -> f64 {
        let citation_score = saturate(citation_count, CITATION_SATURATION);
        let influential_score = saturate(influential_citation_count, INFLUENTIAL_SATURATION);

        let year_score = year
            .map(|year| {
                let diff = (i64::from(self.base_year) - i64::from(year)).abs() as f64;
                (1.0 - diff / YEAR_HORIZON).max(0.0)
            })
            .unwrap_or(0.0);

        CITATION_WEIGHT * citation_score
            + INFLUENTIAL_WEIGHT * influential_score
            + YEAR_WEIGHT * year_score
    }
}

impl Default for PriorityScorer {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_YEAR)
    }
}

fn saturate(value: Option<i32>, ceiling: f64) -> f64 {
    value
        .map(|v| (f64::from(v) / ceiling).clamp(0.0, 1.0))
        .unwrap_or(0.0)
}
