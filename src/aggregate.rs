use std::collections::BTreeMap;

use tracing::debug;

use crate::models::{AggregationResult, Grade, Percentage, RowRecord, SkipReport};

/// Scores at or above this mark count as a pass.
pub const PASS_MARK: f64 = 50.0;

/// Pass/fail and letter-grade statistics over `rows`.
///
/// A non-empty `block` keeps only rows whose `Block` cell reads exactly as
/// given. Rows with a missing or unknown grade, or a total that does not
/// parse, are left out of the statistic they cannot feed and never cause an
/// error.
pub fn aggregate(rows: &[RowRecord], block: Option<&str>) -> AggregationResult {
    let filter = block.filter(|value| !value.is_empty());
    let mut grade_counts: BTreeMap<Grade, usize> =
        Grade::ALL.into_iter().map(|grade| (grade, 0)).collect();
    let mut pass = 0usize;
    let mut fail = 0usize;
    let mut skipped = SkipReport::default();

    for row in rows {
        if let Some(wanted) = filter {
            if row.block().as_deref() != Some(wanted) {
                skipped.filtered_out += 1;
                continue;
            }
        }

        match row.final_grade() {
            Some(grade) => *grade_counts.entry(grade).or_insert(0) += 1,
            None => skipped.ungraded += 1,
        }

        match row.row_total() {
            Some(total) if total >= PASS_MARK => pass += 1,
            Some(_) => fail += 1,
            None => skipped.unscored += 1,
        }
    }

    let total_graded: usize = grade_counts.values().sum();
    let grade_percentages = grade_counts
        .iter()
        .map(|(grade, count)| (*grade, Percentage::of(*count, total_graded)))
        .collect();

    debug!(
        block = filter.unwrap_or("all"),
        rows = rows.len(),
        pass,
        fail,
        total_graded,
        filtered_out = skipped.filtered_out,
        ungraded = skipped.ungraded,
        unscored = skipped.unscored,
        "aggregated grades"
    );

    AggregationResult {
        pass,
        fail,
        grade_counts,
        grade_percentages,
        filter: filter.map(str::to_string),
        skipped,
    }
}
