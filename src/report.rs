use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AggregationResult, Grade, Percentage};

const BAR_WIDTH: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Everything one analysis run produced, ready to be written out.
#[derive(Debug, Clone, Serialize)]
pub struct Report<'a> {
    pub file: &'a str,
    pub loaded_at: Option<DateTime<Utc>>,
    pub generated_at: DateTime<Utc>,
    pub overall: Option<&'a AggregationResult>,
    pub block: Option<&'a AggregationResult>,
}

impl<'a> Report<'a> {
    pub fn new(
        file: &'a str,
        overall: Option<&'a AggregationResult>,
        block: Option<&'a AggregationResult>,
    ) -> Self {
        Self {
            file,
            loaded_at: None,
            generated_at: Utc::now(),
            overall,
            block,
        }
    }

    pub fn loaded_at(mut self, loaded_at: DateTime<Utc>) -> Self {
        self.loaded_at = Some(loaded_at);
        self
    }

    pub fn render(&self, format: OutputFormat) -> anyhow::Result<String> {
        match format {
            OutputFormat::Text => Ok(self.to_text()),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }

    fn to_text(&self) -> String {
        let mut output = String::new();

        let _ = writeln!(output, "# Excel Result Analyzer Report");
        let _ = writeln!(
            output,
            "Generated from {} at {}",
            self.file,
            self.generated_at.format("%Y-%m-%d %H:%M UTC")
        );
        if let Some(loaded_at) = self.loaded_at {
            let _ = writeln!(
                output,
                "File loaded at {}",
                loaded_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }

        if self.overall.is_none() && self.block.is_none() {
            let _ = writeln!(output);
            let _ = writeln!(output, "No results calculated.");
        }
        if let Some(result) = self.overall {
            let _ = writeln!(output);
            output.push_str(&render_text("All Results", result));
        }
        if let Some(result) = self.block {
            let title = match result.filter.as_deref() {
                Some(block) => format!("Block {block}"),
                None => "Block (none selected)".to_string(),
            };
            let _ = writeln!(output);
            output.push_str(&render_text(&title, result));
        }

        output
    }
}

/// Pass/fail chart, grade count table and both grade bar charts as text.
pub fn render_text(title: &str, result: &AggregationResult) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "## {title}");
    let _ = writeln!(output);
    let _ = writeln!(output, "### Pass / Fail Distribution");

    let classified = result.total_classified();
    if classified == 0 {
        let _ = writeln!(output, "No numeric row totals recorded.");
    } else {
        for (label, count) in [("Pass", result.pass), ("Fail", result.fail)] {
            let share = Percentage::of(count, classified);
            let _ = writeln!(
                output,
                "{label:<4} {:<width$} {count} students ({share}%)",
                bar(share.tenths() as usize, 1000),
                width = BAR_WIDTH
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "### Grade Counts");
    let header: Vec<&str> = Grade::ALL.iter().map(|grade| grade.code()).collect();
    let _ = writeln!(output, "| {} |", header.join(" | "));
    let _ = writeln!(output, "|{}", "---|".repeat(Grade::ALL.len()));
    let counts: Vec<String> = Grade::ALL
        .iter()
        .map(|grade| result.count(*grade).to_string())
        .collect();
    let _ = writeln!(output, "| {} |", counts.join(" | "));

    let _ = writeln!(output);
    let _ = writeln!(output, "### Grade Count Bar Chart");
    let max_count = Grade::ALL
        .iter()
        .map(|grade| result.count(*grade))
        .max()
        .unwrap_or(0);
    for grade in Grade::ALL {
        let count = result.count(grade);
        let _ = writeln!(
            output,
            "{:<3} {:<width$} {count}",
            grade.code(),
            bar(count, max_count),
            width = BAR_WIDTH
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "### Grade Percentage Bar Chart");
    for grade in Grade::ALL {
        let percentage = result.percentage(grade);
        let _ = writeln!(
            output,
            "{:<3} {:<width$} {percentage}%",
            grade.code(),
            bar(percentage.tenths() as usize, 1000),
            width = BAR_WIDTH
        );
    }

    let skipped = &result.skipped;
    if skipped.filtered_out + skipped.ungraded + skipped.unscored > 0 {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "_Skipped: {} outside block, {} without a known grade, {} without a numeric total._",
            skipped.filtered_out, skipped.ungraded, skipped.unscored
        );
    }

    output
}

fn bar(value: usize, max: usize) -> String {
    if max == 0 || value == 0 {
        return String::new();
    }
    let len = (value * BAR_WIDTH / max).max(1);
    "#".repeat(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::models::{RowRecord, BLOCK_COLUMN, FINAL_GRADE_COLUMN, ROW_TOTAL_COLUMN};
    use chrono::TimeZone;

    fn sample_result(block: Option<&str>) -> AggregationResult {
        let rows = vec![
            RowRecord::new()
                .with(BLOCK_COLUMN, "B1")
                .with(FINAL_GRADE_COLUMN, "HD")
                .with(ROW_TOTAL_COLUMN, "85"),
            RowRecord::new()
                .with(BLOCK_COLUMN, "B1")
                .with(FINAL_GRADE_COLUMN, "F")
                .with(ROW_TOTAL_COLUMN, "30"),
            RowRecord::new()
                .with(BLOCK_COLUMN, "B2")
                .with(FINAL_GRADE_COLUMN, "P")
                .with(ROW_TOTAL_COLUMN, "55"),
        ];
        aggregate(&rows, block)
    }

    #[test]
    fn text_contains_all_four_artifacts() {
        let text = render_text("All Results", &sample_result(None));
        assert!(text.contains("### Pass / Fail Distribution"));
        assert!(text.contains("2 students (66.7%)"));
        assert!(text.contains("| HD | D | C | P | F | GP | FNE | FNS |"));
        assert!(text.contains("| 1 | 0 | 0 | 1 | 1 | 0 | 0 | 0 |"));
        assert!(text.contains("### Grade Count Bar Chart"));
        assert!(text.contains("33.3%"));
        assert!(text.contains("0.0%"));
    }

    #[test]
    fn empty_result_renders_without_bars() {
        let text = render_text("All Results", &aggregate(&[], None));
        assert!(text.contains("No numeric row totals recorded."));
        assert!(!text
            .lines()
            .any(|line| !line.starts_with('#') && line.contains('#')));
        assert!(!text.contains("_Skipped"));
    }

    #[test]
    fn skipped_rows_are_summarised() {
        let text = render_text("Block B1", &sample_result(Some("B1")));
        assert!(text.contains("_Skipped: 1 outside block"));
    }

    #[test]
    fn report_names_block_section() {
        let overall = sample_result(None);
        let block = sample_result(Some("B2"));
        let text = Report::new("grades.xlsx", Some(&overall), Some(&block))
            .render(OutputFormat::Text)
            .unwrap();
        assert!(text.starts_with("# Excel Result Analyzer Report"));
        assert!(text.contains("Generated from grades.xlsx"));
        assert!(!text.contains("File loaded at"));
        assert!(text.contains("## All Results"));
        assert!(text.contains("## Block B2"));
    }

    #[test]
    fn json_keeps_percentages_as_strings() {
        let overall = sample_result(Some("B1"));
        let json = Report::new("grades.xlsx", Some(&overall), None)
            .render(OutputFormat::Json)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["overall"]["pass"], 1);
        assert_eq!(value["overall"]["grade_counts"]["HD"], 1);
        assert_eq!(value["overall"]["grade_percentages"]["HD"], "50.0");
        assert_eq!(value["overall"]["grade_percentages"]["FNS"], "0.0");
        assert_eq!(value["overall"]["filter"], "B1");
        assert!(value["block"].is_null());
        assert!(value["loaded_at"].is_null());
    }

    #[test]
    fn load_time_is_reported() {
        let overall = sample_result(None);
        let loaded_at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 15, 30).unwrap();
        let report = Report::new("grades.xlsx", Some(&overall), None).loaded_at(loaded_at);

        let text = report.render(OutputFormat::Text).unwrap();
        assert!(text.contains("File loaded at 2026-03-02 09:15:30 UTC"));

        let json = report.render(OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["loaded_at"], "2026-03-02T09:15:30Z");
    }

    #[test]
    fn bars_scale_to_maximum() {
        assert_eq!(bar(0, 10), "");
        assert_eq!(bar(5, 0), "");
        assert_eq!(bar(10, 10).len(), BAR_WIDTH);
        assert_eq!(bar(1, 1000).len(), 1);
    }
}
