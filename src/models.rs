use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

pub const BLOCK_COLUMN: &str = "Block";
pub const FINAL_GRADE_COLUMN: &str = "Final Grade";
pub const ROW_TOTAL_COLUMN: &str = "Row Total";

/// A single spreadsheet cell as it reaches the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Numeric reading of the cell, `None` when it does not hold a number.
    ///
    /// Text cells use the leading-prefix rule: `"64 marks"` reads as 64 while
    /// `"N/A"` and `""` do not read at all.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            CellValue::Number(n) => *n,
            CellValue::Text(s) => parse_leading_float(s)?,
            CellValue::Bool(_) => return None,
        };
        (!value.is_nan()).then_some(value)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

/// Parses the longest decimal prefix of `input` after leading whitespace.
pub fn parse_leading_float(input: &str) -> Option<f64> {
    let trimmed = input.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    if trimmed[end..].starts_with("Infinity") {
        let sign = if trimmed.starts_with('-') { -1.0 } else { 1.0 };
        return Some(sign * f64::INFINITY);
    }

    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    trimmed[..end].parse::<f64>().ok()
}

/// One parsed spreadsheet row, keyed by header name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowRecord {
    fields: BTreeMap<String, CellValue>,
}

impl RowRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<CellValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: &str, value: impl Into<CellValue>) {
        self.fields.insert(column.to_string(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.fields.get(column)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn block(&self) -> Option<String> {
        self.get(BLOCK_COLUMN).map(ToString::to_string)
    }

    /// The row's grade when its `Final Grade` text is one of the known codes.
    pub fn final_grade(&self) -> Option<Grade> {
        self.get(FINAL_GRADE_COLUMN)
            .and_then(CellValue::as_text)
            .and_then(Grade::from_code)
    }

    pub fn row_total(&self) -> Option<f64> {
        self.get(ROW_TOTAL_COLUMN).and_then(CellValue::as_number)
    }
}

impl<K: Into<String>> FromIterator<(K, CellValue)> for RowRecord {
    fn from_iter<I: IntoIterator<Item = (K, CellValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Grade {
    HD,
    D,
    C,
    P,
    F,
    GP,
    FNE,
    FNS,
}

impl Grade {
    pub const ALL: [Grade; 8] = [
        Grade::HD,
        Grade::D,
        Grade::C,
        Grade::P,
        Grade::F,
        Grade::GP,
        Grade::FNE,
        Grade::FNS,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Grade::HD => "HD",
            Grade::D => "D",
            Grade::C => "C",
            Grade::P => "P",
            Grade::F => "F",
            Grade::GP => "GP",
            Grade::FNE => "FNE",
            Grade::FNS => "FNS",
        }
    }

    /// Exact, case-sensitive lookup.
    pub fn from_code(code: &str) -> Option<Grade> {
        Grade::ALL.into_iter().find(|grade| grade.code() == code)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A share of graded rows held in tenths of a percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Percentage {
    tenths: u32,
}

impl Percentage {
    pub const ZERO: Percentage = Percentage { tenths: 0 };

    /// `count / total * 100` in floating point, then rounded to one decimal.
    pub fn of(count: usize, total: usize) -> Self {
        if total == 0 {
            return Self::ZERO;
        }
        let share = count as f64 / total as f64 * 100.0;
        Self {
            tenths: round_to_tenths(share),
        }
    }

    pub fn tenths(self) -> u32 {
        self.tenths
    }
}

/// Rounds the exact binary value of a non-negative finite `value` to the
/// nearest tenth, taking the larger tenth on an exact tie.
///
/// `{:.1}` is not used because it breaks exact ties towards even digits.
fn round_to_tenths(value: f64) -> u32 {
    let bits = value.to_bits();
    let exponent_bits = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, exponent) = if exponent_bits == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), exponent_bits - 1075)
    };

    let scaled = u128::from(mantissa) * 10;
    if exponent >= 0 {
        return (scaled << exponent) as u32;
    }

    // value * 10 == scaled / 2^shift; scaled stays below 2^57.
    let shift = (-exponent) as u32;
    if shift > 64 {
        return 0;
    }
    let whole = scaled >> shift;
    let remainder = scaled - (whole << shift);
    let half = 1u128 << (shift - 1);
    let tenths = if remainder >= half { whole + 1 } else { whole };
    tenths as u32
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.tenths / 10, self.tenths % 10)
    }
}

impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Rows that fed no statistic, by reason. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkipReport {
    pub filtered_out: usize,
    pub ungraded: usize,
    pub unscored: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    pub pass: usize,
    pub fail: usize,
    pub grade_counts: BTreeMap<Grade, usize>,
    pub grade_percentages: BTreeMap<Grade, Percentage>,
    pub filter: Option<String>,
    pub skipped: SkipReport,
}

impl AggregationResult {
    pub fn count(&self, grade: Grade) -> usize {
        self.grade_counts.get(&grade).copied().unwrap_or(0)
    }

    pub fn percentage(&self, grade: Grade) -> Percentage {
        self.grade_percentages
            .get(&grade)
            .copied()
            .unwrap_or(Percentage::ZERO)
    }

    pub fn total_graded(&self) -> usize {
        self.grade_counts.values().sum()
    }

    pub fn total_classified(&self) -> usize {
        self.pass + self.fail
    }
}

#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub rows: Vec<RowRecord>,
    pub loaded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_float_follows_prefix_rule() {
        assert_eq!(parse_leading_float("85"), Some(85.0));
        assert_eq!(parse_leading_float("  72.5"), Some(72.5));
        assert_eq!(parse_leading_float("64 marks"), Some(64.0));
        assert_eq!(parse_leading_float(".5"), Some(0.5));
        assert_eq!(parse_leading_float("-3e2x"), Some(-300.0));
        assert_eq!(parse_leading_float("1e"), Some(1.0));
        assert_eq!(parse_leading_float("Infinity"), Some(f64::INFINITY));
        assert_eq!(parse_leading_float("N/A"), None);
        assert_eq!(parse_leading_float(""), None);
        assert_eq!(parse_leading_float("."), None);
        assert_eq!(parse_leading_float("-"), None);
    }

    #[test]
    fn grade_lookup_is_exact() {
        assert_eq!(Grade::from_code("HD"), Some(Grade::HD));
        assert_eq!(Grade::from_code("FNS"), Some(Grade::FNS));
        assert_eq!(Grade::from_code("hd"), None);
        assert_eq!(Grade::from_code(" HD"), None);
        assert_eq!(Grade::from_code("Z"), None);
    }

    #[test]
    fn numeric_grade_cells_never_match() {
        let row = RowRecord::new().with(FINAL_GRADE_COLUMN, 1.0);
        assert_eq!(row.final_grade(), None);
    }

    #[test]
    fn percentage_rounds_the_float_share() {
        assert_eq!(Percentage::of(1, 3).to_string(), "33.3");
        assert_eq!(Percentage::of(23, 80).to_string(), "28.7");
        assert_eq!(Percentage::of(41, 80).to_string(), "51.2");
        assert_eq!(Percentage::of(51, 80).to_string(), "63.7");
        assert_eq!(Percentage::of(1, 80).to_string(), "1.3");
        assert_eq!(Percentage::of(2, 3).to_string(), "66.7");
        assert_eq!(Percentage::of(1, 16).to_string(), "6.3");
        assert_eq!(Percentage::of(1, 2).to_string(), "50.0");
        assert_eq!(Percentage::of(4, 4).to_string(), "100.0");
        assert_eq!(Percentage::of(0, 0).to_string(), "0.0");
    }

    #[test]
    fn number_cells_display_like_text() {
        assert_eq!(CellValue::Number(1.0).to_string(), "1");
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5");
        assert_eq!(CellValue::from("B1").to_string(), "B1");
    }
}
