use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sampling bucket picked from the length of a charted range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    /// Every calendar day (ranges up to 30 days)
    Daily,
    /// Fixed step of `days` (ranges of 31–150 days)
    Stepped { days: i64 },
    /// Month-ends (ranges of 151–912 days)
    Monthly,
    /// Every other month-end (ranges of 913–1826 days)
    Bimonthly,
    /// Year-ends (longer ranges)
    Yearly,
}

impl Granularity {
    /// Row label for a sample date.
    pub fn label(&self, date: NaiveDate) -> String {
        match self {
            Granularity::Daily | Granularity::Stepped { .. } => date.format("%Y-%m-%d").to_string(),
            Granularity::Monthly | Granularity::Bimonthly => date.format("%b %Y").to_string(),
            Granularity::Yearly => date.format("%Y").to_string(),
        }
    }
}

/// Portfolio value on one sample date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformancePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Sampled valuation trend, ready to print as a bar chart.
///
/// The core computes every number here; `render` only formats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceChart {
    pub granularity: Granularity,
    pub points: Vec<PerformancePoint>,
    pub min_value: f64,
    pub max_value: f64,
    /// Currency units represented by one `*`
    pub scale: u64,
}

impl PerformanceChart {
    /// Number of `*` drawn for `value`.
    pub fn bar_len(&self, value: f64) -> usize {
        ((value - self.min_value) / self.scale as f64).floor().max(0.0) as usize
    }

    /// One `label: ***` row per sample, then `Scale: N`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for point in &self.points {
            out.push_str(&self.granularity.label(point.date));
            out.push_str(": ");
            out.push_str(&"*".repeat(self.bar_len(point.value)));
            out.push('\n');
        }
        out.push_str(&format!("Scale: {}\n", self.scale));
        out
    }
}
