//! Flat tabular export of the feature rows
//!
//! One CSV line per selected feature, in `feature_row` order, under a fixed
//! header. Absent descriptions and urls are written as empty fields, and text
//! fields are quoted when they contain a comma, quote, or line break.

use std::fmt::{self, Write as _};

use crate::bundle::FeatureRow;

pub const COLUMNS: [&str; 15] = [
    "feature_row",
    "feature_id",
    "preferred_role",
    "score",
    "stability",
    "sd",
    "mu",
    "pref_ratio",
    "active_frac",
    "cv",
    "mean_activation",
    "max_activation",
    "bridge_entropy",
    "description",
    "neuronpedia_url",
];

/// Renders the rows as CSV text, header included.
pub fn to_csv(rows: &[FeatureRow]) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{}", COLUMNS.join(","))?;
    for row in rows {
        let m = &row.metrics;
        writeln!(
            out,
            "{},{},{},{:?},{:?},{:?},{:?},{:?},{:?},{:?},{:?},{:?},{:?},{},{}",
            row.feature_row,
            row.feature_id,
            escape(&row.preferred_role),
            m.score,
            m.stability,
            m.sd,
            m.mu,
            m.pref_ratio,
            m.active_frac,
            m.cv,
            m.mean_activation,
            m.max_activation,
            m.bridge_entropy,
            escape(row.description.as_deref().unwrap_or_default()),
            escape(row.neuronpedia_url.as_deref().unwrap_or_default()),
        )?;
    }
    Ok(out)
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}
