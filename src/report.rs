use anyhow::Result;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::aggregate::AggregatedRow;
use crate::error::ReportError;
use crate::pricing::{PriceBook, PriceLookup};

pub const BASE_HEADER: [&str; 4] = ["Role", "Environment", "InstanceType", "InstanceCount"];

/// Yearly cost columns, one per purchase plan, in `InstancePrice::rates`
/// order.
pub const PRICING_HEADER: [&str; 13] = [
    "OnDemand",
    "YrTerm1ConvertibleAllUpfront",
    "YrTerm1ConvertiblePartialUpfront",
    "YrTerm1ConvertibleNoUpfront",
    "YrTerm1StandardAllUpfront",
    "YrTerm1StandardPartialUpfront",
    "YrTerm1StandardNoUpfront",
    "YrTerm3ConvertibleAllUpfront",
    "YrTerm3ConvertiblePartialUpfront",
    "YrTerm3ConvertibleNoUpfront",
    "YrTerm3StandardAllUpfront",
    "YrTerm3StandardPartialUpfront",
    "YrTerm3StandardNoUpfront",
];

const HOURS_PER_YEAR: f64 = 24.0 * 365.0;

/// Render the aggregated rows as CSV text. With a price book the report
/// carries the 13 yearly cost columns; a rate that is unknown, an
/// unlisted instance type, or an unavailable feed all render as empty
/// cells rather than zero.
pub fn render(rows: &[AggregatedRow], prices: Option<&PriceBook>) -> String {
    let mut out = String::new();

    let mut header: Vec<String> = BASE_HEADER.iter().map(|h| h.to_string()).collect();
    if prices.is_some() {
        header.extend(PRICING_HEADER.iter().map(|h| h.to_string()));
    }
    push_record(&mut out, &header);

    for row in rows {
        let mut fields = vec![
            row.role.clone(),
            row.environment.clone(),
            row.instance_type.clone(),
            row.count.to_string(),
        ];

        if let Some(book) = prices {
            let usage_hours = row.count as f64 * HOURS_PER_YEAR;
            match book.lookup(&row.instance_type) {
                PriceLookup::Priced(price) => {
                    fields.extend(
                        price
                            .rates()
                            .iter()
                            .map(|rate| yearly_cost_cell(*rate, usage_hours)),
                    );
                }
                PriceLookup::Unlisted | PriceLookup::Unavailable => {
                    fields.extend(std::iter::repeat(String::new()).take(PRICING_HEADER.len()));
                }
            }
        }

        push_record(&mut out, &fields);
    }

    out
}

fn yearly_cost_cell(hourly_rate: Option<f64>, usage_hours: f64) -> String {
    match hourly_rate {
        Some(rate) => format!("{:.2}", rate * usage_hours),
        None => String::new(),
    }
}

fn push_record(out: &mut String, fields: &[String]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape_field(field));
    }
    out.push('\n');
}

/// Quote a field when it contains a comma, quote, or line break. Tag
/// values are user input and can carry any of these.
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// `ec2instance_<DD>-<MM>-<YYYY>_<HH>-<MM>-<SS>.csv`
pub fn report_filename(generated_at: DateTime<Local>) -> String {
    format!(
        "ec2instance_{}.csv",
        generated_at.format("%d-%m-%Y_%H-%M-%S")
    )
}

/// Write the rendered report under `output_dir`, creating the directory
/// if needed. Returns the full path of the written file.
pub fn write_report(output_dir: &Path, csv: &str) -> Result<PathBuf> {
    fs::create_dir_all(output_dir).map_err(|e| {
        ReportError::Report(format!(
            "Could not create output directory {}: {}",
            output_dir.display(),
            e
        ))
    })?;

    let path = output_dir.join(report_filename(Local::now()));
    fs::write(&path, csv).map_err(|e| {
        ReportError::Report(format!("Could not write {}: {}", path.display(), e))
    })?;

    info!(
        path = %path.display(),
        bytes = csv.len(),
        "Report written"
    );

    Ok(path)
}
