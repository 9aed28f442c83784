//! CSV encoding of partition tables.
//!
//! Tables are UTF-8 with a byte order mark. Floats are written in their
//! shortest round-trip form, so decoding and re-encoding a table gives back
//! the same bytes.

use std::cmp::Ordering;
use std::collections::HashMap;

use forecast_common::{LeadTime, Period};
use zonal::AdminLevel;

use crate::aggregator::StatRow;
use crate::error::{PipelineError, Result};

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const ADMIN0_COLUMNS: [&str; 2] = ["iso_code", "adm0_name"];
const ADMIN1_COLUMNS: [&str; 2] = ["adm1_pcode", "adm1_name"];
const PERIOD_COLUMNS: [&str; 6] = [
    "admin_level",
    "issue_year",
    "issue_month",
    "lead_time",
    "valid_year",
    "valid_month",
];
const STAT_COLUMNS: [&str; 3] = ["pixel_count", "mean_anomaly", "median_anomaly"];

/// Published column set for a table of `level` rows.
pub fn columns(level: AdminLevel) -> Vec<&'static str> {
    let mut columns: Vec<&str> = ADMIN0_COLUMNS.to_vec();
    if level == AdminLevel::Adm1 {
        columns.extend(ADMIN1_COLUMNS);
    }
    columns.extend(PERIOD_COLUMNS);
    columns.extend(STAT_COLUMNS);
    columns
}

fn cmp_none_last(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Ascending by iso_code, [adm1_pcode], issue period and lead time; ties
/// keep their merge order.
pub fn sort_rows(rows: &mut [StatRow], level: AdminLevel) {
    rows.sort_by(|a, b| {
        let mut ordering = cmp_none_last(&a.iso_code, &b.iso_code);
        if level == AdminLevel::Adm1 {
            ordering = ordering.then_with(|| cmp_none_last(&a.adm1_pcode, &b.adm1_pcode));
        }
        ordering
            .then_with(|| a.issue.cmp(&b.issue))
            .then_with(|| a.lead_time.cmp(&b.lead_time))
    });
}

fn optional_text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn optional_float(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn record(row: &StatRow, level: AdminLevel) -> Vec<String> {
    let mut record = vec![optional_text(&row.iso_code), optional_text(&row.adm0_name)];
    if level == AdminLevel::Adm1 {
        record.push(optional_text(&row.adm1_pcode));
        record.push(optional_text(&row.adm1_name));
    }
    record.extend([
        row.admin_level.to_string(),
        row.issue.year().to_string(),
        row.issue.month().to_string(),
        row.lead_time.to_string(),
        row.valid.year().to_string(),
        row.valid.month().to_string(),
        row.pixel_count.to_string(),
        optional_float(row.mean_anomaly),
        optional_float(row.median_anomaly),
    ]);
    record
}

/// Project, sort and encode a partition table.
pub fn encode_table(rows: &[StatRow], level: AdminLevel) -> Result<Vec<u8>> {
    let mut sorted = rows.to_vec();
    sort_rows(&mut sorted, level);

    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer.write_record(columns(level))?;
    for row in &sorted {
        writer.write_record(record(row, level))?;
    }
    writer
        .into_inner()
        .map_err(|e| PipelineError::Io(e.into_error()))
}

/// Decode a published table. Columns are looked up by header name.
pub fn decode_table(name: &str, bytes: &[u8]) -> Result<Vec<StatRow>> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let malformed = |reason: String| PipelineError::RecoveredTable {
        name: name.to_string(),
        reason,
    };

    let mut reader = csv::Reader::from_reader(bytes);
    let headers: HashMap<String, usize> = reader
        .headers()
        .map_err(|e| malformed(e.to_string()))?
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_string(), i))
        .collect();

    let index = |column: &str| {
        headers
            .get(column)
            .copied()
            .ok_or_else(|| malformed(format!("missing column {}", column)))
    };
    let iso_code = index("iso_code")?;
    let adm0_name = index("adm0_name")?;
    let adm1_pcode = headers.get("adm1_pcode").copied();
    let adm1_name = headers.get("adm1_name").copied();
    let admin_level = index("admin_level")?;
    let issue_year = index("issue_year")?;
    let issue_month = index("issue_month")?;
    let lead_time = index("lead_time")?;
    let valid_year = index("valid_year")?;
    let valid_month = index("valid_month")?;
    let pixel_count = index("pixel_count")?;
    let mean_anomaly = index("mean_anomaly")?;
    let median_anomaly = index("median_anomaly")?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| malformed(e.to_string()))?;
        let field = |i: usize| record.get(i).map(str::trim).unwrap_or("");
        let text = |i: Option<usize>| i.map(field).filter(|s| !s.is_empty()).map(String::from);
        let at = |reason: String| malformed(format!("row {}: {}", line + 1, reason));

        let level = parse_integer(field(admin_level))
            .and_then(|l| u8::try_from(l).ok())
            .and_then(AdminLevel::from_number)
            .ok_or_else(|| at(format!("bad admin_level {:?}", field(admin_level))))?;
        let issue = parse_period(field(issue_year), field(issue_month))
            .ok_or_else(|| at("bad issue period".into()))?;
        let valid = parse_period(field(valid_year), field(valid_month))
            .ok_or_else(|| at("bad valid period".into()))?;
        let lead = parse_integer(field(lead_time))
            .and_then(|l| u8::try_from(l).ok())
            .and_then(|l| LeadTime::new(l).ok())
            .ok_or_else(|| at(format!("bad lead_time {:?}", field(lead_time))))?;
        let pixels = parse_float(field(pixel_count))
            .map_err(|reason| at(reason))?
            .unwrap_or(0.0);

        rows.push(StatRow {
            iso_code: text(Some(iso_code)),
            adm0_name: text(Some(adm0_name)),
            adm1_pcode: text(adm1_pcode),
            adm1_name: text(adm1_name),
            admin_level: level,
            issue,
            lead_time: lead,
            valid,
            pixel_count: pixels,
            mean_anomaly: parse_float(field(mean_anomaly)).map_err(|reason| at(reason))?,
            median_anomaly: parse_float(field(median_anomaly)).map_err(|reason| at(reason))?,
        });
    }
    Ok(rows)
}

/// Integers may have been written as whole floats (`2025.0`).
fn parse_integer(field: &str) -> Option<i64> {
    field.parse::<i64>().ok().or_else(|| {
        field
            .parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

fn parse_period(year: &str, month: &str) -> Option<Period> {
    let year = i32::try_from(parse_integer(year)?).ok()?;
    let month = u32::try_from(parse_integer(month)?).ok()?;
    Period::new(year, month).ok()
}

/// Empty fields and NaN are absent values.
fn parse_float(field: &str) -> std::result::Result<Option<f64>, String> {
    if field.is_empty() {
        return Ok(None);
    }
    let value = field
        .parse::<f64>()
        .map_err(|_| format!("bad number {:?}", field))?;
    Ok(Some(value).filter(|v| !v.is_nan()))
}
