//! Record normalizer for upstream case records.
//!
//! GIAV endpoints of different generations return the same entity with
//! different field names and formats. Normalization evaluates an ordered
//! list of accessors and takes the first defined, non-empty value, so the
//! output schema is stable regardless of which upstream variant answered.

use crate::models::{NormalizedCase, PaymentSummary};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;

const ID_FIELDS: &[&str] = &["IdExpediente", "idExpediente", "id_expediente", "Id", "id"];
const CODE_FIELDS: &[&str] = &["Codigo", "codigo", "Code", "code"];
const TITLE_FIELDS: &[&str] = &["Titulo", "titulo", "Descripcion", "descripcion", "Title", "title"];
const STATUS_FIELDS: &[&str] = &["Estado", "estado", "Status", "status"];
const STAGE_ID_FIELDS: &[&str] = &["IdEtapa", "idEtapa", "id_etapa"];
const START_DATE_FIELDS: &[&str] = &["FechaInicio", "fechaInicio", "fecha_inicio", "StartDate"];
const END_DATE_FIELDS: &[&str] = &["FechaFin", "fechaFin", "fecha_fin", "EndDate"];

/// Pending amounts within this tolerance of zero count as settled.
pub const PAID_EPSILON: f64 = 0.01;

/// Shape one raw case record into the stable client contract.
///
/// `summary` is the eligibility computation for this case when available;
/// without it the bonus flag stays unknown (`None`), never `false`.
pub fn normalize_case(
    raw: &Value,
    summary: Option<&PaymentSummary>,
    stage_names: &HashMap<i64, String>,
) -> NormalizedCase {
    let id = case_id(raw);
    let code = first_str(raw, CODE_FIELDS).unwrap_or_default();
    let title = first_str(raw, TITLE_FIELDS).unwrap_or_default();

    let status = first_str(raw, STATUS_FIELDS)
        .or_else(|| {
            first_i64(raw, STAGE_ID_FIELDS)
                .and_then(|stage_id| stage_names.get(&stage_id).cloned())
        })
        .unwrap_or_default();

    let start_date = first_str(raw, START_DATE_FIELDS).as_deref().and_then(parse_date);
    let end_date = first_str(raw, END_DATE_FIELDS).as_deref().and_then(parse_date);
    let date_range = match (start_date, end_date) {
        (Some(start), Some(end)) => Some(format_range(start, end)),
        _ => None,
    };

    let bonus_available = summary.map(|s| s.pending <= PAID_EPSILON);

    NormalizedCase {
        id,
        code,
        title,
        status,
        start_date,
        end_date,
        date_range,
        payment: summary.cloned(),
        bonus_available,
    }
}

/// Resolved case identifier; `0` means unknown and must never be used as a key.
pub fn case_id(raw: &Value) -> i64 {
    first_i64(raw, ID_FIELDS).unwrap_or(0)
}

/// First numeric value among the named fields; numeric strings count.
pub(crate) fn first_i64(raw: &Value, fields: &[&str]) -> Option<i64> {
    fields.iter().find_map(|field| match raw.get(field) {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

/// First defined, non-empty numeric value among the named fields.
pub(crate) fn first_f64(raw: &Value, fields: &[&str]) -> Option<f64> {
    fields.iter().find_map(|field| match raw.get(field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    })
}

/// First defined, non-empty string among the named fields.
pub(crate) fn first_str(raw: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match raw.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

pub(crate) fn first_bool(raw: &Value, fields: &[&str]) -> Option<bool> {
    fields.iter().find_map(|field| match raw.get(field) {
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::Number(n)) => n.as_i64().map(|v| v != 0),
        _ => None,
    })
}

/// Parse the date representations GIAV is known to emit. Unparsable input
/// normalizes to `None`, never to a zero date.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    // ISO date, possibly with a time suffix.
    let iso = raw.get(..10).unwrap_or(raw);
    if let Ok(date) = NaiveDate::parse_from_str(iso, "%Y-%m-%d") {
        return Some(date);
    }
    NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok()
}

fn format_range(start: NaiveDate, end: NaiveDate) -> String {
    format!("{} \u{2013} {}", start.format("%d/%m/%Y"), end.format("%d/%m/%Y"))
}
