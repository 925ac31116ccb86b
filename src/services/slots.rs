use serde_json::Value;

use crate::models::{BookingIntent, FieldMap, PendingRequest};
use crate::services::normalize::{normalize_date, normalize_time};

const BOOK_FIELDS: &[&str] = &[
    "name",
    "age",
    "gender",
    "contact_number",
    "email",
    "department",
    "appointment_date",
    "appointment_time",
];
const RESCHEDULE_FIELDS: &[&str] = &["name", "old_date", "old_time", "new_date", "new_time"];
const CANCEL_FIELDS: &[&str] = &["name", "appointment_date", "appointment_time"];

/// Canonical required-field order per intent. The order is what the
/// conversation layer prompts in, so it must be stable.
pub fn required_fields(intent: BookingIntent) -> &'static [&'static str] {
    match intent {
        BookingIntent::Book => BOOK_FIELDS,
        BookingIntent::Reschedule => RESCHEDULE_FIELDS,
        BookingIntent::Cancel => CANCEL_FIELDS,
        BookingIntent::View => &[],
    }
}

/// Required fields whose value is still absent, null, or blank, in
/// canonical order. Empty result means the request is ready to commit.
pub fn missing_fields(intent: BookingIntent, fields: &FieldMap) -> Vec<&'static str> {
    required_fields(intent)
        .iter()
        .filter(|name| fields.get(**name).map(is_blank).unwrap_or(true))
        .copied()
        .collect()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Store one field value on the request, normalizing dates and times by
/// field name, and recompute the missing set. Re-applying the same
/// (field, value) pair leaves the request unchanged: normalization is
/// deterministic and already-normalized values normalize to themselves.
pub fn apply_update(
    request: &mut PendingRequest,
    field: &str,
    value: &str,
) -> Vec<&'static str> {
    let stored = if field.contains("date") {
        normalize_date(value)
    } else if field.contains("time") {
        normalize_time(value)
    } else {
        value.trim().to_string()
    };

    request
        .fields
        .insert(field.to_string(), Value::String(stored));

    missing_fields(request.intent, &request.fields)
}

/// Merge a batch of extracted fields into the request, skipping blanks so
/// the model cannot erase values the user already supplied.
pub fn merge_fields(request: &mut PendingRequest, extracted: &FieldMap) -> Vec<&'static str> {
    for (field, value) in extracted {
        if is_blank(value) {
            continue;
        }
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        apply_update(request, field, &value);
    }
    missing_fields(request.intent, &request.fields)
}
