use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::Value;

use crate::errors::AppError;
use crate::models::{BookedAppointment, BookingIntent, FieldMap, PendingRequest};
use crate::services::scheduling::{self, BookingRequest};
use crate::services::slots;
use crate::state::AppState;

/// One-shot booking, the non-conversational entry point. Goes through the
/// same required-field table, normalization, and engine as the chat flow.
pub async fn book(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FieldMap>,
) -> Result<Json<BookedAppointment>, AppError> {
    let fields = aliased(payload, &[("medical_history", "department")]);

    let mut request = PendingRequest::new(BookingIntent::Book);
    let missing = slots::merge_fields(&mut request, &fields);
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    let booking = BookingRequest::from_fields(&request.fields)?;
    let mut db = state.db.lock().unwrap();
    let booked = scheduling::book(&mut db, &booking)?;
    Ok(Json(booked))
}

pub async fn reschedule(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FieldMap>,
) -> Result<Json<Value>, AppError> {
    let mut request = PendingRequest::new(BookingIntent::Reschedule);
    let missing = slots::merge_fields(&mut request, &payload);
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    let mut db = state.db.lock().unwrap();
    let moved = scheduling::reschedule(
        &mut db,
        str_field(&request.fields, "name"),
        str_field(&request.fields, "old_date"),
        str_field(&request.fields, "old_time"),
        str_field(&request.fields, "new_date"),
        str_field(&request.fields, "new_time"),
    )?;

    Ok(Json(serde_json::json!({
        "message": "Appointment rescheduled",
        "date": moved.date,
        "time": moved.time,
    })))
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FieldMap>,
) -> Result<Json<Value>, AppError> {
    let fields = aliased(
        payload,
        &[("date", "appointment_date"), ("time", "appointment_time")],
    );

    let mut request = PendingRequest::new(BookingIntent::Cancel);
    let missing = slots::merge_fields(&mut request, &fields);
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    let mut db = state.db.lock().unwrap();
    scheduling::cancel(
        &mut db,
        str_field(&request.fields, "name"),
        str_field(&request.fields, "appointment_date"),
        str_field(&request.fields, "appointment_time"),
    )?;

    Ok(Json(serde_json::json!({ "message": "Appointment cancelled" })))
}

pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let db = state.db.lock().unwrap();
    let appointments = scheduling::list(&db)?;
    Ok(Json(serde_json::json!({ "appointments": appointments })))
}

/// The original public API accepted a couple of historical field names;
/// fold them onto the canonical ones without clobbering explicit values.
fn aliased(mut fields: FieldMap, aliases: &[(&str, &str)]) -> FieldMap {
    for (from, to) in aliases {
        if let Some(value) = fields.remove(*from) {
            fields.entry(to.to_string()).or_insert(value);
        }
    }
    fields
}

fn str_field<'a>(fields: &'a FieldMap, name: &str) -> &'a str {
    fields.get(name).and_then(|v| v.as_str()).unwrap_or("")
}
