use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    AppointmentView, BookedAppointment, BookingIntent, FieldMap, IntentResolution, PendingRequest,
    Session,
};
use crate::services::ai::{intent::resolve_intent, Message};
use crate::services::scheduling::{self, BookingRequest};
use crate::services::slots;
use crate::state::AppState;

const SESSION_TTL_MINUTES: i64 = 30;

/// Everything a conversational turn can answer with.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ChatReply {
    Collecting {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        missing_fields: Vec<&'static str>,
        current_state: FieldMap,
        intent: BookingIntent,
    },
    Booked {
        message: String,
        appointment: BookedAppointment,
    },
    Done {
        message: String,
    },
    Appointments {
        message: String,
        appointments: Vec<AppointmentView>,
    },
}

/// One free-text turn: resolve intent, fold extracted fields into the
/// session's pending request, and either keep collecting or commit.
pub async fn process_message(
    state: &Arc<AppState>,
    session_id: &str,
    message: &str,
) -> Result<ChatReply, AppError> {
    let session = {
        let db = state.db.lock().unwrap();
        let _ = queries::expire_old_sessions(&db);
        queries::get_session(&db, session_id)?
    };

    let history = session.as_ref().map(session_context).unwrap_or_default();

    let resolution = resolve_intent(state.llm.as_ref(), &history, message)
        .await
        .map_err(|e| AppError::Ai(e.to_string()))?;

    let extracted = match resolution {
        IntentResolution::Recognized(extracted) => extracted,
        IntentResolution::Unrecognized => return Err(AppError::Unrecognized),
    };

    // The intent is fixed once a request is in flight; mid-conversation
    // answers ("tomorrow at 3") routinely classify as something else.
    let mut request = match &session {
        Some(session) => session.request.clone(),
        None => PendingRequest::new(extracted.intent),
    };

    tracing::info!(
        session = session_id,
        intent = request.intent.as_str(),
        resumed = session.is_some(),
        "processing turn"
    );

    let missing = slots::merge_fields(&mut request, &extracted.fields);

    if request.intent == BookingIntent::View {
        let db = state.db.lock().unwrap();
        let appointments = scheduling::list(&db)?;
        return Ok(ChatReply::Appointments {
            message: extracted
                .reply
                .unwrap_or_else(|| "Here are the appointments on file.".to_string()),
            appointments,
        });
    }

    if !missing.is_empty() {
        let message = extracted
            .reply
            .unwrap_or_else(|| prompt_for(missing[0]).to_string());
        let current_state = request.fields.clone();
        let intent = request.intent;
        save_session(state, session_id, request)?;
        return Ok(ChatReply::Collecting {
            message: Some(message),
            missing_fields: missing,
            current_state,
            intent,
        });
    }

    let reply = commit(state, &request)?;
    let db = state.db.lock().unwrap();
    queries::delete_session(&db, session_id)?;
    Ok(reply)
}

/// One structured turn: the client supplies a single field value for the
/// request it is holding. No language model involved.
pub fn update_field(
    state: &Arc<AppState>,
    session_id: &str,
    intent: Option<BookingIntent>,
    current_state: &FieldMap,
    field: &str,
    value: &str,
) -> Result<ChatReply, AppError> {
    let mut request = resume_request(state, session_id, intent, current_state)?;

    let missing = slots::apply_update(&mut request, field, value);
    let intent = request.intent;
    let current_state = request.fields.clone();

    if missing.is_empty() {
        save_session(state, session_id, request)?;
        return Ok(ChatReply::Collecting {
            message: Some("That's everything I need. Say the word and I'll confirm it.".to_string()),
            missing_fields: missing,
            current_state,
            intent,
        });
    }

    let message = prompt_for(missing[0]).to_string();
    save_session(state, session_id, request)?;
    Ok(ChatReply::Collecting {
        message: Some(message),
        missing_fields: missing,
        current_state,
        intent,
    })
}

/// One structured completion turn: validate the supplied state against
/// the required-field table and commit. Missing fields are a 400, never
/// a partial write.
pub fn complete_booking(
    state: &Arc<AppState>,
    session_id: &str,
    intent: Option<BookingIntent>,
    current_state: &FieldMap,
) -> Result<ChatReply, AppError> {
    let request = resume_request(state, session_id, intent, current_state)?;

    let missing = slots::missing_fields(request.intent, &request.fields);
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    let reply = commit(state, &request)?;
    let db = state.db.lock().unwrap();
    queries::delete_session(&db, session_id)?;
    Ok(reply)
}

/// Load the session's pending request, fold in whatever state the client
/// sent, and fix the intent: session first, then the turn's own claim.
fn resume_request(
    state: &Arc<AppState>,
    session_id: &str,
    intent: Option<BookingIntent>,
    current_state: &FieldMap,
) -> Result<PendingRequest, AppError> {
    let session = {
        let db = state.db.lock().unwrap();
        queries::get_session(&db, session_id)?
    };

    let mut request = match session {
        Some(session) => session.request,
        None => PendingRequest::new(intent.ok_or_else(|| {
            AppError::Validation(
                "no active request for this session; start by sending a message".to_string(),
            )
        })?),
    };

    slots::merge_fields(&mut request, current_state);
    Ok(request)
}

fn commit(state: &Arc<AppState>, request: &PendingRequest) -> Result<ChatReply, AppError> {
    let mut db = state.db.lock().unwrap();

    match request.intent {
        BookingIntent::Book => {
            let booking = BookingRequest::from_fields(&request.fields)?;
            let booked = scheduling::book(&mut db, &booking)?;
            Ok(ChatReply::Booked {
                message: booked.message.clone(),
                appointment: booked,
            })
        }
        BookingIntent::Reschedule => {
            let moved = scheduling::reschedule(
                &mut db,
                get_str(&request.fields, "name"),
                get_str(&request.fields, "old_date"),
                get_str(&request.fields, "old_time"),
                get_str(&request.fields, "new_date"),
                get_str(&request.fields, "new_time"),
            )?;
            Ok(ChatReply::Done {
                message: format!(
                    "Your appointment has been moved to {} at {}.",
                    moved.date, moved.time
                ),
            })
        }
        BookingIntent::Cancel => {
            scheduling::cancel(
                &mut db,
                get_str(&request.fields, "name"),
                get_str(&request.fields, "appointment_date"),
                get_str(&request.fields, "appointment_time"),
            )?;
            Ok(ChatReply::Done {
                message: "Your appointment has been cancelled.".to_string(),
            })
        }
        BookingIntent::View => {
            let appointments = scheduling::list(&db)?;
            Ok(ChatReply::Appointments {
                message: "Here are the appointments on file.".to_string(),
                appointments,
            })
        }
    }
}

fn save_session(
    state: &Arc<AppState>,
    session_id: &str,
    request: PendingRequest,
) -> Result<(), AppError> {
    let now = Utc::now().naive_utc();
    let session = Session {
        id: session_id.to_string(),
        request,
        last_activity: now,
        expires_at: now + Duration::minutes(SESSION_TTL_MINUTES),
    };
    let db = state.db.lock().unwrap();
    queries::save_session(&db, &session)?;
    Ok(())
}

/// Compact summary of the in-flight request, given to the model as
/// history so mid-conversation answers land on the right fields.
fn session_context(session: &Session) -> Vec<Message> {
    let filled: Vec<String> = session
        .request
        .fields
        .iter()
        .map(|(k, v)| format!("{k}={}", v.as_str().unwrap_or_default()))
        .collect();
    let missing = slots::missing_fields(session.request.intent, &session.request.fields);

    vec![Message {
        role: "assistant".to_string(),
        content: format!(
            "We are in the middle of a '{}' request. Collected so far: {}. Still needed: {}.",
            session.request.intent.as_str(),
            if filled.is_empty() { "nothing".to_string() } else { filled.join(", ") },
            missing.join(", "),
        ),
    }]
}

fn get_str<'a>(fields: &'a FieldMap, name: &str) -> &'a str {
    fields.get(name).and_then(|v| v.as_str()).unwrap_or("")
}

fn prompt_for(field: &str) -> &'static str {
    match field {
        "name" => "May I have your full name?",
        "age" => "What is your age?",
        "gender" => "What is your gender?",
        "contact_number" => "What phone number can we reach you at?",
        "email" => "What is your email address?",
        "department" => "Which department or specialization do you need?",
        "appointment_date" => "What date would you like to come in?",
        "appointment_time" => "What time works for you?",
        "old_date" => "What is the date of the appointment you'd like to move?",
        "old_time" => "What time is that appointment currently at?",
        "new_date" => "What new date would you like?",
        "new_time" => "What new time would you like?",
        _ => "Could you tell me a bit more?",
    }
}
