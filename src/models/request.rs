use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::BookingIntent;

pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// One in-progress multi-turn request: the resolved intent plus whatever
/// field values have been collected so far. The intent is fixed for the
/// lifetime of the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRequest {
    pub intent: BookingIntent,
    pub fields: FieldMap,
}

impl PendingRequest {
    pub fn new(intent: BookingIntent) -> Self {
        Self {
            intent,
            fields: FieldMap::new(),
        }
    }
}

/// A persisted conversation session. One session owns at most one
/// PendingRequest; sessions expire after 30 minutes of inactivity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub request: PendingRequest,
    pub last_activity: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}
