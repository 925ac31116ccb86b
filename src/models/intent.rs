use serde::{Deserialize, Serialize};

use crate::models::FieldMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingIntent {
    Book,
    Reschedule,
    Cancel,
    View,
}

impl BookingIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingIntent::Book => "book",
            BookingIntent::Reschedule => "reschedule",
            BookingIntent::Cancel => "cancel",
            BookingIntent::View => "view",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "book" => Some(BookingIntent::Book),
            "reschedule" => Some(BookingIntent::Reschedule),
            "cancel" => Some(BookingIntent::Cancel),
            "view" => Some(BookingIntent::View),
            _ => None,
        }
    }
}

/// What the language model extracted from one user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedIntent {
    pub intent: BookingIntent,
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default)]
    pub reply: Option<String>,
}

/// Typed result of the intent boundary. The extraction is untrusted:
/// callers must re-run the missing-field check before acting on it.
#[derive(Debug, Clone)]
pub enum IntentResolution {
    Recognized(ExtractedIntent),
    Unrecognized,
}
