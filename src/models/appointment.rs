use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub appointment_id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub department: String,
    pub date: String,
    pub time: String,
    pub status: AppointmentStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "cancelled" => AppointmentStatus::Cancelled,
            _ => AppointmentStatus::Scheduled,
        }
    }
}

/// A successful booking, carrying the identities a caller needs to
/// confirm the appointment back to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookedAppointment {
    pub message: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub doctor_name: String,
}

/// Appointment row joined with patient and doctor names, for listings.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentView {
    pub appointment_id: String,
    pub patient_name: String,
    pub doctor_name: String,
    pub department: String,
    pub date: String,
    pub time: String,
    pub status: AppointmentStatus,
}
