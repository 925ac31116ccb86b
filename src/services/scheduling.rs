use chrono::Utc;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{
    Appointment, AppointmentStatus, AppointmentView, BookedAppointment, BookingIntent, FieldMap,
    Patient,
};
use crate::services::slots;

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("no doctors found with specialization '{0}'")]
    NoMatchingSpecialization(String),

    #[error("no doctor is available at that time. Please choose another date or time.")]
    NoAvailableDoctor,

    #[error("the new slot is already taken. Your original appointment is unchanged.")]
    SlotConflict,

    #[error("appointment not found")]
    NotFound,

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// A fully-collected booking, validated out of a raw field map.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub name: String,
    pub age: i64,
    pub gender: String,
    pub contact_number: String,
    pub email: String,
    pub department: String,
    pub appointment_date: String,
    pub appointment_time: String,
}

impl BookingRequest {
    pub fn from_fields(fields: &FieldMap) -> Result<Self, SchedulingError> {
        let missing = slots::missing_fields(BookingIntent::Book, fields);
        if !missing.is_empty() {
            return Err(SchedulingError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        let age = match &fields["age"] {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .filter(|age| (0..=130).contains(age))
        .ok_or_else(|| SchedulingError::Validation("age must be a number".to_string()))?;

        Ok(Self {
            name: field_str(fields, "name"),
            age,
            gender: field_str(fields, "gender"),
            contact_number: field_str(fields, "contact_number"),
            email: field_str(fields, "email"),
            department: field_str(fields, "department"),
            appointment_date: field_str(fields, "appointment_date"),
            appointment_time: field_str(fields, "appointment_time"),
        })
    }
}

fn field_str(fields: &FieldMap, name: &str) -> String {
    match fields.get(name) {
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Book an appointment: create the patient, pick the first free doctor
/// with the requested specialization (ascending doctor_id), and insert
/// the appointment. The whole sequence runs in one transaction so two
/// concurrent requests can never both claim the same (doctor, date, time);
/// any failure rolls everything back, including the patient insert.
pub fn book(
    conn: &mut Connection,
    request: &BookingRequest,
) -> Result<BookedAppointment, SchedulingError> {
    let tx = conn.transaction()?;

    let patient = Patient {
        patient_id: short_id(),
        name: request.name.clone(),
        age: request.age,
        gender: request.gender.clone(),
        contact_number: request.contact_number.clone(),
        email: request.email.clone(),
        department: request.department.clone(),
    };
    queries::insert_patient(&tx, &patient)?;

    let doctors = queries::doctors_by_specialization(&tx, &request.department)?;
    if doctors.is_empty() {
        return Err(SchedulingError::NoMatchingSpecialization(
            request.department.clone(),
        ));
    }

    let mut selected = None;
    for doctor in &doctors {
        let conflict = queries::query_conflicting_appointment(
            &tx,
            &doctor.doctor_id,
            &request.appointment_date,
            &request.appointment_time,
            None,
        )?;
        if conflict.is_none() {
            selected = Some(doctor);
            break;
        }
    }
    let doctor = selected.ok_or(SchedulingError::NoAvailableDoctor)?;

    let now = Utc::now().naive_utc();
    let appointment = Appointment {
        appointment_id: uuid::Uuid::new_v4().to_string(),
        patient_id: patient.patient_id.clone(),
        doctor_id: doctor.doctor_id.clone(),
        department: request.department.clone(),
        date: request.appointment_date.clone(),
        time: request.appointment_time.clone(),
        status: AppointmentStatus::Scheduled,
        created_at: now,
        updated_at: now,
    };
    queries::insert_appointment(&tx, &appointment)?;

    tx.commit()?;

    tracing::info!(
        patient = %patient.patient_id,
        doctor = %doctor.doctor_id,
        date = %request.appointment_date,
        time = %request.appointment_time,
        "appointment booked"
    );

    Ok(BookedAppointment {
        message: format!("Appointment scheduled with Dr. {}", doctor.name),
        patient_id: patient.patient_id,
        doctor_id: doctor.doctor_id.clone(),
        doctor_name: doctor.name.clone(),
    })
}

/// Move an existing appointment to a new slot. The availability re-check
/// and the update share a transaction: a SlotConflict leaves the original
/// appointment exactly as it was.
pub fn reschedule(
    conn: &mut Connection,
    name: &str,
    old_date: &str,
    old_time: &str,
    new_date: &str,
    new_time: &str,
) -> Result<Appointment, SchedulingError> {
    let tx = conn.transaction()?;

    let appointment = queries::find_appointment(&tx, name, old_date, old_time)?
        .ok_or(SchedulingError::NotFound)?;

    let conflict = queries::query_conflicting_appointment(
        &tx,
        &appointment.doctor_id,
        new_date,
        new_time,
        Some(&appointment.appointment_id),
    )?;
    if conflict.is_some() {
        return Err(SchedulingError::SlotConflict);
    }

    queries::update_appointment_slot(&tx, &appointment.appointment_id, new_date, new_time)?;
    tx.commit()?;

    tracing::info!(
        appointment = %appointment.appointment_id,
        old = %format!("{old_date} {old_time}"),
        new = %format!("{new_date} {new_time}"),
        "appointment rescheduled"
    );

    Ok(Appointment {
        date: new_date.to_string(),
        time: new_time.to_string(),
        ..appointment
    })
}

/// Cancel by status transition. The row stays; a cancelled appointment no
/// longer counts toward slot conflicts, so the slot is free again.
pub fn cancel(
    conn: &mut Connection,
    name: &str,
    date: &str,
    time: &str,
) -> Result<(), SchedulingError> {
    let tx = conn.transaction()?;

    let appointment =
        queries::find_appointment(&tx, name, date, time)?.ok_or(SchedulingError::NotFound)?;

    queries::update_appointment_status(&tx, &appointment.appointment_id, AppointmentStatus::Cancelled)?;
    tx.commit()?;

    tracing::info!(appointment = %appointment.appointment_id, "appointment cancelled");
    Ok(())
}

pub fn list(conn: &Connection) -> Result<Vec<AppointmentView>, SchedulingError> {
    Ok(queries::list_appointments(conn)?)
}

// First 8 chars of a v4 uuid, matching the patient id format the clinic
// already prints on intake forms.
fn short_id() -> String {
    uuid::Uuid::new_v4().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::Doctor;

    fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        queries::insert_doctor(
            &conn,
            &Doctor {
                doctor_id: "d1".to_string(),
                name: "Who".to_string(),
                specialization: "Cardiology".to_string(),
            },
        )
        .unwrap();
        queries::insert_doctor(
            &conn,
            &Doctor {
                doctor_id: "d2".to_string(),
                name: "Strange".to_string(),
                specialization: "Cardiology".to_string(),
            },
        )
        .unwrap();
        conn
    }

    fn request(name: &str) -> BookingRequest {
        BookingRequest {
            name: name.to_string(),
            age: 34,
            gender: "F".to_string(),
            contact_number: "+15551110000".to_string(),
            email: "a@example.com".to_string(),
            department: "Cardiology".to_string(),
            appointment_date: "2025-04-01".to_string(),
            appointment_time: "10:00".to_string(),
        }
    }

    #[test]
    fn test_book_selects_first_doctor() {
        let mut conn = setup_db();
        let booked = book(&mut conn, &request("A")).unwrap();
        assert_eq!(booked.doctor_id, "d1");
        assert_eq!(booked.doctor_name, "Who");
        assert!(booked.message.contains("Dr. Who"));
        assert_eq!(booked.patient_id.len(), 8);
    }

    #[test]
    fn test_second_booking_falls_through_to_next_doctor() {
        let mut conn = setup_db();
        let first = book(&mut conn, &request("A")).unwrap();
        let second = book(&mut conn, &request("B")).unwrap();
        assert_eq!(first.doctor_id, "d1");
        assert_eq!(second.doctor_id, "d2");
    }

    #[test]
    fn test_all_doctors_busy() {
        let mut conn = setup_db();
        book(&mut conn, &request("A")).unwrap();
        book(&mut conn, &request("B")).unwrap();
        let err = book(&mut conn, &request("C")).unwrap_err();
        assert!(matches!(err, SchedulingError::NoAvailableDoctor));
    }

    #[test]
    fn test_unknown_specialization() {
        let mut conn = setup_db();
        let mut req = request("A");
        req.department = "Dermatology".to_string();
        let err = book(&mut conn, &req).unwrap_err();
        assert!(matches!(err, SchedulingError::NoMatchingSpecialization(_)));
    }

    #[test]
    fn test_failed_booking_rolls_back_patient_insert() {
        let mut conn = setup_db();
        let mut req = request("A");
        req.department = "Dermatology".to_string();
        assert!(book(&mut conn, &req).is_err());

        let patients: i64 = conn
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))
            .unwrap();
        assert_eq!(patients, 0);
    }

    #[test]
    fn test_cancel_frees_the_slot() {
        let mut conn = setup_db();
        book(&mut conn, &request("A")).unwrap();
        book(&mut conn, &request("B")).unwrap();
        assert!(matches!(
            book(&mut conn, &request("C")),
            Err(SchedulingError::NoAvailableDoctor)
        ));

        cancel(&mut conn, "A", "2025-04-01", "10:00").unwrap();

        // the freed doctor is d1, the first in tie-break order
        let rebooked = book(&mut conn, &request("C")).unwrap();
        assert_eq!(rebooked.doctor_id, "d1");
    }

    #[test]
    fn test_cancel_unknown_appointment() {
        let mut conn = setup_db();
        let err = cancel(&mut conn, "A", "2025-04-01", "10:00").unwrap_err();
        assert!(matches!(err, SchedulingError::NotFound));
    }

    #[test]
    fn test_cancelled_appointment_stays_in_store() {
        let mut conn = setup_db();
        book(&mut conn, &request("A")).unwrap();
        cancel(&mut conn, "A", "2025-04-01", "10:00").unwrap();

        let rows: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM appointments WHERE status = 'cancelled'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_reschedule_moves_the_slot() {
        let mut conn = setup_db();
        book(&mut conn, &request("A")).unwrap();

        let moved =
            reschedule(&mut conn, "A", "2025-04-01", "10:00", "2025-04-02", "11:00").unwrap();
        assert_eq!(moved.date, "2025-04-02");
        assert_eq!(moved.time, "11:00");

        assert!(queries::find_appointment(&conn, "A", "2025-04-01", "10:00")
            .unwrap()
            .is_none());
        assert!(queries::find_appointment(&conn, "A", "2025-04-02", "11:00")
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_reschedule_conflict_leaves_original_untouched() {
        let mut conn = setup_db();
        book(&mut conn, &request("A")).unwrap(); // d1 at 10:00
        book(&mut conn, &request("B")).unwrap(); // d2 at 10:00

        let mut later = request("C");
        later.appointment_time = "11:00".to_string();
        let booked = book(&mut conn, &later).unwrap();
        assert_eq!(booked.doctor_id, "d1"); // 11:00 is free for d1

        // moving C onto d1's taken 10:00 slot must fail and change nothing
        let err = reschedule(&mut conn, "C", "2025-04-01", "11:00", "2025-04-01", "10:00")
            .unwrap_err();
        assert!(matches!(err, SchedulingError::SlotConflict));
        assert!(queries::find_appointment(&conn, "C", "2025-04-01", "11:00")
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_reschedule_to_same_slot_is_a_noop() {
        let mut conn = setup_db();
        book(&mut conn, &request("A")).unwrap();
        let moved =
            reschedule(&mut conn, "A", "2025-04-01", "10:00", "2025-04-01", "10:00").unwrap();
        assert_eq!(moved.date, "2025-04-01");
    }

    #[test]
    fn test_reschedule_unknown_appointment() {
        let mut conn = setup_db();
        let err = reschedule(&mut conn, "A", "2025-04-01", "10:00", "2025-04-02", "11:00")
            .unwrap_err();
        assert!(matches!(err, SchedulingError::NotFound));
    }

    #[test]
    fn test_booking_request_from_fields_rejects_missing() {
        let fields = FieldMap::new();
        let err = BookingRequest::from_fields(&fields).unwrap_err();
        assert!(matches!(err, SchedulingError::Validation(_)));
    }

    #[test]
    fn test_booking_request_from_fields_parses_age() {
        let mut fields = FieldMap::new();
        for (k, v) in [
            ("name", "A"),
            ("age", "34"),
            ("gender", "F"),
            ("contact_number", "+15551110000"),
            ("email", "a@example.com"),
            ("department", "Cardiology"),
            ("appointment_date", "2025-04-01"),
            ("appointment_time", "10:00"),
        ] {
            fields.insert(k.to_string(), serde_json::Value::String(v.to_string()));
        }
        let request = BookingRequest::from_fields(&fields).unwrap();
        assert_eq!(request.age, 34);

        fields.insert(
            "age".to_string(),
            serde_json::Value::String("old enough".to_string()),
        );
        assert!(BookingRequest::from_fields(&fields).is_err());
    }
}
