use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{
    Appointment, AppointmentStatus, AppointmentView, BookingIntent, Doctor, FieldMap, Patient,
    PendingRequest, Session,
};

// ── Sessions ──

pub fn get_session(conn: &Connection, session_id: &str) -> anyhow::Result<Option<Session>> {
    let now = Utc::now().naive_utc().format("%Y-%m-%d %H:%M:%S").to_string();
    let result = conn.query_row(
        "SELECT session_id, intent, fields, last_activity, expires_at
         FROM sessions WHERE session_id = ?1 AND expires_at > ?2",
        params![session_id, now],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        },
    );

    match result {
        Ok((id, intent_str, fields_json, last_activity_str, expires_at_str)) => {
            let intent = match BookingIntent::parse(&intent_str) {
                Some(intent) => intent,
                None => {
                    tracing::warn!(session = %id, intent = %intent_str, "discarding session with unknown intent");
                    return Ok(None);
                }
            };
            let fields: FieldMap = serde_json::from_str(&fields_json).unwrap_or_default();
            let last_activity =
                NaiveDateTime::parse_from_str(&last_activity_str, "%Y-%m-%d %H:%M:%S")
                    .unwrap_or_else(|_| Utc::now().naive_utc());
            let expires_at = NaiveDateTime::parse_from_str(&expires_at_str, "%Y-%m-%d %H:%M:%S")
                .unwrap_or_else(|_| Utc::now().naive_utc());

            Ok(Some(Session {
                id,
                request: PendingRequest { intent, fields },
                last_activity,
                expires_at,
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn save_session(conn: &Connection, session: &Session) -> anyhow::Result<()> {
    let fields_json = serde_json::to_string(&session.request.fields)?;
    let last_activity = session.last_activity.format("%Y-%m-%d %H:%M:%S").to_string();
    let expires_at = session.expires_at.format("%Y-%m-%d %H:%M:%S").to_string();

    conn.execute(
        "INSERT INTO sessions (session_id, intent, fields, last_activity, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(session_id) DO UPDATE SET
           intent = excluded.intent,
           fields = excluded.fields,
           last_activity = excluded.last_activity,
           expires_at = excluded.expires_at",
        params![
            session.id,
            session.request.intent.as_str(),
            fields_json,
            last_activity,
            expires_at,
        ],
    )?;
    Ok(())
}

pub fn delete_session(conn: &Connection, session_id: &str) -> anyhow::Result<()> {
    conn.execute("DELETE FROM sessions WHERE session_id = ?1", params![session_id])?;
    Ok(())
}

pub fn expire_old_sessions(conn: &Connection) -> anyhow::Result<usize> {
    let now = Utc::now().naive_utc().format("%Y-%m-%d %H:%M:%S").to_string();
    let count = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])?;
    Ok(count)
}

// ── Patients ──

pub fn insert_patient(conn: &Connection, patient: &Patient) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO patients (patient_id, name, age, gender, contact_number, email, department)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            patient.patient_id,
            patient.name,
            patient.age,
            patient.gender,
            patient.contact_number,
            patient.email,
            patient.department,
        ],
    )?;
    Ok(())
}

// ── Doctors ──

pub fn insert_doctor(conn: &Connection, doctor: &Doctor) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO doctors (doctor_id, name, specialization) VALUES (?1, ?2, ?3)",
        params![doctor.doctor_id, doctor.name, doctor.specialization],
    )?;
    Ok(())
}

/// Candidates for a booking, in ascending doctor_id order. The order is
/// the tie-break: the first free candidate wins.
pub fn doctors_by_specialization(
    conn: &Connection,
    specialization: &str,
) -> anyhow::Result<Vec<Doctor>> {
    let mut stmt = conn.prepare(
        "SELECT doctor_id, name, specialization FROM doctors
         WHERE specialization = ?1 ORDER BY doctor_id ASC",
    )?;

    let rows = stmt.query_map(params![specialization], |row| {
        Ok(Doctor {
            doctor_id: row.get(0)?,
            name: row.get(1)?,
            specialization: row.get(2)?,
        })
    })?;

    let mut doctors = vec![];
    for row in rows {
        doctors.push(row?);
    }
    Ok(doctors)
}

pub fn count_doctors(conn: &Connection) -> anyhow::Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM doctors", [], |row| row.get(0))?;
    Ok(count)
}

// ── Appointments ──

pub fn insert_appointment(conn: &Connection, appointment: &Appointment) -> anyhow::Result<()> {
    let created_at = appointment.created_at.format("%Y-%m-%d %H:%M:%S").to_string();
    let updated_at = appointment.updated_at.format("%Y-%m-%d %H:%M:%S").to_string();

    conn.execute(
        "INSERT INTO appointments (appointment_id, patient_id, doctor_id, department, date, time, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            appointment.appointment_id,
            appointment.patient_id,
            appointment.doctor_id,
            appointment.department,
            appointment.date,
            appointment.time,
            appointment.status.as_str(),
            created_at,
            updated_at,
        ],
    )?;
    Ok(())
}

/// Whether a doctor already holds a non-cancelled appointment at the slot.
/// Cancelled rows never count: cancellation frees the slot.
pub fn query_conflicting_appointment(
    conn: &Connection,
    doctor_id: &str,
    date: &str,
    time: &str,
    exclude_appointment: Option<&str>,
) -> anyhow::Result<Option<String>> {
    let result = conn.query_row(
        "SELECT appointment_id FROM appointments
         WHERE doctor_id = ?1 AND date = ?2 AND time = ?3
           AND status != 'cancelled'
           AND appointment_id != COALESCE(?4, '')",
        params![doctor_id, date, time, exclude_appointment],
        |row| row.get::<_, String>(0),
    );

    match result {
        Ok(id) => Ok(Some(id)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// The scheduled appointment for a patient name at a given slot. Names are
/// not unique; the most recently created match wins.
pub fn find_appointment(
    conn: &Connection,
    patient_name: &str,
    date: &str,
    time: &str,
) -> anyhow::Result<Option<Appointment>> {
    let result = conn.query_row(
        "SELECT a.appointment_id, a.patient_id, a.doctor_id, a.department, a.date, a.time, a.status, a.created_at, a.updated_at
         FROM appointments a
         JOIN patients p ON p.patient_id = a.patient_id
         WHERE p.name = ?1 AND a.date = ?2 AND a.time = ?3 AND a.status = 'scheduled'
         ORDER BY a.created_at DESC LIMIT 1",
        params![patient_name, date, time],
        |row| Ok(parse_appointment_row(row)),
    );

    match result {
        Ok(appointment) => Ok(Some(appointment?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_appointment_slot(
    conn: &Connection,
    appointment_id: &str,
    date: &str,
    time: &str,
) -> anyhow::Result<bool> {
    let now = Utc::now().naive_utc().format("%Y-%m-%d %H:%M:%S").to_string();
    let count = conn.execute(
        "UPDATE appointments SET date = ?1, time = ?2, updated_at = ?3 WHERE appointment_id = ?4",
        params![date, time, now, appointment_id],
    )?;
    Ok(count > 0)
}

pub fn update_appointment_status(
    conn: &Connection,
    appointment_id: &str,
    status: AppointmentStatus,
) -> anyhow::Result<bool> {
    let now = Utc::now().naive_utc().format("%Y-%m-%d %H:%M:%S").to_string();
    let count = conn.execute(
        "UPDATE appointments SET status = ?1, updated_at = ?2 WHERE appointment_id = ?3",
        params![status.as_str(), now, appointment_id],
    )?;
    Ok(count > 0)
}

pub fn list_appointments(conn: &Connection) -> anyhow::Result<Vec<AppointmentView>> {
    let mut stmt = conn.prepare(
        "SELECT a.appointment_id, p.name, d.name, a.department, a.date, a.time, a.status
         FROM appointments a
         JOIN patients p ON p.patient_id = a.patient_id
         JOIN doctors d ON d.doctor_id = a.doctor_id
         ORDER BY a.date ASC, a.time ASC",
    )?;

    let rows = stmt.query_map([], |row| {
        let status_str: String = row.get(6)?;
        Ok(AppointmentView {
            appointment_id: row.get(0)?,
            patient_name: row.get(1)?,
            doctor_name: row.get(2)?,
            department: row.get(3)?,
            date: row.get(4)?,
            time: row.get(5)?,
            status: AppointmentStatus::parse(&status_str),
        })
    })?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row?);
    }
    Ok(appointments)
}

fn parse_appointment_row(row: &rusqlite::Row) -> anyhow::Result<Appointment> {
    let status_str: String = row.get(6)?;
    let created_at_str: String = row.get(7)?;
    let updated_at_str: String = row.get(8)?;

    let created_at = NaiveDateTime::parse_from_str(&created_at_str, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at = NaiveDateTime::parse_from_str(&updated_at_str, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Ok(Appointment {
        appointment_id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        department: row.get(3)?,
        date: row.get(4)?,
        time: row.get(5)?,
        status: AppointmentStatus::parse(&status_str),
        created_at,
        updated_at,
    })
}
