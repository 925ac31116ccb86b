//! Loads doctor reference data into the database from a JSON file:
//!
//! ```text
//! cargo run --bin seed_doctors -- doctors.json
//! ```
//!
//! The file is an array of `{doctor_id, name, specialization}` objects.
//! Existing doctor ids are left alone.

use anyhow::Context;

use clinicbook::config::AppConfig;
use clinicbook::db::{self, queries};
use clinicbook::models::Doctor;

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().init();

    let path = std::env::args()
        .nth(1)
        .context("usage: seed_doctors <doctors.json>")?;

    let config = AppConfig::from_env();
    let conn = db::init_db(&config.database_url)?;

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {path}"))?;
    let doctors: Vec<Doctor> =
        serde_json::from_str(&raw).context("doctors file must be a JSON array of doctors")?;

    let mut inserted = 0usize;
    for doctor in &doctors {
        match queries::insert_doctor(&conn, doctor) {
            Ok(()) => inserted += 1,
            Err(e) => {
                tracing::warn!(doctor = %doctor.doctor_id, error = %e, "skipping doctor");
            }
        }
    }

    tracing::info!(inserted, total = doctors.len(), "doctor seed complete");
    Ok(())
}
