use serde::{Deserialize, Serialize};

/// Reference data. Rows are seeded out of band; the booking core only
/// ever reads them, in ascending doctor_id order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub doctor_id: String,
    pub name: String,
    pub specialization: String,
}
