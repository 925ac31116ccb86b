use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: String,
    pub name: String,
    pub age: i64,
    pub gender: String,
    pub contact_number: String,
    pub email: String,
    pub department: String,
}
