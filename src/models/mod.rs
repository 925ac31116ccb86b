pub mod appointment;
pub mod doctor;
pub mod intent;
pub mod patient;
pub mod request;

pub use appointment::{Appointment, AppointmentStatus, AppointmentView, BookedAppointment};
pub use doctor::Doctor;
pub use intent::{BookingIntent, ExtractedIntent, IntentResolution};
pub use patient::Patient;
pub use request::{FieldMap, PendingRequest, Session};
