pub mod doctor;
pub mod location;
pub mod registration;
pub mod schedule;

pub use doctor::DoctorService;
pub use location::LocationService;
pub use registration::RegistrationError;
pub use schedule::{ScheduleEditor, ScheduleError, ScheduleField, TimeBound};
