pub mod booking;
pub mod validation;

pub use booking::CitasService;
pub use validation::{validate_cancellation, AppointmentValidator, Clock, FixedClock, SystemClock};
