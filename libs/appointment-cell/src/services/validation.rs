// libs/appointment-cell/src/services/validation.rs
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::models::{
    AppointmentError, AppointmentForm, AppointmentRequest, ValidationOutcome, MIN_REASON_CHARS,
};

/// Source of "now" for the future-time check, in local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always returns the instant it was built with.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

fn parse_time(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(raw, "%H:%M").or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
}

fn optional_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn reason_is_long_enough(reason: &str) -> bool {
    reason.chars().count() >= MIN_REASON_CHARS
}

pub struct AppointmentValidator;

impl AppointmentValidator {
    /// Fail-fast checks in order: date and time present, reason length,
    /// then the combined instant strictly after `now`.
    pub fn validate(
        form: &AppointmentForm,
        now: NaiveDateTime,
    ) -> Result<AppointmentRequest, AppointmentError> {
        let fecha = form.fecha.trim();
        let hora = form.hora.trim();
        if fecha.is_empty() || hora.is_empty() {
            return Err(AppointmentError::MissingDateTime);
        }

        if !reason_is_long_enough(&form.motivo) {
            return Err(AppointmentError::ReasonTooShort { min: MIN_REASON_CHARS });
        }

        let date = NaiveDate::parse_from_str(fecha, "%Y-%m-%d")
            .map_err(|_| AppointmentError::InvalidDateTime(fecha.to_string()))?;
        let time = parse_time(hora).map_err(|_| AppointmentError::InvalidDateTime(hora.to_string()))?;
        let fecha_hora = date.and_time(time);

        if fecha_hora <= now {
            debug!("Rejected appointment at {} (now {})", fecha_hora, now);
            return Err(AppointmentError::NotInFuture);
        }

        Ok(AppointmentRequest {
            doctor_id: form.doctor_id,
            fecha_hora,
            motivo: form.motivo.clone(),
            sintomas: optional_text(&form.sintomas),
            notas_paciente: optional_text(&form.notas_paciente),
            es_videollamada: form.es_videollamada,
        })
    }

    pub fn validate_with(
        form: &AppointmentForm,
        clock: &dyn Clock,
    ) -> Result<AppointmentRequest, AppointmentError> {
        Self::validate(form, clock.now())
    }

    pub fn check(form: &AppointmentForm, now: NaiveDateTime) -> ValidationOutcome {
        match Self::validate(form, now) {
            Ok(_) => ValidationOutcome::ok(),
            Err(e) => ValidationOutcome::failed(&e),
        }
    }
}

/// Cancellation reasons follow the same rule as booking reasons: counted
/// as typed, without trimming.
pub fn validate_cancellation(reason: &str) -> Result<String, AppointmentError> {
    if !reason_is_long_enough(reason) {
        return Err(AppointmentError::CancellationReasonTooShort { min: MIN_REASON_CHARS });
    }
    Ok(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_time(parse_time(time).unwrap())
    }

    fn form(fecha: &str, hora: &str, motivo: &str) -> AppointmentForm {
        AppointmentForm {
            doctor_id: 4,
            fecha: fecha.to_string(),
            hora: hora.to_string(),
            motivo: motivo.to_string(),
            ..AppointmentForm::default()
        }
    }

    #[test]
    fn test_valid_form_builds_request() {
        let now = at("2030-05-19", "12:00");
        let mut input = form("2030-05-20", "10:30", "Dolor de cabeza persistente");
        input.sintomas = "   ".to_string();
        input.notas_paciente = "Traigo estudios".to_string();

        let request = AppointmentValidator::validate(&input, now).unwrap();

        assert_eq!(request.fecha_hora, at("2030-05-20", "10:30"));
        assert_eq!(request.sintomas, None);
        assert_eq!(request.notas_paciente.as_deref(), Some("Traigo estudios"));
    }

    #[test]
    fn test_missing_date_or_time_is_reported_first() {
        let now = at("2030-05-19", "12:00");

        let result = AppointmentValidator::validate(&form("", "10:30", "corto"), now);
        assert_matches!(result, Err(AppointmentError::MissingDateTime));

        let result = AppointmentValidator::validate(&form("2030-05-20", "", "corto"), now);
        assert_matches!(result, Err(AppointmentError::MissingDateTime));
    }

    #[test]
    fn test_reason_checked_before_future_time() {
        let now = at("2030-05-19", "12:00");
        let result = AppointmentValidator::validate(&form("2020-01-01", "08:00", "corto"), now);

        assert_matches!(result, Err(AppointmentError::ReasonTooShort { min: 10 }));
    }

    #[test]
    fn test_reason_length_boundary() {
        let now = at("2030-05-19", "12:00");

        let ten = "abcdefghij";
        assert!(AppointmentValidator::validate(&form("2030-05-20", "10:30", ten), now).is_ok());

        let nine = "abcdefghi";
        assert_matches!(
            AppointmentValidator::validate(&form("2030-05-20", "10:30", nine), now),
            Err(AppointmentError::ReasonTooShort { .. })
        );
    }

    #[test]
    fn test_reason_length_counts_characters() {
        let now = at("2030-05-19", "12:00");
        // 10 characters, more than 10 bytes
        let accented = "ñáéíóúñáéí";

        assert!(AppointmentValidator::validate(&form("2030-05-20", "10:30", accented), now).is_ok());
    }

    #[test]
    fn test_future_time_boundary_is_strict() {
        let slot = at("2030-05-20", "10:30");
        let input = form("2030-05-20", "10:30", "Dolor de cabeza persistente");

        assert_matches!(
            AppointmentValidator::validate(&input, slot),
            Err(AppointmentError::NotInFuture)
        );

        let just_before = slot - Duration::milliseconds(1);
        assert!(AppointmentValidator::validate(&input, just_before).is_ok());
    }

    #[test]
    fn test_unparseable_date_is_rejected() {
        let now = at("2030-05-19", "12:00");
        let result = AppointmentValidator::validate(&form("20/05/2030", "10:30", "Dolor de cabeza persistente"), now);

        assert_matches!(result, Err(AppointmentError::InvalidDateTime(ref raw)) if raw == "20/05/2030");
    }

    #[test]
    fn test_check_mirrors_first_error_message() {
        let now = at("2030-05-19", "12:00");

        let outcome = AppointmentValidator::check(&form("2030-05-18", "10:30", "Dolor de cabeza persistente"), now);
        assert!(!outcome.valid);
        assert_eq!(outcome.error.as_deref(), Some("La fecha y hora deben ser en el futuro"));

        let outcome = AppointmentValidator::check(&form("2030-05-20", "10:30", "Dolor de cabeza persistente"), now);
        assert_eq!(outcome, ValidationOutcome::ok());
    }

    #[test]
    fn test_validate_with_fixed_clock() {
        let clock = FixedClock(at("2030-05-21", "00:00"));
        let result = AppointmentValidator::validate_with(&form("2030-05-20", "10:30", "Dolor de cabeza persistente"), &clock);

        assert_matches!(result, Err(AppointmentError::NotInFuture));
    }

    #[test]
    fn test_cancellation_reason() {
        assert_eq!(validate_cancellation("Cambio urg").unwrap(), "Cambio urg");
        assert_matches!(
            validate_cancellation("No puedo"),
            Err(AppointmentError::CancellationReasonTooShort { min: 10 })
        );
    }

    #[test]
    fn test_cancellation_reason_counts_surrounding_spaces() {
        assert_eq!(validate_cancellation("   No voy  ").unwrap(), "   No voy  ");
        assert_matches!(
            validate_cancellation(" No voy "),
            Err(AppointmentError::CancellationReasonTooShort { min: 10 })
        );
    }
}
