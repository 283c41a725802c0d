// libs/appointment-cell/src/models.rs
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use shared_api_client::ApiError;

pub const MIN_REASON_CHARS: usize = 10;

// ==============================================================================
// BOOKING FORM MODELS
// ==============================================================================

/// Raw values captured by the booking dialog. `fecha` is `YYYY-MM-DD`,
/// `hora` is `HH:MM`; both are local wall-clock values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppointmentForm {
    pub doctor_id: i64,
    pub fecha: String,
    pub hora: String,
    pub motivo: String,
    #[serde(default)]
    pub sintomas: String,
    #[serde(default)]
    pub notas_paciente: String,
    #[serde(default)]
    pub es_videollamada: bool,
}

/// Body of `POST /api/citas/`, produced only by a successful validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentRequest {
    pub doctor_id: i64,
    #[serde(with = "wall_clock")]
    pub fecha_hora: NaiveDateTime,
    pub motivo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sintomas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notas_paciente: Option<String>,
    pub es_videollamada: bool,
}

/// `YYYY-MM-DDTHH:MM:SS` without offset, the format the backend expects.
pub mod wall_clock {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f"))
            .map_err(serde::de::Error::custom)
    }
}

/// Result shape of a validation pass: `valid` plus the first failure message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationOutcome {
    pub fn ok() -> Self {
        Self { valid: true, error: None }
    }

    pub fn failed(error: &AppointmentError) -> Self {
        Self {
            valid: false,
            error: Some(error.to_string()),
        }
    }
}

// ==============================================================================
// APPOINTMENT RECORDS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstadoCita {
    Pendiente,
    Confirmada,
    Completada,
    Cancelada,
}

impl EstadoCita {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoCita::Pendiente => "pendiente",
            EstadoCita::Confirmada => "confirmada",
            EstadoCita::Completada => "completada",
            EstadoCita::Cancelada => "cancelada",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EstadoCita::Pendiente => "Pendiente",
            EstadoCita::Confirmada => "Confirmada",
            EstadoCita::Completada => "Completada",
            EstadoCita::Cancelada => "Cancelada",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, EstadoCita::Pendiente | EstadoCita::Confirmada)
    }

    pub fn can_cancel(&self) -> bool {
        self.is_active()
    }

    pub fn valid_transitions(&self) -> &'static [EstadoCita] {
        match self {
            EstadoCita::Pendiente => &[EstadoCita::Confirmada, EstadoCita::Cancelada],
            EstadoCita::Confirmada => &[EstadoCita::Completada, EstadoCita::Cancelada],
            // Terminal states
            EstadoCita::Completada | EstadoCita::Cancelada => &[],
        }
    }

    pub fn can_transition_to(&self, next: EstadoCita) -> bool {
        self.valid_transitions().contains(&next)
    }
}

impl fmt::Display for EstadoCita {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitaDoctor {
    pub id: i64,
    pub nombre: String,
    pub apellido: String,
    pub especialidad: String,
    pub consultorio: Option<String>,
    pub telefono: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cita {
    pub id: i64,
    pub paciente_id: i64,
    pub doctor_id: i64,
    #[serde(with = "wall_clock")]
    pub fecha_hora: NaiveDateTime,
    pub duracion_minutos: i32,
    pub motivo: String,
    pub sintomas: Option<String>,
    pub notas_paciente: Option<String>,
    pub notas_doctor: Option<String>,
    pub diagnostico: Option<String>,
    pub tratamiento: Option<String>,
    pub receta: Option<String>,
    pub es_videollamada: bool,
    pub url_videollamada: Option<String>,
    pub estado: EstadoCita,
    pub costo: Option<f64>,
    pub motivo_cancelacion: Option<String>,
    pub fecha_cancelacion: Option<String>,
    pub fecha_creacion: String,
    pub doctor: Option<CitaDoctor>,
}

impl Cita {
    pub fn end_time(&self) -> NaiveDateTime {
        self.fecha_hora + chrono::Duration::minutes(self.duracion_minutos as i64)
    }

    pub fn is_upcoming(&self, now: NaiveDateTime) -> bool {
        self.estado.is_active() && self.fecha_hora > now
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitaCancelar {
    pub motivo_cancelacion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelResponse {
    pub message: String,
    pub cita_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CitasEstadisticas {
    pub total: u32,
    pub pendientes: u32,
    pub confirmadas: u32,
    pub completadas: u32,
    pub canceladas: u32,
    pub proxima_cita: Option<String>,
}

/// Filters for `GET /api/citas/mis-citas`; unset fields stay out of the query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MisCitasQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado: Option<EstadoCita>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha_inicio: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha_fin: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Por favor selecciona fecha y hora")]
    MissingDateTime,

    #[error("Fecha u hora inválida: {0}")]
    InvalidDateTime(String),

    #[error("El motivo debe tener al menos {min} caracteres")]
    ReasonTooShort { min: usize },

    #[error("La fecha y hora deben ser en el futuro")]
    NotInFuture,

    #[error("El motivo de cancelación debe tener al menos {min} caracteres")]
    CancellationReasonTooShort { min: usize },

    #[error("La cita no puede cancelarse en estado {0}")]
    InvalidStatus(EstadoCita),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AppointmentError {
    /// Errors raised locally, before any request leaves the client.
    pub fn is_validation(&self) -> bool {
        !matches!(self, AppointmentError::Api(_))
    }
}
