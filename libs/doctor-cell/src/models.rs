use chrono::{NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use shared_models::auth::{TipoUsuario, Usuario, UsuarioCreate};

// ==============================================================================
// WEEKLY SCHEDULE MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayOfWeek {
    #[serde(rename = "LUNES")]
    Monday,
    #[serde(rename = "MARTES")]
    Tuesday,
    #[serde(rename = "MIERCOLES")]
    Wednesday,
    #[serde(rename = "JUEVES")]
    Thursday,
    #[serde(rename = "VIERNES")]
    Friday,
    #[serde(rename = "SABADO")]
    Saturday,
    #[serde(rename = "DOMINGO")]
    Sunday,
}

impl DayOfWeek {
    /// Fixed Monday -> Sunday order used for day assignment.
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub const WORKWEEK: [DayOfWeek; 5] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Lunes",
            DayOfWeek::Tuesday => "Martes",
            DayOfWeek::Wednesday => "Miércoles",
            DayOfWeek::Thursday => "Jueves",
            DayOfWeek::Friday => "Viernes",
            DayOfWeek::Saturday => "Sábado",
            DayOfWeek::Sunday => "Domingo",
        }
    }

    /// 0 = Monday .. 6 = Sunday, the numbering the backend echoes back.
    pub fn index(&self) -> u8 {
        match self {
            DayOfWeek::Monday => 0,
            DayOfWeek::Tuesday => 1,
            DayOfWeek::Wednesday => 2,
            DayOfWeek::Thursday => 3,
            DayOfWeek::Friday => 4,
            DayOfWeek::Saturday => 5,
            DayOfWeek::Sunday => 6,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

/// One weekly recurring availability window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub dia_semana: DayOfWeek,
    #[serde(with = "hh_mm")]
    pub hora_inicio: NaiveTime,
    #[serde(with = "hh_mm")]
    pub hora_fin: NaiveTime,
    pub activo: bool,
}

impl ScheduleEntry {
    pub fn new(dia_semana: DayOfWeek, hora_inicio: NaiveTime, hora_fin: NaiveTime) -> Self {
        Self {
            dia_semana,
            hora_inicio,
            hora_fin,
            activo: true,
        }
    }

    /// Identity used for duplicate detection; `activo` is ignored. Times
    /// compare at minute precision, as they are sent.
    pub fn slot_key(&self) -> (DayOfWeek, NaiveTime, NaiveTime) {
        (
            self.dia_semana,
            hh_mm::truncate(self.hora_inicio),
            hh_mm::truncate(self.hora_fin),
        )
    }
}

/// Wall-clock times travel as "HH:MM"; the backend may echo seconds.
pub mod hh_mm {
    use super::*;

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    /// Accepts "HH:MM" or "HH:MM:SS"; seconds are dropped.
    pub fn parse(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
        NaiveTime::parse_from_str(raw, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map(truncate)
    }

    pub fn truncate(time: NaiveTime) -> NaiveTime {
        NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
    }
}

/// Schedule row as stored by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorarioDoctorRecord {
    pub id: i64,
    pub doctor_id: i64,
    pub dia_semana: u8,
    #[serde(with = "hh_mm")]
    pub hora_inicio: NaiveTime,
    #[serde(with = "hh_mm")]
    pub hora_fin: NaiveTime,
    pub activo: bool,
}

impl HorarioDoctorRecord {
    pub fn to_entry(&self) -> Option<ScheduleEntry> {
        DayOfWeek::from_index(self.dia_semana).map(|dia_semana| ScheduleEntry {
            dia_semana,
            hora_inicio: self.hora_inicio,
            hora_fin: self.hora_fin,
            activo: self.activo,
        })
    }
}

// ==============================================================================
// DOCTOR MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Especialidad {
    MedicinaGeneral,
    Cardiologia,
    Dermatologia,
    Pediatria,
    Ginecologia,
    Traumatologia,
    Oftalmologia,
    Neurologia,
}

impl Especialidad {
    pub fn label(&self) -> &'static str {
        match self {
            Especialidad::MedicinaGeneral => "Medicina General",
            Especialidad::Cardiologia => "Cardiología",
            Especialidad::Dermatologia => "Dermatología",
            Especialidad::Pediatria => "Pediatría",
            Especialidad::Ginecologia => "Ginecología",
            Especialidad::Traumatologia => "Traumatología",
            Especialidad::Oftalmologia => "Oftalmología",
            Especialidad::Neurologia => "Neurología",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: i64,
    pub usuario_id: i64,
    pub especialidad: String,
    pub cedula_profesional: String,
    pub consultorio: String,
    pub direccion_consultorio: String,
    pub ciudad: String,
    pub estado: String,
    pub codigo_postal: String,
    pub latitud: Option<f64>,
    pub longitud: Option<f64>,
    pub horario_atencion: Option<String>,
    pub costo_consulta: f64,
    pub duracion_cita_minutos: i32,
    pub anos_experiencia: Option<i32>,
    pub universidad: Option<String>,
    pub biografia: Option<String>,
    pub foto_url: Option<String>,
    pub acepta_seguro: bool,
    pub atiende_domicilio: bool,
    pub atiende_videollamada: bool,
    pub calificacion_promedio: f64,
    pub total_valoraciones: i32,
    pub fecha_creacion: NaiveDateTime,
    pub usuario: Usuario,
    #[serde(default)]
    pub horarios: Vec<HorarioDoctorRecord>,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        self.usuario.full_name()
    }

    pub fn weekly_schedule(&self) -> Vec<ScheduleEntry> {
        self.horarios.iter().filter_map(HorarioDoctorRecord::to_entry).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorCercano {
    pub id: i64,
    pub nombre_completo: String,
    pub especialidad: String,
    pub consultorio: String,
    pub direccion: String,
    pub ciudad: String,
    pub telefono: String,
    pub costo_consulta: f64,
    pub calificacion_promedio: f64,
    pub total_valoraciones: i32,
    pub acepta_seguro: bool,
    pub atiende_videollamada: bool,
    pub distancia_km: f64,
    pub tiempo_estimado_minutos: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopularSpecialty {
    pub especialidad: String,
    pub total_doctores: i64,
}

/// Search filters; unset fields are left out of the query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub especialidad: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ciudad: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precio_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precio_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calificacion_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acepta_seguro: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atiende_videollamada: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atiende_domicilio: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordenar_por: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orden: Option<String>,
}

// ==============================================================================
// REGISTRATION MODELS
// ==============================================================================

/// Raw professional registration form, as typed by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfessionalForm {
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    pub telefono: String,
    pub password: String,
    pub confirm_password: String,

    pub especialidad: Especialidad,
    pub cedula_profesional: String,
    pub consultorio: String,
    pub costo_consulta: String,
    pub duracion_cita_minutos: String,
    pub horarios: Vec<ScheduleEntry>,

    pub direccion_consultorio: String,
    pub ciudad: String,
    pub estado: String,
    pub codigo_postal: String,
    pub anos_experiencia: String,
    pub universidad: String,
    pub biografia: String,
    pub foto_url: String,

    pub acepta_seguro: bool,
    pub atiende_domicilio: bool,
    pub atiende_videollamada: bool,

    pub latitud: String,
    pub longitud: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorProfileCreate {
    pub especialidad: Especialidad,
    pub cedula_profesional: String,
    pub consultorio: String,
    pub direccion_consultorio: String,
    pub ciudad: String,
    pub estado: String,
    pub codigo_postal: String,
    pub anos_experiencia: i32,
    pub duracion_cita_minutos: i32,
    pub universidad: String,
    pub acepta_seguro: bool,
    pub atiende_domicilio: bool,
    pub atiende_videollamada: bool,
    pub costo_consulta: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biografia: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foto_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitud: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitud: Option<f64>,
}

/// Body of `POST /api/registro/doctor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorRegistration {
    pub usuario: UsuarioCreate,
    pub doctor: DoctorProfileCreate,
    pub horarios: Vec<ScheduleEntry>,
}

impl DoctorRegistration {
    pub fn is_doctor_account(&self) -> bool {
        self.usuario.tipo_usuario == TipoUsuario::Doctor
    }
}

// ==============================================================================
// LOCATION MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitud: f64,
    pub longitud: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub city: String,
    pub region: String,
    pub country: String,
    pub is_detected: bool,
}

impl UserLocation {
    pub fn undetected() -> Self {
        Self {
            city: "No detectada".to_string(),
            region: String::new(),
            country: String::new(),
            is_detected: false,
        }
    }
}
