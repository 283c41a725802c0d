use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use shared_models::auth::{TipoUsuario, UsuarioCreate};

use crate::models::{DoctorProfileCreate, DoctorRegistration, ProfessionalForm};
use crate::services::schedule::{deduplicate, find_duplicates};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistrationError {
    #[error("{field} debe tener al menos {min} caracteres")]
    TooShort { field: &'static str, min: usize },

    #[error("El correo electrónico no es válido")]
    InvalidEmail,

    #[error("Las contraseñas no coinciden")]
    PasswordMismatch,

    #[error("Por favor ingresa un costo de consulta válido")]
    InvalidCost,

    #[error("El campo {0} debe ser un número válido")]
    InvalidNumber(&'static str),

    #[error("El campo {0} es obligatorio")]
    Required(&'static str),

    #[error("Agrega al menos un horario de atención")]
    EmptySchedule,
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern")
    })
}

fn min_len(value: &str, field: &'static str, min: usize) -> Result<(), RegistrationError> {
    if value.trim().chars().count() < min {
        return Err(RegistrationError::TooShort { field, min });
    }
    Ok(())
}

fn required(value: &str, field: &'static str) -> Result<String, RegistrationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RegistrationError::Required(field));
    }
    Ok(trimmed.to_string())
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn optional_number(value: &str, field: &'static str) -> Result<Option<f64>, RegistrationError> {
    match optional(value) {
        Some(raw) => raw
            .parse::<f64>()
            .map(Some)
            .map_err(|_| RegistrationError::InvalidNumber(field)),
        None => Ok(None),
    }
}

impl ProfessionalForm {
    /// Checks the account step (names, email, phone, password).
    pub fn validate_account(&self) -> Result<(), RegistrationError> {
        min_len(&self.nombre, "El nombre", 2)?;
        min_len(&self.apellido, "El apellido", 2)?;
        if !email_regex().is_match(self.email.trim()) {
            return Err(RegistrationError::InvalidEmail);
        }
        min_len(&self.telefono, "El teléfono", 10)?;
        min_len(&self.password, "La contraseña", 8)?;
        if self.password != self.confirm_password {
            return Err(RegistrationError::PasswordMismatch);
        }
        Ok(())
    }

    /// Checks the professional step (license, office, cost, schedule).
    pub fn validate_professional(&self) -> Result<(), RegistrationError> {
        min_len(&self.cedula_profesional, "La cédula profesional", 5)?;
        min_len(&self.consultorio, "El consultorio", 3)?;

        match self.costo_consulta.trim().parse::<f64>() {
            Ok(cost) if cost > 0.0 => {}
            _ => return Err(RegistrationError::InvalidCost),
        }

        if self.horarios.is_empty() {
            return Err(RegistrationError::EmptySchedule);
        }
        Ok(())
    }

    /// Validates every step and builds the registration body. Duplicate
    /// schedule entries are dropped here, keeping the first occurrence.
    pub fn into_submission(self) -> Result<DoctorRegistration, RegistrationError> {
        self.validate_account()?;
        self.validate_professional()?;

        let duplicates = find_duplicates(&self.horarios);
        if !duplicates.is_empty() {
            warn!("Dropping {} duplicated schedule entries before submission", duplicates.len());
        }
        let horarios = deduplicate(&self.horarios);

        let costo_consulta = self
            .costo_consulta
            .trim()
            .parse::<f64>()
            .map_err(|_| RegistrationError::InvalidCost)?;
        let duracion_cita_minutos = required(&self.duracion_cita_minutos, "duracion_cita_minutos")?
            .parse::<i32>()
            .map_err(|_| RegistrationError::InvalidNumber("duracion_cita_minutos"))?;
        let anos_experiencia = required(&self.anos_experiencia, "anos_experiencia")?
            .parse::<i32>()
            .map_err(|_| RegistrationError::InvalidNumber("anos_experiencia"))?;

        let doctor = DoctorProfileCreate {
            especialidad: self.especialidad,
            cedula_profesional: self.cedula_profesional.trim().to_string(),
            consultorio: self.consultorio.trim().to_string(),
            direccion_consultorio: required(&self.direccion_consultorio, "direccion_consultorio")?,
            ciudad: required(&self.ciudad, "ciudad")?,
            estado: required(&self.estado, "estado")?,
            codigo_postal: required(&self.codigo_postal, "codigo_postal")?,
            anos_experiencia,
            duracion_cita_minutos,
            universidad: required(&self.universidad, "universidad")?,
            acepta_seguro: self.acepta_seguro,
            atiende_domicilio: self.atiende_domicilio,
            atiende_videollamada: self.atiende_videollamada,
            costo_consulta,
            biografia: optional(&self.biografia),
            foto_url: optional(&self.foto_url),
            latitud: optional_number(&self.latitud, "latitud")?,
            longitud: optional_number(&self.longitud, "longitud")?,
        };

        let usuario = UsuarioCreate {
            email: self.email.trim().to_string(),
            nombre: self.nombre.trim().to_string(),
            apellido: self.apellido.trim().to_string(),
            telefono: self.telefono.trim().to_string(),
            password: self.password,
            tipo_usuario: TipoUsuario::Doctor,
        };

        debug!("Doctor registration built with {} schedule entries", horarios.len());

        Ok(DoctorRegistration {
            usuario,
            doctor,
            horarios,
        })
    }
}
