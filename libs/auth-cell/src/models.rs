use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use doctor_cell::services::RegistrationError;
use shared_api_client::ApiError;
use shared_models::auth::{Genero, UsuarioCreate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacienteBase {
    pub fecha_nacimiento: NaiveDate,
    pub genero: Genero,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direccion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numero_seguro: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alergias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo_sangre: Option<String>,
}

/// Body of `POST /api/registro/paciente`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRegistration {
    pub usuario: UsuarioCreate,
    pub paciente: PacienteBase,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("El registro de {0} no corresponde al tipo de usuario")]
    WrongAccountType(&'static str),
}
