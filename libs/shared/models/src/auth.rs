use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Values must match the backend exactly (lowercase).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipoUsuario {
    Paciente,
    Doctor,
    Admin,
}

impl fmt::Display for TipoUsuario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TipoUsuario::Paciente => write!(f, "paciente"),
            TipoUsuario::Doctor => write!(f, "doctor"),
            TipoUsuario::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Genero {
    Masculino,
    Femenino,
    Otro,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usuario {
    pub id: i64,
    pub email: String,
    pub nombre: String,
    pub apellido: String,
    pub telefono: String,
    pub tipo_usuario: TipoUsuario,
    pub activo: bool,
    pub fecha_registro: NaiveDateTime,
}

impl Usuario {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.nombre, self.apellido)
    }
}

/// Account data sent on registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsuarioCreate {
    pub email: String,
    pub nombre: String,
    pub apellido: String,
    pub telefono: String,
    pub password: String,
    pub tipo_usuario: TipoUsuario,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsuarioLogin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    pub usuario: Usuario,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<i64>,
    pub email: Option<String>,
    pub tipo_usuario: Option<TipoUsuario>,
    pub iat: Option<i64>,
}
