use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Failures talking to the backend. `Display` is the message shown to the user.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("El servidor está tardando demasiado en responder. Intenta nuevamente.")]
    Timeout,

    #[error("No se pudo conectar con el servidor. Verifica tu conexión.")]
    Network(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Demasiadas solicitudes. Por favor, espera un momento.")]
    RateLimited,

    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Backend { status: u16, message: String },

    #[error("Respuesta inválida del servidor: {0}")]
    Decode(String),

    #[error("Cliente HTTP no disponible: {0}")]
    Client(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::RateLimited => Some(429),
            ApiError::Validation(_) => Some(422),
            ApiError::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if err.is_builder() {
            ApiError::Client(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<Detail>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Detail {
    Message(String),
    Errors(Vec<ValidationErrorDetail>),
    Other(Value),
}

#[derive(Debug, Deserialize)]
struct ValidationErrorDetail {
    #[serde(default)]
    loc: Vec<Value>,
    msg: String,
}

impl ValidationErrorDetail {
    fn field(&self) -> String {
        match self.loc.last() {
            Some(Value::String(field)) => field.clone(),
            Some(other) => other.to_string(),
            None => "campo".to_string(),
        }
    }
}

/// Maps a non-success response to an `ApiError`, preferring the backend's
/// `detail` over status-based fallbacks.
pub fn error_from_response(status: StatusCode, body: &str) -> ApiError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.detail);

    match status.as_u16() {
        401 => {
            let message = match detail {
                Some(Detail::Message(message)) => message,
                _ => "Sesión expirada o no autorizada".to_string(),
            };
            return ApiError::Unauthorized(message);
        }
        429 => return ApiError::RateLimited,
        _ => {}
    }

    match detail {
        Some(Detail::Errors(errors)) if !errors.is_empty() => {
            let messages = errors
                .iter()
                .map(|err| format!("{}: {}", err.field(), err.msg))
                .collect::<Vec<_>>()
                .join(", ");
            ApiError::Validation(messages)
        }
        Some(Detail::Message(message)) => ApiError::Backend {
            status: status.as_u16(),
            message,
        },
        _ => ApiError::Backend {
            status: status.as_u16(),
            message: fallback_message(status),
        },
    }
}

fn fallback_message(status: StatusCode) -> String {
    match status.as_u16() {
        404 => "Recurso no encontrado".to_string(),
        500 => "Error interno del servidor".to_string(),
        502 | 503 | 504 => "Servicio temporalmente no disponible".to_string(),
        code => format!("Error del servidor ({})", code),
    }
}
