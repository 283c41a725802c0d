use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;

use shared_config::AppConfig;
use shared_models::auth::TipoUsuario;

pub struct TestConfig {
    pub api_url: String,
    pub request_timeout_secs: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 5,
        }
    }
}

impl TestConfig {
    pub fn with_api_url(api_url: &str) -> Self {
        Self {
            api_url: api_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            api_url: self.api_url.clone(),
            request_timeout_secs: self.request_timeout_secs,
            health_timeout_secs: 2,
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: i64,
    pub email: String,
    pub tipo_usuario: TipoUsuario,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: 1,
            email: "test@example.com".to_string(),
            tipo_usuario: TipoUsuario::Paciente,
        }
    }
}

impl TestUser {
    pub fn new(id: i64, email: &str, tipo_usuario: TipoUsuario) -> Self {
        Self {
            id,
            email: email.to_string(),
            tipo_usuario,
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(7, email, TipoUsuario::Doctor)
    }

    pub fn patient(email: &str) -> Self {
        Self::new(3, email, TipoUsuario::Paciente)
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id.to_string(),
            "email": user.email,
            "tipo_usuario": user.tipo_usuario,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }
}

pub struct MockApiResponses;

impl MockApiResponses {
    pub fn usuario_response(user: &TestUser) -> serde_json::Value {
        json!({
            "id": user.id,
            "email": user.email,
            "nombre": "Ana",
            "apellido": "López",
            "telefono": "5512345678",
            "tipo_usuario": user.tipo_usuario,
            "activo": true,
            "fecha_registro": "2024-01-01T00:00:00"
        })
    }

    pub fn token_response(user: &TestUser, access_token: &str) -> serde_json::Value {
        json!({
            "access_token": access_token,
            "token_type": "bearer",
            "usuario": Self::usuario_response(user)
        })
    }

    pub fn doctor_response(doctor_id: i64) -> serde_json::Value {
        json!({
            "id": doctor_id,
            "usuario_id": 7,
            "especialidad": "cardiologia",
            "cedula_profesional": "12345678",
            "consultorio": "Consultorio 4",
            "direccion_consultorio": "Av. Reforma 100",
            "ciudad": "CDMX",
            "estado": "CDMX",
            "codigo_postal": "06600",
            "costo_consulta": 800.0,
            "duracion_cita_minutos": 30,
            "anos_experiencia": 12,
            "acepta_seguro": true,
            "atiende_domicilio": false,
            "atiende_videollamada": true,
            "calificacion_promedio": 4.7,
            "total_valoraciones": 31,
            "fecha_creacion": "2024-01-01T00:00:00",
            "usuario": Self::usuario_response(&TestUser::doctor("doctor@example.com")),
            "horarios": [
                {
                    "id": 1,
                    "doctor_id": doctor_id,
                    "dia_semana": 0,
                    "hora_inicio": "09:00:00",
                    "hora_fin": "18:00:00",
                    "activo": true
                }
            ]
        })
    }

    pub fn cita_response(cita_id: i64, doctor_id: i64) -> serde_json::Value {
        json!({
            "id": cita_id,
            "paciente_id": 3,
            "doctor_id": doctor_id,
            "fecha_hora": "2030-05-20T10:30:00",
            "duracion_minutos": 30,
            "motivo": "Dolor de cabeza persistente",
            "sintomas": null,
            "notas_paciente": null,
            "es_videollamada": false,
            "estado": "pendiente",
            "costo": 800.0,
            "fecha_creacion": "2024-01-01T00:00:00"
        })
    }

    pub fn validation_error_response() -> serde_json::Value {
        json!({
            "detail": [
                { "loc": ["body", "motivo"], "msg": "field required", "type": "value_error.missing" },
                { "loc": ["body", "fecha_hora"], "msg": "invalid datetime format", "type": "value_error" }
            ]
        })
    }

    pub fn detail_response(message: &str) -> serde_json::Value {
        json!({ "detail": message })
    }
}
