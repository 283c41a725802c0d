// libs/notification-cell/src/models.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::error::AppError;

pub const DEFAULT_ICON: &str = "/android-chrome-192x192.png";
pub const DEFAULT_URL: &str = "/";
pub const DEFAULT_TAG: &str = "medilink-notification";
pub const DEFAULT_SUBSCRIPTION_KEY: &str = "default";

// ==============================================================================
// SUBSCRIPTION MODELS
// ==============================================================================

/// Browser push subscription as produced by `PushSubscription.toJSON()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub endpoint: String,
    #[serde(rename = "expirationTime", default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<i64>,
    pub keys: SubscriptionKeys,
}

/// Both keys are URL-safe base64: `p256dh` is the 65-byte uncompressed
/// P-256 point, `auth` the 16-byte secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

// ==============================================================================
// NOTIFICATION MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_interaction: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl NotificationPayload {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Fills unset display fields with the defaults the service worker expects.
    pub fn to_message(&self) -> PushMessage {
        PushMessage {
            title: self.title.clone(),
            body: self.body.clone(),
            icon: self.icon.clone().unwrap_or_else(|| DEFAULT_ICON.to_string()),
            url: self.url.clone().unwrap_or_else(|| DEFAULT_URL.to_string()),
            tag: self.tag.clone().unwrap_or_else(|| DEFAULT_TAG.to_string()),
            require_interaction: self.require_interaction.unwrap_or(false),
        }
    }
}

/// JSON document delivered to the service worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub url: String,
    pub tag: String,
    pub require_interaction: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentReminder {
    pub doctor_name: String,
    pub date: String,
    pub time: String,
    pub specialty: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAlert {
    #[serde(rename = "type")]
    pub alert_type: String,
    pub message: String,
    pub priority: AlertPriority,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkReport {
    pub successful: usize,
    pub failed: usize,
    pub total: usize,
}

impl BulkReport {
    pub fn summary(&self) -> String {
        format!("Enviadas {} notificaciones, {} fallidas", self.successful, self.failed)
    }
}

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub subscription: PushSubscription,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkNotificationRequest {
    pub user_ids: Vec<String>,
    pub payload: NotificationPayload,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentReminderRequest {
    pub user_id: String,
    pub appointment: AppointmentReminder,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthAlertRequest {
    pub user_id: String,
    pub alert: HealthAlert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BulkReport>,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            details: None,
        }
    }

    pub fn bulk(report: BulkReport) -> Self {
        Self {
            details: Some(report),
            ..Self::ok(report.summary())
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum PushError {
    #[error("No hay suscripción disponible")]
    NoSubscription,

    #[error("Notificaciones push no configuradas")]
    NotConfigured,

    #[error("Suscripción inválida: {0}")]
    InvalidSubscription(String),

    #[error("Clave VAPID inválida: {0}")]
    InvalidKey(String),

    #[error("El contenido de la notificación es demasiado grande ({0} bytes)")]
    PayloadTooLarge(usize),

    #[error("Error de cifrado: {0}")]
    Crypto(String),

    #[error("La suscripción ya no es válida (status {0})")]
    SubscriptionGone(u16),

    #[error("El servicio push respondió {status}: {message}")]
    Delivery { status: u16, message: String },

    #[error("Error al enviar notificación: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for PushError {
    fn from(err: reqwest::Error) -> Self {
        PushError::Transport(err.to_string())
    }
}

impl From<PushError> for AppError {
    fn from(err: PushError) -> Self {
        match err {
            PushError::NoSubscription | PushError::SubscriptionGone(_) => {
                AppError::NotFound(err.to_string())
            }
            PushError::InvalidSubscription(_) | PushError::PayloadTooLarge(_) => {
                AppError::BadRequest(err.to_string())
            }
            PushError::NotConfigured => AppError::Unavailable(err.to_string()),
            PushError::InvalidKey(_) | PushError::Crypto(_) => AppError::Internal(err.to_string()),
            PushError::Delivery { .. } | PushError::Transport(_) => {
                AppError::ExternalService("Error al enviar notificación".to_string())
            }
        }
    }
}
