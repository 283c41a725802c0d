// libs/notification-cell/src/services/notification.rs
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use shared_config::AppConfig;

use crate::models::{
    AlertPriority, AppointmentReminder, BulkReport, HealthAlert, NotificationPayload, PushError,
    PushSubscription,
};
use crate::services::registry::SubscriptionRegistry;
use crate::services::webpush::{PushSender, UnconfiguredSender, WebPushSender};

/// Server side of push notifications: keeps the registry and delivers
/// messages through a `PushSender`.
#[derive(Clone)]
pub struct NotificationService {
    registry: SubscriptionRegistry,
    sender: Arc<dyn PushSender>,
    public_key: String,
}

impl NotificationService {
    pub fn new(registry: SubscriptionRegistry, sender: Arc<dyn PushSender>, public_key: impl Into<String>) -> Self {
        Self {
            registry,
            sender,
            public_key: public_key.into(),
        }
    }

    /// Falls back to a sender that rejects every message when VAPID keys are
    /// missing or unusable, so subscriptions can still be recorded.
    pub fn from_config(config: &AppConfig) -> Self {
        let registry = SubscriptionRegistry::new();
        match WebPushSender::from_config(config) {
            Ok(sender) => {
                let public_key = sender.public_key().to_string();
                Self::new(registry, Arc::new(sender), public_key)
            }
            Err(e) => {
                warn!("Push delivery disabled: {}", e);
                Self::new(registry, Arc::new(UnconfiguredSender), config.vapid_public_key.clone())
            }
        }
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub async fn subscribe(&self, user_id: Option<&str>, subscription: PushSubscription) -> Result<(), PushError> {
        if subscription.endpoint.trim().is_empty() {
            return Err(PushError::InvalidSubscription("endpoint vacío".to_string()));
        }
        if subscription.keys.p256dh.is_empty() || subscription.keys.auth.is_empty() {
            return Err(PushError::InvalidSubscription("faltan las claves de la suscripción".to_string()));
        }

        self.registry.subscribe(user_id, subscription).await;
        info!("Push subscription registered for {}", user_id.unwrap_or("default"));
        Ok(())
    }

    /// Removing a subscription that does not exist is not an error.
    pub async fn unsubscribe(&self, user_id: Option<&str>) {
        if self.registry.unsubscribe(user_id).await.is_none() {
            debug!("No push subscription to remove for {}", user_id.unwrap_or("default"));
        }
    }

    pub async fn send(&self, payload: &NotificationPayload) -> Result<(), PushError> {
        let user_id = payload.user_id.as_deref();
        let subscription = self
            .registry
            .get(user_id)
            .await
            .ok_or(PushError::NoSubscription)?;

        let message = serde_json::to_vec(&payload.to_message())
            .map_err(|e| PushError::Crypto(e.to_string()))?;

        match self.sender.send(&subscription, &message).await {
            Ok(()) => {
                debug!("Notification '{}' delivered", payload.title);
                Ok(())
            }
            Err(PushError::SubscriptionGone(status)) => {
                warn!("Dropping expired push subscription (status {})", status);
                self.registry
                    .remove_if_endpoint(user_id, &subscription.endpoint)
                    .await;
                Err(PushError::SubscriptionGone(status))
            }
            Err(e) => {
                warn!("Failed to deliver notification: {}", e);
                Err(e)
            }
        }
    }

    /// Sends concurrently; every user counts once as delivered or failed.
    pub async fn send_bulk(&self, user_ids: &[String], payload: &NotificationPayload) -> BulkReport {
        let sends = user_ids.iter().map(|user_id| {
            let payload = payload.clone().for_user(user_id.as_str());
            async move { self.send(&payload).await }
        });

        let results = join_all(sends).await;
        let successful = results.iter().filter(|r| r.is_ok()).count();
        let report = BulkReport {
            successful,
            failed: results.len() - successful,
            total: user_ids.len(),
        };

        info!("{}", report.summary());
        report
    }

    pub async fn notify_upcoming_appointment(
        &self,
        user_id: &str,
        appointment: &AppointmentReminder,
    ) -> Result<(), PushError> {
        let payload = NotificationPayload {
            url: Some("/user".to_string()),
            tag: Some("appointment-reminder".to_string()),
            require_interaction: Some(true),
            ..NotificationPayload::new(
                "📅 Recordatorio de Cita",
                format!(
                    "Tienes una cita con {} ({}) el {} a las {}",
                    appointment.doctor_name, appointment.specialty, appointment.date, appointment.time
                ),
            )
        }
        .for_user(user_id);

        self.send(&payload).await
    }

    pub async fn notify_health_alert(&self, user_id: &str, alert: &HealthAlert) -> Result<(), PushError> {
        let payload = NotificationPayload {
            url: Some("/user".to_string()),
            tag: Some("health-alert".to_string()),
            require_interaction: Some(alert.priority == AlertPriority::High),
            ..NotificationPayload::new(
                format!("⚠️ Alerta de Salud - {}", alert.alert_type),
                alert.message.clone(),
            )
        }
        .for_user(user_id);

        self.send(&payload).await
    }
}
