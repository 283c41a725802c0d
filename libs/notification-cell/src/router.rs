use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::NotificationService;

pub fn push_routes(service: NotificationService) -> Router {
    Router::new()
        .route("/subscribe", post(handlers::subscribe))
        .route("/unsubscribe", post(handlers::unsubscribe))
        .route("/send", post(handlers::send_notification))
        .route("/send-bulk", post(handlers::send_bulk))
        .route("/appointment-reminder", post(handlers::appointment_reminder))
        .route("/health-alert", post(handlers::health_alert))
        .route("/public-key", get(handlers::public_key))
        .with_state(service)
}
