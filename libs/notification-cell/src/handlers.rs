use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::error::AppError;

use crate::models::{
    ActionResponse, AppointmentReminderRequest, BulkNotificationRequest, HealthAlertRequest,
    NotificationPayload, SubscribeRequest, UnsubscribeRequest,
};
use crate::services::NotificationService;

pub async fn subscribe(
    State(service): State<NotificationService>,
    Json(request): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<ActionResponse>), AppError> {
    debug!("Registering push subscription");

    service
        .subscribe(request.user_id.as_deref(), request.subscription)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ActionResponse::ok("Suscripción registrada correctamente")),
    ))
}

pub async fn unsubscribe(
    State(service): State<NotificationService>,
    Json(request): Json<UnsubscribeRequest>,
) -> Json<ActionResponse> {
    service.unsubscribe(request.user_id.as_deref()).await;
    Json(ActionResponse::ok("Suscripción eliminada correctamente"))
}

pub async fn send_notification(
    State(service): State<NotificationService>,
    Json(payload): Json<NotificationPayload>,
) -> Result<Json<ActionResponse>, AppError> {
    service.send(&payload).await?;
    Ok(Json(ActionResponse::ok("Notificación enviada correctamente")))
}

pub async fn send_bulk(
    State(service): State<NotificationService>,
    Json(request): Json<BulkNotificationRequest>,
) -> Json<ActionResponse> {
    let report = service.send_bulk(&request.user_ids, &request.payload).await;
    Json(ActionResponse::bulk(report))
}

pub async fn appointment_reminder(
    State(service): State<NotificationService>,
    Json(request): Json<AppointmentReminderRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    service
        .notify_upcoming_appointment(&request.user_id, &request.appointment)
        .await?;
    Ok(Json(ActionResponse::ok("Notificación enviada correctamente")))
}

pub async fn health_alert(
    State(service): State<NotificationService>,
    Json(request): Json<HealthAlertRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    service.notify_health_alert(&request.user_id, &request.alert).await?;
    Ok(Json(ActionResponse::ok("Notificación enviada correctamente")))
}

pub async fn public_key(State(service): State<NotificationService>) -> Result<Json<Value>, AppError> {
    if service.public_key().is_empty() {
        return Err(AppError::Unavailable("Notificaciones push no configuradas".to_string()));
    }
    Ok(Json(json!({ "publicKey": service.public_key() })))
}
