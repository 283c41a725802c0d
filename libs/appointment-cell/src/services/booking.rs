// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;
use tracing::{debug, info, warn};

use shared_api_client::ApiClient;

use crate::models::{
    AppointmentError, AppointmentForm, CancelResponse, Cita, CitaCancelar, CitasEstadisticas,
    MisCitasQuery,
};
use crate::services::validation::{validate_cancellation, AppointmentValidator, Clock, SystemClock};

const DEFAULT_UPCOMING_LIMIT: u32 = 10;

/// Patient-side appointment operations. Local validation always runs
/// before a request is sent.
#[derive(Clone)]
pub struct CitasService {
    api: ApiClient,
    clock: Arc<dyn Clock>,
}

impl CitasService {
    pub fn new(api: ApiClient) -> Self {
        Self::with_clock(api, Arc::new(SystemClock))
    }

    pub fn with_clock(api: ApiClient, clock: Arc<dyn Clock>) -> Self {
        Self { api, clock }
    }

    pub async fn crear_cita(&self, form: &AppointmentForm) -> Result<Cita, AppointmentError> {
        let request = AppointmentValidator::validate(form, self.clock.now()).map_err(|e| {
            warn!("Appointment form rejected: {}", e);
            e
        })?;

        debug!("Booking appointment with doctor {} at {}", request.doctor_id, request.fecha_hora);
        let cita: Cita = self.api.post("/api/citas/", &request).await?;

        info!("Appointment {} created with doctor {}", cita.id, cita.doctor_id);
        Ok(cita)
    }

    pub async fn mis_citas(&self, query: &MisCitasQuery) -> Result<Vec<Cita>, AppointmentError> {
        debug!("Fetching appointments with filters: {:?}", query);
        Ok(self.api.get_with_query("/api/citas/mis-citas", query).await?)
    }

    pub async fn proximas_citas(&self, limit: Option<u32>) -> Result<Vec<Cita>, AppointmentError> {
        let query = [("limit", limit.unwrap_or(DEFAULT_UPCOMING_LIMIT))];
        Ok(self.api.get_with_query("/api/citas/proximas", &query).await?)
    }

    pub async fn cita(&self, cita_id: i64) -> Result<Cita, AppointmentError> {
        Ok(self.api.get(&format!("/api/citas/{}", cita_id)).await?)
    }

    pub async fn cancelar_cita(
        &self,
        cita_id: i64,
        motivo: &str,
    ) -> Result<CancelResponse, AppointmentError> {
        let body = CitaCancelar {
            motivo_cancelacion: validate_cancellation(motivo)?,
        };

        let response: CancelResponse = self
            .api
            .put(&format!("/api/citas/{}/cancelar", cita_id), &body)
            .await?;

        info!("Appointment {} cancelled", response.cita_id);
        Ok(response)
    }

    /// Cancels a loaded appointment after checking its status allows it.
    pub async fn cancelar(&self, cita: &Cita, motivo: &str) -> Result<CancelResponse, AppointmentError> {
        if !cita.estado.can_cancel() {
            return Err(AppointmentError::InvalidStatus(cita.estado));
        }
        self.cancelar_cita(cita.id, motivo).await
    }

    pub async fn estadisticas(&self) -> Result<CitasEstadisticas, AppointmentError> {
        Ok(self.api.get("/api/citas/estadisticas/mis-citas").await?)
    }
}
