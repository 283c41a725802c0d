use serde::Serialize;
use tracing::{debug, error};

use shared_api_client::{ApiClient, ApiError};

use crate::models::{Doctor, DoctorCercano, PopularSpecialty, SearchFilters};

const ALL_SPECIALTIES: &str = "all";

#[derive(Debug, Serialize)]
struct RankingQuery<'a> {
    limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    especialidad: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hora_minima: Option<&'a str>,
}

fn specialty_filter(especialidad: Option<&str>) -> Option<&str> {
    especialidad.filter(|value| !value.is_empty() && *value != ALL_SPECIALTIES)
}

/// Read-only access to the doctor directory and search endpoints.
#[derive(Clone)]
pub struct DoctorService {
    api: ApiClient,
}

impl DoctorService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<Doctor>, ApiError> {
        debug!("Fetching all doctors");
        self.api.get("/api/doctores").await
    }

    pub async fn get(&self, doctor_id: i64) -> Result<Doctor, ApiError> {
        debug!("Fetching doctor {}", doctor_id);
        self.api.get(&format!("/api/doctores/{}", doctor_id)).await
    }

    /// Only the filters that are set reach the query string; the "all"
    /// specialty placeholder is dropped.
    pub async fn search(&self, filters: &SearchFilters) -> Result<Vec<Doctor>, ApiError> {
        let mut filters = filters.clone();
        filters.especialidad = specialty_filter(filters.especialidad.as_deref()).map(str::to_string);
        debug!("Searching doctors with filters: {:?}", filters);

        self.api
            .get_with_query("/api/busqueda/doctores", &filters)
            .await
            .map_err(|e| {
                error!("Error searching doctors: {}", e);
                e
            })
    }

    pub async fn by_specialty(&self, especialidad: &str) -> Result<Vec<Doctor>, ApiError> {
        self.search(&SearchFilters {
            especialidad: Some(especialidad.to_string()),
            ..SearchFilters::default()
        })
        .await
    }

    pub async fn by_city(&self, ciudad: &str) -> Result<Vec<Doctor>, ApiError> {
        self.search(&SearchFilters {
            ciudad: Some(ciudad.to_string()),
            ..SearchFilters::default()
        })
        .await
    }

    /// `radio_km` defaults to 10 km.
    pub async fn nearby(
        &self,
        latitud: f64,
        longitud: f64,
        radio_km: Option<f64>,
    ) -> Result<Vec<DoctorCercano>, ApiError> {
        let query = [
            ("latitud", latitud.to_string()),
            ("longitud", longitud.to_string()),
            ("radio_km", radio_km.unwrap_or(10.0).to_string()),
        ];
        self.api
            .get_with_query("/api/busqueda/doctores/cercanos", &query)
            .await
    }

    pub async fn best_rated(
        &self,
        especialidad: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Doctor>, ApiError> {
        let query = RankingQuery {
            limit: limit.unwrap_or(10),
            especialidad: specialty_filter(especialidad),
            hora_minima: None,
        };
        self.api
            .get_with_query("/api/busqueda/doctores/mejor-valorados", &query)
            .await
    }

    pub async fn popular_specialties(&self, limit: Option<u32>) -> Result<Vec<PopularSpecialty>, ApiError> {
        let query = [("limit", limit.unwrap_or(10))];
        self.api
            .get_with_query("/api/busqueda/especialidades/populares", &query)
            .await
    }

    pub async fn available_today(
        &self,
        especialidad: Option<&str>,
        hora_minima: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Doctor>, ApiError> {
        let query = RankingQuery {
            limit: limit.unwrap_or(10),
            especialidad: specialty_filter(especialidad),
            hora_minima,
        };
        self.api
            .get_with_query("/api/busqueda/doctores/disponibles-hoy", &query)
            .await
    }
}
