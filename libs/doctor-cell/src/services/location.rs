use reqwest::{header::ACCEPT_LANGUAGE, Client};
use serde::Deserialize;
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::{Coordinates, UserLocation};

const UNKNOWN_CITY: &str = "Ubicación desconocida";
const DEFAULT_COUNTRY: &str = "México";

#[derive(Debug, Deserialize)]
struct ReverseGeocode {
    address: Option<GeocodedAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct GeocodedAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    county: Option<String>,
    suburb: Option<String>,
    state: Option<String>,
    region: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IpLocation {
    city: Option<String>,
    region: Option<String>,
    country_name: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl GeocodedAddress {
    fn into_location(self) -> UserLocation {
        let city = [self.city, self.town, self.village, self.municipality, self.county, self.suburb]
            .into_iter()
            .find_map(non_empty)
            .unwrap_or_else(|| UNKNOWN_CITY.to_string());

        UserLocation {
            city,
            region: non_empty(self.state)
                .or_else(|| non_empty(self.region))
                .unwrap_or_default(),
            country: non_empty(self.country).unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
            is_detected: true,
        }
    }
}

/// Resolves a human-readable location for the header. Denied geolocation
/// degrades to an IP lookup; total failure yields `UserLocation::undetected`.
#[derive(Clone)]
pub struct LocationService {
    client: Client,
    geocoder_url: String,
    ip_location_url: String,
}

impl LocationService {
    pub fn new(config: &AppConfig) -> Self {
        let client = Client::builder()
            .timeout(config.health_timeout())
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client for location lookups: {}", e);
                Client::new()
            });

        Self {
            client,
            geocoder_url: config.geocoder_url.trim_end_matches('/').to_string(),
            ip_location_url: config.ip_location_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn resolve(&self, coordinates: Option<Coordinates>) -> UserLocation {
        if let Some(coords) = coordinates {
            match self.reverse_geocode(coords).await {
                Ok(location) => return location,
                Err(e) => warn!("Reverse geocoding failed: {}", e),
            }
        } else {
            debug!("Geolocation unavailable, using IP lookup");
        }

        match self.lookup_ip().await {
            Ok(location) => location,
            Err(e) => {
                warn!("IP location lookup failed: {}", e);
                UserLocation::undetected()
            }
        }
    }

    async fn reverse_geocode(&self, coords: Coordinates) -> Result<UserLocation, reqwest::Error> {
        let url = format!("{}/reverse", self.geocoder_url);
        let response: ReverseGeocode = self
            .client
            .get(&url)
            .header(ACCEPT_LANGUAGE, "es")
            .query(&[
                ("format", "json".to_string()),
                ("lat", coords.latitud.to_string()),
                ("lon", coords.longitud.to_string()),
                ("zoom", "18".to_string()),
                ("addressdetails", "1".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.address.unwrap_or_default().into_location())
    }

    async fn lookup_ip(&self) -> Result<UserLocation, reqwest::Error> {
        let url = format!("{}/json/", self.ip_location_url);
        let response: IpLocation = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(UserLocation {
            city: non_empty(response.city).unwrap_or_else(|| "No detectada".to_string()),
            region: non_empty(response.region).unwrap_or_default(),
            country: non_empty(response.country_name).unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
            is_detected: false,
        })
    }
}
