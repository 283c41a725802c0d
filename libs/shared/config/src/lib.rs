use std::env;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub app_url: String,
    pub request_timeout_secs: u64,
    pub health_timeout_secs: u64,
    pub vapid_public_key: String,
    pub vapid_private_key: String,
    pub vapid_subject: String,
    pub geocoder_url: String,
    pub ip_location_url: String,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            api_url: env::var("API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| {
                    warn!("API_URL not set, using empty value");
                    String::new()
                }),
            app_url: env::var("APP_URL")
                .unwrap_or_else(|_| {
                    warn!("APP_URL not set, using default");
                    "http://localhost:3000".to_string()
                }),
            request_timeout_secs: seconds_from_env("API_TIMEOUT_SECS", 45),
            health_timeout_secs: seconds_from_env("HEALTH_TIMEOUT_SECS", 10),
            vapid_public_key: env::var("VAPID_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("VAPID_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            vapid_private_key: env::var("VAPID_PRIVATE_KEY")
                .unwrap_or_else(|_| {
                    warn!("VAPID_PRIVATE_KEY not set, using empty value");
                    String::new()
                }),
            vapid_subject: env::var("VAPID_SUBJECT")
                .unwrap_or_else(|_| "mailto:notificaciones@medilink.com".to_string()),
            geocoder_url: env::var("GEOCODER_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            ip_location_url: env::var("IP_LOCATION_URL")
                .unwrap_or_else(|_| "https://ipapi.co".to_string()),
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.api_url.is_empty()
    }

    pub fn is_push_configured(&self) -> bool {
        !self.vapid_public_key.is_empty() && !self.vapid_private_key.is_empty()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            app_url: "http://localhost:3000".to_string(),
            request_timeout_secs: 45,
            health_timeout_secs: 10,
            vapid_public_key: String::new(),
            vapid_private_key: String::new(),
            vapid_subject: "mailto:notificaciones@medilink.com".to_string(),
            geocoder_url: "https://nominatim.openstreetmap.org".to_string(),
            ip_location_url: "https://ipapi.co".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

fn seconds_from_env(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} is not a valid number of seconds, using {}", key, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let config = AppConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(45));
        assert_eq!(config.health_timeout(), Duration::from_secs(10));
        assert!(!config.is_configured());
        assert!(!config.is_push_configured());
    }

    #[test]
    fn test_push_configured_requires_both_keys() {
        let mut config = AppConfig {
            vapid_public_key: "public".to_string(),
            ..AppConfig::default()
        };
        assert!(!config.is_push_configured());

        config.vapid_private_key = "private".to_string();
        assert!(config.is_push_configured());
    }
}
