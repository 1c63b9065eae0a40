use crate::engine::tracking::PlaneDetection;
use bevy::prelude::*;
use constants::{orbit, reticle};
use std::time::Duration;

/// Tunables for one AR session.
#[derive(Resource, Debug, Clone)]
pub struct SessionConfig {
    pub reanchor_interval_secs: f64,
    pub iss_refresh_secs: f64,
    pub orbit_radius_factor: f32,
    pub position_service_url: String,
    pub position_timeout: Duration,
    pub plane_detection: PlaneDetection,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reanchor_interval_secs: reticle::REANCHOR_INTERVAL_SECS,
            iss_refresh_secs: orbit::ISS_REFRESH_SECS,
            orbit_radius_factor: orbit::ORBIT_RADIUS_FACTOR,
            position_service_url: orbit::POSITION_SERVICE_URL.to_string(),
            position_timeout: Duration::from_secs(orbit::POSITION_REQUEST_TIMEOUT_SECS),
            plane_detection: PlaneDetection::default(),
        }
    }
}

impl SessionConfig {
    /// Defaults plus overrides from the process environment.
    pub fn from_env() -> Self {
        Self::default().with_position_url(std::env::var(orbit::POSITION_SERVICE_URL_ENV).ok())
    }

    /// Replace the position endpoint when `url` is present and not blank.
    pub fn with_position_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) {
            self.position_service_url = url;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_come_from_constants() {
        let config = SessionConfig::default();
        assert_eq!(config.reanchor_interval_secs, 1.0);
        assert_eq!(config.iss_refresh_secs, 10.0);
        assert_eq!(config.position_service_url, orbit::POSITION_SERVICE_URL);
        assert!(config.plane_detection.horizontal && config.plane_detection.vertical);
    }

    #[test]
    fn test_position_url_override() {
        let config = SessionConfig::default().with_position_url(Some(" http://localhost:8080/iss ".into()));
        assert_eq!(config.position_service_url, "http://localhost:8080/iss");

        let blank = SessionConfig::default().with_position_url(Some("   ".into()));
        assert_eq!(blank.position_service_url, orbit::POSITION_SERVICE_URL);

        let unset = SessionConfig::default().with_position_url(None);
        assert_eq!(unset.position_service_url, orbit::POSITION_SERVICE_URL);
    }
}
