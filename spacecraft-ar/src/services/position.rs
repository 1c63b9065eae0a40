//! Client for the remote ISS coordinate store.
//!
//! The store is a two-leg exchange against one endpoint: a POST registering
//! the source URL, then a GET returning the latest `{latitude, longitude}`.
//! Calls are blocking and run on the IO task pool, never on the frame path.

use crate::engine::core::session::SessionConfig;
use bevy::prelude::*;
use bevy::tasks::{IoTaskPool, Task, block_on, futures_lite::future};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Sub-satellite point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PositionError {
    #[error("position request failed: {0}")]
    Network(String),
    #[error("position service returned HTTP {0}")]
    Status(u16),
    #[error("malformed position payload: {0}")]
    Decode(String),
}

pub trait PositionService: Send + Sync {
    fn fetch_current_position(&self) -> Result<GeoPosition, PositionError>;
}

pub fn decode_position(body: &[u8]) -> Result<GeoPosition, PositionError> {
    serde_json::from_slice(body).map_err(|e| PositionError::Decode(e.to_string()))
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    url: &'a str,
}

pub struct HttpPositionService {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpPositionService {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, PositionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PositionError::Network(e.to_string()))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Register the source with the store. Only transport failures count.
    fn submit(&self) -> Result<(), PositionError> {
        self.client
            .post(&self.url)
            .json(&SubmitRequest { url: &self.url })
            .send()
            .map_err(|e| PositionError::Network(e.to_string()))?;
        Ok(())
    }

    fn retrieve(&self) -> Result<GeoPosition, PositionError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| PositionError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(PositionError::Status(status));
        }

        let body = response
            .bytes()
            .map_err(|e| PositionError::Network(e.to_string()))?;
        decode_position(&body)
    }
}

impl PositionService for HttpPositionService {
    fn fetch_current_position(&self) -> Result<GeoPosition, PositionError> {
        self.submit()?;
        self.retrieve()
    }
}

/// Stand-in used when no HTTP client could be built.
struct UnavailablePositionService(String);

impl PositionService for UnavailablePositionService {
    fn fetch_current_position(&self) -> Result<GeoPosition, PositionError> {
        Err(PositionError::Network(self.0.clone()))
    }
}

#[derive(Resource, Clone)]
pub struct PositionServiceHandle(pub Arc<dyn PositionService>);

impl PositionServiceHandle {
    pub fn new(service: impl PositionService + 'static) -> Self {
        Self(Arc::new(service))
    }

    /// Start a fetch on the IO task pool.
    pub fn spawn_fetch(&self) -> PositionTask {
        let service = self.0.clone();
        let task = IoTaskPool::get().spawn(async move { service.fetch_current_position() });
        PositionTask(task)
    }
}

/// An in-flight fetch, polled from the main schedule.
pub struct PositionTask(Task<Result<GeoPosition, PositionError>>);

impl PositionTask {
    /// `Some` once the fetch has finished.
    pub fn poll(&mut self) -> Option<Result<GeoPosition, PositionError>> {
        block_on(future::poll_once(&mut self.0))
    }
}

pub fn install_position_service(mut commands: Commands, config: Res<SessionConfig>) {
    let handle = match HttpPositionService::new(
        config.position_service_url.clone(),
        config.position_timeout,
    ) {
        Ok(service) => {
            info!("Position service: {}", service.url());
            PositionServiceHandle::new(service)
        }
        Err(err) => {
            warn!("Position service unavailable: {err}");
            PositionServiceHandle::new(UnavailablePositionService(err.to_string()))
        }
    };
    commands.insert_resource(handle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_position() {
        let body = br#"{"latitude": 51.5, "longitude": -0.12, "timestamp": 1718000000}"#;
        assert_eq!(
            decode_position(body),
            Ok(GeoPosition {
                latitude: 51.5,
                longitude: -0.12
            })
        );
    }

    #[test]
    fn test_decode_rejects_missing_field() {
        let body = br#"{"latitude": 12.0}"#;
        assert!(matches!(decode_position(body), Err(PositionError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_string_coordinates() {
        let body = br#"{"latitude": "12.0", "longitude": "3.0"}"#;
        assert!(matches!(decode_position(body), Err(PositionError::Decode(_))));
    }

    #[test]
    fn test_submit_body_shape() {
        let json = serde_json::to_value(SubmitRequest {
            url: "https://example.invalid/iss",
        })
        .expect("serialises");
        assert_eq!(json, serde_json::json!({ "url": "https://example.invalid/iss" }));
    }

    struct FixedPosition(GeoPosition);

    impl PositionService for FixedPosition {
        fn fetch_current_position(&self) -> Result<GeoPosition, PositionError> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_fetch_runs_on_io_pool_and_polls_to_completion() {
        IoTaskPool::get_or_init(bevy::tasks::TaskPool::new);
        let position = GeoPosition {
            latitude: -33.9,
            longitude: 151.2,
        };
        let mut task = PositionServiceHandle::new(FixedPosition(position)).spawn_fetch();

        let mut result = None;
        for _ in 0..500 {
            result = task.poll();
            if result.is_some() {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(result, Some(Ok(position)));
    }

    #[test]
    fn test_unavailable_service_reports_network_error() {
        let handle = PositionServiceHandle::new(UnavailablePositionService("offline".into()));
        assert_eq!(
            handle.0.fetch_current_position(),
            Err(PositionError::Network("offline".into()))
        );
    }
}
