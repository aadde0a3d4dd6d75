use crate::auth::JwtAuthority;
use crate::config::{Environment, GatewayConfig};
use crate::error::ApiError;
use axum::http::header::HOST;
use axum::http::HeaderMap;
use itinera_service::{ItineraryService, ServiceError};
use std::sync::Arc;
use std::time::{Duration, Instant};

const FORWARDED_PROTO: &str = "x-forwarded-proto";

fn header<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[derive(Clone)]
pub struct AppState {
    service: ItineraryService,
    auth: Arc<JwtAuthority>,
    config: Arc<GatewayConfig>,
    started_at: Instant,
}

impl AppState {
    pub fn new(service: ItineraryService, auth: JwtAuthority, config: GatewayConfig) -> Self {
        Self {
            service,
            auth: Arc::new(auth),
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }

    pub fn service(&self) -> &ItineraryService {
        &self.service
    }

    pub fn auth(&self) -> &JwtAuthority {
        &self.auth
    }

    pub fn environment(&self) -> Environment {
        self.config.environment
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Origin for links handed back to clients.
    pub fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(base) = &self.config.public_base_url {
            return base.clone();
        }

        let proto = header(headers, FORWARDED_PROTO).unwrap_or("http");
        let host = header(headers, HOST.as_str()).unwrap_or("localhost");
        format!("{proto}://{host}")
    }

    /// Error mapper for a service call whose server errors read `action`.
    pub fn failure(&self, action: &'static str) -> impl Fn(ServiceError) -> ApiError {
        let environment = self.environment();
        move |err| ApiError::from_service(err, action, environment)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
