use jiff::Timestamp;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: Timestamp,
    /// Seconds since the gateway started.
    pub uptime: f64,
    pub environment: &'static str,
}
