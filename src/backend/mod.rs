//! Monitoring backend integration: credential validation and series submission.

pub mod client;

pub use client::MetricsClient;

/// Host name reported with every data point: the configured override, else
/// the machine's hostname.
pub fn resolve_host(configured: Option<&str>) -> String {
    if let Some(host) = configured.filter(|h| !h.trim().is_empty()) {
        return host.trim().to_string();
    }
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}
