use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::store::RecordStore;

const STORE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub store: DependencyStatus,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.store.is_healthy()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyStatus {
    Healthy { status: String, latency_ms: u64 },
    Unhealthy { status: String, error: String },
}

impl DependencyStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, DependencyStatus::Healthy { .. })
    }
}

async fn check_store(store: &dyn RecordStore) -> DependencyStatus {
    let start = Instant::now();
    match timeout(STORE_CHECK_TIMEOUT, store.ping()).await {
        Ok(Ok(())) => DependencyStatus::Healthy {
            status: "connected".to_string(),
            latency_ms: start.elapsed().as_millis() as u64,
        },
        Ok(Err(err)) => DependencyStatus::Unhealthy {
            status: "disconnected".to_string(),
            error: err.to_string(),
        },
        Err(_) => DependencyStatus::Unhealthy {
            status: "disconnected".to_string(),
            error: "timeout".to_string(),
        },
    }
}

pub async fn report(store: &dyn RecordStore, started_at: Instant) -> HealthReport {
    let store_status = check_store(store).await;
    let status = if store_status.is_healthy() {
        "healthy"
    } else {
        "unhealthy"
    };

    HealthReport {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: started_at.elapsed().as_secs(),
        store: store_status,
    }
}
