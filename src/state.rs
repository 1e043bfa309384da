//! Handles shared by every connection worker and the decision loop.

use std::sync::Arc;

use crate::device::DeviceGateway;
use crate::store::{ActivityLog, KeyStore};

/// The only cross-worker state in the process. Cloning is cheap; the stores
/// live until the last clone is dropped.
#[derive(Debug, Clone)]
pub struct AppState {
    pub keys: Arc<KeyStore>,
    pub activity: Arc<ActivityLog>,
    pub gateway: Arc<DeviceGateway>,
}

impl AppState {
    /// Empty stores at their default capacities.
    pub fn new(gateway: DeviceGateway) -> Self {
        Self::with_stores(KeyStore::new(), ActivityLog::new(), gateway)
    }

    pub fn with_stores(keys: KeyStore, activity: ActivityLog, gateway: DeviceGateway) -> Self {
        Self {
            keys: Arc::new(keys),
            activity: Arc::new(activity),
            gateway: Arc::new(gateway),
        }
    }
}
