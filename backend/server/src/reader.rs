use tracing::warn;

use crate::backend::{Backend, COUNT_KEY};

/// Current number of counted entries. Display only, so every failure reads
/// as 0 instead of surfacing.
pub async fn current_count(backend: &dyn Backend) -> u64 {
    match backend.get_integer(COUNT_KEY).await {
        Ok(count) => count.unwrap_or(0),
        Err(e) => {
            warn!("Failed to read entry count: {e}");
            0
        }
    }
}
