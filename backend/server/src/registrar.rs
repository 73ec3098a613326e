//! # Entry Registration
//!
//! Counts a completed payment at most once, no matter how often the success
//! page is reloaded or how many of those reloads race each other.
//!
//! ## Protocol
//! 1. `SADD entered_sessions {session_id}`, a single atomic check-and-insert
//! 2. Newly added: `INCR entered_count` and answer with the value `INCR` returned
//! 3. Already present: no increment, answer with `GET entered_count`
//!
//! Never split step 1 into an exists check followed by an insert, and never
//! re-read the counter after step 2. Both reopen a race against concurrent
//! requests, possibly on other machines.
use tracing::{error, info};

use crate::{
    backend::{Backend, COUNT_KEY, SESSIONS_KEY},
    error::RegisterError,
    verify::{PaymentVerifier, Verdict},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub count: u64,
    pub registered: bool,
    /// Whether this call performed the increment, false on replays.
    pub newly_counted: bool,
}

pub async fn register(
    backend: &dyn Backend,
    verifier: &dyn PaymentVerifier,
    session_id: &str,
) -> Result<Registration, RegisterError> {
    if session_id.is_empty() {
        return Err(RegisterError::InvalidInput);
    }

    if verifier.verify(session_id).await? == Verdict::Unpaid {
        return Err(RegisterError::Unpaid(session_id.to_string()));
    }

    let added = backend.add_to_set_if_absent(SESSIONS_KEY, session_id).await?;

    if added {
        let count = backend.increment_integer(COUNT_KEY).await.map_err(|e| {
            // the id is now marked seen, replays will never count it
            error!("Session {session_id} recorded but not counted, reconcile by hand: {e}");
            e
        })?;
        info!("Counted entry {count} for session {session_id}");

        return Ok(Registration {
            count,
            registered: true,
            newly_counted: true,
        });
    }

    let count = backend.get_integer(COUNT_KEY).await?.unwrap_or(0);
    info!("Session {session_id} already counted, count is {count}");

    Ok(Registration {
        count,
        registered: true,
        newly_counted: false,
    })
}
