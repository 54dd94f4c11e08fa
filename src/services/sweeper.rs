use std::time::Duration;

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, info, warn};

use super::auth_service::AuthService;

/// Periodically deletes expired sessions and tokens. Returns `None` when the
/// interval is zero.
pub fn spawn(auth: AuthService, every: Duration) -> Option<JoinHandle<()>> {
    if every.is_zero() {
        info!("expiry sweeper disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match auth.sweep_expired().await {
                Ok(report) if report.total() > 0 => info!(
                    sessions = report.sessions,
                    verification_tokens = report.verification_tokens,
                    reset_tokens = report.reset_tokens,
                    "expired auth rows swept"
                ),
                Ok(_) => debug!("expiry sweep found nothing"),
                Err(err) => warn!(error = %err, "expiry sweep failed"),
            }
        }
    }))
}
