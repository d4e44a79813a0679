use std::time::Duration;

use tracing::debug;

use nest_api::AppState;

/// How often expired wallet nonces are dropped.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Background task that prunes expired login nonces so abandoned logins do
/// not pile up in memory. Expiry is also enforced at verification time.
pub async fn run_sweep_loop(state: AppState, every: Duration) {
    let mut interval = tokio::time::interval(every);

    loop {
        interval.tick().await;
        sweep_once(&state);
    }
}

pub fn sweep_once(state: &AppState) -> usize {
    let count = state.wallet.sweep_expired();
    if count > 0 {
        debug!("Sweeper: dropped {} expired nonces", count);
    }
    count
}
