use rand::Rng;
use std::time::Duration;
use tracing::info;

/// Uniformly random whole-second delay in `[min_sec, max_sec]`.
/// Swapped bounds are tolerated.
pub fn humanized_delay(min_sec: u64, max_sec: u64) -> Duration {
    let (lo, hi) = if min_sec <= max_sec {
        (min_sec, max_sec)
    } else {
        (max_sec, min_sec)
    };
    Duration::from_secs(rand::thread_rng().gen_range(lo..=hi))
}

pub async fn pause(min_sec: u64, max_sec: u64) -> Duration {
    let delay = humanized_delay(min_sec, max_sec);
    info!("Sleeping {} seconds before interacting...", delay.as_secs());
    tokio::time::sleep(delay).await;
    delay
}
