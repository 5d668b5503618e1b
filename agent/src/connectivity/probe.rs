//! Reachability probe.
//!
//! For hosts that cannot push their own online/offline signal, the agent
//! polls a health URL and feeds the result into [`Reachability`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;

use super::Reachability;

/// Poll `url` every `interval` and record whether it answered with success.
///
/// Runs until the task is aborted.
pub async fn probe(
    reachability: Arc<Reachability>,
    client: reqwest::Client,
    url: Url,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    tracing::info!(%url, ?interval, "Reachability probe started");

    loop {
        ticker.tick().await;

        let online = match client.get(url.clone()).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Reachability probe failed: {}", e);
                false
            }
        };

        reachability.set_online(online);
    }
}
