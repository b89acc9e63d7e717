//! Timer-driven session garbage collection.

#[cfg(test)]
mod tests;

use super::Engine;
use crate::{account::AccountDirectory, credential::CredentialStore};
use std::sync::Arc;
use tokio::{sync::Mutex, time::MissedTickBehavior};

/// Sweeps `engine`'s sessions every [`Options::sweep_interval`][crate::config::Options::sweep_interval]
/// until nothing else holds the engine.
///
/// The first sweep happens one period after this is first polled.
/// A session that sees no traffic is therefore destroyed after one to two periods.
pub async fn run<D, C>(engine: Arc<Mutex<Engine<D, C>>>)
where
    D: AccountDirectory,
    C: CredentialStore,
{
    let period = engine.lock().await.options().sweep_interval();
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if Arc::strong_count(&engine) == 1 {
            tracing::debug!(target: "saslserv", "engine dropped, stopping sweeper");
            return;
        }
        let destroyed = engine.lock().await.sweep();
        if destroyed != 0 {
            tracing::debug!(target: "saslserv", "swept {destroyed} stale sessions");
        }
    }
}
