//! Fixed-window request rate limiting keyed by client address.
//!
//! Orthogonal to the authentication core: counters live in memory and are
//! wiped wholesale when the window rolls over, so a client's budget resets
//! at most `window` after its first request of the window.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

/// In-memory fixed-window rate limiter.
///
/// Cloning shares the underlying counters, so one limiter can be handed to
/// every request handler.
#[derive(Clone)]
pub struct RateLimiter {
    visitors: Arc<RwLock<HashMap<String, u32>>>,
    limit: u32,
}

impl RateLimiter {
    /// Create a limiter allowing `limit` requests per `window` per client
    /// and spawn the background task that resets the window.
    pub fn new(limit: u32, window: Duration) -> Self {
        let visitors: Arc<RwLock<HashMap<String, u32>>> = Arc::new(RwLock::new(HashMap::new()));

        let reset = visitors.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(window);
            interval.tick().await; // first tick fires immediately
            loop {
                interval.tick().await;
                reset.write().await.clear();
            }
        });

        Self { visitors, limit }
    }

    /// Construct without the reset task, for tests and single-shot tools.
    pub fn new_unscheduled(limit: u32) -> Self {
        Self {
            visitors: Arc::new(RwLock::new(HashMap::new())),
            limit,
        }
    }

    /// Record one request from `client` and report whether it is still
    /// within the window budget.
    pub async fn check(&self, client: &str) -> bool {
        let mut visitors = self.visitors.write().await;
        let count = visitors.entry(client.to_string()).or_insert(0);
        *count += 1;
        *count <= self.limit
    }

    /// Clear all counters (start a fresh window).
    pub async fn reset(&self) {
        self.visitors.write().await.clear();
    }
}
