//! Request rate limiter shared by every call a client makes
//!
//! Caps how many requests a client may *start* per minute. It does not
//! throttle transfer throughput once a response is streaming.

use governor::{DefaultDirectRateLimiter, Quota};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

/// Token bucket limiting request initiations to R per 60 seconds.
///
/// A limiter built with R <= 0 is the `Unlimited` strategy and never waits.
/// Clones share the same bucket, so one limiter can gate every concurrent
/// call from a client.
#[derive(Clone)]
pub enum RateLimiter {
    Limited {
        bucket: Arc<DefaultDirectRateLimiter>,
        per_minute: u32,
    },
    Unlimited,
}

impl RateLimiter {
    /// Create a limiter allowing `requests_per_minute` initiations per minute
    pub fn new(requests_per_minute: i64) -> Self {
        if requests_per_minute <= 0 {
            return Self::unlimited();
        }

        let per_minute = u32::try_from(requests_per_minute).unwrap_or(u32::MAX);
        match NonZeroU32::new(per_minute) {
            Some(n) => {
                debug!("Request rate limited to {} per minute", per_minute);
                Self::Limited {
                    // Burst of R, then one token every 60/R seconds
                    bucket: Arc::new(governor::RateLimiter::direct(Quota::per_minute(n))),
                    per_minute,
                }
            }
            None => Self::unlimited(),
        }
    }

    /// Create an unlimited rate limiter (no throttling)
    pub fn unlimited() -> Self {
        Self::Unlimited
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }

    /// Configured requests per minute, `None` when unlimited
    pub fn per_minute(&self) -> Option<u32> {
        match self {
            Self::Limited { per_minute, .. } => Some(*per_minute),
            Self::Unlimited => None,
        }
    }

    /// Wait until a request slot is available and consume it
    pub async fn acquire(&self) {
        match self {
            Self::Limited { bucket, .. } => bucket.until_ready().await,
            Self::Unlimited => {}
        }
    }

    /// Non-blocking try to acquire a slot
    /// Returns true if a slot was consumed, false otherwise
    pub fn try_acquire(&self) -> bool {
        match self {
            Self::Limited { bucket, .. } => bucket.check().is_ok(),
            Self::Unlimited => true,
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Limited { per_minute, .. } => {
                f.debug_struct("Limited").field("per_minute", per_minute).finish()
            }
            Self::Unlimited => f.write_str("Unlimited"),
        }
    }
}
