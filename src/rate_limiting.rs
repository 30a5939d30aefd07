// ABOUTME: Per-user cooldown gate enforced before any model invocation or persistence write
// ABOUTME: Implements an atomic check-and-set over a concurrent map keyed by user id
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Rate Limiting
//!
//! One generation request per authenticated user per rolling window. The
//! per-key read-modify-write happens under the `DashMap` shard lock, so two
//! concurrent requests from the same user cannot both pass the gate. State is
//! in-process; a multi-instance deployment would need an external keyed
//! counter instead.

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// Default cooldown window between generation requests per user
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Per-user cooldown gate
pub struct RateLimiter {
    window: Duration,
    last_request: DashMap<Uuid, Instant>,
}

impl RateLimiter {
    /// Create a limiter with the given cooldown window
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_request: DashMap::new(),
        }
    }

    /// Check the gate for a user and record the request if it passes
    ///
    /// # Errors
    ///
    /// Returns `RateLimitExceeded` carrying a positive, human-readable
    /// seconds-remaining value while the cooldown is active.
    pub fn check_and_update(&self, user_id: Uuid) -> AppResult<()> {
        let now = Instant::now();

        match self.last_request.entry(user_id) {
            Entry::Occupied(mut occupied) => {
                let elapsed = now.duration_since(*occupied.get());
                if elapsed < self.window {
                    let remaining = self.window - elapsed;
                    return Err(AppError::rate_limited(seconds_ceil(remaining)));
                }
                occupied.insert(now);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(now);
            }
        }

        Ok(())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

/// Round a duration up to whole seconds, never reporting zero
fn seconds_ceil(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs.max(1)
    }
}
