// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user daily request quota.
//!
//! Counts are valid only for the stored UTC day marker; any access on a new
//! day atomically resets all counts before counting.

use std::collections::HashMap;

use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::info;

fn today_utc() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

#[derive(Debug)]
struct QuotaState {
    day: NaiveDate,
    counts: HashMap<String, u32>,
}

/// Tracks successful completions per user for the current UTC day.
#[derive(Debug)]
pub struct QuotaTracker {
    state: RwLock<QuotaState>,
}

impl QuotaTracker {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(QuotaState {
                day: today_utc(),
                counts: HashMap::new(),
            }),
        }
    }

    /// The user's count for today. Rolls the day first when it has changed.
    pub async fn count(&self, user: &str) -> u32 {
        {
            let state = self.state.read().await;
            if state.day == today_utc() {
                return state.counts.get(user).copied().unwrap_or(0);
            }
        }
        self.reset_if_new_day().await;
        0
    }

    /// Records one successful completion for the user.
    pub async fn record(&self, user: &str) {
        let mut state = self.state.write().await;
        let today = today_utc();
        if state.day != today {
            state.day = today;
            state.counts.clear();
        }
        *state.counts.entry(user.to_string()).or_insert(0) += 1;
    }

    /// Clears all counts when the stored day marker is stale. Returns true
    /// when a rollover happened.
    pub async fn reset_if_new_day(&self) -> bool {
        let mut state = self.state.write().await;
        let today = today_utc();
        if state.day == today {
            return false;
        }
        info!(previous_day = %state.day, "daily quota rollover");
        state.day = today;
        state.counts.clear();
        true
    }

    #[cfg(test)]
    pub(crate) async fn force_day(&self, day: NaiveDate) {
        self.state.write().await.day = day;
    }

    #[cfg(test)]
    pub(crate) async fn user_count_raw(&self, user: &str) -> u32 {
        self.state.read().await.counts.get(user).copied().unwrap_or(0)
    }
}

impl Default for QuotaTracker {
    fn default() -> Self {
        Self::new()
    }
}
