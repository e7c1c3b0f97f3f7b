// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user sliding token-window conversation history.
//!
//! Every provider adapter owns one [`ContextStore`]; the trimming algorithm
//! in [`UserContext::reserve`] is shared across variants, only the token
//! estimate differs per provider. Entries are mutated exclusively while
//! holding that user's lock, and the lock is released before any outbound
//! network call.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use chatwire_core::{ChatTurn, TokenUsage};

/// Ordered conversation history for one user, with parallel per-turn token
/// costs and a running total.
///
/// Invariant: `total_tokens` always equals the sum of retained per-turn
/// costs, and `turns` and `costs` have the same length. Trimming removes
/// only whole (question, answer) pairs from the front.
#[derive(Debug, Default)]
pub struct UserContext {
    turns: Vec<ChatTurn>,
    costs: Vec<u64>,
    total_tokens: u64,
}

impl UserContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The retained history, oldest turn first.
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Sum of the retained per-turn token costs.
    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Makes room for an incoming message of `incoming_tokens` under the
    /// configured `budget`.
    ///
    /// If the projected total stays under budget this is a no-op. Otherwise
    /// whole (question, answer) pairs are dropped from the front until the
    /// projected total is under budget again, or the history is empty.
    pub fn reserve(&mut self, incoming_tokens: u64, budget: u64) {
        let projected = self.total_tokens + incoming_tokens;
        if projected < budget {
            return;
        }

        let mut index = 0;
        let mut dropped = 0;
        while index + 1 < self.costs.len() {
            dropped += self.costs[index] + self.costs[index + 1];
            index += 2;
            if projected - dropped < budget {
                break;
            }
        }

        if index > 0 {
            debug!(dropped_turns = index, dropped_tokens = dropped, "trimmed context window");
            self.turns.drain(..index);
            self.costs.drain(..index);
            self.total_tokens -= dropped;
        }
    }

    /// Appends one completed (question, answer) exchange.
    ///
    /// The question's cost is the prompt-token delta over the previously
    /// retained history, so the running total stays equal to the sum of the
    /// per-turn costs.
    pub fn record_exchange(&mut self, question: &str, answer: &str, usage: &TokenUsage) {
        let question_cost = usage.prompt_tokens.saturating_sub(self.total_tokens);
        let answer_cost = usage.completion_tokens;

        self.turns.push(ChatTurn::user(question));
        self.turns.push(ChatTurn::assistant(answer));
        self.costs.push(question_cost);
        self.costs.push(answer_cost);
        self.total_tokens += question_cost + answer_cost;
    }
}

/// Sharded per-user context entries, one lock per user.
///
/// No global lock serializes requests across users; concurrent requests for
/// the same user contend only on that user's entry.
#[derive(Debug, Default)]
pub struct ContextStore {
    users: DashMap<String, Arc<Mutex<UserContext>>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the context entry for `user`, creating an empty one if absent.
    pub fn user(&self, user: &str) -> Arc<Mutex<UserContext>> {
        self.users
            .entry(user.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(UserContext::new())))
            .clone()
    }

    /// Atomically drops all per-user history.
    pub fn reset(&self) {
        self.users.clear();
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
