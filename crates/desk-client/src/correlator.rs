//! Request Correlator - matches replies from main to the call site that
//! issued the request.
//!
//! Flow:
//! 1. Caller builds a request with `create_request()`, which stores the
//!    callback under a fresh request id
//! 2. The envelope is sent to main
//! 3. The reply listener on `<channel>-reply` calls `on_reply()`
//! 4. The entry is removed and the callback runs, exactly once
//!
//! A reply for an id that is no longer pending (cancelled, expired or
//! already answered) is logged and discarded, and so is a reply that
//! arrives on a channel other than the request's `<channel>-reply`.

use desk_types::{BusError, Channel, Envelope, RequestId, Scope};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Callback invoked with the reply envelope.
pub type ReplyCallback = Box<dyn FnOnce(Envelope) + Send>;

/// Correlator settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrelatorConfig {
    /// How long a request may stay pending before `remove_expired()`
    /// answers it with an expiry error. `None` keeps requests pending until
    /// they are answered or cancelled.
    pub request_timeout: Option<Duration>,
}

/// A request waiting for its reply.
///
/// The callback sits behind a mutex only so the table is `Sync`; it is
/// taken out by value when the entry is removed.
struct PendingRequest {
    channel: Channel,
    scope: Scope,
    callback: Mutex<ReplyCallback>,
    created_at: Instant,
}

/// Statistics for the correlator
#[derive(Debug, Default)]
pub struct CorrelatorStats {
    /// Requests registered
    pub registered: AtomicU64,
    /// Replies delivered to a waiting callback
    pub completed: AtomicU64,
    /// Replies for ids that were not pending
    pub discarded: AtomicU64,
    /// Requests torn down before a reply arrived
    pub cancelled: AtomicU64,
    /// Requests answered with an expiry error
    pub expired: AtomicU64,
}

/// Point-in-time copy of [`CorrelatorStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrelatorStatsSnapshot {
    pub registered: u64,
    pub completed: u64,
    pub discarded: u64,
    pub cancelled: u64,
    pub expired: u64,
}

impl CorrelatorStats {
    pub fn snapshot(&self) -> CorrelatorStatsSnapshot {
        CorrelatorStatsSnapshot {
            registered: self.registered.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
        }
    }
}

/// Pending request table owned by one renderer.
pub struct Correlator {
    pending: DashMap<RequestId, PendingRequest>,
    config: CorrelatorConfig,
    stats: CorrelatorStats,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new(CorrelatorConfig::default())
    }
}

impl Correlator {
    pub fn new(config: CorrelatorConfig) -> Self {
        Self {
            pending: DashMap::new(),
            config,
            stats: CorrelatorStats::default(),
        }
    }

    pub fn config(&self) -> &CorrelatorConfig {
        &self.config
    }

    /// Build a request envelope and remember `callback` under its id.
    pub fn create_request<F>(
        &self,
        channel: impl Into<Channel>,
        args: Value,
        scope: impl Into<Scope>,
        callback: F,
    ) -> Envelope
    where
        F: FnOnce(Envelope) + Send + 'static,
    {
        let channel = channel.into();
        let envelope = Envelope::request(channel.clone(), args);
        let scope = scope.into();

        debug!(
            request_id = %envelope.id,
            channel = %channel,
            scope = %scope,
            "[Correlator] registered pending request"
        );

        self.pending.insert(
            envelope.id.clone(),
            PendingRequest {
                channel,
                scope,
                callback: Mutex::new(Box::new(callback)),
                created_at: Instant::now(),
            },
        );
        self.stats.registered.fetch_add(1, Ordering::Relaxed);
        envelope
    }

    /// Route a reply to its pending callback.
    ///
    /// Returns `true` when a callback ran, `false` when the reply was
    /// dropped. A reply on the wrong channel leaves the request pending.
    pub fn on_reply(&self, channel: &Channel, envelope: Envelope) -> bool {
        let removed = self
            .pending
            .remove_if(&envelope.id, |_, pending| pending.channel.reply() == *channel);
        match removed {
            Some((id, pending)) => {
                debug!(
                    request_id = %id,
                    channel = %channel,
                    scope = %pending.scope,
                    elapsed_ms = pending.created_at.elapsed().as_millis(),
                    "[Correlator] reply delivered"
                );
                self.stats.completed.fetch_add(1, Ordering::Relaxed);
                (pending.callback.into_inner())(envelope);
                true
            }
            None if self.pending.contains_key(&envelope.id) => {
                warn!(
                    request_id = %envelope.id,
                    channel = %channel,
                    "[Correlator] reply on foreign channel, discarded"
                );
                self.stats.discarded.fetch_add(1, Ordering::Relaxed);
                false
            }
            None => {
                warn!(
                    request_id = %envelope.id,
                    channel = %channel,
                    "[Correlator] no pending request for reply, discarded"
                );
                self.stats.discarded.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Forget a pending request without invoking its callback.
    pub fn cancel(&self, id: &RequestId) -> bool {
        match self.pending.remove(id) {
            Some((id, pending)) => {
                debug!(
                    request_id = %id,
                    scope = %pending.scope,
                    "[Correlator] cancelled pending request"
                );
                self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Cancel every pending request issued by `scope`.
    pub fn cancel_scope(&self, scope: &Scope) -> usize {
        let mut cancelled = 0;
        self.pending.retain(|_, pending| {
            if &pending.scope == scope {
                cancelled += 1;
                false
            } else {
                true
            }
        });
        if cancelled > 0 {
            self.stats
                .cancelled
                .fetch_add(cancelled as u64, Ordering::Relaxed);
            debug!(scope = %scope, cancelled, "[Correlator] tore down scope");
        }
        cancelled
    }

    /// Cancel every pending request.
    pub fn cancel_all(&self) -> usize {
        let cancelled = self.pending.len();
        self.pending.clear();
        self.stats
            .cancelled
            .fetch_add(cancelled as u64, Ordering::Relaxed);
        cancelled
    }

    /// Answer requests older than the configured timeout with an expiry
    /// error. Does nothing without a timeout.
    ///
    /// Returns the number of requests expired.
    pub fn remove_expired(&self) -> usize {
        let Some(timeout) = self.config.request_timeout else {
            return 0;
        };

        let now = Instant::now();
        let stale: Vec<RequestId> = self
            .pending
            .iter()
            .filter(|entry| now.duration_since(entry.created_at) > timeout)
            .map(|entry| entry.key().clone())
            .collect();

        let mut expired = 0;
        for id in stale {
            // A reply may have won the race since the scan.
            let Some((id, pending)) = self.pending.remove(&id) else {
                continue;
            };
            let waited = now.duration_since(pending.created_at);
            warn!(
                request_id = %id,
                channel = %pending.channel,
                elapsed_ms = waited.as_millis(),
                timeout_ms = timeout.as_millis(),
                "[Correlator] expiring pending request"
            );
            let envelope = Envelope::new(pending.channel.clone(), id, Value::Null)
                .with_error(BusError::expired(&pending.channel, waited));
            self.stats.expired.fetch_add(1, Ordering::Relaxed);
            (pending.callback.into_inner())(envelope);
            expired += 1;
        }
        expired
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: &RequestId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn stats(&self) -> CorrelatorStatsSnapshot {
        self.stats.snapshot()
    }
}

/// Background task that expires stale requests.
pub async fn cleanup_task(correlator: Arc<Correlator>, interval: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        let expired = correlator.remove_expired();
        if expired > 0 {
            debug!(expired, "[Correlator] cleaned up expired requests");
        }
    }
}
