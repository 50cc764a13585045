//! # Pagination / Session State
//!
//! Tracks which products a viewer has already been shown so "load more"
//! can hand out the next batch. Each viewer gets its own
//! [`PaginationState`], keyed by [`SessionId`] in a [`SessionStore`].

use crate::catalog::{Catalog, Product};
use crate::query::{filter, QueryCriteria};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Default number of products per batch
pub const DEFAULT_BATCH_SIZE: usize = 9;

/// Default upper bound on live sessions
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Shown-id bookkeeping for one viewer
#[derive(Debug, Clone)]
pub struct PaginationState {
    batch_size: usize,
    /// Ids in the order they were shown
    shown: Vec<String>,
    seen: HashSet<String>,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl PaginationState {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            shown: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn shown_ids(&self) -> &[String] {
        &self.shown
    }

    /// Fresh "show": reset and return the first batch
    pub fn start_query<'a>(
        &mut self,
        catalog: &'a Catalog,
        criteria: &QueryCriteria,
    ) -> Vec<&'a Product> {
        self.reset();
        let batch: Vec<&Product> = filter(catalog, criteria)
            .into_iter()
            .take(self.batch_size)
            .collect();
        self.record(&batch);
        batch
    }

    /// Append the next unseen batch for `criteria` and return everything
    /// shown so far. Once nothing unseen remains this returns the same
    /// cumulative list on every call.
    pub fn load_more<'a>(
        &mut self,
        catalog: &'a Catalog,
        criteria: &QueryCriteria,
    ) -> Vec<&'a Product> {
        let next: Vec<&Product> = filter(catalog, criteria)
            .into_iter()
            .filter(|p| !self.seen.contains(&p.id))
            .take(self.batch_size)
            .collect();

        if next.is_empty() {
            tracing::debug!(shown = self.shown.len(), "No unseen products left");
        } else {
            self.record(&next);
        }

        self.shown_products(catalog)
    }

    /// Initial view: a random batch becomes the shown set
    pub fn start_random<'a, R: Rng + ?Sized>(
        &mut self,
        catalog: &'a Catalog,
        rng: &mut R,
    ) -> Vec<&'a Product> {
        self.reset();
        let batch = catalog.sample_with(rng, self.batch_size);
        self.record(&batch);
        batch
    }

    /// Everything shown so far, in shown order
    pub fn shown_products<'a>(&self, catalog: &'a Catalog) -> Vec<&'a Product> {
        self.shown.iter().filter_map(|id| catalog.get(id)).collect()
    }

    fn reset(&mut self) {
        self.shown.clear();
        self.seen.clear();
    }

    fn record(&mut self, batch: &[&Product]) {
        for product in batch {
            if self.seen.insert(product.id.clone()) {
                self.shown.push(product.id.clone());
            }
        }
    }
}

/// Opaque per-viewer token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// New random 128-bit token, hex encoded
    pub fn generate() -> Self {
        let value: u128 = rand::thread_rng().gen();
        Self(format!("{:032x}", value))
    }

    /// Validate a token coming back from a client
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = (16..=64).contains(&raw.len())
            && raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
struct SessionEntry {
    state: PaginationState,
    last_seen: Instant,
}

/// Pagination state for every live viewer
#[derive(Debug)]
pub struct SessionStore {
    batch_size: usize,
    max_sessions: usize,
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
}

impl SessionStore {
    pub fn new(batch_size: usize) -> Self {
        Self::with_limit(batch_size, DEFAULT_MAX_SESSIONS)
    }

    /// Store holding at most `max_sessions` viewers; the least recently
    /// seen one is evicted to make room for a new viewer.
    pub fn with_limit(batch_size: usize, max_sessions: usize) -> Self {
        Self {
            batch_size,
            max_sessions: max_sessions.max(1),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Run `f` against the viewer's state, creating it on first use
    pub fn with_session<T>(&self, id: &SessionId, f: impl FnOnce(&mut PaginationState) -> T) -> T {
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if !sessions.contains_key(id) && sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                tracing::debug!(evicted = %oldest, "Session limit reached");
            }
        }

        let entry = sessions.entry(id.clone()).or_insert_with(|| SessionEntry {
            state: PaginationState::new(self.batch_size),
            last_seen: Instant::now(),
        });
        entry.last_seen = Instant::now();
        f(&mut entry.state)
    }

    pub fn remove(&self, id: &SessionId) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    /// Drop sessions idle for at least `ttl`; returns how many went
    pub fn sweep_expired(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < ttl);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Background task evicting idle sessions
pub struct SessionSweeper {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl SessionSweeper {
    /// Sweep every `ttl / 2` (at least once a second). Must run inside a tokio runtime.
    pub fn start(store: Arc<SessionStore>, ttl: Duration) -> Self {
        let period = (ttl / 2).max(Duration::from_secs(1));
        let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let evicted = store.sweep_expired(ttl);
                        if evicted > 0 {
                            tracing::info!(evicted, live = store.len(), "Expired sessions evicted");
                        }
                    }
                }
            }
        });

        Self { shutdown, handle }
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.handle.await {
            tracing::warn!("Session sweeper ended abnormally: {}", e);
        }
    }
}
