//! # Quote Rotator
//!
//! A background task that swaps the "current quote" on a fixed interval.
//!
//! ## Architecture
//!
//! ```text
//! QuoteRotator (single writer) ──watch──► QuoteFeed (any number of readers)
//! ```
//!
//! Readers never block the writer; each one sees the latest snapshot and may
//! lag by up to one interval. Dropping the rotator (or calling
//! [`QuoteRotator::stop`]) ends the task.

use crate::error::QuoteError;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Built-in motivational quotes
pub const DEFAULT_QUOTES: &[&str] = &[
    "🌍 Small choices, big changes.",
    "♻️ Every eco-friendly swap plants a seed for tomorrow.",
    "🌱 A bamboo brush today keeps plastic away.",
    "🌿 Be the change you shop for.",
    "🌎 Plastic lasts 500 years, your choice lasts forever.",
    "💧 Save water, save life.",
    "🌞 Renewable is reliable.",
    "🍃 The Earth doesn’t need more stuff, it needs better stuff.",
    "🌏 Consume less, choose wise.",
    "🌲 A greener choice is a cleaner future.",
    "🌍 You don’t need to be perfect, just better than yesterday.",
    "🌱 One toothbrush less, a million smiles more.",
    "♻️ What you buy today builds tomorrow.",
    "🌿 Nature is not a place to visit, it’s home.",
    "🌞 Sustainable is beautiful.",
    "🌊 Every drop counts; save water, save life.",
    "🍀 Eco choices today are gifts for tomorrow.",
    "🌟 Green living is smart living.",
    "💚 Protect the planet, protect yourself.",
    "🌺 A cleaner Earth starts with mindful habits.",
    "🌾 Small eco steps create huge impact.",
    "🌐 Go green, think global, act local.",
    "🔥 Reduce waste, light the path for future generations.",
    "🍎 Eat consciously, live sustainably.",
    "🌸 Nature thrives when you choose wisely.",
    "🌙 Less consumption, more conservation.",
    "💡 Energy saved is a planet saved.",
    "🌻 Plant trees, grow hope.",
    "🌱 Minimalism is sustainability in action.",
    "🌏 Care for the Earth—it’s the only home we have.",
    "♻️ Waste less, live more.",
    "🌿 Green habits, brighter future.",
    "💧 Clean water, clear conscience.",
    "🌞 Sun-powered is future-powered.",
    "🌍 Your choices echo through generations.",
    "🌲 Forests are worth more than gold—protect them.",
    "🍃 Reduce, reuse, rethink.",
    "🌸 Live lightly, tread softly.",
    "🌾 Sustainability is love for the next generation.",
    "💚 Small actions, massive change.",
];

/// The value held in the quote cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub text: String,
    /// 0 for the initial pick, incremented on every rotation
    pub sequence: u64,
    pub rotated_at: DateTime<Utc>,
}

impl QuoteSnapshot {
    fn new(text: &str, sequence: u64) -> Self {
        Self {
            text: text.to_string(),
            sequence,
            rotated_at: Utc::now(),
        }
    }
}

/// Read side of the quote cell
#[derive(Debug, Clone)]
pub struct QuoteFeed {
    rx: watch::Receiver<QuoteSnapshot>,
}

impl QuoteFeed {
    /// A feed that never changes; useful when no rotator is running
    pub fn fixed(text: impl Into<String>) -> Self {
        let snapshot = QuoteSnapshot {
            text: text.into(),
            sequence: 0,
            rotated_at: Utc::now(),
        };
        let (_tx, rx) = watch::channel(snapshot);
        Self { rx }
    }

    /// Latest published quote
    pub fn current(&self) -> QuoteSnapshot {
        self.rx.borrow().clone()
    }

    /// Wait for the next rotation. `None` once the rotator has stopped.
    pub async fn changed(&mut self) -> Option<QuoteSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// Owns the background rotation task
pub struct QuoteRotator {
    feed: QuoteFeed,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl QuoteRotator {
    /// Start rotating with an entropy-seeded RNG. Must run inside a tokio runtime.
    pub fn start<S: AsRef<str>>(
        quotes: impl IntoIterator<Item = S>,
        interval: Duration,
    ) -> Result<Self, QuoteError> {
        Self::start_with_rng(quotes, interval, StdRng::from_entropy())
    }

    pub fn start_with_rng<S: AsRef<str>>(
        quotes: impl IntoIterator<Item = S>,
        interval: Duration,
        mut rng: StdRng,
    ) -> Result<Self, QuoteError> {
        let quotes: Vec<String> = quotes.into_iter().map(|q| q.as_ref().to_string()).collect();
        if interval.is_zero() {
            return Err(QuoteError::ZeroInterval);
        }
        let first = quotes.choose(&mut rng).ok_or(QuoteError::Empty)?;

        let (tx, rx) = watch::channel(QuoteSnapshot::new(first, 0));
        let (shutdown, shutdown_rx) = oneshot::channel();

        tracing::info!(
            quotes = quotes.len(),
            interval_ms = interval.as_millis() as u64,
            "Quote rotator started"
        );

        let handle = tokio::spawn(rotate(tx, quotes, interval, rng, shutdown_rx));

        Ok(Self {
            feed: QuoteFeed { rx },
            shutdown,
            handle,
        })
    }

    pub fn feed(&self) -> QuoteFeed {
        self.feed.clone()
    }

    /// Signal the task and wait for it to exit
    pub async fn stop(self) {
        let QuoteRotator {
            shutdown, handle, ..
        } = self;
        let _ = shutdown.send(());
        if let Err(e) = handle.await {
            tracing::warn!("Quote rotator task ended abnormally: {}", e);
        }
        tracing::info!("Quote rotator stopped");
    }
}

async fn rotate(
    tx: watch::Sender<QuoteSnapshot>,
    quotes: Vec<String>,
    interval: Duration,
    mut rng: StdRng,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut sequence = 0u64;

    loop {
        tokio::select! {
            // Fires on an explicit stop and when the rotator handle is dropped
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                sequence += 1;
                if let Some(text) = quotes.choose(&mut rng) {
                    tx.send_replace(QuoteSnapshot::new(text, sequence));
                    tracing::debug!(sequence, "Quote rotated");
                }
            }
        }
    }
}
