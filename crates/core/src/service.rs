//! # Catalog Service
//!
//! The display-surface commands: show, load more, initial random batch and
//! current quote. Each call runs to completion synchronously against the
//! immutable catalog and the caller's own session state.

use crate::catalog::{Catalog, Product};
use crate::config::AppConfig;
use crate::impact::ImpactTable;
use crate::query::{filter, QueryCriteria};
use crate::quotes::{QuoteFeed, QuoteSnapshot};
use crate::render::{render_page, render_products, render_quote, PageContext};
use crate::session::{SessionId, SessionStore};
use std::sync::Arc;

pub struct CatalogService {
    catalog: Arc<Catalog>,
    impacts: ImpactTable,
    sessions: Arc<SessionStore>,
    quotes: QuoteFeed,
    categories: Vec<String>,
    quote_refresh_secs: f64,
}

impl CatalogService {
    pub fn new(catalog: Catalog, impacts: ImpactTable, quotes: QuoteFeed, config: &AppConfig) -> Self {
        let categories = catalog.categories();
        Self {
            catalog: Arc::new(catalog),
            impacts,
            sessions: Arc::new(SessionStore::with_limit(config.batch_size, config.max_sessions)),
            quotes,
            categories,
            quote_refresh_secs: config.rotation_interval_secs,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn sessions(&self) -> Arc<SessionStore> {
        Arc::clone(&self.sessions)
    }

    /// Dropdown categories, without the "All" entry
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Fresh query: resets the viewer's pagination and renders the first batch
    #[tracing::instrument(skip(self, session, criteria), fields(session = %session))]
    pub fn show_products(&self, session: &SessionId, criteria: &QueryCriteria) -> String {
        let batch = self
            .sessions
            .with_session(session, |state| state.start_query(&self.catalog, criteria));
        tracing::debug!(shown = batch.len(), "Show products");
        render_products(&batch, &self.impacts)
    }

    /// Next batch appended to everything already shown
    #[tracing::instrument(skip(self, session, criteria), fields(session = %session))]
    pub fn load_more(&self, session: &SessionId, criteria: &QueryCriteria) -> String {
        let shown = self
            .sessions
            .with_session(session, |state| state.load_more(&self.catalog, criteria));
        tracing::debug!(shown = shown.len(), "Load more");
        render_products(&shown, &self.impacts)
    }

    /// Random batch for the initial view; becomes the viewer's shown set
    pub fn initial_random_batch(&self, session: &SessionId) -> String {
        let batch = self.sessions.with_session(session, |state| {
            state.start_random(&self.catalog, &mut rand::thread_rng())
        });
        render_products(&batch, &self.impacts)
    }

    /// Quote-box markup for the latest quote
    pub fn current_quote(&self) -> String {
        render_quote(&self.quotes.current().text)
    }

    pub fn quote_snapshot(&self) -> QuoteSnapshot {
        self.quotes.current()
    }

    pub fn quote_feed(&self) -> QuoteFeed {
        self.quotes.clone()
    }

    /// Every match, unpaginated
    pub fn search(&self, criteria: &QueryCriteria) -> Vec<&Product> {
        filter(&self.catalog, criteria)
    }

    /// Full page with a fresh random batch
    pub fn page(&self, session: &SessionId) -> String {
        let products_html = self.initial_random_batch(session);
        let quote = self.quotes.current();
        render_page(&PageContext {
            categories: &self.categories,
            criteria: &QueryCriteria::default(),
            quote: &quote.text,
            products_html: &products_html,
            quote_refresh_secs: self.quote_refresh_secs,
        })
    }
}
