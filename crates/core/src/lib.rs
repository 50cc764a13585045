//! # EcoShelf Core
//!
//! Everything behind the catalog browser: the product table, the query
//! pipeline, per-viewer pagination, HTML rendering and the quote rotator.
//!
//! ## Architecture
//!
//! - `catalog` - CSV loading, price cleaning, read-only product table
//! - `impact` - ordered keyword → impact sentence lookup
//! - `quotes` - background quote rotation over a `watch` cell
//! - `query` - filter and stable sort for user criteria
//! - `session` - shown-id tracking and the per-viewer session store
//! - `render` - card grid, quote box and page shell markup
//! - `service` - the display-surface commands tying it together
//! - `config` / `error` - layered settings and typed failures
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ecoshelf_core::{AppConfig, Catalog, CatalogService, ImpactTable, QuoteRotator, SessionId};
//!
//! let config = AppConfig::load(None)?;
//! let (catalog, _report) = Catalog::load(&config.catalog_path)?;
//! let rotator = QuoteRotator::start(DEFAULT_QUOTES.iter(), config.rotation_interval())?;
//! let service = CatalogService::new(catalog, ImpactTable::default(), rotator.feed(), &config);
//!
//! let html = service.initial_random_batch(&SessionId::generate());
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod impact;
pub mod query;
pub mod quotes;
pub mod render;
pub mod service;
pub mod session;

pub use catalog::{Catalog, LoadReport, Product};
pub use config::AppConfig;
pub use error::{CatalogError, ConfigError, QuoteError};
pub use impact::ImpactTable;
pub use query::{filter, QueryCriteria, SortMode};
pub use quotes::{QuoteFeed, QuoteRotator, QuoteSnapshot, DEFAULT_QUOTES};
pub use service::CatalogService;
pub use session::{PaginationState, SessionId, SessionStore, SessionSweeper};
