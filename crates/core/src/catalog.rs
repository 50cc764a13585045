//! # Catalog Store
//!
//! The cleaned, immutable product table. Loaded once from CSV at startup
//! and shared read-only for the lifetime of the process.
//!
//! Cleaning rules:
//! - `price` may carry a leading `$`; anything that still fails to parse as a
//!   finite, non-negative decimal drops the whole record.
//! - `rating` is optional; unparseable values become `None`.
//! - duplicate ids keep the first occurrence.

use crate::error::CatalogError;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

/// Columns the source table must provide.
pub const REQUIRED_COLUMNS: [&str; 11] = [
    "id",
    "title",
    "brand",
    "category",
    "price",
    "rating",
    "inStock",
    "inStockText",
    "url",
    "img_url",
    "description",
];

/// A single cleaned catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub brand: String,
    pub category: String,
    /// Always `Some` for products that made it into a [`Catalog`]
    pub price: Option<f64>,
    pub rating: Option<f64>,
    pub in_stock: bool,
    pub in_stock_text: String,
    pub url: String,
    pub image_url: Option<String>,
    pub description: String,
}

/// One raw row of the source table, before cleaning
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub rating: String,
    #[serde(default, rename = "inStock")]
    pub in_stock: String,
    #[serde(default, rename = "inStockText")]
    pub in_stock_text: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, rename = "img_url")]
    pub image_url: String,
    #[serde(default)]
    pub description: String,
}

/// Counts collected while cleaning the source table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub kept: usize,
    pub dropped_price: usize,
    pub dropped_duplicate: usize,
}

/// The immutable in-memory product table
#[derive(Debug, Default)]
pub struct Catalog {
    products: Vec<Product>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Load and clean a CSV file
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, LoadReport), CatalogError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let (catalog, report) = Self::from_reader(file)?;

        tracing::info!(
            path = %path.display(),
            kept = report.kept,
            dropped_price = report.dropped_price,
            dropped_duplicate = report.dropped_duplicate,
            "Catalog loaded"
        );

        Ok((catalog, report))
    }

    /// Load and clean CSV from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<(Self, LoadReport), CatalogError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(CatalogError::MissingColumn(column));
            }
        }

        let records = reader
            .deserialize::<CatalogRecord>()
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::from_records(records))
    }

    /// Clean already-parsed rows
    pub fn from_records(records: impl IntoIterator<Item = CatalogRecord>) -> (Self, LoadReport) {
        let mut catalog = Catalog::default();
        let mut report = LoadReport::default();

        for (row, record) in records.into_iter().enumerate() {
            let Some(price) = parse_price(&record.price) else {
                tracing::debug!(id = %record.id, raw = %record.price, "Dropping record with malformed price");
                report.dropped_price += 1;
                continue;
            };

            let id = if record.id.trim().is_empty() {
                format!("row-{}", row)
            } else {
                record.id.trim().to_string()
            };

            let product = Product {
                id,
                title: record.title,
                brand: record.brand,
                category: record.category,
                price: Some(price),
                rating: parse_rating(&record.rating),
                in_stock: parse_flag(&record.in_stock),
                in_stock_text: record.in_stock_text,
                url: record.url,
                image_url: non_empty(record.image_url),
                description: record.description,
            };

            if !catalog.push(product) {
                report.dropped_duplicate += 1;
            }
        }

        report.kept = catalog.len();
        (catalog, report)
    }

    /// Build from products that are already clean. Products without a
    /// valid price are skipped so the catalog invariant still holds.
    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Self {
        let mut catalog = Catalog::default();
        for product in products {
            let valid = product.price.is_some_and(|p| p.is_finite() && p >= 0.0);
            if valid {
                catalog.push(product);
            }
        }
        catalog
    }

    fn push(&mut self, product: Product) -> bool {
        if self.index.contains_key(&product.id) {
            tracing::warn!(id = %product.id, "Duplicate product id, keeping first occurrence");
            return false;
        }
        self.index.insert(product.id.clone(), self.products.len());
        self.products.push(product);
        true
    }

    /// Every product, in source order
    pub fn all(&self) -> &[Product] {
        &self.products
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.index.get(id).map(|&i| &self.products[i])
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Uniform random selection without replacement
    pub fn sample(&self, n: usize) -> Vec<&Product> {
        self.sample_with(&mut rand::thread_rng(), n)
    }

    /// Like [`Catalog::sample`] with a caller-supplied RNG.
    /// Asking for more than the catalog holds returns everything.
    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<&Product> {
        self.products.choose_multiple(rng, n).collect()
    }

    /// Sorted, de-duplicated category names
    pub fn categories(&self) -> Vec<String> {
        self.products
            .iter()
            .map(|p| p.category.trim())
            .filter(|c| !c.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

/// Parse a raw price field like `"$12.34"` or `"12.34"`.
///
/// Returns `None` for anything that is not a finite, non-negative number
/// once the currency symbol and surrounding whitespace are gone.
pub fn parse_price(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed).trim();
    let price: f64 = trimmed.parse().ok()?;
    (price.is_finite() && price >= 0.0).then_some(price)
}

fn parse_rating(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|r| r.is_finite())
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "y"
    )
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
