//! # Query Engine
//!
//! Filters and sorts the catalog for a set of user criteria. Steps run in a
//! fixed order: category, text search, price range, stock, then a stable
//! sort. An empty result is a normal outcome.

use crate::catalog::{Catalog, Product};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Category filter value that disables category filtering
pub const ALL_CATEGORIES: &str = "All";

/// Result ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    PriceAsc,
    PriceDesc,
    #[default]
    RatingDesc,
}

impl SortMode {
    pub fn all() -> [SortMode; 3] {
        [SortMode::PriceAsc, SortMode::PriceDesc, SortMode::RatingDesc]
    }

    /// Label shown in the sort dropdown
    pub fn label(&self) -> &'static str {
        match self {
            SortMode::PriceAsc => "Price: Low to High",
            SortMode::PriceDesc => "Price: High to Low",
            SortMode::RatingDesc => "Rating",
        }
    }

    /// Form/query-string value
    pub fn slug(&self) -> &'static str {
        match self {
            SortMode::PriceAsc => "price_asc",
            SortMode::PriceDesc => "price_desc",
            SortMode::RatingDesc => "rating",
        }
    }

    fn compare(&self, a: &Product, b: &Product) -> Ordering {
        match self {
            SortMode::PriceAsc => price_key(a).total_cmp(&price_key(b)),
            SortMode::PriceDesc => price_key(b).total_cmp(&price_key(a)),
            SortMode::RatingDesc => rating_key(b).total_cmp(&rating_key(a)),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SortMode {
    type Err = String;

    /// Accepts slugs and dropdown labels, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        SortMode::all()
            .into_iter()
            .find(|m| m.slug() == needle || m.label().to_ascii_lowercase() == needle)
            .ok_or_else(|| format!("unknown sort mode: {}", s))
    }
}

fn price_key(p: &Product) -> f64 {
    p.price.unwrap_or(f64::INFINITY)
}

/// Missing ratings sort below every real rating
fn rating_key(p: &Product) -> f64 {
    p.rating.unwrap_or(f64::NEG_INFINITY)
}

/// User-supplied filter and sort settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryCriteria {
    pub category_filter: String,
    pub search_text: String,
    pub min_price: f64,
    pub max_price: f64,
    pub in_stock_only: bool,
    pub sort_mode: SortMode,
}

impl Default for QueryCriteria {
    fn default() -> Self {
        Self {
            category_filter: ALL_CATEGORIES.to_string(),
            search_text: String::new(),
            min_price: 0.0,
            max_price: 1000.0,
            in_stock_only: false,
            sort_mode: SortMode::RatingDesc,
        }
    }
}

impl QueryCriteria {
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category_filter = category.into();
        self
    }

    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search_text = text.into();
        self
    }

    pub fn with_price_range(mut self, min: f64, max: f64) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn in_stock_only(mut self, only: bool) -> Self {
        self.in_stock_only = only;
        self
    }

    pub fn sorted_by(mut self, mode: SortMode) -> Self {
        self.sort_mode = mode;
        self
    }

    fn filters_category(&self) -> bool {
        let category = self.category_filter.trim();
        !category.is_empty() && category != ALL_CATEGORIES
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Run the full filter + sort pipeline
pub fn filter<'a>(catalog: &'a Catalog, criteria: &QueryCriteria) -> Vec<&'a Product> {
    let category = criteria
        .filters_category()
        .then(|| criteria.category_filter.trim().to_lowercase());
    let search = criteria.search_text.to_lowercase();

    let mut results: Vec<&Product> = catalog
        .all()
        .iter()
        .filter(|p| match &category {
            Some(c) => contains_ci(&p.category, c),
            None => true,
        })
        .filter(|p| {
            search.is_empty()
                || contains_ci(&p.title, &search)
                || contains_ci(&p.brand, &search)
                || contains_ci(&p.category, &search)
        })
        .filter(|p| {
            p.price
                .is_some_and(|price| criteria.min_price <= price && price <= criteria.max_price)
        })
        .filter(|p| !criteria.in_stock_only || p.in_stock)
        .collect();

    // `sort_by` is stable, so equal keys keep source order
    results.sort_by(|a, b| criteria.sort_mode.compare(a, b));

    tracing::debug!(
        category = %criteria.category_filter,
        search = %criteria.search_text,
        sort = criteria.sort_mode.slug(),
        matches = results.len(),
        "Catalog filtered"
    );

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::product;

    fn ids(products: &[&Product]) -> Vec<String> {
        products.iter().map(|p| p.id.clone()).collect()
    }

    fn rated(id: &str, rating: Option<f64>) -> Product {
        let mut p = product(id, "Item", "Home", 10.0);
        p.rating = rating;
        p
    }

    #[test]
    fn test_category_filter_is_case_insensitive_substring() {
        let catalog = Catalog::from_products(vec![
            product("1", "Mug", "Home & Kitchen", 5.0),
            product("2", "Soap", "Beauty", 5.0),
        ]);
        let criteria = QueryCriteria::default().with_category("kitchen");
        assert_eq!(ids(&filter(&catalog, &criteria)), ["1"]);

        let criteria = QueryCriteria::default().with_category(ALL_CATEGORIES);
        assert_eq!(filter(&catalog, &criteria).len(), 2);
    }

    #[test]
    fn test_search_matches_title_brand_or_category() {
        let mut by_brand = product("2", "Cloth", "Cleaning", 5.0);
        by_brand.brand = "GreenCo".to_string();
        let catalog = Catalog::from_products(vec![
            product("1", "Green Tea Tin", "Pantry", 5.0),
            by_brand,
            product("3", "Towel", "Greenhouse", 5.0),
            product("4", "Plate", "Kitchen", 5.0),
        ]);

        let criteria = QueryCriteria::default()
            .with_search("GREEN")
            .sorted_by(SortMode::PriceAsc);
        assert_eq!(ids(&filter(&catalog, &criteria)), ["1", "2", "3"]);
    }

    #[test]
    fn test_price_bounds_are_inclusive() {
        let catalog = Catalog::from_products(vec![
            product("low", "A", "Home", 10.0),
            product("mid", "B", "Home", 15.0),
            product("high", "C", "Home", 20.0),
            product("out", "D", "Home", 20.01),
        ]);
        let criteria = QueryCriteria::default()
            .with_price_range(10.0, 20.0)
            .sorted_by(SortMode::PriceAsc);
        assert_eq!(ids(&filter(&catalog, &criteria)), ["low", "mid", "high"]);
    }

    #[test]
    fn test_in_stock_only() {
        let mut sold_out = product("2", "B", "Home", 5.0);
        sold_out.in_stock = false;
        let catalog = Catalog::from_products(vec![product("1", "A", "Home", 5.0), sold_out]);

        let criteria = QueryCriteria::default().in_stock_only(true);
        assert_eq!(ids(&filter(&catalog, &criteria)), ["1"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let catalog = Catalog::from_products(vec![
            product("a", "A", "Home", 5.0),
            product("b", "B", "Home", 3.0),
            product("c", "C", "Home", 5.0),
            product("d", "D", "Home", 3.0),
        ]);

        let asc = QueryCriteria::default().sorted_by(SortMode::PriceAsc);
        assert_eq!(ids(&filter(&catalog, &asc)), ["b", "d", "a", "c"]);

        let desc = QueryCriteria::default().sorted_by(SortMode::PriceDesc);
        assert_eq!(ids(&filter(&catalog, &desc)), ["a", "c", "b", "d"]);
    }

    #[test]
    fn test_missing_rating_sorts_lowest() {
        let catalog = Catalog::from_products(vec![
            rated("none", None),
            rated("mid", Some(3.5)),
            rated("top", Some(4.8)),
            rated("zero", Some(0.0)),
        ]);
        let criteria = QueryCriteria::default().sorted_by(SortMode::RatingDesc);
        assert_eq!(ids(&filter(&catalog, &criteria)), ["top", "mid", "zero", "none"]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let catalog = Catalog::from_products((0..30).map(|i| {
            product(&i.to_string(), "Item", "Home", (i % 4) as f64)
        }));
        let criteria = QueryCriteria::default().sorted_by(SortMode::PriceDesc);
        assert_eq!(filter(&catalog, &criteria), filter(&catalog, &criteria));
    }

    #[test]
    fn test_search_text_is_matched_verbatim() {
        let catalog = Catalog::from_products(vec![
            product("1", "Eco Bag", "Home", 5.0),
            product("2", "Teapot", "Kitchen", 5.0),
        ]);

        // Whitespace is part of the needle, not trimmed away
        let criteria = QueryCriteria::default().with_search(" ");
        assert_eq!(ids(&filter(&catalog, &criteria)), ["1"]);

        let criteria = QueryCriteria::default().with_search("eco bag ");
        assert!(filter(&catalog, &criteria).is_empty());

        let criteria = QueryCriteria::default().with_search("");
        assert_eq!(filter(&catalog, &criteria).len(), 2);
    }

    #[test]
    fn test_no_matches_is_empty() {
        let catalog = Catalog::from_products(vec![product("1", "A", "Home", 5.0)]);
        let criteria = QueryCriteria::default().with_search("nothing like this");
        assert!(filter(&catalog, &criteria).is_empty());
    }

    #[test]
    fn test_sort_mode_parsing() {
        assert_eq!("price_asc".parse::<SortMode>(), Ok(SortMode::PriceAsc));
        assert_eq!("Price: High to Low".parse::<SortMode>(), Ok(SortMode::PriceDesc));
        assert_eq!("rating".parse::<SortMode>(), Ok(SortMode::RatingDesc));
        assert!("cheapest".parse::<SortMode>().is_err());
    }

    #[test]
    fn test_sort_mode_serialization() {
        let json = serde_json::to_string(&SortMode::PriceDesc).unwrap();
        assert_eq!(json, "\"price_desc\"");
    }
}
