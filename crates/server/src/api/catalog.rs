//! # Catalog API
//!
//! HTMX fragment endpoints for the product grid plus a small JSON surface.

use axum::{
    extract::{Form, Query, State},
    response::Html,
    Json,
};
use ecoshelf_core::query::ALL_CATEGORIES;
use ecoshelf_core::{Product, QueryCriteria};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;
use utoipa::{IntoParams, ToSchema};

use crate::session::viewer_session;
use crate::SharedState;

/// Filter form as posted by the page (every field optional, all strings,
/// since empty number inputs arrive as "")
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FilterForm {
    /// Free-text search over title, brand and category
    pub q: Option<String>,
    /// Category substring, "All" for no filter
    pub category: Option<String>,
    /// `price_asc`, `price_desc`, `rating`, or a dropdown label
    pub sort: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    /// Checkbox value; present means checked
    pub in_stock: Option<String>,
}

impl FilterForm {
    /// Lenient conversion: blank or unparseable fields fall back to defaults
    pub fn to_criteria(&self) -> QueryCriteria {
        let defaults = QueryCriteria::default();

        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(ALL_CATEGORIES);

        let sort_mode = match self.sort.as_deref().map(str::trim) {
            None | Some("") => defaults.sort_mode,
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::debug!("{}, using default sort", e);
                defaults.sort_mode
            }),
        };

        QueryCriteria {
            category_filter: category.to_string(),
            search_text: self.q.clone().unwrap_or_default(),
            min_price: parse_number(self.min_price.as_deref()).unwrap_or(defaults.min_price),
            max_price: parse_number(self.max_price.as_deref()).unwrap_or(defaults.max_price),
            in_stock_only: self.in_stock.as_deref().is_some_and(is_checked),
            sort_mode,
        }
    }
}

fn parse_number(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

fn is_checked(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "on" | "true" | "1" | "yes"
    )
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductSummary {
    pub id: String,
    pub title: String,
    pub brand: String,
    pub category: String,
    pub price: Option<f64>,
    pub rating: Option<f64>,
    pub in_stock: bool,
    pub url: String,
    pub image_url: Option<String>,
}

impl From<&Product> for ProductSummary {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id.clone(),
            title: p.title.clone(),
            brand: p.brand.clone(),
            category: p.category.clone(),
            price: p.price,
            rating: p.rating,
            in_stock: p.in_stock,
            url: p.url.clone(),
            image_url: p.image_url.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    pub total: usize,
    pub products: Vec<ProductSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoriesResponse {
    pub categories: Vec<String>,
}

// === Page + HTMX Handlers ===

/// Full page with a random initial batch
pub async fn index(State(state): State<SharedState>, cookies: Cookies) -> Html<String> {
    let session = viewer_session(&cookies);
    Html(state.service.page(&session))
}

/// "Show Products": reset this viewer's pagination and render the first batch
pub async fn show_products(
    State(state): State<SharedState>,
    cookies: Cookies,
    Form(form): Form<FilterForm>,
) -> Html<String> {
    let session = viewer_session(&cookies);
    Html(state.service.show_products(&session, &form.to_criteria()))
}

/// "Load More": cumulative grid including the next batch
pub async fn load_more(
    State(state): State<SharedState>,
    cookies: Cookies,
    Form(form): Form<FilterForm>,
) -> Html<String> {
    let session = viewer_session(&cookies);
    Html(state.service.load_more(&session, &form.to_criteria()))
}

/// Fresh random batch, replacing this viewer's shown set
pub async fn random_products(State(state): State<SharedState>, cookies: Cookies) -> Html<String> {
    let session = viewer_session(&cookies);
    Html(state.service.initial_random_batch(&session))
}

// === JSON Handlers ===

/// List product categories
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "catalog",
    responses(
        (status = 200, description = "Sorted category names", body = CategoriesResponse)
    )
)]
pub async fn list_categories(State(state): State<SharedState>) -> Json<CategoriesResponse> {
    Json(CategoriesResponse {
        categories: state.service.categories().to_vec(),
    })
}

/// Search the catalog without pagination
#[utoipa::path(
    get,
    path = "/api/v1/products/search",
    tag = "catalog",
    params(FilterForm),
    responses(
        (status = 200, description = "Every matching product in sort order", body = SearchResponse)
    )
)]
pub async fn search_products(
    State(state): State<SharedState>,
    Query(form): Query<FilterForm>,
) -> Json<SearchResponse> {
    let products: Vec<ProductSummary> = state
        .service
        .search(&form.to_criteria())
        .into_iter()
        .map(ProductSummary::from)
        .collect();

    Json(SearchResponse {
        total: products.len(),
        products,
    })
}
