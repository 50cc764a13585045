//! # Renderer
//!
//! Turns result sets into HTML fragments for the display surface. All
//! user-visible text is escaped; nothing here touches state.

use crate::catalog::Product;
use crate::impact::ImpactTable;
use crate::query::{QueryCriteria, SortMode, ALL_CATEGORIES};
use std::fmt::Write;

pub const TITLE_MAX_CHARS: usize = 50;
pub const DESCRIPTION_MAX_CHARS: usize = 150;
const ELLIPSIS: &str = "...";

/// Markup for an empty result set
pub const EMPTY_STATE: &str = "<div class='card empty'>❌ No products found.</div>";

/// HTML-escape a string for text or attribute context
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Cut to `max - 3` chars plus `...` when longer than `max`
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

pub fn format_price(price: Option<f64>) -> String {
    match price {
        Some(p) => format!("${:.2}", p),
        None => "N/A".to_string(),
    }
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Render a batch as a card grid, or the empty-state card
pub fn render_products(products: &[&Product], impacts: &ImpactTable) -> String {
    if products.is_empty() {
        return EMPTY_STATE.to_string();
    }

    let mut html = String::from("<div class='grid-container'>");
    for product in products {
        html.push_str(&render_card(product, impacts));
    }
    html.push_str("</div>");
    html
}

fn render_card(product: &Product, impacts: &ImpactTable) -> String {
    let title = truncate(or_default(&product.title, "Unknown Product"), TITLE_MAX_CHARS);
    let description = truncate(
        or_default(&product.description, "No description available."),
        DESCRIPTION_MAX_CHARS,
    );
    let rating = product
        .rating
        .map(|r| r.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let category = or_default(&product.category, "Eco Product");
    let url = or_default(&product.url, "#");

    let image = match &product.image_url {
        Some(src) => format!(
            "<img src='{}' alt='' style='width:120px; height:120px; object-fit:cover; border-radius:10px;'/>",
            html_escape(src)
        ),
        None => String::new(),
    };

    // Matched against the displayed (truncated) title
    let impact = match impacts.lookup(&title) {
        Some(sentence) => format!("<div class='impact'>{}</div>", html_escape(sentence)),
        None => String::new(),
    };

    format!(
        "<div class='card' title='Rating: {rating}' data-desc='{desc}'>{image}\
         <h3>{title}</h3>\
         <p class='price'>{price}</p>\
         <p class='category'>Category: {category}</p>\
         <p>{stock}</p>\
         {impact}\
         <a href='{url}' target='_blank' rel='noopener'>View Product</a>\
         </div>",
        rating = html_escape(&rating),
        desc = html_escape(&description),
        image = image,
        title = html_escape(&title),
        price = format_price(product.price),
        category = html_escape(category),
        stock = html_escape(&product.in_stock_text),
        impact = impact,
        url = html_escape(url),
    )
}

pub fn render_quote(text: &str) -> String {
    format!("<div class='quote-box'>{}</div>", html_escape(text))
}

/// Everything the full page needs
pub struct PageContext<'a> {
    pub categories: &'a [String],
    pub criteria: &'a QueryCriteria,
    pub quote: &'a str,
    /// Already-rendered initial grid
    pub products_html: &'a str,
    pub quote_refresh_secs: f64,
}

/// Full HTML shell: filters, grid, quote box, footer
pub fn render_page(ctx: &PageContext<'_>) -> String {
    let mut category_options = String::new();
    for category in std::iter::once(ALL_CATEGORIES).chain(ctx.categories.iter().map(String::as_str)) {
        let selected = if category == ctx.criteria.category_filter {
            " selected"
        } else {
            ""
        };
        let escaped = html_escape(category);
        let _ = write!(
            category_options,
            "<option value='{escaped}'{selected}>{escaped}</option>"
        );
    }

    let mut sort_options = String::new();
    for mode in SortMode::all() {
        let selected = if mode == ctx.criteria.sort_mode {
            " selected"
        } else {
            ""
        };
        let _ = write!(
            sort_options,
            "<option value='{}'{}>{}</option>",
            mode.slug(),
            selected,
            mode.label()
        );
    }

    let in_stock = if ctx.criteria.in_stock_only { " checked" } else { "" };
    // htmx polling takes whole seconds or milliseconds; use ms
    let refresh_ms = (ctx.quote_refresh_secs * 1000.0).round().max(1.0) as u64;

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>EcoShelf</title>
<link rel="stylesheet" href="/static/style.css">
<script src="https://unpkg.com/htmx.org@1.9.12"></script>
</head>
<body>
<main class="container">
<form id="filters" class="filters" hx-post="/htmx/products/show" hx-target="#products" hx-swap="innerHTML">
  <label>Search <input type="text" name="q" value="{search}"></label>
  <label>Category <select name="category">{category_options}</select></label>
  <label>Sort By <select name="sort">{sort_options}</select></label>
  <label>Min Price <input type="number" step="any" name="min_price" value="{min_price}"></label>
  <label>Max Price <input type="number" step="any" name="max_price" value="{max_price}"></label>
  <label class="check"><input type="checkbox" name="in_stock"{in_stock}> In Stock Only</label>
  <div class="actions">
    <button type="submit">🔍 Show Products</button>
    <button type="button" hx-post="/htmx/products/more" hx-include="#filters" hx-target="#products" hx-swap="innerHTML">➕ Load More</button>
  </div>
</form>
<section id="products">{products}</section>
<section id="quote" hx-get="/htmx/quote" hx-trigger="every {refresh_ms}ms" hx-swap="innerHTML">{quote}</section>
<footer class="footer">EcoShelf · small choices, big changes</footer>
</main>
</body>
</html>"##,
        search = html_escape(&ctx.criteria.search_text),
        category_options = category_options,
        sort_options = sort_options,
        min_price = ctx.criteria.min_price,
        max_price = ctx.criteria.max_price,
        in_stock = in_stock,
        products = ctx.products_html,
        refresh_ms = refresh_ms,
        quote = render_quote(ctx.quote),
    )
}
