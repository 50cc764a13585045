//! EcoShelf Server
//!
//! Axum server for the eco-friendly product browser: server-rendered HTMX
//! page, fragment endpoints, a small JSON API and the embedded stylesheet.

mod api;
mod assets;
mod session;

use anyhow::Context;
use axum::{
    extract::State,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use clap::{Args as ClapArgs, Parser, Subcommand};
use ecoshelf_core::render::format_price;
use ecoshelf_core::{
    AppConfig, Catalog, CatalogService, ImpactTable, QueryCriteria, QuoteRotator,
    SessionSweeper, SortMode, DEFAULT_QUOTES,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::{OpenApi, ToSchema};

/// Application state
pub struct AppState {
    pub service: CatalogService,
    pub config: AppConfig,
}

pub type SharedState = Arc<AppState>;

#[derive(Parser, Clone)]
#[command(author, version, about = "EcoShelf - Eco-friendly product browser")]
struct Args {
    /// JSON config file (defaults to ./ecoshelf.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Start the web server (default)
    Serve(ServeArgs),
    /// Load the catalog and report what was kept
    Check {
        /// CSV product table
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Run one query against the catalog and print the matches
    Query {
        #[arg(long)]
        catalog: Option<PathBuf>,
        #[arg(long, default_value = "All")]
        category: String,
        #[arg(short, long, default_value = "")]
        search: String,
        /// price_asc, price_desc or rating
        #[arg(long, default_value = "rating")]
        sort: SortMode,
        #[arg(long, default_value_t = 0.0)]
        min_price: f64,
        #[arg(long, default_value_t = 1000.0)]
        max_price: f64,
        #[arg(long)]
        in_stock: bool,
        /// Maximum number of rows to print
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(ClapArgs, Clone, Default)]
struct ServeArgs {
    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
    /// Interface to bind
    #[arg(long)]
    host: Option<String>,
    /// CSV product table
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// Products per batch
    #[arg(long)]
    batch_size: Option<usize>,
}

impl ServeArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(catalog) = &self.catalog {
            config.catalog_path = catalog.clone();
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
    }
}

// === API Types ===

#[derive(Serialize, ToSchema)]
struct ConfigResponse {
    batch_size: usize,
    rotation_interval_secs: f64,
    catalog_path: String,
    session_ttl_secs: u64,
    max_sessions: usize,
}

impl From<&AppConfig> for ConfigResponse {
    fn from(config: &AppConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            rotation_interval_secs: config.rotation_interval_secs,
            catalog_path: config.catalog_path.display().to_string(),
            session_ttl_secs: config.session_ttl_secs,
            max_sessions: config.max_sessions,
        }
    }
}

#[derive(Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    products: usize,
    categories: usize,
    sessions: usize,
}

// === OpenAPI Definition ===

#[derive(OpenApi)]
#[openapi(
    info(
        title = "EcoShelf API",
        version = "1.0.0",
        description = "Read-only API for the EcoShelf product catalog"
    ),
    paths(
        get_config,
        health,
        api::catalog::list_categories,
        api::catalog::search_products,
        api::quotes::get_quote
    ),
    components(schemas(
        ConfigResponse,
        HealthResponse,
        api::catalog::ProductSummary,
        api::catalog::SearchResponse,
        api::catalog::CategoriesResponse,
        api::quotes::QuoteResponse
    )),
    tags(
        (name = "catalog", description = "Product catalog"),
        (name = "quotes", description = "Rotating quotes"),
        (name = "system", description = "Config and health")
    )
)]
struct ApiDoc;

async fn serve_openapi() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// Effective configuration
#[utoipa::path(
    get,
    path = "/api/v1/config",
    tag = "system",
    responses(
        (status = 200, description = "Settings the server is running with", body = ConfigResponse)
    )
)]
async fn get_config(State(state): State<SharedState>) -> Json<ConfigResponse> {
    Json(ConfigResponse::from(&state.config))
}

/// Liveness plus catalog and session counts
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "system",
    responses(
        (status = 200, description = "Server is up", body = HealthResponse)
    )
)]
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        products: state.service.catalog().len(),
        categories: state.service.categories().len(),
        sessions: state.service.sessions().len(),
    })
}

// === Router ===

fn create_router(state: SharedState) -> Router {
    let htmx_routes = Router::new()
        .route("/products/show", post(api::catalog::show_products))
        .route("/products/more", post(api::catalog::load_more))
        .route("/products/random", get(api::catalog::random_products))
        .route("/quote", get(api::quotes::quote_fragment));

    let api_routes = Router::new()
        .route("/quote", get(api::quotes::get_quote))
        .route("/quote/stream", get(api::quotes::quote_stream))
        .route("/categories", get(api::catalog::list_categories))
        .route("/products/search", get(api::catalog::search_products))
        .route("/config", get(get_config))
        .route("/health", get(health))
        .route("/openapi.json", get(serve_openapi));

    Router::new()
        .route("/", get(api::catalog::index))
        .nest("/htmx", htmx_routes)
        .nest("/api/v1", api_routes)
        .route("/static/*path", get(assets::serve_static))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Commands ===

fn load_config(path: Option<&std::path::Path>, serve: &ServeArgs) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(path).context("Failed to load configuration")?;
    serve.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn load_catalog(config: &AppConfig) -> anyhow::Result<Catalog> {
    let (catalog, _report) = Catalog::load(&config.catalog_path)
        .with_context(|| format!("Failed to load catalog {}", config.catalog_path.display()))?;
    if catalog.is_empty() {
        tracing::warn!("Catalog has no valid products");
    }
    Ok(catalog)
}

pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let catalog = load_catalog(&config)?;

    let rotator = QuoteRotator::start(DEFAULT_QUOTES.iter(), config.rotation_interval())
        .context("Failed to start quote rotator")?;
    let service = CatalogService::new(catalog, ImpactTable::default(), rotator.feed(), &config);
    let sweeper = SessionSweeper::start(service.sessions(), config.session_ttl());

    let addr = config.bind_addr();
    let state: SharedState = Arc::new(AppState { service, config });
    let app = create_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("EcoShelf running at http://{}", addr);
    tracing::info!("   Page:   /");
    tracing::info!("   HTMX:   /htmx/products/show, /more, /random, /htmx/quote");
    tracing::info!("   API v1: /api/v1/quote, /quote/stream, /categories, /products/search");
    tracing::info!("   System: /api/v1/config, /health, /openapi.json");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.stop().await;
    rotator.stop().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

fn run_check(config: &AppConfig) -> anyhow::Result<()> {
    let (catalog, report) = Catalog::load(&config.catalog_path)
        .with_context(|| format!("Failed to load catalog {}", config.catalog_path.display()))?;

    println!("Catalog: {}", config.catalog_path.display());
    println!("   Kept:               {}", report.kept);
    println!("   Dropped (price):    {}", report.dropped_price);
    println!("   Dropped (duplicate): {}", report.dropped_duplicate);

    let categories = catalog.categories();
    println!("Categories ({}):", categories.len());
    for category in &categories {
        println!("   {}", category);
    }
    Ok(())
}

fn run_query(config: &AppConfig, criteria: &QueryCriteria, limit: usize) -> anyhow::Result<()> {
    let catalog = load_catalog(config)?;
    let matches = ecoshelf_core::filter(&catalog, criteria);

    for product in matches.iter().take(limit) {
        println!("{:>10}  {}", format_price(product.price), product.title);
    }
    println!("{} of {} matches shown", matches.len().min(limit), matches.len());
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ecoshelf=info,ecoshelf_core=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let config_path = args.config.as_deref();

    match args.command.unwrap_or(CliCommand::Serve(ServeArgs::default())) {
        CliCommand::Serve(serve) => {
            let config = load_config(config_path, &serve)?;
            run_server(config).await
        }
        CliCommand::Check { catalog } => {
            let serve = ServeArgs {
                catalog,
                ..ServeArgs::default()
            };
            run_check(&load_config(config_path, &serve)?)
        }
        CliCommand::Query {
            catalog,
            category,
            search,
            sort,
            min_price,
            max_price,
            in_stock,
            limit,
        } => {
            let serve = ServeArgs {
                catalog,
                ..ServeArgs::default()
            };
            let config = load_config(config_path, &serve)?;
            let criteria = QueryCriteria::default()
                .with_category(category)
                .with_search(search)
                .with_price_range(min_price, max_price)
                .in_stock_only(in_stock)
                .sorted_by(sort);
            run_query(&config, &criteria, limit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use ecoshelf_core::{Product, QuoteFeed};
    use std::time::Duration;
    use tower::ServiceExt;

    /// State over an in-memory catalog with a fixed quote
    fn test_state(products: Vec<Product>) -> SharedState {
        state_with_feed(products, QuoteFeed::fixed("💧 Save water, save life."))
    }

    fn state_with_feed(products: Vec<Product>, quotes: QuoteFeed) -> SharedState {
        let config = AppConfig::default();
        let service = CatalogService::new(
            Catalog::from_products(products),
            ImpactTable::default(),
            quotes,
            &config,
        );
        Arc::new(AppState { service, config })
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn get_json(app: Router, uri: &str) -> serde_json::Value {
        let response = app.oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        serde_json::from_str(&body_string(response).await).unwrap()
    }

    /// Read SSE chunks into `buf` until it contains `needle`; false if the stream ends first
    async fn read_until(
        stream: &mut axum::body::BodyDataStream,
        buf: &mut String,
        needle: &str,
    ) -> bool {
        use futures::StreamExt;

        while !buf.contains(needle) {
            match stream.next().await {
                Some(chunk) => buf.push_str(&String::from_utf8_lossy(&chunk.unwrap())),
                None => return false,
            }
        }
        true
    }

    fn product(id: &str, title: &str, category: &str, price: f64) -> Product {
        Product {
            id: id.to_string(),
            title: title.to_string(),
            brand: "Acme".to_string(),
            category: category.to_string(),
            price: Some(price),
            rating: None,
            in_stock: true,
            in_stock_text: "In Stock".to_string(),
            url: format!("https://example.com/{}", id),
            image_url: None,
            description: String::new(),
        }
    }

    fn catalog() -> Vec<Product> {
        let mut products: Vec<Product> = (0..12)
            .map(|i| product(&format!("h{}", i), &format!("Home Item {}", i), "Home", (12 - i) as f64))
            .collect();
        products.push(product("b1", "Bamboo Toothbrush Set", "Personal Care", 6.0));
        products
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn session_cookie(response: &axum::response::Response) -> String {
        let raw = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("session cookie issued")
            .to_str()
            .unwrap();
        raw.split(';').next().unwrap().to_string()
    }

    fn form_post(uri: &str, body: &str, cookie: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::COOKIE, cookie)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn count_cards(html: &str) -> usize {
        html.matches("<h3>").count()
    }

    #[tokio::test]
    async fn test_index_sets_session_cookie() {
        let app = create_router(test_state(catalog()));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(session_cookie(&response).starts_with("ecoshelf_session="));
        let html = body_string(response).await;
        assert!(html.contains("<form id=\"filters\""));
        assert_eq!(count_cards(&html), 9);
    }

    #[tokio::test]
    async fn test_show_then_load_more_keeps_session() {
        let app = create_router(test_state(catalog()));

        let first = app
            .clone()
            .oneshot(form_post(
                "/htmx/products/show",
                "category=Home&sort=price_asc&min_price=&max_price=",
                "ecoshelf_session=0123456789abcdef0123456789abcdef",
            ))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let html = body_string(first).await;
        assert_eq!(count_cards(&html), 9);
        assert!(html.find("Home Item 11").unwrap() < html.find("Home Item 10").unwrap());

        let more = app
            .oneshot(form_post(
                "/htmx/products/more",
                "category=Home&sort=price_asc",
                "ecoshelf_session=0123456789abcdef0123456789abcdef",
            ))
            .await
            .unwrap();
        let html = body_string(more).await;
        assert_eq!(count_cards(&html), 12);
    }

    #[tokio::test]
    async fn test_quote_fragment() {
        let app = create_router(test_state(vec![]));

        let response = app
            .oneshot(Request::builder().uri("/htmx/quote").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(
            body_string(response).await,
            "<div class='quote-box'>💧 Save water, save life.</div>"
        );
    }

    #[tokio::test]
    async fn test_search_api_returns_all_matches() {
        let app = create_router(test_state(catalog()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/products/search?category=Home&sort=price_desc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["total"], 12);
        assert_eq!(json["products"][0]["title"], "Home Item 0");
    }

    #[tokio::test]
    async fn test_health_and_categories() {
        let app = create_router(test_state(catalog()));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["products"], 13);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/categories")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["categories"], serde_json::json!(["Home", "Personal Care"]));
    }

    #[tokio::test]
    async fn test_static_stylesheet() {
        let app = create_router(test_state(vec![]));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/static/style.css")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");

        let missing = app
            .oneshot(
                Request::builder()
                    .uri("/static/nope.js")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_random_products_issue_session() {
        let app = create_router(test_state(catalog()));

        let response = app.oneshot(get("/htmx/products/random")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(session_cookie(&response).starts_with("ecoshelf_session="));
        assert_eq!(count_cards(&body_string(response).await), 9);
    }

    #[tokio::test]
    async fn test_quote_json() {
        let app = create_router(test_state(vec![]));

        let json = get_json(app, "/api/v1/quote").await;
        assert_eq!(json["text"], "💧 Save water, save life.");
        assert_eq!(json["sequence"], 0);
        assert!(json["rotated_at"].is_string());
    }

    #[tokio::test]
    async fn test_config_json() {
        let app = create_router(test_state(vec![]));

        let json = get_json(app, "/api/v1/config").await;
        assert_eq!(json["batch_size"], 9);
        assert_eq!(json["rotation_interval_secs"], 5.0);
        assert_eq!(json["session_ttl_secs"], 3600);
        assert_eq!(json["max_sessions"], 10_000);
        assert_eq!(json["catalog_path"], "amazon_eco-friendly_products.csv");
    }

    #[tokio::test]
    async fn test_openapi_document_served() {
        let app = create_router(test_state(vec![]));

        let json = get_json(app, "/api/v1/openapi.json").await;
        assert_eq!(json["info"]["title"], "EcoShelf API");
        assert!(json["paths"]["/api/v1/quote"].is_object());
        assert!(json["paths"]["/api/v1/categories"].is_object());
    }

    #[tokio::test(start_paused = true)]
    async fn test_quote_stream_events_and_heartbeat() {
        let rotator = QuoteRotator::start(["🍃 Reduce, reuse, rethink."], Duration::from_secs(20))
            .unwrap();
        let app = create_router(state_with_feed(vec![], rotator.feed()));

        let response = app.oneshot(get("/api/v1/quote/stream")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");

        let mut stream = response.into_body().into_data_stream();
        let mut buf = String::new();

        // Current quote straight away
        assert!(read_until(&mut stream, &mut buf, "\n\n").await);
        assert!(buf.starts_with("event: quote\n"));
        assert!(buf.contains("\"sequence\":0"));
        assert!(buf.contains("Reduce, reuse, rethink."));

        // Idle for 15s
        assert!(read_until(&mut stream, &mut buf, ": heartbeat").await);

        // First rotation at 20s
        assert!(read_until(&mut stream, &mut buf, "\"sequence\":1").await);

        // Stream ends once the rotator is gone
        rotator.stop().await;
        buf.clear();
        assert!(!read_until(&mut stream, &mut buf, "\"sequence\":2").await);
    }

    #[test]
    fn test_openapi_lists_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/products/search"));
        assert!(doc.paths.paths.contains_key("/api/v1/health"));
    }
}
