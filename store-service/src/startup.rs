//! Application startup and lifecycle management.

use crate::config::StoreConfig;
use crate::handlers;
use crate::services::{
    CartService, DashboardService, EmailQueue, JwtService, OrderService, PricingPolicy, StoreDb,
};
use axum::{
    Router,
    routing::{delete, get, post, put},
};
use service_core::error::AppError;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: StoreConfig,
    pub db: StoreDb,
    pub carts: CartService,
    pub orders: OrderService,
    pub dashboard: DashboardService,
    pub jwt: JwtService,
    pub queue: EmailQueue,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: StoreConfig) -> Result<Self, AppError> {
        let db = StoreDb::connect(&config.mongodb.uri, &config.mongodb.database)
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to MongoDB: {}", e);
                e
            })?;

        db.initialize_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            e
        })?;

        let queue = EmailQueue::connect(&config.redis.url).await.map_err(|e| {
            tracing::error!("Failed to connect to Redis: {}", e);
            e
        })?;

        tokio::fs::create_dir_all(&config.uploads.dir).await?;

        let policy = PricingPolicy {
            shipping_fee: config.pricing.shipping_fee,
            tax_rate_percent: config.pricing.tax_rate_percent,
            loyalty_earn_divisor: config.pricing.loyalty_earn_divisor,
        };

        let state = AppState {
            carts: CartService::new(db.clone(), policy),
            orders: OrderService::new(db.clone(), queue.clone(), policy),
            dashboard: DashboardService::new(db.clone()),
            jwt: JwtService::new(&config.auth.jwt_secret, config.auth.token_ttl_hours),
            queue,
            db,
            config,
        };

        // Port 0 = random port for testing.
        let addr = SocketAddr::from(([0, 0, 0, 0], state.config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Store service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &StoreDb {
        &self.state.db
    }

    /// Run the application until the server exits.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let uploads_dir = self.state.config.uploads.dir.clone();
        let router = build_router(self.state, &uploads_dir);
        axum::serve(self.listener, router).await
    }
}

fn build_router(state: AppState, uploads_dir: &str) -> Router {
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/products", get(handlers::products::list_products))
        .route("/products/:id", get(handlers::products::get_product))
        .route("/categories", get(handlers::categories::list_categories))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/forgot-password", post(handlers::auth::forgot_password))
        .route("/auth/reset-password", post(handlers::auth::reset_password));

    let account = Router::new()
        .route(
            "/profile",
            get(handlers::auth::get_profile).put(handlers::auth::update_profile),
        )
        .route(
            "/profile/addresses",
            get(handlers::auth::list_addresses).post(handlers::auth::add_address),
        )
        .route(
            "/profile/addresses/:address_id",
            put(handlers::auth::update_address).delete(handlers::auth::delete_address),
        );

    let shopping = Router::new()
        .route(
            "/cart",
            get(handlers::cart::get_cart).delete(handlers::cart::clear_cart),
        )
        .route("/cart/items", post(handlers::cart::add_item))
        .route(
            "/cart/items/update",
            put(handlers::cart::update_item).delete(handlers::cart::remove_item),
        )
        .route(
            "/orders",
            post(handlers::orders::create_order).get(handlers::orders::list_orders),
        )
        .route("/orders/:id", get(handlers::orders::get_order));

    let admin = Router::new()
        .route("/admin/products", post(handlers::products::create_product))
        .route(
            "/admin/products/:id",
            put(handlers::products::update_product).delete(handlers::products::delete_product),
        )
        .route("/admin/categories", post(handlers::categories::create_category))
        .route(
            "/admin/categories/:id",
            put(handlers::categories::update_category)
                .delete(handlers::categories::delete_category),
        )
        .route("/admin/orders", get(handlers::admin::list_orders))
        .route("/admin/orders/:id", get(handlers::admin::get_order))
        .route(
            "/admin/orders/:id/status",
            put(handlers::admin::update_order_status),
        )
        .route(
            "/admin/discounts",
            get(handlers::admin::list_discounts).post(handlers::admin::create_discount),
        )
        .route("/admin/discounts/:id", delete(handlers::admin::delete_discount))
        .route("/admin/users", get(handlers::admin::list_users))
        .route("/admin/dashboard", get(handlers::admin::dashboard_simple))
        .route(
            "/admin/dashboard/advanced",
            get(handlers::admin::dashboard_advanced),
        )
        .route(
            "/admin/dashboard/top-products",
            get(handlers::admin::dashboard_top_products),
        )
        .route("/admin/uploads", post(handlers::admin::upload_image));

    Router::new()
        .merge(public)
        .merge(account)
        .merge(shopping)
        .merge(admin)
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
