//! Test helper module for store-service integration tests.
//!
//! Each test spawns the full application on a random port against a
//! uniquely-named MongoDB database, so tests can run in parallel.

#![allow(dead_code)]

use service_core::config::Config as CoreConfig;
use store_service::config::{
    AuthConfig, MongoConfig, PricingConfig, RedisConfig, StoreConfig, UploadConfig,
};
use store_service::models::{Category, Product, Role, User, Variant};
use store_service::services::{JwtService, StoreDb};
use store_service::startup::Application;
use store_service::utils::password::hash_password;

pub const TEST_JWT_SECRET: &str = "test-only-secret";
pub const SHIPPING_FEE: i64 = 30000;

pub fn test_mongodb_uri() -> String {
    std::env::var("TEST_MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string())
}

pub fn test_redis_url() -> String {
    std::env::var("TEST_REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db: StoreDb,
    pub jwt: JwtService,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Spawn a new test application on a random port with its own database.
    pub async fn spawn() -> Self {
        let database = format!("store_test_{}", uuid::Uuid::new_v4().simple());

        let config = StoreConfig {
            common: CoreConfig { port: 0 },
            mongodb: MongoConfig {
                uri: test_mongodb_uri(),
                database,
            },
            redis: RedisConfig {
                url: test_redis_url(),
            },
            auth: AuthConfig {
                jwt_secret: TEST_JWT_SECRET.to_string(),
                token_ttl_hours: 1,
                reset_code_ttl_minutes: 15,
            },
            pricing: PricingConfig {
                shipping_fee: SHIPPING_FEE,
                tax_rate_percent: 0,
                loyalty_earn_divisor: 100,
            },
            uploads: UploadConfig {
                dir: format!(
                    "{}/store-test-uploads-{}",
                    std::env::temp_dir().display(),
                    uuid::Uuid::new_v4().simple()
                ),
            },
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        let port = app.port();
        let db = app.db().clone();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        let health_url = format!("http://127.0.0.1:{}/health", port);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address: format!("http://127.0.0.1:{}", port),
            port,
            db,
            jwt: JwtService::new(TEST_JWT_SECRET, 1),
            client,
        }
    }

    /// Insert a user directly and return (user_id, bearer token).
    pub async fn create_user(&self, email: &str, password: &str, role: Role) -> (String, String) {
        let hash = hash_password(password).expect("Failed to hash password");
        let user = User::new("Test User".to_string(), email.to_string(), hash, role);
        self.db
            .users()
            .insert_one(&user, None)
            .await
            .expect("Failed to insert user");
        let token = self
            .jwt
            .issue(&user.id, &role.to_string())
            .expect("Failed to issue token");
        (user.id, token)
    }

    pub async fn admin_token(&self) -> String {
        let email = format!("admin-{}@test.local", uuid::Uuid::new_v4().simple());
        let (_, token) = self.create_user(&email, "admin-password", Role::Admin).await;
        token
    }

    /// Insert a category directly and return its id.
    pub async fn seed_category(&self, name: &str) -> String {
        let category = Category::new(name.to_string(), String::new());
        self.db
            .categories()
            .insert_one(&category, None)
            .await
            .expect("Failed to insert category");
        category.id
    }

    /// Insert a one-variant product and return (product_id, variant_id).
    pub async fn seed_product(
        &self,
        category_id: &str,
        name: &str,
        price: i64,
        stock: i64,
    ) -> (String, String) {
        let variant = Variant::new(
            "Standard".to_string(),
            format!("SKU-{}", uuid::Uuid::new_v4().simple()),
            price,
            stock,
            None,
        );
        let variant_id = variant.variant_id.clone();
        let product = Product::new(
            name.to_string(),
            category_id.to_string(),
            String::new(),
            None,
            vec![variant],
        );
        self.db
            .products()
            .insert_one(&product, None)
            .await
            .expect("Failed to insert product");
        (product.id, variant_id)
    }

    /// Drop this test's database.
    pub async fn cleanup(&self) {
        self.db.database().drop(None).await.ok();
    }
}
