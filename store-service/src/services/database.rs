use crate::models::{Cart, Category, Discount, Order, Product, User};
use mongodb::{
    Client as MongoClient, Collection, Database, IndexModel,
    bson::doc,
    options::IndexOptions,
};
use service_core::error::AppError;

/// Handle to the store database. Constructed once at process start and passed
/// by clone into every service that needs it; no ambient singletons.
#[derive(Clone)]
pub struct StoreDb {
    client: MongoClient,
    db: Database,
}

impl StoreDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(uri = %uri, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB at {}: {}", uri, e);
            AppError::Database(anyhow::anyhow!(e.to_string()))
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for store-service");

        self.create_index(
            self.users(),
            doc! { "email": 1 },
            IndexOptions::builder()
                .name("email_unique_idx".to_string())
                .unique(true)
                .build(),
        )
        .await?;

        self.create_index(
            self.categories(),
            doc! { "name": 1 },
            IndexOptions::builder()
                .name("category_name_unique_idx".to_string())
                .unique(true)
                .build(),
        )
        .await?;

        self.create_index(
            self.discounts(),
            doc! { "code": 1 },
            IndexOptions::builder()
                .name("discount_code_unique_idx".to_string())
                .unique(true)
                .build(),
        )
        .await?;

        self.create_index(
            self.products(),
            doc! { "category_id": 1 },
            IndexOptions::builder()
                .name("product_category_idx".to_string())
                .build(),
        )
        .await?;

        self.create_index(
            self.carts(),
            doc! { "user_id": 1 },
            IndexOptions::builder()
                .name("cart_user_idx".to_string())
                .sparse(true)
                .build(),
        )
        .await?;

        self.create_index(
            self.carts(),
            doc! { "session_id": 1 },
            IndexOptions::builder()
                .name("cart_session_idx".to_string())
                .sparse(true)
                .build(),
        )
        .await?;

        self.create_index(
            self.orders(),
            doc! { "user_id": 1, "created_utc": -1 },
            IndexOptions::builder()
                .name("order_user_idx".to_string())
                .build(),
        )
        .await?;

        self.create_index(
            self.orders(),
            doc! { "status": 1, "created_utc": -1 },
            IndexOptions::builder()
                .name("order_status_idx".to_string())
                .build(),
        )
        .await?;

        tracing::info!("MongoDB indexes ready");
        Ok(())
    }

    async fn create_index<T>(
        &self,
        collection: Collection<T>,
        keys: mongodb::bson::Document,
        options: IndexOptions,
    ) -> Result<(), AppError> {
        let name = options.name.clone().unwrap_or_default();
        let index = IndexModel::builder().keys(keys).options(options).build();
        collection.create_index(index, None).await.map_err(|e| {
            tracing::error!("Failed to create index {}: {}", name, e);
            AppError::Database(anyhow::anyhow!(e.to_string()))
        })?;
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::Database(anyhow::anyhow!(e.to_string()))
            })?;
        Ok(())
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn products(&self) -> Collection<Product> {
        self.db.collection("products")
    }

    pub fn categories(&self) -> Collection<Category> {
        self.db.collection("categories")
    }

    pub fn carts(&self) -> Collection<Cart> {
        self.db.collection("carts")
    }

    pub fn orders(&self) -> Collection<Order> {
        self.db.collection("orders")
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    pub fn discounts(&self) -> Collection<Discount> {
        self.db.collection("discounts")
    }
}
