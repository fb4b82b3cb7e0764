use crate::models::{Cart, CartItem, Product, cart::CartLineView, cart::CartView};
use crate::services::database::StoreDb;
use crate::services::pricing::PricingPolicy;
use futures::TryStreamExt;
use mongodb::bson::{DateTime as BsonDateTime, doc};
use service_core::error::AppError;
use std::collections::HashMap;

/// Who a cart belongs to: a registered user or an anonymous session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOwner {
    User(String),
    Session(String),
}

impl CartOwner {
    pub fn filter(&self) -> mongodb::bson::Document {
        match self {
            CartOwner::User(id) => doc! { "user_id": id },
            CartOwner::Session(id) => doc! { "session_id": id },
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            CartOwner::User(id) => Some(id),
            CartOwner::Session(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct CartService {
    db: StoreDb,
    policy: PricingPolicy,
}

impl CartService {
    pub fn new(db: StoreDb, policy: PricingPolicy) -> Self {
        Self { db, policy }
    }

    pub async fn get_or_create(&self, owner: &CartOwner) -> Result<Cart, AppError> {
        if let Some(cart) = self.db.carts().find_one(owner.filter(), None).await? {
            return Ok(cart);
        }

        let cart = match owner {
            CartOwner::User(id) => Cart::for_user(id.clone()),
            CartOwner::Session(id) => Cart::for_session(id.clone()),
        };
        self.db.carts().insert_one(&cart, None).await?;
        tracing::debug!(cart_id = %cart.id, "Created cart");
        Ok(cart)
    }

    /// Add a line, merging with an existing line for the same product+variant.
    ///
    /// The stock check here is advisory only: nothing is reserved, and the
    /// atomic claim at checkout remains the sole stock authority.
    pub async fn add_item(
        &self,
        owner: &CartOwner,
        product_id: &str,
        variant_id: &str,
        quantity: i64,
    ) -> Result<Cart, AppError> {
        if quantity < 1 {
            return Err(AppError::validation("quantity must be at least 1"));
        }

        let product = self
            .db
            .products()
            .find_one(doc! { "_id": product_id }, None)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("product not found")))?;

        let variant = product
            .variant(variant_id)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("variant not found")))?;

        let cart = self.get_or_create(owner).await?;
        let existing = cart.item(product_id, variant_id).map_or(0, |i| i.quantity);

        if existing + quantity > variant.stock {
            return Err(AppError::validation(format!(
                "insufficient stock for {}: {} available",
                variant.name, variant.stock
            )));
        }

        if existing > 0 {
            self.db
                .carts()
                .update_one(
                    doc! {
                        "_id": &cart.id,
                        "items": { "$elemMatch": { "product_id": product_id, "variant_id": variant_id } },
                    },
                    doc! {
                        "$inc": { "items.$.quantity": quantity },
                        "$set": { "updated_utc": BsonDateTime::now() },
                    },
                    None,
                )
                .await?;
        } else {
            let item = CartItem {
                product_id: product_id.to_string(),
                variant_id: variant_id.to_string(),
                quantity,
            };
            self.db
                .carts()
                .update_one(
                    doc! { "_id": &cart.id },
                    doc! {
                        "$push": { "items": mongodb::bson::to_bson(&item)? },
                        "$set": { "updated_utc": BsonDateTime::now() },
                    },
                    None,
                )
                .await?;
        }

        self.require(owner).await
    }

    /// Set the quantity of an existing line.
    pub async fn update_item(
        &self,
        owner: &CartOwner,
        product_id: &str,
        variant_id: &str,
        quantity: i64,
    ) -> Result<Cart, AppError> {
        if quantity < 1 {
            return Err(AppError::validation("quantity must be at least 1"));
        }

        let product = self
            .db
            .products()
            .find_one(doc! { "_id": product_id }, None)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("product not found")))?;

        let variant = product
            .variant(variant_id)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("variant not found")))?;

        if quantity > variant.stock {
            return Err(AppError::validation(format!(
                "insufficient stock for {}: {} available",
                variant.name, variant.stock
            )));
        }

        let cart = self.require(owner).await?;
        let result = self
            .db
            .carts()
            .update_one(
                doc! {
                    "_id": &cart.id,
                    "items": { "$elemMatch": { "product_id": product_id, "variant_id": variant_id } },
                },
                doc! {
                    "$set": {
                        "items.$.quantity": quantity,
                        "updated_utc": BsonDateTime::now(),
                    },
                },
                None,
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!("cart line not found")));
        }

        self.require(owner).await
    }

    pub async fn remove_item(
        &self,
        owner: &CartOwner,
        product_id: &str,
        variant_id: &str,
    ) -> Result<Cart, AppError> {
        let cart = self.require(owner).await?;
        self.db
            .carts()
            .update_one(
                doc! { "_id": &cart.id },
                doc! {
                    "$pull": { "items": { "product_id": product_id, "variant_id": variant_id } },
                    "$set": { "updated_utc": BsonDateTime::now() },
                },
                None,
            )
            .await?;
        self.require(owner).await
    }

    pub async fn clear(&self, owner: &CartOwner) -> Result<Cart, AppError> {
        let cart = self.require(owner).await?;
        self.db
            .carts()
            .update_one(
                doc! { "_id": &cart.id },
                doc! { "$set": { "items": [], "updated_utc": BsonDateTime::now() } },
                None,
            )
            .await?;
        self.require(owner).await
    }

    /// Cart joined against live catalog data, with totals recomputed fresh on
    /// every read. Lines whose product or variant has disappeared are flagged
    /// unavailable and excluded from the totals.
    pub async fn summary(&self, owner: &CartOwner) -> Result<CartView, AppError> {
        let cart = self.get_or_create(owner).await?;
        let products = self.load_products(&cart).await?;

        let mut items = Vec::with_capacity(cart.items.len());
        let mut subtotal = 0i64;

        for line in &cart.items {
            let variant = products
                .get(&line.product_id)
                .and_then(|p| p.variant(&line.variant_id));

            match (products.get(&line.product_id), variant) {
                (Some(product), Some(variant)) => {
                    let line_total = variant.price * line.quantity;
                    subtotal += line_total;
                    items.push(CartLineView {
                        product_id: line.product_id.clone(),
                        product_name: product.name.clone(),
                        variant_id: line.variant_id.clone(),
                        variant_name: variant.name.clone(),
                        unit_price: variant.price,
                        quantity: line.quantity,
                        line_total,
                        available: true,
                        image: variant.image.clone().or_else(|| product.image.clone()),
                    });
                }
                _ => {
                    tracing::warn!(
                        cart_id = %cart.id,
                        product_id = %line.product_id,
                        variant_id = %line.variant_id,
                        "Cart line references a missing product or variant"
                    );
                    items.push(CartLineView {
                        product_id: line.product_id.clone(),
                        product_name: String::new(),
                        variant_id: line.variant_id.clone(),
                        variant_name: String::new(),
                        unit_price: 0,
                        quantity: line.quantity,
                        line_total: 0,
                        available: false,
                        image: None,
                    });
                }
            }
        }

        let tax = self.policy.tax(subtotal);
        let shipping_fee = self.policy.shipping(subtotal);

        Ok(CartView {
            cart_id: cart.id,
            items,
            subtotal,
            tax,
            shipping_fee,
            total: subtotal + tax + shipping_fee,
        })
    }

    async fn require(&self, owner: &CartOwner) -> Result<Cart, AppError> {
        self.db
            .carts()
            .find_one(owner.filter(), None)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("cart not found")))
    }

    async fn load_products(&self, cart: &Cart) -> Result<HashMap<String, Product>, AppError> {
        let ids: Vec<&str> = cart.items.iter().map(|i| i.product_id.as_str()).collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let cursor = self
            .db
            .products()
            .find(doc! { "_id": { "$in": ids } }, None)
            .await?;
        let products: Vec<Product> = cursor.try_collect().await?;
        Ok(products.into_iter().map(|p| (p.id.clone(), p)).collect())
    }
}
