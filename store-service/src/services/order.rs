use crate::models::{CustomerInfo, Order, OrderItem, OrderStatus, StatusEntry};
use crate::services::cart::CartOwner;
use crate::services::database::StoreDb;
use crate::services::pricing::{self, PricingPolicy};
use crate::services::queue::EmailQueue;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use service_core::error::AppError;
use service_core::jobs::{EmailJob, OrderConfirmationItem, OrderConfirmationPayload};
use std::collections::HashMap;

/// A (product, variant) pair selected from the cart for checkout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectedLine {
    pub product_id: String,
    pub variant_id: String,
}

#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub items: Vec<SelectedLine>,
    pub customer: CustomerInfo,
    pub discount_code: Option<String>,
    pub loyalty_points: Option<i64>,
}

/// A cart line with its claim against live stock resolved.
#[derive(Debug, Clone)]
struct ClaimedLine {
    product_id: String,
    variant_id: String,
    variant_name: String,
    unit_price: i64,
    quantity: i64,
}

#[derive(Clone)]
pub struct OrderService {
    db: StoreDb,
    queue: EmailQueue,
    policy: PricingPolicy,
}

impl OrderService {
    pub fn new(db: StoreDb, queue: EmailQueue, policy: PricingPolicy) -> Self {
        Self { db, queue, policy }
    }

    /// Convert the selected subset of a cart into an immutable order.
    ///
    /// Stock, discount usage, and loyalty balance are all claimed with atomic
    /// conditional updates *before* the order document is written, so an order
    /// never exists against unclaimed stock. Any later failure compensates the
    /// claims already made.
    pub async fn create_order(
        &self,
        owner: &CartOwner,
        request: CreateOrder,
    ) -> Result<Order, AppError> {
        if request.items.is_empty() {
            return Err(AppError::validation("no items selected for checkout"));
        }

        let mut seen = std::collections::HashSet::new();
        for line in &request.items {
            if !seen.insert(line.clone()) {
                return Err(AppError::validation("duplicate item in checkout selection"));
            }
        }

        let cart = self
            .db
            .carts()
            .find_one(owner.filter(), None)
            .await?
            .ok_or_else(|| AppError::validation("cart is empty"))?;

        let lines = self.resolve_lines(&cart, &request.items).await?;
        let claimed = self.claim_stock(&lines).await?;

        let subtotal: i64 = claimed.iter().map(|l| l.unit_price * l.quantity).sum();

        let discount_amount = match &request.discount_code {
            Some(code) => match self.claim_discount(code, subtotal).await {
                Ok(amount) => amount,
                Err(e) => {
                    self.release_stock(&claimed).await;
                    return Err(e);
                }
            },
            None => 0,
        };

        let points_requested = request.loyalty_points.unwrap_or(0);
        let loyalty_used = if points_requested > 0 {
            match self
                .claim_loyalty(owner, points_requested, subtotal, discount_amount)
                .await
            {
                Ok(points) => points,
                Err(e) => {
                    self.release_stock(&claimed).await;
                    if let Some(code) = &request.discount_code {
                        self.release_discount(code).await;
                    }
                    return Err(e);
                }
            }
        } else {
            0
        };

        let totals = pricing::order_totals(&self.policy, subtotal, discount_amount, loyalty_used);
        let earned = self.policy.points_earned(totals.total);
        let now = Utc::now();

        let order = Order {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: owner.user_id().map(str::to_string),
            session_id: match owner {
                CartOwner::Session(id) => Some(id.clone()),
                CartOwner::User(_) => None,
            },
            customer: request.customer,
            items: claimed
                .iter()
                .map(|l| OrderItem {
                    product_id: l.product_id.clone(),
                    variant_name: l.variant_name.clone(),
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                })
                .collect(),
            subtotal: totals.subtotal,
            shipping_fee: totals.shipping_fee,
            tax: totals.tax,
            discount_amount: totals.discount_amount,
            loyalty_discount_amount: totals.loyalty_discount_amount,
            total: totals.total,
            loyalty_points_earned: earned,
            loyalty_points_used: loyalty_used,
            discount_code: request.discount_code.clone(),
            status: OrderStatus::Pending,
            status_history: vec![StatusEntry {
                status: OrderStatus::Pending,
                at: now,
            }],
            created_utc: now,
        };

        if let Err(e) = self.db.orders().insert_one(&order, None).await {
            tracing::error!(error = %e, "Order insert failed, compensating claims");
            self.release_stock(&claimed).await;
            if let Some(code) = &request.discount_code {
                self.release_discount(code).await;
            }
            if loyalty_used > 0 {
                if let Some(user_id) = owner.user_id() {
                    self.adjust_points(user_id, loyalty_used).await;
                }
            }
            return Err(AppError::from(e));
        }

        self.remove_ordered_lines(&cart.id, &claimed).await;

        if earned > 0 {
            if let Some(user_id) = owner.user_id() {
                self.adjust_points(user_id, earned).await;
            }
        }

        let job = EmailJob::OrderConfirmation(self.confirmation_payload(&order));
        if let Err(e) = self.queue.enqueue(&job).await {
            // The order is committed; a lost confirmation email is logged, not
            // compensated.
            tracing::error!(order_id = %order.id, error = %e, "Failed to enqueue confirmation email");
        }

        tracing::info!(order_id = %order.id, total = order.total, "Order created");
        Ok(order)
    }

    /// Overwrite the status and append to the history. Transitions may only
    /// move forward; the filter on the current status makes the write safe
    /// against a concurrent transition.
    pub async fn update_status(
        &self,
        order_id: &str,
        new_status: OrderStatus,
    ) -> Result<Order, AppError> {
        let order = self
            .db
            .orders()
            .find_one(doc! { "_id": order_id }, None)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("order not found")))?;

        if !order.status.can_transition_to(new_status) {
            return Err(AppError::validation(format!(
                "cannot move order from {} to {}",
                order.status, new_status
            )));
        }

        let entry = StatusEntry {
            status: new_status,
            at: Utc::now(),
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.db
            .orders()
            .find_one_and_update(
                doc! { "_id": order_id, "status": order.status.as_str() },
                doc! {
                    "$set": { "status": new_status.as_str() },
                    "$push": { "status_history": mongodb::bson::to_bson(&entry)? },
                },
                options,
            )
            .await?
            .ok_or_else(|| {
                AppError::Conflict(anyhow::anyhow!("order status changed concurrently"))
            })
    }

    pub async fn list_for_owner(&self, owner: &CartOwner) -> Result<Vec<Order>, AppError> {
        let filter = match owner {
            CartOwner::User(id) => doc! { "user_id": id },
            CartOwner::Session(id) => doc! { "session_id": id },
        };
        self.find_sorted(filter, None).await
    }

    pub async fn get_for_owner(&self, owner: &CartOwner, order_id: &str) -> Result<Order, AppError> {
        let order = self
            .db
            .orders()
            .find_one(doc! { "_id": order_id }, None)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("order not found")))?;

        let owns = match owner {
            CartOwner::User(id) => order.user_id.as_deref() == Some(id.as_str()),
            CartOwner::Session(id) => order.session_id.as_deref() == Some(id.as_str()),
        };
        if !owns {
            return Err(AppError::NotFound(anyhow::anyhow!("order not found")));
        }
        Ok(order)
    }

    pub async fn admin_list(
        &self,
        status: Option<OrderStatus>,
        limit: i64,
        skip: u64,
    ) -> Result<Vec<Order>, AppError> {
        let mut filter = doc! {};
        if let Some(status) = status {
            filter.insert("status", status.as_str());
        }
        self.find_sorted(filter, Some((limit, skip))).await
    }

    pub async fn admin_get(&self, order_id: &str) -> Result<Order, AppError> {
        self.db
            .orders()
            .find_one(doc! { "_id": order_id }, None)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("order not found")))
    }

    async fn find_sorted(
        &self,
        filter: Document,
        page: Option<(i64, u64)>,
    ) -> Result<Vec<Order>, AppError> {
        let mut options = FindOptions::builder()
            .sort(doc! { "created_utc": -1 })
            .build();
        if let Some((limit, skip)) = page {
            options.limit = Some(limit);
            options.skip = Some(skip);
        }
        let cursor = self.db.orders().find(filter, options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn resolve_lines(
        &self,
        cart: &crate::models::Cart,
        selected: &[SelectedLine],
    ) -> Result<Vec<ClaimedLine>, AppError> {
        let ids: Vec<&str> = selected.iter().map(|s| s.product_id.as_str()).collect();
        let cursor = self
            .db
            .products()
            .find(doc! { "_id": { "$in": ids } }, None)
            .await?;
        let products: HashMap<String, crate::models::Product> = cursor
            .try_collect::<Vec<_>>()
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let mut lines = Vec::with_capacity(selected.len());
        for sel in selected {
            let item = cart.item(&sel.product_id, &sel.variant_id).ok_or_else(|| {
                AppError::validation("selected item is not in the cart")
            })?;
            let product = products.get(&sel.product_id).ok_or_else(|| {
                AppError::validation("selected product is no longer available")
            })?;
            let variant = product.variant(&sel.variant_id).ok_or_else(|| {
                AppError::validation("selected variant is no longer available")
            })?;

            lines.push(ClaimedLine {
                product_id: sel.product_id.clone(),
                variant_id: sel.variant_id.clone(),
                variant_name: variant.name.clone(),
                unit_price: variant.price,
                quantity: item.quantity,
            });
        }
        Ok(lines)
    }

    /// Decrement each variant's stock, guarded by `stock >= quantity`. A
    /// failed claim restores the lines already claimed and aborts; two
    /// concurrent checkouts of the last unit cannot both pass.
    async fn claim_stock(&self, lines: &[ClaimedLine]) -> Result<Vec<ClaimedLine>, AppError> {
        let mut claimed: Vec<ClaimedLine> = Vec::with_capacity(lines.len());

        for line in lines {
            let result = self
                .db
                .products()
                .update_one(
                    doc! {
                        "_id": &line.product_id,
                        "variants": {
                            "$elemMatch": {
                                "variant_id": &line.variant_id,
                                "stock": { "$gte": line.quantity },
                            },
                        },
                    },
                    doc! { "$inc": { "variants.$.stock": -line.quantity } },
                    None,
                )
                .await;

            match result {
                Ok(r) if r.matched_count == 1 => claimed.push(line.clone()),
                Ok(_) => {
                    self.release_stock(&claimed).await;
                    return Err(AppError::validation(format!(
                        "out of stock: {}",
                        line.variant_name
                    )));
                }
                Err(e) => {
                    self.release_stock(&claimed).await;
                    return Err(AppError::from(e));
                }
            }
        }

        Ok(claimed)
    }

    async fn release_stock(&self, claimed: &[ClaimedLine]) {
        for line in claimed {
            let result = self
                .db
                .products()
                .update_one(
                    doc! { "_id": &line.product_id, "variants.variant_id": &line.variant_id },
                    doc! { "$inc": { "variants.$.stock": line.quantity } },
                    None,
                )
                .await;
            if let Err(e) = result {
                tracing::error!(
                    product_id = %line.product_id,
                    variant_id = %line.variant_id,
                    error = %e,
                    "Failed to restore claimed stock"
                );
            }
        }
    }

    /// Increment `used_count`, guarded by `used_count < max_usage`, and return
    /// the discount amount for this subtotal.
    async fn claim_discount(&self, code: &str, subtotal: i64) -> Result<i64, AppError> {
        let discount = self
            .db
            .discounts()
            .find_one(doc! { "code": code }, None)
            .await?
            .ok_or_else(|| AppError::validation("unknown discount code"))?;

        let result = self
            .db
            .discounts()
            .update_one(
                doc! { "code": code, "used_count": { "$lt": discount.max_usage } },
                doc! { "$inc": { "used_count": 1 } },
                None,
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::validation("discount code is exhausted"));
        }

        Ok(pricing::discount_amount(
            discount.kind,
            discount.value,
            subtotal,
        ))
    }

    async fn release_discount(&self, code: &str) {
        let result = self
            .db
            .discounts()
            .update_one(
                doc! { "code": code, "used_count": { "$gt": 0 } },
                doc! { "$inc": { "used_count": -1 } },
                None,
            )
            .await;
        if let Err(e) = result {
            tracing::error!(code = %code, error = %e, "Failed to release discount usage");
        }
    }

    /// Deduct loyalty points, guarded by a sufficient balance. Returns the
    /// points actually redeemed (capped at what is left to pay).
    async fn claim_loyalty(
        &self,
        owner: &CartOwner,
        requested: i64,
        subtotal: i64,
        discount_amount: i64,
    ) -> Result<i64, AppError> {
        let user_id = owner
            .user_id()
            .ok_or_else(|| AppError::validation("loyalty points require an account"))?;

        let points = pricing::redeemable_points(
            requested,
            subtotal,
            self.policy.shipping(subtotal),
            self.policy.tax(subtotal),
            discount_amount,
        );
        if points == 0 {
            return Ok(0);
        }

        let result = self
            .db
            .users()
            .update_one(
                doc! { "_id": user_id, "loyalty_points": { "$gte": points } },
                doc! { "$inc": { "loyalty_points": -points } },
                None,
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::validation("insufficient loyalty points"));
        }
        Ok(points)
    }

    async fn adjust_points(&self, user_id: &str, delta: i64) {
        let result = self
            .db
            .users()
            .update_one(
                doc! { "_id": user_id },
                doc! { "$inc": { "loyalty_points": delta } },
                None,
            )
            .await;
        if let Err(e) = result {
            tracing::error!(user_id = %user_id, delta, error = %e, "Failed to adjust loyalty points");
        }
    }

    /// Remove the ordered lines from the cart, leaving unselected lines intact.
    async fn remove_ordered_lines(&self, cart_id: &str, claimed: &[ClaimedLine]) {
        let conditions: Vec<Document> = claimed
            .iter()
            .map(|l| doc! { "product_id": &l.product_id, "variant_id": &l.variant_id })
            .collect();

        let result = self
            .db
            .carts()
            .update_one(
                doc! { "_id": cart_id },
                doc! {
                    "$pull": { "items": { "$or": conditions } },
                    "$set": { "updated_utc": mongodb::bson::DateTime::now() },
                },
                None,
            )
            .await;
        if let Err(e) = result {
            tracing::error!(cart_id = %cart_id, error = %e, "Failed to remove ordered lines from cart");
        }
    }

    fn confirmation_payload(&self, order: &Order) -> OrderConfirmationPayload {
        OrderConfirmationPayload {
            email: order.customer.email.clone(),
            name: order.customer.name.clone(),
            phone: order.customer.phone.clone(),
            address: order.customer.address.clone(),
            order_id: order.id.clone(),
            status: order.status.to_string(),
            subtotal: order.subtotal,
            shipping_fee: order.shipping_fee,
            tax: order.tax,
            discount_amount: order.discount_amount,
            loyalty_discount_amount: order.loyalty_discount_amount,
            total: order.total,
            loyalty_points_earned: order.loyalty_points_earned,
            items: order
                .items
                .iter()
                .map(|i| OrderConfirmationItem {
                    variant_name: i.variant_name.clone(),
                    quantity: i.quantity,
                    line_total: i.unit_price * i.quantity,
                })
                .collect(),
        }
    }
}
