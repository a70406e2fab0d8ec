use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use crate::common::{BatchId, ClientId, ClientNeedId, OrderId, UserId, VendorSupplyId};
use crate::error::{MatchingError, MatchingResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Quote,
    Sale,
}

impl OrderType {
    fn prefix(&self) -> &'static str {
        match self {
            OrderType::Quote => "Q",
            OrderType::Sale => "S",
        }
    }
}

/// Which supply kind a line was drafted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineSource {
    Inventory,
    Vendor,
}

/// One priced line on a quote or sale. Carries the product signature so
/// purchase history can be rebuilt from sales alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub source: LineSource,
    pub batch_id: Option<BatchId>,
    pub vendor_supply_id: Option<VendorSupplyId>,
    pub description: String,
    pub strain: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub grade: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl OrderLine {
    pub fn quantity_f64(&self) -> f64 {
        self.quantity.to_f64().unwrap_or(0.0)
    }

    pub fn unit_price_f64(&self) -> f64 {
        self.unit_price.to_f64().unwrap_or(0.0)
    }
}

/// Quotes and sales share one table; a quote converts in place.
#[derive(FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub order_type: OrderType,
    pub client_id: ClientId,
    pub client_need_id: Option<ClientNeedId>,
    pub items: Json<Vec<OrderLine>>,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub converted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub order_type: OrderType,
    pub client_id: ClientId,
    pub client_need_id: Option<ClientNeedId>,
    pub items: Vec<OrderLine>,
    pub notes: Option<String>,
    pub created_by: Option<UserId>,
}

impl NewOrder {
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(|line| line.line_total).sum()
    }

    pub fn into_order(self, id: OrderId, now: DateTime<Utc>) -> Order {
        let subtotal = self.subtotal();
        Order {
            id,
            order_number: self.order_number,
            order_type: self.order_type,
            client_id: self.client_id,
            client_need_id: self.client_need_id,
            items: Json(self.items),
            subtotal,
            total: subtotal,
            notes: self.notes,
            created_by: self.created_by,
            created_at: now,
            converted_at: None,
        }
    }
}

/// `Q-20240501123045-3FA2`: type prefix, UTC timestamp, random suffix.
pub fn generate_order_number(order_type: OrderType, now: DateTime<Utc>) -> String {
    let suffix = (Uuid::new_v4().as_u128() & 0xFFFF) as u16;
    format!(
        "{}-{}-{:04X}",
        order_type.prefix(),
        now.format("%Y%m%d%H%M%S"),
        suffix
    )
}

/// Re-prefixes a quote number for its sale, keeping the rest intact.
pub fn sale_number_for(quote_number: &str) -> String {
    match quote_number.strip_prefix("Q-") {
        Some(rest) => format!("S-{rest}"),
        None => generate_order_number(OrderType::Sale, Utc::now()),
    }
}

impl Order {
    pub fn is_quote(&self) -> bool {
        self.order_type == OrderType::Quote
    }

    pub async fn find_by_id(id: OrderId, pool: &PgPool) -> MatchingResult<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn insert(new: NewOrder, executor: impl PgExecutor<'_>) -> MatchingResult<Self> {
        let subtotal = new.subtotal();
        sqlx::query_as::<_, Self>(
            "INSERT INTO orders (
                order_number, order_type, client_id, client_need_id,
                items, subtotal, total, notes, created_by
             )
             VALUES ($1, $2, $3, $4, $5, $6, $6, $7, $8)
             RETURNING *",
        )
        .bind(&new.order_number)
        .bind(new.order_type)
        .bind(new.client_id)
        .bind(new.client_need_id)
        .bind(Json(&new.items))
        .bind(subtotal)
        .bind(&new.notes)
        .bind(new.created_by)
        .fetch_one(executor)
        .await
        .map_err(Into::into)
    }

    /// Flips a quote to a sale. Fails if the row is no longer a quote.
    pub async fn convert_to_sale(
        id: OrderId,
        sale_number: &str,
        executor: impl PgExecutor<'_>,
    ) -> MatchingResult<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE orders
             SET order_type = 'SALE', order_number = $2, converted_at = NOW()
             WHERE id = $1 AND order_type = 'QUOTE'
             RETURNING *",
        )
        .bind(id)
        .bind(sale_number)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| MatchingError::validation("Order is not a quote"))
    }

    /// Sales, optionally for one client, oldest first.
    pub async fn find_sales(client_id: Option<ClientId>, pool: &PgPool) -> MatchingResult<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM orders
             WHERE order_type = 'SALE'
               AND ($1::BIGINT IS NULL OR client_id = $1)
             ORDER BY created_at ASC, id ASC",
        )
        .bind(client_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
