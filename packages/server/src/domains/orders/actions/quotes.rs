use chrono::Utc;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::common::{ClientId, ClientNeedId, MatchRecordId, OrderId, UserId};
use crate::domains::matching::actions::get_match_record;
use crate::domains::matching::types::{Match, SupplySource};
use crate::domains::orders::models::{
    generate_order_number, sale_number_for, LineSource, NewOrder, Order, OrderLine, OrderType,
};
use crate::error::{MatchingError, MatchingResult};
use crate::kernel::{QuoteStamp, ServerDeps};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQuoteInput {
    pub client_id: ClientId,
    #[serde(default)]
    pub need_id: Option<ClientNeedId>,
    pub matches: Vec<Match>,
    pub actor_id: UserId,
    #[serde(default)]
    pub match_record_id: Option<MatchRecordId>,
    /// Per-line quantity cap; the configured default when absent.
    #[serde(default)]
    pub quantity_cap: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn money(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(2)
}

/// Draft line for a match: `min(available, cap)` at the match's price (0
/// when unpriced). Historical matches carry no stock and yield no line.
pub fn quote_line(matched: &Match, cap: f64) -> Option<OrderLine> {
    let (source, batch_id, vendor_supply_id, description) = match &matched.source {
        SupplySource::Inventory(batch) => (
            LineSource::Inventory,
            Some(batch.id),
            None,
            batch.product.name.clone(),
        ),
        SupplySource::Vendor(item) => (
            LineSource::Vendor,
            None,
            Some(item.id),
            item.product_name
                .clone()
                .or_else(|| item.strain.clone())
                .or_else(|| item.category.clone())
                .unwrap_or_else(|| "Vendor supply".to_string()),
        ),
        SupplySource::Historical(_) => return None,
    };

    let signature = matched.source.signature();
    let available = matched.available_quantity.unwrap_or(0.0);
    let quantity = money(available.min(cap).max(0.0));
    let unit_price = money(matched.calculated_price.unwrap_or(0.0));

    Some(OrderLine {
        source,
        batch_id,
        vendor_supply_id,
        description,
        strain: signature.strain,
        category: signature.category,
        subcategory: signature.subcategory,
        grade: signature.grade,
        quantity,
        unit_price,
        line_total: (quantity * unit_price).round_dp(2),
    })
}

/// Draft a quote from chosen matches and mark the originating match record
/// as `CREATED_QUOTE`. The quote and the stamp commit together.
#[instrument(skip(input, deps), fields(client_id = %input.client_id))]
pub async fn create_quote_from_match(input: CreateQuoteInput, deps: &ServerDeps) -> MatchingResult<Order> {
    let cap = input.quantity_cap.unwrap_or(deps.matching.quote_line_cap);
    if cap <= 0.0 {
        return Err(MatchingError::validation("Quantity cap must be positive"));
    }

    let items: Vec<OrderLine> = input.matches.iter().filter_map(|m| quote_line(m, cap)).collect();
    if items.is_empty() {
        return Err(MatchingError::validation("No valid items to create quote"));
    }

    if let Some(record_id) = input.match_record_id {
        get_match_record(record_id, deps).await?;
    }

    let quote = deps
        .orders
        .insert_order(
            NewOrder {
                order_number: generate_order_number(OrderType::Quote, Utc::now()),
                order_type: OrderType::Quote,
                client_id: input.client_id,
                client_need_id: input.need_id,
                items,
                notes: input.notes,
                created_by: Some(input.actor_id),
            },
            input.match_record_id.map(|match_record_id| QuoteStamp {
                match_record_id,
                actor_id: input.actor_id,
            }),
        )
        .await?;

    info!(
        quote_id = %quote.id,
        order_number = %quote.order_number,
        lines = quote.items.len(),
        subtotal = %quote.subtotal,
        "Quote created from matches"
    );
    Ok(quote)
}

/// Flip a quote to a sale. Anything that is not a quote is rejected without
/// being touched. The sale and the record's conversion commit together.
#[instrument(skip(deps))]
pub async fn convert_quote_to_sale(
    quote_id: OrderId,
    match_record_id: Option<MatchRecordId>,
    deps: &ServerDeps,
) -> MatchingResult<Order> {
    let quote = deps
        .orders
        .find_order(quote_id)
        .await?
        .ok_or_else(|| MatchingError::not_found("Quote", quote_id))?;

    if !quote.is_quote() {
        return Err(MatchingError::validation("Order is not a quote"));
    }

    if let Some(record_id) = match_record_id {
        get_match_record(record_id, deps).await?;
    }

    let sale = deps
        .orders
        .convert_quote(quote.id, &sale_number_for(&quote.order_number), match_record_id)
        .await?;

    info!(sale_id = %sale.id, order_number = %sale.order_number, "Quote converted to sale");
    Ok(sale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ClientId, VendorId, VendorSupplyId};
    use crate::domains::clients::ClientSummary;
    use crate::domains::matching::types::{HistoricalBuyer, MatchType};
    use crate::domains::supply::models::{PurchasePattern, VendorSupplyItem, VendorSupplyStatus};

    fn vendor_match(available: f64, price: Option<f64>) -> Match {
        let item = VendorSupplyItem {
            id: VendorSupplyId::from_raw(4),
            vendor_id: VendorId::from_raw(1),
            vendor_name: Some("Valley Farms".into()),
            strain: Some("Gelato".into()),
            product_name: None,
            strain_type: None,
            category: Some("Flower".into()),
            subcategory: None,
            grade: Some("A".into()),
            quantity_available: available,
            unit_price: price,
            status: VendorSupplyStatus::Available,
            available_until: None,
            notes: None,
            created_at: Utc::now(),
        };
        Match::new(MatchType::Close, 70.0, vec![], SupplySource::Vendor(item), price)
    }

    #[test]
    fn line_caps_quantity_and_prices_total() {
        let line = quote_line(&vendor_match(25.0, Some(42.5)), 10.0).unwrap();
        assert_eq!(line.quantity, Decimal::new(10, 0));
        assert_eq!(line.unit_price, Decimal::new(425, 1));
        assert_eq!(line.line_total, Decimal::new(425, 0));
        assert_eq!(line.description, "Gelato");
        assert_eq!(line.vendor_supply_id, Some(VendorSupplyId::from_raw(4)));
    }

    #[test]
    fn unpriced_match_gets_zero_price() {
        let line = quote_line(&vendor_match(4.0, None), 10.0).unwrap();
        assert_eq!(line.quantity, Decimal::new(4, 0));
        assert_eq!(line.line_total, Decimal::ZERO);
    }

    #[test]
    fn historical_match_yields_no_line() {
        let buyer = HistoricalBuyer {
            client: ClientSummary {
                id: ClientId::from_raw(2),
                name: "Green Leaf".into(),
                email: None,
                phone: None,
            },
            pattern: PurchasePattern {
                client_id: ClientId::from_raw(2),
                strain: Some("Gelato".into()),
                category: Some("Flower".into()),
                subcategory: None,
                grade: None,
                purchase_count: 3,
                total_quantity: 30.0,
                average_price: 90.0,
                last_purchase_at: Utc::now(),
                days_since_last_purchase: 3,
            },
            is_lapsed_buyer: false,
        };
        let matched = Match::new(MatchType::Historical, 75.0, vec![], SupplySource::Historical(buyer), None);
        assert!(quote_line(&matched, 10.0).is_none());
    }
}
