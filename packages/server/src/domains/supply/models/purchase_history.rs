use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::common::text::{non_blank, normalize};
use crate::common::ClientId;
use crate::domains::orders::models::Order;

/// A client's repeat purchase of one product signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchasePattern {
    pub client_id: ClientId,
    pub strain: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub grade: Option<String>,
    pub purchase_count: u32,
    pub total_quantity: f64,
    pub average_price: f64,
    pub last_purchase_at: DateTime<Utc>,
    pub days_since_last_purchase: i64,
}

/// A client whose most recent sale is older than the lapse threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapsedBuyer {
    pub client_id: ClientId,
    pub last_purchase_at: DateTime<Utc>,
    pub days_since_last_purchase: i64,
}

type PatternKey = (ClientId, String, String, String, String);

/// Folds sale lines into per-client patterns with at least `min_purchases`
/// occurrences. Most frequent first; ties keep first-seen order.
pub fn aggregate_patterns(sales: &[Order], min_purchases: u32, now: DateTime<Utc>) -> Vec<PurchasePattern> {
    let mut order: Vec<PatternKey> = Vec::new();
    let mut patterns: HashMap<PatternKey, PurchasePattern> = HashMap::new();

    for sale in sales {
        for line in sale.items.iter() {
            let key = (
                sale.client_id,
                normalize(line.strain.as_deref()),
                normalize(line.category.as_deref()),
                normalize(line.subcategory.as_deref()),
                normalize(line.grade.as_deref()),
            );
            let quantity = line.quantity_f64();
            let price = line.unit_price_f64();

            match patterns.get_mut(&key) {
                Some(pattern) => {
                    pattern.purchase_count += 1;
                    pattern.total_quantity += quantity;
                    let n = pattern.purchase_count as f64;
                    pattern.average_price = (pattern.average_price * (n - 1.0) + price) / n;
                    if sale.created_at > pattern.last_purchase_at {
                        pattern.last_purchase_at = sale.created_at;
                    }
                }
                None => {
                    order.push(key.clone());
                    patterns.insert(
                        key,
                        PurchasePattern {
                            client_id: sale.client_id,
                            strain: non_blank(line.strain.as_deref()).map(str::to_string),
                            category: non_blank(line.category.as_deref()).map(str::to_string),
                            subcategory: non_blank(line.subcategory.as_deref()).map(str::to_string),
                            grade: non_blank(line.grade.as_deref()).map(str::to_string),
                            purchase_count: 1,
                            total_quantity: quantity,
                            average_price: price,
                            last_purchase_at: sale.created_at,
                            days_since_last_purchase: 0,
                        },
                    );
                }
            }
        }
    }

    let mut result: Vec<PurchasePattern> = order
        .into_iter()
        .filter_map(|key| patterns.remove(&key))
        .filter(|p| p.purchase_count >= min_purchases)
        .map(|mut p| {
            p.days_since_last_purchase = (now - p.last_purchase_at).num_days();
            p
        })
        .collect();

    result.sort_by(|a, b| b.purchase_count.cmp(&a.purchase_count));
    result
}

/// Clients whose last sale is at least `threshold_days` old, most lapsed first.
pub fn lapsed_buyers(sales: &[Order], threshold_days: i64, now: DateTime<Utc>) -> Vec<LapsedBuyer> {
    let mut last_sale: HashMap<ClientId, DateTime<Utc>> = HashMap::new();
    for sale in sales {
        last_sale
            .entry(sale.client_id)
            .and_modify(|at| {
                if sale.created_at > *at {
                    *at = sale.created_at;
                }
            })
            .or_insert(sale.created_at);
    }

    let mut lapsed: Vec<LapsedBuyer> = last_sale
        .into_iter()
        .map(|(client_id, last_purchase_at)| LapsedBuyer {
            client_id,
            last_purchase_at,
            days_since_last_purchase: (now - last_purchase_at).num_days(),
        })
        .filter(|b| b.days_since_last_purchase >= threshold_days)
        .collect();

    lapsed.sort_by(|a, b| {
        b.days_since_last_purchase
            .cmp(&a.days_since_last_purchase)
            .then(a.client_id.cmp(&b.client_id))
    });
    lapsed
}
