//! Test fixtures for seeding the in-memory ledger.

use chrono::{Duration, Utc};
use matching_core::common::{
    BatchId, ClientId, OrderId, ProductId, StrainId, VendorId, VendorSupplyId,
};
use matching_core::domains::needs::models::{NewClientNeed, StrainType};
use matching_core::domains::orders::models::{LineSource, NewOrder, OrderLine, OrderType};
use matching_core::domains::supply::models::{
    BatchStatus, CostBasis, InventoryBatch, ProductSummary, VendorSupplyItem, VendorSupplyStatus,
};
use matching_core::kernel::test_dependencies::InMemoryLedger;
use rust_decimal::Decimal;

/// A LIVE indoor flower batch at a fixed unit cost.
pub fn flower_batch(strain: &str, grade: &str, on_hand_qty: f64, unit_cost: f64) -> InventoryBatch {
    InventoryBatch {
        id: BatchId::from_raw(0),
        sku: Some(format!("SKU-{}", strain.to_uppercase().replace(' ', "-"))),
        status: BatchStatus::Live,
        grade: Some(grade.to_string()),
        on_hand_qty,
        cost_basis: CostBasis::Fixed { unit_cost },
        product: ProductSummary {
            id: ProductId::from_raw(1),
            name: format!("{strain} Flower"),
            category: Some("Flower".to_string()),
            subcategory: Some("Indoor".to_string()),
            strain_id: None,
            strain_name: Some(strain.to_string()),
            strain_type: Some(StrainType::Hybrid),
        },
    }
}

/// Same as `flower_batch`, linked to a strain library entry.
pub fn flower_batch_with_strain_id(strain: &str, strain_id: i64, on_hand_qty: f64) -> InventoryBatch {
    let mut batch = flower_batch(strain, "A", on_hand_qty, 100.0);
    batch.product.strain_id = Some(StrainId::from_raw(strain_id));
    batch
}

/// An AVAILABLE indoor flower offer from a vendor.
pub fn vendor_flower(strain: &str, grade: &str, quantity: f64, unit_price: Option<f64>) -> VendorSupplyItem {
    VendorSupplyItem {
        id: VendorSupplyId::from_raw(0),
        vendor_id: VendorId::from_raw(1),
        vendor_name: Some("Valley Farms".to_string()),
        strain: Some(strain.to_string()),
        product_name: None,
        strain_type: Some(StrainType::Hybrid),
        category: Some("Flower".to_string()),
        subcategory: Some("Indoor".to_string()),
        grade: Some(grade.to_string()),
        quantity_available: quantity,
        unit_price,
        status: VendorSupplyStatus::Available,
        available_until: None,
        notes: None,
        created_at: Utc::now(),
    }
}

/// An indoor flower need for 5 to 20 units.
pub fn flower_need(client_id: ClientId, strain: &str, grade: &str) -> NewClientNeed {
    NewClientNeed::builder()
        .client_id(client_id)
        .strain(strain)
        .category("Flower")
        .subcategory("Indoor")
        .grade(grade)
        .quantity_min(5.0)
        .quantity_max(20.0)
        .build()
}

/// Seeds a one-line indoor flower sale of 2 units, `days_ago` days back.
pub fn seed_sale(
    ledger: &InMemoryLedger,
    client_id: ClientId,
    strain: &str,
    grade: &str,
    unit_price: i64,
    days_ago: i64,
) -> OrderId {
    let quantity = Decimal::from(2);
    let unit_price = Decimal::from(unit_price);
    let line = OrderLine {
        source: LineSource::Inventory,
        batch_id: None,
        vendor_supply_id: None,
        description: format!("{strain} Flower"),
        strain: Some(strain.to_string()),
        category: Some("Flower".to_string()),
        subcategory: Some("Indoor".to_string()),
        grade: Some(grade.to_string()),
        quantity,
        unit_price,
        line_total: quantity * unit_price,
    };

    ledger.add_order(
        NewOrder {
            order_number: format!("S-TEST-{client_id}-{days_ago}"),
            order_type: OrderType::Sale,
            client_id,
            client_need_id: None,
            items: vec![line],
            notes: None,
            created_by: None,
        },
        Utc::now() - Duration::days(days_ago),
    )
}

/// Seeds `count` identical sales a week apart, the latest `latest_days_ago`
/// days back.
pub fn seed_repeat_buyer(
    ledger: &InMemoryLedger,
    client_id: ClientId,
    strain: &str,
    grade: &str,
    count: i64,
    latest_days_ago: i64,
) {
    for i in 0..count {
        seed_sale(ledger, client_id, strain, grade, 95, latest_days_ago + i * 7);
    }
}
