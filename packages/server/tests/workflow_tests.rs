//! Integration tests for the match-to-sale workflow: quotes, conversions,
//! match actions, analytics and the opportunity board.

mod common;

use crate::common::{flower_batch, flower_need, seed_sale, vendor_flower, TestHarness};
use matching_core::common::{ClientId, MatchRecordId, OrderId, UserId};
use matching_core::domains::matching::actions::{
    get_match_analytics, get_match_record, get_smart_opportunities, list_match_records, match_need,
    DEFAULT_OPPORTUNITY_LIMIT,
};
use matching_core::domains::matching::models::{MatchRecordFilter, UserAction};
use matching_core::domains::matching::types::{Match, MatchType};
use matching_core::domains::needs::models::{ClientNeed, NewClientNeed};
use matching_core::domains::orders::actions::{
    contact_vendor, convert_quote_to_sale, create_quote_from_match, dismiss_match, CreateQuoteInput,
};
use matching_core::domains::orders::models::OrderType;
use matching_core::domains::supply::adapters::{client_purchase_patterns, find_lapsed_buyers};
use matching_core::MatchingError;
use rust_decimal::Decimal;
use test_context::test_context;

const ACTOR: i64 = 7;

fn quote_input(need: &ClientNeed, matches: Vec<Match>, record: Option<MatchRecordId>) -> CreateQuoteInput {
    CreateQuoteInput {
        client_id: need.client_id,
        need_id: Some(need.id),
        matches,
        actor_id: UserId::from_raw(ACTOR),
        match_record_id: record,
        quantity_cap: None,
        notes: None,
    }
}

/// A need with an inventory and a vendor match, both at 100.
async fn matched_need(ctx: &TestHarness) -> (ClientNeed, Vec<Match>) {
    let ledger = ctx.ledger();
    let client = ledger.add_client("Green Leaf");
    let need = ledger.add_need(flower_need(client, "Blue Dream", "A"));
    ledger.add_batch(flower_batch("Blue Dream", "A", 10.0, 100.0));
    ledger.add_vendor_supply(vendor_flower("Blue Dream", "A", 18.0, Some(90.0)));

    let matches = match_need(&need, &ctx.deps).await.unwrap();
    assert_eq!(matches.len(), 2);
    (need, matches)
}

// =============================================================================
// Quotes
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn quote_from_matches_caps_lines_and_marks_the_record(ctx: &TestHarness) {
    let (need, matches) = matched_need(ctx).await;
    let record_id = matches[0].match_record_id.unwrap();

    let quote = create_quote_from_match(quote_input(&need, matches, Some(record_id)), &ctx.deps)
        .await
        .unwrap();

    assert_eq!(quote.order_type, OrderType::Quote);
    assert!(quote.order_number.starts_with("Q-"));
    assert_eq!(quote.client_need_id, Some(need.id));
    assert_eq!(quote.created_by, Some(UserId::from_raw(ACTOR)));

    // batch: 10 on hand at 100; vendor: 18 offered, capped to 10, at 90
    assert_eq!(quote.items.len(), 2);
    assert_eq!(quote.subtotal, Decimal::new(1900, 0));
    assert_eq!(quote.total, quote.subtotal);
    assert!(quote.items.iter().all(|line| line.quantity == Decimal::new(10, 0)));

    let record = get_match_record(record_id, &ctx.deps).await.unwrap();
    assert_eq!(record.user_action, UserAction::CreatedQuote);
    assert_eq!(record.action_by, Some(UserId::from_raw(ACTOR)));
    assert!(record.action_at.is_some());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn quote_cap_can_be_overridden(ctx: &TestHarness) {
    let (need, matches) = matched_need(ctx).await;
    let mut input = quote_input(&need, matches, None);
    input.quantity_cap = Some(3.0);

    let quote = create_quote_from_match(input, &ctx.deps).await.unwrap();

    // 3 at 100 plus 3 at 90
    assert_eq!(quote.subtotal, Decimal::new(570, 0));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn quote_rejects_bad_input_without_writing(ctx: &TestHarness) {
    let (need, matches) = matched_need(ctx).await;

    let mut zero_cap = quote_input(&need, matches.clone(), None);
    zero_cap.quantity_cap = Some(0.0);
    assert!(matches!(
        create_quote_from_match(zero_cap, &ctx.deps).await.unwrap_err(),
        MatchingError::Validation(_)
    ));

    let empty = quote_input(&need, Vec::new(), None);
    assert!(matches!(
        create_quote_from_match(empty, &ctx.deps).await.unwrap_err(),
        MatchingError::Validation(_)
    ));

    let unknown_record = quote_input(&need, matches, Some(MatchRecordId::from_raw(404)));
    assert!(create_quote_from_match(unknown_record, &ctx.deps)
        .await
        .unwrap_err()
        .is_not_found());

    assert!(ctx.ledger().orders().is_empty());
}

// =============================================================================
// Conversion
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn converting_a_quote_makes_a_sale_and_closes_the_loop(ctx: &TestHarness) {
    let (need, matches) = matched_need(ctx).await;
    let record_id = matches[0].match_record_id.unwrap();
    let quote = create_quote_from_match(quote_input(&need, matches, Some(record_id)), &ctx.deps)
        .await
        .unwrap();

    let sale = convert_quote_to_sale(quote.id, Some(record_id), &ctx.deps)
        .await
        .unwrap();

    assert_eq!(sale.id, quote.id);
    assert_eq!(sale.order_type, OrderType::Sale);
    assert_eq!(
        sale.order_number.strip_prefix("S-"),
        quote.order_number.strip_prefix("Q-")
    );
    assert!(sale.converted_at.is_some());
    assert_eq!(sale.subtotal, quote.subtotal);

    let record = get_match_record(record_id, &ctx.deps).await.unwrap();
    assert!(record.resulted_in_sale);
    assert_eq!(record.sale_order_id, Some(sale.id));
    assert_eq!(record.user_action, UserAction::CreatedQuote);

    let err = convert_quote_to_sale(sale.id, None, &ctx.deps).await.unwrap_err();
    assert!(matches!(err, MatchingError::Validation(ref m) if m == "Order is not a quote"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn converting_unknown_orders_or_records_fails_cleanly(ctx: &TestHarness) {
    let (need, matches) = matched_need(ctx).await;
    let quote = create_quote_from_match(quote_input(&need, matches, None), &ctx.deps)
        .await
        .unwrap();

    assert!(convert_quote_to_sale(OrderId::from_raw(404), None, &ctx.deps)
        .await
        .unwrap_err()
        .is_not_found());

    let err = convert_quote_to_sale(quote.id, Some(MatchRecordId::from_raw(404)), &ctx.deps)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    // The quote was left alone.
    let stored = ctx.ledger().orders();
    assert_eq!(stored[0].order_type, OrderType::Quote);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn quote_is_not_written_when_the_record_stamp_fails(ctx: &TestHarness) {
    let (need, matches) = matched_need(ctx).await;
    let record_id = matches[0].match_record_id.unwrap();

    ctx.ledger().fail_match_record_updates(true);
    let err = create_quote_from_match(quote_input(&need, matches.clone(), Some(record_id)), &ctx.deps)
        .await
        .unwrap_err();
    assert!(matches!(err, MatchingError::Unavailable(_)));
    assert!(ctx.ledger().orders().is_empty());
    let record = get_match_record(record_id, &ctx.deps).await.unwrap();
    assert_eq!(record.user_action, UserAction::NoAction);

    // A retry produces exactly one quote.
    ctx.ledger().fail_match_record_updates(false);
    create_quote_from_match(quote_input(&need, matches, Some(record_id)), &ctx.deps)
        .await
        .unwrap();
    assert_eq!(ctx.ledger().orders().len(), 1);
    let record = get_match_record(record_id, &ctx.deps).await.unwrap();
    assert_eq!(record.user_action, UserAction::CreatedQuote);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn conversion_can_be_retried_after_the_record_stamp_fails(ctx: &TestHarness) {
    let (need, matches) = matched_need(ctx).await;
    let record_id = matches[0].match_record_id.unwrap();
    let quote = create_quote_from_match(quote_input(&need, matches, Some(record_id)), &ctx.deps)
        .await
        .unwrap();

    ctx.ledger().fail_match_record_updates(true);
    let err = convert_quote_to_sale(quote.id, Some(record_id), &ctx.deps)
        .await
        .unwrap_err();
    assert!(matches!(err, MatchingError::Unavailable(_)));

    let stored = ctx.ledger().orders();
    assert_eq!(stored[0].order_type, OrderType::Quote);
    assert_eq!(stored[0].order_number, quote.order_number);
    assert!(stored[0].converted_at.is_none());
    assert!(!get_match_record(record_id, &ctx.deps).await.unwrap().resulted_in_sale);

    ctx.ledger().fail_match_record_updates(false);
    let sale = convert_quote_to_sale(quote.id, Some(record_id), &ctx.deps)
        .await
        .unwrap();
    assert_eq!(sale.order_type, OrderType::Sale);
    let record = get_match_record(record_id, &ctx.deps).await.unwrap();
    assert!(record.resulted_in_sale);
    assert_eq!(record.sale_order_id, Some(sale.id));
}

/// Converted sales become purchase history for the next round of matching.
#[test_context(TestHarness)]
#[tokio::test]
async fn sales_feed_purchase_patterns(ctx: &TestHarness) {
    let (need, matches) = matched_need(ctx).await;
    let inventory_match = matches
        .into_iter()
        .find(|m| m.calculated_price == Some(100.0))
        .unwrap();

    for _ in 0..3 {
        let quote = create_quote_from_match(
            quote_input(&need, vec![inventory_match.clone()], None),
            &ctx.deps,
        )
        .await
        .unwrap();
        convert_quote_to_sale(quote.id, None, &ctx.deps).await.unwrap();
    }

    let patterns = client_purchase_patterns(need.client_id, None, &ctx.deps)
        .await
        .unwrap();

    assert_eq!(patterns.len(), 1);
    let pattern = &patterns[0];
    assert_eq!(pattern.purchase_count, 3);
    assert_eq!(pattern.total_quantity, 30.0);
    assert_eq!(pattern.average_price, 100.0);
    assert_eq!(pattern.strain.as_deref(), Some("Blue Dream"));
    assert_eq!(pattern.grade.as_deref(), Some("A"));
    assert_eq!(pattern.days_since_last_purchase, 0);

    // The need now also matches its own history.
    let rematched = match_need(&need, &ctx.deps).await.unwrap();
    assert!(rematched.iter().any(|m| m.match_type == MatchType::Historical));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn purchase_patterns_need_a_known_client(ctx: &TestHarness) {
    let err = client_purchase_patterns(ClientId::from_raw(404), None, &ctx.deps)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn lapsed_buyers_use_the_configured_threshold(ctx: &TestHarness) {
    let ledger = ctx.ledger();
    let dormant = ledger.add_client("Green Leaf");
    let regular = ledger.add_client("High Plains");
    seed_sale(ledger, dormant, "Gelato", "A", 90, 200);
    seed_sale(ledger, dormant, "Gelato", "A", 90, 120);
    seed_sale(ledger, regular, "Gelato", "A", 90, 10);

    let lapsed = find_lapsed_buyers(None, &ctx.deps).await.unwrap();
    assert_eq!(lapsed.len(), 1);
    assert_eq!(lapsed[0].client_id, dormant);
    assert_eq!(lapsed[0].days_since_last_purchase, 120);

    let lapsed = find_lapsed_buyers(Some(5), &ctx.deps).await.unwrap();
    let ids: Vec<ClientId> = lapsed.iter().map(|b| b.client_id).collect();
    assert_eq!(ids, vec![dormant, regular]);
}

// =============================================================================
// Match actions and analytics
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn match_actions_stamp_the_record(ctx: &TestHarness) {
    let (_, matches) = matched_need(ctx).await;
    let first = matches[0].match_record_id.unwrap();
    let second = matches[1].match_record_id.unwrap();
    let actor = UserId::from_raw(ACTOR);

    let dismissed = dismiss_match(first, actor, &ctx.deps).await.unwrap();
    assert_eq!(dismissed.user_action, UserAction::Dismissed);
    assert_eq!(dismissed.action_by, Some(actor));

    let contacted = contact_vendor(second, actor, &ctx.deps).await.unwrap();
    assert_eq!(contacted.user_action, UserAction::ContactedVendor);

    assert!(dismiss_match(MatchRecordId::from_raw(404), actor, &ctx.deps)
        .await
        .unwrap_err()
        .is_not_found());

    let dismissed_only = list_match_records(
        &MatchRecordFilter {
            user_action: Some(UserAction::Dismissed),
            ..Default::default()
        },
        &ctx.deps,
    )
    .await
    .unwrap();
    assert_eq!(dismissed_only.len(), 1);
    assert_eq!(dismissed_only[0].id, first);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn listing_records_rejects_a_negative_limit(ctx: &TestHarness) {
    matched_need(ctx).await;

    let err = list_match_records(
        &MatchRecordFilter {
            limit: Some(-1),
            ..Default::default()
        },
        &ctx.deps,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, MatchingError::Validation(ref m) if m == "Limit cannot be negative"));

    let none = list_match_records(
        &MatchRecordFilter {
            limit: Some(0),
            ..Default::default()
        },
        &ctx.deps,
    )
    .await
    .unwrap();
    assert!(none.is_empty());

    let one = list_match_records(
        &MatchRecordFilter {
            limit: Some(1),
            ..Default::default()
        },
        &ctx.deps,
    )
    .await
    .unwrap();
    assert_eq!(one.len(), 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn analytics_summarize_outcomes(ctx: &TestHarness) {
    let (need, matches) = matched_need(ctx).await;
    let converted = matches[0].match_record_id.unwrap();
    let dismissed = matches[1].match_record_id.unwrap();

    let quote = create_quote_from_match(
        quote_input(&need, vec![matches[0].clone()], Some(converted)),
        &ctx.deps,
    )
    .await
    .unwrap();
    convert_quote_to_sale(quote.id, Some(converted), &ctx.deps)
        .await
        .unwrap();
    dismiss_match(dismissed, UserId::from_raw(ACTOR), &ctx.deps)
        .await
        .unwrap();

    let analytics = get_match_analytics(&ctx.deps).await.unwrap();

    assert_eq!(analytics.total_matches, 2);
    assert_eq!(analytics.actioned_matches, 2);
    assert_eq!(analytics.converted_matches, 1);
    assert_eq!(analytics.dismissed_matches, 1);
    assert_eq!(analytics.conversion_rate, 50.0);
    assert_eq!(analytics.action_rate, 100.0);
    assert_eq!(analytics.average_confidence, 100.0);
    assert_eq!(analytics.top_match_type, Some(MatchType::Exact));
    assert_eq!(analytics.by_type.len(), 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn analytics_on_an_empty_ledger(ctx: &TestHarness) {
    let analytics = get_match_analytics(&ctx.deps).await.unwrap();

    assert_eq!(analytics.total_matches, 0);
    assert_eq!(analytics.conversion_rate, 0.0);
    assert_eq!(analytics.top_match_type, None);
}

// =============================================================================
// Opportunities
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn opportunities_rank_needs_with_supply(ctx: &TestHarness) {
    let ledger = ctx.ledger();
    let client = ledger.add_client("Green Leaf");
    let strain_need = |strain: &str, price_max: Option<f64>| {
        let mut need = NewClientNeed::builder()
            .client_id(client)
            .strain(strain)
            .category("Flower")
            .quantity_min(5.0)
            .build();
        need.price_max = price_max;
        ledger.add_need(need)
    };
    let busy = strain_need("Blue Dream", Some(120.0));
    let single = strain_need("Gelato", None);
    strain_need("Zkittlez", None);

    ledger.add_batch(flower_batch("Blue Dream", "A", 10.0, 100.0));
    ledger.add_batch(flower_batch("Gelato", "A", 10.0, 100.0));
    ledger.add_vendor_supply(vendor_flower("Blue Dream", "A", 10.0, Some(90.0)));

    let board = get_smart_opportunities(DEFAULT_OPPORTUNITY_LIMIT, &ctx.deps)
        .await
        .unwrap();

    assert_eq!(board.len(), 2);
    assert_eq!(board[0].need_id, busy.id);
    assert_eq!(board[0].client_name, "Green Leaf");
    assert_eq!(board[0].match_count, 2);
    assert_eq!(board[0].potential_revenue, Some(600.0));
    assert!(board[0].best_match.is_some());
    assert_eq!(board[1].need_id, single.id);
    assert_eq!(board[1].match_count, 1);
    assert_eq!(board[1].potential_revenue, None);

    let top = get_smart_opportunities(1, &ctx.deps).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].need_id, busy.id);
}
