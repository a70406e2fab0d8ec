//! Rule-based client pricing.
//!
//! A client's rules are applied to an item's base price in descending
//! priority order. Each rule fires when its conditions hold (AND or OR over
//! the conditions it sets) and adjusts the running price by a percentage or
//! a flat dollar amount.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use super::{BasePricingService, PricingSubject};
use crate::common::{ClientId, PricingRuleId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "pricing_adjustment", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentType {
    PercentMarkup,
    PercentMarkdown,
    DollarMarkup,
    DollarMarkdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "pricing_logic", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ConditionLogic {
    #[default]
    And,
    Or,
}

/// Conditions a rule may set. Unset conditions are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingConditions {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub strain: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub price_min: Option<f64>,
    #[serde(default)]
    pub price_max: Option<f64>,
}

impl PricingConditions {
    fn evaluate(&self, item: &PricingSubject, logic: ConditionLogic) -> bool {
        let field = |wanted: &Option<String>, actual: &Option<String>| {
            wanted.as_ref().map(|w| actual.as_deref() == Some(w.as_str()))
        };

        let price_range = (self.price_min.is_some() || self.price_max.is_some()).then(|| {
            self.price_min.map_or(true, |min| item.base_price >= min)
                && self.price_max.map_or(true, |max| item.base_price <= max)
        });

        let checks: Vec<bool> = [
            field(&self.category, &item.category),
            field(&self.subcategory, &item.subcategory),
            field(&self.strain, &item.strain),
            field(&self.grade, &item.grade),
            price_range,
        ]
        .into_iter()
        .flatten()
        .collect();

        if checks.is_empty() {
            return false;
        }

        match logic {
            ConditionLogic::And => checks.iter().all(|c| *c),
            ConditionLogic::Or => checks.iter().any(|c| *c),
        }
    }
}

#[derive(FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRule {
    pub id: PricingRuleId,
    pub name: String,
    pub adjustment_type: AdjustmentType,
    pub adjustment_value: f64,
    pub conditions: Json<PricingConditions>,
    pub logic: ConditionLogic,
    pub priority: i32,
    pub is_active: bool,
}

impl PricingRule {
    fn adjust(&self, price: f64) -> f64 {
        let value = self.adjustment_value;
        match self.adjustment_type {
            AdjustmentType::PercentMarkup => price * (1.0 + value / 100.0),
            AdjustmentType::PercentMarkdown => price * (1.0 - value / 100.0),
            AdjustmentType::DollarMarkup => price + value,
            AdjustmentType::DollarMarkdown => price - value,
        }
    }

    /// Active rules linked to a client, highest priority first.
    pub async fn find_for_client(client_id: ClientId, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT r.*
             FROM pricing_rules r
             JOIN client_pricing_rules cpr ON cpr.pricing_rule_id = r.id
             WHERE cpr.client_id = $1 AND r.is_active
             ORDER BY r.priority DESC, r.id ASC",
        )
        .bind(client_id)
        .fetch_all(pool)
        .await
        .context("Failed to load client pricing rules")
    }
}

/// Applies matching rules in descending priority, floors at zero and
/// rounds to cents.
pub fn apply_pricing_rules(item: &PricingSubject, rules: &[PricingRule]) -> f64 {
    let mut ordered: Vec<&PricingRule> = rules.iter().filter(|r| r.is_active).collect();
    ordered.sort_by(|a, b| b.priority.cmp(&a.priority));

    let price = ordered
        .into_iter()
        .filter(|rule| rule.conditions.evaluate(item, rule.logic))
        .fold(item.base_price, |price, rule| rule.adjust(price));

    (price.max(0.0) * 100.0).round() / 100.0
}

// =============================================================================
// Postgres-backed pricing service
// =============================================================================

pub struct RuleBasedPricing {
    pool: PgPool,
}

impl RuleBasedPricing {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BasePricingService for RuleBasedPricing {
    async fn price_for_client(&self, client_id: ClientId, item: &PricingSubject) -> Result<f64> {
        let rules = PricingRule::find_for_client(client_id, &self.pool).await?;
        Ok(apply_pricing_rules(item, &rules))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(
        id: i64,
        adjustment_type: AdjustmentType,
        value: f64,
        priority: i32,
        conditions: PricingConditions,
    ) -> PricingRule {
        PricingRule {
            id: PricingRuleId::from_raw(id),
            name: format!("rule-{id}"),
            adjustment_type,
            adjustment_value: value,
            conditions: Json(conditions),
            logic: ConditionLogic::And,
            priority,
            is_active: true,
        }
    }

    fn flower(base_price: f64) -> PricingSubject {
        PricingSubject {
            base_price,
            category: Some("Flower".into()),
            grade: Some("AAA".into()),
            ..Default::default()
        }
    }

    fn flower_only() -> PricingConditions {
        PricingConditions {
            category: Some("Flower".into()),
            ..Default::default()
        }
    }

    #[test]
    fn no_rules_keeps_base_price() {
        assert_eq!(apply_pricing_rules(&flower(80.0), &[]), 80.0);
    }

    #[test]
    fn rules_apply_in_priority_order() {
        // +$10 first (priority 2), then +10% => 99.0; the other order gives 98.0.
        let rules = vec![
            rule(1, AdjustmentType::PercentMarkup, 10.0, 1, flower_only()),
            rule(2, AdjustmentType::DollarMarkup, 10.0, 2, flower_only()),
        ];
        assert_eq!(apply_pricing_rules(&flower(80.0), &rules), 99.0);
    }

    #[test]
    fn unmatched_and_empty_conditions_do_not_fire() {
        let rules = vec![
            rule(
                1,
                AdjustmentType::PercentMarkup,
                50.0,
                1,
                PricingConditions {
                    category: Some("Edibles".into()),
                    ..Default::default()
                },
            ),
            rule(2, AdjustmentType::DollarMarkup, 5.0, 1, PricingConditions::default()),
        ];
        assert_eq!(apply_pricing_rules(&flower(80.0), &rules), 80.0);
    }

    #[test]
    fn or_logic_needs_one_condition() {
        let mut r = rule(
            1,
            AdjustmentType::PercentMarkdown,
            25.0,
            1,
            PricingConditions {
                category: Some("Edibles".into()),
                grade: Some("AAA".into()),
                ..Default::default()
            },
        );
        assert_eq!(apply_pricing_rules(&flower(80.0), std::slice::from_ref(&r)), 80.0);
        r.logic = ConditionLogic::Or;
        assert_eq!(apply_pricing_rules(&flower(80.0), &[r]), 60.0);
    }

    #[test]
    fn price_range_condition() {
        let conditions = PricingConditions {
            price_min: Some(50.0),
            price_max: Some(100.0),
            ..Default::default()
        };
        let rules = vec![rule(1, AdjustmentType::DollarMarkup, 1.0, 1, conditions)];
        assert_eq!(apply_pricing_rules(&flower(80.0), &rules), 81.0);
        assert_eq!(apply_pricing_rules(&flower(120.0), &rules), 120.0);
    }

    #[test]
    fn floors_at_zero_and_rounds_to_cents() {
        let rules = vec![rule(1, AdjustmentType::DollarMarkdown, 500.0, 1, flower_only())];
        assert_eq!(apply_pricing_rules(&flower(80.0), &rules), 0.0);

        let rules = vec![rule(1, AdjustmentType::PercentMarkup, 33.333, 1, flower_only())];
        assert_eq!(apply_pricing_rules(&flower(10.0), &rules), 13.33);
    }

    #[test]
    fn inactive_rules_are_skipped() {
        let mut r = rule(1, AdjustmentType::DollarMarkup, 10.0, 1, flower_only());
        r.is_active = false;
        assert_eq!(apply_pricing_rules(&flower(80.0), &[r]), 80.0);
    }
}
