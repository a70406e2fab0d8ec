use crate::common::text::eq_ignore_case;
use crate::domains::matching::types::{SupplySignature, MIN_CONFIDENCE};
use crate::domains::supply::models::PurchasePattern;

use super::scoring::Score;

const RECENT_DAYS: i64 = 30;

/// Scores a buyer's purchase pattern against a supply signature. `None` when
/// the pattern does not clear the match threshold.
pub fn score_pattern(signature: &SupplySignature, pattern: &PurchasePattern, lapsed_after_days: i64) -> Option<Score> {
    let mut confidence = 0.0;
    let mut reasons = Vec::new();

    if eq_ignore_case(signature.strain.as_deref(), pattern.strain.as_deref()) {
        confidence += 40.0;
        reasons.push(format!("Previously purchased {}x", pattern.purchase_count));
    }

    if eq_ignore_case(signature.category.as_deref(), pattern.category.as_deref()) {
        confidence += 30.0;
        if reasons.is_empty() {
            reasons.push(format!(
                "Previously purchased similar items {}x",
                pattern.purchase_count
            ));
        }
    }

    if eq_ignore_case(signature.subcategory.as_deref(), pattern.subcategory.as_deref()) {
        confidence += 15.0;
    }

    if eq_ignore_case(signature.grade.as_deref(), pattern.grade.as_deref()) {
        confidence += 10.0;
    }

    let days = pattern.days_since_last_purchase;
    if days < RECENT_DAYS {
        confidence += 5.0;
        reasons.push("Recent buyer".to_string());
    } else if days > lapsed_after_days {
        reasons.push(format!("Lapsed buyer ({days} days)"));
    }

    (confidence >= MIN_CONFIDENCE).then(|| Score {
        confidence: f64::min(confidence, 100.0),
        reasons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ClientId;
    use chrono::Utc;

    fn pattern(days: i64) -> PurchasePattern {
        PurchasePattern {
            client_id: ClientId::from_raw(1),
            strain: Some("Gelato".into()),
            category: Some("Flower".into()),
            subcategory: Some("Indoor".into()),
            grade: Some("AAA".into()),
            purchase_count: 4,
            total_quantity: 40.0,
            average_price: 95.0,
            last_purchase_at: Utc::now(),
            days_since_last_purchase: days,
        }
    }

    fn signature(strain: Option<&str>) -> SupplySignature {
        SupplySignature {
            strain: strain.map(str::to_string),
            category: Some("flower".into()),
            subcategory: None,
            grade: Some("AAA".into()),
        }
    }

    #[test]
    fn strain_and_category_with_recency() {
        let score = score_pattern(&signature(Some("gelato")), &pattern(5), 90).unwrap();
        assert_eq!(score.confidence, 85.0);
        assert_eq!(
            score.reasons,
            vec!["Previously purchased 4x".to_string(), "Recent buyer".to_string()]
        );
    }

    #[test]
    fn category_only_uses_similar_items_reason() {
        let score = score_pattern(&signature(None), &pattern(45), 90);
        // 30 + 10 = 40: below threshold.
        assert!(score.is_none());

        let mut sig = signature(None);
        sig.subcategory = Some("Indoor".into());
        let score = score_pattern(&sig, &pattern(120), 90).unwrap();
        assert_eq!(score.confidence, 55.0);
        assert_eq!(
            score.reasons,
            vec![
                "Previously purchased similar items 4x".to_string(),
                "Lapsed buyer (120 days)".to_string()
            ]
        );
    }
}
