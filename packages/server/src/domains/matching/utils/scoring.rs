//! Confidence scoring for a need against one supply candidate.
//!
//! Points are additive and the total is clamped to `[0, 100]`:
//!
//! | component     | points                                              |
//! |---------------|-----------------------------------------------------|
//! | product name  | 25 exact / 15 substring / 10 two shared words       |
//! | strain        | 40 flower, 20 otherwise; 75% same family, 50% text  |
//! | strain type   | 12 ANY / 15 exact / 7 hybrid crossover              |
//! | category      | 30                                                  |
//! | subcategory   | 15 exact / 7.5 related / 4.5 partial                |
//! | grade         | 10                                                  |
//! | price         | +5 within budget / -10 over                         |
//! | quantity      | +5 in range, tolerance bands either side            |
//!
//! Every awarded or penalized component appends a reason. Reasons are
//! emitted in the order above, so identical inputs give identical output.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

use super::subcategory::{self, SubcategoryRelation};
use crate::common::text::{eq_ignore_case, non_blank, normalize};
use crate::domains::matching::types::ScoringCandidate;
use crate::domains::needs::models::{ClientNeed, StrainType};
use crate::kernel::StrainFamilyCache;

const PRODUCT_EXACT: f64 = 25.0;
const PRODUCT_PARTIAL: f64 = 15.0;
const PRODUCT_SHARED_WORDS: f64 = 10.0;

const STRAIN_WEIGHT_FLOWER: f64 = 40.0;
const STRAIN_WEIGHT_OTHER: f64 = 20.0;
const STRAIN_FAMILY_SHARE: f64 = 0.75;
const STRAIN_PARTIAL_TEXT_SHARE: f64 = 0.5;

const STRAIN_TYPE_ANY: f64 = 12.0;
const STRAIN_TYPE_EXACT: f64 = 15.0;
const STRAIN_TYPE_HYBRID: f64 = 7.0;

const CATEGORY: f64 = 30.0;
const GRADE: f64 = 10.0;

const PRICE_BONUS: f64 = 5.0;
const PRICE_PENALTY: f64 = 10.0;

const QTY_IN_RANGE: f64 = 5.0;
const QTY_NEAR: f64 = 2.0;
const QTY_FAR_UNDER_PENALTY: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub confidence: f64,
    pub reasons: Vec<String>,
}

/// Result of resolving strain families for two different strain ids.
#[derive(Debug, Clone, PartialEq)]
pub enum FamilyCheck {
    /// Not applicable: ids missing or identical.
    Skipped,
    Shared { root_name: String },
    Unrelated,
    /// Lookup failed; no family credit.
    Unavailable,
}

fn is_flower(category: Option<&str>) -> bool {
    matches!(normalize(category).as_str(), "flower" | "flowers")
}

fn fmt_qty(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}

fn words(value: &str) -> HashSet<String> {
    value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

struct Tally {
    total: f64,
    reasons: Vec<String>,
}

impl Tally {
    fn add(&mut self, points: f64, reason: impl Into<String>) {
        self.total += points;
        self.reasons.push(reason.into());
    }
}

/// Scores `candidate` against `need`. Pure: the family relation is passed in.
pub fn score_candidate(need: &ClientNeed, candidate: &ScoringCandidate<'_>, family: &FamilyCheck) -> Score {
    let mut tally = Tally {
        total: 0.0,
        reasons: Vec::new(),
    };
    let flower = is_flower(need.category.as_deref());

    // Product name
    if !flower {
        if let (Some(wanted), Some(offered)) = (
            non_blank(need.product_name.as_deref()),
            non_blank(candidate.product_name),
        ) {
            let (w, o) = (normalize(Some(wanted)), normalize(Some(offered)));
            if w == o {
                tally.add(PRODUCT_EXACT, "Exact product name match");
            } else if w.contains(&o) || o.contains(&w) {
                tally.add(PRODUCT_PARTIAL, "Partial product name match");
            } else {
                let shared = words(wanted).intersection(&words(offered)).count();
                if shared >= 2 {
                    tally.add(
                        PRODUCT_SHARED_WORDS,
                        format!("Similar product name ({shared} shared words)"),
                    );
                }
            }
        }
    }

    // Strain
    let weight = if flower {
        STRAIN_WEIGHT_FLOWER
    } else {
        STRAIN_WEIGHT_OTHER
    };
    match (need.strain_id, candidate.strain_id) {
        (Some(a), Some(b)) if a == b => tally.add(weight, "Exact strain match"),
        (Some(_), Some(_)) => {
            if let FamilyCheck::Shared { root_name } = family {
                tally.add(
                    weight * STRAIN_FAMILY_SHARE,
                    format!("Same strain family ({root_name})"),
                );
            }
        }
        _ => {
            let (w, o) = (
                normalize(need.strain.as_deref()),
                normalize(candidate.strain),
            );
            if !w.is_empty() && !o.is_empty() {
                if w == o {
                    tally.add(weight, "Exact strain match (text)");
                } else if w.contains(&o) || o.contains(&w) {
                    tally.add(weight * STRAIN_PARTIAL_TEXT_SHARE, "Partial strain match (text)");
                }
            }
        }
    }

    // Strain type
    match (need.strain_type, candidate.strain_type) {
        (Some(StrainType::Any), _) => tally.add(
            STRAIN_TYPE_ANY,
            "Flexible strain type criteria (any type accepted)",
        ),
        (Some(wanted), Some(offered)) if wanted == offered => {
            tally.add(STRAIN_TYPE_EXACT, format!("Strain type match ({offered})"))
        }
        (Some(wanted), Some(offered))
            if wanted == StrainType::Hybrid || offered == StrainType::Hybrid =>
        {
            tally.add(
                STRAIN_TYPE_HYBRID,
                "Partial strain type match (Hybrid compatibility)",
            )
        }
        _ => {}
    }

    // Category
    if eq_ignore_case(need.category.as_deref(), candidate.category) {
        tally.add(CATEGORY, "Category match");
    }

    // Subcategory
    match subcategory::relation(need.subcategory.as_deref(), candidate.subcategory) {
        SubcategoryRelation::Exact => tally.add(SubcategoryRelation::Exact.points(), "Subcategory match"),
        rel @ SubcategoryRelation::Related => tally.add(
            rel.points(),
            format!(
                "Related subcategory ({} ~ {})",
                need.subcategory.as_deref().unwrap_or_default().trim(),
                candidate.subcategory.unwrap_or_default().trim()
            ),
        ),
        rel @ SubcategoryRelation::Partial => tally.add(
            rel.points(),
            format!(
                "Partially related subcategory ({} ~ {})",
                need.subcategory.as_deref().unwrap_or_default().trim(),
                candidate.subcategory.unwrap_or_default().trim()
            ),
        ),
        SubcategoryRelation::Unrelated => {}
    }

    // Grade
    if eq_ignore_case(need.grade.as_deref(), candidate.grade) {
        tally.add(GRADE, "Grade match");
    }

    // Price
    if let (Some(max_price), Some(price)) = (need.price_max, candidate.price) {
        if price <= max_price {
            tally.add(PRICE_BONUS, "Within price budget");
        } else {
            tally.add(
                -PRICE_PENALTY,
                format!("Over budget (${price:.2} > ${max_price:.2})"),
            );
        }
    }

    // Quantity
    if let Some(available) = candidate.available_quantity {
        score_quantity(&mut tally, need, available);
    }

    Score {
        confidence: tally.total.clamp(0.0, 100.0),
        reasons: tally.reasons,
    }
}

fn score_quantity(tally: &mut Tally, need: &ClientNeed, available: f64) {
    let min = need.quantity_min.unwrap_or(0.0);
    let max = need.quantity_max.unwrap_or(f64::INFINITY);
    let shown = fmt_qty(available);

    if available >= min && available <= max {
        tally.add(QTY_IN_RANGE, format!("Quantity in range ({shown} units)"));
        return;
    }

    if available < min {
        let min_shown = fmt_qty(min);
        if available >= min * 0.9 {
            tally.add(
                QTY_NEAR,
                format!("Slightly under quantity ({shown} vs {min_shown} min, within 10%)"),
            );
        } else if available >= min * 0.8 {
            tally.add(0.0, format!("Under quantity ({shown} vs {min_shown} min, within 20%)"));
        } else {
            tally.add(
                -QTY_FAR_UNDER_PENALTY,
                format!("Significantly under quantity ({shown} < {min_shown})"),
            );
        }
        return;
    }

    // available > max, and max is finite here
    let max_shown = fmt_qty(max);
    if available <= max * 1.1 {
        tally.add(
            QTY_NEAR,
            format!("Slightly over quantity ({shown} vs {max_shown} max, within 10%)"),
        );
    } else if available <= max * 1.2 {
        tally.add(0.0, format!("Over quantity ({shown} vs {max_shown} max, within 20%)"));
    } else {
        tally.add(0.0, format!("Significantly over quantity ({shown} > {max_shown})"));
    }
}

/// Scorer with strain-family resolution through the shared cache.
#[derive(Clone)]
pub struct ConfidenceScorer {
    families: Arc<StrainFamilyCache>,
}

impl ConfidenceScorer {
    pub fn new(families: Arc<StrainFamilyCache>) -> Self {
        Self { families }
    }

    pub async fn score(&self, need: &ClientNeed, candidate: &ScoringCandidate<'_>) -> Score {
        let family = self.family_check(need, candidate).await;
        score_candidate(need, candidate, &family)
    }

    async fn family_check(&self, need: &ClientNeed, candidate: &ScoringCandidate<'_>) -> FamilyCheck {
        let (Some(a), Some(b)) = (need.strain_id, candidate.strain_id) else {
            return FamilyCheck::Skipped;
        };
        if a == b {
            return FamilyCheck::Skipped;
        }

        match self.families.shared_family(a, b).await {
            Ok(Some(root)) => FamilyCheck::Shared {
                root_name: if root.name.is_empty() {
                    "Unknown".to_string()
                } else {
                    root.name
                },
            },
            Ok(None) => FamilyCheck::Unrelated,
            Err(e) => {
                warn!(need_strain = %a, candidate_strain = %b, error = %e, "Strain family lookup failed; scoring without family credit");
                FamilyCheck::Unavailable
            }
        }
    }
}
