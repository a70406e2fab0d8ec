//! Subcategory affinity: which subcategories a buyer will accept in place of
//! the one they asked for, and for how much credit.

use crate::common::text::normalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubcategoryRelation {
    Exact,
    Related,
    Partial,
    Unrelated,
}

impl SubcategoryRelation {
    pub fn points(&self) -> f64 {
        match self {
            SubcategoryRelation::Exact => 15.0,
            SubcategoryRelation::Related => 7.5,
            SubcategoryRelation::Partial => 4.5,
            SubcategoryRelation::Unrelated => 0.0,
        }
    }
}

struct Affinity {
    name: &'static str,
    related: &'static [&'static str],
    partial: &'static [&'static str],
}

const AFFINITIES: &[Affinity] = &[
    // Flower grow methods
    Affinity { name: "indoor", related: &["greenhouse", "light dep"], partial: &["outdoor"] },
    Affinity { name: "greenhouse", related: &["indoor", "light dep"], partial: &["outdoor"] },
    Affinity { name: "light dep", related: &["greenhouse", "outdoor"], partial: &["indoor"] },
    Affinity { name: "outdoor", related: &["light dep"], partial: &["greenhouse", "indoor"] },
    // Flower cuts
    Affinity { name: "smalls", related: &["trim", "popcorn"], partial: &["shake"] },
    Affinity { name: "popcorn", related: &["smalls"], partial: &["trim"] },
    Affinity { name: "trim", related: &["smalls", "shake"], partial: &["popcorn"] },
    Affinity { name: "shake", related: &["trim"], partial: &["smalls"] },
    // Concentrates
    Affinity { name: "shatter", related: &["wax", "budder"], partial: &["live resin"] },
    Affinity { name: "wax", related: &["budder", "shatter"], partial: &["crumble"] },
    Affinity { name: "budder", related: &["wax", "badder"], partial: &["shatter"] },
    Affinity { name: "badder", related: &["budder"], partial: &["wax"] },
    Affinity { name: "crumble", related: &["wax"], partial: &["budder"] },
    Affinity { name: "live resin", related: &["live rosin", "sauce"], partial: &["shatter", "badder"] },
    Affinity { name: "live rosin", related: &["live resin", "rosin"], partial: &["hash"] },
    Affinity { name: "rosin", related: &["live rosin"], partial: &["hash"] },
    Affinity { name: "sauce", related: &["live resin", "diamonds"], partial: &["badder"] },
    Affinity { name: "diamonds", related: &["sauce"], partial: &["distillate"] },
    Affinity { name: "distillate", related: &[], partial: &["diamonds"] },
    Affinity { name: "hash", related: &["kief"], partial: &["rosin"] },
    Affinity { name: "kief", related: &["hash"], partial: &[] },
    // Vapes
    Affinity { name: "cartridge", related: &["pod"], partial: &["disposable"] },
    Affinity { name: "pod", related: &["cartridge"], partial: &["disposable"] },
    Affinity { name: "disposable", related: &["all-in-one"], partial: &["cartridge", "pod"] },
    Affinity { name: "all-in-one", related: &["disposable"], partial: &["cartridge"] },
    // Pre-rolls
    Affinity { name: "pre-roll", related: &["infused pre-roll"], partial: &["blunt"] },
    Affinity { name: "infused pre-roll", related: &["pre-roll"], partial: &[] },
    Affinity { name: "blunt", related: &[], partial: &["pre-roll"] },
    // Edibles
    Affinity { name: "gummies", related: &["chews"], partial: &["chocolate"] },
    Affinity { name: "chews", related: &["gummies"], partial: &[] },
    Affinity { name: "chocolate", related: &["baked goods"], partial: &["gummies"] },
    Affinity { name: "baked goods", related: &["chocolate"], partial: &[] },
];

fn lookup(name: &str) -> Option<&'static Affinity> {
    AFFINITIES.iter().find(|a| a.name == name)
}

/// How a candidate's subcategory relates to the one the need asked for.
/// Looks up the need's row first, then falls back to the candidate's row.
pub fn relation(wanted: Option<&str>, offered: Option<&str>) -> SubcategoryRelation {
    let (wanted, offered) = (normalize(wanted), normalize(offered));
    if wanted.is_empty() || offered.is_empty() {
        return SubcategoryRelation::Unrelated;
    }
    if wanted == offered {
        return SubcategoryRelation::Exact;
    }

    let classify = |from: &str, to: &str| {
        lookup(from).and_then(|a| {
            if a.related.iter().any(|r| *r == to) {
                Some(SubcategoryRelation::Related)
            } else if a.partial.iter().any(|p| *p == to) {
                Some(SubcategoryRelation::Partial)
            } else {
                None
            }
        })
    };

    classify(&wanted, &offered)
        .or_else(|| classify(&offered, &wanted))
        .unwrap_or(SubcategoryRelation::Unrelated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_ignores_case() {
        assert_eq!(relation(Some("Indoor"), Some("indoor ")), SubcategoryRelation::Exact);
    }

    #[test]
    fn smalls_relate_to_trim_at_half_credit() {
        let rel = relation(Some("Smalls"), Some("Trim"));
        assert_eq!(rel, SubcategoryRelation::Related);
        assert_eq!(rel.points(), 7.5);
    }

    #[test]
    fn partial_relation() {
        assert_eq!(relation(Some("Indoor"), Some("Outdoor")), SubcategoryRelation::Partial);
        assert_eq!(SubcategoryRelation::Partial.points(), 4.5);
    }

    #[test]
    fn falls_back_to_candidate_row() {
        // The badder row does not list live resin; the live resin row does.
        assert_eq!(relation(Some("Badder"), Some("Live Resin")), SubcategoryRelation::Partial);
        assert_eq!(relation(Some("Blunt"), Some("Infused Pre-Roll")), SubcategoryRelation::Unrelated);
    }

    #[test]
    fn missing_side_is_unrelated() {
        assert_eq!(relation(None, Some("Indoor")), SubcategoryRelation::Unrelated);
        assert_eq!(relation(Some("Indoor"), Some("  ")), SubcategoryRelation::Unrelated);
        assert_eq!(relation(Some("Indoor"), Some("Gummies")), SubcategoryRelation::Unrelated);
    }
}
