use mise_core::{BulkItemCandidate, Ingredient};

use crate::normalize::normalize_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Closeness {
    Exact,
    Contains(usize),
}

fn closeness(candidate: &str, catalog_name: &str) -> Option<Closeness> {
    if candidate.is_empty() || catalog_name.is_empty() {
        return None;
    }
    if candidate == catalog_name {
        return Some(Closeness::Exact);
    }
    if candidate.contains(catalog_name) || catalog_name.contains(candidate) {
        return Some(Closeness::Contains(candidate.len().abs_diff(catalog_name.len())));
    }
    None
}

/// Best active catalog entry for a receipt line name.
///
/// Exact folded equality wins over containment; among containment matches
/// the smallest length difference wins; the first such entry in catalog
/// order takes any remaining tie.
pub fn best_match<'a>(raw_name: &str, catalog: &'a [Ingredient]) -> Option<&'a Ingredient> {
    let key = normalize_name(raw_name);
    let mut best: Option<(Closeness, &Ingredient)> = None;

    for ingredient in catalog.iter().filter(|ingredient| ingredient.is_active) {
        let Some(score) = closeness(&key, &normalize_name(&ingredient.name)) else {
            continue;
        };
        if best.is_none_or(|(current, _)| score < current) {
            best = Some((score, ingredient));
        }
    }

    best.map(|(_, ingredient)| ingredient)
}

/// Proposes a catalog ingredient for every candidate.
///
/// Candidates that already carry a link to an active ingredient keep it.
/// Candidates without a plausible counterpart come back unmatched.
pub fn match_candidates(
    candidates: Vec<BulkItemCandidate>,
    catalog: &[Ingredient],
) -> Vec<BulkItemCandidate> {
    candidates
        .into_iter()
        .map(|mut candidate| {
            let linked = candidate.matched_ingredient_id.filter(|id| {
                catalog
                    .iter()
                    .any(|ingredient| ingredient.id == *id && ingredient.is_active)
            });
            candidate.matched_ingredient_id =
                linked.or_else(|| best_match(&candidate.raw_name, catalog).map(|found| found.id));
            candidate
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use mise_core::Unit;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;

    fn named(names: &[&str]) -> Vec<Ingredient> {
        names
            .iter()
            .map(|name| Ingredient::new(*name, Unit::Kilogram, Decimal::ZERO))
            .collect()
    }

    fn line(name: &str) -> BulkItemCandidate {
        BulkItemCandidate::new(name, dec!(1), dec!(10), "kg")
    }

    #[test]
    fn matches_alternate_spellings() {
        let catalog = named(&["Queijo Muçarela", "Presunto"]);
        let matched = match_candidates(vec![line("QUEIJO MUSSARELA FATIADO")], &catalog);
        assert_eq!(matched[0].matched_ingredient_id, Some(catalog[0].id));
    }

    #[test]
    fn decomposed_receipt_text_still_matches() {
        let catalog = named(&["Queijo Mussarela", "Presunto"]);
        let matched = match_candidates(vec![line("QUEIJO MUC\u{0327}ARELA 1KG")], &catalog);
        assert_eq!(matched[0].matched_ingredient_id, Some(catalog[0].id));
    }

    #[test]
    fn exact_beats_containment() {
        let catalog = named(&["Tomate Italiano", "Tomate"]);
        assert_eq!(best_match("tomate", &catalog).map(|found| found.id), Some(catalog[1].id));
    }

    #[test]
    fn tightest_containment_then_scan_order() {
        let catalog = named(&["Oleo", "Oleo de Soja", "Soja"]);
        // "oleodesoja1l" contains all three; "oleodesoja" is closest
        assert_eq!(
            best_match("Óleo de soja 1L", &catalog).map(|found| found.id),
            Some(catalog[1].id)
        );

        let tied = named(&["Sal", "Mel"]);
        // both names are three letters shorter than "salmel"
        assert_eq!(
            best_match("sal mel", &tied).map(|found| found.id),
            Some(tied[0].id)
        );
    }

    #[test]
    fn unmatched_lines_stay_empty() {
        let catalog = named(&["Farinha"]);
        let matched = match_candidates(vec![line("Detergente"), line("***")], &catalog);
        assert!(matched.iter().all(|candidate| !candidate.is_matched()));
    }

    #[test]
    fn skips_inactive_and_keeps_manual_links() {
        let mut catalog = named(&["Manteiga", "Manteiga sem sal"]);
        catalog[0].is_active = false;

        let mut manual = line("Manteiga");
        manual.matched_ingredient_id = Some(catalog[1].id);
        let mut stale = line("Creme");
        stale.matched_ingredient_id = Some(catalog[0].id);

        let matched = match_candidates(vec![line("Manteiga"), manual, stale], &catalog);
        assert_eq!(matched[0].matched_ingredient_id, Some(catalog[1].id));
        assert_eq!(matched[1].matched_ingredient_id, Some(catalog[1].id));
        assert_eq!(matched[2].matched_ingredient_id, None);
    }
}
