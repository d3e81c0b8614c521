//! Location resolver
//!
//! The tiered matcher: maps each queried inventory item to zero or more
//! storage addresses. Matching policy is an ordered list of strategies
//! (exact lot equality, then description containment in both directions)
//! tried in sequence. An exact lot match always wins and short-circuits;
//! when multiple rows match, all distinct addresses are surfaced jointly
//! (genuine multi-location stocking is reported, not silently resolved).

use crate::models::{
    GenericRecord, LotRecord, MatchResult, MatchSource, MatchTier, QueryItem,
};
use endloc_common::normalize;

/// Matching strategies, in the order they are attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    /// Exact equality on the normalized lot identifier
    ExactLot,
    /// Generic description is a substring of the queried product name
    ContainsForward,
    /// Queried product name is a substring of the generic description
    ContainsBackward,
}

/// Both containment directions are attempted because reference data and API
/// data differ in which side is more specific.
const STRATEGY_ORDER: [Strategy; 3] = [
    Strategy::ExactLot,
    Strategy::ContainsForward,
    Strategy::ContainsBackward,
];

impl Strategy {
    /// Candidate addresses this strategy yields for one item
    fn candidates(
        &self,
        lot_key: &str,
        name_key: &str,
        lot_table: &[LotRecord],
        generic_table: &[GenericRecord],
    ) -> Vec<String> {
        match self {
            Strategy::ExactLot => {
                if lot_key.is_empty() {
                    return Vec::new();
                }
                lot_table
                    .iter()
                    .filter(|record| record.lot_key == lot_key)
                    .map(|record| record.address.clone())
                    .collect()
            }
            Strategy::ContainsForward => containment_candidates(name_key, generic_table, |desc, name| {
                name.contains(desc)
            }),
            Strategy::ContainsBackward => containment_candidates(name_key, generic_table, |desc, name| {
                desc.contains(name)
            }),
        }
    }

    fn tier(&self) -> (MatchTier, MatchSource) {
        match self {
            Strategy::ExactLot => (MatchTier::ExactLot, MatchSource::LotTable),
            Strategy::ContainsForward | Strategy::ContainsBackward => {
                (MatchTier::ApproxDescription, MatchSource::GenericTable)
            }
        }
    }
}

/// Generic-table rows selected by a containment predicate.
///
/// Rows whose description key is empty are skipped: the empty string is a
/// substring of everything and would match every query.
fn containment_candidates(
    name_key: &str,
    generic_table: &[GenericRecord],
    predicate: impl Fn(&str, &str) -> bool,
) -> Vec<String> {
    if name_key.is_empty() {
        return Vec::new();
    }

    generic_table
        .iter()
        .filter(|record| !record.description_key.is_empty())
        .filter(|record| predicate(&record.description_key, name_key))
        .map(|record| record.address.clone())
        .collect()
}

/// Append addresses preserving first-seen order, deduplicated
fn union_addresses(into: &mut Vec<String>, candidates: Vec<String>) {
    for address in candidates {
        if !into.contains(&address) {
            into.push(address);
        }
    }
}

/// Resolve a batch of query items against the reference tables.
pub fn resolve(
    items: &[QueryItem],
    lot_table: &[LotRecord],
    generic_table: &[GenericRecord],
) -> Vec<MatchResult> {
    let results: Vec<MatchResult> = items
        .iter()
        .map(|item| resolve_item(item, lot_table, generic_table))
        .collect();

    let resolved = results
        .iter()
        .filter(|r| r.match_tier != MatchTier::Unresolved)
        .count();
    tracing::debug!(
        items = items.len(),
        resolved,
        unresolved = results.len() - resolved,
        "Location resolution complete"
    );

    results
}

/// Resolve one query item.
///
/// 1. Exact lot match: wins and short-circuits further lookup.
/// 2. Description containment (both directions, union of all candidates).
/// 3. Otherwise UNRESOLVED with no addresses.
pub fn resolve_item(
    item: &QueryItem,
    lot_table: &[LotRecord],
    generic_table: &[GenericRecord],
) -> MatchResult {
    let lot_key = normalize(&item.lot_code);
    let name_key = normalize(&item.product_name);

    let mut addresses: Vec<String> = Vec::new();
    let mut tier = MatchTier::Unresolved;
    let mut source = MatchSource::None;

    for strategy in STRATEGY_ORDER {
        let candidates = strategy.candidates(&lot_key, &name_key, lot_table, generic_table);
        if candidates.is_empty() {
            continue;
        }

        if addresses.is_empty() {
            (tier, source) = strategy.tier();
        }
        union_addresses(&mut addresses, candidates);

        // Exact lot always takes priority over description matching
        if strategy == Strategy::ExactLot {
            break;
        }
    }

    MatchResult {
        product_name: item.product_name.clone(),
        lot_code: item.lot_code.clone(),
        quantity: item.quantity,
        unit: item.unit.clone(),
        expiry_date: item.expiry_date,
        resolved_addresses: addresses,
        match_tier: tier,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lot(lot_key: &str, description: &str, address: &str) -> LotRecord {
        LotRecord {
            lot_key: lot_key.to_string(),
            description_key: description.to_string(),
            address: address.to_string(),
        }
    }

    fn generic(description: &str, address: &str) -> GenericRecord {
        GenericRecord {
            description_key: description.to_string(),
            address: address.to_string(),
        }
    }

    fn item(product_name: &str, lot_code: &str) -> QueryItem {
        QueryItem {
            product_name: product_name.to_string(),
            lot_code: lot_code.to_string(),
            quantity: 1.0,
            unit: "UN".to_string(),
            expiry_date: None,
        }
    }

    #[test]
    fn test_exact_lot_match_case_insensitive() {
        let lots = vec![lot("AB12", "DIPIRONA", "A-10")];

        let result = resolve_item(&item("whatever", "ab12"), &lots, &[]);

        assert_eq!(result.match_tier, MatchTier::ExactLot);
        assert_eq!(result.source, MatchSource::LotTable);
        assert_eq!(result.resolved_addresses, vec!["A-10"]);
    }

    #[test]
    fn test_exact_lot_wins_over_generic() {
        let lots = vec![lot("AB12", "DIPIRONA", "A-10")];
        let generics = vec![generic("DIPIRONA", "B-05")];

        let result = resolve_item(&item("DIPIRONA", "AB12"), &lots, &generics);

        assert_eq!(result.match_tier, MatchTier::ExactLot);
        assert_eq!(result.resolved_addresses, vec!["A-10"]);
    }

    #[test]
    fn test_duplicate_lot_ids_surface_all_addresses() {
        let lots = vec![
            lot("AB12", "DIPIRONA", "A-10"),
            lot("AB12", "DIPIRONA", "C-03"),
            lot("AB12", "DIPIRONA", "A-10"),
        ];

        let result = resolve_item(&item("", "AB12"), &lots, &[]);

        // Deduplicated, first-seen order preserved
        assert_eq!(result.resolved_addresses, vec!["A-10", "C-03"]);
    }

    #[test]
    fn test_empty_lot_code_never_matches_exact() {
        let lots = vec![lot("", "DIPIRONA", "A-10")];

        let result = resolve_item(&item("SOMETHING ELSE", ""), &lots, &[]);

        assert_ne!(result.match_tier, MatchTier::ExactLot);
        assert_eq!(result.match_tier, MatchTier::Unresolved);
    }

    #[test]
    fn test_nan_lot_code_never_matches_exact() {
        let lots = vec![lot("", "DIPIRONA", "A-10")];

        let result = resolve_item(&item("X", "NaN"), &lots, &[]);
        assert_ne!(result.match_tier, MatchTier::ExactLot);
    }

    #[test]
    fn test_contains_forward_generic_inside_query() {
        let generics = vec![generic("DIPIRONA", "B-05")];

        let result = resolve_item(&item("DIPIRONA SODICA", ""), &[], &generics);

        assert_eq!(result.match_tier, MatchTier::ApproxDescription);
        assert_eq!(result.source, MatchSource::GenericTable);
        assert_eq!(result.resolved_addresses, vec!["B-05"]);
    }

    #[test]
    fn test_contains_backward_query_inside_generic() {
        let generics = vec![generic("DIPIRONA SODICA 500MG", "B-06")];

        let result = resolve_item(&item("DIPIRONA SODICA", ""), &[], &generics);

        assert_eq!(result.match_tier, MatchTier::ApproxDescription);
        assert_eq!(result.resolved_addresses, vec!["B-06"]);
    }

    #[test]
    fn test_both_directions_unioned() {
        let generics = vec![
            generic("DIPIRONA", "B-05"),
            generic("DIPIRONA SODICA 500MG", "B-06"),
        ];

        let result = resolve_item(&item("DIPIRONA SODICA", ""), &[], &generics);

        assert_eq!(result.resolved_addresses, vec!["B-05", "B-06"]);
    }

    #[test]
    fn test_empty_generic_description_never_matches() {
        let generics = vec![generic("", "Z-99")];

        let result = resolve_item(&item("DIPIRONA", ""), &[], &generics);

        assert_eq!(result.match_tier, MatchTier::Unresolved);
        assert!(result.resolved_addresses.is_empty());
    }

    #[test]
    fn test_unresolved_when_neither_table_matches() {
        let lots = vec![lot("XY99", "AMOXICILINA", "A-01")];
        let generics = vec![generic("IBUPROFENO", "B-01")];

        let result = resolve_item(&item("DIPIRONA", "AB12"), &lots, &generics);

        assert_eq!(result.match_tier, MatchTier::Unresolved);
        assert_eq!(result.source, MatchSource::None);
        assert!(result.resolved_addresses.is_empty());
    }

    #[test]
    fn test_lot_miss_falls_back_to_description() {
        let lots = vec![lot("XY99", "AMOXICILINA", "A-01")];
        let generics = vec![generic("DIPIRONA", "B-05")];

        let result = resolve_item(&item("DIPIRONA SODICA", "AB12"), &lots, &generics);

        assert_eq!(result.match_tier, MatchTier::ApproxDescription);
        assert_eq!(result.resolved_addresses, vec!["B-05"]);
    }

    #[test]
    fn test_resolve_batch_carries_item_fields() {
        let generics = vec![generic("DIPIRONA", "B-05")];
        let items = vec![QueryItem {
            product_name: "Dipirona Gotas".to_string(),
            lot_code: "".to_string(),
            quantity: 3.0,
            unit: "FR".to_string(),
            expiry_date: chrono::NaiveDate::from_ymd_opt(2027, 1, 1),
        }];

        let results = resolve(&items, &[], &generics);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].product_name, "Dipirona Gotas");
        assert_eq!(results[0].quantity, 3.0);
        assert_eq!(results[0].unit, "FR");
        assert_eq!(results[0].expiry_date, chrono::NaiveDate::from_ymd_opt(2027, 1, 1));
    }
}
