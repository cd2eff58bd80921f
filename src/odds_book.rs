//! Normalizes bookmaker offers for one event market and selects best prices.
//!
//! Only allow-listed bookmakers count. "Current" means the most recent offer
//! per bookmaker; "best" means the maximum decimal price among current
//! offers, with ties broken by earliest fetch timestamp then bookmaker name
//! so repeated runs pick the same book.

use std::collections::HashMap;

use crate::issues::{IssueTracker, Severity, steps};
use crate::types::{MarketKey, OddsOffer, canonical_player_name};

/// Implied probability at a decimal price. Deliberately keeps the
/// bookmaker's overround: no de-vigging happens anywhere in the engine.
pub fn implied_probability(odds_decimal: f64) -> f64 {
    1.0 / odds_decimal
}

/// Best current allowed-book price per selection, keyed by canonical
/// selection name. Selections priced only by disallowed books are dropped
/// and reported once per market.
pub fn best_prices(
    event_label: &str,
    market: MarketKey,
    offers: &[OddsOffer],
    allowed_bookmakers: &[String],
    issues: &IssueTracker,
) -> HashMap<String, OddsOffer> {
    let mut by_selection: HashMap<String, Vec<&OddsOffer>> = HashMap::new();
    for offer in offers {
        if offer.odds_decimal <= 1.0 {
            continue;
        }
        by_selection
            .entry(canonical_player_name(&offer.selection))
            .or_default()
            .push(offer);
    }

    let mut out = HashMap::new();
    let mut excluded = 0usize;
    for (key, selection_offers) in by_selection {
        match best_allowed_price(&selection_offers, allowed_bookmakers) {
            Some(best) => {
                out.insert(key, best.clone());
            }
            None => excluded += 1,
        }
    }

    if excluded > 0 {
        issues.record(
            steps::ODDS_BOOK,
            Severity::Info,
            format!(
                "{event_label}/{}: {excluded} selections priced only by disallowed bookmakers",
                market.as_str()
            ),
        );
    }

    out
}

/// Best price among the most recent offer of each allowed bookmaker.
pub fn best_allowed_price(
    offers: &[&OddsOffer],
    allowed_bookmakers: &[String],
) -> Option<OddsOffer> {
    let mut current: HashMap<String, &OddsOffer> = HashMap::new();
    for offer in offers {
        let book = offer.bookmaker.trim().to_ascii_lowercase();
        if !allowed_bookmakers.contains(&book) {
            continue;
        }
        current
            .entry(book)
            .and_modify(|existing| {
                if offer.fetched_at > existing.fetched_at {
                    *existing = offer;
                }
            })
            .or_insert(offer);
    }

    current
        .into_values()
        .max_by(|a, b| {
            a.odds_decimal
                .total_cmp(&b.odds_decimal)
                // Higher price wins; among equal prices prefer the earliest
                // snapshot, then a stable name order.
                .then_with(|| b.fetched_at.cmp(&a.fetched_at))
                .then_with(|| b.bookmaker.cmp(&a.bookmaker))
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn offer(selection: &str, book: &str, odds: f64, hour: u32) -> OddsOffer {
        OddsOffer {
            selection: selection.to_string(),
            bookmaker: book.to_string(),
            odds_decimal: odds,
            odds_display: format!("{odds:.1}"),
            fetched_at: Utc.with_ymd_and_hms(2026, 7, 14, hour, 0, 0).unwrap(),
        }
    }

    fn allowed() -> Vec<String> {
        vec!["bet365".to_string(), "skybet".to_string()]
    }

    #[test]
    fn implied_probability_is_reciprocal() {
        assert!((implied_probability(5.0) - 0.2).abs() < 1e-12);
        assert!((implied_probability(2.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn picks_maximum_price_across_allowed_books() {
        let offers = vec![
            offer("A", "bet365", 5.0, 8),
            offer("A", "skybet", 5.5, 8),
            offer("A", "shadowbook", 9.0, 8),
        ];
        let refs: Vec<&OddsOffer> = offers.iter().collect();
        let best = best_allowed_price(&refs, &allowed()).expect("price");
        assert_eq!(best.bookmaker, "skybet");
        assert_eq!(best.odds_decimal, 5.5);
    }

    #[test]
    fn only_the_most_recent_offer_per_book_counts() {
        // bet365 shortened from 6.0 to 4.5; the stale 6.0 must not win.
        let offers = vec![
            offer("A", "bet365", 6.0, 8),
            offer("A", "bet365", 4.5, 11),
            offer("A", "skybet", 5.0, 8),
        ];
        let refs: Vec<&OddsOffer> = offers.iter().collect();
        let best = best_allowed_price(&refs, &allowed()).expect("price");
        assert_eq!(best.bookmaker, "skybet");
        assert_eq!(best.odds_decimal, 5.0);
    }

    #[test]
    fn price_ties_break_by_earliest_snapshot() {
        let offers = vec![
            offer("A", "bet365", 5.0, 10),
            offer("A", "skybet", 5.0, 8),
        ];
        let refs: Vec<&OddsOffer> = offers.iter().collect();
        let best = best_allowed_price(&refs, &allowed()).expect("price");
        assert_eq!(best.bookmaker, "skybet");
    }

    #[test]
    fn selection_with_no_allowed_book_is_excluded_and_logged() {
        let issues = IssueTracker::new();
        let offers = vec![
            offer("A", "bet365", 5.0, 8),
            offer("B", "shadowbook", 8.0, 8),
        ];
        let best = best_prices("ev", MarketKey::Win, &offers, &allowed(), &issues);
        assert_eq!(best.len(), 1);
        assert!(best.contains_key(&canonical_player_name("A")));
        assert_eq!(issues.count_for_step(steps::ODDS_BOOK), 1);
    }

    #[test]
    fn selections_key_by_canonical_name() {
        let issues = IssueTracker::new();
        let offers = vec![offer("Scheffler, Scottie", "bet365", 5.0, 8)];
        let best = best_prices("ev", MarketKey::Win, &offers, &allowed(), &issues);
        assert!(best.contains_key(&canonical_player_name("Scottie Scheffler")));
    }
}
