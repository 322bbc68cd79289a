//! Property tests for ledger replay.
//!
//! Tests cover:
//! - Replay is deterministic for a given ledger
//! - Open holdings always have positive shares and non-negative cost
//! - Cash equals starting cash minus buys plus sells
//! - Buy-only ledgers carry the exact sum of totals as cost basis
//! - Per-share cost times shares reproduces the cost basis
//! - Checkpointed replay over a growing ledger matches a full replay
//! - Checkpointed replay after an earlier record is rewritten matches a full replay

mod common;

use common::*;
use papertrader::domain::checkpoint::ReplayCache;
use papertrader::domain::reconstruction::reconstruct;
use papertrader::domain::trade::{Action, TOTAL_EPSILON, TradeRecord};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

const STARTING_CASH: Decimal = dec!(100000);
const SYMBOLS: [&str; 3] = ["AAPL", "MSFT", "BRK.B"];

fn arb_trade() -> impl Strategy<Value = (usize, bool, i64, i64)> {
    (0..SYMBOLS.len(), any::<bool>(), 1i64..50, 1i64..50_000)
}

fn build_ledger(raw: &[(usize, bool, i64, i64)]) -> Vec<TradeRecord> {
    raw.iter()
        .enumerate()
        .map(|(i, &(sym, is_buy, quantity, cents))| {
            let at = ts(1, 0) + chrono::Duration::minutes(i as i64);
            let price = Decimal::new(cents, 2);
            if is_buy {
                buy(SYMBOLS[sym], quantity, price, at)
            } else {
                sell(SYMBOLS[sym], quantity, price, at)
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn replay_is_deterministic(raw in prop::collection::vec(arb_trade(), 0..60)) {
        let ledger = build_ledger(&raw);
        let first = reconstruct(STARTING_CASH, &ledger).unwrap();
        let second = reconstruct(STARTING_CASH, &ledger).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn open_holdings_are_positive(raw in prop::collection::vec(arb_trade(), 0..60)) {
        let ledger = build_ledger(&raw);
        let state = reconstruct(STARTING_CASH, &ledger).unwrap();
        for (symbol, holding) in &state.holdings {
            prop_assert_eq!(symbol, &holding.symbol);
            prop_assert!(holding.shares > 0);
            prop_assert!(holding.cost_basis >= Decimal::ZERO);
        }
    }

    #[test]
    fn per_share_cost_reproduces_cost_basis(raw in prop::collection::vec(arb_trade(), 0..60)) {
        let ledger = build_ledger(&raw);
        let state = reconstruct(STARTING_CASH, &ledger).unwrap();
        for holding in state.holdings.values() {
            let rebuilt = holding.per_share_cost() * Decimal::from(holding.shares);
            prop_assert!(
                (rebuilt - holding.cost_basis).abs() < TOTAL_EPSILON,
                "{}: {} x {} != {}",
                holding.symbol,
                holding.per_share_cost(),
                holding.shares,
                holding.cost_basis
            );
        }
    }

    #[test]
    fn cash_is_conserved(raw in prop::collection::vec(arb_trade(), 0..60)) {
        let ledger = build_ledger(&raw);
        let state = reconstruct(STARTING_CASH, &ledger).unwrap();
        let expected = ledger.iter().fold(STARTING_CASH, |cash, t| match t.action {
            Action::Buy => cash - t.total,
            Action::Sell => cash + t.total,
        });
        prop_assert_eq!(state.cash, expected);
    }

    #[test]
    fn buy_only_cost_basis_is_sum_of_totals(
        raw in prop::collection::vec((0..SYMBOLS.len(), 1i64..50, 1i64..50_000), 1..40)
    ) {
        let raw: Vec<_> = raw.into_iter().map(|(s, q, c)| (s, true, q, c)).collect();
        let ledger = build_ledger(&raw);
        let state = reconstruct(STARTING_CASH, &ledger).unwrap();

        let mut totals: HashMap<&str, (i64, Decimal)> = HashMap::new();
        for t in &ledger {
            let entry = totals.entry(t.symbol.as_str()).or_insert((0, Decimal::ZERO));
            entry.0 += t.quantity;
            entry.1 += t.total;
        }
        prop_assert_eq!(state.holdings.len(), totals.len());
        for (symbol, (shares, cost)) in totals {
            let holding = state.holding(symbol).unwrap();
            prop_assert_eq!(holding.shares, shares);
            prop_assert_eq!(holding.cost_basis, cost);
        }
        prop_assert!(state.warnings.is_empty());
    }

    #[test]
    fn checkpointed_replay_matches_full_replay(
        raw in prop::collection::vec(arb_trade(), 0..60),
        cuts in prop::collection::vec(0usize..60, 0..5),
    ) {
        let ledger = build_ledger(&raw);
        let cache = ReplayCache::new(STARTING_CASH);

        let mut cuts: Vec<usize> = cuts.into_iter().map(|c| c.min(ledger.len())).collect();
        cuts.sort_unstable();
        for cut in cuts {
            let partial = cache.replay(&ledger[..cut]).unwrap();
            prop_assert_eq!(partial, reconstruct(STARTING_CASH, &ledger[..cut]).unwrap());
        }

        let full = cache.replay(&ledger).unwrap();
        prop_assert_eq!(full, reconstruct(STARTING_CASH, &ledger).unwrap());
        prop_assert_eq!(cache.checkpointed(), Some(ledger.len()));
    }

    #[test]
    fn checkpoint_after_rewrite_matches_full_replay(
        raw in prop::collection::vec(arb_trade(), 1..40),
        edit in any::<prop::sample::Index>(),
        replacement in arb_trade(),
    ) {
        let mut ledger = build_ledger(&raw);
        let cache = ReplayCache::new(STARTING_CASH);
        cache.replay(&ledger).unwrap();

        let at = edit.index(ledger.len());
        let mut rewritten = raw.clone();
        rewritten[at] = replacement;
        ledger = build_ledger(&rewritten);

        let replayed = cache.replay(&ledger).unwrap();
        prop_assert_eq!(replayed, reconstruct(STARTING_CASH, &ledger).unwrap());
    }
}
