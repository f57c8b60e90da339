//! Property-based tests for reward engine invariants
//!
//! - Uncapped rules pay exactly amount * percentage / 100, rounded half-up
//! - Reward caps pin the reward and never let it decrease as spend grows
//! - Spending caps pay percentage of min(amount, cap)
//! - A zero cap pays nothing
//! - Exclusions beat any rate
//! - Ranking is sorted and stable

use cc_rewards::calculator::round2;
use cc_rewards::{
    CapType, Card, MatchKind, Rule, Transaction, calculate_card_reward, rank_cards,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Strategy for generating valid amounts (positive decimals)
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000_00i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Reward rates from 0% to 20% in basis-point steps
fn percentage_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=2000i64).prop_map(|bp| Decimal::new(bp, 2))
}

fn cap_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_00i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn single_rule_card(rule: Rule) -> Card {
    Card {
        id: "card".into(),
        name: "Card".into(),
        bank: "Bank".into(),
        foreign_currency_fee: None,
        reward_config: None,
        rules: vec![rule],
    }
}

fn purchase(amount: Decimal) -> Transaction {
    Transaction {
        merchant: "wellcome".into(),
        category: "supermarket".into(),
        amount,
        payment_method: "physical_card".into(),
        is_foreign_currency: false,
    }
}

proptest! {
    #[test]
    fn prop_uncapped_reward_is_exact(amount in amount_strategy(), pct in percentage_strategy()) {
        let card = single_rule_card(Rule::base(pct));
        let result = calculate_card_reward(&card, &purchase(amount)).unwrap();
        prop_assert_eq!(result.reward, round2(amount * pct / Decimal::ONE_HUNDRED));
        prop_assert!(result.caveats.is_empty());
    }

    #[test]
    fn prop_reward_cap_pins_reward(
        a in amount_strategy(),
        b in amount_strategy(),
        pct in (1i64..=2000i64).prop_map(|bp| Decimal::new(bp, 2)),
        cap in cap_strategy(),
    ) {
        let card = single_rule_card(Rule::base(pct).with_cap(cap, CapType::Reward));
        let (low, high) = if a <= b { (a, b) } else { (b, a) };

        let low_reward = calculate_card_reward(&card, &purchase(low)).unwrap().reward;
        let high_reward = calculate_card_reward(&card, &purchase(high)).unwrap().reward;

        prop_assert!(low_reward <= cap);
        prop_assert!(high_reward <= cap);
        prop_assert!(low_reward <= high_reward);

        let break_even = cap * Decimal::ONE_HUNDRED / pct;
        if low > break_even {
            prop_assert_eq!(low_reward, round2(cap));
        }
    }

    #[test]
    fn prop_spending_cap_limits_eligible_spend(
        amount in amount_strategy(),
        pct in percentage_strategy(),
        cap in cap_strategy(),
    ) {
        let card = single_rule_card(Rule::base(pct).with_cap(cap, CapType::Spending));
        let result = calculate_card_reward(&card, &purchase(amount)).unwrap();
        prop_assert_eq!(result.reward, round2(amount.min(cap) * pct / Decimal::ONE_HUNDRED));
    }

    #[test]
    fn prop_zero_cap_pays_nothing(
        amount in amount_strategy(),
        pct in percentage_strategy(),
        reward_cap in any::<bool>(),
    ) {
        let cap_type = if reward_cap { CapType::Reward } else { CapType::Spending };
        let card = single_rule_card(Rule::base(pct).with_cap(Decimal::ZERO, cap_type));
        let result = calculate_card_reward(&card, &purchase(amount)).unwrap();
        prop_assert_eq!(result.reward, Decimal::ZERO);
    }

    #[test]
    fn prop_excluded_rule_never_selected(amount in amount_strategy(), pct in percentage_strategy()) {
        let mut generous = Rule::new(MatchKind::Merchant, vec!["wellcome".into()], dec!(50));
        generous.excluded_categories = vec!["supermarket".into()];
        let card = Card {
            rules: vec![generous, Rule::base(pct)],
            ..single_rule_card(Rule::base(pct))
        };
        let result = calculate_card_reward(&card, &purchase(amount)).unwrap();
        prop_assert_eq!(result.rule.map(|r| r.match_kind), Some(MatchKind::Base));
    }

    #[test]
    fn prop_ranking_sorted_and_stable(
        rates in proptest::collection::vec(0i64..=10i64, 1..12),
        amount in amount_strategy(),
    ) {
        let cards: Vec<Card> = rates
            .iter()
            .enumerate()
            .map(|(i, bp)| Card {
                id: format!("card-{i}"),
                ..single_rule_card(Rule::base(Decimal::new(*bp, 1)))
            })
            .collect();
        let results = rank_cards(&cards, &purchase(amount)).unwrap();
        prop_assert_eq!(results.len(), cards.len());

        for pair in results.windows(2) {
            prop_assert!(pair[0].effective_rate >= pair[1].effective_rate);
            if pair[0].effective_rate == pair[1].effective_rate {
                let position = |id: &str| cards.iter().position(|c| c.id == id).unwrap();
                prop_assert!(position(&pair[0].card.id) < position(&pair[1].card.id));
            }
        }
    }

    #[test]
    fn prop_calculation_is_deterministic(amount in amount_strategy(), pct in percentage_strategy()) {
        let card = single_rule_card(Rule::base(pct).with_cap(dec!(123.45), CapType::Reward));
        let first = calculate_card_reward(&card, &purchase(amount)).unwrap();
        let second = calculate_card_reward(&card, &purchase(amount)).unwrap();
        prop_assert_eq!(first, second);
    }
}

#[test]
fn base_rule_one_percent() {
    let card = single_rule_card(Rule::base(dec!(1)));
    let result = calculate_card_reward(&card, &purchase(dec!(1000))).unwrap();
    assert_eq!(result.reward.to_string(), "10.00");
    assert!(result.caveats.is_empty());
}

#[test]
fn dining_reward_cap_scenario() {
    let card = Card {
        rules: vec![
            Rule::new(MatchKind::Category, vec!["dining".into()], dec!(5))
                .with_cap(dec!(200), CapType::Reward),
            Rule::base(dec!(0.4)),
        ],
        ..single_rule_card(Rule::base(dec!(0.4)))
    };
    let tx = Transaction {
        category: "dining".into(),
        ..purchase(dec!(10000))
    };
    let result = calculate_card_reward(&card, &tx).unwrap();
    assert_eq!(result.effective_rate, dec!(2.0));
    assert_eq!(result.reward.to_string(), "200.00");
    assert!(result.caveats.iter().any(|c| c == "reward cap reached"));
}

#[test]
fn merchant_rule_beats_supermarket_category() {
    let card = Card {
        rules: vec![
            Rule::new(MatchKind::Category, vec!["supermarket".into()], dec!(2)),
            Rule::new(MatchKind::Merchant, vec!["wellcome".into()], dec!(5)),
            Rule::base(dec!(0.4)),
        ],
        ..single_rule_card(Rule::base(dec!(0.4)))
    };
    let result = calculate_card_reward(&card, &purchase(dec!(200))).unwrap();
    assert_eq!(result.rule.map(|r| r.match_kind), Some(MatchKind::Merchant));
    assert_eq!(result.effective_rate, dec!(5));
    assert_eq!(result.reward, dec!(10.00));
}

#[test]
fn monthly_minimum_spend_is_a_caveat() {
    let mut promo = Rule::new(MatchKind::Merchant, vec!["wellcome".into()], dec!(5));
    promo.monthly_min_spend = Some(dec!(8000));
    let card = Card {
        rules: vec![promo, Rule::base(dec!(0.4))],
        ..single_rule_card(Rule::base(dec!(0.4)))
    };
    let result = calculate_card_reward(&card, &purchase(dec!(500))).unwrap();
    assert_eq!(result.effective_rate, dec!(5));
    assert_eq!(result.reward, dec!(25.00));
    assert_eq!(result.caveats, vec!["minimum monthly spend required: 8000"]);
}
