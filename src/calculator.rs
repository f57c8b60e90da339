//! Best-rule selection and reward computation for one card.

use std::cmp::Ordering;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::matching::matches;
use crate::models::{
    CAVEAT_NO_APPLICABLE_RULE, CAVEAT_REWARD_CAP, CAVEAT_SPENDING_CAP, CalculationResult, CapType,
    Card, DEFAULT_PAYMENT_METHOD, PaymentSuggestion, RewardMethod, Rule, SpendingSuggestion,
    Transaction,
};
use crate::{Error, Result};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Rounds half-up to cents, always keeping two decimal places.
pub fn round2(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

fn overflow(lhs: Decimal, op: char, rhs: Decimal) -> Error {
    Error::InvalidInput(format!("arithmetic overflow computing {lhs} {op} {rhs}"))
}

fn mul(lhs: Decimal, rhs: Decimal) -> Result<Decimal> {
    lhs.checked_mul(rhs).ok_or_else(|| overflow(lhs, '*', rhs))
}

fn div(lhs: Decimal, rhs: Decimal) -> Result<Decimal> {
    lhs.checked_div(rhs).ok_or_else(|| overflow(lhs, '/', rhs))
}

/// `percentage` percent of `amount`.
fn percent_of(amount: Decimal, percentage: Decimal) -> Result<Decimal> {
    div(mul(amount, percentage)?, HUNDRED)
}

/// What a single rule earns on a given amount.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RuleOutcome {
    rate: Decimal,
    /// Unrounded reward
    reward: Decimal,
    cap_binds: bool,
}

impl RuleOutcome {
    fn uncapped(percentage: Decimal, amount: Decimal) -> Result<Self> {
        Ok(Self {
            rate: percentage,
            reward: percent_of(amount, percentage)?,
            cap_binds: false,
        })
    }
}

fn evaluate(rule: &Rule, amount: Decimal) -> Result<RuleOutcome> {
    let Some(cap) = rule.cap else {
        return RuleOutcome::uncapped(rule.percentage, amount);
    };
    if cap.is_zero() {
        return Ok(RuleOutcome {
            rate: Decimal::ZERO,
            reward: Decimal::ZERO,
            cap_binds: true,
        });
    }

    let uncapped = RuleOutcome::uncapped(rule.percentage, amount)?;
    match rule.cap_type {
        // amount > cap / percentage * 100, without the division
        CapType::Reward if uncapped.reward > cap => Ok(RuleOutcome {
            rate: mul(div(cap, amount)?, HUNDRED)?,
            reward: cap,
            cap_binds: true,
        }),
        CapType::Spending if amount > cap => {
            let reward = percent_of(cap, rule.percentage)?;
            Ok(RuleOutcome {
                rate: mul(div(reward, amount)?, HUNDRED)?,
                reward,
                cap_binds: true,
            })
        }
        _ => Ok(uncapped),
    }
}

/// Higher rate first, then the more specific kind, then uncapped.
fn compare_candidates(a: (&Rule, &RuleOutcome), b: (&Rule, &RuleOutcome)) -> Ordering {
    a.1.rate
        .cmp(&b.1.rate)
        .then_with(|| a.0.match_kind.specificity().cmp(&b.0.match_kind.specificity()))
        .then_with(|| b.0.cap.is_some().cmp(&a.0.cap.is_some()))
}

/// Best of `rules` on `amount`; the earliest rule wins a full tie.
fn select_best<'r>(
    rules: impl IntoIterator<Item = &'r Rule>,
    amount: Decimal,
) -> Result<Option<(&'r Rule, RuleOutcome)>> {
    let mut best: Option<(&Rule, RuleOutcome)> = None;
    for rule in rules {
        let outcome = evaluate(rule, amount)?;
        let better = match &best {
            None => true,
            Some((current, current_outcome)) => {
                compare_candidates((rule, &outcome), (*current, current_outcome))
                    == Ordering::Greater
            }
        };
        if better {
            best = Some((rule, outcome));
        }
    }
    Ok(best)
}

pub(crate) fn validate_transaction(tx: &Transaction) -> Result<()> {
    if tx.amount <= Decimal::ZERO {
        return Err(Error::InvalidInput(format!(
            "transaction amount must be positive, got {}",
            tx.amount
        )));
    }
    Ok(())
}

/// Rejects catalog data no rule evaluation could make sense of.
pub fn validate_card(card: &Card) -> Result<()> {
    if let Some(fee) = card.foreign_currency_fee {
        if fee < Decimal::ZERO {
            return Err(Error::InvalidInput(format!(
                "card {}: negative foreign currency fee {}",
                card.id, fee
            )));
        }
    }
    if let Some(config) = &card.reward_config {
        if config.ratio < Decimal::ZERO {
            return Err(Error::InvalidInput(format!(
                "card {}: negative points conversion ratio {}",
                card.id, config.ratio
            )));
        }
    }
    for (index, rule) in card.rules.iter().enumerate() {
        let negative = |value: Decimal| value < Decimal::ZERO;
        if negative(rule.percentage) {
            return Err(Error::InvalidInput(format!(
                "card {} rule {}: negative percentage {}",
                card.id, index, rule.percentage
            )));
        }
        if let Some(cap) = rule.cap.filter(|c| negative(*c)) {
            return Err(Error::InvalidInput(format!(
                "card {} rule {}: negative cap {}",
                card.id, index, cap
            )));
        }
        if let Some(min) = rule.monthly_min_spend.filter(|m| negative(*m)) {
            return Err(Error::InvalidInput(format!(
                "card {} rule {}: negative monthly minimum spend {}",
                card.id, index, min
            )));
        }
    }
    Ok(())
}

/// Points and miles figures for a card that credits its rebate as points.
///
/// Returns `(points_amount, miles_return)`.
fn points_and_miles(
    card: &Card,
    amount: Decimal,
    rate: Decimal,
    raw_reward: Decimal,
) -> Result<(Option<Decimal>, Option<Decimal>)> {
    let Some(config) = card
        .reward_config
        .as_ref()
        .filter(|c| c.method == RewardMethod::Conversion)
    else {
        return Ok((None, None));
    };

    let points = mul(raw_reward, config.ratio)?;
    let points_amount = points.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    let miles_return = if !config.is_miles {
        None
    } else if config.ratio >= Decimal::ONE {
        // Points convert one-to-ratio into miles
        if points > Decimal::ZERO {
            Some(round2(div(amount, points)?))
        } else {
            None
        }
    } else if rate > Decimal::ZERO {
        // Fractional ratios price miles by the rate alone
        Some(round2(div(HUNDRED, rate)?))
    } else {
        None
    };

    Ok((Some(points_amount), miles_return))
}

/// Evaluates every rule of `card` against `tx` and keeps the best one.
///
/// Rules are never stacked. A minimum monthly spend cannot be verified from a
/// single transaction, so it is reported as a caveat instead of disqualifying
/// the rule. When nothing matches, the card's base rule is shown at its raw
/// rate; a card without one earns 0%.
///
/// Amounts too large for exact decimal arithmetic are rejected as invalid
/// input.
pub fn calculate_card_reward<'a>(card: &'a Card, tx: &Transaction) -> Result<CalculationResult<'a>> {
    validate_transaction(tx)?;
    validate_card(card)?;

    let best = select_best(card.rules.iter().filter(|r| matches(r, tx)), tx.amount)?;

    let mut caveats = Vec::new();
    let (rule, rate, raw_reward) = match best {
        Some((rule, outcome)) => {
            if outcome.cap_binds {
                caveats.push(
                    match rule.cap_type {
                        CapType::Reward => CAVEAT_REWARD_CAP,
                        CapType::Spending => CAVEAT_SPENDING_CAP,
                    }
                    .to_string(),
                );
            }
            if let Some(min) = rule.monthly_min_spend {
                caveats.push(format!("minimum monthly spend required: {}", min.normalize()));
            }
            (Some(rule), outcome.rate, outcome.reward)
        }
        None => {
            caveats.push(CAVEAT_NO_APPLICABLE_RULE.to_string());
            let base = card.base_rule();
            let percentage = base.map(|r| r.percentage).unwrap_or_default();
            let outcome = RuleOutcome::uncapped(percentage, tx.amount)?;
            (base, outcome.rate, outcome.reward)
        }
    };

    let reward = round2(raw_reward);
    let fx_fee = card.foreign_currency_fee.filter(|_| tx.is_foreign_currency);
    let net_reward = match fx_fee {
        Some(fee) => {
            let fee_amount = round2(percent_of(tx.amount, fee)?);
            round2((reward - fee_amount).max(Decimal::ZERO))
        }
        None => reward,
    };

    let (points_amount, miles_return) = points_and_miles(card, tx.amount, rate, raw_reward)?;
    let points_currency = card
        .reward_config
        .as_ref()
        .map(|c| c.currency.as_str())
        .filter(|c| !c.is_empty());

    debug!(
        card = %card.id,
        rate = %rate,
        reward = %reward,
        matched = rule.is_some(),
        "evaluated card"
    );

    Ok(CalculationResult {
        card,
        effective_rate: rate.normalize(),
        reward,
        rule,
        caveats,
        fx_fee,
        net_reward,
        points_amount,
        points_currency,
        miles_return,
    })
}

/// Tries each candidate payment method on the same card and returns the one
/// earning the most, if it beats the method the transaction already uses.
///
/// Only plain card presentment (or an unspecified method) gets a suggestion.
pub fn suggest_payment_method(
    card: &Card,
    tx: &Transaction,
    candidates: &[&str],
) -> Result<Option<PaymentSuggestion>> {
    let current = calculate_card_reward(card, tx)?;
    let plain_card = tx.payment_method.is_empty()
        || tx.payment_method.eq_ignore_ascii_case(DEFAULT_PAYMENT_METHOD);
    if !plain_card {
        return Ok(None);
    }
    let mut best: Option<PaymentSuggestion> = None;

    for method in candidates {
        if method.eq_ignore_ascii_case(&tx.payment_method) {
            continue;
        }
        let alternative = Transaction {
            payment_method: method.to_string(),
            ..tx.clone()
        };
        let result = calculate_card_reward(card, &alternative)?;
        let floor = best.as_ref().map_or(current.reward, |b| b.reward);
        if result.reward > floor {
            best = Some(PaymentSuggestion {
                payment_method: method.to_string(),
                effective_rate: result.effective_rate,
                reward: result.reward,
            });
        }
    }
    Ok(best)
}

/// Points at a matching rule whose monthly minimum spend this purchase falls
/// short of, when spending up to that minimum would earn more than the rules
/// without one.
///
/// Advisory only: the rule selected by [`calculate_card_reward`] is unchanged.
pub fn suggest_spending_target(card: &Card, tx: &Transaction) -> Result<Option<SpendingSuggestion>> {
    validate_transaction(tx)?;
    validate_card(card)?;

    let matching: Vec<&Rule> = card.rules.iter().filter(|r| matches(r, tx)).collect();

    // Highest nominal rate among the rules still short of their minimum
    let mut gated: Option<(&Rule, Decimal)> = None;
    for rule in matching.iter().copied() {
        let Some(target) = rule.monthly_min_spend.filter(|min| tx.amount < *min) else {
            continue;
        };
        if gated.is_none_or(|(best, _)| rule.percentage > best.percentage) {
            gated = Some((rule, target));
        }
    }
    let Some((rule, target)) = gated else {
        return Ok(None);
    };

    let unlocked = evaluate(rule, target)?;
    let ungated = matching.iter().copied().filter(|r| r.monthly_min_spend.is_none());
    let without = match select_best(ungated, target)? {
        Some((_, outcome)) => outcome,
        None => {
            let percentage = card.base_rule().map(|r| r.percentage).unwrap_or_default();
            RuleOutcome::uncapped(percentage, target)?
        }
    };

    if round2(unlocked.reward) <= round2(without.reward) {
        return Ok(None);
    }
    Ok(Some(SpendingSuggestion {
        target_amount: target.normalize(),
        rule_description: rule.description.clone(),
        new_percentage: unlocked.rate.normalize(),
        new_reward_amount: round2(unlocked.reward),
    }))
}
