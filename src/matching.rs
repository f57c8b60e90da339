//! Decides whether a single rule applies to a transaction.

use crate::models::{
    MOBILE_WALLET_ALIAS, MOBILE_WALLET_METHODS, MatchKind, PHYSICAL_PAYMENT_METHODS, Rule,
    Transaction,
};

fn contains_code<S: AsRef<str>>(codes: &[S], code: &str) -> bool {
    codes.iter().any(|c| c.as_ref().eq_ignore_ascii_case(code))
}

pub fn is_physical_presentment(payment_method: &str) -> bool {
    contains_code(PHYSICAL_PAYMENT_METHODS, payment_method)
}

fn matches_payment_method(values: &[String], payment_method: &str) -> bool {
    contains_code(values, payment_method)
        || (contains_code(values, MOBILE_WALLET_ALIAS)
            && contains_code(MOBILE_WALLET_METHODS, payment_method))
}

/// Exclusions and restrictions are checked before the kind-specific test, so
/// an excluded category never matches even a rule that names it.
pub fn matches(rule: &Rule, tx: &Transaction) -> bool {
    if contains_code(&rule.excluded_categories, &tx.category) {
        return false;
    }
    if contains_code(&rule.excluded_payment_methods, &tx.payment_method) {
        return false;
    }
    if let Some(foreign) = rule.is_foreign_currency {
        if foreign != tx.is_foreign_currency {
            return false;
        }
    }
    if rule.is_physical_store_only && !is_physical_presentment(&tx.payment_method) {
        return false;
    }

    match rule.match_kind {
        MatchKind::Base => true,
        MatchKind::Category => contains_code(&rule.match_values, &tx.category),
        MatchKind::Merchant => contains_code(&rule.match_values, &tx.merchant),
        MatchKind::PaymentMethod => matches_payment_method(&rule.match_values, &tx.payment_method),
    }
}
