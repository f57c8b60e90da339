//! Catalog and engine data types, plus the CLI table rows.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Payment methods where the card (or a device wallet standing in for it)
/// is presented at a physical terminal.
pub const PHYSICAL_PAYMENT_METHODS: &[&str] = &[
    "physical_card",
    "tap",
    "contactless",
    "insert",
    "swipe",
    "apple_pay",
    "google_pay",
    "samsung_pay",
];

/// Wallet codes covered by a `paymentMethod` rule listing [`MOBILE_WALLET_ALIAS`].
pub const MOBILE_WALLET_METHODS: &[&str] = &["apple_pay", "google_pay", "samsung_pay", "boc_pay"];

/// Match value standing for every code in [`MOBILE_WALLET_METHODS`].
pub const MOBILE_WALLET_ALIAS: &str = "mobile";

/// Plain card presentment, also assumed when no payment method is given.
pub const DEFAULT_PAYMENT_METHOD: &str = "physical_card";

/// Alternatives tried when suggesting a better way to pay.
pub const SUGGESTED_PAYMENT_METHODS: &[&str] = &["apple_pay", "boc_pay", "alipay", "payme"];

/// The selected rule's reward cap limited this transaction.
pub const CAVEAT_REWARD_CAP: &str = "reward cap reached";
/// The selected rule's eligible spend ran out before the full amount.
pub const CAVEAT_SPENDING_CAP: &str = "spending cap reached";
/// Nothing matched; the result shows the base rule's raw rate.
pub const CAVEAT_NO_APPLICABLE_RULE: &str = "no applicable rule; base rate shown";

/// Which transaction field a rule keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum MatchKind {
    Base,
    Category,
    Merchant,
    PaymentMethod,
}

impl MatchKind {
    /// Tie-break weight: a merchant match is more intentional than a blanket
    /// category match at the same rate.
    pub fn specificity(self) -> u8 {
        match self {
            MatchKind::Merchant => 3,
            MatchKind::PaymentMethod => 2,
            MatchKind::Category => 1,
            MatchKind::Base => 0,
        }
    }
}

/// How a rule's `cap` is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum CapType {
    /// Maximum reward amount.
    Reward,
    /// Maximum spend eligible at the rule's rate.
    #[default]
    Spending,
}

/// One reward clause of a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub match_kind: MatchKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_values: Vec<String>,
    /// Nominal reward rate, in percent of the transaction amount
    pub percentage: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap: Option<Decimal>,
    #[serde(default)]
    pub cap_type: CapType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_min_spend: Option<Decimal>,
    #[serde(default)]
    pub is_physical_store_only: bool,
    /// `None` matches both domestic and foreign-currency transactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_foreign_currency: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_payment_methods: Vec<String>,
}

impl Rule {
    /// An uncapped rule with no restrictions.
    pub fn new(match_kind: MatchKind, match_values: Vec<String>, percentage: Decimal) -> Self {
        Self {
            description: String::new(),
            match_kind,
            match_values,
            percentage,
            cap: None,
            cap_type: CapType::default(),
            monthly_min_spend: None,
            is_physical_store_only: false,
            is_foreign_currency: None,
            excluded_categories: Vec::new(),
            excluded_payment_methods: Vec::new(),
        }
    }

    pub fn base(percentage: Decimal) -> Self {
        Self::new(MatchKind::Base, Vec::new(), percentage)
    }

    pub fn with_cap(mut self, cap: Decimal, cap_type: CapType) -> Self {
        self.cap = Some(cap);
        self.cap_type = cap_type;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// How a card pays out what its rules earn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RewardMethod {
    /// Cash rebate in the billing currency
    #[default]
    Direct,
    /// Rebate credited as points, `ratio` points per unit of rebate
    Conversion,
}

/// Points or miles programme behind a card's rebate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardConfig {
    #[serde(default)]
    pub method: RewardMethod,
    /// Points credited per unit of cash-equivalent reward
    #[serde(default = "RewardConfig::default_ratio")]
    pub ratio: Decimal,
    /// Display name of the points currency (e.g. "RC", "Asia Miles")
    pub currency: String,
    /// Points are airline miles, so a $/mile figure is meaningful
    #[serde(default)]
    pub is_miles: bool,
}

impl RewardConfig {
    fn default_ratio() -> Decimal {
        Decimal::ONE
    }

    pub fn conversion(ratio: Decimal, currency: impl Into<String>, is_miles: bool) -> Self {
        Self {
            method: RewardMethod::Conversion,
            ratio,
            currency: currency.into(),
            is_miles,
        }
    }
}

/// A named reward product and the rules that define how it earns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub name: String,
    pub bank: String,
    /// Percent charged on foreign-currency spend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_currency_fee: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_config: Option<RewardConfig>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Card {
    /// The fallback rule, if the card declares one.
    pub fn base_rule(&self) -> Option<&Rule> {
        self.rules.iter().find(|r| r.match_kind == MatchKind::Base)
    }
}

/// A single purchase to evaluate. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub merchant: String,
    pub category: String,
    /// In the card's billing currency
    pub amount: Decimal,
    pub payment_method: String,
    #[serde(default)]
    pub is_foreign_currency: bool,
}

/// Outcome of evaluating one card against one transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult<'a> {
    pub card: &'a Card,
    /// Rate actually applied after caps, in percent
    pub effective_rate: Decimal,
    /// Rounded half-up to cents
    pub reward: Decimal,
    /// `None` only when the card has no base rule to fall back on
    pub rule: Option<&'a Rule>,
    pub caveats: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fx_fee: Option<Decimal>,
    /// Reward minus the foreign-currency fee, floored at zero
    pub net_reward: Decimal,
    /// Reward expressed in the card's points currency, whole points
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_currency: Option<&'a str>,
    /// Spend per mile earned, for miles cards
    #[serde(skip_serializing_if = "Option::is_none")]
    pub miles_return: Option<Decimal>,
}

/// A better way to pay the same card.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSuggestion {
    pub payment_method: String,
    pub effective_rate: Decimal,
    pub reward: Decimal,
}

/// A rule the card would pay more under once its monthly minimum spend is met.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingSuggestion {
    pub target_amount: Decimal,
    pub rule_description: String,
    /// Effective percent on a purchase of `target_amount`
    pub new_percentage: Decimal,
    pub new_reward_amount: Decimal,
}

/// Used for the "list-cards" output
#[derive(Debug, Clone, Tabled)]
pub struct CardSummary {
    pub id: String,
    pub name: String,
    pub bank: String,
    pub rules: usize,
    /// Percent earned when nothing more specific matches
    pub base_rate: Decimal,
}

impl From<&Card> for CardSummary {
    fn from(card: &Card) -> Self {
        Self {
            id: card.id.clone(),
            name: card.name.clone(),
            bank: card.bank.clone(),
            rules: card.rules.len(),
            base_rate: card.base_rule().map(|r| r.percentage).unwrap_or_default(),
        }
    }
}

/// Used for the "best-card" query result
#[derive(Debug, Clone, Tabled)]
pub struct CardRecommendation {
    pub card_name: String,
    pub bank: String,
    /// Effective percent after caps
    pub effective_rate: Decimal,
    pub reward: Decimal,
    pub matched_rule: String,
    pub caveats: String,
}

impl From<&CalculationResult<'_>> for CardRecommendation {
    fn from(result: &CalculationResult<'_>) -> Self {
        let matched_rule = match result.rule {
            Some(rule) if !rule.description.is_empty() => rule.description.clone(),
            Some(rule) => format!("{:?} {}%", rule.match_kind, rule.percentage.normalize()),
            None => "-".to_string(),
        };
        Self {
            card_name: result.card.name.clone(),
            bank: result.card.bank.clone(),
            effective_rate: result
                .effective_rate
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            reward: result.reward,
            matched_rule,
            caveats: result.caveats.join("; "),
        }
    }
}
