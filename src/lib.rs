//! Credit card reward engine
//!
//! Given a card's reward rules and a transaction, finds the rule that
//! applies, the effective rate after caps, the reward and any caveats.
//! Also ranks many cards for the same purchase.

#![forbid(unsafe_code)]

pub mod api;
pub mod calculator;
pub mod db;
pub mod error;
pub mod matching;
pub mod models;
pub mod ranking;
pub mod telemetry;

pub use calculator::{calculate_card_reward, suggest_payment_method, suggest_spending_target};
pub use error::{Error, Result};
pub use matching::matches;
pub use models::*;
pub use ranking::rank_cards;
