//! Ranks many cards for the same transaction.

use tracing::warn;

use crate::calculator::{calculate_card_reward, validate_transaction};
use crate::models::{CalculationResult, Card, Transaction};
use crate::Result;

/// Evaluates each card independently and sorts by effective rate, highest
/// first. Equal rates keep the input order.
///
/// A card with malformed rule data is left out of the ranking instead of
/// failing the whole call; an invalid transaction fails it since no card
/// could be evaluated.
pub fn rank_cards<'a, I>(cards: I, tx: &Transaction) -> Result<Vec<CalculationResult<'a>>>
where
    I: IntoIterator<Item = &'a Card>,
{
    validate_transaction(tx)?;

    let mut results: Vec<CalculationResult<'a>> = cards
        .into_iter()
        .filter_map(|card| match calculate_card_reward(card, tx) {
            Ok(result) => Some(result),
            Err(err) => {
                warn!(card = %card.id, error = %err, "skipping card from ranking");
                None
            }
        })
        .collect();

    // sort_by is stable
    results.sort_by(|a, b| b.effective_rate.cmp(&a.effective_rate));
    Ok(results)
}
