use std::path::Path;
use std::str::FromStr;

use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;

use crate::calculator::validate_card;
use crate::models::{Card, RewardConfig, Rule};
use crate::{Error, Result};

/// Creates tables on the given connection.
pub fn init_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS cards (
            id                      TEXT PRIMARY KEY,
            name                    TEXT NOT NULL,
            bank                    TEXT NOT NULL,
            foreign_currency_fee    TEXT,
            reward_config           TEXT,
            rules                   TEXT NOT NULL DEFAULT '[]'
        );",
    )?;
    Ok(())
}

/// Opens (or creates) the SQLite database file and ensures tables exist.
pub fn init_db(path: impl AsRef<Path>) -> Result<Connection> {
    let conn = Connection::open(path)?;
    init_tables(&conn)?;
    Ok(conn)
}

/// id, name, bank, foreign_currency_fee, reward_config, rules
type CardRow = (String, String, String, Option<String>, Option<String>, String);

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<CardRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn decode_card((id, name, bank, fee, reward_config, rules): CardRow) -> Result<Card> {
    let foreign_currency_fee = fee
        .map(|f| {
            Decimal::from_str(&f)
                .map_err(|e| Error::InvalidInput(format!("card {id}: bad stored fee {f:?}: {e}")))
        })
        .transpose()?;
    let reward_config: Option<RewardConfig> = reward_config
        .map(|json| serde_json::from_str(&json))
        .transpose()?;
    let rules: Vec<Rule> = serde_json::from_str(&rules)?;
    Ok(Card {
        id,
        name,
        bank,
        foreign_currency_fee,
        reward_config,
        rules,
    })
}

/// Inserts the card, replacing any stored card with the same id.
pub fn upsert_card(conn: &Connection, card: &Card) -> Result<()> {
    validate_card(card)?;
    let rules_json = serde_json::to_string(&card.rules)?;
    let config_json = card
        .reward_config
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    conn.execute(
        "INSERT INTO cards (id, name, bank, foreign_currency_fee, reward_config, rules)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            bank = excluded.bank,
            foreign_currency_fee = excluded.foreign_currency_fee,
            reward_config = excluded.reward_config,
            rules = excluded.rules",
        params![
            card.id,
            card.name,
            card.bank,
            card.foreign_currency_fee.map(|f| f.to_string()),
            config_json,
            rules_json
        ],
    )?;
    Ok(())
}

pub fn get_card(conn: &Connection, id: &str) -> Result<Option<Card>> {
    let row = conn
        .query_row(
            "SELECT id, name, bank, foreign_currency_fee, reward_config, rules FROM cards WHERE id = ?1",
            params![id],
            card_from_row,
        )
        .optional()?;
    row.map(decode_card).transpose()
}

pub fn list_cards(conn: &Connection) -> Result<Vec<Card>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, bank, foreign_currency_fee, reward_config, rules
         FROM cards
         ORDER BY rowid",
    )?;
    let rows = stmt.query_map([], card_from_row)?;

    let mut cards = Vec::new();
    for row in rows {
        cards.push(decode_card(row?)?);
    }
    Ok(cards)
}

/// Appends a rule to a stored card's rule list.
pub fn add_rule(conn: &Connection, card_id: &str, rule: Rule) -> Result<Card> {
    let mut card = get_card(conn, card_id)?.ok_or_else(|| Error::CardNotFound(card_id.to_string()))?;
    card.rules.push(rule);
    upsert_card(conn, &card)?;
    Ok(card)
}

pub fn remove_card(conn: &Connection, id: &str) -> Result<bool> {
    let changed = conn.execute("DELETE FROM cards WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}
