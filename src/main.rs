use std::fs;
use std::path::PathBuf;

use anyhow::{Context, bail};
use cc_rewards::models::{
    CapType, Card, CardRecommendation, CardSummary, MatchKind, RewardConfig, Rule, Transaction,
};
use cc_rewards::{db, rank_cards, telemetry};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tabled::Table;
use tracing::info;

/// Credit card reward tracker: find the best card for every purchase
#[derive(Parser)]
#[command(name = "cc-rewards", version, about)]
struct Cli {
    /// SQLite catalog file
    #[arg(long, env = "CC_REWARDS_DB", default_value = "cc_rewards.db", global = true)]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add (or replace) a credit card with its base rate
    AddCard {
        /// Card identifier (e.g. "hsbc-red")
        #[arg(long)]
        id: String,
        /// Card name (e.g. "HSBC Red Credit Card")
        #[arg(long)]
        name: String,
        /// Issuing bank
        #[arg(long)]
        bank: String,
        /// Percent earned when no other rule matches
        #[arg(long, default_value_t = Decimal::ZERO)]
        base_rate: Decimal,
        /// Percent charged on foreign-currency spend
        #[arg(long)]
        fx_fee: Option<Decimal>,
        /// Rebate is credited as this points currency (e.g. "Asia Miles")
        #[arg(long)]
        points_currency: Option<String>,
        /// Points per unit of rebate
        #[arg(long, default_value_t = Decimal::ONE)]
        conversion_ratio: Decimal,
        /// The points currency is airline miles
        #[arg(long, requires = "points_currency")]
        miles: bool,
    },

    /// Append a reward rule to a card
    AddRule {
        #[arg(long)]
        card_id: String,
        #[arg(long, value_enum)]
        kind: MatchKind,
        /// Category codes, merchant ids or payment-method codes
        #[arg(long = "value", num_args = 1..)]
        values: Vec<String>,
        /// Reward rate in percent
        #[arg(long)]
        percentage: Decimal,
        #[arg(long)]
        cap: Option<Decimal>,
        #[arg(long, value_enum, default_value_t = CapType::Spending)]
        cap_type: CapType,
        #[arg(long)]
        monthly_min_spend: Option<Decimal>,
        /// Only in-store tap/insert/swipe or device-wallet payments earn
        #[arg(long)]
        physical_only: bool,
        /// Restrict to foreign (true) or domestic (false) currency spend
        #[arg(long)]
        foreign_currency: Option<bool>,
        #[arg(long = "exclude-category", num_args = 1..)]
        excluded_categories: Vec<String>,
        #[arg(long = "exclude-payment-method", num_args = 1..)]
        excluded_payment_methods: Vec<String>,
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Import cards from a JSON array (same shape the API accepts)
    Import {
        #[arg(long)]
        file: PathBuf,
    },

    /// List all saved credit cards
    ListCards,

    /// Remove a credit card by ID
    RemoveCard {
        /// Card ID to remove
        #[arg(long)]
        id: String,
    },

    /// Rank saved cards for a purchase
    BestCard {
        /// Spending category code (e.g. "dining")
        #[arg(long)]
        category: String,
        /// Merchant identifier (e.g. "wellcome")
        #[arg(long, default_value = "")]
        merchant: String,
        #[arg(long)]
        amount: Decimal,
        #[arg(long, default_value = "physical_card")]
        payment_method: String,
        /// Transaction is in a foreign currency
        #[arg(long)]
        foreign: bool,
    },
}

fn main() -> anyhow::Result<()> {
    telemetry::init("warn")?;
    let cli = Cli::parse();

    let conn = db::init_db(&cli.db)
        .with_context(|| format!("failed to open catalog {}", cli.db.display()))?;

    match cli.command {
        Commands::AddCard {
            id,
            name,
            bank,
            base_rate,
            fx_fee,
            points_currency,
            conversion_ratio,
            miles,
        } => {
            let reward_config = points_currency
                .map(|currency| RewardConfig::conversion(conversion_ratio, currency, miles));
            let card = Card {
                id,
                name,
                bank,
                foreign_currency_fee: fx_fee,
                reward_config,
                rules: vec![Rule::base(base_rate).with_description("Base rate")],
            };
            db::upsert_card(&conn, &card).context("failed to add card")?;
            println!("Added card '{}' with ID {} (base rate {}%)", card.name, card.id, base_rate);
        }

        Commands::AddRule {
            card_id,
            kind,
            values,
            percentage,
            cap,
            cap_type,
            monthly_min_spend,
            physical_only,
            foreign_currency,
            excluded_categories,
            excluded_payment_methods,
            description,
        } => {
            if kind != MatchKind::Base && values.is_empty() {
                bail!("--value is required for {kind:?} rules");
            }
            let rule = Rule {
                description,
                match_kind: kind,
                match_values: values,
                percentage,
                cap,
                cap_type,
                monthly_min_spend,
                is_physical_store_only: physical_only,
                is_foreign_currency: foreign_currency,
                excluded_categories,
                excluded_payment_methods,
            };
            let card = db::add_rule(&conn, &card_id, rule).context("failed to add rule")?;
            println!("Card {} now has {} rules", card.id, card.rules.len());
        }

        Commands::Import { file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let cards: Vec<Card> = serde_json::from_str(&raw).context("invalid card catalog JSON")?;
            for card in &cards {
                db::upsert_card(&conn, card)
                    .with_context(|| format!("failed to import card {}", card.id))?;
            }
            info!(count = cards.len(), "imported cards");
            println!("Imported {} cards", cards.len());
        }

        Commands::ListCards => {
            let cards = db::list_cards(&conn).context("failed to list cards")?;
            if cards.is_empty() {
                println!("No cards found. Add one with: cc-rewards add-card --id ... --name \"...\" --bank ...");
            } else {
                let rows: Vec<CardSummary> = cards.iter().map(CardSummary::from).collect();
                println!("{}", Table::new(&rows));
            }
        }

        Commands::RemoveCard { id } => {
            let removed = db::remove_card(&conn, &id).context("failed to remove card")?;
            if removed {
                println!("Removed card with ID {}", id);
            } else {
                println!("No card found with ID {}", id);
            }
        }

        Commands::BestCard {
            category,
            merchant,
            amount,
            payment_method,
            foreign,
        } => {
            let cards = db::list_cards(&conn).context("failed to load cards")?;
            let tx = Transaction {
                merchant,
                category,
                amount,
                payment_method,
                is_foreign_currency: foreign,
            };
            let results = rank_cards(&cards, &tx).context("failed to rank cards")?;
            if results.is_empty() {
                println!("No cards could be evaluated for '{}'", tx.category);
            } else {
                println!("Best cards for {} in '{}':", tx.amount, tx.category);
                let rows: Vec<CardRecommendation> = results.iter().map(CardRecommendation::from).collect();
                println!("{}", Table::new(&rows));
            }
        }
    }

    Ok(())
}
