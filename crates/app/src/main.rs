use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use engine::{ClearingState, DocumentSide, Engine, PartyKind};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, DatabaseConnection};
use serde::Serialize;
use uuid::Uuid;

mod settings;

type AppResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser, Debug)]
#[command(name = "stockbook")]
#[command(about = "Inventory, payments and advances bookkeeping")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending database migrations.
    Migrate,
    /// Rebuild valuation snapshots, for one product or every dirty one.
    Revalue {
        #[arg(long)]
        product: Option<Uuid>,
    },
    /// List products whose snapshots are waiting for a revaluation.
    Dirty,
    /// Current quantity and average cost of a product.
    Stock { product: Uuid },
    /// Advance balance of a customer or vendor.
    Balance { kind: Party, id: Uuid },
    /// Advance ledger of a customer or vendor with running balance.
    Statement {
        kind: Party,
        id: Uuid,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Payments of a counterparty still posted or pending.
    Pending { side: Side, party: Uuid },
    /// Move a payment between clearing states.
    Clear {
        side: Side,
        payment: i64,
        #[arg(long, value_enum, default_value = "pending")]
        from: State,
        #[arg(long, value_enum, default_value = "cleared")]
        to: State,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Party {
    Customer,
    Vendor,
}

impl From<Party> for PartyKind {
    fn from(value: Party) -> Self {
        match value {
            Party::Customer => PartyKind::Customer,
            Party::Vendor => PartyKind::Vendor,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Side {
    Sale,
    Purchase,
}

impl From<Side> for DocumentSide {
    fn from(value: Side) -> Self {
        match value {
            Side::Sale => DocumentSide::Sale,
            Side::Purchase => DocumentSide::Purchase,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum State {
    Posted,
    Pending,
    Cleared,
    Bounced,
}

impl From<State> for ClearingState {
    fn from(value: State) -> Self {
        match value {
            State::Posted => ClearingState::Posted,
            State::Pending => ClearingState::Pending,
            State::Cleared => ClearingState::Cleared,
            State::Bounced => ClearingState::Bounced,
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(format!(
            "stockbook={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = connect(&settings.database).await?;
    if let Command::Migrate = cli.command {
        tracing::info!("database is up to date");
        return Ok(());
    }

    let engine = Engine::builder()
        .database(db)
        .config(settings.engine)
        .build()
        .await?;

    match cli.command {
        Command::Migrate => {}
        Command::Revalue { product } => match product {
            Some(product) => print_json(&engine.revalue_product(product).await?)?,
            None => print_json(&engine.revalue_dirty().await?)?,
        },
        Command::Dirty => print_json(&engine.dirty_products().await?)?,
        Command::Stock { product } => print_json(&engine.stock_on_hand(product).await?)?,
        Command::Balance { kind, id } => {
            print_json(&engine.get_balance(kind.into(), id).await?)?;
        }
        Command::Statement { kind, id, from, to } => {
            print_json(&engine.list_ledger(kind.into(), id, from, to).await?)?;
        }
        Command::Pending { side, party } => {
            print_json(&engine.list_pending_instruments(side.into(), party).await?)?;
        }
        Command::Clear {
            side,
            payment,
            from,
            to,
            date,
        } => {
            let outcome = engine
                .update_clearing_state(side.into(), payment, from.into(), to.into(), date)
                .await?;
            print_json(&outcome)?;
        }
    }

    Ok(())
}

async fn connect(config: &settings::Database) -> AppResult<DatabaseConnection> {
    // One connection, so the pragmas below hold for every statement.
    let mut options = ConnectOptions::new(config.url());
    options.max_connections(1).min_connections(1);
    let database = sea_orm::Database::connect(options).await?;
    database
        .execute_unprepared("PRAGMA foreign_keys=ON;")
        .await?;
    if let settings::Database::Sqlite(path) = config {
        database
            .execute_unprepared("PRAGMA journal_mode=WAL;")
            .await?;
        tracing::debug!(path = %path, "sqlite database opened");
    }
    Migrator::up(&database, None).await?;
    Ok(database)
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use sea_orm::{ConnectionTrait, Statement};

    use super::*;

    #[tokio::test]
    async fn connection_enforces_foreign_keys() {
        let database = connect(&settings::Database::Memory).await.unwrap();
        let row = database
            .query_one(Statement::from_string(
                database.get_database_backend(),
                "PRAGMA foreign_keys;",
            ))
            .await
            .unwrap()
            .unwrap();
        let enabled: i32 = row.try_get("", "foreign_keys").unwrap();
        assert_eq!(enabled, 1);
    }
}
