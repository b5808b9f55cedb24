use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::Engine;
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "stockbook_admin")]
#[command(about = "Admin utilities for Stockbook (bootstrap products, parties, bank accounts)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./stockbook.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Product(Product),
    Customer(Customer),
    Vendor(Vendor),
    BankAccount(BankAccount),
}

#[derive(Args, Debug)]
struct Product {
    #[command(subcommand)]
    command: ProductCommand,
}

#[derive(Subcommand, Debug)]
enum ProductCommand {
    Create(ProductCreateArgs),
    /// Add an alternate unit of measure.
    AddUom(UomArgs),
    /// Change the factor of a unit that was never posted.
    SetFactor(UomArgs),
}

#[derive(Args, Debug)]
struct ProductCreateArgs {
    #[arg(long)]
    name: String,
    /// Base unit of measure, e.g. `pcs` or `kg`.
    #[arg(long)]
    base_uom: String,
}

#[derive(Args, Debug)]
struct UomArgs {
    #[arg(long)]
    product: Uuid,
    #[arg(long)]
    uom: String,
    /// How many base units one `uom` holds.
    #[arg(long)]
    factor: f64,
}

#[derive(Args, Debug)]
struct Customer {
    #[command(subcommand)]
    command: PartyCommand,
}

#[derive(Args, Debug)]
struct Vendor {
    #[command(subcommand)]
    command: PartyCommand,
}

#[derive(Subcommand, Debug)]
enum PartyCommand {
    Create(PartyCreateArgs),
}

#[derive(Args, Debug)]
struct PartyCreateArgs {
    #[arg(long)]
    name: String,
}

#[derive(Args, Debug)]
struct BankAccount {
    #[command(subcommand)]
    command: BankAccountCommand,
}

#[derive(Subcommand, Debug)]
enum BankAccountCommand {
    Create(BankAccountCreateArgs),
}

#[derive(Args, Debug)]
struct BankAccountCreateArgs {
    /// Owning vendor; omit for a company account.
    #[arg(long)]
    vendor: Option<Uuid>,
    #[arg(long)]
    bank: String,
    #[arg(long)]
    account_no: String,
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Product(Product { command }) => match command {
            ProductCommand::Create(args) => {
                let product_id = engine.create_product(&args.name, &args.base_uom).await?;
                println!("created product: {} ({product_id})", args.name);
            }
            ProductCommand::AddUom(args) => {
                engine
                    .add_product_uom(args.product, &args.uom, args.factor)
                    .await?;
                println!("added unit {} = {} base units", args.uom, args.factor);
            }
            ProductCommand::SetFactor(args) => {
                engine
                    .set_uom_factor(args.product, &args.uom, args.factor)
                    .await?;
                println!("unit {} now holds {} base units", args.uom, args.factor);
            }
        },
        Command::Customer(Customer {
            command: PartyCommand::Create(args),
        }) => {
            let customer_id = engine.create_customer(&args.name).await?;
            println!("created customer: {} ({customer_id})", args.name);
        }
        Command::Vendor(Vendor {
            command: PartyCommand::Create(args),
        }) => {
            let vendor_id = engine.create_vendor(&args.name).await?;
            println!("created vendor: {} ({vendor_id})", args.name);
        }
        Command::BankAccount(BankAccount {
            command: BankAccountCommand::Create(args),
        }) => {
            let account_id = match args.vendor {
                Some(vendor) => {
                    engine
                        .create_vendor_bank_account(vendor, &args.bank, &args.account_no)
                        .await?
                }
                None => {
                    engine
                        .create_company_bank_account(&args.bank, &args.account_no)
                        .await?
                }
            };
            println!("created bank account: {} ({account_id})", args.account_no);
        }
    }

    Ok(())
}
