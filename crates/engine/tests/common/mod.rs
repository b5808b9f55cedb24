#![allow(dead_code)]

use chrono::NaiveDate;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

use engine::{DocumentCmd, Engine, EngineConfig, LineCmd, MoneyCents};
use migration::MigratorTrait;

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    engine_with_config(EngineConfig::default()).await
}

pub async fn engine_with_config(config: EngineConfig) -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .config(config)
        .build()
        .await
        .unwrap();
    (engine, db)
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
}

pub fn cents(value: i64) -> MoneyCents {
    MoneyCents::new(value)
}

pub fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

/// One product counted in `pcs`, one vendor, one customer.
pub struct Shop {
    pub engine: Engine,
    pub db: DatabaseConnection,
    pub product: Uuid,
    pub vendor: Uuid,
    pub customer: Uuid,
}

impl Shop {
    pub async fn new() -> Self {
        Self::with_config(EngineConfig::default()).await
    }

    pub async fn with_config(config: EngineConfig) -> Self {
        let (engine, db) = engine_with_config(config).await;
        let product = engine.create_product("Widget", "pcs").await.unwrap();
        let vendor = engine.create_vendor("Acme Supply").await.unwrap();
        let customer = engine.create_customer("Jane Buyer").await.unwrap();
        Self {
            engine,
            db,
            product,
            vendor,
            customer,
        }
    }

    /// Buys `quantity` pcs at `price` cents each.
    pub async fn buy(&self, quantity: f64, price: i64, date: NaiveDate) -> Uuid {
        self.engine
            .create_purchase(
                DocumentCmd::new(self.vendor, date)
                    .line(LineCmd::new(self.product, quantity, "pcs", cents(price))),
            )
            .await
            .unwrap()
    }

    /// Sells `quantity` pcs at `price` cents each.
    pub async fn sell(&self, quantity: f64, price: i64, date: NaiveDate) -> Uuid {
        self.engine
            .create_sale(
                DocumentCmd::new(self.customer, date)
                    .line(LineCmd::new(self.product, quantity, "pcs", cents(price))),
            )
            .await
            .unwrap()
    }

    /// Snapshot state and a full replay of the ledger agree.
    pub async fn assert_consistent(&self) {
        let stock = self.engine.stock_on_hand(self.product).await.unwrap();
        let replay = self.engine.replay_valuation(self.product).await.unwrap();
        assert!(close(stock.quantity, replay.quantity), "{stock:?} vs {replay:?}");
        assert!(close(stock.unit_cost, replay.unit_cost), "{stock:?} vs {replay:?}");
    }
}
