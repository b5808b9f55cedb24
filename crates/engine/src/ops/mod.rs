use sea_orm::DatabaseConnection;
use serde::Serialize;
use uuid::Uuid;

use crate::{CostState, EngineConfig, OrderingKey, ResultEngine};

mod advances;
mod documents;
mod ledger;
mod master;
mod payments;
mod returns;
mod revalue;
mod rollup;
mod store;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    config: EngineConfig,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }
}

/// Current stock position of a product, read from its latest snapshot.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StockLevel {
    pub product_id: Uuid,
    /// Quantity in the product's base unit.
    pub quantity: f64,
    pub unit_cost: f64,
    pub total_value: f64,
    pub base_uom: String,
    /// Ledger position of the snapshot the figures come from.
    pub as_of: Option<OrderingKey>,
}

/// What one revaluation pass rebuilt.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RevaluationReport {
    pub product_id: Uuid,
    /// First date rebuilt; `None` for a full rebuild.
    pub from: Option<chrono::NaiveDate>,
    pub entries_replayed: usize,
    pub state: CostState,
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    config: EngineConfig,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> EngineBuilder {
        self.config = config;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            config: self.config,
        })
    }
}
