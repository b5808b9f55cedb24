//! `stock_valuation_history`: one snapshot per consumed ledger row.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{CostState, EngineError, OrderingKey, util::parse_uuid};

pub const MOVING_AVERAGE: &str = "moving_average";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValuationSnapshot {
    pub valuation_id: i64,
    pub product_id: Uuid,
    pub transaction_id: i64,
    pub valuation_date: NaiveDate,
    pub ordering_class: i16,
    pub txn_seq: i32,
    pub quantity: f64,
    pub unit_value: f64,
    pub total_value: f64,
    pub valuation_method: String,
    pub created_at: DateTime<Utc>,
    pub superseded_at: Option<DateTime<Utc>>,
}

impl ValuationSnapshot {
    pub(crate) fn new(product_id: Uuid, key: OrderingKey, state: CostState) -> Self {
        Self {
            valuation_id: 0,
            product_id,
            transaction_id: key.transaction_id,
            valuation_date: key.date,
            ordering_class: key.class,
            txn_seq: key.seq,
            quantity: state.quantity,
            unit_value: state.unit_cost,
            total_value: state.total_value(),
            valuation_method: MOVING_AVERAGE.to_string(),
            created_at: Utc::now(),
            superseded_at: None,
        }
    }

    pub fn key(&self) -> OrderingKey {
        OrderingKey {
            date: self.valuation_date,
            class: self.ordering_class,
            seq: self.txn_seq,
            transaction_id: self.transaction_id,
        }
    }

    pub fn state(&self) -> CostState {
        CostState::new(self.quantity, self.unit_value)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "stock_valuation_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub valuation_id: i64,
    pub product_id: String,
    pub transaction_id: i64,
    pub valuation_date: Date,
    pub ordering_class: i16,
    pub txn_seq: i32,
    pub quantity: f64,
    pub unit_value: f64,
    pub total_value: f64,
    pub valuation_method: String,
    pub created_at: DateTimeUtc,
    pub superseded_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_transactions::Entity",
        from = "Column::TransactionId",
        to = "super::inventory_transactions::Column::TransactionId",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Transactions,
}

impl Related<super::inventory_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&ValuationSnapshot> for ActiveModel {
    fn from(value: &ValuationSnapshot) -> Self {
        Self {
            valuation_id: ActiveValue::NotSet,
            product_id: ActiveValue::Set(value.product_id.to_string()),
            transaction_id: ActiveValue::Set(value.transaction_id),
            valuation_date: ActiveValue::Set(value.valuation_date),
            ordering_class: ActiveValue::Set(value.ordering_class),
            txn_seq: ActiveValue::Set(value.txn_seq),
            quantity: ActiveValue::Set(value.quantity),
            unit_value: ActiveValue::Set(value.unit_value),
            total_value: ActiveValue::Set(value.total_value),
            valuation_method: ActiveValue::Set(value.valuation_method.clone()),
            created_at: ActiveValue::Set(value.created_at),
            superseded_at: ActiveValue::Set(value.superseded_at),
        }
    }
}

impl TryFrom<Model> for ValuationSnapshot {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            valuation_id: model.valuation_id,
            product_id: parse_uuid(&model.product_id, "product")?,
            transaction_id: model.transaction_id,
            valuation_date: model.valuation_date,
            ordering_class: model.ordering_class,
            txn_seq: model.txn_seq,
            quantity: model.quantity,
            unit_value: model.unit_value,
            total_value: model.total_value,
            valuation_method: model.valuation_method,
            created_at: model.created_at,
            superseded_at: model.superseded_at,
        })
    }
}
