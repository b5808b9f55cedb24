//! Inventory ledger primitives.
//!
//! Every stock movement is one append-only row. Rows are ordered by
//! [`OrderingKey`]: business date first, then the ordering class (regular
//! postings before returns), then the per-date sequence number.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DocumentSide, EngineError, util::parse_uuid};

/// Distance between two consecutive sequence numbers on the same date.
pub const SEQ_STEP: i32 = 10;
/// Return postings never take a sequence number below this floor.
pub const RETURN_SEQ_FLOOR: i32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Purchase,
    Sale,
    PurchaseReturn,
    SaleReturn,
    Adjustment,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Sale => "sale",
            Self::PurchaseReturn => "purchase_return",
            Self::SaleReturn => "sale_return",
            Self::Adjustment => "adjustment",
        }
    }

    /// The regular posting type of a document side.
    pub fn regular_for(side: DocumentSide) -> Self {
        match side {
            DocumentSide::Purchase => Self::Purchase,
            DocumentSide::Sale => Self::Sale,
        }
    }

    pub fn return_for(side: DocumentSide) -> Self {
        match side {
            DocumentSide::Purchase => Self::PurchaseReturn,
            DocumentSide::Sale => Self::SaleReturn,
        }
    }

    pub fn is_return(self) -> bool {
        matches!(self, Self::PurchaseReturn | Self::SaleReturn)
    }

    /// 0 for regular postings, 1 for returns.
    pub fn ordering_class(self) -> i16 {
        i16::from(self.is_return())
    }

    /// Document side a typed posting must reference, `None` for adjustments.
    pub fn document_side(self) -> Option<DocumentSide> {
        match self {
            Self::Purchase | Self::PurchaseReturn => Some(DocumentSide::Purchase),
            Self::Sale | Self::SaleReturn => Some(DocumentSide::Sale),
            Self::Adjustment => None,
        }
    }

    /// Signed quantity in base units: positive when stock comes in.
    pub fn signed_base_quantity(self, base_quantity: f64) -> f64 {
        match self {
            Self::Purchase | Self::SaleReturn => base_quantity.abs(),
            Self::Sale | Self::PurchaseReturn => -base_quantity.abs(),
            Self::Adjustment => base_quantity,
        }
    }
}

impl TryFrom<&str> for TransactionType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "purchase" => Ok(Self::Purchase),
            "sale" => Ok(Self::Sale),
            "purchase_return" => Ok(Self::PurchaseReturn),
            "sale_return" => Ok(Self::SaleReturn),
            "adjustment" => Ok(Self::Adjustment),
            other => Err(EngineError::Validation(format!(
                "invalid transaction type: {other}"
            ))),
        }
    }
}

/// Next sequence number for a posting on a date.
///
/// `max_regular` is the highest sequence among regular postings of that date,
/// `max_any` the highest among all postings of that date.
pub fn next_sequence(
    transaction_type: TransactionType,
    max_regular: Option<i32>,
    max_any: Option<i32>,
) -> i32 {
    if transaction_type.is_return() {
        let after_last = max_any.unwrap_or(0) + SEQ_STEP;
        after_last.max(RETURN_SEQ_FLOOR)
    } else {
        max_regular.unwrap_or(0) + SEQ_STEP
    }
}

/// Position of a ledger row in valuation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct OrderingKey {
    pub date: NaiveDate,
    pub class: i16,
    pub seq: i32,
    pub transaction_id: i64,
}

impl OrderingKey {
    /// A key ordered before every row of `date`.
    pub fn start_of(date: NaiveDate) -> Self {
        Self {
            date,
            class: i16::MIN,
            seq: i32::MIN,
            transaction_id: i64::MIN,
        }
    }
}

/// The document line a posting belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LedgerReference {
    pub side: DocumentSide,
    pub document_id: Uuid,
    pub item_id: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InventoryTransaction {
    pub transaction_id: i64,
    pub product_id: Uuid,
    /// Quantity in `uom`; positive except for adjustments.
    pub quantity: f64,
    pub uom: String,
    /// Signed quantity in the product's base unit.
    pub base_quantity: f64,
    pub transaction_type: TransactionType,
    pub reference: Option<LedgerReference>,
    pub date: NaiveDate,
    pub txn_seq: i32,
    pub posted_at: DateTime<Utc>,
    pub generation: i32,
    pub superseded_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_by: String,
}

impl InventoryTransaction {
    pub fn key(&self) -> OrderingKey {
        OrderingKey {
            date: self.date,
            class: self.transaction_type.ordering_class(),
            seq: self.txn_seq,
            transaction_id: self.transaction_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "inventory_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub transaction_id: i64,
    pub product_id: String,
    pub quantity: f64,
    pub uom: String,
    pub base_quantity: f64,
    pub transaction_type: String,
    pub reference_table: Option<String>,
    pub reference_id: Option<String>,
    pub reference_item_id: Option<i64>,
    pub date: Date,
    pub ordering_class: i16,
    pub txn_seq: i32,
    pub posted_at: DateTimeUtc,
    pub generation: i32,
    pub superseded_at: Option<DateTimeUtc>,
    pub notes: Option<String>,
    pub created_by: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::valuation_history::Entity")]
    Snapshots,
}

impl Related<super::valuation_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Snapshots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// The transaction id is left unset so inserts allocate a fresh one.
impl From<&InventoryTransaction> for ActiveModel {
    fn from(value: &InventoryTransaction) -> Self {
        Self {
            transaction_id: ActiveValue::NotSet,
            product_id: ActiveValue::Set(value.product_id.to_string()),
            quantity: ActiveValue::Set(value.quantity),
            uom: ActiveValue::Set(value.uom.clone()),
            base_quantity: ActiveValue::Set(value.base_quantity),
            transaction_type: ActiveValue::Set(value.transaction_type.as_str().to_string()),
            reference_table: ActiveValue::Set(
                value.reference.map(|r| r.side.as_str().to_string()),
            ),
            reference_id: ActiveValue::Set(value.reference.map(|r| r.document_id.to_string())),
            reference_item_id: ActiveValue::Set(value.reference.map(|r| r.item_id)),
            date: ActiveValue::Set(value.date),
            ordering_class: ActiveValue::Set(value.transaction_type.ordering_class()),
            txn_seq: ActiveValue::Set(value.txn_seq),
            posted_at: ActiveValue::Set(value.posted_at),
            generation: ActiveValue::Set(value.generation),
            superseded_at: ActiveValue::Set(value.superseded_at),
            notes: ActiveValue::Set(value.notes.clone()),
            created_by: ActiveValue::Set(value.created_by.clone()),
        }
    }
}

impl TryFrom<Model> for InventoryTransaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let reference = match (
            model.reference_table.as_deref(),
            model.reference_id.as_deref(),
            model.reference_item_id,
        ) {
            (Some(table), Some(document_id), Some(item_id)) => Some(LedgerReference {
                side: DocumentSide::try_from(table)?,
                document_id: parse_uuid(document_id, "document")?,
                item_id,
            }),
            _ => None,
        };
        Ok(Self {
            transaction_id: model.transaction_id,
            product_id: parse_uuid(&model.product_id, "product")?,
            quantity: model.quantity,
            uom: model.uom,
            base_quantity: model.base_quantity,
            transaction_type: TransactionType::try_from(model.transaction_type.as_str())?,
            reference,
            date: model.date,
            txn_seq: model.txn_seq,
            posted_at: model.posted_at,
            generation: model.generation,
            superseded_at: model.superseded_at,
            notes: model.notes,
            created_by: model.created_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_postings_step_by_ten() {
        assert_eq!(next_sequence(TransactionType::Purchase, None, None), 10);
        assert_eq!(next_sequence(TransactionType::Sale, Some(30), Some(30)), 40);
        // A return already on the date does not push regular postings up.
        assert_eq!(next_sequence(TransactionType::Sale, Some(20), Some(100)), 30);
    }

    #[test]
    fn returns_start_at_floor() {
        assert_eq!(next_sequence(TransactionType::SaleReturn, None, None), 100);
        assert_eq!(next_sequence(TransactionType::PurchaseReturn, Some(40), Some(40)), 100);
        assert_eq!(next_sequence(TransactionType::SaleReturn, Some(40), Some(110)), 120);
        assert_eq!(next_sequence(TransactionType::SaleReturn, Some(130), Some(130)), 140);
    }

    #[test]
    fn returns_order_after_regular_postings_of_the_same_day() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let late_sale = OrderingKey {
            date,
            class: TransactionType::Sale.ordering_class(),
            seq: 150,
            transaction_id: 9,
        };
        let early_return = OrderingKey {
            date,
            class: TransactionType::SaleReturn.ordering_class(),
            seq: 100,
            transaction_id: 3,
        };
        assert!(late_sale < early_return);
    }

    #[test]
    fn signed_quantities_follow_direction() {
        assert_eq!(TransactionType::Purchase.signed_base_quantity(5.0), 5.0);
        assert_eq!(TransactionType::Sale.signed_base_quantity(5.0), -5.0);
        assert_eq!(TransactionType::PurchaseReturn.signed_base_quantity(2.0), -2.0);
        assert_eq!(TransactionType::SaleReturn.signed_base_quantity(2.0), 2.0);
        assert_eq!(TransactionType::Adjustment.signed_base_quantity(-3.0), -3.0);
    }
}
