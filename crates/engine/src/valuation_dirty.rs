//! `valuation_dirty`: products whose snapshots are stale from a date onwards.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirtyReason {
    /// A posting landed at or before an already valuated position.
    BackdatedPosting,
    /// A document edit superseded earlier postings.
    DocumentRebuild,
    /// A purchase line changed price, discount or unit after valuation.
    PurchasePriceChange,
}

impl DirtyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BackdatedPosting => "backdated_posting",
            Self::DocumentRebuild => "document_rebuild",
            Self::PurchasePriceChange => "purchase_price_change",
        }
    }
}

impl TryFrom<&str> for DirtyReason {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "backdated_posting" => Ok(Self::BackdatedPosting),
            "document_rebuild" => Ok(Self::DocumentRebuild),
            "purchase_price_change" => Ok(Self::PurchasePriceChange),
            other => Err(EngineError::Validation(format!(
                "invalid dirty reason: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DirtyMarker {
    pub product_id: Uuid,
    pub earliest_impacted: NaiveDate,
    pub reason: DirtyReason,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "valuation_dirty")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub product_id: String,
    pub earliest_impacted: Date,
    pub reason: String,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for DirtyMarker {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: parse_uuid(&model.product_id, "product")?,
            earliest_impacted: model.earliest_impacted,
            reason: DirtyReason::try_from(model.reason.as_str())?,
            updated_at: model.updated_at,
        })
    }
}
