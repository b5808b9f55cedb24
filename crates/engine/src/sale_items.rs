//! `sale_items` table.

use sea_orm::entity::{ActiveValue, prelude::*};

use crate::{DocumentLine, EngineError, MoneyCents, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sale_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub item_id: i64,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: f64,
    pub uom: String,
    pub unit_price_minor: i64,
    pub item_discount_minor: i64,
    /// Set when an edit drops the line; superseded postings still point here.
    pub removed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sales::Entity",
        from = "Column::SaleId",
        to = "super::sales::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Sales,
}

impl Related<super::sales::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sales.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// The item id is left unset so inserts allocate a fresh one. `removed_at`
/// is only ever written by the removal update.
impl From<&DocumentLine> for ActiveModel {
    fn from(value: &DocumentLine) -> Self {
        Self {
            item_id: ActiveValue::NotSet,
            sale_id: ActiveValue::Set(value.document_id.to_string()),
            product_id: ActiveValue::Set(value.product_id.to_string()),
            quantity: ActiveValue::Set(value.quantity),
            uom: ActiveValue::Set(value.uom.clone()),
            unit_price_minor: ActiveValue::Set(value.unit_price.cents()),
            item_discount_minor: ActiveValue::Set(value.item_discount.cents()),
            removed_at: ActiveValue::NotSet,
        }
    }
}

impl TryFrom<Model> for DocumentLine {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            item_id: model.item_id,
            document_id: parse_uuid(&model.sale_id, "sale")?,
            product_id: parse_uuid(&model.product_id, "product")?,
            quantity: model.quantity,
            uom: model.uom,
            unit_price: MoneyCents::new(model.unit_price_minor),
            item_discount: MoneyCents::new(model.item_discount_minor),
            sale_price: MoneyCents::ZERO,
        })
    }
}
