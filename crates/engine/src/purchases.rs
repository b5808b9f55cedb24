//! `purchases` table: purchase headers.

use sea_orm::entity::{ActiveValue, prelude::*};

use crate::{
    DocType, DocumentHeader, EngineError, MoneyCents, PaymentStatus, util::parse_uuid,
};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub vendor_id: String,
    pub date: Date,
    pub total_amount_minor: i64,
    pub order_discount_minor: i64,
    pub paid_amount_minor: i64,
    pub credit_applied_minor: i64,
    pub payment_status: String,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_items::Entity")]
    Items,
}

impl Related<super::purchase_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&DocumentHeader> for ActiveModel {
    fn from(value: &DocumentHeader) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            vendor_id: ActiveValue::Set(value.party_id.to_string()),
            date: ActiveValue::Set(value.date),
            total_amount_minor: ActiveValue::Set(value.total.cents()),
            order_discount_minor: ActiveValue::Set(value.order_discount.cents()),
            paid_amount_minor: ActiveValue::Set(value.paid.cents()),
            credit_applied_minor: ActiveValue::Set(value.credit_applied.cents()),
            payment_status: ActiveValue::Set(value.status.as_str().to_string()),
            notes: ActiveValue::Set(value.notes.clone()),
            created_by: ActiveValue::Set(value.created_by.clone()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for DocumentHeader {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "purchase")?,
            doc_type: DocType::Purchase,
            party_id: parse_uuid(&model.vendor_id, "vendor")?,
            date: model.date,
            quotation_status: None,
            source_quotation_id: None,
            total: MoneyCents::new(model.total_amount_minor),
            order_discount: MoneyCents::new(model.order_discount_minor),
            paid: MoneyCents::new(model.paid_amount_minor),
            credit_applied: MoneyCents::new(model.credit_applied_minor),
            status: PaymentStatus::try_from(model.payment_status.as_str())?,
            notes: model.notes,
            created_by: model.created_by,
            created_at: model.created_at,
        })
    }
}
