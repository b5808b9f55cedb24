//! `sales` table: sale and quotation headers.

use sea_orm::entity::{ActiveValue, prelude::*};

use crate::{
    DocType, DocumentHeader, EngineError, MoneyCents, PaymentStatus, QuotationStatus,
    util::{parse_optional_uuid, parse_uuid},
};

pub(crate) const SOURCE_QUOTATION: &str = "quotation";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub customer_id: String,
    pub date: Date,
    pub doc_type: String,
    pub quotation_status: Option<String>,
    pub source_type: Option<String>,
    pub source_id: Option<String>,
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
    #[sea_orm(has_many = "super::sale_items::Entity")]
    Items,
}

impl Related<super::sale_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&DocumentHeader> for ActiveModel {
    fn from(value: &DocumentHeader) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            customer_id: ActiveValue::Set(value.party_id.to_string()),
            date: ActiveValue::Set(value.date),
            doc_type: ActiveValue::Set(value.doc_type.as_str().to_string()),
            quotation_status: ActiveValue::Set(
                value.quotation_status.map(|s| s.as_str().to_string()),
            ),
            source_type: ActiveValue::Set(
                value
                    .source_quotation_id
                    .map(|_| SOURCE_QUOTATION.to_string()),
            ),
            source_id: ActiveValue::Set(value.source_quotation_id.map(|id| id.to_string())),
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
        let doc_type = DocType::try_from(model.doc_type.as_str())?;
        if doc_type == DocType::Purchase {
            return Err(EngineError::Validation(format!(
                "sale {} stored with purchase type",
                model.id
            )));
        }
        Ok(Self {
            id: parse_uuid(&model.id, "sale")?,
            doc_type,
            party_id: parse_uuid(&model.customer_id, "customer")?,
            date: model.date,
            quotation_status: model
                .quotation_status
                .as_deref()
                .map(QuotationStatus::try_from)
                .transpose()?,
            source_quotation_id: parse_optional_uuid(model.source_id.as_deref(), "quotation")?,
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
