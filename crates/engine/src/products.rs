//! Products and their unit-of-measure mappings.
//!
//! A product is valuated in exactly one base unit. Every other unit it can be
//! bought or sold in converts to the base unit through `factor_to_base`.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            created_at: Utc::now(),
        }
    }
}

/// One (product, unit) pair and its conversion into the base unit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UomMapping {
    pub product_id: Uuid,
    pub uom: String,
    pub is_base: bool,
    pub factor_to_base: f64,
}

impl UomMapping {
    /// Converts `quantity` expressed in this unit into base units.
    pub fn to_base(&self, quantity: f64) -> f64 {
        quantity * self.factor_to_base
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "uoms::Entity")]
    Uoms,
}

impl Related<uoms::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Uoms.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Product> for ActiveModel {
    fn from(value: &Product) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Product {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "product")?,
            name: model.name,
            created_at: model.created_at,
        })
    }
}

pub(crate) mod uoms {
    use sea_orm::entity::{ActiveValue, prelude::*};

    use super::UomMapping;
    use crate::{EngineError, util::parse_uuid};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "product_uoms")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub product_id: String,
        #[sea_orm(primary_key, auto_increment = false)]
        pub uom: String,
        pub is_base: bool,
        pub factor_to_base: f64,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::Entity",
            from = "Column::ProductId",
            to = "super::Column::Id",
            on_update = "NoAction",
            on_delete = "NoAction"
        )]
        Products,
    }

    impl Related<super::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Products.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl From<&UomMapping> for ActiveModel {
        fn from(value: &UomMapping) -> Self {
            Self {
                product_id: ActiveValue::Set(value.product_id.to_string()),
                uom: ActiveValue::Set(value.uom.clone()),
                is_base: ActiveValue::Set(value.is_base),
                factor_to_base: ActiveValue::Set(value.factor_to_base),
            }
        }
    }

    impl TryFrom<Model> for UomMapping {
        type Error = EngineError;

        fn try_from(model: Model) -> Result<Self, Self::Error> {
            Ok(Self {
                product_id: parse_uuid(&model.product_id, "product")?,
                uom: model.uom,
                is_base: model.is_base,
                factor_to_base: model.factor_to_base,
            })
        }
    }
}
