//! Counterparties: customers buy from us, vendors sell to us.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DocumentSide, EngineError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyKind {
    Customer,
    Vendor,
}

impl PartyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Vendor => "vendor",
        }
    }

    /// The side of the documents this party settles.
    pub fn document_side(self) -> DocumentSide {
        match self {
            Self::Customer => DocumentSide::Sale,
            Self::Vendor => DocumentSide::Purchase,
        }
    }
}

impl TryFrom<&str> for PartyKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "customer" => Ok(Self::Customer),
            "vendor" => Ok(Self::Vendor),
            other => Err(EngineError::Validation(format!(
                "invalid party kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Party {
    pub id: Uuid,
    pub kind: PartyKind,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Party {
    pub fn new(kind: PartyKind, name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            name,
            created_at: Utc::now(),
        }
    }
}

/// Generates the entity module of a counterparty table; both tables share the
/// same columns.
macro_rules! party_entity {
    ($module:ident, $table:tt, $kind:expr) => {
        pub(crate) mod $module {
            use sea_orm::entity::{ActiveValue, prelude::*};

            use super::{Party, PartyKind};
            use crate::{EngineError, util::parse_uuid};

            #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
            #[sea_orm(table_name = $table)]
            pub struct Model {
                #[sea_orm(primary_key, auto_increment = false)]
                pub id: String,
                pub name: String,
                pub created_at: DateTimeUtc,
            }

            #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
            pub enum Relation {}

            impl ActiveModelBehavior for ActiveModel {}

            impl From<&Party> for ActiveModel {
                fn from(value: &Party) -> Self {
                    Self {
                        id: ActiveValue::Set(value.id.to_string()),
                        name: ActiveValue::Set(value.name.clone()),
                        created_at: ActiveValue::Set(value.created_at),
                    }
                }
            }

            impl TryFrom<Model> for Party {
                type Error = EngineError;

                fn try_from(model: Model) -> Result<Self, Self::Error> {
                    let kind: PartyKind = $kind;
                    Ok(Party {
                        id: parse_uuid(&model.id, kind.as_str())?,
                        kind,
                        name: model.name,
                        created_at: model.created_at,
                    })
                }
            }
        }
    };
}

party_entity!(customers, "customers", PartyKind::Customer);
party_entity!(vendors, "vendors", PartyKind::Vendor);

/// A bank account owned by the company, or by a vendor when `vendor_id` is
/// set.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BankAccount {
    pub id: Uuid,
    pub vendor_id: Option<Uuid>,
    pub bank_name: String,
    pub account_no: String,
    pub created_at: DateTime<Utc>,
}

impl BankAccount {
    pub fn new(vendor_id: Option<Uuid>, bank_name: String, account_no: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            vendor_id,
            bank_name,
            account_no,
            created_at: Utc::now(),
        }
    }
}

pub(crate) mod company_bank_accounts {
    use sea_orm::entity::{ActiveValue, prelude::*};

    use super::BankAccount;
    use crate::{EngineError, util::parse_uuid};

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "company_bank_accounts")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub bank_name: String,
        pub account_no: String,
        pub created_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl From<&BankAccount> for ActiveModel {
        fn from(value: &BankAccount) -> Self {
            Self {
                id: ActiveValue::Set(value.id.to_string()),
                bank_name: ActiveValue::Set(value.bank_name.clone()),
                account_no: ActiveValue::Set(value.account_no.clone()),
                created_at: ActiveValue::Set(value.created_at),
            }
        }
    }

    impl TryFrom<Model> for BankAccount {
        type Error = EngineError;

        fn try_from(model: Model) -> Result<Self, Self::Error> {
            Ok(Self {
                id: parse_uuid(&model.id, "bank account")?,
                vendor_id: None,
                bank_name: model.bank_name,
                account_no: model.account_no,
                created_at: model.created_at,
            })
        }
    }
}

pub(crate) mod vendor_bank_accounts {
    use sea_orm::entity::{ActiveValue, prelude::*};

    use super::BankAccount;
    use crate::{EngineError, util::parse_uuid};

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "vendor_bank_accounts")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub vendor_id: String,
        pub bank_name: String,
        pub account_no: String,
        pub created_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl From<&BankAccount> for ActiveModel {
        fn from(value: &BankAccount) -> Self {
            Self {
                id: ActiveValue::Set(value.id.to_string()),
                vendor_id: ActiveValue::Set(
                    value.vendor_id.map(|id| id.to_string()).unwrap_or_default(),
                ),
                bank_name: ActiveValue::Set(value.bank_name.clone()),
                account_no: ActiveValue::Set(value.account_no.clone()),
                created_at: ActiveValue::Set(value.created_at),
            }
        }
    }

    impl TryFrom<Model> for BankAccount {
        type Error = EngineError;

        fn try_from(model: Model) -> Result<Self, Self::Error> {
            Ok(Self {
                id: parse_uuid(&model.id, "vendor bank account")?,
                vendor_id: Some(parse_uuid(&model.vendor_id, "vendor")?),
                bank_name: model.bank_name,
                account_no: model.account_no,
                created_at: model.created_at,
            })
        }
    }
}
