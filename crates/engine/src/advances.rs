//! Customer and vendor advance (credit) ledgers.
//!
//! Each party has a signed running account: deposits and return credits add
//! to it, applications to documents consume it. The running balance, read in
//! `(date, tx_id)` order, never drops below zero.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DocumentSide, EngineError, MoneyCents, PartyKind, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceSource {
    Deposit,
    ReturnCredit,
    AppliedToSale,
    AppliedToPurchase,
}

impl AdvanceSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::ReturnCredit => "return_credit",
            Self::AppliedToSale => "applied_to_sale",
            Self::AppliedToPurchase => "applied_to_purchase",
        }
    }

    pub fn applied_to(side: DocumentSide) -> Self {
        match side {
            DocumentSide::Sale => Self::AppliedToSale,
            DocumentSide::Purchase => Self::AppliedToPurchase,
        }
    }

    pub fn is_application(self) -> bool {
        matches!(self, Self::AppliedToSale | Self::AppliedToPurchase)
    }
}

impl TryFrom<&str> for AdvanceSource {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "deposit" => Ok(Self::Deposit),
            "return_credit" => Ok(Self::ReturnCredit),
            "applied_to_sale" => Ok(Self::AppliedToSale),
            "applied_to_purchase" => Ok(Self::AppliedToPurchase),
            other => Err(EngineError::Validation(format!(
                "invalid advance source: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AdvanceEntry {
    pub tx_id: i64,
    pub party_kind: PartyKind,
    pub party_id: Uuid,
    pub tx_date: NaiveDate,
    /// Positive when credit is granted, negative when it is consumed.
    pub amount: MoneyCents,
    pub source_type: AdvanceSource,
    pub source_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// One row of a party statement.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AdvanceLedgerLine {
    pub entry: AdvanceEntry,
    pub running_balance: MoneyCents,
}

/// Sorts entries into statement order and attaches the running balance,
/// starting from `opening`.
pub fn statement(mut entries: Vec<AdvanceEntry>, opening: MoneyCents) -> Vec<AdvanceLedgerLine> {
    entries.sort_by_key(|e| (e.tx_date, e.tx_id));
    let mut balance = opening;
    entries
        .into_iter()
        .map(|entry| {
            balance += entry.amount;
            AdvanceLedgerLine {
                entry,
                running_balance: balance,
            }
        })
        .collect()
}

/// Rejects `amount` on `date` when any prefix of the party's ledger would go
/// negative once the new entry is slotted in after every entry of the same
/// date.
pub(crate) fn check_overdraft(
    existing: &[AdvanceEntry],
    date: NaiveDate,
    amount: MoneyCents,
) -> ResultEngine<()> {
    let mut rows: Vec<(NaiveDate, i64, MoneyCents)> = existing
        .iter()
        .map(|e| (e.tx_date, e.tx_id, e.amount))
        .collect();
    rows.push((date, i64::MAX, amount));
    rows.sort_by_key(|(d, id, _)| (*d, *id));

    let mut balance = MoneyCents::ZERO;
    for (row_date, _, row_amount) in rows {
        balance += row_amount;
        if balance.is_negative() {
            let available: MoneyCents = existing
                .iter()
                .filter(|e| e.tx_date <= date)
                .map(|e| e.amount)
                .sum();
            return Err(EngineError::InsufficientCredit(format!(
                "requested {}, available {available} (balance would be {balance} on {row_date})",
                -amount
            )));
        }
    }
    Ok(())
}

macro_rules! advance_entity {
    ($module:ident, $table:tt, $party_column:ident, $kind:expr) => {
        pub(crate) mod $module {
            use sea_orm::entity::{ActiveValue, prelude::*};

            use super::{AdvanceEntry, AdvanceSource};
            use crate::{
                EngineError, MoneyCents, PartyKind,
                util::{parse_optional_uuid, parse_uuid},
            };

            #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
            #[sea_orm(table_name = $table)]
            pub struct Model {
                #[sea_orm(primary_key)]
                pub tx_id: i64,
                pub $party_column: String,
                pub tx_date: Date,
                pub amount_minor: i64,
                pub source_type: String,
                pub source_id: Option<String>,
                pub notes: Option<String>,
                pub created_by: String,
                pub created_at: DateTimeUtc,
            }

            #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
            pub enum Relation {}

            impl ActiveModelBehavior for ActiveModel {}

            impl From<&AdvanceEntry> for ActiveModel {
                fn from(value: &AdvanceEntry) -> Self {
                    Self {
                        tx_id: ActiveValue::NotSet,
                        $party_column: ActiveValue::Set(value.party_id.to_string()),
                        tx_date: ActiveValue::Set(value.tx_date),
                        amount_minor: ActiveValue::Set(value.amount.cents()),
                        source_type: ActiveValue::Set(value.source_type.as_str().to_string()),
                        source_id: ActiveValue::Set(value.source_id.map(|id| id.to_string())),
                        notes: ActiveValue::Set(value.notes.clone()),
                        created_by: ActiveValue::Set(value.created_by.clone()),
                        created_at: ActiveValue::Set(value.created_at),
                    }
                }
            }

            impl TryFrom<Model> for AdvanceEntry {
                type Error = EngineError;

                fn try_from(model: Model) -> Result<Self, Self::Error> {
                    let party_kind: PartyKind = $kind;
                    Ok(Self {
                        tx_id: model.tx_id,
                        party_kind,
                        party_id: parse_uuid(&model.$party_column, party_kind.as_str())?,
                        tx_date: model.tx_date,
                        amount: MoneyCents::new(model.amount_minor),
                        source_type: AdvanceSource::try_from(model.source_type.as_str())?,
                        source_id: parse_optional_uuid(model.source_id.as_deref(), "document")?,
                        notes: model.notes,
                        created_by: model.created_by,
                        created_at: model.created_at,
                    })
                }
            }
        }
    };
}

advance_entity!(customer_advances, "customer_advances", customer_id, PartyKind::Customer);
advance_entity!(vendor_advances, "vendor_advances", vendor_id, PartyKind::Vendor);
