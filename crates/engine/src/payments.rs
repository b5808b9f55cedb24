//! Payment ledger primitives for sales and purchases.
//!
//! Amounts are signed: positive when money moves in the document's normal
//! direction (customer pays us, we pay the vendor), negative for refunds.
//! Only cash may be negative.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DocumentSide, EngineError, MoneyCents, PaymentCmd, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Cheque,
    CrossCheque,
    CashDeposit,
    Card,
    Other,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "Cash",
            Self::BankTransfer => "Bank Transfer",
            Self::Cheque => "Cheque",
            Self::CrossCheque => "Cross Cheque",
            Self::CashDeposit => "Cash Deposit",
            Self::Card => "Card",
            Self::Other => "Other",
        }
    }

    /// Clearing state a payment starts in when the caller does not pick one.
    pub fn default_clearing_state(self) -> ClearingState {
        match self {
            Self::Cash | Self::Card | Self::Other => ClearingState::Cleared,
            Self::BankTransfer => ClearingState::Posted,
            Self::Cheque | Self::CrossCheque | Self::CashDeposit => ClearingState::Pending,
        }
    }
}

impl TryFrom<&str> for PaymentMethod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Cash" => Ok(Self::Cash),
            "Bank Transfer" => Ok(Self::BankTransfer),
            "Cheque" => Ok(Self::Cheque),
            "Cross Cheque" => Ok(Self::CrossCheque),
            "Cash Deposit" => Ok(Self::CashDeposit),
            "Card" => Ok(Self::Card),
            "Other" => Ok(Self::Other),
            other => Err(EngineError::Validation(format!(
                "invalid payment method: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentType {
    Online,
    CrossCheque,
    Cheque,
    CashDeposit,
    Other,
}

impl InstrumentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::CrossCheque => "cross_cheque",
            Self::Cheque => "cheque",
            Self::CashDeposit => "cash_deposit",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for InstrumentType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "online" => Ok(Self::Online),
            "cross_cheque" => Ok(Self::CrossCheque),
            "cheque" => Ok(Self::Cheque),
            "cash_deposit" => Ok(Self::CashDeposit),
            "other" => Ok(Self::Other),
            other => Err(EngineError::Validation(format!(
                "invalid instrument type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearingState {
    Posted,
    Pending,
    Cleared,
    Bounced,
}

impl ClearingState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Posted => "posted",
            Self::Pending => "pending",
            Self::Cleared => "cleared",
            Self::Bounced => "bounced",
        }
    }

    /// Transitions allowed by the instrument lifecycle. Whether a cleared
    /// payment may still bounce also depends on the payment itself.
    pub fn can_transition_to(self, next: ClearingState) -> bool {
        matches!(
            (self, next),
            (Self::Posted, Self::Pending | Self::Cleared | Self::Bounced)
                | (Self::Pending, Self::Cleared | Self::Bounced)
                | (Self::Cleared, Self::Bounced)
        )
    }
}

impl TryFrom<&str> for ClearingState {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "posted" => Ok(Self::Posted),
            "pending" => Ok(Self::Pending),
            "cleared" => Ok(Self::Cleared),
            "bounced" => Ok(Self::Bounced),
            other => Err(EngineError::Validation(format!(
                "invalid clearing state: {other}"
            ))),
        }
    }
}

/// Result of a clearing-state transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearingOutcome {
    Applied,
    /// Someone else already moved the payment to the requested state.
    AlreadyApplied,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Payment {
    pub payment_id: i64,
    pub side: DocumentSide,
    pub document_id: Uuid,
    pub date: NaiveDate,
    pub amount: MoneyCents,
    pub method: PaymentMethod,
    pub bank_account_id: Option<Uuid>,
    pub vendor_bank_account_id: Option<Uuid>,
    pub instrument_type: Option<InstrumentType>,
    pub instrument_no: Option<String>,
    pub instrument_date: Option<NaiveDate>,
    pub deposited_date: Option<NaiveDate>,
    pub cleared_date: Option<NaiveDate>,
    pub clearing_state: ClearingState,
    pub ref_no: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub overpayment_converted: bool,
}

impl Payment {
    /// Sales count every payment towards `paid`; purchases only cleared ones.
    pub fn counts_towards_paid(&self) -> bool {
        match self.side {
            DocumentSide::Sale => true,
            DocumentSide::Purchase => self.clearing_state == ClearingState::Cleared,
        }
    }
}

/// What `record_payment` did with the requested amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PaymentReceipt {
    pub payment_id: i64,
    pub recorded: MoneyCents,
    /// Excess moved into the counterparty's advance ledger.
    pub converted_to_credit: MoneyCents,
    pub advance_tx_id: Option<i64>,
}

/// Checks the per-method rules and returns the instrument type to store.
pub(crate) fn check_method_rules(
    side: DocumentSide,
    cmd: &PaymentCmd,
) -> ResultEngine<Option<InstrumentType>> {
    let method = cmd.method;
    let fail = |msg: &str| Err(EngineError::Validation(format!("{}: {msg}", method.as_str())));

    if cmd.amount.is_zero() {
        return fail("amount must not be zero");
    }
    if side == DocumentSide::Sale && cmd.vendor_bank_account_id.is_some() {
        return fail("sale payments cannot reference a vendor bank account");
    }

    if method == PaymentMethod::Cash {
        if cmd.bank_account_id.is_some() || cmd.vendor_bank_account_id.is_some() {
            return fail("cash never carries a bank account");
        }
        return match cmd.instrument_type {
            None | Some(InstrumentType::Other) => Ok(Some(InstrumentType::Other)),
            Some(_) => fail("cash only accepts the 'other' instrument type"),
        };
    }

    if cmd.amount.is_negative() {
        return fail("amount must be > 0");
    }

    let (needs_bank, needs_vendor_bank, required_type) = match (method, side) {
        (PaymentMethod::BankTransfer, DocumentSide::Sale) => {
            (true, false, Some(InstrumentType::Online))
        }
        (PaymentMethod::BankTransfer, DocumentSide::Purchase) => {
            (true, true, Some(InstrumentType::Online))
        }
        (PaymentMethod::Cheque, DocumentSide::Sale) => {
            (true, false, Some(InstrumentType::CrossCheque))
        }
        (PaymentMethod::Cheque, DocumentSide::Purchase) => {
            (true, false, Some(InstrumentType::Cheque))
        }
        (PaymentMethod::CrossCheque, DocumentSide::Sale) => {
            (true, false, Some(InstrumentType::CrossCheque))
        }
        (PaymentMethod::CrossCheque, DocumentSide::Purchase) => {
            (true, true, Some(InstrumentType::CrossCheque))
        }
        (PaymentMethod::CashDeposit, DocumentSide::Sale) => {
            (true, false, Some(InstrumentType::CashDeposit))
        }
        (PaymentMethod::CashDeposit, DocumentSide::Purchase) => {
            (false, true, Some(InstrumentType::CashDeposit))
        }
        _ => (false, false, None),
    };

    if needs_bank && cmd.bank_account_id.is_none() {
        return fail("a company bank account is required");
    }
    if needs_vendor_bank && cmd.vendor_bank_account_id.is_none() {
        return fail("a vendor bank account is required");
    }
    let Some(required) = required_type else {
        return Ok(cmd.instrument_type);
    };
    if cmd
        .instrument_no
        .as_deref()
        .map(str::trim)
        .is_none_or(str::is_empty)
    {
        return fail("an instrument number is required");
    }
    match cmd.instrument_type {
        None => Ok(Some(required)),
        Some(given) if given == required => Ok(Some(required)),
        Some(given) => Err(EngineError::Validation(format!(
            "{}: instrument type must be '{}', got '{}'",
            method.as_str(),
            required.as_str(),
            given.as_str()
        ))),
    }
}

pub(crate) mod sale_payments {
    use sea_orm::entity::{ActiveValue, prelude::*};

    use super::{ClearingState, InstrumentType, Payment, PaymentMethod};
    use crate::{
        DocumentSide, EngineError, MoneyCents,
        util::{parse_optional_uuid, parse_uuid},
    };

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "sale_payments")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub payment_id: i64,
        pub sale_id: String,
        pub date: Date,
        pub amount_minor: i64,
        pub method: String,
        pub bank_account_id: Option<String>,
        pub instrument_type: Option<String>,
        pub instrument_no: Option<String>,
        pub instrument_date: Option<Date>,
        pub deposited_date: Option<Date>,
        pub cleared_date: Option<Date>,
        pub clearing_state: String,
        pub ref_no: Option<String>,
        pub notes: Option<String>,
        pub created_by: String,
        pub created_at: DateTimeUtc,
        pub overpayment_converted: bool,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl From<&Payment> for ActiveModel {
        fn from(value: &Payment) -> Self {
            Self {
                payment_id: ActiveValue::NotSet,
                sale_id: ActiveValue::Set(value.document_id.to_string()),
                date: ActiveValue::Set(value.date),
                amount_minor: ActiveValue::Set(value.amount.cents()),
                method: ActiveValue::Set(value.method.as_str().to_string()),
                bank_account_id: ActiveValue::Set(value.bank_account_id.map(|id| id.to_string())),
                instrument_type: ActiveValue::Set(
                    value.instrument_type.map(|t| t.as_str().to_string()),
                ),
                instrument_no: ActiveValue::Set(value.instrument_no.clone()),
                instrument_date: ActiveValue::Set(value.instrument_date),
                deposited_date: ActiveValue::Set(value.deposited_date),
                cleared_date: ActiveValue::Set(value.cleared_date),
                clearing_state: ActiveValue::Set(value.clearing_state.as_str().to_string()),
                ref_no: ActiveValue::Set(value.ref_no.clone()),
                notes: ActiveValue::Set(value.notes.clone()),
                created_by: ActiveValue::Set(value.created_by.clone()),
                created_at: ActiveValue::Set(value.created_at),
                overpayment_converted: ActiveValue::Set(value.overpayment_converted),
            }
        }
    }

    impl TryFrom<Model> for Payment {
        type Error = EngineError;

        fn try_from(model: Model) -> Result<Self, Self::Error> {
            Ok(Self {
                payment_id: model.payment_id,
                side: DocumentSide::Sale,
                document_id: parse_uuid(&model.sale_id, "sale")?,
                date: model.date,
                amount: MoneyCents::new(model.amount_minor),
                method: PaymentMethod::try_from(model.method.as_str())?,
                bank_account_id: parse_optional_uuid(
                    model.bank_account_id.as_deref(),
                    "bank account",
                )?,
                vendor_bank_account_id: None,
                instrument_type: model
                    .instrument_type
                    .as_deref()
                    .map(InstrumentType::try_from)
                    .transpose()?,
                instrument_no: model.instrument_no,
                instrument_date: model.instrument_date,
                deposited_date: model.deposited_date,
                cleared_date: model.cleared_date,
                clearing_state: ClearingState::try_from(model.clearing_state.as_str())?,
                ref_no: model.ref_no,
                notes: model.notes,
                created_by: model.created_by,
                created_at: model.created_at,
                overpayment_converted: model.overpayment_converted,
            })
        }
    }
}

pub(crate) mod purchase_payments {
    use sea_orm::entity::{ActiveValue, prelude::*};

    use super::{ClearingState, InstrumentType, Payment, PaymentMethod};
    use crate::{
        DocumentSide, EngineError, MoneyCents,
        util::{parse_optional_uuid, parse_uuid},
    };

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "purchase_payments")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub payment_id: i64,
        pub purchase_id: String,
        pub date: Date,
        pub amount_minor: i64,
        pub method: String,
        pub bank_account_id: Option<String>,
        pub vendor_bank_account_id: Option<String>,
        pub instrument_type: Option<String>,
        pub instrument_no: Option<String>,
        pub instrument_date: Option<Date>,
        pub deposited_date: Option<Date>,
        pub cleared_date: Option<Date>,
        pub clearing_state: String,
        pub ref_no: Option<String>,
        pub notes: Option<String>,
        pub created_by: String,
        pub created_at: DateTimeUtc,
        pub overpayment_converted: bool,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl From<&Payment> for ActiveModel {
        fn from(value: &Payment) -> Self {
            Self {
                payment_id: ActiveValue::NotSet,
                purchase_id: ActiveValue::Set(value.document_id.to_string()),
                date: ActiveValue::Set(value.date),
                amount_minor: ActiveValue::Set(value.amount.cents()),
                method: ActiveValue::Set(value.method.as_str().to_string()),
                bank_account_id: ActiveValue::Set(value.bank_account_id.map(|id| id.to_string())),
                vendor_bank_account_id: ActiveValue::Set(
                    value.vendor_bank_account_id.map(|id| id.to_string()),
                ),
                instrument_type: ActiveValue::Set(
                    value.instrument_type.map(|t| t.as_str().to_string()),
                ),
                instrument_no: ActiveValue::Set(value.instrument_no.clone()),
                instrument_date: ActiveValue::Set(value.instrument_date),
                deposited_date: ActiveValue::Set(value.deposited_date),
                cleared_date: ActiveValue::Set(value.cleared_date),
                clearing_state: ActiveValue::Set(value.clearing_state.as_str().to_string()),
                ref_no: ActiveValue::Set(value.ref_no.clone()),
                notes: ActiveValue::Set(value.notes.clone()),
                created_by: ActiveValue::Set(value.created_by.clone()),
                created_at: ActiveValue::Set(value.created_at),
                overpayment_converted: ActiveValue::Set(value.overpayment_converted),
            }
        }
    }

    impl TryFrom<Model> for Payment {
        type Error = EngineError;

        fn try_from(model: Model) -> Result<Self, Self::Error> {
            Ok(Self {
                payment_id: model.payment_id,
                side: DocumentSide::Purchase,
                document_id: parse_uuid(&model.purchase_id, "purchase")?,
                date: model.date,
                amount: MoneyCents::new(model.amount_minor),
                method: PaymentMethod::try_from(model.method.as_str())?,
                bank_account_id: parse_optional_uuid(
                    model.bank_account_id.as_deref(),
                    "bank account",
                )?,
                vendor_bank_account_id: parse_optional_uuid(
                    model.vendor_bank_account_id.as_deref(),
                    "vendor bank account",
                )?,
                instrument_type: model
                    .instrument_type
                    .as_deref()
                    .map(InstrumentType::try_from)
                    .transpose()?,
                instrument_no: model.instrument_no,
                instrument_date: model.instrument_date,
                deposited_date: model.deposited_date,
                cleared_date: model.cleared_date,
                clearing_state: ClearingState::try_from(model.clearing_state.as_str())?,
                ref_no: model.ref_no,
                notes: model.notes,
                created_by: model.created_by,
                created_at: model.created_at,
                overpayment_converted: model.overpayment_converted,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn cmd(method: PaymentMethod, cents: i64) -> PaymentCmd {
        PaymentCmd::new(
            Uuid::nil(),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            MoneyCents::new(cents),
            method,
        )
    }

    #[test]
    fn cash_accepts_refunds_but_not_bank_accounts() {
        assert_eq!(
            check_method_rules(DocumentSide::Sale, &cmd(PaymentMethod::Cash, -500)).unwrap(),
            Some(InstrumentType::Other)
        );
        let with_bank = cmd(PaymentMethod::Cash, 500).bank_account(Uuid::new_v4());
        assert!(check_method_rules(DocumentSide::Sale, &with_bank).is_err());
    }

    #[test]
    fn non_cash_must_be_positive() {
        assert!(check_method_rules(DocumentSide::Sale, &cmd(PaymentMethod::Card, -100)).is_err());
        assert!(check_method_rules(DocumentSide::Sale, &cmd(PaymentMethod::Card, 100)).is_ok());
    }

    #[test]
    fn bank_transfer_needs_account_number_and_online_tag() {
        let missing_no = cmd(PaymentMethod::BankTransfer, 100).bank_account(Uuid::new_v4());
        assert!(check_method_rules(DocumentSide::Sale, &missing_no).is_err());

        let ok = missing_no.clone().instrument_no("TRX-1");
        assert_eq!(
            check_method_rules(DocumentSide::Sale, &ok).unwrap(),
            Some(InstrumentType::Online)
        );

        let wrong_tag = ok.instrument_type(InstrumentType::Cheque);
        assert!(check_method_rules(DocumentSide::Sale, &wrong_tag).is_err());
    }

    #[test]
    fn cheque_tag_depends_on_side() {
        let sale = cmd(PaymentMethod::Cheque, 100)
            .bank_account(Uuid::new_v4())
            .instrument_no("000123");
        assert_eq!(
            check_method_rules(DocumentSide::Sale, &sale).unwrap(),
            Some(InstrumentType::CrossCheque)
        );
        assert_eq!(
            check_method_rules(DocumentSide::Purchase, &sale).unwrap(),
            Some(InstrumentType::Cheque)
        );
    }

    #[test]
    fn outgoing_transfers_need_a_vendor_account() {
        let transfer = cmd(PaymentMethod::BankTransfer, 100)
            .bank_account(Uuid::new_v4())
            .instrument_no("TRX-2");
        assert!(check_method_rules(DocumentSide::Purchase, &transfer).is_err());
        let transfer = transfer.vendor_bank_account(Uuid::new_v4());
        assert!(check_method_rules(DocumentSide::Purchase, &transfer).is_ok());
    }

    #[test]
    fn lifecycle_transitions() {
        assert!(ClearingState::Pending.can_transition_to(ClearingState::Cleared));
        assert!(ClearingState::Cleared.can_transition_to(ClearingState::Bounced));
        assert!(!ClearingState::Cleared.can_transition_to(ClearingState::Pending));
        assert!(!ClearingState::Bounced.can_transition_to(ClearingState::Cleared));
        assert_eq!(
            PaymentMethod::Cheque.default_clearing_state(),
            ClearingState::Pending
        );
        assert_eq!(
            PaymentMethod::Cash.default_clearing_state(),
            ClearingState::Cleared
        );
    }
}
