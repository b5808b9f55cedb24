//! Command structs for engine operations.
//!
//! These types group parameters for write operations (documents, payments,
//! credit, returns and refunds, adjustments), keeping call sites readable and avoiding
//! long argument lists.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{ClearingState, InstrumentType, MoneyCents, PaymentMethod, Settlement};

const SYSTEM_USER: &str = "system";

/// One document line. For purchases `unit_price` is the purchase price.
#[derive(Clone, Debug)]
pub struct LineCmd {
    /// Existing line to keep when updating a document.
    pub item_id: Option<i64>,
    pub product_id: Uuid,
    pub quantity: f64,
    pub uom: String,
    pub unit_price: MoneyCents,
    pub item_discount: MoneyCents,
    pub sale_price: MoneyCents,
}

impl LineCmd {
    #[must_use]
    pub fn new(
        product_id: Uuid,
        quantity: f64,
        uom: impl Into<String>,
        unit_price: MoneyCents,
    ) -> Self {
        Self {
            item_id: None,
            product_id,
            quantity,
            uom: uom.into(),
            unit_price,
            item_discount: MoneyCents::ZERO,
            sale_price: MoneyCents::ZERO,
        }
    }

    #[must_use]
    pub fn item(mut self, item_id: i64) -> Self {
        self.item_id = Some(item_id);
        self
    }

    #[must_use]
    pub fn discount(mut self, item_discount: MoneyCents) -> Self {
        self.item_discount = item_discount;
        self
    }

    #[must_use]
    pub fn sale_price(mut self, sale_price: MoneyCents) -> Self {
        self.sale_price = sale_price;
        self
    }
}

/// Create or replace a purchase, sale or quotation.
#[derive(Clone, Debug)]
pub struct DocumentCmd {
    pub party_id: Uuid,
    pub date: NaiveDate,
    pub order_discount: MoneyCents,
    pub lines: Vec<LineCmd>,
    pub notes: Option<String>,
    pub created_by: String,
}

impl DocumentCmd {
    #[must_use]
    pub fn new(party_id: Uuid, date: NaiveDate) -> Self {
        Self {
            party_id,
            date,
            order_discount: MoneyCents::ZERO,
            lines: Vec::new(),
            notes: None,
            created_by: SYSTEM_USER.to_string(),
        }
    }

    #[must_use]
    pub fn line(mut self, line: LineCmd) -> Self {
        self.lines.push(line);
        self
    }

    #[must_use]
    pub fn order_discount(mut self, order_discount: MoneyCents) -> Self {
        self.order_discount = order_discount;
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    #[must_use]
    pub fn created_by(mut self, user: impl Into<String>) -> Self {
        self.created_by = user.into();
        self
    }
}

/// Record a payment against a sale or purchase.
#[derive(Clone, Debug)]
pub struct PaymentCmd {
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
    pub clearing_state: Option<ClearingState>,
    pub ref_no: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
}

impl PaymentCmd {
    #[must_use]
    pub fn new(
        document_id: Uuid,
        date: NaiveDate,
        amount: MoneyCents,
        method: PaymentMethod,
    ) -> Self {
        Self {
            document_id,
            date,
            amount,
            method,
            bank_account_id: None,
            vendor_bank_account_id: None,
            instrument_type: None,
            instrument_no: None,
            instrument_date: None,
            deposited_date: None,
            clearing_state: None,
            ref_no: None,
            notes: None,
            created_by: SYSTEM_USER.to_string(),
        }
    }

    #[must_use]
    pub fn bank_account(mut self, id: Uuid) -> Self {
        self.bank_account_id = Some(id);
        self
    }

    #[must_use]
    pub fn vendor_bank_account(mut self, id: Uuid) -> Self {
        self.vendor_bank_account_id = Some(id);
        self
    }

    #[must_use]
    pub fn instrument_type(mut self, instrument_type: InstrumentType) -> Self {
        self.instrument_type = Some(instrument_type);
        self
    }

    #[must_use]
    pub fn instrument_no(mut self, no: impl Into<String>) -> Self {
        self.instrument_no = Some(no.into());
        self
    }

    #[must_use]
    pub fn instrument_date(mut self, date: NaiveDate) -> Self {
        self.instrument_date = Some(date);
        self
    }

    #[must_use]
    pub fn deposited_date(mut self, date: NaiveDate) -> Self {
        self.deposited_date = Some(date);
        self
    }

    /// Overrides the method's default clearing state.
    #[must_use]
    pub fn clearing_state(mut self, state: ClearingState) -> Self {
        self.clearing_state = Some(state);
        self
    }

    #[must_use]
    pub fn ref_no(mut self, ref_no: impl Into<String>) -> Self {
        self.ref_no = Some(ref_no.into());
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    #[must_use]
    pub fn created_by(mut self, user: impl Into<String>) -> Self {
        self.created_by = user.into();
        self
    }
}

/// Grant, credit or consume a party's advance balance.
#[derive(Clone, Debug)]
pub struct CreditCmd {
    pub party_id: Uuid,
    pub amount: MoneyCents,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub created_by: String,
}

impl CreditCmd {
    #[must_use]
    pub fn new(party_id: Uuid, amount: MoneyCents, date: NaiveDate) -> Self {
        Self {
            party_id,
            amount,
            date,
            notes: None,
            created_by: SYSTEM_USER.to_string(),
        }
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    #[must_use]
    pub fn created_by(mut self, user: impl Into<String>) -> Self {
        self.created_by = user.into();
        self
    }
}

/// Return part of a document.
#[derive(Clone, Debug)]
pub struct ReturnCmd {
    pub document_id: Uuid,
    pub date: NaiveDate,
    /// `(item_id, quantity in the line's unit)`.
    pub lines: Vec<(i64, f64)>,
    pub settlement: Option<Settlement>,
    /// How a refund is paid; cleared cash when not given.
    pub refund: Option<RefundCmd>,
    pub notes: Option<String>,
    pub created_by: String,
}

impl ReturnCmd {
    #[must_use]
    pub fn new(document_id: Uuid, date: NaiveDate) -> Self {
        Self {
            document_id,
            date,
            lines: Vec::new(),
            settlement: None,
            refund: None,
            notes: None,
            created_by: SYSTEM_USER.to_string(),
        }
    }

    #[must_use]
    pub fn line(mut self, item_id: i64, quantity: f64) -> Self {
        self.lines.push((item_id, quantity));
        self
    }

    #[must_use]
    pub fn settlement(mut self, settlement: Settlement) -> Self {
        self.settlement = Some(settlement);
        self
    }

    /// Settles as a refund paid through `refund`.
    #[must_use]
    pub fn refund_via(mut self, refund: RefundCmd) -> Self {
        self.settlement = Some(Settlement::Refund);
        self.refund = Some(refund);
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    #[must_use]
    pub fn created_by(mut self, user: impl Into<String>) -> Self {
        self.created_by = user.into();
        self
    }
}

/// Payment details of a return refund. The amount comes from the return.
#[derive(Clone, Debug)]
pub struct RefundCmd {
    pub method: PaymentMethod,
    pub bank_account_id: Option<Uuid>,
    pub vendor_bank_account_id: Option<Uuid>,
    pub instrument_type: Option<InstrumentType>,
    pub instrument_no: Option<String>,
    pub instrument_date: Option<NaiveDate>,
    pub deposited_date: Option<NaiveDate>,
    pub clearing_state: Option<ClearingState>,
    pub ref_no: Option<String>,
}

impl RefundCmd {
    #[must_use]
    pub fn new(method: PaymentMethod) -> Self {
        Self {
            method,
            bank_account_id: None,
            vendor_bank_account_id: None,
            instrument_type: None,
            instrument_no: None,
            instrument_date: None,
            deposited_date: None,
            clearing_state: None,
            ref_no: None,
        }
    }

    #[must_use]
    pub fn bank_account(mut self, id: Uuid) -> Self {
        self.bank_account_id = Some(id);
        self
    }

    #[must_use]
    pub fn vendor_bank_account(mut self, id: Uuid) -> Self {
        self.vendor_bank_account_id = Some(id);
        self
    }

    #[must_use]
    pub fn instrument_type(mut self, instrument_type: InstrumentType) -> Self {
        self.instrument_type = Some(instrument_type);
        self
    }

    #[must_use]
    pub fn instrument_no(mut self, no: impl Into<String>) -> Self {
        self.instrument_no = Some(no.into());
        self
    }

    #[must_use]
    pub fn instrument_date(mut self, date: NaiveDate) -> Self {
        self.instrument_date = Some(date);
        self
    }

    #[must_use]
    pub fn deposited_date(mut self, date: NaiveDate) -> Self {
        self.deposited_date = Some(date);
        self
    }

    #[must_use]
    pub fn clearing_state(mut self, state: ClearingState) -> Self {
        self.clearing_state = Some(state);
        self
    }

    #[must_use]
    pub fn ref_no(mut self, ref_no: impl Into<String>) -> Self {
        self.ref_no = Some(ref_no.into());
        self
    }

    /// The refund as a payment command for `amount`, so it goes through the
    /// same method rules as any other payment.
    pub(crate) fn payment(
        &self,
        document_id: Uuid,
        date: NaiveDate,
        amount: MoneyCents,
        created_by: &str,
    ) -> PaymentCmd {
        PaymentCmd {
            document_id,
            date,
            amount,
            method: self.method,
            bank_account_id: self.bank_account_id,
            vendor_bank_account_id: self.vendor_bank_account_id,
            instrument_type: self.instrument_type,
            instrument_no: self.instrument_no.clone(),
            instrument_date: self.instrument_date,
            deposited_date: self.deposited_date,
            clearing_state: self.clearing_state,
            ref_no: self.ref_no.clone(),
            notes: Some("refund for return".to_string()),
            created_by: created_by.to_string(),
        }
    }
}

impl Default for RefundCmd {
    fn default() -> Self {
        Self::new(PaymentMethod::Cash)
    }
}

/// Manual stock correction; `quantity` is signed.
#[derive(Clone, Debug)]
pub struct AdjustmentCmd {
    pub product_id: Uuid,
    pub quantity: f64,
    pub uom: String,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub created_by: String,
}

impl AdjustmentCmd {
    #[must_use]
    pub fn new(product_id: Uuid, quantity: f64, uom: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            product_id,
            quantity,
            uom: uom.into(),
            date,
            notes: None,
            created_by: SYSTEM_USER.to_string(),
        }
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    #[must_use]
    pub fn created_by(mut self, user: impl Into<String>) -> Self {
        self.created_by = user.into();
        self
    }
}
