//! Sale and purchase documents.
//!
//! A document is a header plus its lines. Header money fields are derived:
//! `total` from the lines, `paid` and `credit_applied` from the payment and
//! advance ledgers (see [`RollUp`]).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, PartyKind, ResultEngine};

/// Which side of the business a document belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSide {
    Sale,
    Purchase,
}

impl DocumentSide {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sale => "sales",
            Self::Purchase => "purchases",
        }
    }

    pub fn party_kind(self) -> PartyKind {
        match self {
            Self::Sale => PartyKind::Customer,
            Self::Purchase => PartyKind::Vendor,
        }
    }
}

impl TryFrom<&str> for DocumentSide {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "sales" => Ok(Self::Sale),
            "purchases" => Ok(Self::Purchase),
            other => Err(EngineError::Validation(format!(
                "invalid document table: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    Purchase,
    Sale,
    Quotation,
}

impl DocType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Sale => "sale",
            Self::Quotation => "quotation",
        }
    }

    pub fn side(self) -> DocumentSide {
        match self {
            Self::Purchase => DocumentSide::Purchase,
            Self::Sale | Self::Quotation => DocumentSide::Sale,
        }
    }
}

impl TryFrom<&str> for DocType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "purchase" => Ok(Self::Purchase),
            "sale" => Ok(Self::Sale),
            "quotation" => Ok(Self::Quotation),
            other => Err(EngineError::Validation(format!(
                "invalid document type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotationStatus {
    Draft,
    Sent,
    Accepted,
    Expired,
    Cancelled,
}

impl QuotationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Accepted => "accepted",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    /// A quotation can still be turned into a sale.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Draft | Self::Sent)
    }
}

impl TryFrom<&str> for QuotationStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "draft" => Ok(Self::Draft),
            "sent" => Ok(Self::Sent),
            "accepted" => Ok(Self::Accepted),
            "expired" => Ok(Self::Expired),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::Validation(format!(
                "invalid quotation status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Partial => "partial",
            Self::Paid => "paid",
        }
    }

    /// Status of a document from its total and paid amount. Applied credit
    /// lowers the amount due but does not count as payment.
    pub fn derive(total: MoneyCents, paid: MoneyCents) -> Self {
        if paid >= total {
            Self::Paid
        } else if paid.is_positive() {
            Self::Partial
        } else {
            Self::Unpaid
        }
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "unpaid" => Ok(Self::Unpaid),
            "partial" => Ok(Self::Partial),
            "paid" => Ok(Self::Paid),
            other => Err(EngineError::Validation(format!(
                "invalid payment status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DocumentHeader {
    pub id: Uuid,
    pub doc_type: DocType,
    pub party_id: Uuid,
    pub date: NaiveDate,
    pub quotation_status: Option<QuotationStatus>,
    /// Quotation this sale was converted from.
    pub source_quotation_id: Option<Uuid>,
    pub total: MoneyCents,
    pub order_discount: MoneyCents,
    pub paid: MoneyCents,
    pub credit_applied: MoneyCents,
    pub status: PaymentStatus,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl DocumentHeader {
    pub fn side(&self) -> DocumentSide {
        self.doc_type.side()
    }

    pub fn is_quotation(&self) -> bool {
        self.doc_type == DocType::Quotation
    }

    /// `total − paid − credit_applied`; negative when overpaid.
    pub fn remaining_due(&self) -> MoneyCents {
        self.total - self.paid - self.credit_applied
    }

    pub(crate) fn ensure_not_quotation(&self, action: &str) -> ResultEngine<()> {
        if self.is_quotation() {
            return Err(EngineError::Validation(format!(
                "quotation {} cannot {action}",
                self.id
            )));
        }
        Ok(())
    }
}

/// One line of a document. For purchases `unit_price` is the purchase price
/// and `sale_price` the suggested resale price; sales leave `sale_price` at
/// zero.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DocumentLine {
    pub item_id: i64,
    pub document_id: Uuid,
    pub product_id: Uuid,
    pub quantity: f64,
    pub uom: String,
    pub unit_price: MoneyCents,
    pub item_discount: MoneyCents,
    pub sale_price: MoneyCents,
}

impl DocumentLine {
    /// Price per unit after the line discount.
    pub fn net_unit_price(&self) -> MoneyCents {
        self.unit_price - self.item_discount
    }

    pub fn line_total(&self) -> MoneyCents {
        self.net_unit_price().times_quantity(self.quantity)
    }
}

/// Sum of line totals before the order discount.
pub fn subtotal(lines: &[DocumentLine]) -> MoneyCents {
    lines.iter().map(DocumentLine::line_total).sum()
}

/// Document total: subtotal minus order discount, never below zero.
pub fn document_total(lines: &[DocumentLine], order_discount: MoneyCents) -> MoneyCents {
    (subtotal(lines) - order_discount).non_negative()
}

/// Header money fields recomputed from the payment and advance ledgers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RollUp {
    pub paid: MoneyCents,
    pub credit_applied: MoneyCents,
    pub status: PaymentStatus,
}

impl RollUp {
    /// `counted_payments` are the payment amounts that count towards `paid`
    /// for this side; `applications` are the signed `applied_to_*` advance
    /// amounts (negative when credit was consumed).
    pub fn compute(
        total: MoneyCents,
        counted_payments: impl IntoIterator<Item = MoneyCents>,
        applications: impl IntoIterator<Item = MoneyCents>,
    ) -> Self {
        let paid = counted_payments
            .into_iter()
            .sum::<MoneyCents>()
            .non_negative();
        let credit_applied = (-applications.into_iter().sum::<MoneyCents>()).non_negative();
        Self {
            paid,
            credit_applied,
            status: PaymentStatus::derive(total, paid),
        }
    }
}
