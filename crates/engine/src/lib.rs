//! Inventory valuation and reconciliation engine.
//!
//! The engine owns an append-only inventory ledger valuated at moving-average
//! cost, plus the payment and advance ledgers that settle sale and purchase
//! documents. Every public operation on [`Engine`] runs in one database
//! transaction.

pub use advances::{AdvanceEntry, AdvanceLedgerLine, AdvanceSource, statement};
pub use commands::{
    AdjustmentCmd, CreditCmd, DocumentCmd, LineCmd, PaymentCmd, RefundCmd, ReturnCmd,
};
pub use config::EngineConfig;
pub use documents::{
    DocType, DocumentHeader, DocumentLine, DocumentSide, PaymentStatus, QuotationStatus, RollUp,
    document_total, subtotal,
};
pub use error::{EngineError, ErrorKind};
pub use inventory_transactions::{
    InventoryTransaction, LedgerReference, OrderingKey, RETURN_SEQ_FLOOR, SEQ_STEP,
    TransactionType, next_sequence,
};
pub use money::MoneyCents;
pub use ops::{Engine, EngineBuilder, RevaluationReport, StockLevel};
pub use parties::{BankAccount, Party, PartyKind};
pub use payments::{
    ClearingOutcome, ClearingState, InstrumentType, Payment, PaymentMethod, PaymentReceipt,
};
pub use products::{Product, UomMapping};
pub use returns::{ReturnOutcome, ReturnableLine, Settlement};
pub use valuation::{CostState, Movement, fold};
pub use valuation_dirty::{DirtyMarker, DirtyReason};
pub use valuation_history::ValuationSnapshot;

mod advances;
mod commands;
mod config;
mod documents;
mod error;
mod inventory_transactions;
mod money;
mod ops;
mod parties;
mod payments;
mod products;
mod purchase_items;
mod purchases;
mod returns;
mod sale_items;
mod sales;
mod util;
mod valuation;
mod valuation_dirty;
mod valuation_history;

/// Tolerance for quantity and float comparisons.
pub const EPSILON: f64 = 1e-9;

type ResultEngine<T> = Result<T, EngineError>;
