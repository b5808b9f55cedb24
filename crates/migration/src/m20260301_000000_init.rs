//! Initial schema for the stock and reconciliation ledger.
//!
//! - master data: `products`, `product_uoms`, `customers`, `vendors`,
//!   `company_bank_accounts`, `vendor_bank_accounts`
//! - documents: `purchases`, `purchase_items`, `sales`, `sale_items`
//! - inventory: `inventory_transactions`, `stock_valuation_history`,
//!   `valuation_dirty`
//! - money: `sale_payments`, `purchase_payments`, `customer_advances`,
//!   `vendor_advances`
//!
//! Column checks are a last line of defence; the engine validates every rule
//! before writing.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Products {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(Iden)]
enum ProductUoms {
    Table,
    ProductId,
    Uom,
    IsBase,
    FactorToBase,
}

#[derive(Iden)]
enum Customers {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(Iden)]
enum Vendors {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(Iden)]
enum CompanyBankAccounts {
    Table,
    Id,
    BankName,
    AccountNo,
    CreatedAt,
}

#[derive(Iden)]
enum VendorBankAccounts {
    Table,
    Id,
    VendorId,
    BankName,
    AccountNo,
    CreatedAt,
}

#[derive(Iden)]
enum Purchases {
    Table,
    Id,
    VendorId,
    Date,
    TotalAmountMinor,
    OrderDiscountMinor,
    PaidAmountMinor,
    CreditAppliedMinor,
    PaymentStatus,
    Notes,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum PurchaseItems {
    Table,
    ItemId,
    PurchaseId,
    ProductId,
    Quantity,
    Uom,
    PurchasePriceMinor,
    SalePriceMinor,
    ItemDiscountMinor,
    RemovedAt,
}

#[derive(Iden)]
enum Sales {
    Table,
    Id,
    CustomerId,
    Date,
    DocType,
    QuotationStatus,
    SourceType,
    SourceId,
    TotalAmountMinor,
    OrderDiscountMinor,
    PaidAmountMinor,
    CreditAppliedMinor,
    PaymentStatus,
    Notes,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum SaleItems {
    Table,
    ItemId,
    SaleId,
    ProductId,
    Quantity,
    Uom,
    UnitPriceMinor,
    ItemDiscountMinor,
    RemovedAt,
}

#[derive(Iden)]
enum InventoryTransactions {
    Table,
    TransactionId,
    ProductId,
    Quantity,
    Uom,
    BaseQuantity,
    TransactionType,
    ReferenceTable,
    ReferenceId,
    ReferenceItemId,
    Date,
    OrderingClass,
    TxnSeq,
    PostedAt,
    Generation,
    SupersededAt,
    Notes,
    CreatedBy,
}

#[derive(Iden)]
enum StockValuationHistory {
    Table,
    ValuationId,
    ProductId,
    TransactionId,
    ValuationDate,
    OrderingClass,
    TxnSeq,
    Quantity,
    UnitValue,
    TotalValue,
    ValuationMethod,
    CreatedAt,
    SupersededAt,
}

#[derive(Iden)]
enum ValuationDirty {
    Table,
    ProductId,
    EarliestImpacted,
    Reason,
    UpdatedAt,
}

#[derive(Iden)]
enum SalePayments {
    Table,
    PaymentId,
    SaleId,
    Date,
    AmountMinor,
    Method,
    BankAccountId,
    InstrumentType,
    InstrumentNo,
    InstrumentDate,
    DepositedDate,
    ClearedDate,
    ClearingState,
    RefNo,
    Notes,
    CreatedBy,
    CreatedAt,
    OverpaymentConverted,
}

#[derive(Iden)]
enum PurchasePayments {
    Table,
    PaymentId,
    PurchaseId,
    Date,
    AmountMinor,
    Method,
    BankAccountId,
    VendorBankAccountId,
    InstrumentType,
    InstrumentNo,
    InstrumentDate,
    DepositedDate,
    ClearedDate,
    ClearingState,
    RefNo,
    Notes,
    CreatedBy,
    CreatedAt,
    OverpaymentConverted,
}

#[derive(Iden)]
enum CustomerAdvances {
    Table,
    TxId,
    CustomerId,
    TxDate,
    AmountMinor,
    SourceType,
    SourceId,
    Notes,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum VendorAdvances {
    Table,
    TxId,
    VendorId,
    TxDate,
    AmountMinor,
    SourceType,
    SourceId,
    Notes,
    CreatedBy,
    CreatedAt,
}

const CLEARING_STATES: [&str; 4] = ["posted", "pending", "cleared", "bounced"];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Master data
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Products::Name).string().not_null())
                    .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductUoms::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ProductUoms::ProductId).string().not_null())
                    .col(ColumnDef::new(ProductUoms::Uom).string().not_null())
                    .col(ColumnDef::new(ProductUoms::IsBase).boolean().not_null())
                    .col(
                        ColumnDef::new(ProductUoms::FactorToBase)
                            .double()
                            .not_null()
                            .check(Expr::col(ProductUoms::FactorToBase).gt(0)),
                    )
                    .primary_key(
                        Index::create()
                            .col(ProductUoms::ProductId)
                            .col(ProductUoms::Uom),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-product_uoms-product_id")
                            .from(ProductUoms::Table, ProductUoms::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Customers::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Customers::Name).string().not_null())
                    .col(ColumnDef::new(Customers::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Vendors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vendors::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Vendors::Name).string().not_null())
                    .col(ColumnDef::new(Vendors::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CompanyBankAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CompanyBankAccounts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CompanyBankAccounts::BankName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CompanyBankAccounts::AccountNo)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CompanyBankAccounts::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(VendorBankAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VendorBankAccounts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(VendorBankAccounts::VendorId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VendorBankAccounts::BankName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VendorBankAccounts::AccountNo)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VendorBankAccounts::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-vendor_bank_accounts-vendor_id")
                            .from(VendorBankAccounts::Table, VendorBankAccounts::VendorId)
                            .to(Vendors::Table, Vendors::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Documents
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Purchases::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Purchases::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Purchases::VendorId).string().not_null())
                    .col(ColumnDef::new(Purchases::Date).date().not_null())
                    .col(
                        ColumnDef::new(Purchases::TotalAmountMinor)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Purchases::TotalAmountMinor).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Purchases::OrderDiscountMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Purchases::PaidAmountMinor)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Purchases::PaidAmountMinor).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Purchases::CreditAppliedMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Purchases::PaymentStatus)
                            .string()
                            .not_null()
                            .default("unpaid"),
                    )
                    .col(ColumnDef::new(Purchases::Notes).string())
                    .col(ColumnDef::new(Purchases::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Purchases::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-purchases-vendor_id")
                            .from(Purchases::Table, Purchases::VendorId)
                            .to(Vendors::Table, Vendors::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PurchaseItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseItems::ItemId)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PurchaseItems::PurchaseId).string().not_null())
                    .col(ColumnDef::new(PurchaseItems::ProductId).string().not_null())
                    .col(
                        ColumnDef::new(PurchaseItems::Quantity)
                            .double()
                            .not_null()
                            .check(Expr::col(PurchaseItems::Quantity).gt(0)),
                    )
                    .col(ColumnDef::new(PurchaseItems::Uom).string().not_null())
                    .col(
                        ColumnDef::new(PurchaseItems::PurchasePriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseItems::SalePriceMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseItems::ItemDiscountMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(PurchaseItems::RemovedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-purchase_items-purchase_id")
                            .from(PurchaseItems::Table, PurchaseItems::PurchaseId)
                            .to(Purchases::Table, Purchases::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-purchase_items-product_id")
                            .from(PurchaseItems::Table, PurchaseItems::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Sales::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sales::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sales::CustomerId).string().not_null())
                    .col(ColumnDef::new(Sales::Date).date().not_null())
                    .col(
                        ColumnDef::new(Sales::DocType)
                            .string()
                            .not_null()
                            .default("sale")
                            .check(Expr::col(Sales::DocType).is_in(["sale", "quotation"])),
                    )
                    .col(ColumnDef::new(Sales::QuotationStatus).string())
                    .col(ColumnDef::new(Sales::SourceType).string())
                    .col(ColumnDef::new(Sales::SourceId).string())
                    .col(
                        ColumnDef::new(Sales::TotalAmountMinor)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Sales::TotalAmountMinor).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Sales::OrderDiscountMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Sales::PaidAmountMinor)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Sales::PaidAmountMinor).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Sales::CreditAppliedMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Sales::PaymentStatus)
                            .string()
                            .not_null()
                            .default("unpaid"),
                    )
                    .col(ColumnDef::new(Sales::Notes).string())
                    .col(ColumnDef::new(Sales::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Sales::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sales-customer_id")
                            .from(Sales::Table, Sales::CustomerId)
                            .to(Customers::Table, Customers::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SaleItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SaleItems::ItemId)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SaleItems::SaleId).string().not_null())
                    .col(ColumnDef::new(SaleItems::ProductId).string().not_null())
                    .col(
                        ColumnDef::new(SaleItems::Quantity)
                            .double()
                            .not_null()
                            .check(Expr::col(SaleItems::Quantity).gt(0)),
                    )
                    .col(ColumnDef::new(SaleItems::Uom).string().not_null())
                    .col(
                        ColumnDef::new(SaleItems::UnitPriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SaleItems::ItemDiscountMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(SaleItems::RemovedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sale_items-sale_id")
                            .from(SaleItems::Table, SaleItems::SaleId)
                            .to(Sales::Table, Sales::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sale_items-product_id")
                            .from(SaleItems::Table, SaleItems::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Inventory ledger and valuation
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(InventoryTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryTransactions::TransactionId)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::ProductId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::Quantity)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryTransactions::Uom).string().not_null())
                    .col(
                        ColumnDef::new(InventoryTransactions::BaseQuantity)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::TransactionType)
                            .string()
                            .not_null()
                            .check(Expr::col(InventoryTransactions::TransactionType).is_in([
                                "purchase",
                                "sale",
                                "purchase_return",
                                "sale_return",
                                "adjustment",
                            ])),
                    )
                    .col(ColumnDef::new(InventoryTransactions::ReferenceTable).string())
                    .col(ColumnDef::new(InventoryTransactions::ReferenceId).string())
                    .col(ColumnDef::new(InventoryTransactions::ReferenceItemId).big_integer())
                    .col(ColumnDef::new(InventoryTransactions::Date).date().not_null())
                    .col(
                        ColumnDef::new(InventoryTransactions::OrderingClass)
                            .small_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::TxnSeq)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::PostedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::Generation)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(InventoryTransactions::SupersededAt).timestamp())
                    .col(ColumnDef::new(InventoryTransactions::Notes).string())
                    .col(
                        ColumnDef::new(InventoryTransactions::CreatedBy)
                            .string()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-inventory_transactions-product_id")
                            .from(
                                InventoryTransactions::Table,
                                InventoryTransactions::ProductId,
                            )
                            .to(Products::Table, Products::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-inventory_transactions-product-order")
                    .table(InventoryTransactions::Table)
                    .col(InventoryTransactions::ProductId)
                    .col(InventoryTransactions::Date)
                    .col(InventoryTransactions::OrderingClass)
                    .col(InventoryTransactions::TxnSeq)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-inventory_transactions-reference")
                    .table(InventoryTransactions::Table)
                    .col(InventoryTransactions::ReferenceId)
                    .col(InventoryTransactions::ReferenceItemId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StockValuationHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockValuationHistory::ValuationId)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(StockValuationHistory::ProductId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockValuationHistory::TransactionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockValuationHistory::ValuationDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockValuationHistory::OrderingClass)
                            .small_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockValuationHistory::TxnSeq)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockValuationHistory::Quantity)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockValuationHistory::UnitValue)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockValuationHistory::TotalValue)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockValuationHistory::ValuationMethod)
                            .string()
                            .not_null()
                            .default("moving_average"),
                    )
                    .col(
                        ColumnDef::new(StockValuationHistory::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockValuationHistory::SupersededAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-stock_valuation_history-transaction_id")
                            .from(
                                StockValuationHistory::Table,
                                StockValuationHistory::TransactionId,
                            )
                            .to(
                                InventoryTransactions::Table,
                                InventoryTransactions::TransactionId,
                            ),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-stock_valuation_history-product-date")
                    .table(StockValuationHistory::Table)
                    .col(StockValuationHistory::ProductId)
                    .col(StockValuationHistory::ValuationDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ValuationDirty::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ValuationDirty::ProductId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ValuationDirty::EarliestImpacted)
                            .date()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ValuationDirty::Reason).string().not_null())
                    .col(
                        ColumnDef::new(ValuationDirty::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Payments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SalePayments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SalePayments::PaymentId)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SalePayments::SaleId).string().not_null())
                    .col(ColumnDef::new(SalePayments::Date).date().not_null())
                    .col(
                        ColumnDef::new(SalePayments::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SalePayments::Method).string().not_null())
                    .col(ColumnDef::new(SalePayments::BankAccountId).string())
                    .col(ColumnDef::new(SalePayments::InstrumentType).string())
                    .col(ColumnDef::new(SalePayments::InstrumentNo).string())
                    .col(ColumnDef::new(SalePayments::InstrumentDate).date())
                    .col(ColumnDef::new(SalePayments::DepositedDate).date())
                    .col(ColumnDef::new(SalePayments::ClearedDate).date())
                    .col(
                        ColumnDef::new(SalePayments::ClearingState)
                            .string()
                            .not_null()
                            .check(Expr::col(SalePayments::ClearingState).is_in(CLEARING_STATES)),
                    )
                    .col(ColumnDef::new(SalePayments::RefNo).string())
                    .col(ColumnDef::new(SalePayments::Notes).string())
                    .col(ColumnDef::new(SalePayments::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(SalePayments::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalePayments::OverpaymentConverted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sale_payments-sale_id")
                            .from(SalePayments::Table, SalePayments::SaleId)
                            .to(Sales::Table, Sales::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sale_payments-bank_account_id")
                            .from(SalePayments::Table, SalePayments::BankAccountId)
                            .to(CompanyBankAccounts::Table, CompanyBankAccounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-sale_payments-sale_id")
                    .table(SalePayments::Table)
                    .col(SalePayments::SaleId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PurchasePayments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchasePayments::PaymentId)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PurchasePayments::PurchaseId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchasePayments::Date).date().not_null())
                    .col(
                        ColumnDef::new(PurchasePayments::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchasePayments::Method).string().not_null())
                    .col(ColumnDef::new(PurchasePayments::BankAccountId).string())
                    .col(ColumnDef::new(PurchasePayments::VendorBankAccountId).string())
                    .col(ColumnDef::new(PurchasePayments::InstrumentType).string())
                    .col(ColumnDef::new(PurchasePayments::InstrumentNo).string())
                    .col(ColumnDef::new(PurchasePayments::InstrumentDate).date())
                    .col(ColumnDef::new(PurchasePayments::DepositedDate).date())
                    .col(ColumnDef::new(PurchasePayments::ClearedDate).date())
                    .col(
                        ColumnDef::new(PurchasePayments::ClearingState)
                            .string()
                            .not_null()
                            .check(
                                Expr::col(PurchasePayments::ClearingState).is_in(CLEARING_STATES),
                            ),
                    )
                    .col(ColumnDef::new(PurchasePayments::RefNo).string())
                    .col(ColumnDef::new(PurchasePayments::Notes).string())
                    .col(
                        ColumnDef::new(PurchasePayments::CreatedBy)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchasePayments::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchasePayments::OverpaymentConverted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-purchase_payments-purchase_id")
                            .from(PurchasePayments::Table, PurchasePayments::PurchaseId)
                            .to(Purchases::Table, Purchases::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-purchase_payments-bank_account_id")
                            .from(PurchasePayments::Table, PurchasePayments::BankAccountId)
                            .to(CompanyBankAccounts::Table, CompanyBankAccounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-purchase_payments-vendor_bank_account_id")
                            .from(
                                PurchasePayments::Table,
                                PurchasePayments::VendorBankAccountId,
                            )
                            .to(VendorBankAccounts::Table, VendorBankAccounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-purchase_payments-purchase_id")
                    .table(PurchasePayments::Table)
                    .col(PurchasePayments::PurchaseId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Advances
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(CustomerAdvances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CustomerAdvances::TxId)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CustomerAdvances::CustomerId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CustomerAdvances::TxDate).date().not_null())
                    .col(
                        ColumnDef::new(CustomerAdvances::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CustomerAdvances::SourceType)
                            .string()
                            .not_null()
                            .check(Expr::col(CustomerAdvances::SourceType).is_in([
                                "deposit",
                                "return_credit",
                                "applied_to_sale",
                            ])),
                    )
                    .col(ColumnDef::new(CustomerAdvances::SourceId).string())
                    .col(ColumnDef::new(CustomerAdvances::Notes).string())
                    .col(
                        ColumnDef::new(CustomerAdvances::CreatedBy)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CustomerAdvances::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-customer_advances-customer_id")
                            .from(CustomerAdvances::Table, CustomerAdvances::CustomerId)
                            .to(Customers::Table, Customers::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-customer_advances-customer-date")
                    .table(CustomerAdvances::Table)
                    .col(CustomerAdvances::CustomerId)
                    .col(CustomerAdvances::TxDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(VendorAdvances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VendorAdvances::TxId)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VendorAdvances::VendorId).string().not_null())
                    .col(ColumnDef::new(VendorAdvances::TxDate).date().not_null())
                    .col(
                        ColumnDef::new(VendorAdvances::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VendorAdvances::SourceType)
                            .string()
                            .not_null()
                            .check(Expr::col(VendorAdvances::SourceType).is_in([
                                "deposit",
                                "return_credit",
                                "applied_to_purchase",
                            ])),
                    )
                    .col(ColumnDef::new(VendorAdvances::SourceId).string())
                    .col(ColumnDef::new(VendorAdvances::Notes).string())
                    .col(ColumnDef::new(VendorAdvances::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(VendorAdvances::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-vendor_advances-vendor_id")
                            .from(VendorAdvances::Table, VendorAdvances::VendorId)
                            .to(Vendors::Table, Vendors::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-vendor_advances-vendor-date")
                    .table(VendorAdvances::Table)
                    .col(VendorAdvances::VendorId)
                    .col(VendorAdvances::TxDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VendorAdvances::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CustomerAdvances::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchasePayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SalePayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ValuationDirty::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StockValuationHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventoryTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SaleItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sales::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Purchases::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(VendorBankAccounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CompanyBankAccounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Vendors::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Customers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductUoms::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;
        Ok(())
    }
}
