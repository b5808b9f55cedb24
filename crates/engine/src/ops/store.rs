//! Side-dispatching persistence helpers.
//!
//! Sales and purchases live in parallel tables with the same shape; these
//! helpers pick the right entity so the operations above can stay generic
//! over [`DocumentSide`].

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    QueryOrder, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    AdvanceEntry, AdvanceSource, ClearingState, DocumentHeader, DocumentLine, DocumentSide,
    EngineError, MoneyCents, Party, PartyKind, Payment, ResultEngine, RollUp,
    advances::{customer_advances, vendor_advances},
    parties::{customers, vendors},
    payments::{purchase_payments, sale_payments},
    purchase_items, purchases, sale_items, sales,
};

use super::Engine;

impl Engine {
    pub(super) async fn find_party(
        &self,
        db: &DatabaseTransaction,
        kind: PartyKind,
        party_id: Uuid,
    ) -> ResultEngine<Option<Party>> {
        let id = party_id.to_string();
        match kind {
            PartyKind::Customer => customers::Entity::find_by_id(id)
                .one(db)
                .await?
                .map(Party::try_from)
                .transpose(),
            PartyKind::Vendor => vendors::Entity::find_by_id(id)
                .one(db)
                .await?
                .map(Party::try_from)
                .transpose(),
        }
    }

    pub(super) async fn require_party(
        &self,
        db: &DatabaseTransaction,
        kind: PartyKind,
        party_id: Uuid,
    ) -> ResultEngine<Party> {
        self.find_party(db, kind, party_id).await?.ok_or_else(|| {
            EngineError::KeyNotFound(format!("{} {party_id} not exists", kind.as_str()))
        })
    }

    pub(super) async fn find_header(
        &self,
        db: &DatabaseTransaction,
        side: DocumentSide,
        document_id: Uuid,
    ) -> ResultEngine<Option<DocumentHeader>> {
        let id = document_id.to_string();
        match side {
            DocumentSide::Sale => sales::Entity::find_by_id(id)
                .one(db)
                .await?
                .map(DocumentHeader::try_from)
                .transpose(),
            DocumentSide::Purchase => purchases::Entity::find_by_id(id)
                .one(db)
                .await?
                .map(DocumentHeader::try_from)
                .transpose(),
        }
    }

    pub(super) async fn require_header(
        &self,
        db: &DatabaseTransaction,
        side: DocumentSide,
        document_id: Uuid,
    ) -> ResultEngine<DocumentHeader> {
        self.find_header(db, side, document_id)
            .await?
            .ok_or_else(|| match side {
                DocumentSide::Sale => {
                    EngineError::KeyNotFound(format!("sale {document_id} not exists"))
                }
                DocumentSide::Purchase => {
                    EngineError::KeyNotFound(format!("purchase {document_id} not exists"))
                }
            })
    }

    pub(super) async fn insert_header(
        &self,
        db: &DatabaseTransaction,
        header: &DocumentHeader,
    ) -> ResultEngine<()> {
        match header.side() {
            DocumentSide::Sale => {
                sales::ActiveModel::from(header).insert(db).await?;
            }
            DocumentSide::Purchase => {
                purchases::ActiveModel::from(header).insert(db).await?;
            }
        }
        Ok(())
    }

    pub(super) async fn save_header(
        &self,
        db: &DatabaseTransaction,
        header: &DocumentHeader,
    ) -> ResultEngine<()> {
        match header.side() {
            DocumentSide::Sale => {
                sales::ActiveModel::from(header).update(db).await?;
            }
            DocumentSide::Purchase => {
                purchases::ActiveModel::from(header).update(db).await?;
            }
        }
        Ok(())
    }

    /// Writes the derived settlement fields of a header.
    pub(super) async fn save_roll_up(
        &self,
        db: &DatabaseTransaction,
        side: DocumentSide,
        document_id: Uuid,
        totals: RollUp,
    ) -> ResultEngine<()> {
        let id = document_id.to_string();
        match side {
            DocumentSide::Sale => {
                sales::ActiveModel {
                    id: ActiveValue::Set(id),
                    paid_amount_minor: ActiveValue::Set(totals.paid.cents()),
                    credit_applied_minor: ActiveValue::Set(totals.credit_applied.cents()),
                    payment_status: ActiveValue::Set(totals.status.as_str().to_string()),
                    ..Default::default()
                }
                .update(db)
                .await?;
            }
            DocumentSide::Purchase => {
                purchases::ActiveModel {
                    id: ActiveValue::Set(id),
                    paid_amount_minor: ActiveValue::Set(totals.paid.cents()),
                    credit_applied_minor: ActiveValue::Set(totals.credit_applied.cents()),
                    payment_status: ActiveValue::Set(totals.status.as_str().to_string()),
                    ..Default::default()
                }
                .update(db)
                .await?;
            }
        }
        Ok(())
    }

    /// Sales that were converted from `quotation_id`.
    pub(super) async fn sales_from_quotation(
        &self,
        db: &DatabaseTransaction,
        quotation_id: Uuid,
    ) -> ResultEngine<Vec<Uuid>> {
        sales::Entity::find()
            .filter(sales::Column::SourceType.eq(sales::SOURCE_QUOTATION))
            .filter(sales::Column::SourceId.eq(quotation_id.to_string()))
            .all(db)
            .await?
            .into_iter()
            .map(|model| crate::util::parse_uuid(&model.id, "sale"))
            .collect()
    }

    /// Document ids of one party on one side, quotations included.
    pub(super) async fn party_document_ids(
        &self,
        db: &DatabaseTransaction,
        side: DocumentSide,
        party_id: Uuid,
    ) -> ResultEngine<Vec<String>> {
        let party = party_id.to_string();
        let ids = match side {
            DocumentSide::Sale => sales::Entity::find()
                .filter(sales::Column::CustomerId.eq(party))
                .all(db)
                .await?
                .into_iter()
                .map(|model| model.id)
                .collect(),
            DocumentSide::Purchase => purchases::Entity::find()
                .filter(purchases::Column::VendorId.eq(party))
                .all(db)
                .await?
                .into_iter()
                .map(|model| model.id)
                .collect(),
        };
        Ok(ids)
    }

    /// Current lines of a document.
    pub(super) async fn load_lines(
        &self,
        db: &DatabaseTransaction,
        side: DocumentSide,
        document_id: Uuid,
    ) -> ResultEngine<Vec<DocumentLine>> {
        self.lines_where(db, side, document_id, false).await
    }

    /// Lines dropped from a document by earlier edits.
    pub(super) async fn load_removed_lines(
        &self,
        db: &DatabaseTransaction,
        side: DocumentSide,
        document_id: Uuid,
    ) -> ResultEngine<Vec<DocumentLine>> {
        self.lines_where(db, side, document_id, true).await
    }

    async fn lines_where(
        &self,
        db: &DatabaseTransaction,
        side: DocumentSide,
        document_id: Uuid,
        removed: bool,
    ) -> ResultEngine<Vec<DocumentLine>> {
        let id = document_id.to_string();
        match side {
            DocumentSide::Sale => {
                let removed_at = if removed {
                    sale_items::Column::RemovedAt.is_not_null()
                } else {
                    sale_items::Column::RemovedAt.is_null()
                };
                sale_items::Entity::find()
                    .filter(sale_items::Column::SaleId.eq(id))
                    .filter(removed_at)
                    .order_by_asc(sale_items::Column::ItemId)
                    .all(db)
                    .await?
                    .into_iter()
                    .map(DocumentLine::try_from)
                    .collect()
            }
            DocumentSide::Purchase => {
                let removed_at = if removed {
                    purchase_items::Column::RemovedAt.is_not_null()
                } else {
                    purchase_items::Column::RemovedAt.is_null()
                };
                purchase_items::Entity::find()
                    .filter(purchase_items::Column::PurchaseId.eq(id))
                    .filter(removed_at)
                    .order_by_asc(purchase_items::Column::ItemId)
                    .all(db)
                    .await?
                    .into_iter()
                    .map(DocumentLine::try_from)
                    .collect()
            }
        }
    }

    /// A current (not removed) line by id.
    pub(super) async fn find_line(
        &self,
        db: &DatabaseTransaction,
        side: DocumentSide,
        item_id: i64,
    ) -> ResultEngine<Option<DocumentLine>> {
        match side {
            DocumentSide::Sale => sale_items::Entity::find_by_id(item_id)
                .filter(sale_items::Column::RemovedAt.is_null())
                .one(db)
                .await?
                .map(DocumentLine::try_from)
                .transpose(),
            DocumentSide::Purchase => purchase_items::Entity::find_by_id(item_id)
                .filter(purchase_items::Column::RemovedAt.is_null())
                .one(db)
                .await?
                .map(DocumentLine::try_from)
                .transpose(),
        }
    }

    pub(super) async fn insert_line(
        &self,
        db: &DatabaseTransaction,
        side: DocumentSide,
        line: &DocumentLine,
    ) -> ResultEngine<i64> {
        let item_id = match side {
            DocumentSide::Sale => sale_items::ActiveModel::from(line).insert(db).await?.item_id,
            DocumentSide::Purchase => {
                purchase_items::ActiveModel::from(line)
                    .insert(db)
                    .await?
                    .item_id
            }
        };
        Ok(item_id)
    }

    pub(super) async fn update_line(
        &self,
        db: &DatabaseTransaction,
        side: DocumentSide,
        line: &DocumentLine,
    ) -> ResultEngine<()> {
        match side {
            DocumentSide::Sale => {
                let mut model = sale_items::ActiveModel::from(line);
                model.item_id = ActiveValue::Set(line.item_id);
                model.update(db).await?;
            }
            DocumentSide::Purchase => {
                let mut model = purchase_items::ActiveModel::from(line);
                model.item_id = ActiveValue::Set(line.item_id);
                model.update(db).await?;
            }
        }
        Ok(())
    }

    /// Marks a line removed. The row stays so superseded postings keep
    /// their reference.
    pub(super) async fn remove_line(
        &self,
        db: &DatabaseTransaction,
        side: DocumentSide,
        item_id: i64,
    ) -> ResultEngine<()> {
        let now = Utc::now();
        match side {
            DocumentSide::Sale => {
                sale_items::Entity::update_many()
                    .col_expr(sale_items::Column::RemovedAt, Expr::value(now))
                    .filter(sale_items::Column::ItemId.eq(item_id))
                    .exec(db)
                    .await?;
            }
            DocumentSide::Purchase => {
                purchase_items::Entity::update_many()
                    .col_expr(purchase_items::Column::RemovedAt, Expr::value(now))
                    .filter(purchase_items::Column::ItemId.eq(item_id))
                    .exec(db)
                    .await?;
            }
        }
        Ok(())
    }

    /// Payments of a document in `(date, payment_id)` order.
    pub(super) async fn document_payments(
        &self,
        db: &DatabaseTransaction,
        side: DocumentSide,
        document_id: Uuid,
    ) -> ResultEngine<Vec<Payment>> {
        let id = document_id.to_string();
        match side {
            DocumentSide::Sale => sale_payments::Entity::find()
                .filter(sale_payments::Column::SaleId.eq(id))
                .order_by_asc(sale_payments::Column::Date)
                .order_by_asc(sale_payments::Column::PaymentId)
                .all(db)
                .await?
                .into_iter()
                .map(Payment::try_from)
                .collect(),
            DocumentSide::Purchase => purchase_payments::Entity::find()
                .filter(purchase_payments::Column::PurchaseId.eq(id))
                .order_by_asc(purchase_payments::Column::Date)
                .order_by_asc(purchase_payments::Column::PaymentId)
                .all(db)
                .await?
                .into_iter()
                .map(Payment::try_from)
                .collect(),
        }
    }

    /// Payments of the given documents still waiting to clear.
    pub(super) async fn uncleared_payments(
        &self,
        db: &DatabaseTransaction,
        side: DocumentSide,
        document_ids: Vec<String>,
    ) -> ResultEngine<Vec<Payment>> {
        let waiting = [ClearingState::Posted.as_str(), ClearingState::Pending.as_str()];
        match side {
            DocumentSide::Sale => sale_payments::Entity::find()
                .filter(sale_payments::Column::SaleId.is_in(document_ids))
                .filter(sale_payments::Column::ClearingState.is_in(waiting))
                .order_by_asc(sale_payments::Column::Date)
                .order_by_asc(sale_payments::Column::PaymentId)
                .all(db)
                .await?
                .into_iter()
                .map(Payment::try_from)
                .collect(),
            DocumentSide::Purchase => purchase_payments::Entity::find()
                .filter(purchase_payments::Column::PurchaseId.is_in(document_ids))
                .filter(purchase_payments::Column::ClearingState.is_in(waiting))
                .order_by_asc(purchase_payments::Column::Date)
                .order_by_asc(purchase_payments::Column::PaymentId)
                .all(db)
                .await?
                .into_iter()
                .map(Payment::try_from)
                .collect(),
        }
    }

    pub(super) async fn find_payment(
        &self,
        db: &DatabaseTransaction,
        side: DocumentSide,
        payment_id: i64,
    ) -> ResultEngine<Option<Payment>> {
        match side {
            DocumentSide::Sale => sale_payments::Entity::find_by_id(payment_id)
                .one(db)
                .await?
                .map(Payment::try_from)
                .transpose(),
            DocumentSide::Purchase => purchase_payments::Entity::find_by_id(payment_id)
                .one(db)
                .await?
                .map(Payment::try_from)
                .transpose(),
        }
    }

    pub(super) async fn insert_payment(
        &self,
        db: &DatabaseTransaction,
        payment: &Payment,
    ) -> ResultEngine<i64> {
        let payment_id = match payment.side {
            DocumentSide::Sale => {
                sale_payments::ActiveModel::from(payment)
                    .insert(db)
                    .await?
                    .payment_id
            }
            DocumentSide::Purchase => {
                purchase_payments::ActiveModel::from(payment)
                    .insert(db)
                    .await?
                    .payment_id
            }
        };
        Ok(payment_id)
    }

    /// Clamps a payment to `amount` and flags its excess as converted.
    pub(super) async fn mark_payment_converted(
        &self,
        db: &DatabaseTransaction,
        side: DocumentSide,
        payment_id: i64,
        amount: MoneyCents,
    ) -> ResultEngine<()> {
        match side {
            DocumentSide::Sale => {
                sale_payments::ActiveModel {
                    payment_id: ActiveValue::Set(payment_id),
                    amount_minor: ActiveValue::Set(amount.cents()),
                    overpayment_converted: ActiveValue::Set(true),
                    ..Default::default()
                }
                .update(db)
                .await?;
            }
            DocumentSide::Purchase => {
                purchase_payments::ActiveModel {
                    payment_id: ActiveValue::Set(payment_id),
                    amount_minor: ActiveValue::Set(amount.cents()),
                    overpayment_converted: ActiveValue::Set(true),
                    ..Default::default()
                }
                .update(db)
                .await?;
            }
        }
        Ok(())
    }

    /// Compare-and-swap on the clearing state. Returns the number of rows
    /// changed: 0 when the payment was no longer in `expected`.
    pub(super) async fn swap_clearing_state(
        &self,
        db: &DatabaseTransaction,
        side: DocumentSide,
        payment_id: i64,
        expected: ClearingState,
        next: ClearingState,
        cleared_date: Option<NaiveDate>,
    ) -> ResultEngine<u64> {
        let rows = match side {
            DocumentSide::Sale => {
                let mut update = sale_payments::Entity::update_many()
                    .col_expr(sale_payments::Column::ClearingState, Expr::value(next.as_str()));
                if let Some(date) = cleared_date {
                    update = update.col_expr(sale_payments::Column::ClearedDate, Expr::value(date));
                }
                update
                    .filter(sale_payments::Column::PaymentId.eq(payment_id))
                    .filter(sale_payments::Column::ClearingState.eq(expected.as_str()))
                    .exec(db)
                    .await?
                    .rows_affected
            }
            DocumentSide::Purchase => {
                let mut update = purchase_payments::Entity::update_many().col_expr(
                    purchase_payments::Column::ClearingState,
                    Expr::value(next.as_str()),
                );
                if let Some(date) = cleared_date {
                    update =
                        update.col_expr(purchase_payments::Column::ClearedDate, Expr::value(date));
                }
                update
                    .filter(purchase_payments::Column::PaymentId.eq(payment_id))
                    .filter(purchase_payments::Column::ClearingState.eq(expected.as_str()))
                    .exec(db)
                    .await?
                    .rows_affected
            }
        };
        Ok(rows)
    }

    /// A party's advance ledger in `(tx_date, tx_id)` order.
    pub(super) async fn party_advances(
        &self,
        db: &DatabaseTransaction,
        kind: PartyKind,
        party_id: Uuid,
    ) -> ResultEngine<Vec<AdvanceEntry>> {
        let id = party_id.to_string();
        match kind {
            PartyKind::Customer => customer_advances::Entity::find()
                .filter(customer_advances::Column::CustomerId.eq(id))
                .order_by_asc(customer_advances::Column::TxDate)
                .order_by_asc(customer_advances::Column::TxId)
                .all(db)
                .await?
                .into_iter()
                .map(AdvanceEntry::try_from)
                .collect(),
            PartyKind::Vendor => vendor_advances::Entity::find()
                .filter(vendor_advances::Column::VendorId.eq(id))
                .order_by_asc(vendor_advances::Column::TxDate)
                .order_by_asc(vendor_advances::Column::TxId)
                .all(db)
                .await?
                .into_iter()
                .map(AdvanceEntry::try_from)
                .collect(),
        }
    }

    /// Credit applications consumed by one document.
    pub(super) async fn document_applications(
        &self,
        db: &DatabaseTransaction,
        side: DocumentSide,
        document_id: Uuid,
    ) -> ResultEngine<Vec<AdvanceEntry>> {
        let source = AdvanceSource::applied_to(side).as_str();
        let id = document_id.to_string();
        match side.party_kind() {
            PartyKind::Customer => customer_advances::Entity::find()
                .filter(customer_advances::Column::SourceType.eq(source))
                .filter(customer_advances::Column::SourceId.eq(id))
                .order_by_asc(customer_advances::Column::TxDate)
                .order_by_asc(customer_advances::Column::TxId)
                .all(db)
                .await?
                .into_iter()
                .map(AdvanceEntry::try_from)
                .collect(),
            PartyKind::Vendor => vendor_advances::Entity::find()
                .filter(vendor_advances::Column::SourceType.eq(source))
                .filter(vendor_advances::Column::SourceId.eq(id))
                .order_by_asc(vendor_advances::Column::TxDate)
                .order_by_asc(vendor_advances::Column::TxId)
                .all(db)
                .await?
                .into_iter()
                .map(AdvanceEntry::try_from)
                .collect(),
        }
    }

    pub(super) async fn insert_advance(
        &self,
        db: &DatabaseTransaction,
        entry: &AdvanceEntry,
    ) -> ResultEngine<i64> {
        let tx_id = match entry.party_kind {
            PartyKind::Customer => {
                customer_advances::ActiveModel::from(entry)
                    .insert(db)
                    .await?
                    .tx_id
            }
            PartyKind::Vendor => {
                vendor_advances::ActiveModel::from(entry)
                    .insert(db)
                    .await?
                    .tx_id
            }
        };
        Ok(tx_id)
    }
}
