//! Inventory ledger postings and the stock read models built on top.
//!
//! A posting writes one `inventory_transactions` row and the valuation
//! snapshot that follows it. Rows are never deleted: editing a document
//! supersedes its old rows and posts a new generation.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    QueryOrder, Statement, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    AdjustmentCmd, CostState, DirtyReason, DocumentHeader, DocumentLine, DocumentSide, EPSILON,
    EngineError, InventoryTransaction, LedgerReference, Movement, OrderingKey, ResultEngine,
    TransactionType, UomMapping, ValuationSnapshot, inventory_transactions, next_sequence,
    util::{ensure_positive_quantity, normalize_optional_text},
    valuation_history,
};

use super::{Engine, StockLevel, with_tx};

/// A ledger row about to be written.
pub(super) struct NewPosting {
    pub product_id: Uuid,
    pub quantity: f64,
    pub uom: String,
    pub transaction_type: TransactionType,
    pub reference: Option<LedgerReference>,
    pub date: NaiveDate,
    pub generation: i32,
    pub notes: Option<String>,
    pub created_by: String,
}

impl NewPosting {
    /// Posting of `quantity` units of a document line.
    pub(super) fn for_line(
        transaction_type: TransactionType,
        side: DocumentSide,
        line: &DocumentLine,
        quantity: f64,
        date: NaiveDate,
        generation: i32,
        created_by: &str,
    ) -> Self {
        Self {
            product_id: line.product_id,
            quantity,
            uom: line.uom.clone(),
            transaction_type,
            reference: Some(LedgerReference {
                side,
                document_id: line.document_id,
                item_id: line.item_id,
            }),
            date,
            generation,
            notes: None,
            created_by: created_by.to_string(),
        }
    }
}

/// Net purchase price of a line per base unit, in currency units.
pub(super) fn purchase_unit_cost(line: &DocumentLine, mapping: &UomMapping) -> f64 {
    line.net_unit_price().as_f64() / 100.0 / mapping.factor_to_base
}

fn entries_from(models: Vec<inventory_transactions::Model>) -> ResultEngine<Vec<InventoryTransaction>> {
    models
        .into_iter()
        .map(InventoryTransaction::try_from)
        .collect()
}

fn snapshots_from(models: Vec<valuation_history::Model>) -> ResultEngine<Vec<ValuationSnapshot>> {
    models
        .into_iter()
        .map(ValuationSnapshot::try_from)
        .collect()
}

impl Engine {
    /// Posts a manual stock correction. Positive quantities come back in at
    /// the current average cost.
    pub async fn post_adjustment(&self, cmd: AdjustmentCmd) -> ResultEngine<InventoryTransaction> {
        with_tx!(self, |db_tx| {
            let posting = NewPosting {
                product_id: cmd.product_id,
                quantity: cmd.quantity,
                uom: cmd.uom.trim().to_string(),
                transaction_type: TransactionType::Adjustment,
                reference: None,
                date: cmd.date,
                generation: 1,
                notes: normalize_optional_text(cmd.notes.as_deref()),
                created_by: cmd.created_by.clone(),
            };
            let entry = self.post_entry(&db_tx, posting).await?;
            self.settle_valuation(&db_tx).await?;
            Ok(entry)
        })
    }

    /// Supersedes the current postings of a document and posts its lines
    /// again as a new generation.
    pub async fn rebuild_for_document(
        &self,
        side: DocumentSide,
        document_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Vec<InventoryTransaction>> {
        with_tx!(self, |db_tx| {
            let header = self.require_header(&db_tx, side, document_id).await?;
            header.ensure_not_quotation("be posted")?;
            let posted = self
                .repost_document(&db_tx, &header, DirtyReason::DocumentRebuild, user_id)
                .await?;
            self.settle_valuation(&db_tx).await?;
            Ok(posted)
        })
    }

    /// Quantity, average cost and value of a product from its latest
    /// snapshot.
    pub async fn stock_on_hand(&self, product_id: Uuid) -> ResultEngine<StockLevel> {
        with_tx!(self, |db_tx| {
            self.require_product(&db_tx, product_id).await?;
            let base_uom = self.require_base_uom(&db_tx, product_id).await?;
            let snapshot = self.current_snapshot(&db_tx, product_id).await?;
            let state = snapshot
                .as_ref()
                .map_or(CostState::EMPTY, ValuationSnapshot::state);
            Ok(StockLevel {
                product_id,
                quantity: state.quantity,
                unit_cost: state.unit_cost,
                total_value: state.total_value(),
                base_uom,
                as_of: snapshot.map(|s| s.key()),
            })
        })
    }

    /// Base quantity on hand at the end of `date`, summed from the ledger.
    pub async fn stock_as_of(&self, product_id: Uuid, date: NaiveDate) -> ResultEngine<f64> {
        with_tx!(self, |db_tx| {
            self.require_product(&db_tx, product_id).await?;
            let stmt = Statement::from_sql_and_values(
                db_tx.get_database_backend(),
                "SELECT COALESCE(SUM(base_quantity), 0.0) AS sum \
                 FROM inventory_transactions \
                 WHERE product_id = ? \
                   AND superseded_at IS NULL \
                   AND date <= ?",
                vec![product_id.to_string().into(), date.into()],
            );
            let row = db_tx.query_one(stmt).await?;
            Ok(row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0.0))
        })
    }

    /// Current (non-superseded) snapshots of a product in ledger order.
    pub async fn valuation_history(&self, product_id: Uuid) -> ResultEngine<Vec<ValuationSnapshot>> {
        with_tx!(self, |db_tx| {
            self.require_product(&db_tx, product_id).await?;
            let models = valuation_history::Entity::find()
                .filter(valuation_history::Column::ProductId.eq(product_id.to_string()))
                .filter(valuation_history::Column::SupersededAt.is_null())
                .order_by_asc(valuation_history::Column::ValuationDate)
                .order_by_asc(valuation_history::Column::OrderingClass)
                .order_by_asc(valuation_history::Column::TxnSeq)
                .order_by_asc(valuation_history::Column::TransactionId)
                .all(&db_tx)
                .await?;
            snapshots_from(models)
        })
    }

    /// Ledger rows of a product in valuation order.
    pub async fn ledger_entries(
        &self,
        product_id: Uuid,
        include_superseded: bool,
    ) -> ResultEngine<Vec<InventoryTransaction>> {
        with_tx!(self, |db_tx| {
            self.require_product(&db_tx, product_id).await?;
            if include_superseded {
                let models = inventory_transactions::Entity::find()
                    .filter(inventory_transactions::Column::ProductId.eq(product_id.to_string()))
                    .order_by_asc(inventory_transactions::Column::Date)
                    .order_by_asc(inventory_transactions::Column::OrderingClass)
                    .order_by_asc(inventory_transactions::Column::TxnSeq)
                    .order_by_asc(inventory_transactions::Column::TransactionId)
                    .all(&db_tx)
                    .await?;
                entries_from(models)
            } else {
                self.active_entries(&db_tx, product_id, None).await
            }
        })
    }

    /// Active postings of one document, returns included.
    pub async fn document_postings(
        &self,
        side: DocumentSide,
        document_id: Uuid,
    ) -> ResultEngine<Vec<InventoryTransaction>> {
        with_tx!(self, |db_tx| {
            self.require_header(&db_tx, side, document_id).await?;
            let models = inventory_transactions::Entity::find()
                .filter(inventory_transactions::Column::ReferenceTable.eq(side.as_str()))
                .filter(inventory_transactions::Column::ReferenceId.eq(document_id.to_string()))
                .filter(inventory_transactions::Column::SupersededAt.is_null())
                .order_by_asc(inventory_transactions::Column::Date)
                .order_by_asc(inventory_transactions::Column::OrderingClass)
                .order_by_asc(inventory_transactions::Column::TxnSeq)
                .order_by_asc(inventory_transactions::Column::TransactionId)
                .all(&db_tx)
                .await?;
            entries_from(models)
        })
    }

    /// Validates and writes one ledger row plus its snapshot.
    pub(super) async fn post_entry(
        &self,
        db: &DatabaseTransaction,
        posting: NewPosting,
    ) -> ResultEngine<InventoryTransaction> {
        let transaction_type = posting.transaction_type;
        if transaction_type == TransactionType::Adjustment {
            if !posting.quantity.is_finite() || posting.quantity.abs() <= EPSILON {
                return Err(EngineError::Validation(
                    "adjustment quantity must not be zero".to_string(),
                ));
            }
            if posting.reference.is_some() {
                return Err(EngineError::Validation(
                    "adjustments do not reference a document".to_string(),
                ));
            }
        } else {
            ensure_positive_quantity(posting.quantity, transaction_type.as_str())?;
        }

        let mapping = self
            .require_mapping(db, posting.product_id, &posting.uom)
            .await?;
        let purchase_cost = self.check_reference(db, &posting, &mapping).await?;

        let (max_regular, max_any) = self.date_sequences(db, posting.date).await?;
        let txn_seq = next_sequence(transaction_type, max_regular, max_any);
        let base_quantity = transaction_type.signed_base_quantity(mapping.to_base(posting.quantity));

        let mut entry = InventoryTransaction {
            transaction_id: 0,
            product_id: posting.product_id,
            quantity: posting.quantity,
            uom: mapping.uom.clone(),
            base_quantity,
            transaction_type,
            reference: posting.reference,
            date: posting.date,
            txn_seq,
            posted_at: Utc::now(),
            generation: posting.generation,
            superseded_at: None,
            notes: posting.notes,
            created_by: posting.created_by,
        };
        let model = inventory_transactions::ActiveModel::from(&entry)
            .insert(db)
            .await?;
        entry.transaction_id = model.transaction_id;
        let key = entry.key();

        if base_quantity < 0.0 && !self.config.allow_negative_stock {
            self.ensure_stock_covered(db, entry.product_id, key).await?;
        }

        let previous = self.state_before(db, entry.product_id, key).await?;
        let state = previous.apply(Movement::for_entry(&entry, purchase_cost)?);
        let snapshot = ValuationSnapshot::new(entry.product_id, key, state);
        valuation_history::ActiveModel::from(&snapshot)
            .insert(db)
            .await?;

        if self.has_snapshot_after(db, entry.product_id, key).await? {
            tracing::warn!(
                product_id = %entry.product_id,
                transaction_id = entry.transaction_id,
                date = %entry.date,
                "backdated posting, later snapshots are stale"
            );
            self.mark_dirty(db, entry.product_id, entry.date, DirtyReason::BackdatedPosting)
                .await?;
        }

        tracing::debug!(
            transaction_id = entry.transaction_id,
            kind = transaction_type.as_str(),
            product_id = %entry.product_id,
            base_quantity,
            seq = txn_seq,
            "inventory posted"
        );
        Ok(entry)
    }

    /// Checks the document line a typed posting points at. Returns the unit
    /// cost of purchase postings.
    async fn check_reference(
        &self,
        db: &DatabaseTransaction,
        posting: &NewPosting,
        mapping: &UomMapping,
    ) -> ResultEngine<Option<f64>> {
        let Some(side) = posting.transaction_type.document_side() else {
            return Ok(None);
        };
        let reference = posting.reference.ok_or_else(|| {
            EngineError::Validation(format!(
                "{} posting needs a document line",
                posting.transaction_type.as_str()
            ))
        })?;
        if reference.side != side {
            return Err(EngineError::ReferenceMismatch(format!(
                "{} posting cannot reference {}",
                posting.transaction_type.as_str(),
                reference.side.as_str()
            )));
        }
        let line = self
            .find_line(db, side, reference.item_id)
            .await?
            .ok_or_else(|| {
                EngineError::KeyNotFound(format!(
                    "{} line {} not exists",
                    side.as_str(),
                    reference.item_id
                ))
            })?;
        if line.document_id != reference.document_id {
            return Err(EngineError::ReferenceMismatch(format!(
                "line {} does not belong to document {}",
                line.item_id, reference.document_id
            )));
        }
        if line.product_id != posting.product_id || line.uom != mapping.uom {
            return Err(EngineError::ReferenceMismatch(format!(
                "line {} is {} {}, posting is {} {}",
                line.item_id, line.product_id, line.uom, posting.product_id, mapping.uom
            )));
        }
        let header = self.require_header(db, side, reference.document_id).await?;
        if header.is_quotation() {
            return Err(EngineError::ReferenceMismatch(format!(
                "quotation {} never moves stock",
                header.id
            )));
        }
        Ok((posting.transaction_type == TransactionType::Purchase)
            .then(|| purchase_unit_cost(&line, mapping)))
    }

    /// Highest sequence of regular postings, and of any posting, on `date`.
    async fn date_sequences(
        &self,
        db: &DatabaseTransaction,
        date: NaiveDate,
    ) -> ResultEngine<(Option<i32>, Option<i32>)> {
        let stmt = Statement::from_sql_and_values(
            db.get_database_backend(),
            "SELECT MAX(CASE WHEN ordering_class = 0 THEN txn_seq END) AS max_regular, \
                    MAX(txn_seq) AS max_any \
             FROM inventory_transactions \
             WHERE date = ?",
            vec![date.into()],
        );
        let row = db.query_one(stmt).await?;
        let Some(row) = row else {
            return Ok((None, None));
        };
        let max_regular: Option<i32> = row.try_get("", "max_regular").ok().flatten();
        let max_any: Option<i32> = row.try_get("", "max_any").ok().flatten();
        Ok((max_regular, max_any))
    }

    /// Rejects the pending writes when the running quantity of a product
    /// drops below zero at any active row from `from` on. Rows after the
    /// change count too, so a backdated outflow cannot spend stock that
    /// later rows already consumed.
    async fn ensure_stock_covered(
        &self,
        db: &DatabaseTransaction,
        product_id: Uuid,
        from: OrderingKey,
    ) -> ResultEngine<()> {
        let mut on_hand = self.on_hand_before(db, product_id, from).await?;
        let entries = self.active_entries(db, product_id, Some(from.date)).await?;
        for entry in entries.iter().filter(|e| e.key() >= from) {
            on_hand += entry.base_quantity;
            if on_hand < -EPSILON {
                return Err(EngineError::InsufficientStock(format!(
                    "product {product_id} would hold {on_hand} base units after {} {} on {}",
                    entry.transaction_type.as_str(),
                    entry.transaction_id,
                    entry.date
                )));
            }
        }
        Ok(())
    }

    /// Signed base quantity of the active rows ordered before `key`.
    async fn on_hand_before(
        &self,
        db: &DatabaseTransaction,
        product_id: Uuid,
        key: OrderingKey,
    ) -> ResultEngine<f64> {
        let stmt = Statement::from_sql_and_values(
            db.get_database_backend(),
            "SELECT COALESCE(SUM(base_quantity), 0.0) AS sum \
             FROM inventory_transactions \
             WHERE product_id = ? \
               AND superseded_at IS NULL \
               AND date < ?",
            vec![product_id.to_string().into(), key.date.into()],
        );
        let row = db.query_one(stmt).await?;
        let earlier: f64 = row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0.0);

        let same_day: f64 = self
            .active_entries_on(db, product_id, key.date)
            .await?
            .iter()
            .filter(|e| e.key() < key)
            .map(|e| e.base_quantity)
            .sum();
        Ok(earlier + same_day)
    }

    async fn active_entries_on(
        &self,
        db: &DatabaseTransaction,
        product_id: Uuid,
        date: NaiveDate,
    ) -> ResultEngine<Vec<InventoryTransaction>> {
        let models = inventory_transactions::Entity::find()
            .filter(inventory_transactions::Column::ProductId.eq(product_id.to_string()))
            .filter(inventory_transactions::Column::SupersededAt.is_null())
            .filter(inventory_transactions::Column::Date.eq(date))
            .all(db)
            .await?;
        entries_from(models)
    }

    /// Active rows of a product from `from` on (everything when `None`), in
    /// valuation order.
    pub(super) async fn active_entries(
        &self,
        db: &DatabaseTransaction,
        product_id: Uuid,
        from: Option<NaiveDate>,
    ) -> ResultEngine<Vec<InventoryTransaction>> {
        let mut query = inventory_transactions::Entity::find()
            .filter(inventory_transactions::Column::ProductId.eq(product_id.to_string()))
            .filter(inventory_transactions::Column::SupersededAt.is_null());
        if let Some(from) = from {
            query = query.filter(inventory_transactions::Column::Date.gte(from));
        }
        let models = query
            .order_by_asc(inventory_transactions::Column::Date)
            .order_by_asc(inventory_transactions::Column::OrderingClass)
            .order_by_asc(inventory_transactions::Column::TxnSeq)
            .order_by_asc(inventory_transactions::Column::TransactionId)
            .all(db)
            .await?;
        entries_from(models)
    }

    /// Latest active snapshot of a product.
    pub(super) async fn current_snapshot(
        &self,
        db: &DatabaseTransaction,
        product_id: Uuid,
    ) -> ResultEngine<Option<ValuationSnapshot>> {
        valuation_history::Entity::find()
            .filter(valuation_history::Column::ProductId.eq(product_id.to_string()))
            .filter(valuation_history::Column::SupersededAt.is_null())
            .order_by_desc(valuation_history::Column::ValuationDate)
            .order_by_desc(valuation_history::Column::OrderingClass)
            .order_by_desc(valuation_history::Column::TxnSeq)
            .order_by_desc(valuation_history::Column::TransactionId)
            .one(db)
            .await?
            .map(ValuationSnapshot::try_from)
            .transpose()
    }

    async fn snapshots_on(
        &self,
        db: &DatabaseTransaction,
        product_id: Uuid,
        date: NaiveDate,
    ) -> ResultEngine<Vec<ValuationSnapshot>> {
        let models = valuation_history::Entity::find()
            .filter(valuation_history::Column::ProductId.eq(product_id.to_string()))
            .filter(valuation_history::Column::SupersededAt.is_null())
            .filter(valuation_history::Column::ValuationDate.eq(date))
            .all(db)
            .await?;
        snapshots_from(models)
    }

    /// Cost state just before `key`: the latest active snapshot ordered
    /// before it.
    async fn state_before(
        &self,
        db: &DatabaseTransaction,
        product_id: Uuid,
        key: OrderingKey,
    ) -> ResultEngine<CostState> {
        let same_day = self.snapshots_on(db, product_id, key.date).await?;
        if let Some(snapshot) = same_day
            .iter()
            .filter(|s| s.key() < key)
            .max_by_key(|s| s.key())
        {
            return Ok(snapshot.state());
        }

        let earlier = valuation_history::Entity::find()
            .filter(valuation_history::Column::ProductId.eq(product_id.to_string()))
            .filter(valuation_history::Column::SupersededAt.is_null())
            .filter(valuation_history::Column::ValuationDate.lt(key.date))
            .order_by_desc(valuation_history::Column::ValuationDate)
            .order_by_desc(valuation_history::Column::OrderingClass)
            .order_by_desc(valuation_history::Column::TxnSeq)
            .order_by_desc(valuation_history::Column::TransactionId)
            .one(db)
            .await?
            .map(ValuationSnapshot::try_from)
            .transpose()?;
        Ok(earlier.map_or(CostState::EMPTY, |s| s.state()))
    }

    async fn has_snapshot_after(
        &self,
        db: &DatabaseTransaction,
        product_id: Uuid,
        key: OrderingKey,
    ) -> ResultEngine<bool> {
        let later_day = valuation_history::Entity::find()
            .filter(valuation_history::Column::ProductId.eq(product_id.to_string()))
            .filter(valuation_history::Column::SupersededAt.is_null())
            .filter(valuation_history::Column::ValuationDate.gt(key.date))
            .one(db)
            .await?
            .is_some();
        if later_day {
            return Ok(true);
        }
        let same_day = self.snapshots_on(db, product_id, key.date).await?;
        Ok(same_day.iter().any(|s| s.key() > key))
    }

    /// Quantity already returned per line of a document, in line units.
    pub(super) async fn returned_quantities(
        &self,
        db: &DatabaseTransaction,
        side: DocumentSide,
        document_id: Uuid,
    ) -> ResultEngine<HashMap<i64, f64>> {
        let models = inventory_transactions::Entity::find()
            .filter(
                inventory_transactions::Column::TransactionType
                    .eq(TransactionType::return_for(side).as_str()),
            )
            .filter(inventory_transactions::Column::ReferenceTable.eq(side.as_str()))
            .filter(inventory_transactions::Column::ReferenceId.eq(document_id.to_string()))
            .filter(inventory_transactions::Column::SupersededAt.is_null())
            .all(db)
            .await?;
        let mut returned: HashMap<i64, f64> = HashMap::new();
        for model in models {
            if let Some(item_id) = model.reference_item_id {
                *returned.entry(item_id).or_default() += model.quantity;
            }
        }
        Ok(returned)
    }

    /// Supersedes the active regular postings of a document, marks the
    /// products they touched dirty and posts the current lines as the next
    /// generation.
    pub(super) async fn repost_document(
        &self,
        db: &DatabaseTransaction,
        header: &DocumentHeader,
        reason: DirtyReason,
        user_id: &str,
    ) -> ResultEngine<Vec<InventoryTransaction>> {
        let side = header.side();
        let regular = TransactionType::regular_for(side);
        let models = inventory_transactions::Entity::find()
            .filter(inventory_transactions::Column::TransactionType.eq(regular.as_str()))
            .filter(inventory_transactions::Column::ReferenceTable.eq(side.as_str()))
            .filter(inventory_transactions::Column::ReferenceId.eq(header.id.to_string()))
            .all(db)
            .await?;
        let rows = entries_from(models)?;
        let generation = rows.iter().map(|r| r.generation).max().unwrap_or(0) + 1;
        let active: Vec<&InventoryTransaction> =
            rows.iter().filter(|r| r.superseded_at.is_none()).collect();

        if !active.is_empty() {
            let ids: Vec<i64> = active.iter().map(|r| r.transaction_id).collect();
            inventory_transactions::Entity::update_many()
                .col_expr(
                    inventory_transactions::Column::SupersededAt,
                    Expr::value(Utc::now()),
                )
                .filter(inventory_transactions::Column::TransactionId.is_in(ids))
                .exec(db)
                .await?;
            for row in &active {
                self.mark_dirty(db, row.product_id, row.date, reason).await?;
            }
            tracing::info!(
                document_id = %header.id,
                superseded = active.len(),
                generation,
                reason = reason.as_str(),
                "document postings superseded"
            );
        }

        let lines = self.load_lines(db, side, header.id).await?;
        let mut posted = Vec::with_capacity(lines.len());
        for line in &lines {
            let posting = NewPosting::for_line(
                regular,
                side,
                line,
                line.quantity,
                header.date,
                generation,
                user_id,
            );
            posted.push(self.post_entry(db, posting).await?);
        }

        if !self.config.allow_negative_stock {
            let mut earliest: HashMap<Uuid, NaiveDate> = HashMap::new();
            for (product_id, date) in active
                .iter()
                .map(|r| (r.product_id, r.date))
                .chain(posted.iter().map(|r| (r.product_id, r.date)))
            {
                earliest
                    .entry(product_id)
                    .and_modify(|d| *d = (*d).min(date))
                    .or_insert(date);
            }
            for (product_id, date) in earliest {
                self.ensure_stock_covered(db, product_id, OrderingKey::start_of(date))
                    .await?;
            }
        }
        Ok(posted)
    }
}
