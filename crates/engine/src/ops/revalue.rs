//! Dirty-range tracking and snapshot rebuilds.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    CostState, DirtyMarker, DirtyReason, DocumentLine, InventoryTransaction, Movement,
    ResultEngine, TransactionType, ValuationSnapshot, fold, purchase_items, valuation_dirty,
    valuation_history,
};

use super::{Engine, RevaluationReport, ledger::purchase_unit_cost, with_tx};

impl Engine {
    /// Rebuilds the snapshots of one product from its dirty date, or from the
    /// start of its ledger when it is not marked dirty.
    pub async fn revalue_product(&self, product_id: Uuid) -> ResultEngine<RevaluationReport> {
        with_tx!(self, |db_tx| {
            self.require_product(&db_tx, product_id).await?;
            self.revalue(&db_tx, product_id).await
        })
    }

    /// Rebuilds every product currently marked dirty.
    pub async fn revalue_dirty(&self) -> ResultEngine<Vec<RevaluationReport>> {
        with_tx!(self, |db_tx| self.revalue_all_dirty(&db_tx).await)
    }

    pub async fn dirty_products(&self) -> ResultEngine<Vec<DirtyMarker>> {
        with_tx!(self, |db_tx| {
            valuation_dirty::Entity::find()
                .order_by_asc(valuation_dirty::Column::EarliestImpacted)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(DirtyMarker::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Folds the whole active ledger of a product from an empty state
    /// without touching stored snapshots.
    pub async fn replay_valuation(&self, product_id: Uuid) -> ResultEngine<CostState> {
        with_tx!(self, |db_tx| {
            self.require_product(&db_tx, product_id).await?;
            let entries = self.active_entries(&db_tx, product_id, None).await?;
            let costs = self.purchase_costs(&db_tx, product_id, &entries).await?;
            let movements = entries
                .iter()
                .map(|entry| Movement::for_entry(entry, entry_cost(entry, &costs)))
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok(fold(CostState::EMPTY, movements))
        })
    }

    /// Records that the snapshots of a product are stale from `date` on.
    /// An existing marker only ever moves to an earlier date.
    pub(super) async fn mark_dirty(
        &self,
        db: &DatabaseTransaction,
        product_id: Uuid,
        date: NaiveDate,
        reason: DirtyReason,
    ) -> ResultEngine<()> {
        let id = product_id.to_string();
        let existing = valuation_dirty::Entity::find_by_id(id.clone())
            .one(db)
            .await?;
        let model = valuation_dirty::ActiveModel {
            product_id: ActiveValue::Set(id),
            earliest_impacted: ActiveValue::Set(date),
            reason: ActiveValue::Set(reason.as_str().to_string()),
            updated_at: ActiveValue::Set(Utc::now()),
        };
        match existing {
            Some(marker) if marker.earliest_impacted <= date => {}
            Some(_) => {
                model.update(db).await?;
            }
            None => {
                model.insert(db).await?;
            }
        }
        Ok(())
    }

    /// Runs the revaluation pass for every dirty product when the engine
    /// is configured to do so. Called at the end of each posting operation.
    pub(super) async fn settle_valuation(&self, db: &DatabaseTransaction) -> ResultEngine<()> {
        if self.config.auto_revalue {
            self.revalue_all_dirty(db).await?;
        }
        Ok(())
    }

    async fn revalue_all_dirty(
        &self,
        db: &DatabaseTransaction,
    ) -> ResultEngine<Vec<RevaluationReport>> {
        let markers = valuation_dirty::Entity::find()
            .order_by_asc(valuation_dirty::Column::ProductId)
            .all(db)
            .await?
            .into_iter()
            .map(DirtyMarker::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        let mut reports = Vec::with_capacity(markers.len());
        for marker in markers {
            reports.push(self.revalue(db, marker.product_id).await?);
        }
        Ok(reports)
    }

    async fn revalue(
        &self,
        db: &DatabaseTransaction,
        product_id: Uuid,
    ) -> ResultEngine<RevaluationReport> {
        let id = product_id.to_string();
        let from = valuation_dirty::Entity::find_by_id(id.clone())
            .one(db)
            .await?
            .map(|marker| marker.earliest_impacted);

        let mut stale = valuation_history::Entity::update_many()
            .col_expr(
                valuation_history::Column::SupersededAt,
                Expr::value(Utc::now()),
            )
            .filter(valuation_history::Column::ProductId.eq(id.clone()))
            .filter(valuation_history::Column::SupersededAt.is_null());
        if let Some(from) = from {
            stale = stale.filter(valuation_history::Column::ValuationDate.gte(from));
        }
        stale.exec(db).await?;

        let seed = self
            .current_snapshot(db, product_id)
            .await?
            .map_or(CostState::EMPTY, |s| s.state());
        let entries = self.active_entries(db, product_id, from).await?;
        let costs = self.purchase_costs(db, product_id, &entries).await?;

        let mut state = seed;
        for entry in &entries {
            state = state.apply(Movement::for_entry(entry, entry_cost(entry, &costs))?);
            let snapshot = ValuationSnapshot::new(product_id, entry.key(), state);
            valuation_history::ActiveModel::from(&snapshot)
                .insert(db)
                .await?;
        }

        valuation_dirty::Entity::delete_by_id(id).exec(db).await?;
        tracing::info!(
            product_id = %product_id,
            from = ?from,
            entries = entries.len(),
            quantity = state.quantity,
            unit_cost = state.unit_cost,
            "product revalued"
        );
        Ok(RevaluationReport {
            product_id,
            from,
            entries_replayed: entries.len(),
            state,
        })
    }

    /// Unit cost per base unit of every purchase line referenced by
    /// `entries`, keyed by item id.
    async fn purchase_costs(
        &self,
        db: &DatabaseTransaction,
        product_id: Uuid,
        entries: &[InventoryTransaction],
    ) -> ResultEngine<HashMap<i64, f64>> {
        let item_ids: Vec<i64> = entries
            .iter()
            .filter(|e| e.transaction_type == TransactionType::Purchase)
            .filter_map(|e| e.reference.map(|r| r.item_id))
            .collect();
        if item_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mappings = self.product_mappings(db, product_id).await?;
        let lines = purchase_items::Entity::find()
            .filter(purchase_items::Column::ItemId.is_in(item_ids))
            .all(db)
            .await?
            .into_iter()
            .map(DocumentLine::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        let mut costs = HashMap::with_capacity(lines.len());
        for line in lines {
            if let Some(mapping) = mappings.iter().find(|m| m.uom == line.uom) {
                costs.insert(line.item_id, purchase_unit_cost(&line, mapping));
            }
        }
        Ok(costs)
    }
}

fn entry_cost(entry: &InventoryTransaction, costs: &HashMap<i64, f64>) -> Option<f64> {
    if entry.transaction_type != TransactionType::Purchase {
        return None;
    }
    entry
        .reference
        .and_then(|r| costs.get(&r.item_id).copied())
}
