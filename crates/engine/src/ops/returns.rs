use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use sea_orm::TransactionTrait;
use uuid::Uuid;

use crate::{
    AdvanceEntry, AdvanceSource, ClearingState, DocumentLine, DocumentSide, EPSILON, EngineError,
    MoneyCents, Payment, ResultEngine, ReturnCmd, ReturnOutcome, ReturnableLine, Settlement,
    TransactionType,
    payments::check_method_rules,
    returns::{proration_factor, return_value, split_refund},
    subtotal,
    util::{ensure_positive_quantity, normalize_optional_text},
};

use super::{Engine, ledger::NewPosting, with_tx};

impl Engine {
    /// Returns part of a sale or purchase.
    ///
    /// Each returned line posts a return row in the line's unit. The value
    /// of the return is settled according to `cmd.settlement`: a refund pays
    /// back up to what was paid (through `cmd.refund`, cash by default) and
    /// credits the rest. A credit note credits all of it. Without a
    /// settlement money stays untouched.
    pub async fn record_return(
        &self,
        side: DocumentSide,
        cmd: ReturnCmd,
    ) -> ResultEngine<ReturnOutcome> {
        if cmd.lines.is_empty() {
            return Err(EngineError::Validation(
                "a return needs at least one line".to_string(),
            ));
        }
        let mut requested: BTreeMap<i64, f64> = BTreeMap::new();
        for (item_id, quantity) in &cmd.lines {
            ensure_positive_quantity(*quantity, "returned")?;
            *requested.entry(*item_id).or_default() += quantity;
        }

        with_tx!(self, |db_tx| {
            let header = self.require_header(&db_tx, side, cmd.document_id).await?;
            header.ensure_not_quotation("take returns")?;
            let lines = self.load_lines(&db_tx, side, header.id).await?;
            let by_id: HashMap<i64, &DocumentLine> =
                lines.iter().map(|l| (l.item_id, l)).collect();
            let returned = self.returned_quantities(&db_tx, side, header.id).await?;

            let mut returning: Vec<(&DocumentLine, f64)> = Vec::with_capacity(requested.len());
            for (item_id, quantity) in &requested {
                let Some(line) = by_id.get(item_id).copied() else {
                    return Err(match self.find_line(&db_tx, side, *item_id).await? {
                        Some(_) => EngineError::ReferenceMismatch(format!(
                            "line {item_id} does not belong to document {}",
                            header.id
                        )),
                        None => EngineError::KeyNotFound(format!("line {item_id} not exists")),
                    });
                };
                let already = returned.get(item_id).copied().unwrap_or(0.0);
                let remaining = line.quantity - already;
                if *quantity > remaining + EPSILON {
                    return Err(EngineError::ReturnExceedsRemaining(format!(
                        "line {item_id}: returning {quantity} {}, only {} remaining",
                        line.uom,
                        remaining.max(0.0)
                    )));
                }
                returning.push((line, *quantity));
            }

            let return_type = TransactionType::return_for(side);
            let mut transaction_ids = Vec::with_capacity(returning.len());
            for (line, quantity) in &returning {
                let mut posting = NewPosting::for_line(
                    return_type,
                    side,
                    line,
                    *quantity,
                    cmd.date,
                    1,
                    &cmd.created_by,
                );
                posting.notes = normalize_optional_text(cmd.notes.as_deref());
                let entry = self.post_entry(&db_tx, posting).await?;
                transaction_ids.push(entry.transaction_id);
            }

            let factor = proration_factor(subtotal(&lines), header.total);
            let value = return_value(side, &returning, factor);

            let mut outcome = ReturnOutcome {
                transaction_ids,
                value,
                refunded: MoneyCents::ZERO,
                credited: MoneyCents::ZERO,
                payment_id: None,
                advance_tx_id: None,
            };
            let (cash, credit) = match cmd.settlement {
                _ if !value.is_positive() => (MoneyCents::ZERO, MoneyCents::ZERO),
                Some(Settlement::Refund) => split_refund(value, header.paid),
                Some(Settlement::CreditNote) => (MoneyCents::ZERO, value),
                None => (MoneyCents::ZERO, MoneyCents::ZERO),
            };

            if cash.is_positive() {
                let details = cmd.refund.clone().unwrap_or_default();
                let refund_cmd = details.payment(header.id, cmd.date, cash, &cmd.created_by);
                let instrument_type = check_method_rules(side, &refund_cmd)?;
                if let Some(account_id) = refund_cmd.bank_account_id {
                    self.require_company_account(&db_tx, account_id).await?;
                }
                if let Some(account_id) = refund_cmd.vendor_bank_account_id {
                    self.require_vendor_account(&db_tx, account_id, header.party_id)
                        .await?;
                }
                let clearing_state = refund_cmd
                    .clearing_state
                    .unwrap_or_else(|| refund_cmd.method.default_clearing_state());
                if clearing_state == ClearingState::Bounced {
                    return Err(EngineError::Validation(
                        "a refund cannot be recorded as bounced".to_string(),
                    ));
                }

                let refund = Payment {
                    payment_id: 0,
                    side,
                    document_id: header.id,
                    date: cmd.date,
                    amount: -cash,
                    method: refund_cmd.method,
                    bank_account_id: refund_cmd.bank_account_id,
                    vendor_bank_account_id: refund_cmd.vendor_bank_account_id,
                    instrument_type,
                    instrument_no: normalize_optional_text(refund_cmd.instrument_no.as_deref()),
                    instrument_date: refund_cmd.instrument_date,
                    deposited_date: refund_cmd.deposited_date,
                    cleared_date: (clearing_state == ClearingState::Cleared).then_some(cmd.date),
                    clearing_state,
                    ref_no: normalize_optional_text(refund_cmd.ref_no.as_deref()),
                    notes: refund_cmd.notes,
                    created_by: refund_cmd.created_by,
                    created_at: Utc::now(),
                    overpayment_converted: false,
                };
                outcome.payment_id = Some(self.insert_payment(&db_tx, &refund).await?);
                outcome.refunded = cash;
            }
            if credit.is_positive() {
                let entry = AdvanceEntry {
                    tx_id: 0,
                    party_kind: side.party_kind(),
                    party_id: header.party_id,
                    tx_date: cmd.date,
                    amount: credit,
                    source_type: AdvanceSource::ReturnCredit,
                    source_id: Some(header.id),
                    notes: normalize_optional_text(cmd.notes.as_deref()),
                    created_by: cmd.created_by.clone(),
                    created_at: Utc::now(),
                };
                outcome.advance_tx_id = Some(self.insert_advance(&db_tx, &entry).await?);
                outcome.credited = credit;
            }

            self.roll_up(&db_tx, side, header.id).await?;
            self.settle_valuation(&db_tx).await?;
            tracing::info!(
                document_id = %header.id,
                lines = outcome.transaction_ids.len(),
                value = %outcome.value,
                refunded = %outcome.refunded,
                credited = %outcome.credited,
                "return recorded"
            );
            Ok(outcome)
        })
    }

    /// What is still returnable on each line of a document.
    pub async fn returnable_quantities(
        &self,
        side: DocumentSide,
        document_id: Uuid,
    ) -> ResultEngine<Vec<ReturnableLine>> {
        with_tx!(self, |db_tx| {
            let header = self.require_header(&db_tx, side, document_id).await?;
            if header.is_quotation() {
                return Ok(Vec::new());
            }
            let lines = self.load_lines(&db_tx, side, document_id).await?;
            let returned = self.returned_quantities(&db_tx, side, document_id).await?;
            Ok(lines
                .into_iter()
                .map(|line| {
                    let returned = returned.get(&line.item_id).copied().unwrap_or(0.0);
                    ReturnableLine {
                        item_id: line.item_id,
                        product_id: line.product_id,
                        uom: line.uom,
                        posted: line.quantity,
                        returned,
                        remaining: (line.quantity - returned).max(0.0),
                    }
                })
                .collect())
        })
    }
}
