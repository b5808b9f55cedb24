use chrono::{NaiveDate, Utc};
use sea_orm::{DatabaseTransaction, TransactionTrait};
use uuid::Uuid;

use crate::{
    AdvanceEntry, AdvanceSource, ClearingOutcome, ClearingState, DocumentHeader, DocumentSide,
    EngineError, MoneyCents, Payment, PaymentCmd, PaymentReceipt, ResultEngine,
    payments::check_method_rules,
    util::normalize_optional_text,
};

use super::{Engine, with_tx};

impl Engine {
    /// Records a payment against a sale or purchase.
    ///
    /// A cleared payment larger than what is still due is clamped to the
    /// due amount; the excess becomes a deposit in the counterparty's
    /// advance ledger.
    pub async fn record_payment(
        &self,
        side: DocumentSide,
        cmd: PaymentCmd,
    ) -> ResultEngine<PaymentReceipt> {
        with_tx!(self, |db_tx| {
            let header = self.require_header(&db_tx, side, cmd.document_id).await?;
            header.ensure_not_quotation("take payments")?;
            let instrument_type = check_method_rules(side, &cmd)?;
            if let Some(account_id) = cmd.bank_account_id {
                self.require_company_account(&db_tx, account_id).await?;
            }
            if let Some(account_id) = cmd.vendor_bank_account_id {
                self.require_vendor_account(&db_tx, account_id, header.party_id)
                    .await?;
            }

            let clearing_state = cmd
                .clearing_state
                .unwrap_or_else(|| cmd.method.default_clearing_state());
            if clearing_state == ClearingState::Bounced {
                return Err(EngineError::Validation(
                    "a payment cannot be recorded as bounced".to_string(),
                ));
            }

            let (recorded, excess) =
                if clearing_state == ClearingState::Cleared && cmd.amount.is_positive() {
                    split_overpayment(cmd.amount, header.remaining_due())
                } else {
                    (cmd.amount, MoneyCents::ZERO)
                };

            let mut payment = Payment {
                payment_id: 0,
                side,
                document_id: header.id,
                date: cmd.date,
                amount: recorded,
                method: cmd.method,
                bank_account_id: cmd.bank_account_id,
                vendor_bank_account_id: cmd.vendor_bank_account_id,
                instrument_type,
                instrument_no: normalize_optional_text(cmd.instrument_no.as_deref()),
                instrument_date: cmd.instrument_date,
                deposited_date: cmd.deposited_date,
                cleared_date: (clearing_state == ClearingState::Cleared).then_some(cmd.date),
                clearing_state,
                ref_no: normalize_optional_text(cmd.ref_no.as_deref()),
                notes: normalize_optional_text(cmd.notes.as_deref()),
                created_by: cmd.created_by.clone(),
                created_at: Utc::now(),
                overpayment_converted: excess.is_positive(),
            };
            payment.payment_id = self.insert_payment(&db_tx, &payment).await?;

            let advance_tx_id = if excess.is_positive() {
                Some(
                    self.convert_overpayment(&db_tx, &header, &payment, excess, cmd.date)
                        .await?,
                )
            } else {
                None
            };
            self.roll_up(&db_tx, side, header.id).await?;

            tracing::info!(
                payment_id = payment.payment_id,
                document_id = %header.id,
                method = payment.method.as_str(),
                state = clearing_state.as_str(),
                amount = %recorded,
                "payment recorded"
            );
            Ok(PaymentReceipt {
                payment_id: payment.payment_id,
                recorded,
                converted_to_credit: excess,
                advance_tx_id,
            })
        })
    }

    /// Moves a payment from `expected` to `next` with compare-and-swap
    /// semantics. If the payment already sits in `next` the call is a
    /// no-op reported as [`ClearingOutcome::AlreadyApplied`].
    pub async fn update_clearing_state(
        &self,
        side: DocumentSide,
        payment_id: i64,
        expected: ClearingState,
        next: ClearingState,
        cleared_date: Option<NaiveDate>,
    ) -> ResultEngine<ClearingOutcome> {
        with_tx!(self, |db_tx| {
            let payment = self
                .find_payment(&db_tx, side, payment_id)
                .await?
                .ok_or_else(|| {
                    EngineError::KeyNotFound(format!("payment {payment_id} not exists"))
                })?;
            if !expected.can_transition_to(next) {
                return Err(EngineError::InvalidTransition(format!(
                    "payment {payment_id}: {} -> {} is not allowed",
                    expected.as_str(),
                    next.as_str()
                )));
            }
            if expected == ClearingState::Cleared
                && next == ClearingState::Bounced
                && payment.overpayment_converted
            {
                return Err(EngineError::InvalidTransition(format!(
                    "payment {payment_id} already moved its excess to credit and cannot bounce"
                )));
            }

            let cleared_on = (next == ClearingState::Cleared)
                .then(|| cleared_date.unwrap_or_else(|| Utc::now().date_naive()));
            let changed = self
                .swap_clearing_state(&db_tx, side, payment_id, expected, next, cleared_on)
                .await?;
            if changed == 0 {
                let current = self
                    .find_payment(&db_tx, side, payment_id)
                    .await?
                    .map(|p| p.clearing_state);
                return match current {
                    Some(state) if state == next => {
                        tracing::debug!(payment_id, state = next.as_str(), "clearing already applied");
                        Ok(ClearingOutcome::AlreadyApplied)
                    }
                    Some(state) => Err(EngineError::ConcurrencyConflict(format!(
                        "payment {payment_id} is {}, expected {}",
                        state.as_str(),
                        expected.as_str()
                    ))),
                    None => Err(EngineError::KeyNotFound(format!(
                        "payment {payment_id} not exists"
                    ))),
                };
            }

            let header = self.roll_up(&db_tx, side, payment.document_id).await?;
            if next == ClearingState::Cleared
                && !payment.overpayment_converted
                && payment.amount.is_positive()
            {
                let paid_before = header.paid - payment.amount;
                let due = header.total - paid_before - header.credit_applied;
                let (recorded, excess) = split_overpayment(payment.amount, due);
                if excess.is_positive() {
                    self.mark_payment_converted(&db_tx, side, payment_id, recorded)
                        .await?;
                    self.convert_overpayment(
                        &db_tx,
                        &header,
                        &payment,
                        excess,
                        cleared_on.unwrap_or(payment.date),
                    )
                    .await?;
                    self.roll_up(&db_tx, side, payment.document_id).await?;
                }
            }

            tracing::info!(
                payment_id,
                from = expected.as_str(),
                to = next.as_str(),
                "clearing state updated"
            );
            Ok(ClearingOutcome::Applied)
        })
    }

    /// Payments of a document in `(date, payment_id)` order.
    pub async fn list_payments(
        &self,
        side: DocumentSide,
        document_id: Uuid,
    ) -> ResultEngine<Vec<Payment>> {
        with_tx!(self, |db_tx| {
            self.require_header(&db_tx, side, document_id).await?;
            self.document_payments(&db_tx, side, document_id).await
        })
    }

    /// Posted or pending instruments of one counterparty, oldest first.
    pub async fn list_pending_instruments(
        &self,
        side: DocumentSide,
        party_id: Uuid,
    ) -> ResultEngine<Vec<Payment>> {
        with_tx!(self, |db_tx| {
            self.require_party(&db_tx, side.party_kind(), party_id)
                .await?;
            let documents = self.party_document_ids(&db_tx, side, party_id).await?;
            self.uncleared_payments(&db_tx, side, documents).await
        })
    }

    /// Writes the excess of a payment as a deposit on the party's advance
    /// ledger and returns its id.
    async fn convert_overpayment(
        &self,
        db: &DatabaseTransaction,
        header: &DocumentHeader,
        payment: &Payment,
        excess: MoneyCents,
        date: NaiveDate,
    ) -> ResultEngine<i64> {
        let entry = AdvanceEntry {
            tx_id: 0,
            party_kind: header.side().party_kind(),
            party_id: header.party_id,
            tx_date: date,
            amount: excess,
            source_type: AdvanceSource::Deposit,
            source_id: Some(header.id),
            notes: Some(format!("overpayment of payment #{}", payment.payment_id)),
            created_by: payment.created_by.clone(),
            created_at: Utc::now(),
        };
        let tx_id = self.insert_advance(db, &entry).await?;
        tracing::info!(
            payment_id = payment.payment_id,
            document_id = %header.id,
            excess = %excess,
            advance_tx_id = tx_id,
            "overpayment converted to credit"
        );
        Ok(tx_id)
    }
}

/// Splits `amount` into what settles `due` and the excess above it.
fn split_overpayment(amount: MoneyCents, due: MoneyCents) -> (MoneyCents, MoneyCents) {
    if amount > due {
        let recorded = due.non_negative();
        (recorded, amount - recorded)
    } else {
        (amount, MoneyCents::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overpayment_is_split_at_the_due_amount() {
        assert_eq!(
            split_overpayment(MoneyCents::new(15_000), MoneyCents::new(10_000)),
            (MoneyCents::new(10_000), MoneyCents::new(5000))
        );
        assert_eq!(
            split_overpayment(MoneyCents::new(4000), MoneyCents::new(10_000)),
            (MoneyCents::new(4000), MoneyCents::ZERO)
        );
    }

    #[test]
    fn payment_on_a_settled_document_is_all_excess() {
        assert_eq!(
            split_overpayment(MoneyCents::new(2000), MoneyCents::new(-500)),
            (MoneyCents::ZERO, MoneyCents::new(2000))
        );
    }
}
