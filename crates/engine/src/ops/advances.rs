use chrono::{NaiveDate, Utc};
use sea_orm::{DatabaseTransaction, TransactionTrait};
use uuid::Uuid;

use crate::{
    AdvanceEntry, AdvanceLedgerLine, AdvanceSource, CreditCmd, DocumentSide, EngineError,
    MoneyCents, PartyKind, ResultEngine,
    advances::{check_overdraft, statement},
    util::{ensure_positive_amount, normalize_optional_text},
};

use super::{Engine, with_tx};

impl Engine {
    /// Adds a deposit to a party's advance ledger.
    pub async fn grant_credit(&self, kind: PartyKind, cmd: CreditCmd) -> ResultEngine<i64> {
        ensure_positive_amount(cmd.amount, "credit amount")?;
        with_tx!(self, |db_tx| {
            self.require_party(&db_tx, kind, cmd.party_id).await?;
            self.insert_credit(&db_tx, kind, &cmd, cmd.amount, AdvanceSource::Deposit, None)
                .await
        })
    }

    /// Adds a return credit, optionally tied to the document it came from.
    pub async fn add_return_credit(
        &self,
        kind: PartyKind,
        cmd: CreditCmd,
        source_document: Option<Uuid>,
    ) -> ResultEngine<i64> {
        ensure_positive_amount(cmd.amount, "credit amount")?;
        with_tx!(self, |db_tx| {
            self.require_party(&db_tx, kind, cmd.party_id).await?;
            if let Some(document_id) = source_document {
                let header = self
                    .require_header(&db_tx, kind.document_side(), document_id)
                    .await?;
                if header.party_id != cmd.party_id {
                    return Err(EngineError::ReferenceMismatch(format!(
                        "document {document_id} does not belong to {} {}",
                        kind.as_str(),
                        cmd.party_id
                    )));
                }
            }
            self.insert_credit(
                &db_tx,
                kind,
                &cmd,
                cmd.amount,
                AdvanceSource::ReturnCredit,
                source_document,
            )
            .await
        })
    }

    /// Consumes part of a party's balance to settle one of its documents.
    ///
    /// The balance is checked first (no prefix of the ledger may go
    /// negative), then the amount against what the document still owes.
    pub async fn apply_credit_to_document(
        &self,
        kind: PartyKind,
        cmd: CreditCmd,
        document_id: Uuid,
    ) -> ResultEngine<i64> {
        ensure_positive_amount(cmd.amount, "applied amount")?;
        let side = kind.document_side();
        with_tx!(self, |db_tx| {
            self.require_party(&db_tx, kind, cmd.party_id).await?;
            let header = self.require_header(&db_tx, side, document_id).await?;
            if header.party_id != cmd.party_id {
                return Err(EngineError::ReferenceMismatch(format!(
                    "document {document_id} does not belong to {} {}",
                    kind.as_str(),
                    cmd.party_id
                )));
            }
            header.ensure_not_quotation("take credit")?;

            let ledger = self.party_advances(&db_tx, kind, cmd.party_id).await?;
            check_overdraft(&ledger, cmd.date, -cmd.amount)?;

            let remaining = header.remaining_due();
            if cmd.amount > remaining {
                return Err(EngineError::OverApplication(format!(
                    "applying {} to document {document_id}, only {} is due",
                    cmd.amount,
                    remaining.non_negative()
                )));
            }

            let tx_id = self
                .insert_credit(
                    &db_tx,
                    kind,
                    &cmd,
                    -cmd.amount,
                    AdvanceSource::applied_to(side),
                    Some(document_id),
                )
                .await?;
            self.roll_up(&db_tx, side, document_id).await?;
            Ok(tx_id)
        })
    }

    /// Sum of every entry of a party's advance ledger.
    pub async fn get_balance(&self, kind: PartyKind, party_id: Uuid) -> ResultEngine<MoneyCents> {
        with_tx!(self, |db_tx| {
            self.require_party(&db_tx, kind, party_id).await?;
            let ledger = self.party_advances(&db_tx, kind, party_id).await?;
            Ok(ledger.iter().map(|e| e.amount).sum::<MoneyCents>())
        })
    }

    /// Balance carried into `as_of`: the sum of entries dated before it.
    pub async fn get_opening_balance(
        &self,
        kind: PartyKind,
        party_id: Uuid,
        as_of: NaiveDate,
    ) -> ResultEngine<MoneyCents> {
        with_tx!(self, |db_tx| {
            self.require_party(&db_tx, kind, party_id).await?;
            let ledger = self.party_advances(&db_tx, kind, party_id).await?;
            Ok(opening_balance(&ledger, Some(as_of)))
        })
    }

    /// Statement of a party between two optional dates (both inclusive),
    /// with the running balance carried in from before `from`.
    pub async fn list_ledger(
        &self,
        kind: PartyKind,
        party_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> ResultEngine<Vec<AdvanceLedgerLine>> {
        with_tx!(self, |db_tx| {
            self.require_party(&db_tx, kind, party_id).await?;
            let ledger = self.party_advances(&db_tx, kind, party_id).await?;
            let opening = opening_balance(&ledger, from);
            let window: Vec<AdvanceEntry> = ledger
                .into_iter()
                .filter(|e| from.is_none_or(|from| e.tx_date >= from))
                .filter(|e| to.is_none_or(|to| e.tx_date <= to))
                .collect();
            Ok(statement(window, opening))
        })
    }

    /// Credit applications that settled a document.
    pub async fn list_credit_applications(
        &self,
        side: DocumentSide,
        document_id: Uuid,
    ) -> ResultEngine<Vec<AdvanceEntry>> {
        with_tx!(self, |db_tx| {
            self.require_header(&db_tx, side, document_id).await?;
            self.document_applications(&db_tx, side, document_id).await
        })
    }

    async fn insert_credit(
        &self,
        db: &DatabaseTransaction,
        kind: PartyKind,
        cmd: &CreditCmd,
        amount: MoneyCents,
        source_type: AdvanceSource,
        source_id: Option<Uuid>,
    ) -> ResultEngine<i64> {
        let entry = AdvanceEntry {
            tx_id: 0,
            party_kind: kind,
            party_id: cmd.party_id,
            tx_date: cmd.date,
            amount,
            source_type,
            source_id,
            notes: normalize_optional_text(cmd.notes.as_deref()),
            created_by: cmd.created_by.clone(),
            created_at: Utc::now(),
        };
        let tx_id = self.insert_advance(db, &entry).await?;
        tracing::info!(
            tx_id,
            party_id = %cmd.party_id,
            kind = kind.as_str(),
            source = source_type.as_str(),
            amount = %amount,
            "advance entry recorded"
        );
        Ok(tx_id)
    }
}

fn opening_balance(ledger: &[AdvanceEntry], as_of: Option<NaiveDate>) -> MoneyCents {
    match as_of {
        Some(as_of) => ledger
            .iter()
            .filter(|e| e.tx_date < as_of)
            .map(|e| e.amount)
            .sum(),
        None => MoneyCents::ZERO,
    }
}
