use sea_orm::{DatabaseTransaction, TransactionTrait};
use uuid::Uuid;

use crate::{DocumentHeader, DocumentSide, Payment, ResultEngine, RollUp};

use super::{Engine, with_tx};

impl Engine {
    /// Recomputes `paid`, `credit_applied` and the payment status of a
    /// document from its payment and advance ledgers. Idempotent.
    pub async fn recompute_header(
        &self,
        side: DocumentSide,
        document_id: Uuid,
    ) -> ResultEngine<DocumentHeader> {
        with_tx!(self, |db_tx| self.roll_up(&db_tx, side, document_id).await)
    }

    pub(super) async fn roll_up(
        &self,
        db: &DatabaseTransaction,
        side: DocumentSide,
        document_id: Uuid,
    ) -> ResultEngine<DocumentHeader> {
        let mut header = self.require_header(db, side, document_id).await?;
        let payments = self.document_payments(db, side, document_id).await?;
        let applications = self.document_applications(db, side, document_id).await?;

        let totals = RollUp::compute(
            header.total,
            payments
                .iter()
                .filter(|p| p.counts_towards_paid())
                .map(|p: &Payment| p.amount),
            applications.iter().map(|a| a.amount),
        );
        if totals.paid != header.paid
            || totals.credit_applied != header.credit_applied
            || totals.status != header.status
        {
            self.save_roll_up(db, side, document_id, totals).await?;
            tracing::debug!(
                document_id = %document_id,
                paid = %totals.paid,
                credit_applied = %totals.credit_applied,
                status = totals.status.as_str(),
                "header rolled up"
            );
        }
        header.paid = totals.paid;
        header.credit_applied = totals.credit_applied;
        header.status = totals.status;
        Ok(header)
    }
}
