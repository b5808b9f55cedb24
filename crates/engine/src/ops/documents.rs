//! Purchases, sales and quotations.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, Utc};
use sea_orm::{DatabaseTransaction, TransactionTrait};
use uuid::Uuid;

use crate::{
    DirtyReason, DocType, DocumentCmd, DocumentHeader, DocumentLine, DocumentSide, EPSILON,
    EngineError, LineCmd, MoneyCents, PaymentStatus, QuotationStatus, ResultEngine,
    TransactionType, document_total,
    util::{ensure_positive_quantity, normalize_optional_text},
};

use super::{Engine, ledger::NewPosting, with_tx};

impl Engine {
    /// Records a purchase and posts its lines into the inventory ledger.
    pub async fn create_purchase(&self, cmd: DocumentCmd) -> ResultEngine<Uuid> {
        self.create(DocType::Purchase, cmd).await
    }

    /// Records a sale and posts its lines into the inventory ledger.
    pub async fn create_sale(&self, cmd: DocumentCmd) -> ResultEngine<Uuid> {
        self.create(DocType::Sale, cmd).await
    }

    /// Records a quotation. Quotations never move stock or money.
    pub async fn create_quotation(&self, cmd: DocumentCmd) -> ResultEngine<Uuid> {
        self.create(DocType::Quotation, cmd).await
    }

    async fn create(&self, doc_type: DocType, cmd: DocumentCmd) -> ResultEngine<Uuid> {
        with_tx!(self, |db_tx| {
            let header = self.create_document(&db_tx, doc_type, &cmd, None).await?;
            self.settle_valuation(&db_tx).await?;
            Ok(header.id)
        })
    }

    /// Replaces the lines and header fields of a purchase, then reposts it.
    pub async fn update_purchase(
        &self,
        purchase_id: Uuid,
        cmd: DocumentCmd,
    ) -> ResultEngine<DocumentHeader> {
        self.update(DocumentSide::Purchase, purchase_id, cmd).await
    }

    /// Replaces the lines and header fields of a sale or quotation.
    pub async fn update_sale(&self, sale_id: Uuid, cmd: DocumentCmd) -> ResultEngine<DocumentHeader> {
        self.update(DocumentSide::Sale, sale_id, cmd).await
    }

    async fn update(
        &self,
        side: DocumentSide,
        document_id: Uuid,
        cmd: DocumentCmd,
    ) -> ResultEngine<DocumentHeader> {
        with_tx!(self, |db_tx| {
            let header = self
                .update_document(&db_tx, side, document_id, &cmd)
                .await?;
            self.settle_valuation(&db_tx).await?;
            Ok(header)
        })
    }

    pub async fn document(
        &self,
        side: DocumentSide,
        document_id: Uuid,
    ) -> ResultEngine<DocumentHeader> {
        with_tx!(self, |db_tx| self.require_header(&db_tx, side, document_id).await)
    }

    pub async fn document_lines(
        &self,
        side: DocumentSide,
        document_id: Uuid,
    ) -> ResultEngine<Vec<DocumentLine>> {
        with_tx!(self, |db_tx| {
            self.require_header(&db_tx, side, document_id).await?;
            self.load_lines(&db_tx, side, document_id).await
        })
    }

    /// Lines an edit dropped from the document, kept for the superseded
    /// postings that reference them.
    pub async fn removed_document_lines(
        &self,
        side: DocumentSide,
        document_id: Uuid,
    ) -> ResultEngine<Vec<DocumentLine>> {
        with_tx!(self, |db_tx| {
            self.require_header(&db_tx, side, document_id).await?;
            self.load_removed_lines(&db_tx, side, document_id).await
        })
    }

    /// Moves a quotation through draft, sent, expired or cancelled.
    /// Acceptance only happens through [`Engine::convert_quotation_to_sale`].
    pub async fn set_quotation_status(
        &self,
        quotation_id: Uuid,
        status: QuotationStatus,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let mut header = self.require_quotation(&db_tx, quotation_id).await?;
            if status == QuotationStatus::Accepted {
                return Err(EngineError::Validation(
                    "quotations are accepted by converting them to a sale".to_string(),
                ));
            }
            if header.quotation_status == Some(QuotationStatus::Accepted) {
                return Err(EngineError::InvalidTransition(format!(
                    "quotation {quotation_id} was already converted"
                )));
            }
            header.quotation_status = Some(status);
            self.save_header(&db_tx, &header).await?;
            Ok(())
        })
    }

    /// Turns an open quotation into a new sale dated `date`. The quotation
    /// is kept, marked accepted, and the sale remembers where it came from.
    pub async fn convert_quotation_to_sale(
        &self,
        quotation_id: Uuid,
        date: NaiveDate,
        user_id: &str,
    ) -> ResultEngine<Uuid> {
        with_tx!(self, |db_tx| {
            let mut quotation = self.require_quotation(&db_tx, quotation_id).await?;
            let status = quotation.quotation_status.unwrap_or(QuotationStatus::Draft);
            if !status.is_open() {
                return Err(EngineError::InvalidTransition(format!(
                    "quotation {quotation_id} is {}",
                    status.as_str()
                )));
            }
            if !self
                .sales_from_quotation(&db_tx, quotation_id)
                .await?
                .is_empty()
            {
                return Err(EngineError::InvalidTransition(format!(
                    "quotation {quotation_id} was already converted"
                )));
            }

            let lines = self
                .load_lines(&db_tx, DocumentSide::Sale, quotation_id)
                .await?;
            let mut cmd = DocumentCmd::new(quotation.party_id, date)
                .order_discount(quotation.order_discount)
                .created_by(user_id);
            cmd.notes = quotation.notes.clone();
            cmd.lines = lines
                .iter()
                .map(|line| {
                    LineCmd::new(line.product_id, line.quantity, line.uom.clone(), line.unit_price)
                        .discount(line.item_discount)
                })
                .collect();

            let sale = self
                .create_document(&db_tx, DocType::Sale, &cmd, Some(quotation_id))
                .await?;
            quotation.quotation_status = Some(QuotationStatus::Accepted);
            self.save_header(&db_tx, &quotation).await?;
            self.settle_valuation(&db_tx).await?;
            tracing::info!(
                quotation_id = %quotation_id,
                sale_id = %sale.id,
                "quotation converted"
            );
            Ok(sale.id)
        })
    }

    async fn require_quotation(
        &self,
        db: &DatabaseTransaction,
        quotation_id: Uuid,
    ) -> ResultEngine<DocumentHeader> {
        let header = self
            .require_header(db, DocumentSide::Sale, quotation_id)
            .await?;
        if !header.is_quotation() {
            return Err(EngineError::Validation(format!(
                "sale {quotation_id} is not a quotation"
            )));
        }
        Ok(header)
    }

    pub(super) async fn create_document(
        &self,
        db: &DatabaseTransaction,
        doc_type: DocType,
        cmd: &DocumentCmd,
        source_quotation_id: Option<Uuid>,
    ) -> ResultEngine<DocumentHeader> {
        let side = doc_type.side();
        self.require_party(db, side.party_kind(), cmd.party_id)
            .await?;
        if cmd.lines.iter().any(|l| l.item_id.is_some()) {
            return Err(EngineError::Validation(
                "a new document cannot reuse existing lines".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let mut lines = self.build_lines(db, side, id, cmd).await?;
        let total = document_total(&lines, cmd.order_discount);
        let header = DocumentHeader {
            id,
            doc_type,
            party_id: cmd.party_id,
            date: cmd.date,
            quotation_status: (doc_type == DocType::Quotation).then_some(QuotationStatus::Draft),
            source_quotation_id,
            total,
            order_discount: cmd.order_discount,
            paid: MoneyCents::ZERO,
            credit_applied: MoneyCents::ZERO,
            status: PaymentStatus::derive(total, MoneyCents::ZERO),
            notes: normalize_optional_text(cmd.notes.as_deref()),
            created_by: cmd.created_by.clone(),
            created_at: Utc::now(),
        };
        self.insert_header(db, &header).await?;
        for line in &mut lines {
            line.item_id = self.insert_line(db, side, line).await?;
        }

        if !header.is_quotation() {
            let regular = TransactionType::regular_for(side);
            for line in &lines {
                let posting = NewPosting::for_line(
                    regular,
                    side,
                    line,
                    line.quantity,
                    header.date,
                    1,
                    &cmd.created_by,
                );
                self.post_entry(db, posting).await?;
            }
        }

        tracing::info!(
            document_id = %header.id,
            doc_type = doc_type.as_str(),
            lines = lines.len(),
            total = %header.total,
            "document created"
        );
        Ok(header)
    }

    async fn update_document(
        &self,
        db: &DatabaseTransaction,
        side: DocumentSide,
        document_id: Uuid,
        cmd: &DocumentCmd,
    ) -> ResultEngine<DocumentHeader> {
        let mut header = self.require_header(db, side, document_id).await?;
        if cmd.party_id != header.party_id {
            return Err(EngineError::Validation(format!(
                "the {} of document {document_id} cannot change",
                side.party_kind().as_str()
            )));
        }

        let existing = self.load_lines(db, side, document_id).await?;
        let existing_by_id: HashMap<i64, &DocumentLine> =
            existing.iter().map(|l| (l.item_id, l)).collect();
        let returned = if header.is_quotation() {
            HashMap::new()
        } else {
            self.returned_quantities(db, side, document_id).await?
        };
        let incoming = self.build_lines(db, side, document_id, cmd).await?;

        let mut kept: HashSet<i64> = HashSet::new();
        let mut price_changed = false;
        for line in incoming.iter().filter(|l| l.item_id != 0) {
            let old = existing_by_id.get(&line.item_id).ok_or_else(|| {
                EngineError::ReferenceMismatch(format!(
                    "line {} does not belong to document {document_id}",
                    line.item_id
                ))
            })?;
            if !kept.insert(line.item_id) {
                return Err(EngineError::Validation(format!(
                    "line {} is listed twice",
                    line.item_id
                )));
            }
            let already_returned = returned.get(&line.item_id).copied().unwrap_or(0.0);
            if already_returned > EPSILON {
                if old.product_id != line.product_id || old.uom != line.uom {
                    return Err(EngineError::Validation(format!(
                        "line {} has returns, its product and unit are fixed",
                        line.item_id
                    )));
                }
                if line.quantity + EPSILON < already_returned {
                    return Err(EngineError::ReturnExceedsRemaining(format!(
                        "line {} already returned {already_returned}, cannot drop to {}",
                        line.item_id, line.quantity
                    )));
                }
            }
            if side == DocumentSide::Purchase
                && (old.unit_price != line.unit_price
                    || old.item_discount != line.item_discount
                    || old.uom != line.uom)
            {
                price_changed = true;
            }
        }
        for old in existing.iter().filter(|l| !kept.contains(&l.item_id)) {
            if returned.get(&old.item_id).copied().unwrap_or(0.0) > EPSILON {
                return Err(EngineError::ReturnExceedsRemaining(format!(
                    "line {} has returns and cannot be removed",
                    old.item_id
                )));
            }
        }

        for old in existing.iter().filter(|l| !kept.contains(&l.item_id)) {
            self.remove_line(db, side, old.item_id).await?;
        }
        for line in &incoming {
            if line.item_id == 0 {
                self.insert_line(db, side, line).await?;
            } else {
                self.update_line(db, side, line).await?;
            }
        }

        header.date = cmd.date;
        header.order_discount = cmd.order_discount;
        header.notes = normalize_optional_text(cmd.notes.as_deref());
        header.total = document_total(&incoming, cmd.order_discount);
        self.save_header(db, &header).await?;

        if !header.is_quotation() {
            let reason = if price_changed {
                DirtyReason::PurchasePriceChange
            } else {
                DirtyReason::DocumentRebuild
            };
            self.repost_document(db, &header, reason, &cmd.created_by)
                .await?;
        }
        let header = self.roll_up(db, side, document_id).await?;
        tracing::info!(
            document_id = %document_id,
            total = %header.total,
            "document updated"
        );
        Ok(header)
    }

    /// Validates the command lines of a document. Lines keep the item id they
    /// were given, `0` for new ones.
    async fn build_lines(
        &self,
        db: &DatabaseTransaction,
        side: DocumentSide,
        document_id: Uuid,
        cmd: &DocumentCmd,
    ) -> ResultEngine<Vec<DocumentLine>> {
        if cmd.lines.is_empty() {
            return Err(EngineError::Validation(
                "a document needs at least one line".to_string(),
            ));
        }
        if cmd.order_discount.is_negative() {
            return Err(EngineError::Validation(
                "order discount must be >= 0".to_string(),
            ));
        }

        let mut lines = Vec::with_capacity(cmd.lines.len());
        for line in &cmd.lines {
            ensure_positive_quantity(line.quantity, "line")?;
            if line.unit_price.is_negative() {
                return Err(EngineError::Validation("unit price must be >= 0".to_string()));
            }
            if line.item_discount.is_negative() || line.item_discount > line.unit_price {
                return Err(EngineError::Validation(format!(
                    "item discount {} must be between 0 and the unit price {}",
                    line.item_discount, line.unit_price
                )));
            }
            if line.sale_price.is_negative() {
                return Err(EngineError::Validation("sale price must be >= 0".to_string()));
            }
            let mapping = self.require_mapping(db, line.product_id, &line.uom).await?;
            lines.push(DocumentLine {
                item_id: line.item_id.unwrap_or(0),
                document_id,
                product_id: line.product_id,
                quantity: line.quantity,
                uom: mapping.uom,
                unit_price: line.unit_price,
                item_discount: line.item_discount,
                sale_price: match side {
                    DocumentSide::Purchase => line.sale_price,
                    DocumentSide::Sale => MoneyCents::ZERO,
                },
            });
        }
        Ok(lines)
    }
}
