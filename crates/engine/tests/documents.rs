mod common;

use common::{Shop, cents, close, day};
use engine::{
    DocType, DocumentCmd, DocumentSide, EngineError, ErrorKind, LineCmd, PartyKind,
    PaymentStatus, QuotationStatus,
};
use uuid::Uuid;

#[tokio::test]
async fn totals_subtract_item_and_order_discounts() {
    let shop = Shop::new().await;
    let purchase = shop
        .engine
        .create_purchase(
            DocumentCmd::new(shop.vendor, day(1))
                .order_discount(cents(500))
                .notes("  first delivery  ")
                .line(
                    LineCmd::new(shop.product, 3.0, "pcs", cents(1000))
                        .discount(cents(200))
                        .sale_price(cents(1500)),
                ),
        )
        .await
        .unwrap();

    let header = shop
        .engine
        .document(DocumentSide::Purchase, purchase)
        .await
        .unwrap();
    assert_eq!(header.doc_type, DocType::Purchase);
    assert_eq!(header.total, cents(1900));
    assert_eq!(header.status, PaymentStatus::Unpaid);
    assert_eq!(header.notes.as_deref(), Some("first delivery"));

    let lines = shop
        .engine
        .document_lines(DocumentSide::Purchase, purchase)
        .await
        .unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].sale_price, cents(1500));
    assert_eq!(lines[0].line_total(), cents(2400));
}

#[tokio::test]
async fn invalid_documents_are_rejected() {
    let shop = Shop::new().await;

    let cases = [
        DocumentCmd::new(shop.vendor, day(1)),
        DocumentCmd::new(shop.vendor, day(1))
            .line(LineCmd::new(shop.product, 0.0, "pcs", cents(100))),
        DocumentCmd::new(shop.vendor, day(1))
            .line(LineCmd::new(shop.product, 1.0, "pcs", cents(-100))),
        DocumentCmd::new(shop.vendor, day(1))
            .line(LineCmd::new(shop.product, 1.0, "pcs", cents(100)).discount(cents(150))),
        DocumentCmd::new(shop.vendor, day(1))
            .order_discount(cents(-1))
            .line(LineCmd::new(shop.product, 1.0, "pcs", cents(100))),
        DocumentCmd::new(shop.vendor, day(1))
            .line(LineCmd::new(shop.product, 1.0, "pcs", cents(100)).item(1)),
    ];
    for cmd in cases {
        let err = shop.engine.create_purchase(cmd).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{err:?}");
    }

    let err = shop
        .engine
        .create_purchase(
            DocumentCmd::new(shop.vendor, day(1))
                .line(LineCmd::new(shop.product, 1.0, "crate", cents(100))),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = shop
        .engine
        .create_purchase(
            DocumentCmd::new(shop.customer, day(1))
                .line(LineCmd::new(shop.product, 1.0, "pcs", cents(100))),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = shop
        .engine
        .create_purchase(
            DocumentCmd::new(shop.vendor, day(1))
                .line(LineCmd::new(Uuid::new_v4(), 1.0, "pcs", cents(100))),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Referential);

    assert!(shop
        .engine
        .ledger_entries(shop.product, true)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn document_party_cannot_change() {
    let shop = Shop::new().await;
    let purchase = shop.buy(1.0, 100, day(1)).await;
    let other = shop.engine.create_vendor("Other Supply").await.unwrap();

    let err = shop
        .engine
        .update_purchase(
            purchase,
            DocumentCmd::new(other, day(1))
                .line(LineCmd::new(shop.product, 1.0, "pcs", cents(100))),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn updating_lines_replaces_postings() {
    let shop = Shop::new().await;
    shop.engine
        .add_product_uom(shop.product, "box", 6.0)
        .await
        .unwrap();
    let purchase = shop.buy(4.0, 300, day(1)).await;
    let line = shop
        .engine
        .document_lines(DocumentSide::Purchase, purchase)
        .await
        .unwrap()[0]
        .item_id;

    let header = shop
        .engine
        .update_purchase(
            purchase,
            DocumentCmd::new(shop.vendor, day(1))
                .line(LineCmd::new(shop.product, 2.0, "pcs", cents(300)).item(line))
                .line(LineCmd::new(shop.product, 1.0, "box", cents(1200))),
        )
        .await
        .unwrap();
    assert_eq!(header.total, cents(1800));

    let lines = shop
        .engine
        .document_lines(DocumentSide::Purchase, purchase)
        .await
        .unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].item_id, line);

    let postings = shop
        .engine
        .document_postings(DocumentSide::Purchase, purchase)
        .await
        .unwrap();
    assert_eq!(postings.len(), 2);
    assert!(postings.iter().all(|p| p.generation == 2));

    let stock = shop.engine.stock_on_hand(shop.product).await.unwrap();
    assert!(close(stock.quantity, 8.0));
    assert!(close(stock.unit_cost, 2.25));
    shop.assert_consistent().await;

    let err = shop
        .engine
        .update_purchase(
            purchase,
            DocumentCmd::new(shop.vendor, day(1))
                .line(LineCmd::new(shop.product, 2.0, "pcs", cents(300)).item(line))
                .line(LineCmd::new(shop.product, 2.0, "pcs", cents(300)).item(line)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = shop
        .engine
        .update_purchase(
            purchase,
            DocumentCmd::new(shop.vendor, day(1))
                .line(LineCmd::new(shop.product, 2.0, "pcs", cents(300)).item(line + 1000)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ReferenceMismatch(_)));
}

#[tokio::test]
async fn quotation_converts_once_into_a_sale() {
    let shop = Shop::new().await;
    shop.buy(10.0, 400, day(1)).await;
    let quotation = shop
        .engine
        .create_quotation(
            DocumentCmd::new(shop.customer, day(2))
                .order_discount(cents(100))
                .line(LineCmd::new(shop.product, 3.0, "pcs", cents(900))),
        )
        .await
        .unwrap();

    let header = shop
        .engine
        .document(DocumentSide::Sale, quotation)
        .await
        .unwrap();
    assert_eq!(header.doc_type, DocType::Quotation);
    assert_eq!(header.quotation_status, Some(QuotationStatus::Draft));
    assert!(shop
        .engine
        .document_postings(DocumentSide::Sale, quotation)
        .await
        .unwrap()
        .is_empty());
    assert!(shop
        .engine
        .returnable_quantities(DocumentSide::Sale, quotation)
        .await
        .unwrap()
        .is_empty());

    shop.engine
        .set_quotation_status(quotation, QuotationStatus::Sent)
        .await
        .unwrap();
    let err = shop
        .engine
        .set_quotation_status(quotation, QuotationStatus::Accepted)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let sale = shop
        .engine
        .convert_quotation_to_sale(quotation, day(3), "clerk")
        .await
        .unwrap();
    let sale_header = shop.engine.document(DocumentSide::Sale, sale).await.unwrap();
    assert_eq!(sale_header.doc_type, DocType::Sale);
    assert_eq!(sale_header.source_quotation_id, Some(quotation));
    assert_eq!(sale_header.total, cents(2600));
    assert_eq!(sale_header.date, day(3));
    assert_eq!(sale_header.created_by, "clerk");

    let quotation_header = shop
        .engine
        .document(DocumentSide::Sale, quotation)
        .await
        .unwrap();
    assert_eq!(
        quotation_header.quotation_status,
        Some(QuotationStatus::Accepted)
    );

    let stock = shop.engine.stock_on_hand(shop.product).await.unwrap();
    assert!(close(stock.quantity, 7.0));

    let err = shop
        .engine
        .convert_quotation_to_sale(quotation, day(4), "clerk")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));
    let err = shop
        .engine
        .set_quotation_status(quotation, QuotationStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));

    let err = shop
        .engine
        .set_quotation_status(sale, QuotationStatus::Sent)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn closed_quotation_cannot_convert() {
    let shop = Shop::new().await;
    let quotation = shop
        .engine
        .create_quotation(
            DocumentCmd::new(shop.customer, day(2))
                .line(LineCmd::new(shop.product, 1.0, "pcs", cents(900))),
        )
        .await
        .unwrap();
    shop.engine
        .set_quotation_status(quotation, QuotationStatus::Expired)
        .await
        .unwrap();

    let err = shop
        .engine
        .convert_quotation_to_sale(quotation, day(3), "clerk")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));
}

#[tokio::test]
async fn recompute_header_is_idempotent() {
    let shop = Shop::new().await;
    shop.buy(1.0, 100, day(1)).await;
    let sale = shop.sell(1.0, 1000, day(2)).await;

    let first = shop
        .engine
        .recompute_header(DocumentSide::Sale, sale)
        .await
        .unwrap();
    let second = shop
        .engine
        .recompute_header(DocumentSide::Sale, sale)
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first.status, PaymentStatus::Unpaid);
}

#[tokio::test]
async fn master_data_lookups() {
    let shop = Shop::new().await;

    let product = shop.engine.product(shop.product).await.unwrap();
    assert_eq!(product.name, "Widget");
    assert_eq!(shop.engine.base_uom(shop.product).await.unwrap(), "pcs");
    let mappings = shop.engine.uom_mappings(shop.product).await.unwrap();
    assert_eq!(mappings.len(), 1);
    assert!(mappings[0].is_base);

    let vendor = shop.engine.party(PartyKind::Vendor, shop.vendor).await.unwrap();
    assert_eq!(vendor.name, "Acme Supply");
    let err = shop
        .engine
        .party(PartyKind::Customer, shop.vendor)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = shop.engine.create_product("  ", "pcs").await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn fully_discounted_sale_is_paid() {
    let shop = Shop::new().await;
    shop.buy(1.0, 100, day(1)).await;
    let sale = shop
        .engine
        .create_sale(
            DocumentCmd::new(shop.customer, day(2))
                .order_discount(cents(1000))
                .line(LineCmd::new(shop.product, 1.0, "pcs", cents(1000))),
        )
        .await
        .unwrap();

    let header = shop.engine.document(DocumentSide::Sale, sale).await.unwrap();
    assert_eq!(header.total, cents(0));
    assert_eq!(header.paid, cents(0));
    assert_eq!(header.status, PaymentStatus::Paid);
}

#[tokio::test]
async fn removed_lines_stay_behind_their_superseded_postings() {
    let shop = Shop::new().await;
    let purchase = shop
        .engine
        .create_purchase(
            DocumentCmd::new(shop.vendor, day(1))
                .line(LineCmd::new(shop.product, 4.0, "pcs", cents(300)))
                .line(LineCmd::new(shop.product, 2.0, "pcs", cents(600))),
        )
        .await
        .unwrap();
    let lines = shop
        .engine
        .document_lines(DocumentSide::Purchase, purchase)
        .await
        .unwrap();
    let (kept, dropped) = (lines[0].item_id, lines[1].item_id);

    shop.engine
        .update_purchase(
            purchase,
            DocumentCmd::new(shop.vendor, day(1))
                .line(LineCmd::new(shop.product, 4.0, "pcs", cents(300)).item(kept)),
        )
        .await
        .unwrap();

    let current = shop
        .engine
        .document_lines(DocumentSide::Purchase, purchase)
        .await
        .unwrap();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].item_id, kept);

    let removed = shop
        .engine
        .removed_document_lines(DocumentSide::Purchase, purchase)
        .await
        .unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].item_id, dropped);
    assert!(close(removed[0].quantity, 2.0));

    let history = shop.engine.ledger_entries(shop.product, true).await.unwrap();
    let superseded: Vec<_> = history.iter().filter(|e| e.superseded_at.is_some()).collect();
    assert_eq!(superseded.len(), 2);
    assert!(
        superseded
            .iter()
            .any(|e| e.reference.map(|r| r.item_id) == Some(dropped))
    );

    let stock = shop.engine.stock_on_hand(shop.product).await.unwrap();
    assert!(close(stock.quantity, 4.0));
    assert!(close(stock.unit_cost, 3.0));
    shop.assert_consistent().await;
}
