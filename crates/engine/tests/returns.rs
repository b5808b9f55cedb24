mod common;

use common::{Shop, cents, close, day};
use engine::{
    AdvanceSource, ClearingState, DocumentCmd, DocumentSide, EngineError, InstrumentType,
    LineCmd, PartyKind, PaymentCmd, PaymentMethod, PaymentStatus, RefundCmd, ReturnCmd,
    Settlement, TransactionType,
};
use uuid::Uuid;

async fn first_line(shop: &Shop, side: DocumentSide, document: Uuid) -> i64 {
    shop.engine.document_lines(side, document).await.unwrap()[0].item_id
}

#[tokio::test]
async fn sale_return_refunds_paid_cash_and_restocks() {
    let shop = Shop::new().await;
    shop.buy(5.0, 100, day(1)).await;
    let sale = shop.sell(2.0, 5000, day(2)).await;
    shop.engine
        .record_payment(
            DocumentSide::Sale,
            PaymentCmd::new(sale, day(2), cents(10_000), PaymentMethod::Cash),
        )
        .await
        .unwrap();

    let line = first_line(&shop, DocumentSide::Sale, sale).await;
    let outcome = shop
        .engine
        .record_return(
            DocumentSide::Sale,
            ReturnCmd::new(sale, day(3))
                .line(line, 1.0)
                .settlement(Settlement::Refund),
        )
        .await
        .unwrap();
    assert_eq!(outcome.value, cents(5000));
    assert_eq!(outcome.refunded, cents(5000));
    assert_eq!(outcome.credited, cents(0));
    assert!(outcome.payment_id.is_some());
    assert_eq!(outcome.advance_tx_id, None);
    assert_eq!(outcome.transaction_ids.len(), 1);

    let header = shop.engine.document(DocumentSide::Sale, sale).await.unwrap();
    assert_eq!(header.paid, cents(5000));
    assert_eq!(header.status, PaymentStatus::Partial);
    let payments = shop.engine.list_payments(DocumentSide::Sale, sale).await.unwrap();
    assert_eq!(payments.len(), 2);
    assert_eq!(payments[1].amount, cents(-5000));

    let stock = shop.engine.stock_on_hand(shop.product).await.unwrap();
    assert!(close(stock.quantity, 4.0));
    assert!(close(stock.unit_cost, 1.0));
    shop.assert_consistent().await;
}

#[tokio::test]
async fn sale_return_carries_the_order_discount() {
    let shop = Shop::new().await;
    shop.buy(10.0, 100, day(1)).await;
    let sale = shop
        .engine
        .create_sale(
            DocumentCmd::new(shop.customer, day(2))
                .order_discount(cents(1000))
                .line(LineCmd::new(shop.product, 4.0, "pcs", cents(2500))),
        )
        .await
        .unwrap();
    assert_eq!(
        shop.engine.document(DocumentSide::Sale, sale).await.unwrap().total,
        cents(9000)
    );

    let line = first_line(&shop, DocumentSide::Sale, sale).await;
    let outcome = shop
        .engine
        .record_return(
            DocumentSide::Sale,
            ReturnCmd::new(sale, day(3))
                .line(line, 2.0)
                .settlement(Settlement::CreditNote),
        )
        .await
        .unwrap();
    assert_eq!(outcome.value, cents(4500));
    assert_eq!(outcome.credited, cents(4500));
    assert_eq!(outcome.refunded, cents(0));

    let ledger = shop
        .engine
        .list_ledger(PartyKind::Customer, shop.customer, None, None)
        .await
        .unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].entry.source_type, AdvanceSource::ReturnCredit);
    assert_eq!(ledger[0].entry.source_id, Some(sale));
}

#[tokio::test]
async fn refund_beyond_paid_becomes_credit() {
    let shop = Shop::new().await;
    shop.buy(5.0, 100, day(1)).await;
    let sale = shop.sell(2.0, 5000, day(2)).await;
    shop.engine
        .record_payment(
            DocumentSide::Sale,
            PaymentCmd::new(sale, day(2), cents(2000), PaymentMethod::Cash),
        )
        .await
        .unwrap();

    let line = first_line(&shop, DocumentSide::Sale, sale).await;
    let outcome = shop
        .engine
        .record_return(
            DocumentSide::Sale,
            ReturnCmd::new(sale, day(3))
                .line(line, 1.0)
                .settlement(Settlement::Refund),
        )
        .await
        .unwrap();
    assert_eq!(outcome.refunded, cents(2000));
    assert_eq!(outcome.credited, cents(3000));

    let header = shop.engine.document(DocumentSide::Sale, sale).await.unwrap();
    assert_eq!(header.paid, cents(0));
    assert_eq!(
        shop.engine
            .get_balance(PartyKind::Customer, shop.customer)
            .await
            .unwrap(),
        cents(3000)
    );
}

#[tokio::test]
async fn returns_never_exceed_what_was_posted() {
    let shop = Shop::new().await;
    shop.buy(5.0, 100, day(1)).await;
    let sale = shop.sell(3.0, 1000, day(2)).await;
    let line = first_line(&shop, DocumentSide::Sale, sale).await;

    shop.engine
        .record_return(DocumentSide::Sale, ReturnCmd::new(sale, day(3)).line(line, 2.0))
        .await
        .unwrap();

    let err = shop
        .engine
        .record_return(DocumentSide::Sale, ReturnCmd::new(sale, day(4)).line(line, 2.0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ReturnExceedsRemaining(_)));

    let returnable = shop
        .engine
        .returnable_quantities(DocumentSide::Sale, sale)
        .await
        .unwrap();
    assert_eq!(returnable.len(), 1);
    assert!(close(returnable[0].posted, 3.0));
    assert!(close(returnable[0].returned, 2.0));
    assert!(close(returnable[0].remaining, 1.0));

    let err = shop
        .engine
        .record_return(
            DocumentSide::Sale,
            ReturnCmd::new(sale, day(4)).line(line, 0.5).line(line, 0.75),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ReturnExceedsRemaining(_)));

    let err = shop
        .engine
        .record_return(DocumentSide::Sale, ReturnCmd::new(sale, day(4)).line(line, 0.0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = shop
        .engine
        .record_return(DocumentSide::Sale, ReturnCmd::new(sale, day(4)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn return_lines_must_belong_to_the_document() {
    let shop = Shop::new().await;
    shop.buy(5.0, 100, day(1)).await;
    let first = shop.sell(1.0, 1000, day(2)).await;
    let second = shop.sell(1.0, 1000, day(2)).await;
    let foreign = first_line(&shop, DocumentSide::Sale, second).await;

    let err = shop
        .engine
        .record_return(DocumentSide::Sale, ReturnCmd::new(first, day(3)).line(foreign, 1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ReferenceMismatch(_)));

    let err = shop
        .engine
        .record_return(DocumentSide::Sale, ReturnCmd::new(first, day(3)).line(9999, 1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn purchase_return_uses_the_net_purchase_price() {
    let shop = Shop::new().await;
    let purchase = shop
        .engine
        .create_purchase(
            DocumentCmd::new(shop.vendor, day(1)).line(
                LineCmd::new(shop.product, 10.0, "pcs", cents(700)).discount(cents(100)),
            ),
        )
        .await
        .unwrap();
    let line = first_line(&shop, DocumentSide::Purchase, purchase).await;

    let outcome = shop
        .engine
        .record_return(
            DocumentSide::Purchase,
            ReturnCmd::new(purchase, day(2))
                .line(line, 3.0)
                .settlement(Settlement::CreditNote),
        )
        .await
        .unwrap();
    assert_eq!(outcome.value, cents(1800));
    assert_eq!(
        shop.engine
            .get_balance(PartyKind::Vendor, shop.vendor)
            .await
            .unwrap(),
        cents(1800)
    );

    let stock = shop.engine.stock_on_hand(shop.product).await.unwrap();
    assert!(close(stock.quantity, 7.0));
    assert!(close(stock.unit_cost, 6.0));

    let postings = shop
        .engine
        .document_postings(DocumentSide::Purchase, purchase)
        .await
        .unwrap();
    let kinds: Vec<_> = postings.iter().map(|p| p.transaction_type).collect();
    assert_eq!(
        kinds,
        vec![TransactionType::Purchase, TransactionType::PurchaseReturn]
    );
}

#[tokio::test]
async fn purchase_return_cannot_oversell() {
    let shop = Shop::new().await;
    let purchase = shop.buy(10.0, 500, day(1)).await;
    shop.sell(8.0, 900, day(2)).await;
    let line = first_line(&shop, DocumentSide::Purchase, purchase).await;

    let err = shop
        .engine
        .record_return(
            DocumentSide::Purchase,
            ReturnCmd::new(purchase, day(3)).line(line, 3.0),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientStock(_)));
}

#[tokio::test]
async fn returned_lines_limit_document_edits() {
    let shop = Shop::new().await;
    shop.buy(10.0, 100, day(1)).await;
    let sale = shop.sell(3.0, 1000, day(2)).await;
    let line = first_line(&shop, DocumentSide::Sale, sale).await;
    shop.engine
        .record_return(DocumentSide::Sale, ReturnCmd::new(sale, day(3)).line(line, 2.0))
        .await
        .unwrap();

    let err = shop
        .engine
        .update_sale(
            sale,
            DocumentCmd::new(shop.customer, day(2))
                .line(LineCmd::new(shop.product, 1.0, "pcs", cents(1000)).item(line)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ReturnExceedsRemaining(_)));

    let err = shop
        .engine
        .update_sale(
            sale,
            DocumentCmd::new(shop.customer, day(2))
                .line(LineCmd::new(shop.product, 3.0, "pcs", cents(1000))),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ReturnExceedsRemaining(_)));

    let header = shop
        .engine
        .update_sale(
            sale,
            DocumentCmd::new(shop.customer, day(2))
                .line(LineCmd::new(shop.product, 2.0, "pcs", cents(1200)).item(line)),
        )
        .await
        .unwrap();
    assert_eq!(header.total, cents(2400));

    let stock = shop.engine.stock_on_hand(shop.product).await.unwrap();
    assert!(close(stock.quantity, 10.0));
    shop.assert_consistent().await;
}

#[tokio::test]
async fn purchase_refund_comes_back_by_bank_transfer() {
    let shop = Shop::new().await;
    let purchase = shop.buy(10.0, 500, day(1)).await;
    let line = first_line(&shop, DocumentSide::Purchase, purchase).await;
    shop.engine
        .record_payment(
            DocumentSide::Purchase,
            PaymentCmd::new(purchase, day(1), cents(5000), PaymentMethod::Cash),
        )
        .await
        .unwrap();
    let account = shop
        .engine
        .create_company_bank_account("First Bank", "001-778")
        .await
        .unwrap();
    let vendor_account = shop
        .engine
        .create_vendor_bank_account(shop.vendor, "Trade Bank", "99-1")
        .await
        .unwrap();

    let outcome = shop
        .engine
        .record_return(
            DocumentSide::Purchase,
            ReturnCmd::new(purchase, day(2)).line(line, 4.0).refund_via(
                RefundCmd::new(PaymentMethod::BankTransfer)
                    .bank_account(account)
                    .vendor_bank_account(vendor_account)
                    .instrument_no("RF-1")
                    .clearing_state(ClearingState::Cleared),
            ),
        )
        .await
        .unwrap();
    assert_eq!(outcome.value, cents(2000));
    assert_eq!(outcome.refunded, cents(2000));
    assert_eq!(outcome.credited, cents(0));

    let payments = shop
        .engine
        .list_payments(DocumentSide::Purchase, purchase)
        .await
        .unwrap();
    let refund = payments
        .iter()
        .find(|p| Some(p.payment_id) == outcome.payment_id)
        .unwrap();
    assert_eq!(refund.amount, cents(-2000));
    assert_eq!(refund.method, PaymentMethod::BankTransfer);
    assert_eq!(refund.instrument_type, Some(InstrumentType::Online));
    assert_eq!(refund.instrument_no.as_deref(), Some("RF-1"));
    assert_eq!(refund.bank_account_id, Some(account));
    assert_eq!(refund.vendor_bank_account_id, Some(vendor_account));
    assert_eq!(refund.cleared_date, Some(day(2)));

    let header = shop
        .engine
        .document(DocumentSide::Purchase, purchase)
        .await
        .unwrap();
    assert_eq!(header.paid, cents(3000));
    assert_eq!(header.status, PaymentStatus::Partial);

    let err = shop
        .engine
        .record_return(
            DocumentSide::Purchase,
            ReturnCmd::new(purchase, day(3)).line(line, 1.0).refund_via(
                RefundCmd::new(PaymentMethod::BankTransfer)
                    .bank_account(account)
                    .instrument_no("RF-2"),
            ),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let returnable = shop
        .engine
        .returnable_quantities(DocumentSide::Purchase, purchase)
        .await
        .unwrap();
    assert!(close(returnable[0].remaining, 6.0));
    let stock = shop.engine.stock_on_hand(shop.product).await.unwrap();
    assert!(close(stock.quantity, 6.0));
}
