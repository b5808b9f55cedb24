mod common;

use common::{Shop, cents, day};
use engine::{
    ClearingOutcome, ClearingState, DocumentCmd, DocumentSide, EngineError, InstrumentType,
    LineCmd, PartyKind, PaymentCmd, PaymentMethod, PaymentStatus,
};
use uuid::Uuid;

/// A sale of one unit for `total` cents, with stock bought beforehand.
async fn sale_of(shop: &Shop, total: i64) -> Uuid {
    shop.buy(1.0, 100, day(1)).await;
    shop.sell(1.0, total, day(2)).await
}

#[tokio::test]
async fn cash_overpayment_is_clamped_and_credited() {
    let shop = Shop::new().await;
    let sale = sale_of(&shop, 10_000).await;

    let receipt = shop
        .engine
        .record_payment(
            DocumentSide::Sale,
            PaymentCmd::new(sale, day(3), cents(15_000), PaymentMethod::Cash),
        )
        .await
        .unwrap();
    assert_eq!(receipt.recorded, cents(10_000));
    assert_eq!(receipt.converted_to_credit, cents(5000));
    assert!(receipt.advance_tx_id.is_some());

    let header = shop.engine.document(DocumentSide::Sale, sale).await.unwrap();
    assert_eq!(header.paid, cents(10_000));
    assert_eq!(header.status, PaymentStatus::Paid);
    assert_eq!(
        shop.engine
            .get_balance(PartyKind::Customer, shop.customer)
            .await
            .unwrap(),
        cents(5000)
    );

    let payments = shop.engine.list_payments(DocumentSide::Sale, sale).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert!(payments[0].overpayment_converted);
    assert_eq!(payments[0].instrument_type, Some(InstrumentType::Other));
}

#[tokio::test]
async fn partial_payment_leaves_document_partial() {
    let shop = Shop::new().await;
    let sale = sale_of(&shop, 10_000).await;

    shop.engine
        .record_payment(
            DocumentSide::Sale,
            PaymentCmd::new(sale, day(3), cents(4000), PaymentMethod::Card),
        )
        .await
        .unwrap();
    let header = shop.engine.document(DocumentSide::Sale, sale).await.unwrap();
    assert_eq!(header.paid, cents(4000));
    assert_eq!(header.status, PaymentStatus::Partial);
    assert_eq!(header.remaining_due(), cents(6000));
}

#[tokio::test]
async fn cheque_excess_is_credited_once_on_clearing() {
    let shop = Shop::new().await;
    let sale = sale_of(&shop, 10_000).await;
    let account = shop
        .engine
        .create_company_bank_account("First Bank", "001-778")
        .await
        .unwrap();

    let receipt = shop
        .engine
        .record_payment(
            DocumentSide::Sale,
            PaymentCmd::new(sale, day(3), cents(15_000), PaymentMethod::Cheque)
                .bank_account(account)
                .instrument_no("CHQ-1001"),
        )
        .await
        .unwrap();
    assert_eq!(receipt.recorded, cents(15_000));
    assert_eq!(receipt.converted_to_credit, cents(0));

    let outcome = shop
        .engine
        .update_clearing_state(
            DocumentSide::Sale,
            receipt.payment_id,
            ClearingState::Pending,
            ClearingState::Cleared,
            Some(day(5)),
        )
        .await
        .unwrap();
    assert_eq!(outcome, ClearingOutcome::Applied);

    let again = shop
        .engine
        .update_clearing_state(
            DocumentSide::Sale,
            receipt.payment_id,
            ClearingState::Pending,
            ClearingState::Cleared,
            Some(day(5)),
        )
        .await
        .unwrap();
    assert_eq!(again, ClearingOutcome::AlreadyApplied);

    let balance = shop
        .engine
        .get_balance(PartyKind::Customer, shop.customer)
        .await
        .unwrap();
    assert_eq!(balance, cents(5000));
    let ledger = shop
        .engine
        .list_ledger(PartyKind::Customer, shop.customer, None, None)
        .await
        .unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].entry.tx_date, day(5));

    let payments = shop.engine.list_payments(DocumentSide::Sale, sale).await.unwrap();
    assert_eq!(payments[0].amount, cents(10_000));
    assert_eq!(payments[0].clearing_state, ClearingState::Cleared);
    assert_eq!(payments[0].cleared_date, Some(day(5)));
    assert_eq!(payments[0].instrument_type, Some(InstrumentType::CrossCheque));

    let header = shop.engine.document(DocumentSide::Sale, sale).await.unwrap();
    assert_eq!(header.paid, cents(10_000));
    assert_eq!(header.status, PaymentStatus::Paid);
}

#[tokio::test]
async fn purchase_counts_only_cleared_payments() {
    let shop = Shop::new().await;
    let purchase = shop.buy(5.0, 1000, day(1)).await;
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

    let receipt = shop
        .engine
        .record_payment(
            DocumentSide::Purchase,
            PaymentCmd::new(purchase, day(2), cents(5000), PaymentMethod::BankTransfer)
                .bank_account(account)
                .vendor_bank_account(vendor_account)
                .instrument_no("TRX-9"),
        )
        .await
        .unwrap();

    let header = shop
        .engine
        .document(DocumentSide::Purchase, purchase)
        .await
        .unwrap();
    assert_eq!(header.paid, cents(0));
    assert_eq!(header.status, PaymentStatus::Unpaid);

    let pending = shop
        .engine
        .list_pending_instruments(DocumentSide::Purchase, shop.vendor)
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].clearing_state, ClearingState::Posted);

    shop.engine
        .update_clearing_state(
            DocumentSide::Purchase,
            receipt.payment_id,
            ClearingState::Posted,
            ClearingState::Cleared,
            Some(day(4)),
        )
        .await
        .unwrap();

    let header = shop
        .engine
        .document(DocumentSide::Purchase, purchase)
        .await
        .unwrap();
    assert_eq!(header.paid, cents(5000));
    assert_eq!(header.status, PaymentStatus::Paid);
    assert!(shop
        .engine
        .list_pending_instruments(DocumentSide::Purchase, shop.vendor)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn bounced_purchase_cheque_is_not_paid() {
    let shop = Shop::new().await;
    let purchase = shop.buy(5.0, 1000, day(1)).await;
    let account = shop
        .engine
        .create_company_bank_account("First Bank", "001-778")
        .await
        .unwrap();

    let receipt = shop
        .engine
        .record_payment(
            DocumentSide::Purchase,
            PaymentCmd::new(purchase, day(2), cents(5000), PaymentMethod::Cheque)
                .bank_account(account)
                .instrument_no("000123"),
        )
        .await
        .unwrap();
    let outcome = shop
        .engine
        .update_clearing_state(
            DocumentSide::Purchase,
            receipt.payment_id,
            ClearingState::Pending,
            ClearingState::Bounced,
            None,
        )
        .await
        .unwrap();
    assert_eq!(outcome, ClearingOutcome::Applied);

    let payments = shop
        .engine
        .list_payments(DocumentSide::Purchase, purchase)
        .await
        .unwrap();
    assert_eq!(payments[0].clearing_state, ClearingState::Bounced);
    assert_eq!(payments[0].cleared_date, None);
    let header = shop
        .engine
        .document(DocumentSide::Purchase, purchase)
        .await
        .unwrap();
    assert_eq!(header.paid, cents(0));
}

#[tokio::test]
async fn clearing_transitions_are_guarded() {
    let shop = Shop::new().await;
    let sale = sale_of(&shop, 10_000).await;
    let cash = shop
        .engine
        .record_payment(
            DocumentSide::Sale,
            PaymentCmd::new(sale, day(3), cents(12_000), PaymentMethod::Cash),
        )
        .await
        .unwrap();

    let err = shop
        .engine
        .update_clearing_state(
            DocumentSide::Sale,
            cash.payment_id,
            ClearingState::Cleared,
            ClearingState::Pending,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));

    let err = shop
        .engine
        .update_clearing_state(
            DocumentSide::Sale,
            cash.payment_id,
            ClearingState::Cleared,
            ClearingState::Bounced,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));

    let err = shop
        .engine
        .update_clearing_state(
            DocumentSide::Sale,
            cash.payment_id,
            ClearingState::Pending,
            ClearingState::Bounced,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ConcurrencyConflict(_)));

    let err = shop
        .engine
        .update_clearing_state(
            DocumentSide::Sale,
            cash.payment_id + 100,
            ClearingState::Pending,
            ClearingState::Cleared,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn method_rules_are_enforced() {
    let shop = Shop::new().await;
    let sale = sale_of(&shop, 10_000).await;
    let account = shop
        .engine
        .create_company_bank_account("First Bank", "001-778")
        .await
        .unwrap();

    let rejected = [
        PaymentCmd::new(sale, day(3), cents(0), PaymentMethod::Cash),
        PaymentCmd::new(sale, day(3), cents(1000), PaymentMethod::Cash).bank_account(account),
        PaymentCmd::new(sale, day(3), cents(-1000), PaymentMethod::Card),
        PaymentCmd::new(sale, day(3), cents(1000), PaymentMethod::Cheque).bank_account(account),
        PaymentCmd::new(sale, day(3), cents(1000), PaymentMethod::Cheque).instrument_no("1"),
        PaymentCmd::new(sale, day(3), cents(1000), PaymentMethod::BankTransfer)
            .bank_account(account)
            .instrument_no("T-1")
            .instrument_type(InstrumentType::Cheque),
        PaymentCmd::new(sale, day(3), cents(1000), PaymentMethod::Cash)
            .clearing_state(ClearingState::Bounced),
    ];
    for cmd in rejected {
        let err = shop
            .engine
            .record_payment(DocumentSide::Sale, cmd)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)), "{err:?}");
    }
    assert!(shop
        .engine
        .list_payments(DocumentSide::Sale, sale)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn vendor_account_must_belong_to_the_vendor() {
    let shop = Shop::new().await;
    let purchase = shop.buy(5.0, 1000, day(1)).await;
    let other_vendor = shop.engine.create_vendor("Other Supply").await.unwrap();
    let account = shop
        .engine
        .create_company_bank_account("First Bank", "001-778")
        .await
        .unwrap();
    let foreign = shop
        .engine
        .create_vendor_bank_account(other_vendor, "Trade Bank", "77-3")
        .await
        .unwrap();

    let err = shop
        .engine
        .record_payment(
            DocumentSide::Purchase,
            PaymentCmd::new(purchase, day(2), cents(5000), PaymentMethod::BankTransfer)
                .bank_account(account)
                .vendor_bank_account(foreign)
                .instrument_no("TRX-1"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ReferenceMismatch(_)));
}

#[tokio::test]
async fn quotations_take_no_payments() {
    let shop = Shop::new().await;
    let quotation = shop
        .engine
        .create_quotation(
            DocumentCmd::new(shop.customer, day(1))
                .line(LineCmd::new(shop.product, 1.0, "pcs", cents(1000))),
        )
        .await
        .unwrap();

    let err = shop
        .engine
        .record_payment(
            DocumentSide::Sale,
            PaymentCmd::new(quotation, day(2), cents(1000), PaymentMethod::Cash),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}
