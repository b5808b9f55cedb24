mod common;

use common::{Shop, cents, day};
use engine::{AdvanceSource, CreditCmd, DocumentSide, EngineError, PartyKind, PaymentStatus};
use uuid::Uuid;

async fn sale_of(shop: &Shop, total: i64, date: chrono::NaiveDate) -> Uuid {
    shop.buy(1.0, 100, day(1)).await;
    shop.sell(1.0, total, date).await
}

#[tokio::test]
async fn credit_is_applied_within_balance_and_due() {
    let shop = Shop::new().await;
    let sale = sale_of(&shop, 5000, day(2)).await;
    shop.engine
        .grant_credit(
            PartyKind::Customer,
            CreditCmd::new(shop.customer, cents(10_000), day(1)).notes("advance"),
        )
        .await
        .unwrap();

    shop.engine
        .apply_credit_to_document(
            PartyKind::Customer,
            CreditCmd::new(shop.customer, cents(3000), day(3)),
            sale,
        )
        .await
        .unwrap();
    assert_eq!(
        shop.engine
            .get_balance(PartyKind::Customer, shop.customer)
            .await
            .unwrap(),
        cents(7000)
    );
    let header = shop.engine.document(DocumentSide::Sale, sale).await.unwrap();
    assert_eq!(header.credit_applied, cents(3000));
    assert_eq!(header.status, PaymentStatus::Unpaid);

    let err = shop
        .engine
        .apply_credit_to_document(
            PartyKind::Customer,
            CreditCmd::new(shop.customer, cents(8000), day(3)),
            sale,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientCredit(_)));

    let err = shop
        .engine
        .apply_credit_to_document(
            PartyKind::Customer,
            CreditCmd::new(shop.customer, cents(2500), day(3)),
            sale,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::OverApplication(_)));

    shop.engine
        .apply_credit_to_document(
            PartyKind::Customer,
            CreditCmd::new(shop.customer, cents(2000), day(4)),
            sale,
        )
        .await
        .unwrap();
    let header = shop.engine.document(DocumentSide::Sale, sale).await.unwrap();
    assert_eq!(header.credit_applied, cents(5000));
    assert_eq!(header.status, PaymentStatus::Unpaid);
    assert_eq!(
        shop.engine
            .get_balance(PartyKind::Customer, shop.customer)
            .await
            .unwrap(),
        cents(5000)
    );

    let applications = shop
        .engine
        .list_credit_applications(DocumentSide::Sale, sale)
        .await
        .unwrap();
    assert_eq!(applications.len(), 2);
    assert!(applications
        .iter()
        .all(|a| a.source_type == AdvanceSource::AppliedToSale && a.source_id == Some(sale)));
}

#[tokio::test]
async fn backdated_application_cannot_spend_a_later_deposit() {
    let shop = Shop::new().await;
    let sale = sale_of(&shop, 5000, day(2)).await;
    shop.engine
        .grant_credit(
            PartyKind::Customer,
            CreditCmd::new(shop.customer, cents(10_000), day(10)),
        )
        .await
        .unwrap();

    let err = shop
        .engine
        .apply_credit_to_document(
            PartyKind::Customer,
            CreditCmd::new(shop.customer, cents(1000), day(5)),
            sale,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientCredit(_)));

    shop.engine
        .apply_credit_to_document(
            PartyKind::Customer,
            CreditCmd::new(shop.customer, cents(1000), day(10)),
            sale,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn statement_carries_opening_balance() {
    let shop = Shop::new().await;
    let sale = sale_of(&shop, 5000, day(2)).await;
    shop.engine
        .grant_credit(
            PartyKind::Customer,
            CreditCmd::new(shop.customer, cents(10_000), day(1)),
        )
        .await
        .unwrap();
    shop.engine
        .apply_credit_to_document(
            PartyKind::Customer,
            CreditCmd::new(shop.customer, cents(3000), day(3)),
            sale,
        )
        .await
        .unwrap();
    shop.engine
        .grant_credit(
            PartyKind::Customer,
            CreditCmd::new(shop.customer, cents(500), day(6)),
        )
        .await
        .unwrap();

    assert_eq!(
        shop.engine
            .get_opening_balance(PartyKind::Customer, shop.customer, day(3))
            .await
            .unwrap(),
        cents(10_000)
    );

    let lines = shop
        .engine
        .list_ledger(PartyKind::Customer, shop.customer, Some(day(3)), Some(day(5)))
        .await
        .unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].entry.amount, cents(-3000));
    assert_eq!(lines[0].running_balance, cents(7000));

    let all = shop
        .engine
        .list_ledger(PartyKind::Customer, shop.customer, None, None)
        .await
        .unwrap();
    let balances: Vec<_> = all.iter().map(|l| l.running_balance).collect();
    assert_eq!(balances, vec![cents(10_000), cents(7000), cents(7500)]);
}

#[tokio::test]
async fn credit_must_target_the_party_document() {
    let shop = Shop::new().await;
    let sale = sale_of(&shop, 5000, day(2)).await;
    let stranger = shop.engine.create_customer("Someone Else").await.unwrap();
    shop.engine
        .grant_credit(
            PartyKind::Customer,
            CreditCmd::new(stranger, cents(10_000), day(1)),
        )
        .await
        .unwrap();

    let err = shop
        .engine
        .apply_credit_to_document(
            PartyKind::Customer,
            CreditCmd::new(stranger, cents(1000), day(3)),
            sale,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ReferenceMismatch(_)));

    let err = shop
        .engine
        .add_return_credit(
            PartyKind::Customer,
            CreditCmd::new(stranger, cents(1000), day(3)),
            Some(sale),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ReferenceMismatch(_)));
}

#[tokio::test]
async fn vendor_credit_settles_purchases() {
    let shop = Shop::new().await;
    let purchase = shop.buy(4.0, 1000, day(1)).await;
    shop.engine
        .add_return_credit(
            PartyKind::Vendor,
            CreditCmd::new(shop.vendor, cents(4000), day(2)),
            Some(purchase),
        )
        .await
        .unwrap();
    shop.engine
        .apply_credit_to_document(
            PartyKind::Vendor,
            CreditCmd::new(shop.vendor, cents(4000), day(3)),
            purchase,
        )
        .await
        .unwrap();

    let header = shop
        .engine
        .document(DocumentSide::Purchase, purchase)
        .await
        .unwrap();
    assert_eq!(header.credit_applied, cents(4000));
    assert_eq!(header.status, PaymentStatus::Unpaid);

    let ledger = shop
        .engine
        .list_ledger(PartyKind::Vendor, shop.vendor, None, None)
        .await
        .unwrap();
    let sources: Vec<_> = ledger.iter().map(|l| l.entry.source_type).collect();
    assert_eq!(
        sources,
        vec![AdvanceSource::ReturnCredit, AdvanceSource::AppliedToPurchase]
    );
    assert_eq!(
        shop.engine
            .get_balance(PartyKind::Vendor, shop.vendor)
            .await
            .unwrap(),
        cents(0)
    );
}

#[tokio::test]
async fn credit_inputs_are_validated() {
    let shop = Shop::new().await;

    let err = shop
        .engine
        .grant_credit(
            PartyKind::Customer,
            CreditCmd::new(shop.customer, cents(0), day(1)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = shop
        .engine
        .grant_credit(
            PartyKind::Customer,
            CreditCmd::new(Uuid::new_v4(), cents(100), day(1)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = shop
        .engine
        .grant_credit(
            PartyKind::Vendor,
            CreditCmd::new(shop.customer, cents(100), day(1)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}
