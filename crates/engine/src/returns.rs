//! Return valuation and settlement arithmetic.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DocumentLine, DocumentSide, MoneyCents};

/// How the value of a return is paid back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Settlement {
    /// Cash back now, capped at what was paid; any remainder becomes credit.
    Refund,
    /// The whole value goes to the party's advance ledger.
    CreditNote,
}

/// Quantity still returnable on a document line, in the line's unit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReturnableLine {
    pub item_id: i64,
    pub product_id: Uuid,
    pub uom: String,
    pub posted: f64,
    pub returned: f64,
    pub remaining: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReturnOutcome {
    pub transaction_ids: Vec<i64>,
    pub value: MoneyCents,
    pub refunded: MoneyCents,
    pub credited: MoneyCents,
    pub payment_id: Option<i64>,
    pub advance_tx_id: Option<i64>,
}

/// Share of the order discount a sale return carries:
/// `total_after_discount / subtotal_before_discount`.
pub fn proration_factor(subtotal: MoneyCents, total: MoneyCents) -> f64 {
    if subtotal.is_positive() {
        total.as_f64() / subtotal.as_f64()
    } else {
        0.0
    }
}

/// Value of returning `quantity` units of each line.
///
/// Purchases are valued at the original net purchase price; sales at the
/// net unit price scaled by `factor`. Rounded once, to the nearest cent.
pub fn return_value(side: DocumentSide, lines: &[(&DocumentLine, f64)], factor: f64) -> MoneyCents {
    let raw: f64 = lines
        .iter()
        .map(|(line, quantity)| line.net_unit_price().as_f64() * quantity)
        .sum();
    match side {
        DocumentSide::Purchase => MoneyCents::from_f64(raw),
        DocumentSide::Sale => MoneyCents::from_f64(raw * factor),
    }
}

/// Splits a refund into the cash part (never more than `paid`) and the part
/// that has to become credit.
pub fn split_refund(value: MoneyCents, paid: MoneyCents) -> (MoneyCents, MoneyCents) {
    let cash = value.min(paid.non_negative());
    (cash, value - cash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: f64, price: i64, discount: i64) -> DocumentLine {
        DocumentLine {
            item_id: 7,
            document_id: Uuid::nil(),
            product_id: Uuid::nil(),
            quantity,
            uom: "pcs".to_string(),
            unit_price: MoneyCents::new(price),
            item_discount: MoneyCents::new(discount),
            sale_price: MoneyCents::ZERO,
        }
    }

    #[test]
    fn sale_return_without_order_discount() {
        let sold = line(2.0, 5000, 0);
        let factor = proration_factor(MoneyCents::new(10_000), MoneyCents::new(10_000));
        assert_eq!(factor, 1.0);
        assert_eq!(
            return_value(DocumentSide::Sale, &[(&sold, 1.0)], factor).cents(),
            5000
        );
    }

    #[test]
    fn sale_return_carries_its_share_of_the_order_discount() {
        let sold = line(4.0, 2500, 0);
        let factor = proration_factor(MoneyCents::new(10_000), MoneyCents::new(9000));
        assert_eq!(
            return_value(DocumentSide::Sale, &[(&sold, 2.0)], factor).cents(),
            4500
        );
    }

    #[test]
    fn purchase_return_ignores_proration() {
        let bought = line(10.0, 700, 100);
        assert_eq!(
            return_value(DocumentSide::Purchase, &[(&bought, 3.0)], 0.5).cents(),
            1800
        );
    }

    #[test]
    fn empty_subtotal_prorates_to_zero() {
        assert_eq!(proration_factor(MoneyCents::ZERO, MoneyCents::ZERO), 0.0);
    }

    #[test]
    fn refund_is_capped_by_paid() {
        assert_eq!(
            split_refund(MoneyCents::new(5000), MoneyCents::new(2000)),
            (MoneyCents::new(2000), MoneyCents::new(3000))
        );
        assert_eq!(
            split_refund(MoneyCents::new(5000), MoneyCents::new(9000)),
            (MoneyCents::new(5000), MoneyCents::ZERO)
        );
    }
}
