//! Moving-average valuation as a pure fold over the inventory ledger.
//!
//! Only purchases move the average cost. Sale returns and positive
//! adjustments put stock back at the current average; every decrease keeps
//! the average untouched.

use serde::Serialize;

use crate::{EPSILON, EngineError, InventoryTransaction, ResultEngine, TransactionType};

/// Quantity on hand and average unit cost, both in base units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct CostState {
    pub quantity: f64,
    pub unit_cost: f64,
}

/// The effect of one ledger row on a [`CostState`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Movement {
    /// Stock bought at `unit_cost` per base unit.
    Purchase { quantity: f64, unit_cost: f64 },
    /// Stock coming back in at the current average.
    Restock { quantity: f64 },
    /// Stock leaving.
    Issue { quantity: f64 },
}

impl Movement {
    /// Builds the movement of a ledger row. `purchase_unit_cost` is the net
    /// purchase price per base unit of the referenced line and is required
    /// for purchases only.
    pub fn for_entry(
        entry: &InventoryTransaction,
        purchase_unit_cost: Option<f64>,
    ) -> ResultEngine<Self> {
        let base = entry.base_quantity;
        let movement = match entry.transaction_type {
            TransactionType::Purchase => Self::Purchase {
                quantity: base.abs(),
                unit_cost: purchase_unit_cost.ok_or_else(|| {
                    EngineError::KeyNotFound(format!(
                        "purchase line of inventory transaction {}",
                        entry.transaction_id
                    ))
                })?,
            },
            TransactionType::SaleReturn => Self::Restock {
                quantity: base.abs(),
            },
            TransactionType::Sale | TransactionType::PurchaseReturn => Self::Issue {
                quantity: base.abs(),
            },
            TransactionType::Adjustment if base >= 0.0 => Self::Restock { quantity: base },
            TransactionType::Adjustment => Self::Issue { quantity: -base },
        };
        Ok(movement)
    }
}

impl CostState {
    pub const EMPTY: CostState = CostState {
        quantity: 0.0,
        unit_cost: 0.0,
    };

    pub fn new(quantity: f64, unit_cost: f64) -> Self {
        Self {
            quantity,
            unit_cost,
        }
    }

    pub fn total_value(&self) -> f64 {
        self.quantity * self.unit_cost
    }

    #[must_use]
    pub fn apply(self, movement: Movement) -> Self {
        match movement {
            Movement::Purchase {
                quantity,
                unit_cost,
            } => {
                let new_quantity = self.quantity + quantity;
                let new_cost = if self.quantity.abs() <= EPSILON {
                    unit_cost
                } else if new_quantity > EPSILON {
                    (self.quantity * self.unit_cost + quantity * unit_cost) / new_quantity
                } else {
                    self.unit_cost
                };
                Self::new(new_quantity, new_cost)
            }
            Movement::Restock { quantity } => Self::new(self.quantity + quantity, self.unit_cost),
            Movement::Issue { quantity } => Self::new(self.quantity - quantity, self.unit_cost),
        }
    }
}

/// Folds movements in ledger order starting from `seed`.
pub fn fold(seed: CostState, movements: impl IntoIterator<Item = Movement>) -> CostState {
    movements.into_iter().fold(seed, CostState::apply)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn purchases_blend_into_moving_average() {
        let state = fold(
            CostState::EMPTY,
            [
                Movement::Purchase {
                    quantity: 10.0,
                    unit_cost: 5.0,
                },
                Movement::Purchase {
                    quantity: 10.0,
                    unit_cost: 7.0,
                },
            ],
        );
        assert!(close(state.quantity, 20.0));
        assert!(close(state.unit_cost, 6.0));
        assert!(close(state.total_value(), 120.0));
    }

    #[test]
    fn issues_keep_the_average() {
        let state = CostState::new(20.0, 6.0).apply(Movement::Issue { quantity: 5.0 });
        assert!(close(state.quantity, 15.0));
        assert!(close(state.unit_cost, 6.0));
        assert!(close(state.total_value(), 90.0));
    }

    #[test]
    fn first_purchase_sets_cost_directly() {
        let state = CostState::EMPTY.apply(Movement::Purchase {
            quantity: 3.0,
            unit_cost: 1.1,
        });
        assert_eq!(state.unit_cost, 1.1);
    }

    #[test]
    fn restock_returns_at_current_average() {
        let state = CostState::new(4.0, 2.5).apply(Movement::Restock { quantity: 6.0 });
        assert!(close(state.quantity, 10.0));
        assert!(close(state.unit_cost, 2.5));
    }

    #[test]
    fn purchase_that_leaves_stock_negative_keeps_cost() {
        let state = CostState::new(-8.0, 4.0).apply(Movement::Purchase {
            quantity: 3.0,
            unit_cost: 9.0,
        });
        assert!(close(state.quantity, -5.0));
        assert!(close(state.unit_cost, 4.0));
    }
}
