// ===============================
// src/positions.rs (per-position PnL view)
// ===============================

use crate::domain::{Position, PositionView};

impl PositionView {
    pub fn new(position: Position) -> Self {
        let total_pnl = position.unrealized_pnl + position.realized_pnl;
        // % of position value; no value -> 0
        let unrealized_pct = if position.position_value != 0.0 {
            position.unrealized_pnl / position.position_value * 100.0
        } else {
            0.0
        };
        Self {
            profitable: total_pnl >= 0.0,
            total_pnl,
            unrealized_pct,
            position,
        }
    }
}

/// Wholesale replacement of the positions panel, order kept as received.
pub fn project(positions: Vec<Position>) -> Vec<PositionView> {
    positions.into_iter().map(PositionView::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;

    fn pos(symbol: &str, unrealized: f64, realized: f64, value: f64) -> Position {
        Position {
            symbol: symbol.into(),
            direction: Direction::Long,
            size: 1.0,
            leverage: 2.0,
            margin: value / 2.0,
            entry_price: 10.0,
            current_price: 10.0,
            position_value: value,
            margin_ratio: 0.5,
            unrealized_pnl: unrealized,
            realized_pnl: realized,
            recommended_stop_loss: None,
            recommended_take_profit: None,
        }
    }

    #[test]
    fn totals_and_percentages() {
        let v = PositionView::new(pos("MANA/USDT", 0.205, 0.0, 23.47));
        assert!(v.profitable);
        assert!((v.unrealized_pct - 0.8734).abs() < 1e-3);

        let v = PositionView::new(pos("GMX/USDT", -0.0594, 0.01, 30.30));
        assert!(!v.profitable);
        assert!((v.total_pnl - (-0.0494)).abs() < 1e-9);
    }

    #[test]
    fn zero_position_value_gives_zero_pct() {
        let v = PositionView::new(pos("X", 5.0, 0.0, 0.0));
        assert_eq!(v.unrealized_pct, 0.0);
    }

    #[test]
    fn projection_keeps_order() {
        let views = project(vec![pos("B", 0.0, 0.0, 1.0), pos("A", 0.0, 0.0, 1.0)]);
        let symbols: Vec<_> = views.iter().map(|v| v.position.symbol.as_str()).collect();
        assert_eq!(symbols, ["B", "A"]);
    }
}
