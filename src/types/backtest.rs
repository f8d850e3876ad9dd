use serde::{Deserialize, Serialize};

use super::Decision;

/// One replayed time step: the decision taken at a price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestStep {
    pub time: i64,
    pub decision: Decision,
    pub price: f64,
}

impl BacktestStep {
    pub fn new(time: i64, decision: Decision, price: f64) -> Self {
        Self {
            time,
            decision,
            price,
        }
    }
}

/// Portfolio state during a replay. Either fully in cash or fully invested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioState {
    /// Cash balance.
    pub balance: f64,
    /// Units of the asset held.
    pub stake: f64,
    /// Price paid for the current stake.
    pub entry_price: Option<f64>,
}

impl PortfolioState {
    /// Start fully in cash.
    pub fn new(initial_balance: f64) -> Self {
        Self {
            balance: initial_balance,
            stake: 0.0,
            entry_price: None,
        }
    }

    pub fn is_invested(&self) -> bool {
        self.stake > 0.0
    }

    /// Marked-to-market value at a price.
    pub fn equity(&self, price: f64) -> f64 {
        self.balance + self.stake * price
    }
}

/// Portfolio value after one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancePoint {
    pub time: i64,
    pub price: f64,
    pub decision: Decision,
    pub balance: f64,
    pub stake: f64,
    pub equity: f64,
}

/// Completed buy → sell round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestTrade {
    pub entry_time: i64,
    pub entry_price: f64,
    pub exit_time: i64,
    pub exit_price: f64,
    /// Cash gained or lost on the round trip.
    pub pnl: f64,
    pub pnl_pct: f64,
    /// Closed by end-of-replay liquidation rather than a sell decision.
    pub forced: bool,
}

impl BacktestTrade {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}

/// Outcome of replaying a decision sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestReport {
    pub initial_balance: f64,
    pub final_balance: f64,
    pub total_return_pct: f64,
    /// Return of buying at the first price and selling at the last.
    pub buy_and_hold_return_pct: f64,
    pub max_drawdown_pct: f64,
    /// Mean per-step equity return over its standard deviation.
    pub sharpe_ratio: f64,
    /// Mean per-step equity return over the downside deviation.
    pub sortino_ratio: f64,
    /// Total return over maximum drawdown.
    pub calmar_ratio: f64,
    pub trade_count: usize,
    pub win_rate_pct: f64,
    pub trades: Vec<BacktestTrade>,
    pub trajectory: Vec<BalancePoint>,
}

impl BacktestReport {
    /// Final P&L in cash.
    pub fn pnl(&self) -> f64 {
        self.final_balance - self.initial_balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portfolio_starts_in_cash() {
        let state = PortfolioState::new(1000.0);
        assert!(!state.is_invested());
        assert_eq!(state.equity(123.0), 1000.0);
        assert_eq!(state.entry_price, None);
    }

    #[test]
    fn test_step_serialization() {
        let step = BacktestStep::new(7, Decision::Buy, 100.0);
        let json = serde_json::to_string(&step).unwrap();
        assert!(json.contains("\"decision\":\"buy\""));
    }
}
