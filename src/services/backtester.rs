//! Backtesting Engine
//!
//! Replays a decision sequence against historical prices.
//! Features:
//! - All-in / all-out long-only position accounting
//! - Forced liquidation of an open position at the final price
//! - Equity curve generation
//! - Trade log with win rate and drawdown metrics
//! - Sharpe, Sortino and Calmar ratios over per-step equity returns
//! - Buy-and-hold comparison

use crate::types::{
    BacktestReport, BacktestStep, BacktestTrade, BalancePoint, Decision, PortfolioState,
};
use thiserror::Error;
use tracing::{debug, info};

/// Backtesting errors.
#[derive(Debug, Error, PartialEq)]
pub enum BacktestError {
    #[error("No decisions to replay")]
    Empty,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid price {price} at {time}")]
    InvalidPrice { time: i64, price: f64 },
    #[error("Step at {time} is not after the previous step")]
    OutOfOrder { time: i64 },
}

/// Open position bookkeeping.
#[derive(Debug, Clone, Copy)]
struct OpenPosition {
    entry_time: i64,
    entry_price: f64,
    cost: f64,
}

impl OpenPosition {
    fn close(&self, exit_time: i64, exit_price: f64, proceeds: f64, forced: bool) -> BacktestTrade {
        let pnl = proceeds - self.cost;
        BacktestTrade {
            entry_time: self.entry_time,
            entry_price: self.entry_price,
            exit_time,
            exit_price,
            pnl,
            pnl_pct: pnl / self.cost * 100.0,
            forced,
        }
    }
}

/// Risk-adjusted ratios of an equity curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskRatios {
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
}

fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance: f64 =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Per-step ratios, not annualized. Zero whenever the denominator is zero.
pub fn risk_ratios(
    equity: &[f64],
    risk_free_rate: f64,
    total_return_pct: f64,
    max_drawdown_pct: f64,
) -> RiskRatios {
    let returns: Vec<f64> = equity
        .windows(2)
        .map(|w| w[1] / w[0] - 1.0 - risk_free_rate)
        .collect();
    let mean = if returns.is_empty() {
        0.0
    } else {
        returns.iter().sum::<f64>() / returns.len() as f64
    };

    let volatility = std_dev(&returns, mean);
    let sharpe = if volatility > 0.0 { mean / volatility } else { 0.0 };

    // Downside deviation around zero, over losing steps only
    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let downside_deviation = std_dev(&downside, 0.0);
    let sortino = if downside_deviation > 0.0 {
        mean / downside_deviation
    } else {
        0.0
    };

    let calmar = if max_drawdown_pct > 0.0 {
        total_return_pct / max_drawdown_pct
    } else {
        0.0
    };

    RiskRatios {
        sharpe,
        sortino,
        calmar,
    }
}

/// Decision replay engine.
#[derive(Debug, Clone, Copy)]
pub struct Backtester {
    initial_balance: f64,
    risk_free_rate: f64,
}

impl Backtester {
    pub fn new(initial_balance: f64) -> Self {
        Self {
            initial_balance,
            risk_free_rate: 0.0,
        }
    }

    /// Per-step risk-free return subtracted before the Sharpe and Sortino ratios.
    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    pub fn initial_balance(&self) -> f64 {
        self.initial_balance
    }

    /// Replay `steps` in order, starting fully in cash.
    pub fn run(&self, steps: &[BacktestStep]) -> Result<BacktestReport, BacktestError> {
        if !(self.initial_balance.is_finite() && self.initial_balance > 0.0) {
            return Err(BacktestError::InvalidConfig(
                "Initial balance must be positive".to_string(),
            ));
        }
        let (first, last) = match (steps.first(), steps.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(BacktestError::Empty),
        };

        let mut state = PortfolioState::new(self.initial_balance);
        let mut position: Option<OpenPosition> = None;
        let mut trades = Vec::new();
        let mut trajectory = Vec::with_capacity(steps.len());
        let mut peak_equity = self.initial_balance;
        let mut max_drawdown = 0.0_f64;
        let mut previous_time: Option<i64> = None;

        for step in steps {
            if !(step.price.is_finite() && step.price > 0.0) {
                return Err(BacktestError::InvalidPrice {
                    time: step.time,
                    price: step.price,
                });
            }
            if previous_time.is_some_and(|t| step.time <= t) {
                return Err(BacktestError::OutOfOrder { time: step.time });
            }
            previous_time = Some(step.time);

            match step.decision {
                Decision::Buy if !state.is_invested() => {
                    position = Some(OpenPosition {
                        entry_time: step.time,
                        entry_price: step.price,
                        cost: state.balance,
                    });
                    state.stake = state.balance / step.price;
                    state.balance = 0.0;
                    state.entry_price = Some(step.price);
                    debug!("Buy at {} ({}), stake {:.6}", step.price, step.time, state.stake);
                }
                Decision::Sell if state.is_invested() => {
                    state.balance = state.stake * step.price;
                    state.stake = 0.0;
                    state.entry_price = None;
                    if let Some(open) = position.take() {
                        trades.push(open.close(step.time, step.price, state.balance, false));
                    }
                    debug!("Sell at {} ({}), balance {:.2}", step.price, step.time, state.balance);
                }
                _ => {}
            }

            let equity = state.equity(step.price);
            if equity > peak_equity {
                peak_equity = equity;
            }
            let drawdown = (peak_equity - equity) / peak_equity * 100.0;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }

            trajectory.push(BalancePoint {
                time: step.time,
                price: step.price,
                decision: step.decision,
                balance: state.balance,
                stake: state.stake,
                equity,
            });
        }

        // Realize whatever is still held at the final price
        if state.is_invested() {
            state.balance = state.stake * last.price;
            state.stake = 0.0;
            state.entry_price = None;
            if let Some(open) = position.take() {
                trades.push(open.close(last.time, last.price, state.balance, true));
            }
        }

        let final_balance = state.balance;
        let winners = trades.iter().filter(|t| t.is_winner()).count();
        let win_rate_pct = if trades.is_empty() {
            0.0
        } else {
            winners as f64 / trades.len() as f64 * 100.0
        };

        let total_return_pct =
            (final_balance - self.initial_balance) / self.initial_balance * 100.0;
        let mut equity_curve = Vec::with_capacity(trajectory.len() + 1);
        equity_curve.push(self.initial_balance);
        equity_curve.extend(trajectory.iter().map(|p| p.equity));
        let ratios = risk_ratios(
            &equity_curve,
            self.risk_free_rate,
            total_return_pct,
            max_drawdown,
        );

        let report = BacktestReport {
            initial_balance: self.initial_balance,
            final_balance,
            total_return_pct,
            buy_and_hold_return_pct: (last.price / first.price - 1.0) * 100.0,
            max_drawdown_pct: max_drawdown,
            sharpe_ratio: ratios.sharpe,
            sortino_ratio: ratios.sortino,
            calmar_ratio: ratios.calmar,
            trade_count: trades.len(),
            win_rate_pct,
            trades,
            trajectory,
        };

        info!(
            "Backtest completed: {} steps, {} trades, {:.2}% return (B&H {:.2}%), sharpe {:.3}",
            steps.len(),
            report.trade_count,
            report.total_return_pct,
            report.buy_and_hold_return_pct,
            report.sharpe_ratio
        );

        Ok(report)
    }
}
