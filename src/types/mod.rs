pub mod backtest;
pub mod candle;
pub mod model;
pub mod signal;

pub use backtest::*;
pub use candle::*;
pub use model::*;
pub use signal::*;
