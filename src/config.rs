use crate::services::ingest::BINANCE_API_URL;
use crate::services::labeler::{SignalLabeler, DEFAULT_DISTANCE_FRACTION};
use std::env;
use std::path::PathBuf;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// SQLite database holding candle history.
    pub database_path: PathBuf,
    /// Model bundle directory.
    pub model_dir: PathBuf,
    /// Asset symbol traded by this instance.
    pub asset: String,
    /// Candles fetched for one live inference.
    pub inference_window: usize,
    /// Candles replayed by the backtest endpoint when no limit is given.
    pub backtest_window: usize,
    /// Starting capital for backtests.
    pub initial_balance: f64,
    /// Labeler separation as a fraction of series length.
    pub label_distance_fraction: f64,
    /// Candles after an extremum that share its label.
    pub label_widen: usize,
    /// Binance REST base URL.
    pub binance_api_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3105,
            database_path: PathBuf::from("database.sqlite"),
            model_dir: PathBuf::from("models/neural_net_model"),
            asset: "BTCUSDT".to_string(),
            inference_window: 120,
            backtest_window: 1440,
            initial_balance: 1000.0,
            label_distance_fraction: DEFAULT_DISTANCE_FRACTION,
            label_widen: 1,
            binance_api_url: BINANCE_API_URL.to_string(),
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parsed("PORT", defaults.port),
            database_path: env::var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            model_dir: env::var("MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            asset: env::var("ASSET").unwrap_or(defaults.asset),
            inference_window: parsed("INFERENCE_WINDOW", defaults.inference_window),
            backtest_window: parsed("BACKTEST_WINDOW", defaults.backtest_window),
            initial_balance: parsed("INITIAL_BALANCE", defaults.initial_balance),
            label_distance_fraction: parsed(
                "LABEL_DISTANCE_FRACTION",
                defaults.label_distance_fraction,
            ),
            label_widen: parsed("LABEL_WIDEN", defaults.label_widen),
            binance_api_url: env::var("BINANCE_API_URL").unwrap_or(defaults.binance_api_url),
        }
    }

    /// Labeler built from the label settings.
    pub fn labeler(&self) -> SignalLabeler {
        SignalLabeler::new(self.label_distance_fraction, self.label_widen)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 3105);
        assert_eq!(config.asset, "BTCUSDT");
        assert_eq!(config.addr(), "0.0.0.0:3105");
        assert_eq!(config.labeler(), SignalLabeler::default());
    }
}
