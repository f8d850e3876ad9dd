pub mod backtester;
pub mod calibration;
pub mod candle_store;
pub mod classifier;
pub mod decision;
pub mod features;
pub mod ingest;
pub mod labeler;
pub mod model_service;
pub mod scaler;
pub mod trainer;

pub use backtester::{risk_ratios, BacktestError, Backtester, RiskRatios};
pub use calibration::{calibrate, Calibration, CalibrationError, ClassCalibration, RocCurve};
pub use candle_store::{CandleStore, StoreError, StoredDecision};
pub use classifier::{Classifier, CLASS_COUNT};
pub use features::{FeatureDeriver, FeatureError, Indicator};
pub use ingest::{BinanceKlines, IngestError};
pub use labeler::SignalLabeler;
pub use model_service::{ModelBundle, ModelError, ModelManifest, ModelService};
pub use scaler::RobustScaler;
pub use trainer::{TrainError, Trainer, TrainingConfig, TrainingOutcome};
