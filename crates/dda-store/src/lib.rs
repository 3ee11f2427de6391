pub mod error;
pub mod loader;
pub mod schema;
pub mod session;
pub mod settings;

pub use error::{Result, StoreError};
pub use loader::{ConfigFormat, load_config, load_config_strict, parse_config};
pub use session::{CycleRecord, RuleStat, SessionLog, SessionSummary, TrainingRow};
pub use settings::{SeriesSettings, Settings, default_base_dir};
