// Library interface for edgescore modules
// This allows the CLI, integration tests and benches to share the pipeline

pub mod config;
pub mod database;
pub mod drift;
pub mod edge_score;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod physiology;
pub mod prediction;
pub mod protocols;
pub mod rules;
pub mod store;

// Re-export commonly used types for convenience
pub use models::*;
pub use config::AppConfig;
pub use database::Database;
pub use drift::{DriftResult, DriftStatus};
pub use edge_score::{compute_edge_score, ComponentLabel, EdgeScoreResult, ScoringMode};
pub use error::{EdgeError, Result, StoreError};
pub use events::{compute_event_plan, EventPlan, EventType};
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
pub use prediction::{
    Evaluation, ModelConfig, PredictionEngine, PredictionResult, RiskLevel, ScoringPolicy,
};
pub use rules::Rule;
pub use store::{HistoryStore, InMemoryStore};
