pub mod config;
pub mod error;
pub mod llm;
pub mod materials;
pub mod models;
pub mod orchestrator;
pub mod stages;
pub mod store;
pub mod style;

pub use config::PipelineConfig;
pub use error::{BackendError, BackendErrorKind, OrchestratorError, StoreError};
pub use llm::{AnthropicClient, AnthropicConfig, TextBackend, TimeoutBackend};
pub use materials::{classify_materials, MaterialConfig};
pub use models::{
    Channel, ConfirmationPayload, MaterialItem, Stage, StageOutput, StageParams, StyleExemplar,
    StyleProfile, Task, TaskStatus, TaskSummary,
};
pub use orchestrator::{
    BroadcastNotifier, CheckpointTable, CreatedTask, EngineSettings, Orchestrator, StageReport,
    TaskEvent, TaskNotifier,
};
pub use stages::{execute_stage, StageConfig};
pub use store::{Catalog, JsonDirStore, MemoryStore, TaskStore};
pub use style::{match_style, topic_keywords, StyleWeights};
