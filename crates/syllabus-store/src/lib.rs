//! Plan model, request validation and the in-memory plan registry.

pub mod config;
pub mod models;
pub mod registry;
pub mod request;

pub use config::RegistryConfig;
pub use models::{
    FormatParseError, KnowledgeGap, LearningFormat, LearningPlan, PlanSummary, PlanSynthesis,
    RequestMetadata, StageKind, StoredPlan, TopicDetail, TopicPlan, UserInput,
};
pub use registry::{InMemoryPlanRegistry, ListQuery, Page, PlanStore, RegistryError};
pub use request::{PlanRequest, ValidationError};
