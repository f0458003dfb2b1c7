//! Learning plan generation: the staged workflow, its generation providers
//! and the batch coordinator.

pub mod batch;
pub mod generation;
pub mod prompts;
pub mod stage;
pub mod workflow;

#[cfg(test)]
mod test_support;

pub use batch::{BatchConfig, BatchCoordinator, BatchItem, BatchReport, ItemError, submit_plan};
pub use generation::{GenerationError, GenerationRequest, Generator};
pub use stage::{Stage, StageContext};
pub use workflow::{PlanRun, WorkflowConfig, WorkflowEngine, WorkflowError, WorkflowState};
