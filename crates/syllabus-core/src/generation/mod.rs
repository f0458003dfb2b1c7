//! Generation capability: the external text-generation dependency of every
//! workflow stage.
//!
//! # Architecture
//!
//! ```text
//! Stage
//!   |  GenerationRequest { template, inputs, shape }
//!   v
//! generate_record::<T>(generator, request, timeout)
//!   |        |
//!   |        +--> Arc<dyn Generator>::generate --> serde_json::Value
//!   |
//!   +--> deserialize into T, T::validate()  --> Ok(T) | GenerationError
//! ```

pub mod gemini;
pub mod shape;
pub mod trait_def;
pub mod types;
pub mod unavailable;

pub use gemini::{GeminiConfig, GeminiGenerator};
pub use shape::{Validate, check_fields, extract_json, generate_record, parse_object};
pub use trait_def::{GenerationError, Generator};
pub use types::{GenerationRequest, OutputShape, PromptTemplate};
pub use unavailable::UnavailableGenerator;
