// LLM abstraction layer

pub mod openai;
pub mod provider;
pub mod sse;

pub use openai::*;
pub use provider::*;
