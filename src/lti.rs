//! LTI 1.x tool-provider side: consumer registry, launch parameters, signed-launch
//! verification, and the tool configuration descriptor.

pub mod consumer;
pub mod launch;
pub mod tool_config;
pub mod verifier;

pub use consumer::*;
pub use launch::*;
pub use tool_config::*;
pub use verifier::*;
