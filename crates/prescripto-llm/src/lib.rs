//! Prompt construction and response parsing for the prescription vision model.
//!
//! This crate never calls a model. It builds the instructions sent with a
//! prescription image and turns whatever text comes back into a
//! [`prescripto_core::RawExtraction`] ready for normalization.

pub mod extraction;
pub mod prompts;

pub use extraction::*;
pub use prompts::*;
