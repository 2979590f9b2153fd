//! Domain models for the prescripto pipeline.

mod extraction;
mod medicine;
mod prescription;
mod reminder;
mod safety;

pub use extraction::*;
pub use medicine::*;
pub use prescription::*;
pub use reminder::*;
pub use safety::*;
