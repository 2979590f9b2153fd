//! Export functionality: display summaries and reminder messages.

mod reminder;
mod summary;

pub use reminder::*;
pub use summary::*;
