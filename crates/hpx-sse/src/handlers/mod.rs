//! Ready-made protocol handlers.
//!
//! - [`GenericSseHandler`]: standard parser, default retry policy

mod generic;

pub use generic::GenericSseHandler;
