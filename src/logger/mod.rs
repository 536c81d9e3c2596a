//! Process-wide `tracing` setup. Modules log through the `tracing` macros directly.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
