// Mining session engine: decides start/stop transitions from energy readings.
pub mod machine;

pub use machine::{Evaluation, MiningEngine, MiningState, SkipReason};
