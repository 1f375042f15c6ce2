pub mod engine;

pub use engine::{ChatEngine, ChatOutcome};
