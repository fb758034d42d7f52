pub mod scripted;
pub mod synthetic;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use scripted::ScriptedEstimator;
pub use synthetic::{SyntheticConfig, SyntheticEstimator};

#[cfg(feature = "backend-tract")]
pub use tract::TractMoveNet;
