//! Environment detection module.
//!
//! Determines whether the agent runs on the host or inside a container, and therefore where the
//! host root filesystem is mounted.
mod checks;
mod detect;
mod error;

pub use detect::{
    ContainerEvidence, RuntimeEnvironment, container_evidence, detect_runtime_environment,
};
pub use error::{Error, Result};
