//! On-disk persistence for pipeline artifacts.

pub mod artifacts;

pub use artifacts::{read_json, read_json_opt, write_json, ArtifactError};
