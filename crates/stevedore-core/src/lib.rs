//! Composition and packaging engine for Stevedore.
//!
//! This crate turns an immutable `Configuration` into Dockerfiles. The
//! composer renders an ordered `DockerfileDocument`, the generator registry
//! exposes it behind the `PackageGenerator` capability, and the `Packager`
//! partitions an installed staging tree into components or groups, writes one
//! build context per partition and optionally drives the image builder.

pub mod compose;
pub mod dockerfile;
pub mod fsutil;
pub mod generator;
pub mod packager;
pub mod partition;

pub use compose::{compose, ComposeContext, Composition, HEADER};
pub use dockerfile::{Directive, DockerfileDocument, Section};
pub use fsutil::{enumerate_files, relocate_tree, relocate_tree_excluding, write_atomic};
pub use generator::{select_generator, DockerGenerator, PackageGenerator, GENERATORS};
pub use packager::{PackageReport, Packager, PartitionOutcome, DOCKERFILE_NAME, TREE_DIR};
pub use partition::{plan_partitions, PackagingMode, PartitionPlan, PartitionSource};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(#[from] stevedore_schema::ConfigError),
    #[error("runtime error: {0}")]
    Runtime(#[from] stevedore_runtime::RuntimeError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot find any files in the installed tree of partition '{partition}': {}", path.display())]
    DirectoryEnumeration { partition: String, path: PathBuf },
    #[error("unknown generator '{0}'")]
    UnknownGenerator(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
