//! # bulk-import
//!
//! Sequential bulk importer for Unity packages.
//!
//! ## Design Philosophy
//!
//! bulk-import is designed to be:
//! - **One at a time** - Exactly one import call is outstanding; the next entry
//!   starts only when the host reports the previous one finished
//! - **Restart tolerant** - A durable marker lets a new process resolve an
//!   import that was cut short by a reload or crash
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! Bundles are added directly, from inside zip containers, or by scanning a
//! folder. Each bundle is inspected without unpacking it, and the packages it
//! declares as dependencies are listed next to it with their install state.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bulk_import::{Config, ImportOrchestrator};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.importer.program = Some(PathBuf::from("unity-import"));
//!     config.packages_dir = Some(PathBuf::from("MyProject/Packages"));
//!
//!     let orchestrator = ImportOrchestrator::new(config).await?;
//!
//!     // Subscribe to events
//!     let mut events = orchestrator.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     orchestrator.add("Downloads/Avatars").await?;
//!     orchestrator.start().await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Outer containers (zip) holding bundles
pub mod container;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Host import capability
pub mod importer;
/// Bundle inspection and dependency descriptors
pub mod inspector;
/// Drain notification backends
pub mod notify;
/// Queue orchestration (decomposed into focused submodules)
pub mod orchestrator;
/// Install-state lookup for declared dependencies
pub mod probe;
/// Queue model
pub mod queue;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::Config;
pub use container::{ContainerReader, ZipContainerReader};
pub use db::Database;
pub use error::{DatabaseError, Error, QueueError, Result};
pub use importer::{CommandImporter, Importer};
pub use inspector::{DependencyDescriptor, inspect};
pub use notify::{CommandNotifier, LogNotifier, NoOpNotifier, Notifier};
pub use orchestrator::{Capabilities, ImportOrchestrator};
pub use probe::{DirectoryPackageProbe, NoPackageProbe, PackageProbe};
pub use types::{
    BundleEntry, DrainSummary, EntryStatus, Event, ImportJobId, ImportOutcome, ImportSignal,
    QueueSnapshot, RecoveryReport, RunState,
};
