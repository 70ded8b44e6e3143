//! Pure job-orchestration domain logic.
//!
//! Nothing in this crate performs I/O. It turns a [`JobDescriptor`] into
//! the command line the execution service runs inside the job container,
//! and sanitizes caller-supplied filenames before they become transport
//! metadata for the data-transfer service.

pub mod command;
pub mod descriptor;
pub mod error;
pub mod filename;

pub use command::{build_command, CommandLine, MountPaths};
pub use descriptor::{JobDescriptor, PluginType, ResourceLimits};
pub use error::CoreError;
pub use filename::sanitize_filename;
