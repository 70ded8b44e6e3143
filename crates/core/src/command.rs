//! Command-line assembly for plugin containers.
//!
//! [`build_command`] turns a [`JobDescriptor`] into the exact string the
//! execution service runs inside the job container. Intermediate state is an
//! ordered [`CommandLine`] of tokens; it is joined into a string only once,
//! at the end.

use std::fmt;
use std::path::Path;

use crate::descriptor::JobDescriptor;
use crate::error::CoreError;

/// Input directory mounted into every job container.
pub const CONTAINER_INPUT_DIR: &str = "/share/incoming";

/// Output directory mounted into every job container.
pub const CONTAINER_OUTPUT_DIR: &str = "/share/outgoing";

// ---------------------------------------------------------------------------
// Mount paths
// ---------------------------------------------------------------------------

/// In-container data directories, shared by every job in the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPaths {
    pub input_dir: String,
    pub output_dir: String,
}

impl Default for MountPaths {
    fn default() -> Self {
        Self {
            input_dir: CONTAINER_INPUT_DIR.to_string(),
            output_dir: CONTAINER_OUTPUT_DIR.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// Ordered list of command tokens. Empty tokens are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    tokens: Vec<String>,
}

impl CommandLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: impl Into<String>) {
        let token = token.into();
        if !token.is_empty() {
            self.tokens.push(token);
        }
    }

    pub fn extend<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for token in tokens {
            self.push(token);
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Build the command line the execution service runs for `descriptor`.
///
/// Layout:
/// - `ds`: `<shell> <exec> <input_dir> <output_dir> <args>`
/// - `fs` / `ts`: `<shell> <exec> <output_dir> <args>`
///
/// When the descriptor lists path flags, the token following each one is
/// replaced with the container input directory. Any original value,
/// including a comma-separated list of several paths, collapses to that
/// single directory. Without path flags the arguments pass through as one
/// token with leading and trailing whitespace dropped.
///
/// Returns [`CoreError::UnsupportedPluginType`] for any other plugin type.
pub fn build_command(descriptor: &JobDescriptor, mounts: &MountPaths) -> Result<String, CoreError> {
    let plugin_type = descriptor.plugin_kind()?;

    let mut cmd = CommandLine::new();
    cmd.push(descriptor.exec_shell.trim());
    cmd.push(executable_path(&descriptor.exec_path, &descriptor.exec_name));

    if plugin_type.reads_input() {
        cmd.push(mounts.input_dir.as_str());
    }
    cmd.push(mounts.output_dir.as_str());

    let path_flags = descriptor.path_flag_list();
    if path_flags.is_empty() {
        cmd.push(descriptor.args.trim());
    } else {
        cmd.extend(rewrite_path_args(
            &descriptor.args,
            &path_flags,
            &mounts.input_dir,
        ));
    }

    Ok(cmd.to_string())
}

/// Join the executable directory and name the way a shell path join does:
/// an absolute name wins, an empty directory leaves the bare name.
fn executable_path(exec_path: &str, exec_name: &str) -> String {
    Path::new(exec_path)
        .join(exec_name)
        .to_string_lossy()
        .into_owned()
}

/// Tokenize `args` on whitespace and replace the value after every
/// recognized flag with `input_dir`.
fn rewrite_path_args(args: &str, path_flags: &[&str], input_dir: &str) -> Vec<String> {
    let mut tokens: Vec<String> = args.split_whitespace().map(str::to_owned).collect();
    for i in 0..tokens.len().saturating_sub(1) {
        if path_flags.contains(&tokens[i].as_str()) {
            tokens[i + 1] = input_dir.to_owned();
        }
    }
    tokens
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
