//! Abstract job descriptor supplied by the caller for every run.
//!
//! A [`JobDescriptor`] carries everything the execution service needs to
//! launch one containerized plugin: how to invoke it, which of its argument
//! flags take filesystem paths, which image to run, and how many resources
//! to give it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Plugin type
// ---------------------------------------------------------------------------

/// Data-flow shape of a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    /// Data stage: consumes the input directory, produces the output directory.
    Ds,
    /// Filesystem source: produces the output directory only.
    Fs,
    /// Terminal stage: produces the output directory only.
    Ts,
}

impl PluginType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ds => "ds",
            Self::Fs => "fs",
            Self::Ts => "ts",
        }
    }

    /// Whether the plugin reads from the container input directory.
    pub fn reads_input(self) -> bool {
        matches!(self, Self::Ds)
    }
}

impl FromStr for PluginType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ds" => Ok(Self::Ds),
            "fs" => Ok(Self::Fs),
            "ts" => Ok(Self::Ts),
            other => Err(CoreError::UnsupportedPluginType(other.to_string())),
        }
    }
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// Compute resources requested for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// CPU limit in millicores.
    pub cpu: u32,
    /// Memory limit in MiB.
    pub memory: u32,
    /// Number of GPUs.
    pub gpu: u32,
}

/// Everything needed to run one plugin job on the execution service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Job identifier. Callers usually pass it to `run` explicitly.
    #[serde(default)]
    pub job_id: Option<String>,
    /// Identifier of the user that owns the job.
    pub owner_id: String,
    /// Raw, whitespace-separated plugin arguments.
    #[serde(default)]
    pub args: String,
    /// Comma-separated flags whose values are filesystem paths.
    #[serde(default)]
    pub path_flags: String,
    /// Directory of the plugin executable inside the image.
    pub exec_path: String,
    /// Name of the plugin executable.
    pub exec_name: String,
    /// Interpreter prefix, e.g. `python3`.
    pub exec_shell: String,
    /// Raw plugin type as received; checked when the command is built.
    pub plugin_type: String,
    /// Container image reference.
    pub image: String,
    pub limits: ResourceLimits,
    pub worker_count: u32,
    /// Shared-storage directory for the job, if known up front.
    #[serde(default)]
    pub share_dir: Option<String>,
}

impl JobDescriptor {
    /// Parse the raw plugin type.
    pub fn plugin_kind(&self) -> Result<PluginType, CoreError> {
        self.plugin_type.parse()
    }

    /// Recognized path flags. Entries are trimmed and blanks dropped.
    pub fn path_flag_list(&self) -> Vec<&str> {
        self.path_flags
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .collect()
    }

    /// Check the fields the execution service cannot do without.
    ///
    /// The plugin type is not checked here; command building reports it as
    /// [`CoreError::UnsupportedPluginType`].
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.owner_id.trim().is_empty() {
            return Err(CoreError::Validation(
                "Owner id must not be empty".to_string(),
            ));
        }
        if self.image.trim().is_empty() {
            return Err(CoreError::Validation(
                "Container image must not be empty".to_string(),
            ));
        }
        if self.exec_name.trim().is_empty() {
            return Err(CoreError::Validation(
                "Executable name must not be empty".to_string(),
            ));
        }
        if self.exec_shell.trim().is_empty() {
            return Err(CoreError::Validation(
                "Executable shell must not be empty".to_string(),
            ));
        }
        if self.worker_count == 0 {
            return Err(CoreError::Validation(
                "Worker count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use assert_matches::assert_matches;

    use super::*;

    pub(crate) fn sample_descriptor() -> JobDescriptor {
        JobDescriptor {
            job_id: None,
            owner_id: "chris".to_string(),
            args: "--dir /x/y --flag".to_string(),
            path_flags: "--dir".to_string(),
            exec_path: "/app".to_string(),
            exec_name: "run.py".to_string(),
            exec_shell: "python3".to_string(),
            plugin_type: "ds".to_string(),
            image: "fnndsc/pl-simpledsapp".to_string(),
            limits: ResourceLimits {
                cpu: 1000,
                memory: 200,
                gpu: 0,
            },
            worker_count: 1,
            share_dir: None,
        }
    }

    #[test]
    fn plugin_type_parses_known_values() {
        assert_eq!("ds".parse::<PluginType>().unwrap(), PluginType::Ds);
        assert_eq!("fs".parse::<PluginType>().unwrap(), PluginType::Fs);
        assert_eq!("ts".parse::<PluginType>().unwrap(), PluginType::Ts);
    }

    #[test]
    fn plugin_type_rejects_unknown_value() {
        assert_matches!(
            "xs".parse::<PluginType>(),
            Err(CoreError::UnsupportedPluginType(t)) if t == "xs"
        );
        // Matching is exact.
        assert!("DS".parse::<PluginType>().is_err());
    }

    #[test]
    fn only_ds_reads_input() {
        assert!(PluginType::Ds.reads_input());
        assert!(!PluginType::Fs.reads_input());
        assert!(!PluginType::Ts.reads_input());
    }

    #[test]
    fn path_flag_list_trims_and_drops_blanks() {
        let mut d = sample_descriptor();
        d.path_flags = "--dir, --in,,".to_string();
        assert_eq!(d.path_flag_list(), vec!["--dir", "--in"]);

        d.path_flags = String::new();
        assert!(d.path_flag_list().is_empty());
    }

    #[test]
    fn validate_accepts_sample() {
        assert!(sample_descriptor().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_image() {
        let mut d = sample_descriptor();
        d.image = "  ".to_string();
        assert_matches!(d.validate(), Err(CoreError::Validation(msg)) if msg.contains("image"));
    }

    #[test]
    fn validate_rejects_blank_owner() {
        let mut d = sample_descriptor();
        d.owner_id = " ".to_string();
        assert_matches!(d.validate(), Err(CoreError::Validation(msg)) if msg.contains("Owner"));
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let mut d = sample_descriptor();
        d.worker_count = 0;
        assert_matches!(d.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn validate_ignores_plugin_type() {
        let mut d = sample_descriptor();
        d.plugin_type = "bogus".to_string();
        assert!(d.validate().is_ok());
    }

    #[test]
    fn deserializes_with_optional_fields_missing() {
        let json = serde_json::json!({
            "owner_id": "chris",
            "exec_path": "/usr/local/bin",
            "exec_name": "simplefsapp",
            "exec_shell": "python3",
            "plugin_type": "fs",
            "image": "fnndsc/pl-simplefsapp",
            "limits": { "cpu": 1000, "memory": 300, "gpu": 0 },
            "worker_count": 1
        });
        let d: JobDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(d.args, "");
        assert_eq!(d.path_flags, "");
        assert!(d.job_id.is_none());
        assert!(d.share_dir.is_none());
        assert_eq!(d.plugin_kind().unwrap(), PluginType::Fs);
    }
}
