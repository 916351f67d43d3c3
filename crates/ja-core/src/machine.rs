//! Identity of the machine the agent runs on.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::MachineConfig;

/// Boot identity and operator-assigned metadata of a machine.
///
/// Immutable once built; the agent holds one for its whole lifetime.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Machine {
    boot_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    public_ip: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl Machine {
    pub fn new(
        boot_id: impl Into<String>,
        public_ip: Option<String>,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            boot_id: boot_id.into(),
            public_ip,
            metadata,
        }
    }

    /// Build the machine from configuration.
    ///
    /// An explicit `boot_id` wins; otherwise it is read from `boot_id_path`.
    /// If that fails the boot id is left empty, so only units that do not
    /// target a boot id can be admitted.
    pub fn from_config(config: &MachineConfig) -> Self {
        let boot_id = match &config.boot_id {
            Some(id) => id.clone(),
            None => read_boot_id(&config.boot_id_path).unwrap_or_else(|e| {
                tracing::warn!(
                    path = %config.boot_id_path.display(),
                    error = %e,
                    "failed to read boot id, continuing without one"
                );
                String::new()
            }),
        };

        Self::new(boot_id, config.public_ip.clone(), config.metadata.clone())
    }

    /// Empty when unknown.
    pub fn boot_id(&self) -> &str {
        &self.boot_id
    }

    pub fn public_ip(&self) -> Option<&str> {
        self.public_ip.as_deref()
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Whether metadata `key` is set to exactly `value`.
    pub fn has_metadata(&self, key: &str, value: &str) -> bool {
        self.metadata.get(key).is_some_and(|v| v == value)
    }
}

fn read_boot_id(path: &Path) -> std::io::Result<String> {
    std::fs::read_to_string(path).map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn metadata(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn has_metadata_is_exact_and_case_sensitive() {
        let m = Machine::new("", None, metadata(&[("region", "us-west-1")]));
        assert!(m.has_metadata("region", "us-west-1"));
        assert!(!m.has_metadata("region", "US-WEST-1"));
        assert!(!m.has_metadata("Region", "us-west-1"));
        assert!(!m.has_metadata("az", "us-west-1"));
    }

    #[test]
    fn from_config_prefers_explicit_boot_id() {
        let cfg = MachineConfig {
            boot_id: Some("XYZ".to_string()),
            boot_id_path: PathBuf::from("/nonexistent/boot_id"),
            public_ip: Some("10.0.0.1".to_string()),
            metadata: metadata(&[("region", "us-west-1")]),
        };
        let m = Machine::from_config(&cfg);
        assert_eq!(m.boot_id(), "XYZ");
        assert_eq!(m.public_ip(), Some("10.0.0.1"));
        assert!(m.has_metadata("region", "us-west-1"));
    }

    #[test]
    fn from_config_reads_boot_id_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  0f2c6d1e-boot  ").unwrap();

        let cfg = MachineConfig {
            boot_id_path: file.path().to_path_buf(),
            ..Default::default()
        };
        assert_eq!(Machine::from_config(&cfg).boot_id(), "0f2c6d1e-boot");
    }

    #[test]
    fn from_config_missing_boot_id_file_leaves_it_empty() {
        let cfg = MachineConfig {
            boot_id_path: PathBuf::from("/nonexistent/boot_id"),
            ..Default::default()
        };
        let m = Machine::from_config(&cfg);
        assert_eq!(m.boot_id(), "");
        assert!(m.metadata().is_empty());
    }

    #[test]
    fn serde_round_trip() {
        let m = Machine::new("abc", None, metadata(&[("role", "db")]));
        let json = serde_json::to_string(&m).unwrap();
        assert!(!json.contains("public_ip"));
        let back: Machine = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
