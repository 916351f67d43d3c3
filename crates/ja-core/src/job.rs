//! Named units of work offered to the agent.

use ja_unit::UnitFile;
use serde::{Deserialize, Serialize};

use crate::admission::{self, Condition};

/// A unit file under the name it is scheduled as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    name: String,
    unit: UnitFile,
}

impl Job {
    pub fn new(name: impl Into<String>, unit: UnitFile) -> Self {
        Self {
            name: name.into(),
            unit,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &UnitFile {
        &self.unit
    }

    pub fn description(&self) -> &str {
        self.unit.description()
    }

    /// Placement conditions the running machine must satisfy.
    pub fn conditions(&self) -> Vec<Condition> {
        admission::conditions(&self.unit)
    }
}
