//! Admission decisions: may this machine run this unit?
//!
//! Placement conditions live in the `[X-Fleet]` section of a unit file:
//!
//! ```text
//! [X-Fleet]
//! X-ConditionMachineBootID=0f2c6d1e...
//! X-ConditionMachineMetadata="region=us-west-1" "region=us-west-2"
//! X-ConditionMachineMetadata=disk=ssd
//! ```
//!
//! Values of one condition are alternatives; distinct conditions must all
//! hold. Malformed metadata requirements are ignored rather than rejected, so
//! a typo in a unit never keeps it off every machine.

use std::collections::BTreeMap;

use ja_unit::{parse_multivalue_line, UnitFile};

use crate::job::Job;
use crate::machine::Machine;

/// Section holding placement conditions.
pub const FLEET_SECTION: &str = "X-Fleet";
/// Requires the machine's boot id to be one of the given values.
pub const BOOT_ID_KEY: &str = "X-ConditionMachineBootID";
/// Requires `field=value` metadata; values are whitespace separated and may be quoted.
pub const METADATA_KEY: &str = "X-ConditionMachineMetadata";
/// Old per-field spelling: `X-ConditionMachineMetadata-<field>=<value>`.
pub const DEPRECATED_METADATA_PREFIX: &str = "X-ConditionMachineMetadata-";

/// A single placement condition derived from a unit file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// The machine's boot id must equal one of these.
    BootId { any_of: Vec<String> },
    /// Metadata `field` must equal one of these.
    Metadata { field: String, any_of: Vec<String> },
}

impl Condition {
    pub fn is_satisfied_by(&self, machine: &Machine) -> bool {
        match self {
            Condition::BootId { any_of } => any_of.iter().any(|id| id == machine.boot_id()),
            Condition::Metadata { field, any_of } => {
                any_of.iter().any(|value| machine.has_metadata(field, value))
            }
        }
    }
}

/// Derive every placement condition of a unit.
///
/// A unit without an `[X-Fleet]` section, or with only malformed metadata
/// requirements, has no conditions.
pub fn conditions(unit: &UnitFile) -> Vec<Condition> {
    let mut conditions = Vec::new();

    let boot_ids = unit.values(FLEET_SECTION, BOOT_ID_KEY);
    if !boot_ids.is_empty() {
        conditions.push(Condition::BootId {
            any_of: boot_ids.to_vec(),
        });
    }

    conditions.extend(
        required_metadata(unit)
            .into_iter()
            .map(|(field, any_of)| Condition::Metadata { field, any_of }),
    );

    conditions
}

/// Metadata requirements of a unit, grouped by field.
///
/// The canonical key is read first. The deprecated per-field keys are then
/// consulted only for fields the canonical key does not mention, so the two
/// spellings never mix for one field.
pub fn required_metadata(unit: &UnitFile) -> BTreeMap<String, Vec<String>> {
    let mut required: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for line in unit.values(FLEET_SECTION, METADATA_KEY) {
        for token in parse_multivalue_line(line) {
            match split_requirement(&token) {
                Some((field, value)) => required
                    .entry(field.to_string())
                    .or_default()
                    .push(value.to_string()),
                None => tracing::debug!(token = %token, "ignoring malformed metadata requirement"),
            }
        }
    }

    let Some(options) = unit.contents().get(FLEET_SECTION) else {
        return required;
    };
    for (key, values) in options {
        let Some(field) = key.strip_prefix(DEPRECATED_METADATA_PREFIX) else {
            continue;
        };
        if field.is_empty() || required.contains_key(field) {
            continue;
        }
        let any_of: Vec<String> = values.iter().filter(|v| !v.is_empty()).cloned().collect();
        if !any_of.is_empty() {
            required.insert(field.to_string(), any_of);
        }
    }

    required
}

/// Split a `field=value` requirement on its first `=`.
///
/// Returns `None` if there is no `=` or either side is empty.
fn split_requirement(token: &str) -> Option<(&str, &str)> {
    let (field, value) = token.split_once('=')?;
    if field.is_empty() || value.is_empty() {
        return None;
    }
    Some((field, value))
}

/// Whether `machine` satisfies every placement condition of `unit`.
pub fn able_to_run(machine: &Machine, unit: &UnitFile) -> bool {
    first_unsatisfied(machine, unit).is_none()
}

/// The first condition of `unit` that `machine` fails, if any.
pub fn first_unsatisfied(machine: &Machine, unit: &UnitFile) -> Option<Condition> {
    conditions(unit)
        .into_iter()
        .find(|condition| !condition.is_satisfied_by(machine))
}

/// The local agent's view of scheduling: its own machine.
#[derive(Debug, Clone)]
pub struct Agent {
    machine: Machine,
}

impl Agent {
    pub fn new(machine: Machine) -> Self {
        Self { machine }
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// Whether this agent may run `job`.
    pub fn able_to_run(&self, job: &Job) -> bool {
        match first_unsatisfied(&self.machine, job.unit()) {
            Some(condition) => {
                tracing::debug!(job = %job.name(), ?condition, "unsatisfied condition");
                false
            }
            None => {
                tracing::debug!(job = %job.name(), "job is admissible");
                true
            }
        }
    }
}
