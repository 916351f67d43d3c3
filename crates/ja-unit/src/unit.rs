//! Unit file parsing.
//!
//! Unit files are ini-style: `[Section]` headers followed by `key=value`
//! lines. A key may repeat, in which case every value is kept in order.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Options of one section: key to every value recorded for it, in file order.
pub type Options = BTreeMap<String, Vec<String>>;

/// Parsed unit file: section name to its options.
pub type Contents = BTreeMap<String, Options>;

/// Single-valued form of [`Contents`] understood by older callers.
pub type LegacyContents = BTreeMap<String, BTreeMap<String, String>>;

/// A unit file and its parsed contents.
///
/// The raw text is kept verbatim and is what gets serialized; the parsed
/// contents are rebuilt on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct UnitFile {
    raw: String,
    contents: Contents,
}

impl UnitFile {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let contents = parse(&raw);
        Self { raw, contents }
    }

    /// Build a unit file from the single-valued legacy structure.
    ///
    /// Each section is written once with one `key=value` line per key.
    /// Only use this where backwards compatibility requires it.
    pub fn from_legacy_contents(contents: &LegacyContents) -> Self {
        let mut serialized = String::new();
        for (section, options) in contents {
            serialized.push_str(&format!("[{section}]\n"));
            for (key, value) in options {
                serialized.push_str(&format!("{key}={value}\n"));
            }
            serialized.push('\n');
        }
        Self::new(serialized)
    }

    /// The text the unit file was built from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn contents(&self) -> &Contents {
        &self.contents
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.contents.keys().map(String::as_str)
    }

    /// Every value recorded for `key` in `section`, empty if there are none.
    pub fn values(&self, section: &str, key: &str) -> &[String] {
        self.contents
            .get(section)
            .and_then(|options| options.get(key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The first value recorded for `key` in `section`, or `""`.
    pub fn value(&self, section: &str, key: &str) -> &str {
        self.values(section, key)
            .first()
            .map(String::as_str)
            .unwrap_or("")
    }

    /// The first `Description` in the `[Unit]` section, or `""`.
    pub fn description(&self) -> &str {
        self.value("Unit", "Description")
    }

    /// Collapse the contents to one value per key, keeping the last one.
    ///
    /// Lossy for repeated keys. Only use this where backwards compatibility
    /// requires it.
    pub fn legacy_contents(&self) -> LegacyContents {
        self.contents
            .iter()
            .map(|(section, options)| {
                let flattened = options
                    .iter()
                    .filter_map(|(key, values)| {
                        values.last().map(|value| (key.clone(), value.clone()))
                    })
                    .collect();
                (section.clone(), flattened)
            })
            .collect()
    }
}

impl fmt::Display for UnitFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<String> for UnitFile {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for UnitFile {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<UnitFile> for String {
    fn from(unit: UnitFile) -> Self {
        unit.raw
    }
}

/// Parse unit file text into its sections and options.
///
/// Never fails. Comments (`#`, `;`), blank lines, lines outside any section
/// and lines without `=` are skipped. A repeated section keeps adding to the
/// options already recorded for it.
pub fn parse(raw: &str) -> Contents {
    let mut sections = Contents::new();
    let mut current: Option<String> = None;

    for line in raw.split('\n') {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = section_header(line) {
            if name.is_empty() {
                current = None;
            } else {
                sections.entry(name.to_string()).or_default();
                current = Some(name.to_string());
            }
            continue;
        }

        let Some(section) = current.as_deref() else {
            continue;
        };

        let Some((key, value)) = parse_option_line(line) else {
            continue;
        };

        sections
            .entry(section.to_string())
            .or_default()
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }

    sections
}

fn section_header(line: &str) -> Option<&str> {
    line.strip_prefix('[')?.strip_suffix(']')
}

/// Split `key = value` on the first `=`, trimming both sides.
fn parse_option_line(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    Some((key.trim(), value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sections_and_options() {
        let unit = UnitFile::new(
            "[Unit]\nDescription=Ping service\n\n[Service]\nExecStart=/bin/ping example.com\n",
        );
        assert_eq!(unit.description(), "Ping service");
        assert_eq!(unit.value("Service", "ExecStart"), "/bin/ping example.com");
        assert_eq!(unit.sections().collect::<Vec<_>>(), vec!["Service", "Unit"]);
    }

    #[test]
    fn repeated_keys_accumulate_in_order() {
        let unit = UnitFile::new("[X-Fleet]\nA=1\nB=x\nA=2\nA=3\n");
        assert_eq!(unit.values("X-Fleet", "A"), ["1", "2", "3"]);
        assert_eq!(unit.value("X-Fleet", "A"), "1");
    }

    #[test]
    fn repeated_sections_accumulate() {
        let unit = UnitFile::new("[S]\nkey=value\n[Other]\nx=y\n[S]\nkey=value2\nz=1\n");
        assert_eq!(unit.values("S", "key"), ["value", "value2"]);
        assert_eq!(unit.value("S", "z"), "1");
        assert_eq!(unit.value("Other", "x"), "y");
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let unit = UnitFile::new("# top\n[S]\n; note\n  # indented\n\n   \nkey=value\n");
        assert_eq!(unit.contents().len(), 1);
        assert_eq!(unit.contents()["S"].len(), 1);
        assert_eq!(unit.value("S", "key"), "value");
    }

    #[test]
    fn lines_before_any_section_are_discarded() {
        let unit = UnitFile::new("orphan=1\n[S]\nkey=value\n");
        assert_eq!(unit.contents().len(), 1);
        assert!(unit.values("S", "orphan").is_empty());
    }

    #[test]
    fn key_and_value_are_trimmed_and_split_on_first_equals() {
        let unit = UnitFile::new("[S]\n  key  =  a=b=c  \n");
        assert_eq!(unit.value("S", "key"), "a=b=c");
    }

    #[test]
    fn line_without_equals_is_dropped() {
        let unit = UnitFile::new("[S]\nnot an option\nkey=value\n");
        assert_eq!(unit.contents()["S"].len(), 1);
        assert_eq!(unit.value("S", "key"), "value");
    }

    #[test]
    fn empty_value_and_empty_key_are_recorded() {
        let unit = UnitFile::new("[S]\nkey=\n=value\n");
        assert_eq!(unit.values("S", "key"), [""]);
        assert_eq!(unit.values("S", ""), ["value"]);
    }

    #[test]
    fn empty_section_header_closes_section() {
        let unit = UnitFile::new("[S]\na=1\n[]\nb=2\n");
        assert_eq!(unit.value("S", "a"), "1");
        assert!(unit.values("S", "b").is_empty());
        assert!(!unit.contents().contains_key(""));
    }

    #[test]
    fn crlf_line_endings() {
        let unit = UnitFile::new("[S]\r\nkey=value\r\n");
        assert_eq!(unit.value("S", "key"), "value");
    }

    #[test]
    fn section_without_options_is_present() {
        let unit = UnitFile::new("[Empty]\n");
        assert!(unit.contents()["Empty"].is_empty());
    }

    #[test]
    fn missing_values_are_empty() {
        let unit = UnitFile::new("");
        assert!(unit.contents().is_empty());
        assert!(unit.values("S", "key").is_empty());
        assert_eq!(unit.value("S", "key"), "");
        assert_eq!(unit.description(), "");
    }

    #[test]
    fn raw_text_is_preserved() {
        let raw = "# comment\n[S]\nkey = value\n";
        let unit = UnitFile::new(raw);
        assert_eq!(unit.raw(), raw);
        assert_eq!(unit.to_string(), raw);
    }

    #[test]
    fn legacy_contents_keeps_last_value() {
        let unit = UnitFile::new("[S]\nkey=1\nkey=2\nother=x\n");
        let legacy = unit.legacy_contents();
        assert_eq!(legacy["S"]["key"], "2");
        assert_eq!(legacy["S"]["other"], "x");
    }

    #[test]
    fn from_legacy_contents_round_trips() {
        let mut legacy = LegacyContents::new();
        legacy
            .entry("Unit".to_string())
            .or_default()
            .insert("Description".to_string(), "Ping".to_string());
        legacy
            .entry("X-Fleet".to_string())
            .or_default()
            .insert("X-ConditionMachineBootID".to_string(), "XYZ".to_string());

        let unit = UnitFile::from_legacy_contents(&legacy);
        assert_eq!(unit.description(), "Ping");
        assert_eq!(unit.value("X-Fleet", "X-ConditionMachineBootID"), "XYZ");
        assert_eq!(unit.legacy_contents(), legacy);
        assert!(unit.raw().contains("[Unit]\nDescription=Ping\n\n"));
    }

    #[test]
    fn serializes_as_raw_text() {
        let unit = UnitFile::new("[S]\nkey=value\n");
        let json = serde_json::to_string(&unit).unwrap();
        assert_eq!(json, r#""[S]\nkey=value\n""#);

        let back: UnitFile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, unit);
        assert_eq!(back.value("S", "key"), "value");
    }
}
