//! Request metadata supplied with each report.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How test outcomes are analyzed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestDataType {
    /// Pass/fail outcomes with confidence statistics
    #[default]
    Attribute,
    /// Continuous measurements with tolerance intervals
    Variable,
}

impl FromStr for TestDataType {
    type Err = std::convert::Infallible;

    /// Anything other than "attribute" is variable data.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("attribute") {
            Ok(TestDataType::Attribute)
        } else {
            Ok(TestDataType::Variable)
        }
    }
}

impl fmt::Display for TestDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestDataType::Attribute => f.write_str("attribute"),
            TestDataType::Variable => f.write_str("variable"),
        }
    }
}

/// Handling of the units under test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub units_sterilized: bool,
    pub units_modified: bool,
    pub modification_description: String,
    pub calibration_verified: bool,
}

/// One row of the test execution chronology.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChronologyEntry {
    pub step: String,
    pub start_date: String,
    pub end_date: String,
    pub location: String,
}

/// Report metadata for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub title: String,
    /// Always carries the `RPT-` prefix
    pub report_number: String,
    pub revision: String,
    pub project_name: String,
    pub document_owner: String,
    pub protocol_number: String,
    pub test_data_type: TestDataType,
    pub device: DeviceConfig,
    pub chronology: Vec<ChronologyEntry>,
}

impl ReportConfig {
    /// Create a config with placeholder metadata.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the report number, adding the `RPT-` prefix when absent.
    pub fn with_report_number(mut self, number: impl Into<String>) -> Self {
        self.report_number = normalize_report_number(&number.into());
        self
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = revision.into();
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project_name = project.into();
        self
    }

    pub fn with_document_owner(mut self, owner: impl Into<String>) -> Self {
        self.document_owner = owner.into();
        self
    }

    pub fn with_protocol_number(mut self, protocol: impl Into<String>) -> Self {
        self.protocol_number = protocol.into();
        self
    }

    pub fn with_test_data_type(mut self, data_type: TestDataType) -> Self {
        self.test_data_type = data_type;
        self
    }

    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }

    pub fn with_chronology(mut self, chronology: Vec<ChronologyEntry>) -> Self {
        self.chronology = chronology;
        self
    }

    /// Re-apply normalization after deserialization.
    pub fn normalized(mut self) -> Self {
        self.report_number = normalize_report_number(&self.report_number);
        self
    }

    /// Report number without the `RPT-` prefix, as printed in headers.
    pub fn bare_report_number(&self) -> &str {
        self.report_number
            .strip_prefix("RPT-")
            .unwrap_or(&self.report_number)
    }

    /// Protocol reference for generated text, `TBD` when unknown.
    pub fn protocol_reference(&self) -> &str {
        if self.protocol_number.trim().is_empty() {
            "TBD"
        } else {
            &self.protocol_number
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "DVT Test Report".to_string(),
            report_number: "RPT-TBD".to_string(),
            revision: "A".to_string(),
            project_name: "TBD".to_string(),
            document_owner: "TBD".to_string(),
            protocol_number: String::new(),
            test_data_type: TestDataType::Attribute,
            device: DeviceConfig::default(),
            chronology: Vec::new(),
        }
    }
}

fn normalize_report_number(number: &str) -> String {
    let number = number.trim();
    if number.starts_with("RPT-") {
        number.to_string()
    } else {
        format!("RPT-{}", number)
    }
}
