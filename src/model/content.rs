//! Placeholder vocabulary and the content blocks bound to it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Body placeholders recognized in the report template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Placeholder {
    PurposeText,
    ScopeText,
    References,
    Acronyms,
    Definitions,
    ProcedureSummary,
    DutConfig,
    TestExecutionChronology,
    ConsumablesUsed,
    TestResultSummary,
    TestResultAnalysis,
    TestMethodLossInvestigations,
    ProtocolDeviations,
    DefectiveUnit,
    Conclusion,
    Attachments,
}

impl Placeholder {
    /// Every body placeholder in substitution order.
    pub const ALL: [Placeholder; 16] = [
        Placeholder::PurposeText,
        Placeholder::ScopeText,
        Placeholder::References,
        Placeholder::Acronyms,
        Placeholder::Definitions,
        Placeholder::ProcedureSummary,
        Placeholder::DutConfig,
        Placeholder::TestExecutionChronology,
        Placeholder::ConsumablesUsed,
        Placeholder::TestResultSummary,
        Placeholder::TestResultAnalysis,
        Placeholder::TestMethodLossInvestigations,
        Placeholder::ProtocolDeviations,
        Placeholder::DefectiveUnit,
        Placeholder::Conclusion,
        Placeholder::Attachments,
    ];

    /// Literal token as it appears in the template.
    pub fn token(&self) -> &'static str {
        match self {
            Placeholder::PurposeText => "[BK_PURPOSE_TEXT]",
            Placeholder::ScopeText => "[BK_SCOPE_TEXT]",
            Placeholder::References => "[BK_REFERENCES]",
            Placeholder::Acronyms => "[BK_ACRONYMS]",
            Placeholder::Definitions => "[BK_DEFINITIONS]",
            Placeholder::ProcedureSummary => "[BK_PROCEDURE_SUMMARY]",
            Placeholder::DutConfig => "[BK_DUT_CONFIG]",
            Placeholder::TestExecutionChronology => "[BK_TEST_EXECUTION_CHRONOLOGY]",
            Placeholder::ConsumablesUsed => "[BK_CONSUMABLES_USED]",
            Placeholder::TestResultSummary => "[BK_TEST_RESULT_SUMMARY]",
            Placeholder::TestResultAnalysis => "[BK_TEST_RESULT_ANALYSIS]",
            Placeholder::TestMethodLossInvestigations => "[BK_TEST_METHOD_LOSS_INVESTIGATIONS]",
            Placeholder::ProtocolDeviations => "[BK_PROTOCOL_DEVIATIONS]",
            Placeholder::DefectiveUnit => "[BK_DEFECTIVE_UNIT]",
            Placeholder::Conclusion => "[BK_CONCLUSION]",
            Placeholder::Attachments => "[BK_ATTACHMENTS]",
        }
    }

    /// Look up a placeholder by its token.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.token() == token)
    }

    /// Blocks that go into the document without markdown cleanup.
    pub fn is_verbatim(&self) -> bool {
        matches!(
            self,
            Placeholder::TestExecutionChronology | Placeholder::TestResultAnalysis
        )
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Header and footer fields with fixed formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeaderField {
    Title,
    ReportNumber,
    Revision,
    DocumentOwner,
}

impl HeaderField {
    pub const ALL: [HeaderField; 4] = [
        HeaderField::Title,
        HeaderField::ReportNumber,
        HeaderField::Revision,
        HeaderField::DocumentOwner,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            HeaderField::Title => "[BK_TITLE]",
            HeaderField::ReportNumber => "[BK_RPT]",
            HeaderField::Revision => "[BK_REV]",
            HeaderField::DocumentOwner => "[BK_DOC_OWNER]",
        }
    }

    /// Font size in points.
    pub fn font_size(&self) -> u32 {
        match self {
            HeaderField::Title => 10,
            HeaderField::ReportNumber => 28,
            HeaderField::Revision => 12,
            HeaderField::DocumentOwner => 10,
        }
    }

    pub fn bold(&self) -> bool {
        matches!(self, HeaderField::Title | HeaderField::ReportNumber)
    }
}

/// Content bound to a placeholder, tagged by shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentBlock {
    /// Plain text replacing the token in place
    Text(String),
    /// Text containing a markdown table
    Table(String),
    /// Images inserted in sequence
    Images(Vec<PathBuf>),
}

impl ContentBlock {
    /// Text carried by the block, empty for image sets.
    pub fn text(&self) -> &str {
        match self {
            ContentBlock::Text(t) | ContentBlock::Table(t) => t,
            ContentBlock::Images(_) => "",
        }
    }

    /// Check if the block carries nothing to insert.
    pub fn is_empty(&self) -> bool {
        match self {
            ContentBlock::Text(t) | ContentBlock::Table(t) => t.trim().is_empty(),
            ContentBlock::Images(paths) => paths.is_empty(),
        }
    }
}

/// Placeholder bindings for one report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderMap {
    blocks: BTreeMap<Placeholder, ContentBlock>,
}

impl PlaceholderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind content, replacing an earlier binding.
    pub fn insert(&mut self, placeholder: Placeholder, block: ContentBlock) {
        self.blocks.insert(placeholder, block);
    }

    pub fn get(&self, placeholder: Placeholder) -> Option<&ContentBlock> {
        self.blocks.get(&placeholder)
    }

    /// Bindings in vocabulary order.
    pub fn iter(&self) -> impl Iterator<Item = (Placeholder, &ContentBlock)> {
        self.blocks.iter().map(|(p, b)| (*p, b))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        for placeholder in Placeholder::ALL {
            assert_eq!(Placeholder::from_token(placeholder.token()), Some(placeholder));
        }
        assert_eq!(Placeholder::from_token("[BK_UNKNOWN]"), None);
    }

    #[test]
    fn test_header_field_formatting() {
        assert_eq!(HeaderField::ReportNumber.font_size(), 28);
        assert!(HeaderField::Title.bold());
        assert!(!HeaderField::Revision.bold());
    }

    #[test]
    fn test_map_iterates_in_vocabulary_order() {
        let mut map = PlaceholderMap::new();
        map.insert(Placeholder::Conclusion, ContentBlock::Text("Done".into()));
        map.insert(Placeholder::PurposeText, ContentBlock::Text("Why".into()));
        let order: Vec<Placeholder> = map.iter().map(|(p, _)| p).collect();
        assert_eq!(order, vec![Placeholder::PurposeText, Placeholder::Conclusion]);
        assert!(ContentBlock::Images(Vec::new()).is_empty());
    }
}
