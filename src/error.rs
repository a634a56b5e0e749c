//! Error types for dvtreport library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dvtreport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can abort a report-generation request.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The zip container of a Word or Excel file is unreadable.
    #[error("Archive error: {0}")]
    Archive(String),

    /// Malformed WordprocessingML.
    #[error("XML error: {0}")]
    Xml(String),

    /// A workbook could not be opened or a sheet could not be read.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// The report template does not exist.
    #[error("Template not found: {}", .0.display())]
    TemplateMissing(PathBuf),

    /// The report template exists but is not a usable Word document.
    #[error("Template is corrupt: {0}")]
    TemplateCorrupt(String),

    /// The protocol document could not be parsed.
    #[error("Protocol parsing error: {0}")]
    DocumentParse(String),

    /// Request data is unusable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            _ => Error::Archive(err.to_string()),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<calamine::Error> for Error {
    fn from(err: calamine::Error) -> Self {
        Error::Spreadsheet(err.to_string())
    }
}

/// Failure inside a single generation task.
///
/// Never escapes a task: the orchestrator turns it into fallback content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The generation capability reported a failure.
    #[error("generation failed: {0}")]
    Capability(String),

    /// The capability answered with nothing usable.
    #[error("generation returned empty content")]
    EmptyResponse,

    /// Source data the task depends on is absent.
    #[error("missing input: {0}")]
    MissingInput(String),

    /// The response could not be interpreted.
    #[error("malformed response: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::TemplateMissing(PathBuf::from("Inputs/template.docx"));
        assert_eq!(err.to_string(), "Template not found: Inputs/template.docx");

        let err = Error::Spreadsheet("bad sheet".to_string());
        assert_eq!(err.to_string(), "Spreadsheet error: bad sheet");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_task_error_display() {
        assert_eq!(
            TaskError::EmptyResponse.to_string(),
            "generation returned empty content"
        );
        assert_eq!(
            TaskError::MissingInput("acceptance criteria".into()).to_string(),
            "missing input: acceptance criteria"
        );
    }
}
