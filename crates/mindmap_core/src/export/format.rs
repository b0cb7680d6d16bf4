//! Export format tags.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Supported export targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Json,
    Csv,
    Text,
    Png,
    Pdf,
    Slides,
    Document,
    Spreadsheet,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 8] = [
        Self::Json,
        Self::Csv,
        Self::Text,
        Self::Png,
        Self::Pdf,
        Self::Slides,
        Self::Document,
        Self::Spreadsheet,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Text => "txt",
            Self::Png => "png",
            Self::Pdf => "pdf",
            Self::Slides => "pptx",
            Self::Document => "docx",
            Self::Spreadsheet => "xlsx",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv",
            Self::Text => "text/plain",
            Self::Png => "image/png",
            Self::Pdf => "application/pdf",
            Self::Slides => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            Self::Document => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Spreadsheet => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    /// Whether encoding is delegated to the rendering collaborator.
    pub fn is_rendered(self) -> bool {
        !matches!(self, Self::Json | Self::Csv | Self::Text)
    }
}

impl Display for ExportFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "txt" | "text" => Ok(Self::Text),
            "png" | "image" => Ok(Self::Png),
            "pdf" => Ok(Self::Pdf),
            "pptx" | "slides" => Ok(Self::Slides),
            "docx" | "document" => Ok(Self::Document),
            "xlsx" | "spreadsheet" => Ok(Self::Spreadsheet),
            other => Err(format!(
                "unsupported export format `{other}`; expected json|csv|txt|png|pdf|pptx|docx|xlsx"
            )),
        }
    }
}
