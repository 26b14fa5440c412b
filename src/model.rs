//! Data types shared by the store, the conversion operations, the wizard and
//! the HTTP layer.
//!
//! Everything that crosses the HTTP boundary serialises to the camelCase JSON
//! shape the browser wizard consumes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::{ConversionMessage, SowError};
use crate::pipeline::pdf::PdfMethod;

// ── Files ────────────────────────────────────────────────────────────────

/// Display category derived from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Presentation,
    Pdf,
    Document,
    Spreadsheet,
    File,
}

impl FileCategory {
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pptx" | "ppt" => FileCategory::Presentation,
            "pdf" => FileCategory::Pdf,
            "docx" | "doc" => FileCategory::Document,
            "xlsx" | "xls" => FileCategory::Spreadsheet,
            _ => FileCategory::File,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileCategory::Presentation => "presentation",
            FileCategory::Pdf => "pdf",
            FileCategory::Document => "document",
            FileCategory::Spreadsheet => "spreadsheet",
            FileCategory::File => "file",
        }
    }
}

/// A document as listed to the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub name: String,
    /// `/input/<name>`; the wizard keys its selection on this.
    pub path: String,
    /// Display size, e.g. `"12 KB"`.
    pub size: String,
    /// `YYYY-MM-DD`.
    pub last_modified: String,
    #[serde(rename = "type")]
    pub category: FileCategory,
}

impl FileData {
    /// Build the listing entry for a file in the input folder.
    pub fn new(name: &str, input_folder: &str, bytes: u64, modified: DateTime<Local>) -> Self {
        let ext = name.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
        Self {
            name: name.to_string(),
            path: format!("/{input_folder}/{name}"),
            size: format_size(bytes),
            last_modified: modified.format("%Y-%m-%d").to_string(),
            category: FileCategory::from_extension(ext),
        }
    }
}

/// `"<round(bytes / 1024)> KB"`.
pub fn format_size(bytes: u64) -> String {
    format!("{} KB", (bytes as f64 / 1024.0).round() as u64)
}

// ── Contract types ───────────────────────────────────────────────────────

/// The contract models a SOW can be generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContractType {
    FixedPrice,
    TimeAndMaterials,
    StaffAugmentation,
}

impl ContractType {
    pub const ALL: [ContractType; 3] = [
        ContractType::FixedPrice,
        ContractType::TimeAndMaterials,
        ContractType::StaffAugmentation,
    ];

    pub fn id(self) -> &'static str {
        match self {
            ContractType::FixedPrice => "fixed-price",
            ContractType::TimeAndMaterials => "time-and-materials",
            ContractType::StaffAugmentation => "staff-augmentation",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ContractType::FixedPrice => "Fixed Price",
            ContractType::TimeAndMaterials => "Time and Materials",
            ContractType::StaffAugmentation => "Staff Augmentation",
        }
    }

    pub fn description(self) -> &'static str {
        crate::templates::contract_description(self)
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ContractType {
    type Err = SowError;

    /// Accepts the id (`fixed-price`) or the label (`Fixed Price`), any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        ContractType::ALL
            .into_iter()
            .find(|c| c.id().eq_ignore_ascii_case(needle) || c.label().eq_ignore_ascii_case(needle))
            .ok_or_else(|| SowError::UnknownContractType(needle.to_string()))
    }
}

/// JSON shape of `GET /api/contract-types`.
#[derive(Debug, Clone, Serialize)]
pub struct ContractTypeInfo {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

impl From<ContractType> for ContractTypeInfo {
    fn from(c: ContractType) -> Self {
        Self {
            id: c.id(),
            label: c.label(),
            description: c.description(),
        }
    }
}

// ── Session & results ────────────────────────────────────────────────────

/// Wizard session state. Lives in the client (or the CLI run); never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardData {
    pub selected_contract_type: Option<ContractType>,
    pub selected_files: Vec<FileData>,
    pub uploaded_files: Vec<FileData>,
    pub generated_sow_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_sow_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_pdf_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cot_text: Option<String>,
}

/// Outcome of a SOW generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSow {
    /// File name inside the generated-SOWs folder, when a DOCX was produced.
    pub filename: Option<String>,
    pub sow_text: Option<String>,
    pub cot_text: Option<String>,
    /// Name the API suggested before timestamping.
    pub original_filename: Option<String>,
    pub file_size: u64,
    pub contract_type: ContractType,
    pub documents_count: usize,
    /// `true` when a file with the same name was replaced.
    pub regenerated: bool,
}

/// Outcome of a DOCX → PDF conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfConversion {
    /// PDF file name inside the converted-PDF folder.
    pub pdf_path: String,
    /// `None` when an existing PDF was returned without converting.
    pub method: Option<PdfMethod>,
    pub already_existed: bool,
    pub size: u64,
    pub converter_path: Option<String>,
    pub converter_version: Option<String>,
}

/// Outcome of a DOCX → Markdown conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkdownConversion {
    pub markdown: String,
    pub html: String,
    pub messages: Vec<ConversionMessage>,
}
