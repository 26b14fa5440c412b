//! Three-step wizard: contract type, proposal documents, generated SOW.
//!
//! [`Wizard`] owns a [`WizardData`] and enforces the step guards; the
//! draft renderer produces the local Markdown SOW shown when no generated
//! document is available.

use std::fmt;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::error::SowError;
use crate::model::{ContractType, FileData, GeneratedSow, WizardData};
use crate::templates;

/// Wizard steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WizardStep {
    ContractType,
    Proposals,
    Report,
}

impl WizardStep {
    pub const ALL: [WizardStep; 3] = [
        WizardStep::ContractType,
        WizardStep::Proposals,
        WizardStep::Report,
    ];

    /// 1-based position.
    pub fn number(self) -> usize {
        match self {
            WizardStep::ContractType => 1,
            WizardStep::Proposals => 2,
            WizardStep::Report => 3,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            WizardStep::ContractType => "Contract Type",
            WizardStep::Proposals => "Proposals",
            WizardStep::Report => "Generated SOW",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            WizardStep::ContractType => "Select the type of contract",
            WizardStep::Proposals => "Select proposal documents",
            WizardStep::Report => "Review generated SOW",
        }
    }

    fn next(self) -> Option<Self> {
        match self {
            WizardStep::ContractType => Some(WizardStep::Proposals),
            WizardStep::Proposals => Some(WizardStep::Report),
            WizardStep::Report => None,
        }
    }

    fn previous(self) -> Option<Self> {
        match self {
            WizardStep::ContractType => None,
            WizardStep::Proposals => Some(WizardStep::ContractType),
            WizardStep::Report => Some(WizardStep::Proposals),
        }
    }
}

/// A wizard session.
#[derive(Debug, Clone)]
pub struct Wizard {
    step: WizardStep,
    data: WizardData,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::ContractType,
            data: WizardData::default(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn data(&self) -> &WizardData {
        &self.data
    }

    pub fn into_data(self) -> WizardData {
        self.data
    }

    /// `step / total * 100`, rounded.
    pub fn progress_percent(&self) -> u8 {
        let total = WizardStep::ALL.len();
        ((self.step.number() * 100 + total / 2) / total) as u8
    }

    /// Advance one step if the current step is complete.
    ///
    /// Staying on the last step is not an error.
    pub fn next(&mut self) -> Result<WizardStep, SowError> {
        match self.step {
            WizardStep::ContractType if self.data.selected_contract_type.is_none() => {
                return Err(SowError::InvalidRequest(
                    "Please select a contract type to continue".to_string(),
                ));
            }
            WizardStep::Proposals if self.data.selected_files.is_empty() => {
                return Err(SowError::InvalidRequest(
                    "Please select at least one document to continue".to_string(),
                ));
            }
            _ => {}
        }
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        Ok(self.step)
    }

    /// Go back one step; a no-op on the first step.
    pub fn back(&mut self) -> WizardStep {
        if let Some(prev) = self.step.previous() {
            self.step = prev;
        }
        self.step
    }

    // ── Selection ────────────────────────────────────────────────────────

    pub fn select_contract_type(&mut self, contract: ContractType) {
        self.data.selected_contract_type = Some(contract);
    }

    /// Select a file; selecting an already-selected path is a no-op.
    pub fn select(&mut self, file: FileData) {
        if !self.is_selected(&file.path) {
            self.data.selected_files.push(file);
        }
    }

    pub fn deselect(&mut self, path: &str) {
        self.data.selected_files.retain(|f| f.path != path);
    }

    /// Flip the selection of `file`. Returns whether it is now selected.
    pub fn toggle(&mut self, file: FileData) -> bool {
        if self.is_selected(&file.path) {
            self.deselect(&file.path);
            false
        } else {
            self.data.selected_files.push(file);
            true
        }
    }

    pub fn is_selected(&self, path: &str) -> bool {
        self.data.selected_files.iter().any(|f| f.path == path)
    }

    /// Record a file uploaded during this session.
    pub fn add_uploaded(&mut self, file: FileData) {
        if !self.data.uploaded_files.iter().any(|f| f.path == file.path) {
            self.data.uploaded_files.push(file);
        }
    }

    // ── Results ──────────────────────────────────────────────────────────

    /// Store the outcome of a generation call. A new document clears any
    /// PDF path from an earlier run.
    pub fn apply_generated(&mut self, generated: &GeneratedSow) {
        if let Some(text) = &generated.sow_text {
            self.data.generated_sow_text = text.clone();
        }
        if generated.filename.is_some() {
            self.data.generated_sow_file = generated.filename.clone();
            self.data.generated_pdf_path = None;
        }
        self.data.cot_text = generated.cot_text.clone();
    }

    pub fn set_pdf_path(&mut self, pdf_path: impl Into<String>) {
        self.data.generated_pdf_path = Some(pdf_path.into());
    }
}

// ── Draft ────────────────────────────────────────────────────────────────────

/// Render the local Markdown SOW draft for `data`, dated `today`.
pub fn render_sow_draft(data: &WizardData, today: NaiveDate) -> String {
    SowDraft { data, today }.to_string()
}

/// The Markdown draft as a [`fmt::Display`] value.
struct SowDraft<'a> {
    data: &'a WizardData,
    today: NaiveDate,
}

impl SowDraft<'_> {
    fn contract_label(&self) -> &'static str {
        self.data
            .selected_contract_type
            .map(|c| c.label())
            .unwrap_or("Not specified")
    }

    fn write_documents(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## Reference Documents")?;
        writeln!(f, "The following documents have been selected for this SOW:\n")?;
        for file in &self.data.selected_files {
            writeln!(f, "- {}", file.name)?;
        }
        if !self.data.uploaded_files.is_empty() {
            writeln!(f, "\n### Newly Uploaded Documents")?;
            for file in &self.data.uploaded_files {
                writeln!(f, "- {}", file.name)?;
            }
        }
        writeln!(f)
    }

    fn write_timeline(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## Timeline")?;
        for (label, days) in templates::TIMELINE {
            let date = self
                .today
                .checked_add_days(Days::new(days.unsigned_abs()))
                .unwrap_or(self.today);
            writeln!(f, "- **{label}:** {}", date.format("%-m/%-d/%Y"))?;
        }
        writeln!(f)
    }
}

impl fmt::Display for SowDraft<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let contract = self.data.selected_contract_type;
        let contract_label = self.contract_label();

        writeln!(f, "# Statement of Work (SOW)\n")?;
        writeln!(f, "**Generated on:** {}\n", self.today.format("%B %-d, %Y"))?;
        writeln!(f, "## Project Overview\n{}\n", templates::PROJECT_OVERVIEW)?;
        writeln!(f, "## Contract Model\n**{contract_label}**\n")?;
        writeln!(f, "{}\n", templates::contract_details(contract))?;

        self.write_documents(f)?;

        writeln!(f, "## Scope of Work\n{}\n", templates::SCOPE_OF_WORK)?;
        writeln!(f, "## Deliverables\n{}\n", templates::DELIVERABLES)?;

        self.write_timeline(f)?;

        writeln!(f, "## Pricing Structure\n{}\n", templates::pricing_structure(contract))?;
        writeln!(f, "## Acceptance Criteria\n{}\n", templates::ACCEPTANCE_CRITERIA)?;
        writeln!(f, "## Risk Management\n{}\n", templates::RISK_MANAGEMENT)?;
        writeln!(f, "## Communication Plan\n{}\n", templates::COMMUNICATION_PLAN)?;
        writeln!(f, "## Signatures\n{}\n", templates::SIGNATURES)?;

        write!(
            f,
            "---\n*This SOW was generated using the SOW Creator Wizard based on {} selected document(s) and {} contract model.*\n",
            self.data.selected_files.len(),
            contract_label
        )
    }
}
