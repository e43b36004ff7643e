//! Document capture types and KYC flow stages

use serde::{Deserialize, Serialize};

use crate::types::Photo;

/// Government ID document kinds the flow accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// National ID card, captured front and back
    IdCard,
    /// Passport, single photo page
    Passport,
}

impl DocumentType {
    /// Does this document kind need a back-side capture?
    pub fn needs_back_side(&self) -> bool {
        matches!(self, DocumentType::IdCard)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DocumentType::IdCard => "id_card",
            DocumentType::Passport => "passport",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which side of the document is being captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSide {
    Front,
    Back,
}

impl std::fmt::Display for DocumentSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentSide::Front => write!(f, "front"),
            DocumentSide::Back => write!(f, "back"),
        }
    }
}

/// The captured ID document. `back` is only meaningful for id_card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KycDocument {
    pub doc_type: DocumentType,
    pub front: Option<Photo>,
    pub back: Option<Photo>,
}

impl KycDocument {
    pub fn new(doc_type: DocumentType) -> Self {
        Self {
            doc_type,
            front: None,
            back: None,
        }
    }

    /// All sides this document kind requires are present?
    pub fn is_complete(&self) -> bool {
        match self.doc_type {
            DocumentType::IdCard => self.front.is_some() && self.back.is_some(),
            DocumentType::Passport => self.front.is_some(),
        }
    }
}

/// The four stages of the outer KYC flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStage {
    DocumentSelection,
    DocumentCapture,
    Liveness,
    Complete,
}

impl std::fmt::Display for FlowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FlowStage::DocumentSelection => "document_selection",
            FlowStage::DocumentCapture => "document_capture",
            FlowStage::Liveness => "liveness",
            FlowStage::Complete => "complete",
        };
        write!(f, "{}", name)
    }
}
