//! KYC flow controller: the outer state machine
//!
//! Stage transitions:
//! - DOCUMENT_SELECTION → DOCUMENT_CAPTURE: document type chosen
//! - DOCUMENT_CAPTURE → DOCUMENT_CAPTURE: id_card front captured, back next
//! - DOCUMENT_CAPTURE → LIVENESS: last required side captured
//! - LIVENESS → DOCUMENT_CAPTURE: user goes back (photos kept)
//! - LIVENESS → COMPLETE: liveness data received, record composed
//! - any → DOCUMENT_SELECTION: reset discards everything

use crate::types::{
    DocumentSide, DocumentType, FlowStage, KycDocument, KycError, KycRecord, LivenessData, Photo,
};

/// One end-to-end verification attempt
#[derive(Debug, Clone)]
pub struct KycFlow {
    stage: FlowStage,
    document_type: Option<DocumentType>,
    document_side: DocumentSide,
    document: Option<KycDocument>,
    liveness: Option<LivenessData>,
    record: Option<KycRecord>,
}

impl Default for KycFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl KycFlow {
    /// Fresh flow at document selection
    pub fn new() -> Self {
        Self {
            stage: FlowStage::DocumentSelection,
            document_type: None,
            document_side: DocumentSide::Front,
            document: None,
            liveness: None,
            record: None,
        }
    }

    pub fn stage(&self) -> FlowStage {
        self.stage
    }

    pub fn document_type(&self) -> Option<DocumentType> {
        self.document_type
    }

    /// The side the capture stage expects next
    pub fn document_side(&self) -> DocumentSide {
        self.document_side
    }

    pub fn document(&self) -> Option<&KycDocument> {
        self.document.as_ref()
    }

    pub fn liveness(&self) -> Option<&LivenessData> {
        self.liveness.as_ref()
    }

    /// The composed record, present once the flow completes
    pub fn record(&self) -> Option<&KycRecord> {
        self.record.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.stage == FlowStage::Complete
    }

    /// Choose the document kind and enter capture at the front side
    pub fn select_document_type(&mut self, doc_type: DocumentType) -> Result<(), KycError> {
        self.expect_stage(FlowStage::DocumentSelection)?;
        self.document_type = Some(doc_type);
        self.document = Some(KycDocument::new(doc_type));
        self.document_side = DocumentSide::Front;
        self.stage = FlowStage::DocumentCapture;
        Ok(())
    }

    /// Store one document side. The side must be the one the flow expects;
    /// passport never goes through a back-side capture.
    pub fn capture_document_side(
        &mut self,
        side: DocumentSide,
        photo: Photo,
    ) -> Result<(), KycError> {
        self.expect_stage(FlowStage::DocumentCapture)?;
        if side != self.document_side {
            return Err(KycError::InvalidStage {
                expected: format!("document_capture:{}", self.document_side),
                actual: format!("document_capture:{}", side),
            });
        }

        let document = self.document.as_mut().ok_or_else(|| KycError::InvalidStage {
            expected: "document selected".to_string(),
            actual: "no document".to_string(),
        })?;
        match side {
            DocumentSide::Front => document.front = Some(photo),
            DocumentSide::Back => document.back = Some(photo),
        }

        if side == DocumentSide::Front && document.doc_type.needs_back_side() {
            self.document_side = DocumentSide::Back;
        } else {
            self.stage = FlowStage::Liveness;
        }
        Ok(())
    }

    /// Return from liveness to document capture at the front side.
    /// Already-captured document photos are kept.
    pub fn back_to_document_capture(&mut self) -> Result<(), KycError> {
        self.expect_stage(FlowStage::Liveness)?;
        self.stage = FlowStage::DocumentCapture;
        self.document_side = DocumentSide::Front;
        Ok(())
    }

    /// Liveness finished: store the captured-angle map + video and compose
    /// the final record
    pub fn complete_liveness(&mut self, data: LivenessData) -> Result<&KycRecord, KycError> {
        self.expect_stage(FlowStage::Liveness)?;
        let document = self
            .document
            .clone()
            .ok_or_else(|| KycError::InvalidStage {
                expected: "document captured".to_string(),
                actual: "no document".to_string(),
            })?;

        let record = KycRecord::compose(document, data.clone())?;
        self.liveness = Some(data);
        self.record = Some(record);
        self.stage = FlowStage::Complete;
        // record was just set
        self.record.as_ref().ok_or(KycError::Serialize(
            "record missing after compose".to_string(),
        ))
    }

    /// Discard everything and start over at document selection
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn expect_stage(&self, expected: FlowStage) -> Result<(), KycError> {
        if self.stage != expected {
            return Err(KycError::InvalidStage {
                expected: expected.to_string(),
                actual: self.stage.to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
