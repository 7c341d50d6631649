//! Types for the advanced document status query (`QueryEstDteAv`)

use serde::{Deserialize, Serialize};

use super::ResponseHeader;

/// Inputs of a signature validation request
///
/// Identifiers are kept as the caller supplied them; they are validated by
/// the workflow before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSignatureQuery {
    /// RUT of the issuing company, e.g. `76192083-9`
    pub issuer: String,
    /// Electronic tax document type, e.g. 33 for an invoice
    pub document_type: u16,
    /// Folio of the document
    pub folio: u64,
    /// Issue date, `YYYY-MM-DD`
    pub issued_on: String,
    /// Document total
    pub total: i64,
    /// RUT of the recipient
    pub recipient: String,
    /// Content of `DTE/Signature/SignatureValue`
    pub signature: String,
}

/// Business answer of the SII about a document and its signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureVerdict {
    /// `DOK`: document received and data (including signature) matches
    Valid,
    /// `DNK`: document received but the data sent does not match
    DataMismatch,
    /// `FAU`: document not received by the SII
    NotReceived,
    /// `FNA`: folio not authorized
    NotAuthorized,
    /// `FAN`: folio annulled
    Annulled,
    /// `EMP`: issuer not authorized to issue electronic documents
    IssuerNotAuthorized,
    /// `TMD`/`TMC`: voided by a credit note
    Voided,
    /// `MMD`/`MMC`: amount modified by a credit or debit note
    Modified,
    /// Any other status, including the negative error codes
    Other(String),
}

impl SignatureVerdict {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "DOK" => Self::Valid,
            "DNK" => Self::DataMismatch,
            "FAU" => Self::NotReceived,
            "FNA" => Self::NotAuthorized,
            "FAN" => Self::Annulled,
            "EMP" => Self::IssuerNotAuthorized,
            "TMD" | "TMC" => Self::Voided,
            "MMD" | "MMC" => Self::Modified,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Typed result of a signature validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureStatus {
    pub code: String,
    pub verdict: SignatureVerdict,
    pub description: Option<String>,
    pub error_code: Option<String>,
    pub error_description: Option<String>,
    pub tracking_number: Option<String>,
}

impl SignatureStatus {
    pub fn from_header(header: ResponseHeader) -> Self {
        Self {
            verdict: SignatureVerdict::from_code(&header.status),
            code: header.status,
            description: header.description,
            error_code: header.error_code,
            error_description: header.error_description,
            tracking_number: header.tracking_number,
        }
    }

    /// True only when the SII confirmed the document and its signature.
    pub fn is_valid(&self) -> bool {
        self.verdict == SignatureVerdict::Valid
    }
}
