//! Signature validation of issued documents (`QueryEstDteAv.getEstDteAv`)
//!
//! Asks the SII whether a document it accepted matches the data and the
//! `SignatureValue` the caller holds. Composition:
//! 1. Validate issuer, recipient and issue date (no network on failure)
//! 2. Obtain a token from the [`TokenManager`]
//! 3. Build the payload and send it through the [`RequestExecutor`]
//! 4. Decode the answer into a [`SignatureStatus`]

use std::sync::Arc;

use dtelink_domain::constants::{SIGNATURE_OPERATION, SIGNATURE_SERVICE, TOKEN_REJECTED_STATUSES};
use dtelink_domain::{
    parse_issue_date, to_authority_date, ConnectionOptions, DocumentSignatureQuery, DteLinkError,
    ResponseHeader, Result, Rut, SignatureStatus, SoapPayload, Token, WebserviceResponse,
};
use tracing::{info, warn};

use crate::auth::{AuthCredential, TokenManager};
use crate::transport::{RequestExecutor, XmlCodec};

/// Result of a signature validation
pub type SignatureValidationResponse = WebserviceResponse<SignatureStatus>;

/// Validates document signatures against the SII
pub struct SignatureValidator {
    options: Arc<ConnectionOptions>,
    tokens: Arc<TokenManager>,
    executor: RequestExecutor,
    codec: Arc<dyn XmlCodec>,
}

impl SignatureValidator {
    pub fn new(
        options: Arc<ConnectionOptions>,
        tokens: Arc<TokenManager>,
        executor: RequestExecutor,
        codec: Arc<dyn XmlCodec>,
    ) -> Self {
        Self { options, tokens, executor, codec }
    }

    /// Query the advanced status of a document, including its signature.
    ///
    /// Business answers such as "data does not match" or "not received" are
    /// returned as `Ok` with the matching [`dtelink_domain::SignatureVerdict`].
    ///
    /// # Errors
    /// - `DteLinkError::Validation` for a malformed RUT or date, before any
    ///   network call
    /// - `DteLinkError::Auth` when the credential or token is refused; a
    ///   refused cached token is invalidated first, and a failure to do so
    ///   is only logged
    /// - `DteLinkError::SignatureValidation` wrapping any other failure of
    ///   the query, with the document identity attached
    pub async fn validate(
        &self,
        credential: &dyn AuthCredential,
        query: &DocumentSignatureQuery,
    ) -> Result<SignatureValidationResponse> {
        let issuer = Rut::parse(&query.issuer, "issuer")?;
        let recipient = Rut::parse(&query.recipient, "recipient")?;
        let issued_on = parse_issue_date(&query.issued_on, "issued_on")?;

        let token = self.tokens.get_token(credential).await?;

        let request = SoapPayload::new()
            .with("RutEmpresa", issuer.number())
            .with("DvEmpresa", issuer.check_digit())
            .with("RutReceptor", recipient.number())
            .with("DvReceptor", recipient.check_digit())
            .with("TipoDte", query.document_type)
            .with("FolioDte", query.folio)
            .with("FechaEmisionDte", to_authority_date(issued_on))
            .with("MontoDte", query.total)
            .with("FirmaDte", &query.signature)
            .with("Token", token.as_str());

        let endpoint = self.options.resolve_endpoint(SIGNATURE_SERVICE);
        let wrap = |source: DteLinkError| DteLinkError::SignatureValidation {
            document_type: query.document_type,
            folio: query.folio,
            issuer: issuer.to_string(),
            source: Box::new(source),
        };

        let response = match self.executor.send(&endpoint, SIGNATURE_OPERATION, &request).await {
            Ok(response) => response,
            Err(err) if err.is_auth() => {
                self.evict(credential, &token).await;
                return Err(err);
            }
            Err(err) => return Err(wrap(err)),
        };

        let data = self.codec.decode(&response.body).map_err(wrap)?;
        let header = ResponseHeader::from_value(&data).map_err(wrap)?;

        if TOKEN_REJECTED_STATUSES.contains(&header.status.as_str()) {
            warn!(
                document_type = query.document_type,
                folio = query.folio,
                issuer = %issuer,
                status = %header.status,
                "SII rejected the token, invalidating"
            );
            self.evict(credential, &token).await;
            return Err(DteLinkError::Auth(format!(
                "SII rejected the token while validating T{}F{}: {}",
                query.document_type,
                query.folio,
                header.summary()
            )));
        }

        let outcome = SignatureStatus::from_header(header);
        info!(
            document_type = query.document_type,
            folio = query.folio,
            issuer = %issuer,
            status = %outcome.code,
            attempts = response.attempt_count(),
            "document signature validated"
        );

        Ok(WebserviceResponse { outcome, data, request })
    }

    /// Drop a refused token; a failing cache must not mask the auth error.
    async fn evict(&self, credential: &dyn AuthCredential, token: &Token) {
        if let Err(err) = self.tokens.invalidate_rejected(credential, token).await {
            warn!(
                credential = %credential.identity(),
                error = %err,
                "failed to invalidate rejected token"
            );
        }
    }
}
