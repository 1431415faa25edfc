//! FHIR client errors.

use ecr_core::EcrError;

/// Errors from talking to a FHIR server.
#[derive(Debug, thiserror::Error)]
pub enum FhirClientError {
    /// The server URL could not be parsed.
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(String),

    /// A network error occurred while sending the request.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// Response status code.
        status: u16,
        /// OperationOutcome diagnostics or the raw body.
        message: String,
    },

    /// The response body was not valid JSON.
    #[error("Failed to parse response JSON: {0}")]
    Parse(String),

    /// The response was JSON but not the expected resource.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl From<reqwest::Error> for FhirClientError {
    fn from(err: reqwest::Error) -> Self {
        FhirClientError::Network(err.to_string())
    }
}

impl From<url::ParseError> for FhirClientError {
    fn from(err: url::ParseError) -> Self {
        FhirClientError::InvalidUrl(err.to_string())
    }
}

impl From<FhirClientError> for EcrError {
    fn from(err: FhirClientError) -> Self {
        EcrError::retrieval(err.to_string())
    }
}
