use thiserror::Error;

/// Fatal for the one message it was raised on (§7). The SitesLinkingIn
/// parser is the one documented exception: an empty or null response
/// yields an empty list rather than raising.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("malformed JSON: {0}")]
    Json(String),

    #[error("malformed workbook: {0}")]
    Workbook(String),

    #[error("missing required field: {0}")]
    MissingField(String),
}
