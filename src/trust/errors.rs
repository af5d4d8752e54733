use thiserror::Error;

use crate::store::{StoreResult, StoreStatus};

/// Failures of trust-handshake operations.
///
/// Refusals that are part of normal operation (a replayed nonce, a missing
/// association) are answers, not errors. Only unexpected store outcomes and
/// unreadable records end up here.
#[derive(Debug, Error)]
pub enum TrustError {
    #[error("store answered {status}: {message}")]
    Store { status: StoreStatus, message: String },

    #[error("malformed record at {uri}: {details}")]
    Malformed { uri: String, details: String },

    #[error("record encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl TrustError {
    pub(crate) fn unexpected(result: &StoreResult) -> Self {
        TrustError::Store {
            status: result.status,
            message: result.error.clone().unwrap_or_default(),
        }
    }

    pub(crate) fn malformed(uri: &str, details: impl ToString) -> Self {
        TrustError::Malformed {
            uri: uri.to_string(),
            details: details.to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            TrustError::Store { .. } => "AERODOC_TRUST_STORE",
            TrustError::Malformed { .. } => "AERODOC_TRUST_MALFORMED",
            TrustError::Encoding(_) => "AERODOC_TRUST_ENCODING",
        }
    }
}

pub type TrustResult<T> = Result<T, TrustError>;

/// Passes a successful result through; anything else is unexpected.
pub(crate) fn expect_success(result: StoreResult) -> TrustResult<StoreResult> {
    if result.is_success() {
        Ok(result)
    } else {
        Err(TrustError::unexpected(&result))
    }
}
