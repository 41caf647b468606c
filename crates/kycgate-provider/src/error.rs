//! Classification of provider failures into the local error taxonomy.

use kycgate_core::VerificationError;

use crate::wire::ErrorBody;

/// Classify a transport-level failure (no HTTP answer was obtained).
pub fn from_transport(
    operation: &str,
    timeout_secs: u64,
    err: &reqwest::Error,
) -> VerificationError {
    if err.is_timeout() {
        VerificationError::ProviderTimeout {
            operation: operation.to_string(),
            timeout_secs,
        }
    } else {
        VerificationError::ProviderUnavailable(format!("{operation}: {err}"))
    }
}

/// Classify a non-2xx provider answer.
///
/// 400/413/415/422 mean the submitted content was unusable; any other 4xx is
/// a rejection; 5xx means the provider is unavailable.
pub fn from_status(operation: &str, status: u16, body: &str) -> VerificationError {
    let (code, message) = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => {
            let detail = parsed.into_detail();
            (detail.code, detail.message)
        }
        Err(_) if body.trim().is_empty() => (None, format!("HTTP {status}")),
        Err(_) => (None, truncate(body, 512)),
    };

    match status {
        400 | 413 | 415 | 422 => VerificationError::InvalidInput {
            status: Some(status),
            message: format!("{operation}: {message}"),
        },
        400..=499 => VerificationError::ProviderRejected {
            status,
            code,
            message: format!("{operation}: {message}"),
        },
        _ => VerificationError::ProviderUnavailable(format!(
            "{operation}: HTTP {status}: {message}"
        )),
    }
}

fn truncate(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}
