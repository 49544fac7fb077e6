//! Request pipeline: bearer attachment, 401 handling, error normalization
//! and envelope unwrapping for every call to the REST service.

mod client;
mod error;

pub use client::{ApiClient, LOGIN_ENDPOINT, USER_AGENT};
pub use error::{ApiError, ApiErrorKind, ApiResult, EnvelopeExt, normalize_error_message};
