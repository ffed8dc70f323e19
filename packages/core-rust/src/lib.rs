//! Capstan Core — action grammar, dispatch messages, and the response envelope.

pub mod action;
pub mod envelope;
pub mod message;

pub use action::{is_valid_domain_name, Action, ActionParseError};
pub use envelope::{codes, is_retryable, ErrorBody, Response};
pub use message::{CallOptions, Message, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_MILLIS};
