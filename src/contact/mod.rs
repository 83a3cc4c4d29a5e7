//! Contact form intake: sanitization, validation and delivery.

mod sink;
mod submission;

pub use sink::{ContactSink, DeliveryError, DeliveryReceipt, LogSink};
pub use submission::{is_valid_email, sanitize, ContactRequest, ContactSubmission, ValidationError};
