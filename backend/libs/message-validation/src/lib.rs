//! Declarative field-constraint checking for request messages
//!
//! Each message type implements [`Validate`] by declaring its field rules, in
//! field order, on a [`MessageRules`] builder:
//!
//! ```
//! use message_validation::{MessageRules, StringRule, Validate, ValidationError};
//!
//! struct LoginRequest {
//!     mobile: String,
//!     pass: String,
//! }
//!
//! impl Validate for LoginRequest {
//!     fn validate(&self) -> Result<(), ValidationError> {
//!         MessageRules::new("LoginRequest")
//!             .string("Mobile", &self.mobile, &[StringRule::Len(11)])
//!             .string("Pass", &self.pass, &[StringRule::LenBetween(6, 18)])
//!             .finish()
//!     }
//! }
//!
//! let err = LoginRequest { mobile: "123".into(), pass: "123456".into() }
//!     .validate()
//!     .unwrap_err();
//! assert_eq!(err.field(), "Mobile");
//! ```
//!
//! Checking stops at the first failing field. Fields that are never declared
//! are unconstrained. String lengths are counted in characters, not bytes.

pub mod rules;

pub use error_types::ValidationError;
pub use rules::{IntRule, StringRule};

/// Reason attached to a field whose embedded message failed its own rules.
pub const EMBEDDED_REASON: &str = "embedded message failed validation";

/// A message that can check its own field constraints.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl<T: Validate + ?Sized> Validate for &T {
    fn validate(&self) -> Result<(), ValidationError> {
        (**self).validate()
    }
}

impl<T: Validate + ?Sized> Validate for Box<T> {
    fn validate(&self) -> Result<(), ValidationError> {
        (**self).validate()
    }
}

/// Fail-fast rule set for one message.
///
/// Once a field fails, every later declaration is skipped and
/// [`finish`](Self::finish) returns that first failure.
#[derive(Debug)]
#[must_use = "call finish() to obtain the validation result"]
pub struct MessageRules {
    message: &'static str,
    failure: Option<ValidationError>,
}

impl MessageRules {
    pub fn new(message: &'static str) -> Self {
        Self {
            message,
            failure: None,
        }
    }

    /// Check a string field against its rules, in the order given.
    pub fn string(mut self, field: &'static str, value: &str, rules: &[StringRule<'_>]) -> Self {
        if self.failure.is_none() {
            self.failure = rules
                .iter()
                .find_map(|rule| rule.check(value).err())
                .map(|reason| ValidationError::new(self.message, field, reason));
        }
        self
    }

    /// Check an integer field against its rules, in the order given.
    pub fn int(mut self, field: &'static str, value: i64, rules: &[IntRule<'_>]) -> Self {
        if self.failure.is_none() {
            self.failure = rules
                .iter()
                .find_map(|rule| rule.check(value).err())
                .map(|reason| ValidationError::new(self.message, field, reason));
        }
        self
    }

    /// Recurse into an embedded message. An absent message passes.
    pub fn embedded<M: Validate + ?Sized>(mut self, field: &'static str, value: Option<&M>) -> Self {
        if self.failure.is_none() {
            if let Some(Err(cause)) = value.map(Validate::validate) {
                self.failure = Some(
                    ValidationError::new(self.message, field, EMBEDDED_REASON).caused_by(cause),
                );
            }
        }
        self
    }

    /// Recurse into each element of a repeated message field. The failing
    /// element is reported as `Field[index]`.
    pub fn embedded_each<M: Validate>(mut self, field: &'static str, values: &[M]) -> Self {
        if self.failure.is_none() {
            self.failure = values.iter().enumerate().find_map(|(idx, item)| {
                item.validate().err().map(|cause| {
                    ValidationError::new(self.message, format!("{field}[{idx}]"), EMBEDDED_REASON)
                        .caused_by(cause)
                })
            });
        }
        self
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
