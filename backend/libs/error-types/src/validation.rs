//! Field-level validation failure with a nested cause chain.

use std::fmt;

/// A single failing field rule, optionally caused by a failure inside an
/// embedded message.
///
/// The chain runs outer-to-inner: the top-level field is the head and the
/// innermost failing field is the tail of `cause`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: &'static str,
    field: String,
    reason: String,
    cause: Option<Box<ValidationError>>,
    key: bool,
}

impl ValidationError {
    pub fn new(message: &'static str, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            message,
            field: field.into(),
            reason: reason.into(),
            cause: None,
            key: false,
        }
    }

    /// Wrap a nested failure as the cause of this one.
    pub fn caused_by(mut self, cause: ValidationError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Mark the failure as concerning a map key rather than a value.
    pub fn for_key(mut self) -> Self {
        self.key = true;
        self
    }

    /// Name of the message type that declared the failing rule.
    pub fn message(&self) -> &'static str {
        self.message
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn cause(&self) -> Option<&ValidationError> {
        self.cause.as_deref()
    }

    pub fn is_key(&self) -> bool {
        self.key
    }

    /// Iterate the chain from this error down to the innermost cause.
    pub fn chain(&self) -> impl Iterator<Item = &ValidationError> {
        std::iter::successors(Some(self), |e| e.cause())
    }

    /// Dotted path of field names along the chain, e.g. `Data.Name`.
    pub fn field_path(&self) -> String {
        self.chain()
            .map(ValidationError::field)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.key { "key for " } else { "" };
        write!(f, "invalid {}{}.{}: {}", key, self.message, self.field, self.reason)?;
        if let Some(cause) = &self.cause {
            write!(f, " | caused by: {}", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}
