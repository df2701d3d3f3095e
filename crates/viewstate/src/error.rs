#![forbid(unsafe_code)]

//! Error taxonomy shared by every component.
//!
//! All variants are recoverable at the call site. Callers branch on the
//! returned value; nothing here crosses a component boundary as a panic.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StateError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// The absent sentinel was offered where a value is required.
    #[error("absent value rejected for '{name}'")]
    InvalidValue { name: String },

    /// A store entry, box, or registry id does not exist.
    #[error("unknown key '{name}'")]
    UnknownKey { name: String },

    /// Delete or clear attempted while subscribers remain.
    #[error("'{name}' still has {subscribers} subscriber(s)")]
    PreconditionViolated { name: String, subscribers: usize },

    /// Operation on a view or box after its teardown.
    #[error("'{name}' used after teardown")]
    UseAfterTeardown { name: String },

    /// A stored value or parameter does not have the requested type.
    #[error("type mismatch for '{name}': expected {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    /// The registry cannot hand out another id.
    #[error("subscriber registry exhausted ({live} live subscribers)")]
    RegistryExhausted { live: usize },

    /// A render pass was opened while another one is still running.
    #[error("view '{view}' is already rendering")]
    RenderInProgress { view: String },

    /// An ancestor already provides a property under this name.
    #[error("property '{name}' is already provided by an ancestor view")]
    DuplicateProvide { name: String },

    /// No ancestor provides a property under this name.
    #[error("no provided property named '{name}'")]
    MissingProvide { name: String },

    /// A storage is already registered under this lookup path.
    #[error("storage already registered at '{path}'")]
    StorageExists { path: String },
}

impl StateError {
    pub(crate) fn invalid_value(name: impl Into<String>) -> Self {
        Self::InvalidValue { name: name.into() }
    }

    pub(crate) fn unknown_key(name: impl Into<String>) -> Self {
        Self::UnknownKey { name: name.into() }
    }

    pub(crate) fn after_teardown(name: impl Into<String>) -> Self {
        Self::UseAfterTeardown { name: name.into() }
    }

    /// Whether the error signals misuse of the API rather than bad input.
    #[must_use]
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            Self::UseAfterTeardown { .. } | Self::RenderInProgress { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_entry_and_count() {
        let err = StateError::PreconditionViolated {
            name: "theme".into(),
            subscribers: 3,
        };
        assert_eq!(err.to_string(), "'theme' still has 3 subscriber(s)");
    }

    #[test]
    fn programmer_errors() {
        assert!(StateError::after_teardown("v").is_programmer_error());
        assert!(!StateError::invalid_value("x").is_programmer_error());
        assert!(!StateError::unknown_key("x").is_programmer_error());
    }
}
