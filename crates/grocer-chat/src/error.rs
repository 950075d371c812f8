//! Error types for the conversational interface.

use grocer_core::error::GrocerError;

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat is disabled")]
    Disabled,
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("oracle error: {0}")]
    Oracle(String),
    #[error("state error: {0}")]
    StateError(String),
}

impl From<GrocerError> for ChatError {
    fn from(err: GrocerError) -> Self {
        ChatError::StateError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        let err = ChatError::Disabled;
        assert_eq!(err.to_string(), "chat is disabled");

        let err = ChatError::EmptyMessage;
        assert_eq!(err.to_string(), "message cannot be empty");

        let err = ChatError::MessageTooLong(2000);
        assert_eq!(
            err.to_string(),
            "message exceeds maximum length of 2000 characters"
        );

        let err = ChatError::Oracle("HTTP 503".to_string());
        assert_eq!(err.to_string(), "oracle error: HTTP 503");

        let err = ChatError::StateError("lock poisoned".to_string());
        assert_eq!(err.to_string(), "state error: lock poisoned");
    }

    #[test]
    fn test_chat_error_from_grocer_error() {
        let err = GrocerError::Catalog("duplicate id".to_string());
        let chat_err: ChatError = err.into();
        assert!(matches!(chat_err, ChatError::StateError(_)));
        assert!(chat_err.to_string().contains("duplicate id"));
    }

    #[test]
    fn test_chat_error_message_too_long_boundary_zero() {
        let err = ChatError::MessageTooLong(0);
        assert_eq!(
            err.to_string(),
            "message exceeds maximum length of 0 characters"
        );
    }

    #[test]
    fn test_chat_error_unicode_inner_messages() {
        let err = ChatError::Oracle("bad JSON near \u{00a3}".to_string());
        assert!(err.to_string().contains("\u{00a3}"));
    }

    #[test]
    fn test_errors_implement_debug() {
        let dbg = format!("{:?}", ChatError::EmptyMessage);
        assert!(dbg.contains("EmptyMessage"));

        let dbg = format!("{:?}", ChatError::Oracle("x".to_string()));
        assert!(dbg.contains("Oracle"));
    }
}
