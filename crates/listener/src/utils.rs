//! Utility macros used internally by the crate.

/// Returns early with an error if a condition is not met.
///
/// Like `assert!`, but returns `Err($error)` instead of panicking.
///
/// ```ignore
/// ensure!(!name.is_empty(), ConfigError::InvalidServerName { reason: "server name is empty".to_string() });
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
