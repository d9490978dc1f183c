//! Unified error interface for Plexus.
//!
//! Every error type in the kernel implements [`ErrorCode`] so that
//! dispatch results, audit records, and agent-facing error events carry
//! a stable machine-readable code alongside the human-readable message.

/// Unified error code interface for Plexus errors.
///
/// # Code Format
///
/// - **UPPER_SNAKE_CASE**: e.g. `"ROUTER_HANDLER_TIMEOUT"`
/// - **Domain-prefixed**: `EVENT_`, `STATE_`, `CAP_`, `ROUTER_`,
///   `TRANSFORM_`, `CONFIG_`
/// - **Stable**: codes are an API contract; changing one is a breaking
///   change
///
/// # Recoverability
///
/// An error is recoverable when retrying may succeed (timeouts,
/// transient delivery failures). Validation failures, permission
/// denials, and malformed input are not: retrying without a change
/// cannot help.
///
/// # Example
///
/// ```
/// use plexus_types::ErrorCode;
///
/// enum RouteError {
///     HandlerTimeout,
///     InvalidPattern,
/// }
///
/// impl ErrorCode for RouteError {
///     fn code(&self) -> &'static str {
///         match self {
///             Self::HandlerTimeout => "ROUTER_HANDLER_TIMEOUT",
///             Self::InvalidPattern => "ROUTER_INVALID_PATTERN",
///         }
///     }
///
///     fn is_recoverable(&self) -> bool {
///         matches!(self, Self::HandlerTimeout)
///     }
/// }
/// ```
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;

    /// Returns whether retrying the operation may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Validates that an error code follows Plexus conventions.
///
/// # Checks
///
/// 1. Code is UPPER_SNAKE_CASE
/// 2. Code starts with the expected domain prefix
/// 3. Code is not empty
///
/// # Panics
///
/// Panics with a descriptive message if validation fails. Intended for
/// use in tests covering every variant of an error enum.
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "Error code must not be empty");

    assert!(
        code.starts_with(expected_prefix),
        "Error code '{}' must start with prefix '{}'",
        code,
        expected_prefix
    );

    assert!(
        is_upper_snake_case(code),
        "Error code '{}' must be UPPER_SNAKE_CASE",
        code
    );
}

/// Validates multiple error codes at once.
///
/// Use this to verify all variants of an error enum share a prefix.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

/// Checks if a string is UPPER_SNAKE_CASE.
fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
