//! Argument list helpers

/// Builds an argument vector from anything convertible into a `Value`.
///
/// # Example
///
/// ```rust
/// use mqlite_client::args;
/// use mqlite_core::Value;
/// let args = args![5, "hello", true];
/// assert_eq!(args[1], Value::from("hello"));
/// ```
#[macro_export]
macro_rules! args {
    [$($expr:expr),* $(,)?] => {
        vec![$(
            $crate::__private::Value::from($expr)
        ),*]
    };
}
