//! Public macros for constructing option structs without relying on struct
//! literal syntax.
//!
//! These macros keep call sites ergonomic while allowing the crate to grow
//! its option structs over time (adding fields) without breaking changes.

/// Construct [`crate::ParseOptions`] from `Default` and a list of field
/// assignments.
///
/// Example:
///
/// ```rust
/// let options = inibind::parse_options! {
///     datablocks: true,
///     ordered_headers: Some(vec!["General".to_string(), "Definition".to_string()]),
/// };
/// ```
#[macro_export]
macro_rules! parse_options {
    ( $( $field:ident : $value:expr ),* $(,)? ) => {{
        let mut opt = $crate::ParseOptions::default();
        $(
            opt.$field = $value;
        )*
        opt
    }};
}

/// Construct [`crate::WriteOptions`] from `Default` and a list of field
/// assignments.
///
/// Example:
///
/// ```rust
/// let opts = inibind::write_options! {
///     float_format: Some("%.4f".to_string()),
///     key_column: 22,
/// };
/// ```
#[macro_export]
macro_rules! write_options {
    ( $( $field:ident : $value:expr ),* $(,)? ) => {{
        let mut opt = $crate::WriteOptions::default();
        $(
            opt.$field = $value;
        )*
        opt
    }};
}
