//! # Utility Functions Module
//!
//! Helpers that keep external command lines readable.

/// Builds a `Vec<String>` from heterogeneous `Display` items.
///
/// # Example
/// ```rust
/// use media_compressor::args;
///
/// let crf = 23;
/// let args = args!["-crf", crf, "-preset", "medium"];
/// assert_eq!(args, vec!["-crf", "23", "-preset", "medium"]);
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        ::std::vec![$(::std::string::ToString::to_string(&$item)),*]
    };
}
