//! # Utility Functions Module
//!
//! This module provides the small helpers shared by the transformers and
//! the reporter: recursive option merging and word inflection.

use serde_json::Value;

/// Recursively merges built-in defaults into user options.
///
/// The user options are never mutated: the result starts as a deep copy of
/// `options` and, for every key of `defaults`:
/// - a nested mapping missing from the user options is copied in wholesale;
/// - a nested mapping present in the user options is merged recursively
///   (a user value that is not a mapping is kept as-is);
/// - a non-mapping default always overwrites the value at that key.
///
/// The last rule means scalar defaults win over user scalars. Users can add
/// keys but cannot change a key that already has a scalar default.
///
/// If either side is not a mapping the user options are returned unchanged.
///
/// # Example
/// ```rust
/// use astro_compress::utils::merge_options;
/// use serde_json::json;
///
/// let merged = merge_options(
///     &json!({ "png": { "extra": 1 } }),
///     &json!({ "png": { "compression": "best" }, "jpeg": { "quality": 80 } }),
/// );
/// assert_eq!(merged["png"]["compression"], "best");
/// assert_eq!(merged["png"]["extra"], 1);
/// assert_eq!(merged["jpeg"]["quality"], 80);
/// ```
pub fn merge_options(options: &Value, defaults: &Value) -> Value {
    let mut output = options.clone();

    if let (Some(user), Some(defaults), Some(merged)) =
        (options.as_object(), defaults.as_object(), output.as_object_mut())
    {
        for (key, default) in defaults {
            if default.is_object() {
                match user.get(key) {
                    None => {
                        merged.insert(key.clone(), default.clone());
                    }
                    Some(value) if value.is_object() => {
                        merged.insert(key.clone(), merge_options(value, default));
                    }
                    // A user scalar or array replaces the default mapping
                    Some(_) => {}
                }
            } else {
                merged.insert(key.clone(), default.clone());
            }
        }
    }

    output
}

/// Picks the singular or plural form of a word for the given count.
pub fn inflect<'a>((singular, plural): (&'a str, &'a str), count: usize) -> &'a str {
    if count == 1 {
        singular
    } else {
        plural
    }
}
