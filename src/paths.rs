//! Destination path fragments
//!
//! | shape        | metadata format                 | source format          |
//! |--------------|---------------------------------|------------------------|
//! | combined     | `dir/name.suffix`               | `dir/name.suffix-meta.json` |
//! | split parent | `dir/name/name.suffix`          | same, with the marker  |
//! | split child  | `dir/name/childDir/key.suffix`  | same, with the marker  |
//!
//! The source marker comes from [`ConvertConfig::source_marker`].

use crate::registry::{ChildTypeInfo, TypeInfo};
use crate::types::{ConvertConfig, Format};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::path::PathBuf;

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[<>:"/\\|?*%\x00-\x1f]"#).unwrap()
});

/// Make a name usable as a single path segment
///
/// Unsafe characters (and `%` itself) become `%XX`, so distinct names never
/// share a segment. `.` and `..` are escaped whole; the empty name is `%`.
pub fn sanitize_segment(name: &str) -> Cow<'_, str> {
    match name {
        "" => return Cow::Borrowed("%"),
        "." => return Cow::Borrowed("%2E"),
        ".." => return Cow::Borrowed("%2E%2E"),
        _ => {}
    }
    UNSAFE_CHARS.replace_all(name, |caps: &Captures| format!("%{:02X}", caps[0].as_bytes()[0]))
}

pub fn file_name(name: &str, suffix: &str, format: Format, config: &ConvertConfig) -> String {
    let name = sanitize_segment(name);
    match format {
        Format::Metadata => format!("{}.{}", name, suffix),
        Format::Source => format!("{}.{}{}", name, suffix, config.source_marker),
    }
}

/// Path of a whole component written as one document
pub fn combined_path(
    type_info: &TypeInfo,
    full_name: &str,
    format: Format,
    config: &ConvertConfig,
) -> PathBuf {
    PathBuf::from(&type_info.directory_name).join(file_name(
        full_name,
        &type_info.suffix,
        format,
        config,
    ))
}

/// Path of the parent's own file when its children are split out
pub fn split_parent_path(
    type_info: &TypeInfo,
    parent_name: &str,
    format: Format,
    config: &ConvertConfig,
) -> PathBuf {
    PathBuf::from(&type_info.directory_name)
        .join(sanitize_segment(parent_name).as_ref())
        .join(file_name(parent_name, &type_info.suffix, format, config))
}

/// Path of one split child
pub fn split_child_path(
    type_info: &TypeInfo,
    parent_name: &str,
    child_type: &ChildTypeInfo,
    key: &str,
    format: Format,
    config: &ConvertConfig,
) -> PathBuf {
    PathBuf::from(&type_info.directory_name)
        .join(sanitize_segment(parent_name).as_ref())
        .join(&child_type.directory_name)
        .join(file_name(key, &child_type.suffix, format, config))
}
