//! Tag template resolution.
//!
//! Tag values configured by the caller may reference build facts through
//! `{{ placeholder }}` syntax. The built-in placeholders are `region` and
//! `source_ami`; arbitrary extra key/value pairs from the step configuration
//! are resolved the same way. Keys are passed through verbatim.

use crate::ec2::Tag;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;

/// Error produced by tag template resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TagResolveError {
    /// A tag value referenced a placeholder with no known binding.
    #[error("unknown placeholder '{{{{{placeholder}}}}}' in value of tag '{key}'")]
    UnknownPlaceholder {
        /// The tag key whose value failed to resolve.
        key: String,
        /// The unresolvable placeholder name.
        placeholder: String,
    },
}

#[allow(clippy::expect_used)]
fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z0-9_.-]+)\s*\}\}").expect("placeholder pattern is valid")
    })
}

/// Resolves a raw tag mapping into a concrete tag set.
///
/// The result is sorted by key so batched tagging calls are deterministic.
pub fn resolve_tags(
    raw: &HashMap<String, String>,
    region: &str,
    source_image_id: &str,
    extra: &HashMap<String, String>,
) -> Result<Vec<Tag>, TagResolveError> {
    let mut tags = Vec::with_capacity(raw.len());

    for (key, value) in raw {
        let mut missing: Option<String> = None;
        let resolved = placeholder_re().replace_all(value, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            match lookup(name, region, source_image_id, extra) {
                Some(bound) => bound.to_string(),
                None => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });

        if let Some(placeholder) = missing {
            return Err(TagResolveError::UnknownPlaceholder {
                key: key.clone(),
                placeholder,
            });
        }

        tags.push(Tag::new(key, resolved.into_owned()));
    }

    tags.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(tags)
}

fn lookup<'a>(
    name: &str,
    region: &'a str,
    source_image_id: &'a str,
    extra: &'a HashMap<String, String>,
) -> Option<&'a str> {
    match name {
        "region" => Some(region),
        "source_ami" => Some(source_image_id),
        _ => extra.get(name).map(String::as_str),
    }
}
