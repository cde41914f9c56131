//! Secret reference resolution.
//!
//! A secret reference is either a YAML value tagged `!secret`:
//!
//! ```yaml
//! sources:
//!   front_door_camera:
//!     uri: !secret front_door_camera_uri
//! ```
//!
//! or, for formats without tags, the plain string `"!secret <key>"`. The key
//! is looked up as a top-level key of the secrets document first, then as a
//! dotted path.

use serde_yaml::value::TaggedValue;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::config::document::{lookup_path, ConfigDocument};

pub const SECRET_TAG: &str = "secret";
const SECRET_PREFIX: &str = "!secret ";

#[derive(Debug, Error, PartialEq)]
pub enum SecretError {
    #[error("secret '{key}' referenced at '{path}' is not defined")]
    Missing { key: String, path: String },

    #[error("secret reference at '{path}' must name a key")]
    Malformed { path: String },
}

/// A reference left in place because no secrets document was available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRef {
    /// Dotted location of the reference inside the config document.
    pub path: String,
    /// Key the reference names.
    pub key: String,
}

/// Output of [`resolve`].
#[derive(Debug)]
pub struct Resolution {
    pub document: ConfigDocument,
    /// References that could not be resolved because `secrets` was absent.
    /// Always empty when a secrets document was supplied.
    pub unresolved: Vec<SecretRef>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Substitute every secret reference in `config` with its value from
/// `secrets`.
///
/// Without a secrets document references are kept verbatim and reported in
/// [`Resolution::unresolved`]. With one, a reference to an undefined key is
/// an error. Neither input is modified.
pub fn resolve(
    config: &ConfigDocument,
    secrets: Option<&ConfigDocument>,
) -> Result<Resolution, SecretError> {
    let mut resolver = Resolver {
        secrets: secrets.map(ConfigDocument::root),
        unresolved: Vec::new(),
    };
    let root = resolver.resolve_mapping(config.root(), "")?;

    Ok(Resolution {
        document: ConfigDocument::new(root),
        unresolved: resolver.unresolved,
    })
}

struct Resolver<'a> {
    secrets: Option<&'a Mapping>,
    unresolved: Vec<SecretRef>,
}

impl Resolver<'_> {
    fn resolve_mapping(&mut self, mapping: &Mapping, path: &str) -> Result<Mapping, SecretError> {
        let mut resolved = Mapping::with_capacity(mapping.len());
        for (key, value) in mapping {
            let child = child_path(path, &key_label(key));
            resolved.insert(key.clone(), self.resolve_value(value, &child)?);
        }
        Ok(resolved)
    }

    fn resolve_value(&mut self, value: &Value, path: &str) -> Result<Value, SecretError> {
        match value {
            Value::Mapping(mapping) => Ok(Value::Mapping(self.resolve_mapping(mapping, path)?)),
            Value::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.resolve_value(item, &child_path(path, &i.to_string())))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Sequence),
            Value::Tagged(tagged) if tagged.tag == SECRET_TAG => {
                let key = tagged
                    .value
                    .as_str()
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| SecretError::Malformed {
                        path: path.to_string(),
                    })?;
                self.substitute(value, key, path)
            }
            Value::Tagged(tagged) => Ok(Value::Tagged(Box::new(TaggedValue {
                tag: tagged.tag.clone(),
                value: self.resolve_value(&tagged.value, path)?,
            }))),
            Value::String(s) => match s.strip_prefix(SECRET_PREFIX).map(str::trim) {
                Some("") => Err(SecretError::Malformed {
                    path: path.to_string(),
                }),
                Some(key) => self.substitute(value, key, path),
                None => Ok(value.clone()),
            },
            _ => Ok(value.clone()),
        }
    }

    fn substitute(&mut self, reference: &Value, key: &str, path: &str) -> Result<Value, SecretError> {
        let Some(secrets) = self.secrets else {
            self.unresolved.push(SecretRef {
                path: path.to_string(),
                key: key.to_string(),
            });
            return Ok(reference.clone());
        };

        secrets
            .get(key)
            .or_else(|| lookup_path(secrets, key))
            .cloned()
            .ok_or_else(|| SecretError::Missing {
                key: key.to_string(),
                path: path.to_string(),
            })
    }
}

fn key_label(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => format!("{other:?}"),
    }
}

fn child_path(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}.{segment}")
    }
}
