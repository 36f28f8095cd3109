//! Matcher - identity resolution for imported nodes

use tracing::debug;

use crate::config::{ImportConfig, NaturalKeyPolicy};
use crate::document::DocumentNode;
use crate::error::{ImportError, ImportResult};
use crate::model::RecordStore;
use crate::value::{AttributeValue, Attributes};

/// Decides whether an incoming node maps to an existing record or a new one
pub trait Matcher<S: RecordStore> {
    /// Always yields a record; new records are returned unsaved
    fn match_node(&self, store: &S, node: &DocumentNode) -> ImportResult<S::Record>;
}

/// Identifier first, then natural key, then a new record
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMatcher {
    ignore_ids: bool,
    natural_key_policy: NaturalKeyPolicy,
}

impl DefaultMatcher {
    pub fn new(ignore_ids: bool, natural_key_policy: NaturalKeyPolicy) -> Self {
        Self {
            ignore_ids,
            natural_key_policy,
        }
    }

    fn natural_key_criteria(keys: &[String], attributes: &Attributes) -> Attributes {
        keys.iter()
            .map(|key| {
                let value = attributes.get(key).cloned().unwrap_or(AttributeValue::Null);
                (key.clone(), value)
            })
            .collect()
    }
}

impl From<&ImportConfig> for DefaultMatcher {
    fn from(config: &ImportConfig) -> Self {
        Self::new(config.ignore_ids, config.natural_key_policy)
    }
}

impl<S: RecordStore> Matcher<S> for DefaultMatcher {
    fn match_node(&self, store: &S, node: &DocumentNode) -> ImportResult<S::Record> {
        let class_name = node.class_name.as_str();
        let id_name = store.primary_key_name(class_name)?;

        let identifier = node
            .attributes
            .get(&id_name)
            .filter(|id| !self.ignore_ids && !id.is_blank());

        if let Some(id) = identifier {
            // An identifier that finds nothing means "create with this id"
            return match store.find(class_name, id)? {
                Some(record) => {
                    debug!("Matched {} by {} {}", class_name, id_name, id);
                    Ok(record)
                }
                None => Ok(store.instantiate(class_name)?),
            };
        }

        if let Some(keys) = store.natural_key(class_name)?.filter(|keys| !keys.is_empty()) {
            let criteria = Self::natural_key_criteria(&keys, &node.attributes);
            let mut candidates = store.find_by(class_name, &criteria)?;

            match (candidates.len(), self.natural_key_policy) {
                (0, _) => {}
                (1, _) | (_, NaturalKeyPolicy::First) => {
                    debug!("Matched {} by natural key {:?}", class_name, keys);
                    return Ok(candidates.swap_remove(0));
                }
                (count, NaturalKeyPolicy::Strict) => {
                    return Err(ImportError::AmbiguousMatch {
                        class_name: class_name.to_string(),
                        criteria: describe(&criteria),
                        count,
                    });
                }
            }
        }

        Ok(store.instantiate(class_name)?)
    }
}

fn describe(criteria: &Attributes) -> String {
    criteria
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}
