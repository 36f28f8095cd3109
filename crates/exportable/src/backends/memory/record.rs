use crate::model::Persistable;
use crate::value::{AttributeValue, Attributes, RecordKey};

/// Record handle of the memory store
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRecord {
    class_name: String,
    attributes: Attributes,
    key: Option<RecordKey>,
    pending: Vec<PendingLink>,
}

/// Association change written when the owning record is saved
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingLink {
    pub association: String,
    pub class_name: String,
    pub key: RecordKey,
}

impl MemoryRecord {
    pub(crate) fn new(class_name: &str, attributes: Attributes) -> Self {
        Self {
            class_name: class_name.to_string(),
            attributes,
            key: None,
            pending: Vec::new(),
        }
    }

    pub(crate) fn persisted(class_name: &str, key: RecordKey, attributes: Attributes) -> Self {
        Self {
            key: Some(key),
            ..Self::new(class_name, attributes)
        }
    }

    /// Primary key, once saved
    pub fn key(&self) -> Option<&RecordKey> {
        self.key.as_ref()
    }

    pub fn get(&self, attribute: &str) -> Option<&AttributeValue> {
        self.attributes.get(attribute)
    }

    pub(crate) fn set(&mut self, attribute: &str, value: AttributeValue) {
        self.attributes.insert(attribute.to_string(), value);
    }

    pub(crate) fn mark_persisted(&mut self, key: RecordKey) {
        self.key = Some(key);
    }

    pub(crate) fn queue_link(&mut self, link: PendingLink) {
        self.pending.push(link);
    }

    pub(crate) fn take_pending(&mut self) -> Vec<PendingLink> {
        std::mem::take(&mut self.pending)
    }
}

impl Persistable for MemoryRecord {
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn attributes(&self) -> Attributes {
        self.attributes.clone()
    }

    fn is_new_record(&self) -> bool {
        self.key.is_none()
    }
}
