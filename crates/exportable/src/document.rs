//! Document model - the portable, encoding-agnostic form of a record graph

use serde::{Deserialize, Serialize};

use crate::relationships::AssociationKind;
use crate::value::{AttributeValue, Attributes};

/// One exported record plus its included associations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    pub class_name: String,

    #[serde(default)]
    pub attributes: Attributes,

    #[serde(default)]
    pub associations: Vec<AssociationDocument>,
}

impl DocumentNode {
    pub fn new(class_name: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            class_name: class_name.into(),
            attributes,
            associations: Vec::new(),
        }
    }

    pub fn with_association(mut self, association: AssociationDocument) -> Self {
        self.associations.push(association);
        self
    }

    /// Association document by name
    pub fn association(&self, name: &str) -> Option<&AssociationDocument> {
        self.associations.iter().find(|a| a.name == name)
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Association documents whose targets must exist before this record is saved
    pub fn owning_associations(&self) -> impl Iterator<Item = &AssociationDocument> {
        self.associations.iter().filter(|a| a.kind.is_owning())
    }

    /// Association documents whose targets reference this record
    pub fn owned_associations(&self) -> impl Iterator<Item = &AssociationDocument> {
        self.associations.iter().filter(|a| !a.kind.is_owning())
    }
}

/// One exported relationship instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationDocument {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_type: Option<String>,

    pub kind: AssociationKind,

    /// Absent for an empty to-one association
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<AssociationContent>,
}

impl AssociationDocument {
    pub fn new(name: impl Into<String>, kind: AssociationKind) -> Self {
        Self {
            name: name.into(),
            inverse: None,
            foreign_key: None,
            foreign_type: None,
            kind,
            content: None,
        }
    }

    pub fn with_content(mut self, content: AssociationContent) -> Self {
        self.content = Some(content);
        self
    }

    /// Nested nodes regardless of cardinality
    pub fn nodes(&self) -> &[DocumentNode] {
        match &self.content {
            None => &[],
            Some(content) => content.nodes(),
        }
    }
}

/// Nested node(s) of an association document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssociationContent {
    Many(Vec<DocumentNode>),
    One(Box<DocumentNode>),
}

impl AssociationContent {
    pub fn nodes(&self) -> &[DocumentNode] {
        match self {
            AssociationContent::Many(nodes) => nodes,
            AssociationContent::One(node) => std::slice::from_ref(node.as_ref()),
        }
    }

    pub fn is_many(&self) -> bool {
        matches!(self, AssociationContent::Many(_))
    }
}

/// Top-level export result: one node, or one per element of a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Document {
    Many(Vec<DocumentNode>),
    One(DocumentNode),
}

impl Document {
    pub fn nodes(&self) -> &[DocumentNode] {
        match self {
            Document::Many(nodes) => nodes,
            Document::One(node) => std::slice::from_ref(node),
        }
    }

    pub fn into_nodes(self) -> Vec<DocumentNode> {
        match self {
            Document::Many(nodes) => nodes,
            Document::One(node) => vec![node],
        }
    }

    /// The single node of a record export
    pub fn as_one(&self) -> Option<&DocumentNode> {
        match self {
            Document::One(node) => Some(node),
            Document::Many(_) => None,
        }
    }
}

impl From<DocumentNode> for Document {
    fn from(node: DocumentNode) -> Self {
        Document::One(node)
    }
}

impl From<Vec<DocumentNode>> for Document {
    fn from(nodes: Vec<DocumentNode>) -> Self {
        Document::Many(nodes)
    }
}
