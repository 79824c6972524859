//! Tree node types for templates and rendered output.
//!
//! A [`TemplateNode`] is a recursive text-with-placeholders structure
//! supplied by configuration; an [`OutputNode`] is the fully substituted
//! result handed to the document writer.

use serde::{Deserialize, Serialize};

/// A template tree node: text containing zero or more placeholders, plus
/// child templates rendered beneath it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateNode {
    /// Text with placeholders.
    pub text: String,
    /// Child templates, in render order.
    #[serde(default)]
    pub children: Vec<TemplateNode>,
}

impl TemplateNode {
    /// Creates a childless template node.
    pub fn leaf(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            children: Vec::new(),
        }
    }

    /// Creates a template node with children.
    pub fn with_children(text: impl Into<String>, children: Vec<TemplateNode>) -> Self {
        Self {
            text: text.into(),
            children,
        }
    }
}

/// A rendered output node: fully substituted text plus rendered children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputNode {
    /// Fully substituted text.
    pub text: String,
    /// Rendered children, in order.
    #[serde(default)]
    pub children: Vec<OutputNode>,
}

impl OutputNode {
    /// Creates a childless output node (error and sentinel lines).
    pub fn leaf(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            children: Vec::new(),
        }
    }
}
