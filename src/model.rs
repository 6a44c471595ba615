//! The todo entity.
//!
//! Field names on the wire are capitalised (`Id`, `Text`, `Done`); existing
//! JSON clients depend on that exact shape.

use serde::{Deserialize, Serialize};

/// Storage-assigned identity of a [`TodoItem`]. Never reissued once deleted.
pub type TodoId = i64;

/// A single todo record.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TodoItem {
    #[serde(rename = "Id")]
    pub id: TodoId,
    #[serde(rename = "Text")]
    pub text: String,
    #[serde(rename = "Done")]
    pub done: bool,
}

impl TodoItem {
    /// A freshly created item: not done yet.
    pub fn new(id: TodoId, text: impl Into<String>) -> Self {
        Self { id, text: text.into(), done: false }
    }
}

/// Every stored item, in ascending id order.
pub type TodoList = Vec<TodoItem>;
