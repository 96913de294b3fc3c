use crate::value::NodeId;

/// Failure to render a [`crate::Value`] as JSON.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToJsonError {
    #[error("node {node} is its own descendant; JSON has no way to express the cycle")]
    Cycle { node: NodeId },

    #[error("non-finite float {value} has no JSON representation")]
    NonFiniteFloat { value: f64 },
}
