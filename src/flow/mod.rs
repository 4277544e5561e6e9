//! Scripted conversation flow: a declarative step graph and the engine
//! that walks each user's profile through it.

pub mod definition;
pub mod engine;

pub use definition::{Branch, FlowDefinition, FlowNode, NodeKind, PENSION_FLOW_YAML};
pub use engine::FlowEngine;
