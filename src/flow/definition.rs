//! Flow definition — the scripted step graph, parsed and validated once.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;

use crate::error::FlowError;
use crate::profile::ProfileField;

/// The pension flow shipped with the binary.
pub const PENSION_FLOW_YAML: &str = include_str!("../../config/pension_flow.yaml");

const FALLBACK_CONDITIONS: &[&str] = &["default", "else", "*"];

#[derive(Debug, Deserialize)]
struct RawDefinition {
    start: String,
    #[serde(alias = "conversation_flow")]
    nodes: BTreeMap<String, RawNode>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawNode {
    #[serde(default, alias = "script_prompt")]
    prompt: Option<String>,
    #[serde(default)]
    expect_field: Option<ProfileField>,
    #[serde(default)]
    next_step: Option<String>,
    #[serde(default)]
    branching_logic: Vec<Branch>,
}

/// One `branching_logic` entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Branch {
    pub condition: String,
    #[serde(default)]
    pub target_flow: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
}

impl Branch {
    pub fn is_fallback(&self) -> bool {
        FALLBACK_CONDITIONS
            .iter()
            .any(|c| self.condition.trim().eq_ignore_ascii_case(c))
    }
}

/// What a node does when evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Show the prompt and move on.
    Informational { next: Option<String> },
    /// Wait until `field` is set, then move on.
    Gate {
        field: ProfileField,
        next: Option<String>,
    },
    /// Route on the profile region.
    Branch {
        branches: Vec<Branch>,
        fallback: Option<Branch>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowNode {
    pub name: String,
    pub prompt: Option<String>,
    pub kind: NodeKind,
}

impl FlowNode {
    fn from_raw(name: String, raw: RawNode) -> Result<Self, FlowError> {
        let kind = if !raw.branching_logic.is_empty() {
            if raw.expect_field.is_some() || raw.next_step.is_some() {
                return Err(FlowError::InvalidDefinition(format!(
                    "node {name} mixes branching_logic with expect_field/next_step"
                )));
            }
            let (fallbacks, branches): (Vec<_>, Vec<_>) =
                raw.branching_logic.into_iter().partition(Branch::is_fallback);
            if fallbacks.len() > 1 {
                return Err(FlowError::InvalidDefinition(format!(
                    "node {name} has more than one fallback branch"
                )));
            }
            if let Some(branch) = branches.iter().find(|b| b.target_flow.is_none()) {
                return Err(FlowError::InvalidDefinition(format!(
                    "node {name}: branch '{}' has no target_flow",
                    branch.condition
                )));
            }
            NodeKind::Branch {
                branches,
                fallback: fallbacks.into_iter().next(),
            }
        } else if let Some(field) = raw.expect_field {
            if raw.prompt.is_none() {
                return Err(FlowError::InvalidDefinition(format!(
                    "node {name} expects {field} but has no prompt"
                )));
            }
            NodeKind::Gate {
                field,
                next: raw.next_step,
            }
        } else {
            NodeKind::Informational {
                next: raw.next_step,
            }
        };

        Ok(Self {
            name,
            prompt: raw.prompt,
            kind,
        })
    }

    /// Every node name this node can hand control to.
    fn targets(&self) -> Vec<&str> {
        match &self.kind {
            NodeKind::Informational { next } | NodeKind::Gate { next, .. } => {
                next.iter().map(String::as_str).collect()
            }
            NodeKind::Branch { branches, fallback } => branches
                .iter()
                .chain(fallback.iter())
                .filter_map(|b| b.target_flow.as_deref())
                .collect(),
        }
    }
}

/// A validated flow graph.
#[derive(Debug, Clone)]
pub struct FlowDefinition {
    start: String,
    nodes: BTreeMap<String, FlowNode>,
}

impl FlowDefinition {
    /// Parse and validate a YAML document.
    pub fn from_yaml(source: &str) -> Result<Self, FlowError> {
        let raw: RawDefinition = serde_yaml::from_str(source)
            .map_err(|e| FlowError::InvalidDefinition(format!("malformed flow document: {e}")))?;

        let nodes = raw
            .nodes
            .into_iter()
            .map(|(name, node)| Ok((name.clone(), FlowNode::from_raw(name, node)?)))
            .collect::<Result<BTreeMap<_, _>, FlowError>>()?;

        let definition = Self {
            start: raw.start,
            nodes,
        };
        definition.validate()?;
        Ok(definition)
    }

    /// Load a definition from disk.
    pub fn load(path: &Path) -> Result<Self, FlowError> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            FlowError::InvalidDefinition(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&source)
    }

    /// The pension flow bundled with the binary.
    pub fn pension_default() -> Result<Self, FlowError> {
        Self::from_yaml(PENSION_FLOW_YAML)
    }

    fn validate(&self) -> Result<(), FlowError> {
        if !self.nodes.contains_key(&self.start) {
            return Err(FlowError::MissingStart(self.start.clone()));
        }
        for node in self.nodes.values() {
            if let Some(target) = node.targets().into_iter().find(|t| !self.nodes.contains_key(*t)) {
                return Err(FlowError::DanglingReference {
                    node: node.name.clone(),
                    target: target.to_string(),
                });
            }
        }
        let unreachable = self.unreachable_nodes();
        if !unreachable.is_empty() {
            tracing::warn!(nodes = ?unreachable, "Flow has nodes unreachable from start");
        }
        Ok(())
    }

    fn unreachable_nodes(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        let mut queue = vec![self.start.as_str()];
        while let Some(name) = queue.pop() {
            if !seen.insert(name) {
                continue;
            }
            if let Some(node) = self.nodes.get(name) {
                queue.extend(node.targets());
            }
        }
        self.nodes
            .keys()
            .map(String::as_str)
            .filter(|n| !seen.contains(n))
            .collect()
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn node(&self, name: &str) -> Option<&FlowNode> {
        self.nodes.get(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Maximum hops one `step()` may take. Any acyclic walk visits each
    /// node at most once, so more hops than nodes means a cycle.
    pub fn hop_limit(&self) -> usize {
        self.nodes.len() + 1
    }
}
