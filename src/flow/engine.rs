//! Flow engine — walks a user's profile through the step graph.
//!
//! `step()` is a bounded loop. Each iteration evaluates the node named by
//! `pending_step` and either shows a prompt (stopping) or hops to another
//! node (continuing). Every `pending_step` change is written to the store
//! before the local copy is touched, so a failed write leaves the profile
//! where it was and the same step is retried next turn.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::FlowError;
use crate::flow::definition::{FlowDefinition, FlowNode, NodeKind};
use crate::profile::{ProfileField, ProfileUpdate, UserProfile};
use crate::store::Database;

/// Result of evaluating a single node.
#[derive(Debug, PartialEq)]
enum Outcome {
    /// Show a prompt and stay on this node.
    Show(String),
    /// Move to another node (or finish on `None`) and keep going.
    Hop(Option<String>),
    /// Show a prompt and move on.
    ShowAndAdvance(String, Option<String>),
    /// Clear the step; nothing to say.
    Finish,
}

#[derive(Clone)]
pub struct FlowEngine {
    definition: Arc<FlowDefinition>,
}

impl FlowEngine {
    pub fn new(definition: Arc<FlowDefinition>) -> Self {
        Self { definition }
    }

    /// Place a user who has never entered the flow on the start node.
    /// Returns true when the profile was moved.
    pub async fn start_if_needed(
        &self,
        store: &dyn Database,
        profile: &mut UserProfile,
    ) -> Result<bool, FlowError> {
        if profile.flow_started {
            return Ok(false);
        }
        let start = self.definition.start().to_string();
        let update = ProfileUpdate::new()
            .set(ProfileField::PendingStep, &start)
            .set(ProfileField::FlowStarted, true);
        store.upsert_profile(&profile.user_id, &update).await?;

        debug!(user_id = %profile.user_id, step = %start, "Flow started");
        profile.pending_step = Some(start);
        profile.flow_started = true;
        Ok(true)
    }

    /// The field the active node is waiting for, if it is a gate.
    pub fn expected_field(&self, profile: &UserProfile) -> Option<ProfileField> {
        let node = self.definition.node(profile.pending_step.as_deref()?)?;
        match node.kind {
            NodeKind::Gate { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Advance the flow as far as the profile allows and return the prompt
    /// to show, if any.
    pub async fn step(
        &self,
        store: &dyn Database,
        profile: &mut UserProfile,
    ) -> Result<Option<String>, FlowError> {
        let limit = self.definition.hop_limit();
        let mut hops = 0;

        loop {
            let Some(current) = profile.pending_step.clone() else {
                return Ok(None);
            };

            let Some(node) = self.definition.node(&current) else {
                warn!(user_id = %profile.user_id, step = %current, "Unknown flow step, clearing");
                self.set_step(store, profile, None).await?;
                return Ok(None);
            };

            if hops >= limit {
                warn!(user_id = %profile.user_id, step = %current, hops, "Flow hop limit exceeded");
                self.set_step(store, profile, None).await?;
                return Err(FlowError::HopLimitExceeded {
                    hops,
                    node: current,
                });
            }
            hops += 1;

            match evaluate(node, profile) {
                Outcome::Show(prompt) => return Ok(Some(prompt)),
                Outcome::Hop(next) => self.set_step(store, profile, next).await?,
                Outcome::ShowAndAdvance(prompt, next) => {
                    self.set_step(store, profile, next).await?;
                    return Ok(Some(prompt));
                }
                Outcome::Finish => {
                    self.set_step(store, profile, None).await?;
                    return Ok(None);
                }
            }
        }
    }

    async fn set_step(
        &self,
        store: &dyn Database,
        profile: &mut UserProfile,
        next: Option<String>,
    ) -> Result<(), FlowError> {
        let update = match &next {
            Some(step) => ProfileUpdate::new().set(ProfileField::PendingStep, step),
            None => ProfileUpdate::new().clear(ProfileField::PendingStep),
        };
        store.upsert_profile(&profile.user_id, &update).await?;
        debug!(
            user_id = %profile.user_id,
            from = ?profile.pending_step,
            to = ?next,
            "Flow advanced"
        );
        profile.pending_step = next;
        Ok(())
    }
}

fn evaluate(node: &FlowNode, profile: &UserProfile) -> Outcome {
    match &node.kind {
        NodeKind::Informational { next } => match &node.prompt {
            Some(prompt) => Outcome::ShowAndAdvance(prompt.clone(), next.clone()),
            None => Outcome::Hop(next.clone()),
        },
        NodeKind::Gate { field, next } => {
            if field.is_set(profile) {
                Outcome::Hop(next.clone())
            } else {
                node.prompt
                    .clone()
                    .map_or(Outcome::Finish, Outcome::Show)
            }
        }
        NodeKind::Branch { branches, fallback } => {
            if let Some(region) = profile.region {
                let matched = branches
                    .iter()
                    .find(|b| b.condition.trim().eq_ignore_ascii_case(region.as_str()));
                if let Some(branch) = matched {
                    return Outcome::Hop(branch.target_flow.clone());
                }
            }
            match fallback {
                Some(fb) if fb.target_flow.is_some() => Outcome::Hop(fb.target_flow.clone()),
                Some(fb) => fb
                    .prompt
                    .clone()
                    .or_else(|| node.prompt.clone())
                    .map_or(Outcome::Finish, Outcome::Show),
                None => node.prompt.clone().map_or(Outcome::Finish, Outcome::Show),
            }
        }
    }
}
