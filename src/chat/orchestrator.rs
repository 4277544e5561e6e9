//! Chat orchestrator — turns one inbound message into one reply.
//!
//! The gates run in a fixed order and the first one with something to say
//! ends the turn: init greeting, fact extraction, block condition, side-offer
//! acceptance and persona intents, flow step, calculation, and finally the
//! generative fallback.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::chat::prompt::{build_system_prompt, welcome_back};
use crate::error::{ChatError, FlowError};
use crate::flow::FlowEngine;
use crate::llm::GenerativeFallback;
use crate::persona::Persona;
use crate::profile::{PendingAction, ProfileField, ProfileUpdate, UserProfile};
use crate::store::{ChatLogEntry, Database, MessageRole};
use crate::tone::Tone;

/// Message the frontend sends when a chat window opens.
pub const INIT_SENTINEL: &str = "__INIT__";

pub const DEFAULT_HISTORY_LIMIT: usize = 5;

pub const SAVE_FAILED_REPLY: &str = "Sorry, I'm having trouble saving your progress right now. \
                                     Please try again in a moment.";

/// Fields the calculation depends on.
const CALCULATION_INPUTS: [ProfileField; 4] = [
    ProfileField::Region,
    ProfileField::ContributionYears,
    ProfileField::Age,
    ProfileField::RetirementAge,
];

pub struct ChatOrchestrator {
    store: Arc<dyn Database>,
    persona: Arc<dyn Persona>,
    flow: Option<FlowEngine>,
    fallback: GenerativeFallback,
    history_limit: usize,
}

impl ChatOrchestrator {
    pub fn new(
        store: Arc<dyn Database>,
        persona: Arc<dyn Persona>,
        flow: Option<FlowEngine>,
        fallback: GenerativeFallback,
    ) -> Self {
        Self {
            store,
            persona,
            flow,
            fallback,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn persona(&self) -> &Arc<dyn Persona> {
        &self.persona
    }

    pub fn store(&self) -> &Arc<dyn Database> {
        &self.store
    }

    /// Process one message and return the reply.
    pub async fn handle(
        &self,
        user_id: &str,
        message: &str,
        tone: Option<Tone>,
    ) -> Result<String, ChatError> {
        if user_id.trim().is_empty() {
            return Err(ChatError::MissingUserId);
        }
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if message == INIT_SENTINEL {
            return self.handle_init(user_id).await;
        }

        let mut profile = self
            .store
            .get_profile(user_id)
            .await?
            .unwrap_or_else(|| UserProfile::new(user_id));
        let history = self.recent_history(user_id).await;

        // Extraction
        let expected = self.flow.as_ref().and_then(|f| f.expected_field(&profile));
        let update = self.persona.extract(message, expected, &profile);
        if !update.is_empty() {
            profile = self.save_facts(&profile, update).await;
        }

        // Block
        if let Some(reply) = self.persona.block_response(&profile) {
            info!(user_id, persona = %self.persona.kind(), "Turn blocked");
            return Ok(self.finish_turn(user_id, message, reply).await);
        }

        // Side-offers
        if self.persona.wants_tips(&profile, message, &history) {
            if let Some(tips) = self.persona.tips_reply() {
                let tips = tips.to_string();
                self.clear_pending_action(user_id).await;
                debug!(user_id, "Tips offer accepted");
                return Ok(self.finish_turn(user_id, message, tips).await);
            }
        }
        if profile.pending_action.is_some() {
            // Any other reply declines the open offer.
            self.clear_pending_action(user_id).await;
            profile.pending_action = None;
        }
        if let Some(answer) = self.persona.resolve_intent(message).await {
            debug!(user_id, "Answered from persona knowledge");
            return Ok(self.finish_turn(user_id, message, answer).await);
        }

        // Flow
        if let Some(flow) = &self.flow {
            match self.run_flow(flow, &mut profile).await {
                Ok(Some(prompt)) => return Ok(self.finish_turn(user_id, message, prompt).await),
                Ok(None) => {}
                Err(FlowError::Persist(e)) => {
                    error!(user_id, error = %e, "Failed to save flow progress");
                    return Ok(self
                        .finish_turn(user_id, message, SAVE_FAILED_REPLY.to_string())
                        .await);
                }
                Err(e) => warn!(user_id, error = %e, "Flow step failed, falling through"),
            }
        }

        // Calculation
        if profile.pending_step.is_none() && !profile.calculation_delivered {
            if let Some(reply) = self.persona.calculation_reply(&profile) {
                let update = ProfileUpdate::new()
                    .set(ProfileField::PendingAction, PendingAction::OfferTips)
                    .set(ProfileField::CalculationDelivered, true);
                if let Err(e) = self.store.upsert_profile(user_id, &update).await {
                    warn!(user_id, error = %e, "Failed to record delivered calculation");
                }
                info!(user_id, "Calculation delivered");
                return Ok(self.finish_turn(user_id, message, reply).await);
            }
        }

        // Generative fallback
        let system_prompt = build_system_prompt(self.persona.as_ref(), tone, &profile);
        let reply = self.fallback.complete(&system_prompt, &history, message).await;
        if self.persona.should_offer_tips(&reply) {
            let update =
                ProfileUpdate::new().set(ProfileField::PendingAction, PendingAction::OfferTips);
            if let Err(e) = self.store.upsert_profile(user_id, &update).await {
                warn!(user_id, error = %e, "Failed to record tips offer");
            }
        }
        Ok(self.finish_turn(user_id, message, reply).await)
    }

    /// Delete a user's profile and chat log. Returns (profiles, messages) removed.
    pub async fn forget(&self, user_id: &str) -> Result<(u64, u64), ChatError> {
        if user_id.trim().is_empty() {
            return Err(ChatError::MissingUserId);
        }
        let profiles = self.store.delete_profile(user_id).await?;
        let messages = self.store.delete_messages(user_id).await?;
        info!(user_id, profiles, messages, "User data forgotten");
        Ok((profiles, messages))
    }

    async fn handle_init(&self, user_id: &str) -> Result<String, ChatError> {
        let existing = self.store.get_profile(user_id).await?;

        if let Some(flow) = &self.flow {
            let mut profile = existing
                .clone()
                .unwrap_or_else(|| UserProfile::new(user_id));
            match self.run_flow(flow, &mut profile).await {
                Ok(Some(prompt)) => {
                    self.log_turn(user_id, MessageRole::Assistant, &prompt).await;
                    return Ok(prompt);
                }
                Ok(None) => {}
                Err(e) => warn!(user_id, error = %e, "Flow failed on init"),
            }
        }

        let reply = match existing {
            Some(profile) => {
                let name = match self.store.get_user(user_id).await {
                    Ok(user) => user.and_then(|u| u.name),
                    Err(e) => {
                        warn!(user_id, error = %e, "Failed to load user record");
                        None
                    }
                };
                welcome_back(name.as_deref(), &self.persona.format_user_context(&profile))
            }
            None => self.persona.init_message().to_string(),
        };
        self.log_turn(user_id, MessageRole::Assistant, &reply).await;
        Ok(reply)
    }

    async fn run_flow(
        &self,
        flow: &FlowEngine,
        profile: &mut UserProfile,
    ) -> Result<Option<String>, FlowError> {
        flow.start_if_needed(self.store.as_ref(), profile).await?;
        flow.step(self.store.as_ref(), profile).await
    }

    /// Persist extracted facts. On failure the turn carries on with the
    /// stored profile unchanged.
    async fn save_facts(&self, profile: &UserProfile, mut update: ProfileUpdate) -> UserProfile {
        if profile.calculation_delivered {
            let mut candidate = profile.clone();
            candidate.apply_update(&update);
            if calculation_inputs(&candidate) != calculation_inputs(profile) {
                update.insert(ProfileField::CalculationDelivered, false);
            }
        }

        let fields: Vec<&str> = update.iter().map(|(name, _)| name).collect();
        debug!(user_id = %profile.user_id, ?fields, "Extracted facts");

        match self.store.upsert_profile(&profile.user_id, &update).await {
            Ok(saved) => saved,
            Err(e) => {
                warn!(user_id = %profile.user_id, error = %e, "Failed to save extracted facts");
                profile.clone()
            }
        }
    }

    async fn clear_pending_action(&self, user_id: &str) {
        let update = ProfileUpdate::new().clear(ProfileField::PendingAction);
        if let Err(e) = self.store.upsert_profile(user_id, &update).await {
            warn!(user_id, error = %e, "Failed to clear pending action");
        }
    }

    async fn recent_history(&self, user_id: &str) -> Vec<ChatLogEntry> {
        match self.store.get_recent(user_id, self.history_limit).await {
            Ok(history) => history,
            Err(e) => {
                warn!(user_id, error = %e, "Failed to load chat history");
                Vec::new()
            }
        }
    }

    /// Log both sides of a turn and hand back the reply.
    async fn finish_turn(&self, user_id: &str, message: &str, reply: String) -> String {
        self.log_turn(user_id, MessageRole::User, message).await;
        if !reply.is_empty() {
            self.log_turn(user_id, MessageRole::Assistant, &reply).await;
        }
        reply
    }

    async fn log_turn(&self, user_id: &str, role: MessageRole, content: &str) {
        if let Err(e) = self.store.append_message(user_id, role, content).await {
            warn!(user_id, role = role.as_str(), error = %e, "Failed to append chat message");
        }
    }
}

fn calculation_inputs(profile: &UserProfile) -> Vec<serde_json::Value> {
    CALCULATION_INPUTS
        .iter()
        .map(|field| match field {
            ProfileField::Region => serde_json::json!(profile.region),
            ProfileField::ContributionYears => serde_json::json!(profile.contribution_years),
            ProfileField::Age => serde_json::json!(profile.age),
            _ => serde_json::json!(profile.retirement_age),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::{DatabaseError, LlmError};
    use crate::flow::FlowDefinition;
    use crate::llm::{APOLOGY, CompletionRequest, CompletionResponse, LlmProvider};
    use crate::persona::{Concierge, ConciergeKnowledge, PensionGuru};
    use crate::profile::Region;
    use crate::store::{MemoryBackend, UserRecord};

    /// Replies with a fixed string, or fails when `reply` is `None`.
    struct StubLlm {
        reply: Option<&'static str>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl StubLlm {
        fn replying(reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(reply),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmProvider for StubLlm {
        fn model_name(&self) -> &str {
            "stub"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.seen.lock().unwrap().push(request);
            match self.reply {
                Some(reply) => Ok(CompletionResponse {
                    content: reply.to_string(),
                    ..Default::default()
                }),
                None => Err(LlmError::RequestFailed {
                    provider: "stub".to_string(),
                    reason: "offline".to_string(),
                }),
            }
        }
    }

    fn pension_chat(store: Arc<dyn Database>, llm: Arc<StubLlm>) -> ChatOrchestrator {
        let flow = FlowEngine::new(Arc::new(FlowDefinition::pension_default().unwrap()));
        ChatOrchestrator::new(
            store,
            Arc::new(PensionGuru::new()),
            Some(flow),
            GenerativeFallback::new(llm),
        )
    }

    async fn roles(store: &dyn Database, user_id: &str) -> Vec<MessageRole> {
        store
            .get_recent(user_id, 100)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.role)
            .collect()
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let chat = pension_chat(Arc::new(MemoryBackend::new()), StubLlm::replying("hi"));
        assert!(matches!(
            chat.handle("u1", "   ", None).await,
            Err(ChatError::EmptyMessage)
        ));
        assert!(matches!(
            chat.handle("", "hello", None).await,
            Err(ChatError::MissingUserId)
        ));
    }

    #[tokio::test]
    async fn init_shows_welcome_and_logs_assistant_only() {
        let store = Arc::new(MemoryBackend::new());
        let chat = pension_chat(store.clone(), StubLlm::replying("hi"));

        let reply = chat.handle("u1", INIT_SENTINEL, None).await.unwrap();
        assert!(reply.contains("Pension Guru"), "{reply}");
        assert_eq!(roles(store.as_ref(), "u1").await, vec![MessageRole::Assistant]);

        let profile = store.get_profile("u1").await.unwrap().unwrap();
        assert!(profile.flow_started);
        assert_eq!(profile.pending_step.as_deref(), Some("step_ask_region"));
    }

    #[tokio::test]
    async fn ireland_flow_ends_in_calculation_then_tips() {
        let store = Arc::new(MemoryBackend::new());
        let llm = StubLlm::replying("generated");
        let chat = pension_chat(store.clone(), llm.clone());

        chat.handle("u1", INIT_SENTINEL, None).await.unwrap();

        let reply = chat.handle("u1", "I live in Ireland", None).await.unwrap();
        assert!(reply.contains("PRSI"), "{reply}");

        let reply = chat.handle("u1", "20", None).await.unwrap();
        assert_eq!(reply, "How old are you now?");

        let reply = chat.handle("u1", "50", None).await.unwrap();
        assert!(reply.to_lowercase().contains("retire"), "{reply}");

        let reply = chat.handle("u1", "66", None).await.unwrap();
        assert!(reply.contains("€144.65"), "{reply}");
        assert!(reply.contains("€260.37"), "{reply}");

        let profile = store.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.retirement_age, Some(66));
        assert_eq!(profile.pending_action, Some(PendingAction::OfferTips));
        assert!(profile.calculation_delivered);

        let reply = chat.handle("u1", "yes please", None).await.unwrap();
        assert!(reply.starts_with("Here are a few ways"), "{reply}");
        let profile = store.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.pending_action, None);

        // The calculation is not repeated once delivered.
        let reply = chat.handle("u1", "thanks!", None).await.unwrap();
        assert_eq!(reply, "generated");
        assert_eq!(llm.calls(), 1);
    }

    async fn walk_to_retirement_question(chat: &ChatOrchestrator, user_id: &str) {
        chat.handle(user_id, INIT_SENTINEL, None).await.unwrap();
        chat.handle(user_id, "Ireland", None).await.unwrap();
        chat.handle(user_id, "20", None).await.unwrap();
        let reply = chat.handle(user_id, "40", None).await.unwrap();
        assert!(reply.contains("retire"), "{reply}");
    }

    #[tokio::test]
    async fn retirement_sentence_keeps_the_stored_age() {
        let store = Arc::new(MemoryBackend::new());
        let chat = pension_chat(store.clone(), StubLlm::replying("generated"));
        walk_to_retirement_question(&chat, "u1").await;

        let reply = chat
            .handle("u1", "I'd like to retire at age 65", None)
            .await
            .unwrap();
        let profile = store.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.age, Some(40));
        assert_eq!(profile.retirement_age, Some(65));
        assert!(reply.contains("€144.65"), "{reply}");
        assert!(reply.contains("retire at 65"), "{reply}");
        // 20 + 25 years reaches the full rate
        assert!(reply.contains("€289.30"), "{reply}");
    }

    #[tokio::test]
    async fn age_and_retirement_in_one_answer() {
        let store = Arc::new(MemoryBackend::new());
        let chat = pension_chat(store.clone(), StubLlm::replying("generated"));
        walk_to_retirement_question(&chat, "u1").await;

        let reply = chat
            .handle("u1", "I'm 40 and want to retire at 65", None)
            .await
            .unwrap();
        let profile = store.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.age, Some(40));
        assert_eq!(profile.retirement_age, Some(65));
        assert!(reply.contains("retire at 65"), "{reply}");
    }

    #[tokio::test]
    async fn changed_inputs_recalculate() {
        let store = Arc::new(MemoryBackend::new());
        let chat = pension_chat(store.clone(), StubLlm::replying("generated"));
        let update = ProfileUpdate::new()
            .set(ProfileField::Region, Region::Uk)
            .set(ProfileField::ContributionYears, 35)
            .set(ProfileField::FlowStarted, true)
            .set(ProfileField::CalculationDelivered, true);
        store.upsert_profile("u1", &update).await.unwrap();

        let reply = chat.handle("u1", "how are you", None).await.unwrap();
        assert_eq!(reply, "generated");

        let reply = chat.handle("u1", "I'm 40 years old", None).await.unwrap();
        assert!(reply.contains("£221.20"), "{reply}");
    }

    #[tokio::test]
    async fn unsupported_region_blocks_the_turn() {
        let store = Arc::new(MemoryBackend::new());
        let llm = StubLlm::replying("generated");
        let chat = pension_chat(store.clone(), llm.clone());
        chat.handle("u1", INIT_SENTINEL, None).await.unwrap();

        let reply = chat.handle("u1", "I live in Canada", None).await.unwrap();
        assert!(reply.contains("Ireland and the UK"), "{reply}");
        assert_eq!(llm.calls(), 0);
        assert_eq!(
            roles(store.as_ref(), "u1").await,
            vec![MessageRole::Assistant, MessageRole::User, MessageRole::Assistant]
        );

        let reply = chat.handle("u1", "Ireland actually", None).await.unwrap();
        assert!(reply.contains("PRSI"), "{reply}");
    }

    #[tokio::test]
    async fn llm_failure_becomes_apology_and_is_logged() {
        let store = Arc::new(MemoryBackend::new());
        let chat = ChatOrchestrator::new(
            store.clone(),
            Arc::new(PensionGuru::new()),
            None,
            GenerativeFallback::new(StubLlm::failing()),
        );

        let reply = chat.handle("u1", "what is a pension?", None).await.unwrap();
        assert_eq!(reply, APOLOGY);
        let log = store.get_recent("u1", 10).await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].content, APOLOGY);
    }

    #[tokio::test]
    async fn generative_offer_sets_pending_action() {
        let store = Arc::new(MemoryBackend::new());
        let llm = StubLlm::replying("Sure. Would you like some tips on saving more?");
        let chat = ChatOrchestrator::new(
            store.clone(),
            Arc::new(PensionGuru::new()),
            None,
            GenerativeFallback::new(llm.clone()),
        );

        chat.handle("u1", "tell me about pensions", Some(Tone::Teen))
            .await
            .unwrap();
        let profile = store.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.pending_action, Some(PendingAction::OfferTips));

        let system = &llm.seen.lock().unwrap()[0].messages[0].content;
        assert!(system.contains(Tone::Teen.instruction()));
    }

    #[tokio::test]
    async fn history_window_reaches_the_llm() {
        let store = Arc::new(MemoryBackend::new());
        let llm = StubLlm::replying("ok");
        let chat = ChatOrchestrator::new(
            store.clone(),
            Arc::new(PensionGuru::new()),
            None,
            GenerativeFallback::new(llm.clone()),
        )
        .with_history_limit(2);

        for i in 0..3 {
            chat.handle("u1", &format!("question {i}"), None).await.unwrap();
        }
        let seen = llm.seen.lock().unwrap();
        // system + 2 history entries + the new message
        let last = &seen[2].messages;
        assert_eq!(last.len(), 4);
        assert_eq!(last[1].content, "question 1");
        assert_eq!(last[3].content, "question 2");
    }

    #[tokio::test]
    async fn returning_user_is_welcomed_back() {
        let store = Arc::new(MemoryBackend::new());
        store.upsert_user("u1", Some("Aoife"), None).await.unwrap();
        let update = ProfileUpdate::new()
            .set(ProfileField::Region, Region::Ireland)
            .set(ProfileField::Age, 41)
            .set(ProfileField::ContributionYears, 20)
            .set(ProfileField::FlowStarted, true)
            .set(ProfileField::CalculationDelivered, true);
        store.upsert_profile("u1", &update).await.unwrap();

        let chat = pension_chat(store.clone(), StubLlm::replying("hi"));
        let reply = chat.handle("u1", INIT_SENTINEL, None).await.unwrap();
        assert!(reply.starts_with("Welcome back, Aoife!"), "{reply}");
        assert!(reply.contains("Region: Ireland, Age: 41"), "{reply}");
    }

    #[tokio::test]
    async fn concierge_answers_from_knowledge() {
        let store = Arc::new(MemoryBackend::new());
        let llm = StubLlm::replying("generated");
        let knowledge = ConciergeKnowledge::bundled().unwrap();
        let chat = ChatOrchestrator::new(
            store.clone(),
            Arc::new(Concierge::new(knowledge, None)),
            None,
            GenerativeFallback::new(llm.clone()),
        );

        let reply = chat.handle("g1", INIT_SENTINEL, None).await.unwrap();
        assert!(reply.starts_with("Welcome to the White Sands Hotel"), "{reply}");

        let reply = chat.handle("g1", "when is checkout?", None).await.unwrap();
        assert!(reply.contains("11:00 AM"), "{reply}");
        assert_eq!(llm.calls(), 0);

        chat.handle("g1", "a table for 2 at 8pm", None).await.unwrap();
        let profile = store.get_profile("g1").await.unwrap().unwrap();
        assert_eq!(profile.party_size, Some(2));
        assert_eq!(profile.booking_time.as_deref(), Some("8pm"));
    }

    #[tokio::test]
    async fn forget_clears_profile_and_log() {
        let store = Arc::new(MemoryBackend::new());
        let chat = pension_chat(store.clone(), StubLlm::replying("hi"));
        chat.handle("u1", INIT_SENTINEL, None).await.unwrap();
        chat.handle("u1", "Ireland", None).await.unwrap();

        let (profiles, messages) = chat.forget("u1").await.unwrap();
        assert_eq!(profiles, 1);
        assert_eq!(messages, 3);
        assert!(store.get_profile("u1").await.unwrap().is_none());

        // The next init starts from scratch.
        let reply = chat.handle("u1", INIT_SENTINEL, None).await.unwrap();
        assert!(reply.contains("Pension Guru"), "{reply}");
    }

    /// Profile writes fail; everything else delegates to memory.
    struct ReadOnlyProfiles(MemoryBackend);

    #[async_trait]
    impl Database for ReadOnlyProfiles {
        async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, DatabaseError> {
            self.0.get_profile(user_id).await
        }
        async fn upsert_profile(
            &self,
            _user_id: &str,
            _update: &ProfileUpdate,
        ) -> Result<UserProfile, DatabaseError> {
            Err(DatabaseError::Query("disk full".to_string()))
        }
        async fn delete_profile(&self, user_id: &str) -> Result<u64, DatabaseError> {
            self.0.delete_profile(user_id).await
        }
        async fn append_message(
            &self,
            user_id: &str,
            role: MessageRole,
            content: &str,
        ) -> Result<(), DatabaseError> {
            self.0.append_message(user_id, role, content).await
        }
        async fn get_recent(
            &self,
            user_id: &str,
            limit: usize,
        ) -> Result<Vec<ChatLogEntry>, DatabaseError> {
            self.0.get_recent(user_id, limit).await
        }
        async fn delete_messages(&self, user_id: &str) -> Result<u64, DatabaseError> {
            self.0.delete_messages(user_id).await
        }
        async fn upsert_user(
            &self,
            id: &str,
            name: Option<&str>,
            email: Option<&str>,
        ) -> Result<UserRecord, DatabaseError> {
            self.0.upsert_user(id, name, email).await
        }
        async fn get_user(&self, id: &str) -> Result<Option<UserRecord>, DatabaseError> {
            self.0.get_user(id).await
        }
    }

    #[tokio::test]
    async fn failed_flow_write_reports_trouble_saving() {
        let store = Arc::new(ReadOnlyProfiles(MemoryBackend::new()));
        let chat = pension_chat(store.clone(), StubLlm::replying("hi"));

        let reply = chat.handle("u1", "hello", None).await.unwrap();
        assert_eq!(reply, SAVE_FAILED_REPLY);
        assert_eq!(store.get_recent("u1", 10).await.unwrap().len(), 2);
    }
}
