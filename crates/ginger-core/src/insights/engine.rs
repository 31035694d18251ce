//! Insight Engine - orchestrates the recommendation pipeline
//!
//! Every intent runs the same single-pass state machine:
//! `Assembling → Retrieving → Prompting → Generating → Parsed`, or `Failed`.
//!
//! - Calendar and knowledge-index failures degrade the context and the request continues
//! - Backend failures and cancellation abort the request with
//!   [`Error::GenerationFailed`], carrying the assembled context and prompt
//! - Invalid requests are rejected before any collaborator is called

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::ai::{Completion, GenerativeBackend, GenerativeClient};
use crate::calendar::CalendarProvider;
use crate::cancel::RequestOptions;
use crate::config::GingerConfig;
use crate::context::{
    AssembledContext, ContextAssembler, Intent, KnowledgeSnippet, RawInputs, NO_EVENTS_SUMMARY,
};
use crate::error::{Error, ErrorKind, GenerationFailure, Result};
use crate::knowledge::KnowledgeIndex;
use crate::ledger::InteractionLedger;
use crate::models::{CalendarEvent, GoalStatus};
use crate::prompts::{Prompt, PromptId, PromptLibrary};

use super::parsing::SectionParser;
use super::types::{Insight, InsightRequest, PipelineStage, SectionKind, Sections, TokenUsage};

/// Knowledge domains searched when planning activities
pub const ACTIVITY_DOMAINS: [&str; 2] = ["activities", "bonding"];

/// Knowledge domains searched for communication advice
pub const COMMUNICATION_DOMAINS: [&str; 2] = ["communication", "psychology"];

/// The insight engine
///
/// Collaborators are constructed once and passed in; the engine holds no
/// per-request state, so one instance serves concurrent requests.
pub struct InsightEngine {
    config: Arc<GingerConfig>,
    calendar: Arc<dyn CalendarProvider>,
    index: Arc<KnowledgeIndex>,
    ledger: InteractionLedger,
    assembler: ContextAssembler,
    client: GenerativeClient,
    prompt: Prompt,
    parser: SectionParser,
}

impl InsightEngine {
    /// Create an engine using the default prompt library (overrides, then embedded)
    pub fn new(
        config: Arc<GingerConfig>,
        calendar: Arc<dyn CalendarProvider>,
        index: Arc<KnowledgeIndex>,
        ledger: InteractionLedger,
        client: GenerativeClient,
    ) -> Result<Self> {
        let mut library = PromptLibrary::new();
        let prompt = library.get(PromptId::FamilyInsights)?.clone();
        let assembler = ContextAssembler::new(
            Arc::new(config.family.clone()),
            config.ledger.window_days,
        )
        .with_ledger(ledger.clone());

        Ok(Self {
            config,
            calendar,
            index,
            ledger,
            assembler,
            client,
            prompt,
            parser: SectionParser::new()?,
        })
    }

    /// Use a specific prompt instead of the library default
    pub fn with_prompt(mut self, prompt: Prompt) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn client(&self) -> &GenerativeClient {
        &self.client
    }

    pub fn ledger(&self) -> &InteractionLedger {
        &self.ledger
    }

    pub fn index(&self) -> &KnowledgeIndex {
        &self.index
    }

    pub fn config(&self) -> &GingerConfig {
        &self.config
    }

    // ── Intents ─────────────────────────────────────────────────────────────

    /// Attribute upcoming events to family members
    ///
    /// Without `recommend` no model is called and the insight lists events per
    /// member. With it, the calendar context is sent for activity recommendations.
    pub async fn analyze_calendar(&self, recommend: bool) -> Result<Insight> {
        self.analyze_calendar_with(recommend, RequestOptions::default())
            .await
    }

    pub async fn analyze_calendar_with(
        &self,
        recommend: bool,
        options: RequestOptions,
    ) -> Result<Insight> {
        if recommend {
            return self
                .recommend_from_calendar(Intent::AnalyzeCalendar, options)
                .await;
        }

        let intent = Intent::AnalyzeCalendar;
        stage(intent, PipelineStage::Assembling);
        let events = self.fetch_events().await;
        let context = self.assembler.build(
            intent,
            RawInputs {
                events,
                ..Default::default()
            },
        );

        let mut sections = Sections::new();
        sections.insert(SectionKind::FamilyEvents, family_event_lines(&context));

        stage(intent, PipelineStage::Parsed);
        Ok(context_only(context, sections))
    }

    /// Generate recommendations for a caller-supplied context
    pub async fn generate_insights(&self, request: InsightRequest) -> Result<Insight> {
        self.generate_insights_with(request, RequestOptions::default())
            .await
    }

    pub async fn generate_insights_with(
        &self,
        request: InsightRequest,
        options: RequestOptions,
    ) -> Result<Insight> {
        request.validate()?;

        let intent = Intent::GenerateInsights;
        stage(intent, PipelineStage::Assembling);
        let context = self.assembler.build(
            intent,
            RawInputs {
                text: request.context.clone(),
                members: request.family_members.clone(),
                ..Default::default()
            },
        );

        self.run_generation(context, &request, &options).await
    }

    /// Activity recommendations for the members on the upcoming calendar
    pub async fn plan_activities(&self) -> Result<Insight> {
        self.plan_activities_with(RequestOptions::default()).await
    }

    pub async fn plan_activities_with(&self, options: RequestOptions) -> Result<Insight> {
        self.recommend_from_calendar(Intent::PlanActivities, options)
            .await
    }

    /// Advice for a described situation
    ///
    /// Members whose keywords (or ids) appear in the situation get their ledger
    /// analytics merged in.
    pub async fn get_communication_advice(&self, situation: &str) -> Result<Insight> {
        self.get_communication_advice_with(situation, RequestOptions::default())
            .await
    }

    pub async fn get_communication_advice_with(
        &self,
        situation: &str,
        options: RequestOptions,
    ) -> Result<Insight> {
        let request = InsightRequest::new(situation)
            .with_domains(COMMUNICATION_DOMAINS)
            .with_members(self.members_mentioned(situation));
        request.validate()?;

        let intent = Intent::CommunicationAdvice;
        stage(intent, PipelineStage::Assembling);
        let context = self.assembler.build(
            intent,
            RawInputs {
                text: request.context.clone(),
                members: request.family_members.clone(),
                ..Default::default()
            },
        );

        self.run_generation(context, &request, &options).await
    }

    /// Interaction analytics per member plus active goals; no model call
    pub async fn track_progress(&self) -> Result<Insight> {
        let intent = Intent::TrackProgress;
        stage(intent, PipelineStage::Assembling);

        let events = self.fetch_events().await;
        let goals = match self.ledger.goals(Some(GoalStatus::Active)) {
            Ok(goals) => goals,
            Err(e) => {
                warn!(error = %e, "Ledger unavailable, omitting goals");
                Vec::new()
            }
        };

        let context = self.assembler.build(
            intent,
            RawInputs {
                events,
                members: self.config.family.member_ids(),
                goals,
                ..Default::default()
            },
        );

        let mut progress: Vec<String> =
            context.analytics.iter().map(|a| a.summary_line()).collect();
        progress.extend(context.goals.iter().map(|g| g.summary_line()));

        let mut sections = Sections::new();
        sections.insert(SectionKind::Progress, progress);
        sections.insert(SectionKind::FamilyEvents, family_event_lines(&context));

        stage(intent, PipelineStage::Parsed);
        Ok(context_only(context, sections))
    }

    // ── Pipeline ────────────────────────────────────────────────────────────

    /// Calendar context fed into generation with the activity domains
    async fn recommend_from_calendar(
        &self,
        intent: Intent,
        options: RequestOptions,
    ) -> Result<Insight> {
        stage(intent, PipelineStage::Assembling);
        let events = self.fetch_events().await;

        // Attribution first: its members decide whose analytics get merged
        let calendar = self.assembler.build(
            intent,
            RawInputs {
                events,
                ..Default::default()
            },
        );
        let members = calendar.attributed_members();
        let request = InsightRequest::new(calendar.summary.clone())
            .with_domains(ACTIVITY_DOMAINS)
            .with_members(members.clone());
        request.validate()?;

        let context = self.assembler.build(
            intent,
            RawInputs {
                events: calendar.events,
                members,
                ..Default::default()
            },
        );

        self.run_generation(context, &request, &options).await
    }

    /// RETRIEVING → PROMPTING → GENERATING → PARSED for an assembled context
    async fn run_generation(
        &self,
        mut context: AssembledContext,
        request: &InsightRequest,
        options: &RequestOptions,
    ) -> Result<Insight> {
        let intent = context.intent;

        stage(intent, PipelineStage::Retrieving);
        context.knowledge = self
            .retrieve(&request.context, &request.knowledge_domains)
            .await;

        stage(intent, PipelineStage::Prompting);
        let prompt = self.render_prompt(&context);

        stage(intent, PipelineStage::Generating);
        let completion = match self.generate(&prompt, options).await {
            Ok(completion) => completion,
            Err(e) => return Err(generation_failed(context, prompt, e)),
        };

        let sections = self.parser.parse(&completion.text);
        if !sections.values().any(|items| !items.is_empty()) {
            return Err(generation_failed(
                context,
                prompt,
                Error::BackendRejected("empty completion".into()),
            ));
        }

        stage(intent, PipelineStage::Parsed);
        info!(
            intent = %intent,
            sections = sections.len(),
            knowledge = context.knowledge.len(),
            prompt_tokens = completion.prompt_tokens,
            completion_tokens = completion.completion_tokens,
            "Generated insight"
        );

        Ok(Insight {
            intent,
            sections,
            token_usage: Some(TokenUsage {
                prompt_tokens: completion.prompt_tokens,
                completion_tokens: completion.completion_tokens,
            }),
            raw_model_text: Some(completion.text),
            context,
            generated_at: Utc::now(),
        })
    }

    /// Upcoming events; an unavailable calendar yields none
    async fn fetch_events(&self) -> Vec<CalendarEvent> {
        match self
            .calendar
            .list_upcoming_events(self.config.calendar.max_results)
            .await
        {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "Calendar unavailable, continuing without events");
                Vec::new()
            }
        }
    }

    /// Knowledge for the request; an unavailable index yields none
    async fn retrieve(&self, text: &str, domains: &[String]) -> Vec<KnowledgeSnippet> {
        match self.index.query(text, domains).await {
            Ok(documents) => {
                debug!(domains = ?domains, retrieved = documents.len(), "Retrieved knowledge");
                documents
                    .into_iter()
                    .map(|d| KnowledgeSnippet {
                        id: d.id,
                        domain: d.domain,
                        text: d.text,
                    })
                    .collect()
            }
            Err(e) => {
                warn!(
                    domains = ?domains,
                    error = %e,
                    "Knowledge index unavailable, continuing without knowledge"
                );
                Vec::new()
            }
        }
    }

    fn render_prompt(&self, context: &AssembledContext) -> String {
        let rendered_context = context.render();
        let knowledge = context.render_knowledge();
        let members = context.members.join(", ");

        let mut vars = HashMap::new();
        vars.insert("intent", context.intent.as_str());
        vars.insert("context", rendered_context.as_str());
        vars.insert("knowledge", knowledge.as_str());
        vars.insert("members", members.as_str());

        self.prompt.render_combined(&vars)
    }

    /// Backend call bounded by the request's cancellation token and deadline
    async fn generate(&self, prompt: &str, options: &RequestOptions) -> Result<Completion> {
        let max_tokens = self.config.backend.max_tokens;

        let call = async {
            match options.deadline {
                Some(deadline) => {
                    tokio::time::timeout(deadline, self.client.complete(prompt, max_tokens))
                        .await
                        .unwrap_or(Err(Error::Cancelled))
                }
                None => self.client.complete(prompt, max_tokens).await,
            }
        };

        match options.cancel {
            Some(ref token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(Error::Cancelled),
                    result = call => result,
                }
            }
            None => call.await,
        }
    }

    /// Configured members whose keywords or id appear in `text`, config order
    fn members_mentioned(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        self.config
            .family
            .members
            .iter()
            .filter(|m| m.matches(text) || lower.contains(&m.id.to_lowercase()))
            .map(|m| m.id.clone())
            .collect()
    }
}

fn stage(intent: Intent, stage: PipelineStage) {
    debug!(intent = %intent, stage = %stage, "Pipeline stage");
}

/// Wrap a GENERATING failure with everything derived so far
fn generation_failed(context: AssembledContext, prompt: String, error: Error) -> Error {
    let kind = match error.kind() {
        kind @ (ErrorKind::BackendRejected | ErrorKind::Cancelled) => kind,
        _ => ErrorKind::BackendUnavailable,
    };
    warn!(
        intent = %context.intent,
        error_kind = %kind,
        error = %error,
        "Generation failed"
    );

    Error::GenerationFailed(Box::new(GenerationFailure {
        kind,
        message: error.to_string(),
        stage: PipelineStage::Generating,
        context,
        prompt: Some(prompt),
    }))
}

/// One line per member with events, then anything unattributed
fn family_event_lines(context: &AssembledContext) -> Vec<String> {
    if context.events.is_empty() {
        return vec![NO_EVENTS_SUMMARY.to_string()];
    }

    let mut lines: Vec<String> = context
        .member_events
        .iter()
        .filter(|m| !m.events.is_empty())
        .map(|m| format!("{}: {}", m.member, m.events.join(", ")))
        .collect();
    if !context.unattributed.is_empty() {
        lines.push(format!("unattributed: {}", context.unattributed.join(", ")));
    }
    lines
}

fn context_only(context: AssembledContext, sections: Sections) -> Insight {
    Insight {
        intent: context.intent,
        sections,
        raw_model_text: None,
        token_usage: None,
        context,
        generated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::DateTime;

    use super::*;
    use crate::ai::MockBackend;
    use crate::calendar::StaticCalendar;
    use crate::cancel::CancellationToken;
    use crate::db::Database;
    use crate::knowledge::{DocumentSource, EmbeddingProvider, HashedEmbedder};
    use crate::ledger::LedgerStore;
    use crate::models::{parse_event_time, Goal, InteractionRecord, NewGoal, NewInteraction};

    fn event(summary: &str, start: &str) -> CalendarEvent {
        CalendarEvent::new(summary, parse_event_time(start).unwrap())
    }

    fn engine_with(calendar: StaticCalendar, backend: MockBackend) -> InsightEngine {
        let index = KnowledgeIndex::new(Arc::new(HashedEmbedder::new(64)), 3);
        let ledger = InteractionLedger::new(Arc::new(Database::in_memory().unwrap()));
        engine_from(calendar, index, ledger, backend)
    }

    fn engine_from(
        calendar: StaticCalendar,
        index: KnowledgeIndex,
        ledger: InteractionLedger,
        backend: MockBackend,
    ) -> InsightEngine {
        let config = Arc::new(GingerConfig::embedded().unwrap());
        let mut library = PromptLibrary::embedded_only();
        let prompt = library.get(PromptId::FamilyInsights).unwrap().clone();

        InsightEngine::new(
            config,
            Arc::new(calendar),
            Arc::new(index),
            ledger,
            GenerativeClient::Mock(backend),
        )
        .unwrap()
        .with_prompt(prompt)
    }

    /// Embeds like `HashedEmbedder` until switched off
    struct SwitchableEmbedder {
        inner: HashedEmbedder,
        down: AtomicBool,
    }

    #[async_trait]
    impl EmbeddingProvider for SwitchableEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if self.down.load(Ordering::SeqCst) {
                return Err(Error::IndexUnavailable("embedding service down".into()));
            }
            self.inner.embed(text).await
        }

        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }

        fn name(&self) -> &str {
            "switchable"
        }
    }

    /// Every call fails the way a locked or corrupt database would
    struct BrokenStore;

    impl LedgerStore for BrokenStore {
        fn insert_interaction(
            &self,
            _interaction: &NewInteraction,
            _timestamp: DateTime<Utc>,
        ) -> Result<InteractionRecord> {
            Err(Error::Database(rusqlite::Error::InvalidQuery))
        }

        fn interactions_since(
            &self,
            _since: DateTime<Utc>,
            _member: Option<&str>,
        ) -> Result<Vec<InteractionRecord>> {
            Err(Error::Database(rusqlite::Error::InvalidQuery))
        }

        fn insert_goal(&self, _goal: &NewGoal, _created_at: DateTime<Utc>) -> Result<Goal> {
            Err(Error::Database(rusqlite::Error::InvalidQuery))
        }

        fn list_goals(&self, _status: Option<GoalStatus>) -> Result<Vec<Goal>> {
            Err(Error::Database(rusqlite::Error::InvalidQuery))
        }

        fn set_goal_status(
            &self,
            _id: i64,
            _status: GoalStatus,
            _note: Option<&str>,
        ) -> Result<Goal> {
            Err(Error::Database(rusqlite::Error::InvalidQuery))
        }
    }

    fn calendar() -> StaticCalendar {
        StaticCalendar::new(vec![
            event("school play", "2024-01-12T17:00"),
            event("date night", "2024-01-11T19:00"),
            event("oil change", "2024-01-11T08:00"),
        ])
    }

    #[tokio::test]
    async fn test_analyze_calendar_context_only() {
        let backend = MockBackend::new();
        let engine = engine_with(calendar(), backend.clone());

        let insight = engine.analyze_calendar(false).await.unwrap();
        assert!(!insight.is_generated());
        assert!(insight.token_usage.is_none());
        assert_eq!(
            insight.section(SectionKind::FamilyEvents),
            &[
                "wife: date night".to_string(),
                "son: school play".to_string(),
                "unattributed: oil change".to_string(),
            ]
        );
        assert!(backend.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_analyze_calendar_with_recommendations() {
        let backend = MockBackend::new();
        let engine = engine_with(calendar(), backend.clone());

        let insight = engine.analyze_calendar(true).await.unwrap();
        assert_eq!(insight.intent, Intent::AnalyzeCalendar);
        assert!(insight.is_generated());
        assert_eq!(insight.context.members, vec!["wife", "son"]);
        assert_eq!(backend.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_generate_insights_three_sections() {
        let engine = engine_with(StaticCalendar::default(), MockBackend::new());
        let insight = engine
            .generate_insights(
                InsightRequest::new("Weekend coming up").with_domains(["activities"]),
            )
            .await
            .unwrap();

        assert_eq!(insight.sections.len(), 3);
        assert!(!insight.section(SectionKind::Improvements).is_empty());
        assert!(!insight.section(SectionKind::ConversationTopics).is_empty());
        assert!(!insight.section(SectionKind::Activities).is_empty());
        assert!(insight.token_usage.unwrap().total() > 0);
    }

    #[tokio::test]
    async fn test_invalid_request_makes_no_calls() {
        let backend = MockBackend::new();
        let engine = engine_with(StaticCalendar::default(), backend.clone());

        let err = engine
            .generate_insights(InsightRequest::new("context only"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let err = engine.get_communication_advice("   ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(backend.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_keeps_context() {
        let engine = engine_with(
            StaticCalendar::default(),
            MockBackend::new().failing(ErrorKind::BackendRejected),
        );
        engine
            .index()
            .index(DocumentSource::new("talk-1", "communication", "Listen before advising"))
            .await
            .unwrap();

        let err = engine
            .get_communication_advice("My son is quiet after school")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackendRejected);

        let failure = err.generation_failure().unwrap();
        assert_eq!(failure.stage, PipelineStage::Generating);
        assert_eq!(failure.context.members, vec!["son"]);
        assert_eq!(failure.context.knowledge.len(), 1);
        assert!(failure
            .prompt
            .as_deref()
            .unwrap()
            .contains("Listen before advising"));
    }

    #[tokio::test]
    async fn test_empty_completion_fails() {
        let engine = engine_with(StaticCalendar::default(), MockBackend::new().with_text("  \n"));
        let err = engine
            .generate_insights(InsightRequest::new("anything").with_domains(["activities"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackendRejected);
        assert!(err.generation_failure().is_some());
    }

    #[tokio::test]
    async fn test_calendar_outage_degrades() {
        let engine = engine_with(StaticCalendar::unavailable(), MockBackend::new());

        let insight = engine.plan_activities().await.unwrap();
        assert!(insight.context.events.is_empty());
        assert_eq!(insight.context.summary, NO_EVENTS_SUMMARY);
        assert!(insight.has_content());
    }

    #[tokio::test]
    async fn test_index_outage_generates_without_knowledge() {
        let embedder = Arc::new(SwitchableEmbedder {
            inner: HashedEmbedder::new(64),
            down: AtomicBool::new(false),
        });
        let index = KnowledgeIndex::new(embedder.clone(), 3);
        index
            .index(DocumentSource::new("hike", "activities", "A short family hike"))
            .await
            .unwrap();
        embedder.down.store(true, Ordering::SeqCst);

        let backend = MockBackend::new();
        let ledger = InteractionLedger::new(Arc::new(Database::in_memory().unwrap()));
        let engine = engine_from(StaticCalendar::default(), index, ledger, backend.clone());

        let insight = engine
            .generate_insights(InsightRequest::new("Rainy Saturday").with_domains(["activities"]))
            .await
            .unwrap();
        assert!(insight.is_generated());
        assert!(insight.context.knowledge.is_empty());

        let prompts = backend.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(!prompts[0].contains("Relevant knowledge"));
        assert!(!prompts[0].contains("family hike"));
    }

    #[tokio::test]
    async fn test_ledger_outage_generates_without_analytics() {
        let backend = MockBackend::new();
        let engine = engine_from(
            StaticCalendar::default(),
            KnowledgeIndex::new(Arc::new(HashedEmbedder::new(64)), 3),
            InteractionLedger::new(Arc::new(BrokenStore)),
            backend.clone(),
        );

        let insight = engine
            .get_communication_advice("My son is quiet after school")
            .await
            .unwrap();
        assert!(insight.is_generated());
        assert_eq!(insight.context.members, vec!["son"]);
        assert!(insight.context.analytics.is_empty());

        let prompts = backend.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(!prompts[0].contains("Recent interactions"));

        let progress = engine.track_progress().await.unwrap();
        assert!(progress.section(SectionKind::Progress).is_empty());
    }

    #[tokio::test]
    async fn test_plan_activities_uses_activity_knowledge() {
        let backend = MockBackend::new();
        let engine = engine_with(calendar(), backend.clone());
        engine
            .index()
            .index(DocumentSource::new("hike", "activities", "A short family hike"))
            .await
            .unwrap();
        engine
            .index()
            .index(DocumentSource::new("budget", "finance", "Track spending"))
            .await
            .unwrap();

        let insight = engine.plan_activities().await.unwrap();
        assert_eq!(insight.intent, Intent::PlanActivities);
        let ids: Vec<&str> = insight.context.knowledge.iter().map(|k| k.id.as_str()).collect();
        assert_eq!(ids, vec!["hike"]);

        let prompt = &backend.prompts()[0];
        assert!(prompt.contains("Event with son: school play on 2024-01-12T17:00"));
        assert!(prompt.contains("Family members in focus: wife, son"));
    }

    #[tokio::test]
    async fn test_track_progress_without_generation() {
        let backend = MockBackend::new();
        let engine = engine_with(StaticCalendar::default(), backend.clone());
        engine
            .ledger()
            .record(NewInteraction::new("son", "homework", 40, 7))
            .unwrap();
        engine
            .ledger()
            .set_goal(NewGoal {
                category: "bonding".into(),
                description: "Weekly pancake breakfast".into(),
                target_date: None,
            })
            .unwrap();

        let insight = engine.track_progress().await.unwrap();
        assert!(!insight.is_generated());

        let progress = insight.section(SectionKind::Progress);
        // wife, son, overall, then the goal
        assert_eq!(progress.len(), 4);
        assert!(progress[1].starts_with("son: 1 interactions"));
        assert!(progress[2].starts_with("everyone: 1 interactions"));
        assert!(progress[3].contains("Weekly pancake breakfast"));
        assert!(backend.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_during_generation() {
        let engine = engine_with(
            StaticCalendar::default(),
            MockBackend::new().with_delay(Duration::from_secs(5)),
        );
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = engine
            .generate_insights_with(
                InsightRequest::new("anything").with_domains(["activities"]),
                RequestOptions::default().with_cancel(token),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(err.generation_failure().unwrap().prompt.is_some());
    }

    #[tokio::test]
    async fn test_deadline_expiry_is_cancelled() {
        let engine = engine_with(
            StaticCalendar::default(),
            MockBackend::new().with_delay(Duration::from_secs(5)),
        );
        let err = engine
            .plan_activities_with(
                RequestOptions::default().with_deadline(Duration::from_millis(20)),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_members_mentioned() {
        let engine = engine_with(StaticCalendar::default(), MockBackend::new());
        assert_eq!(
            engine.members_mentioned("Our SON skipped his school play"),
            vec!["son"]
        );
        assert_eq!(
            engine.members_mentioned("Planning a date with my wife"),
            vec!["wife"]
        );
        assert!(engine.members_mentioned("The car needs repairs").is_empty());
    }
}
