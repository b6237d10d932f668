use super::*;
use crate::agent::TurnOutcome;
use crate::conversation::ConversationStore;
use async_trait::async_trait;
use futures_util::StreamExt;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Agent replying from a script and committing like the real loop does.
struct FakeAgent {
    persona: Persona,
    store: SharedConversation,
    replies: Mutex<VecDeque<String>>,
    fallback: String,
    contexts: Mutex<Vec<Option<String>>>,
}

impl FakeAgent {
    fn new(role: AgentRole, fallback: &str, store: &SharedConversation) -> Arc<Self> {
        Arc::new(Self {
            persona: Persona::new(format!("Fake {}", role), role, "fake"),
            store: store.clone(),
            replies: Mutex::new(VecDeque::new()),
            fallback: fallback.to_string(),
            contexts: Mutex::new(Vec::new()),
        })
    }

    fn reply_once(&self, reply: &str) {
        self.replies.lock().unwrap().push_back(reply.to_string());
    }

    fn contexts(&self) -> Vec<Option<String>> {
        self.contexts.lock().unwrap().clone()
    }

    fn calls(&self) -> usize {
        self.contexts.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatAgent for FakeAgent {
    fn persona(&self) -> &Persona {
        &self.persona
    }

    async fn run_turn(
        &self,
        context: Option<&str>,
        on_chunk: &mut (dyn for<'c> FnMut(&'c str) -> bool + Send),
    ) -> CrewResult<TurnOutcome> {
        self.contexts.lock().unwrap().push(context.map(str::to_string));
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        for piece in reply.split_inclusive(' ') {
            if !on_chunk(piece) {
                return Err(CrewError::Cancelled);
            }
        }

        let message = self.store.write().await.add_message(self.persona.role, reply, None);
        Ok(TurnOutcome {
            message,
            iterations: 1,
            hit_cap: false,
        })
    }
}

struct Crew {
    coder: Arc<FakeAgent>,
    critic: Arc<FakeAgent>,
    debugger: Arc<FakeAgent>,
    architect: Arc<FakeAgent>,
    end_user: Arc<FakeAgent>,
    questioner: Arc<FakeAgent>,
    store: SharedConversation,
}

impl Crew {
    fn new() -> Self {
        let store = ConversationStore::shared();
        Self {
            coder: FakeAgent::new(AgentRole::Coder, "Updated the code.", &store),
            critic: FakeAgent::new(AgentRole::Critic, "NEEDS CHANGES: the parser drops errors.", &store),
            debugger: FakeAgent::new(AgentRole::Debugger, "Found the bug.", &store),
            architect: FakeAgent::new(AgentRole::Architect, "Split it into two layers.", &store),
            end_user: FakeAgent::new(AgentRole::EndUser, "The output is hard to read.", &store),
            questioner: FakeAgent::new(AgentRole::Questioner, "Yes, add them.", &store),
            store,
        }
    }

    fn orchestrator(&self, config: OrchestratorConfig) -> Orchestrator {
        let agents: Vec<Arc<dyn ChatAgent>> = vec![
            self.coder.clone(),
            self.critic.clone(),
            self.debugger.clone(),
            self.architect.clone(),
            self.end_user.clone(),
            self.questioner.clone(),
        ];
        Orchestrator::with_agents(config, agents, self.store.clone())
    }
}

fn enabled_only(roles: &[&str]) -> OrchestratorConfig {
    OrchestratorConfig {
        enabled_agents: roles.iter().map(|r| r.to_string()).collect(),
        ..Default::default()
    }
}

async fn agent_events(stream: AgentStream) -> Vec<AgentEvent> {
    stream
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<CrewResult<Vec<_>>>()
        .unwrap()
}

async fn protocol_events(stream: ProtocolStream) -> Vec<ProtocolEvent> {
    stream
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<CrewResult<Vec<_>>>()
        .unwrap()
}

fn text_of(events: &[AgentEvent], role: AgentRole) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::Chunk { role: r, content } if *r == role => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_run_agent_streams_chunks_then_complete() {
    let crew = Crew::new();
    crew.coder.reply_once("Here is the code.");
    let orchestrator = crew.orchestrator(OrchestratorConfig::default());

    let events = agent_events(orchestrator.run_agent(AgentRole::Coder, Some("Write it".into()))).await;

    assert_eq!(text_of(&events, AgentRole::Coder), "Here is the code.");
    match events.last() {
        Some(AgentEvent::Complete { role, message }) => {
            assert_eq!(*role, AgentRole::Coder);
            assert_eq!(message.content, "Here is the code.");
        }
        other => panic!("expected complete, got {:?}", other),
    }
    assert_eq!(crew.coder.contexts(), vec![Some("Write it".to_string())]);
    assert_eq!(crew.store.read().await.len(), 1);
}

#[tokio::test]
async fn test_run_agent_rejects_disabled_role() {
    let crew = Crew::new();
    let orchestrator = crew.orchestrator(enabled_only(&["coder"]));

    let items: Vec<_> = orchestrator.run_agent(AgentRole::Critic, None).collect().await;

    assert_eq!(items.len(), 1);
    match &items[0] {
        Err(CrewError::Agent { role, message }) => {
            assert_eq!(role, "critic");
            assert_eq!(message, "Agent critic is not enabled");
        }
        other => panic!("expected agent error, got {:?}", other),
    }
    assert_eq!(crew.critic.calls(), 0);
}

#[tokio::test]
async fn test_questions_are_handed_off_before_completion() {
    let crew = Crew::new();
    crew.coder.reply_once("I wrote the parser. Should I add tests?");
    let orchestrator = crew.orchestrator(OrchestratorConfig::default());

    let events = agent_events(orchestrator.run_agent(AgentRole::Coder, None)).await;

    let detected = events
        .iter()
        .position(|e| matches!(e, AgentEvent::QuestionsDetected { .. }))
        .expect("questions detected");
    match &events[detected] {
        AgentEvent::QuestionsDetected { from, questions } => {
            assert_eq!(*from, AgentRole::Coder);
            assert_eq!(questions, &vec!["Should I add tests?".to_string()]);
        }
        _ => unreachable!(),
    }

    assert_eq!(text_of(&events, AgentRole::Questioner), "Yes, add them.");
    let completes: Vec<AgentRole> = events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::Complete { role, .. } => Some(*role),
            _ => None,
        })
        .collect();
    assert_eq!(completes, vec![AgentRole::Questioner, AgentRole::Coder]);

    let context = crew.questioner.contexts()[0].clone().unwrap();
    assert!(context.starts_with("The coder agent asked:"));
    assert!(context.contains("1. Should I add tests?"));

    let store = crew.store.read().await;
    let roles: Vec<AgentRole> = store.messages().iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![AgentRole::Coder, AgentRole::Questioner]);
}

#[tokio::test]
async fn test_hand_off_can_be_disabled() {
    let crew = Crew::new();
    crew.coder.reply_once("Should I add tests?");
    crew.coder.reply_once("Should I add tests?");

    let no_auto = OrchestratorConfig {
        auto_answer_questions: false,
        ..Default::default()
    };
    let events = agent_events(crew.orchestrator(no_auto).run_agent(AgentRole::Coder, None)).await;
    assert!(!events.iter().any(|e| matches!(e, AgentEvent::QuestionsDetected { .. })));

    let no_depth = OrchestratorConfig {
        max_handoff_depth: 0,
        ..Default::default()
    };
    agent_events(crew.orchestrator(no_depth).run_agent(AgentRole::Coder, None)).await;

    assert_eq!(crew.questioner.calls(), 0);
}

#[tokio::test]
async fn test_questioner_does_not_hand_off_to_itself() {
    let crew = Crew::new();
    crew.questioner.reply_once("What do you mean by tests?");
    let orchestrator = crew.orchestrator(OrchestratorConfig::default());

    let events = agent_events(orchestrator.run_agent(AgentRole::Questioner, None)).await;

    assert!(!events.iter().any(|e| matches!(e, AgentEvent::QuestionsDetected { .. })));
    assert_eq!(crew.questioner.calls(), 1);
}

#[tokio::test]
async fn test_hand_off_skipped_when_questioner_disabled() {
    let crew = Crew::new();
    crew.coder.reply_once("Should I add tests?");
    let orchestrator = crew.orchestrator(enabled_only(&["coder", "critic"]));

    let events = agent_events(orchestrator.run_agent(AgentRole::Coder, None)).await;

    assert_eq!(events.len(), 5);
    assert_eq!(crew.questioner.calls(), 0);
}

#[tokio::test]
async fn test_review_approves_on_first_pass() {
    let crew = Crew::new();
    crew.critic.reply_once("Clean and tested. APPROVED");
    let orchestrator = crew.orchestrator(OrchestratorConfig::default());

    let events = protocol_events(orchestrator.run_review_cycle()).await;

    assert_eq!(events[0], ProtocolEvent::Start { role: AgentRole::Critic });
    match events.last() {
        Some(ProtocolEvent::Complete {
            role,
            content,
            message,
            approved,
        }) => {
            assert_eq!(*role, AgentRole::Critic);
            assert_eq!(content, "Clean and tested. APPROVED");
            assert!(message.is_some());
            assert_eq!(*approved, Some(true));
        }
        other => panic!("expected complete, got {:?}", other),
    }
    assert_eq!(crew.critic.contexts(), vec![Some(REVIEW_PROMPT.to_string())]);
    assert_eq!(crew.coder.calls(), 0);
    assert_eq!(crew.end_user.calls(), 0);
    assert_eq!(crew.store.read().await.review_cycle(), 1);
}

#[tokio::test]
async fn test_review_forces_approval_after_max_cycles() {
    let crew = Crew::new();
    let orchestrator = crew.orchestrator(OrchestratorConfig::default());

    let events = protocol_events(orchestrator.run_review_cycle()).await;

    assert_eq!(crew.critic.calls(), 3);
    assert_eq!(crew.end_user.calls(), 2);
    assert_eq!(crew.coder.calls(), 2);
    assert!(crew.coder.contexts().iter().all(|c| c.as_deref() == Some(REVISE_PROMPT)));
    assert!(crew.end_user.contexts().iter().all(Option::is_none));

    let rejections = events
        .iter()
        .filter(|e| matches!(e, ProtocolEvent::Complete { approved: Some(false), .. }))
        .count();
    assert_eq!(rejections, 3);

    assert_eq!(
        events.last(),
        Some(&ProtocolEvent::Complete {
            role: AgentRole::Critic,
            content: "Maximum review cycles (3) reached. Please review the results.".to_string(),
            message: None,
            approved: Some(true),
        })
    );
}

#[tokio::test]
async fn test_review_turn_order() {
    let crew = Crew::new();
    let config = OrchestratorConfig {
        max_review_cycles: 2,
        ..Default::default()
    };
    let orchestrator = crew.orchestrator(config);

    let events = protocol_events(orchestrator.run_review_cycle()).await;

    let starts: Vec<AgentRole> = events
        .iter()
        .filter_map(|e| match e {
            ProtocolEvent::Start { role } => Some(*role),
            _ => None,
        })
        .collect();
    assert_eq!(
        starts,
        vec![
            AgentRole::Critic,
            AgentRole::EndUser,
            AgentRole::Coder,
            AgentRole::Critic
        ]
    );
}

#[tokio::test]
async fn test_review_uses_custom_approval_check() {
    let crew = Crew::new();
    crew.critic.reply_once("LGTM");
    let orchestrator = crew
        .orchestrator(OrchestratorConfig::default())
        .with_approval_check(|review| review.contains("LGTM"));

    let events = protocol_events(orchestrator.run_review_cycle()).await;

    assert!(matches!(
        events.last(),
        Some(ProtocolEvent::Complete { approved: Some(true), message: Some(_), .. })
    ));
    assert_eq!(crew.coder.calls(), 0);
}

#[tokio::test]
async fn test_review_fails_when_critic_disabled() {
    let crew = Crew::new();
    let orchestrator = crew.orchestrator(enabled_only(&["coder"]));

    let items: Vec<_> = orchestrator.run_review_cycle().collect().await;

    assert!(matches!(items.first(), Some(Ok(ProtocolEvent::Start { role: AgentRole::Critic }))));
    assert!(matches!(items.last(), Some(Err(CrewError::Agent { .. }))));
}

#[tokio::test]
async fn test_brainstorm_order_and_prompts() {
    let crew = Crew::new();
    let orchestrator = crew.orchestrator(OrchestratorConfig::default());

    let events = protocol_events(orchestrator.brainstorm("caching")).await;

    let starts: Vec<AgentRole> = events
        .iter()
        .filter_map(|e| match e {
            ProtocolEvent::Start { role } => Some(*role),
            _ => None,
        })
        .collect();
    assert_eq!(starts, BRAINSTORM_ORDER.to_vec());

    let architect = crew.architect.contexts()[0].clone().unwrap();
    assert_eq!(
        architect,
        "Let's brainstorm about: caching\n\nProvide your architectural perspective."
    );
    let coder = crew.coder.contexts()[0].clone().unwrap();
    assert!(coder.starts_with("Continue the brainstorm about: caching"));
    assert_eq!(crew.debugger.calls(), 0);
    assert_eq!(crew.store.read().await.len(), 4);
}

#[tokio::test]
async fn test_brainstorm_skips_disabled_roles() {
    let crew = Crew::new();
    let orchestrator = crew.orchestrator(enabled_only(&["architect", "critic"]));

    let events = protocol_events(orchestrator.brainstorm("logging")).await;

    let completed: Vec<AgentRole> = events
        .iter()
        .filter_map(|e| match e {
            ProtocolEvent::Complete { role, .. } => Some(*role),
            _ => None,
        })
        .collect();
    assert_eq!(completed, vec![AgentRole::Architect, AgentRole::Critic]);
    assert_eq!(crew.coder.calls(), 0);
}

#[tokio::test]
async fn test_protocol_announces_questioner_turn() {
    let crew = Crew::new();
    crew.architect.reply_once("Use a write-through cache. Any thoughts on eviction?");
    let orchestrator = crew.orchestrator(enabled_only(&["architect", "questioner"]));

    let events = protocol_events(orchestrator.brainstorm("caching")).await;

    let detected = events
        .iter()
        .position(|e| matches!(e, ProtocolEvent::QuestionsDetected { .. }))
        .expect("questions detected");
    assert_eq!(
        events[detected + 1],
        ProtocolEvent::Start {
            role: AgentRole::Questioner
        }
    );
    assert_eq!(events.last().map(ProtocolEvent::role), Some(AgentRole::Architect));
}

#[tokio::test]
async fn test_summary_and_clear() {
    let crew = Crew::new();
    let orchestrator = crew.orchestrator(OrchestratorConfig::default());

    orchestrator.add_user_message("Build a CSV parser").await;
    orchestrator.set_current_task(Some("csv parser".to_string())).await;
    let summary = orchestrator.conversation_summary().await;
    assert!(summary.contains("Current Task: csv parser"));
    assert!(summary.contains("Total Messages: 1"));

    orchestrator.clear_conversation().await;
    let summary = orchestrator.conversation_summary().await;
    assert!(summary.contains("Current Task: None"));
    assert!(summary.contains("Total Messages: 0"));
}

#[test]
fn test_enabled_agents_ignores_unknown_names() {
    let crew = Crew::new();
    let orchestrator = crew.orchestrator(enabled_only(&["coder", "wizard", "user", "Critic"]));

    assert_eq!(
        orchestrator.enabled_agents(),
        vec![AgentRole::Coder, AgentRole::Critic]
    );
    assert!(!orchestrator.is_enabled(AgentRole::User));
}

#[test]
fn test_default_approval_heuristic() {
    assert!(default_approval("Everything checks out. APPROVED"));
    assert!(!default_approval("NEEDS CHANGES: approved patterns are missing"));
    assert!(!default_approval("Approved in part, but NEEDS DISCUSSION"));
    assert!(!default_approval("Please fix the tests."));
    // Known limitation of the substring rule.
    assert!(default_approval("This is not yet approved"));
}
