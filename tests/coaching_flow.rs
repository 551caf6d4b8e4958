//! Integration tests for the coaching flow.
//!
//! These tests drive the public API end to end:
//! 1. Lexical signals decide forced transitions
//! 2. The controller resolves phases and never fails on provider trouble
//! 3. Handlers persist history, patches and the confirmation answer
//!
//! Uses the mock provider and in-memory store, no network.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use kai_mentor::adapters::ai::{MockAIProvider, MockError};
use kai_mentor::adapters::storage::InMemoryStateStore;
use kai_mentor::application::coach::{
    CoachGenerator, GeneratorSettings, PhaseController, EXPLORE_FAILURE_FALLBACK,
    STRUCTURE_PROMPT, SUMMARIZE_FAILURE_FALLBACK,
};
use kai_mentor::application::handlers::{
    ConfirmProblemCommand, ConfirmProblemHandler, ProcessTurnCommand, ProcessTurnHandler,
    ResetConversationCommand, ResetConversationHandler, UserLocks, PENDING_SUMMARY_KEY,
    PROBLEM_SUMMARY_KEY,
};
use kai_mentor::domain::coaching::{
    detect_patterns, should_force_structural, CoachLoop, CoachState, ConversationState,
    PatternLabel, TransitionRule,
};
use kai_mentor::domain::foundation::UserId;
use kai_mentor::ports::StateStore;

// =============================================================================
// Test Infrastructure
// =============================================================================

fn controller(provider: &MockAIProvider) -> PhaseController {
    PhaseController::new(CoachGenerator::new(Arc::new(provider.clone())))
}

fn state_in(phase: CoachLoop, turns: u32) -> ConversationState {
    let mut state = ConversationState::new();
    state.coach = Some(CoachState::record(0.0, turns, phase));
    state
}

struct Harness {
    provider: MockAIProvider,
    store: InMemoryStateStore,
    turns: ProcessTurnHandler,
    confirm: ConfirmProblemHandler,
    reset: ResetConversationHandler,
    user: UserId,
}

impl Harness {
    fn new(provider: MockAIProvider) -> Self {
        let store = InMemoryStateStore::new();
        let locks = UserLocks::new();
        let shared: Arc<dyn StateStore> = Arc::new(store.clone());
        Self {
            turns: ProcessTurnHandler::new(controller(&provider), shared.clone(), locks.clone()),
            confirm: ConfirmProblemHandler::new(shared.clone(), locks.clone()),
            reset: ResetConversationHandler::new(shared, locks),
            provider,
            store,
            user: UserId::new("421337").unwrap(),
        }
    }

    async fn say(&self, text: &str) -> kai_mentor::application::handlers::ProcessTurnResult {
        self.turns
            .handle(ProcessTurnCommand::new(self.user.clone(), text))
            .await
            .unwrap()
    }

    async fn saved(&self) -> ConversationState {
        self.store.load(&self.user).await.unwrap().unwrap()
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn scenario_a_move_stop_is_detected_and_forces_structure() {
    let labels = detect_patterns("двигаю стоп");

    assert_eq!(labels.into_iter().collect::<Vec<_>>(), vec![PatternLabel::MoveStop]);
    assert!(should_force_structural("двигаю стоп"));
}

#[tokio::test]
async fn scenario_b_forced_signal_moves_to_summarize_before_three_turns() {
    let provider = MockAIProvider::new().with_json(json!({"response_text": "Когда это было?"}));

    let result = controller(&provider)
        .process_turn(&state_in(CoachLoop::Explore, 1), "опять двигаю стоп")
        .await;

    assert_eq!(result.state_updates.coach.turns, 2);
    assert_eq!(result.state_updates.coach.phase, CoachLoop::Summarize);
    assert_eq!(result.transition, Some(TransitionRule::ForcedStructural));
}

#[tokio::test]
async fn scenario_c_unconfirmed_summary_returns_to_explore() {
    let provider = MockAIProvider::new().with_json(json!({
        "response_text": "Давай ещё уточним",
        "propose_summary": "Сдвигаю стоп в минусе",
        "ask_confirm": false
    }));

    let result = controller(&provider)
        .process_turn(&state_in(CoachLoop::Summarize, 3), "не уверен")
        .await;

    assert!(!result.ask_confirm);
    assert_eq!(result.state_updates.coach.phase, CoachLoop::Explore);
}

#[tokio::test]
async fn scenario_d_confirmed_problem_goes_to_structure_without_generation() {
    let provider = MockAIProvider::new();
    let mut state = state_in(CoachLoop::Explore, 4);
    state.problem_confirmed = true;

    let result = controller(&provider).process_turn(&state, "готов").await;

    assert_eq!(result.state_updates.coach.phase, CoachLoop::Structure);
    assert!(result.suggest_struct);
    assert_eq!(result.reply, STRUCTURE_PROMPT);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn scenario_e_generation_failure_yields_fallbacks() {
    let provider = MockAIProvider::new()
        .with_error(MockError::Network {
            message: "connection refused".into(),
        })
        .with_response("not json at all");
    let controller = controller(&provider);

    let explored = controller
        .process_turn(&state_in(CoachLoop::Explore, 0), "привет")
        .await;
    assert_eq!(explored.reply, EXPLORE_FAILURE_FALLBACK);
    assert!(explored.state_updates.extensions.is_empty());

    let summarized = controller
        .process_turn(&state_in(CoachLoop::Summarize, 3), "да")
        .await;
    assert_eq!(summarized.reply, SUMMARIZE_FAILURE_FALLBACK);
    assert_eq!(summarized.propose_summary, "");
    assert!(!summarized.ask_confirm);
}

#[tokio::test]
async fn scenario_e_timeout_yields_fallback() {
    let provider = MockAIProvider::new()
        .with_json(json!({"response_text": "слишком поздно"}))
        .with_delay(Duration::from_millis(200));
    let generator = CoachGenerator::new(Arc::new(provider.clone())).with_settings(GeneratorSettings {
        timeout: Duration::from_millis(20),
        ..GeneratorSettings::default()
    });

    let result = PhaseController::new(generator)
        .process_turn(&ConversationState::new(), "привет")
        .await;

    assert_eq!(result.reply, EXPLORE_FAILURE_FALLBACK);
}

// =============================================================================
// Full Conversation
// =============================================================================

#[tokio::test]
async fn conversation_reaches_structure_after_confirmation() {
    let provider = MockAIProvider::new()
        .with_json(json!({"response_text": "Что случилось в последней сделке?", "store": {"market": "futures"}}))
        .with_json(json!({"response_text": "Что ты почувствовал, когда сдвинул?"}))
        .with_json(json!({
            "response_text": "Проверю, правильно ли понял",
            "propose_summary": "В просадке отодвигаю стоп из страха потерь",
            "ask_confirm": true
        }));
    let harness = Harness::new(provider);

    // 1. Neutral opener stays in explore
    let first = harness.say("Привет, хочу разобрать свою торговлю").await;
    assert_eq!(first.state.phase(), CoachLoop::Explore);
    assert_eq!(first.state.extension_str("market"), Some("futures"));

    // 2. Risk signal forces summarize
    let second = harness.say("Вчера в сделке отодвинул стоп").await;
    assert_eq!(second.state.phase(), CoachLoop::Summarize);
    assert_eq!(second.turn.transition, Some(TransitionRule::ForcedStructural));

    // 3. Summary proposed and recorded as pending
    let third = harness.say("Было страшно, что выбьет").await;
    assert!(third.turn.ask_confirm);
    assert_eq!(third.state.phase(), CoachLoop::Summarize);
    assert_eq!(
        harness.saved().await.extension_str(PENDING_SUMMARY_KEY),
        Some("В просадке отодвигаю стоп из страха потерь")
    );

    // 4. User accepts
    let confirmed = harness
        .confirm
        .handle(ConfirmProblemCommand::accept(harness.user.clone()))
        .await
        .unwrap();
    assert_eq!(
        confirmed.problem_summary.as_deref(),
        Some("В просадке отодвигаю стоп из страха потерь")
    );

    // 5. Every later turn is structure, without generation
    let calls_before = harness.provider.call_count();
    let fourth = harness.say("Что дальше?").await;
    assert!(fourth.turn.suggest_struct);
    assert_eq!(fourth.turn.reply, STRUCTURE_PROMPT);
    assert_eq!(harness.provider.call_count(), calls_before);

    let saved = harness.saved().await;
    assert_eq!(saved.history.len(), 8);
    assert_eq!(saved.coach_or_default().turns, 4);
    assert_eq!(saved.phase(), CoachLoop::Structure);
    assert_eq!(
        saved.extension_str(PROBLEM_SUMMARY_KEY),
        Some("В просадке отодвигаю стоп из страха потерь")
    );
}

#[tokio::test]
async fn rejected_summary_resumes_exploration() {
    let provider = MockAIProvider::new()
        .with_json(json!({"response_text": "Когда именно?"}))
        .with_json(json!({
            "response_text": "Так?",
            "propose_summary": "Усредняюсь против позиции",
            "ask_confirm": true
        }));
    let harness = Harness::new(provider);

    harness.say("снова усреднение против тренда").await;
    harness.say("да, докупал").await;

    let rejected = harness
        .confirm
        .handle(ConfirmProblemCommand::reject(harness.user.clone()))
        .await
        .unwrap();

    assert!(rejected.problem_summary.is_none());
    let saved = harness.saved().await;
    assert_eq!(saved.phase(), CoachLoop::Explore);
    assert!(!saved.problem_confirmed);
    assert!(saved.extension(PENDING_SUMMARY_KEY).is_none());
}

#[tokio::test]
async fn proposal_dropped_by_a_later_turn_cannot_be_accepted() {
    let provider = MockAIProvider::new()
        .with_json(json!({"response_text": "Когда это было?"}))
        .with_json(json!({
            "response_text": "Так?",
            "propose_summary": "Старая формулировка",
            "ask_confirm": true
        }))
        .with_json(json!({
            "response_text": "Давай уточним",
            "propose_summary": "",
            "ask_confirm": false
        }));
    let harness = Harness::new(provider);

    harness.say("двигаю стоп").await;
    harness.say("да, так и есть").await;
    assert_eq!(
        harness.saved().await.extension_str(PENDING_SUMMARY_KEY),
        Some("Старая формулировка")
    );

    let third = harness.say("хотя не совсем").await;
    assert_eq!(third.state.phase(), CoachLoop::Explore);
    assert!(third.state.extension(PENDING_SUMMARY_KEY).is_none());

    let answer = harness
        .confirm
        .handle(ConfirmProblemCommand::accept(harness.user.clone()))
        .await
        .unwrap();

    assert!(answer.problem_summary.is_none());
    let saved = harness.saved().await;
    assert!(!saved.problem_confirmed);
    assert_eq!(saved.phase(), CoachLoop::Explore);
}

#[tokio::test]
async fn model_store_cannot_confirm_a_problem() {
    let provider = MockAIProvider::new().with_json(json!({
        "response_text": "Что торгуешь?",
        "store": {"pending_summary": "модель решила", "market": "crypto"}
    }));
    let harness = Harness::new(provider);

    harness.say("привет").await;
    let answer = harness
        .confirm
        .handle(ConfirmProblemCommand::accept(harness.user.clone()))
        .await
        .unwrap();

    assert!(answer.problem_summary.is_none());
    let saved = harness.saved().await;
    assert!(!saved.problem_confirmed);
    assert_eq!(saved.extension_str("market"), Some("crypto"));
    assert!(saved.extension(PROBLEM_SUMMARY_KEY).is_none());
}

#[tokio::test]
async fn accept_on_first_contact_confirms_nothing() {
    let harness = Harness::new(MockAIProvider::new());

    let answer = harness
        .confirm
        .handle(ConfirmProblemCommand::accept(harness.user.clone()))
        .await
        .unwrap();

    assert!(answer.problem_summary.is_none());
    assert!(!harness.saved().await.problem_confirmed);
}

#[tokio::test]
async fn damaged_record_is_defaulted_not_rejected() {
    let harness = Harness::new(MockAIProvider::new().with_json(json!({"response_text": "Расскажи"})));
    harness
        .store
        .insert_raw(
            harness.user.clone(),
            json!({
                "problem_confirmed": 1,
                "style": null,
                "history": [{"role": "tool", "content": "x"}, {"role": "user", "content": "вчера"}]
            }),
        )
        .await;

    let result = harness.say("добрый день").await;

    assert_eq!(result.state.style, "ты");
    assert_eq!(result.state.history.len(), 3);
    assert_eq!(result.state.phase(), CoachLoop::Structure);
    assert!(result.turn.suggest_struct);
}

#[tokio::test]
async fn reset_forgets_the_user() {
    let harness = Harness::new(MockAIProvider::new());
    harness.say("привет").await;

    harness
        .reset
        .handle(ResetConversationCommand {
            user_id: harness.user.clone(),
        })
        .await
        .unwrap();

    assert!(harness.store.load(&harness.user).await.unwrap().is_none());
    let again = harness.say("привет").await;
    assert_eq!(again.state.coach_or_default().turns, 1);
}

#[tokio::test]
async fn concurrent_turns_for_one_user_are_serialized() {
    let provider = MockAIProvider::new().with_delay(Duration::from_millis(10));
    let harness = Arc::new(Harness::new(provider));

    let tasks: Vec<_> = (0..5)
        .map(|i| {
            let harness = Arc::clone(&harness);
            tokio::spawn(async move { harness.say(&format!("сообщение {}", i)).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let saved = harness.saved().await;
    assert_eq!(saved.coach_or_default().turns, 5);
    assert_eq!(saved.history.len(), 10);
}

#[tokio::test]
async fn legacy_record_with_unknown_loop_is_explored() {
    let harness = Harness::new(MockAIProvider::new().with_json(json!({"response_text": "Расскажи"})));
    harness
        .store
        .insert_raw(
            harness.user.clone(),
            json!({"style": "вы", "coach": {"turns": 2, "loop": "intake"}}),
        )
        .await;

    let result = harness.say("добрый день").await;

    assert_eq!(result.state.coach_or_default().turns, 3);
    assert_eq!(result.state.phase(), CoachLoop::Explore);
    assert_eq!(result.state.style, "вы");
    assert!(harness
        .provider
        .last_call()
        .unwrap()
        .system_prompt
        .unwrap()
        .contains("«вы»"));
}
