//! Kai Mentor development console
//!
//! Reads messages from stdin and prints the coach's replies. Stands in for
//! the chat front end while tuning prompts and thresholds.
//!
//! Commands: `/yes` and `/no` answer a proposed summary, `/summary` prints
//! the lexical trigger synthesis and draft statement, `/reset` starts over,
//! `/quit` exits.

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kai_mentor::adapters::{InMemoryStateStore, OpenAIProvider};
use kai_mentor::application::{
    CoachGenerator, ConfirmProblemCommand, ConfirmProblemHandler, PhaseController,
    ProcessTurnCommand, ProcessTurnHandler, ResetConversationCommand, ResetConversationHandler,
    UserLocks,
};
use kai_mentor::config::{AppConfig, LoggingConfig, ValidationError};
use kai_mentor::domain::coaching::{
    draft_problem_statement, extract_problem_summary, PhaseTransitionEngine,
};
use kai_mentor::domain::foundation::UserId;
use kai_mentor::ports::{AIProvider, StateStore};

fn init_tracing(logging: &LoggingConfig) {
    let registry = tracing_subscriber::registry().with(logging.env_filter());
    if logging.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging);
    config.validate()?;

    let openai = config
        .ai
        .openai()
        .ok_or(ValidationError::MissingRequired("OPENAI_API_KEY"))?;
    let provider = Arc::new(OpenAIProvider::new(openai)?);
    let info = provider.provider_info();
    tracing::info!(
        provider = %info.name,
        model = %info.model,
        max_context_tokens = info.max_context_tokens,
        "AI provider configured"
    );

    let generator = CoachGenerator::new(provider)
        .with_sanitizer(config.coach.sanitizer()?)
        .with_settings(config.coach.generator_settings(config.ai.timeout()));
    let controller = PhaseController::new(generator)
        .with_engine(PhaseTransitionEngine::new(config.coach.thresholds()))
        .with_clarity_params(config.coach.clarity_params());

    let store = Arc::new(InMemoryStateStore::new());
    let locks = UserLocks::new();
    let turns = ProcessTurnHandler::new(controller, store.clone(), locks.clone())
        .with_default_style(config.coach.default_style.clone());
    let confirm = ConfirmProblemHandler::new(store.clone(), locks.clone());
    let reset = ResetConversationHandler::new(store.clone(), locks);

    let user_id = UserId::new(
        std::env::var("KAI_MENTOR_CONSOLE_USER").unwrap_or_else(|_| "console".to_string()),
    )?;

    tracing::info!(user_id = %user_id, "Console ready");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        let output = match input {
            "" => continue,
            "/quit" => break,
            "/reset" => {
                reset
                    .handle(ResetConversationCommand {
                        user_id: user_id.clone(),
                    })
                    .await?;
                "Начнём заново. Что сейчас беспокоит в торговле?".to_string()
            }
            "/summary" => {
                let history = store
                    .load(&user_id)
                    .await?
                    .map(|state| state.history)
                    .unwrap_or_default();
                let notes: Vec<&str> = history
                    .iter()
                    .filter(|turn| turn.is_user())
                    .map(|turn| turn.content())
                    .collect();
                format!(
                    "{}\n{}",
                    extract_problem_summary(&history),
                    draft_problem_statement(&notes)
                )
            }
            "/yes" => match confirm.handle(ConfirmProblemCommand::accept(user_id.clone())).await {
                Ok(result) => match result.problem_summary {
                    Some(summary) => format!("Принято: {}", summary),
                    None => "Пока нечего подтверждать. Расскажи ещё немного.".to_string(),
                },
                Err(err) => format!("(не получилось: {})", err),
            },
            "/no" => match confirm.handle(ConfirmProblemCommand::reject(user_id.clone())).await {
                Ok(_) => "Ок, поправим формулировку. Что бы ты добавил или изменил?".to_string(),
                Err(err) => format!("(не получилось: {})", err),
            },
            text => {
                let result = turns
                    .handle(ProcessTurnCommand::new(user_id.clone(), text))
                    .await?;
                let mut reply = result.turn.reply;
                if result.turn.ask_confirm {
                    reply.push_str(&format!(
                        "\n\n— {}\n(/yes или /no)",
                        result.turn.propose_summary
                    ));
                }
                reply
            }
        };

        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;
    }

    Ok(())
}
