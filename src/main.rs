//! toolchat CLI binary entry point.

use std::io::Write;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use toolchat::cli::transcript::render_transcript;
use toolchat::cli::weather::weather_tools;
use toolchat::cli::{ChatArgs, Cli, Commands};
use toolchat::config::ChatConfig;
use toolchat::conversation::ConversationState;
use toolchat::orchestrator::{TurnEvent, TurnOrchestrator};
use toolchat::provider::OpenAiCompatibleService;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse_args();

    let result = match cli.command {
        Commands::Chat(chat_args) => handle_chat(chat_args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn handle_chat(args: ChatArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ChatConfig::load(args.config.as_deref())?;
    args.apply_to(&mut config);
    tracing::info!(model = %config.model, base_url = %config.base_url, "using model");

    let service = Arc::new(OpenAiCompatibleService::from_config(&config));
    let tools = Arc::new(weather_tools());
    tracing::info!(tools = tools.len(), "available tools");

    // Stream events to terminal
    let sink = Arc::new(|event: TurnEvent| match event {
        TurnEvent::ContentDelta { text } => {
            print!("{text}");
            let _ = std::io::stdout().flush();
        }
        TurnEvent::AssistantMessage { message } => {
            for call in &message.tool_calls {
                eprintln!("\n⚡ {}({}) [{}]", call.name, call.arguments, call.id);
            }
        }
        TurnEvent::ToolResult { message, is_error } => {
            if is_error {
                eprintln!("  ❌ {}: {}", message.name, message.content);
            } else {
                eprintln!("  ✅ {}: {}", message.name, message.content);
            }
        }
        TurnEvent::TurnFinished { .. } => println!(),
        _ => {}
    });

    let orchestrator =
        TurnOrchestrator::from_config(service, tools, &config).with_event_sink(sink);

    let mut conversation = match &config.system_prompt {
        Some(prompt) => ConversationState::with_system_prompt(prompt.clone()),
        None => ConversationState::new(),
    };

    for prompt in &args.prompts {
        println!("user: {prompt}");
        print!("assistant: ");
        let _ = std::io::stdout().flush();
        if let Err(e) = orchestrator.run_turn(&mut conversation, prompt.clone()).await {
            eprintln!("❌ {e}");
        }
    }

    println!("\n--- conversation ---\n");
    print!("{}", render_transcript(conversation.messages()));
    Ok(())
}
