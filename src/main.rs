use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use workplace_mediator::config::MediatorConfig;
use workplace_mediator::llm::create_provider;
use workplace_mediator::pipeline::classifier::ClassifierConfig;
use workplace_mediator::pipeline::topics::TopicFilter;
use workplace_mediator::pipeline::translate::{Language, Translator};
use workplace_mediator::pipeline::{CoachingGateway, ProcessOptions};

const USAGE: &str = "usage: /force <msg> | /translate <lang> <text> | /quit";

/// One line of REPL input.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Empty,
    Quit,
    Usage,
    Translate { lang: &'a str, text: &'a str },
    Process { message: &'a str, force: bool },
}

fn parse_command(line: &str) -> Command<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    if line == "/quit" {
        return Command::Quit;
    }
    if let Some(rest) = line.strip_prefix("/translate ") {
        return match rest.trim().split_once(' ') {
            Some((lang, text)) if !text.trim().is_empty() => Command::Translate {
                lang,
                text: text.trim(),
            },
            _ => Command::Usage,
        };
    }
    if let Some(rest) = line.strip_prefix("/force ") {
        return Command::Process {
            message: rest.trim(),
            force: true,
        };
    }
    if line.starts_with('/') {
        return Command::Usage;
    }
    Command::Process {
        message: line,
        force: false,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = MediatorConfig::from_env().context("failed to load configuration")?;
    let llm = create_provider(&config.llm)?;

    let gateway = CoachingGateway::with_config(
        Arc::clone(&llm),
        TopicFilter::default_rules(),
        ClassifierConfig::default(),
        config.rewriter.clone(),
    );
    let translator = Translator::new(llm);

    eprintln!("Workplace mediator v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!(
        "   Min length: {}, force analysis: {}",
        config.options.min_message_length, config.options.force_analysis
    );
    eprintln!("   One message per line. {USAGE}\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprint!("> ");

    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Command::Empty => {}
            Command::Quit => break,
            Command::Usage => eprintln!("{USAGE}"),
            Command::Translate { lang, text } => match lang.parse::<Language>() {
                Ok(target) => match translator.translate(text, target).await {
                    Ok(translated) => println!("{translated}"),
                    Err(e) => tracing::error!(error = %e, "Translation failed"),
                },
                Err(e) => eprintln!("{e}"),
            },
            Command::Process { message, force } => {
                let options = ProcessOptions {
                    force_analysis: force || config.options.force_analysis,
                    ..config.options.clone()
                };
                let result = gateway.process_message(message, &options).await;
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }
        eprint!("> ");
    }

    Ok(())
}
