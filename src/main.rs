//! Fitness Funnel CLI - main entry point
//!
//! `run` starts the Telegram bot, `simulate` drives the same funnel from stdin,
//! `check-config` prints the resolved configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use teloxide::Bot;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fitness_funnel::bot::{self, AppState};
use fitness_funnel::config::{Config, BOT_NAME};
use fitness_funnel::console;
use fitness_funnel::funnel::{Contact, Content, FunnelEngine};
use fitness_funnel::leads::{self, LeadRecorder, LeadSink, MemoryLeadSink, NullLeadSink};
use fitness_funnel::store::InMemorySessionStore;
use fitness_funnel::{health, keepalive};

#[derive(Parser)]
#[command(name = "fitness_funnel")]
#[command(about = "Telegram marketing funnel for a fitness coaching project", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config.yml (default: ./config.yml, then ../config.yml)
    #[arg(short, long, global = true, env = "FUNNEL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Telegram bot (long polling)
    Run,

    /// Drive the funnel from stdin without Telegram
    Simulate {
        /// Print each transition as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        /// User id for the simulated conversation
        #[arg(long, default_value_t = 1)]
        user_id: i64,
    },

    /// Validate and print the resolved configuration
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("fitness_funnel=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().context("Failed to load configuration")?,
    };

    match cli.command {
        Commands::Run => run(config).await,
        Commands::Simulate { json, user_id } => simulate(config, json, user_id).await,
        Commands::CheckConfig => {
            config.validate()?;
            println!("{}", config.summary());
            Ok(())
        }
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    config.validate()?;
    info!("Starting fitness funnel bot\n{}", config.summary());

    if let Some(addr) = config.health_addr {
        health::spawn_health_server(addr)
            .await
            .with_context(|| format!("Failed to bind health endpoint on {}", addr))?;
    }

    if let Some(url) = config.keepalive_url.clone() {
        keepalive::spawn_keepalive(url, config.keepalive_interval)?;
    }

    // a broken sink must not keep the bot offline
    let sink: Arc<dyn LeadSink> = match leads::open_sink(
        config.lead_sink,
        &config.csv_path,
        &config.mysql,
        BOT_NAME,
    )
    .await
    {
        Ok(sink) => sink,
        Err(err) => {
            warn!("Lead sink unavailable, leads will only be logged: {}", err);
            Arc::new(NullLeadSink)
        }
    };
    let recorder = LeadRecorder::new(sink, config.persistence_policy);
    info!(sink = recorder.sink_name(), policy = ?config.persistence_policy, "Lead sink ready");

    let store = Arc::new(InMemorySessionStore::new());
    if let Some(ttl) = config.session_ttl {
        bot::spawn_session_purge(store.clone(), ttl)?;
    }

    let engine = FunnelEngine::new(store, Content::new(config.links.clone()), config.funnel_mode);
    let state = Arc::new(AppState::new(engine, recorder, config.keyboard));

    bot::run(Bot::new(config.bot_token.clone()), state).await;
    info!("Bot stopped");
    Ok(())
}

async fn simulate(config: Config, json: bool, user_id: i64) -> anyhow::Result<()> {
    let sink = Arc::new(MemoryLeadSink::new());
    let engine = FunnelEngine::new(
        InMemorySessionStore::new(),
        Content::new(config.links.clone()),
        config.funnel_mode,
    );
    let recorder = LeadRecorder::new(sink.clone(), config.persistence_policy);
    let contact = Contact::new(user_id).with_display_name("Console User");

    eprintln!("Type /start, a button label, #<button id> or free text. Ctrl+D to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let transition = engine.handle_event(&contact, console::parse_line(&line));

        if json {
            println!("{}", serde_json::to_string(&transition)?);
        } else {
            println!("{}\n", console::render_plain(&transition));
        }

        if let Some(lead) = transition.lead() {
            recorder.record(lead).await?;
        }
    }

    eprintln!("{} lead(s) captured", sink.records().len());
    Ok(())
}
