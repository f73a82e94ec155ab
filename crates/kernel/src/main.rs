//! Agora command-line driver.
//!
//! Renders post content read from stdin and registers accounts against
//! PostgreSQL.

use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use agora_kernel::config::Config;
use agora_kernel::content::{ContentPipeline, ThreadContext};
use agora_kernel::db;
use agora_kernel::models::{Actor, Classification, Post, ReplyInput, Thread};
use agora_kernel::registration::{RegistrationInput, RegistrationService};
use agora_kernel::services::{
    AllowAllCensor, InMemorySettings, PgUserStore, TracingEventSink, UserValidator,
};

#[derive(Parser, Debug)]
#[command(name = "agora", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Format post content read from stdin and print every derived form.
    Render(RenderArgs),
    /// Register a new account.
    Register(RegisterArgs),
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Treat the thread as long-form (markdown opening post).
    #[arg(long)]
    long_form: bool,

    /// Render as the thread's opening post.
    #[arg(long)]
    first: bool,

    /// Thread title, used as the long-form excerpt.
    #[arg(long, default_value = "")]
    title: String,
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    username: String,

    #[arg(long, default_value = "")]
    password: String,

    #[arg(long)]
    password_confirmation: Option<String>,

    #[arg(long, default_value = "127.0.0.1")]
    register_ip: String,

    #[arg(long)]
    register_port: Option<u16>,

    #[arg(long)]
    register_reason: Option<String>,

    #[arg(long)]
    captcha_ticket: Option<String>,

    #[arg(long)]
    captcha_rand_str: Option<String>,
}

impl RegisterArgs {
    fn into_input(self) -> RegistrationInput {
        let mut input = RegistrationInput::from_pairs([
            ("username", self.username),
            ("password", self.password),
            ("register_ip", self.register_ip),
        ]);

        let optional = [
            ("password_confirmation", self.password_confirmation),
            ("register_port", self.register_port.map(|p| p.to_string())),
            ("register_reason", self.register_reason),
            ("captcha_ticket", self.captcha_ticket),
            ("captcha_rand_str", self.captcha_rand_str),
        ];
        for (field, value) in optional {
            if let Some(value) = value {
                input.set(field, value);
            }
        }

        input
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;

    match cli.command {
        Command::Render(args) => render(args),
        Command::Register(args) => register(&config, args).await,
    }
}

fn render(args: RenderArgs) -> Result<()> {
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("failed to read content from stdin")?;

    let pipeline = ContentPipeline::with_defaults();
    let thread = if args.long_form {
        Thread::long_form(Uuid::now_v7(), args.title)
    } else {
        Thread::standard(Uuid::now_v7())
    };
    let classification: Classification = thread.classification;

    let post = Post::reply(
        &pipeline,
        classification,
        ReplyInput {
            thread_id: thread.id,
            content: raw,
            is_first: args.first,
            ..Default::default()
        },
    )?;

    let excerpt = ThreadContext::new(&pipeline, &thread, &post);
    let notice = pipeline.get_summary_content(&post, &excerpt, 0, false)?;

    let output = json!({
        "formatter": pipeline.resolve_formatter(&post, classification).name(),
        "content": pipeline.get_content(&post, classification)?,
        "rendered": pipeline.render_content(&post, classification)?,
        "summary": pipeline.get_summary(&post, classification)?,
        "summary_text": pipeline.get_summary_text(&post, classification)?,
        "notice": notice,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

async fn register(config: &Config, args: RegisterArgs) -> Result<()> {
    let settings = match &config.settings_path {
        Some(path) => InMemorySettings::load(path)?,
        None => InMemorySettings::new(),
    };
    info!(settings = settings.len(), "settings loaded");

    let pool = db::create_pool(config).await?;
    let store = Arc::new(PgUserStore::new(pool));

    let service = RegistrationService::new(
        Arc::new(settings),
        Arc::new(AllowAllCensor),
        Arc::new(UserValidator::new(store.clone())),
        Arc::new(TracingEventSink),
        store,
    );

    let user = service
        .register(&Actor::anonymous(), args.into_input())
        .await
        .context("registration failed")?;

    println!("{}", serde_json::to_string_pretty(&user)?);

    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
