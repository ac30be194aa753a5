mod commands;

use clap::{Parser, Subcommand};
use courier_bot::{Bot, FileRef, HttpTransport, LongPoller, SendOptions, Settings};
use courier_core::{
    config::{self, BotConfig, Config},
    traits::OffsetStore,
};
use courier_store::SqliteOffsetStore;
use std::{path::PathBuf, sync::Arc};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "courier",
    version,
    about = "Courier - long-polling Telegram bot runtime"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot until Ctrl-C.
    Start,
    /// Check the token and show the bot identity and stored offset.
    Status,
    /// Send a one-shot text message.
    Send {
        /// Numeric chat id or @channelusername.
        chat: String,
        /// The message to send.
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Download a file by its file id.
    Download {
        file_id: String,
        /// Destination path.
        dest: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;
    let _log_guard = init_logging(&cfg.bot)?;

    if cfg.bot.token.is_empty() {
        anyhow::bail!(
            "bot token is empty. Set bot.token in {} or the {} env var.",
            cli.config,
            config::TOKEN_ENV
        );
    }

    match cli.command {
        Commands::Start => run(&cfg).await?,
        Commands::Status => {
            let bot = Bot::new(&cfg).await?;
            let me = bot.me();
            println!("Courier - Status Check\n");
            println!("Config: {}", cli.config);
            println!("Bot: {} (id {})", me.display_name(), me.id);
            println!(
                "  joins groups: {}, reads all group messages: {}, inline: {}",
                me.can_join_groups, me.can_read_all_group_messages, me.supports_inline_queries
            );

            if cfg.store.enabled {
                let store = SqliteOffsetStore::open(&cfg.store, &me.id.to_string()).await?;
                match store.load().await? {
                    Some(offset) => println!("  stored offset: {offset}"),
                    None => println!("  stored offset: none"),
                }
            } else {
                println!("  offset store: disabled");
            }
        }
        Commands::Send { chat, text } => {
            if text.is_empty() {
                anyhow::bail!("no message provided. Usage: courier send <chat> <text>");
            }
            let bot = Bot::new(&cfg).await?;
            let text = text.join(" ");
            let opts = SendOptions::default();
            let sent = match chat.parse::<i64>() {
                Ok(id) => bot.send(&id, &text, &opts).await?,
                Err(_) => bot.send(chat.as_str(), &text, &opts).await?,
            };
            println!("sent message {} to chat {}", sent.message_id, sent.chat.id);
        }
        Commands::Download { file_id, dest } => {
            let bot = Bot::new(&cfg).await?;
            let written = bot.download(&FileRef::remote(file_id), &dest).await?;
            println!("wrote {written} bytes to {}", dest.display());
        }
    }

    Ok(())
}

/// Poll and dispatch until Ctrl-C.
async fn run(cfg: &Config) -> anyhow::Result<()> {
    config::validate_token(&cfg.bot.token)?;
    let api = Arc::new(HttpTransport::new(&cfg.bot.api_url, &cfg.bot.token));

    let mut poller = LongPoller::new(&cfg.poller);
    if cfg.store.enabled {
        // The numeric part of the token is the bot's user id.
        let bot_key = cfg.bot.token.split(':').next().unwrap_or_default();
        let store = SqliteOffsetStore::open(&cfg.store, bot_key).await?;
        poller = poller.with_store(Arc::new(store));
    }

    let bot = Bot::connect(api, Arc::new(poller), Settings::from_config(cfg)).await?;
    commands::register(&bot);

    let shutdown = {
        let bot = bot.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received Ctrl-C, shutting down");
                bot.request_stop();
            }
        })
    };

    println!("Courier - starting {}...", bot.me().display_name());
    let result = bot.start().await;
    shutdown.abort();
    result?;
    Ok(())
}

/// Install the tracing subscriber: stdout always, plus a daily file in
/// `log_dir` when configured. `RUST_LOG` overrides the configured level.
fn init_logging(bot: &BotConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&bot.log_level));

    if bot.log_dir.is_empty() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
        return Ok(None);
    }

    let dir = config::shellexpand(&bot.log_dir);
    std::fs::create_dir_all(&dir)?;
    let appender = tracing_appender::rolling::daily(&dir, "courier.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        )
        .init();
    Ok(Some(guard))
}
