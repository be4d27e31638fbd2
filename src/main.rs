use std::io::{self, Write};
use std::str::FromStr;
use std::sync::Arc;

use clap::Parser;
use tokio::task::JoinSet;

use proxy_colors::host::PLURALKIT_APP_ID;
use proxy_colors::{Author, ColorMode, InMemoryHost, LookupConfig, Message, ProxyColorService, Settings};

/// A proxied message given on the command line as
/// `CHANNEL:MESSAGE:HANDLE[:AVATAR]`.
#[derive(Debug, Clone)]
struct MessageSpec {
    channel_id: String,
    message_id: String,
    handle: String,
    avatar: Option<String>,
}

impl FromStr for MessageSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(4, ':');
        let mut next = |name: &str| {
            parts
                .next()
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .ok_or_else(|| format!("missing {name} in '{s}' (expected CHANNEL:MESSAGE:HANDLE[:AVATAR])"))
        };

        let channel_id = next("channel id")?;
        let message_id = next("message id")?;
        let handle = next("handle")?;
        let avatar = next("avatar").ok();

        Ok(Self {
            channel_id,
            message_id,
            handle,
            avatar,
        })
    }
}

impl MessageSpec {
    fn into_message(self) -> Message {
        Message {
            id: self.message_id,
            channel_id: self.channel_id,
            author: Author {
                id: format!("webhook:{}", self.handle),
                username: self.handle,
                avatar: self.avatar,
            },
            content: String::new(),
            application_id: Some(PLURALKIT_APP_ID.to_string()),
            webhook_id: Some("cli".to_string()),
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "proxy-colors",
    about = "Resolve name colors for proxied messages"
)]
struct Args {
    /// Proxied message as CHANNEL:MESSAGE:HANDLE[:AVATAR]. Repeatable.
    #[arg(long = "message", required = true)]
    messages: Vec<MessageSpec>,

    /// Color source (`member`, `system`, `account` or `none`).
    #[arg(long)]
    mode: Option<String>,

    /// Lift dark member/system colors for readability.
    #[arg(long)]
    readable: bool,

    /// Host account id of the local user, used to detect own messages.
    #[arg(long)]
    user_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();

    let mut settings = Settings::from_env();
    if let Some(mode) = args.mode.as_deref() {
        settings.color_mode = match ColorMode::from_str(mode) {
            Ok(mode) => mode,
            Err(()) => {
                writeln!(
                    io::stderr(),
                    "error: unsupported color mode '{mode}'. Use member, system, account or none."
                )?;
                std::process::exit(1);
            }
        };
    }
    if args.readable {
        settings.readable_colors = true;
    }

    let host = Arc::new(InMemoryHost::new());
    let messages: Vec<Message> = args
        .messages
        .into_iter()
        .map(MessageSpec::into_message)
        .collect();
    for message in &messages {
        host.insert_message(message.clone());
    }

    let service = Arc::new(ProxyColorService::connect(
        LookupConfig::from_env(),
        settings,
        host.clone(),
        host,
        args.user_id,
    )?);
    let handle = service.start()?;

    log::info!(
        "resolving {} messages (mode: {}, readable: {})",
        messages.len(),
        settings.color_mode,
        settings.readable_colors
    );

    let mut lookups = JoinSet::new();
    for (index, message) in messages.iter().cloned().enumerate() {
        let service = service.clone();
        lookups.spawn(async move { (index, service.resolve_color(&message).await) });
    }

    let mut colors = vec![None; messages.len()];
    while let Some(result) = lookups.join_next().await {
        let (index, color) = result?;
        colors[index] = color;
    }

    for (message, color) in messages.iter().zip(colors) {
        let own = if service.is_own_message(message) { " (own)" } else { "" };
        println!(
            "{}\t{}{}",
            message.id,
            color.as_deref().unwrap_or("-"),
            own
        );
    }

    let stats = service.stats();
    log::info!(
        "{} remote calls, {} failures, {} cached colors",
        stats.worker.metrics.remote_calls,
        stats.worker.metrics.remote_failures,
        stats.cache.color_count
    );

    handle.shutdown().await?;
    Ok(())
}
