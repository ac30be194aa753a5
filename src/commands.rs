//! Built-in bot commands, answered instantly.

use courier_bot::{Bot, Context, InlineButton, InlineKeyboard, SendOptions};
use courier_core::types::EventKind;
use std::time::Instant;
use tracing::debug;

/// Known bot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Ping,
    WhoAmI,
    Status,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Self::Start,
        Self::Help,
        Self::Ping,
        Self::WhoAmI,
        Self::Status,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::Ping => "ping",
            Self::WhoAmI => "whoami",
            Self::Status => "status",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Start => "Say hello",
            Self::Help => "Show this list",
            Self::Ping => "Check that the bot is alive",
            Self::WhoAmI => "Show your user and chat ids",
            Self::Status => "Uptime and identity",
        }
    }
}

/// Register every built-in command, the demo callback, and the
/// unknown-command fallback on `bot`.
pub fn register(bot: &Bot) {
    let started = Instant::now();

    for cmd in Command::ALL {
        bot.on_command(cmd.name(), move |ctx: Context| async move {
            let text = respond(cmd, &ctx, &started);
            let opts = match cmd {
                Command::Start => SendOptions::default().keyboard(
                    InlineKeyboard::new().row(vec![
                        InlineButton::callback("Ping", "ping", ""),
                        InlineButton::callback("Who am I?", "whoami", ""),
                    ]),
                ),
                _ => SendOptions::default(),
            };
            match ctx.message() {
                Some(msg) => ctx.bot().reply(msg, &text, &opts).await?,
                None => ctx.reply(&text).await?,
            };
            anyhow::Ok(())
        });
    }

    // Buttons attached to the /start greeting.
    bot.on_callback("ping", |ctx: Context| async move {
        ctx.answer(Some("pong")).await?;
        anyhow::Ok(())
    });
    bot.on_callback("whoami", move |ctx: Context| async move {
        let text = respond(Command::WhoAmI, &ctx, &started);
        ctx.answer(None).await?;
        ctx.reply(&text).await?;
        anyhow::Ok(())
    });

    bot.on(EventKind::Message, |ctx: Context| async move {
        let text = ctx.payload();
        if text.starts_with('/') && ctx.message().is_some_and(|m| m.is_private()) {
            ctx.reply("Unknown command. Try /help.").await?;
        } else {
            debug!(update_id = ctx.update().id, "ignoring non-command message");
        }
        anyhow::Ok(())
    });
}

/// Response text for a built-in command.
fn respond(cmd: Command, ctx: &Context, started: &Instant) -> String {
    match cmd {
        Command::Start => {
            let name = ctx
                .sender()
                .map(|u| u.first_name.as_str())
                .unwrap_or("there");
            format!(
                "Hello, {name}! I am {}. Send /help to see what I can do.",
                ctx.bot().me().display_name()
            )
        }
        Command::Help => help_text(),
        Command::Ping => "pong".to_string(),
        Command::WhoAmI => {
            let user = ctx
                .sender()
                .map(|u| format!("{} (id {})", u.display_name(), u.id))
                .unwrap_or_else(|| "unknown".to_string());
            let chat = ctx
                .chat_id()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "none".to_string());
            format!("User: {user}\nChat: {chat}")
        }
        Command::Status => {
            let elapsed = started.elapsed().as_secs();
            let (hours, minutes, secs) = (elapsed / 3600, (elapsed % 3600) / 60, elapsed % 60);
            format!(
                "{} is up\nUptime: {hours}h {minutes}m {secs}s",
                ctx.bot().me().display_name()
            )
        }
    }
}

fn help_text() -> String {
    let mut out = String::from("Commands\n");
    for cmd in Command::ALL {
        out.push_str(&format!("\n/{} - {}", cmd.name(), cmd.description()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_lists_every_command() {
        let help = help_text();
        for cmd in Command::ALL {
            assert!(help.contains(&format!("/{}", cmd.name())), "missing {cmd:?}");
        }
    }

    #[test]
    fn test_command_names_are_unique() {
        let mut names: Vec<_> = Command::ALL.iter().map(|c| c.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Command::ALL.len());
    }
}
