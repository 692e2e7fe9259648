use anyhow::Result;
use colored::*;
use log::error;
use sprout_core::{
    ChatMessage, ChatRole, ClientError, ProfileField, ResponseMode, SaveOutcome,
};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::app::App;
use crate::cli::{Commands, ConfigCommand, ProfileCommand};

pub const REQUEST_FAILED: &str = "request failed";
pub const HISTORY_FAILED: &str = "failed to load history";
pub const CLEAR_FAILED: &str = "failed to clear history";
pub const PROFILE_REQUIRED: &str = "nickname and birth date are required";
pub const PROFILE_FAILED: &str = "failed to save profile";

pub async fn handle_command<W: Write>(app: &mut App, command: Commands, out: &mut W) -> Result<()> {
    match command {
        Commands::Chat { message, mode } => {
            if let Some(mode) = mode {
                app.chat.set_mode(mode);
            }
            send_message(app, &message.join(" "), out).await?;
        }
        Commands::Repl { mode } => {
            if let Some(mode) = mode {
                app.chat.set_mode(mode);
            }
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            run_repl(app, stdin, out).await?;
        }
        Commands::History { refresh } => {
            if refresh {
                load_history(app, out).await?;
            }
            print_history(app, out)?;
        }
        Commands::ClearHistory => clear_history(app, out).await?,
        Commands::Reset => {
            app.chat.reset_local(app.ctx.store.as_ref())?;
            writeln!(out, "{}", "Local session cleared".green())?;
        }
        Commands::Profile { command } => match command {
            ProfileCommand::Show => show_profile(app, out).await?,
            ProfileCommand::Save {
                nickname,
                birth_date,
                grade,
                notes,
            } => {
                // Prefill from the backend so unspecified fields keep their values.
                app.profile.fetch_profile(&app.ctx).await;
                let edits = [
                    (ProfileField::Nickname, nickname),
                    (ProfileField::BirthDate, birth_date),
                    (ProfileField::Grade, grade),
                    (ProfileField::Notes, notes),
                ];
                for (field, value) in edits {
                    if let Some(value) = value {
                        app.profile.set_field(field, value);
                    }
                }
                submit_profile(app, out).await?;
            }
        },
        Commands::Whoami => whoami(app, out)?,
        Commands::Config { command } => match command {
            ConfigCommand::Init => {
                let path = app.ctx.config().save()?;
                writeln!(out, "Wrote config to {}", path.display().to_string().bold())?;
            }
        },
    }
    Ok(())
}

/// One chat turn. Failures become a notice; the transcript keeps the
/// user's message either way.
pub async fn send_message<W: Write>(app: &mut App, text: &str, out: &mut W) -> Result<()> {
    match app.chat.send_message(&app.ctx, text).await {
        Ok(Some(outcome)) => {
            writeln!(out, "{}", render_message(&ChatMessage::assistant(outcome.reply)))?;
            if let Some(warning) = outcome.warning {
                writeln!(out, "{}", format!("⚠️  {}", warning).yellow())?;
            }
        }
        Ok(None) => {
            writeln!(out, "{}", "Nothing to send".dimmed())?;
        }
        Err(ClientError::Storage(e)) => return Err(e.into()),
        Err(e) => {
            error!("chat_with_context error: {}", e);
            writeln!(out, "{}", REQUEST_FAILED.red())?;
        }
    }
    Ok(())
}

pub async fn load_history<W: Write>(app: &mut App, out: &mut W) -> Result<()> {
    match app.chat.load_history(&app.ctx).await {
        Ok(()) => {}
        Err(ClientError::Storage(e)) => return Err(e.into()),
        Err(e) => {
            error!("history error: {}", e);
            writeln!(out, "{}", HISTORY_FAILED.red())?;
        }
    }
    Ok(())
}

async fn clear_history<W: Write>(app: &mut App, out: &mut W) -> Result<()> {
    match app.chat.clear_history(&app.ctx).await {
        Ok(()) => writeln!(out, "{}", "History cleared".green())?,
        Err(ClientError::Storage(e)) => return Err(e.into()),
        Err(e) => {
            error!("clear history error: {}", e);
            writeln!(out, "{}", CLEAR_FAILED.red())?;
        }
    }
    Ok(())
}

pub fn print_history<W: Write>(app: &App, out: &mut W) -> Result<()> {
    let messages = app.chat.messages();
    if messages.is_empty() {
        writeln!(out, "{}", "No messages yet.".dimmed())?;
        return Ok(());
    }
    for message in messages {
        writeln!(out, "{}", render_message(message))?;
    }
    Ok(())
}

async fn show_profile<W: Write>(app: &mut App, out: &mut W) -> Result<()> {
    if !app.profile.fetch_profile(&app.ctx).await {
        writeln!(out, "{}", "No profile yet.".dimmed())?;
        return Ok(());
    }

    let profile = app.profile.profile();
    writeln!(out, "{} {}", "Nickname:".bold(), profile.nickname)?;
    writeln!(out, "{} {}", "Birth date:".bold(), profile.birth_date)?;
    writeln!(out, "{} {}", "Grade:".bold(), or_dash(&profile.grade))?;
    writeln!(out, "{} {}", "Notes:".bold(), or_dash(&profile.notes))?;
    Ok(())
}

pub async fn submit_profile<W: Write>(app: &mut App, out: &mut W) -> Result<()> {
    match app.profile.submit_profile(&app.ctx).await {
        Ok(SaveOutcome::Created) => writeln!(out, "{}", "Profile saved".green())?,
        Ok(SaveOutcome::Updated) => writeln!(out, "{}", "Profile updated".green())?,
        Err(ClientError::Validation(_)) => writeln!(out, "{}", PROFILE_REQUIRED.red())?,
        Err(e) => {
            error!("profile save error: {}", e);
            writeln!(out, "{}", PROFILE_FAILED.red())?;
        }
    }
    Ok(())
}

fn whoami<W: Write>(app: &App, out: &mut W) -> Result<()> {
    writeln!(out, "{} {}", "User ID:".bold(), app.ctx.identity())?;
    writeln!(
        out,
        "{} {}",
        "Session:".bold(),
        app.chat.session_id().unwrap_or("(none yet)")
    )?;
    writeln!(out, "{} {}", "Backend:".bold(), app.ctx.config().base_url)?;
    writeln!(
        out,
        "{} {}",
        "Auth:".bold(),
        if app.ctx.config().has_token() { "bearer token" } else { "none" }
    )?;
    writeln!(out, "{} {}", "Messages cached:".bold(), app.chat.messages().len())?;
    Ok(())
}

/// Interactive chat: each line is a message, `/`-prefixed lines are commands.
pub async fn run_repl<R, W>(app: &mut App, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(
        out,
        "{} ({} mode). Commands: /history /refresh /mode <{}> /reset /quit",
        "sprout chat".bold().blue(),
        app.chat.mode().display_name(),
        ResponseMode::all()
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join("|")
    )?;

    let mut lines = input.lines();
    loop {
        write!(out, "{} ", ">".bold())?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => print_history(app, out)?,
            "/refresh" => {
                load_history(app, out).await?;
                print_history(app, out)?;
            }
            "/reset" => {
                app.chat.reset_local(app.ctx.store.as_ref())?;
                writeln!(out, "{}", "Local session cleared".green())?;
            }
            _ if line.starts_with("/mode") => {
                match line["/mode".len()..].parse::<ResponseMode>() {
                    Ok(mode) => {
                        app.chat.set_mode(mode);
                        writeln!(out, "Mode: {}", mode.display_name().bold())?;
                    }
                    Err(e) => writeln!(out, "{}", e.red())?,
                }
            }
            _ => send_message(app, line, out).await?,
        }
    }

    Ok(())
}

fn render_message(message: &ChatMessage) -> String {
    let label = match message.role {
        ChatRole::User => "You:".bold().cyan(),
        ChatRole::Assistant => "AI:".bold().green(),
        ChatRole::System => "System:".bold().dimmed(),
    };
    format!("{} {}", label, message.content)
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::app_with;
    use serde_json::json;
    use sprout_core::storage::{StorageExt, SESSION_ID_KEY};
    use sprout_core::testing::ScriptedTransport;
    use sprout_core::Storage;

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn test_chat_prints_reply_and_stores_session() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, json!({"reply": "hi", "session_id": "s1"}));
        let mut app = app_with(transport);
        let mut out = Vec::new();

        send_message(&mut app, "hello", &mut out).await.unwrap();

        let text = output(out);
        assert!(text.contains("hi"));
        assert_eq!(app.chat.messages().len(), 2);
        assert_eq!(
            app.ctx.store.get_string(SESSION_ID_KEY).unwrap().as_deref(),
            Some("s1")
        );
    }

    #[tokio::test]
    async fn test_chat_failure_prints_generic_notice() {
        let transport = ScriptedTransport::new();
        transport.push_json(503, json!({"detail": "down"}));
        let mut app = app_with(transport);
        let mut out = Vec::new();

        send_message(&mut app, "hello", &mut out).await.unwrap();

        assert!(output(out).contains(REQUEST_FAILED));
        assert_eq!(app.chat.messages(), &[ChatMessage::user("hello")]);
    }

    #[tokio::test]
    async fn test_history_refresh_failure_prints_notice() {
        let transport = ScriptedTransport::new();
        transport.push_json(404, json!({"detail": "missing"}));
        let mut app = app_with(transport);
        let mut out = Vec::new();

        handle_command(&mut app, Commands::History { refresh: true }, &mut out)
            .await
            .unwrap();

        let text = output(out);
        assert!(text.contains(HISTORY_FAILED));
        assert!(text.contains("No messages yet."));
    }

    #[tokio::test]
    async fn test_profile_save_without_fields_is_rejected() {
        // Only the prefill fetch reaches the backend.
        let transport = ScriptedTransport::new();
        transport.push_json(404, json!({"detail": "no profile"}));
        let mut app = app_with(transport.clone());
        let mut out = Vec::new();

        let command = Commands::Profile {
            command: ProfileCommand::Save {
                nickname: Some("Mimi".to_string()),
                birth_date: None,
                grade: None,
                notes: None,
            },
        };
        handle_command(&mut app, command, &mut out).await.unwrap();

        assert!(output(out).contains(PROFILE_REQUIRED));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_profile_save_falls_back_to_update() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, json!({"nickname": "Mimi", "birth_date": "2017-05-20T00:00:00", "grade": null, "notes": null}));
        transport.push_json(400, json!({"detail": "exists"}));
        transport.push_json(200, json!({"nickname": "Mimi"}));
        let mut app = app_with(transport.clone());
        let mut out = Vec::new();

        let command = Commands::Profile {
            command: ProfileCommand::Save {
                nickname: None,
                birth_date: None,
                grade: Some("Grade 2".to_string()),
                notes: None,
            },
        };
        handle_command(&mut app, command, &mut out).await.unwrap();

        assert!(output(out).contains("Profile updated"));
        assert_eq!(app.profile.profile().grade, "Grade 2");
        assert_eq!(app.profile.profile().birth_date, "2017-05-20");
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_repl_runs_commands_and_messages() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, json!({"reply": "sure", "session_id": "s7"}));
        let mut app = app_with(transport);
        let mut out = Vec::new();
        let input: &[u8] = b"/mode detailed\n\n   \nhelp me\n/history\n/quit\nnever sent\n";

        run_repl(&mut app, input, &mut out).await.unwrap();

        let text = output(out);
        assert_eq!(app.chat.mode(), ResponseMode::Detailed);
        assert!(text.contains("sure"));
        assert!(text.contains("help me"));
        assert_eq!(app.chat.messages().len(), 2);
        assert_eq!(app.chat.session_id(), Some("s7"));
    }

    #[tokio::test]
    async fn test_reset_then_whoami() {
        let transport = ScriptedTransport::new();
        let mut app = app_with(transport);
        app.ctx.store.set_as(SESSION_ID_KEY, "s1").unwrap();
        let mut out = Vec::new();

        handle_command(&mut app, Commands::Reset, &mut out).await.unwrap();
        handle_command(&mut app, Commands::Whoami, &mut out).await.unwrap();

        let text = output(out);
        assert!(text.contains("(none yet)"));
        assert!(text.contains(app.ctx.identity()));
        assert_eq!(app.ctx.store.get(SESSION_ID_KEY).unwrap(), None);
    }

    #[test]
    fn test_or_dash() {
        assert_eq!(or_dash(""), "-");
        assert_eq!(or_dash("x"), "x");
    }
}
