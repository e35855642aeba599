//! `gchat-probe run --mode interactive`: readline loop over an open chat
//! session.
//!
//! Plain lines are sent as messages; slash-commands drive the other
//! session operations.

use crate::driver::{format_event, Driver, SendOutcome};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Commands
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Send(String),
    Refresh,
    /// Re-read the transcript from the beginning.
    Replay,
    Typing(bool),
    Nick(String),
    Help,
    Quit,
    Unknown(String),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Option<ReplCommand> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if !trimmed.starts_with('/') {
        return Some(ReplCommand::Send(trimmed.to_owned()));
    }

    let (cmd, arg) = match trimmed.split_once(' ') {
        Some((c, a)) => (c, a.trim()),
        None => (trimmed, ""),
    };
    Some(match cmd {
        "/quit" | "/exit" => ReplCommand::Quit,
        "/refresh" => ReplCommand::Refresh,
        "/replay" => ReplCommand::Replay,
        "/typing" => ReplCommand::Typing(!matches!(arg, "off" | "stop")),
        "/nick" if !arg.is_empty() => ReplCommand::Nick(arg.to_owned()),
        "/help" => ReplCommand::Help,
        _ => ReplCommand::Unknown(trimmed.to_owned()),
    })
}

const HELP: &str = "\
Commands:
  /refresh        Fetch new transcript events
  /replay         Re-read the whole transcript
  /typing [off]   Send a typing-started (or typing-stopped) signal
  /nick <name>    Change the chat nickname
  /help           Show this help
  /quit           Disconnect and exit
Anything else is sent as a chat message.";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Run the REPL until `/quit`, Ctrl+D, or the session disappears.
pub async fn run(driver: &mut Driver) -> anyhow::Result<()> {
    let mut rl = rustyline::DefaultEditor::new()?;

    eprintln!("gchat-probe interactive session");
    if let Some(chat_id) = driver.client_mut().chat_id() {
        eprintln!("Chat: {chat_id}  |  Type /help for commands, Ctrl+D to exit");
    }
    eprintln!();

    loop {
        let line = match rl.readline("you> ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted) => {
                eprintln!("(Use Ctrl+D or /quit to exit)");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("\x1B[31mreadline error: {e}\x1B[0m");
                break;
            }
        };

        let Some(command) = parse_line(&line) else {
            continue;
        };
        rl.add_history_entry(line.as_str()).ok();

        if !execute(driver, command).await {
            break;
        }
        if driver.halted() {
            eprintln!("Run halted.");
            break;
        }
    }
    Ok(())
}

/// Execute one command. Returns `false` when the REPL should exit.
async fn execute(driver: &mut Driver, command: ReplCommand) -> bool {
    match command {
        ReplCommand::Quit => return false,
        ReplCommand::Help => eprintln!("{HELP}"),
        ReplCommand::Unknown(cmd) => eprintln!("Unknown command: {cmd} (try /help)"),
        ReplCommand::Send(text) => match driver.send(&text).await {
            SendOutcome::Blocked => eprintln!("\x1B[33m(blocked)\x1B[0m"),
            SendOutcome::Rejected => eprintln!("\x1B[33m(rejected by gateway)\x1B[0m"),
            SendOutcome::Failed => eprintln!("\x1B[31m(failed)\x1B[0m"),
            SendOutcome::Accepted => {}
        },
        ReplCommand::Refresh => print_refresh(driver, None).await,
        ReplCommand::Replay => print_refresh(driver, Some(1)).await,
        ReplCommand::Typing(started) => {
            if let Err(e) = driver.client_mut().send_typing_indicator(started).await {
                eprintln!("\x1B[31merror: {e}\x1B[0m");
            }
        }
        ReplCommand::Nick(name) => match driver.client_mut().set_nickname(&name).await {
            Ok(r) if r.is_success() => eprintln!("Nickname set to: {name}"),
            Ok(r) => eprintln!("Nickname not changed: {}", r.error_summary()),
            Err(e) => eprintln!("\x1B[31merror: {e}\x1B[0m"),
        },
    }
    true
}

async fn print_refresh(driver: &mut Driver, from: Option<u64>) {
    match driver.client_mut().refresh(from).await {
        Ok(result) => {
            for line in result.events.iter().filter_map(format_event) {
                println!("{line}");
            }
            if result.chat_ended {
                eprintln!("(chat ended by the other side)");
            }
        }
        Err(e) => eprintln!("\x1B[31merror: {e}\x1B[0m"),
    }
}
