//! Interactive session.
//!
//! Reads commands from stdin and feeds them to the controller. A watcher
//! task reprints the page whenever the published view changes, so
//! messages appear and clear on their own.

use std::io::{self, Write};

use anyhow::{Context, Result};
use client::{ActionKind, LoginOutcome, LogoutOutcome, PageView, UiEvent};
use rpassword::prompt_password;
use shared::config::ClientConfig;
use tokio::{
    io::{AsyncBufReadExt, BufReader, Lines, Stdin},
    sync::watch,
};
use tracing::debug;

use super::session::Portal;

const HELP: &str = "\
Commands:
  status                         show the page
  menu                           click the user icon (login dialog or logout)
  cancel                         close the login dialog
  login [username]               log in as a teacher
  logout                         end the teacher session
  signup <email> <activity>      register a student
  unregister <email> <activity>  remove a student
  refresh                        reload the roster
  help                           show this help
  quit                           leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellCommand {
    Help,
    Status,
    Menu,
    Cancel,
    Login(Option<String>),
    Logout,
    Action {
        kind: ActionKind,
        email: String,
        activity: String,
    },
    Refresh,
    Quit,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
fn parse_line(line: &str) -> Result<Option<ShellCommand>, String> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(word, rest)| (word, rest.trim()));

    let command = match word.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "help" | "?" => ShellCommand::Help,
        "status" | "show" => ShellCommand::Status,
        "menu" => ShellCommand::Menu,
        "cancel" | "close" => ShellCommand::Cancel,
        "login" => ShellCommand::Login((!rest.is_empty()).then(|| rest.to_string())),
        "logout" => ShellCommand::Logout,
        "signup" | "unregister" => {
            let kind = if word.eq_ignore_ascii_case("signup") {
                ActionKind::Signup
            } else {
                ActionKind::Unregister
            };
            let Some((email, activity)) = rest.split_once(char::is_whitespace) else {
                return Err(format!("usage: {word} <email> <activity>"));
            };
            ShellCommand::Action {
                kind,
                email: email.to_string(),
                activity: activity.trim().to_string(),
            }
        }
        "refresh" | "reload" => ShellCommand::Refresh,
        "quit" | "exit" => ShellCommand::Quit,
        other => return Err(format!("unknown command `{other}`; type `help`")),
    };
    Ok(Some(command))
}

pub async fn run(config: &ClientConfig) -> Result<()> {
    let (portal, view) = Portal::start(config).await?;
    print!("{view}");
    println!("Type `help` for commands.");

    let watcher = tokio::spawn(print_changes(portal.handle.subscribe(), view));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        io::stdout().flush().ok();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(ShellCommand::Quit)) => break,
            Ok(Some(command)) => execute(&portal, command, &mut lines).await?,
            Err(usage) => eprintln!("{usage}"),
        }
        portal.persist()?;
    }

    watcher.abort();
    portal.persist()
}

async fn execute(
    portal: &Portal,
    command: ShellCommand,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<()> {
    let handle = &portal.handle;
    match command {
        ShellCommand::Help => println!("{HELP}"),
        ShellCommand::Status => print!("{}", handle.view()),
        ShellCommand::Menu => handle.send(UiEvent::UserIconClicked)?,
        ShellCommand::Cancel => handle.send(UiEvent::CloseLoginDialog)?,
        ShellCommand::Refresh => handle.refresh()?,
        ShellCommand::Login(username) => {
            let username = match username {
                Some(username) => username,
                None => {
                    print!("Username: ");
                    io::stdout().flush().ok();
                    lines.next_line().await?.unwrap_or_default()
                }
            };
            let password = tokio::task::spawn_blocking(|| prompt_password("Password: "))
                .await
                .context("password prompt panicked")??;
            match handle.login(username, password).await? {
                LoginOutcome::LoggedIn(username) => debug!(%username, "shell login"),
                LoginOutcome::AlreadyLoggedIn(username) => {
                    println!("Already logged in as {username}");
                }
                LoginOutcome::Rejected(reason) => println!("Login failed: {reason}"),
            }
        }
        ShellCommand::Logout => match handle.logout().await? {
            LogoutOutcome::LoggedOut => {}
            LogoutOutcome::NotLoggedIn => println!("Not logged in"),
            LogoutOutcome::Failed => println!("Logout failed; still logged in"),
        },
        ShellCommand::Action {
            kind,
            email,
            activity,
        } => {
            let outcome = handle.perform_action(kind, activity, email).await?;
            debug!(?outcome, "shell action finished");
        }
        ShellCommand::Quit => {}
    }
    Ok(())
}

async fn print_changes(mut views: watch::Receiver<PageView>, mut last: PageView) {
    while views.changed().await.is_ok() {
        let view = views.borrow_and_update().clone();
        if view != last {
            print!("\n{view}");
            io::stdout().flush().ok();
            last = view;
        }
    }
}
