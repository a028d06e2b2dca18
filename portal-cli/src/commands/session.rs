//! Session commands and the persisted cookie jar.
//!
//! The jar file holds the `Cookie` header the portal last accepted, so a
//! login survives across invocations the way a browser keeps its cookies.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, bail};
use clap::Args;
use client::{Controller, ControllerHandle, HttpBackend, LoginOutcome, LogoutOutcome, PageView};
use reqwest::cookie::{CookieStore, Jar};
use rpassword::prompt_password;
use shared::config::ClientConfig;
use tracing::{debug, warn};
use url::Url;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Teacher user name; prompted for when omitted
    #[arg(long, short)]
    pub username: Option<String>,
}

/// A running controller bound to the persisted cookie jar.
pub struct Portal {
    pub handle: ControllerHandle,
    jar: Arc<Jar>,
    origin: Url,
    jar_path: PathBuf,
}

impl Portal {
    /// Loads the stored cookies, starts the controller and waits for the
    /// first roster render.
    pub async fn start(config: &ClientConfig) -> Result<(Self, PageView)> {
        let origin = config.base_url.clone();
        let jar_path = config.resolved_session_file();
        let jar = load_cookie_jar(&origin, &jar_path)?;

        let backend = HttpBackend::with_jar(config, Arc::clone(&jar))
            .context("failed to build HTTP client")?;
        let handle = Controller::spawn(Arc::new(backend), config.messages);
        let view = handle.wait_for_roster_after(0).await?;

        Ok((
            Self {
                handle,
                jar,
                origin,
                jar_path,
            },
            view,
        ))
    }

    /// Writes the current cookies back to the jar file.
    pub fn persist(&self) -> Result<()> {
        persist_cookie_jar(&self.jar, &self.origin, &self.jar_path)
    }

    pub fn jar_path(&self) -> &Path {
        &self.jar_path
    }
}

pub async fn status(config: &ClientConfig) -> Result<()> {
    let (portal, view) = Portal::start(config).await?;
    print!("{view}");
    portal.persist()
}

pub async fn login(config: &ClientConfig, args: LoginArgs) -> Result<()> {
    let (portal, view) = Portal::start(config).await?;
    if let Some(current) = view.session.current_user() {
        println!("Already logged in as {current}");
        return Ok(());
    }

    let username = match args.username {
        Some(username) => username,
        None => prompt("Username: ")?,
    };
    let password = prompt_password("Password: ")?;
    if password.trim().is_empty() {
        bail!("password must not be empty");
    }

    match portal.handle.login(username, password).await? {
        LoginOutcome::LoggedIn(username) | LoginOutcome::AlreadyLoggedIn(username) => {
            ensure_parent(portal.jar_path())?;
            portal.persist()?;
            println!("Logged in as {username}");
            println!("cookies stored at {}", portal.jar_path().display());
            Ok(())
        }
        LoginOutcome::Rejected(reason) => bail!("login failed: {reason}"),
    }
}

pub async fn logout(config: &ClientConfig) -> Result<()> {
    let (portal, _) = Portal::start(config).await?;
    let outcome = portal.handle.logout().await?;
    match outcome {
        LogoutOutcome::LoggedOut => println!("Logged out"),
        LogoutOutcome::NotLoggedIn => println!("Not logged in"),
        LogoutOutcome::Failed => {}
    }
    settle_session_jar(outcome, &portal.jar, &portal.origin, portal.jar_path())
}

/// Drops the jar file once the session is over. A failed logout leaves the
/// backend session alive, so its cookies are saved back instead.
fn settle_session_jar(
    outcome: LogoutOutcome,
    jar: &Arc<Jar>,
    origin: &Url,
    jar_path: &Path,
) -> Result<()> {
    if outcome == LogoutOutcome::Failed {
        persist_cookie_jar(jar, origin, jar_path)?;
        bail!(
            "logout request failed; session cookies kept at {}",
            jar_path.display()
        );
    }

    if jar_path.exists() {
        fs::remove_file(jar_path)
            .with_context(|| format!("failed to remove session jar {}", jar_path.display()))?;
        println!("Removed session cookies at {}", jar_path.display());
    }
    Ok(())
}

pub(crate) fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush().ok();
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let trimmed = input.trim().to_string();
    if trimmed.is_empty() {
        bail!("input must not be empty");
    }
    Ok(trimmed)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create session directory {}", parent.display()))?;
    }
    Ok(())
}

/// Reads the jar file into a fresh cookie store. A missing file yields an
/// empty jar.
pub fn load_cookie_jar(origin: &Url, path: &Path) -> Result<Arc<Jar>> {
    let jar = Arc::new(Jar::default());
    if !path.exists() {
        debug!(path = %path.display(), "no stored session cookies");
        return Ok(jar);
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read session jar {}", path.display()))?;
    for entry in contents.split(';') {
        let cookie = entry.trim();
        if !cookie.is_empty() {
            jar.add_cookie_str(cookie, origin);
        }
    }
    Ok(jar)
}

/// Saves the cookies for `origin`, or removes the file once the jar holds
/// none. The file is readable by its owner only.
pub fn persist_cookie_jar(jar: &Arc<Jar>, origin: &Url, path: &Path) -> Result<()> {
    if let Some(header) = jar.cookies(origin) {
        ensure_parent(path)?;
        fs::write(path, header.to_str()?.as_bytes())
            .with_context(|| format!("failed to write session jar at {}", path.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))
                .context("failed to set session jar permissions")?;
        }
        debug!(path = %path.display(), "session cookies saved");
    } else if path.exists() {
        if let Err(err) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %err, "failed to remove stale session jar");
        }
    }
    Ok(())
}
