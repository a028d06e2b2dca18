//! Roster listing and registration commands.

use anyhow::{Result, bail};
use clap::Args;
use client::{
    ActionKind, ActionOutcome, PageView,
    controller::{AUTH_REQUIRED_TEXT, LOGIN_REQUIRED_TEXT, MISSING_FIELDS_TEXT},
    view::RosterRegion,
};
use shared::config::ClientConfig;

use super::session::Portal;

#[derive(Args, Debug)]
pub struct ActionArgs {
    /// Activity name, e.g. "Chess Club"
    #[arg(long, short)]
    pub activity: String,

    /// Student email address
    #[arg(long, short)]
    pub email: String,
}

pub async fn list(config: &ClientConfig) -> Result<()> {
    let (portal, view) = Portal::start(config).await?;
    print_roster(&view)?;
    portal.persist()
}

pub async fn signup(config: &ClientConfig, args: ActionArgs) -> Result<()> {
    run_action(config, ActionKind::Signup, args).await
}

pub async fn unregister(config: &ClientConfig, args: ActionArgs) -> Result<()> {
    run_action(config, ActionKind::Unregister, args).await
}

async fn run_action(config: &ClientConfig, kind: ActionKind, args: ActionArgs) -> Result<()> {
    let (portal, view) = Portal::start(config).await?;
    let outcome = portal
        .handle
        .perform_action(kind, &args.activity, &args.email)
        .await?;
    portal.persist()?;

    let message = outcome_message(outcome)?;
    println!("{message}");
    let refreshed = portal
        .handle
        .wait_for_roster_after(view.roster_revision)
        .await?;
    if let Some(card) = refreshed.roster.card(args.activity.trim()) {
        print!("{card}");
    }
    Ok(())
}

/// Maps an action outcome to the text to print, or an error for anything
/// short of success.
pub(crate) fn outcome_message(outcome: ActionOutcome) -> Result<String> {
    match outcome {
        ActionOutcome::Succeeded(message) => Ok(message),
        ActionOutcome::NotLoggedIn => bail!("{LOGIN_REQUIRED_TEXT}"),
        ActionOutcome::Invalid => bail!("{MISSING_FIELDS_TEXT}"),
        ActionOutcome::Unauthorized => bail!("{AUTH_REQUIRED_TEXT}"),
        ActionOutcome::Failed(reason) => bail!("{reason}"),
    }
}

fn print_roster(view: &PageView) -> Result<()> {
    match &view.roster {
        RosterRegion::Loaded(cards) => {
            for card in cards {
                println!("{card}");
            }
            Ok(())
        }
        RosterRegion::Failed(text) => bail!("{text}"),
        RosterRegion::Loading => bail!("roster did not load"),
    }
}
