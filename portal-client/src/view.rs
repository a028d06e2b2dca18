//! Renderable page model.
//!
//! Everything a front end needs to draw the portal: the user menu, login
//! dialog, signup form, teacher notice, the roster region and the current
//! transient message. The controller owns the only mutable copy and
//! publishes snapshots.

use std::fmt::{self, Write as _};

use shared::models::{Activity, Roster};

use crate::{notice::TransientMessage, session::SessionState};

/// Placeholder shown until the first roster arrives.
pub const LOADING_TEXT: &str = "Loading activities...";
/// Shown in place of the roster when a fetch fails.
pub const LOAD_FAILED_TEXT: &str = "Failed to load activities. Please try again later.";
/// Shown instead of a participant list for an empty activity.
pub const NO_PARTICIPANTS_TEXT: &str = "No participants yet";
/// Shown to logged-out visitors in place of the signup form.
pub const TEACHER_NOTICE_TEXT: &str =
    "Only teachers can register or unregister students. Please log in to manage registrations.";

/// The user icon affordance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserMenu {
    /// Clicking opens the login dialog.
    Login,
    /// Clicking logs out.
    LoggedInAs(String),
}

/// Login dialog state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginDialog {
    /// Whether the dialog is showing.
    pub open: bool,
    /// Inline error from the last rejected attempt.
    pub error: Option<String>,
}

/// Signup form state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupForm {
    /// Always equal to the session's `authenticated()`.
    pub visible: bool,
    /// Selected activity, empty when nothing is selected.
    pub activity: String,
    /// Typed student email.
    pub email: String,
    /// Selectable activities in roster order.
    pub options: Vec<String>,
}

impl SignupForm {
    /// Empties the input fields, keeping the options.
    pub fn clear_inputs(&mut self) {
        self.activity.clear();
        self.email.clear();
    }
}

/// The pair a removal control acts on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemovalTarget {
    /// Activity the participant is registered for.
    pub activity: String,
    /// Participant email.
    pub email: String,
}

/// One participant line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRow {
    /// Participant email.
    pub email: String,
    /// Present only while a teacher is logged in.
    pub remove: Option<RemovalTarget>,
}

/// Participant section of an activity card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Participants {
    /// Rendered as [`NO_PARTICIPANTS_TEXT`].
    Empty,
    /// Rows in registration order.
    Listed(Vec<ParticipantRow>),
}

/// One rendered activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityCard {
    /// Activity name.
    pub name: String,
    /// Description text.
    pub description: String,
    /// Schedule text.
    pub schedule: String,
    /// Remaining capacity, may be zero or negative.
    pub spots_left: i64,
    /// Participant section.
    pub participants: Participants,
}

impl ActivityCard {
    /// Emails listed on this card.
    pub fn emails(&self) -> impl Iterator<Item = &str> {
        let rows: &[ParticipantRow] = match &self.participants {
            Participants::Empty => &[],
            Participants::Listed(rows) => rows,
        };
        rows.iter().map(|row| row.email.as_str())
    }
}

/// The roster area of the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RosterRegion {
    /// Nothing fetched yet.
    #[default]
    Loading,
    /// Cards in backend order.
    Loaded(Vec<ActivityCard>),
    /// Static failure text.
    Failed(String),
}

impl RosterRegion {
    /// Cards, if the roster is loaded.
    #[must_use]
    pub fn cards(&self) -> Option<&[ActivityCard]> {
        match self {
            Self::Loaded(cards) => Some(cards),
            _ => None,
        }
    }

    /// Card for `name`, if loaded.
    #[must_use]
    pub fn card(&self, name: &str) -> Option<&ActivityCard> {
        self.cards()?.iter().find(|card| card.name == name)
    }
}

/// A full snapshot of what the portal shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    /// Session the snapshot was rendered for.
    pub session: SessionState,
    /// User icon affordance.
    pub user_menu: UserMenu,
    /// Login dialog.
    pub login_dialog: LoginDialog,
    /// Signup form.
    pub signup_form: SignupForm,
    /// Whether the teacher-only notice is shown.
    pub teacher_notice_visible: bool,
    /// Roster area.
    pub roster: RosterRegion,
    /// Bumped every time a fetch result replaces the roster area.
    pub roster_revision: u64,
    /// Message currently on screen.
    pub message: Option<TransientMessage>,
}

impl Default for PageView {
    fn default() -> Self {
        let mut view = Self {
            session: SessionState::LoggedOut,
            user_menu: UserMenu::Login,
            login_dialog: LoginDialog::default(),
            signup_form: SignupForm::default(),
            teacher_notice_visible: true,
            roster: RosterRegion::Loading,
            roster_revision: 0,
            message: None,
        };
        view.apply_session(&SessionState::LoggedOut);
        view
    }
}

impl PageView {
    /// Updates every auth-dependent affordance for `session`.
    pub fn apply_session(&mut self, session: &SessionState) {
        self.session = session.clone();
        self.user_menu = match session.current_user() {
            Some(username) => UserMenu::LoggedInAs(username.to_owned()),
            None => UserMenu::Login,
        };
        self.signup_form.visible = session.authenticated();
        self.teacher_notice_visible = !session.authenticated();
        if session.authenticated() {
            self.login_dialog = LoginDialog::default();
        }
    }

    /// Replaces the roster area and the selectable activities with `roster`.
    pub fn show_roster(&mut self, roster: &Roster) {
        self.roster = RosterRegion::Loaded(render_roster(roster, &self.session));
        self.signup_form.options = roster.names().map(str::to_owned).collect();
        if !self.signup_form.options.contains(&self.signup_form.activity) {
            self.signup_form.activity.clear();
        }
    }

    /// Replaces the roster area with the failure text.
    pub fn show_roster_failure(&mut self) {
        self.roster = RosterRegion::Failed(LOAD_FAILED_TEXT.to_string());
    }
}

/// Renders `roster` for `session`.
///
/// Removal targets are attached only when a teacher is logged in. This is a
/// presentation choice; the backend enforces authorization on its own.
#[must_use]
pub fn render_roster(roster: &Roster, session: &SessionState) -> Vec<ActivityCard> {
    roster
        .iter()
        .map(|activity| render_activity(activity, session.authenticated()))
        .collect()
}

fn render_activity(activity: &Activity, removable: bool) -> ActivityCard {
    let participants = if activity.participants.is_empty() {
        Participants::Empty
    } else {
        Participants::Listed(
            activity
                .participants
                .iter()
                .map(|email| ParticipantRow {
                    email: email.clone(),
                    remove: removable.then(|| RemovalTarget {
                        activity: activity.name.clone(),
                        email: email.clone(),
                    }),
                })
                .collect(),
        )
    };

    ActivityCard {
        name: activity.name.clone(),
        description: activity.description.clone(),
        schedule: activity.schedule.clone(),
        spots_left: activity.spots_left(),
        participants,
    }
}

impl fmt::Display for ActivityCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.name)?;
        writeln!(f, "{}", self.description)?;
        writeln!(f, "Schedule: {}", self.schedule)?;
        writeln!(f, "Availability: {} spots left", self.spots_left)?;
        match &self.participants {
            Participants::Empty => writeln!(f, "  {NO_PARTICIPANTS_TEXT}"),
            Participants::Listed(rows) => {
                writeln!(f, "Participants:")?;
                for row in rows {
                    if row.remove.is_some() {
                        writeln!(f, "  - {} [remove]", row.email)?;
                    } else {
                        writeln!(f, "  - {}", row.email)?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for PageView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.user_menu {
            UserMenu::Login => writeln!(f, "[Login]")?,
            UserMenu::LoggedInAs(username) => writeln!(f, "Logged in as: {username}")?,
        }
        if let Some(message) = &self.message {
            writeln!(f, "[{}] {}", message.kind, message.text)?;
        }
        if self.login_dialog.open {
            let mut line = String::from("Login dialog open");
            if let Some(error) = &self.login_dialog.error {
                let _ = write!(line, ": {error}");
            }
            writeln!(f, "{line}")?;
        }
        if self.teacher_notice_visible {
            writeln!(f, "{TEACHER_NOTICE_TEXT}")?;
        }
        writeln!(f)?;
        match &self.roster {
            RosterRegion::Loading => writeln!(f, "{LOADING_TEXT}"),
            RosterRegion::Failed(text) => writeln!(f, "{text}"),
            RosterRegion::Loaded(cards) => {
                for card in cards {
                    writeln!(f, "{card}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Roster {
        Roster::from_activities([
            Activity {
                name: "Chess Club".into(),
                description: "Learn strategies".into(),
                schedule: "Fridays, 3:30 PM - 5:00 PM".into(),
                max_participants: 12,
                participants: vec!["michael@mergington.edu".into(), "daniel@mergington.edu".into()],
            },
            Activity {
                name: "Art Club".into(),
                description: "Painting and drawing".into(),
                schedule: "Thursdays".into(),
                max_participants: 15,
                participants: Vec::new(),
            },
        ])
    }

    fn teacher() -> SessionState {
        SessionState::LoggedIn {
            username: "ms_smith".into(),
        }
    }

    #[test]
    fn test_default_view_is_logged_out() {
        let view = PageView::default();
        assert_eq!(view.user_menu, UserMenu::Login);
        assert!(!view.signup_form.visible);
        assert!(view.teacher_notice_visible);
        assert_eq!(view.roster, RosterRegion::Loading);
    }

    #[test]
    fn test_logged_out_render_has_no_removal_controls() {
        let cards = render_roster(&roster(), &SessionState::LoggedOut);
        let Participants::Listed(rows) = &cards[0].participants else {
            panic!("chess club has participants");
        };
        assert!(rows.iter().all(|row| row.remove.is_none()));
    }

    #[test]
    fn test_logged_in_render_targets_activity_and_email() {
        let cards = render_roster(&roster(), &teacher());
        let Participants::Listed(rows) = &cards[0].participants else {
            panic!("chess club has participants");
        };
        assert_eq!(
            rows[1].remove,
            Some(RemovalTarget {
                activity: "Chess Club".into(),
                email: "daniel@mergington.edu".into(),
            })
        );
    }

    #[test]
    fn test_empty_activity_renders_placeholder() {
        let cards = render_roster(&roster(), &teacher());
        assert_eq!(cards[1].participants, Participants::Empty);
        assert_eq!(cards[1].spots_left, 15);
        assert!(cards[1].to_string().contains(NO_PARTICIPANTS_TEXT));
    }

    #[test]
    fn test_apply_session_toggles_affordances() {
        let mut view = PageView::default();
        view.login_dialog = LoginDialog {
            open: true,
            error: Some("Invalid credentials".into()),
        };

        view.apply_session(&teacher());
        assert_eq!(view.user_menu, UserMenu::LoggedInAs("ms_smith".into()));
        assert!(view.signup_form.visible);
        assert!(!view.teacher_notice_visible);
        assert!(!view.login_dialog.open);

        view.apply_session(&SessionState::LoggedOut);
        assert!(!view.signup_form.visible);
        assert!(view.teacher_notice_visible);
    }

    #[test]
    fn test_show_roster_updates_options_and_drops_stale_selection() {
        let mut view = PageView::default();
        view.signup_form.activity = "Robotics".into();
        view.show_roster(&roster());

        assert_eq!(view.signup_form.options, ["Chess Club", "Art Club"]);
        assert!(view.signup_form.activity.is_empty());

        view.signup_form.activity = "Art Club".into();
        view.show_roster(&roster());
        assert_eq!(view.signup_form.activity, "Art Club");
    }

    #[test]
    fn test_rendering_twice_is_identical() {
        let mut first = PageView::default();
        first.apply_session(&teacher());
        first.show_roster(&roster());
        let mut second = first.clone();
        second.show_roster(&roster());
        assert_eq!(first, second);
        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn test_text_render() {
        let mut view = PageView::default();
        view.apply_session(&teacher());
        view.show_roster(&roster());
        view.message = Some(TransientMessage::success("Signed up a@b.com for Chess Club"));

        let text = view.to_string();
        assert!(text.contains("Logged in as: ms_smith"));
        assert!(text.contains("[success] Signed up a@b.com for Chess Club"));
        assert!(text.contains("Availability: 10 spots left"));
        assert!(text.contains("  - michael@mergington.edu [remove]"));
        assert!(!text.contains(TEACHER_NOTICE_TEXT));
    }

    #[test]
    fn test_failure_text() {
        let mut view = PageView::default();
        view.show_roster_failure();
        assert!(view.to_string().contains(LOAD_FAILED_TEXT));
        assert!(view.roster.cards().is_none());
    }

    #[test]
    fn test_card_lookup_and_emails() {
        let mut view = PageView::default();
        view.show_roster(&roster());
        let emails: Vec<_> = view.roster.card("Chess Club").unwrap().emails().collect();
        assert_eq!(emails, ["michael@mergington.edu", "daniel@mergington.edu"]);
        assert_eq!(view.roster.card("Art Club").unwrap().emails().count(), 0);
        assert!(view.roster.card("Robotics").is_none());
    }
}
