use std::fmt;

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap,
};

/// A single extracurricular activity and its current enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    /// Unique activity name, used as the key on the wire.
    pub name: String,

    /// Free-form description.
    pub description: String,

    /// Human-readable meeting schedule.
    pub schedule: String,

    /// Capacity as reported by the backend.
    pub max_participants: u32,

    /// Registered student emails in registration order.
    pub participants: Vec<String>,
}

impl Activity {
    /// Remaining capacity for display purposes.
    ///
    /// The backend owns enforcement, so this may be zero or negative when
    /// the roster is over capacity.
    #[must_use]
    pub fn spots_left(&self) -> i64 {
        let registered = i64::try_from(self.participants.len()).unwrap_or(i64::MAX);
        i64::from(self.max_participants) - registered
    }

    /// Returns `true` if `email` is registered for this activity.
    #[must_use]
    pub fn has_participant(&self, email: &str) -> bool {
        self.participants.iter().any(|p| p == email)
    }

    fn from_details(name: String, details: ActivityDetails) -> Self {
        Self {
            name,
            description: details.description,
            schedule: details.schedule,
            max_participants: details.max_participants,
            participants: details.participants,
        }
    }
}

#[derive(Deserialize)]
struct ActivityDetails {
    description: String,
    schedule: String,
    max_participants: u32,
    #[serde(default)]
    participants: Vec<String>,
}

#[derive(Serialize)]
struct ActivityDetailsRef<'a> {
    description: &'a str,
    schedule: &'a str,
    max_participants: u32,
    participants: &'a [String],
}

/// The full set of activities as served by `GET /activities`.
///
/// On the wire this is a JSON object keyed by activity name. Entry order is
/// preserved so the rendered list follows the backend's ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    activities: Vec<Activity>,
}

impl Roster {
    /// Builds a roster from activities, keeping the last entry for a
    /// repeated name.
    #[must_use]
    pub fn from_activities(activities: impl IntoIterator<Item = Activity>) -> Self {
        let mut roster = Self::default();
        for activity in activities {
            roster.insert(activity);
        }
        roster
    }

    fn insert(&mut self, activity: Activity) {
        if let Some(existing) = self.activities.iter_mut().find(|a| a.name == activity.name) {
            *existing = activity;
        } else {
            self.activities.push(activity);
        }
    }

    /// Looks up an activity by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.name == name)
    }

    /// Mutable lookup by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Activity> {
        self.activities.iter_mut().find(|a| a.name == name)
    }

    /// Iterates activities in backend order.
    pub fn iter(&self) -> impl Iterator<Item = &Activity> {
        self.activities.iter()
    }

    /// Activity names in backend order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.activities.iter().map(|a| a.name.as_str())
    }

    /// Number of activities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.activities.len()
    }

    /// Returns `true` when the backend reported no activities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

impl<'a> IntoIterator for &'a Roster {
    type Item = &'a Activity;
    type IntoIter = std::slice::Iter<'a, Activity>;

    fn into_iter(self) -> Self::IntoIter {
        self.activities.iter()
    }
}

impl Serialize for Roster {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.activities.len()))?;
        for activity in &self.activities {
            map.serialize_entry(
                &activity.name,
                &ActivityDetailsRef {
                    description: &activity.description,
                    schedule: &activity.schedule,
                    max_participants: activity.max_participants,
                    participants: &activity.participants,
                },
            )?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Roster {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RosterVisitor;

        impl<'de> Visitor<'de> for RosterVisitor {
            type Value = Roster;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of activity name to activity details")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Roster, A::Error> {
                let mut roster = Roster {
                    activities: Vec::with_capacity(map.size_hint().unwrap_or(0)),
                };
                while let Some((name, details)) = map.next_entry::<String, ActivityDetails>()? {
                    roster.insert(Activity::from_details(name, details));
                }
                Ok(roster)
            }
        }

        deserializer.deserialize_map(RosterVisitor)
    }
}
