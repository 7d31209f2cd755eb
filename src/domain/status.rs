//! Stay-status registry
//!
//! The lifecycle states of a booking, their display metadata, the legal
//! transition table, and the numeric translation table used when talking to
//! systems that still store statuses as integers.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StayStatus {
    /// Created, awaiting payment
    Pending,
    /// Paid, guest not yet arrived
    Reserved,
    /// Guest is in the room
    CheckedIn,
    CheckedOut,
    Cancelled,
    /// Paid but the guest never arrived
    NoShow,
}

impl StayStatus {
    pub const ALL: [StayStatus; 6] = [
        Self::Pending,
        Self::Reserved,
        Self::CheckedIn,
        Self::CheckedOut,
        Self::Cancelled,
        Self::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reserved => "reserved",
            Self::CheckedIn => "checked_in",
            Self::CheckedOut => "checked_out",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Awaiting payment",
            Self::Reserved => "Reserved",
            Self::CheckedIn => "Checked in",
            Self::CheckedOut => "Checked out",
            Self::Cancelled => "Cancelled",
            Self::NoShow => "No-show",
        }
    }

    pub fn badge_color(&self) -> &'static str {
        match self {
            Self::Pending => "warning",
            Self::Reserved => "primary",
            Self::CheckedIn => "success",
            Self::CheckedOut => "secondary",
            Self::Cancelled => "danger",
            Self::NoShow => "dark",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CheckedOut | Self::Cancelled | Self::NoShow)
    }

    /// Whether a booking in this state can hold a room. Pending bookings
    /// only hold it within the unpaid grace window, which the availability
    /// query checks separately.
    pub fn holds_room(&self) -> bool {
        matches!(self, Self::Pending | Self::Reserved | Self::CheckedIn)
    }

    pub fn allowed_targets(&self) -> &'static [StayStatus] {
        match self {
            Self::Pending => &[Self::Reserved, Self::Cancelled],
            Self::Reserved => &[Self::CheckedIn, Self::Cancelled, Self::NoShow],
            Self::CheckedIn => &[Self::CheckedOut],
            Self::CheckedOut | Self::Cancelled | Self::NoShow => &[],
        }
    }

    pub fn can_transition_to(&self, to: StayStatus) -> bool {
        self.allowed_targets().contains(&to)
    }
}

impl fmt::Display for StayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StayStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown stay status '{s}'"))
    }
}

// ── Numeric translation ────────────────────────────────────────

/// Default numeric codes, matching the integers legacy records use.
pub fn default_status_codes() -> BTreeMap<String, i32> {
    [
        (StayStatus::Pending, 0),
        (StayStatus::Reserved, 1),
        (StayStatus::CheckedIn, 2),
        (StayStatus::CheckedOut, 3),
        (StayStatus::Cancelled, 4),
        (StayStatus::NoShow, 5),
    ]
    .into_iter()
    .map(|(s, c)| (s.as_str().to_string(), c))
    .collect()
}

/// Bijective mapping between stay statuses and integer codes.
#[derive(Debug, Clone)]
pub struct StatusCodeTable {
    to_code: HashMap<StayStatus, i32>,
    to_status: HashMap<i32, StayStatus>,
}

impl StatusCodeTable {
    /// Builds the table from a `status name -> code` map. Every status must
    /// appear exactly once and no two statuses may share a code.
    pub fn from_map(raw: &BTreeMap<String, i32>) -> Result<Self, String> {
        let mut to_code = HashMap::new();
        let mut to_status = HashMap::new();

        for (name, code) in raw {
            let status = name.parse::<StayStatus>()?;
            if let Some(other) = to_status.insert(*code, status) {
                return Err(format!(
                    "code {code} is assigned to both '{other}' and '{status}'"
                ));
            }
            to_code.insert(status, *code);
        }

        let missing: Vec<&str> = StayStatus::ALL
            .iter()
            .filter(|s| !to_code.contains_key(s))
            .map(|s| s.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(format!("missing status codes for: {}", missing.join(", ")));
        }

        Ok(Self { to_code, to_status })
    }

    pub fn code(&self, status: StayStatus) -> i32 {
        // from_map guarantees totality
        self.to_code.get(&status).copied().unwrap_or_default()
    }

    pub fn status(&self, code: i32) -> Option<StayStatus> {
        self.to_status.get(&code).copied()
    }
}

impl Default for StatusCodeTable {
    fn default() -> Self {
        let to_code: HashMap<_, _> = default_status_codes()
            .into_iter()
            .filter_map(|(name, code)| name.parse::<StayStatus>().ok().map(|s| (s, code)))
            .collect();
        let to_status = to_code.iter().map(|(s, c)| (*c, *s)).collect();
        Self { to_code, to_status }
    }
}
