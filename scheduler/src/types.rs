//! Outcomes reported by the dispatcher and the force path.

use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

/// What the random policy decided on one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "camelCase")]
pub enum Decision {
    /// Today's target is already met.
    QuotaMet,
    /// Current hour is outside the active window.
    OutsideWindow,
    /// The draw exceeded the commit probability.
    Skipped { probability: f64, draw: f64 },
    Committed { sha: String },
}

/// Result of one dispatcher tick. Failures are data, never panics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "camelCase")]
pub enum TickReport {
    NotConfigured,
    Disabled,
    Random(Decision),
    /// Slots that fired on this tick, possibly none.
    Fixed(Vec<String>),
    /// The tick failed; the message was appended to the error log.
    Failed(String),
}

/// Result of a force commit.
///
/// Serialises as `{"ok":true,"sha":..}` or `{"ok":false,"error":..,"cooldown":..}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForceOutcome {
    Committed {
        sha: String,
    },
    Rejected {
        error: String,
        /// Seconds left before another force commit is accepted.
        cooldown: Option<u64>,
    },
}

impl ForceOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ForceOutcome::Committed { .. })
    }
}

impl Serialize for ForceOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ForceOutcome::Committed { sha } => {
                let mut st = serializer.serialize_struct("ForceOutcome", 2)?;
                st.serialize_field("ok", &true)?;
                st.serialize_field("sha", sha)?;
                st.end()
            }
            ForceOutcome::Rejected { error, cooldown } => {
                let len = if cooldown.is_some() { 3 } else { 2 };
                let mut st = serializer.serialize_struct("ForceOutcome", len)?;
                st.serialize_field("ok", &false)?;
                st.serialize_field("error", error)?;
                if let Some(secs) = cooldown {
                    st.serialize_field("cooldown", secs)?;
                }
                st.end()
            }
        }
    }
}
