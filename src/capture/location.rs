//! Location context for an entry.
//!
//! A coarse label comes from the geolocation fix when one exists, and from
//! a time-of-day heuristic otherwise. The user-chosen context tag and the
//! resolved label stay separate fields; the composite string is only
//! formatted where the analysis request needs it.

use std::fmt;

use chrono::{Local, Timelike};
use serde::{Deserialize, Serialize};

use crate::domain::Coordinates;

/// User-chosen context for a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextTag {
    Home,
    Work,
    Social,
    Private,
}

impl fmt::Display for ContextTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Home => "Home",
            Self::Work => "Work",
            Self::Social => "Social",
            Self::Private => "Private",
        };
        f.write_str(name)
    }
}

/// Coarse location label for a fix, or for the hour of day when no fix is
/// available: [9,17) is working hours, late night and early morning mean
/// home, anything else transit.
pub fn resolve_label(fix: Option<&Coordinates>, hour: u32) -> String {
    if let Some(c) = fix {
        return format!("{:.1},{:.1}", c.latitude, c.longitude);
    }

    match hour {
        9..=16 => "Office/Work",
        23 | 0..=6 => "Home",
        _ => "Outdoors/Transit",
    }
    .to_string()
}

/// Situational context captured alongside a recording
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureContext {
    pub tag: ContextTag,
    pub label: String,
    pub coordinates: Option<Coordinates>,
}

impl CaptureContext {
    /// Resolve context from the current local clock and an optional fix.
    pub fn capture(tag: ContextTag, coordinates: Option<Coordinates>) -> Self {
        let hour = Local::now().hour();
        Self {
            tag,
            label: resolve_label(coordinates.as_ref(), hour),
            coordinates,
        }
    }

    /// The composite presentation string, `"{tag} ({label})"`.
    pub fn composite_label(&self) -> String {
        format!("{} ({})", self.tag, self.label)
    }
}
