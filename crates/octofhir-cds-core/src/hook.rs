//! Hook types supported by the CDS engine.
//!
//! A hook names the clinical workflow trigger point a service is bound to and
//! decides which context fields accompany an invocation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The workflow trigger points a CDS service can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Hook {
    AppointmentBook,
    EncounterDischarge,
    EncounterStart,
    MedicationPrescribe,
    OrderReview,
    OrderSelect,
    OrderSign,
    PatientView,
}

impl Hook {
    /// Every supported hook, in the order the request schema enumerates them.
    pub const ALL: [Hook; 8] = [
        Hook::AppointmentBook,
        Hook::EncounterDischarge,
        Hook::EncounterStart,
        Hook::MedicationPrescribe,
        Hook::OrderReview,
        Hook::OrderSelect,
        Hook::OrderSign,
        Hook::PatientView,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Hook::AppointmentBook => "appointment-book",
            Hook::EncounterDischarge => "encounter-discharge",
            Hook::EncounterStart => "encounter-start",
            Hook::MedicationPrescribe => "medication-prescribe",
            Hook::OrderReview => "order-review",
            Hook::OrderSelect => "order-select",
            Hook::OrderSign => "order-sign",
            Hook::PatientView => "patient-view",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown hook: {0}")]
pub struct UnknownHook(pub String);

impl FromStr for Hook {
    type Err = UnknownHook;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hook::ALL
            .iter()
            .copied()
            .find(|hook| hook.as_str() == s)
            .ok_or_else(|| UnknownHook(s.to_string()))
    }
}
