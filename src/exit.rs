//! Process exit status bits
//!
//! Every failed check contributes its own bit, so one run can report
//! several problems at once (e.g. `INEXACT | CURRENT`).

use serde::Serialize;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Composable exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct ExitStatus(u8);

impl ExitStatus {
    pub const SUCCESS: ExitStatus = ExitStatus(0);
    /// Unexpected error (I/O, network, internal invariant)
    pub const ERROR: ExitStatus = ExitStatus(1);
    /// The root range allows versions the graph does not
    pub const INEXACT: ExitStatus = ExitStatus(2);
    /// The root range is missing or `*`
    pub const IMPLICIT: ExitStatus = ExitStatus(4);
    /// The installed engine is not a valid version
    pub const CURRENT: ExitStatus = ExitStatus(8);
    /// Writing package.json failed
    pub const SAVE: ExitStatus = ExitStatus(16);
    /// `devEngines` is not a subset of `engines`
    pub const DEV_ENGINES: ExitStatus = ExitStatus(32);
    /// Root and graph ranges overlap without containment
    pub const DISJOINT: ExitStatus = ExitStatus(64);

    /// Raw bits
    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn is_success(&self) -> bool {
        self.0 == 0
    }

    /// Returns true if every bit of `other` is set
    pub fn contains(&self, other: ExitStatus) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    /// Names of the set bits, or `SUCCESS`
    pub fn names(&self) -> Vec<&'static str> {
        if self.is_success() {
            return vec!["SUCCESS"];
        }
        NAMED
            .iter()
            .filter(|(_, status)| self.contains(*status))
            .map(|(name, _)| *name)
            .collect()
    }
}

const NAMED: [(&str, ExitStatus); 7] = [
    ("ERROR", ExitStatus::ERROR),
    ("INEXACT", ExitStatus::INEXACT),
    ("IMPLICIT", ExitStatus::IMPLICIT),
    ("CURRENT", ExitStatus::CURRENT),
    ("SAVE", ExitStatus::SAVE),
    ("DEV_ENGINES", ExitStatus::DEV_ENGINES),
    ("DISJOINT", ExitStatus::DISJOINT),
];

impl BitOr for ExitStatus {
    type Output = ExitStatus;

    fn bitor(self, rhs: Self) -> Self::Output {
        ExitStatus(self.0 | rhs.0)
    }
}

impl BitOrAssign for ExitStatus {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        std::process::ExitCode::from(status.0)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.names().join(" | "))
    }
}
