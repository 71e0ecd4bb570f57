//! Tri-state verification outcomes.
//!
//! A boolean cannot distinguish "proven bad" from "not enough evidence".
//! Every signature, membership, and consistency check reports one of three
//! states, and reporting must keep `Fail` distinct from `NotVerified`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The result of one verification check.
///
/// Serialized as `"pass"`, `"fail"`, and `"none"`, matching the log
/// service's own vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Verification {
    /// The check ran and the evidence holds.
    #[serde(rename = "pass")]
    Pass,
    /// The check ran and the evidence is invalid.
    #[serde(rename = "fail")]
    Fail,
    /// The check could not run: evidence was absent (unsigned event, no
    /// prior root, no published root for the size in question).
    #[default]
    #[serde(rename = "none")]
    NotVerified,
}

impl Verification {
    /// Map a completed boolean check onto `Pass`/`Fail`.
    pub fn from_check(ok: bool) -> Self {
        if ok {
            Verification::Pass
        } else {
            Verification::Fail
        }
    }

    pub fn is_pass(self) -> bool {
        self == Verification::Pass
    }

    pub fn is_fail(self) -> bool {
        self == Verification::Fail
    }

    /// Severity rank used by [`Verification::worst`].
    fn severity(self) -> u8 {
        match self {
            Verification::Pass => 0,
            Verification::NotVerified => 1,
            Verification::Fail => 2,
        }
    }

    /// Combine two outcomes: `Fail` dominates `NotVerified`, which
    /// dominates `Pass`.
    pub fn worst(self, other: Verification) -> Verification {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    /// Downgrade `Pass` to `NotVerified` when the evidence behind it is not
    /// independently anchored. `Fail` is never softened.
    pub fn cap_unanchored(self, anchored: bool) -> Verification {
        match self {
            Verification::Pass if !anchored => Verification::NotVerified,
            other => other,
        }
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verification::Pass => "pass",
            Verification::Fail => "fail",
            Verification::NotVerified => "none",
        };
        f.write_str(s)
    }
}

/// Everything the engine concluded about a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VerificationOutcome {
    /// Leaf hash recomputation. A mismatch is an error, never `Fail`, so
    /// this is `Pass` or `NotVerified` (envelope absent or check skipped).
    pub hash: Verification,
    /// Signature over the canonical event.
    pub signature: Verification,
    /// Inclusion of the leaf under the applicable root.
    pub membership: Verification,
    /// Append-only consistency between tree states.
    pub consistency: Verification,
}

impl VerificationOutcome {
    /// The worst of the four outcomes.
    pub fn summary(&self) -> Verification {
        self.hash
            .worst(self.signature)
            .worst(self.membership)
            .worst(self.consistency)
    }

    /// True when any check produced hard evidence of a problem.
    pub fn has_failure(&self) -> bool {
        self.summary().is_fail()
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hash={} signature={} membership={} consistency={}",
            self.hash, self.signature, self.membership, self.consistency
        )
    }
}
