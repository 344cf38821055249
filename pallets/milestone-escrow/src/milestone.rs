//! Delivery checkpoints and the per-escrow release bitmap.

use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use sp_runtime::RuntimeDebug;

/// One of the four delivery checkpoints, each gating a quarter of the escrowed total.
#[derive(
    Clone,
    Copy,
    Encode,
    Decode,
    DecodeWithMemTracking,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    RuntimeDebug,
    TypeInfo,
    MaxEncodedLen,
)]
pub enum Milestone {
    Quarter,
    Half,
    ThreeQuarters,
    Full,
}

impl Milestone {
    pub const ALL: [Milestone; 4] = [
        Milestone::Quarter,
        Milestone::Half,
        Milestone::ThreeQuarters,
        Milestone::Full,
    ];

    /// Parse a raw delivery percentage. Only 25, 50, 75 and 100 are milestones.
    pub fn from_percent(pct: u8) -> Option<Self> {
        match pct {
            25 => Some(Milestone::Quarter),
            50 => Some(Milestone::Half),
            75 => Some(Milestone::ThreeQuarters),
            100 => Some(Milestone::Full),
            _ => None,
        }
    }

    pub fn percent(self) -> u8 {
        match self {
            Milestone::Quarter => 25,
            Milestone::Half => 50,
            Milestone::ThreeQuarters => 75,
            Milestone::Full => 100,
        }
    }

    /// The checkpoint that must be released before this one.
    pub fn previous(self) -> Option<Self> {
        match self {
            Milestone::Quarter => None,
            Milestone::Half => Some(Milestone::Quarter),
            Milestone::ThreeQuarters => Some(Milestone::Half),
            Milestone::Full => Some(Milestone::ThreeQuarters),
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Compact set of released milestones.
#[derive(
    Clone,
    Copy,
    Default,
    Encode,
    Decode,
    DecodeWithMemTracking,
    Eq,
    PartialEq,
    RuntimeDebug,
    TypeInfo,
    MaxEncodedLen,
)]
pub struct MilestoneSet(u8);

impl MilestoneSet {
    pub fn contains(&self, milestone: Milestone) -> bool {
        self.0 & milestone.bit() != 0
    }

    pub fn insert(&mut self, milestone: Milestone) {
        self.0 |= milestone.bit();
    }

    pub fn len(&self) -> u32 {
        self.0.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}
