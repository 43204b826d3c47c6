//! Participant marks.

use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter, IntoEnumIterator};

/// Symbol permanently assigned to a participant within a session.
///
/// Variants are declared in assignment order: the first participant to join
/// a session plays `X`, the second `O`, and so on. The alphabet bounds the
/// largest supported session.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumIter,
    EnumCount,
    strum::Display,
)]
pub enum Mark {
    /// First seat.
    #[serde(rename = "X")]
    #[strum(serialize = "X")]
    X,
    /// Second seat.
    #[serde(rename = "O")]
    #[strum(serialize = "O")]
    O,
    /// Third seat.
    #[serde(rename = "∆")]
    #[strum(serialize = "∆")]
    Delta,
    /// Fourth seat.
    #[serde(rename = "□")]
    #[strum(serialize = "□")]
    Block,
    /// Fifth seat.
    #[serde(rename = "◇")]
    #[strum(serialize = "◇")]
    Lozenge,
    /// Sixth seat.
    #[serde(rename = "★")]
    #[strum(serialize = "★")]
    Star,
    /// Seventh seat.
    #[serde(rename = "♦")]
    #[strum(serialize = "♦")]
    Diamond,
    /// Eighth seat.
    #[serde(rename = "♣")]
    #[strum(serialize = "♣")]
    Club,
}

impl Mark {
    /// Returns the mark handed to the participant in seat `seat` (zero-based
    /// join order), or `None` past the end of the alphabet.
    pub fn for_seat(seat: usize) -> Option<Self> {
        Self::iter().nth(seat)
    }

    /// Number of distinct marks, and so the most participants a session can hold.
    pub const fn alphabet_len() -> usize {
        Self::COUNT
    }
}
