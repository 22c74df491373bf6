//! Record model shared by the source, codec and client layers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Width of the first and last name fields on the wire
pub const NAME_WIDTH: usize = 29;
/// Width of the birthdate field on the wire (`YYYY-MM-DD`)
pub const BIRTHDATE_WIDTH: usize = 10;
/// Hard cap on bets per batch, since the count travels in one byte
pub const MAX_BATCH_LEN: usize = u8::MAX as usize;

/// A single wager placed at an agency
///
/// Text fields are cut down to their wire width when the bet is built, so a
/// `Bet` always encodes without further loss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bet {
    agency: u32,
    first_name: String,
    last_name: String,
    document: u32,
    birthdate: String,
    number: u32,
}

impl Bet {
    /// Create a bet, truncating the text fields to their fixed widths
    pub fn new(
        agency: u32,
        first_name: &str,
        last_name: &str,
        document: u32,
        birthdate: &str,
        number: u32,
    ) -> Self {
        Self {
            agency,
            first_name: truncate_to_width(first_name, NAME_WIDTH).to_string(),
            last_name: truncate_to_width(last_name, NAME_WIDTH).to_string(),
            document,
            birthdate: truncate_to_width(birthdate, BIRTHDATE_WIDTH).to_string(),
            number,
        }
    }

    pub fn agency(&self) -> u32 {
        self.agency
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn document(&self) -> u32 {
        self.document
    }

    pub fn birthdate(&self) -> &str {
        &self.birthdate
    }

    /// The wagered number, which is what winner results refer to
    pub fn number(&self) -> u32 {
        self.number
    }
}

/// Longest prefix of `s` that fits in `width` bytes without splitting a character
pub fn truncate_to_width(s: &str, width: usize) -> &str {
    if s.len() <= width {
        return s;
    }
    let mut end = width;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// An ordered, non-empty group of bets sent as one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    bets: Vec<Bet>,
}

impl Batch {
    /// Wrap a group of bets; `None` when the group is empty or over [`MAX_BATCH_LEN`]
    pub fn new(bets: Vec<Bet>) -> Option<Self> {
        if bets.is_empty() || bets.len() > MAX_BATCH_LEN {
            return None;
        }
        Some(Self { bets })
    }

    pub fn bets(&self) -> &[Bet] {
        &self.bets
    }

    pub fn len(&self) -> usize {
        self.bets.len()
    }

    /// True when the batch holds no bets
    pub fn is_empty(&self) -> bool {
        self.bets.is_empty()
    }

    pub fn into_bets(self) -> Vec<Bet> {
        self.bets
    }
}

/// Outcome of asking the server for this agency's winners
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WinnersQuery {
    /// The lottery has not been drawn yet
    NotRun,
    /// The lottery was drawn; winning numbers in server order (may be empty)
    Drawn(Vec<u32>),
}

impl WinnersQuery {
    /// Winning numbers, or `None` while the lottery has not run
    pub fn winners(&self) -> Option<&[u32]> {
        match self {
            WinnersQuery::NotRun => None,
            WinnersQuery::Drawn(numbers) => Some(numbers),
        }
    }
}

/// Cooperative stop signal shared between the client and whoever stops it
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop; running loops notice it at their next checkpoint
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
