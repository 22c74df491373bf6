//! Bet sources: where the client gets its batches from
//!
//! A source yields the agency's bets as an ordered list of [`Batch`]es. How
//! the records are stored is up to the implementation; the client only relies
//! on the order being preserved and every batch respecting the size cap.

pub mod batching;
pub mod file;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::common::errors::{ClientError, Result};
use crate::common::types::{Batch, Bet};

pub use batching::partition;
pub use file::AgencyFileSource;

/// Producer of validated, size-bounded batches for one agency
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BetSource: Send {
    /// All of the agency's bets, split into contiguous batches
    async fn next_batches(&mut self, agency_id: u32) -> Result<Vec<Batch>>;
}

/// Source over bets that are already in memory
#[derive(Debug, Clone)]
pub struct MemoryBetSource {
    bets: Vec<Bet>,
    max_bets_per_batch: usize,
}

impl MemoryBetSource {
    pub fn new(bets: Vec<Bet>, max_bets_per_batch: usize) -> Self {
        Self {
            bets,
            max_bets_per_batch,
        }
    }
}

#[async_trait]
impl BetSource for MemoryBetSource {
    async fn next_batches(&mut self, agency_id: u32) -> Result<Vec<Batch>> {
        if let Some(stray) = self.bets.iter().find(|b| b.agency() != agency_id) {
            return Err(ClientError::Source(format!(
                "bet for agency {} found in the source of agency {}",
                stray.agency(),
                agency_id
            )));
        }
        partition(self.bets.clone(), self.max_bets_per_batch)
    }
}
