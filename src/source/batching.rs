//! Contiguous partitioning of bets into batches

use crate::common::errors::{ClientError, Result};
use crate::common::types::{Batch, Bet, MAX_BATCH_LEN};

/// Split `bets` into batches of `max_per_batch`, the last one possibly shorter
///
/// Order is preserved and no bet is split or dropped. An empty input yields no
/// batches; a cap of 0 or above 255 is rejected.
pub fn partition(bets: Vec<Bet>, max_per_batch: usize) -> Result<Vec<Batch>> {
    if max_per_batch == 0 || max_per_batch > MAX_BATCH_LEN {
        return Err(ClientError::InvalidBatchSize(max_per_batch));
    }

    let mut batches = Vec::with_capacity(bets.len().div_ceil(max_per_batch));
    let mut remaining = bets.into_iter().peekable();
    while remaining.peek().is_some() {
        let chunk: Vec<Bet> = remaining.by_ref().take(max_per_batch).collect();
        batches.push(Batch::new(chunk).ok_or(ClientError::InvalidBatchSize(max_per_batch))?);
    }
    Ok(batches)
}
