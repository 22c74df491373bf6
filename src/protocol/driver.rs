//! Protocol driver: request/response exchanges over a [`Session`]
//!
//! Each call runs one complete exchange and only returns once a definitive
//! answer has been parsed (or the exchange failed).

use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::codec::{self, MessageTag, CONFIRMATION_LEN, WINNER_FIELD_LEN};
use super::session::Session;
use crate::common::errors::{ClientError, Result};
use crate::common::traits::{Connector, Sleeper};
use crate::common::types::{Bet, StopFlag, WinnersQuery, MAX_BATCH_LEN};

/// Delay between winners polls while the lottery has not run
pub const WINNERS_RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// States of the winners polling loop
#[derive(Debug)]
enum PollState {
    Requesting,
    AwaitingResponse,
    NotRun,
    Done(Vec<u32>),
}

/// Sequences batch submissions and winners queries
pub struct ProtocolDriver<S: Sleeper> {
    sleeper: S,
    backoff: Duration,
}

impl<S: Sleeper> ProtocolDriver<S> {
    /// Create a driver with the default winners backoff
    pub fn new(sleeper: S) -> Self {
        Self {
            sleeper,
            backoff: WINNERS_RETRY_BACKOFF,
        }
    }

    /// Override the delay between winners polls
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Send one batch and return the server's status byte (0 = accepted)
    ///
    /// Empty batches and batches over the session limit or over 255 bets are
    /// refused before any I/O happens.
    #[instrument(skip(self, session, bets), fields(agency = agency_id, bets = bets.len()))]
    pub async fn send_batch<C: Connector>(
        &self,
        session: &mut Session<C>,
        bets: &[Bet],
        agency_id: u32,
    ) -> Result<u8> {
        if bets.is_empty() {
            warn!(action = "send_batch", result = "fail", "empty batch");
            return Err(ClientError::EmptyBatch);
        }
        let max = session.max_bets_per_batch().min(MAX_BATCH_LEN);
        if bets.len() > max {
            warn!(action = "send_batch", result = "fail", len = bets.len(), max, "batch too large");
            return Err(ClientError::BatchTooLarge {
                len: bets.len(),
                max,
            });
        }
        let message = codec::encode_batch(agency_id, bets)?;
        session.write_exact(&message).await?;
        self.await_confirmation(session).await
    }

    /// Tell the server that this agency has no more bets
    #[instrument(skip(self, session), fields(agency = agency_id))]
    pub async fn send_end_of_bets<C: Connector>(
        &self,
        session: &mut Session<C>,
        agency_id: u32,
    ) -> Result<u8> {
        session
            .write_exact(&codec::encode_end_of_bets(agency_id))
            .await?;
        self.await_confirmation(session).await
    }

    async fn await_confirmation<C: Connector>(&self, session: &mut Session<C>) -> Result<u8> {
        let reply = session.read_array::<CONFIRMATION_LEN>().await?;
        let status = codec::decode_confirmation(&reply)?;
        debug!(status, "confirmation received");
        Ok(status)
    }

    /// Poll the server until the lottery has been drawn
    ///
    /// There is no attempt limit: the loop ends when the server answers with
    /// winners, when a protocol or transport error occurs, or when `stop` is
    /// raised. A stop is checked before every request and yields
    /// [`WinnersQuery::NotRun`].
    #[instrument(skip(self, session, stop), fields(agency = agency_id))]
    pub async fn query_winners<C: Connector>(
        &self,
        session: &mut Session<C>,
        agency_id: u32,
        stop: &StopFlag,
    ) -> Result<WinnersQuery> {
        let request = codec::encode_winners_request(agency_id);
        let mut attempts: u32 = 0;
        let mut state = PollState::Requesting;

        loop {
            state = match state {
                PollState::Requesting => {
                    if stop.is_stopped() {
                        info!(action = "consulta_ganadores", result = "stopped", attempts);
                        return Ok(WinnersQuery::NotRun);
                    }
                    attempts += 1;
                    session.write_exact(&request).await?;
                    PollState::AwaitingResponse
                }
                PollState::AwaitingResponse => match self.read_winners_response(session).await? {
                    WinnersQuery::NotRun => PollState::NotRun,
                    WinnersQuery::Drawn(winners) => PollState::Done(winners),
                },
                PollState::NotRun => {
                    info!(action = "consulta_ganadores", result = "in_progress", attempts);
                    self.sleeper.sleep(self.backoff).await;
                    PollState::Requesting
                }
                PollState::Done(winners) => {
                    debug!(attempts, winners = winners.len(), "lottery results received");
                    return Ok(WinnersQuery::Drawn(winners));
                }
            };
        }
    }

    async fn read_winners_response<C: Connector>(
        &self,
        session: &mut Session<C>,
    ) -> Result<WinnersQuery> {
        let [tag] = session.read_array::<1>().await?;
        let tag = codec::expect_tag(
            tag,
            &[MessageTag::LotteryNotRun, MessageTag::WinnersResponse],
        )?;
        if tag == MessageTag::LotteryNotRun {
            return Ok(WinnersQuery::NotRun);
        }

        let count = u32::from_be_bytes(session.read_array::<WINNER_FIELD_LEN>().await?) as usize;
        // numbers are read one by one so a bogus count cannot force a huge allocation
        let mut winners = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            winners.push(u32::from_be_bytes(
                session.read_array::<WINNER_FIELD_LEN>().await?,
            ));
        }
        Ok(WinnersQuery::Drawn(winners))
    }
}
