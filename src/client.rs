//! Agency client: drives the batch loop and the winners query

use std::time::Duration;

use tracing::{error, info, info_span, Instrument, Span};

use crate::common::errors::{ClientError, Result};
use crate::common::traits::{Connector, Sleeper};
use crate::common::types::{Batch, StopFlag, WinnersQuery};
use crate::config::types::AppConfig;
use crate::protocol::{ProtocolDriver, Session};
use crate::source::BetSource;

/// Loop policy for one agency run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Agency identifier sent with every message
    pub agency_id: u32,
    /// Upper bound on batch-sending iterations
    pub loop_amount: u32,
    /// Pause after each iteration
    pub loop_period: Duration,
}

impl From<&AppConfig> for ClientSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            agency_id: config.client.id,
            loop_amount: config.client.loop_amount,
            loop_period: config.client.loop_period(),
        }
    }
}

/// What the batch loop got through
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub batches_sent: usize,
    pub bets_sent: usize,
    /// The stop flag ended the loop early
    pub stopped: bool,
}

/// Result of a full agency run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub batches_sent: usize,
    pub bets_sent: usize,
    pub stopped: bool,
    /// `None` when the run ended before asking for winners
    pub winners: Option<WinnersQuery>,
}

/// Sequential sender for one agency
///
/// The client owns the session and hands it to the protocol driver for each
/// exchange; nothing else touches the connection. Every operation runs inside
/// the client's span, which carries the agency id.
pub struct LotteryClient<C: Connector, S: Sleeper> {
    settings: ClientSettings,
    session: Session<C>,
    driver: ProtocolDriver<S>,
    stop: StopFlag,
    span: Span,
}

impl<C: Connector, S: Sleeper> LotteryClient<C, S> {
    pub fn new(settings: ClientSettings, session: Session<C>, driver: ProtocolDriver<S>) -> Self {
        let span = info_span!("client", client_id = settings.agency_id);
        Self {
            settings,
            session,
            driver,
            stop: StopFlag::new(),
            span,
        }
    }

    /// Share an externally owned stop flag (e.g. one raised by a signal handler)
    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    /// Log inside `span` instead of the default per-agency span
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn session(&self) -> &Session<C> {
        &self.session
    }

    pub fn driver(&self) -> &ProtocolDriver<S> {
        &self.driver
    }

    /// Send up to `loop_amount` batches, one per fresh connection
    ///
    /// The stop flag is checked before each iteration. Any failure, including
    /// a non-zero confirmation, closes the session and ends the loop.
    pub async fn send_batches(&mut self, batches: &[Batch]) -> Result<LoopSummary> {
        let span = self.span.clone();
        self.send_batches_inner(batches).instrument(span).await
    }

    async fn send_batches_inner(&mut self, batches: &[Batch]) -> Result<LoopSummary> {
        let iterations = batches
            .len()
            .min(usize::try_from(self.settings.loop_amount).unwrap_or(usize::MAX));
        let mut summary = LoopSummary::default();

        for batch in &batches[..iterations] {
            if self.stop.is_stopped() {
                info!(action = "loop_finished", result = "stopped", batches = summary.batches_sent);
                summary.stopped = true;
                return Ok(summary);
            }

            if let Err(e) = self.send_one(batch).await {
                error!(
                    action = "apuesta_enviada",
                    result = "fail",
                    cantidad = batch.len(),
                    error = %e
                );
                self.session.close().await;
                return Err(e);
            }
            info!(action = "apuesta_enviada", result = "success", cantidad = batch.len());
            summary.batches_sent += 1;
            summary.bets_sent += batch.len();

            self.driver.sleeper().sleep(self.settings.loop_period).await;
        }

        info!(action = "loop_finished", result = "success", batches = summary.batches_sent);
        Ok(summary)
    }

    async fn send_one(&mut self, batch: &Batch) -> Result<()> {
        self.session.reset().await?;
        let status = self
            .driver
            .send_batch(&mut self.session, batch.bets(), self.settings.agency_id)
            .await?;
        if status != 0 {
            return Err(ClientError::BatchRejected { status });
        }
        Ok(())
    }

    /// Tell the server this agency has delivered all of its bets
    pub async fn notify_end_of_bets(&mut self) -> Result<()> {
        let span = self.span.clone();
        async {
            let result = self.send_end_of_bets().await;
            match &result {
                Ok(()) => info!(action = "fin_apuestas", result = "success"),
                Err(e) => {
                    error!(action = "fin_apuestas", result = "fail", error = %e);
                    self.session.close().await;
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn send_end_of_bets(&mut self) -> Result<()> {
        self.session.reset().await?;
        let status = self
            .driver
            .send_end_of_bets(&mut self.session, self.settings.agency_id)
            .await?;
        if status != 0 {
            return Err(ClientError::BatchRejected { status });
        }
        Ok(())
    }

    /// Poll for winners on a fresh connection, then close it
    pub async fn query_winners(&mut self) -> Result<WinnersQuery> {
        let span = self.span.clone();
        async {
            let result = match self.session.reset().await {
                Ok(()) => {
                    self.driver
                        .query_winners(&mut self.session, self.settings.agency_id, &self.stop)
                        .await
                }
                Err(e) => Err(e),
            };
            self.session.close().await;

            match &result {
                Ok(WinnersQuery::Drawn(winners)) => info!(
                    action = "consulta_ganadores",
                    result = "success",
                    cant_ganadores = winners.len()
                ),
                Ok(WinnersQuery::NotRun) => {
                    info!(action = "consulta_ganadores", result = "stopped")
                }
                Err(e) => error!(action = "consulta_ganadores", result = "fail", error = %e),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Full agency run: load batches, send them, announce the end, ask for winners
    ///
    /// The end-of-bets notice and the winners query only happen when every
    /// batch was delivered and no stop was requested.
    pub async fn run<B: BetSource>(&mut self, source: &mut B) -> Result<RunReport> {
        let agency_id = self.settings.agency_id;
        let batches = match source.next_batches(agency_id).await {
            Ok(batches) => batches,
            Err(e) => {
                let _enter = self.span.enter();
                error!(action = "leer_apuestas", result = "fail", error = %e);
                return Err(e);
            }
        };

        let summary = self.send_batches(&batches).await?;
        let mut report = RunReport {
            batches_sent: summary.batches_sent,
            bets_sent: summary.bets_sent,
            stopped: summary.stopped,
            winners: None,
        };

        if summary.stopped || summary.batches_sent < batches.len() {
            self.session.close().await;
            return Ok(report);
        }

        self.notify_end_of_bets().await?;
        let winners = self.query_winners().await?;
        report.stopped = self.stop.is_stopped();
        report.winners = Some(winners);
        Ok(report)
    }

    /// Release the connection
    pub async fn close(&mut self) {
        self.session.close().await;
    }
}
