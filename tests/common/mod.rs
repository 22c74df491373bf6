//! Common test utilities and fixtures

use std::net::SocketAddr;
use std::sync::Arc;

use lottery_client::protocol::codec::{
    self, MessageTag, BATCH_HEADER_LEN, BET_RECORD_LEN, WINNERS_REQUEST_LEN,
};
use lottery_client::{Bet, WinnersQuery};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Agency id used across the integration tests
pub const AGENCY: u32 = 4;

/// Create `n` sample bets for [`AGENCY`]
pub fn sample_bets(n: u32) -> Vec<Bet> {
    (0..n)
        .map(|i| Bet::new(AGENCY, "Santiago Lionel", "Lorca", 30_904_465 + i, "1999-03-17", 7000 + i))
        .collect()
}

/// How the fake lottery server behaves
#[derive(Debug, Clone, Default)]
pub struct ServerScript {
    /// 1-based index of the batch to answer with status 1
    pub reject_batch: Option<usize>,
    /// How many winners requests get LOTTERY_NOT_RUN before the results
    pub not_run_replies: usize,
    /// Winning numbers reported once the lottery has run
    pub winners: Vec<u32>,
    /// Send every reply one byte at a time
    pub trickle: bool,
}

/// Everything the fake server observed
#[derive(Debug, Default)]
pub struct ServerLog {
    pub connections: usize,
    pub batches: Vec<(u32, Vec<Bet>)>,
    pub finished_agencies: Vec<u32>,
    pub winners_requests: usize,
}

/// In-process peer speaking the lottery protocol
pub struct FakeServer {
    pub addr: SocketAddr,
    pub log: Arc<Mutex<ServerLog>>,
    handle: JoinHandle<()>,
}

impl FakeServer {
    pub async fn start(script: ServerScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let log = Arc::new(Mutex::new(ServerLog::default()));
        let server_log = log.clone();

        let handle = tokio::spawn(async move {
            let mut script = script;
            while let Ok((stream, _)) = listener.accept().await {
                server_log.lock().await.connections += 1;
                serve_connection(stream, &mut script, &server_log).await;
            }
        });

        Self { addr, log, handle }
    }

    pub fn address(&self) -> String {
        self.addr.to_string()
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn reply(stream: &mut TcpStream, bytes: &[u8], trickle: bool) -> std::io::Result<()> {
    if trickle {
        for byte in bytes {
            stream.write_all(std::slice::from_ref(byte)).await?;
            stream.flush().await?;
            tokio::task::yield_now().await;
        }
        Ok(())
    } else {
        stream.write_all(bytes).await
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    script: &mut ServerScript,
    log: &Arc<Mutex<ServerLog>>,
) {
    loop {
        let Ok(tag) = stream.read_u8().await else {
            return;
        };

        if tag == MessageTag::BatchSend.as_byte() {
            let mut message = vec![tag; BATCH_HEADER_LEN];
            if stream.read_exact(&mut message[1..]).await.is_err() {
                return;
            }
            let count = usize::from(message[BATCH_HEADER_LEN - 1]);
            let mut records = vec![0u8; count * BET_RECORD_LEN];
            if stream.read_exact(&mut records).await.is_err() {
                return;
            }
            message.extend_from_slice(&records);
            let (agency, bets) = codec::decode_batch(&message).unwrap();

            let status = {
                let mut log = log.lock().await;
                if bets.is_empty() {
                    log.finished_agencies.push(agency);
                    0
                } else {
                    log.batches.push((agency, bets));
                    if script.reject_batch == Some(log.batches.len()) {
                        1
                    } else {
                        0
                    }
                }
            };
            if reply(&mut stream, &codec::encode_confirmation(status), script.trickle)
                .await
                .is_err()
            {
                return;
            }
        } else if tag == MessageTag::WinnersRequest.as_byte() {
            let mut message = vec![tag; WINNERS_REQUEST_LEN];
            if stream.read_exact(&mut message[1..]).await.is_err() {
                return;
            }
            codec::decode_winners_request(&message).unwrap();
            log.lock().await.winners_requests += 1;

            let outcome = if script.not_run_replies > 0 {
                script.not_run_replies -= 1;
                WinnersQuery::NotRun
            } else {
                WinnersQuery::Drawn(script.winners.clone())
            };
            if reply(&mut stream, &codec::encode_winners_response(&outcome), script.trickle)
                .await
                .is_err()
            {
                return;
            }
        } else {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_bets() {
        let bets = sample_bets(3);
        assert_eq!(bets.len(), 3);
        assert!(bets.iter().all(|b| b.agency() == AGENCY));
        assert_eq!(bets[2].number(), 7002);
    }
}
