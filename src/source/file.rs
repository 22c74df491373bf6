//! Agency bet file reader
//!
//! One bet per line: `first_name,last_name,document,birthdate,number`.
//! Malformed lines are logged and skipped; an unreadable file fails the read.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

use super::{partition, BetSource};
use crate::common::errors::{ClientError, Result};
use crate::common::types::{Batch, Bet};

/// Why a line of the bet file was skipped
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected 5 fields, got {0}")]
    FieldCount(usize),
    #[error("invalid document {0:?}")]
    Document(String),
    #[error("invalid birthdate {0:?}")]
    Birthdate(String),
    #[error("invalid number {0:?}")]
    Number(String),
}

/// Bet source backed by the agency's bet file
#[derive(Debug, Clone)]
pub struct AgencyFileSource {
    path: PathBuf,
    max_bets_per_batch: usize,
}

impl AgencyFileSource {
    pub fn new(path: impl Into<PathBuf>, max_bets_per_batch: usize) -> Self {
        Self {
            path: path.into(),
            max_bets_per_batch,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl BetSource for AgencyFileSource {
    async fn next_batches(&mut self, agency_id: u32) -> Result<Vec<Batch>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ClientError::Source(format!("{}: {}", self.path.display(), e)))?;
        let bets = parse_bets(agency_id, &content);
        info!(
            action = "leer_apuestas",
            result = "success",
            path = %self.path.display(),
            cantidad = bets.len()
        );
        partition(bets, self.max_bets_per_batch)
    }
}

/// Parse every valid line of a bet file, in file order
pub fn parse_bets(agency_id: u32, content: &str) -> Vec<Bet> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(index, line)| match parse_record(agency_id, line) {
            Ok(bet) => Some(bet),
            Err(e) => {
                warn!(action = "leer_apuesta", result = "fail", line = index + 1, error = %e);
                None
            }
        })
        .collect()
}

/// Parse a single `first_name,last_name,document,birthdate,number` line
pub fn parse_record(agency_id: u32, line: &str) -> std::result::Result<Bet, RecordError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [first_name, last_name, document, birthdate, number] = fields.as_slice() else {
        return Err(RecordError::FieldCount(fields.len()));
    };

    let document = document
        .parse::<u32>()
        .map_err(|_| RecordError::Document(document.to_string()))?;
    NaiveDate::parse_from_str(birthdate, "%Y-%m-%d")
        .map_err(|_| RecordError::Birthdate(birthdate.to_string()))?;
    let number = number
        .parse::<u32>()
        .map_err(|_| RecordError::Number(number.to_string()))?;

    Ok(Bet::new(
        agency_id,
        first_name,
        last_name,
        document,
        birthdate,
        number,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_record() {
        let bet = parse_record(4, "Santiago Lionel,Lorca,30904465,1999-03-17,7574").unwrap();
        assert_eq!(bet, Bet::new(4, "Santiago Lionel", "Lorca", 30904465, "1999-03-17", 7574));
    }

    #[test]
    fn test_parse_record_errors() {
        assert_eq!(
            parse_record(4, "a,b,c"),
            Err(RecordError::FieldCount(3))
        );
        assert_eq!(
            parse_record(4, "a,b,12x,1999-03-17,1"),
            Err(RecordError::Document("12x".to_string()))
        );
        assert_eq!(
            parse_record(4, "a,b,12,1999-13-17,1"),
            Err(RecordError::Birthdate("1999-13-17".to_string()))
        );
        assert_eq!(
            parse_record(4, "a,b,12,1999-03-17,-1"),
            Err(RecordError::Number("-1".to_string()))
        );
    }

    #[test]
    fn test_parse_bets_skips_bad_lines() {
        let content = "Ana,Gomez,1,1990-01-01,10\n\
                       broken line\n\
                       \n\
                       Luis,Perez,2,1985-12-31,20\n";
        let bets = parse_bets(1, content);
        let numbers: Vec<u32> = bets.iter().map(Bet::number).collect();
        assert_eq!(numbers, vec![10, 20]);
    }

    #[tokio::test]
    async fn test_file_source_reads_and_partitions() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for n in 0..5 {
            writeln!(file, "Ana,Gomez,{},1990-01-01,{}", 100 + n, n).unwrap();
        }
        let mut source = AgencyFileSource::new(file.path(), 2);

        let batches = source.next_batches(1).await.unwrap();

        let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(batches[2].bets()[0].number(), 4);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = AgencyFileSource::new(dir.path().join("agency-1.csv"), 2);

        let err = source.next_batches(1).await.unwrap_err();
        assert!(matches!(err, ClientError::Source(_)));
    }
}
