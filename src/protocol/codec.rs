//! Binary encoding of bets and protocol messages
//!
//! Every message starts with a one byte [`MessageTag`]. Integers are
//! big-endian and text fields have a fixed width on the wire: longer values
//! are truncated, shorter ones are NUL-padded, so the width itself is the
//! field boundary.
//!
//! ```text
//! batch        [1][agency:4][count:1][bet]*count
//! bet          [first_name:29][last_name:29][document:4][birthdate:10][number:4]
//! confirmation [2][status:1]
//! winners req  [3][agency:4]
//! winners resp [4] | [5][count:4][number:4]*count
//! ```

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::common::types::{truncate_to_width, Bet, WinnersQuery, BIRTHDATE_WIDTH, NAME_WIDTH};

/// Encoded size of one bet record
pub const BET_RECORD_LEN: usize = NAME_WIDTH * 2 + 4 + BIRTHDATE_WIDTH + 4;
/// Tag, agency id and bet count
pub const BATCH_HEADER_LEN: usize = 1 + 4 + 1;
/// Tag and status byte
pub const CONFIRMATION_LEN: usize = 2;
/// Tag and agency id
pub const WINNERS_REQUEST_LEN: usize = 1 + 4;
/// Size of the winner count and of each winning number
pub const WINNER_FIELD_LEN: usize = 4;

/// One byte message discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageTag {
    BatchSend = 1,
    BatchConfirm = 2,
    WinnersRequest = 3,
    LotteryNotRun = 4,
    WinnersResponse = 5,
}

impl MessageTag {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MessageTag {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MessageTag::BatchSend),
            2 => Ok(MessageTag::BatchConfirm),
            3 => Ok(MessageTag::WinnersRequest),
            4 => Ok(MessageTag::LotteryNotRun),
            5 => Ok(MessageTag::WinnersResponse),
            other => Err(CodecError::UnknownTag(other)),
        }
    }
}

impl fmt::Display for MessageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageTag::BatchSend => write!(f, "BATCH_SEND"),
            MessageTag::BatchConfirm => write!(f, "BATCH_CONFIRM"),
            MessageTag::WinnersRequest => write!(f, "WINNERS_REQUEST"),
            MessageTag::LotteryNotRun => write!(f, "LOTTERY_NOT_RUN"),
            MessageTag::WinnersResponse => write!(f, "WINNERS_RESPONSE"),
        }
    }
}

/// Errors produced while encoding or decoding wire messages
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("batch of {0} bets does not fit in one message (max 255)")]
    TooManyBets(usize),

    #[error("unknown message tag {0}")]
    UnknownTag(u8),

    #[error("unexpected message tag {found}, expected {expected}")]
    UnexpectedTag { found: u8, expected: &'static str },

    #[error("message truncated: needed {needed} bytes, {remaining} available")]
    Truncated { needed: usize, remaining: usize },

    #[error("field {field} is not valid UTF-8")]
    InvalidText { field: &'static str },
}

/// Check that `byte` is one of the tags allowed at this protocol step
pub fn expect_tag(byte: u8, allowed: &[MessageTag]) -> Result<MessageTag, CodecError> {
    let unexpected = || CodecError::UnexpectedTag {
        found: byte,
        expected: describe(allowed),
    };
    let tag = MessageTag::try_from(byte).map_err(|_| unexpected())?;
    if allowed.contains(&tag) {
        Ok(tag)
    } else {
        Err(unexpected())
    }
}

fn describe(allowed: &[MessageTag]) -> &'static str {
    match allowed {
        [MessageTag::BatchSend] => "BATCH_SEND",
        [MessageTag::BatchConfirm] => "BATCH_CONFIRM",
        [MessageTag::WinnersRequest] => "WINNERS_REQUEST",
        [MessageTag::LotteryNotRun, MessageTag::WinnersResponse]
        | [MessageTag::WinnersResponse, MessageTag::LotteryNotRun] => {
            "LOTTERY_NOT_RUN or WINNERS_RESPONSE"
        }
        _ => "a different message",
    }
}

fn ensure_remaining(src: &impl Buf, needed: usize) -> Result<(), CodecError> {
    if src.remaining() < needed {
        return Err(CodecError::Truncated {
            needed,
            remaining: src.remaining(),
        });
    }
    Ok(())
}

fn put_fixed_str(dst: &mut BytesMut, value: &str, width: usize) {
    let value = truncate_to_width(value, width);
    dst.put_slice(value.as_bytes());
    dst.put_bytes(0, width - value.len());
}

fn get_fixed_str(
    src: &mut impl Buf,
    width: usize,
    field: &'static str,
) -> Result<String, CodecError> {
    ensure_remaining(&*src, width)?;
    let mut raw = vec![0u8; width];
    src.copy_to_slice(&mut raw);
    let end = raw.iter().position(|&b| b == 0).unwrap_or(width);
    raw.truncate(end);
    String::from_utf8(raw).map_err(|_| CodecError::InvalidText { field })
}

// ============================================================================
// Bets and batches
// ============================================================================

/// Append one fixed-width bet record to `dst`
pub fn encode_bet(bet: &Bet, dst: &mut BytesMut) {
    put_fixed_str(dst, bet.first_name(), NAME_WIDTH);
    put_fixed_str(dst, bet.last_name(), NAME_WIDTH);
    dst.put_u32(bet.document());
    put_fixed_str(dst, bet.birthdate(), BIRTHDATE_WIDTH);
    dst.put_u32(bet.number());
}

/// Read one bet record; the agency comes from the enclosing batch header
pub fn decode_bet(agency: u32, src: &mut impl Buf) -> Result<Bet, CodecError> {
    ensure_remaining(&*src, BET_RECORD_LEN)?;
    let first_name = get_fixed_str(src, NAME_WIDTH, "first_name")?;
    let last_name = get_fixed_str(src, NAME_WIDTH, "last_name")?;
    let document = src.get_u32();
    let birthdate = get_fixed_str(src, BIRTHDATE_WIDTH, "birthdate")?;
    let number = src.get_u32();
    Ok(Bet::new(
        agency,
        &first_name,
        &last_name,
        document,
        &birthdate,
        number,
    ))
}

/// Encode a `BATCH_SEND` message
///
/// An empty slice is valid and produces the end-of-bets marker.
pub fn encode_batch(agency: u32, bets: &[Bet]) -> Result<Bytes, CodecError> {
    let count = u8::try_from(bets.len()).map_err(|_| CodecError::TooManyBets(bets.len()))?;
    let mut dst = BytesMut::with_capacity(BATCH_HEADER_LEN + bets.len() * BET_RECORD_LEN);
    dst.put_u8(MessageTag::BatchSend.as_byte());
    dst.put_u32(agency);
    dst.put_u8(count);
    for bet in bets {
        encode_bet(bet, &mut dst);
    }
    Ok(dst.freeze())
}

/// Encode the zero-bet `BATCH_SEND` that tells the server this agency is done
pub fn encode_end_of_bets(agency: u32) -> Bytes {
    let mut dst = BytesMut::with_capacity(BATCH_HEADER_LEN);
    dst.put_u8(MessageTag::BatchSend.as_byte());
    dst.put_u32(agency);
    dst.put_u8(0);
    dst.freeze()
}

/// Decode a complete `BATCH_SEND` message into its agency and bets
pub fn decode_batch(mut src: &[u8]) -> Result<(u32, Vec<Bet>), CodecError> {
    ensure_remaining(&src, BATCH_HEADER_LEN)?;
    expect_tag(src.get_u8(), &[MessageTag::BatchSend])?;
    let agency = src.get_u32();
    let count = usize::from(src.get_u8());
    ensure_remaining(&src, count * BET_RECORD_LEN)?;
    let bets = (0..count)
        .map(|_| decode_bet(agency, &mut src))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((agency, bets))
}

// ============================================================================
// Confirmations
// ============================================================================

pub fn encode_confirmation(status: u8) -> [u8; CONFIRMATION_LEN] {
    [MessageTag::BatchConfirm.as_byte(), status]
}

/// Validate a confirmation and return its status byte
pub fn decode_confirmation(buf: &[u8; CONFIRMATION_LEN]) -> Result<u8, CodecError> {
    expect_tag(buf[0], &[MessageTag::BatchConfirm])?;
    Ok(buf[1])
}

// ============================================================================
// Winners
// ============================================================================

pub fn encode_winners_request(agency: u32) -> [u8; WINNERS_REQUEST_LEN] {
    let mut buf = [0u8; WINNERS_REQUEST_LEN];
    buf[0] = MessageTag::WinnersRequest.as_byte();
    buf[1..].copy_from_slice(&agency.to_be_bytes());
    buf
}

/// Decode a `WINNERS_REQUEST` and return the agency id
pub fn decode_winners_request(mut src: &[u8]) -> Result<u32, CodecError> {
    ensure_remaining(&src, WINNERS_REQUEST_LEN)?;
    expect_tag(src.get_u8(), &[MessageTag::WinnersRequest])?;
    Ok(src.get_u32())
}

pub fn encode_winners_response(outcome: &WinnersQuery) -> Bytes {
    match outcome {
        WinnersQuery::NotRun => Bytes::copy_from_slice(&[MessageTag::LotteryNotRun.as_byte()]),
        WinnersQuery::Drawn(numbers) => {
            let mut dst = BytesMut::with_capacity(1 + WINNER_FIELD_LEN * (numbers.len() + 1));
            dst.put_u8(MessageTag::WinnersResponse.as_byte());
            // the count field is four bytes wide, far beyond any real draw
            dst.put_u32(numbers.len() as u32);
            for number in numbers {
                dst.put_u32(*number);
            }
            dst.freeze()
        }
    }
}

/// Decode the big-endian winner numbers that follow a winner count
pub fn decode_winner_numbers(mut src: &[u8], count: usize) -> Result<Vec<u32>, CodecError> {
    ensure_remaining(&src, count * WINNER_FIELD_LEN)?;
    Ok((0..count).map(|_| src.get_u32()).collect())
}

/// Decode a complete winners response held in one buffer
pub fn decode_winners_response(mut src: &[u8]) -> Result<WinnersQuery, CodecError> {
    ensure_remaining(&src, 1)?;
    let tag = expect_tag(
        src.get_u8(),
        &[MessageTag::LotteryNotRun, MessageTag::WinnersResponse],
    )?;
    if tag == MessageTag::LotteryNotRun {
        return Ok(WinnersQuery::NotRun);
    }
    ensure_remaining(&src, WINNER_FIELD_LEN)?;
    let count = src.get_u32() as usize;
    decode_winner_numbers(src, count).map(WinnersQuery::Drawn)
}
