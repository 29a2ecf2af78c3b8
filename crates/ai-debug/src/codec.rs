//! Frame codec.
//!
//! A frame is `[u32 LE payload length][u8 message type][payload]`, the payload being the
//! MessagePack encoding of the message body.

use std::io::{self, Read, Write};

use rmp_serde::{decode, encode};
use thiserror::Error;

use crate::protocol::{Message, MessageType};

/// Length prefix plus type byte.
pub const HEADER_LEN: usize = 5;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("encode error: {0}")]
    Encode(#[from] encode::Error),
    #[error("decode error: {0}")]
    Decode(#[from] decode::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("unknown message type {0}")]
    UnknownType(u8),
    #[error("frame of {size} bytes exceeds the limit of {max}")]
    FrameTooLarge { size: usize, max: usize },
}

pub fn encode_frame(message: &Message) -> Result<Vec<u8>, WireError> {
    let payload = encode_payload(message)?;
    let len = u32::try_from(payload.len()).map_err(|_| WireError::FrameTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.push(message.message_type() as u8);
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decodes the first frame in `buf`.
///
/// Returns the message and the number of bytes it used, or `None` if `buf` does not hold a
/// complete frame yet.
pub fn decode_frame(
    buf: &[u8],
    max_frame_size: usize,
) -> Result<Option<(Message, usize)>, WireError> {
    if buf.len() < HEADER_LEN {
        return Ok(None);
    }
    let len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if len > max_frame_size {
        return Err(WireError::FrameTooLarge {
            size: len,
            max: max_frame_size,
        });
    }
    if buf.len() < HEADER_LEN + len {
        return Ok(None);
    }
    let ty = MessageType::from_u8(buf[4]).ok_or(WireError::UnknownType(buf[4]))?;
    let message = decode_payload(ty, &buf[HEADER_LEN..HEADER_LEN + len])?;
    Ok(Some((message, HEADER_LEN + len)))
}

/// Blocking read of one frame.
pub fn read_message(reader: &mut impl Read, max_frame_size: usize) -> Result<Message, WireError> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header)?;
    let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
    if len > max_frame_size {
        return Err(WireError::FrameTooLarge {
            size: len,
            max: max_frame_size,
        });
    }
    let ty = MessageType::from_u8(header[4]).ok_or(WireError::UnknownType(header[4]))?;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(decode_payload(ty, &payload)?)
}

/// Blocking write of one frame.
pub fn write_message(writer: &mut impl Write, message: &Message) -> Result<(), WireError> {
    writer.write_all(&encode_frame(message)?)?;
    writer.flush()?;
    Ok(())
}

fn encode_payload(message: &Message) -> Result<Vec<u8>, encode::Error> {
    match message {
        Message::Ping | Message::Reset => encode::to_vec(&()),
        Message::StateWorld(states) => encode::to_vec(states),
        Message::CharacterStatic(data) => encode::to_vec(data),
        Message::CharacterDetails(data) => encode::to_vec(data),
        Message::Select(id) => encode::to_vec(id),
        Message::Pause(pause) => encode::to_vec(pause),
        Message::ChangeZone(name) => encode::to_vec(name),
        Message::Step(millis) => encode::to_vec(millis),
        Message::Names(names) => encode::to_vec(names),
    }
}

fn decode_payload(ty: MessageType, payload: &[u8]) -> Result<Message, decode::Error> {
    Ok(match ty {
        MessageType::Ping => Message::Ping,
        MessageType::Reset => Message::Reset,
        MessageType::StateWorld => Message::StateWorld(decode::from_slice(payload)?),
        MessageType::CharacterStatic => Message::CharacterStatic(decode::from_slice(payload)?),
        MessageType::CharacterDetails => Message::CharacterDetails(decode::from_slice(payload)?),
        MessageType::Select => Message::Select(decode::from_slice(payload)?),
        MessageType::Pause => Message::Pause(decode::from_slice(payload)?),
        MessageType::ChangeZone => Message::ChangeZone(decode::from_slice(payload)?),
        MessageType::Step => Message::Step(decode::from_slice(payload)?),
        MessageType::Names => Message::Names(decode::from_slice(payload)?),
    })
}
