//! Length-delimited frame codec for [`Message`]

use crate::message::Message;
use crate::{NetworkError, NetworkResult};
use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

fn wire_config() -> bincode::config::Configuration {
    bincode::config::standard()
}

/// Encode a message body (without framing)
pub fn encode_message(message: &Message) -> NetworkResult<Vec<u8>> {
    Ok(bincode::serde::encode_to_vec(message, wire_config())?)
}

/// Decode a message body (without framing)
pub fn decode_message(bytes: &[u8]) -> NetworkResult<Message> {
    let (message, read): (Message, usize) =
        bincode::serde::decode_from_slice(bytes, wire_config())?;
    if read != bytes.len() {
        return Err(NetworkError::Encoding(format!(
            "{} trailing bytes after {}",
            bytes.len() - read,
            message.command()
        )));
    }
    Ok(message)
}

/// Frames each message as a 4-byte big-endian length followed by its
/// bincode encoding
#[derive(Debug)]
pub struct MessageCodec {
    frames: LengthDelimitedCodec,
    max_message_size: usize,
}

impl MessageCodec {
    pub fn new(max_message_size: usize) -> Self {
        Self {
            frames: LengthDelimitedCodec::builder()
                .max_frame_length(max_message_size)
                .new_codec(),
            max_message_size,
        }
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = NetworkError;

    /// Frames whose payload does not decode are logged and skipped; only
    /// framing errors end the stream.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, NetworkError> {
        while let Some(frame) = self.frames.decode(src)? {
            match decode_message(&frame) {
                Ok(message) => return Ok(Some(message)),
                Err(e) => {
                    tracing::warn!(len = frame.len(), error = %e, "Dropping malformed message");
                }
            }
        }
        Ok(None)
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = NetworkError;

    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> Result<(), NetworkError> {
        let body = encode_message(&message)?;
        if body.len() > self.max_message_size {
            return Err(NetworkError::MessageTooLarge {
                size: body.len(),
                max: self.max_message_size,
            });
        }
        self.frames.encode(Bytes::from(body), dst)?;
        Ok(())
    }
}
