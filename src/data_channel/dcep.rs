use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;

use crate::data_channel::channel_error::ChannelError;

/// Channel establishment messages carried with [`Ppid::Control`](super::frame::Ppid).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    Open { label: String },
    Ack,
    Close,
}

impl ControlMessage {
    const TYPE_ACK: u8 = 0x02;
    const TYPE_OPEN: u8 = 0x03;
    const TYPE_CLOSE: u8 = 0x04;
    /// DATA_CHANNEL_RELIABLE: ordered, no partial reliability.
    const CHANNEL_TYPE_RELIABLE: u8 = 0x00;

    /// # Errors
    /// [`ChannelError::Encode`] if the label is longer than `u16::MAX` bytes.
    pub fn serialize(&self) -> Result<Bytes, ChannelError> {
        let mut buf = Vec::new();
        match self {
            Self::Open { label } => {
                let label_len = u16::try_from(label.len()).map_err(|_| {
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "label too long")
                })?;
                buf.write_u8(Self::TYPE_OPEN)?;
                buf.write_u8(Self::CHANNEL_TYPE_RELIABLE)?;
                buf.write_u16::<BigEndian>(0)?; // priority
                buf.write_u32::<BigEndian>(0)?; // reliability parameter
                buf.write_u16::<BigEndian>(label_len)?;
                buf.write_u16::<BigEndian>(0)?; // protocol length
                buf.extend_from_slice(label.as_bytes());
            }
            Self::Ack => buf.write_u8(Self::TYPE_ACK)?,
            Self::Close => buf.write_u8(Self::TYPE_CLOSE)?,
        }
        Ok(Bytes::from(buf))
    }

    /// # Errors
    /// [`ChannelError::Decode`] on an unknown type, a truncated OPEN or a
    /// label that is not UTF-8.
    pub fn deserialize(data: &[u8]) -> Result<Self, ChannelError> {
        let mut cursor = Cursor::new(data);
        let msg_type = cursor.read_u8().map_err(decode_err)?;
        match msg_type {
            Self::TYPE_OPEN => {
                let _channel_type = cursor.read_u8().map_err(decode_err)?;
                let _priority = cursor.read_u16::<BigEndian>().map_err(decode_err)?;
                let _reliability = cursor.read_u32::<BigEndian>().map_err(decode_err)?;
                let label_len = cursor.read_u16::<BigEndian>().map_err(decode_err)?;
                let protocol_len = cursor.read_u16::<BigEndian>().map_err(decode_err)?;
                let mut label = vec![0u8; usize::from(label_len)];
                cursor.read_exact(&mut label).map_err(decode_err)?;
                let mut protocol = vec![0u8; usize::from(protocol_len)];
                cursor.read_exact(&mut protocol).map_err(decode_err)?;
                let label = String::from_utf8(label)
                    .map_err(|e| ChannelError::Decode(format!("label: {e}")))?;
                Ok(Self::Open { label })
            }
            Self::TYPE_ACK => Ok(Self::Ack),
            Self::TYPE_CLOSE => Ok(Self::Close),
            other => Err(ChannelError::Decode(format!(
                "unknown control message type {other:#04x}"
            ))),
        }
    }
}

fn decode_err(e: std::io::Error) -> ChannelError {
    ChannelError::Decode(e.to_string())
}
