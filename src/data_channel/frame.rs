use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;

use crate::data_channel::channel_error::ChannelError;

pub const HEADER_LEN: usize = 12;

/// Payload protocol identifier carried by every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ppid {
    Control,
    String,
    Binary,
}

impl Ppid {
    const CONTROL: u32 = 50;
    const STRING: u32 = 51;
    const BINARY: u32 = 53;

    #[must_use]
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::Control => Self::CONTROL,
            Self::String => Self::STRING,
            Self::Binary => Self::BINARY,
        }
    }

    fn from_u32(v: u32) -> Option<Self> {
        match v {
            Self::CONTROL => Some(Self::Control),
            Self::STRING => Some(Self::String),
            Self::BINARY => Some(Self::Binary),
            _ => None,
        }
    }
}

/// One datagram on the wire:
/// `stream_id u16 | ssn u16 | ppid u32 | len u32 | payload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFrame {
    pub stream_id: u16,
    pub ssn: u16,
    pub ppid: Ppid,
    pub payload: Bytes,
}

impl ChannelFrame {
    /// # Errors
    /// [`ChannelError::Encode`] if the payload does not fit a `u32` length.
    pub fn encode(&self) -> Result<Bytes, ChannelError> {
        let len = u32::try_from(self.payload.len()).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "payload too large")
        })?;
        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len());
        buf.write_u16::<BigEndian>(self.stream_id)?;
        buf.write_u16::<BigEndian>(self.ssn)?;
        buf.write_u32::<BigEndian>(self.ppid.as_u32())?;
        buf.write_u32::<BigEndian>(len)?;
        buf.extend_from_slice(&self.payload);
        Ok(Bytes::from(buf))
    }

    /// # Errors
    /// [`ChannelError::Decode`] on a short buffer, an unknown PPID or a length
    /// field that disagrees with the datagram size.
    pub fn decode(data: &[u8]) -> Result<Self, ChannelError> {
        let mut cursor = Cursor::new(data);
        let stream_id = cursor.read_u16::<BigEndian>().map_err(decode_err)?;
        let ssn = cursor.read_u16::<BigEndian>().map_err(decode_err)?;
        let raw_ppid = cursor.read_u32::<BigEndian>().map_err(decode_err)?;
        let len = cursor.read_u32::<BigEndian>().map_err(decode_err)? as usize;

        let ppid = Ppid::from_u32(raw_ppid)
            .ok_or_else(|| ChannelError::Decode(format!("unknown ppid {raw_ppid}")))?;
        if data.len() - HEADER_LEN != len {
            return Err(ChannelError::Decode(format!(
                "length field {len} but {} payload bytes",
                data.len() - HEADER_LEN
            )));
        }
        let mut payload = vec![0u8; len];
        cursor.read_exact(&mut payload).map_err(decode_err)?;

        Ok(Self {
            stream_id,
            ssn,
            ppid,
            payload: Bytes::from(payload),
        })
    }
}

fn decode_err(e: std::io::Error) -> ChannelError {
    ChannelError::Decode(e.to_string())
}
