use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use rand::{RngCore, rngs::OsRng};

/// Same cookie and offset as STUN, so a check never parses as a channel
/// frame: a frame carries its PPID in those four bytes.
pub const MAGIC_COOKIE: u32 = 0x2112_A442;
pub const HEADER_LEN: usize = 20;

const BINDING_REQUEST: u16 = 0x0001;
const BINDING_RESPONSE: u16 = 0x0101;

pub type TransactionId = [u8; 12];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Request,
    Response,
}

/// A connectivity check on the loopback fabric:
/// `type u16 | length u16 | cookie u32 | transaction id [12] | username`.
///
/// The username is `<responder ufrag>:<requester ufrag>`; a responder only
/// answers requests carrying its own ufrag first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingMessage {
    pub kind: BindingKind,
    pub transaction_id: TransactionId,
    pub username: String,
}

impl BindingMessage {
    #[must_use]
    pub fn request(remote_ufrag: &str, local_ufrag: &str) -> Self {
        let mut transaction_id = [0u8; 12];
        OsRng.fill_bytes(&mut transaction_id);
        Self {
            kind: BindingKind::Request,
            transaction_id,
            username: format!("{remote_ufrag}:{local_ufrag}"),
        }
    }

    /// The success response to this request.
    #[must_use]
    pub fn response(&self) -> Self {
        Self {
            kind: BindingKind::Response,
            transaction_id: self.transaction_id,
            username: self.username.clone(),
        }
    }

    /// The ufrag the request was addressed to.
    #[must_use]
    pub fn target_ufrag(&self) -> &str {
        self.username.split(':').next().unwrap_or_default()
    }

    /// True if `data` carries the cookie at the STUN offset.
    #[must_use]
    pub fn is_binding(data: &[u8]) -> bool {
        data.len() >= HEADER_LEN && data[4..8] == MAGIC_COOKIE.to_be_bytes()
    }

    #[must_use]
    pub fn encode(&self) -> Bytes {
        let username = self.username.as_bytes();
        let len = u16::try_from(username.len()).unwrap_or(u16::MAX);
        let mut buf = Vec::with_capacity(HEADER_LEN + usize::from(len));
        // Writes into a Vec cannot fail.
        let _ = buf.write_u16::<BigEndian>(match self.kind {
            BindingKind::Request => BINDING_REQUEST,
            BindingKind::Response => BINDING_RESPONSE,
        });
        let _ = buf.write_u16::<BigEndian>(len);
        let _ = buf.write_u32::<BigEndian>(MAGIC_COOKIE);
        buf.extend_from_slice(&self.transaction_id);
        buf.extend_from_slice(&username[..usize::from(len)]);
        Bytes::from(buf)
    }

    /// `None` for anything that is not a well-formed binding message.
    #[must_use]
    pub fn decode(data: &[u8]) -> Option<Self> {
        if !Self::is_binding(data) {
            return None;
        }
        let mut cursor = Cursor::new(data);
        let kind = match cursor.read_u16::<BigEndian>().ok()? {
            BINDING_REQUEST => BindingKind::Request,
            BINDING_RESPONSE => BindingKind::Response,
            _ => return None,
        };
        let len = usize::from(cursor.read_u16::<BigEndian>().ok()?);
        let _cookie = cursor.read_u32::<BigEndian>().ok()?;
        let mut transaction_id = [0u8; 12];
        cursor.read_exact(&mut transaction_id).ok()?;
        if data.len() - HEADER_LEN != len {
            return None;
        }
        let username = String::from_utf8(data[HEADER_LEN..].to_vec()).ok()?;
        Some(Self {
            kind,
            transaction_id,
            username,
        })
    }
}
