use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::QueryError;

/// Largest datagram we ever expect back from a server.
pub const MAX_PACKET_SIZE: usize = 4096;

/// Length of the out-of-band header that prefixes every connectionless packet.
pub const HEADER_LEN: usize = 4;

#[derive(Debug, PartialEq, Eq)]
pub enum PacketHeader {
    /// `0xFFFFFFFF`: a connectionless packet outside of any netchan sequence.
    OutOfBand,
}

/// Convert an i32 into a [PacketHeader].
impl TryFrom<i32> for PacketHeader {
    type Error = QueryError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(PacketHeader::OutOfBand),
            n => Err(QueryError::UnknownPacketHeader(n)),
        }
    }
}

impl PacketHeader {
    pub fn value(&self) -> i32 {
        match self {
            PacketHeader::OutOfBand => -1,
        }
    }
}

/// Decode 8-bit protocol text. Quake II strings are Latin-1, not UTF-8,
/// so every byte maps straight onto the code point of the same value.
pub fn decode_text(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[derive(Debug, PartialEq, Eq)]
pub struct RequestPacket {
    packet_header: PacketHeader,
    body: String,
    terminated: bool,
}

impl RequestPacket {
    /// The `status` query, NUL terminated.
    pub fn status() -> Self {
        RequestPacket {
            packet_header: PacketHeader::OutOfBand,
            body: "status".to_owned(),
            terminated: true,
        }
    }

    /// An rcon command. An empty password sends the bare command.
    pub fn rcon(password: &str, command: &str) -> Self {
        let body = if password.is_empty() {
            command.to_owned()
        } else {
            format!("rcon {} {}", password, command)
        };
        RequestPacket {
            packet_header: PacketHeader::OutOfBand,
            body,
            terminated: false,
        }
    }

    /// Serializes a request packet into an array of bytes.
    pub fn pack(&self) -> Vec<u8> {
        let mut payload: Vec<u8> = Vec::with_capacity(HEADER_LEN + self.body.len() + 1);
        payload.extend_from_slice(&self.packet_header.value().to_le_bytes());
        payload.extend_from_slice(self.body.as_bytes());
        if self.terminated {
            payload.push(0);
        }
        payload
    }

    pub fn packet_header(&self) -> &PacketHeader {
        &self.packet_header
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ResponsePacket {
    packet_header: PacketHeader,
    body: Vec<u8>,
}

impl ResponsePacket {
    /// Deserializes an incoming datagram, splitting it up into header and body.
    pub fn unpack(incoming: &[u8]) -> Result<Self, QueryError> {
        if incoming.len() < HEADER_LEN {
            return Err(QueryError::ShortPacket(incoming.len()));
        }
        let raw_header = Cursor::new(&incoming[..HEADER_LEN])
            .read_i32::<LittleEndian>()
            .map_err(|_| QueryError::ShortPacket(incoming.len()))?;
        let packet_header = PacketHeader::try_from(raw_header)?;

        Ok(ResponsePacket {
            packet_header,
            body: incoming[HEADER_LEN..].to_vec(),
        })
    }

    pub fn packet_header(&self) -> &PacketHeader {
        &self.packet_header
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body decoded as protocol text.
    pub fn text(&self) -> String {
        decode_text(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_request_layout() {
        assert_eq!(
            RequestPacket::status().pack(),
            b"\xff\xff\xff\xffstatus\x00".to_vec()
        );
    }

    #[test]
    fn rcon_request_layout() {
        assert_eq!(
            RequestPacket::rcon("secret", "status").pack(),
            b"\xff\xff\xff\xffrcon secret status".to_vec()
        );
        assert_eq!(
            RequestPacket::rcon("", "status").pack(),
            b"\xff\xff\xff\xffstatus".to_vec()
        );
    }

    #[test]
    fn unpack_rejects_bad_header() {
        let err = ResponsePacket::unpack(b"\xfe\xff\xff\xffprint\n").unwrap_err();
        assert!(matches!(err, QueryError::UnknownPacketHeader(_)));
    }

    #[test]
    fn unpack_rejects_short_packet() {
        let err = ResponsePacket::unpack(b"\xff\xff").unwrap_err();
        assert!(matches!(err, QueryError::ShortPacket(2)));
    }

    #[test]
    fn text_is_latin1() {
        let packet = ResponsePacket::unpack(b"\xff\xff\xff\xffprint\n\xe9").unwrap();
        assert_eq!(packet.packet_header(), &PacketHeader::OutOfBand);
        assert_eq!(packet.text(), "print\n\u{e9}");
    }
}
