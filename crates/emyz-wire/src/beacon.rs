//! Beacons
//!
//! A beacon is a single part holding the sender's publish port (u16 LE).
//! Sender identity and source address come from the channel metadata.

use bytes::Bytes;

use emyz_core::{EmyzError, EmyzResult};

use crate::Multipart;

/// Size of the only beacon part
pub const BEACON_LEN: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Beacon {
    pub port: u16,
}

impl Beacon {
    pub fn new(port: u16) -> Self {
        Beacon { port }
    }

    pub fn encode(&self) -> Multipart {
        vec![Bytes::copy_from_slice(&self.port.to_le_bytes())]
    }

    pub fn decode(msg: &[Bytes]) -> EmyzResult<Self> {
        if msg.len() != 1 {
            return Err(EmyzError::MalformedMessage(format!(
                "beacon needs 1 part, got {}",
                msg.len()
            )));
        }
        let port: [u8; BEACON_LEN] = msg[0].as_ref().try_into().map_err(|_| {
            EmyzError::MalformedMessage(format!(
                "beacon must be {} bytes, got {}",
                BEACON_LEN,
                msg[0].len()
            ))
        })?;
        Ok(Beacon {
            port: u16::from_le_bytes(port),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_beacon_little_endian() {
        let msg = Beacon::new(0xEDAF).encode();
        assert_eq!(msg.len(), 1);
        assert_eq!(msg[0].as_ref(), &[0xAF, 0xED]);
    }

    #[test]
    fn test_malformed_beacons() {
        assert!(Beacon::decode(&[]).is_err());
        assert!(Beacon::decode(&[Bytes::from_static(b"\x01")]).is_err());
        assert!(Beacon::decode(&[Bytes::from_static(b"\x01\x02\x03")]).is_err());
        let two = vec![Bytes::from_static(b"\x01\x02"), Bytes::from_static(b"\x01\x02")];
        assert!(Beacon::decode(&two).is_err());
    }

    proptest! {
        #[test]
        fn prop_every_port_roundtrips(port in any::<u16>()) {
            let beacon = Beacon::new(port);
            prop_assert_eq!(Beacon::decode(&beacon.encode()).unwrap(), beacon);
        }
    }
}
