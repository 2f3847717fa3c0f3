//! Directory entries published by catalogs
//!
//! `[key (40 bytes), connpoint]`. Subscribers filter on the key part,
//! so a peer only receives entries for the keys it follows.

use bytes::Bytes;

use emyz_core::{
    EmyzError, EmyzResult, PeerKey, CONNPOINT_SCHEME, KEY_Z85_LEN, MAX_CONNPOINT_LEN,
};

use crate::Multipart;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub key: PeerKey,
    pub connpoint: String,
}

impl DirectoryEntry {
    pub fn new(key: PeerKey, connpoint: impl Into<String>) -> Self {
        DirectoryEntry {
            key,
            connpoint: connpoint.into(),
        }
    }

    pub fn encode(&self) -> EmyzResult<Multipart> {
        validate_connpoint(self.connpoint.as_bytes())?;
        Ok(vec![
            Bytes::copy_from_slice(self.key.as_bytes()),
            Bytes::copy_from_slice(self.connpoint.as_bytes()),
        ])
    }

    pub fn decode(msg: &[Bytes]) -> EmyzResult<Self> {
        if msg.len() != 2 {
            return Err(EmyzError::MalformedMessage(format!(
                "directory entry needs 2 parts, got {}",
                msg.len()
            )));
        }
        let key = PeerKey::from_wire(&msg[0]).ok_or_else(|| {
            EmyzError::MalformedMessage(format!(
                "directory key must be {} ASCII bytes, got {}",
                KEY_Z85_LEN,
                msg[0].len()
            ))
        })?;
        validate_connpoint(&msg[1])?;
        let connpoint = String::from_utf8(msg[1].to_vec())
            .map_err(|_| EmyzError::MalformedMessage("connpoint is not UTF-8".into()))?;
        Ok(DirectoryEntry { key, connpoint })
    }
}

fn validate_connpoint(connpoint: &[u8]) -> EmyzResult<()> {
    if connpoint.len() > MAX_CONNPOINT_LEN {
        return Err(EmyzError::MalformedMessage(format!(
            "connpoint longer than {} bytes",
            MAX_CONNPOINT_LEN
        )));
    }
    if !connpoint.starts_with(CONNPOINT_SCHEME.as_bytes()) {
        return Err(EmyzError::MalformedMessage(format!(
            "connpoint must start with {}",
            CONNPOINT_SCHEME
        )));
    }
    // A bind wildcard names no host a subscriber could reach
    if connpoint[CONNPOINT_SCHEME.len()..].starts_with(b"*") {
        return Err(EmyzError::MalformedMessage(
            "connpoint has a wildcard host".into(),
        ));
    }
    Ok(())
}
