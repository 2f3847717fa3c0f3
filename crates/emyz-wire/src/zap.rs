//! ZAP authorization handshake (ZeroMQ RFC 27)
//!
//! Request: `[version, sequence, domain, address, identity, mechanism, key]`
//! Reply:   `[version, sequence, status code, status text, user id, metadata]`
//!
//! Requests are answered one at a time, in order. Only the CURVE mechanism
//! carries a key; anything else is answered with a deny.

use bytes::Bytes;

use emyz_core::{EmyzError, EmyzResult, KEY_BIN_LEN};

use crate::Multipart;

pub const ZAP_VERSION: &[u8] = b"1.0";
pub const MECHANISM_CURVE: &[u8] = b"CURVE";

pub const STATUS_OK: &str = "200";
pub const STATUS_DENIED: &str = "400";

/// Minimum number of parts in a CURVE request
pub const ZAP_REQUEST_PARTS: usize = 7;

/// Authorization request for one connection attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZapRequest {
    pub version: Bytes,
    pub sequence: Bytes,
    pub domain: Bytes,
    pub address: Bytes,
    /// Routing identity of the channel being connected to
    pub identity: Bytes,
    pub mechanism: Bytes,
    /// Raw public key claimed by the connecting peer
    pub client_key: [u8; KEY_BIN_LEN],
}

impl ZapRequest {
    pub fn curve(
        sequence: impl Into<Bytes>,
        address: impl Into<Bytes>,
        identity: impl Into<Bytes>,
        client_key: [u8; KEY_BIN_LEN],
    ) -> Self {
        ZapRequest {
            version: Bytes::from_static(ZAP_VERSION),
            sequence: sequence.into(),
            domain: Bytes::new(),
            address: address.into(),
            identity: identity.into(),
            mechanism: Bytes::from_static(MECHANISM_CURVE),
            client_key,
        }
    }

    pub fn encode(&self) -> Multipart {
        vec![
            self.version.clone(),
            self.sequence.clone(),
            self.domain.clone(),
            self.address.clone(),
            self.identity.clone(),
            self.mechanism.clone(),
            Bytes::copy_from_slice(&self.client_key),
        ]
    }

    pub fn decode(msg: &[Bytes]) -> EmyzResult<Self> {
        if msg.len() < ZAP_REQUEST_PARTS {
            return Err(EmyzError::MalformedMessage(format!(
                "ZAP request needs {} parts, got {}",
                ZAP_REQUEST_PARTS,
                msg.len()
            )));
        }
        if msg[0].as_ref() != ZAP_VERSION {
            return Err(EmyzError::MalformedMessage(format!(
                "unsupported ZAP version {:?}",
                msg[0]
            )));
        }
        if msg[5].as_ref() != MECHANISM_CURVE {
            return Err(EmyzError::MalformedMessage(format!(
                "unsupported mechanism {:?}",
                msg[5]
            )));
        }
        let client_key: [u8; KEY_BIN_LEN] = msg[6].as_ref().try_into().map_err(|_| {
            EmyzError::MalformedMessage(format!(
                "client key must be {} bytes, got {}",
                KEY_BIN_LEN,
                msg[6].len()
            ))
        })?;

        Ok(ZapRequest {
            version: msg[0].clone(),
            sequence: msg[1].clone(),
            domain: msg[2].clone(),
            address: msg[3].clone(),
            identity: msg[4].clone(),
            mechanism: msg[5].clone(),
            client_key,
        })
    }

    /// Version and sequence of a request too broken to decode, if present
    pub fn header(msg: &[Bytes]) -> Option<(Bytes, Bytes)> {
        match msg {
            [version, sequence, ..] => Some((version.clone(), sequence.clone())),
            _ => None,
        }
    }
}

/// Answer to a [`ZapRequest`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZapReply {
    pub version: Bytes,
    pub sequence: Bytes,
    pub status_code: String,
    pub status_text: String,
    pub user_id: String,
    pub metadata: Bytes,
}

impl ZapReply {
    /// Allow, reporting the client's key as its user id
    pub fn allow(version: Bytes, sequence: Bytes, user_id: impl Into<String>) -> Self {
        ZapReply {
            version,
            sequence,
            status_code: STATUS_OK.into(),
            status_text: "OK".into(),
            user_id: user_id.into(),
            metadata: Bytes::new(),
        }
    }

    pub fn deny(version: Bytes, sequence: Bytes) -> Self {
        ZapReply {
            version,
            sequence,
            status_code: STATUS_DENIED.into(),
            status_text: "FAILED".into(),
            user_id: String::new(),
            metadata: Bytes::new(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.status_code == STATUS_OK
    }

    pub fn encode(&self) -> Multipart {
        vec![
            self.version.clone(),
            self.sequence.clone(),
            Bytes::copy_from_slice(self.status_code.as_bytes()),
            Bytes::copy_from_slice(self.status_text.as_bytes()),
            Bytes::copy_from_slice(self.user_id.as_bytes()),
            self.metadata.clone(),
        ]
    }

    pub fn decode(msg: &[Bytes]) -> EmyzResult<Self> {
        if msg.len() != 6 {
            return Err(EmyzError::MalformedMessage(format!(
                "ZAP reply needs 6 parts, got {}",
                msg.len()
            )));
        }
        let text = |part: &Bytes| {
            String::from_utf8(part.to_vec())
                .map_err(|_| EmyzError::MalformedMessage("ZAP reply field is not UTF-8".into()))
        };
        Ok(ZapReply {
            version: msg[0].clone(),
            sequence: msg[1].clone(),
            status_code: text(&msg[2])?,
            status_text: text(&msg[3])?,
            user_id: text(&msg[4])?,
            metadata: msg[5].clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ZapRequest {
        ZapRequest::curve(
            Bytes::from_static(b"17"),
            Bytes::from_static(b"10.0.0.9"),
            Bytes::from_static(b"pubsub"),
            [9u8; KEY_BIN_LEN],
        )
    }

    #[test]
    fn test_request_roundtrip() {
        let req = request();
        let msg = req.encode();
        assert_eq!(msg.len(), ZAP_REQUEST_PARTS);
        assert_eq!(ZapRequest::decode(&msg).unwrap(), req);
    }

    #[test]
    fn test_request_rejects_other_mechanisms() {
        let mut msg = request().encode();
        msg[5] = Bytes::from_static(b"PLAIN");
        assert!(ZapRequest::decode(&msg).is_err());
    }

    #[test]
    fn test_request_rejects_bad_key() {
        let mut msg = request().encode();
        msg[6] = Bytes::from(vec![1u8; 31]);
        assert!(ZapRequest::decode(&msg).is_err());
        // The header is still there for a fail-closed reply
        let (version, sequence) = ZapRequest::header(&msg).unwrap();
        assert_eq!(version.as_ref(), ZAP_VERSION);
        assert_eq!(sequence.as_ref(), b"17");
    }

    #[test]
    fn test_header_needs_two_parts() {
        assert!(ZapRequest::header(&[Bytes::from_static(b"1.0")]).is_none());
    }

    #[test]
    fn test_reply_allow_and_deny() {
        let req = request();
        let allow = ZapReply::allow(req.version.clone(), req.sequence.clone(), "KEY");
        let deny = ZapReply::deny(req.version.clone(), req.sequence.clone());

        let allow = ZapReply::decode(&allow.encode()).unwrap();
        let deny = ZapReply::decode(&deny.encode()).unwrap();

        assert!(allow.is_allowed());
        assert_eq!(allow.status_text, "OK");
        assert_eq!(allow.user_id, "KEY");
        assert!(!deny.is_allowed());
        assert_eq!(deny.status_code, STATUS_DENIED);
        assert_eq!(deny.status_text, "FAILED");
        assert!(deny.user_id.is_empty());
    }
}
