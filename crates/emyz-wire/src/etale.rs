//! Etale messages
//!
//! `[topic\0, publish_time (i64 LE, µs), part, part, ...]`
//!
//! Subscribers filter on the first part, so the topic filter is the topic
//! bytes followed by the terminating NUL: `"ab"` never matches `"abc"`.

use bytes::Bytes;

use emyz_core::{EmyzError, EmyzResult, MicroTime};

use crate::{check_part_count, Multipart};

/// Size of the publish time part
pub const PUBLISH_TIME_LEN: usize = 8;

/// One emission of an etale
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EtaleMessage {
    pub topic: String,
    pub publish_time: MicroTime,
    pub parts: Vec<Bytes>,
}

impl EtaleMessage {
    pub fn new(topic: impl Into<String>, publish_time: MicroTime, parts: Vec<Bytes>) -> Self {
        EtaleMessage {
            topic: topic.into(),
            publish_time,
            parts,
        }
    }

    /// Build the multipart message
    pub fn encode(&self) -> EmyzResult<Multipart> {
        check_part_count(self.parts.len() + 2)?;
        let mut msg = Vec::with_capacity(self.parts.len() + 2);
        msg.push(topic_filter(&self.topic)?);
        msg.push(Bytes::copy_from_slice(&self.publish_time.to_le_bytes()));
        msg.extend(self.parts.iter().cloned());
        Ok(msg)
    }

    /// Parse a received multipart message
    pub fn decode(mut msg: Multipart) -> EmyzResult<Self> {
        if msg.len() < 2 {
            return Err(EmyzError::MalformedMessage(format!(
                "etale needs at least 2 parts, got {}",
                msg.len()
            )));
        }

        let topic = decode_topic(&msg[0])?;

        let time: [u8; PUBLISH_TIME_LEN] = msg[1].as_ref().try_into().map_err(|_| {
            EmyzError::MalformedMessage(format!(
                "publish time must be {} bytes, got {}",
                PUBLISH_TIME_LEN,
                msg[1].len()
            ))
        })?;

        let parts = msg.split_off(2);
        Ok(EtaleMessage {
            topic,
            publish_time: MicroTime::from_le_bytes(time),
            parts,
        })
    }
}

/// Subscription filter for a topic (topic bytes + NUL)
pub fn topic_filter(topic: &str) -> EmyzResult<Bytes> {
    if topic.as_bytes().contains(&0) {
        return Err(EmyzError::MalformedMessage(format!(
            "topic {:?} contains NUL",
            topic
        )));
    }
    let mut bytes = Vec::with_capacity(topic.len() + 1);
    bytes.extend_from_slice(topic.as_bytes());
    bytes.push(0);
    Ok(Bytes::from(bytes))
}

fn decode_topic(part: &[u8]) -> EmyzResult<String> {
    match part.last() {
        Some(0) => {}
        _ => {
            return Err(EmyzError::MalformedMessage(
                "topic is not NUL-terminated".into(),
            ))
        }
    }
    // Everything up to the first NUL
    let end = part.iter().position(|&b| b == 0).unwrap_or(part.len() - 1);
    String::from_utf8(part[..end].to_vec())
        .map_err(|_| EmyzError::MalformedMessage("topic is not UTF-8".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_PARTS;

    #[test]
    fn test_etale_layout() {
        let msg = EtaleMessage::new(
            "life",
            MicroTime::from_micros(0x0102_0304_0506_0708),
            vec![Bytes::from_static(b"w"), Bytes::from_static(b"h")],
        );
        let parts = msg.encode().unwrap();

        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0].as_ref(), b"life\0");
        assert_eq!(parts[1].as_ref(), &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(EtaleMessage::decode(parts).unwrap(), msg);
    }

    #[test]
    fn test_etale_without_data_parts() {
        let msg = EtaleMessage::new("", MicroTime::ZERO, Vec::new());
        let parts = msg.encode().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(EtaleMessage::decode(parts).unwrap(), msg);
    }

    #[test]
    fn test_topic_with_nul_rejected() {
        assert!(topic_filter("a\0b").is_err());
        let msg = EtaleMessage::new("a\0b", MicroTime::ZERO, Vec::new());
        assert!(msg.encode().is_err());
    }

    #[test]
    fn test_etale_part_limit() {
        let fits = EtaleMessage::new("t", MicroTime::ZERO, vec![Bytes::new(); MAX_PARTS - 2]);
        assert_eq!(fits.encode().unwrap().len(), MAX_PARTS);

        let over = EtaleMessage::new("t", MicroTime::ZERO, vec![Bytes::new(); MAX_PARTS - 1]);
        assert!(matches!(over.encode(), Err(EmyzError::MalformedMessage(_))));
    }

    #[test]
    fn test_malformed_etales() {
        // Too few parts
        assert!(EtaleMessage::decode(vec![Bytes::from_static(b"t\0")]).is_err());

        // Topic without terminator
        let parts = vec![Bytes::from_static(b"t"), Bytes::from(vec![0u8; 8])];
        assert!(EtaleMessage::decode(parts).is_err());

        // Empty topic part
        let parts = vec![Bytes::new(), Bytes::from(vec![0u8; 8])];
        assert!(EtaleMessage::decode(parts).is_err());

        // Wrong time length
        let parts = vec![Bytes::from_static(b"t\0"), Bytes::from(vec![0u8; 7])];
        assert!(EtaleMessage::decode(parts).is_err());
    }

    #[test]
    fn test_topic_stops_at_first_nul() {
        let parts = vec![Bytes::from_static(b"ab\0cd\0"), Bytes::from(vec![0u8; 8])];
        assert_eq!(EtaleMessage::decode(parts).unwrap().topic, "ab");
    }
}
