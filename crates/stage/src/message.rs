use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A message flowing through a stage. Bodies are raw UTF-8 bytes (§6):
/// raw-stage messages are the upstream payload verbatim, flat-stage
/// messages are JSON objects. Unlike the broker's own wire format, this
/// struct never re-encodes the payload — it exists for dump hooks and
/// tracing, carrying the topic it was read from/will be sent to alongside
/// a correlation id threaded through a single input message's retries.
#[derive(Debug, Clone)]
pub struct StageMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
}

impl StageMessage {
    pub fn new(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            payload,
            timestamp: Utc::now(),
            correlation_id: Uuid::new_v4(),
        }
    }

    pub fn as_utf8(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_utf8_decodes_payload() {
        let msg = StageMessage::new("gtr-domains", b"feedblitz.com".to_vec());
        assert_eq!(msg.as_utf8().unwrap(), "feedblitz.com");
    }

    #[test]
    fn each_message_gets_a_distinct_correlation_id() {
        let a = StageMessage::new("t", vec![]);
        let b = StageMessage::new("t", vec![]);
        assert_ne!(a.correlation_id, b.correlation_id);
    }
}
