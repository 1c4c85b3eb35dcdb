//! Actor Message Codec
//!
//! Messages travel as opaque byte payloads: the sender encodes, the receiving
//! actor decodes into its own message type. Remote deliveries wrap the payload
//! in a `RemoteEnvelope` naming the target ref.

use crate::error::{ActorError, Result};
use crate::reference::ActorRef;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Encode a message into its wire payload
pub fn encode<T: Serialize + ?Sized>(message: &T) -> Result<Vec<u8>> {
    bincode::serialize(message).map_err(ActorError::encode)
}

/// Decode a payload into a concrete message type
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    bincode::deserialize(payload).map_err(ActorError::decode)
}

/// Unit of inter-runtime transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEnvelope {
    pub target: ActorRef,
    pub payload: Vec<u8>,
}

impl RemoteEnvelope {
    pub fn new(target: ActorRef, payload: Vec<u8>) -> Self {
        Self { target, payload }
    }

    /// Encoded size on the wire, excluding the frame header
    pub fn encoded_len(&self) -> usize {
        bincode::serialized_size(self)
            .map(|n| n as usize)
            .unwrap_or(self.payload.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum Probe {
        Ping(u32),
        Pong { from: ActorRef },
    }

    #[test]
    fn test_refs_survive_encoding() {
        let from = ActorRef::new("127.0.0.1:7100", 5);
        let payload = encode(&Probe::Pong { from: from.clone() }).unwrap();
        assert_eq!(decode::<Probe>(&payload).unwrap(), Probe::Pong { from });
    }

    #[test]
    fn test_decode_into_wrong_type_fails() {
        let payload = encode(&"not a probe").unwrap();
        let err = decode::<Probe>(&payload).unwrap_err();
        assert_eq!(err.category(), "codec");
    }

    #[test]
    fn test_envelope_wraps_payload() {
        let payload = encode(&Probe::Ping(7)).unwrap();
        let envelope = RemoteEnvelope::new(ActorRef::new("127.0.0.1:7100", 1), payload.clone());
        let wire = encode(&envelope).unwrap();
        assert_eq!(wire.len(), envelope.encoded_len());

        let back: RemoteEnvelope = decode(&wire).unwrap();
        assert_eq!(back.payload, payload);
        assert_eq!(decode::<Probe>(&back.payload).unwrap(), Probe::Ping(7));
    }
}
