use crate::cursor::{
    codec::{decode_hex, encode_hex},
    error::CursorError,
    signature::ShapeSignature,
};
use serde::{Deserialize, Serialize};

const TOKEN_VERSION: u8 = 1;

///
/// ContinuationToken
///
/// Store continuation bound to the shape signature of the query that
/// produced it. Travels to callers as lowercase hex over CBOR.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ContinuationToken {
    signature: ShapeSignature,
    store: String,
}

#[derive(Deserialize, Serialize)]
struct ContinuationTokenWire {
    version: u8,
    signature: [u8; 32],
    store: String,
}

impl ContinuationToken {
    pub(crate) const fn new(signature: ShapeSignature, store: String) -> Self {
        Self { signature, store }
    }

    pub(crate) const fn signature(&self) -> ShapeSignature {
        self.signature
    }

    pub(crate) fn store(&self) -> &str {
        &self.store
    }

    pub(crate) fn encode(&self) -> Result<String, CursorError> {
        let wire = ContinuationTokenWire {
            version: TOKEN_VERSION,
            signature: self.signature.into_bytes(),
            store: self.store.clone(),
        };
        let bytes = serde_cbor::to_vec(&wire).map_err(|err| CursorError::Payload {
            reason: err.to_string(),
        })?;

        Ok(encode_hex(&bytes))
    }

    pub(crate) fn decode(token: &str) -> Result<Self, CursorError> {
        let bytes = decode_hex(token)?;
        let wire: ContinuationTokenWire =
            serde_cbor::from_slice(&bytes).map_err(|err| CursorError::Payload {
                reason: err.to_string(),
            })?;

        if wire.version != TOKEN_VERSION {
            return Err(CursorError::Version {
                version: wire.version,
            });
        }

        Ok(Self {
            signature: ShapeSignature::from_bytes(wire.signature),
            store: wire.store,
        })
    }

    /// Decode `token` and require it to carry `expected`.
    pub(crate) fn decode_for(
        token: &str,
        expected: ShapeSignature,
        collection: &str,
    ) -> Result<Self, CursorError> {
        let decoded = Self::decode(token)?;
        if decoded.signature != expected {
            return Err(CursorError::SignatureMismatch {
                collection: collection.to_string(),
            });
        }

        Ok(decoded)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(byte: u8) -> ShapeSignature {
        ShapeSignature::from_bytes([byte; 32])
    }

    #[test]
    fn token_survives_hex_transport() {
        let token = ContinuationToken::new(signature(7), "offset:3".to_string());
        let decoded = ContinuationToken::decode(&token.encode().unwrap()).unwrap();

        assert_eq!(decoded, token);
        assert_eq!(decoded.store(), "offset:3");
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let encoded = ContinuationToken::new(signature(1), "3".to_string())
            .encode()
            .unwrap();
        let err = ContinuationToken::decode_for(&encoded, signature(2), "addresses").unwrap_err();

        assert!(matches!(err, CursorError::SignatureMismatch { .. }));
        assert!(crate::error::InternalError::from(err).is_invalid_cursor());
    }

    #[test]
    fn unknown_version_is_rejected() {
        let wire = ContinuationTokenWire {
            version: 9,
            signature: [0; 32],
            store: String::new(),
        };
        let encoded = encode_hex(&serde_cbor::to_vec(&wire).unwrap());

        assert_eq!(
            ContinuationToken::decode(&encoded),
            Err(CursorError::Version { version: 9 })
        );
    }

    #[test]
    fn garbage_payload_is_rejected() {
        assert!(matches!(
            ContinuationToken::decode("deadbeef"),
            Err(CursorError::Payload { .. })
        ));
        assert!(matches!(
            ContinuationToken::decode("xyz"),
            Err(CursorError::Decode(_))
        ));
    }
}
