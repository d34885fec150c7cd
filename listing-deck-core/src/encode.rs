//! Blob → data URI conversion.
//!
//! Encoding runs as a completion-driven job on the blocking pool. The job
//! reports back through a single-settle channel: it either resolves with the
//! encoded string or rejects with an [`EncodingError`], exactly once. If the
//! job disappears without settling, the awaiting side observes
//! [`EncodingError::Abandoned`] instead of hanging.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::sync::oneshot;
use tracing::{debug, error};

use crate::contract::Blob;
use crate::error::EncodingError;

/// A data URI embedding a MIME type and a base64 payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage(String);

impl EncodedImage {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Single-settle handle given to a completion callback.
///
/// Consuming `self` on both paths makes a second settle unrepresentable.
struct Settle(oneshot::Sender<Result<String, EncodingError>>);

impl Settle {
    fn resolve(self, value: String) {
        // The receiver may already be gone if the caller stopped waiting.
        let _ = self.0.send(Ok(value));
    }

    fn reject(self, err: EncodingError) {
        let _ = self.0.send(Err(err));
    }
}

/// Encode a blob as a data URI.
pub async fn encode_data_uri(blob: Blob) -> Result<EncodedImage, EncodingError> {
    run_encode_job(blob, read_as_data_url).await
}

async fn run_encode_job<J>(blob: Blob, job: J) -> Result<EncodedImage, EncodingError>
where
    J: FnOnce(Blob, Settle) + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let settle = Settle(tx);
    let size = blob.len();

    tokio::task::spawn_blocking(move || job(blob, settle));

    match rx.await {
        Ok(Ok(uri)) => {
            debug!(size, uri_len = uri.len(), "Encoded blob as data URI");
            Ok(EncodedImage(uri))
        }
        Ok(Err(e)) => {
            error!(error = ?e, size, "Blob encoding rejected");
            Err(e)
        }
        Err(_) => {
            error!(size, "Blob encoding job dropped without settling");
            Err(EncodingError::Abandoned)
        }
    }
}

fn read_as_data_url(blob: Blob, settle: Settle) {
    if blob.mime_type.trim().is_empty() {
        return settle.reject(EncodingError::Read("blob has no MIME type".into()));
    }
    let payload = STANDARD.encode(&blob.bytes);
    settle.resolve(format!("data:{};base64,{}", blob.mime_type, payload));
}

/// Split a base64 data URI back into its MIME type and bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), EncodingError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| EncodingError::InvalidDataUri("missing data: scheme".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| EncodingError::InvalidDataUri("missing payload separator".into()))?;
    let mime_type = meta
        .strip_suffix(";base64")
        .ok_or_else(|| EncodingError::InvalidDataUri("payload is not base64".into()))?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| EncodingError::InvalidDataUri(e.to_string()))?;
    Ok((mime_type.to_string(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn encodes_with_mime_prefix() {
        let blob = Blob::new("image/png", vec![0x89, b'P', b'N', b'G']);
        let encoded = encode_data_uri(blob).await.unwrap();
        assert_eq!(encoded.as_str(), "data:image/png;base64,iVBORw==");
    }

    #[tokio::test]
    async fn round_trip_recovers_every_byte() {
        for len in [0usize, 1, 2, 3, 4, 255, 4096, 65_537] {
            let bytes: Vec<u8> = (0..len).map(|i| (i * 31 % 256) as u8).collect();
            let encoded = encode_data_uri(Blob::new("image/jpeg", bytes.clone()))
                .await
                .unwrap();

            let (mime, decoded) = decode_data_uri(encoded.as_str()).unwrap();

            assert_eq!(mime, "image/jpeg");
            assert_eq!(decoded.len(), len);
            assert_eq!(decoded, bytes);
        }
    }

    #[tokio::test]
    async fn empty_blob_encodes_to_an_empty_payload() {
        let encoded = encode_data_uri(Blob::new("image/jpeg", Vec::new()))
            .await
            .unwrap();
        assert_eq!(encoded.as_str(), "data:image/jpeg;base64,");

        let (mime, bytes) = decode_data_uri(encoded.as_str()).unwrap();
        assert_eq!(mime, "image/jpeg");
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn job_dropped_without_settling_is_abandoned() {
        let err = run_encode_job(Blob::new("image/png", vec![1]), |_, settle| drop(settle))
            .await
            .unwrap_err();
        assert!(matches!(err, EncodingError::Abandoned), "got {err:?}");
    }

    #[tokio::test]
    async fn panicking_job_is_abandoned() {
        let err = run_encode_job(Blob::new("image/png", vec![1]), |_, _settle| {
            panic!("reader crashed")
        })
        .await
        .unwrap_err();
        assert!(matches!(err, EncodingError::Abandoned), "got {err:?}");
    }

    #[tokio::test]
    async fn missing_mime_type_is_rejected() {
        let err = encode_data_uri(Blob::new("  ", vec![1, 2, 3]))
            .await
            .unwrap_err();
        assert!(matches!(err, EncodingError::Read(_)), "got {err:?}");
    }

    #[test]
    fn decode_rejects_non_data_uris() {
        assert!(decode_data_uri("https://example.com/a.jpg").is_err());
        assert!(decode_data_uri("data:image/png,plain").is_err());
        assert!(decode_data_uri("data:image/png;base64,***").is_err());
    }
}
