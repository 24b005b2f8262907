//! Obfuscation Module
//!
//! Reversible transform applied to stored keys and envelopes. The default
//! pair is standard padded base64 over UTF-8.

use std::fmt;
use std::string::FromUtf8Error;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;
use tracing::debug;

/// Caller-supplied encode half of the transform.
pub type EncodeFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Caller-supplied decode half of the transform.
pub type DecodeFn = Arc<dyn Fn(&str) -> Result<String, TransformError> + Send + Sync>;

/// Sample the gate checks the transform pair against before trusting it.
const PROBE_TEXT: &str = "__webcache_probe__ {\"v\":\"ünïcødé ✓\"}";

// == Transform Error ==
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("decoded bytes are not UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),

    #[error("{0}")]
    Custom(String),
}

// == Default Transform ==
pub fn base64_encode(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

pub fn base64_decode(text: &str) -> Result<String, TransformError> {
    let bytes = STANDARD.decode(text.trim())?;
    Ok(String::from_utf8(bytes)?)
}

pub fn default_encoder() -> EncodeFn {
    Arc::new(base64_encode)
}

pub fn default_decoder() -> DecodeFn {
    Arc::new(base64_decode)
}

// == Obfuscation Gate ==
/// Applies the transform pair when enabled, passes text through otherwise.
///
/// Enabled only as a whole: both halves present and round-tripping a probe.
#[derive(Clone, Default)]
pub struct ObfuscationGate {
    pair: Option<(EncodeFn, DecodeFn)>,
}

impl ObfuscationGate {
    pub fn new(crypt: bool, encode: Option<EncodeFn>, decode: Option<DecodeFn>) -> Self {
        if !crypt {
            return Self::disabled();
        }
        let (Some(encode), Some(decode)) = (encode, decode) else {
            debug!("Obfuscation requested without both encode and decode, disabling");
            return Self::disabled();
        };

        let round_trip = decode(&encode(PROBE_TEXT));
        if !matches!(round_trip.as_deref(), Ok(PROBE_TEXT)) {
            debug!("Obfuscation transform does not round-trip, disabling");
            return Self::disabled();
        }

        Self {
            pair: Some((encode, decode)),
        }
    }

    pub fn disabled() -> Self {
        Self { pair: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.pair.is_some()
    }

    pub fn encode(&self, text: &str) -> String {
        match &self.pair {
            Some((encode, _)) => encode(text),
            None => text.to_string(),
        }
    }

    pub fn decode(&self, text: &str) -> Result<String, TransformError> {
        match &self.pair {
            Some((_, decode)) => decode(text),
            None => Ok(text.to_string()),
        }
    }
}

impl fmt::Debug for ObfuscationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObfuscationGate")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
