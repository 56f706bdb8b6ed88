//! On-disk encodings of a [`GameSave`].

use narrator_core::error::EngineError;
use narrator_core::snapshot::GameSave;
use serde::{Deserialize, Serialize};

/// How save files are encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveFormat {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// bincode.
    Binary,
}

impl SaveFormat {
    /// File extension used for slots in this format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Binary => "nson",
        }
    }

    /// Encodes `save`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Serialization`] if encoding fails.
    pub fn encode(self, save: &GameSave) -> Result<Vec<u8>, EngineError> {
        match self {
            Self::Json => Ok(serde_json::to_vec_pretty(save)?),
            Self::Binary => {
                bincode::serialize(save).map_err(|e| EngineError::Serialization(e.to_string()))
            }
        }
    }

    /// Decodes bytes written by [`SaveFormat::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Serialization`] for corrupt or foreign data.
    pub fn decode(self, bytes: &[u8]) -> Result<GameSave, EngineError> {
        match self {
            Self::Json => Ok(serde_json::from_slice(bytes)?),
            Self::Binary => {
                bincode::deserialize(bytes).map_err(|e| EngineError::Serialization(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_rejects_truncated_data() {
        let err = SaveFormat::Binary.decode(&[1, 2, 3]).unwrap_err();

        assert!(matches!(err, EngineError::Serialization(_)));
    }

    #[test]
    fn test_json_rejects_garbage() {
        let err = SaveFormat::Json.decode(b"not json").unwrap_err();

        assert!(matches!(err, EngineError::Serialization(_)));
    }

    #[test]
    fn test_format_names_in_config() {
        let format: SaveFormat = serde_json::from_str("\"binary\"").unwrap();

        assert_eq!(format, SaveFormat::Binary);
        assert_eq!(format.extension(), "nson");
    }
}
