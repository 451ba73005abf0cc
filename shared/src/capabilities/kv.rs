use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

pub const MAX_KEY_LENGTH: usize = 256;
pub const MAX_VALUE_SIZE: usize = 2 * 1024 * 1024;

/// A storage key the shell can use verbatim as an AsyncStorage / UserDefaults key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KvKey(String);

impl KvKey {
    pub fn new(key: impl Into<String>) -> Result<Self, KvError> {
        let key = key.into();
        let reject = |key: &str, reason: &str| {
            Err(KvError::InvalidKey {
                key: key.chars().take(50).collect(),
                reason: reason.to_string(),
            })
        };

        if key.trim().is_empty() {
            return reject(&key, "key cannot be empty");
        }
        if key.len() > MAX_KEY_LENGTH {
            return reject(&key, "key is too long");
        }
        if key.contains('\0') {
            return reject(&key.replace('\0', "\\0"), "key cannot contain null bytes");
        }
        if key.contains("..") || key.starts_with('/') || key.starts_with('\\') {
            return reject(&key, "key looks like a path");
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for KvKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum KvError {
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("value too large: {size} bytes exceeds maximum of {max} bytes")]
    ValueTooLarge { size: usize, max: usize },

    #[error("storage error: {message} (code: {code:?}, retryable: {retryable})")]
    Storage {
        code: StorageErrorCode,
        message: String,
        retryable: bool,
    },

    #[error("serialization error: {message}")]
    Serialization { message: String, key: Option<String> },
}

impl KvError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, KvError::Storage { retryable: true, .. })
    }

    pub fn storage(code: StorageErrorCode, message: impl Into<String>) -> Self {
        Self::Storage {
            code,
            message: message.into(),
            retryable: code.is_retryable(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageErrorCode {
    Unknown,
    Corrupted,
    DiskFull,
    PermissionDenied,
    Busy,
    IoError,
}

impl StorageErrorCode {
    pub fn is_retryable(self) -> bool {
        matches!(self, StorageErrorCode::Busy | StorageErrorCode::IoError)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum KvOutput {
    Value(Option<Vec<u8>>),
    Written,
    Deleted,
}

impl KvOutput {
    /// Decodes a `Value` output as JSON. Missing keys give `Ok(None)`.
    pub fn decode_json<T: DeserializeOwned>(self, key: &KvKey) -> Result<Option<T>, KvError> {
        match self {
            KvOutput::Value(Some(bytes)) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| KvError::Serialization {
                    message: e.to_string(),
                    key: Some(key.to_string()),
                }),
            KvOutput::Value(None) => Ok(None),
            KvOutput::Written | KvOutput::Deleted => Err(KvError::storage(
                StorageErrorCode::Unknown,
                "unexpected output for a read",
            )),
        }
    }

    /// Decodes a `Value` output as a UTF-8 string. Missing keys give `Ok(None)`.
    pub fn decode_string(self, key: &KvKey) -> Result<Option<String>, KvError> {
        match self {
            KvOutput::Value(Some(bytes)) => {
                String::from_utf8(bytes)
                    .map(Some)
                    .map_err(|e| KvError::Serialization {
                        message: e.to_string(),
                        key: Some(key.to_string()),
                    })
            }
            KvOutput::Value(None) => Ok(None),
            KvOutput::Written | KvOutput::Deleted => Err(KvError::storage(
                StorageErrorCode::Unknown,
                "unexpected output for a read",
            )),
        }
    }
}

pub type KvResult = Result<KvOutput, KvError>;

pub type KeyValue<Ev> = crux_kv::KeyValue<Ev>;

impl KvKey {
    pub fn read<Ev, F>(&self, kv: &KeyValue<Ev>, callback: F)
    where
        Ev: 'static,
        F: FnOnce(KvResult) -> Ev + Send + Sync + 'static,
    {
        kv.get(self.0.clone(), move |result| {
            callback(result.map(KvOutput::Value).map_err(KvError::from_shell))
        });
    }

    /// Fails without touching storage when `value` is over [`MAX_VALUE_SIZE`].
    pub fn write<Ev, F>(&self, kv: &KeyValue<Ev>, value: Vec<u8>, callback: F) -> Result<(), KvError>
    where
        Ev: 'static,
        F: FnOnce(KvResult) -> Ev + Send + Sync + 'static,
    {
        check_value_size(&value)?;
        kv.set(self.0.clone(), value, move |result| {
            callback(result.map(|_previous| KvOutput::Written).map_err(KvError::from_shell))
        });
        Ok(())
    }

    pub fn remove<Ev, F>(&self, kv: &KeyValue<Ev>, callback: F)
    where
        Ev: 'static,
        F: FnOnce(KvResult) -> Ev + Send + Sync + 'static,
    {
        kv.delete(self.0.clone(), move |result| {
            callback(result.map(|_previous| KvOutput::Deleted).map_err(KvError::from_shell))
        });
    }
}

fn check_value_size(value: &[u8]) -> Result<(), KvError> {
    if value.len() > MAX_VALUE_SIZE {
        return Err(KvError::ValueTooLarge {
            size: value.len(),
            max: MAX_VALUE_SIZE,
        });
    }
    Ok(())
}

impl KvError {
    fn from_shell(error: crux_kv::error::KeyValueError) -> Self {
        Self::storage(StorageErrorCode::IoError, format!("{error:?}"))
    }
}
