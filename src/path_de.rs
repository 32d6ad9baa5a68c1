use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T> {
    let mut de = serde_json::Deserializer::from_str(src);
    let value = serde_path_to_error::deserialize::<_, T>(&mut de).map_err(|err| {
        let path = err.path().to_string();
        Error::MalformedSchema { path, message: err.into_inner().to_string() }
    })?;
    // reject trailing garbage after the top-level value
    de.end().map_err(|err| Error::MalformedSchema { path: ".".to_string(), message: err.to_string() })?;
    Ok(value)
}
