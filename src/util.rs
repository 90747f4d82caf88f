//! Save and load bincode-encoded values, e.g. the config file.

use std::{fs, path::Path};

use bincode::{config, Decode, Encode};

use crate::error::SimError;

pub fn save<T: Encode>(path: &Path, data: &T) -> Result<(), SimError> {
    let encoded = bincode::encode_to_vec(data, config::standard())?;
    fs::write(path, encoded)?;
    Ok(())
}

pub fn load<T: Decode<()>>(path: &Path) -> Result<T, SimError> {
    let bytes = fs::read(path)?;
    let (decoded, _len) = bincode::decode_from_slice(&bytes, config::standard())?;
    Ok(decoded)
}
