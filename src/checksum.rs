use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;

use crate::error::ChecksumError;

/// Hex SHA-1 of a file's bytes.
pub fn sha1_hex(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha1::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Reads `checksum_sha1` from a previously written descriptor. The file must
/// hold exactly one YAML document.
pub fn stored_checksum(output_path: &Path) -> Result<String, ChecksumError> {
    let content = std::fs::read_to_string(output_path).map_err(|source| ChecksumError::Io {
        path: output_path.to_path_buf(),
        source,
    })?;

    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(&content) {
        let value = serde_yaml::Value::deserialize(document).map_err(|source| ChecksumError::Yaml {
            path: output_path.to_path_buf(),
            source,
        })?;
        documents.push(value);
    }

    if documents.len() > 1 {
        return Err(ChecksumError::MultipleDocuments {
            path: output_path.to_path_buf(),
            count: documents.len(),
        });
    }

    documents
        .first()
        .and_then(|doc| doc.get("checksum_sha1"))
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .ok_or_else(|| ChecksumError::MissingChecksum {
            path: output_path.to_path_buf(),
        })
}

/// True when the descriptor at `output_path` was produced from the same
/// sidecar bytes as `xml_path`.
pub fn matches_previous(output_path: &Path, xml_path: &Path) -> Result<bool, ChecksumError> {
    let stored = stored_checksum(output_path)?;
    let current = sha1_hex(xml_path).map_err(|source| ChecksumError::Io {
        path: xml_path.to_path_buf(),
        source,
    })?;
    debug!("Checksum stored={} current={}", stored, current);
    Ok(stored == current)
}
