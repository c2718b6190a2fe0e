//! Compiled contract artifacts (Hardhat and Foundry JSON layouts).

use std::path::{Path, PathBuf};

use alloy_core::primitives::Bytes;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while loading an artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read artifact {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse artifact {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("artifact {} has no creation bytecode", path.display())]
    MissingBytecode { path: PathBuf },
    #[error("artifact {} has invalid creation bytecode: {source}", path.display())]
    InvalidBytecode {
        path: PathBuf,
        #[source]
        source: hex::FromHexError,
    },
    #[error("artifact {} has no ABI array", path.display())]
    InvalidAbi { path: PathBuf },
}

/// The deployable unit: creation bytecode plus its interface description.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub contract_name: String,
    /// The JSON ABI, kept verbatim for downstream binding generation.
    pub abi: Value,
    pub bytecode: Bytes,
}

impl Artifact {
    /// Load an artifact from a JSON file.
    ///
    /// The contract name falls back to the file stem when the artifact does not
    /// carry a `contractName` field (Foundry output).
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let content = std::fs::read_to_string(path).map_err(|source| ArtifactError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let json: Value = serde_json::from_str(&content).map_err(|source| ArtifactError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let fallback_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "Contract".to_string());

        let artifact = Self::from_json(&json, &fallback_name, path)?;
        tracing::debug!(
            path = %path.display(),
            contract_name = %artifact.contract_name,
            bytecode_len = artifact.bytecode.len(),
            "Artifact loaded"
        );
        Ok(artifact)
    }

    fn from_json(json: &Value, fallback_name: &str, path: &Path) -> Result<Self, ArtifactError> {
        let contract_name = json
            .get("contractName")
            .and_then(Value::as_str)
            .unwrap_or(fallback_name)
            .to_string();

        let abi = json
            .get("abi")
            .filter(|abi| abi.is_array())
            .cloned()
            .ok_or_else(|| ArtifactError::InvalidAbi {
                path: path.to_path_buf(),
            })?;

        // Hardhat stores a plain hex string, Foundry nests it under `object`.
        let raw_bytecode = match json.get("bytecode") {
            Some(Value::String(hex)) => Some(hex.as_str()),
            Some(Value::Object(obj)) => obj.get("object").and_then(Value::as_str),
            _ => None,
        };

        let raw_bytecode = raw_bytecode
            .map(|hex| hex.trim_start_matches("0x"))
            .filter(|hex| !hex.is_empty())
            .ok_or_else(|| ArtifactError::MissingBytecode {
                path: path.to_path_buf(),
            })?;

        let bytecode = hex::decode(raw_bytecode).map_err(|source| ArtifactError::InvalidBytecode {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            contract_name,
            abi,
            bytecode: Bytes::from(bytecode),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn write_artifact(dir: &TempDir, name: &str, json: Value) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, serde_json::to_string_pretty(&json).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_load_hardhat_artifact() {
        let dir = TempDir::new("chainship-artifact").unwrap();
        let path = write_artifact(
            &dir,
            "Project.json",
            serde_json::json!({
                "_format": "hh-sol-artifact-1",
                "contractName": "Project",
                "abi": [{"type": "function", "name": "owner", "inputs": [], "outputs": [{"type": "address"}]}],
                "bytecode": "0x6080604052",
                "deployedBytecode": "0x6080"
            }),
        );

        let artifact = Artifact::load(&path).unwrap();
        assert_eq!(artifact.contract_name, "Project");
        assert_eq!(artifact.bytecode.as_ref(), &[0x60, 0x80, 0x60, 0x40, 0x52]);
        assert_eq!(artifact.abi.as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_load_foundry_artifact_uses_file_stem() {
        let dir = TempDir::new("chainship-artifact").unwrap();
        let path = write_artifact(
            &dir,
            "Project.json",
            serde_json::json!({
                "abi": [],
                "bytecode": {"object": "0x6080", "linkReferences": {}}
            }),
        );

        let artifact = Artifact::load(&path).unwrap();
        assert_eq!(artifact.contract_name, "Project");
        assert_eq!(artifact.bytecode.as_ref(), &[0x60, 0x80]);
    }

    #[test]
    fn test_load_rejects_empty_bytecode() {
        let dir = TempDir::new("chainship-artifact").unwrap();
        let path = write_artifact(
            &dir,
            "Interface.json",
            serde_json::json!({"contractName": "IProject", "abi": [], "bytecode": "0x"}),
        );

        assert!(matches!(
            Artifact::load(&path),
            Err(ArtifactError::MissingBytecode { .. })
        ));
    }

    #[test]
    fn test_load_rejects_bad_hex() {
        let dir = TempDir::new("chainship-artifact").unwrap();
        let path = write_artifact(
            &dir,
            "Broken.json",
            serde_json::json!({"abi": [], "bytecode": "0x60zz"}),
        );

        assert!(matches!(
            Artifact::load(&path),
            Err(ArtifactError::InvalidBytecode { .. })
        ));
    }

    #[test]
    fn test_load_rejects_missing_abi() {
        let dir = TempDir::new("chainship-artifact").unwrap();
        let path = write_artifact(&dir, "NoAbi.json", serde_json::json!({"bytecode": "0x6080"}));

        assert!(matches!(
            Artifact::load(&path),
            Err(ArtifactError::InvalidAbi { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new("chainship-artifact").unwrap();
        assert!(matches!(
            Artifact::load(&dir.path().join("missing.json")),
            Err(ArtifactError::Read { .. })
        ));
    }
}
