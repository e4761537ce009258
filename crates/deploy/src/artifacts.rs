//! Compiled contract artifacts.
//!
//! Artifacts are produced by an external compilation step (Hardhat or Foundry)
//! and consumed here as ABI + creation bytecode, resolved by logical name.

use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy_core::{
    dyn_abi::{DynSolValue, JsonAbiExt},
    json_abi::{Function, JsonAbi},
    primitives::Bytes,
};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use walkdir::WalkDir;

use crate::DeployError;

/// A compiled contract: logical name, interface description and creation bytecode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSpec {
    pub name: String,
    pub abi: JsonAbi,
    pub bytecode: Bytes,
}

impl ContractSpec {
    /// Parse a compilation artifact (Hardhat or Foundry JSON layout).
    pub fn from_artifact_json(name: &str, content: &str) -> Result<Self, DeployError> {
        let malformed = |reason: String| DeployError::ArtifactMalformed {
            name: name.to_string(),
            reason,
        };

        let artifact: RawArtifact = serde_json::from_str(content)
            .map_err(|e| malformed(format!("invalid artifact JSON: {e}")))?;

        let abi: JsonAbi = serde_json::from_value(artifact.abi)
            .map_err(|e| malformed(format!("invalid ABI: {e}")))?;

        let bytecode_hex = match &artifact.bytecode {
            Value::String(hex) => hex.as_str(),
            Value::Object(obj) => obj
                .get("object")
                .and_then(Value::as_str)
                .ok_or_else(|| malformed("bytecode object has no `object` field".to_string()))?,
            _ => return Err(malformed("bytecode must be a hex string".to_string())),
        };

        let bytecode: Bytes = bytecode_hex
            .parse()
            .map_err(|e| malformed(format!("invalid bytecode hex: {e}")))?;

        if bytecode.is_empty() {
            return Err(malformed(
                "empty bytecode (interface or abstract contract?)".to_string(),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            abi,
            bytecode,
        })
    }

    /// Creation code for this contract: bytecode followed by the ABI-encoded
    /// constructor arguments.
    pub fn deploy_code(&self, args: &[DynSolValue]) -> Result<Bytes, DeployError> {
        let encoded_args = match &self.abi.constructor {
            Some(constructor) => constructor
                .abi_encode_input(args)
                .map_err(|e| self.invalid_arguments(format!("constructor: {e}")))?,
            None if args.is_empty() => Vec::new(),
            None => {
                return Err(self.invalid_arguments(format!(
                    "contract has no constructor but {} argument(s) were given",
                    args.len()
                )));
            }
        };

        let mut code = self.bytecode.to_vec();
        code.extend_from_slice(&encoded_args);
        Ok(code.into())
    }

    /// Resolve the entry point `method` taking `arity` arguments.
    pub fn function(&self, method: &str, arity: usize) -> Result<&Function, DeployError> {
        let overloads = self
            .abi
            .function(method)
            .ok_or_else(|| self.invalid_arguments(format!("no function named `{method}`")))?;

        overloads
            .iter()
            .find(|f| f.inputs.len() == arity)
            .ok_or_else(|| {
                self.invalid_arguments(format!(
                    "no overload of `{method}` takes {arity} argument(s)"
                ))
            })
    }

    fn invalid_arguments(&self, reason: String) -> DeployError {
        DeployError::InvalidArguments {
            contract: self.name.clone(),
            reason,
        }
    }
}

/// Only the fields of a compilation artifact that deployment needs.
#[derive(Debug, Deserialize)]
struct RawArtifact {
    abi: Value,
    bytecode: Value,
}

/// Resolves compiled contract definitions by logical name.
///
/// Implementations must be pure: loading the same name twice yields
/// equivalent specs and has no side effects.
pub trait ArtifactLoader {
    fn load(&self, name: &str) -> Result<ContractSpec, DeployError>;
}

/// Loads artifacts from a Hardhat or Foundry output directory.
///
/// The artifact for `Name` is the single file matching `**/Name.sol/Name.json`
/// below the root.
#[derive(Debug, Clone)]
pub struct HardhatArtifacts {
    root: PathBuf,
}

impl HardhatArtifacts {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn find(&self, name: &str) -> Result<PathBuf, DeployError> {
        let not_found = || DeployError::ArtifactNotFound {
            name: name.to_string(),
            root: self.root.clone(),
        };
        if !self.root.is_dir() {
            return Err(not_found());
        }

        let dir_name = format!("{name}.sol");
        let file_name = format!("{name}.json");

        // Symlinks below the root are not followed.
        let mut matches = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = entry.map_err(|e| DeployError::ArtifactMalformed {
                name: name.to_string(),
                reason: format!("failed to scan {}: {e}", self.root.display()),
            })?;

            let in_contract_dir = entry
                .path()
                .parent()
                .and_then(Path::file_name)
                .is_some_and(|n| n == dir_name.as_str());
            if entry.file_type().is_file()
                && in_contract_dir
                && entry.file_name() == file_name.as_str()
            {
                matches.push(entry.into_path());
            }
        }
        matches.sort();

        match matches.len() {
            0 => Err(not_found()),
            1 => Ok(matches.remove(0)),
            _ => Err(DeployError::ArtifactMalformed {
                name: name.to_string(),
                reason: format!(
                    "ambiguous artifact, found {}",
                    matches
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            }),
        }
    }
}

impl ArtifactLoader for HardhatArtifacts {
    fn load(&self, name: &str) -> Result<ContractSpec, DeployError> {
        let path = self.find(name)?;
        tracing::debug!(contract = %name, path = %path.display(), "Loading artifact");

        let content = fs::read_to_string(&path).map_err(|e| DeployError::ArtifactMalformed {
            name: name.to_string(),
            reason: format!("failed to read {}: {e}", path.display()),
        })?;

        ContractSpec::from_artifact_json(name, &content)
    }
}

/// An in-memory set of already parsed artifacts.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSet {
    specs: IndexMap<String, ContractSpec>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, spec: ContractSpec) -> Self {
        self.insert(spec);
        self
    }

    pub fn insert(&mut self, spec: ContractSpec) {
        self.specs.insert(spec.name.clone(), spec);
    }
}

impl ArtifactLoader for ArtifactSet {
    fn load(&self, name: &str) -> Result<ContractSpec, DeployError> {
        self.specs
            .get(name)
            .cloned()
            .ok_or_else(|| DeployError::ArtifactNotFound {
                name: name.to_string(),
                root: PathBuf::from("<memory>"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_core::primitives::Address;
    use tempdir::TempDir;

    const REVENUE_ARTIFACT: &str = r#"{
        "contractName": "FemCanvasRevenue",
        "abi": [
            {
                "type": "constructor",
                "stateMutability": "nonpayable",
                "inputs": [
                    {"name": "contribution", "type": "address", "internalType": "address"},
                    {"name": "canvas", "type": "address", "internalType": "address"},
                    {"name": "owner", "type": "address", "internalType": "address"}
                ]
            },
            {
                "type": "function",
                "name": "withdraw",
                "stateMutability": "nonpayable",
                "inputs": [],
                "outputs": []
            }
        ],
        "bytecode": "0x60806040"
    }"#;

    const CANVAS_ARTIFACT: &str = r#"{
        "abi": [
            {
                "type": "function",
                "name": "setRevenueContract",
                "stateMutability": "nonpayable",
                "inputs": [{"name": "revenue", "type": "address", "internalType": "address"}],
                "outputs": []
            }
        ],
        "bytecode": {"object": "0x6080", "sourceMap": ""}
    }"#;

    fn write_artifact(root: &Path, subdir: &str, name: &str, content: &str) {
        let dir = root.join(subdir).join(format!("{name}.sol"));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{name}.json")), content).unwrap();
    }

    #[test]
    fn test_load_hardhat_layout() {
        let dir = TempDir::new("artifacts-test").unwrap();
        write_artifact(dir.path(), "contract/core", "FemCanvasRevenue", REVENUE_ARTIFACT);

        let loader = HardhatArtifacts::new(dir.path());
        let spec = loader.load("FemCanvasRevenue").unwrap();

        assert_eq!(spec.name, "FemCanvasRevenue");
        assert_eq!(spec.bytecode, Bytes::from(vec![0x60, 0x80, 0x60, 0x40]));
        assert_eq!(spec.abi.constructor.as_ref().unwrap().inputs.len(), 3);

        // Loading is idempotent.
        assert_eq!(loader.load("FemCanvasRevenue").unwrap(), spec);
    }

    #[test]
    fn test_load_foundry_layout() {
        let dir = TempDir::new("artifacts-test").unwrap();
        write_artifact(dir.path(), "", "FemCanvas", CANVAS_ARTIFACT);

        let spec = HardhatArtifacts::new(dir.path()).load("FemCanvas").unwrap();
        assert_eq!(spec.bytecode, Bytes::from(vec![0x60, 0x80]));
        assert!(spec.function("setRevenueContract", 1).is_ok());
    }

    #[test]
    fn test_load_missing_artifact() {
        let dir = TempDir::new("artifacts-test").unwrap();
        write_artifact(dir.path(), "contract/core", "FemCanvas", CANVAS_ARTIFACT);

        let result = HardhatArtifacts::new(dir.path()).load("FemColors");
        assert!(matches!(result, Err(DeployError::ArtifactNotFound { .. })));
    }

    #[test]
    fn test_load_missing_root() {
        let dir = TempDir::new("artifacts-test").unwrap();

        let result = HardhatArtifacts::new(dir.path().join("missing")).load("FemCanvas");
        assert!(matches!(result, Err(DeployError::ArtifactNotFound { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_load_with_symlink_loop() {
        let dir = TempDir::new("artifacts-test").unwrap();
        write_artifact(dir.path(), "contract/core", "FemCanvas", CANVAS_ARTIFACT);
        std::os::unix::fs::symlink(dir.path(), dir.path().join("contract").join("loop")).unwrap();

        let spec = HardhatArtifacts::new(dir.path()).load("FemCanvas").unwrap();
        assert_eq!(spec.name, "FemCanvas");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_artifacts_are_ignored() {
        let dir = TempDir::new("artifacts-test").unwrap();
        let elsewhere = TempDir::new("artifacts-elsewhere").unwrap();
        write_artifact(elsewhere.path(), "", "FemColors", CANVAS_ARTIFACT);
        std::os::unix::fs::symlink(elsewhere.path(), dir.path().join("linked")).unwrap();

        let result = HardhatArtifacts::new(dir.path()).load("FemColors");
        assert!(matches!(result, Err(DeployError::ArtifactNotFound { .. })));
    }

    #[test]
    fn test_load_ambiguous_artifact() {
        let dir = TempDir::new("artifacts-test").unwrap();
        write_artifact(dir.path(), "a", "FemCanvas", CANVAS_ARTIFACT);
        write_artifact(dir.path(), "b", "FemCanvas", CANVAS_ARTIFACT);

        let result = HardhatArtifacts::new(dir.path()).load("FemCanvas");
        assert!(matches!(result, Err(DeployError::ArtifactMalformed { .. })));
    }

    #[test]
    fn test_malformed_artifacts() {
        let cases = [
            "{ invalid json }",
            r#"{"abi": [], "bytecode": "0x"}"#,
            r#"{"abi": [], "bytecode": "0xzz"}"#,
            r#"{"abi": [], "bytecode": 42}"#,
            r#"{"abi": {"not": "an array"}, "bytecode": "0x6080"}"#,
            r#"{"bytecode": "0x6080"}"#,
        ];

        for content in cases {
            let result = ContractSpec::from_artifact_json("Broken", content);
            assert!(
                matches!(result, Err(DeployError::ArtifactMalformed { .. })),
                "expected malformed artifact for {content}"
            );
        }
    }

    #[test]
    fn test_deploy_code_appends_constructor_args() {
        let spec = ContractSpec::from_artifact_json("FemCanvasRevenue", REVENUE_ARTIFACT).unwrap();
        let args = [
            DynSolValue::Address(Address::with_last_byte(0xc3)),
            DynSolValue::Address(Address::with_last_byte(0xa1)),
            DynSolValue::Address(Address::with_last_byte(0xee)),
        ];

        let code = spec.deploy_code(&args).unwrap();

        assert_eq!(code.len(), 4 + 3 * 32);
        assert_eq!(&code[..4], &[0x60, 0x80, 0x60, 0x40]);
        assert_eq!(code[4 + 31], 0xc3);
        assert_eq!(code[4 + 63], 0xa1);
        assert_eq!(code[4 + 95], 0xee);
    }

    #[test]
    fn test_deploy_code_rejects_wrong_arguments() {
        let spec = ContractSpec::from_artifact_json("FemCanvasRevenue", REVENUE_ARTIFACT).unwrap();

        let too_few = [DynSolValue::Address(Address::ZERO)];
        assert!(matches!(
            spec.deploy_code(&too_few),
            Err(DeployError::InvalidArguments { .. })
        ));

        let canvas = ContractSpec::from_artifact_json("FemCanvas", CANVAS_ARTIFACT).unwrap();
        assert_eq!(canvas.deploy_code(&[]).unwrap(), canvas.bytecode);
        assert!(matches!(
            canvas.deploy_code(&too_few),
            Err(DeployError::InvalidArguments { .. })
        ));
    }

    #[test]
    fn test_function_resolution() {
        let spec = ContractSpec::from_artifact_json("FemCanvas", CANVAS_ARTIFACT).unwrap();

        let function = spec.function("setRevenueContract", 1).unwrap();
        assert_eq!(function.signature(), "setRevenueContract(address)");

        assert!(matches!(
            spec.function("setRevenueContract", 2),
            Err(DeployError::InvalidArguments { .. })
        ));
        assert!(matches!(
            spec.function("setLinked", 1),
            Err(DeployError::InvalidArguments { .. })
        ));
    }

    #[test]
    fn test_artifact_set() {
        let spec = ContractSpec::from_artifact_json("FemCanvas", CANVAS_ARTIFACT).unwrap();
        let set = ArtifactSet::new().with(spec.clone());

        assert_eq!(set.load("FemCanvas").unwrap(), spec);
        assert!(matches!(
            set.load("FemColors"),
            Err(DeployError::ArtifactNotFound { .. })
        ));
    }
}
