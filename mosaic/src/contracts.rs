use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result, anyhow, bail};
use ethabi::{Event, Function, Token};
use ethers::{types::Address, utils::keccak256};
use serde::Deserialize;
use strum_macros::{Display, EnumIter};

/// The contracts a mosaic deployment is made of, named as in the compiled artifacts.
#[derive(Clone, Copy, Debug, Display, EnumIter, PartialEq, Eq, Hash)]
pub enum ContractKind {
    Organization,
    Anchor,
    MerklePatriciaProof,
    MessageBus,
    GatewayLib,
    #[strum(serialize = "EIP20Gateway")]
    Eip20Gateway,
    #[strum(serialize = "EIP20CoGateway")]
    Eip20CoGateway,
    #[strum(serialize = "OSTPrime")]
    OstPrime,
    #[strum(serialize = "OSTComposer")]
    OstComposer,
    RedeemPool,
    #[strum(serialize = "EIP20Interface")]
    Eip20Token,
}

impl ContractKind {
    pub fn is_library(&self) -> bool {
        matches!(
            self,
            ContractKind::MerklePatriciaProof | ContractKind::MessageBus | ContractKind::GatewayLib
        )
    }
}

#[derive(Deserialize)]
struct CombinedJson {
    contracts: HashMap<String, RawContract>,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawContract {
    abi: RawAbi,
    #[serde(default)]
    bin: String,
    #[serde(default)]
    bin_runtime: String,
}

// Older solc releases embed the ABI as a JSON string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAbi {
    Text(String),
    Parsed(ethabi::Contract),
}

/// One compiled contract. `bytecode` may still carry library link placeholders.
#[derive(Clone, Debug)]
pub struct Artifact {
    pub name: String,
    pub abi: ethabi::Contract,
    pub bytecode: String,
    pub runtime: String,
}

impl Artifact {
    pub fn function(&self, name: &str) -> Result<&Function> {
        self.abi
            .function(name)
            .with_context(|| format!("{} has no function {name}", self.name))
    }

    pub fn event(&self, name: &str) -> Result<&Event> {
        self.abi
            .event(name)
            .with_context(|| format!("{} has no event {name}", self.name))
    }

    /// Creation code with `libraries` linked in and the constructor arguments appended.
    pub fn deploy_data(&self, args: &[Token], libraries: &[(&str, Address)]) -> Result<Vec<u8>> {
        let linked = link_bytecode(&self.bytecode, libraries)?;
        let code = hex::decode(linked.trim_start_matches("0x"))
            .with_context(|| format!("bytecode of {} is not hex", self.name))?;
        match &self.abi.constructor {
            Some(constructor) => Ok(constructor.encode_input(code, args)?),
            None if args.is_empty() => Ok(code),
            None => bail!("{} takes no constructor arguments", self.name),
        }
    }

    /// The runtime code up to the first link placeholder. Deployed code of a linked
    /// contract always starts with these bytes.
    pub fn runtime_prefix(&self) -> Result<Vec<u8>> {
        let runtime = self.runtime.trim_start_matches("0x");
        let end = runtime.find("__").unwrap_or(runtime.len());
        let prefix = &runtime[..end - end % 2];
        Ok(hex::decode(prefix)?)
    }
}

/// Compiled contracts loaded from `solc --combined-json abi,bin,bin-runtime` output.
#[derive(Clone, Debug, Default)]
pub struct Artifacts {
    contracts: HashMap<String, Artifact>,
}

impl Artifacts {
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read contract artifacts {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Cannot parse {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let combined: CombinedJson = serde_json::from_str(json)?;
        let mut contracts = HashMap::new();
        for (name, raw) in combined.contracts {
            let abi = match raw.abi {
                RawAbi::Parsed(abi) => abi,
                RawAbi::Text(text) => serde_json::from_str(&text)
                    .with_context(|| format!("ABI of {name} is not valid"))?,
            };
            contracts.insert(
                name.clone(),
                Artifact {
                    name,
                    abi,
                    bytecode: raw.bin,
                    runtime: raw.bin_runtime,
                },
            );
        }
        Ok(Self { contracts })
    }

    /// Artifacts are keyed `<source path>:<name>`; we match on the name alone.
    pub fn get(&self, kind: ContractKind) -> Result<&Artifact> {
        let wanted = kind.to_string();
        self.contracts
            .iter()
            .find(|(key, _)| key.rsplit(':').next() == Some(wanted.as_str()))
            .map(|(_, artifact)| artifact)
            .ok_or_else(|| anyhow!("no compiled artifact for {wanted}"))
    }

    /// Fully qualified name of a library, which is what link placeholders are built from.
    pub fn library_name(&self, kind: ContractKind) -> Result<&str> {
        Ok(self.get(kind)?.name.as_str())
    }
}

/// Replace library placeholders in hex `bytecode` with addresses. Both the hashed
/// `__$<keccak(name)[..17]>$__` form and the legacy `__<name>____` form are handled.
/// Placeholders left over afterwards are an error.
pub fn link_bytecode(bytecode: &str, libraries: &[(&str, Address)]) -> Result<String> {
    let mut linked = bytecode.to_owned();
    for (name, address) in libraries {
        let replacement = hex::encode(address.as_bytes());
        for placeholder in placeholders(name) {
            linked = linked.replace(&placeholder, &replacement);
        }
    }
    if let Some(start) = linked.find("__") {
        let end = (start + 40).min(linked.len());
        bail!("bytecode has an unlinked library: {}", &linked[start..end]);
    }
    Ok(linked)
}

fn placeholders(name: &str) -> Vec<String> {
    let hashed = format!("__${}$__", &hex::encode(keccak256(name.as_bytes()))[..34]);
    let mut out = vec![hashed];
    let short = name.rsplit(':').next().unwrap_or(name);
    for legacy in [name, short] {
        let truncated: String = legacy.chars().take(36).collect();
        out.push(format!("__{truncated:_<38}"));
    }
    out
}
