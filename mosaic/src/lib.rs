pub mod address;
pub mod auxiliary;
pub mod chain;
pub mod commands;
pub mod config;
pub mod contracts;
pub mod deployer;
pub mod error;
pub mod graph;
pub mod initialization;
pub mod node;
pub mod origin;
pub mod plan;
pub mod plumbing;
pub mod pools;
pub mod proof;
pub mod retry;
pub mod serde_util;
pub mod subgraph;
pub mod utils;
pub mod verifier;
