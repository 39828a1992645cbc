//! Deployment order of each side of a gateway pair.
//!
//! A contract's address is fixed by its deployer and the nonce it is created at, and
//! the origin gateway is activated with the co-gateway's address before the
//! co-gateway exists. Address prediction and the deploy loops therefore both read
//! the plans below; a step's nonce is its position in the plan.

use std::collections::HashMap;

use anyhow::{Result, anyhow};
use ethers::types::Address;
use strum_macros::Display;

use crate::{address::contract_address, contracts::ContractKind};

/// One transaction of a plan: a contract creation or a wiring call.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
#[strum(serialize_all = "kebab-case")]
pub enum Role {
    AnchorOrganization,
    Anchor,
    CoGatewayAndOstPrimeOrganization,
    OstPrime,
    MerklePatriciaProof,
    MessageBus,
    GatewayLib,
    GatewayOrganization,
    Eip20Gateway,
    Eip20CoGateway,
    /// `OSTPrime.setCoGateway`
    SetCoGateway,
    /// `EIP20Gateway.activateGateway`
    ActivateGateway,
}

impl Role {
    /// The contract this step creates or calls.
    pub fn contract(&self) -> ContractKind {
        match self {
            Role::AnchorOrganization
            | Role::CoGatewayAndOstPrimeOrganization
            | Role::GatewayOrganization => ContractKind::Organization,
            Role::Anchor => ContractKind::Anchor,
            Role::OstPrime | Role::SetCoGateway => ContractKind::OstPrime,
            Role::MerklePatriciaProof => ContractKind::MerklePatriciaProof,
            Role::MessageBus => ContractKind::MessageBus,
            Role::GatewayLib => ContractKind::GatewayLib,
            Role::Eip20Gateway | Role::ActivateGateway => ContractKind::Eip20Gateway,
            Role::Eip20CoGateway => ContractKind::Eip20CoGateway,
        }
    }

    pub fn creates_contract(&self) -> bool {
        !matches!(self, Role::SetCoGateway | Role::ActivateGateway)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DeploymentPlan {
    steps: &'static [Role],
}

pub const ORIGIN_PLAN: DeploymentPlan = DeploymentPlan::new(&[
    Role::AnchorOrganization,
    Role::Anchor,
    Role::MerklePatriciaProof,
    Role::MessageBus,
    Role::GatewayLib,
    Role::GatewayOrganization,
    Role::Eip20Gateway,
    Role::ActivateGateway,
]);

/// Run by a freshly generated deployer, so positions are absolute nonces.
pub const AUXILIARY_PLAN: DeploymentPlan = DeploymentPlan::new(&[
    Role::AnchorOrganization,
    Role::Anchor,
    Role::CoGatewayAndOstPrimeOrganization,
    Role::OstPrime,
    Role::MerklePatriciaProof,
    Role::MessageBus,
    Role::GatewayLib,
    Role::Eip20CoGateway,
    Role::SetCoGateway,
]);

impl DeploymentPlan {
    pub const fn new(steps: &'static [Role]) -> Self {
        Self { steps }
    }

    /// Steps paired with their offset from the deployer's first nonce.
    pub fn steps(&self) -> impl Iterator<Item = (u64, Role)> + '_ {
        (0u64..).zip(self.steps.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn position(&self, role: Role) -> Result<u64> {
        self.steps()
            .find(|(_, r)| *r == role)
            .map(|(nonce, _)| nonce)
            .ok_or_else(|| anyhow!("{role} is not part of this deployment plan"))
    }

    /// Where `role` will be deployed when the plan is run by `deployer` starting at
    /// `first_nonce`.
    pub fn expected_address(
        &self,
        deployer: Address,
        first_nonce: u64,
        role: Role,
    ) -> Result<Address> {
        if !role.creates_contract() {
            return Err(anyhow!("{role} does not create a contract"));
        }
        Ok(contract_address(deployer, first_nonce + self.position(role)?))
    }

    /// Every contract the plan creates with its predicted address.
    pub fn expected_addresses(&self, deployer: Address, first_nonce: u64) -> Vec<(Role, Address)> {
        self.steps()
            .filter(|(_, role)| role.creates_contract())
            .map(|(offset, role)| (role, contract_address(deployer, first_nonce + offset)))
            .collect()
    }
}

/// Addresses created so far while a plan runs.
#[derive(Clone, Debug, Default)]
pub struct Deployed(HashMap<Role, Address>);

impl Deployed {
    pub fn record(&mut self, role: Role, address: Address) {
        self.0.insert(role, address);
    }

    pub fn get(&self, role: Role) -> Result<Address> {
        self.0
            .get(&role)
            .copied()
            .ok_or_else(|| anyhow!("{role} has not been deployed yet"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::parse_address;

    #[test]
    fn auxiliary_nonces() {
        assert_eq!(AUXILIARY_PLAN.position(Role::AnchorOrganization).unwrap(), 0);
        assert_eq!(AUXILIARY_PLAN.position(Role::OstPrime).unwrap(), 3);
        assert_eq!(AUXILIARY_PLAN.position(Role::Eip20CoGateway).unwrap(), 7);
        assert_eq!(AUXILIARY_PLAN.position(Role::SetCoGateway).unwrap(), 8);
        assert!(AUXILIARY_PLAN.position(Role::Eip20Gateway).is_err());
        assert_eq!(AUXILIARY_PLAN.len(), 9);
    }

    #[test]
    fn co_gateway_prediction() {
        let deployer = parse_address("0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0").unwrap();
        let expected = AUXILIARY_PLAN
            .expected_address(deployer, 0, Role::Eip20CoGateway)
            .unwrap();
        assert_eq!(expected, contract_address(deployer, 7));
        assert_eq!(
            expected,
            AUXILIARY_PLAN
                .expected_address(deployer, 0, Role::Eip20CoGateway)
                .unwrap()
        );
        assert!(
            AUXILIARY_PLAN
                .expected_address(deployer, 0, Role::SetCoGateway)
                .is_err()
        );

        let all = AUXILIARY_PLAN.expected_addresses(deployer, 0);
        assert_eq!(all.len(), 8);
        assert_eq!(
            all[0],
            (
                Role::AnchorOrganization,
                parse_address("0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d").unwrap()
            )
        );
        assert!(all.contains(&(Role::Eip20CoGateway, expected)));
    }

    #[test]
    fn origin_order() {
        let roles: Vec<_> = ORIGIN_PLAN.steps().map(|(_, r)| r).collect();
        let gateway = roles.iter().position(|r| *r == Role::Eip20Gateway).unwrap();
        for lib in [Role::MerklePatriciaProof, Role::MessageBus, Role::GatewayLib] {
            assert!(roles.iter().position(|r| *r == lib).unwrap() < gateway);
        }
        assert_eq!(roles.last(), Some(&Role::ActivateGateway));
        assert_eq!(Role::OstPrime.to_string(), "ost-prime");
    }

    #[test]
    fn deployed_lookup() {
        let mut deployed = Deployed::default();
        assert!(deployed.get(Role::Anchor).is_err());
        deployed.record(Role::Anchor, Address::repeat_byte(1));
        assert_eq!(deployed.get(Role::Anchor).unwrap(), Address::repeat_byte(1));
    }
}
