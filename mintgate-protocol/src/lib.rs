pub mod group;
pub mod status;
pub mod typed_data;
pub mod contract;

pub mod prelude {
    pub use alloy::primitives::{
        Address,
        B256,
        Bytes,
        U256,
        Signature,
        SignatureError,
        keccak256
    };

    pub use alloy::sol_types::Eip712Domain;

    pub use super::group::{
        GovernanceGroup,
        GroupMember,
        GroupRegistry,
        RegistryError,
        is_quorum,
        missing_groups
    };

    pub use super::status::{MintStatus, InvalidTransition};

    pub use super::typed_data::{
        MintAuthorization,
        TypedData,
        action_hash,
        mint_domain
    };

    pub use super::contract::{MintAuthority, MintCall};
}
