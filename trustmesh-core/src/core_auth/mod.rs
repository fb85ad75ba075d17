//! Authorization proofs
//!
//! Every trust domain issues and checks [`AuthProof`]s through the
//! [`AuthProvider`] contract. Issuing fails loudly for local misuse;
//! verifying only ever answers `true` or `false`.

pub mod errors;
pub mod group;
pub mod plaintext;
pub mod proof;
pub mod provider;
pub mod write_key;

pub use errors::{AuthError, AuthResult};
pub use group::GroupAuthProvider;
pub use plaintext::PlaintextAuthProvider;
pub use proof::{AuthProof, ProofMetadata, GROUP_AUTH_V1, PLAINTEXT_V1, WRITE_KEY_V1};
pub use provider::AuthProvider;
pub use write_key::WriteKeyAuthProvider;
