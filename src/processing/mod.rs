//! Row-level recoding of beneficiaries and claims

pub mod beneficiary;
pub mod claims;

pub use beneficiary::{Beneficiary, BeneficiaryProcessor, Gender, Race};
pub use claims::{Claim, ClaimsProcessor};
