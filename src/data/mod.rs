//! Raw input tables: column names and typed rows

pub mod records;
pub mod schema;

pub use records::{
    BeneficiaryRecord, ClaimRecord, ClaimSource, CodeSlots, DiagnosisCodes, ProcedureCodes,
    ProviderLabel,
};
