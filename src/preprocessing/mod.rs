//! Data preprocessing module
//!
//! Feature scaling applied to the provider table before the classifier:
//! monetary columns are standardized, count columns min-max scaled and
//! the remaining columns passed through.

mod scaler;

pub use scaler::{ColumnScaler, ScalerParams, ScalerType, MINMAX_SCALED, STANDARD_SCALED};
