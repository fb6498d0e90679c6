//! Feature engineering
//!
//! Claims are enriched with per-claim flags, joined to their beneficiaries,
//! reduced to one vector per provider and finally joined to the provider labels.

pub mod aggregate;
pub mod claim_features;
pub mod labels;
pub mod merge;
pub mod schema;
pub mod top_codes;

pub use aggregate::{Aggregator, ProviderAggregate};
pub use claim_features::{ClaimFeatureBuilder, ClaimFeatures, FeaturedClaim};
pub use labels::{encode_label, LabelMerger, LabeledFeatureTable};
pub use merge::{age_at, MergedClaim, Merger};
pub use schema::{feature_index, ProviderFeatures, FEATURE_COUNT, FEATURE_NAMES};
pub use top_codes::{TopCodeExtractor, TopCodeLookup, TopCodeSet, TOP_N};
