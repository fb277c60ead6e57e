//! Variation composition engine.
//!
//! This crate provides:
//! - Combination generation (single-axis variation or full cross-product)
//! - Output naming with configurable label patterns
//! - Resolution of a composition + combination into a concrete render spec

pub mod builder;
pub mod combination;
pub mod error;
pub mod naming;

pub use builder::RenderRequestBuilder;
pub use combination::{
    combination_count, generate_combinations, generate_combinations_limited, GenerationPolicy,
};
pub use error::{ComposeError, ComposeResult};
pub use naming::{label_for, naming_parts, output_name, sanitize_name, LabelPattern, NamingConfig};
