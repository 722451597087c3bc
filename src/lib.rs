//! `openusd-usda` is a native Rust parser for the USD text format.
//!
//! - [`usda`] reads documents into schema agnostic [`sdf::Layer`] trees.
//! - [`stage`] reconstructs typed prims through an injected registry.

pub mod sdf;
pub mod stage;
pub mod usda;

pub use half::f16;
