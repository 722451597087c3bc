//! Scene description foundations.

mod dict;
mod meta;
mod path;
pub mod schema;
mod spec;
mod value;

pub use dict::{Dictionary, MetaVariable};
pub use meta::{
    ApiSchema, ApiSchemas, AttrMeta, Interpolation, Kind, LayerMetas, LayerOffset, ListEdit, ListEditQual,
    Payload, PlaybackMode, PrimMeta, Reference, Specifier, SubLayer, UpAxis, Variability,
};
pub use path::{path, resolve_relative_path, Path};
pub use spec::{
    Attribute, Layer, PrimSpec, Property, PropertyKind, PropertyMap, Relationship, RelationshipTargets, Variant,
    VariantSets,
};
pub use value::{ScalarKind, TimeSamples, TypedValue, Value, ValueType};
