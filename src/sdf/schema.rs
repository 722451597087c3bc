//! Static tables of well-known metadata and prim type names.
//!
//! The tables are immutable and shared between parser instances.

use super::ValueType;

/// Whether a metadatum takes a single value, a list, or either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Scalar,
    Array,
    /// A list is detected by a leading `[`.
    ScalarOrArray,
}

/// Declared type of a registered metadatum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaDef {
    pub name: &'static str,
    pub ty: ValueType,
    pub arity: Arity,
}

const fn def(name: &'static str, ty: ValueType, arity: Arity) -> MetaDef {
    MetaDef { name, ty, arity }
}

use Arity::*;
use ValueType as T;

/// Layer metadata.
///
/// See <https://openusd.org/release/api/class_usd_stage.html>
pub static STAGE_METAS: &[MetaDef] = &[
    def("doc", T::String, Scalar),
    def("documentation", T::String, Scalar),
    def("comment", T::String, Scalar),
    def("metersPerUnit", T::Double, Scalar),
    def("timeCodesPerSecond", T::Double, Scalar),
    def("framesPerSecond", T::Double, Scalar),
    def("startTimeCode", T::Double, Scalar),
    def("endTimeCode", T::Double, Scalar),
    def("defaultPrim", T::Token, Scalar),
    def("upAxis", T::Token, Scalar),
    def("customLayerData", T::Dictionary, Scalar),
    def("subLayers", T::Asset, ScalarOrArray),
    def("autoPlay", T::Bool, Scalar),
    def("playbackMode", T::Token, Scalar),
    def("apiSchemas", T::Token, Array),
];

/// Prim metadata with typed fields.
pub static PRIM_METAS: &[MetaDef] = &[
    def("kind", T::Token, Scalar),
    def("doc", T::String, Scalar),
    def("comment", T::String, Scalar),
    def("references", T::Reference, ScalarOrArray),
    def("payload", T::Payload, ScalarOrArray),
    def("inherits", T::Path, ScalarOrArray),
    def("specializes", T::Path, ScalarOrArray),
    def("variantSets", T::String, ScalarOrArray),
    def("variants", T::Dictionary, Scalar),
    def("assetInfo", T::Dictionary, Scalar),
    def("customData", T::Dictionary, Scalar),
    def("sdrMetadata", T::Dictionary, Scalar),
    def("clips", T::Dictionary, Scalar),
    def("active", T::Bool, Scalar),
    def("hidden", T::Bool, Scalar),
    def("instanceable", T::Bool, Scalar),
    def("apiSchemas", T::Token, Array),
    def("sceneName", T::String, Scalar),
    def("displayName", T::String, Scalar),
];

/// Property metadata. Anything else inside `( ... )` after a property is an error.
pub static PROP_METAS: &[MetaDef] = &[
    def("doc", T::String, Scalar),
    def("active", T::Bool, Scalar),
    def("hidden", T::Bool, Scalar),
    def("customData", T::Dictionary, Scalar),
    def("sdrMetadata", T::Dictionary, Scalar),
    def("elementSize", T::Uint, Scalar),
    def("weight", T::Double, Scalar),
    def("interpolation", T::Token, Scalar),
    def("colorSpace", T::Token, Scalar),
    def("bindMaterialAs", T::Token, Scalar),
    def("connectability", T::Token, Scalar),
    def("renderType", T::Token, Scalar),
    def("outputName", T::Token, Scalar),
    def("displayName", T::String, Scalar),
];

/// Prim type names known to the built-in reconstruction registry.
pub static PRIM_TYPES: &[&str] = &[
    "Model",
    "Scope",
    "Xform",
    "GPrim",
    "Mesh",
    "GeomSubset",
    "Points",
    "BasisCurves",
    "Sphere",
    "Cube",
    "Cone",
    "Cylinder",
    "Capsule",
    "Camera",
    "Material",
    "NodeGraph",
    "Shader",
    "SphereLight",
    "DomeLight",
    "DiskLight",
    "DistantLight",
    "CylinderLight",
    "RectLight",
    "SkelRoot",
    "Skeleton",
    "SkelAnimation",
    "BlendShape",
];

/// `bindMaterialAs` values recognized by material binding.
pub static BIND_MATERIAL_AS: &[&str] = &["weakerThanDescendants", "strongerThanDescendants"];

#[inline]
fn find(table: &'static [MetaDef], name: &str) -> Option<&'static MetaDef> {
    table.iter().find(|d| d.name == name)
}

pub fn stage_meta(name: &str) -> Option<&'static MetaDef> {
    find(STAGE_METAS, name)
}

pub fn prim_meta(name: &str) -> Option<&'static MetaDef> {
    find(PRIM_METAS, name)
}

pub fn prop_meta(name: &str) -> Option<&'static MetaDef> {
    find(PROP_METAS, name)
}

#[inline]
pub fn is_known_prim_type(name: &str) -> bool {
    PRIM_TYPES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup() {
        assert_eq!(stage_meta("upAxis").map(|d| d.ty), Some(T::Token));
        assert_eq!(stage_meta("subLayers").map(|d| d.arity), Some(ScalarOrArray));
        assert!(stage_meta("kind").is_none());

        assert_eq!(prim_meta("references").map(|d| d.ty), Some(T::Reference));
        assert!(prim_meta("elementSize").is_none());

        assert_eq!(prop_meta("elementSize").map(|d| d.ty), Some(T::Uint));
        assert!(prop_meta("kind").is_none());

        assert!(is_known_prim_type("Xform"));
        assert!(!is_known_prim_type("xform"));
    }

    #[test]
    fn no_duplicates() {
        for table in [STAGE_METAS, PRIM_METAS, PROP_METAS] {
            for (i, a) in table.iter().enumerate() {
                assert!(table[i + 1..].iter().all(|b| b.name != a.name), "{}", a.name);
            }
        }
    }
}
