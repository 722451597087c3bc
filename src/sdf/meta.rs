//! Typed metadata for layers, prims and properties.

use std::{collections::BTreeMap, fmt};

use strum::{Display, EnumString};

use super::{Dictionary, Path};

/// Prim specifier.
///
/// - `def` - a concrete, defined prim.
/// - `over` - a speculative override.
/// - `class` - prims from which other prims inherit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Specifier {
    #[default]
    Def,
    Over,
    Class,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Variability {
    #[default]
    Varying,
    Uniform,
}

/// Controls how a list-valued metadatum combines with weaker opinions.
///
/// An explicit empty list or `None` must be [`ListEditQual::ResetToExplicit`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ListEditQual {
    #[default]
    #[strum(serialize = "explicit")]
    ResetToExplicit,
    Prepend,
    Append,
    Add,
    Delete,
    Order,
}

/// A list-valued metadatum together with its list-edit qualifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ListEdit<T> {
    pub qual: ListEditQual,
    pub items: Vec<T>,
}

impl<T> ListEdit<T> {
    pub fn new(qual: ListEditQual, items: Vec<T>) -> Self {
        Self { qual, items }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Model hierarchy kind.
///
/// Unknown non-standard kinds are kept verbatim as [`Kind::UserDef`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum Kind {
    Model,
    Group,
    Assembly,
    Component,
    Subcomponent,
    SceneLibrary,
    #[strum(default)]
    UserDef(String),
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Model => "model",
            Kind::Group => "group",
            Kind::Assembly => "assembly",
            Kind::Component => "component",
            Kind::Subcomponent => "subcomponent",
            Kind::SceneLibrary => "sceneLibrary",
            Kind::UserDef(s) => s,
        };

        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "camelCase")]
pub enum Interpolation {
    Constant,
    Uniform,
    Varying,
    Vertex,
    FaceVarying,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
pub enum UpAxis {
    X,
    #[default]
    Y,
    Z,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PlaybackMode {
    None,
    Loop,
}

/// Allow-listed applied API schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
pub enum ApiSchema {
    #[strum(serialize = "MaterialBindingAPI")]
    MaterialBinding,
    #[strum(serialize = "SkelBindingAPI")]
    SkelBinding,
    #[strum(serialize = "CollectionAPI")]
    Collection,
    #[strum(serialize = "ShapingAPI")]
    Shaping,
    #[strum(serialize = "Preliminary_PhysicsMaterialAPI")]
    PhysicsMaterial,
    #[strum(serialize = "Preliminary_PhysicsRigidBodyAPI")]
    PhysicsRigidBody,
    #[strum(serialize = "Preliminary_PhysicsColliderAPI")]
    PhysicsCollider,
    #[strum(serialize = "Preliminary_AnchoringAPI")]
    Anchoring,
}

/// `apiSchemas` metadatum. Only `prepend` or explicit lists are accepted.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ApiSchemas {
    pub qual: ListEditQual,
    pub names: Vec<ApiSchema>,
}

/// Time offset and scale applied to a referenced layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerOffset {
    pub offset: f64,
    pub scale: f64,
}

impl Default for LayerOffset {
    fn default() -> Self {
        Self {
            offset: 0.0,
            scale: 1.0,
        }
    }
}

impl LayerOffset {
    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == LayerOffset::default()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Reference {
    pub asset_path: String,
    pub prim_path: Option<Path>,
    pub layer_offset: LayerOffset,
    pub custom_data: Dictionary,
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_arc(f, &self.asset_path, self.prim_path.as_ref())
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Payload {
    pub asset_path: String,
    pub prim_path: Option<Path>,
    pub layer_offset: LayerOffset,
}

impl Payload {
    /// `payload = None` is encoded as an empty payload.
    #[inline]
    pub fn is_none(&self) -> bool {
        self.asset_path.is_empty() && self.prim_path.is_none()
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("None");
        }

        write_arc(f, &self.asset_path, self.prim_path.as_ref())
    }
}

fn write_arc(f: &mut fmt::Formatter<'_>, asset: &str, path: Option<&Path>) -> fmt::Result {
    if !asset.is_empty() {
        write!(f, "@{asset}@")?;
    }

    if let Some(path) = path {
        write!(f, "<{path}>")?;
    }

    Ok(())
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SubLayer {
    pub asset_path: String,
    pub layer_offset: LayerOffset,
}

/// Layer (stage) level metadata.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LayerMetas {
    pub doc: Option<String>,
    pub comment: Option<String>,
    pub default_prim: Option<String>,
    pub up_axis: Option<UpAxis>,
    pub meters_per_unit: Option<f64>,
    pub time_codes_per_second: Option<f64>,
    pub frames_per_second: Option<f64>,
    pub start_time_code: Option<f64>,
    pub end_time_code: Option<f64>,
    pub auto_play: Option<bool>,
    pub playback_mode: Option<PlaybackMode>,
    pub sub_layers: Vec<SubLayer>,
    pub custom_layer_data: Dictionary,
    pub api_schemas: Option<ApiSchemas>,
}

/// Prim metadata.
///
/// Metadata without a typed field is kept in `unregistered` as raw text.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PrimMeta {
    pub active: Option<bool>,
    pub hidden: Option<bool>,
    pub instanceable: Option<bool>,
    pub kind: Option<Kind>,
    pub doc: Option<String>,
    pub comment: Option<String>,
    pub display_name: Option<String>,
    pub scene_name: Option<String>,

    pub references: Option<ListEdit<Reference>>,
    pub payload: Option<ListEdit<Payload>>,
    pub inherits: Option<ListEdit<Path>>,
    pub specializes: Option<ListEdit<Path>>,
    pub variant_sets: Option<ListEdit<String>>,
    pub api_schemas: Option<ApiSchemas>,

    /// Variant selection: variant set name to selected variant.
    pub variants: Option<BTreeMap<String, String>>,

    pub asset_info: Option<Dictionary>,
    pub custom_data: Option<Dictionary>,
    pub sdr_metadata: Option<Dictionary>,
    pub clips: Option<Dictionary>,

    pub unregistered: BTreeMap<String, String>,
}

impl PrimMeta {
    /// Returns true if no metadata was authored.
    pub fn is_empty(&self) -> bool {
        *self == PrimMeta::default()
    }
}

/// Property (attribute and relationship) metadata.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AttrMeta {
    pub interpolation: Option<Interpolation>,
    pub element_size: Option<u32>,
    pub active: Option<bool>,
    pub hidden: Option<bool>,
    pub doc: Option<String>,
    pub display_name: Option<String>,
    pub weight: Option<f64>,
    pub color_space: Option<String>,
    pub bind_material_as: Option<String>,
    pub connectability: Option<String>,
    pub render_type: Option<String>,
    pub output_name: Option<String>,
    pub custom_data: Option<Dictionary>,
    pub sdr_metadata: Option<Dictionary>,

    /// Bare strings found inside the metadata block.
    pub comments: Vec<String>,
}

impl AttrMeta {
    pub fn is_empty(&self) -> bool {
        *self == AttrMeta::default()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use anyhow::Result;

    use super::*;

    #[test]
    fn kind_from_token() -> Result<()> {
        #[rustfmt::skip]
        let cases = [
            ("model", Kind::Model),
            ("group", Kind::Group),
            ("assembly", Kind::Assembly),
            ("component", Kind::Component),
            ("subcomponent", Kind::Subcomponent),
            ("sceneLibrary", Kind::SceneLibrary),
            ("myKind", Kind::UserDef("myKind".into())),
            ("", Kind::UserDef(String::new())),
        ];

        for (token, expected) in cases {
            let kind = Kind::from_str(token)?;
            assert_eq!(kind, expected);
            assert_eq!(kind.to_string(), token);
        }

        Ok(())
    }

    #[test]
    fn enum_tokens() -> Result<()> {
        assert_eq!(Interpolation::from_str("faceVarying")?, Interpolation::FaceVarying);
        assert_eq!(Specifier::from_str("class")?, Specifier::Class);
        assert_eq!(PlaybackMode::from_str("loop")?, PlaybackMode::Loop);
        assert_eq!(ListEditQual::Prepend.to_string(), "prepend");
        assert_eq!(ListEditQual::ResetToExplicit.to_string(), "explicit");
        assert_eq!(ApiSchema::from_str("MaterialBindingAPI")?, ApiSchema::MaterialBinding);
        assert!(ApiSchema::from_str("UnknownAPI").is_err());
        assert!(UpAxis::from_str("W").is_err());

        Ok(())
    }

    #[test]
    fn payload_none() -> Result<()> {
        assert!(Payload::default().is_none());

        let payload = Payload {
            prim_path: Some(Path::from_str("/A")?),
            ..Default::default()
        };
        assert!(!payload.is_none());
        assert_eq!(payload.to_string(), "</A>");

        Ok(())
    }
}
