//! Typed prim reconstruction on top of a parsed [`Layer`].
//!
//! The parser is schema agnostic: it produces [`PrimSpec`] trees. A [`Stage`]
//! hands every spec to a [`PrimConstructor`] looked up by type name in a
//! [`PrimRegistry`].

use std::{
    any::Any,
    collections::{BTreeMap, HashMap},
    fmt,
    path::Path as FsPath,
};

use anyhow::{bail, Context, Result};

use crate::{
    sdf::{self, schema, Layer, LayerMetas, PrimMeta, PrimSpec, PropertyMap, Specifier},
    usda,
};

/// Type name used for typeless and unknown prims.
pub const MODEL_TYPE: &str = "Model";

/// Reconstructed prim.
pub trait Prim: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &str;

    /// Untyped properties, if the prim keeps them.
    fn properties(&self) -> Option<&PropertyMap> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// Prim that keeps the parsed properties and metadata as they are.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericPrim {
    pub type_name: String,
    pub properties: PropertyMap,
    pub metas: PrimMeta,
}

impl Prim for GenericPrim {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn properties(&self) -> Option<&PropertyMap> {
        Some(&self.properties)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Builds a typed prim from an un-reconstructed spec.
pub trait PrimConstructor: Send + Sync {
    fn construct(&self, type_name: &str, properties: &PropertyMap, metas: &PrimMeta) -> Result<Box<dyn Prim>>;
}

impl<F> PrimConstructor for F
where
    F: Fn(&str, &PropertyMap, &PrimMeta) -> Result<Box<dyn Prim>> + Send + Sync,
{
    fn construct(&self, type_name: &str, properties: &PropertyMap, metas: &PrimMeta) -> Result<Box<dyn Prim>> {
        self(type_name, properties, metas)
    }
}

struct GenericConstructor;

impl PrimConstructor for GenericConstructor {
    fn construct(&self, type_name: &str, properties: &PropertyMap, metas: &PrimMeta) -> Result<Box<dyn Prim>> {
        Ok(Box::new(GenericPrim {
            type_name: type_name.to_string(),
            properties: properties.clone(),
            metas: metas.clone(),
        }))
    }
}

/// Type name to constructor map.
pub struct PrimRegistry {
    constructors: HashMap<String, Box<dyn PrimConstructor>>,
}

impl Default for PrimRegistry {
    /// Registry with a generic constructor for every known prim type.
    fn default() -> Self {
        let mut registry = Self::empty();
        for name in schema::PRIM_TYPES {
            registry.register(*name, GenericConstructor);
        }
        registry
    }
}

impl PrimRegistry {
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register (or replace) the constructor for `type_name`.
    pub fn register(&mut self, type_name: impl Into<String>, ctor: impl PrimConstructor + 'static) {
        self.constructors.insert(type_name.into(), Box::new(ctor));
    }

    pub fn get(&self, type_name: &str) -> Option<&dyn PrimConstructor> {
        self.constructors.get(type_name).map(|ctor| ctor.as_ref())
    }

    #[inline]
    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageConfig {
    /// Reconstruct prims of unregistered types as generic `Model` prims
    /// instead of failing.
    pub allow_unknown_prim: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            allow_unknown_prim: true,
        }
    }
}

impl StageConfig {
    pub fn allow_unknown_prim(mut self, value: bool) -> Self {
        self.allow_unknown_prim = value;
        self
    }
}

/// Reconstructed content of one variant.
#[derive(Debug)]
pub struct StageVariant {
    pub metas: PrimMeta,
    pub properties: PropertyMap,
    pub children: Vec<StagePrim>,
}

#[derive(Debug)]
pub struct StagePrim {
    pub name: String,
    pub path: sdf::Path,
    pub specifier: Specifier,
    /// Type name as authored, empty for typeless prims.
    pub authored_type: String,
    pub prim: Box<dyn Prim>,
    pub children: Vec<StagePrim>,
    /// Variant set name to variant name to content. Nothing is composed:
    /// variant children are not part of `children`, and their paths are
    /// rooted at the owning prim.
    pub variant_sets: BTreeMap<String, BTreeMap<String, StageVariant>>,
}

impl StagePrim {
    /// Downcast the reconstructed prim.
    pub fn get<T: Prim + 'static>(&self) -> Option<&T> {
        self.prim.as_any().downcast_ref::<T>()
    }

    pub fn child(&self, name: &str) -> Option<&StagePrim> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn variant(&self, set: &str, name: &str) -> Option<&StageVariant> {
        self.variant_sets.get(set).and_then(|set| set.get(name))
    }
}

/// Tree of reconstructed prims plus layer metadata.
///
/// Only the authored hierarchy is walked by [`Stage::find_prim_at_path`];
/// variant content hangs off [`StagePrim::variant_sets`].
#[derive(Debug)]
pub struct Stage {
    pub metas: LayerMetas,
    pub root_prims: Vec<StagePrim>,
}

impl Stage {
    /// Read a `.usda` file and reconstruct it with the built-in registry.
    pub fn open(path: impl AsRef<FsPath>) -> Result<Self> {
        let layer = usda::read_layer(path)?;
        Self::from_layer(layer, &PrimRegistry::default(), StageConfig::default())
    }

    pub fn from_layer(layer: Layer, registry: &PrimRegistry, config: StageConfig) -> Result<Self> {
        let root = sdf::Path::abs_root();

        let root_prims = layer
            .prims
            .iter()
            .map(|spec| reconstruct(spec, &root, registry, config))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            metas: layer.metas,
            root_prims,
        })
    }

    pub fn find_prim_at_path(&self, path: &sdf::Path) -> Option<&StagePrim> {
        if !path.is_absolute() || !path.is_prim_path() || path.is_root() {
            return None;
        }

        let mut names = path.prim_part().split(sdf::Path::DELIMITER).filter(|s| !s.is_empty());
        let first = names.next()?;

        let mut prim = self.root_prims.iter().find(|p| p.name == first)?;
        for name in names {
            prim = prim.child(name)?;
        }

        Some(prim)
    }
}

fn reconstruct(spec: &PrimSpec, parent: &sdf::Path, registry: &PrimRegistry, config: StageConfig) -> Result<StagePrim> {
    let path = parent.append_element(&spec.name)?;

    let type_name = if spec.type_name.is_empty() {
        MODEL_TYPE
    } else {
        spec.type_name.as_str()
    };

    let prim = match registry.get(type_name) {
        Some(ctor) => ctor
            .construct(type_name, &spec.properties, &spec.metas)
            .with_context(|| format!("Unable to reconstruct {path} as {type_name}"))?,
        None if config.allow_unknown_prim => {
            log::warn!("Unknown prim type {type_name} at {path}, using {MODEL_TYPE}");
            GenericConstructor.construct(MODEL_TYPE, &spec.properties, &spec.metas)?
        }
        None => bail!("Unknown prim type {type_name} at {path}"),
    };

    let children = spec
        .children
        .iter()
        .map(|child| reconstruct(child, &path, registry, config))
        .collect::<Result<Vec<_>>>()?;

    let mut variant_sets = BTreeMap::new();
    for (set_name, set) in &spec.variant_sets {
        let mut variants = BTreeMap::new();
        for (name, variant) in set {
            let children = variant
                .children
                .iter()
                .map(|child| reconstruct(child, &path, registry, config))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("Unable to reconstruct variant {{{set_name}={name}}} of {path}"))?;

            variants.insert(
                name.clone(),
                StageVariant {
                    metas: variant.metas.clone(),
                    properties: variant.properties.clone(),
                    children,
                },
            );
        }
        variant_sets.insert(set_name.clone(), variants);
    }

    Ok(StagePrim {
        name: spec.name.clone(),
        path,
        specifier: spec.specifier,
        authored_type: spec.type_name.clone(),
        prim,
        children,
        variant_sets,
    })
}

#[cfg(test)]
mod tests {
    use anyhow::ensure;

    use super::*;
    use crate::sdf::{Property, Value};

    #[derive(Debug)]
    struct Sphere {
        radius: f64,
    }

    impl Prim for Sphere {
        fn type_name(&self) -> &str {
            "Sphere"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn sphere(_: &str, props: &PropertyMap, _: &PrimMeta) -> Result<Box<dyn Prim>> {
        let radius = match props.get("radius").and_then(Property::value) {
            Some(value) => value.get::<f64>().context("radius must be double")?,
            None => 1.0,
        };
        ensure!(radius > 0.0, "radius must be positive");

        Ok(Box::new(Sphere { radius }))
    }

    fn parse(text: &str) -> Result<Layer> {
        Ok(text.parse::<Layer>()?)
    }

    #[test]
    fn open_with_builtin_registry() -> Result<()> {
        let stage = Stage::open("fixtures/end_to_end.usda")?;

        let ball = stage
            .find_prim_at_path(&sdf::path("/root/ball")?)
            .context("ball")?;
        assert_eq!(ball.prim.type_name(), "Sphere");

        let generic = ball.get::<GenericPrim>().context("generic prim")?;
        assert_eq!(
            generic.properties.get("radius").and_then(Property::value),
            Some(&Value::Double(2.0))
        );

        assert!(stage.find_prim_at_path(&sdf::path("/root/nope")?).is_none());

        Ok(())
    }

    #[test]
    fn custom_constructor() -> Result<()> {
        let mut registry = PrimRegistry::default();
        registry.register("Sphere", sphere);

        let layer = parse("#usda 1.0\ndef Xform \"a\" { def Sphere \"s\" { double radius = 3 } }\n")?;
        let stage = Stage::from_layer(layer, &registry, StageConfig::default())?;

        let s = stage.find_prim_at_path(&sdf::path("/a/s")?).context("s")?;
        assert_eq!(s.get::<Sphere>().map(|s| s.radius), Some(3.0));
        assert_eq!(s.path, sdf::path("/a/s")?);

        let layer = parse("#usda 1.0\ndef Sphere \"s\" { double radius = -1 }\n")?;
        let err = Stage::from_layer(layer, &registry, StageConfig::default()).err();
        assert!(err.is_some_and(|e| format!("{e:#}").contains("radius must be positive")));

        Ok(())
    }

    #[test]
    fn variant_content() -> Result<()> {
        let stage = Stage::open("fixtures/variants.usda")?;

        let model = stage.find_prim_at_path(&sdf::path("/Model")?).context("Model")?;
        assert_eq!(model.children.len(), 1);
        assert_eq!(model.variant_sets["shadingVariant"].len(), 3);

        let red = model.variant("shadingVariant", "red").context("red")?;
        assert_eq!(red.metas.doc.as_deref(), Some("Red variant"));
        assert!(red.properties.get("displayColor").is_some());

        let blue = model.variant("shadingVariant", "blue").context("blue")?;
        let decal = blue.children.first().context("Decal")?;
        assert_eq!(decal.name, "Decal");
        assert_eq!(decal.prim.type_name(), "Xform");
        assert_eq!(decal.path, sdf::path("/Model/Decal")?);

        // Variant children are not part of the authored hierarchy.
        assert!(stage.find_prim_at_path(&sdf::path("/Model/Decal")?).is_none());
        assert!(model.variant("shadingVariant", "purple").is_none());

        Ok(())
    }

    #[test]
    fn unknown_prim_types() -> Result<()> {
        let text = "#usda 1.0\ndef FancyThing \"f\" {}\ndef \"plain\" {}\n";

        let stage = Stage::from_layer(parse(text)?, &PrimRegistry::default(), StageConfig::default())?;
        let f = &stage.root_prims[0];
        assert_eq!(f.prim.type_name(), MODEL_TYPE);
        assert_eq!(f.authored_type, "FancyThing");
        assert_eq!(stage.root_prims[1].prim.type_name(), MODEL_TYPE);

        let strict = StageConfig::default().allow_unknown_prim(false);
        assert!(Stage::from_layer(parse(text)?, &PrimRegistry::default(), strict).is_err());

        // Typeless prims need a `Model` constructor when unknown types are rejected.
        assert!(Stage::from_layer(parse("#usda 1.0\ndef \"p\" {}\n")?, &PrimRegistry::empty(), strict).is_err());

        Ok(())
    }
}
