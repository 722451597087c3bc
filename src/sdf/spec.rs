//! Schema agnostic prim tree produced by the text parser.

use std::collections::BTreeMap;

use super::{AttrMeta, LayerMetas, ListEditQual, Path, PrimMeta, Specifier, TimeSamples, Value, Variability};

/// Attribute value storage.
///
/// An attribute may carry a default value, time samples and connections at
/// the same time.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    /// Declared type, including `[]` for arrays (e.g. `point3f[]`).
    pub type_name: String,
    pub variability: Variability,
    /// `varying` was written explicitly.
    pub varying_authored: bool,
    pub value: Option<Value>,
    pub time_samples: Option<TimeSamples>,
    pub connections: Vec<Path>,
    /// Default value is `None`.
    pub blocked: bool,
    pub metas: AttrMeta,
}

impl Attribute {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        self.type_name.ends_with("[]")
    }
}

/// Relationship targets as authored.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum RelationshipTargets {
    /// `rel foo` without `=`.
    #[default]
    DefineOnly,
    Path(Path),
    PathVector(Vec<Path>),
    /// `rel foo = None`
    ValueBlock,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Relationship {
    pub name: String,
    pub targets: RelationshipTargets,
    pub list_edit: ListEditQual,
    pub variability: Variability,
    pub metas: AttrMeta,
}

impl Relationship {
    /// All target paths, regardless of how they were authored.
    pub fn target_paths(&self) -> &[Path] {
        match &self.targets {
            RelationshipTargets::Path(path) => std::slice::from_ref(path),
            RelationshipTargets::PathVector(paths) => paths,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    /// Declared attribute without a value (`float foo`).
    EmptyAttrib(Attribute),
    Attrib(Attribute),
    Relation(Relationship),
    /// Declared relationship without targets (`rel foo`).
    NoTargetsRelation(Relationship),
    /// Attribute which only has `.connect` targets.
    Connection(Attribute),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub kind: PropertyKind,
    pub custom: bool,
    pub list_edit: ListEditQual,
}

impl Property {
    pub fn new(kind: PropertyKind) -> Self {
        Self {
            kind,
            custom: false,
            list_edit: ListEditQual::ResetToExplicit,
        }
    }

    pub fn attribute(&self) -> Option<&Attribute> {
        match &self.kind {
            PropertyKind::EmptyAttrib(attr) | PropertyKind::Attrib(attr) | PropertyKind::Connection(attr) => Some(attr),
            _ => None,
        }
    }

    pub fn attribute_mut(&mut self) -> Option<&mut Attribute> {
        match &mut self.kind {
            PropertyKind::EmptyAttrib(attr) | PropertyKind::Attrib(attr) | PropertyKind::Connection(attr) => Some(attr),
            _ => None,
        }
    }

    pub fn relationship(&self) -> Option<&Relationship> {
        match &self.kind {
            PropertyKind::Relation(rel) | PropertyKind::NoTargetsRelation(rel) => Some(rel),
            _ => None,
        }
    }

    #[inline]
    pub fn is_relationship(&self) -> bool {
        self.relationship().is_some()
    }

    /// Authored default value, if any.
    pub fn value(&self) -> Option<&Value> {
        self.attribute().and_then(|attr| attr.value.as_ref())
    }
}

/// Insertion ordered property name to [`Property`] map.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PropertyMap {
    entries: Vec<(String, Property)>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a property.
    pub fn insert(&mut self, name: impl Into<String>, prop: Property) -> Option<Property> {
        let name = name.into();
        match self.get_mut(&name) {
            Some(existing) => Some(std::mem::replace(existing, prop)),
            None => {
                self.entries.push((name, prop));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.entries.iter_mut().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.entries.iter().map(|(n, p)| (n.as_str(), p))
    }
}

/// Content of a single variant.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Variant {
    pub metas: PrimMeta,
    pub properties: PropertyMap,
    pub children: Vec<PrimSpec>,
}

/// Variant set name to variant name to content.
pub type VariantSets = BTreeMap<String, BTreeMap<String, Variant>>;

/// Un-reconstructed parse of a prim block.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PrimSpec {
    pub specifier: Specifier,
    /// Empty for typeless prims.
    pub type_name: String,
    pub name: String,
    pub metas: PrimMeta,
    pub properties: PropertyMap,
    pub children: Vec<PrimSpec>,
    pub variant_sets: VariantSets,
}

impl PrimSpec {
    pub fn child(&self, name: &str) -> Option<&PrimSpec> {
        self.children.iter().find(|c| c.name == name)
    }

    #[inline]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    pub fn variant(&self, set: &str, name: &str) -> Option<&Variant> {
        self.variant_sets.get(set).and_then(|set| set.get(name))
    }
}

/// Parsed text file: layer metadata and root prims.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Layer {
    pub metas: LayerMetas,
    pub prims: Vec<PrimSpec>,
}

impl Layer {
    pub fn root(&self, name: &str) -> Option<&PrimSpec> {
        self.prims.iter().find(|p| p.name == name)
    }

    /// Find prim spec by absolute prim path. Variant content is not searched.
    pub fn find_prim(&self, path: &Path) -> Option<&PrimSpec> {
        if !path.is_absolute() || !path.is_prim_path() || path.is_root() {
            return None;
        }

        let mut names = path.prim_part().split(Path::DELIMITER).filter(|s| !s.is_empty());
        let mut prim = self.root(names.next()?)?;
        for name in names {
            prim = prim.child(name)?;
        }

        Some(prim)
    }

    /// Depth first visit of every prim spec with its absolute path.
    pub fn traverse(&self, mut visit: impl FnMut(&Path, &PrimSpec)) {
        fn walk(base: &Path, prim: &PrimSpec, visit: &mut dyn FnMut(&Path, &PrimSpec)) {
            let Ok(path) = base.append_element(&prim.name) else {
                return;
            };

            visit(&path, prim);
            for child in &prim.children {
                walk(&path, child, visit);
            }
        }

        let root = Path::abs_root();
        for prim in &self.prims {
            walk(&root, prim, &mut visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;
    use crate::sdf::path;

    fn prim(name: &str, children: Vec<PrimSpec>) -> PrimSpec {
        PrimSpec {
            name: name.into(),
            children,
            ..Default::default()
        }
    }

    #[test]
    fn find_prim() -> Result<()> {
        let layer = Layer {
            prims: vec![prim("World", vec![prim("Geom", vec![prim("Mesh", vec![])])])],
            ..Default::default()
        };

        assert_eq!(layer.find_prim(&path("/World/Geom/Mesh")?).map(|p| p.name.as_str()), Some("Mesh"));
        assert!(layer.find_prim(&path("/World/Nope")?).is_none());
        assert!(layer.find_prim(&path("/World.attr")?).is_none());
        assert!(layer.find_prim(&Path::abs_root()).is_none());

        let mut visited = Vec::new();
        layer.traverse(|path, _| visited.push(path.to_string()));
        assert_eq!(visited, vec!["/World", "/World/Geom", "/World/Geom/Mesh"]);

        Ok(())
    }

    #[test]
    fn property_map_replaces() {
        let mut props = PropertyMap::new();
        props.insert("a", Property::new(PropertyKind::EmptyAttrib(Attribute::new("a", "float"))));
        props.insert("b", Property::new(PropertyKind::EmptyAttrib(Attribute::new("b", "int"))));

        let mut attr = Attribute::new("a", "float");
        attr.value = Some(Value::Float(1.0));
        let old = props.insert("a", Property::new(PropertyKind::Attrib(attr)));

        assert!(old.is_some());
        assert_eq!(props.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(props.get("a").and_then(Property::value), Some(&Value::Float(1.0)));
    }
}
