//! Second pass: fold the flat node arena and variant side map into prim trees.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};

use crate::sdf::{PrimMeta, PrimSpec, PropertyMap, Variant};

/// Arena entry for one parsed prim block.
///
/// `spec.children` and `spec.variant_sets` stay empty until assembly.
#[derive(Debug)]
pub struct Node {
    pub parent: Option<usize>,
    /// Direct children, in source order.
    pub children: Vec<usize>,
    pub spec: PrimSpec,
}

/// Variant body before assembly. Children are node indices.
#[derive(Debug, Default)]
pub struct VariantContent {
    pub metas: PrimMeta,
    pub properties: PropertyMap,
    pub children: Vec<usize>,
}

/// Owner node index to variant set name to variant name to content.
pub type VariantMap = BTreeMap<usize, BTreeMap<String, BTreeMap<String, VariantContent>>>;

/// Build one tree per root node.
///
/// Every node must be reachable exactly once, either as a direct child or
/// from a single variant.
pub fn assemble(nodes: Vec<Node>, mut variants: VariantMap) -> Result<Vec<PrimSpec>> {
    let roots = nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| node.parent.is_none())
        .map(|(index, _)| index)
        .collect::<Vec<_>>();

    let mut slots = nodes.into_iter().map(Some).collect::<Vec<_>>();

    let mut prims = Vec::with_capacity(roots.len());
    for index in roots {
        prims.push(build(index, &mut slots, &mut variants)?);
    }

    if let Some(orphan) = slots.iter().position(Option::is_some) {
        bail!("Prim node {orphan} is not reachable from any root");
    }

    if let Some(owner) = variants.keys().next() {
        bail!("Variant sets refer to unknown prim node {owner}");
    }

    log::debug!("Assembled {} root prim(s)", prims.len());

    Ok(prims)
}

fn build(index: usize, slots: &mut [Option<Node>], variants: &mut VariantMap) -> Result<PrimSpec> {
    let node = slots
        .get_mut(index)
        .with_context(|| format!("Prim node index {index} is out of range"))?
        .take()
        .with_context(|| format!("Prim node {index} is visited twice"))?;

    let mut spec = node.spec;

    for child in node.children {
        spec.children.push(build(child, slots, variants)?);
    }

    if let Some(sets) = variants.remove(&index) {
        for (set_name, set) in sets {
            let mut built = BTreeMap::new();
            for (variant_name, content) in set {
                let children = content
                    .children
                    .into_iter()
                    .map(|child| build(child, slots, variants))
                    .collect::<Result<Vec<_>>>()
                    .with_context(|| format!("Unable to assemble variant {set_name}/{variant_name}"))?;

                built.insert(
                    variant_name,
                    Variant {
                        metas: content.metas,
                        properties: content.properties,
                        children,
                    },
                );
            }

            spec.variant_sets.insert(set_name, built);
        }
    }

    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, parent: Option<usize>, children: Vec<usize>) -> Node {
        Node {
            parent,
            children,
            spec: PrimSpec {
                name: name.into(),
                ..Default::default()
            },
        }
    }

    fn variant(children: Vec<usize>) -> VariantContent {
        VariantContent {
            children,
            ..Default::default()
        }
    }

    #[test]
    fn builds_trees_in_order() -> Result<()> {
        let nodes = vec![
            node("a", None, vec![1, 3]),
            node("b", Some(0), vec![2]),
            node("c", Some(1), vec![]),
            node("d", Some(0), vec![]),
            node("e", None, vec![]),
        ];

        let prims = assemble(nodes, VariantMap::new())?;

        assert_eq!(prims.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), vec!["a", "e"]);
        assert_eq!(prims[0].children.len(), 2);
        assert_eq!(prims[0].children[0].children[0].name, "c");

        Ok(())
    }

    #[test]
    fn variant_children() -> Result<()> {
        let nodes = vec![node("p", None, vec![]), node("c", Some(0), vec![])];

        let mut variants = VariantMap::new();
        variants
            .entry(0)
            .or_default()
            .entry("v".into())
            .or_default()
            .insert("a".into(), variant(vec![1]));

        let prims = assemble(nodes, variants)?;
        let p = &prims[0];

        assert!(p.children.is_empty());
        assert_eq!(p.variant("v", "a").map(|v| v.children[0].name.as_str()), Some("c"));

        Ok(())
    }

    #[test]
    fn revisit_is_fatal() {
        // Direct child and variant child at the same time.
        let nodes = vec![node("p", None, vec![1]), node("c", Some(0), vec![])];

        let mut variants = VariantMap::new();
        variants
            .entry(0)
            .or_default()
            .entry("v".into())
            .or_default()
            .insert("a".into(), variant(vec![1]));

        let err = assemble(nodes, variants).err().map(|e| format!("{e:#}"));
        assert!(err.is_some_and(|e| e.contains("visited twice")));

        // Same child in two variants.
        let nodes = vec![node("p", None, vec![]), node("c", Some(0), vec![])];

        let mut variants = VariantMap::new();
        let set = variants.entry(0).or_default().entry("v".into()).or_default();
        set.insert("a".into(), variant(vec![1]));
        set.insert("b".into(), variant(vec![1]));

        assert!(assemble(nodes, variants).is_err());
    }

    #[test]
    fn orphans_are_reported() {
        let nodes = vec![node("p", None, vec![]), node("c", Some(0), vec![])];
        assert!(assemble(nodes, VariantMap::new()).is_err());
    }
}
