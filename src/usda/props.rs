//! Property statements inside prim and variant bodies.

use anyhow::{bail, ensure, Context, Result};

use crate::sdf::{
    self, Attribute, AttrMeta, ListEditQual, Property, PropertyKind, PropertyMap, Relationship, RelationshipTargets,
    TimeSamples, Value, ValueType, Variability,
};

use super::parser::Parser;

/// What the right hand side of an attribute statement authored.
enum Authored {
    DefineOnly,
    Value(Value),
    Blocked,
    TimeSamples(TimeSamples),
    Connections(Vec<sdf::Path>),
}

impl Parser<'_> {
    /// One property statement:
    /// `custom? qual? (uniform|varying)? (rel name ... | type name ...)`
    pub(super) fn parse_prim_props(&mut self, props: &mut PropertyMap) -> Result<()> {
        let custom = self.cur.maybe_keyword("custom");
        self.cur.skip_whitespace();

        let qual = self.maybe_list_edit_qual();

        let (variability, varying_authored) = if self.cur.maybe_keyword("uniform") {
            (Variability::Uniform, false)
        } else if self.cur.maybe_keyword("varying") {
            (Variability::Varying, true)
        } else {
            (Variability::Varying, false)
        };
        self.cur.skip_whitespace();

        if self.cur.maybe_keyword("rel") {
            self.cur.skip_whitespace();
            let rel = self.parse_relationship(qual, variability)?;

            let name = rel.name.clone();
            let kind = match rel.targets {
                RelationshipTargets::DefineOnly => PropertyKind::NoTargetsRelation(rel),
                _ => PropertyKind::Relation(rel),
            };

            props.insert(
                name,
                Property {
                    kind,
                    custom,
                    list_edit: qual,
                },
            );
            return Ok(());
        }

        let (ty, array) = self.read_type_name()?;
        ensure!(ty.is_attribute_type(), "Type {ty} is not allowed for attributes");
        self.cur.skip_whitespace();

        let full_name = self.cur.read_prim_attr_identifier()?;
        let (name, suffix) = match full_name.split_once('.') {
            Some((name, suffix)) => (name.to_string(), Some(suffix)),
            None => (full_name.clone(), None),
        };

        ensure!(
            qual == ListEditQual::ResetToExplicit || suffix == Some("connect"),
            "List edit qualifier `{qual}` is only allowed for relationships and connections"
        );

        self.cur.skip_whitespace();

        let authored = match suffix {
            Some("connect") => {
                self.expect_assign(&full_name)?;
                if self.cur.maybe_keyword("None") {
                    Authored::Connections(Vec::new())
                } else {
                    Authored::Connections(self.read_target_paths()?)
                }
            }
            Some("timeSamples") => {
                self.expect_assign(&full_name)?;
                ensure!(!self.cur.maybe_keyword("None"), "`{full_name} = None` is not supported");
                Authored::TimeSamples(self.parse_time_samples(ty, array)?)
            }
            _ if self.cur.maybe_char('=') => {
                self.skip();
                if self.cur.maybe_keyword("None") {
                    Authored::Blocked
                } else {
                    let value = self
                        .parse_value(ty, array)
                        .with_context(|| format!("Unable to parse value of `{name}`"))?;
                    Authored::Value(value)
                }
            }
            _ => Authored::DefineOnly,
        };

        self.cur.skip_whitespace();
        let metas = if self.cur.peek() == Some(b'(') {
            self.parse_attr_meta()
                .with_context(|| format!("Unable to parse metadata of `{name}`"))?
        } else {
            AttrMeta::default()
        };

        let type_name = if array { format!("{ty}[]") } else { ty.to_string() };

        merge_attribute(
            props,
            AttributeStatement {
                name,
                type_name,
                variability,
                varying_authored,
                custom,
                qual,
                authored,
                metas,
            },
        );

        Ok(())
    }

    fn expect_assign(&mut self, name: &str) -> Result<()> {
        self.cur
            .expect('=')
            .with_context(|| format!("`=` expected after `{name}`"))?;
        self.skip();
        Ok(())
    }

    /// `rel name (metas)? (= None | <path> | [<path>, ...])? (metas)?`
    fn parse_relationship(&mut self, qual: ListEditQual, variability: Variability) -> Result<Relationship> {
        let name = self.cur.read_prim_attr_identifier()?;
        ensure!(!name.contains('.'), "Invalid relationship name: {name}");

        let mut rel = Relationship {
            name,
            list_edit: qual,
            variability,
            ..Default::default()
        };

        self.cur.skip_whitespace();
        if self.cur.peek() == Some(b'(') {
            rel.metas = self.parse_attr_meta()?;
            self.cur.skip_whitespace();
        }

        if self.cur.maybe_char('=') {
            self.skip();

            rel.targets = if self.cur.maybe_keyword("None") {
                RelationshipTargets::ValueBlock
            } else if self.cur.peek() == Some(b'<') {
                RelationshipTargets::Path(self.read_target_path()?)
            } else if self.cur.peek() == Some(b'[') {
                RelationshipTargets::PathVector(self.read_target_paths()?)
            } else {
                bail!("Relationship target must be None, a path or a list of paths");
            };

            self.cur.skip_whitespace();
            if self.cur.peek() == Some(b'(') {
                rel.metas = self.parse_attr_meta()?;
            }
        }

        Ok(rel)
    }

    /// `<path>` resolved against the current prim.
    fn read_target_path(&mut self) -> Result<sdf::Path> {
        let raw = self.cur.read_path_identifier()?;
        let path = sdf::path(&raw).with_context(|| format!("Invalid target path <{raw}>"))?;

        path.resolve(&self.prim_path)
            .with_context(|| format!("Unable to resolve <{raw}> against {}", self.prim_path))
    }

    /// `<path>` or `[<path>, ...]`.
    fn read_target_paths(&mut self) -> Result<Vec<sdf::Path>> {
        if self.cur.peek() != Some(b'[') {
            return Ok(vec![self.read_target_path()?]);
        }

        let items = self.read_array(|p| p.read_target_path().map(Value::Path))?;
        items
            .into_iter()
            .map(|item| match item {
                Value::Path(path) => Ok(path),
                _ => bail!("None is not allowed as a target path"),
            })
            .collect()
    }

    /// `{ time: value, ... }`. A sample may be `None`.
    fn parse_time_samples(&mut self, ty: ValueType, array: bool) -> Result<TimeSamples> {
        self.cur.expect('{').context("Time samples must start with {")?;

        let mut samples = TimeSamples::new();
        loop {
            self.skip();
            if self.cur.maybe_char('}') {
                break;
            }

            let time = self.read_basic::<f64>().context("Sample time expected")?;
            self.cur.skip_whitespace();
            self.cur.expect(':')?;
            self.skip();

            let value = if self.cur.maybe_keyword("None") {
                Value::ValueBlock
            } else {
                self.parse_value(ty, array)
                    .with_context(|| format!("Unable to parse sample at time {time}"))?
            };
            samples.add(time, value);

            self.skip();
            if !self.cur.maybe_char(',') {
                self.cur.expect('}').context("Either comma or } expected after sample")?;
                break;
            }
        }

        Ok(samples)
    }
}

struct AttributeStatement {
    name: String,
    type_name: String,
    variability: Variability,
    varying_authored: bool,
    custom: bool,
    qual: ListEditQual,
    authored: Authored,
    metas: AttrMeta,
}

/// Fold a statement into the attribute of the same name.
///
/// Default value, time samples and connections are kept side by side. A
/// property is a [`PropertyKind::Connection`] only while it has no value.
fn merge_attribute(props: &mut PropertyMap, stmt: AttributeStatement) {
    let existing = props.get(&stmt.name);

    let mut connected = matches!(existing.map(|p| &p.kind), Some(PropertyKind::Connection(_)));
    let custom = stmt.custom || existing.is_some_and(|p| p.custom);

    let mut attr = match existing.and_then(Property::attribute) {
        Some(attr) if attr.type_name == stmt.type_name => attr.clone(),
        _ => Attribute::new(stmt.name.clone(), stmt.type_name.clone()),
    };

    if stmt.variability == Variability::Uniform || stmt.varying_authored {
        attr.variability = stmt.variability;
        attr.varying_authored = stmt.varying_authored;
    }

    match stmt.authored {
        Authored::DefineOnly => {}
        Authored::Value(value) => {
            attr.value = Some(value);
            attr.blocked = false;
        }
        Authored::Blocked => {
            attr.value = None;
            attr.blocked = true;
        }
        Authored::TimeSamples(samples) => attr.time_samples = Some(samples),
        Authored::Connections(paths) => {
            attr.connections = paths;
            connected = true;
        }
    }

    if !stmt.metas.is_empty() {
        attr.metas = stmt.metas;
    }

    let kind = if attr.value.is_some() || attr.blocked || attr.time_samples.is_some() {
        PropertyKind::Attrib(attr)
    } else if connected {
        PropertyKind::Connection(attr)
    } else {
        PropertyKind::EmptyAttrib(attr)
    };

    props.insert(
        stmt.name,
        Property {
            kind,
            custom,
            list_edit: stmt.qual,
        },
    );
}
