//! Recursive descent parser for USDA documents.
//!
//! Prim blocks are parsed into a flat node arena first, see [`super::assemble`]
//! for the second pass that builds the trees.

use std::{collections::BTreeMap, str::FromStr};

use anyhow::{bail, ensure, Context, Result};

use crate::sdf::{self, Layer, LayerMetas, PropertyMap, Specifier};

use super::{
    assemble::{self, Node, VariantContent, VariantMap},
    cursor::Cursor,
    diag::Diagnostics,
    ParseError, ParserConfig,
};

/// Parser translates a text document into a [`Layer`].
pub struct Parser<'a> {
    pub(super) cur: Cursor<'a>,
    pub(super) config: ParserConfig,
    pub(super) diag: Diagnostics,
    /// Path of the prim being parsed, used to resolve relative paths.
    pub(super) prim_path: sdf::Path,
    nodes: Vec<Node>,
    variants: VariantMap,
    warnings: String,
}

impl<'a> Parser<'a> {
    pub fn new(data: &'a str, config: ParserConfig) -> Self {
        Self {
            cur: Cursor::new(data),
            config,
            diag: Diagnostics::new(),
            prim_path: sdf::Path::abs_root(),
            nodes: Vec::new(),
            variants: VariantMap::new(),
            warnings: String::new(),
        }
    }

    /// Warnings collected by the last [`Parser::parse`] call.
    pub fn warnings(&self) -> &str {
        &self.warnings
    }

    /// Parse the whole document.
    ///
    /// On failure the partial output is dropped and the error carries every
    /// diagnostic, newest first.
    pub fn parse(&mut self) -> Result<Layer, ParseError> {
        let result = self.parse_layer();

        self.warnings = self.diag.take_warnings();

        match result {
            Ok(layer) => Ok(layer),
            Err(err) => {
                self.diag.push_error(self.cur.position(), format!("{err:#}"));
                Err(ParseError::new(self.diag.take_errors(), self.warnings.clone()))
            }
        }
    }

    fn parse_layer(&mut self) -> Result<Layer> {
        self.parse_magic_header()?;
        self.skip();

        let metas = if self.cur.peek() == Some(b'(') {
            self.parse_stage_metas().context("Unable to parse stage metadata")?
        } else {
            LayerMetas::default()
        };

        loop {
            self.skip();
            if self.cur.eof() {
                break;
            }

            ensure!(self.at_specifier(), "Expected `def`, `over` or `class`");
            self.parse_block(None)?;
        }

        let nodes = std::mem::take(&mut self.nodes);
        let variants = std::mem::take(&mut self.variants);
        let prims = assemble::assemble(nodes, variants).context("Unable to assemble prim tree")?;

        Ok(Layer { metas, prims })
    }

    /// Skip comments, blanks and newlines (and `;` when enabled).
    #[inline]
    pub(super) fn skip(&mut self) {
        self.cur
            .skip_comment_and_whitespace_and_newline(self.config.allow_semicolon);
    }

    /// `#usda 1.0`, the rest of the line is ignored.
    fn parse_magic_header(&mut self) -> Result<()> {
        ensure!(self.cur.starts_with("#usda "), "File must start with `#usda 1.0`");
        self.cur.consume_n("#usda ".len())?;

        let version = self.cur.lex_float().context("Unable to read version")?;
        ensure!(version == "1.0", "Unsupported version {version}, only 1.0 is supported");

        self.cur.skip_until_newline();
        Ok(())
    }

    fn at_specifier(&mut self) -> bool {
        let state = self.cur.tell();
        let found = ["def", "over", "class"].iter().any(|kw| self.cur.maybe_keyword(kw));
        self.cur.seek(state);
        found
    }

    /// Reads a single prim block and returns its node index.
    ///
    /// The index is assigned before the body is parsed, so nested blocks can
    /// record it as their parent.
    fn parse_block(&mut self, parent: Option<usize>) -> Result<usize> {
        let specifier = {
            let word = self.cur.read_identifier().context("Unable to read prim specifier")?;
            Specifier::from_str(&word).with_context(|| format!("Unexpected prim specifier: {word}"))?
        };
        self.cur.skip_whitespace();

        // Typeless prims go straight to the name.
        let type_name = if matches!(self.cur.peek(), Some(b'"' | b'\'')) {
            String::new()
        } else {
            let ty = self.cur.read_identifier().context("Unable to read prim type")?;
            self.cur.skip_whitespace();
            ty
        };

        let name = self.cur.read_string_literal().context("Prim name expected")?;
        ensure!(sdf::Path::is_valid_identifier(&name), "Invalid prim name: {name:?}");

        self.skip();
        let metas = if self.cur.peek() == Some(b'(') {
            let path = self.prim_path.append_element(&name)?;
            self.parse_prim_metas()
                .with_context(|| format!("Unable to parse metadata of {path}"))?
        } else {
            Default::default()
        };

        self.skip();
        self.cur.expect('{').context("Prim body must start with {")?;

        let index = self.nodes.len();
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            spec: sdf::PrimSpec {
                specifier,
                type_name,
                name: name.clone(),
                metas,
                ..Default::default()
            },
        });

        let parent_path = self.prim_path.clone();
        self.prim_path = parent_path.append_element(&name)?;
        log::debug!("Prim #{index} {} {}", specifier, self.prim_path);

        let mut props = PropertyMap::new();
        loop {
            self.skip();

            if self.cur.maybe_char('}') {
                break;
            }

            ensure!(!self.cur.eof(), "Unexpected end of prim body");

            if self.at_specifier() {
                let child = self
                    .parse_block(Some(index))
                    .context("Unable to read nested primitive")?;
                self.nodes[index].children.push(child);
            } else if self.cur.maybe_keyword("variantSet") {
                self.parse_variant_set(index)?;
            } else {
                self.parse_prim_props(&mut props)
                    .with_context(|| format!("Unable to read property of {}", self.prim_path))?;
            }
        }

        self.nodes[index].spec.properties = props;
        self.prim_path = parent_path;

        Ok(index)
    }

    /// `variantSet "name" = { "variant" (metas)? { ... } ... }`
    fn parse_variant_set(&mut self, owner: usize) -> Result<()> {
        self.cur.skip_whitespace();
        let set_name = self.cur.read_string_literal().context("Variant set name expected")?;

        self.skip();
        self.cur.expect('=')?;
        self.skip();
        self.cur.expect('{').context("Variant set must start with {")?;

        let mut set = BTreeMap::new();
        loop {
            self.skip();
            if self.cur.maybe_char('}') {
                break;
            }

            let variant_name = self
                .cur
                .read_string_literal()
                .with_context(|| format!("Variant name expected in variant set {set_name:?}"))?;

            self.skip();
            let metas = if self.cur.peek() == Some(b'(') {
                self.parse_prim_metas()?
            } else {
                Default::default()
            };

            self.skip();
            self.cur.expect('{').context("Variant body must start with {")?;

            let mut content = VariantContent {
                metas,
                ..Default::default()
            };

            loop {
                self.skip();
                if self.cur.maybe_char('}') {
                    break;
                }

                ensure!(!self.cur.eof(), "Unexpected end of variant body");

                if self.at_specifier() {
                    let child = self.parse_block(Some(owner))?;
                    content.children.push(child);
                } else if self.cur.maybe_keyword("variantSet") {
                    bail!("Nested variantSet is not supported");
                } else {
                    self.parse_prim_props(&mut content.properties)?;
                }
            }

            ensure!(
                !set.contains_key(&variant_name),
                "Variant {variant_name:?} is defined twice in variant set {set_name:?}"
            );
            set.insert(variant_name, content);
        }

        let sets = self.variants.entry(owner).or_default();
        ensure!(!sets.contains_key(&set_name), "Variant set {set_name:?} is defined twice");
        sets.insert(set_name, set);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::sdf::{Kind, UpAxis, Value};

    fn parse(text: &str) -> Result<Layer, ParseError> {
        Parser::new(text, ParserConfig::default()).parse()
    }

    #[test]
    fn parse_header() {
        assert!(parse("#usda 1.0\n").is_ok());
        assert!(parse("#usda 1.0 (written by hand)\n").is_ok());
        assert!(parse("#usda 2.0\n").is_err());
        assert!(parse("#usdc 1.0\n").is_err());
        assert!(parse("def Xform \"a\" {}").is_err());
    }

    #[test]
    fn parse_nested_prims() -> Result<()> {
        let layer = parse(
            r#"#usda 1.0

def Xform "Forest_set"
{
    def Xform "Outskirts"
    {
        # More deeply nested groups, bottoming out at references to other assemblies and components
    }

    def Xform "Glade"
    {
        # More deeply nested groups, bottoming out at references to other assemblies and components
    }
}
"#,
        )?;

        assert_eq!(layer.prims.len(), 1);

        let forest = &layer.prims[0];
        assert_eq!(forest.name, "Forest_set");
        assert_eq!(
            forest.children.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["Outskirts", "Glade"]
        );

        assert!(layer.find_prim(&sdf::path("/Forest_set/Glade")?).is_some());

        Ok(())
    }

    #[test]
    fn end_to_end() -> Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();

        let data = fs::read_to_string("fixtures/end_to_end.usda")?;
        let layer = parse(&data)?;

        assert_eq!(layer.metas.default_prim.as_deref(), Some("root"));
        assert_eq!(layer.metas.up_axis, Some(UpAxis::Y));

        assert_eq!(layer.prims.len(), 1);
        let root = &layer.prims[0];
        assert_eq!(root.specifier, Specifier::Def);
        assert_eq!(root.type_name, "Xform");
        assert_eq!(root.metas.kind, Some(Kind::Component));

        assert_eq!(root.children.len(), 1);
        let ball = &root.children[0];
        assert_eq!(ball.name, "ball");
        assert_eq!(ball.type_name, "Sphere");
        assert_eq!(ball.property("radius").and_then(|p| p.value()), Some(&Value::Double(2.0)));

        Ok(())
    }

    #[test]
    fn variant_children_stay_in_variant() -> Result<()> {
        let layer = parse(
            r#"#usda 1.0
def Xform "p" {
    variantSet "v" = {
        "a" { def Xform "c" {} }
    }
}
"#,
        )?;

        let p = &layer.prims[0];
        assert!(p.children.is_empty());

        let variant = p.variant("v", "a").context("variant v/a")?;
        assert_eq!(variant.children.len(), 1);
        assert_eq!(variant.children[0].name, "c");

        Ok(())
    }

    #[test]
    fn variants_fixture() -> Result<()> {
        let data = fs::read_to_string("fixtures/variants.usda")?;
        let layer = parse(&data)?;

        let model = layer.root("Model").context("Model prim")?;
        assert_eq!(
            model.metas.variants.as_ref().and_then(|v| v.get("shadingVariant")).map(String::as_str),
            Some("red")
        );
        assert_eq!(
            model.metas.variant_sets.as_ref().map(|v| v.items.clone()),
            Some(vec!["shadingVariant".to_string()])
        );

        let sets = &model.variant_sets["shadingVariant"];
        assert_eq!(sets.keys().collect::<Vec<_>>(), vec!["blue", "green", "red"]);

        let red = &sets["red"];
        assert_eq!(red.metas.doc.as_deref(), Some("Red variant"));
        assert_eq!(
            red.properties.get("displayColor").and_then(|p| p.value()),
            Some(&Value::Array(sdf::ValueType::Color3f, vec![Value::Color3f([1.0, 0.0, 0.0])]))
        );
        assert_eq!(sets["blue"].children[0].name, "Decal");

        // Direct children are unaffected by variant content.
        assert_eq!(
            model.children.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["Geom"]
        );

        Ok(())
    }

    #[test]
    fn nested_variant_set_is_an_error() {
        let result = parse(
            r#"#usda 1.0
def "p" {
    variantSet "v" = {
        "a" {
            variantSet "w" = { "b" {} }
        }
    }
}
"#,
        );

        let err = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("Nested variantSet"), "{err}");
    }

    #[test]
    fn error_has_position() {
        let result = parse("#usda 1.0\ndef Xform \"root\" {\n    float a = abc\n}\n");

        let err = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.starts_with("USDA source near line 3, col 15:"), "{err}");
    }

    #[test]
    fn invalid_prim_names() {
        assert!(parse("#usda 1.0\ndef \"1abc\" {}\n").is_err());
        assert!(parse("#usda 1.0\ndef \"\" {}\n").is_err());
        assert!(parse("#usda 1.0\ndefine \"a\" {}\n").is_err());
        assert!(parse("#usda 1.0\ndef \"a\" {\n").is_err());
    }

    #[test]
    fn typeless_and_specifiers() -> Result<()> {
        let layer = parse("#usda 1.0\nover \"a\" {}\nclass \"_b\" {}\ndef \"c\" {}\n")?;

        let specs = layer.prims.iter().map(|p| (p.specifier, p.type_name.as_str())).collect::<Vec<_>>();
        assert_eq!(
            specs,
            vec![(Specifier::Over, ""), (Specifier::Class, ""), (Specifier::Def, "")]
        );

        Ok(())
    }
}
