//! Metadata blocks: stage, prim and property metadata, dictionaries and
//! composition arcs.

use std::{collections::BTreeMap, str::FromStr};

use anyhow::{bail, ensure, Context, Result};

use crate::sdf::{
    self,
    schema::{self, Arity, MetaDef},
    ApiSchema, ApiSchemas, AttrMeta, Dictionary, Interpolation, Kind, LayerMetas, LayerOffset, ListEdit,
    ListEditQual, MetaVariable, Payload, PlaybackMode, PrimMeta, Reference, SubLayer, TypedValue, UpAxis, Value,
};

use super::{diag::Position, parser::Parser};

impl Parser<'_> {
    /// `{ (type name = value)* }`. Later duplicates replace earlier ones.
    pub(super) fn parse_dict(&mut self) -> Result<Dictionary> {
        self.cur.expect('{').context("Dictionary must start with {")?;

        let mut dict = Dictionary::new();
        loop {
            self.skip();
            if self.cur.maybe_char('}') {
                break;
            }

            ensure!(!self.cur.eof(), "Unexpected end of dictionary");

            let var = self.parse_dict_element()?;
            dict.insert(var);
        }

        Ok(dict)
    }

    /// `type ('[]')? (identifier | "string") = value`
    pub(super) fn parse_dict_element(&mut self) -> Result<MetaVariable> {
        let (ty, array) = self.read_type_name()?;
        ensure!(ty.is_attribute_type(), "Type {ty} is not allowed in a dictionary");

        self.cur.skip_whitespace();
        let name = match self.cur.maybe_string() {
            Some(name) => name,
            None => self.cur.read_identifier().context("Dictionary key expected")?,
        };

        self.cur.skip_whitespace();
        self.cur.expect('=')?;
        self.skip();

        let value = if self.cur.maybe_keyword("None") {
            Value::ValueBlock
        } else {
            self.parse_value(ty, array)
                .with_context(|| format!("Unable to parse value of {name:?}"))?
        };

        Ok(MetaVariable::new(name, value))
    }

    /// Optional `prepend`, `append`, `add`, `delete` or `reorder`.
    pub(super) fn maybe_list_edit_qual(&mut self) -> ListEditQual {
        const QUALS: &[(&str, ListEditQual)] = &[
            ("prepend", ListEditQual::Prepend),
            ("append", ListEditQual::Append),
            ("add", ListEditQual::Add),
            ("delete", ListEditQual::Delete),
            ("reorder", ListEditQual::Order),
        ];

        for (keyword, qual) in QUALS {
            if self.cur.maybe_keyword(keyword) {
                self.cur.skip_whitespace();
                return *qual;
            }
        }

        ListEditQual::ResetToExplicit
    }

    /// Read a metadatum value according to its table entry.
    fn parse_meta_value(&mut self, def: &MetaDef) -> Result<Value> {
        if self.cur.maybe_keyword("None") {
            return Ok(Value::ValueBlock);
        }

        let array = match def.arity {
            Arity::Scalar => false,
            Arity::Array => true,
            Arity::ScalarOrArray => self.cur.peek() == Some(b'['),
        };

        self.parse_value(def.ty, array)
            .with_context(|| format!("Unable to parse value of `{}`", def.name))
    }

    /// `name =` prefix shared by every metadata block.
    fn read_meta_name(&mut self) -> Result<String> {
        let name = self.cur.read_identifier().context("Metadata name expected")?;
        self.cur.skip_whitespace();
        self.cur
            .expect('=')
            .with_context(|| format!("`=` expected after `{name}`"))?;
        self.skip();
        Ok(name)
    }

    pub(super) fn parse_stage_metas(&mut self) -> Result<LayerMetas> {
        self.cur.expect('(')?;

        let mut metas = LayerMetas::default();
        loop {
            self.skip();
            if self.cur.maybe_char(')') {
                break;
            }

            ensure!(!self.cur.eof(), "Unexpected end of stage metadata");

            if let Some(comment) = self.cur.maybe_string() {
                metas.comment = Some(comment);
                continue;
            }

            let pos = self.cur.position();
            let qual = self.maybe_list_edit_qual();
            let name = self.read_meta_name()?;

            let def = schema::stage_meta(&name).with_context(|| format!("Unsupported stage metadata: {name}"))?;
            ensure!(
                qual == ListEditQual::ResetToExplicit || name == "apiSchemas",
                "List edit qualifier `{qual}` is not allowed for `{name}`"
            );

            if name == "subLayers" {
                metas.sub_layers = self.parse_sub_layers()?;
                continue;
            }

            let value = self.parse_meta_value(def)?;
            ensure!(!value.is_blocked() || name == "apiSchemas", "`{name}` cannot be None");

            match name.as_str() {
                "doc" | "documentation" => metas.doc = Some(expect_str(&name, &value)?.to_string()),
                "comment" => metas.comment = Some(expect_str(&name, &value)?.to_string()),
                "defaultPrim" => metas.default_prim = Some(expect_str(&name, &value)?.to_string()),
                "upAxis" => {
                    let axis = expect_str(&name, &value)?;
                    metas.up_axis = Some(match UpAxis::from_str(axis) {
                        Ok(axis) => axis,
                        Err(_) if self.config.strict_up_axis => bail!("Invalid upAxis: {axis:?}"),
                        Err(_) => {
                            self.diag
                                .push_warning(pos, format!("Invalid upAxis {axis:?}, using Y"));
                            UpAxis::Y
                        }
                    });
                }
                "metersPerUnit" => metas.meters_per_unit = Some(expect_f64(&name, &value)?),
                "timeCodesPerSecond" => metas.time_codes_per_second = Some(expect_f64(&name, &value)?),
                "framesPerSecond" => metas.frames_per_second = Some(expect_f64(&name, &value)?),
                "startTimeCode" => metas.start_time_code = Some(expect_f64(&name, &value)?),
                "endTimeCode" => metas.end_time_code = Some(expect_f64(&name, &value)?),
                "autoPlay" => metas.auto_play = Some(expect::<bool>(&name, &value)?),
                "playbackMode" => {
                    let mode = expect_str(&name, &value)?;
                    metas.playback_mode =
                        Some(PlaybackMode::from_str(mode).with_context(|| format!("Invalid playbackMode: {mode:?}"))?);
                }
                "customLayerData" => metas.custom_layer_data = expect::<Dictionary>(&name, &value)?,
                "apiSchemas" => metas.api_schemas = Some(self.api_schemas(pos, qual, &value)?),
                _ => bail!("Unsupported stage metadata: {name}"),
            }
        }

        Ok(metas)
    }

    /// `[@a.usda@ (offset = 1; scale = 2), ...]` or a single asset.
    fn parse_sub_layers(&mut self) -> Result<Vec<SubLayer>> {
        fn sub_layer(parser: &mut Parser<'_>) -> Result<SubLayer> {
            let asset_path = parser.cur.parse_asset_identifier()?;
            parser.cur.skip_whitespace();

            let mut layer_offset = LayerOffset::default();
            if parser.cur.peek() == Some(b'(') {
                parser.parse_arc_options(&mut layer_offset, None)?;
            }

            Ok(SubLayer {
                asset_path,
                layer_offset,
            })
        }

        if self.cur.peek() != Some(b'[') {
            return Ok(vec![sub_layer(self)?]);
        }

        let mut layers = Vec::new();
        self.cur.expect('[')?;
        loop {
            self.skip();
            if self.cur.maybe_char(']') {
                break;
            }

            layers.push(sub_layer(self)?);

            self.skip();
            if !self.cur.maybe_char(',') {
                self.cur.expect(']').context("Either comma or closing bracket expected")?;
                break;
            }
        }

        Ok(layers)
    }

    /// `( offset = N; scale = N; customData = {...} )` after an arc.
    ///
    /// `customData` is only valid for references.
    fn parse_arc_options(&mut self, offset: &mut LayerOffset, mut custom_data: Option<&mut Dictionary>) -> Result<()> {
        self.cur.expect('(')?;

        loop {
            self.cur.skip_comment_and_whitespace_and_newline(true);
            if self.cur.maybe_char(')') {
                break;
            }

            let name = self.read_meta_name()?;
            match name.as_str() {
                "offset" => offset.offset = self.read_basic()?,
                "scale" => offset.scale = self.read_basic()?,
                "customData" => {
                    let Some(dict) = custom_data.as_deref_mut() else {
                        bail!("`customData` is only allowed for references");
                    };
                    *dict = self.parse_dict()?;
                }
                _ => bail!("Unexpected `{name}` in layer offset"),
            }
        }

        Ok(())
    }

    /// `@asset@</Prim> (options)?`, either part may be omitted.
    pub(super) fn parse_reference(&mut self) -> Result<Reference> {
        let mut reference = Reference::default();
        let (asset_path, prim_path) = self.parse_arc_target()?;
        reference.asset_path = asset_path;
        reference.prim_path = prim_path;

        self.cur.skip_whitespace();
        if self.cur.peek() == Some(b'(') {
            self.parse_arc_options(&mut reference.layer_offset, Some(&mut reference.custom_data))?;
        }

        Ok(reference)
    }

    pub(super) fn parse_payload(&mut self) -> Result<Payload> {
        let mut payload = Payload::default();
        let (asset_path, prim_path) = self.parse_arc_target()?;
        payload.asset_path = asset_path;
        payload.prim_path = prim_path;

        self.cur.skip_whitespace();
        if self.cur.peek() == Some(b'(') {
            self.parse_arc_options(&mut payload.layer_offset, None)?;
        }

        Ok(payload)
    }

    fn parse_arc_target(&mut self) -> Result<(String, Option<sdf::Path>)> {
        let asset_path = if matches!(self.cur.peek(), Some(b'@' | b'"' | b'\'')) {
            self.cur.parse_asset_identifier()?
        } else {
            String::new()
        };

        self.cur.skip_whitespace();
        let prim_path = if self.cur.peek() == Some(b'<') {
            let raw = self.cur.read_path_identifier()?;
            Some(sdf::path(&raw).with_context(|| format!("Invalid prim path <{raw}>"))?)
        } else {
            None
        };

        ensure!(
            !asset_path.is_empty() || prim_path.is_some(),
            "Asset path or prim path expected"
        );

        Ok((asset_path, prim_path))
    }

    pub(super) fn parse_prim_metas(&mut self) -> Result<PrimMeta> {
        self.cur.expect('(')?;

        let mut metas = PrimMeta::default();
        loop {
            self.skip();
            if self.cur.maybe_char(')') {
                break;
            }

            ensure!(!self.cur.eof(), "Unexpected end of prim metadata");

            if let Some(comment) = self.cur.maybe_string() {
                metas.comment = Some(comment);
                continue;
            }

            let pos = self.cur.position();
            let qual = self.maybe_list_edit_qual();
            let name = self.read_meta_name()?;

            let Some(def) = schema::prim_meta(&name) else {
                // Unknown metadata is kept as raw text.
                let raw = self.cur.read_until_newline();
                log::debug!("Unregistered prim metadata `{name}`");
                metas.unregistered.insert(name, raw.trim_end().to_string());
                continue;
            };

            let value = self.parse_meta_value(def)?;
            self.set_prim_meta(&mut metas, pos, qual, def, value)
                .with_context(|| format!("Invalid `{name}` metadata"))?;
        }

        Ok(metas)
    }

    fn set_prim_meta(
        &mut self,
        metas: &mut PrimMeta,
        pos: Position,
        qual: ListEditQual,
        def: &MetaDef,
        value: Value,
    ) -> Result<()> {
        let name = def.name;

        let is_list = matches!(
            name,
            "references" | "payload" | "inherits" | "specializes" | "variantSets" | "apiSchemas"
        );

        if is_list {
            ensure_explicit_when_empty(name, qual, &value)?;
        } else {
            ensure!(
                qual == ListEditQual::ResetToExplicit,
                "List edit qualifier `{qual}` is not allowed for `{name}`"
            );
            ensure!(!value.is_blocked(), "`{name}` cannot be None");
        }

        match name {
            "active" => metas.active = Some(expect(name, &value)?),
            "hidden" => metas.hidden = Some(expect(name, &value)?),
            "instanceable" => metas.instanceable = Some(expect(name, &value)?),
            "kind" => {
                let kind = expect_str(name, &value)?;
                metas.kind = Kind::from_str(kind).ok();
            }
            "doc" => metas.doc = Some(expect(name, &value)?),
            "comment" => metas.comment = Some(expect(name, &value)?),
            "sceneName" => metas.scene_name = Some(expect(name, &value)?),
            "displayName" => metas.display_name = Some(expect(name, &value)?),

            "assetInfo" => metas.asset_info = Some(expect(name, &value)?),
            "customData" => metas.custom_data = Some(expect(name, &value)?),
            "sdrMetadata" => metas.sdr_metadata = Some(expect(name, &value)?),
            "clips" => metas.clips = Some(expect(name, &value)?),

            "variants" => {
                let dict = expect::<Dictionary>(name, &value)?;
                let mut selection = BTreeMap::new();
                for var in &dict {
                    let Some(selected) = var.get_value::<String>() else {
                        bail!("Variant selection `{}` must be a string, got {}", var.name, var.type_name());
                    };
                    selection.insert(var.name.clone(), selected);
                }
                metas.variants = Some(selection);
            }

            "references" => metas.references = Some(ListEdit::new(qual, list_items(name, value)?)),
            "payload" => {
                let items = if value.is_blocked() {
                    // `payload = None` is a single empty payload.
                    vec![Payload::default()]
                } else {
                    list_items(name, value)?
                };
                metas.payload = Some(ListEdit::new(qual, items));
            }
            "inherits" => metas.inherits = Some(ListEdit::new(qual, list_items(name, value)?)),
            "specializes" => metas.specializes = Some(ListEdit::new(qual, list_items(name, value)?)),
            "variantSets" => metas.variant_sets = Some(ListEdit::new(qual, list_items(name, value)?)),
            "apiSchemas" => metas.api_schemas = Some(self.api_schemas(pos, qual, &value)?),

            _ => bail!("Unsupported prim metadata: {name}"),
        }

        Ok(())
    }

    /// `token[]` of allow-listed schema names.
    fn api_schemas(&mut self, pos: Position, qual: ListEditQual, value: &Value) -> Result<ApiSchemas> {
        ensure!(
            matches!(qual, ListEditQual::ResetToExplicit | ListEditQual::Prepend),
            "Only `prepend` or explicit apiSchemas are supported, got `{qual}`"
        );
        ensure_explicit_when_empty("apiSchemas", qual, value)?;

        let mut names = Vec::new();
        if !value.is_blocked() {
            let items = value.as_array().context("apiSchemas must be token[]")?;
            for item in items {
                let token = item.as_token().context("apiSchemas must be token[]")?;
                match ApiSchema::from_str(token) {
                    Ok(schema) => names.push(schema),
                    Err(_) if self.config.allow_unknown_api_schema => {
                        self.diag
                            .push_warning(pos, format!("Unsupported API schema {token:?} is ignored"));
                    }
                    Err(_) => bail!("Unsupported API schema: {token:?}"),
                }
            }
        }

        Ok(ApiSchemas { qual, names })
    }

    /// `( (comment | name = value)* )` after a property.
    pub(super) fn parse_attr_meta(&mut self) -> Result<AttrMeta> {
        self.cur.expect('(')?;

        let mut metas = AttrMeta::default();
        loop {
            self.skip();
            if self.cur.maybe_char(')') {
                break;
            }

            ensure!(!self.cur.eof(), "Unexpected end of property metadata");

            if let Some(comment) = self.cur.maybe_string() {
                metas.comments.push(comment);
                continue;
            }

            let pos = self.cur.position();
            let name = self.read_meta_name()?;
            let def = schema::prop_meta(&name).with_context(|| format!("Unsupported property metadata: {name}"))?;

            let value = self.parse_meta_value(def)?;
            ensure!(!value.is_blocked(), "`{name}` cannot be None");

            let name = def.name;
            match name {
                "interpolation" => {
                    let token = expect_str(name, &value)?;
                    metas.interpolation = Some(
                        Interpolation::from_str(token).with_context(|| format!("Invalid interpolation: {token:?}"))?,
                    );
                }
                "elementSize" => metas.element_size = Some(expect(name, &value)?),
                "active" => metas.active = Some(expect(name, &value)?),
                "hidden" => metas.hidden = Some(expect(name, &value)?),
                "doc" => metas.doc = Some(expect(name, &value)?),
                "displayName" => metas.display_name = Some(expect(name, &value)?),
                "weight" => metas.weight = Some(expect(name, &value)?),
                "customData" => metas.custom_data = Some(expect(name, &value)?),
                "sdrMetadata" => metas.sdr_metadata = Some(expect(name, &value)?),
                "colorSpace" => metas.color_space = Some(expect_str(name, &value)?.to_string()),
                "bindMaterialAs" => {
                    let token = expect_str(name, &value)?;
                    if !schema::BIND_MATERIAL_AS.contains(&token) {
                        self.diag
                            .push_warning(pos, format!("Unsupported bindMaterialAs value {token:?}"));
                    }
                    metas.bind_material_as = Some(token.to_string());
                }
                "connectability" => metas.connectability = Some(expect_str(name, &value)?.to_string()),
                "renderType" => metas.render_type = Some(expect_str(name, &value)?.to_string()),
                "outputName" => metas.output_name = Some(expect_str(name, &value)?.to_string()),
                _ => bail!("Unsupported property metadata: {name}"),
            }
        }

        Ok(metas)
    }
}

fn expect<T: TypedValue>(name: &str, value: &Value) -> Result<T> {
    value
        .get::<T>()
        .with_context(|| format!("`{name}` must be {}, got {}", T::value_type(), value.type_name()))
}

fn expect_str<'v>(name: &str, value: &'v Value) -> Result<&'v str> {
    value
        .as_str()
        .with_context(|| format!("`{name}` must be a string or token, got {}", value.type_name()))
}

fn expect_f64(name: &str, value: &Value) -> Result<f64> {
    value
        .to_f64()
        .with_context(|| format!("`{name}` must be a number, got {}", value.type_name()))
}

/// An empty or `None` list edit must be explicit.
fn ensure_explicit_when_empty(name: &str, qual: ListEditQual, value: &Value) -> Result<()> {
    let empty = value.is_blocked() || value.as_array().is_some_and(<[Value]>::is_empty);
    ensure!(
        !empty || qual == ListEditQual::ResetToExplicit,
        "`{qual} {name}` with an empty or None value is not allowed"
    );
    Ok(())
}

/// Single value, array, or `None` (empty list).
fn list_items<T: TypedValue>(name: &str, value: Value) -> Result<Vec<T>> {
    let items = match value {
        Value::ValueBlock => return Ok(Vec::new()),
        Value::Array(_, items) => items,
        single => vec![single],
    };

    items
        .iter()
        .map(|item| {
            T::from_value(item).with_context(|| {
                format!(
                    "`{name}` expects {} items, got {}",
                    T::value_type(),
                    item.type_name()
                )
            })
        })
        .collect()
}
