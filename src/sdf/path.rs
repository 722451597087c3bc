use std::{fmt, result, str::FromStr};

use anyhow::{bail, ensure, Context, Result};

#[inline]
pub fn path(str: impl AsRef<str>) -> Result<Path> {
    Path::from_str(str.as_ref())
}

/// `SdfPath` implementation.
///
/// # Syntax
/// - A slash ("/") following an identifier introduces a namespace child.
/// - A period (".") following an identifier introduces a property.
/// - A property may contain several non-sequential colons (':') to provide
/// a rudimentary namespace, but may not begin or end with a colon.
/// - Leading `../` components make the path relative to an ancestor prim.
///
/// The prim and property parts are stored separately, so `/A/B.c:d` is
/// `("/A/B", "c:d")`.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    prim: String,
    prop: String,
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prop.is_empty() {
            write!(f, "{}", self.prim)
        } else if self.prim == ".." || self.prim.ends_with("/..") {
            write!(f, "{}/.{}", self.prim, self.prop)
        } else {
            write!(f, "{}.{}", self.prim, self.prop)
        }
    }
}

impl FromStr for Path {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> result::Result<Path, Self::Err> {
        ensure!(!s.is_empty(), "Path cannot be empty");

        let (prim, prop) = split_prop(s)?;
        Path::new(prim, prop)
    }
}

/// Split `s` into prim and property parts at the property separator.
///
/// Leading `../` (and `./`) components are skipped, so their dots never
/// count as separators.
fn split_prop(s: &str) -> Result<(&str, &str)> {
    ensure!(s != ".", "`.` is not a valid path");

    let mut rest = s;
    while let Some(tail) = rest.strip_prefix("../").or_else(|| rest.strip_prefix("./")) {
        rest = tail;
    }
    if rest == ".." {
        return Ok((s, ""));
    }

    let offset = s.len() - rest.len();

    let Some(dot) = rest.rfind('.') else {
        return Ok((s, ""));
    };

    let prop = &rest[dot + 1..];
    ensure!(!prop.is_empty(), "Path cannot end with `.`: {s}");
    ensure!(!prop.contains('/'), "Property part cannot contain `/`: {s}");

    let mut prim = &s[..offset + dot];
    // "../.foo" => ("..", "foo")
    if prim.len() > 1 {
        prim = prim.trim_end_matches('/');
    }

    Ok((prim, prop))
}

impl Path {
    pub const DELIMITER: char = '/';
    pub const PROPERTY_DELIMITER: char = '.';
    pub const NS_DELIMITER_CHAR: char = ':';

    /// Build a path from separate prim and property parts, validating both.
    pub fn new(prim: &str, prop: &str) -> Result<Self> {
        Self::validate_prim_path(prim).with_context(|| format!("Invalid prim path: {prim:?}"))?;
        if !prop.is_empty() {
            Self::validate_prop_path(prop).with_context(|| format!("Invalid property name: {prop:?}"))?;
        }

        ensure!(
            !(prim.is_empty() && prop.is_empty()),
            "Path must have either prim or property part"
        );

        Ok(Self::from_parts_unchecked(prim, prop))
    }

    #[inline]
    pub fn abs_root() -> Path {
        Path::from_parts_unchecked("/", "")
    }

    fn from_parts_unchecked(prim: &str, prop: &str) -> Path {
        Path {
            prim: prim.to_string(),
            prop: prop.to_string(),
        }
    }

    #[inline]
    pub fn prim_part(&self) -> &str {
        &self.prim
    }

    #[inline]
    pub fn prop_part(&self) -> &str {
        &self.prop
    }

    #[inline]
    pub fn is_absolute(&self) -> bool {
        self.prim.starts_with(Self::DELIMITER)
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.prim == "/" && self.prop.is_empty()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.prim.is_empty() && self.prop.is_empty()
    }

    #[inline]
    pub fn is_prim_path(&self) -> bool {
        !self.prim.is_empty() && self.prop.is_empty()
    }

    #[inline]
    pub fn is_property_path(&self) -> bool {
        !self.prop.is_empty()
    }

    /// Returns the prim portion of this path.
    pub fn prim_path(&self) -> Path {
        Path::from_parts_unchecked(&self.prim, "")
    }

    /// Number of prim components of an absolute path (`/` is 0).
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        self.prim.split(Self::DELIMITER).filter(|s| !s.is_empty())
    }

    /// Last prim component, or the property name for property paths.
    pub fn element_name(&self) -> &str {
        if !self.prop.is_empty() {
            return &self.prop;
        }

        self.segments().last().unwrap_or_default()
    }

    /// Parent prim path. The root and empty paths have no parent.
    pub fn parent(&self) -> Option<Path> {
        if self.is_property_path() {
            return Some(self.prim_path());
        }

        if self.is_root() || self.prim.is_empty() {
            return None;
        }

        match self.prim.rsplit_once(Self::DELIMITER) {
            Some(("", _)) => Some(Path::abs_root()),
            Some((parent, _)) => Some(Path::from_parts_unchecked(parent, "")),
            None => None,
        }
    }

    pub fn append_property(&self, property: &str) -> Result<Path> {
        ensure!(!property.is_empty(), "Property name cannot be empty");
        ensure!(!self.is_property_path(), "Cannot append property to property path");
        Self::validate_prop_path(property)?;

        Ok(Path::from_parts_unchecked(&self.prim, property))
    }

    /// Append a child prim element.
    pub fn append_element(&self, name: &str) -> Result<Path> {
        ensure!(!self.is_property_path(), "Cannot append element to property path");
        ensure!(
            Self::is_valid_identifier(name),
            "Invalid prim element name: {name:?}"
        );

        let combined = if self.prim == "/" {
            format!("/{name}")
        } else {
            format!("{}/{}", self.prim, name)
        };

        Ok(Path::from_parts_unchecked(&combined, ""))
    }

    /// Validate the prim part: `/`-delimited identifiers.
    ///
    /// Relative paths may start with any number of `..` (or `.`) components.
    pub fn validate_prim_path(prim: &str) -> Result<()> {
        if prim.is_empty() || prim == "/" {
            return Ok(());
        }

        let abs_body = prim.strip_prefix(Self::DELIMITER);
        let body = abs_body.unwrap_or(prim);

        ensure!(!body.ends_with(Self::DELIMITER), "Prim path cannot end with `/`");

        let mut leading = abs_body.is_none();
        for segment in body.split(Self::DELIMITER) {
            if leading && (segment == ".." || segment == ".") {
                continue;
            }
            leading = false;

            ensure!(!segment.is_empty(), "Empty path component");
            ensure!(
                Self::is_valid_identifier(segment),
                "Invalid path component: {segment:?}"
            );
        }

        Ok(())
    }

    /// Validate the property part: `:`-namespaced identifiers.
    pub fn validate_prop_path(prop: &str) -> Result<()> {
        ensure!(!prop.is_empty(), "Property name cannot be empty");
        ensure!(
            !prop.starts_with(Self::NS_DELIMITER_CHAR),
            "Property name cannot start with `:`"
        );
        ensure!(
            !prop.ends_with(Self::NS_DELIMITER_CHAR),
            "Property name cannot end with `:`"
        );
        ensure!(!prop.contains("::"), "Property name cannot contain `::`");

        if !Self::is_valid_namespace_identifier(prop) {
            bail!("Invalid property name: {prop:?}");
        }

        Ok(())
    }

    /// Make this path absolute, using `base` as an anchor.
    ///
    /// - `base` must be an absolute prim path.
    /// - Absolute paths are returned as is.
    /// - `./` prefixes are rejected.
    /// - Each leading `../` strips one component of `base`. Climbing above
    ///   the pseudo root is an error.
    /// - Anything else is appended under `base`.
    pub fn resolve(&self, base: &Path) -> Result<Path> {
        ensure!(base.is_absolute(), "Base path must be absolute: {base}");

        if self.is_absolute() {
            return Ok(self.clone());
        }

        let rel = self.prim.as_str();

        ensure!(
            !(rel == "." || rel.starts_with("./")),
            "Path starting with `./` is not supported: {self}"
        );

        let prim = if rel == ".." || rel.starts_with("../") {
            let mut rest = rel;
            let mut count = 0;
            loop {
                if let Some(tail) = rest.strip_prefix("../") {
                    rest = tail;
                } else if rest == ".." {
                    rest = "";
                } else {
                    break;
                }
                count += 1;
            }

            ensure!(!rest.contains('.'), "Unexpected `.` after `../` in path: {self}");

            let depth = base.depth();
            ensure!(
                count <= depth,
                "`../` goes above the root: {} levels up from {base}",
                count
            );

            let mut resolved = String::new();
            for segment in base.segments().take(depth - count) {
                resolved.push(Self::DELIMITER);
                resolved.push_str(segment);
            }
            if !rest.is_empty() {
                resolved.push(Self::DELIMITER);
                resolved.push_str(rest);
            }
            if resolved.is_empty() {
                resolved.push(Self::DELIMITER);
            }

            resolved
        } else if rel.is_empty() {
            base.prim.clone()
        } else if base.prim == "/" {
            format!("/{rel}")
        } else {
            format!("{}/{}", base.prim, rel)
        };

        Ok(Path::from_parts_unchecked(&prim, &self.prop))
    }

    /// Validate identifier
    ///
    /// Rules are:
    /// - Must be at least 1 char long
    /// - Must start with a letter or underscore
    /// - Must contain only letters, underscores, and numbers.
    pub fn is_valid_identifier(name: &str) -> bool {
        if name.is_empty() {
            return false;
        }

        name.bytes().enumerate().all(|(i, c)| {
            c == b'_'
                || if i == 0 {
                    c.is_ascii_alphabetic()
                } else {
                    c.is_ascii_alphanumeric()
                }
        })
    }

    pub fn is_valid_namespace_identifier(name: &str) -> bool {
        name.split(Self::NS_DELIMITER_CHAR).all(Self::is_valid_identifier)
    }
}

/// Resolve `rel` against the absolute prim path `base`.
///
/// See [`Path::resolve`].
#[inline]
pub fn resolve_relative_path(base: &Path, rel: &Path) -> Result<Path> {
    rel.resolve(base)
}

impl TryFrom<&str> for Path {
    type Error = anyhow::Error;

    fn try_from(s: &str) -> result::Result<Path, Self::Error> {
        Path::from_str(s)
    }
}

impl TryFrom<String> for Path {
    type Error = anyhow::Error;

    fn try_from(value: String) -> result::Result<Self, Self::Error> {
        Path::from_str(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_parts() -> Result<()> {
        #[rustfmt::skip]
        let cases = [
            ("/", "/", ""),
            ("/A/B/C", "/A/B/C", ""),
            ("/A/B/C.foo", "/A/B/C", "foo"),
            ("/A/B/C.foo:bar:baz", "/A/B/C", "foo:bar:baz"),
            ("A/B", "A/B", ""),
            ("../C.foo", "../C", "foo"),
            ("../../C", "../../C", ""),
            ("../.foo", "..", "foo"),
            ("..", "..", ""),
            (".foo", "", "foo"),
        ];

        for (input, prim, prop) in cases {
            let path = Path::from_str(input)?;
            assert_eq!(path.prim_part(), prim, "Unable to parse: {}", input);
            assert_eq!(path.prop_part(), prop, "Unable to parse: {}", input);
            assert_eq!(path.to_string(), input);
        }

        Ok(())
    }

    #[test]
    fn test_invalid_paths() {
        #[rustfmt::skip]
        let cases = [
            "",
            ".",
            "/A.",
            "/A/B/",
            "/A//B",
            "/1abc",
            "/A.:foo",
            "/A.foo:",
            "/A.foo::bar",
            "/A.b/c",
            "/A/B C",
        ];

        for input in cases {
            assert!(Path::from_str(input).is_err(), "Must fail: {:?}", input);
        }
    }

    #[test]
    fn test_predicates() -> Result<()> {
        let root = Path::abs_root();
        assert!(root.is_root());
        assert!(root.is_absolute());
        assert!(root.is_prim_path());
        assert_eq!(root.depth(), 0);

        let prim = path("/World/Geom")?;
        assert!(prim.is_prim_path());
        assert!(!prim.is_property_path());
        assert_eq!(prim.depth(), 2);
        assert_eq!(prim.element_name(), "Geom");

        let prop = path("/World/Geom.points")?;
        assert!(prop.is_property_path());
        assert!(!prop.is_prim_path());
        assert_eq!(prop.prim_path(), prim);
        assert_eq!(prop.element_name(), "points");

        let rel = path("Geom")?;
        assert!(!rel.is_absolute());

        Ok(())
    }

    #[test]
    fn test_parent() -> Result<()> {
        assert_eq!(path("/A/B")?.parent(), Some(path("/A")?));
        assert_eq!(path("/A")?.parent(), Some(Path::abs_root()));
        assert_eq!(path("/A.b")?.parent(), Some(path("/A")?));
        assert_eq!(Path::abs_root().parent(), None);

        Ok(())
    }

    #[test]
    fn test_append() -> Result<()> {
        let base = path("/foo")?;

        assert_eq!(base.append_property("prop")?.to_string(), "/foo.prop");
        assert_eq!(base.append_property("prop:foo:bar")?.to_string(), "/foo.prop:foo:bar");
        assert!(base.append_property(":bad").is_err());

        assert_eq!(base.append_element("bar")?.to_string(), "/foo/bar");
        assert_eq!(Path::abs_root().append_element("bar")?.to_string(), "/bar");
        assert!(base.append_element("1bar").is_err());

        let prop = path("/foo.prop")?;
        assert!(prop.append_property("prop2").is_err());
        assert!(prop.append_element("child").is_err());

        Ok(())
    }

    #[test]
    fn test_resolve_relative() -> Result<()> {
        #[rustfmt::skip]
        let cases = [
            ("/root", "bora", "/root/bora"),
            ("/", "bora", "/bora"),
            ("/root/muda", "../bora", "/root/bora"),
            ("/root/muda", "../../bora", "/bora"),
            ("/root/muda", "..", "/root"),
            ("/root", "/abs/path", "/abs/path"),
            ("/root", "child.attr", "/root/child.attr"),
            ("/root/muda", "../bora.outputs:rgb", "/root/bora.outputs:rgb"),
            ("/root", ".attr", "/root.attr"),
        ];

        for (base, rel, expected) in cases {
            let resolved = resolve_relative_path(&path(base)?, &path(rel)?)?;
            assert_eq!(resolved.to_string(), expected, "{} + {}", base, rel);
        }

        Ok(())
    }

    #[test]
    fn test_resolve_relative_errors() -> Result<()> {
        let root = path("/root")?;

        assert!(resolve_relative_path(&root, &path("../../bora")?).is_err());
        assert!(resolve_relative_path(&root, &path("./x")?).is_err());
        assert!(resolve_relative_path(&path("/a/b/c")?, &path("./x")?).is_err());
        assert!(resolve_relative_path(&path("relative")?, &path("x")?).is_err());

        Ok(())
    }

    #[test]
    fn test_path_cmp() -> Result<()> {
        assert!(path("/aaa")? < path("/aab")?);
        assert!(path("/")? < path("/a")?);
        assert!(path("/aaa")? <= path("/aaa")?);

        Ok(())
    }

    #[test]
    fn validate_identifier() {
        // Valid identifiers
        assert!(Path::is_valid_identifier("_"));
        assert!(Path::is_valid_identifier("x"));
        assert!(Path::is_valid_identifier("_1"));
        assert!(Path::is_valid_identifier("a1"));
        assert!(Path::is_valid_identifier("test123"));
        assert!(Path::is_valid_identifier("teST"));

        // Invalid ones
        assert!(!Path::is_valid_identifier(""));
        assert!(!Path::is_valid_identifier(" "));
        assert!(!Path::is_valid_identifier("1"));
        assert!(!Path::is_valid_identifier("x!"));
        assert!(!Path::is_valid_identifier("te st"));
        assert!(!Path::is_valid_identifier("te.st"));
        assert!(!Path::is_valid_identifier("te:st"));
    }

    #[test]
    fn validate_namespace_identifier() {
        assert!(Path::is_valid_namespace_identifier("inputs:diffuseColor"));
        assert!(Path::is_valid_namespace_identifier("primvars:st:indices"));
        assert!(!Path::is_valid_namespace_identifier("inputs::x"));
        assert!(!Path::is_valid_namespace_identifier(":x"));
    }
}
