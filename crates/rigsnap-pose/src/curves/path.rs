//! Animation data paths.
//!
//! Curves address bone channels as `pose.bones["<bone>"].<prop>` and custom
//! properties as `pose.bones["<bone>"]["<prop>"]`.

use crate::rig::TransformProp;

const BONES_PREFIX: &str = "pose.bones[";

/// A parsed data path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataPath {
    /// A transform channel of a bone.
    Transform { bone: String, prop: TransformProp },
    /// A custom property of a bone.
    Custom { bone: String, prop: String },
    /// Anything the engine does not animate.
    Other(String),
}

impl DataPath {
    /// Parses a data path string.
    pub fn parse(path: &str) -> DataPath {
        parse_bone_path(path).unwrap_or_else(|| DataPath::Other(path.to_string()))
    }

    /// Bone the path belongs to, if any.
    pub fn bone(&self) -> Option<&str> {
        match self {
            DataPath::Transform { bone, .. } | DataPath::Custom { bone, .. } => Some(bone),
            DataPath::Other(_) => None,
        }
    }
}

/// Quotes a name as a `["..."]` subscript.
pub fn quote_subscript(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    out.push_str("[\"");
    for c in name.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push_str("\"]");
    out
}

/// Path of a bone transform property.
pub fn bone_prop_path(bone: &str, prop: TransformProp) -> String {
    format!("pose.bones{}.{}", quote_subscript(bone), prop.path_name())
}

/// Path of a bone custom property.
pub fn bone_custom_prop_path(bone: &str, prop: &str) -> String {
    format!("pose.bones{}{}", quote_subscript(bone), quote_subscript(prop))
}

fn parse_bone_path(path: &str) -> Option<DataPath> {
    let rest = path.strip_prefix(BONES_PREFIX)?;
    let (bone, rest) = parse_quoted(rest)?;
    let rest = rest.strip_prefix(']')?;

    if let Some(name) = rest.strip_prefix('.') {
        let prop = TransformProp::from_path_name(name)?;
        return Some(DataPath::Transform { bone, prop });
    }

    let rest = rest.strip_prefix('[')?;
    let (prop, rest) = parse_quoted(rest)?;
    if rest != "]" {
        return None;
    }
    Some(DataPath::Custom { bone, prop })
}

/// Parses a `"..."` literal with backslash escapes, returning it and the remainder.
fn parse_quoted(input: &str) -> Option<(String, &str)> {
    let body = input.strip_prefix('"')?;
    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                let (_, escaped) = chars.next()?;
                out.push(escaped);
            }
            '"' => return Some((out, &body[i + 1..])),
            _ => out.push(c),
        }
    }
    None
}
