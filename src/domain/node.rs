//! Tree model: typed leaves, named groups and ordered groups

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;

use crate::domain::error::{DomainError, DomainResult};

/// Element type of a leaf, parsed from numpy-style dtype tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Bool,
    Int { bytes: u8 },
    UInt { bytes: u8 },
    Float { bytes: u8 },
    /// Fixed-width byte string (`S<n>`)
    FixedBytes { width: usize },
    Text,
}

impl ElementType {
    pub fn is_fixed_bytes(&self) -> bool {
        matches!(self, ElementType::FixedBytes { .. })
    }
}

impl FromStr for ElementType {
    type Err = DomainError;

    /// Parse a dtype tag such as `<i8`, `f4`, `|S16`, `bool` or `str`.
    fn from_str(s: &str) -> DomainResult<Self> {
        let unknown = || DomainError::UnknownElementType(s.to_string());
        let tag = s.trim().trim_start_matches(&['<', '>', '=', '|'][..]);

        match tag {
            "" => return Err(unknown()),
            "bool" | "b1" | "?" => return Ok(ElementType::Bool),
            "str" | "U" => return Ok(ElementType::Text),
            _ => {}
        }

        let mut chars = tag.chars();
        let kind = chars.next().ok_or_else(unknown)?;
        let size = chars.as_str();
        match kind {
            'i' | 'u' | 'f' => {
                let bytes: u8 = size.parse().map_err(|_| unknown())?;
                let valid = match kind {
                    'f' => matches!(bytes, 2 | 4 | 8),
                    _ => matches!(bytes, 1 | 2 | 4 | 8),
                };
                if !valid {
                    return Err(unknown());
                }
                Ok(match kind {
                    'i' => ElementType::Int { bytes },
                    'u' => ElementType::UInt { bytes },
                    _ => ElementType::Float { bytes },
                })
            }
            'S' => match size.parse::<usize>() {
                Ok(width) if width > 0 => Ok(ElementType::FixedBytes { width }),
                _ => Err(unknown()),
            },
            'U' => size
                .parse::<usize>()
                .map(|_| ElementType::Text)
                .map_err(|_| unknown()),
            _ => Err(unknown()),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Bool => write!(f, "bool"),
            ElementType::Int { bytes } => write!(f, "i{bytes}"),
            ElementType::UInt { bytes } => write!(f, "u{bytes}"),
            ElementType::Float { bytes } => write!(f, "f{bytes}"),
            ElementType::FixedBytes { width } => write!(f, "S{width}"),
            ElementType::Text => write!(f, "str"),
        }
    }
}

/// Flat, row-major element storage of a leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Elements {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    UInt(Vec<u64>),
    Float(Vec<f64>),
    Bytes(Vec<Vec<u8>>),
    Text(Vec<String>),
}

impl Elements {
    pub fn len(&self) -> usize {
        match self {
            Elements::Bool(v) => v.len(),
            Elements::Int(v) => v.len(),
            Elements::UInt(v) => v.len(),
            Elements::Float(v) => v.len(),
            Elements::Bytes(v) => v.len(),
            Elements::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render every element for display.
    pub fn render(&self) -> Vec<String> {
        match self {
            Elements::Bool(v) => v.iter().map(|x| x.to_string()).collect(),
            Elements::Int(v) => v.iter().map(|x| x.to_string()).collect(),
            Elements::UInt(v) => v.iter().map(|x| x.to_string()).collect(),
            Elements::Float(v) => v.iter().map(|x| format!("{x:?}")).collect(),
            Elements::Bytes(v) => v
                .iter()
                .map(|x| format!("b\"{}\"", x.escape_ascii()))
                .collect(),
            Elements::Text(v) => v.iter().map(|x| format!("{x:?}")).collect(),
        }
    }

    /// Check that the storage variant matches `dtype`.
    fn check_dtype(&self, dtype: ElementType) -> DomainResult<()> {
        let matches = match (self, dtype) {
            (Elements::Bool(_), ElementType::Bool)
            | (Elements::Int(_), ElementType::Int { .. })
            | (Elements::UInt(_), ElementType::UInt { .. })
            | (Elements::Float(_), ElementType::Float { .. })
            | (Elements::Text(_), ElementType::Text) => true,
            (Elements::Bytes(v), ElementType::FixedBytes { width }) => {
                if let Some(long) = v.iter().find(|b| b.len() > width) {
                    return Err(DomainError::InvalidLeaf {
                        reason: format!(
                            "byte string of length {} exceeds width {}",
                            long.len(),
                            width
                        ),
                    });
                }
                true
            }
            _ => false,
        };
        if matches {
            Ok(())
        } else {
            Err(DomainError::InvalidLeaf {
                reason: format!("elements do not match element type {dtype}"),
            })
        }
    }
}

/// A scalar or fixed-shape array of one primitive element type.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    dtype: ElementType,
    shape: Vec<usize>,
    elements: Elements,
}

impl Leaf {
    /// Build a leaf, validating element type and shape.
    ///
    /// An empty `shape` is a scalar holding exactly one element.
    pub fn new(dtype: ElementType, shape: Vec<usize>, elements: Elements) -> DomainResult<Self> {
        elements.check_dtype(dtype)?;
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, dim| acc.checked_mul(*dim))
            .ok_or_else(|| DomainError::InvalidLeaf {
                reason: format!("shape {:?} overflows the element count", shape),
            })?;
        if expected != elements.len() {
            return Err(DomainError::InvalidLeaf {
                reason: format!(
                    "shape {:?} needs {} elements, got {}",
                    shape,
                    expected,
                    elements.len()
                ),
            });
        }
        Ok(Self {
            dtype,
            shape,
            elements,
        })
    }

    /// One-dimensional fixed-width byte strings, width taken from the longest value.
    pub fn fixed_bytes(values: Vec<Vec<u8>>) -> Self {
        let width = values.iter().map(Vec::len).max().unwrap_or(0).max(1);
        Self {
            dtype: ElementType::FixedBytes { width },
            shape: vec![values.len()],
            elements: Elements::Bytes(values),
        }
    }

    pub fn dtype(&self) -> ElementType {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn elements(&self) -> &Elements {
        &self.elements
    }

    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    /// Decode fixed-width byte strings to text, element-wise.
    ///
    /// Trailing NUL padding is dropped. Leaves of any other element type are
    /// returned unchanged.
    pub fn decode_text(self, path: &str) -> DomainResult<Self> {
        let values = match self.elements {
            Elements::Bytes(values) => values,
            _ => return Ok(self),
        };
        let text = values
            .into_iter()
            .map(|raw| {
                let end = raw.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
                let mut raw = raw;
                raw.truncate(end);
                String::from_utf8(raw).map_err(|e| DomainError::InvalidText {
                    path: path.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(Self {
            dtype: ElementType::Text,
            shape: self.shape,
            elements: Elements::Text(text),
        })
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self.elements.render();
        if self.is_scalar() {
            return write!(f, "{}", rendered.join(""));
        }
        write!(f, "[{}]", rendered.iter().join(", "))?;
        if self.shape.len() > 1 {
            write!(f, " (shape {})", self.shape.iter().join("x"))?;
        }
        Ok(())
    }
}

impl From<bool> for Leaf {
    fn from(value: bool) -> Self {
        Self {
            dtype: ElementType::Bool,
            shape: vec![],
            elements: Elements::Bool(vec![value]),
        }
    }
}

impl From<i64> for Leaf {
    fn from(value: i64) -> Self {
        Self {
            dtype: ElementType::Int { bytes: 8 },
            shape: vec![],
            elements: Elements::Int(vec![value]),
        }
    }
}

impl From<u64> for Leaf {
    fn from(value: u64) -> Self {
        Self {
            dtype: ElementType::UInt { bytes: 8 },
            shape: vec![],
            elements: Elements::UInt(vec![value]),
        }
    }
}

impl From<f64> for Leaf {
    fn from(value: f64) -> Self {
        Self {
            dtype: ElementType::Float { bytes: 8 },
            shape: vec![],
            elements: Elements::Float(vec![value]),
        }
    }
}

impl From<&str> for Leaf {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<String> for Leaf {
    fn from(value: String) -> Self {
        Self {
            dtype: ElementType::Text,
            shape: vec![],
            elements: Elements::Text(vec![value]),
        }
    }
}

impl From<Vec<i64>> for Leaf {
    fn from(values: Vec<i64>) -> Self {
        Self {
            dtype: ElementType::Int { bytes: 8 },
            shape: vec![values.len()],
            elements: Elements::Int(values),
        }
    }
}

impl From<Vec<f64>> for Leaf {
    fn from(values: Vec<f64>) -> Self {
        Self {
            dtype: ElementType::Float { bytes: 8 },
            shape: vec![values.len()],
            elements: Elements::Float(values),
        }
    }
}

/// Node of a nested key-value tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(Leaf),
    /// Named children; order carries no meaning
    Group(BTreeMap<String, Node>),
    /// Children indexed `0..n-1`
    OrderedGroup(Vec<Node>),
}

impl Node {
    /// Build a group from `(name, child)` pairs.
    pub fn group<I, K, N>(children: I) -> Self
    where
        I: IntoIterator<Item = (K, N)>,
        K: Into<String>,
        N: Into<Node>,
    {
        Node::Group(
            children
                .into_iter()
                .map(|(k, n)| (k.into(), n.into()))
                .collect(),
        )
    }

    /// Build an ordered group from its elements.
    pub fn ordered<I, N>(children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        Node::OrderedGroup(children.into_iter().map(Into::into).collect())
    }

    /// Child by name; ordered groups are addressed by decimal index.
    pub fn get(&self, name: &str) -> Option<&Node> {
        match self {
            Node::Leaf(_) => None,
            Node::Group(children) => children.get(name),
            Node::OrderedGroup(children) => name
                .parse::<usize>()
                .ok()
                .and_then(|i| children.get(i)),
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Node::Leaf(_) => "leaf",
            Node::Group(_) => "group",
            Node::OrderedGroup(_) => "ordered group",
        }
    }
}

impl From<Leaf> for Node {
    fn from(leaf: Leaf) -> Self {
        Node::Leaf(leaf)
    }
}
