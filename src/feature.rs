//! The feature-collection contract between the conversion core and the storage that hosts it.
//!
//! A [`FeatureSource`] yields [`Record`]s: a shape plus named attribute values.
//! A [`FeatureSink`] is first given a declared schema and then accepts records matching it.
//! Physical storage, spatial reference metadata and on-disk formats belong to the implementors.
//! In-memory implementations are provided for hosts that assemble features themselves.
use crate::*;
use std::{cmp, collections::VecDeque, convert::Infallible, fmt, hash};

/// An attribute value read from, or written to, a feature collection.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum AttrValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl AttrValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(i) => Some(*i as f64),
            AttrValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integers, and floats holding an integral value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            AttrValue::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Some(*f as i64),
            _ => None,
        }
    }

    /// The value rendered as text; `Null` has no text.
    pub fn to_text(&self) -> Option<String> {
        (!self.is_null()).then(|| self.to_string())
    }

    /// A total ordering: `Null` sorts first, numbers compare by value, text sorts last.
    pub fn total_cmp(&self, other: &Self) -> cmp::Ordering {
        use AttrValue::*;
        use cmp::Ordering::*;

        match (self, other) {
            (Null, Null) => Equal,
            (Null, _) => Less,
            (_, Null) => Greater,
            (Int(a), Int(b)) => a.cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (Text(_), _) => Greater,
            (_, Text(_)) => Less,
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => Equal,
            },
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AttrValue::Null => Ok(()),
            AttrValue::Int(i) => write!(f, "{}", i),
            AttrValue::Float(x) => write!(f, "{}", x),
            AttrValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Grouping equality. Unlike [`AttrValue::total_cmp`], an integer never equals a float, and
/// floats compare by bit pattern (with `-0.0 == 0.0`) so that `NaN` keys still form a group.
impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        use AttrValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => (a + 0.0).to_bits() == (b + 0.0).to_bits(),
            (Text(a), Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for AttrValue {}

impl hash::Hash for AttrValue {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            AttrValue::Null => (),
            AttrValue::Int(i) => i.hash(state),
            AttrValue::Float(f) => (f + 0.0).to_bits().hash(state),
            AttrValue::Text(s) => s.hash(state),
        }
    }
}

impl From<i64> for AttrValue {
    fn from(x: i64) -> Self {
        AttrValue::Int(x)
    }
}
impl From<i32> for AttrValue {
    fn from(x: i32) -> Self {
        AttrValue::Int(x.into())
    }
}
impl From<f64> for AttrValue {
    fn from(x: f64) -> Self {
        AttrValue::Float(x)
    }
}
impl From<&str> for AttrValue {
    fn from(x: &str) -> Self {
        AttrValue::Text(x.to_string())
    }
}
impl From<String> for AttrValue {
    fn from(x: String) -> Self {
        AttrValue::Text(x)
    }
}
impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(x: Option<T>) -> Self {
        x.map(Into::into).unwrap_or(AttrValue::Null)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FieldType {
    Long,
    Double,
    Text,
}

impl FieldType {
    /// Returns if `value` may be stored in a field of this type. `Null` fits every type.
    pub fn accepts(&self, value: &AttrValue) -> bool {
        use AttrValue::*;
        matches!(
            (self, value),
            (_, Null)
                | (FieldType::Long, Int(_))
                | (FieldType::Double, Int(_) | Float(_))
                | (FieldType::Text, Text(_))
        )
    }
}

/// A declared field: name, type, and an optional maximum text length.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldType,
    pub length: Option<usize>,
}

impl FieldDef {
    pub fn long(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldType::Long,
            length: None,
        }
    }

    pub fn double(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldType::Double,
            length: None,
        }
    }

    pub fn text(name: impl Into<String>, length: Option<usize>) -> Self {
        Self {
            name: name.into(),
            kind: FieldType::Text,
            length,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GeometryKind {
    Point,
    Polyline,
    Polygon,
}

/// The geometry type of a feature collection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ShapeType {
    pub kind: GeometryKind,
    pub has_z: bool,
    pub has_m: bool,
}

impl ShapeType {
    pub fn new(kind: GeometryKind) -> Self {
        Self {
            kind,
            has_z: false,
            has_m: false,
        }
    }

    pub fn with_zm(self, has_z: bool, has_m: bool) -> Self {
        Self {
            has_z,
            has_m,
            ..self
        }
    }
}

/// A stored geometry.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Shape {
    Point(Vertex),
    Polyline(Vec<Vertex>),
    Polygon(Vec<Ring>),
}

impl Shape {
    /// The first coordinate of the geometry, if it has any.
    pub fn first_vertex(&self) -> Option<Vertex> {
        match self {
            Shape::Point(v) => Some(*v),
            Shape::Polyline(vs) => vs.first().copied(),
            Shape::Polygon(rs) => rs.iter().flat_map(Ring::iter).next().copied(),
        }
    }
}

/// One feature: object id, optional shape, and attribute values by field name.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Record {
    pub oid: i64,
    pub shape: Option<Shape>,
    pub attributes: HashMap<String, AttrValue>,
}

impl Record {
    pub fn new(oid: i64, shape: Option<Shape>) -> Self {
        Self {
            oid,
            shape,
            attributes: HashMap::default(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// The value of an attribute; absent attributes read as `None`.
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }
}

/// Yields feature records one at a time.
pub trait FeatureSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn shape_type(&self) -> ShapeType;

    /// The attribute fields every record may carry.
    fn fields(&self) -> &[FieldDef];

    /// The next record, `None` once exhausted.
    fn next_record(&mut self) -> Option<Result<Record, Self::Error>>;

    fn has_field(&self, name: &str) -> bool {
        self.fields().iter().any(|f| f.name == name)
    }
}

/// Stores feature records against a schema declared up front.
pub trait FeatureSink {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Declare the geometry type and fields of the records that follow.
    fn create(&mut self, shape_type: ShapeType, fields: &[FieldDef]) -> Result<(), Self::Error>;

    fn insert(&mut self, record: Record) -> Result<(), Self::Error>;
}

/// A feature source over records held in memory.
#[derive(Clone, Debug)]
pub struct MemorySource {
    shape_type: ShapeType,
    fields: Vec<FieldDef>,
    records: VecDeque<Record>,
    reads: usize,
}

impl MemorySource {
    pub fn new<I>(shape_type: ShapeType, fields: Vec<FieldDef>, records: I) -> Self
    where
        I: IntoIterator<Item = Record>,
    {
        Self {
            shape_type,
            fields,
            records: records.into_iter().collect(),
            reads: 0,
        }
    }

    /// How many records have been pulled so far.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl FeatureSource for MemorySource {
    type Error = Infallible;

    fn shape_type(&self) -> ShapeType {
        self.shape_type
    }

    fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    fn next_record(&mut self) -> Option<Result<Record, Self::Error>> {
        let r = self.records.pop_front()?;
        self.reads += 1;
        Some(Ok(r))
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum MemorySinkError {
    #[error("records inserted before a schema was declared")]
    NotCreated,
    #[error("schema declared twice")]
    AlreadyCreated,
    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),
    #[error("field `{0}` is not in the declared schema")]
    UnknownField(String),
    #[error("value for field `{0}` does not match its declared type")]
    TypeMismatch(String),
    #[error("value for field `{0}` exceeds its declared length")]
    TooLong(String),
}

/// A feature sink collecting records in memory, enforcing the declared schema.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    shape_type: Option<ShapeType>,
    fields: Vec<FieldDef>,
    records: Vec<Record>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shape_type(&self) -> Option<ShapeType> {
        self.shape_type
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl FeatureSink for MemorySink {
    type Error = MemorySinkError;

    fn create(&mut self, shape_type: ShapeType, fields: &[FieldDef]) -> Result<(), Self::Error> {
        if self.shape_type.is_some() {
            return Err(MemorySinkError::AlreadyCreated);
        }
        let mut seen = HashSet::default();
        if let Some(f) = fields.iter().find(|f| !seen.insert(f.name.as_str())) {
            return Err(MemorySinkError::DuplicateField(f.name.clone()));
        }

        self.shape_type = Some(shape_type);
        self.fields = fields.to_vec();
        Ok(())
    }

    fn insert(&mut self, record: Record) -> Result<(), Self::Error> {
        if self.shape_type.is_none() {
            return Err(MemorySinkError::NotCreated);
        }

        for (name, value) in &record.attributes {
            let field = self
                .fields
                .iter()
                .find(|f| &f.name == name)
                .ok_or_else(|| MemorySinkError::UnknownField(name.clone()))?;
            if !field.kind.accepts(value) {
                return Err(MemorySinkError::TypeMismatch(name.clone()));
            }
            if let (Some(max), AttrValue::Text(s)) = (field.length, value) {
                if s.chars().count() > max {
                    return Err(MemorySinkError::TooLong(name.clone()));
                }
            }
        }

        self.records.push(record);
        Ok(())
    }
}
