//! Response paths and the error object shape (`spec.md` §2 "Path & Error
//! Model", §6 "Error object").

use std::fmt;
use std::sync::Arc;

use crate::ast::Location;
use crate::value::Value;

/// One segment of a response [`Path`]: either a response field name or a
/// list index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(s) => write!(f, "{s}"),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

/// An immutable, structurally-shared response path.
///
/// Modeled as a linked list via `Arc` (mirroring the teacher's
/// `executor::FieldPath`) so that extending a path for a child field or list
/// index is O(1) and doesn't require cloning the whole ancestor chain on
/// every recursive step of the Value Completer.
#[derive(Debug, Clone, PartialEq)]
pub enum Path {
    Root,
    Segment(Arc<Path>, PathSegment),
}

impl Path {
    pub fn root() -> Arc<Path> {
        Arc::new(Path::Root)
    }

    pub fn push_field(self: &Arc<Self>, name: impl Into<String>) -> Arc<Path> {
        Arc::new(Path::Segment(self.clone(), PathSegment::Field(name.into())))
    }

    pub fn push_index(self: &Arc<Self>, index: usize) -> Arc<Path> {
        Arc::new(Path::Segment(self.clone(), PathSegment::Index(index)))
    }

    /// True if `self` is the same path as, or a strict ancestor of, `other`.
    /// Used to enforce the Incremental Scheduler's parent-before-child
    /// invariant (`spec.md` §3 "Pending incremental record").
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        let mine = self.to_vec();
        let theirs = other.to_vec();
        theirs.len() >= mine.len() && theirs[..mine.len()] == mine[..]
    }

    pub fn to_vec(&self) -> Vec<PathSegment> {
        let mut segments = Vec::new();
        let mut cur = self;
        loop {
            match cur {
                Path::Root => break,
                Path::Segment(parent, seg) => {
                    segments.push(seg.clone());
                    cur = parent;
                }
            }
        }
        segments.reverse();
        segments
    }

    pub fn to_value(&self) -> Value {
        Value::list(
            self.to_vec()
                .into_iter()
                .map(|seg| match seg {
                    PathSegment::Field(s) => Value::string(s),
                    PathSegment::Index(i) => Value::int(i as i64),
                })
                .collect(),
        )
    }
}

/// The wire-shape error object (`spec.md` §6).
#[derive(Debug, Clone, PartialEq)]
pub struct GraphQlError {
    pub message: String,
    pub locations: Vec<Location>,
    pub path: Option<Vec<PathSegment>>,
    pub extensions: Option<Value>,
}

impl GraphQlError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: None,
            extensions: None,
        }
    }

    pub fn with_locations(mut self, locations: Vec<Location>) -> Self {
        self.locations = locations;
        self
    }

    pub fn with_path(mut self, path: &Path) -> Self {
        self.path = Some(path.to_vec());
        self
    }

    pub fn with_extensions(mut self, extensions: Value) -> Self {
        self.extensions = Some(extensions);
        self
    }

    pub fn to_value(&self) -> Value {
        let mut obj = crate::value::Object::new();
        obj.add_field("message", Value::string(self.message.clone()));
        if !self.locations.is_empty() {
            obj.add_field(
                "locations",
                Value::list(
                    self.locations
                        .iter()
                        .map(|loc| {
                            let mut o = crate::value::Object::new();
                            o.add_field("line", Value::int(loc.line as i64));
                            o.add_field("column", Value::int(loc.column as i64));
                            Value::object(o)
                        })
                        .collect(),
                ),
            );
        }
        if let Some(path) = &self.path {
            obj.add_field(
                "path",
                Value::list(
                    path.iter()
                        .map(|seg| match seg {
                            PathSegment::Field(s) => Value::string(s.clone()),
                            PathSegment::Index(i) => Value::int(*i as i64),
                        })
                        .collect(),
                ),
            );
        }
        if let Some(ext) = &self.extensions {
            obj.add_field("extensions", ext.clone());
        }
        Value::object(obj)
    }
}
