//! # Host Values and Argument Shapes
//!
//! The host transport delivers commands as a name plus a positional list of
//! dynamically typed values. Every command declares a [`Signature`]; the
//! arguments are checked against it before anything else happens, so a
//! malformed call never reaches the native layer.
//!
//! ```text
//!   ("resize", [Int(512), Int(512), Float(1.0)])
//!        │
//!        ▼
//!   Args::expect("resize", args, &[width:int, height:int, scale:float])
//!        │ ok                          │ mismatch
//!        ▼                             ▼
//!   typed getters               InvalidArguments("... expects [...]")
//! ```

use crate::error::{BridgeError, BridgeResult};

/// A dynamically typed value exchanged with the host.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer (the host codec's widest integer).
    Int(i64),
    /// Floating point.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Ordered list of values.
    List(Vec<Value>),
}

impl Value {
    /// Returns the boolean if this is a `Bool`.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer if this is an `Int`.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns a float for `Float` and `Int` values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the string slice if this is a `String`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the elements if this is a `List`.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns true for `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short type name used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Expected type of one positional argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgKind {
    /// Boolean.
    Bool,
    /// Integer. Floats are rejected.
    Int,
    /// Float. Integers are accepted and widened.
    Float,
    /// String.
    String,
}

impl ArgKind {
    /// Name used in shape descriptions.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
        }
    }

    /// Returns true if `value` satisfies this kind.
    #[must_use]
    pub const fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Bool, Value::Bool(_))
                | (Self::Int, Value::Int(_))
                | (Self::Float, Value::Float(_) | Value::Int(_))
                | (Self::String, Value::String(_))
        )
    }
}

/// One named positional parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArgSpec {
    /// Parameter name.
    pub name: &'static str,
    /// Parameter type.
    pub kind: ArgKind,
}

/// Shorthand constructor for an [`ArgSpec`].
#[must_use]
pub const fn arg(name: &'static str, kind: ArgKind) -> ArgSpec {
    ArgSpec { name, kind }
}

/// The full positional shape of a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature(pub &'static [ArgSpec]);

impl Signature {
    /// Signature with no arguments.
    pub const EMPTY: Self = Self(&[]);

    /// Number of parameters.
    #[must_use]
    pub const fn arity(&self) -> usize {
        self.0.len()
    }

    fn matches(&self, args: &[Value]) -> Result<(), String> {
        if args.len() != self.0.len() {
            return Err(format!("expected {} argument(s), got {}", self.0.len(), args.len()));
        }
        for (index, (spec, value)) in self.0.iter().zip(args).enumerate() {
            if !spec.kind.accepts(value) {
                return Err(format!(
                    "argument {index} ({}) must be {}, got {}",
                    spec.name,
                    spec.kind.name(),
                    value.type_name()
                ));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[")?;
        for (i, spec) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}:{}", spec.name, spec.kind.name())?;
        }
        f.write_str("]")
    }
}

/// Positional arguments that have been checked against a [`Signature`].
#[derive(Clone, Copy, Debug)]
pub struct Args<'a> {
    values: &'a [Value],
}

impl<'a> Args<'a> {
    /// Validates `values` against `signature`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidArguments`] describing the expected shape.
    pub fn expect(command: &str, values: &'a [Value], signature: Signature) -> BridgeResult<Self> {
        Self::expect_any(command, values, &[signature])
    }

    /// Validates `values` against the first matching signature.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidArguments`] listing every accepted shape.
    pub fn expect_any(
        command: &str,
        values: &'a [Value],
        signatures: &[Signature],
    ) -> BridgeResult<Self> {
        let mut first_problem = None;
        for signature in signatures {
            match signature.matches(values) {
                Ok(()) => return Ok(Self { values }),
                Err(problem) => {
                    first_problem.get_or_insert(problem);
                }
            }
        }

        let shapes = signatures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" or ");
        Err(BridgeError::InvalidArguments {
            command: command.to_owned(),
            reason: format!(
                "{command} expects {shapes} ({})",
                first_problem.unwrap_or_default()
            ),
        })
    }

    /// Number of arguments.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no arguments.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Integer at `index`; zero if absent.
    #[must_use]
    pub fn int(&self, index: usize) -> i64 {
        self.values.get(index).and_then(Value::as_int).unwrap_or_default()
    }

    /// Float at `index`; zero if absent.
    #[must_use]
    pub fn float(&self, index: usize) -> f64 {
        self.values.get(index).and_then(Value::as_float).unwrap_or_default()
    }

    /// Boolean at `index`; false if absent.
    #[must_use]
    pub fn bool(&self, index: usize) -> bool {
        self.values.get(index).and_then(Value::as_bool).unwrap_or_default()
    }

    /// String at `index`; empty if absent.
    #[must_use]
    pub fn str(&self, index: usize) -> &'a str {
        self.values.get(index).and_then(Value::as_str).unwrap_or_default()
    }
}
