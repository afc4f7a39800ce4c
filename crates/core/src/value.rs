//! Attribute value types
//!
//! This module defines:
//! - Value: the typed content of one attribute cell
//! - ValueKind: discriminant of a Value, used for kind-mismatch checks
//! - Vector / Matrix / Mask: the compound value shapes
//! - CounterRange: running minimum/maximum tracked beside counter cells
//!
//! ## Kind Rules
//!
//! - A cell holds exactly one kind at a time.
//! - There are no implicit conversions: writing a `Text` over a `Scalar` is an
//!   error, never a coercion.
//! - Change detection is bit-for-bit (`same_bits`), not IEEE-754 equality:
//!   `NaN` rewritten with the same `NaN` is unchanged, `0.0` over `-0.0` is a change.

use crate::handle::ObjectType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// Three-component vector of f64
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
}

impl Vector {
    /// Create a vector
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Bit-for-bit equality of all components
    pub fn same_bits(&self, other: &Vector) -> bool {
        self.x.to_bits() == other.x.to_bits()
            && self.y.to_bits() == other.y.to_bits()
            && self.z.to_bits() == other.z.to_bits()
    }
}

/// Row-major 3×3 or 4×4 matrix of f64
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Matrix {
    /// 3×3 matrix (rotation / orientation)
    Mat3([f64; 9]),
    /// 4×4 matrix (full transform)
    Mat4([f64; 16]),
}

impl Matrix {
    /// 3×3 identity
    pub const IDENTITY3: Matrix = Matrix::Mat3([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

    /// 4×4 identity
    pub const IDENTITY4: Matrix = Matrix::Mat4([
        1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
    ]);

    /// Elements in row-major order
    pub fn elements(&self) -> &[f64] {
        match self {
            Matrix::Mat3(m) => m,
            Matrix::Mat4(m) => m,
        }
    }

    /// Number of rows (and columns)
    pub fn dimension(&self) -> usize {
        match self {
            Matrix::Mat3(_) => 3,
            Matrix::Mat4(_) => 4,
        }
    }

    /// Bit-for-bit equality; matrices of different dimension are never equal
    pub fn same_bits(&self, other: &Matrix) -> bool {
        self.dimension() == other.dimension()
            && self
                .elements()
                .iter()
                .zip(other.elements())
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

/// Bit-set over interned named states
///
/// Bits are assigned by the definitions table; a mask is normally composed
/// by looking names up there. The empty mask is a valid value, distinct from
/// an attribute that was never set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Mask(u64);

impl Mask {
    /// Width of the named-state space
    pub const BITS: u32 = u64::BITS;

    /// The empty mask
    pub const EMPTY: Mask = Mask(0);

    /// Mask with the single bit `index` set, `None` if out of range
    pub fn bit(index: u32) -> Option<Mask> {
        1u64.checked_shl(index).map(Mask)
    }

    /// Rebuild a mask from its raw bits (wire decoding)
    pub const fn from_bits(bits: u64) -> Mask {
        Mask(bits)
    }

    /// Raw bits (wire encoding)
    pub const fn bits(&self) -> u64 {
        self.0
    }

    /// True if no bit is set
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True if at least one bit is set
    pub const fn is_set(&self) -> bool {
        self.0 != 0
    }

    /// True if every bit of `other` is set in `self`
    pub const fn contains(&self, other: Mask) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if `self` and `other` share a bit
    pub const fn intersects(&self, other: Mask) -> bool {
        self.0 & other.0 != 0
    }

    /// Clear every bit of `other`
    pub fn unset(&mut self, other: Mask) {
        self.0 &= !other.0;
    }

    /// Indices of set bits, ascending
    pub fn bit_indices(&self) -> impl Iterator<Item = u32> + '_ {
        (0..Self::BITS).filter(move |i| self.0 & (1u64 << i) != 0)
    }
}

impl BitOr for Mask {
    type Output = Mask;

    fn bitor(self, rhs: Mask) -> Mask {
        Mask(self.0 | rhs.0)
    }
}

impl BitOrAssign for Mask {
    fn bitor_assign(&mut self, rhs: Mask) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Mask {
    type Output = Mask;

    fn bitand(self, rhs: Mask) -> Mask {
        Mask(self.0 & rhs.0)
    }
}

impl Not for Mask {
    type Output = Mask;

    fn not(self) -> Mask {
        Mask(!self.0)
    }
}

/// Running minimum and maximum of a counter cell
///
/// Minimum only decreases and maximum only increases across writes, until
/// the range is explicitly reset onto the current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRange {
    /// Smallest value observed since the last reset
    pub minimum: i64,
    /// Largest value observed since the last reset
    pub maximum: i64,
}

impl CounterRange {
    /// Range collapsed onto a single value
    pub const fn at(value: i64) -> Self {
        Self {
            minimum: value,
            maximum: value,
        }
    }
}

/// Discriminant of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueKind {
    /// f64 scalar
    Scalar,
    /// 3-component vector
    Vector,
    /// 3×3 or 4×4 matrix
    Matrix,
    /// UTF-8 text
    Text,
    /// Opaque byte blob
    Data,
    /// i64 counter with tracked range
    Counter,
    /// Named-state bit mask
    Mask,
    /// Boolean flag
    Flag,
    /// f64 time stamp
    TimeStamp,
    /// Alternate object type
    AlternateType,
}

impl ValueKind {
    /// Human-readable name of the kind
    pub const fn name(&self) -> &'static str {
        match self {
            ValueKind::Scalar => "Scalar",
            ValueKind::Vector => "Vector",
            ValueKind::Matrix => "Matrix",
            ValueKind::Text => "Text",
            ValueKind::Data => "Data",
            ValueKind::Counter => "Counter",
            ValueKind::Mask => "Mask",
            ValueKind::Flag => "Flag",
            ValueKind::TimeStamp => "TimeStamp",
            ValueKind::AlternateType => "AlternateType",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed content of one attribute cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// 64-bit floating point scalar
    Scalar(f64),
    /// 3-component vector (position, velocity, scale, ...)
    Vector(Vector),
    /// Orientation or transform matrix
    Matrix(Matrix),
    /// UTF-8 text
    Text(String),
    /// Opaque byte blob
    Data(Vec<u8>),
    /// 64-bit signed counter
    Counter(i64),
    /// Named-state bit mask
    Mask(Mask),
    /// Boolean flag
    Flag(bool),
    /// Time stamp in seconds
    TimeStamp(f64),
    /// Alternate object type
    AlternateType(ObjectType),
}

impl Value {
    /// Kind of this value
    pub const fn kind(&self) -> ValueKind {
        match self {
            Value::Scalar(_) => ValueKind::Scalar,
            Value::Vector(_) => ValueKind::Vector,
            Value::Matrix(_) => ValueKind::Matrix,
            Value::Text(_) => ValueKind::Text,
            Value::Data(_) => ValueKind::Data,
            Value::Counter(_) => ValueKind::Counter,
            Value::Mask(_) => ValueKind::Mask,
            Value::Flag(_) => ValueKind::Flag,
            Value::TimeStamp(_) => ValueKind::TimeStamp,
            Value::AlternateType(_) => ValueKind::AlternateType,
        }
    }

    /// Get the kind name as a string
    pub const fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    /// Bit-for-bit equality used for change suppression
    ///
    /// Different kinds are never equal.
    pub fn same_bits(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => a.to_bits() == b.to_bits(),
            (Value::Vector(a), Value::Vector(b)) => a.same_bits(b),
            (Value::Matrix(a), Value::Matrix(b)) => a.same_bits(b),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Data(a), Value::Data(b)) => a == b,
            (Value::Counter(a), Value::Counter(b)) => a == b,
            (Value::Mask(a), Value::Mask(b)) => a == b,
            (Value::Flag(a), Value::Flag(b)) => a == b,
            (Value::TimeStamp(a), Value::TimeStamp(b)) => a.to_bits() == b.to_bits(),
            (Value::AlternateType(a), Value::AlternateType(b)) => a == b,
            _ => false,
        }
    }

    /// Get as f64 if this is a Scalar value
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as Vector if this is a Vector value
    pub fn as_vector(&self) -> Option<Vector> {
        match self {
            Value::Vector(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as Matrix if this is a Matrix value
    pub fn as_matrix(&self) -> Option<&Matrix> {
        match self {
            Value::Matrix(m) => Some(m),
            _ => None,
        }
    }

    /// Get as &str if this is a Text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get as bytes if this is a Data value
    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            Value::Data(d) => Some(d),
            _ => None,
        }
    }

    /// Get as i64 if this is a Counter value
    pub fn as_counter(&self) -> Option<i64> {
        match self {
            Value::Counter(c) => Some(*c),
            _ => None,
        }
    }

    /// Get as Mask if this is a Mask value
    pub fn as_mask(&self) -> Option<Mask> {
        match self {
            Value::Mask(m) => Some(*m),
            _ => None,
        }
    }

    /// Get as bool if this is a Flag value
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Value::Flag(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as f64 if this is a TimeStamp value
    pub fn as_time_stamp(&self) -> Option<f64> {
        match self {
            Value::TimeStamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Get as ObjectType if this is an AlternateType value
    pub fn as_alternate_type(&self) -> Option<ObjectType> {
        match self {
            Value::AlternateType(t) => Some(*t),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Scalar(v)
    }
}

impl From<Vector> for Value {
    fn from(v: Vector) -> Self {
        Value::Vector(v)
    }
}

impl From<Matrix> for Value {
    fn from(m: Matrix) -> Self {
        Value::Matrix(m)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(d: Vec<u8>) -> Self {
        Value::Data(d)
    }
}

impl From<Mask> for Value {
    fn from(m: Mask) -> Self {
        Value::Mask(m)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Flag(b)
    }
}
