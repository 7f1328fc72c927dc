//! Protocol tables: the capability sets a type may implement
//!
//! Each protocol is a trait object hung off a [`TypeDescriptor`]. A type
//! without a table does not support that protocol at all; a table may also
//! decline individual operations through `supports`.
//!
//! [`TypeDescriptor`]: super::TypeDescriptor

use std::fmt;

use crate::error::Result;
use crate::store::ObjectStore;
use crate::value::ValueRef;

/// The three protocol families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Arithmetic and ordering
    Number,
    /// Ordered, integer-indexed containers
    Sequence,
    /// Key-addressed containers
    Mapping,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Number => write!(f, "number"),
            Protocol::Sequence => write!(f, "sequence"),
            Protocol::Mapping => write!(f, "mapping"),
        }
    }
}

/// Operations of the number protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberOp {
    /// `a + b`
    Add,
    /// `a - b`
    Sub,
    /// `a * b`
    Mul,
    /// `a / b`
    Div,
    /// `a % b`
    Rem,
    /// `-a`
    Neg,
    /// `a < b`
    Lt,
    /// `a <= b`
    Le,
    /// `a > b`
    Gt,
    /// `a >= b`
    Ge,
}

impl NumberOp {
    /// Operator symbol, used in error messages.
    pub fn symbol(self) -> &'static str {
        match self {
            NumberOp::Add => "+",
            NumberOp::Sub => "-",
            NumberOp::Mul => "*",
            NumberOp::Div => "/",
            NumberOp::Rem => "%",
            NumberOp::Neg => "unary -",
            NumberOp::Lt => "<",
            NumberOp::Le => "<=",
            NumberOp::Gt => ">",
            NumberOp::Ge => ">=",
        }
    }
}

/// Operations of the sequence protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceOp {
    /// Number of items
    Length,
    /// `s[i]`
    GetItem,
    /// `s[i] = v`
    SetItem,
    /// `s + t`
    Concat,
    /// `s * n`
    Repeat,
    /// membership test
    Contains,
}

/// Operations of the mapping protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingOp {
    /// Number of entries
    Length,
    /// `m[k]`
    GetItem,
    /// `m[k] = v`
    SetItem,
    /// remove `m[k]`
    DelItem,
    /// key membership test
    Contains,
}

/// A protocol operation, as passed to `ObjectStore::dispatch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Number protocol operation
    Number(NumberOp),
    /// Sequence protocol operation
    Sequence(SequenceOp),
    /// Mapping protocol operation
    Mapping(MappingOp),
}

impl Operation {
    /// The protocol this operation belongs to.
    pub fn protocol(self) -> Protocol {
        match self {
            Operation::Number(_) => Protocol::Number,
            Operation::Sequence(_) => Protocol::Sequence,
            Operation::Mapping(_) => Protocol::Mapping,
        }
    }

    /// Number of arguments besides the receiver.
    pub fn arity(self) -> usize {
        match self {
            Operation::Number(NumberOp::Neg) => 0,
            Operation::Number(_) => 1,
            Operation::Sequence(SequenceOp::Length) | Operation::Mapping(MappingOp::Length) => 0,
            Operation::Sequence(SequenceOp::SetItem) | Operation::Mapping(MappingOp::SetItem) => 2,
            Operation::Sequence(_) | Operation::Mapping(_) => 1,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Number(op) => write!(f, "'{}'", op.symbol()),
            Operation::Sequence(op) => write!(f, "sequence {:?}", op),
            Operation::Mapping(op) => write!(f, "mapping {:?}", op),
        }
    }
}

impl From<NumberOp> for Operation {
    fn from(op: NumberOp) -> Self {
        Operation::Number(op)
    }
}

impl From<SequenceOp> for Operation {
    fn from(op: SequenceOp) -> Self {
        Operation::Sequence(op)
    }
}

impl From<MappingOp> for Operation {
    fn from(op: MappingOp) -> Self {
        Operation::Mapping(op)
    }
}

/// Number protocol table.
///
/// `call` is only invoked for operations `supports` accepted, with exactly
/// `Operation::arity` arguments. The result is a new owned reference.
pub trait NumberProtocol: Send + Sync {
    /// Whether this table implements `op`.
    fn supports(&self, op: NumberOp) -> bool;

    /// Perform `op` on `receiver`.
    fn call(
        &self,
        store: &mut ObjectStore,
        op: NumberOp,
        receiver: ValueRef,
        args: &[ValueRef],
    ) -> Result<ValueRef>;
}

/// Sequence protocol table. Same calling contract as [`NumberProtocol`].
pub trait SequenceProtocol: Send + Sync {
    /// Whether this table implements `op`.
    fn supports(&self, op: SequenceOp) -> bool;

    /// Perform `op` on `receiver`.
    fn call(
        &self,
        store: &mut ObjectStore,
        op: SequenceOp,
        receiver: ValueRef,
        args: &[ValueRef],
    ) -> Result<ValueRef>;
}

/// Mapping protocol table. Same calling contract as [`NumberProtocol`].
pub trait MappingProtocol: Send + Sync {
    /// Whether this table implements `op`.
    fn supports(&self, op: MappingOp) -> bool;

    /// Perform `op` on `receiver`.
    fn call(
        &self,
        store: &mut ObjectStore,
        op: MappingOp,
        receiver: ValueRef,
        args: &[ValueRef],
    ) -> Result<ValueRef>;
}
