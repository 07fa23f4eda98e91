use crate::{
    error::InternalError,
    query::part::PartType,
    value::Value,
};
use std::fmt;

///
/// CriteriaType
///
/// Leaf operator of a criteria tree. `Before`/`After` clauses lower to
/// `LessThan`/`GreaterThan`.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum CriteriaType {
    Equal = 0x01,
    NotEqual = 0x02,
    LessThan = 0x03,
    LessThanEqual = 0x04,
    GreaterThan = 0x05,
    GreaterThanEqual = 0x06,
    Between = 0x07,
    In = 0x08,
    NotIn = 0x09,
    Containing = 0x0a,
    NotContaining = 0x0b,
    StartsWith = 0x0c,
    EndsWith = 0x0d,
    IsNull = 0x0e,
    IsNotNull = 0x0f,
    Exists = 0x10,
    True = 0x11,
    False = 0x12,
}

impl CriteriaType {
    /// Map a parsed clause operator onto a document-store operator.
    /// `None` marks keywords the store cannot express.
    #[must_use]
    pub const fn from_part_type(part_type: PartType) -> Option<Self> {
        let kind = match part_type {
            PartType::SimpleProperty => Self::Equal,
            PartType::NegatingSimpleProperty => Self::NotEqual,
            PartType::LessThan | PartType::Before => Self::LessThan,
            PartType::LessThanEqual => Self::LessThanEqual,
            PartType::GreaterThan | PartType::After => Self::GreaterThan,
            PartType::GreaterThanEqual => Self::GreaterThanEqual,
            PartType::Between => Self::Between,
            PartType::In => Self::In,
            PartType::NotIn => Self::NotIn,
            PartType::Containing => Self::Containing,
            PartType::NotContaining => Self::NotContaining,
            PartType::StartingWith => Self::StartsWith,
            PartType::EndingWith => Self::EndsWith,
            PartType::IsNull => Self::IsNull,
            PartType::IsNotNull => Self::IsNotNull,
            PartType::Exists => Self::Exists,
            PartType::True => Self::True,
            PartType::False => Self::False,
            PartType::Like
            | PartType::NotLike
            | PartType::Regex
            | PartType::Near
            | PartType::Within
            | PartType::IsEmpty
            | PartType::IsNotEmpty => return None,
        };

        Some(kind)
    }

    /// Exact operand count, or `None` for list operators.
    #[must_use]
    pub const fn arity(self) -> Option<usize> {
        match self {
            Self::IsNull | Self::IsNotNull | Self::Exists | Self::True | Self::False => Some(0),
            Self::Between => Some(2),
            Self::In | Self::NotIn => None,
            _ => Some(1),
        }
    }

    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

///
/// Connector
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Connector {
    And,
    Or,
}

impl Connector {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

///
/// Criteria
///
/// Binary predicate tree. Leaves are validated for operand arity on
/// construction, so every reachable tree is well-formed.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Criteria {
    Leaf {
        subject: String,
        kind: CriteriaType,
        operands: Vec<Value>,
        ignore_case: bool,
    },
    Node {
        connector: Connector,
        left: Box<Self>,
        right: Box<Self>,
    },
}

impl Criteria {
    pub fn leaf(
        subject: impl Into<String>,
        kind: CriteriaType,
        operands: Vec<Value>,
        ignore_case: bool,
    ) -> Result<Self, InternalError> {
        let subject = subject.into();
        if let Some(expected) = kind.arity()
            && operands.len() != expected
        {
            return Err(InternalError::query_invariant(format!(
                "criteria {kind:?} on '{subject}' expects {expected} operand(s), got {}",
                operands.len()
            )));
        }

        Ok(Self::Leaf {
            subject,
            kind,
            operands,
            ignore_case,
        })
    }

    #[must_use]
    pub fn and(self, right: Self) -> Self {
        Self::node(Connector::And, self, right)
    }

    #[must_use]
    pub fn or(self, right: Self) -> Self {
        Self::node(Connector::Or, self, right)
    }

    fn node(connector: Connector, left: Self, right: Self) -> Self {
        Self::Node {
            connector,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf { .. } => 1,
            Self::Node { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        match self {
            Self::Leaf { .. } => 0,
            Self::Node { left, right, .. } => 1 + left.node_count() + right.node_count(),
        }
    }

    /// Case-sensitive equality operand on `field` that every matching
    /// document must satisfy. Only `And` nodes are traversed.
    #[must_use]
    pub fn pinned_equality(&self, field: &str) -> Option<&Value> {
        match self {
            Self::Leaf {
                subject,
                kind: CriteriaType::Equal,
                operands,
                ignore_case: false,
            } if subject == field => operands.first(),
            Self::Leaf { .. } => None,
            Self::Node {
                connector: Connector::And,
                left,
                right,
            } => left
                .pinned_equality(field)
                .or_else(|| right.pinned_equality(field)),
            Self::Node { .. } => None,
        }
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf {
                subject,
                kind,
                operands,
                ignore_case,
            } => {
                write!(f, "{subject} {kind:?}")?;
                for operand in operands {
                    write!(f, " {operand}")?;
                }
                if *ignore_case {
                    f.write_str(" ~i")?;
                }

                Ok(())
            }
            Self::Node {
                connector,
                left,
                right,
            } => write!(f, "({left} {} {right})", connector.as_sql()),
        }
    }
}

///
/// TESTS
///
