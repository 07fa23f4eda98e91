use std::fmt;

///
/// PartType
///
/// Operator keyword recognised at the end of one method-name clause.
/// Variants are declared in match precedence: a clause is tested against
/// each variant in this order and the first keyword suffix wins.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PartType {
    IsNotNull,
    IsNull,
    Between,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    Before,
    After,
    NotLike,
    Like,
    StartingWith,
    EndingWith,
    IsNotEmpty,
    IsEmpty,
    NotContaining,
    Containing,
    NotIn,
    In,
    Near,
    Within,
    Regex,
    Exists,
    True,
    False,
    NegatingSimpleProperty,
    SimpleProperty,
}

impl PartType {
    pub const ALL: [Self; 27] = [
        Self::IsNotNull,
        Self::IsNull,
        Self::Between,
        Self::LessThan,
        Self::LessThanEqual,
        Self::GreaterThan,
        Self::GreaterThanEqual,
        Self::Before,
        Self::After,
        Self::NotLike,
        Self::Like,
        Self::StartingWith,
        Self::EndingWith,
        Self::IsNotEmpty,
        Self::IsEmpty,
        Self::NotContaining,
        Self::Containing,
        Self::NotIn,
        Self::In,
        Self::Near,
        Self::Within,
        Self::Regex,
        Self::Exists,
        Self::True,
        Self::False,
        Self::NegatingSimpleProperty,
        Self::SimpleProperty,
    ];

    /// Method-name suffixes selecting this operator, longest first.
    #[must_use]
    pub const fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::IsNotNull => &["IsNotNull", "NotNull"],
            Self::IsNull => &["IsNull", "Null"],
            Self::Between => &["IsBetween", "Between"],
            Self::LessThan => &["IsLessThan", "LessThan"],
            Self::LessThanEqual => &["IsLessThanEqual", "LessThanEqual"],
            Self::GreaterThan => &["IsGreaterThan", "GreaterThan"],
            Self::GreaterThanEqual => &["IsGreaterThanEqual", "GreaterThanEqual"],
            Self::Before => &["IsBefore", "Before"],
            Self::After => &["IsAfter", "After"],
            Self::NotLike => &["IsNotLike", "NotLike"],
            Self::Like => &["IsLike", "Like"],
            Self::StartingWith => &["IsStartingWith", "StartingWith", "StartsWith"],
            Self::EndingWith => &["IsEndingWith", "EndingWith", "EndsWith"],
            Self::IsNotEmpty => &["IsNotEmpty", "NotEmpty"],
            Self::IsEmpty => &["IsEmpty", "Empty"],
            Self::NotContaining => &["IsNotContaining", "NotContaining", "NotContains"],
            Self::Containing => &["IsContaining", "Containing", "Contains"],
            Self::NotIn => &["IsNotIn", "NotIn"],
            Self::In => &["IsIn", "In"],
            Self::Near => &["IsNear", "Near"],
            Self::Within => &["IsWithin", "Within"],
            Self::Regex => &["MatchesRegex", "Matches", "Regex"],
            Self::Exists => &["Exists"],
            Self::True => &["IsTrue", "True"],
            Self::False => &["IsFalse", "False"],
            Self::NegatingSimpleProperty => &["IsNot", "Not"],
            Self::SimpleProperty => &["Is", "Equals"],
        }
    }

    /// Number of method arguments one clause of this type consumes.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::IsNotNull
            | Self::IsNull
            | Self::IsNotEmpty
            | Self::IsEmpty
            | Self::Exists
            | Self::True
            | Self::False => 0,
            Self::Between => 2,
            _ => 1,
        }
    }

    /// Whether the single argument is a collection of operands.
    #[must_use]
    pub const fn takes_collection(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    /// Candidate `(type, property expression)` splits for one clause, in
    /// precedence order. The bare clause as `SimpleProperty` always comes last.
    pub(crate) fn candidates(clause: &str) -> Vec<(Self, &str)> {
        let mut out = Vec::new();

        for part_type in Self::ALL {
            for keyword in part_type.keywords() {
                if let Some(property) = clause.strip_suffix(keyword)
                    && !property.is_empty()
                {
                    out.push((part_type, property));
                    break;
                }
            }
        }
        out.push((Self::SimpleProperty, clause));

        out
    }
}

impl fmt::Display for PartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keywords()[0])
    }
}

///
/// Part
///
/// One property + operator clause of a derived method name.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Part {
    property: String,
    part_type: PartType,
    ignore_case: bool,
    source: String,
}

impl Part {
    #[must_use]
    pub(crate) const fn new(
        property: String,
        part_type: PartType,
        ignore_case: bool,
        source: String,
    ) -> Self {
        Self {
            property,
            part_type,
            ignore_case,
            source,
        }
    }

    /// Resolved dot-separated property path.
    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }

    #[must_use]
    pub const fn part_type(&self) -> PartType {
        self.part_type
    }

    #[must_use]
    pub const fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    #[must_use]
    pub const fn arity(&self) -> usize {
        self.part_type.arity()
    }

    /// Method-name fragment this part was parsed from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.property, self.part_type)?;
        if self.ignore_case {
            f.write_str(" (ignore case)")?;
        }

        Ok(())
    }
}

///
/// TESTS
///
