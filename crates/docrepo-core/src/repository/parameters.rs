use crate::{
    cursor::PageRequest,
    error::{ErrorOrigin, InternalError},
    query::Sort,
    value::Value,
};

///
/// ParameterKind
///
/// Declared role of one method parameter. `Value` and `Collection`
/// parameters bind to parts; `Sort` and `Pageable` are special.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParameterKind {
    Value,
    Collection,
    Sort,
    Pageable,
}

impl ParameterKind {
    #[must_use]
    pub const fn is_bindable(self) -> bool {
        matches!(self, Self::Value | Self::Collection)
    }
}

///
/// Parameters
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Parameters {
    kinds: Vec<ParameterKind>,
}

impl Parameters {
    #[must_use]
    pub const fn new(kinds: Vec<ParameterKind>) -> Self {
        Self { kinds }
    }

    #[must_use]
    pub fn kinds(&self) -> &[ParameterKind] {
        &self.kinds
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Bindable parameter kinds in declaration order.
    pub fn bindable_kinds(&self) -> impl Iterator<Item = ParameterKind> + '_ {
        self.kinds.iter().copied().filter(|kind| kind.is_bindable())
    }

    #[must_use]
    pub fn has_sort(&self) -> bool {
        self.kinds.contains(&ParameterKind::Sort)
    }

    #[must_use]
    pub fn has_pageable(&self) -> bool {
        self.kinds.contains(&ParameterKind::Pageable)
    }

    /// At most one special parameter; a page request already carries its sort.
    pub(crate) fn validate(&self, method: &str) -> Result<(), InternalError> {
        let sorts = self.kinds.iter().filter(|k| **k == ParameterKind::Sort).count();
        let pages = self.kinds.iter().filter(|k| **k == ParameterKind::Pageable).count();

        if sorts + pages > 1 {
            return Err(InternalError::configuration(
                ErrorOrigin::Repository,
                format!("{method}: declare at most one Sort or Pageable parameter"),
            ));
        }

        Ok(())
    }
}

///
/// Arg
/// One runtime argument of a repository call.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    Value(Value),
    Collection(Vec<Value>),
    Sort(Sort),
    Page(PageRequest),
}

impl Arg {
    const fn kind_label(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::Collection(_) => "collection",
            Self::Sort(_) => "sort",
            Self::Page(_) => "page request",
        }
    }
}

macro_rules! impl_arg_from_value {
    ( $( $ty:ty ),* $(,)? ) => {
        $(
            impl From<$ty> for Arg {
                fn from(v: $ty) -> Self {
                    Self::Value(Value::from(v))
                }
            }
        )*
    };
}

impl_arg_from_value!(Value, bool, i32, i64, u32, u64, f64, &str, String);

impl<T: Into<Value>> From<Vec<T>> for Arg {
    fn from(values: Vec<T>) -> Self {
        Self::Collection(values.into_iter().map(Into::into).collect())
    }
}

impl From<Sort> for Arg {
    fn from(sort: Sort) -> Self {
        Self::Sort(sort)
    }
}

impl From<PageRequest> for Arg {
    fn from(page: PageRequest) -> Self {
        Self::Page(page)
    }
}

///
/// ParameterAccessor
///
/// Call-time view of the arguments: bindable operands in declaration order
/// plus the dynamic sort and page request, if any.
///

#[derive(Clone, Debug, Default)]
pub struct ParameterAccessor {
    bindable: Vec<Value>,
    sort: Option<Sort>,
    page: Option<PageRequest>,
}

impl ParameterAccessor {
    pub fn new(parameters: &Parameters, args: Vec<Arg>) -> Result<Self, InternalError> {
        if args.len() != parameters.len() {
            return Err(InternalError::invalid_argument(
                ErrorOrigin::Repository,
                format!(
                    "expected {} argument(s), got {}",
                    parameters.len(),
                    args.len()
                ),
            ));
        }

        let mut accessor = Self::default();
        for (position, (kind, arg)) in parameters.kinds().iter().zip(args).enumerate() {
            match (kind, arg) {
                (ParameterKind::Value, Arg::Value(value)) => accessor.bindable.push(value),
                (ParameterKind::Collection, Arg::Collection(values)) => {
                    accessor.bindable.push(Value::List(values));
                }
                (ParameterKind::Collection, Arg::Value(value @ Value::List(_))) => {
                    accessor.bindable.push(value);
                }
                (ParameterKind::Sort, Arg::Sort(sort)) => accessor.sort = Some(sort),
                (ParameterKind::Pageable, Arg::Page(page)) => accessor.page = Some(page),
                (kind, arg) => {
                    return Err(InternalError::invalid_argument(
                        ErrorOrigin::Repository,
                        format!(
                            "argument {position} is a {}, parameter is declared {kind:?}",
                            arg.kind_label()
                        ),
                    ));
                }
            }
        }

        Ok(accessor)
    }

    #[must_use]
    pub fn bindable(&self) -> &[Value] {
        &self.bindable
    }

    /// Dynamic sort: the explicit sort argument, else the page request's sort.
    #[must_use]
    pub fn sort(&self) -> Option<&Sort> {
        self.sort.as_ref().or_else(|| {
            self.page
                .as_ref()
                .map(PageRequest::sort)
                .filter(|sort| sort.is_sorted())
        })
    }

    #[must_use]
    pub const fn page_request(&self) -> Option<&PageRequest> {
        self.page.as_ref()
    }
}

///
/// TESTS
///
