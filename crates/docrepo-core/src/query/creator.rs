//! Part tree + bound arguments → document query.

use crate::{
    error::{ErrorOrigin, InternalError},
    query::{
        criteria::{Criteria, CriteriaType},
        document_query::DocumentQuery,
        part::Part,
        sort::Sort,
        tree::PartTree,
    },
    repository::{ParameterAccessor, ParameterKind, Parameters},
    value::Value,
};

///
/// QueryCreator
///

pub struct QueryCreator;

impl QueryCreator {
    /// Check a parsed tree against the declared parameter list.
    ///
    /// Runs once when a repository is built: every operator must be
    /// expressible by the store, and the bindable parameters must line up
    /// with the parts' arities in declaration order.
    pub fn validate(tree: &PartTree, parameters: &Parameters) -> Result<(), InternalError> {
        let mut kinds = parameters.bindable_kinds();

        for part in tree.parts() {
            if CriteriaType::from_part_type(part.part_type()).is_none() {
                return Err(InternalError::configuration(
                    ErrorOrigin::Query,
                    format!(
                        "{}: keyword '{}' on '{}' is not supported by the document store",
                        tree.source(),
                        part.part_type(),
                        part.property()
                    ),
                ));
            }

            for _ in 0..part.arity() {
                let Some(kind) = kinds.next() else {
                    return Err(arity_error(tree, part, "too few parameters"));
                };
                let expected = if part.part_type().takes_collection() {
                    ParameterKind::Collection
                } else {
                    ParameterKind::Value
                };
                if kind != expected {
                    return Err(InternalError::configuration(
                        ErrorOrigin::Query,
                        format!(
                            "{}: '{}' expects a {expected:?} parameter, found {kind:?}",
                            tree.source(),
                            part.source()
                        ),
                    ));
                }
            }
        }

        if kinds.next().is_some() {
            return Err(InternalError::configuration(
                ErrorOrigin::Query,
                format!(
                    "{}: declares more bindable parameters than the method name consumes",
                    tree.source()
                ),
            ));
        }

        Ok(())
    }

    /// Build the query for one call.
    ///
    /// Each OR-section's parts fold left-to-right with `And`; the sections
    /// then fold left-to-right with `Or`. The static `OrderBy` sort comes
    /// first, followed by any dynamic sort argument.
    pub fn create_query(
        tree: &PartTree,
        accessor: &ParameterAccessor,
    ) -> Result<DocumentQuery, InternalError> {
        if let Some(limit) = tree.max_results() {
            return Err(InternalError::unsupported(
                ErrorOrigin::Query,
                format!(
                    "{}: limiting derived queries (first/top {limit}) are not supported",
                    tree.source()
                ),
            ));
        }

        let mut args = accessor.bindable().iter();
        let mut root: Option<Criteria> = None;

        for section in tree.sections() {
            let mut section_criteria: Option<Criteria> = None;
            for part in section.parts() {
                let leaf = Self::leaf(tree, part, &mut args)?;
                section_criteria = Some(match section_criteria {
                    Some(acc) => acc.and(leaf),
                    None => leaf,
                });
            }

            if let Some(section_criteria) = section_criteria {
                root = Some(match root {
                    Some(acc) => acc.or(section_criteria),
                    None => section_criteria,
                });
            }
        }

        let dynamic = accessor.sort().cloned().unwrap_or_else(Sort::unsorted);
        let query = DocumentQuery::new(root)
            .with_sort(tree.sort().clone())
            .with_sort(dynamic)
            .with_page(accessor.page_request().cloned());

        Ok(query)
    }

    fn leaf<'a>(
        tree: &PartTree,
        part: &Part,
        args: &mut impl Iterator<Item = &'a Value>,
    ) -> Result<Criteria, InternalError> {
        let kind = CriteriaType::from_part_type(part.part_type()).ok_or_else(|| {
            InternalError::query_invariant(format!(
                "unsupported keyword '{}' reached query creation",
                part.part_type()
            ))
        })?;

        let mut consumed = Vec::with_capacity(part.arity());
        for _ in 0..part.arity() {
            let arg = args
                .next()
                .ok_or_else(|| arity_error(tree, part, "argument list exhausted"))?;
            consumed.push(arg.clone());
        }

        let operands = if part.part_type().takes_collection() {
            match consumed.pop() {
                Some(Value::List(items)) => items,
                Some(other) => {
                    return Err(InternalError::invalid_argument(
                        ErrorOrigin::Query,
                        format!(
                            "{}: '{}' expects a collection argument, got {}",
                            tree.source(),
                            part.source(),
                            other.kind_label()
                        ),
                    ));
                }
                None => Vec::new(),
            }
        } else {
            consumed
        };

        Criteria::leaf(part.property(), kind, operands, part.ignore_case())
    }
}

fn arity_error(tree: &PartTree, part: &Part, detail: &str) -> InternalError {
    InternalError::configuration(
        ErrorOrigin::Query,
        format!(
            "{}: '{}' needs {} argument(s): {detail}",
            tree.source(),
            part.source(),
            part.arity()
        ),
    )
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        query::{Order, criteria::Connector},
        repository::{Arg, MethodSignature, ReturnShape},
        test_fixtures::{ADDRESS_MODEL, COURSE_MODEL},
    };
    use proptest::prelude::*;

    fn build(
        method: &str,
        signature: &MethodSignature,
        args: Vec<Arg>,
    ) -> Result<DocumentQuery, InternalError> {
        let tree = PartTree::parse(method, &ADDRESS_MODEL)?;
        let parameters = signature.parameters();
        QueryCreator::validate(&tree, &parameters)?;
        let accessor = ParameterAccessor::new(&parameters, args)?;
        QueryCreator::create_query(&tree, &accessor)
    }

    #[test]
    fn or_sections_fold_into_and_subtrees() {
        let signature = MethodSignature::new("findByCityAndStreetOrPostalCode", ReturnShape::Many)
            .value()
            .value()
            .value();
        let query = build(
            "findByCityAndStreetOrPostalCode",
            &signature,
            vec!["A".into(), "Main".into(), "123".into()],
        )
        .unwrap();

        let Some(Criteria::Node {
            connector: Connector::Or,
            left,
            right,
        }) = query.criteria()
        else {
            panic!("expected OR root, got {:?}", query.criteria());
        };
        assert!(matches!(
            **left,
            Criteria::Node {
                connector: Connector::And,
                ..
            }
        ));
        assert!(matches!(**right, Criteria::Leaf { .. }));
    }

    #[test]
    fn static_sort_precedes_dynamic_sort() {
        let signature =
            MethodSignature::new("findByCityOrderByStreetDesc", ReturnShape::Many)
                .value()
                .sort();
        let query = build(
            "findByCityOrderByStreetDesc",
            &signature,
            vec!["A".into(), Sort::asc("postalCode").into()],
        )
        .unwrap();

        assert_eq!(
            query.sort().orders(),
            &[Order::desc("street"), Order::asc("postalCode")]
        );
    }

    #[test]
    fn in_operands_expand_collection_argument() {
        let tree = PartTree::parse("findByDepartmentIn", &COURSE_MODEL).unwrap();
        let signature = MethodSignature::new("findByDepartmentIn", ReturnShape::Many).collection();
        let parameters = signature.parameters();
        QueryCreator::validate(&tree, &parameters).unwrap();

        let accessor =
            ParameterAccessor::new(&parameters, vec![vec!["Math", "Art"].into()]).unwrap();
        let query = QueryCreator::create_query(&tree, &accessor).unwrap();

        let Some(Criteria::Leaf { kind, operands, .. }) = query.criteria() else {
            panic!("expected leaf");
        };
        assert_eq!(*kind, CriteriaType::In);
        assert_eq!(operands, &vec![Value::from("Math"), Value::from("Art")]);
    }

    #[test]
    fn limiting_fails_as_unsupported() {
        let signature = MethodSignature::new("findFirst3ByCity", ReturnShape::Many).value();
        let err = build("findFirst3ByCity", &signature, vec!["A".into()]).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn arity_mismatch_is_a_configuration_error() {
        let tree = PartTree::parse("findByCityAndStreet", &ADDRESS_MODEL).unwrap();
        let one = MethodSignature::new("findByCityAndStreet", ReturnShape::Many).value();
        assert!(QueryCreator::validate(&tree, &one.parameters()).unwrap_err().is_configuration());

        let three = one.clone().value().value();
        assert!(QueryCreator::validate(&tree, &three.parameters()).unwrap_err().is_configuration());
    }

    #[test]
    fn unsupported_keyword_is_a_configuration_error() {
        let tree = PartTree::parse("findByCityLike", &ADDRESS_MODEL).unwrap();
        let signature = MethodSignature::new("findByCityLike", ReturnShape::Many).value();
        let err = QueryCreator::validate(&tree, &signature.parameters()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn scalar_where_collection_declared_is_a_configuration_error() {
        let tree = PartTree::parse("findByDepartmentIn", &COURSE_MODEL).unwrap();
        let signature = MethodSignature::new("findByDepartmentIn", ReturnShape::Many).value();
        let err = QueryCreator::validate(&tree, &signature.parameters()).unwrap_err();
        assert!(err.is_configuration());
    }

    const PROPERTIES: [&str; 3] = ["City", "Street", "PostalCode"];

    proptest! {
        #[test]
        fn criteria_has_one_leaf_per_part(
            clauses in prop::collection::vec((0..PROPERTIES.len(), any::<bool>()), 1..12)
        ) {
            let mut method = String::from("findBy");
            for (idx, (property, or)) in clauses.iter().enumerate() {
                if idx > 0 {
                    method.push_str(if *or { "Or" } else { "And" });
                }
                method.push_str(PROPERTIES[*property]);
            }

            let mut signature = MethodSignature::new(method.clone(), ReturnShape::Many);
            let mut args = Vec::new();
            for idx in 0..clauses.len() {
                signature = signature.value();
                args.push(Arg::from(format!("v{idx}")));
            }

            let query = build(&method, &signature, args).unwrap();
            let criteria = query.criteria().unwrap();
            prop_assert_eq!(criteria.leaf_count(), clauses.len());
            prop_assert_eq!(criteria.node_count(), clauses.len() - 1);
        }
    }
}
