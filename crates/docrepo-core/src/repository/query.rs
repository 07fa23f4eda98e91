use crate::{
    error::{ErrorOrigin, InternalError},
    obs::sink::{self, MetricsEvent},
    query::{DocumentQuery, PartTree, QueryCreator, SqlQuerySpec, SubjectKind},
    repository::{
        execution::{ExecutionKind, ExecutionMode},
        method::{QueryMethod, ReturnShape},
        parameters::{Arg, ParameterAccessor},
    },
};

///
/// PartTreeQuery
///
/// One registered derived-query method, fully validated.
/// Parsing, operator support, parameter arity and return-shape checks all
/// run in `new`, so a repository that builds has no wiring errors left.
///

#[derive(Clone, Debug)]
pub struct PartTreeQuery {
    method: QueryMethod,
    tree: PartTree,
    kind: ExecutionKind,
    mode: ExecutionMode,
}

impl PartTreeQuery {
    pub fn new(method: QueryMethod, mode: ExecutionMode) -> Result<Self, InternalError> {
        let tree = PartTree::parse(method.name(), method.entity().model())?;
        QueryCreator::validate(&tree, method.parameters())?;
        check_return_shape(&tree, &method)?;

        let kind = ExecutionKind::select(&tree, &method);
        tracing::debug!(
            method = method.name(),
            collection = method.collection_name(),
            ?kind,
            ?mode,
            "registered derived query"
        );

        Ok(Self {
            method,
            tree,
            kind,
            mode,
        })
    }

    #[must_use]
    pub const fn method(&self) -> &QueryMethod {
        &self.method
    }

    #[must_use]
    pub const fn tree(&self) -> &PartTree {
        &self.tree
    }

    #[must_use]
    pub const fn execution_kind(&self) -> ExecutionKind {
        self.kind
    }

    /// Translate one call's arguments into a query.
    ///
    /// Shapes that are recognised but not executable (limiting subjects,
    /// paging in reactive mode) fail here with an unsupported error,
    /// before any storage call.
    pub fn create_query(&self, args: Vec<Arg>) -> Result<DocumentQuery, InternalError> {
        let result = self.translate(args);
        if let Err(err) = &result
            && err.is_unsupported()
        {
            sink::record(MetricsEvent::Unsupported {
                entity_path: self.method.returned_type(),
            });
        }

        result
    }

    fn translate(&self, args: Vec<Arg>) -> Result<DocumentQuery, InternalError> {
        if self.mode == ExecutionMode::Reactive && self.kind == ExecutionKind::Paged {
            return Err(InternalError::unsupported(
                ErrorOrigin::Repository,
                format!("{}: paging is not supported in reactive mode", self.method.name()),
            ));
        }

        let accessor = ParameterAccessor::new(self.method.parameters(), args)?;

        QueryCreator::create_query(&self.tree, &accessor)
    }

    /// Render the SQL this call would send, without executing it.
    pub fn explain(&self, args: Vec<Arg>) -> Result<SqlQuerySpec, InternalError> {
        let query = self.translate(args)?;
        let spec = match self.kind {
            ExecutionKind::Count => SqlQuerySpec::count(&query),
            _ => SqlQuerySpec::select(&query),
        };

        Ok(spec)
    }
}

fn check_return_shape(tree: &PartTree, method: &QueryMethod) -> Result<(), InternalError> {
    let shape = method.return_shape();
    let allowed = match tree.kind() {
        SubjectKind::Find => matches!(
            shape,
            ReturnShape::Many | ReturnShape::Single | ReturnShape::Page
        ),
        SubjectKind::Count => shape == ReturnShape::Count,
        SubjectKind::Exists => shape == ReturnShape::Exists,
        SubjectKind::Delete => matches!(
            shape,
            ReturnShape::Void | ReturnShape::Count | ReturnShape::Many
        ),
    };

    if allowed {
        Ok(())
    } else {
        Err(InternalError::configuration(
            ErrorOrigin::Repository,
            format!(
                "{}: return shape {shape:?} does not fit a {:?} derivation",
                method.name(),
                tree.kind()
            ),
        ))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cursor::PageRequest,
        entity::EntityInformation,
        expression::ExpressionResolver,
        repository::method::MethodSignature,
        test_fixtures::ADDRESS_MODEL,
    };
    use std::sync::Arc;

    fn query(signature: MethodSignature, mode: ExecutionMode) -> Result<PartTreeQuery, InternalError> {
        let entity =
            Arc::new(EntityInformation::resolve(&ADDRESS_MODEL, &ExpressionResolver::new()).unwrap());
        PartTreeQuery::new(QueryMethod::new(signature, entity)?, mode)
    }

    #[test]
    fn dispatch_follows_priority_order() {
        let cases = [
            (MethodSignature::new("deleteByCity", ReturnShape::Void).value(), ExecutionKind::Delete),
            (
                MethodSignature::new("findByCity", ReturnShape::Page).value().pageable(),
                ExecutionKind::Paged,
            ),
            (MethodSignature::new("existsByCity", ReturnShape::Exists).value(), ExecutionKind::Exists),
            (MethodSignature::new("countByCity", ReturnShape::Count).value(), ExecutionKind::Count),
            (MethodSignature::new("findByStreet", ReturnShape::Single).value(), ExecutionKind::SingleEntity),
            (MethodSignature::new("findByCity", ReturnShape::Many).value(), ExecutionKind::MultiEntity),
        ];

        for (signature, expected) in cases {
            let name = signature.name().to_string();
            let built = query(signature, ExecutionMode::Blocking).unwrap();
            assert_eq!(built.execution_kind(), expected, "{name}");
        }
    }

    #[test]
    fn mismatched_return_shape_is_a_configuration_error() {
        let err = query(
            MethodSignature::new("countByCity", ReturnShape::Many).value(),
            ExecutionMode::Blocking,
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn reactive_paging_builds_but_fails_at_call_time() {
        let built = query(
            MethodSignature::new("findByCity", ReturnShape::Page).value().pageable(),
            ExecutionMode::Reactive,
        )
        .unwrap();

        let err = built
            .create_query(vec!["A".into(), PageRequest::of_size(3).unwrap().into()])
            .unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn explain_renders_count_queries() {
        let built = query(
            MethodSignature::new("countByCity", ReturnShape::Count).value(),
            ExecutionMode::Blocking,
        )
        .unwrap();

        let spec = built.explain(vec!["A".into()]).unwrap();
        assert_eq!(spec.text, "SELECT VALUE COUNT(1) FROM ROOT r WHERE r.city = @city0");
    }
}
