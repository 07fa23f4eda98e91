use crate::{
    entity::EntityInformation,
    error::{ErrorOrigin, InternalError},
    repository::parameters::{ParameterKind, Parameters},
};
use std::sync::Arc;

///
/// ReturnShape
///
/// Declared result cardinality of a repository method.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReturnShape {
    Many,
    Single,
    Page,
    Count,
    Exists,
    Void,
}

///
/// MethodSignature
///
/// Explicit registration of one derived-query method: its name, its
/// parameter roles in declaration order, and its return shape.
///
/// ```ignore
/// MethodSignature::new("findByCity", ReturnShape::Page).value().pageable()
/// ```
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MethodSignature {
    name: String,
    parameters: Vec<ParameterKind>,
    returns: ReturnShape,
}

impl MethodSignature {
    #[must_use]
    pub fn new(name: impl Into<String>, returns: ReturnShape) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            returns,
        }
    }

    #[must_use]
    pub fn param(mut self, kind: ParameterKind) -> Self {
        self.parameters.push(kind);
        self
    }

    #[must_use]
    pub fn value(self) -> Self {
        self.param(ParameterKind::Value)
    }

    #[must_use]
    pub fn collection(self) -> Self {
        self.param(ParameterKind::Collection)
    }

    #[must_use]
    pub fn sort(self) -> Self {
        self.param(ParameterKind::Sort)
    }

    #[must_use]
    pub fn pageable(self) -> Self {
        self.param(ParameterKind::Pageable)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn returns(&self) -> ReturnShape {
        self.returns
    }

    #[must_use]
    pub fn parameters(&self) -> Parameters {
        Parameters::new(self.parameters.clone())
    }
}

///
/// QueryMethod
///
/// Metadata for one registered method: page-ness, returned element type,
/// and the collection name resolved once for the owning repository.
///

#[derive(Clone, Debug)]
pub struct QueryMethod {
    signature: MethodSignature,
    parameters: Parameters,
    entity: Arc<EntityInformation>,
}

impl QueryMethod {
    pub fn new(
        signature: MethodSignature,
        entity: Arc<EntityInformation>,
    ) -> Result<Self, InternalError> {
        let parameters = signature.parameters();
        parameters.validate(signature.name())?;

        let page_return = signature.returns() == ReturnShape::Page;
        if page_return != parameters.has_pageable() {
            return Err(InternalError::configuration(
                ErrorOrigin::Repository,
                format!(
                    "{}: a page return requires exactly one Pageable parameter, and vice versa",
                    signature.name()
                ),
            ));
        }

        Ok(Self {
            signature,
            parameters,
            entity,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.signature.name()
    }

    #[must_use]
    pub const fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    #[must_use]
    pub const fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    #[must_use]
    pub const fn return_shape(&self) -> ReturnShape {
        self.signature.returns
    }

    #[must_use]
    pub const fn is_page_query(&self) -> bool {
        matches!(self.signature.returns, ReturnShape::Page)
    }

    /// Path of the domain type results are mapped to.
    #[must_use]
    pub fn returned_type(&self) -> &'static str {
        self.entity.model().path
    }

    #[must_use]
    pub fn collection_name(&self) -> &str {
        self.entity.collection_name()
    }

    #[must_use]
    pub fn entity(&self) -> &EntityInformation {
        &self.entity
    }
}

///
/// TESTS
///
