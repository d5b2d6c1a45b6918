//! The root schema value (`spec.md` §3).

use fnv::FnvHashMap;

use super::meta::TypeDef;

/// An immutable, already-built schema.
///
/// `Ctx` is the user context type threaded through every resolver
/// invocation, matching the teacher's `CtxT` parameter on `Executor`.
pub struct Schema<Ctx> {
    pub query_type: String,
    pub mutation_type: Option<String>,
    pub subscription_type: Option<String>,
    types: FnvHashMap<String, TypeDef<Ctx>>,
}

impl<Ctx> Schema<Ctx> {
    pub fn new(query_type: impl Into<String>) -> Self {
        Self {
            query_type: query_type.into(),
            mutation_type: None,
            subscription_type: None,
            types: FnvHashMap::default(),
        }
    }

    pub fn with_mutation_type(mut self, name: impl Into<String>) -> Self {
        self.mutation_type = Some(name.into());
        self
    }

    pub fn with_subscription_type(mut self, name: impl Into<String>) -> Self {
        self.subscription_type = Some(name.into());
        self
    }

    pub fn add_type(&mut self, type_def: TypeDef<Ctx>) {
        self.types.insert(type_def.name().to_owned(), type_def);
    }

    pub fn type_by_name(&self, name: &str) -> Option<&TypeDef<Ctx>> {
        self.types.get(name)
    }

    pub fn query(&self) -> &TypeDef<Ctx> {
        self.type_by_name(&self.query_type)
            .expect("schema query root type must be registered")
    }

    pub fn mutation(&self) -> Option<&TypeDef<Ctx>> {
        self.mutation_type.as_ref().and_then(|n| self.type_by_name(n))
    }

    pub fn subscription(&self) -> Option<&TypeDef<Ctx>> {
        self.subscription_type.as_ref().and_then(|n| self.type_by_name(n))
    }

    /// Whether `possible_type_name` is one of the concrete members of the
    /// abstract type named `abstract_type_name` (`spec.md` §4.5 step 5).
    pub fn is_possible_type(&self, abstract_type_name: &str, possible_type_name: &str) -> bool {
        self.type_by_name(abstract_type_name)
            .and_then(|t| t.possible_types())
            .is_some_and(|types| types.iter().any(|t| t == possible_type_name))
    }

    /// Whether `object_type_name` can satisfy a selection's type condition
    /// naming `condition_type_name` (`spec.md` §4.2 step 3): equal to,
    /// implemented-by (interface), or contained-in (union).
    pub fn satisfies_type_condition(&self, object_type_name: &str, condition_type_name: &str) -> bool {
        object_type_name == condition_type_name
            || self.is_possible_type(condition_type_name, object_type_name)
    }
}
