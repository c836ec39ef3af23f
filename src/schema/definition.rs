//! Executable schema record

use crate::core::resolvable::SharedResolvable;
use crate::schema::extension::SchemaExtension;
use crate::schema::types::Type;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Resolves a single type name on demand
pub trait TypeLoader: Send + Sync {
    fn load(&self, name: &str) -> Option<Arc<Type>>;
}

impl<F> TypeLoader for F
where
    F: Fn(&str) -> Option<Arc<Type>> + Send + Sync,
{
    fn load(&self, name: &str) -> Option<Arc<Type>> {
        self(name)
    }
}

/// A named, executable composition of root types plus auxiliary types
///
/// Everything except the extension list and the `resettable` flag is fixed at
/// construction. Non-root types are looked up lazily through the type loader,
/// then through the deferred type list.
pub struct Schema {
    name: String,
    query: Arc<Type>,
    mutation: Option<Arc<Type>>,
    subscription: Option<Arc<Type>>,
    type_loader: Option<Arc<dyn TypeLoader>>,
    types: Option<SharedResolvable<Vec<Arc<Type>>>>,
    resettable: AtomicBool,
    extensions: RwLock<Vec<Arc<dyn SchemaExtension>>>,
    argument_validation: AtomicBool,
}

impl Schema {
    /// Create a schema around its query root
    ///
    /// Schemas start non-resettable and without extensions.
    pub fn new(name: impl Into<String>, query: Arc<Type>) -> Self {
        Self {
            name: name.into(),
            query,
            mutation: None,
            subscription: None,
            type_loader: None,
            types: None,
            resettable: AtomicBool::new(false),
            extensions: RwLock::new(Vec::new()),
            argument_validation: AtomicBool::new(false),
        }
    }

    pub fn with_mutation(mut self, mutation: Option<Arc<Type>>) -> Self {
        self.mutation = mutation;
        self
    }

    pub fn with_subscription(mut self, subscription: Option<Arc<Type>>) -> Self {
        self.subscription = subscription;
        self
    }

    pub fn with_type_loader(mut self, loader: impl TypeLoader + 'static) -> Self {
        self.type_loader = Some(Arc::new(loader));
        self
    }

    /// Deferred list of extra types (interface implementors, input types, ...)
    pub fn with_types(mut self, types: SharedResolvable<Vec<Arc<Type>>>) -> Self {
        self.types = Some(types);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn query(&self) -> &Arc<Type> {
        &self.query
    }

    pub fn mutation(&self) -> Option<&Arc<Type>> {
        self.mutation.as_ref()
    }

    pub fn subscription(&self) -> Option<&Arc<Type>> {
        self.subscription.as_ref()
    }

    /// Look up a type by name
    pub fn get_type(&self, name: &str) -> Option<Arc<Type>> {
        if let Some(root) = self.roots().find(|root| root.name() == name) {
            return Some(root.clone());
        }
        if let Some(scalar) = Type::builtin_scalar(name) {
            return Some(scalar);
        }
        if let Some(loader) = &self.type_loader
            && let Some(ty) = loader.load(name)
        {
            return Some(ty);
        }

        self.types
            .as_ref()
            .and_then(|types| types.resolve().into_iter().find(|ty| ty.name() == name))
    }

    /// Root types followed by the extra types, without duplicates
    pub fn get_types(&self) -> Vec<Arc<Type>> {
        let mut types: Vec<Arc<Type>> = self.roots().cloned().collect();

        if let Some(extra) = &self.types {
            for ty in extra.resolve() {
                if !types.iter().any(|known| known.name() == ty.name()) {
                    types.push(ty);
                }
            }
        }

        types
    }

    pub fn is_resettable(&self) -> bool {
        self.resettable.load(Ordering::SeqCst)
    }

    pub fn set_resettable(&self, resettable: bool) {
        self.resettable.store(resettable, Ordering::SeqCst);
    }

    /// Replace the extension list
    pub fn set_extensions(&self, extensions: Vec<Arc<dyn SchemaExtension>>) {
        *self
            .extensions
            .write()
            .unwrap_or_else(PoisonError::into_inner) = extensions;
    }

    pub fn extensions(&self) -> Vec<Arc<dyn SchemaExtension>> {
        self.extensions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply every attached extension, right before execution
    pub fn process_extensions(&self) {
        for extension in self.extensions() {
            tracing::trace!(schema = %self.name, extension = extension.name(), "Processing extension");
            extension.process(self);
        }
    }

    /// Turn on argument validation for every later execution
    pub fn enable_argument_validation(&self) {
        self.argument_validation.store(true, Ordering::SeqCst);
    }

    pub fn argument_validation_enabled(&self) -> bool {
        self.argument_validation.load(Ordering::SeqCst)
    }

    fn roots(&self) -> impl Iterator<Item = &Arc<Type>> {
        std::iter::once(&self.query)
            .chain(self.mutation.iter())
            .chain(self.subscription.iter())
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("query", &self.query.name())
            .field("mutation", &self.mutation.as_ref().map(|t| t.name().to_string()))
            .field(
                "subscription",
                &self.subscription.as_ref().map(|t| t.name().to_string()),
            )
            .field("resettable", &self.is_resettable())
            .finish()
    }
}
