//! Lazy-loading alias registry
//!
//! A [`SolutionRegistry`] maps a logical id to a factory. Nothing is built at
//! declaration time; the factory runs the first time the id (or one of its
//! aliases) is requested and the produced value is cached under the resolved
//! id until [`SolutionRegistry::reset`].
//!
//! ```rust,ignore
//! let types: SolutionRegistry<Type> = SolutionRegistry::new("type");
//! types.add_solution_with("Query", || Arc::new(query_type()), ["RootQuery"], Map::new());
//!
//! assert!(types.has_solution("RootQuery"));
//! let a = types.get_solution("Query").unwrap();
//! let b = types.get_solution("RootQuery").unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//! ```

use crate::core::resolvable::{Resolvable, SharedResolvable};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Per-solution options bag
pub type SolutionOptions = Map<String, Value>;

/// Hook invoked once for every freshly constructed solution
pub type LoadHook<T> = Arc<dyn Fn(&str, &Arc<T>) + Send + Sync>;

struct SolutionEntry<T: ?Sized> {
    factory: SharedResolvable<Arc<T>>,
    options: SolutionOptions,
}

/// Generic id → lazily constructed value registry with aliases
///
/// All methods take `&self`; the registry is meant to be shared behind an
/// `Arc` by every request of a long-running process.
pub struct SolutionRegistry<T: ?Sized> {
    kind: &'static str,
    factories: RwLock<IndexMap<String, SolutionEntry<T>>>,
    aliases: RwLock<IndexMap<String, String>>,
    solutions: RwLock<HashMap<String, Arc<OnceLock<Arc<T>>>>>,
    on_load: Option<LoadHook<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> SolutionRegistry<T> {
    /// Create an empty registry
    ///
    /// `kind` only labels log lines ("type", "resolver", ...).
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            factories: RwLock::new(IndexMap::new()),
            aliases: RwLock::new(IndexMap::new()),
            solutions: RwLock::new(HashMap::new()),
            on_load: None,
        }
    }

    /// Install the hook run after each fresh construction
    pub fn with_load_hook(mut self, hook: impl Fn(&str, &Arc<T>) + Send + Sync + 'static) -> Self {
        self.on_load = Some(Arc::new(hook));
        self
    }

    /// Declare a solution without aliases or options
    pub fn add_solution(
        &self,
        id: impl Into<String>,
        factory: impl Resolvable<Arc<T>> + 'static,
    ) -> &Self {
        self.add_solution_with(id, factory, Vec::<String>::new(), SolutionOptions::new())
    }

    /// Declare (or replace) a solution
    ///
    /// Purely declarative: the factory is not called. Replacing an id does not
    /// invalidate a value that was already built for it.
    pub fn add_solution_with<I, S>(
        &self,
        id: impl Into<String>,
        factory: impl Resolvable<Arc<T>> + 'static,
        aliases: I,
        options: SolutionOptions,
    ) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = id.into();
        {
            let mut alias_map = self.write_aliases();
            for alias in aliases {
                alias_map.insert(alias.into(), id.clone());
            }
        }

        self.write_factories().insert(
            id,
            SolutionEntry {
                factory: Arc::new(factory),
                options,
            },
        );

        self
    }

    /// Whether a factory is declared for `id` (alias-resolved)
    pub fn has_solution(&self, id: &str) -> bool {
        let id = self.resolve_alias(id);
        self.read_factories().contains_key(&id)
    }

    /// Get the solution for `id`, building it on first access
    ///
    /// Returns `None` for unknown ids; probing is a normal code path.
    pub fn get_solution(&self, id: &str) -> Option<Arc<T>> {
        let id = self.resolve_alias(id);
        let factory = self.read_factories().get(&id)?.factory.clone();

        let cell = self.solution_cell(&id);
        let mut built = false;
        let solution = cell
            .get_or_init(|| {
                built = true;
                tracing::debug!(kind = self.kind, id = %id, "Loading solution");
                factory.resolve()
            })
            .clone();

        if built && let Some(hook) = &self.on_load {
            hook(&id, &solution);
        }

        Some(solution)
    }

    /// Build every declared solution, in declaration order
    pub fn get_solutions(&self) -> IndexMap<String, Arc<T>> {
        let ids: Vec<String> = self.read_factories().keys().cloned().collect();

        ids.into_iter()
            .filter_map(|id| self.get_solution(&id).map(|solution| (id, solution)))
            .collect()
    }

    /// All aliases currently pointing at `id`
    pub fn get_solution_aliases(&self, id: &str) -> Vec<String> {
        self.read_aliases()
            .iter()
            .filter(|(_, target)| target.as_str() == id)
            .map(|(alias, _)| alias.clone())
            .collect()
    }

    /// The full alias → id map
    pub fn get_aliases(&self) -> IndexMap<String, String> {
        self.read_aliases().clone()
    }

    /// Options declared for `id` (alias-resolved), empty when unknown
    pub fn get_solution_options(&self, id: &str) -> SolutionOptions {
        let id = self.resolve_alias(id);
        self.read_factories()
            .get(&id)
            .map(|entry| entry.options.clone())
            .unwrap_or_default()
    }

    /// Whether a value is currently cached for `id` (alias-resolved)
    pub fn is_loaded(&self, id: &str) -> bool {
        let id = self.resolve_alias(id);
        self.read_solutions()
            .get(&id)
            .is_some_and(|cell| cell.get().is_some())
    }

    /// Drop every constructed value; declarations and aliases survive
    pub fn reset(&self) {
        self.write_solutions().clear();
    }

    fn resolve_alias(&self, alias: &str) -> String {
        self.read_aliases()
            .get(alias)
            .cloned()
            .unwrap_or_else(|| alias.to_string())
    }

    fn solution_cell(&self, id: &str) -> Arc<OnceLock<Arc<T>>> {
        if let Some(cell) = self.read_solutions().get(id) {
            return cell.clone();
        }

        self.write_solutions()
            .entry(id.to_string())
            .or_default()
            .clone()
    }

    fn read_factories(&self) -> RwLockReadGuard<'_, IndexMap<String, SolutionEntry<T>>> {
        self.factories.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_factories(&self) -> RwLockWriteGuard<'_, IndexMap<String, SolutionEntry<T>>> {
        self.factories.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_aliases(&self) -> RwLockReadGuard<'_, IndexMap<String, String>> {
        self.aliases.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_aliases(&self) -> RwLockWriteGuard<'_, IndexMap<String, String>> {
        self.aliases.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_solutions(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<OnceLock<Arc<T>>>>> {
        self.solutions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_solutions(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<OnceLock<Arc<T>>>>> {
        self.solutions.write().unwrap_or_else(PoisonError::into_inner)
    }
}
