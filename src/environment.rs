use crate::value::{Builtin, BuiltinFn, ExprResult, Value, ValueError};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindingError {
    #[error("{0}: this name was defined previously and cannot be re-defined")]
    AlreadyDefined(String),
    #[error(transparent)]
    Value(#[from] ValueError),
}

/// What a name refers to, looking outward from an environment.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Unbound,
    /// Reserved by a definition that has not been evaluated yet.
    Reserved,
    Bound(ExprResult),
}

#[derive(Debug, Default)]
pub struct Environment {
    outer: Option<Rc<RefCell<Environment>>>,
    /// `None` marks a name reserved but not yet filled. A filled slot keeps
    /// the definition's result even if it failed, so the name still counts
    /// as defined. Kept sorted so listing the names is deterministic.
    bindings: BTreeMap<String, Option<ExprResult>>,
}

impl Environment {
    /// Creates a new, empty top-level environment.
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Environment::default()))
    }

    /// A top-level environment holding the built-in library.
    pub fn new_global_populated() -> Rc<RefCell<Self>> {
        let env_ptr = Environment::new();
        crate::primitives::install(&mut env_ptr.borrow_mut());
        env_ptr
    }

    /// A call frame: `bindings` on top of `outer`, which is left untouched.
    pub fn extend(
        outer: Rc<RefCell<Environment>>,
        bindings: impl IntoIterator<Item = (String, Value)>,
    ) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Environment {
            outer: Some(outer),
            bindings: bindings
                .into_iter()
                .map(|(name, value)| (name, Some(Ok(value))))
                .collect(),
        }))
    }

    /// Binds `name` in this frame, replacing any previous binding.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), Some(Ok(value)));
    }

    pub(crate) fn add_builtin(&mut self, name: &'static str, func: BuiltinFn) {
        self.define(name, Value::Builtin(Builtin { name, func }));
    }

    /// Reserves `name` for a later `fill`. Names that already exist, filled
    /// or not, are left as they are so the redefinition is caught on fill.
    pub fn reserve(&mut self, name: &str) {
        if !self.bindings.contains_key(name) {
            tracing::trace!(name, "reserve");
            self.bindings.insert(name.to_string(), None);
        }
    }

    /// Fills a reserved slot exactly once.
    ///
    /// Panics if `name` was never reserved: every definition is reserved
    /// before any is evaluated.
    pub fn fill(&mut self, name: &str, result: ExprResult) -> Result<(), BindingError> {
        match self.bindings.get_mut(name) {
            Some(slot) if slot.is_none() => {
                tracing::trace!(name, ok = result.is_ok(), "fill");
                *slot = Some(result);
                Ok(())
            }
            Some(_) => Err(BindingError::AlreadyDefined(name.to_string())),
            None => unreachable!("{} was filled without being reserved", name),
        }
    }

    /// Checks this frame first, then walks up the outer chain.
    pub fn lookup(&self, name: &str) -> Lookup {
        match self.bindings.get(name) {
            Some(Some(result)) => Lookup::Bound(result.clone()),
            Some(None) => Lookup::Reserved,
            None => match &self.outer {
                Some(outer_env_ptr) => outer_env_ptr.borrow().lookup(name),
                None => Lookup::Unbound,
            },
        }
    }

    /// Every name visible from this environment, in sorted order.
    pub fn get_identifiers(&self) -> BTreeSet<String> {
        let mut identifiers: BTreeSet<String> = self.bindings.keys().cloned().collect();
        if let Some(outer_env_ptr) = &self.outer {
            identifiers.extend(outer_env_ptr.borrow().get_identifiers());
        }
        identifiers
    }
}
