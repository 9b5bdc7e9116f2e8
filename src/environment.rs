//! Variable environment for rogscript
//!
//! Environments form a tree through parent links. They are shared behind
//! `Rc<RefCell<_>>` because a closure keeps its defining scope alive after
//! the block or call that created it has finished.

use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type EnvRef = Rc<RefCell<Environment>>;

/// Variable environment with lexical scoping
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    parent: Option<EnvRef>,
}

impl Environment {
    /// Create a new global environment
    pub fn new() -> EnvRef {
        Rc::new(RefCell::new(Self::default()))
    }

    /// Create a child environment with parent scope
    pub fn with_parent(parent: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Self {
            values: HashMap::new(),
            parent: Some(Rc::clone(parent)),
        }))
    }

    /// Define (or redefine) a variable in this scope
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Read a variable from this scope only
    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    /// Overwrite a variable in this scope only. Returns false if it is not
    /// defined here.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn parent(&self) -> Option<EnvRef> {
        self.parent.clone()
    }

    /// Walk exactly `distance` parent links up from `env`
    pub fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
        let mut current = Rc::clone(env);
        for _ in 0..distance {
            let parent = current.borrow().parent()?;
            current = parent;
        }
        Some(current)
    }

    pub fn get_at(env: &EnvRef, distance: usize, name: &str) -> Option<Value> {
        Self::ancestor(env, distance)?.borrow().get(name)
    }

    pub fn assign_at(env: &EnvRef, distance: usize, name: &str, value: Value) -> bool {
        match Self::ancestor(env, distance) {
            Some(target) => target.borrow_mut().assign(name, value),
            None => false,
        }
    }

    /// Names bound directly in this scope, sorted for stable output
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.values.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_reads_through_distance() {
        let global = Environment::new();
        global.borrow_mut().define("x", Value::Number(1.0));
        let block = Environment::with_parent(&global);
        let inner = Environment::with_parent(&block);

        assert_eq!(Environment::get_at(&inner, 2, "x"), Some(Value::Number(1.0)));
        assert_eq!(Environment::get_at(&inner, 1, "x"), None);
        assert!(Environment::ancestor(&inner, 3).is_none());
    }

    #[test]
    fn test_assign_requires_existing_binding() {
        let global = Environment::new();
        assert!(!global.borrow_mut().assign("x", Value::Nil));

        global.borrow_mut().define("x", Value::Nil);
        let child = Environment::with_parent(&global);
        assert!(Environment::assign_at(&child, 1, "x", Value::Bool(true)));
        assert_eq!(global.borrow().get("x"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_shadowing_in_child_scope() {
        let global = Environment::new();
        global.borrow_mut().define("x", Value::Number(1.0));
        let child = Environment::with_parent(&global);
        child.borrow_mut().define("x", Value::Number(2.0));

        assert_eq!(Environment::get_at(&child, 0, "x"), Some(Value::Number(2.0)));
        assert_eq!(Environment::get_at(&child, 1, "x"), Some(Value::Number(1.0)));
    }
}
