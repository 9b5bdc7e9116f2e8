//! Built-in method table
//!
//! Get-expressions consult this table before falling back to indexed or
//! keyed access. Each entry produces a native function bound to the
//! receiver, so `[1, 2].length` is a callable and `[1, 2].length()` calls it.

use crate::value::{ArrayRef, ObjectRef, Value};
use std::rc::Rc;

/// Look up `name` on `receiver`'s type, binding the receiver if found
pub fn lookup(receiver: &Value, name: &str) -> Option<Value> {
    match receiver {
        Value::Array(items) => array_method(items, name),
        Value::String(s) => string_method(s, name),
        Value::Object(entries) => object_method(entries, name),
        Value::Number(_) | Value::Bool(_) | Value::Nil | Value::Callable(_) => None,
    }
}

fn array_method(items: &ArrayRef, name: &str) -> Option<Value> {
    let items = Rc::clone(items);
    let method = match name {
        "length" => Value::native("length", 0, move |_| {
            Ok(Value::Number(items.borrow().len() as f64))
        }),
        "push" => Value::native("push", 1, move |args| {
            let mut items = items.borrow_mut();
            items.push(args[0].clone());
            Ok(Value::Number(items.len() as f64))
        }),
        "pop" => Value::native("pop", 0, move |_| {
            Ok(items.borrow_mut().pop().unwrap_or(Value::Nil))
        }),
        _ => return None,
    };
    Some(method)
}

fn string_method(s: &str, name: &str) -> Option<Value> {
    match name {
        "length" => {
            let len = s.chars().count();
            Some(Value::native("length", 0, move |_| Ok(Value::Number(len as f64))))
        }
        _ => None,
    }
}

fn object_method(entries: &ObjectRef, name: &str) -> Option<Value> {
    let entries = Rc::clone(entries);
    let method = match name {
        "keys" => Value::native("keys", 0, move |_| {
            let keys = entries
                .borrow()
                .keys()
                .map(|k| Value::String(k.clone()))
                .collect();
            Ok(Value::array(keys))
        }),
        "has" => Value::native("has", 1, move |args| match &args[0] {
            Value::String(key) => Ok(Value::Bool(entries.borrow().contains_key(key))),
            other => Err(format!("expected string key, got {}", other.type_name())),
        }),
        _ => return None,
    };
    Some(method)
}
