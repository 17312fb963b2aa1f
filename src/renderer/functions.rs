//! Built-in template functions
//!
//! A call `f(a, b)` or `a.f(b)` looks `f` up in the engine's function table.
//! Functions receive evaluated arguments; missing arguments read as null.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::value::{number_value, to_display, to_number, truthy};

/// A callable registered on an engine
pub type Function = Arc<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>;

fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&Value::Null)
}

fn text(args: &[Value], map: impl Fn(&str) -> String) -> Result<Value, String> {
    Ok(Value::String(map(&to_display(arg(args, 0)))))
}

fn num(args: &[Value]) -> Result<Value, String> {
    Ok(number_value(to_number(arg(args, 0))))
}

fn len(args: &[Value]) -> Result<Value, String> {
    match arg(args, 0) {
        Value::Null => Ok(Value::from(0)),
        Value::String(s) => Ok(Value::from(s.chars().count())),
        Value::Array(items) => Ok(Value::from(items.len())),
        Value::Object(map) => Ok(Value::from(map.len())),
        other => Err(format!("expected a string or collection, got {}", other)),
    }
}

fn keys(args: &[Value]) -> Result<Value, String> {
    match arg(args, 0) {
        Value::Null => Ok(Value::Array(Vec::new())),
        Value::Array(items) => Ok(Value::Array((0..items.len()).map(Value::from).collect())),
        Value::Object(map) => Ok(Value::Array(map.keys().cloned().map(Value::String).collect())),
        other => Err(format!("expected a collection, got {}", other)),
    }
}

fn values(args: &[Value]) -> Result<Value, String> {
    match arg(args, 0) {
        Value::Null => Ok(Value::Array(Vec::new())),
        Value::Array(items) => Ok(Value::Array(items.clone())),
        Value::Object(map) => Ok(Value::Array(map.values().cloned().collect())),
        other => Err(format!("expected a collection, got {}", other)),
    }
}

/// `join(list, sep)`; the separator defaults to `,`
fn join(args: &[Value]) -> Result<Value, String> {
    let separator = match args.get(1) {
        Some(sep) if !sep.is_null() => to_display(sep),
        _ => ",".to_string(),
    };
    match arg(args, 0) {
        Value::Null => Ok(Value::String(String::new())),
        Value::Array(items) => Ok(Value::String(
            items.iter().map(to_display).collect::<Vec<_>>().join(&separator),
        )),
        other => Err(format!("expected an array, got {}", other)),
    }
}

/// `default(value, fallback)`: the fallback replaces any falsy value
fn default(args: &[Value]) -> Result<Value, String> {
    let value = arg(args, 0);
    Ok(if truthy(value) { value } else { arg(args, 1) }.clone())
}

/// The function table every engine starts with
pub fn builtins() -> HashMap<String, Function> {
    let mut table: HashMap<String, Function> = HashMap::new();
    table.insert("num".to_string(), Arc::new(num));
    table.insert("str".to_string(), Arc::new(|args: &[Value]| text(args, str::to_string)));
    table.insert("len".to_string(), Arc::new(len));
    table.insert("upper".to_string(), Arc::new(|args: &[Value]| text(args, str::to_uppercase)));
    table.insert("lower".to_string(), Arc::new(|args: &[Value]| text(args, str::to_lowercase)));
    table.insert("trim".to_string(), Arc::new(|args: &[Value]| text(args, |s| s.trim().to_string())));
    table.insert("keys".to_string(), Arc::new(keys));
    table.insert("values".to_string(), Arc::new(values));
    table.insert("join".to_string(), Arc::new(join));
    table.insert("default".to_string(), Arc::new(default));
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: &str, args: &[Value]) -> Result<Value, String> {
        let table = builtins();
        let function = table.get(name).expect("builtin exists");
        function(args)
    }

    #[test]
    fn test_num() {
        assert_eq!(call("num", &[json!("42")]), Ok(json!(42)));
        assert_eq!(call("num", &[json!("1.5")]), Ok(json!(1.5)));
        assert_eq!(call("num", &[json!("abc")]), Ok(Value::Null));
    }

    #[test]
    fn test_text_functions() {
        assert_eq!(call("upper", &[json!("abc")]), Ok(json!("ABC")));
        assert_eq!(call("lower", &[json!("ABC")]), Ok(json!("abc")));
        assert_eq!(call("trim", &[json!("  x ")]), Ok(json!("x")));
        assert_eq!(call("str", &[json!(7)]), Ok(json!("7")));
    }

    #[test]
    fn test_len() {
        assert_eq!(call("len", &[json!([1, 2, 3])]), Ok(json!(3)));
        assert_eq!(call("len", &[json!("héllo")]), Ok(json!(5)));
        assert_eq!(call("len", &[]), Ok(json!(0)));
        assert!(call("len", &[json!(5)]).is_err());
    }

    #[test]
    fn test_collections() {
        assert_eq!(call("keys", &[json!({"b": 1, "a": 2})]), Ok(json!(["b", "a"])));
        assert_eq!(call("values", &[json!({"b": 1, "a": 2})]), Ok(json!([1, 2])));
        assert_eq!(call("join", &[json!([1, 2, 3]), json!(" | ")]), Ok(json!("1 | 2 | 3")));
        assert_eq!(call("join", &[json!(["a", "b"])]), Ok(json!("a,b")));
    }

    #[test]
    fn test_default() {
        assert_eq!(call("default", &[json!(""), json!("n/a")]), Ok(json!("n/a")));
        assert_eq!(call("default", &[json!("x"), json!("n/a")]), Ok(json!("x")));
        assert_eq!(call("default", &[]), Ok(Value::Null));
    }
}
