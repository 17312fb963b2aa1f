//! Render-time scope: named locals, loop slots and temporaries

use std::borrow::Cow;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::parser::ast::Slot;

/// State of the innermost running `each`
#[derive(Debug)]
pub(crate) struct LoopFrame {
    pub element: Value,
    pub key: Value,
    pub position: usize,
    pub length: usize,
    pub collection: Rc<Value>,
    pub keys: Rc<Value>,
}

#[derive(Debug)]
pub(crate) struct Context<'d> {
    data: &'d Value,
    scopes: Vec<Map<String, Value>>,
    loops: Vec<LoopFrame>,
    temps: [Value; 2],
    depth: usize,
}

impl<'d> Context<'d> {
    pub fn new(data: &'d Value) -> Self {
        Self {
            data,
            scopes: Vec::new(),
            loops: Vec::new(),
            temps: [Value::Null, Value::Null],
            depth: 0,
        }
    }

    /// Innermost binding of `name`, falling back to the data mapping
    pub fn local(&self, name: &str) -> Option<&Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .or_else(|| self.data.as_object().and_then(|data| data.get(name)))
    }

    /// Current value of a reserved slot; null outside of any `each`
    pub fn slot(&self, slot: Slot) -> Cow<'_, Value> {
        if let Slot::Temp(n) = slot {
            return match self.temps.get(usize::from(n)) {
                Some(value) => Cow::Borrowed(value),
                None => Cow::Owned(Value::Null),
            };
        }
        let Some(frame) = self.loops.last() else {
            return Cow::Owned(Value::Null);
        };
        match slot {
            Slot::Element => Cow::Borrowed(&frame.element),
            Slot::Key => Cow::Borrowed(&frame.key),
            Slot::Index => Cow::Owned(Value::from(frame.position)),
            Slot::Collection => Cow::Borrowed(frame.collection.as_ref()),
            Slot::Length => Cow::Owned(Value::from(frame.length)),
            Slot::Keys => Cow::Borrowed(frame.keys.as_ref()),
            Slot::Temp(_) => Cow::Owned(Value::Null),
        }
    }

    pub fn push_scope(&mut self, scope: Map<String, Value>) {
        self.scopes.push(scope);
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn push_loop(&mut self, frame: LoopFrame) {
        self.loops.push(frame);
    }

    pub fn pop_loop(&mut self) {
        self.loops.pop();
    }

    pub fn current_loop(&self) -> Option<&LoopFrame> {
        self.loops.last()
    }

    /// Bind `$0` / `$1`, returning the previous pair
    pub fn replace_temps(&mut self, temps: [Value; 2]) -> [Value; 2] {
        std::mem::replace(&mut self.temps, temps)
    }

    /// Number of `tmpl` inclusions above this context
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Context for an included template: the same data, every visible local
    /// flattened into one scope, then `params` on top. Loop slots and
    /// temporaries start empty.
    pub fn child(&self, params: Map<String, Value>) -> Context<'d> {
        let mut merged = Map::new();
        for scope in &self.scopes {
            for (name, value) in scope {
                merged.insert(name.clone(), value.clone());
            }
        }
        merged.extend(params);

        Context {
            data: self.data,
            scopes: vec![merged],
            loops: Vec::new(),
            temps: [Value::Null, Value::Null],
            depth: self.depth + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(element: Value, position: usize) -> LoopFrame {
        LoopFrame {
            element,
            key: Value::from(position),
            position,
            length: 2,
            collection: Rc::new(json!(["a", "b"])),
            keys: Rc::new(json!([0, 1])),
        }
    }

    #[test]
    fn test_scopes_shadow_data() {
        let data = json!({"name": "data", "other": 1});
        let mut ctx = Context::new(&data);
        assert_eq!(ctx.local("name"), Some(&json!("data")));

        let mut scope = Map::new();
        scope.insert("name".to_string(), json!("loop"));
        ctx.push_scope(scope);
        assert_eq!(ctx.local("name"), Some(&json!("loop")));
        assert_eq!(ctx.local("other"), Some(&json!(1)));

        ctx.pop_scope();
        assert_eq!(ctx.local("name"), Some(&json!("data")));
        assert_eq!(ctx.local("missing"), None);
    }

    #[test]
    fn test_slots_follow_innermost_loop() {
        let data = json!({});
        let mut ctx = Context::new(&data);
        assert_eq!(ctx.slot(Slot::Element).into_owned(), Value::Null);

        ctx.push_loop(frame(json!("a"), 0));
        ctx.push_loop(frame(json!("b"), 1));
        assert_eq!(ctx.slot(Slot::Element).into_owned(), json!("b"));
        assert_eq!(ctx.slot(Slot::Index).into_owned(), json!(1));
        assert_eq!(ctx.slot(Slot::Length).into_owned(), json!(2));
        assert_eq!(ctx.slot(Slot::Collection).into_owned(), json!(["a", "b"]));

        ctx.pop_loop();
        assert_eq!(ctx.slot(Slot::Element).into_owned(), json!("a"));
    }

    #[test]
    fn test_collection_slots_are_borrowed() {
        let data = json!({});
        let mut ctx = Context::new(&data);
        ctx.push_loop(frame(json!("a"), 0));
        assert!(matches!(ctx.slot(Slot::Collection), Cow::Borrowed(_)));
        assert!(matches!(ctx.slot(Slot::Keys), Cow::Borrowed(_)));
        assert!(matches!(ctx.slot(Slot::Element), Cow::Borrowed(_)));
    }

    #[test]
    fn test_temps() {
        let data = json!({});
        let mut ctx = Context::new(&data);
        let previous = ctx.replace_temps([json!(1), json!(2)]);
        assert_eq!(previous, [Value::Null, Value::Null]);
        assert_eq!(ctx.slot(Slot::Temp(1)).into_owned(), json!(2));
    }

    #[test]
    fn test_child_sees_locals_and_params() {
        let data = json!({"site": "x"});
        let mut ctx = Context::new(&data);
        let mut scope = Map::new();
        scope.insert("item".to_string(), json!("outer"));
        ctx.push_scope(scope);
        ctx.push_loop(frame(json!("a"), 0));

        let mut params = Map::new();
        params.insert("title".to_string(), json!("T"));
        let child = ctx.child(params);

        assert_eq!(child.depth(), 1);
        assert_eq!(child.local("item"), Some(&json!("outer")));
        assert_eq!(child.local("title"), Some(&json!("T")));
        assert_eq!(child.local("site"), Some(&json!("x")));
        assert_eq!(child.slot(Slot::Element).into_owned(), Value::Null);
    }
}
