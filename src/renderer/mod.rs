//! Tree-walking renderer
//!
//! Walks a compiled [`Program`] against a data mapping, writing into one
//! output buffer. Nothing is emitted for a template that fails: errors
//! propagate out of [`Renderer::render`] and the partial buffer is dropped.

mod context;
mod eval;
pub mod functions;
pub mod value;

use std::rc::Rc;

use serde_json::{Map, Value};

use crate::compiler::{Branch, Node, Program};
use crate::engine::Engine;
use crate::error::Error;
use crate::parser::ast::{Condition, EachBinding, Expr, InsertMode, TestKind};

use context::{Context, LoopFrame};
use value::{is_empty, loose_eq, to_display, truthy, type_name};

pub use functions::Function;

pub(crate) struct Renderer<'e> {
    engine: &'e Engine,
}

impl<'e> Renderer<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        Self { engine }
    }

    pub fn render(&self, program: &Program, data: &Value) -> Result<String, Error> {
        let mut ctx = Context::new(data);
        let mut out = String::new();
        self.nodes(&program.nodes, &mut ctx, &mut out)?;
        Ok(out)
    }

    fn nodes(&self, nodes: &[Node], ctx: &mut Context<'_>, out: &mut String) -> Result<(), Error> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Insert { expr, mode } => {
                    let value = self.eval(expr, ctx)?;
                    self.insert(&value, *mode, out)?;
                }
                Node::Each {
                    binding,
                    collection,
                    body,
                } => self.each(binding, collection, body, ctx, out)?,
                Node::Conditional {
                    branches,
                    otherwise,
                } => self.conditional(branches, otherwise.as_deref(), ctx, out)?,
                Node::Include { id, params } => self.include(id, params, ctx, out)?,
            }
        }
        Ok(())
    }

    fn insert(&self, value: &Value, mode: InsertMode, out: &mut String) -> Result<(), Error> {
        let host = self.engine.host();
        match mode {
            InsertMode::Escaped => out.push_str(&host.escape(&to_display(value))),
            InsertMode::Raw => out.push_str(&to_display(value)),
            InsertMode::Json => out.push_str(&host.escape(&host.serialize(value)?)),
            InsertMode::RawJson => out.push_str(&host.serialize(value)?),
        }
        Ok(())
    }

    fn each(
        &self,
        binding: &EachBinding,
        collection: &Expr,
        body: &[Node],
        ctx: &mut Context<'_>,
        out: &mut String,
    ) -> Result<(), Error> {
        let value = self.eval(collection, ctx)?;
        let Some(items) = self.engine.host().collection(&value) else {
            if value.is_null() {
                return Ok(());
            }
            return Err(Error::runtime(format!(
                "cannot iterate over {} value of '{}'",
                type_name(&value),
                collection
            )));
        };

        let length = items.len();
        let keys = Rc::new(Value::Array(items.keys()));
        let entries: Vec<(Value, Value)> = items
            .entries()
            .into_iter()
            .map(|(key, element)| (key, element.clone()))
            .collect();
        let shared = Rc::new(value);

        for (position, (key, element)) in entries.into_iter().enumerate() {
            let mut scope = Map::new();
            if let Some(name) = &binding.value {
                scope.insert(name.clone(), element.clone());
            }
            if let Some(name) = &binding.key {
                scope.insert(name.clone(), key.clone());
            }
            if let Some(name) = &binding.index {
                scope.insert(name.clone(), Value::from(position));
            }

            ctx.push_scope(scope);
            ctx.push_loop(LoopFrame {
                element,
                key,
                position,
                length,
                collection: Rc::clone(&shared),
                keys: Rc::clone(&keys),
            });
            let result = self.nodes(body, ctx, out);
            ctx.pop_loop();
            ctx.pop_scope();
            result?;
        }
        Ok(())
    }

    /// Render the first passing branch, else the `{else}` body.
    ///
    /// `$0` and `$1` hold the operands of the last evaluated test while the
    /// chosen body renders.
    fn conditional(
        &self,
        branches: &[Branch],
        otherwise: Option<&[Node]>,
        ctx: &mut Context<'_>,
        out: &mut String,
    ) -> Result<(), Error> {
        let mut temps = [Value::Null, Value::Null];
        let mut chosen = otherwise;
        for branch in branches {
            let (passed, subject, haystack) = self.test(&branch.condition, ctx)?;
            temps = [subject, haystack];
            if passed {
                chosen = Some(branch.body.as_slice());
                break;
            }
        }

        let Some(body) = chosen else {
            return Ok(());
        };
        let saved = ctx.replace_temps(temps);
        let result = self.nodes(body, ctx, out);
        ctx.replace_temps(saved);
        result
    }

    fn test(&self, condition: &Condition, ctx: &Context<'_>) -> Result<(bool, Value, Value), Error> {
        let subject = match &condition.subject {
            Some(expr) => self.eval(expr, ctx)?,
            None => Value::Null,
        };
        let haystack = match &condition.haystack {
            Some(expr) => self.eval(expr, ctx)?,
            None => Value::Null,
        };

        let passed = match condition.kind {
            TestKind::Truthy => truthy(&subject),
            TestKind::Empty => is_empty(&subject),
            TestKind::Key | TestKind::Value => {
                self.contains(condition, &subject, &haystack)?
            }
            TestKind::First | TestKind::Last => {
                let Some(frame) = ctx.current_loop() else {
                    return Err(Error::runtime(format!(
                        "{{{}}} used outside of an {{each}}",
                        condition
                    )));
                };
                match condition.kind {
                    TestKind::First => frame.position == 0,
                    _ => frame.position + 1 == frame.length,
                }
            }
        };
        Ok((passed != condition.negated, subject, haystack))
    }

    /// Membership among the keys or values of `haystack`; null has none
    fn contains(&self, condition: &Condition, needle: &Value, haystack: &Value) -> Result<bool, Error> {
        let Some(items) = self.engine.host().collection(haystack) else {
            if haystack.is_null() {
                return Ok(false);
            }
            return Err(Error::runtime(format!(
                "cannot test membership in {} value in {{{}}}",
                type_name(haystack),
                condition
            )));
        };
        Ok(match condition.kind {
            TestKind::Key => items.keys().iter().any(|key| loose_eq(key, needle)),
            _ => items.values().into_iter().any(|value| loose_eq(value, needle)),
        })
    }

    fn include(
        &self,
        id: &str,
        params: &[(String, Expr)],
        ctx: &Context<'_>,
        out: &mut String,
    ) -> Result<(), Error> {
        let limit = self.engine.config().max_include_depth;
        if ctx.depth() >= limit {
            return Err(Error::IncludeDepth { limit });
        }

        let mut bindings = Map::new();
        for (name, expr) in params {
            bindings.insert(name.clone(), self.eval(expr, ctx)?);
        }
        // the enclosing render records the failure once, with its own data
        let template = self
            .engine
            .resolve_id(id)
            .map_err(|(_, error)| error)?
            .ok_or_else(|| Error::not_found(id))?;

        tracing::trace!(%id, depth = ctx.depth() + 1, "rendering included template");
        let mut child = ctx.child(bindings);
        self.nodes(&template.program().nodes, &mut child, out)
    }
}
