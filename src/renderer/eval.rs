//! Expression evaluation

use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::error::Error;
use crate::parser::ast::{BinaryOp, Expr, Root, Segment};

use super::context::Context;
use super::value::{binary, to_display, truthy, type_name};
use super::Renderer;

impl Renderer<'_> {
    pub(super) fn eval(&self, expr: &Expr, ctx: &Context<'_>) -> Result<Value, Error> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Group(inner) => self.eval(inner, ctx),
            Expr::Array(items) => Ok(Value::Array(self.eval_all(items, ctx)?)),
            Expr::Object(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key.clone(), self.eval(value, ctx)?);
                }
                Ok(Value::Object(map))
            }
            Expr::Variable { root, path } => self.variable(expr, root, path, ctx),
            Expr::Binary { first, rest } => self.chain(first, rest, ctx),
        }
    }

    fn eval_all(&self, exprs: &[Expr], ctx: &Context<'_>) -> Result<Vec<Value>, Error> {
        exprs.iter().map(|expr| self.eval(expr, ctx)).collect()
    }

    /// Left to right; `&&` and `||` skip their right operand when decided
    fn chain(&self, first: &Expr, rest: &[(BinaryOp, Expr)], ctx: &Context<'_>) -> Result<Value, Error> {
        let mut acc = self.eval(first, ctx)?;
        for (op, operand) in rest {
            acc = match op {
                BinaryOp::And if !truthy(&acc) => acc,
                BinaryOp::Or if truthy(&acc) => acc,
                BinaryOp::And | BinaryOp::Or => self.eval(operand, ctx)?,
                _ => {
                    let rhs = self.eval(operand, ctx)?;
                    binary(*op, &acc, &rhs)
                }
            };
        }
        Ok(acc)
    }

    fn variable(
        &self,
        expr: &Expr,
        root: &Root,
        path: &[Segment],
        ctx: &Context<'_>,
    ) -> Result<Value, Error> {
        self.resolve(expr, root, path, ctx).map(Cow::into_owned)
    }

    /// Walk a variable path by reference; only computed steps are owned
    pub(super) fn resolve<'c>(
        &self,
        expr: &Expr,
        root: &Root,
        path: &[Segment],
        ctx: &'c Context<'_>,
    ) -> Result<Cow<'c, Value>, Error> {
        let mut i = 0;
        let mut current = match (root, path.first()) {
            (Root::Local(name), Some(Segment::Call(args))) => {
                i = 1;
                let args = self.eval_all(args, ctx)?;
                Cow::Owned(self.call(name, &args)?)
            }
            (Root::Local(name), _) => match ctx.local(name) {
                Some(value) => Cow::Borrowed(value),
                None => Cow::Owned(Value::Null),
            },
            (Root::Slot(slot), _) => ctx.slot(*slot),
        };

        while i < path.len() {
            current = match &path[i] {
                // `a.f(x)` is `f(a, x)`
                Segment::Field(name) => match path.get(i + 1) {
                    Some(Segment::Call(args)) => {
                        i += 1;
                        let mut values = vec![current.into_owned()];
                        values.extend(self.eval_all(args, ctx)?);
                        Cow::Owned(self.call(name, &values)?)
                    }
                    _ => step(current, name, expr)?,
                },
                Segment::Index(index) => {
                    let key = to_display(&self.eval(index, ctx)?);
                    step(current, &key, expr)?
                }
                Segment::Call(_) => {
                    return Err(Error::runtime(format!(
                        "'{}' calls a {} value",
                        expr,
                        type_name(&current)
                    )));
                }
            };
            i += 1;
        }
        Ok(current)
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Value, Error> {
        let function = self.engine.function(name).ok_or_else(|| Error::UnknownFunction {
            name: name.to_string(),
        })?;
        function(args).map_err(|message| Error::Function {
            name: name.to_string(),
            message,
        })
    }
}

fn step<'v>(current: Cow<'v, Value>, key: &str, expr: &Expr) -> Result<Cow<'v, Value>, Error> {
    match current {
        Cow::Borrowed(parent) => member(parent, key, expr),
        Cow::Owned(parent) => member(&parent, key, expr).map(|value| Cow::Owned(value.into_owned())),
    }
}

/// Property `key` of `parent`
///
/// Reading through null is an error; other scalars have no properties.
fn member<'v>(parent: &'v Value, key: &str, expr: &Expr) -> Result<Cow<'v, Value>, Error> {
    let found = match parent {
        Value::Null => {
            return Err(Error::runtime(format!(
                "cannot read '{}' of null in '{}'",
                key, expr
            )));
        }
        Value::Object(map) => map.get(key),
        Value::Array(items) if key == "length" => return Ok(Cow::Owned(Value::from(items.len()))),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        Value::String(s) if key == "length" => return Ok(Cow::Owned(Value::from(s.chars().count()))),
        Value::String(s) => {
            let c = key.parse::<usize>().ok().and_then(|i| s.chars().nth(i));
            return Ok(Cow::Owned(c.map_or(Value::Null, |c| Value::String(c.to_string()))));
        }
        Value::Bool(_) | Value::Number(_) => None,
    };
    Ok(found.map_or(Cow::Owned(Value::Null), Cow::Borrowed))
}
