//! Text template with directives: `{{if cond}}…{{endif}}`,
//! `{{each item in coll}}…{{endeach}}`, `{{var}}`, `{{fn(arg,…)}}`.
//!
//! Nested `if`/`each` are supported; an unclosed block fails with
//! [`TemplateError::UnclosedBlock`]. Parameters are collected into a
//! numbered set (`p0`, `p1`, …) by default; [`Context::literal_mode`]
//! switches to inlining values directly instead.

use std::collections::HashMap;

use super::placeholder::TemplateError;

/// A value bound in a render [`Context`] — a plain string or a list, the
/// two shapes `{{var}}`/`{{each}}` need.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    List(Vec<Value>),
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty() && s != "false" && s != "0",
            Value::List(items) => !items.is_empty(),
        }
    }

    fn as_str(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::List(items) => items.iter().map(Value::as_str).collect::<Vec<_>>().join(", "),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Context {
    vars: HashMap<String, Value>,
    literal_mode: bool,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: Value) -> Self {
        self.vars.insert(name.into(), value);
        self
    }

    /// Render values as SQL literals instead of collecting them as bound
    /// parameters.
    pub fn literal_mode(mut self) -> Self {
        self.literal_mode = true;
        self
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Var(String),
    Fn(String, Vec<String>),
    If(String, Vec<Node>),
    Each(String, String, Vec<Node>),
}

/// Parse `source` into a tree of [`Node`]s, recursing into nested
/// `if`/`each` blocks as they open.
fn parse(source: &str) -> Result<(Vec<Node>, &str), TemplateError> {
    let mut nodes = Vec::new();
    let mut rest = source;

    loop {
        match rest.find("{{") {
            None => {
                if !rest.is_empty() {
                    nodes.push(Node::Text(rest.to_string()));
                }
                return Ok((nodes, ""));
            }
            Some(start) => {
                if start > 0 {
                    nodes.push(Node::Text(rest[..start].to_string()));
                }
                let after = &rest[start + 2..];
                let end = after.find("}}").ok_or(TemplateError::UnclosedBrace)?;
                let directive = after[..end].trim();
                let tail = &after[end + 2..];

                if directive == "endif" || directive == "endeach" {
                    return Ok((nodes, tail));
                }

                if let Some(cond) = directive.strip_prefix("if ") {
                    let (body, remainder) = parse(tail)?;
                    nodes.push(Node::If(cond.trim().to_string(), body));
                    rest = remainder;
                    continue;
                }

                if let Some(each_expr) = directive.strip_prefix("each ") {
                    let (item, coll) = each_expr.split_once(" in ").ok_or_else(|| TemplateError::EachMissingItemIn(each_expr.trim().to_string()))?;
                    let (body, remainder) = parse(tail)?;
                    nodes.push(Node::Each(item.trim().to_string(), coll.trim().to_string(), body));
                    rest = remainder;
                    continue;
                }

                if directive.ends_with(')') {
                    if let Some(open) = directive.find('(') {
                        let name = directive[..open].trim().to_string();
                        let args_str = &directive[open + 1..directive.len() - 1];
                        let args = args_str.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect();
                        nodes.push(Node::Fn(name, args));
                        rest = tail;
                        continue;
                    }
                }

                nodes.push(Node::Var(directive.to_string()));
                rest = tail;
            }
        }
    }
}

fn resolve<'a>(ctx: &'a Context, name: &str) -> Result<&'a Value, TemplateError> {
    ctx.get(name).ok_or_else(|| TemplateError::UnknownVariable(name.to_string()))
}

fn apply_fn(name: &str, args: &[String], ctx: &Context) -> Result<String, TemplateError> {
    let rendered_args: Result<Vec<String>, TemplateError> = args
        .iter()
        .map(|a| match ctx.get(a) {
            Some(v) => Ok(v.as_str()),
            None => Ok(a.clone()),
        })
        .collect();
    let rendered_args = rendered_args?;
    let joined = rendered_args.join(", ");
    Ok(match name {
        "upper" => joined.to_ascii_uppercase(),
        "lower" => joined.to_ascii_lowercase(),
        "trim" => joined.trim().to_string(),
        other => format!("{other}({joined})"),
    })
}

fn render_nodes(nodes: &[Node], ctx: &Context, out: &mut String, params: &mut Vec<String>) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(name) => {
                let value = resolve(ctx, name)?;
                if ctx.literal_mode {
                    out.push_str(&value.as_str());
                } else {
                    let pname = format!("p{}", params.len());
                    params.push(pname.clone());
                    out.push_str(&pname);
                }
            }
            Node::Fn(name, args) => out.push_str(&apply_fn(name, args, ctx)?),
            Node::If(cond, body) => {
                let truthy = ctx.get(cond).map(Value::truthy).unwrap_or(false);
                if truthy {
                    render_nodes(body, ctx, out, params)?;
                }
            }
            Node::Each(item, coll, body) => {
                let items = match resolve(ctx, coll)? {
                    Value::List(items) => items.clone(),
                    other => vec![other.clone()],
                };
                for element in items {
                    let scoped = ctx.clone().set(item.clone(), element);
                    render_nodes(body, &scoped, out, params)?;
                }
            }
        }
    }
    Ok(())
}

/// Render `source` against `ctx`, returning the rendered text and the
/// ordered parameter names introduced (empty when `ctx` is in literal mode).
pub fn render(source: &str, ctx: &Context) -> Result<(String, Vec<String>), TemplateError> {
    let (nodes, remainder) = parse(source)?;
    if !remainder.is_empty() {
        return Err(TemplateError::UnclosedBlock);
    }
    let mut out = String::new();
    let mut params = Vec::new();
    render_nodes(&nodes, ctx, &mut out, &mut params)?;
    Ok((out, params))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_plain_var_as_parameter_by_default() {
        let ctx = Context::new().set("name", Value::Str("Ada".into()));
        let (sql, params) = render("SELECT {{name}}", &ctx).unwrap();
        assert_eq!(sql, "SELECT p0");
        assert_eq!(params, vec!["p0"]);
    }

    #[test]
    fn literal_mode_inlines_the_value() {
        let ctx = Context::new().set("name", Value::Str("Ada".into())).literal_mode();
        let (sql, params) = render("SELECT {{name}}", &ctx).unwrap();
        assert_eq!(sql, "SELECT Ada");
        assert!(params.is_empty());
    }

    #[test]
    fn if_directive_gates_its_body() {
        let ctx = Context::new().set("flag", Value::Str("".into()));
        let (sql, _) = render("a{{if flag}}b{{endif}}c", &ctx).unwrap();
        assert_eq!(sql, "ac");
    }

    #[test]
    fn each_directive_iterates_and_scopes_item() {
        let ctx = Context::new()
            .set("cols", Value::List(vec![Value::Str("id".into()), Value::Str("name".into())]))
            .literal_mode();
        let (sql, _) = render("{{each col in cols}}[{{col}}]{{endeach}}", &ctx).unwrap();
        assert_eq!(sql, "[id][name]");
    }

    #[test]
    fn nested_if_inside_each() {
        let ctx = Context::new()
            .set("cols", Value::List(vec![Value::Str("id".into())]))
            .set("flag", Value::Str("yes".into()))
            .literal_mode();
        let (sql, _) = render("{{each col in cols}}{{if flag}}{{col}}{{endif}}{{endeach}}", &ctx).unwrap();
        assert_eq!(sql, "id");
    }

    #[test]
    fn unclosed_each_fails() {
        let err = render("{{each col in cols}}x", &Context::new()).unwrap_err();
        assert_eq!(err, TemplateError::UnclosedBlock);
    }

    #[test]
    fn each_without_item_in_coll_fails() {
        let err = render("{{each cols}}x{{endeach}}", &Context::new()).unwrap_err();
        assert!(matches!(err, TemplateError::EachMissingItemIn(_)));
    }

    #[test]
    fn function_call_applies_to_its_arguments() {
        let ctx = Context::new().set("name", Value::Str("Ada".into())).literal_mode();
        let (sql, _) = render("{{upper(name)}}", &ctx).unwrap();
        assert_eq!(sql, "ADA");
    }
}
