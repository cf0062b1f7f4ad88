//! Built-in macros and parse-local user macros.

use std::sync::Arc;

use log::Level;
use marduk_markup::{Attribute, RawTagNode};

use crate::error::{LmlError, LmlErrorKind};
use crate::expand::{Expander, Scope, replace_markers};
use crate::value::parse_usize;

use super::{MacroCall, MacroProvider, SyntaxBuilder};

pub(super) fn register(b: &mut SyntaxBuilder) {
    b.register_macro(&["if", "test", "check"], Arc::new(Conditional));
    b.register_macro(&["forEach", "for", "each"], Arc::new(ForEach));
    b.register_macro(&["forEachNested", "nested", "eachNested"], Arc::new(ForEachNested));
    b.register_macro(&["loop", "times"], Arc::new(Loop));
    b.register_macro(&["assign", "var", "val"], Arc::new(Assign));
    b.register_macro(&["calculate", "calculation"], Arc::new(Calculate));
    b.register_macro(&["eval", "evaluate", "invoke"], Arc::new(Eval));
    b.register_macro(&["argument", "preference"], Arc::new(Argument(Source::Arguments)));
    b.register_macro(&["nls"], Arc::new(Argument(Source::Translations)));
    b.register_macro(&["import", "include"], Arc::new(Import));
    b.register_macro(&["comment", "FIXME", "TODO"], Arc::new(Comment));
    b.register_macro(&["replace", "replaceArguments", "noOp", "root"], Arc::new(Replace));
    b.register_macro(&["log", "logInfo", "info"], Arc::new(Log(Level::Info)));
    b.register_macro(&["debug", "logDebug", "trace", "logTrace"], Arc::new(Log(Level::Debug)));
    b.register_macro(&["logError"], Arc::new(Log(Level::Error)));
    b.register_macro(&["exception", "throw", "error"], Arc::new(Exception));
    b.register_macro(&["style"], Arc::new(Style));
    b.register_macro(&["macro"], Arc::new(Define));
    b.register_macro(&["exists", "notNull", "ifNotNull"], Arc::new(Exists { all: true }));
    b.register_macro(&["anyNotNull", "any"], Arc::new(Exists { all: false }));
}

const ELSE: &str = "else";
const DEFAULT_MARKER: &str = "content";

/// The message of a logging or exception macro: inner text if any, then a
/// `message` attribute, then every attribute value.
fn message(call: &MacroCall, cx: &Expander<'_>, scope: &Scope<'_>) -> Result<String, LmlError> {
    if !call.text.trim().is_empty() {
        return cx.interpolate(&call.text, scope);
    }
    if let Some(message) = call.attr("message") {
        return Ok(message.to_string());
    }
    Ok(call.attributes.iter().map(|a| a.value.as_str()).collect::<Vec<_>>().join(" "))
}

// ── conditionals ──────────────────────────────────────────────────────────

/// `<:if test="expr">then<:else/>otherwise</:if>`. Without `test`, the first
/// attribute value is the condition. The condition is evaluated raw, with
/// `{…}` placeholders resolved as operands.
struct Conditional;

impl MacroProvider for Conditional {
    fn interpolates_attributes(&self) -> bool {
        false
    }

    fn expand(&self, call: &MacroCall, cx: &mut Expander<'_>, scope: &mut Scope<'_>) -> Result<Vec<RawTagNode>, LmlError> {
        let condition = call
            .attr("test")
            .or_else(|| call.attributes.first().map(|a| a.value.as_str()))
            .ok_or_else(|| call.error(LmlErrorKind::construction(format!("<:{}> needs a condition", call.name))))?;

        let split = call.children.iter().position(|n| n.is_macro && n.name.eq_ignore_ascii_case(ELSE));
        let (then, otherwise) = match split {
            Some(i) => (&call.children[..i], &call.children[i + 1..]),
            None => (&call.children[..], &[][..]),
        };

        let branch = if cx.evaluate(condition, scope)?.is_truthy() { then } else { otherwise };
        cx.expand_nodes(branch, scope)
    }
}

/// `<:exists var="a;b">`: children only when every listed name is bound.
/// With `all` unset (`<:any>`), one bound name is enough.
struct Exists {
    all: bool,
}

impl MacroProvider for Exists {
    fn expand(&self, call: &MacroCall, cx: &mut Expander<'_>, scope: &mut Scope<'_>) -> Result<Vec<RawTagNode>, LmlError> {
        let names: Vec<String> = call.attributes.iter().flat_map(|a| cx.list(&a.value)).collect();
        let bound = |name: &String| cx.lookup(name, scope).is_some();
        let pass = if self.all { names.iter().all(bound) } else { names.iter().any(bound) };
        if pass {
            cx.expand_nodes(&call.children, scope)
        } else {
            Ok(Vec::new())
        }
    }
}

// ── loops ─────────────────────────────────────────────────────────────────

/// `<:forEach item="a;b;c">`: one copy of the children per item. Several
/// attributes iterate in lockstep and must have the same length.
struct ForEach;

impl MacroProvider for ForEach {
    fn expand(&self, call: &MacroCall, cx: &mut Expander<'_>, scope: &mut Scope<'_>) -> Result<Vec<RawTagNode>, LmlError> {
        let lists: Vec<(&str, Vec<String>)> =
            call.attributes.iter().map(|a| (a.name.as_str(), cx.list(&a.value))).collect();
        let Some((_, first)) = lists.first() else {
            return Err(call.error(LmlErrorKind::construction("<:forEach> needs at least one list")));
        };
        let len = first.len();
        if let Some((name, list)) = lists.iter().find(|(_, list)| list.len() != len) {
            return Err(call.error(LmlErrorKind::construction(format!(
                "`{name}` has {} items, expected {len}",
                list.len()
            ))));
        }

        let mut out = Vec::new();
        for i in 0..len {
            cx.charge()?;
            let mut inner = scope.child();
            for (name, list) in &lists {
                inner.bind(*name, list[i].as_str());
                inner.bind(format!("{name}:index"), i.to_string());
            }
            out.extend(cx.expand_nodes(&call.children, &mut inner)?);
        }
        Ok(out)
    }
}

/// `<:forEachNested a="1;2" b="x;y">`: one copy per combination, the first
/// attribute varying slowest. Any empty list yields nothing.
struct ForEachNested;

impl MacroProvider for ForEachNested {
    fn expand(&self, call: &MacroCall, cx: &mut Expander<'_>, scope: &mut Scope<'_>) -> Result<Vec<RawTagNode>, LmlError> {
        let lists: Vec<(&str, Vec<String>)> =
            call.attributes.iter().map(|a| (a.name.as_str(), cx.list(&a.value))).collect();
        if lists.is_empty() {
            return Err(call.error(LmlErrorKind::construction(format!("<:{}> needs at least one list", call.name))));
        }
        let mut out = Vec::new();
        if lists.iter().any(|(_, list)| list.is_empty()) {
            return Ok(out);
        }

        let mut indices = vec![0; lists.len()];
        loop {
            cx.charge()?;
            let mut inner = scope.child();
            for ((name, list), &i) in lists.iter().zip(&indices) {
                inner.bind(*name, list[i].as_str());
                inner.bind(format!("{name}:index"), i.to_string());
            }
            out.extend(cx.expand_nodes(&call.children, &mut inner)?);

            // Odometer step: the last list turns fastest.
            let mut pos = lists.len();
            loop {
                if pos == 0 {
                    return Ok(out);
                }
                pos -= 1;
                indices[pos] += 1;
                if indices[pos] < lists[pos].1.len() {
                    break;
                }
                indices[pos] = 0;
            }
        }
    }
}

/// `<:loop times="3" var="i">`.
struct Loop;

impl MacroProvider for Loop {
    fn expand(&self, call: &MacroCall, cx: &mut Expander<'_>, scope: &mut Scope<'_>) -> Result<Vec<RawTagNode>, LmlError> {
        let times = call
            .attr("times")
            .or_else(|| call.attributes.first().map(|a| a.value.as_str()))
            .ok_or_else(|| call.error(LmlErrorKind::construction("<:loop> needs `times`")))?;
        let times = parse_usize(times).map_err(|e| call.error(e.into()))?;
        let var = call.attr("var").unwrap_or("index");

        let mut out = Vec::new();
        for i in 0..times {
            cx.charge()?;
            let mut inner = scope.child();
            inner.bind(var, i.to_string());
            out.extend(cx.expand_nodes(&call.children, &mut inner)?);
        }
        Ok(out)
    }
}

// ── bindings ──────────────────────────────────────────────────────────────

/// `<:assign name="value"/>`: binds for later siblings.
struct Assign;

impl MacroProvider for Assign {
    fn expand(&self, call: &MacroCall, _cx: &mut Expander<'_>, scope: &mut Scope<'_>) -> Result<Vec<RawTagNode>, LmlError> {
        for attribute in &call.attributes {
            scope.bind(attribute.name.as_str(), attribute.value.as_str());
        }
        Ok(Vec::new())
    }
}

/// `<:calculate sum="{a} + 1"/>`: binds the evaluated expression.
struct Calculate;

impl MacroProvider for Calculate {
    fn interpolates_attributes(&self) -> bool {
        false
    }

    fn expand(&self, call: &MacroCall, cx: &mut Expander<'_>, scope: &mut Scope<'_>) -> Result<Vec<RawTagNode>, LmlError> {
        for attribute in &call.attributes {
            let value = cx.evaluate(&attribute.value, scope)?;
            scope.bind(attribute.name.as_str(), value.to_string());
        }
        Ok(Vec::new())
    }
}

/// `<:eval user="$currentUser"/>`: binds an action's result. An action that
/// returns nothing leaves the name unbound.
struct Eval;

impl MacroProvider for Eval {
    fn expand(&self, call: &MacroCall, cx: &mut Expander<'_>, scope: &mut Scope<'_>) -> Result<Vec<RawTagNode>, LmlError> {
        for attribute in &call.attributes {
            if let Some(value) = cx.invoke_action(&attribute.value)? {
                scope.bind(attribute.name.as_str(), value);
            }
        }
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, Copy)]
enum Source {
    Arguments,
    Translations,
}

/// `<:argument title="windowTitle"/>`: binds `title` to the value of the
/// variable or parser argument `windowTitle` (for `<:nls>`, the translation).
/// A missing key leaves the name unbound, for `<:exists>` to test.
struct Argument(Source);

impl MacroProvider for Argument {
    fn expand(&self, call: &MacroCall, cx: &mut Expander<'_>, scope: &mut Scope<'_>) -> Result<Vec<RawTagNode>, LmlError> {
        for attribute in &call.attributes {
            let key = attribute.value.trim();
            let value = match self.0 {
                Source::Arguments => cx.lookup(key, scope),
                Source::Translations => cx.translate(key),
            };
            match value {
                Some(value) => scope.bind(attribute.name.as_str(), value),
                None => log::debug!("{}: `{key}` not found, `{}` left unbound", call.path, attribute.name),
            }
        }
        Ok(Vec::new())
    }
}

// ── structure ─────────────────────────────────────────────────────────────

/// `<:import path="row.lml" replace="content">children</:import>`.
struct Import;

impl MacroProvider for Import {
    fn expand(&self, call: &MacroCall, cx: &mut Expander<'_>, scope: &mut Scope<'_>) -> Result<Vec<RawTagNode>, LmlError> {
        let path = call.required("path")?;
        let marker = call.attr("replace").unwrap_or(DEFAULT_MARKER);
        cx.import(path, marker, &call.children, scope)
    }
}

/// Drops itself and everything inside.
struct Comment;

impl MacroProvider for Comment {
    fn interpolates_attributes(&self) -> bool {
        false
    }

    fn expand(&self, _call: &MacroCall, _cx: &mut Expander<'_>, _scope: &mut Scope<'_>) -> Result<Vec<RawTagNode>, LmlError> {
        Ok(Vec::new())
    }
}

/// Replaces itself with its expanded children.
struct Replace;

impl MacroProvider for Replace {
    fn expand(&self, call: &MacroCall, cx: &mut Expander<'_>, scope: &mut Scope<'_>) -> Result<Vec<RawTagNode>, LmlError> {
        cx.expand_nodes(&call.children, scope)
    }
}

struct Log(Level);

impl MacroProvider for Log {
    fn expand(&self, call: &MacroCall, cx: &mut Expander<'_>, scope: &mut Scope<'_>) -> Result<Vec<RawTagNode>, LmlError> {
        let message = message(call, cx, scope)?;
        log::log!(self.0, "{}: {message}", call.path);
        Ok(Vec::new())
    }
}

struct Exception;

impl MacroProvider for Exception {
    fn expand(&self, call: &MacroCall, cx: &mut Expander<'_>, scope: &mut Scope<'_>) -> Result<Vec<RawTagNode>, LmlError> {
        let message = message(call, cx, scope)?;
        Err(call.error(LmlErrorKind::Thrown(message)))
    }
}

/// `<:style tag="label" name="wrap" value="true"/>`. `tag` may be a list.
struct Style;

impl MacroProvider for Style {
    fn expand(&self, call: &MacroCall, cx: &mut Expander<'_>, _scope: &mut Scope<'_>) -> Result<Vec<RawTagNode>, LmlError> {
        let tags = cx.list(call.required("tag")?);
        let name = call.required("name")?;
        let value = call.required("value")?;
        for tag in tags {
            cx.add_style(&tag, Attribute::new(name, value));
        }
        Ok(Vec::new())
    }
}

// ── user macros ───────────────────────────────────────────────────────────

/// `<:macro alias="row" replace="content" title="Untitled">body</:macro>`.
///
/// Attributes other than `alias` and `replace` are parameters with their
/// default values. The body is kept unexpanded until invocation.
struct Define;

impl MacroProvider for Define {
    fn interpolates_attributes(&self) -> bool {
        false
    }

    fn expand(&self, call: &MacroCall, cx: &mut Expander<'_>, _scope: &mut Scope<'_>) -> Result<Vec<RawTagNode>, LmlError> {
        let aliases = cx.list(call.required("alias")?);
        if aliases.is_empty() {
            return Err(call.error(LmlErrorKind::construction("<:macro> alias must not be empty")));
        }
        let user = Arc::new(UserMacro {
            marker: call.attr("replace").unwrap_or(DEFAULT_MARKER).to_string(),
            params: call.attributes.iter().filter(|a| !a.is("alias") && !a.is("replace")).cloned().collect(),
            body: call.children.clone(),
        });
        for alias in &aliases {
            cx.define_macro(alias, user.clone());
        }
        Ok(Vec::new())
    }
}

struct UserMacro {
    marker: String,
    params: Vec<Attribute>,
    body: Vec<RawTagNode>,
}

impl MacroProvider for UserMacro {
    fn expand(&self, call: &MacroCall, cx: &mut Expander<'_>, scope: &mut Scope<'_>) -> Result<Vec<RawTagNode>, LmlError> {
        let mut inner = scope.child();
        for param in &self.params {
            let value = cx.interpolate(&param.value, &inner)?;
            inner.bind(param.name.as_str(), value);
        }
        for attribute in &call.attributes {
            inner.bind(attribute.name.as_str(), attribute.value.as_str());
        }
        let body = replace_markers(&self.body, &self.marker, &call.children);
        cx.expand_nodes(&body, &mut inner)
    }
}
