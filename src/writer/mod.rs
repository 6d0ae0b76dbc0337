//! Clause compiler.
//!
//! One `CypherWriter` per compilation session: it owns the scope and an
//! accumulating text buffer. Clause methods are infallible at the call site;
//! the first structural error is recorded on the scope and every later call
//! short-circuits, so the whole chain surfaces a single error at `compile()`.
//!
//! Formatting rules:
//! - a clause with one item renders on one line, more than one item renders
//!   the keyword alone and the items comma-separated, one per line, indented
//! - adjacent MATCH items with the same optionality share one keyword; each
//!   optionality run gets its own MATCH / OPTIONAL MATCH
//! - MERGE's ON CREATE / ON MATCH blocks nest their SET one level deeper
//! - FOREACH bodies compile in an isolated child writer and splice in as a
//!   single line between `(` and `)`

use std::collections::HashMap;

use crate::binder::BindTarget;
use crate::pattern::{Direction, Pattern, Patterns, RelationshipLink};
use crate::registry::Registry;
use crate::scope::{CompileError, Condition, Identifier, Member, Position, Scope};
use crate::value::Value;

mod projection;

/// Terminal artifact of one compilation session. Tied to the target value
/// addresses of that session; not reusable across concurrent executions.
#[derive(Debug)]
pub struct CompiledQuery {
    pub text: String,
    pub parameters: HashMap<String, Value>,
    /// Result column name -> receiving target.
    pub bindings: HashMap<String, BindTarget>,
}

/// One MATCH item with its optionality flag.
#[derive(Debug, Clone)]
pub struct MatchItem {
    pub pattern: Pattern,
    pub optional: bool,
}

impl MatchItem {
    pub fn new(pattern: Pattern) -> Self {
        MatchItem {
            pattern,
            optional: false,
        }
    }

    pub fn optional(pattern: Pattern) -> Self {
        MatchItem {
            pattern,
            optional: true,
        }
    }
}

/// One SET clause item.
#[derive(Debug, Clone)]
pub enum SetItem {
    /// `target = value`
    Assign {
        target: Identifier,
        value: Identifier,
    },
    /// `target += value`
    MergeProps {
        target: Identifier,
        value: Identifier,
    },
    /// `target:Label1:Label2`
    Labels {
        target: Identifier,
        labels: Vec<String>,
    },
}

impl SetItem {
    pub fn assign(target: impl Into<Identifier>, value: impl Into<Identifier>) -> Self {
        SetItem::Assign {
            target: target.into(),
            value: value.into(),
        }
    }

    pub fn merge(target: impl Into<Identifier>, value: impl Into<Identifier>) -> Self {
        SetItem::MergeProps {
            target: target.into(),
            value: value.into(),
        }
    }

    pub fn labels<L: Into<String>>(
        target: impl Into<Identifier>,
        labels: impl IntoIterator<Item = L>,
    ) -> Self {
        SetItem::Labels {
            target: target.into(),
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }
}

/// One REMOVE clause item.
#[derive(Debug, Clone)]
pub enum RemoveItem {
    Prop(Identifier),
    Labels {
        target: Identifier,
        labels: Vec<String>,
    },
}

impl RemoveItem {
    pub fn prop(target: impl Into<Identifier>) -> Self {
        RemoveItem::Prop(target.into())
    }

    pub fn labels<L: Into<String>>(
        target: impl Into<Identifier>,
        labels: impl IntoIterator<Item = L>,
    ) -> Self {
        RemoveItem::Labels {
            target: target.into(),
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }
}

/// ON CREATE / ON MATCH blocks for MERGE.
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    pub on_create: Vec<SetItem>,
    pub on_match: Vec<SetItem>,
}

impl MergeOptions {
    pub fn new() -> Self {
        MergeOptions::default()
    }

    pub fn on_create(mut self, items: Vec<SetItem>) -> Self {
        self.on_create = items;
        self
    }

    pub fn on_match(mut self, items: Vec<SetItem>) -> Self {
        self.on_match = items;
        self
    }
}

/// Per-session clause writer.
pub struct CypherWriter<'r> {
    registry: &'r Registry,
    scope: Scope,
    buf: String,
    indent: usize,
    bindings: HashMap<String, BindTarget>,
}

impl<'r> CypherWriter<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        CypherWriter {
            registry,
            scope: Scope::new(),
            buf: String::new(),
            indent: 0,
            bindings: HashMap::new(),
        }
    }

    fn derived(&self, scope: Scope, indent: usize) -> CypherWriter<'r> {
        CypherWriter {
            registry: self.registry,
            scope,
            buf: String::new(),
            indent,
            bindings: HashMap::new(),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// MATCH / OPTIONAL MATCH with a uniform optionality flag.
    pub fn write_match(&mut self, patterns: impl Into<Patterns>, optional: bool) -> &mut Self {
        let patterns = patterns.into();
        let items = patterns
            .0
            .into_iter()
            .map(|pattern| MatchItem { pattern, optional })
            .collect();
        self.write_match_items(items)
    }

    /// MATCH items with per-item optionality; each run of equal flags gets
    /// its own keyword.
    pub fn write_match_items(&mut self, items: Vec<MatchItem>) -> &mut Self {
        if self.scope.has_error() {
            return self;
        }
        if let Err(e) = self.try_match_items(&items) {
            self.scope.fail(e);
        }
        self
    }

    fn try_match_items(&mut self, items: &[MatchItem]) -> Result<(), CompileError> {
        let mut idx = 0;
        while idx < items.len() {
            let optional = items[idx].optional;
            let mut run = Vec::new();
            while idx < items.len() && items[idx].optional == optional {
                run.push(self.render_pattern(&items[idx].pattern)?);
                idx += 1;
            }
            let keyword = if optional { "OPTIONAL MATCH" } else { "MATCH" };
            self.write_clause_items(keyword, &run);
        }
        Ok(())
    }

    pub fn write_create(&mut self, patterns: impl Into<Patterns>) -> &mut Self {
        if self.scope.has_error() {
            return self;
        }
        let patterns = patterns.into();
        let rendered: Result<Vec<String>, CompileError> = patterns
            .0
            .iter()
            .map(|p| self.render_pattern(p))
            .collect();
        match rendered {
            Ok(items) => self.write_clause_items("CREATE", &items),
            Err(e) => self.scope.fail(e),
        }
        self
    }

    pub fn write_merge(&mut self, pattern: Pattern, options: MergeOptions) -> &mut Self {
        if self.scope.has_error() {
            return self;
        }
        if let Err(e) = self.try_merge(&pattern, &options) {
            self.scope.fail(e);
        }
        self
    }

    fn try_merge(&mut self, pattern: &Pattern, options: &MergeOptions) -> Result<(), CompileError> {
        let text = self.render_pattern(pattern)?;
        self.write_line(&format!("MERGE {}", text));
        if !options.on_create.is_empty() {
            self.write_line("ON CREATE");
            self.indent += 1;
            let result = self.try_set(&options.on_create);
            self.indent -= 1;
            result?;
        }
        if !options.on_match.is_empty() {
            self.write_line("ON MATCH");
            self.indent += 1;
            let result = self.try_set(&options.on_match);
            self.indent -= 1;
            result?;
        }
        Ok(())
    }

    pub fn write_set(&mut self, items: Vec<SetItem>) -> &mut Self {
        if self.scope.has_error() {
            return self;
        }
        if let Err(e) = self.try_set(&items) {
            self.scope.fail(e);
        }
        self
    }

    fn try_set(&mut self, items: &[SetItem]) -> Result<(), CompileError> {
        let mut rendered = Vec::with_capacity(items.len());
        for item in items {
            rendered.push(match item {
                SetItem::Assign { target, value } => format!(
                    "{} = {}",
                    self.resolve_expr(target)?,
                    self.resolve_expr(value)?
                ),
                SetItem::MergeProps { target, value } => format!(
                    "{} += {}",
                    self.resolve_expr(target)?,
                    self.resolve_expr(value)?
                ),
                SetItem::Labels { target, labels } => format!(
                    "{}{}",
                    self.resolve_expr(target)?,
                    labels
                        .iter()
                        .map(|l| format!(":{}", l))
                        .collect::<String>()
                ),
            });
        }
        self.write_clause_items("SET", &rendered);
        Ok(())
    }

    pub fn write_remove(&mut self, items: Vec<RemoveItem>) -> &mut Self {
        if self.scope.has_error() {
            return self;
        }
        let result: Result<Vec<String>, CompileError> = items
            .iter()
            .map(|item| match item {
                RemoveItem::Prop(target) => self.resolve_expr(target),
                RemoveItem::Labels { target, labels } => Ok(format!(
                    "{}{}",
                    self.resolve_expr(target)?,
                    labels
                        .iter()
                        .map(|l| format!(":{}", l))
                        .collect::<String>()
                )),
            })
            .collect();
        match result {
            Ok(rendered) => self.write_clause_items("REMOVE", &rendered),
            Err(e) => self.scope.fail(e),
        }
        self
    }

    pub fn write_delete(&mut self, detach: bool, items: Vec<Identifier>) -> &mut Self {
        if self.scope.has_error() {
            return self;
        }
        let result: Result<Vec<String>, CompileError> =
            items.iter().map(|id| self.resolve_expr(id)).collect();
        match result {
            Ok(rendered) => {
                let keyword = if detach { "DETACH DELETE" } else { "DELETE" };
                self.write_clause_items(keyword, &rendered);
            }
            Err(e) => self.scope.fail(e),
        }
        self
    }

    pub fn write_unwind(&mut self, list: impl Into<Identifier>, alias: &str) -> &mut Self {
        if self.scope.has_error() {
            return self;
        }
        let list = list.into();
        let result = (|| -> Result<(), CompileError> {
            let list_text = self.resolve_expr(&list)?;
            self.scope.register(
                self.registry,
                &Identifier::Name(alias.to_string()),
                Position::Projection,
            )?;
            self.write_line(&format!("UNWIND {} AS {}", list_text, alias));
            Ok(())
        })();
        if let Err(e) = result {
            self.scope.fail(e);
        }
        self
    }

    pub fn write_where(&mut self, condition: Condition) -> &mut Self {
        if self.scope.has_error() {
            return self;
        }
        match self.render_condition(&condition) {
            Ok(text) => self.write_line(&format!("WHERE {}", text)),
            Err(e) => self.scope.fail(e),
        }
        self
    }

    /// FOREACH over a list expression; the body compiles in an isolated
    /// child writer and scope, and none of the body's bindings leak out.
    pub fn write_foreach(
        &mut self,
        var: &str,
        list: impl Into<Identifier>,
        body: impl FnOnce(&mut CypherWriter<'r>),
    ) -> &mut Self {
        if self.scope.has_error() {
            return self;
        }
        let list = list.into();
        let result = (|| -> Result<String, CompileError> {
            let list_text = self.resolve_expr(&list)?;
            let mut child_scope = self.scope.child();
            child_scope.register(
                self.registry,
                &Identifier::Name(var.to_string()),
                Position::Projection,
            )?;
            let mut child = self.derived(child_scope, 0);
            body(&mut child);
            let body_text = child
                .buf
                .lines()
                .map(str::trim)
                .collect::<Vec<_>>()
                .join(" ");
            self.scope.merge_child(child.scope);
            Ok(format!("FOREACH ({} IN {} | {})", var, list_text, body_text))
        })();
        match result {
            Ok(line) => self.write_line(&line),
            Err(e) => self.scope.fail(e),
        }
        self
    }

    /// `CALL { ... }` with a child scope derived from this one. Bindings
    /// introduced inside do not leak out; parameters and name counters do.
    pub fn write_subquery(&mut self, body: impl FnOnce(&mut CypherWriter<'r>)) -> &mut Self {
        if self.scope.has_error() {
            return self;
        }
        let child_scope = self.scope.child();
        let mut child = self.derived(child_scope, self.indent + 1);
        body(&mut child);
        self.write_line("CALL {");
        self.buf.push_str(&child.buf);
        self.write_line("}");
        self.bindings.extend(child.bindings);
        self.scope.merge_child(child.scope);
        self
    }

    /// UNION of independently scoped branches.
    pub fn write_union<F>(&mut self, all: bool, branches: Vec<F>) -> &mut Self
    where
        F: FnOnce(&mut CypherWriter<'r>),
    {
        if self.scope.has_error() {
            return self;
        }
        for (i, branch) in branches.into_iter().enumerate() {
            if i > 0 {
                self.write_line(if all { "UNION ALL" } else { "UNION" });
            }
            let child_scope = self.scope.child();
            let mut child = self.derived(child_scope, self.indent);
            branch(&mut child);
            self.buf.push_str(&child.buf);
            self.bindings.extend(child.bindings);
            self.scope.merge_child(child.scope);
        }
        self
    }

    /// Terminal call: surface the accumulated error or hand off the text,
    /// parameter map and column bindings.
    pub fn compile(mut self) -> Result<CompiledQuery, CompileError> {
        if let Some(err) = self.scope.take_error() {
            return Err(err);
        }
        Ok(CompiledQuery {
            text: self.buf.trim_end().to_string(),
            parameters: self.scope.params().clone(),
            bindings: self.bindings,
        })
    }

    // --- rendering internals ---

    fn write_line(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.buf.push_str("  ");
        }
        self.buf.push_str(line);
        self.buf.push('\n');
    }

    /// One item on the keyword line; several items comma-separated, one per
    /// line, indented under the keyword.
    fn write_clause_items(&mut self, keyword: &str, items: &[String]) {
        if items.len() == 1 {
            self.write_line(&format!("{} {}", keyword, items[0]));
            return;
        }
        self.write_line(keyword);
        for (i, item) in items.iter().enumerate() {
            let comma = if i + 1 < items.len() { "," } else { "" };
            self.write_line(&format!("  {}{}", item, comma));
        }
    }

    pub(crate) fn render_pattern(&mut self, pattern: &Pattern) -> Result<String, CompileError> {
        let mut out = String::new();
        let head = pattern.head();
        if let Some(path) = &head.path_name {
            self.scope.register(
                self.registry,
                &Identifier::Name(path.clone()),
                Position::NodePattern,
            )?;
            out.push_str(path);
            out.push_str(" = ");
        }
        let mut current = head;
        loop {
            let member =
                self.scope
                    .register(self.registry, &current.value, Position::NodePattern)?;
            let core = self.render_member_core(&member)?;
            out.push('(');
            out.push_str(&core);
            out.push(')');
            match &current.relationship {
                None => break,
                Some(link) => {
                    out.push_str(&self.render_relationship(link)?);
                    current = &link.next;
                }
            }
        }
        Ok(out)
    }

    fn render_relationship(&mut self, link: &RelationshipLink) -> Result<String, CompileError> {
        let member = self.scope.register(
            self.registry,
            &link.value,
            Position::RelationshipPattern,
        )?;
        let core = self.render_member_core(&member)?;
        if core.is_empty() {
            return Ok(match link.direction {
                Direction::Outgoing => "-->".to_string(),
                Direction::Incoming => "<--".to_string(),
                Direction::Undirected => "--".to_string(),
            });
        }
        Ok(match link.direction {
            Direction::Outgoing => format!("-[{}]->", core),
            Direction::Incoming => format!("<-[{}]-", core),
            Direction::Undirected => format!("-[{}]-", core),
        })
    }

    /// Name, then label/type expression, then property block, then inline
    /// WHERE, space-separated only where a preceding token exists. A known
    /// occurrence is just its name.
    fn render_member_core(&mut self, member: &Member) -> Result<String, CompileError> {
        let mut out = member.name.clone();
        if !member.is_new {
            return Ok(out);
        }
        if let Some(label_expr) = &member.label_expr {
            out.push_str(label_expr);
        }
        if let Some(props) = &member.props_text {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(props);
        }
        if let Some(condition) = &member.condition {
            let rendered = self.render_condition(condition)?;
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str("WHERE ");
            out.push_str(&rendered);
        }
        Ok(out)
    }

    /// Resolve an identifier occurring in an expression position to its
    /// rendered text (name, `entity.property`, `$param`, or raw expression).
    pub(crate) fn resolve_expr(&mut self, id: &Identifier) -> Result<String, CompileError> {
        let member = self
            .scope
            .register(self.registry, id, Position::Expression)?;
        Ok(member.expr.clone().unwrap_or(member.name))
    }

    pub(crate) fn render_condition(&mut self, cond: &Condition) -> Result<String, CompileError> {
        match cond {
            Condition::Expr(text) => Ok(text.clone()),
            Condition::Cmp { lhs, op, rhs } => Ok(format!(
                "{} {} {}",
                self.resolve_expr(lhs)?,
                op,
                self.resolve_expr(rhs)?
            )),
            Condition::And(parts) => self.render_junction(parts, " AND "),
            Condition::Or(parts) => self.render_junction(parts, " OR "),
            Condition::Not(inner) => Ok(format!("NOT ({})", self.render_condition(inner)?)),
            Condition::Pattern(pattern) => self.render_pattern(pattern),
        }
    }

    fn render_junction(
        &mut self,
        parts: &[Condition],
        joiner: &str,
    ) -> Result<String, CompileError> {
        let mut rendered = Vec::with_capacity(parts.len());
        for part in parts {
            let text = self.render_condition(part)?;
            // parenthesize nested junctions to keep precedence explicit
            if matches!(part, Condition::And(_) | Condition::Or(_)) {
                rendered.push(format!("({})", text));
            } else {
                rendered.push(text);
            }
        }
        Ok(rendered.join(joiner))
    }
}
