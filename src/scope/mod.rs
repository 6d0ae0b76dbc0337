//! Scope and identifier resolution.
//!
//! The scope is the symbol table of one compilation session: it maps
//! query-visible names to the domain values they denote, remembers the name a
//! value was first introduced under (so re-references resolve identically),
//! deduplicates constant parameters, and indexes entity fields so that
//! `&value.field`-style references render as `entity.property`.
//!
//! Structural errors are not raised at the call site; the writer records the
//! first one on the session and every later operation short-circuits, so a
//! malformed chain can still be built fluently and fails once, at `compile()`.

use std::collections::{BTreeMap, HashMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;

use crate::binder::BindSlot;
use crate::entity::{Entity, EntityKind, EntityRef, FieldRef, Handle};
use crate::pattern::Pattern;
use crate::registry::Registry;
use crate::value::Value;

mod errors;
pub use errors::CompileError;

lazy_static! {
    /// Valid variable names and property keys.
    static ref SAFE_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// One identifier occurrence: a name, a raw expression, a constant parameter,
/// a field reference, or a bound domain value, optionally wrapped with inline
/// options.
#[derive(Debug, Clone)]
pub enum Identifier {
    /// Anonymous occurrence (`()` in a pattern).
    None,
    /// Literal query-visible name.
    Name(String),
    /// Raw expression text, used verbatim.
    Expr(String),
    /// Constant parameter value.
    Param(Value),
    /// Reference to a field of a previously registered entity.
    Field(FieldRef),
    /// Bound domain value.
    Entity(EntityRef),
    /// Inner identifier plus inline options; outer wrappers win over nested.
    Qualified(Box<Identifier>, MemberOptions),
}

/// Raw expression identifier.
pub fn expr(text: impl Into<String>) -> Identifier {
    Identifier::Expr(text.into())
}

/// Constant parameter identifier.
pub fn param(value: impl Into<Value>) -> Identifier {
    Identifier::Param(value.into())
}

/// Wrap a value with an explicit query-visible name.
pub fn qual(id: impl Into<Identifier>, name: impl Into<String>) -> Identifier {
    id.into().named(name)
}

impl Identifier {
    fn options_mut(&mut self) -> &mut MemberOptions {
        if !matches!(self, Identifier::Qualified(..)) {
            let inner = std::mem::replace(self, Identifier::None);
            *self = Identifier::Qualified(Box::new(inner), MemberOptions::default());
        }
        match self {
            Identifier::Qualified(_, opts) => opts,
            _ => unreachable!(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.options_mut().name = Some(name.into());
        self
    }

    pub fn aliased(mut self, alias: impl Into<String>) -> Self {
        self.options_mut().alias = Some(alias.into());
        self
    }

    /// Attach a literal property map (`{key: expression}`).
    pub fn with_props(mut self, props: Props) -> Self {
        self.options_mut().props = Some(props);
        self
    }

    /// Override the label/type expression (used verbatim, including the
    /// leading `:`).
    pub fn with_label_expr(mut self, label_expr: impl Into<String>) -> Self {
        self.options_mut().label_expr = Some(label_expr.into());
        self
    }

    /// Attach an inline WHERE condition.
    pub fn filtered(mut self, condition: Condition) -> Self {
        self.options_mut().condition = Some(condition);
        self
    }

    /// Attach a bind slot: the target that receives this item's result
    /// column.
    pub fn bind_to(mut self, slot: impl Into<BindSlot>) -> Self {
        self.options_mut().slot = Some(slot.into());
        self
    }

    pub fn order_by(mut self, clause_ref: impl Into<String>, descending: bool) -> Self {
        self.options_mut()
            .projection
            .get_or_insert_with(ProjectionOptions::default)
            .order_by
            .push(OrderBySpec {
                clause_ref: Some(clause_ref.into()),
                descending,
            });
        self
    }

    /// Order by the item itself.
    pub fn order_by_self(mut self, descending: bool) -> Self {
        self.options_mut()
            .projection
            .get_or_insert_with(ProjectionOptions::default)
            .order_by
            .push(OrderBySpec {
                clause_ref: None,
                descending,
            });
        self
    }

    pub fn skip(mut self, n: u64) -> Self {
        self.options_mut()
            .projection
            .get_or_insert_with(ProjectionOptions::default)
            .skip = Some(n);
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.options_mut()
            .projection
            .get_or_insert_with(ProjectionOptions::default)
            .limit = Some(n);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.options_mut()
            .projection
            .get_or_insert_with(ProjectionOptions::default)
            .distinct = true;
        self
    }

    /// Attach a projection-level WHERE (valid on WITH items only).
    pub fn projected_where(mut self, condition: Condition) -> Self {
        self.options_mut()
            .projection
            .get_or_insert_with(ProjectionOptions::default)
            .where_clause = Some(condition);
        self
    }

    /// Peel nested `Qualified` wrappers, merging options outer-wins.
    pub(crate) fn unwrap_qualified(&self) -> (&Identifier, MemberOptions) {
        let mut opts = MemberOptions::default();
        let mut current = self;
        while let Identifier::Qualified(inner, layer) = current {
            opts.fill_missing_from(layer);
            current = inner;
        }
        (current, opts)
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier::Name(name.to_string())
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Identifier::Name(name)
    }
}

impl From<FieldRef> for Identifier {
    fn from(field: FieldRef) -> Self {
        Identifier::Field(field)
    }
}

impl From<EntityRef> for Identifier {
    fn from(entity: EntityRef) -> Self {
        Identifier::Entity(entity)
    }
}

impl<T: Entity> From<&Handle<T>> for Identifier {
    fn from(handle: &Handle<T>) -> Self {
        Identifier::Entity(handle.erased())
    }
}

/// Literal property map: property key to raw expression text. Rendered
/// sorted by key for determinism.
#[derive(Debug, Clone, Default)]
pub struct Props(pub BTreeMap<String, String>);

/// Build a literal property map.
pub fn props<K: Into<String>, V: Into<String>>(entries: impl IntoIterator<Item = (K, V)>) -> Props {
    Props(
        entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect(),
    )
}

/// A boolean condition for WHERE positions.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Raw expression text.
    Expr(String),
    /// Comparison between two resolvable identifiers. Boxed so the
    /// identifier/options/condition cycle stays finite-size.
    Cmp {
        lhs: Box<Identifier>,
        op: String,
        rhs: Box<Identifier>,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    /// Pattern existence check.
    Pattern(Box<Pattern>),
}

/// Raw condition text.
pub fn cond(text: impl Into<String>) -> Condition {
    Condition::Expr(text.into())
}

/// Comparison condition.
pub fn cmp(lhs: impl Into<Identifier>, op: impl Into<String>, rhs: impl Into<Identifier>) -> Condition {
    Condition::Cmp {
        lhs: Box::new(lhs.into()),
        op: op.into(),
        rhs: Box::new(rhs.into()),
    }
}

/// One ORDER BY request contributed by a projection item.
#[derive(Debug, Clone)]
pub struct OrderBySpec {
    /// Property/expression relative to the owning item; `None` orders by the
    /// item itself. Qualified by the item's name when not already qualified.
    pub clause_ref: Option<String>,
    pub descending: bool,
}

/// Projection-body options attachable to a WITH/RETURN item.
#[derive(Debug, Clone, Default)]
pub struct ProjectionOptions {
    pub order_by: Vec<OrderBySpec>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub distinct: bool,
    pub where_clause: Option<Condition>,
}

/// Inline options unwrapped from `Identifier::Qualified` wrappers.
#[derive(Debug, Clone, Default)]
pub struct MemberOptions {
    pub name: Option<String>,
    pub alias: Option<String>,
    pub props: Option<Props>,
    pub label_expr: Option<String>,
    pub condition: Option<Condition>,
    pub projection: Option<ProjectionOptions>,
    pub slot: Option<BindSlot>,
}

impl MemberOptions {
    /// Outer wrappers win: only absent fields are taken from `layer`.
    fn fill_missing_from(&mut self, layer: &MemberOptions) {
        if self.name.is_none() {
            self.name = layer.name.clone();
        }
        if self.alias.is_none() {
            self.alias = layer.alias.clone();
        }
        if self.props.is_none() {
            self.props = layer.props.clone();
        }
        if self.label_expr.is_none() {
            self.label_expr = layer.label_expr.clone();
        }
        if self.condition.is_none() {
            self.condition = layer.condition.clone();
        }
        if self.projection.is_none() {
            self.projection = layer.projection.clone();
        }
        if self.slot.is_none() {
            self.slot = layer.slot.clone();
        }
    }
}

/// Where an identifier occurrence sits, which governs what it may introduce
/// and how a parameter substitutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    NodePattern,
    RelationshipPattern,
    Projection,
    /// Bare occurrence in WHERE/SET/DELETE and similar positions; must
    /// reference something already known (or be a literal/parameter).
    Expression,
}

/// The resolved form of one identifier occurrence.
#[derive(Debug, Clone)]
pub struct Member {
    /// Newly introduced, or a reference to an existing binding.
    pub is_new: bool,
    /// Canonical query-visible name (or `entity.property` for field refs,
    /// empty for anonymous occurrences).
    pub name: String,
    pub alias: Option<String>,
    /// Raw expression text when the occurrence is an expression.
    pub expr: Option<String>,
    /// Label/type expression including the leading `:`; only set for new
    /// occurrences.
    pub label_expr: Option<String>,
    /// Rendered property block (`{k: e}` literal or `$param`).
    pub props_text: Option<String>,
    /// Set when the whole occurrence substitutes as a parameter.
    pub param_name: Option<String>,
    pub condition: Option<Condition>,
    pub projection: Option<ProjectionOptions>,
    pub entity: Option<EntityRef>,
    /// Property name when this member is a field reference.
    pub field_prop: Option<String>,
    pub slot: Option<BindSlot>,
}

impl Member {
    fn empty() -> Self {
        Member {
            is_new: true,
            name: String::new(),
            alias: None,
            expr: None,
            label_expr: None,
            props_text: None,
            param_name: None,
            condition: None,
            projection: None,
            entity: None,
            field_prop: None,
            slot: None,
        }
    }

    /// The name this item is visible under after a projection.
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone)]
struct Binding {
    /// Entity identity when the name denotes a bound domain value.
    addr: Option<usize>,
}

#[derive(Debug, Clone)]
struct FieldEntry {
    entity_addr: usize,
    entity_name: String,
    prop: &'static str,
}

/// Per-session symbol table.
#[derive(Default)]
pub struct Scope {
    bindings: HashMap<String, Binding>,
    /// Value identity -> canonical name.
    identities: HashMap<usize, String>,
    /// Value identity -> type-erased handle (for bind targets and pruning).
    entities: HashMap<usize, EntityRef>,
    /// Field address -> owning entity and property.
    fields: HashMap<usize, FieldEntry>,
    params: HashMap<String, Value>,
    param_addrs: HashMap<usize, String>,
    param_counter: usize,
    /// Every name ever used in this compilation, across child scopes; the
    /// synthesized-name collision check consults this so sibling scopes can
    /// never collide.
    used_names: HashSet<String>,
    error: Option<CompileError>,
}

impl Scope {
    pub fn new() -> Self {
        Scope::default()
    }

    /// Record a structural error; the first one wins.
    pub fn fail(&mut self, err: CompileError) {
        if self.error.is_none() {
            log::debug!("scope: recording compile error: {}", err);
            self.error = Some(err);
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn take_error(&mut self) -> Option<CompileError> {
        self.error.take()
    }

    pub fn params(&self) -> &HashMap<String, Value> {
        &self.params
    }

    /// Whether `name` is currently bound.
    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Derive a child scope for a subquery or FOREACH body. Bindings are
    /// visible inside; `merge_child` decides what flows back.
    pub fn child(&self) -> Scope {
        Scope {
            bindings: self.bindings.clone(),
            identities: self.identities.clone(),
            entities: self.entities.clone(),
            fields: self.fields.clone(),
            params: self.params.clone(),
            param_addrs: self.param_addrs.clone(),
            param_counter: self.param_counter,
            used_names: self.used_names.clone(),
            error: None,
        }
    }

    /// Fold a completed child scope back in. Parameters, counters and the
    /// used-name set are shared query-wide; name bindings do not leak out.
    pub fn merge_child(&mut self, child: Scope) {
        self.params = child.params;
        self.param_addrs = child.param_addrs;
        self.param_counter = child.param_counter;
        self.used_names = child.used_names;
        if let Some(err) = child.error {
            self.fail(err);
        }
    }

    /// Resolve one identifier occurrence. This is the central operation of
    /// the resolver; see the module docs for the full algorithm.
    pub fn register(
        &mut self,
        registry: &Registry,
        id: &Identifier,
        position: Position,
    ) -> Result<Member, CompileError> {
        let (inner, opts) = id.unwrap_qualified();
        let mut member = match inner {
            Identifier::None => Member::empty(),
            Identifier::Name(name) => self.register_name(name, position)?,
            Identifier::Expr(text) => self.register_expr(text, &opts)?,
            Identifier::Param(value) => self.register_param(value, &opts)?,
            Identifier::Field(field) => self.register_field(field)?,
            Identifier::Entity(entity) => self.register_entity(registry, entity, &opts, position)?,
            Identifier::Qualified(..) => unreachable!("unwrap_qualified peels all wrappers"),
        };
        if member.is_new {
            if member.label_expr.is_none() {
                if let Some(explicit) = opts.label_expr.clone() {
                    member.label_expr = Some(explicit);
                }
            }
            if member.props_text.is_none() {
                if let Some(p) = &opts.props {
                    member.props_text = Some(render_props_literal(p)?);
                }
            }
        }
        member.condition = member.condition.take().or(opts.condition);
        member.projection = member.projection.take().or(opts.projection);
        member.slot = member.slot.take().or(opts.slot);
        if member.alias.is_none() {
            member.alias = opts.alias;
        }
        Ok(member)
    }

    fn register_name(&mut self, name: &str, position: Position) -> Result<Member, CompileError> {
        validate_name(name)?;
        let mut member = Member::empty();
        member.name = name.to_string();
        if self.bindings.contains_key(name) {
            member.is_new = false;
            if let Some(addr) = self.bindings[name].addr {
                member.entity = self.entities.get(&addr).cloned();
            }
        } else {
            if position == Position::Expression {
                return Err(CompileError::UnknownIdentifier(name.to_string()));
            }
            self.insert_binding(name.to_string(), None);
        }
        Ok(member)
    }

    fn register_expr(&mut self, text: &str, opts: &MemberOptions) -> Result<Member, CompileError> {
        let mut member = Member::empty();
        member.expr = Some(text.to_string());
        // An aliased expression introduces the alias as a binding; a bare
        // expression is just text.
        if let Some(out) = opts.alias.clone().or_else(|| opts.name.clone()) {
            validate_name(&out)?;
            member.name = text.to_string();
            member.alias = Some(out.clone());
            if !self.bindings.contains_key(&out) {
                self.insert_binding(out, None);
            }
        } else {
            member.name = text.to_string();
        }
        Ok(member)
    }

    fn register_param(&mut self, value: &Value, opts: &MemberOptions) -> Result<Member, CompileError> {
        let name = match &opts.name {
            Some(requested) => {
                validate_name(requested)?;
                if let Some(existing) = self.params.get(requested) {
                    if existing != value {
                        return Err(CompileError::ParameterRebound {
                            existing: requested.clone(),
                            requested: requested.clone(),
                        });
                    }
                }
                requested.clone()
            }
            None => self.next_param_name(),
        };
        self.params.insert(name.clone(), value.clone());
        log::debug!("scope: parameter ${} = {:?}", name, value);
        let mut member = Member::empty();
        member.param_name = Some(name.clone());
        member.name = format!("${}", name);
        Ok(member)
    }

    fn register_field(&mut self, field: &FieldRef) -> Result<Member, CompileError> {
        let entry = self
            .fields
            .get(&field.addr())
            .ok_or(CompileError::UnregisteredField)?
            .clone();
        let mut member = Member::empty();
        member.is_new = false;
        member.name = format!("{}.{}", entry.entity_name, entry.prop);
        member.entity = self.entities.get(&entry.entity_addr).cloned();
        member.field_prop = Some(entry.prop.to_string());
        Ok(member)
    }

    fn register_entity(
        &mut self,
        registry: &Registry,
        entity: &EntityRef,
        opts: &MemberOptions,
        position: Position,
    ) -> Result<Member, CompileError> {
        let meta = entity.meta();
        match position {
            Position::NodePattern if meta.kind == EntityKind::Relationship => {
                return Err(CompileError::MismatchedNode(meta.type_name));
            }
            Position::RelationshipPattern if meta.kind == EntityKind::Node => {
                return Err(CompileError::MismatchedRelationship(meta.type_name));
            }
            _ => {}
        }

        let addr = entity.addr();
        let known = self.identities.get(&addr).cloned();
        let (name, is_new, alias) = match (&opts.name, known) {
            (Some(requested), known) => {
                validate_name(requested)?;
                match self.bindings.get(requested) {
                    Some(binding) if binding.addr != Some(addr) => {
                        return Err(CompileError::AlreadyBound {
                            name: requested.clone(),
                        });
                    }
                    Some(_) => {
                        let canonical = known.unwrap_or_else(|| requested.clone());
                        (canonical, false, opts.alias.clone())
                    }
                    None => match known {
                        Some(canonical) => {
                            // Known under another name: reuse it and demote
                            // the requested name to an alias.
                            let alias = if canonical != *requested {
                                Some(requested.clone())
                            } else {
                                opts.alias.clone()
                            };
                            (canonical, false, alias)
                        }
                        None => (requested.clone(), true, opts.alias.clone()),
                    },
                }
            }
            (None, Some(canonical)) => (canonical, false, opts.alias.clone()),
            (None, None) => {
                if matches!(position, Position::Projection | Position::Expression) {
                    return Err(CompileError::UnknownIdentifier(meta.type_name.to_string()));
                }
                let name = self.synthesize_name(registry, entity)?;
                (name, true, opts.alias.clone())
            }
        };

        let mut member = Member::empty();
        member.is_new = is_new;
        member.name = name.clone();
        member.alias = alias;
        member.entity = Some(entity.clone());

        if is_new {
            self.insert_binding(name.clone(), Some(addr));
            self.identities.insert(addr, name.clone());
            self.entities.insert(addr, entity.clone());
            self.index_fields(&name, entity);
            log::debug!(
                "scope: introduced '{}' for {} @ {:#x}",
                name,
                meta.type_name,
                addr
            );

            // Label/type expression: explicit override beats registry-derived.
            member.label_expr = Some(match &opts.label_expr {
                Some(explicit) => explicit.clone(),
                None => match meta.kind {
                    EntityKind::Node => {
                        let labels = registry.node_labels(&*entity.borrow())?;
                        labels.iter().map(|l| format!(":{}", l)).collect()
                    }
                    EntityKind::Relationship => {
                        format!(":{}", registry.relationship_type(&*entity.borrow())?)
                    }
                },
            });

            // Property block: explicit literal map beats the value's own
            // non-zero properties, which substitute as one map parameter.
            if matches!(
                position,
                Position::NodePattern | Position::RelationshipPattern
            ) {
                if let Some(p) = &opts.props {
                    member.props_text = Some(render_props_literal(p)?);
                } else {
                    let marshaled = entity.borrow().custom_marshal().or_else(|| {
                        let nonzero: HashMap<String, Value> = entity
                            .borrow()
                            .properties()
                            .into_iter()
                            .filter(|(_, v)| !v.is_zero())
                            .map(|(k, v)| (k.to_string(), v))
                            .collect();
                        if nonzero.is_empty() {
                            None
                        } else {
                            Some(Value::Map(nonzero))
                        }
                    });
                    if let Some(value) = marshaled {
                        let pname = self.param_for_addr(addr, value);
                        member.props_text = Some(format!("${}", pname));
                    }
                }
            }
        }
        Ok(member)
    }

    fn insert_binding(&mut self, name: String, addr: Option<usize>) {
        self.used_names.insert(name.clone());
        self.bindings.insert(name, Binding { addr });
    }

    fn index_fields(&mut self, name: &str, entity: &EntityRef) {
        let addr = entity.addr();
        for (prop, field_addr) in entity.borrow().field_addresses() {
            self.fields.insert(
                field_addr,
                FieldEntry {
                    entity_addr: addr,
                    entity_name: name.to_string(),
                    prop,
                },
            );
        }
    }

    fn synthesize_name(
        &mut self,
        registry: &Registry,
        entity: &EntityRef,
    ) -> Result<String, CompileError> {
        let meta = entity.meta();
        let base = match meta.kind {
            EntityKind::Node => registry
                .node_labels(&*entity.borrow())?
                .first()
                .map(|l| lower_camel(l))
                .unwrap_or_else(|| lower_camel(meta.type_name)),
            EntityKind::Relationship => {
                let t = registry.relationship_type(&*entity.borrow())?;
                if t.is_empty() {
                    lower_camel(meta.type_name)
                } else {
                    lower_camel(&t)
                }
            }
        };
        if !self.used_names.contains(&base) && !self.bindings.contains_key(&base) {
            return Ok(base);
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}{}", base, n);
            if !self.used_names.contains(&candidate) && !self.bindings.contains_key(&candidate) {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    fn next_param_name(&mut self) -> String {
        let name = format!("v{}", self.param_counter);
        self.param_counter += 1;
        name
    }

    /// Parameter name for an addressable value, deduplicated by address.
    fn param_for_addr(&mut self, addr: usize, value: Value) -> String {
        if let Some(existing) = self.param_addrs.get(&addr) {
            let existing = existing.clone();
            self.params.insert(existing.clone(), value);
            return existing;
        }
        let name = self.next_param_name();
        self.param_addrs.insert(addr, name.clone());
        self.params.insert(name.clone(), value);
        name
    }

    /// Narrow the scope to a projection's output set. `outputs` pairs the
    /// source binding name (if the item had one) with its output name.
    /// Everything not re-selected is dropped, simulating the query language's
    /// own scope-narrowing.
    pub fn apply_projection(&mut self, outputs: &[(Option<String>, String)]) {
        let mut new_bindings: HashMap<String, Binding> = HashMap::new();
        let mut renames: HashMap<String, String> = HashMap::new();
        for (source, output) in outputs {
            let binding = source
                .as_ref()
                .and_then(|s| self.bindings.get(s))
                .cloned()
                .unwrap_or(Binding { addr: None });
            if let Some(s) = source {
                renames.insert(s.clone(), output.clone());
            }
            self.used_names.insert(output.clone());
            new_bindings.insert(output.clone(), binding);
        }
        let kept_addrs: HashSet<usize> =
            new_bindings.values().filter_map(|b| b.addr).collect();
        self.identities.retain(|addr, name| {
            if !kept_addrs.contains(addr) {
                return false;
            }
            if let Some(renamed) = renames.get(name) {
                *name = renamed.clone();
            }
            true
        });
        self.entities.retain(|addr, _| kept_addrs.contains(addr));
        self.fields.retain(|_, entry| {
            if !kept_addrs.contains(&entry.entity_addr) {
                return false;
            }
            if let Some(renamed) = renames.get(&entry.entity_name) {
                entry.entity_name = renamed.clone();
            }
            true
        });
        self.bindings = new_bindings;
        log::debug!(
            "scope: projection narrowed to {:?}",
            self.bindings.keys().collect::<Vec<_>>()
        );
    }
}

fn validate_name(name: &str) -> Result<(), CompileError> {
    if SAFE_NAME.is_match(name) {
        Ok(())
    } else {
        Err(CompileError::InvalidName(name.to_string()))
    }
}

fn render_props_literal(props: &Props) -> Result<String, CompileError> {
    if props.0.is_empty() {
        return Ok(String::new());
    }
    let mut parts = Vec::with_capacity(props.0.len());
    for (key, expr) in &props.0 {
        if !SAFE_NAME.is_match(key) {
            return Err(CompileError::InvalidPropertyKey(key.clone()));
        }
        parts.push(format!("{}: {}", key, expr));
    }
    Ok(format!("{{{}}}", parts.join(", ")))
}

/// `Person` -> `person`, `ACTED_IN` -> `actedIn`.
fn lower_camel(input: &str) -> String {
    if input.is_empty() {
        return String::from("v");
    }
    if input.contains('_') {
        let mut out = String::new();
        for (i, seg) in input.split('_').filter(|s| !s.is_empty()).enumerate() {
            let lower = seg.to_lowercase();
            if i == 0 {
                out.push_str(&lower);
            } else {
                let mut chars = lower.chars();
                if let Some(first) = chars.next() {
                    out.extend(first.to_uppercase());
                    out.push_str(chars.as_str());
                }
            }
        }
        if out.is_empty() {
            String::from("v")
        } else {
            out
        }
    } else {
        let mut chars = input.chars();
        let first = chars.next().unwrap();
        format!("{}{}", first.to_lowercase(), chars.as_str())
    }
}
