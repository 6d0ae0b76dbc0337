//! WITH / RETURN projections.
//!
//! Projection items carry their own ORDER BY / SKIP / LIMIT / DISTINCT /
//! WHERE requests inline; this module merges them into clause-level
//! subclauses, narrows the scope to the output set, and (on RETURN) records
//! the column bindings the executor will populate.

use std::collections::BTreeMap;

use crate::binder::BindTarget;
use crate::scope::{CompileError, Condition, Identifier, Member, Position};

use super::CypherWriter;

impl<'r> CypherWriter<'r> {
    pub fn write_with(&mut self, items: Vec<Identifier>) -> &mut Self {
        self.write_projection("WITH", items, false)
    }

    pub fn write_return(&mut self, items: Vec<Identifier>) -> &mut Self {
        self.write_projection("RETURN", items, true)
    }

    fn write_projection(
        &mut self,
        keyword: &'static str,
        items: Vec<Identifier>,
        terminal: bool,
    ) -> &mut Self {
        if self.scope.has_error() {
            return self;
        }
        if let Err(e) = self.try_projection(keyword, &items, terminal) {
            self.scope.fail(e);
        }
        self
    }

    fn try_projection(
        &mut self,
        keyword: &'static str,
        items: &[Identifier],
        terminal: bool,
    ) -> Result<(), CompileError> {
        let mut members = Vec::with_capacity(items.len());
        for id in items {
            // expression position: projection items reference known names;
            // fresh output names come from aliases and scope narrowing
            let member = self.scope.register(self.registry, id, Position::Expression)?;
            if member.output_name().is_empty() {
                return Err(CompileError::UnnamedProjectionItem);
            }
            members.push(member);
        }

        let merged = merge_subclauses(keyword, &members, terminal)?;

        let rendered: Vec<String> = members.iter().map(render_projection_item).collect();
        let full_keyword = if merged.distinct {
            format!("{} DISTINCT", keyword)
        } else {
            keyword.to_string()
        };
        self.write_clause_items(&full_keyword, &rendered);

        if !merged.order_by.is_empty() {
            let order_items: Vec<String> = merged
                .order_by
                .iter()
                .map(|(key, descending)| {
                    if *descending {
                        format!("{} DESC", key)
                    } else {
                        key.clone()
                    }
                })
                .collect();
            self.write_clause_items("ORDER BY", &order_items);
        }
        if let Some(n) = merged.skip {
            self.write_line(&format!("SKIP {}", n));
        }
        if let Some(n) = merged.limit {
            self.write_line(&format!("LIMIT {}", n));
        }

        if terminal {
            self.collect_bindings(&members);
        }

        // Narrow the scope to the output set before rendering the trailing
        // WHERE, which sees post-projection names only.
        let outputs: Vec<(Option<String>, String)> = members
            .iter()
            .map(|m| {
                let source = if m.entity.is_some() || self.scope.is_bound(&m.name) {
                    Some(m.name.clone())
                } else {
                    None
                };
                (source, m.output_name().to_string())
            })
            .collect();
        self.scope.apply_projection(&outputs);

        if let Some(condition) = merged.where_clause {
            let text = self.render_condition(&condition)?;
            self.write_line(&format!("WHERE {}", text));
        }
        Ok(())
    }

    fn collect_bindings(&mut self, members: &[Member]) {
        for member in members {
            let column = member.output_name().to_string();
            let target = if let Some(slot) = &member.slot {
                Some(BindTarget::from(slot.clone()))
            } else if let (Some(entity), Some(prop)) = (&member.entity, &member.field_prop) {
                Some(BindTarget::Field {
                    entity: entity.clone(),
                    prop: prop.clone(),
                })
            } else if let (Some(entity), None) = (&member.entity, &member.field_prop) {
                Some(BindTarget::Entity(entity.clone()))
            } else {
                None
            };
            if let Some(target) = target {
                self.bindings.insert(column, target);
            }
        }
    }
}

struct MergedSubclauses {
    distinct: bool,
    order_by: BTreeMap<String, bool>,
    skip: Option<u64>,
    limit: Option<u64>,
    where_clause: Option<Condition>,
}

/// Fold per-item subclause requests into one clause-level set. ORDER BY
/// requests union across items; SKIP, LIMIT and WHERE must come from a
/// single item each.
fn merge_subclauses(
    keyword: &'static str,
    members: &[Member],
    terminal: bool,
) -> Result<MergedSubclauses, CompileError> {
    let mut merged = MergedSubclauses {
        distinct: false,
        order_by: BTreeMap::new(),
        skip: None,
        limit: None,
        where_clause: None,
    };
    for member in members {
        let mut where_request = member.condition.clone();
        if let Some(proj) = &member.projection {
            if proj.distinct {
                merged.distinct = true;
            }
            for spec in &proj.order_by {
                let key = match &spec.clause_ref {
                    None => member.output_name().to_string(),
                    // already qualified references pass through verbatim
                    Some(r) if r.contains('.') => r.clone(),
                    Some(r) => format!("{}.{}", member.output_name(), r),
                };
                merged.order_by.insert(key, spec.descending);
            }
            if let Some(n) = proj.skip {
                if merged.skip.is_some() {
                    return Err(CompileError::MergeConflict {
                        clause: keyword,
                        subclause: "SKIP",
                    });
                }
                merged.skip = Some(n);
            }
            if let Some(n) = proj.limit {
                if merged.limit.is_some() {
                    return Err(CompileError::MergeConflict {
                        clause: keyword,
                        subclause: "LIMIT",
                    });
                }
                merged.limit = Some(n);
            }
            if where_request.is_none() {
                where_request = proj.where_clause.clone();
            }
        }
        if let Some(condition) = where_request {
            if terminal {
                return Err(CompileError::WhereInReturn);
            }
            if merged.where_clause.is_some() {
                return Err(CompileError::MergeConflict {
                    clause: keyword,
                    subclause: "WHERE",
                });
            }
            merged.where_clause = Some(condition);
        }
    }
    Ok(merged)
}

fn render_projection_item(member: &Member) -> String {
    let base = member.expr.as_deref().unwrap_or(&member.name);
    match &member.alias {
        Some(alias) => format!("{} AS {}", base, alias),
        None => base.to_string(),
    }
}
