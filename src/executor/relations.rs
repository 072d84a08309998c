use std::{ops::ControlFlow, ptr};

use sqlparser::ast::{ObjectName, Query, Statement, Visit, Visitor};

/// Relations a statement reads that do not resolve to a CTE in scope
#[derive(Debug, Default)]
pub struct Relations {
    pub names: Vec<Vec<String>>,
    scopes:    Vec<CteScope>
}

/// CTE names declared by one query
///
/// `visible` is how many of `names` the relation being visited can see: the
/// earlier siblings while inside a CTE body (itself too under `RECURSIVE`),
/// all of them in the query body.
#[derive(Debug)]
struct CteScope {
    names:     Vec<String>,
    bodies:    Vec<*const Query>,
    recursive: bool,
    visible:   usize
}

impl CteScope {
    fn for_query(query: &Query) -> Self {
        let ctes = query
            .with
            .as_ref()
            .map(|with| with.cte_tables.as_slice())
            .unwrap_or_default();
        let names: Vec<String> = ctes
            .iter()
            .map(|cte| cte.alias.name.value.to_lowercase())
            .collect();
        Self {
            visible:   names.len(),
            bodies:    ctes.iter().map(|cte| ptr::from_ref(&*cte.query)).collect(),
            recursive: query.with.as_ref().is_some_and(|with| with.recursive),
            names
        }
    }

    fn body_index(&self, query: &Query) -> Option<usize> {
        self.bodies.iter().position(|body| ptr::eq(*body, query))
    }

    fn sees(&self, name: &str) -> bool {
        self.names[..self.visible].iter().any(|n| n == name)
    }
}

impl Relations {
    fn is_cte(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.sees(name))
    }
}

impl Visitor for Relations {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if let Some(parent) = self.scopes.last_mut()
            && let Some(index) = parent.body_index(query)
        {
            parent.visible = if parent.recursive { index + 1 } else { index };
        }
        self.scopes.push(CteScope::for_query(query));
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        self.scopes.pop();
        if let Some(parent) = self.scopes.last_mut()
            && parent.body_index(query).is_some()
        {
            parent.visible = parent.names.len();
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        let parts: Vec<String> = relation
            .0
            .iter()
            .map(|part| normalize_identifier(&part.to_string()))
            .collect();
        if let [name] = parts.as_slice()
            && self.is_cte(name)
        {
            return ControlFlow::Continue(());
        }
        self.names.push(parts);
        ControlFlow::Continue(())
    }
}

pub fn collect_relations(statement: &Statement) -> Relations {
    let mut relations = Relations::default();
    let _ = statement.visit(&mut relations);
    relations
}

/// Strip identifier quoting and fold case
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| matches!(c, '"' | '`' | '[' | ']'))
        .to_lowercase()
}
