//! registry.rs
//! In-memory arena of elements keyed by id. Links live on their source element as
//! `(type, target, domain)` records, so the table holds no ownership cycles and
//! serializes as plain JSON.

use super::repository::{ElementRepository, FlyweightRepository, RepositoryResult};
use super::types::*;
use crate::error::RepositoryError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Tables {
    units: Vec<Unit>,
    elements: Vec<Element>,

    // Ephemeral lookup (Not serialized, rebuilt on load)
    #[serde(skip)]
    index: HashMap<ElementId, usize>,
}

impl Tables {
    fn rebuild_index(&mut self) {
        self.index = self.elements.iter().enumerate().map(|(i, e)| (e.id.clone(), i)).collect();
    }

    fn get(&self, id: &ElementId) -> Option<&Element> {
        self.index.get(id).map(|&i| &self.elements[i])
    }

    fn client_of(&self, unit: &UnitId) -> Option<&ClientId> {
        self.units.iter().find(|u| &u.id == unit).map(|u| &u.client)
    }

    fn owned_by_client(&self, element: &Element, client: &ClientId) -> bool {
        self.client_of(&element.owner) == Some(client)
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    tables: RwLock<Tables>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    pub fn add_unit(&self, unit: Unit) -> RepositoryResult<()> {
        let mut tables = self.write()?;
        tables.units.retain(|u| u.id != unit.id);
        tables.units.push(unit);
        Ok(())
    }

    /// Inserts or replaces an element.
    pub fn insert(&self, element: Element) -> RepositoryResult<()> {
        let mut tables = self.write()?;
        match tables.index.get(&element.id).copied() {
            Some(i) => tables.elements[i] = element,
            None => {
                let i = tables.elements.len();
                tables.index.insert(element.id.clone(), i);
                tables.elements.push(element);
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &ElementId) -> RepositoryResult<Element> {
        let tables = self.read()?;
        tables.get(id).cloned().ok_or_else(|| not_found(id))
    }

    pub fn count(&self) -> usize {
        self.tables.read().map(|t| t.elements.len()).unwrap_or(0)
    }

    pub fn to_json(&self) -> RepositoryResult<String> {
        let tables = self.read()?;
        serde_json::to_string(&*tables).map_err(|e| RepositoryError::Backend(e.to_string()))
    }

    pub fn from_json(json: &str) -> RepositoryResult<Self> {
        let mut tables: Tables = serde_json::from_str(json).map_err(|e| RepositoryError::Backend(e.to_string()))?;
        tables.rebuild_index();
        Ok(Self { tables: RwLock::new(tables) })
    }

    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| RepositoryError::Backend("registry lock poisoned".into()))
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| RepositoryError::Backend("registry lock poisoned".into()))
    }
}

fn not_found(id: &ElementId) -> RepositoryError {
    RepositoryError::NotFound { entity: "Element".into(), id: id.to_string() }
}

fn in_scope(element: &Element, unit: &UnitId, domain: &DomainId) -> bool {
    &element.owner == unit && element.domains.contains(domain)
}

impl FlyweightRepository for Registry {
    fn find_all_links_grouped_by_element(
        &self,
        link_types: &BTreeSet<String>,
        domain: &DomainId,
        unit: &UnitId,
        client: &ClientId,
    ) -> RepositoryResult<Vec<FlyweightElement>> {
        let tables = self.read()?;
        if tables.client_of(unit) != Some(client) {
            return Ok(Vec::new());
        }

        let mut grouped: BTreeMap<ElementId, Vec<FlyweightLink>> = BTreeMap::new();
        for source in tables.elements.iter().filter(|e| in_scope(e, unit, domain)) {
            for link in source.links_in(domain).filter(|l| link_types.contains(&l.link_type)) {
                let target_in_scope = tables.get(&link.target).map_or(false, |t| in_scope(t, unit, domain));
                if !target_in_scope {
                    continue;
                }
                grouped.entry(source.id.clone()).or_default().push(FlyweightLink {
                    link_type: link.link_type.clone(),
                    source_id: source.id.clone(),
                    target_id: link.target.clone(),
                });
                // Targets without own outgoing links still belong to the graph.
                grouped.entry(link.target.clone()).or_default();
            }
        }

        Ok(grouped
            .into_iter()
            .map(|(source_id, links)| FlyweightElement { source_id, links })
            .collect())
    }
}

impl ElementRepository for Registry {
    fn find_risk_affected(
        &self,
        unit: &UnitId,
        domain: &DomainId,
        ids: Option<&HashSet<ElementId>>,
    ) -> RepositoryResult<Vec<Element>> {
        let tables = self.read()?;
        Ok(tables
            .elements
            .iter()
            .filter(|e| e.element_type.is_risk_affected() && in_scope(e, unit, domain))
            .filter(|e| ids.map_or(true, |ids| ids.contains(&e.id)))
            .cloned()
            .collect())
    }

    fn find_all_having_risks(&self, client: &ClientId) -> RepositoryResult<Vec<Element>> {
        let tables = self.read()?;
        Ok(tables
            .elements
            .iter()
            .filter(|e| e.element_type == ElementType::Process && e.has_risks())
            .filter(|e| tables.owned_by_client(e, client))
            .cloned()
            .collect())
    }

    fn find_by_ids(&self, client: &ClientId, ids: &HashSet<ElementId>) -> RepositoryResult<Vec<Element>> {
        let tables = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| tables.get(id))
            .filter(|e| tables.owned_by_client(e, client))
            .cloned()
            .collect())
    }

    fn save(&self, element: Element) -> RepositoryResult<Element> {
        let mut tables = self.write()?;
        let i = *tables.index.get(&element.id).ok_or_else(|| not_found(&element.id))?;
        tables.elements[i] = element.clone();
        Ok(element)
    }
}
