//! Persistence seams consumed by the calculators.
//!
//! Implementations own transactional consistency. The engine only reads through
//! these traits and hands back the aggregates it mutated.
use super::types::{ClientId, DomainId, Element, ElementId, FlyweightElement, UnitId};
use crate::error::RepositoryError;
use std::collections::{BTreeSet, HashSet};

pub type RepositoryResult<T> = Result<T, RepositoryError>;

pub trait FlyweightRepository: Send + Sync {
    /// Returns every element of the unit that has at least one link of the given
    /// types in the domain, reduced to ids and links.
    fn find_all_links_grouped_by_element(
        &self,
        link_types: &BTreeSet<String>,
        domain: &DomainId,
        unit: &UnitId,
        client: &ClientId,
    ) -> RepositoryResult<Vec<FlyweightElement>>;
}

pub trait ElementRepository: Send + Sync {
    /// Hydrates risk-affected elements (assets, processes, scopes) owned by the
    /// unit and associated with the domain, optionally restricted to `ids`.
    fn find_risk_affected(
        &self,
        unit: &UnitId,
        domain: &DomainId,
        ids: Option<&HashSet<ElementId>>,
    ) -> RepositoryResult<Vec<Element>>;

    /// Processes of the client that own at least one risk.
    fn find_all_having_risks(&self, client: &ClientId) -> RepositoryResult<Vec<Element>>;

    fn find_by_ids(&self, client: &ClientId, ids: &HashSet<ElementId>) -> RepositoryResult<Vec<Element>>;

    fn save(&self, element: Element) -> RepositoryResult<Element>;
}
