//! The horizon lattice
//!
//! A mapping of id to Horizon rooted at a synthetic unrestricted top. Every
//! registered horizon must name a registered parent and be a structural
//! refinement of it, so every ancestor chain ends at the top.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::observability::{log_event, LogEvent};

use super::errors::{HorizonError, HorizonResult};
use super::gate::{EventProvider, HorizonGate};
use super::horizon::{Horizon, HorizonDescriptor, RefinementRequest, TOP_HORIZON_ID};

/// Outcome of an operational restrictivity check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RestrictivityCheck {
    Holds {
        parent_visible: usize,
        child_visible: usize,
    },
    /// The child sees an event the parent does not
    Violated { event_id: String },
}

impl RestrictivityCheck {
    pub fn holds(&self) -> bool {
        matches!(self, RestrictivityCheck::Holds { .. })
    }
}

#[derive(Debug, Clone)]
pub struct HorizonLattice {
    horizons: BTreeMap<String, Horizon>,
}

impl Default for HorizonLattice {
    fn default() -> Self {
        Self::new()
    }
}

impl HorizonLattice {
    pub fn new() -> Self {
        let mut horizons = BTreeMap::new();
        let top = Horizon::top();
        horizons.insert(top.id().to_string(), top);
        Self { horizons }
    }

    pub fn top(&self) -> &Horizon {
        &self.horizons[TOP_HORIZON_ID]
    }

    pub fn len(&self) -> usize {
        self.horizons.len()
    }

    pub fn is_empty(&self) -> bool {
        // the top element is always present
        false
    }

    pub fn contains(&self, id: &str) -> bool {
        self.horizons.contains_key(id)
    }

    pub fn get(&self, id: &str) -> HorizonResult<&Horizon> {
        self.horizons
            .get(id)
            .ok_or_else(|| HorizonError::UnknownHorizon(id.to_string()))
    }

    /// Adds a horizon under its declared parent
    pub fn register(&mut self, horizon: Horizon) -> HorizonResult<&Horizon> {
        if horizon.is_top() {
            return Err(HorizonError::TopElementImport);
        }
        if self.horizons.contains_key(horizon.id()) {
            return Err(HorizonError::DuplicateHorizon(horizon.id().to_string()));
        }
        let parent_id = horizon.parent().unwrap_or(TOP_HORIZON_ID).to_string();
        let parent = self
            .horizons
            .get(&parent_id)
            .ok_or_else(|| HorizonError::UnknownParent {
                horizon: horizon.id().to_string(),
                parent: parent_id.clone(),
            })?;
        if !horizon.is_refinement_of(parent) {
            return Err(HorizonError::NotARefinement {
                horizon: horizon.id().to_string(),
                parent: parent_id,
            });
        }

        let id = horizon.id().to_string();
        self.horizons.insert(id.clone(), horizon);
        Ok(&self.horizons[&id])
    }

    /// Refines a registered horizon and registers the child
    pub fn refine(&mut self, parent_id: &str, request: RefinementRequest) -> HorizonResult<&Horizon> {
        let child = self.get(parent_id)?.refine(request);
        log_event(
            LogEvent::HorizonRefined,
            &[
                ("horizon", child.id()),
                ("parent", parent_id),
                ("type", child.horizon_type().as_str()),
            ],
        );
        self.register(child)
    }

    /// The horizon itself, then each ancestor up to and including the top
    pub fn ancestors(&self, id: &str) -> HorizonResult<Vec<&Horizon>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.get(id)?;
        loop {
            if !seen.insert(current.id()) {
                return Err(HorizonError::ImportCycle(
                    chain.iter().map(|h: &&Horizon| h.id().to_string()).collect(),
                ));
            }
            chain.push(current);
            match current.parent() {
                Some(parent) => current = self.get(parent)?,
                None => break,
            }
        }
        Ok(chain)
    }

    /// First shared ancestor; always exists because every chain ends at the top
    pub fn meet(&self, a: &str, b: &str) -> HorizonResult<&Horizon> {
        let b_chain: HashSet<&str> = self.ancestors(b)?.into_iter().map(|h| h.id()).collect();
        let a_chain = self.ancestors(a)?;
        Ok(a_chain
            .into_iter()
            .find(|h| b_chain.contains(h.id()))
            .unwrap_or_else(|| self.top()))
    }

    pub fn gate<'a, P: EventProvider>(
        &'a self,
        id: &str,
        provider: &'a P,
    ) -> HorizonResult<HorizonGate<'a, P>> {
        Ok(HorizonGate::new(self.get(id)?, provider))
    }

    /// Operational restrictivity proof for one concrete pair: the child's
    /// available set must be a subset of the parent's.
    pub fn verify_restrictivity<P: EventProvider>(
        &self,
        parent_id: &str,
        child_id: &str,
        provider: &P,
    ) -> HorizonResult<RestrictivityCheck> {
        let parent = self.gate(parent_id, provider)?;
        let child = self.gate(child_id, provider)?;

        let parent_ids = parent.available_ids();
        let child_events = child.available_events();
        for event in &child_events {
            if !parent_ids.contains(event.id()) {
                log_event(
                    LogEvent::RestrictivityViolation,
                    &[
                        ("child", child_id),
                        ("event_id", event.id()),
                        ("parent", parent_id),
                    ],
                );
                return Ok(RestrictivityCheck::Violated {
                    event_id: event.id().to_string(),
                });
            }
        }
        Ok(RestrictivityCheck::Holds {
            parent_visible: parent_ids.len(),
            child_visible: child_events.len(),
        })
    }

    /// Every horizon except the top, parents before children
    pub fn export(&self) -> Vec<HorizonDescriptor> {
        let mut ordered: Vec<(usize, &Horizon)> = self
            .horizons
            .values()
            .filter(|h| !h.is_top())
            .map(|h| (self.ancestors(h.id()).map_or(0, |a| a.len()), h))
            .collect();
        ordered.sort_by(|(da, a), (db, b)| da.cmp(db).then_with(|| a.id().cmp(b.id())));
        ordered.into_iter().map(|(_, h)| h.to_descriptor()).collect()
    }

    /// Rebuilds a lattice from descriptors in any order; the top is
    /// re-synthesized, never read
    pub fn import(descriptors: Vec<HorizonDescriptor>) -> HorizonResult<Self> {
        let mut lattice = Self::new();
        let mut pending: Vec<Horizon> = Vec::with_capacity(descriptors.len());
        let mut declared: HashSet<String> = HashSet::new();

        for descriptor in descriptors {
            if descriptor.id == TOP_HORIZON_ID {
                return Err(HorizonError::TopElementImport);
            }
            if !declared.insert(descriptor.id.clone()) {
                return Err(HorizonError::DuplicateHorizon(descriptor.id));
            }
            pending.push(Horizon::from_descriptor(descriptor));
        }

        for horizon in &pending {
            let parent = horizon.parent().unwrap_or(TOP_HORIZON_ID);
            if parent != TOP_HORIZON_ID && !declared.contains(parent) {
                return Err(HorizonError::UnknownParent {
                    horizon: horizon.id().to_string(),
                    parent: parent.to_string(),
                });
            }
        }

        while !pending.is_empty() {
            let (ready, waiting): (Vec<Horizon>, Vec<Horizon>) = pending
                .into_iter()
                .partition(|h| lattice.contains(h.parent().unwrap_or(TOP_HORIZON_ID)));
            if ready.is_empty() {
                let mut ids: Vec<String> = waiting.iter().map(|h| h.id().to_string()).collect();
                ids.sort();
                return Err(HorizonError::ImportCycle(ids));
            }
            for horizon in ready {
                lattice.register(horizon)?;
            }
            pending = waiting;
        }
        Ok(lattice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::horizon::HorizonType;

    fn lattice() -> HorizonLattice {
        let mut l = HorizonLattice::new();
        l.refine(
            TOP_HORIZON_ID,
            RefinementRequest::new("org", "org").horizon_type(HorizonType::Workspace),
        )
        .unwrap();
        l.refine("org", RefinementRequest::new("a", "a").workspaces(["w1"]))
            .unwrap();
        l.refine("org", RefinementRequest::new("b", "b").workspaces(["w2"]))
            .unwrap();
        l.refine("a", RefinementRequest::new("a1", "a1").actors(["alice"]))
            .unwrap();
        l.refine("b", RefinementRequest::new("b1", "b1").actors(["bob"]))
            .unwrap();
        l
    }

    #[test]
    fn test_meet() {
        let l = lattice();
        assert_eq!(l.meet("a1", "a1").unwrap().id(), "a1");
        assert_eq!(l.meet("a", "b").unwrap().id(), "org");
        assert_eq!(l.meet("a1", "b1").unwrap().id(), "org");
        assert_eq!(l.meet("a1", "a").unwrap().id(), "a");
    }

    #[test]
    fn test_ancestors_end_at_top() {
        let l = lattice();
        let ids: Vec<_> = l.ancestors("a1").unwrap().iter().map(|h| h.id()).collect();
        assert_eq!(ids, vec!["a1", "a", "org", TOP_HORIZON_ID]);
    }

    #[test]
    fn test_unknown_horizon_is_an_error() {
        let l = lattice();
        assert_eq!(
            l.get("nope").unwrap_err(),
            HorizonError::UnknownHorizon("nope".into())
        );
        assert!(l.meet("a", "nope").is_err());
    }

    #[test]
    fn test_register_rejects_broader_child() {
        let mut l = lattice();
        let a = l.get("a").unwrap().clone();
        let mut descriptor = a.refine(RefinementRequest::new("wide", "wide")).to_descriptor();
        descriptor.workspaces = None;
        let err = l.register(Horizon::from_descriptor(descriptor)).unwrap_err();
        assert_eq!(err.code(), "NOEMA_NOT_A_REFINEMENT");
    }

    #[test]
    fn test_export_import_round_trip() {
        let l = lattice();
        let mut exported = l.export();
        assert_eq!(exported.len(), 5);
        assert_eq!(exported[0].id, "org");
        exported.reverse();
        let imported = HorizonLattice::import(exported).unwrap();
        assert_eq!(imported.len(), l.len());
        assert_eq!(imported.get("b1").unwrap(), l.get("b1").unwrap());
    }

    #[test]
    fn test_import_rejects_top_and_cycles() {
        let mut top = Horizon::top().to_descriptor();
        top.parent = None;
        assert_eq!(
            HorizonLattice::import(vec![top]).unwrap_err(),
            HorizonError::TopElementImport
        );

        let x = HorizonDescriptor {
            id: "x".into(),
            horizon_type: HorizonType::Global,
            name: "x".into(),
            workspaces: None,
            actors: None,
            frames: None,
            time_range: None,
            tags: vec![],
            parent: Some("y".into()),
        };
        let mut y = x.clone();
        y.id = "y".into();
        y.parent = Some("x".into());
        let err = HorizonLattice::import(vec![x, y]).unwrap_err();
        assert_eq!(err, HorizonError::ImportCycle(vec!["x".into(), "y".into()]));
    }
}
