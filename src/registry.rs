use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use tracing::debug;

use crate::catalog::EntityCatalog;
use crate::collector::CollectorKind;
use crate::ident::{identifier_set, IdentifierLevel, IdentifierScheme};
use crate::trace::Instrumented;

/// Mapping from identifier value to its collector instance.
///
/// Ordered so map-to-map wiring pairs entries deterministically. Built during
/// installation and frozen afterwards; the registry owns collectors, never
/// probes.
#[derive(Default)]
pub struct CollectorRegistry {
    entries: BTreeMap<u32, Rc<dyn Instrumented>>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a collector for `identifier`, replacing any previous entry.
    pub fn insert(&mut self, identifier: u32, collector: Rc<dyn Instrumented>) {
        self.entries.insert(identifier, collector);
    }

    pub fn get(&self, identifier: u32) -> Option<&Rc<dyn Instrumented>> {
        self.entries.get(&identifier)
    }

    pub fn contains(&self, identifier: u32) -> bool {
        self.entries.contains_key(&identifier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identifier keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Rc<dyn Instrumented>)> + '_ {
        self.entries.iter().map(|(id, collector)| (*id, collector))
    }

    /// Flushes every collector, in key order.
    pub fn flush_all(&self) {
        for collector in self.entries.values() {
            collector.flush();
        }
    }
}

/// Builds one collector per identifier in `ids`, keyed by that identifier.
///
/// Identifiers already present in the registry are left untouched. Returns
/// the number of collectors created.
pub fn create_collectors_from(
    ids: &BTreeSet<u32>,
    kind: CollectorKind,
    base_name: &str,
    level: IdentifierLevel,
    registry: &mut CollectorRegistry,
) -> u32 {
    let mut created = 0;
    for &identifier in ids {
        if registry.contains(identifier) {
            continue;
        }
        let name = format!("{base_name}-{}-{identifier}", level.as_str());
        registry.insert(identifier, kind.build(name, identifier));
        created += 1;
    }
    debug!(kind = %kind, level = %level, created, "collectors created");
    created
}

/// Builds one collector per identifier reachable at `level`.
///
/// The identifier set is computed once from the catalog at call time; later
/// catalog changes do not retroactively alter the registry.
pub fn create_collectors(
    scheme: &dyn IdentifierScheme,
    catalog: &dyn EntityCatalog,
    level: IdentifierLevel,
    kind: CollectorKind,
    base_name: &str,
    registry: &mut CollectorRegistry,
) -> u32 {
    let ids = identifier_set(scheme, catalog, level);
    create_collectors_from(&ids, kind, base_name, level, registry)
}
