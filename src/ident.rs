use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;

use crate::catalog::{Entity, EntityCatalog};

/// Grouping granularity for per-identifier statistics.
///
/// Levels form a strict containment chain: `Global` collapses every entity
/// into the single identifier 0, while each finer level partitions entities
/// into disjoint groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Default)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierLevel {
    #[default]
    Global = 0,
    Gateway = 1,
    Beam = 2,
    Terminal = 3,
    TerminalUser = 4,
}

/// All levels, coarsest first.
pub const ALL_LEVELS: &[IdentifierLevel] = &[
    IdentifierLevel::Global,
    IdentifierLevel::Gateway,
    IdentifierLevel::Beam,
    IdentifierLevel::Terminal,
    IdentifierLevel::TerminalUser,
];

impl IdentifierLevel {
    /// Returns the canonical label used in logs, reports and config files.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Gateway => "gateway",
            Self::Beam => "beam",
            Self::Terminal => "terminal",
            Self::TerminalUser => "terminal_user",
        }
    }

    /// Converts a raw `u8` discriminant back to a level.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Global),
            1 => Some(Self::Gateway),
            2 => Some(Self::Beam),
            3 => Some(Self::Terminal),
            4 => Some(Self::TerminalUser),
            _ => None,
        }
    }

    /// Converts a canonical label back to a level.
    pub fn from_str(name: &str) -> Option<Self> {
        match name {
            "global" => Some(Self::Global),
            "gateway" => Some(Self::Gateway),
            "beam" => Some(Self::Beam),
            "terminal" => Some(Self::Terminal),
            "terminal_user" => Some(Self::TerminalUser),
            _ => None,
        }
    }

    /// Whether a group at this level contains groups at `finer`.
    ///
    /// Every level contains itself; `Global` contains everything.
    pub fn contains(self, finer: IdentifierLevel) -> bool {
        self <= finer
    }
}

impl fmt::Display for IdentifierLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution rules mapping entities to identifier values.
///
/// The provided defaults key each entity class by its own id (and a beam by
/// its beam id). Deployments with different grouping rules override the
/// relevant method; `Global` has no resolver, it is the constant 0.
/// Resolution must stay pure and deterministic for the lifetime of an
/// installation: the same entity always yields the same identifier.
pub trait IdentifierScheme {
    fn terminal_identifier(&self, _catalog: &dyn EntityCatalog, terminal: &dyn Entity) -> u32 {
        terminal.id()
    }

    fn terminal_user_identifier(&self, _catalog: &dyn EntityCatalog, user: &dyn Entity) -> u32 {
        user.id()
    }

    fn beam_identifier(&self, _catalog: &dyn EntityCatalog, beam_id: u32) -> u32 {
        beam_id
    }

    fn gateway_identifier(&self, _catalog: &dyn EntityCatalog, gateway: &dyn Entity) -> u32 {
        gateway.id()
    }
}

/// The documented default resolution rules.
pub struct DefaultScheme;

impl IdentifierScheme for DefaultScheme {}

/// Computes the set of identifier values reachable at `level`.
///
/// Resolves every entity of the level's class through `scheme` exactly once
/// and deduplicates. Callers snapshot this at installation time; later
/// catalog changes do not retroactively alter a registry built from it.
pub fn identifier_set(
    scheme: &dyn IdentifierScheme,
    catalog: &dyn EntityCatalog,
    level: IdentifierLevel,
) -> BTreeSet<u32> {
    match level {
        IdentifierLevel::Global => BTreeSet::from([0]),
        IdentifierLevel::Gateway => catalog
            .gateways()
            .iter()
            .map(|gw| scheme.gateway_identifier(catalog, gw.as_ref()))
            .collect(),
        IdentifierLevel::Beam => catalog
            .beams()
            .iter()
            .map(|&beam| scheme.beam_identifier(catalog, beam))
            .collect(),
        IdentifierLevel::Terminal => catalog
            .terminals()
            .iter()
            .map(|t| scheme.terminal_identifier(catalog, t.as_ref()))
            .collect(),
        IdentifierLevel::TerminalUser => catalog
            .terminal_users()
            .iter()
            .map(|u| scheme.terminal_user_identifier(catalog, u.as_ref()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{SimEntity, StaticCatalog};
    use std::rc::Rc;

    fn three_beam_catalog() -> StaticCatalog {
        let mut catalog = StaticCatalog::new();
        catalog.add_gateway(Rc::new(SimEntity::new(10)));
        for beam in [1, 2, 3] {
            catalog.add_beam(beam, 10);
        }
        for (terminal, beam) in [(100, 1), (101, 2), (102, 3), (103, 3)] {
            catalog.add_terminal(Rc::new(SimEntity::new(terminal)), beam);
        }
        catalog.add_user(Rc::new(SimEntity::new(200)), 100);
        catalog.add_user(Rc::new(SimEntity::new(201)), 100);
        catalog
    }

    #[test]
    fn test_level_labels_round_trip() {
        for &level in ALL_LEVELS {
            assert_eq!(IdentifierLevel::from_str(level.as_str()), Some(level));
            assert_eq!(IdentifierLevel::from_u8(level as u8), Some(level));
        }
        assert_eq!(IdentifierLevel::from_str("galaxy"), None);
        assert_eq!(IdentifierLevel::from_u8(5), None);
    }

    #[test]
    fn test_containment_order() {
        use IdentifierLevel::*;
        assert!(Global.contains(TerminalUser));
        assert!(Gateway.contains(Beam));
        assert!(Beam.contains(Terminal));
        assert!(Terminal.contains(TerminalUser));
        assert!(Beam.contains(Beam));
        assert!(!Terminal.contains(Beam));
        assert!(!TerminalUser.contains(Global));
    }

    #[test]
    fn test_global_identifier_set_is_zero() {
        let catalog = three_beam_catalog();
        let ids = identifier_set(&DefaultScheme, &catalog, IdentifierLevel::Global);
        assert_eq!(ids, BTreeSet::from([0]));
    }

    #[test]
    fn test_beam_identifier_set() {
        let catalog = three_beam_catalog();
        let ids = identifier_set(&DefaultScheme, &catalog, IdentifierLevel::Beam);
        assert_eq!(ids, BTreeSet::from([1, 2, 3]));
    }

    #[test]
    fn test_terminal_identifier_set_matches_catalog() {
        let catalog = three_beam_catalog();
        let ids = identifier_set(&DefaultScheme, &catalog, IdentifierLevel::Terminal);
        assert_eq!(ids, BTreeSet::from([100, 101, 102, 103]));
    }

    #[test]
    fn test_overridden_scheme_groups_users_by_terminal() {
        struct UsersByTerminal;
        impl IdentifierScheme for UsersByTerminal {
            fn terminal_user_identifier(
                &self,
                catalog: &dyn EntityCatalog,
                user: &dyn Entity,
            ) -> u32 {
                catalog.terminal_of_user(user.id()).unwrap_or(user.id())
            }
        }

        let catalog = three_beam_catalog();
        let ids = identifier_set(&UsersByTerminal, &catalog, IdentifierLevel::TerminalUser);
        // Both users live on terminal 100, so they collapse into one group.
        assert_eq!(ids, BTreeSet::from([100]));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let catalog = three_beam_catalog();
        let first = identifier_set(&DefaultScheme, &catalog, IdentifierLevel::TerminalUser);
        let second = identifier_set(&DefaultScheme, &catalog, IdentifierLevel::TerminalUser);
        assert_eq!(first, second);
    }
}
