use std::collections::BTreeSet;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::aggregator::{Aggregator, BufferBackend, RenderBackend};
use crate::catalog::{Entity, EntityCatalog};
use crate::collector::CollectorKind;
use crate::ident::{DefaultScheme, IdentifierLevel, IdentifierScheme};
use crate::output::OutputType;
use crate::probe::{self, Probe};
use crate::registry::{self, CollectorRegistry};
use crate::trace::Instrumented;

/// The per-statistic wiring hook.
///
/// The helper owns sequencing (aggregator creation, freeze, idempotence);
/// a family owns only the collectors and probes of its specific statistic.
pub trait StatsFamily {
    /// Builds collectors and probes for this statistic. Wiring mistakes in
    /// here are programming errors and fail fatally; there is no rollback.
    fn build(&mut self, ctx: &mut InstallContext<'_>);

    /// Optional terminal enumeration override, for families that need to
    /// special-case which terminals get collectors (e.g. skip terminals with
    /// no traffic). `None` selects the helper's standard enumeration.
    fn terminal_identifiers(
        &self,
        _scheme: &dyn IdentifierScheme,
        _catalog: &dyn EntityCatalog,
    ) -> Option<BTreeSet<u32>> {
        None
    }
}

/// Closure adapter for ad-hoc statistic families.
pub struct FnStatsFamily<F: FnMut(&mut InstallContext<'_>)> {
    hook: F,
}

impl<F: FnMut(&mut InstallContext<'_>)> FnStatsFamily<F> {
    pub fn new(hook: F) -> Self {
        Self { hook }
    }
}

impl<F: FnMut(&mut InstallContext<'_>)> StatsFamily for FnStatsFamily<F> {
    fn build(&mut self, ctx: &mut InstallContext<'_>) {
        (self.hook)(ctx)
    }
}

/// Borrowed view of the helper handed to a family during installation.
///
/// Captures the taxonomy selections at `install` entry, so reconfiguration
/// attempts cannot produce a partially-applied install: the hook only ever
/// sees the frozen values.
pub struct InstallContext<'a> {
    catalog: &'a dyn EntityCatalog,
    scheme: &'a dyn IdentifierScheme,
    level: IdentifierLevel,
    output: OutputType,
    base_name: &'a str,
    aggregator: Rc<dyn Instrumented>,
    terminal_ids: Option<BTreeSet<u32>>,
    registries: Vec<(String, CollectorRegistry)>,
    probes: Vec<Probe>,
}

impl<'a> InstallContext<'a> {
    pub fn catalog(&self) -> &dyn EntityCatalog {
        self.catalog
    }

    pub fn scheme(&self) -> &dyn IdentifierScheme {
        self.scheme
    }

    /// Identifier level frozen at install entry.
    pub fn level(&self) -> IdentifierLevel {
        self.level
    }

    /// Output mode frozen at install entry.
    pub fn output(&self) -> OutputType {
        self.output
    }

    /// The terminal aggregator as a wirable node, for `connect` calls.
    pub fn aggregator_node(&self) -> &Rc<dyn Instrumented> {
        &self.aggregator
    }

    /// Creates one collector of `kind` per identifier reachable at the
    /// frozen level, inserting into `registry`. Honors the family's terminal
    /// enumeration override. Returns the number created.
    pub fn create_collectors(&self, kind: CollectorKind, registry: &mut CollectorRegistry) -> u32 {
        if self.level == IdentifierLevel::Terminal {
            if let Some(ids) = &self.terminal_ids {
                return registry::create_collectors_from(
                    ids,
                    kind,
                    self.base_name,
                    self.level,
                    registry,
                );
            }
        }
        registry::create_collectors(
            self.scheme,
            self.catalog,
            self.level,
            kind,
            self.base_name,
            registry,
        )
    }

    /// Resolves an entity to its identifier at the frozen level.
    ///
    /// Terminal-class entities resolve through the terminal rule, and so on;
    /// at `Global` every entity resolves to 0. For coarser-than-entity
    /// levels the catalog's topology edges are followed.
    pub fn identifier_of_terminal(&self, terminal: &dyn Entity) -> u32 {
        match self.level {
            IdentifierLevel::Global => 0,
            IdentifierLevel::Gateway => {
                let beam = self
                    .catalog
                    .beam_of_terminal(terminal.id())
                    .unwrap_or_else(|| panic!("terminal {} has no beam", terminal.id()));
                self.catalog
                    .gateway_of_beam(beam)
                    .unwrap_or_else(|| panic!("beam {beam} has no gateway"))
            }
            IdentifierLevel::Beam => self
                .catalog
                .beam_of_terminal(terminal.id())
                .unwrap_or_else(|| panic!("terminal {} has no beam", terminal.id())),
            IdentifierLevel::Terminal | IdentifierLevel::TerminalUser => {
                self.scheme.terminal_identifier(self.catalog, terminal)
            }
        }
    }

    /// Installs a probe against the frozen registry set, retaining ownership
    /// of it in the helper. Returns whether the probe was installed; a
    /// skipped probe is logged and does not abort the installation.
    #[allow(clippy::too_many_arguments)]
    pub fn install_probe<C, T>(
        &mut self,
        entity: &dyn Entity,
        entity_source: &str,
        probe_label: &str,
        probe_kind: &str,
        probe_output: &str,
        identifier: u32,
        registry: &CollectorRegistry,
        sink: fn(&C, T),
    ) -> bool
    where
        C: Instrumented,
        T: Copy + 'static,
    {
        match probe::install_probe(
            entity,
            entity_source,
            probe_label,
            probe_kind,
            probe_output,
            identifier,
            registry,
            sink,
        ) {
            Some(installed) => {
                self.probes.push(installed);
                true
            }
            None => false,
        }
    }

    /// Hands a finished registry to the helper, keyed by a family-chosen
    /// name (e.g. "conversion", "terminal").
    pub fn keep_registry(&mut self, name: &str, registry: CollectorRegistry) {
        self.registries.push((name.to_string(), registry));
    }

    /// Number of probes installed so far.
    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }
}

/// Builds and owns one statistic's collector fan-out and terminal aggregator.
///
/// Lifecycle: construct with a catalog reference, configure through the
/// setters, then `install` exactly once. Setters are documented no-ops after
/// installation, and a second `install` is a no-op.
pub struct StatsHelper {
    name: String,
    level: IdentifierLevel,
    output: OutputType,
    installed: bool,
    catalog: Rc<dyn EntityCatalog>,
    scheme: Box<dyn IdentifierScheme>,
    backend: Rc<dyn RenderBackend>,
    aggregator: Option<Rc<Aggregator>>,
    registries: Vec<(String, CollectorRegistry)>,
    probes: Vec<Probe>,
}

impl StatsHelper {
    /// Creates an unconfigured helper over a read-only entity catalog, with
    /// the default identifier scheme and an in-memory render backend.
    pub fn new(catalog: Rc<dyn EntityCatalog>) -> Self {
        Self {
            name: "stat".to_string(),
            level: IdentifierLevel::Global,
            output: OutputType::None,
            installed: false,
            catalog,
            scheme: Box::new(DefaultScheme),
            backend: Rc::new(BufferBackend::new()),
            aggregator: None,
            registries: Vec::new(),
            probes: Vec::new(),
        }
    }

    /// Replaces the identifier resolution scheme (pre-install only).
    pub fn with_scheme(mut self, scheme: Box<dyn IdentifierScheme>) -> Self {
        self.scheme = scheme;
        self
    }

    /// Replaces the render backend the aggregator writes to.
    pub fn with_backend(mut self, backend: Rc<dyn RenderBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Sets the display name. No effect after installation.
    pub fn set_name(&mut self, name: &str) {
        if self.installed {
            warn!(helper = %self.name, "set_name after install ignored");
            return;
        }
        self.name = name.to_string();
    }

    /// Sets the identifier level. No effect after installation.
    pub fn set_identifier_level(&mut self, level: IdentifierLevel) {
        if self.installed {
            warn!(helper = %self.name, "set_identifier_level after install ignored");
            return;
        }
        self.level = level;
    }

    /// Sets the output mode. No effect after installation.
    pub fn set_output_type(&mut self, output: OutputType) {
        if self.installed {
            warn!(helper = %self.name, "set_output_type after install ignored");
            return;
        }
        self.output = output;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identifier_level(&self) -> IdentifierLevel {
        self.level
    }

    pub fn output_type(&self) -> OutputType {
        self.output
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    pub fn catalog(&self) -> &Rc<dyn EntityCatalog> {
        &self.catalog
    }

    /// The terminal aggregator, present once created.
    pub fn aggregator(&self) -> Option<&Rc<Aggregator>> {
        self.aggregator.as_ref()
    }

    /// A registry handed over by the family during installation.
    pub fn registry(&self, name: &str) -> Option<&CollectorRegistry> {
        self.registries
            .iter()
            .find(|(registry_name, _)| registry_name == name)
            .map(|(_, registry)| registry)
    }

    /// Probes installed and owned by this helper.
    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }

    /// Creates the aggregator matching the active output mode. Idempotent:
    /// a second call returns the existing instance.
    pub fn create_aggregator(&mut self) -> Rc<Aggregator> {
        if let Some(existing) = &self.aggregator {
            return Rc::clone(existing);
        }
        let aggregator = Rc::new(Aggregator::for_output(
            self.output,
            &self.name,
            Rc::clone(&self.backend),
        ));
        debug!(
            helper = %self.name,
            kind = aggregator.kind_name(),
            output = %self.output,
            "aggregator created"
        );
        self.aggregator = Some(Rc::clone(&aggregator));
        aggregator
    }

    /// Installs probes, collectors and the aggregator for `family`.
    ///
    /// Re-entry is guarded: a second call is a no-op. The taxonomy is frozen
    /// on entry; after return the helper is read-only apart from consumers
    /// reading the aggregator handle.
    pub fn install(&mut self, family: &mut dyn StatsFamily) {
        if self.installed {
            warn!(helper = %self.name, "install called twice, ignoring");
            return;
        }

        let aggregator = self.create_aggregator();
        let aggregator_node: Rc<dyn Instrumented> = aggregator;
        let terminal_ids = family.terminal_identifiers(self.scheme.as_ref(), self.catalog.as_ref());

        let (registries, probes) = {
            let mut ctx = InstallContext {
                catalog: self.catalog.as_ref(),
                scheme: self.scheme.as_ref(),
                level: self.level,
                output: self.output,
                base_name: &self.name,
                aggregator: aggregator_node,
                terminal_ids,
                registries: Vec::new(),
                probes: Vec::new(),
            };
            family.build(&mut ctx);
            (ctx.registries, ctx.probes)
        };

        self.registries = registries;
        self.probes = probes;
        self.installed = true;

        info!(
            helper = %self.name,
            identifier = %self.level,
            output = %self.output,
            registries = self.registries.len(),
            probes = self.probes.len(),
            "statistics installed"
        );
    }

    /// Flushes every retained collector registry, emitting accumulated
    /// values toward the aggregator.
    pub fn flush(&self) {
        for (_, registry) in &self.registries {
            registry.flush_all();
        }
    }
}
