use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use crate::trace::{TimedValue, TraceDescriptor, TraceSource};

/// A live data source that probes attach to.
///
/// Entities expose observation points: named, typed channels discoverable by
/// name. The core never inspects an entity beyond its id and these points.
pub trait Entity: 'static {
    /// Identifier unique within the entity's class.
    fn id(&self) -> u32;

    /// Resolves a named observation point to its type-erased
    /// [`TraceSource`], or `None` if the entity does not expose it.
    fn observation_point(&self, name: &str) -> Option<&dyn Any>;

    /// Queryable table of observation points.
    fn observation_descriptors(&self) -> &[TraceDescriptor] {
        &[]
    }
}

/// Read-only view of the host's entities and their topology.
///
/// The core resolves identifiers and enumerates probe targets through this
/// interface only; it never mutates the catalog.
pub trait EntityCatalog {
    fn gateways(&self) -> Vec<Rc<dyn Entity>>;
    fn beams(&self) -> Vec<u32>;
    fn terminals(&self) -> Vec<Rc<dyn Entity>>;
    fn terminal_users(&self) -> Vec<Rc<dyn Entity>>;

    /// Beam a terminal is attached to.
    fn beam_of_terminal(&self, terminal_id: u32) -> Option<u32>;

    /// Gateway serving a beam.
    fn gateway_of_beam(&self, beam_id: u32) -> Option<u32>;

    /// Terminal owning a terminal user.
    fn terminal_of_user(&self, user_id: u32) -> Option<u32>;
}

/// Observation-point payload shape supported by [`SimEntity`].
enum PointChannel {
    Value(TraceSource<f64>),
    Timed(TraceSource<TimedValue>),
}

/// Minimal concrete entity with registered observation points.
///
/// Hosts that assemble topology programmatically (and this crate's tests and
/// benches) use it as the probe target.
pub struct SimEntity {
    id: u32,
    points: HashMap<&'static str, PointChannel>,
}

impl SimEntity {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            points: HashMap::new(),
        }
    }

    /// Registers a single-value observation point.
    pub fn with_value_point(mut self, name: &'static str) -> Self {
        self.points.insert(name, PointChannel::Value(TraceSource::new()));
        self
    }

    /// Registers a timed-sample observation point.
    pub fn with_timed_point(mut self, name: &'static str) -> Self {
        self.points.insert(name, PointChannel::Timed(TraceSource::new()));
        self
    }

    /// Emits a value on a registered point. Returns false if the point is
    /// absent or carries a different payload.
    pub fn emit_value(&self, name: &str, value: f64) -> bool {
        match self.points.get(name) {
            Some(PointChannel::Value(source)) => {
                source.fire(value);
                true
            }
            _ => false,
        }
    }

    /// Emits a timed sample on a registered point.
    pub fn emit_timed(&self, name: &str, sample: TimedValue) -> bool {
        match self.points.get(name) {
            Some(PointChannel::Timed(source)) => {
                source.fire(sample);
                true
            }
            _ => false,
        }
    }
}

impl Entity for SimEntity {
    fn id(&self) -> u32 {
        self.id
    }

    fn observation_point(&self, name: &str) -> Option<&dyn Any> {
        self.points.get(name).map(|channel| match channel {
            PointChannel::Value(source) => source as &dyn Any,
            PointChannel::Timed(source) => source as &dyn Any,
        })
    }
}

/// In-memory entity catalog with explicit topology edges.
#[derive(Default)]
pub struct StaticCatalog {
    gateways: Vec<Rc<dyn Entity>>,
    beams: Vec<u32>,
    terminals: Vec<Rc<dyn Entity>>,
    users: Vec<Rc<dyn Entity>>,
    beam_of_terminal: HashMap<u32, u32>,
    gateway_of_beam: HashMap<u32, u32>,
    terminal_of_user: HashMap<u32, u32>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_gateway(&mut self, gateway: Rc<dyn Entity>) {
        self.gateways.push(gateway);
    }

    pub fn add_beam(&mut self, beam_id: u32, gateway_id: u32) {
        self.beams.push(beam_id);
        self.gateway_of_beam.insert(beam_id, gateway_id);
    }

    pub fn add_terminal(&mut self, terminal: Rc<dyn Entity>, beam_id: u32) {
        self.beam_of_terminal.insert(terminal.id(), beam_id);
        self.terminals.push(terminal);
    }

    pub fn add_user(&mut self, user: Rc<dyn Entity>, terminal_id: u32) {
        self.terminal_of_user.insert(user.id(), terminal_id);
        self.users.push(user);
    }
}

impl EntityCatalog for StaticCatalog {
    fn gateways(&self) -> Vec<Rc<dyn Entity>> {
        self.gateways.clone()
    }

    fn beams(&self) -> Vec<u32> {
        self.beams.clone()
    }

    fn terminals(&self) -> Vec<Rc<dyn Entity>> {
        self.terminals.clone()
    }

    fn terminal_users(&self) -> Vec<Rc<dyn Entity>> {
        self.users.clone()
    }

    fn beam_of_terminal(&self, terminal_id: u32) -> Option<u32> {
        self.beam_of_terminal.get(&terminal_id).copied()
    }

    fn gateway_of_beam(&self, beam_id: u32) -> Option<u32> {
        self.gateway_of_beam.get(&beam_id).copied()
    }

    fn terminal_of_user(&self, user_id: u32) -> Option<u32> {
        self.terminal_of_user.get(&user_id).copied()
    }
}
