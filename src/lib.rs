//! Fan-out statistics topology builder.
//!
//! Given a catalog of runtime entities grouped by a hierarchical identifier
//! scheme, this crate builds one collector per identifier value, attaches
//! probes to the entities' named observation points, and routes everything
//! into a single terminal aggregator selected by output mode. The number of
//! collectors and the payload types on each edge are only known at runtime;
//! the `connect` wiring primitive defers exactly the *existence* checks to
//! runtime while the payload types stay compile-time checked.
//!
//! The typical flow: configure a [`helper::StatsHelper`] with an identifier
//! level and output mode, then `install` a [`helper::StatsFamily`] that
//! creates its collectors and probes. Installation is single-threaded,
//! synchronous, and happens exactly once per helper.

pub mod aggregator;
pub mod catalog;
pub mod collector;
pub mod config;
pub mod connect;
pub mod helper;
pub mod ident;
pub mod output;
pub mod probe;
pub mod registry;
pub mod trace;

pub use aggregator::{Aggregator, BufferBackend, RenderBackend};
pub use catalog::{Entity, EntityCatalog, SimEntity, StaticCatalog};
pub use collector::CollectorKind;
pub use config::{Config, StatsConfig};
pub use connect::{check_same_keys, connect, KeyMismatch, Port};
pub use helper::{FnStatsFamily, InstallContext, StatsFamily, StatsHelper};
pub use ident::{identifier_set, DefaultScheme, IdentifierLevel, IdentifierScheme};
pub use output::{OutputShape, OutputSink, OutputType};
pub use probe::{install_probe, Probe, ProbeKind};
pub use registry::CollectorRegistry;
pub use trace::{
    Instrumented, KeyedSample, KeyedValue, PayloadKind, TimedValue, TraceDescriptor, TraceSource,
};
