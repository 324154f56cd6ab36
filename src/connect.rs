//! Generic wiring primitive.
//!
//! One `connect` call binds an emitter's named output to a receiver's sink
//! method, over any of four cardinalities: registry-to-registry,
//! registry-to-single, single-to-registry and single-to-single. Payload types
//! stay compile-time checked through the sink's signature; only the
//! *existence* of the named output is deferred to runtime.

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::registry::CollectorRegistry;
use crate::trace::{Instrumented, TraceSource};

/// One side of a connection: a single instance or a whole registry.
#[derive(Clone, Copy)]
pub enum Port<'a> {
    Single(&'a Rc<dyn Instrumented>),
    Map(&'a CollectorRegistry),
}

impl<'a> From<&'a Rc<dyn Instrumented>> for Port<'a> {
    fn from(single: &'a Rc<dyn Instrumented>) -> Self {
        Self::Single(single)
    }
}

impl<'a> From<&'a CollectorRegistry> for Port<'a> {
    fn from(map: &'a CollectorRegistry) -> Self {
        Self::Map(map)
    }
}

/// Key-set disagreement between two registries being wired pairwise.
#[derive(Debug, PartialEq, Eq)]
pub enum KeyMismatch {
    Size { source: usize, target: usize },
    MissingKey { identifier: u32 },
}

impl fmt::Display for KeyMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMismatch::Size { source, target } => write!(
                f,
                "registry size mismatch: {source} source vs {target} target collectors"
            ),
            KeyMismatch::MissingKey { identifier } => {
                write!(f, "no target collector for identifier {identifier}")
            }
        }
    }
}

impl std::error::Error for KeyMismatch {}

/// Checks that every source identifier has a same-keyed target entry.
///
/// This is the recoverable-mode form of the map-to-map precondition; the
/// connector turns a failure into a fatal panic, callers that want to probe
/// compatibility first use this directly.
pub fn check_same_keys(
    source: &CollectorRegistry,
    target: &CollectorRegistry,
) -> Result<(), KeyMismatch> {
    if source.len() != target.len() {
        return Err(KeyMismatch::Size {
            source: source.len(),
            target: target.len(),
        });
    }
    for identifier in source.keys() {
        if !target.contains(identifier) {
            return Err(KeyMismatch::MissingKey { identifier });
        }
    }
    Ok(())
}

/// Binds `source`'s output named `output` to `sink` on `target`.
///
/// Cardinality rules:
/// - map to map: key sets must match exactly (fatal otherwise); entries are
///   bound pairwise by identifier.
/// - map to single / single to map: the single side is broadcast across
///   every entry of the map side.
/// - single to single: the target is downcast to the declared receiver kind
///   `C` (fatal on kind mismatch) and the bind is established.
///
/// Returns `false` as soon as any pairwise bind fails because the named
/// output is absent on that particular source instance; binds already
/// established are not rolled back. A missing output is recoverable; a
/// payload-type mismatch on a present output is not, and panics.
pub fn connect<'a, C, T>(
    source: impl Into<Port<'a>>,
    output: &str,
    target: impl Into<Port<'a>>,
    sink: fn(&C, T),
) -> bool
where
    C: Instrumented,
    T: Copy + 'static,
{
    match (source.into(), target.into()) {
        (Port::Single(source), Port::Single(target)) => connect_pair(source, output, target, sink),
        (Port::Map(sources), Port::Map(targets)) => {
            if let Err(mismatch) = check_same_keys(sources, targets) {
                panic!("map-to-map connection: {mismatch}");
            }
            for (identifier, source) in sources.iter() {
                let target = targets
                    .get(identifier)
                    .expect("key checked against target registry");
                if !connect_pair(source, output, target, sink) {
                    return false;
                }
            }
            true
        }
        (Port::Map(sources), Port::Single(target)) => {
            for (_, source) in sources.iter() {
                if !connect_pair(source, output, target, sink) {
                    return false;
                }
            }
            true
        }
        (Port::Single(source), Port::Map(targets)) => {
            for (_, target) in targets.iter() {
                if !connect_pair(source, output, target, sink) {
                    return false;
                }
            }
            true
        }
    }
}

/// The single-pair primitive every cardinality reduces to.
fn connect_pair<C, T>(
    source: &Rc<dyn Instrumented>,
    output: &str,
    target: &Rc<dyn Instrumented>,
    sink: fn(&C, T),
) -> bool
where
    C: Instrumented,
    T: Copy + 'static,
{
    let receiver = match Rc::clone(target).as_any_rc().downcast::<C>() {
        Ok(receiver) => receiver,
        Err(_) => panic!(
            "receiver {} is not of the kind declared by the sink binding",
            target.display_name()
        ),
    };

    let Some(erased) = source.trace_source(output) else {
        debug!(
            source = source.display_name(),
            output, "named output not present on this instance, bind skipped"
        );
        return false;
    };
    let Some(trace) = erased.downcast_ref::<TraceSource<T>>() else {
        panic!(
            "output {}::{output} does not carry the payload type expected by the sink",
            source.display_name()
        );
    };

    trace.connect(Box::new(move |value| sink(&receiver, value)));
    true
}
