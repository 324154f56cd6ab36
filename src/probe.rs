use std::any::Any;
use std::rc::Rc;

use tracing::debug;

use crate::catalog::Entity;
use crate::connect::{connect, Port};
use crate::registry::CollectorRegistry;
use crate::trace::{
    Instrumented, PayloadKind, TimedValue, TraceDescriptor, TraceSource,
};

/// Instrument kind descriptor: name, published outputs, constructor.
///
/// An explicit registration table rather than reflection: runtime checks are
/// confined to the by-name lookup, the payload type stays compile-time
/// checked inside each kind's constructor.
pub struct ProbeKind {
    pub name: &'static str,
    pub outputs: &'static [TraceDescriptor],
    build: fn(String) -> BuiltProbe,
}

/// All registered instrument kinds.
const PROBE_KINDS: &[ProbeKind] = &[
    ProbeKind {
        name: "value_forward",
        outputs: &[TraceDescriptor {
            name: "output",
            payload: PayloadKind::Value,
        }],
        build: build_value_forward,
    },
    ProbeKind {
        name: "timed_forward",
        outputs: &[TraceDescriptor {
            name: "output",
            payload: PayloadKind::TimedValue,
        }],
        build: build_timed_forward,
    },
];

impl ProbeKind {
    /// Resolves a kind by name.
    pub fn lookup(name: &str) -> Option<&'static ProbeKind> {
        PROBE_KINDS.iter().find(|kind| kind.name == name)
    }

    /// Whether this kind publishes an output named `name`.
    pub fn has_output(&self, name: &str) -> bool {
        self.outputs.iter().any(|descriptor| descriptor.name == name)
    }

    /// Constructs an unattached probe with the given display label.
    pub fn instantiate(&self, label: String) -> BuiltProbe {
        (self.build)(label)
    }
}

fn build_value_forward(label: String) -> BuiltProbe {
    build_forward::<f64>(label)
}

fn build_timed_forward(label: String) -> BuiltProbe {
    build_forward::<TimedValue>(label)
}

/// A probe that republishes an entity's observation point unchanged.
pub struct ForwardProbe<T: Copy + 'static> {
    label: String,
    output: TraceSource<T>,
}

impl<T: Copy + 'static> Instrumented for ForwardProbe<T> {
    fn display_name(&self) -> &str {
        &self.label
    }

    fn trace_source(&self, name: &str) -> Option<&dyn Any> {
        match name {
            "output" => Some(&self.output),
            _ => None,
        }
    }

    fn as_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// A constructed but not yet installed probe.
///
/// `attach` subscribes to the entity through a weak back-reference, so a
/// probe discarded after a failed installation step leaves no live side
/// effect on the entity.
pub struct BuiltProbe {
    handle: Rc<dyn Instrumented>,
    attach: Box<dyn Fn(&dyn Entity, &str) -> bool>,
}

fn build_forward<T: Copy + 'static>(label: String) -> BuiltProbe {
    let probe = Rc::new(ForwardProbe::<T> {
        label,
        output: TraceSource::new(),
    });
    let weak = Rc::downgrade(&probe);

    let attach = Box::new(move |entity: &dyn Entity, source_name: &str| -> bool {
        let Some(erased) = entity.observation_point(source_name) else {
            return false;
        };
        let Some(point) = erased.downcast_ref::<TraceSource<T>>() else {
            // The entity has the name but a different payload; an optional
            // observation point of another shape is an attach failure, not a
            // wiring bug.
            return false;
        };
        let weak = weak.clone();
        point.connect(Box::new(move |value| {
            if let Some(probe) = weak.upgrade() {
                probe.output.fire(value);
            }
        }));
        true
    });

    BuiltProbe {
        handle: probe,
        attach,
    }
}

/// An installed probe, owned by the helper that created it.
pub struct Probe {
    kind: &'static str,
    handle: Rc<dyn Instrumented>,
}

impl Probe {
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn label(&self) -> &str {
        self.handle.display_name()
    }
}

/// Creates a probe, attaches it to an entity and binds it to a collector.
///
/// Fatal preconditions (programming errors): `probe_kind` must be a
/// registered kind publishing `probe_output`, and `identifier` must already
/// be a key of `registry`.
///
/// Recoverable failures return `None` with nothing left behind: the entity
/// may legitimately lack the optional observation point `entity_source`, and
/// the probe-to-collector bind may fail on a missing named output.
#[allow(clippy::too_many_arguments)]
pub fn install_probe<C, T>(
    entity: &dyn Entity,
    entity_source: &str,
    probe_label: &str,
    probe_kind: &str,
    probe_output: &str,
    identifier: u32,
    registry: &CollectorRegistry,
    sink: fn(&C, T),
) -> Option<Probe>
where
    C: Instrumented,
    T: Copy + 'static,
{
    let kind = ProbeKind::lookup(probe_kind)
        .unwrap_or_else(|| panic!("unknown probe kind {probe_kind}"));
    assert!(
        kind.has_output(probe_output),
        "probe kind {probe_kind} has no output named {probe_output}"
    );
    let collector = registry
        .get(identifier)
        .unwrap_or_else(|| panic!("no collector for identifier {identifier}"));

    let built = kind.instantiate(probe_label.to_string());

    // Bind probe to collector before touching the entity; a failure here
    // discards the probe without the entity ever seeing it.
    if !connect(
        Port::Single(&built.handle),
        probe_output,
        Port::Single(collector),
        sink,
    ) {
        debug!(
            probe = probe_label,
            collector = collector.display_name(),
            "probe-to-collector bind failed, probe not installed"
        );
        return None;
    }

    if !(built.attach)(entity, entity_source) {
        debug!(
            probe = probe_label,
            entity = entity.id(),
            source = entity_source,
            "entity lacks observation point, probe not installed"
        );
        return None;
    }

    Some(Probe {
        kind: kind.name,
        handle: built.handle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SimEntity;
    use crate::collector::{CollectorKind, ScalarCollector};

    fn registry_with_scalar(identifier: u32) -> CollectorRegistry {
        let mut registry = CollectorRegistry::new();
        registry.insert(
            identifier,
            CollectorKind::Scalar.build(format!("scalar-{identifier}"), identifier),
        );
        registry
    }

    #[test]
    fn test_kind_lookup() {
        assert!(ProbeKind::lookup("value_forward").is_some());
        assert!(ProbeKind::lookup("timed_forward").is_some());
        assert!(ProbeKind::lookup("packet_trace").is_none());
        assert!(ProbeKind::lookup("value_forward")
            .expect("registered")
            .has_output("output"));
    }

    #[test]
    fn test_install_and_forward() {
        let entity = SimEntity::new(100).with_value_point("bytes_sent");
        let registry = registry_with_scalar(7);

        let probe = install_probe(
            &entity,
            "bytes_sent",
            "bytes-probe",
            "value_forward",
            "output",
            7,
            &registry,
            ScalarCollector::record,
        );
        let probe = probe.expect("probe installed");
        assert_eq!(probe.kind(), "value_forward");
        assert_eq!(probe.label(), "bytes-probe");

        entity.emit_value("bytes_sent", 1200.0);
        entity.emit_value("bytes_sent", 300.0);

        let collector = Rc::clone(registry.get(7).expect("collector"))
            .as_any_rc()
            .downcast::<ScalarCollector>()
            .expect("scalar kind");
        assert_eq!(collector.sum(), 1500.0);
        assert_eq!(collector.count(), 2);
    }

    #[test]
    fn test_missing_observation_point_returns_none() {
        let entity = SimEntity::new(100).with_value_point("bytes_sent");
        let registry = registry_with_scalar(7);

        let probe = install_probe(
            &entity,
            "bytes_received",
            "rx-probe",
            "value_forward",
            "output",
            7,
            &registry,
            ScalarCollector::record,
        );
        assert!(probe.is_none());
    }

    #[test]
    fn test_payload_mismatch_at_entity_returns_none() {
        // Entity point carries TimedValue, probe kind expects bare f64.
        let entity = SimEntity::new(100).with_timed_point("delay");
        let registry = registry_with_scalar(7);

        let probe = install_probe(
            &entity,
            "delay",
            "delay-probe",
            "value_forward",
            "output",
            7,
            &registry,
            ScalarCollector::record,
        );
        assert!(probe.is_none());
    }

    #[test]
    #[should_panic(expected = "no collector for identifier 9")]
    fn test_missing_identifier_is_fatal() {
        let entity = SimEntity::new(100).with_value_point("bytes_sent");
        let registry = registry_with_scalar(7);

        install_probe(
            &entity,
            "bytes_sent",
            "bytes-probe",
            "value_forward",
            "output",
            9,
            &registry,
            ScalarCollector::record,
        );
    }

    #[test]
    #[should_panic(expected = "has no output named samples")]
    fn test_undeclared_probe_output_is_fatal() {
        let entity = SimEntity::new(100).with_value_point("bytes_sent");
        let registry = registry_with_scalar(7);

        install_probe(
            &entity,
            "bytes_sent",
            "bytes-probe",
            "value_forward",
            "samples",
            7,
            &registry,
            ScalarCollector::record,
        );
    }

    #[test]
    fn test_dropped_probe_leaves_no_live_subscription() {
        let entity = SimEntity::new(100).with_timed_point("delay");
        let registry = registry_with_scalar(7);

        let probe = install_probe(
            &entity,
            "delay",
            "delay-probe",
            "timed_forward",
            "output",
            7,
            &registry,
            ScalarCollector::record_timed,
        );
        assert!(probe.is_some());
        drop(probe);

        // The weak back-reference is dead; emitting must not reach the
        // collector.
        entity.emit_timed(
            "delay",
            TimedValue {
                time: 1.0,
                value: 5.0,
            },
        );

        let collector = Rc::clone(registry.get(7).expect("collector"))
            .as_any_rc()
            .downcast::<ScalarCollector>()
            .expect("scalar kind");
        assert_eq!(collector.count(), 0);
    }
}
