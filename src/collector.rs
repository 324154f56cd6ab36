use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::trace::{
    Instrumented, KeyedSample, KeyedValue, PayloadKind, TimedValue, TraceDescriptor, TraceSource,
};

/// Collector kind, constructible by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorKind {
    /// Accumulates a running sum and count; emits the sum on flush.
    Scalar,
    /// Counts occurrences regardless of value; emits the count on flush.
    Counter,
    /// Forwards every sample immediately, tagged with its identifier.
    Passthrough,
    /// Retains the most recent value; emits it on flush.
    LastValue,
}

impl CollectorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Counter => "counter",
            Self::Passthrough => "passthrough",
            Self::LastValue => "last_value",
        }
    }

    pub fn from_str(name: &str) -> Option<Self> {
        match name {
            "scalar" => Some(Self::Scalar),
            "counter" => Some(Self::Counter),
            "passthrough" => Some(Self::Passthrough),
            "last_value" => Some(Self::LastValue),
            _ => None,
        }
    }

    /// Builds a collector of this kind for one identifier group.
    pub fn build(self, display_name: String, identifier: u32) -> Rc<dyn Instrumented> {
        match self {
            Self::Scalar => Rc::new(ScalarCollector::new(display_name, identifier)),
            Self::Counter => Rc::new(CounterCollector::new(display_name, identifier)),
            Self::Passthrough => Rc::new(PassthroughCollector::new(display_name, identifier)),
            Self::LastValue => Rc::new(LastValueCollector::new(display_name, identifier)),
        }
    }
}

impl fmt::Display for CollectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const TOTAL_OUTPUT: &[TraceDescriptor] = &[TraceDescriptor {
    name: "total",
    payload: PayloadKind::KeyedValue,
}];

const SAMPLE_OUTPUT: &[TraceDescriptor] = &[TraceDescriptor {
    name: "sample",
    payload: PayloadKind::KeyedSample,
}];

const VALUE_SINKS: &[TraceDescriptor] = &[
    TraceDescriptor {
        name: "record",
        payload: PayloadKind::Value,
    },
    TraceDescriptor {
        name: "record_timed",
        payload: PayloadKind::TimedValue,
    },
];

const SCALAR_SINKS: &[TraceDescriptor] = &[
    TraceDescriptor {
        name: "record",
        payload: PayloadKind::Value,
    },
    TraceDescriptor {
        name: "record_timed",
        payload: PayloadKind::TimedValue,
    },
    TraceDescriptor {
        name: "record_sample",
        payload: PayloadKind::KeyedSample,
    },
];

/// Sums recorded values for one identifier group.
pub struct ScalarCollector {
    name: String,
    identifier: u32,
    sum: Cell<f64>,
    count: Cell<u64>,
    total: TraceSource<KeyedValue>,
}

impl ScalarCollector {
    pub fn new(name: String, identifier: u32) -> Self {
        Self {
            name,
            identifier,
            sum: Cell::new(0.0),
            count: Cell::new(0),
            total: TraceSource::new(),
        }
    }

    pub fn record(&self, value: f64) {
        self.sum.set(self.sum.get() + value);
        self.count.set(self.count.get() + 1);
    }

    pub fn record_timed(&self, sample: TimedValue) {
        self.record(sample.value);
    }

    /// Accepts an upstream collector's keyed sample, accumulating its y value.
    pub fn record_sample(&self, sample: KeyedSample) {
        self.record(sample.y);
    }

    pub fn sum(&self) -> f64 {
        self.sum.get()
    }

    pub fn count(&self) -> u64 {
        self.count.get()
    }
}

impl Instrumented for ScalarCollector {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn trace_source(&self, name: &str) -> Option<&dyn Any> {
        match name {
            "total" => Some(&self.total),
            _ => None,
        }
    }

    fn trace_descriptors(&self) -> &'static [TraceDescriptor] {
        TOTAL_OUTPUT
    }

    fn sink_descriptors(&self) -> &'static [TraceDescriptor] {
        SCALAR_SINKS
    }

    fn flush(&self) {
        self.total.fire(KeyedValue {
            identifier: self.identifier,
            value: self.sum.get(),
        });
    }

    fn as_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// Counts recorded occurrences for one identifier group.
pub struct CounterCollector {
    name: String,
    identifier: u32,
    count: Cell<u64>,
    total: TraceSource<KeyedValue>,
}

impl CounterCollector {
    pub fn new(name: String, identifier: u32) -> Self {
        Self {
            name,
            identifier,
            count: Cell::new(0),
            total: TraceSource::new(),
        }
    }

    pub fn record(&self, _value: f64) {
        self.count.set(self.count.get() + 1);
    }

    pub fn record_timed(&self, _sample: TimedValue) {
        self.count.set(self.count.get() + 1);
    }

    pub fn count(&self) -> u64 {
        self.count.get()
    }
}

impl Instrumented for CounterCollector {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn trace_source(&self, name: &str) -> Option<&dyn Any> {
        match name {
            "total" => Some(&self.total),
            _ => None,
        }
    }

    fn trace_descriptors(&self) -> &'static [TraceDescriptor] {
        TOTAL_OUTPUT
    }

    fn sink_descriptors(&self) -> &'static [TraceDescriptor] {
        VALUE_SINKS
    }

    fn flush(&self) {
        self.total.fire(KeyedValue {
            identifier: self.identifier,
            value: self.count.get() as f64,
        });
    }

    fn as_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// Forwards each sample as it arrives, tagged with its identifier group.
///
/// Untimed values are assigned a monotonically increasing sequence index as
/// their x coordinate.
pub struct PassthroughCollector {
    name: String,
    identifier: u32,
    sequence: Cell<u64>,
    sample: TraceSource<KeyedSample>,
}

impl PassthroughCollector {
    pub fn new(name: String, identifier: u32) -> Self {
        Self {
            name,
            identifier,
            sequence: Cell::new(0),
            sample: TraceSource::new(),
        }
    }

    pub fn record(&self, value: f64) {
        let index = self.sequence.get();
        self.sequence.set(index + 1);
        self.sample.fire(KeyedSample {
            identifier: self.identifier,
            x: index as f64,
            y: value,
        });
    }

    pub fn record_timed(&self, sample: TimedValue) {
        self.sample.fire(KeyedSample {
            identifier: self.identifier,
            x: sample.time,
            y: sample.value,
        });
    }

    pub fn forwarded(&self) -> u64 {
        self.sequence.get()
    }
}

impl Instrumented for PassthroughCollector {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn trace_source(&self, name: &str) -> Option<&dyn Any> {
        match name {
            "sample" => Some(&self.sample),
            _ => None,
        }
    }

    fn trace_descriptors(&self) -> &'static [TraceDescriptor] {
        SAMPLE_OUTPUT
    }

    fn sink_descriptors(&self) -> &'static [TraceDescriptor] {
        VALUE_SINKS
    }

    fn as_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// Retains the latest recorded value for one identifier group.
pub struct LastValueCollector {
    name: String,
    identifier: u32,
    last: Cell<f64>,
    seen: Cell<bool>,
    total: TraceSource<KeyedValue>,
}

impl LastValueCollector {
    pub fn new(name: String, identifier: u32) -> Self {
        Self {
            name,
            identifier,
            last: Cell::new(0.0),
            seen: Cell::new(false),
            total: TraceSource::new(),
        }
    }

    pub fn record(&self, value: f64) {
        self.last.set(value);
        self.seen.set(true);
    }

    pub fn record_timed(&self, sample: TimedValue) {
        self.record(sample.value);
    }

    pub fn last(&self) -> Option<f64> {
        self.seen.get().then(|| self.last.get())
    }
}

impl Instrumented for LastValueCollector {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn trace_source(&self, name: &str) -> Option<&dyn Any> {
        match name {
            "total" => Some(&self.total),
            _ => None,
        }
    }

    fn trace_descriptors(&self) -> &'static [TraceDescriptor] {
        TOTAL_OUTPUT
    }

    fn sink_descriptors(&self) -> &'static [TraceDescriptor] {
        VALUE_SINKS
    }

    fn flush(&self) {
        if self.seen.get() {
            self.total.fire(KeyedValue {
                identifier: self.identifier,
                value: self.last.get(),
            });
        }
    }

    fn as_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
