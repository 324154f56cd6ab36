use std::any::Any;
use std::cell::RefCell;
use std::fmt;

/// A named, typed emission channel.
///
/// Components publish one `TraceSource` per named output; the connector
/// subscribes callbacks at wiring time and `fire` delivers a value to every
/// subscriber in connection order. Wiring happens only during installation,
/// delivery happens on the host's single event-dispatch thread, so plain
/// `RefCell` interior suffices.
pub struct TraceSource<T: Copy + 'static> {
    subscribers: RefCell<Vec<Box<dyn Fn(T)>>>,
}

impl<T: Copy + 'static> TraceSource<T> {
    /// Creates a source with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: RefCell::new(Vec::new()),
        }
    }

    /// Appends a subscriber callback.
    pub fn connect(&self, callback: Box<dyn Fn(T)>) {
        self.subscribers.borrow_mut().push(callback);
    }

    /// Delivers a value to all subscribers.
    pub fn fire(&self, value: T) {
        for callback in self.subscribers.borrow().iter() {
            callback(value);
        }
    }

    /// Number of established bindings.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

impl<T: Copy + 'static> Default for TraceSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + 'static> fmt::Debug for TraceSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceSource")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// An observed value paired with the time it was observed at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedValue {
    pub time: f64,
    pub value: f64,
}

/// A single accumulated value tagged with the identifier it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyedValue {
    pub identifier: u32,
    pub value: f64,
}

/// An (x, y) sample tagged with the identifier it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyedSample {
    pub identifier: u32,
    pub x: f64,
    pub y: f64,
}

/// Payload type flowing through a named output or input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// A bare `f64`.
    Value,
    /// A [`TimedValue`] pair.
    TimedValue,
    /// A [`KeyedValue`] pair.
    KeyedValue,
    /// A [`KeyedSample`].
    KeyedSample,
}

impl PayloadKind {
    /// Returns the canonical label used in capability tables and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::TimedValue => "timed_value",
            Self::KeyedValue => "keyed_value",
            Self::KeyedSample => "keyed_sample",
        }
    }

    /// Number of values carried (identifier tags excluded).
    pub const fn arity(self) -> usize {
        match self {
            Self::Value | Self::KeyedValue => 1,
            Self::TimedValue | Self::KeyedSample => 2,
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability-table entry: one named output (or input) and its payload.
#[derive(Debug, Clone, Copy)]
pub struct TraceDescriptor {
    pub name: &'static str,
    pub payload: PayloadKind,
}

/// A wirable component: exposes named, typed outputs and declared inputs.
///
/// Collectors, aggregators and probes all implement this; the connector
/// resolves outputs by name through `trace_source` and downcasts receivers
/// through `as_any_rc`.
pub trait Instrumented: 'static {
    /// Display label used in logs and output naming.
    fn display_name(&self) -> &str;

    /// Resolves a named output to its type-erased [`TraceSource`].
    fn trace_source(&self, name: &str) -> Option<&dyn Any>;

    /// Queryable table of named outputs.
    fn trace_descriptors(&self) -> &'static [TraceDescriptor] {
        &[]
    }

    /// Queryable table of named inputs (sink methods).
    fn sink_descriptors(&self) -> &'static [TraceDescriptor] {
        &[]
    }

    /// Emits any pending accumulated state on the component's outputs.
    fn flush(&self) {}

    /// Upcast for receiver-side downcasting at bind time.
    fn as_any_rc(self: std::rc::Rc<Self>) -> std::rc::Rc<dyn Any>;
}
