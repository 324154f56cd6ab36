use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::debug;

use crate::output::{OutputShape, OutputSink, OutputType};
use crate::trace::{Instrumented, KeyedSample, KeyedValue, PayloadKind, TraceDescriptor};

/// Rendering collaborator behind the terminal aggregator.
///
/// File and plot backends live outside this crate; the aggregator hands them
/// finished rows tagged with the active output shape. The in-core default is
/// [`BufferBackend`].
pub trait RenderBackend: 'static {
    fn write_value(&self, shape: OutputShape, row: KeyedValue);
    fn write_sample(&self, shape: OutputShape, row: KeyedSample);
}

/// In-memory backend recording every row it receives.
#[derive(Default)]
pub struct BufferBackend {
    values: RefCell<Vec<(OutputShape, KeyedValue)>>,
    samples: RefCell<Vec<(OutputShape, KeyedSample)>>,
}

impl BufferBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> Vec<(OutputShape, KeyedValue)> {
        self.values.borrow().clone()
    }

    pub fn samples(&self) -> Vec<(OutputShape, KeyedSample)> {
        self.samples.borrow().clone()
    }

    pub fn row_count(&self) -> usize {
        self.values.borrow().len() + self.samples.borrow().len()
    }
}

impl RenderBackend for BufferBackend {
    fn write_value(&self, shape: OutputShape, row: KeyedValue) {
        self.values.borrow_mut().push((shape, row));
    }

    fn write_sample(&self, shape: OutputShape, row: KeyedSample) {
        self.samples.borrow_mut().push((shape, row));
    }
}

/// Discards every row while keeping the wiring surface intact, so downstream
/// code never needs a null check.
pub struct NullAggregator {
    name: String,
    rows: Cell<u64>,
}

/// Forwards rows to a file-rendering backend, tagged with the active shape.
pub struct FileAggregator {
    name: String,
    shape: OutputShape,
    backend: Rc<dyn RenderBackend>,
    rows: Cell<u64>,
}

/// Forwards rows to a plot-rendering backend, tagged with the active shape.
pub struct PlotAggregator {
    name: String,
    shape: OutputShape,
    backend: Rc<dyn RenderBackend>,
    rows: Cell<u64>,
}

/// The single terminal sink of a statistics installation.
///
/// Enum dispatch over the sink classes rather than a trait object: the set
/// of kinds is closed and the write path stays a direct call.
pub enum Aggregator {
    Null(NullAggregator),
    File(FileAggregator),
    Plot(PlotAggregator),
}

const WRITE_SINKS: &[TraceDescriptor] = &[
    TraceDescriptor {
        name: "write_value",
        payload: PayloadKind::KeyedValue,
    },
    TraceDescriptor {
        name: "write_sample",
        payload: PayloadKind::KeyedSample,
    },
];

impl Aggregator {
    /// Builds the aggregator matching `output`'s shape and sink class.
    pub fn for_output(output: OutputType, name: &str, backend: Rc<dyn RenderBackend>) -> Self {
        match output.sink() {
            OutputSink::None => Self::Null(NullAggregator {
                name: name.to_string(),
                rows: Cell::new(0),
            }),
            OutputSink::File => Self::File(FileAggregator {
                name: name.to_string(),
                shape: output.shape(),
                backend,
                rows: Cell::new(0),
            }),
            OutputSink::Plot => Self::Plot(PlotAggregator {
                name: name.to_string(),
                shape: output.shape(),
                backend,
                rows: Cell::new(0),
            }),
        }
    }

    /// Accepts a keyed value row (accumulator collectors feed this).
    pub fn write_value(&self, row: KeyedValue) {
        match self {
            Self::Null(a) => a.rows.set(a.rows.get() + 1),
            Self::File(a) => {
                a.rows.set(a.rows.get() + 1);
                a.backend.write_value(a.shape, row);
            }
            Self::Plot(a) => {
                a.rows.set(a.rows.get() + 1);
                a.backend.write_value(a.shape, row);
            }
        }
        debug!(aggregator = self.display_name(), identifier = row.identifier, value = row.value, "value row");
    }

    /// Accepts a keyed (x, y) row (passthrough collectors feed this).
    pub fn write_sample(&self, row: KeyedSample) {
        match self {
            Self::Null(a) => a.rows.set(a.rows.get() + 1),
            Self::File(a) => {
                a.rows.set(a.rows.get() + 1);
                a.backend.write_sample(a.shape, row);
            }
            Self::Plot(a) => {
                a.rows.set(a.rows.get() + 1);
                a.backend.write_sample(a.shape, row);
            }
        }
    }

    /// Returns the kind label for logging.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null(_) => "null",
            Self::File(_) => "file",
            Self::Plot(_) => "plot",
        }
    }

    /// The data shape rows are tagged with.
    pub fn shape(&self) -> OutputShape {
        match self {
            Self::Null(_) => OutputShape::None,
            Self::File(a) => a.shape,
            Self::Plot(a) => a.shape,
        }
    }

    /// Total rows accepted since construction.
    pub fn rows_written(&self) -> u64 {
        match self {
            Self::Null(a) => a.rows.get(),
            Self::File(a) => a.rows.get(),
            Self::Plot(a) => a.rows.get(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }
}

impl Instrumented for Aggregator {
    fn display_name(&self) -> &str {
        match self {
            Self::Null(a) => &a.name,
            Self::File(a) => &a.name,
            Self::Plot(a) => &a.name,
        }
    }

    fn trace_source(&self, _name: &str) -> Option<&dyn Any> {
        None // terminal sink, no outputs
    }

    fn sink_descriptors(&self) -> &'static [TraceDescriptor] {
        WRITE_SINKS
    }

    fn as_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_selects_kind_by_sink_class() {
        let backend = Rc::new(BufferBackend::new());

        let null = Aggregator::for_output(OutputType::None, "s", Rc::clone(&backend) as _);
        let file = Aggregator::for_output(OutputType::ScalarFile, "s", Rc::clone(&backend) as _);
        let plot = Aggregator::for_output(OutputType::CdfPlot, "s", Rc::clone(&backend) as _);

        assert!(null.is_null());
        assert_eq!(null.kind_name(), "null");
        assert_eq!(file.kind_name(), "file");
        assert_eq!(file.shape(), OutputShape::Scalar);
        assert_eq!(plot.kind_name(), "plot");
        assert_eq!(plot.shape(), OutputShape::Cdf);
    }

    #[test]
    fn test_file_aggregator_forwards_rows() {
        let backend = Rc::new(BufferBackend::new());
        let agg = Aggregator::for_output(
            OutputType::ScatterFile,
            "delay",
            Rc::clone(&backend) as Rc<dyn RenderBackend>,
        );

        agg.write_sample(KeyedSample {
            identifier: 1,
            x: 0.5,
            y: 2.0,
        });
        agg.write_value(KeyedValue {
            identifier: 1,
            value: 2.0,
        });

        assert_eq!(agg.rows_written(), 2);
        assert_eq!(backend.samples().len(), 1);
        assert_eq!(backend.values().len(), 1);
        assert_eq!(backend.samples()[0].0, OutputShape::Scatter);
    }

    #[test]
    fn test_null_aggregator_discards_but_counts() {
        let backend = Rc::new(BufferBackend::new());
        let agg = Aggregator::for_output(
            OutputType::None,
            "s",
            Rc::clone(&backend) as Rc<dyn RenderBackend>,
        );

        agg.write_value(KeyedValue {
            identifier: 0,
            value: 1.0,
        });

        assert_eq!(agg.rows_written(), 1);
        assert_eq!(backend.row_count(), 0);
    }

    #[test]
    fn test_aggregator_has_no_outputs() {
        let backend: Rc<dyn RenderBackend> = Rc::new(BufferBackend::new());
        let agg = Aggregator::for_output(OutputType::ScalarFile, "s", backend);
        assert!(agg.trace_source("total").is_none());
        assert_eq!(agg.sink_descriptors().len(), 2);
    }
}
