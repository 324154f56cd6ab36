use std::fmt;

use serde::Deserialize;

/// Rendering/persistence mode for a statistic.
///
/// Selects both the terminal aggregator's shape (scalar, scatter,
/// distribution) and its sink (file vs. plot). `None` disables output while
/// keeping the wiring valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Default)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    #[default]
    None = 0,
    ScalarFile = 1,
    ScatterFile = 2,
    HistogramFile = 3,
    PdfFile = 4,
    CdfFile = 5,
    ScalarPlot = 6,
    ScatterPlot = 7,
    HistogramPlot = 8,
    PdfPlot = 9,
    CdfPlot = 10,
}

/// All output modes, in discriminant order.
pub const ALL_OUTPUT_TYPES: &[OutputType] = &[
    OutputType::None,
    OutputType::ScalarFile,
    OutputType::ScatterFile,
    OutputType::HistogramFile,
    OutputType::PdfFile,
    OutputType::CdfFile,
    OutputType::ScalarPlot,
    OutputType::ScatterPlot,
    OutputType::HistogramPlot,
    OutputType::PdfPlot,
    OutputType::CdfPlot,
];

/// The data shape an output mode implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    None,
    Scalar,
    Scatter,
    Histogram,
    Pdf,
    Cdf,
}

/// The sink class an output mode implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSink {
    None,
    File,
    Plot,
}

impl OutputType {
    /// Returns the canonical label used in logs, reports and config files.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ScalarFile => "scalar_file",
            Self::ScatterFile => "scatter_file",
            Self::HistogramFile => "histogram_file",
            Self::PdfFile => "pdf_file",
            Self::CdfFile => "cdf_file",
            Self::ScalarPlot => "scalar_plot",
            Self::ScatterPlot => "scatter_plot",
            Self::HistogramPlot => "histogram_plot",
            Self::PdfPlot => "pdf_plot",
            Self::CdfPlot => "cdf_plot",
        }
    }

    /// Converts a raw `u8` discriminant back to a mode.
    pub fn from_u8(v: u8) -> Option<Self> {
        ALL_OUTPUT_TYPES.get(usize::from(v)).copied()
    }

    /// Converts a canonical label back to a mode.
    pub fn from_str(name: &str) -> Option<Self> {
        ALL_OUTPUT_TYPES
            .iter()
            .copied()
            .find(|mode| mode.as_str() == name)
    }

    /// The data shape this mode renders.
    pub const fn shape(self) -> OutputShape {
        match self {
            Self::None => OutputShape::None,
            Self::ScalarFile | Self::ScalarPlot => OutputShape::Scalar,
            Self::ScatterFile | Self::ScatterPlot => OutputShape::Scatter,
            Self::HistogramFile | Self::HistogramPlot => OutputShape::Histogram,
            Self::PdfFile | Self::PdfPlot => OutputShape::Pdf,
            Self::CdfFile | Self::CdfPlot => OutputShape::Cdf,
        }
    }

    /// The sink class this mode writes to.
    pub const fn sink(self) -> OutputSink {
        match self {
            Self::None => OutputSink::None,
            Self::ScalarFile
            | Self::ScatterFile
            | Self::HistogramFile
            | Self::PdfFile
            | Self::CdfFile => OutputSink::File,
            Self::ScalarPlot
            | Self::ScatterPlot
            | Self::HistogramPlot
            | Self::PdfPlot
            | Self::CdfPlot => OutputSink::Plot,
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OutputShape {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Scalar => "scalar",
            Self::Scatter => "scatter",
            Self::Histogram => "histogram",
            Self::Pdf => "pdf",
            Self::Cdf => "cdf",
        }
    }
}

impl OutputSink {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::File => "file",
            Self::Plot => "plot",
        }
    }
}
