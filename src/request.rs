//! One plotting request: datasets and formulas in, a figure (or an error) out.

use super::*;
use chart::{Color, Figure, RenderStyle, Series};
use data::{ReadError, Table};
use dataset::{AxisTitles, Normalized, SkipReason};
use expr::{InvalidExpression, SampleDomain};

/// The only accepted spreadsheet extension.
pub const XLSX_EXT: &str = ".xlsx";

/// Limits and presentation of a [`Mode`].
#[derive(Debug)]
pub struct Profile {
    pub max_datasets: usize,
    pub max_formulas: usize,
    pub dataset_palette: &'static [Color],
    pub formula_palette: &'static [Color],
    /// Whether datasets honour [`Upload::connect`].
    pub connectable: bool,
    pub default_title: &'static str,
    pub legend_title: &'static str,
    no_input: &'static str,
}

pub const OVERLAY: Profile = Profile {
    max_datasets: 5,
    max_formulas: 0,
    dataset_palette: &[Color::Blue, Color::Red, Color::Green, Color::Black, Color::Gray],
    formula_palette: &[],
    connectable: true,
    default_title: "Plot of uploaded files",
    legend_title: "Files",
    no_input: "supply at least one .xlsx file",
};

pub const ANALYTICAL: Profile = Profile {
    max_datasets: 3,
    max_formulas: 2,
    dataset_palette: &[Color::Green, Color::Gray, Color::Black],
    formula_palette: &[Color::Blue, Color::Red],
    connectable: false,
    default_title: "Analytical analysis",
    legend_title: "Data and functions",
    no_input: "supply .xlsx files or at least one formula",
};

impl Mode {
    pub fn profile(self) -> &'static Profile {
        match self {
            Mode::Overlay => &OVERLAY,
            Mode::Analytical => &ANALYTICAL,
        }
    }

    fn dataset_label(self, idx: usize, name: &str) -> String {
        match self {
            Mode::Overlay => name.to_string(),
            Mode::Analytical => format!("File {}: {name}", idx + 1),
        }
    }
}

/// A spreadsheet submitted for plotting.
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    /// File name, without directories. Used for the extension check and the series label.
    pub name: String,
    pub path: PathBuf,
    /// Draw the points joined by lines.
    pub connect: bool,
}

impl Upload {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self {
            name,
            path,
            connect: false,
        }
    }

    pub fn connect(mut self, connect: bool) -> Self {
        self.connect = connect;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Request {
    pub mode: Mode,
    /// Datasets in submission order.
    pub uploads: Vec<Upload>,
    /// Formulas in submission order. Blank formulas are ignored.
    pub formulas: Vec<String>,
    /// Blank for the mode's default title.
    pub title: String,
}

/// A per-input failure. The input is left out of the chart, the rest are still plotted.
#[derive(Debug, Error, Diagnostic)]
pub enum Issue {
    #[error("file '{file}' skipped: {reason}")]
    Skipped { file: String, reason: SkipReason },

    #[error("file '{file}' could not be read: {source}")]
    Unreadable {
        file: String,
        #[diagnostic_source]
        source: ReadError,
    },

    #[error("function {index} skipped: {source}")]
    Formula {
        /// 1-based position of the formula.
        index: usize,
        #[diagnostic_source]
        source: InvalidExpression,
    },
}

/// A failure which leaves nothing to plot.
#[derive(Debug, Error, Diagnostic)]
pub enum PlotError {
    #[error("'{0}' is not an .xlsx file")]
    #[diagnostic(
        code(chartme::unsupported_file_type),
        help("all files must have the .xlsx extension")
    )]
    UnsupportedFileType(String),

    #[error("no input provided, {0}")]
    #[diagnostic(code(chartme::no_input))]
    NoInputProvided(&'static str),

    #[error("none of the inputs could be plotted")]
    #[diagnostic(code(chartme::all_inputs_failed))]
    AllInputsFailed {
        #[related]
        issues: Vec<Issue>,
    },
}

/// A successfully built chart and the inputs which had to be left out of it.
#[derive(Debug)]
pub struct Plot {
    pub figure: Figure,
    /// Every per-input failure, in the order encountered.
    pub issues: Vec<Issue>,
}

impl Plot {
    /// The most recent failure, if any.
    pub fn last_issue(&self) -> Option<&Issue> {
        self.issues.last()
    }
}

/// Build the chart for a request.
///
/// Each upload is loaded with `load`, normalized and drawn as a series; the first which
/// produces a series sets the axis titles. Formulas are parsed with `E` and evaluated over a
/// domain spanning every loaded x value, or [`SampleDomain::DEFAULT_RANGE`] without data.
///
/// Failing inputs are skipped and reported in [`Plot::issues`]. The request only fails as a
/// whole when a file is not `.xlsx`, when there is no input, or when nothing could be plotted.
///
/// # Example
/// ```rust
/// use chartme::{expr::v1::Eq, plot, Mode, Request};
///
/// let req = Request {
///     mode: Mode::Analytical,
///     formulas: vec!["x^2".into(), "log(".into()],
///     ..Default::default()
/// };
///
/// let plot = plot::<Eq, _>(req, |_| unreachable!("no files")).unwrap();
///
/// assert_eq!(plot.figure.series.len(), 1);
/// assert_eq!(plot.figure.series[0].label, "Function 1: x^2");
/// assert_eq!(plot.issues.len(), 1);
/// ```
pub fn plot<E, L>(req: Request, mut load: L) -> Result<Plot, PlotError>
where
    E: expr::Equation,
    L: FnMut(&Upload) -> Result<Table, ReadError>,
{
    let Request {
        mode,
        uploads,
        formulas,
        title,
    } = req;
    let profile = mode.profile();

    if let Some(u) = uploads.iter().find(|u| !u.name.ends_with(XLSX_EXT)) {
        return Err(PlotError::UnsupportedFileType(u.name.clone()));
    }

    let uploads = cap(uploads, profile.max_datasets, "files");
    let formulas = cap(
        formulas
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect(),
        profile.max_formulas,
        "formulas",
    );

    if uploads.is_empty() && formulas.is_empty() {
        return Err(PlotError::NoInputProvided(profile.no_input));
    }

    let mut issues = Vec::new();
    let mut series = Vec::with_capacity(uploads.len() + formulas.len());
    let mut titles = AxisTitles::default();
    let mut all_x = Vec::new();

    for (idx, upload) in uploads.iter().enumerate() {
        let table = match load(upload) {
            Ok(t) => t,
            Err(source) => {
                issues.push(Issue::Unreadable {
                    file: upload.name.clone(),
                    source,
                });
                continue;
            }
        };

        let s = match dataset::normalize(&table) {
            Normalized::Series(s) => s,
            Normalized::Skipped(reason) => {
                issues.push(Issue::Skipped {
                    file: upload.name.clone(),
                    reason,
                });
                continue;
            }
        };

        if s.dropped > 0 {
            log::info!(
                "'{}': dropped {} rows with a missing x or y",
                upload.name,
                s.dropped
            );
        }

        titles = titles.establish(&s);
        all_x.extend_from_slice(&s.x);

        let style = if profile.connectable && upload.connect {
            RenderStyle::MarkersAndLines
        } else {
            RenderStyle::Markers
        };

        series.push(Series {
            label: mode.dataset_label(idx, &upload.name),
            x: s.x,
            y: s.y.into_iter().map(Some).collect(),
            style,
            slot: idx,
            color: Color::pick(profile.dataset_palette, idx),
        });
    }

    if !formulas.is_empty() {
        let domain = SampleDomain::spanning(all_x);
        log::debug!(
            "evaluating {} formulas over {} points",
            formulas.len(),
            domain.len()
        );

        for (idx, f) in formulas.iter().enumerate() {
            let eq = match E::parse(f) {
                Ok(eq) => eq,
                Err(source) => {
                    issues.push(Issue::Formula {
                        index: idx + 1,
                        source,
                    });
                    continue;
                }
            };
            log::debug!("'{}' uses {:?}", eq.expr(), eq.names());

            series.push(Series {
                label: format!("Function {}: {}", idx + 1, eq.expr()),
                x: domain.as_slice().to_vec(),
                y: eq.evaluate(&domain),
                style: RenderStyle::Lines,
                slot: idx,
                color: Color::pick(profile.formula_palette, idx),
            });
        }
    }

    if series.is_empty() {
        return Err(PlotError::AllInputsFailed { issues });
    }

    let title = match title.trim() {
        "" => profile.default_title.to_string(),
        t => t.to_string(),
    };

    Ok(Plot {
        figure: Figure {
            title,
            x_title: titles.x,
            y_title: titles.y,
            legend_title: profile.legend_title.to_string(),
            series,
        },
        issues,
    })
}

/// Keep the first `max` items, ignoring the rest with a warning.
fn cap<T>(mut items: Vec<T>, max: usize, what: &str) -> Vec<T> {
    if items.len() > max {
        log::warn!(
            "only {max} {what} can be plotted in this mode, ignoring {} more",
            items.len() - max
        );
        items.truncate(max);
    }
    items
}
