//! Chart series and figure layout, serialized as a Plotly figure.

use serde::Serialize;

/// Plotly.js build loaded by the HTML output.
pub const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// How a series is drawn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum RenderStyle {
    #[serde(rename = "markers")]
    Markers,
    #[serde(rename = "lines+markers")]
    MarkersAndLines,
    #[serde(rename = "lines")]
    Lines,
}

impl RenderStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStyle::Markers => "markers",
            RenderStyle::MarkersAndLines => "lines+markers",
            RenderStyle::Lines => "lines",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Blue,
    Red,
    Green,
    Black,
    Gray,
}

impl Color {
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Blue => "blue",
            Color::Red => "red",
            Color::Green => "green",
            Color::Black => "black",
            Color::Gray => "gray",
        }
    }

    /// The colour at `slot` of `palette`, wrapping around.
    pub fn pick(palette: &[Color], slot: usize) -> Color {
        match palette.len() {
            0 => Color::Black,
            n => palette[slot % n],
        }
    }
}

/// One renderable x/y sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub x: Vec<f64>,
    /// Same length as `x`; `None` marks a point with no value.
    pub y: Vec<Option<f64>>,
    pub style: RenderStyle,
    /// Palette slot, the submission index of the dataset or formula.
    pub slot: usize,
    pub color: Color,
}

impl Series {
    /// Number of points with no y value.
    pub fn missing(&self) -> usize {
        self.y.iter().filter(|y| y.is_none()).count()
    }

    /// Smallest and largest x.
    pub fn x_range(&self) -> Option<(f64, f64)> {
        min_max(self.x.iter().copied())
    }

    /// Smallest and largest y, ignoring missing points.
    pub fn y_range(&self) -> Option<(f64, f64)> {
        min_max(self.y.iter().flatten().copied())
    }
}

fn min_max<I: Iterator<Item = f64>>(i: I) -> Option<(f64, f64)> {
    i.fold(None, |acc, v| match acc {
        Some((lo, hi)) => Some((v.min(lo), v.max(hi))),
        None => Some((v, v)),
    })
}

/// A complete chart: series plus layout titles.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub legend_title: String,
    pub series: Vec<Series>,
}

impl Figure {
    /// The Plotly figure (`{"data": [...], "layout": {...}}`) as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.plotly())
    }

    /// An embeddable HTML fragment rendering the figure into a `<div>` with id `div_id`.
    ///
    /// Plotly.js is loaded from [`PLOTLY_CDN`].
    pub fn to_html(&self, div_id: &str) -> serde_json::Result<String> {
        let fig = self.plotly();
        // keep a `</script>` inside a label from closing the script element
        let data = serde_json::to_string(&fig.data)?.replace("</", "<\\/");
        let layout = serde_json::to_string(&fig.layout)?.replace("</", "<\\/");
        let id = serde_json::to_string(div_id)?;

        Ok(format!(
            r#"<div>
<script src="{PLOTLY_CDN}" charset="utf-8"></script>
<div id={id} class="plotly-graph-div" style="height:100%; width:100%;"></div>
<script type="text/javascript">
Plotly.newPlot({id}, {data}, {layout}, {{"responsive": true}});
</script>
</div>
"#
        ))
    }

    fn plotly(&self) -> PlotlyFigure {
        PlotlyFigure {
            data: self.series.iter().map(Trace::from).collect(),
            layout: Layout {
                title: Text::new(&self.title),
                xaxis: Axis {
                    title: Text::new(&self.x_title),
                },
                yaxis: Axis {
                    title: Text::new(&self.y_title),
                },
                legend: Legend {
                    title: Text::new(&self.legend_title),
                },
                hovermode: "x unified",
                plot_bgcolor: "white",
                paper_bgcolor: "white",
            },
        }
    }
}

const MARKER_SIZE: u32 = 6;
const FUNCTION_LINE_WIDTH: u32 = 2;

#[derive(Serialize)]
struct PlotlyFigure<'a> {
    data: Vec<Trace<'a>>,
    layout: Layout<'a>,
}

#[derive(Serialize)]
struct Trace<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'a str,
    mode: RenderStyle,
    x: &'a [f64],
    y: &'a [Option<f64>],
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<Line>,
    #[serde(skip_serializing_if = "Option::is_none")]
    marker: Option<Marker>,
}

#[derive(Serialize)]
struct Line {
    color: Color,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
}

#[derive(Serialize)]
struct Marker {
    color: Color,
    size: u32,
}

impl<'a> From<&'a Series> for Trace<'a> {
    fn from(s: &'a Series) -> Self {
        let color = s.color;
        let marker = Some(Marker {
            color,
            size: MARKER_SIZE,
        });
        let (line, marker) = match s.style {
            RenderStyle::Markers => (None, marker),
            RenderStyle::MarkersAndLines => (Some(Line { color, width: None }), marker),
            RenderStyle::Lines => (
                Some(Line {
                    color,
                    width: Some(FUNCTION_LINE_WIDTH),
                }),
                None,
            ),
        };

        Trace {
            kind: "scatter",
            name: &s.label,
            mode: s.style,
            x: &s.x,
            y: &s.y,
            line,
            marker,
        }
    }
}

#[derive(Serialize)]
struct Layout<'a> {
    title: Text<'a>,
    xaxis: Axis<'a>,
    yaxis: Axis<'a>,
    legend: Legend<'a>,
    hovermode: &'static str,
    plot_bgcolor: &'static str,
    paper_bgcolor: &'static str,
}

#[derive(Serialize)]
struct Text<'a> {
    text: &'a str,
}

impl<'a> Text<'a> {
    fn new(text: &'a str) -> Self {
        Self { text }
    }
}

#[derive(Serialize)]
struct Axis<'a> {
    title: Text<'a>,
}

#[derive(Serialize)]
struct Legend<'a> {
    title: Text<'a>,
}
