use clap::{ArgAction, Parser, ValueEnum};
use miette::*;
use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};
use thiserror::Error;

pub mod chart;
pub mod data;
pub mod dataset;
pub mod expr;
pub mod request;

use expr::Equation;
pub use request::{plot, Plot, PlotError, Request, Upload};

/// CLI chart builder.
/// Overlay spreadsheet datasets and formulas in one interactive plot.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct App {
    /// Spreadsheet files (.xlsx) to plot, in order.
    /// The first column of each file is x, the second y.
    pub files: Vec<PathBuf>,

    /// A formula in `x` to plot, e.g. 'sin(x) * x^2'.
    /// May be given twice. Only used in analytical mode.
    #[arg(short, long = "func", value_name = "EXPR")]
    pub funcs: Vec<String>,

    /// Plotting mode.
    #[arg(short, long, default_value_t, value_enum)]
    pub mode: Mode,

    /// Connect the points of the file in this slot (1-based).
    /// May be repeated. Only used in overlay mode.
    #[arg(short, long, value_name = "SLOT")]
    pub connect: Vec<usize>,

    /// The plot title.
    /// If left blank, a default title for the mode is used.
    #[arg(short, long, default_value = "")]
    pub title: String,

    /// The version of equation resolver to use.
    #[arg(long, default_value_t, value_enum)]
    pub eq_resolver: EquationResolver,

    /// The output format to write to stdout.
    #[arg(short, long, default_value_t, value_enum)]
    pub out: Output,

    /// Log more detail to stderr. Repeat for more.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Default)]
pub enum Mode {
    /// Up to 5 files, each drawn as points, optionally connected.
    #[default]
    Overlay,

    /// Up to 3 files drawn as points and 2 formulas drawn as curves.
    Analytical,
}

#[derive(Debug, Copy, Clone, ValueEnum, Default)]
pub enum EquationResolver {
    #[default]
    V1,
}

#[derive(Debug, Copy, Clone, ValueEnum, Default)]
pub enum Output {
    /// Embeddable HTML fragment rendering the interactive chart.
    #[default]
    Html,

    /// Plotly figure JSON.
    Json,

    /// Rich table summarising each series.
    Table,

    /// Plain CSV of every point, one row per (series, x, y).
    Csv,
}

impl App {
    pub fn run(self) -> Result<()> {
        init_logging(self.verbose);

        match self.eq_resolver {
            EquationResolver::V1 => run::<expr::v1::Eq>(self),
        }
    }
}

fn init_logging(verbose: u8) {
    use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build();

    // a logger may already be installed when used as a library
    if TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto).is_err() {
        log::debug!("logger already initialised");
    }
}

fn run<E>(app: App) -> Result<()>
where
    E: Equation,
{
    let App {
        files,
        funcs,
        mode,
        connect,
        title,
        eq_resolver: _,
        out,
        verbose: _,
    } = app;

    let uploads = files
        .into_iter()
        .enumerate()
        .map(|(i, path)| Upload::new(path).connect(connect.contains(&(i + 1))))
        .collect();

    let request = Request {
        mode,
        uploads,
        formulas: funcs,
        title,
    };

    let plot = plot::<E, _>(request, |upload| {
        log::info!("reading '{}'", upload.path.display());
        data::XlsxReader::read_file(&upload.path)
    })?;

    for issue in &plot.issues {
        eprintln!("warning: {issue}");
    }

    let fig = &plot.figure;
    let w = &mut io::stdout();

    match out {
        Output::Html => {
            let html = fig
                .to_html("chartme")
                .into_diagnostic()
                .wrap_err("failed to serialise the chart")?;
            w.write_all(html.as_bytes()).into_diagnostic()
        }
        Output::Json => {
            let json = fig
                .to_json()
                .into_diagnostic()
                .wrap_err("failed to serialise the chart")?;
            writeln!(w, "{json}").into_diagnostic()
        }
        Output::Table => write_table(fig).into_diagnostic(),
        Output::Csv => write_csv(fig)
            .into_diagnostic()
            .wrap_err("failed to write CSV"),
    }
}

fn write_table(fig: &chart::Figure) -> io::Result<()> {
    use comfy_table::{Cell, CellAlignment as CA, Row, Table};

    let w = &mut io::stdout();

    let mut nfmtr = "[~4]".parse::<numfmt::Formatter>().expect("just fine");

    let mut table = Table::new();

    table.set_header(["Series", "Style", "Colour", "Points", "Missing", "x range", "y range"]);

    for s in &fig.series {
        let mut range = |r: Option<(f64, f64)>| match r {
            Some((lo, hi)) => {
                let lo = nfmtr.fmt(lo).to_string();
                format!("{lo} .. {}", nfmtr.fmt(hi))
            }
            None => "-".to_string(),
        };
        let xr = range(s.x_range());
        let yr = range(s.y_range());

        let mut row = Row::new();
        row.add_cell(Cell::new(&s.label))
            .add_cell(Cell::new(s.style.as_str()))
            .add_cell(Cell::new(s.color.as_str()))
            .add_cell(Cell::new(s.x.len()).set_alignment(CA::Right))
            .add_cell(Cell::new(s.missing()).set_alignment(CA::Right))
            .add_cell(Cell::new(xr).set_alignment(CA::Right))
            .add_cell(Cell::new(yr).set_alignment(CA::Right));
        table.add_row(row);
    }

    table.load_preset(comfy_table::presets::UTF8_HORIZONTAL_ONLY);

    writeln!(w, "{table}")?;
    writeln!(w, "  Title: {}", fig.title)?;
    writeln!(w, "  x axis: {}", fig.x_title)?;
    writeln!(w, "  y axis: {}", fig.y_title)?;

    Ok(())
}

fn write_csv(fig: &chart::Figure) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(io::stdout());

    wtr.write_record(["series", "x", "y"])?;
    for s in &fig.series {
        for (x, y) in s.x.iter().zip(&s.y) {
            let y = y.map(|y| y.to_string()).unwrap_or_default();
            wtr.write_record([s.label.as_str(), x.to_string().as_str(), y.as_str()])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
