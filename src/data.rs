use super::*;
use quick_xml::{events::Event, reader::Reader};
use std::{
    collections::HashMap,
    io::{BufReader, Read, Seek},
    path::Path,
};

/// Text values which are read as an absent cell.
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A single spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Cell {
    /// A text cell. Conventional "not available" markers become [`Cell::Empty`].
    pub fn text<S: Into<String>>(s: S) -> Self {
        let s = s.into();
        if NA_VALUES.contains(&s.trim()) {
            Cell::Empty
        } else {
            Cell::Text(s)
        }
    }

    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// The numeric value of the cell, if it has a finite one.
    ///
    /// Text is parsed leniently (surrounding whitespace is ignored), booleans map to `1` and `0`.
    pub fn as_num(&self) -> Option<f64> {
        let n = match self {
            Cell::Empty => None,
            Cell::Number(n) => Some(*n),
            Cell::Text(t) => t.trim().parse::<f64>().ok(),
            Cell::Bool(b) => Some(if *b { 1. } else { 0. }),
        }?;

        n.is_finite().then_some(n)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::text(s)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(x: Option<T>) -> Self {
        x.map(Into::into).unwrap_or(Cell::Empty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Headers(Vec<String>);

impl Headers {
    /// Build the column names from a header row.
    ///
    /// Blank header cells are named `Unnamed: <column index>`.
    pub fn from_cells(cells: &[Cell]) -> Self {
        Headers(
            cells
                .iter()
                .enumerate()
                .map(|(i, c)| match c {
                    Cell::Number(n) => n.to_string(),
                    Cell::Text(t) if !t.trim().is_empty() => t.trim().to_string(),
                    Cell::Bool(b) => (if *b { "True" } else { "False" }).to_string(),
                    _ => format!("Unnamed: {i}"),
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.0.get(idx).map(String::as_str)
    }

    fn widen(&mut self, len: usize) {
        while self.0.len() < len {
            let i = self.0.len();
            self.0.push(format!("Unnamed: {i}"));
        }
    }
}

impl<T: AsRef<str>> FromIterator<T> for Headers {
    fn from_iter<I: IntoIterator<Item = T>>(i: I) -> Self {
        Headers(
            i.into_iter()
                .map(|t| t.as_ref().trim().to_string())
                .collect(),
        )
    }
}

/// A rectangular table: a header row and rows of cells, all the same width.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    cols: Headers,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Construct a table, padding short rows with [`Cell::Empty`].
    ///
    /// Rows wider than the headers widen the table with unnamed columns.
    pub fn new(mut headers: Headers, mut rows: Vec<Vec<Cell>>) -> Self {
        let width = rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or_default()
            .max(headers.len());

        headers.widen(width);
        for row in &mut rows {
            row.resize(width, Cell::Empty);
        }

        Self {
            cols: headers,
            rows,
        }
    }

    /// Construct a table from a cell grid where the first row holds the headers.
    pub fn from_grid(grid: Vec<Vec<Cell>>) -> Self {
        let mut grid = grid.into_iter();
        let headers = grid
            .next()
            .map(|r| Headers::from_cells(&r))
            .unwrap_or_else(|| Headers(Vec::new()));

        Self::new(headers, grid.collect())
    }

    /// Returns the length of the number of observation rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.cols.len()
    }

    pub fn headers(&self) -> &Headers {
        &self.cols
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = DataRow> {
        self.rows
            .iter()
            .enumerate()
            .map(|(idx, vals)| DataRow { idx, vals })
    }
}

#[derive(Copy, Clone)]
pub struct DataRow<'a> {
    idx: usize,
    vals: &'a [Cell],
}

impl<'a> DataRow<'a> {
    /// Zero based index of the row, excluding the header row.
    pub fn index(&self) -> usize {
        self.idx
    }

    pub fn get(&self, colidx: usize) -> Option<&'a Cell> {
        self.vals.get(colidx)
    }
}

/// Failure to decode a spreadsheet into a [`Table`].
#[derive(Debug, Error, Diagnostic)]
pub enum ReadError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("not a valid .xlsx archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid .xlsx format: {0}")]
    #[diagnostic(help("the file might be an older .xls workbook saved with the wrong extension"))]
    InvalidFormat(String),

    #[error("missing required part: {0}")]
    MissingPart(String),
}

/// Reads the first worksheet of an `.xlsx` workbook into a [`Table`].
///
/// The first non-empty row of the sheet is taken as the header row. Cell values are read as
/// stored (cached formula results included); styles, comments and other sheets are ignored.
pub struct XlsxReader;

impl XlsxReader {
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Table, ReadError> {
        let file = fs::File::open(path)?;
        Self::read(BufReader::new(file))
    }

    pub fn read<R: Read + Seek>(reader: R) -> Result<Table, ReadError> {
        let mut archive = zip::ZipArchive::new(reader)?;

        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(ReadError::InvalidFormat(
                "missing [Content_Types].xml".into(),
            ));
        }

        let shared_strings = read_shared_strings(&mut archive)?;
        let sheet = first_sheet_path(&mut archive)?;
        log::debug!("reading worksheet '{sheet}'");

        let grid = read_worksheet(&mut archive, &sheet, &shared_strings)?;
        let table = Table::from_grid(grid);
        log::debug!(
            "read table with {} columns and {} rows",
            table.width(),
            table.len()
        );

        Ok(table)
    }
}

type Archive<R> = zip::ZipArchive<R>;

fn xml<R: Read>(rdr: R) -> Reader<BufReader<R>> {
    let mut xml = Reader::from_reader(BufReader::new(rdr));
    xml.trim_text(true);
    xml
}

fn read_shared_strings<R: Read + Seek>(archive: &mut Archive<R>) -> Result<Vec<String>, ReadError> {
    let mut strings = Vec::new();

    let file = match archive.by_name("xl/sharedStrings.xml") {
        Ok(f) => f,
        Err(_) => return Ok(strings), // no shared strings is valid
    };

    let mut rdr = xml(file);
    let mut buf = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_t = false;
    let mut in_phonetic = false;

    loop {
        match rdr.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"rPh" => in_phonetic = true,
                b"t" if in_si && !in_phonetic => in_t = true,
                _ => {}
            },
            Event::Empty(e) if e.name().as_ref() == b"si" => strings.push(String::new()),
            Event::End(e) => match e.name().as_ref() {
                b"si" => {
                    strings.push(std::mem::take(&mut current));
                    in_si = false;
                }
                b"rPh" => in_phonetic = false,
                b"t" => in_t = false,
                _ => {}
            },
            Event::Text(e) if in_t => current.push_str(&e.unescape()?),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

/// Resolve the archive path of the first worksheet through `workbook.xml` and its relationships.
fn first_sheet_path<R: Read + Seek>(archive: &mut Archive<R>) -> Result<String, ReadError> {
    let r_id = {
        let file = archive
            .by_name("xl/workbook.xml")
            .map_err(|_| ReadError::MissingPart("xl/workbook.xml".into()))?;
        let mut rdr = xml(file);
        let mut buf = Vec::new();
        let mut r_id = None;

        while r_id.is_none() {
            match rdr.read_event_into(&mut buf)? {
                Event::Empty(e) | Event::Start(e) if e.name().as_ref() == b"sheet" => {
                    r_id = e
                        .attributes()
                        .flatten()
                        .find(|a| a.key.as_ref() == b"r:id")
                        .and_then(|a| a.unescape_value().ok().map(|s| s.to_string()));
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        r_id.ok_or_else(|| ReadError::InvalidFormat("workbook has no worksheets".into()))?
    };

    let file = archive
        .by_name("xl/_rels/workbook.xml.rels")
        .map_err(|_| ReadError::MissingPart("xl/_rels/workbook.xml.rels".into()))?;
    let mut rdr = xml(file);
    let mut buf = Vec::new();
    let mut targets = HashMap::new();

    loop {
        match rdr.read_event_into(&mut buf)? {
            Event::Empty(e) | Event::Start(e) if e.name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = attr.unescape_value().ok().map(|s| s.to_string()),
                        b"Target" => target = attr.unescape_value().ok().map(|s| s.to_string()),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let target = targets
        .remove(&r_id)
        .ok_or_else(|| ReadError::MissingPart(format!("relationship '{r_id}'")))?;

    // targets are relative to the xl/ folder unless absolute
    Ok(match target.strip_prefix('/') {
        Some(abs) => abs.to_string(),
        None => format!("xl/{target}"),
    })
}

fn read_worksheet<R: Read + Seek>(
    archive: &mut Archive<R>,
    path: &str,
    shared_strings: &[String],
) -> Result<Vec<Vec<Cell>>, ReadError> {
    let file = archive
        .by_name(path)
        .map_err(|_| ReadError::MissingPart(path.to_string()))?;
    let mut rdr = xml(file);
    let mut buf = Vec::new();

    let mut grid: Vec<Vec<Cell>> = Vec::new();
    let mut row = 0usize;
    let mut next_col = 0usize;
    let mut seen_row = false;

    let mut cell_ref: Option<String> = None;
    let mut cell_type: Option<String> = None;
    let mut value = String::new();
    let mut in_value = false;
    let mut in_inline = false;

    loop {
        match rdr.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"row" => {
                    let r = e
                        .attributes()
                        .flatten()
                        .find(|a| a.key.as_ref() == b"r")
                        .and_then(|a| a.unescape_value().ok()?.parse::<usize>().ok());
                    row = match r {
                        Some(r) if r > MAX_ROWS => {
                            return Err(ReadError::InvalidFormat(format!(
                                "row {r} is beyond the last worksheet row"
                            )))
                        }
                        Some(r) => r.saturating_sub(1), // 1-based to 0-based
                        None if seen_row => row + 1,
                        None => 0,
                    };
                    seen_row = true;
                    next_col = 0;
                }
                b"c" => {
                    cell_ref = None;
                    cell_type = None;
                    value.clear();
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"r" => cell_ref = attr.unescape_value().ok().map(|s| s.to_string()),
                            b"t" => cell_type = attr.unescape_value().ok().map(|s| s.to_string()),
                            _ => {}
                        }
                    }
                }
                b"v" => in_value = true,
                b"is" => in_inline = true,
                _ => {}
            },
            Event::Empty(e) if e.name().as_ref() == b"c" => {
                // styled but valueless cell
                let col = match e.attributes().flatten().find(|a| a.key.as_ref() == b"r") {
                    Some(a) => {
                        let cref = a.unescape_value()?;
                        parse_cell_ref(&cref).ok_or_else(|| invalid_ref(&cref))?.1
                    }
                    None => next_col,
                };
                next_col = col + 1;
            }
            Event::Text(e) if in_value || in_inline => value.push_str(&e.unescape()?),
            Event::End(e) => match e.name().as_ref() {
                b"c" => {
                    let (r, c) = match cell_ref.as_deref() {
                        Some(cref) => parse_cell_ref(cref).ok_or_else(|| invalid_ref(cref))?,
                        None => (row, next_col),
                    };
                    next_col = c + 1;

                    let cell = to_cell(cell_type.as_deref(), &value, shared_strings)?;
                    if !cell.is_missing() {
                        if grid.len() <= r {
                            grid.resize_with(r + 1, Vec::new);
                        }
                        let cells = &mut grid[r];
                        if cells.len() <= c {
                            cells.resize(c + 1, Cell::Empty);
                        }
                        cells[c] = cell;
                    }
                }
                b"v" => in_value = false,
                b"is" => in_inline = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    // the header is the first row holding any value
    let first = grid.iter().position(|r| !r.is_empty()).unwrap_or(grid.len());
    grid.drain(..first);

    Ok(grid)
}

fn to_cell(ty: Option<&str>, value: &str, shared_strings: &[String]) -> Result<Cell, ReadError> {
    let cell = match ty {
        Some("s") => {
            let idx = value.trim().parse::<usize>().map_err(|_| {
                ReadError::InvalidFormat(format!("invalid shared string index '{value}'"))
            })?;
            let s = shared_strings.get(idx).ok_or_else(|| {
                ReadError::InvalidFormat(format!("shared string index {idx} out of bounds"))
            })?;
            Cell::text(s.as_str())
        }
        Some("b") => Cell::Bool(value == "1" || value.eq_ignore_ascii_case("true")),
        // error values such as #DIV/0! carry no data
        Some("e") => Cell::Empty,
        Some("inlineStr") | Some("str") => Cell::text(value),
        None | Some("n") if value.is_empty() => Cell::Empty,
        None | Some("n") => match value.trim().parse::<f64>() {
            Ok(n) => Cell::Number(n),
            Err(_) => Cell::text(value),
        },
        Some(_) => Cell::text(value),
    };

    Ok(cell)
}

/// Rows in a worksheet.
const MAX_ROWS: usize = 1_048_576;
/// Columns in a worksheet, `A` to `XFD`.
const MAX_COLS: usize = 16_384;

fn invalid_ref(cref: &str) -> ReadError {
    ReadError::InvalidFormat(format!("invalid cell reference '{cref}'"))
}

/// Parse an `A1` style reference into zero based `(row, column)`.
///
/// References outside the worksheet limits are `None`.
fn parse_cell_ref(s: &str) -> Option<(usize, usize)> {
    let split = s.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = s.split_at(split);

    if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }

    let col = letters.bytes().try_fold(0usize, |acc, b| {
        acc.checked_mul(26)?
            .checked_add((b.to_ascii_uppercase() - b'A' + 1) as usize)
    })?;
    let row = digits.parse::<usize>().ok()?;

    if !(1..=MAX_ROWS).contains(&row) || !(1..=MAX_COLS).contains(&col) {
        return None;
    }

    Some((row - 1, col - 1))
}
