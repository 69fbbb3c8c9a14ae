use chartme::data::{Cell, Headers, Table};
use chartme::dataset::{normalize, AxisTitles, Normalized, NormalizedSeries, SkipReason};
use pretty_assertions::assert_eq;

fn table(headers: &[&str], rows: Vec<Vec<Cell>>) -> Table {
    Table::new(headers.iter().collect(), rows)
}

fn series(t: &Table) -> NormalizedSeries {
    match normalize(t) {
        Normalized::Series(s) => s,
        Normalized::Skipped(r) => panic!("unexpectedly skipped: {r}"),
    }
}

#[test]
fn time_value() {
    let t = table(
        &["Time", "Value"],
        vec![
            vec![1.0.into(), 10.0.into()],
            vec![Cell::Empty, 20.0.into()],
            vec![3.0.into(), Cell::Empty],
            vec![4.0.into(), 40.0.into()],
        ],
    );

    assert_eq!(
        series(&t),
        NormalizedSeries {
            x_label: Some("Time".into()),
            y_label: Some("Value".into()),
            x: vec![1., 4.],
            y: vec![10., 40.],
            dropped: 2,
        }
    );
}

#[test]
fn columns_are_positional() {
    let t = table(
        &["y", "x", "extra"],
        vec![vec![1.0.into(), 2.0.into(), "ignored".into()]],
    );
    let s = series(&t);

    assert_eq!(s.x_label.as_deref(), Some("y"));
    assert_eq!(s.y_label.as_deref(), Some("x"));
    assert_eq!((s.x, s.y), (vec![1.], vec![2.]));
}

#[test]
fn one_column() {
    let t = table(&["Only"], vec![vec![1.0.into()], vec![2.0.into()]]);
    assert_eq!(normalize(&t), Normalized::Skipped(SkipReason::TooFewColumns));
}

#[test]
fn nothing_left_after_cleaning() {
    let t = table(
        &["a", "b"],
        vec![
            vec![Cell::Empty, 1.0.into()],
            vec![Cell::text("NA"), 2.0.into()],
            vec![Cell::text("n/a"), Cell::text("oops")],
        ],
    );
    assert_eq!(
        normalize(&t),
        Normalized::Skipped(SkipReason::EmptyAfterCleaning)
    );

    let t = table(&["a", "b"], vec![]);
    assert_eq!(
        normalize(&t),
        Normalized::Skipped(SkipReason::EmptyAfterCleaning)
    );
}

#[test]
fn numeric_text_and_bools() {
    let t = table(
        &["a", "b"],
        vec![
            vec![Cell::text(" 2.5 "), Cell::Bool(true)],
            vec![Cell::text("abc"), 1.0.into()],
        ],
    );
    let s = series(&t);

    assert_eq!(s.x, vec![2.5]);
    assert_eq!(s.y, vec![1.]);
    assert_eq!(s.dropped, 1);
}

#[test]
fn unnamed_labels() {
    for h in ["", "  ", "Unnamed: 0", "nan"] {
        let t = table(&[h, "Value"], vec![vec![1.0.into(), 2.0.into()]]);
        let s = series(&t);
        assert_eq!(s.x_label, None, "header {h:?}");
        assert_eq!(s.y_label.as_deref(), Some("Value"));
    }

    let hdrs = Headers::from_cells(&[Cell::Empty, Cell::from(2024.)]);
    let t = Table::new(hdrs, vec![vec![1.0.into(), 2.0.into()]]);
    let s = series(&t);
    assert_eq!(s.x_label, None);
    assert_eq!(s.y_label.as_deref(), Some("2024"));
}

#[test]
fn first_series_sets_titles() {
    let unnamed = series(&table(
        &["Unnamed: 0", "Unnamed: 1"],
        vec![vec![1.0.into(), 2.0.into()]],
    ));
    let named = series(&table(
        &["Time", "Pressure"],
        vec![vec![1.0.into(), 2.0.into()]],
    ));

    let titles = [&unnamed, &named]
        .into_iter()
        .fold(AxisTitles::default(), AxisTitles::establish);
    assert!(titles.is_established());
    assert_eq!((titles.x.as_str(), titles.y.as_str()), ("X", "Y"));

    let titles = [&named, &unnamed]
        .into_iter()
        .fold(AxisTitles::default(), AxisTitles::establish);
    assert_eq!((titles.x.as_str(), titles.y.as_str()), ("Time", "Pressure"));
}
