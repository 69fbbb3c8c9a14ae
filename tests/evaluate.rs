use chartme::expr::{evaluate, v1::Eq, Cause, Equation, SampleDomain};

fn domain(xs: &[f64]) -> SampleDomain {
    SampleDomain::from(xs.to_vec())
}

#[test]
fn one_value_per_domain_point() {
    let exprs = [
        "x",
        "x^2 - 3*x + 1",
        "sin(x) * cos(x)",
        "sqrt(abs(x)) + exp(-x)",
        "log(x) / log10(10)",
        "tan(pi * x) + e",
        "1/x",
    ];

    for _ in 0..50 {
        let n = fastrand::usize(1..200);
        let xs = (0..n)
            .map(|_| fastrand::f64() * 200. - 100.)
            .collect::<Vec<_>>();
        let d = domain(&xs);

        for e in exprs {
            let y = evaluate(e, &d).unwrap();
            assert_eq!(y.len(), n, "'{e}' over {n} points");
            assert!(y.iter().flatten().all(|v| v.is_finite()));
        }
    }
}

#[test]
fn square() {
    let y = evaluate("x^2", &domain(&[-2., -1., 0., 1., 2.])).unwrap();
    assert_eq!(y, vec![Some(4.), Some(1.), Some(0.), Some(1.), Some(4.)]);

    let y = evaluate("x**2", &domain(&[-2., 3.])).unwrap();
    assert_eq!(y, vec![Some(4.), Some(9.)]);
}

#[test]
fn undefined_points_are_missing() {
    assert_eq!(evaluate("1/x", &domain(&[0.])).unwrap(), vec![None]);
    assert_eq!(
        evaluate("sqrt(x)", &domain(&[-1., 4.])).unwrap(),
        vec![None, Some(2.)]
    );
    assert_eq!(
        evaluate("log(x)", &domain(&[0., 1.])).unwrap(),
        vec![None, Some(0.)]
    );
}

#[test]
fn names_outside_the_whitelist() {
    for e in ["os", "__import__", "eval", "os.system(x)", "eval(x)", "y + 1", "exit"] {
        assert!(
            evaluate(e, &domain(&[1.])).is_err(),
            "'{e}' should be rejected"
        );
    }

    let err = Eq::parse("eval(x)").unwrap_err();
    assert!(matches!(err.cause(), Cause::UnknownName { name, .. } if name == "eval"));
}

#[test]
fn disallowed_characters() {
    for (e, ch) in [
        ("x; 1", ';'),
        ("[x]", '['),
        ("\"x\"", '"'),
        ("{x}", '{'),
        ("x = 1", '='),
        ("lambda: x", ':'),
    ] {
        let err = Eq::parse(e).unwrap_err();
        assert_eq!(err.cause(), &Cause::DisallowedChar(ch), "{e}");
        assert_eq!(err.expr(), e);
    }
}

#[test]
fn evaluation_is_independent_per_call() {
    let a = Eq::parse("x + 1").unwrap();
    let b = Eq::parse("x * 10").unwrap();

    assert_eq!(a.evaluate(&domain(&[1., 2.])), vec![Some(2.), Some(3.)]);
    assert_eq!(b.evaluate(&domain(&[1., 2.])), vec![Some(10.), Some(20.)]);
    assert_eq!(a.evaluate(&domain(&[5.])), vec![Some(6.)]);
}

#[test]
fn derived_domains() {
    let d = SampleDomain::spanning([3., -1., 7., f64::NAN]);
    assert_eq!(d.len(), SampleDomain::SAMPLES);
    assert_eq!(d.as_slice()[0], -1.);
    assert_eq!(d.as_slice()[d.len() - 1], 7.);

    let d = SampleDomain::spanning(std::iter::empty());
    assert_eq!(d.as_slice()[0], SampleDomain::DEFAULT_RANGE.0);
    assert_eq!(d.as_slice()[d.len() - 1], SampleDomain::DEFAULT_RANGE.1);

    // a single x value collapses the grid onto it
    let d = SampleDomain::spanning([2.]);
    assert!(d.iter().all(|x| *x == 2.));
}

fn render(err: &chartme::expr::InvalidExpression) -> String {
    let mut out = String::new();
    miette::GraphicalReportHandler::new_themed(miette::GraphicalTheme::unicode_nocolor())
        .render_report(&mut out, err)
        .unwrap();
    out
}

#[test]
fn non_ascii_characters() {
    for (e, ch) in [("x²", '²'), ("é", 'é'), ("xé+1", 'é'), ("x\u{a0}+ 1", '\u{a0}')] {
        let err = Eq::parse(e).unwrap_err();
        assert_eq!(err.cause(), &Cause::DisallowedChar(ch), "{e}");

        let report = render(&err);
        assert!(report.contains(&format!("character '{ch}' is not allowed")), "{report}");
    }
}

#[test]
fn tokenizer_errors_name_the_character() {
    let err = Eq::parse("2 x").unwrap_err();
    assert!(matches!(err.cause(), Cause::Unexpected(_)), "{:?}", err.cause());
    assert!(!err.to_string().contains("byte"), "{err}");
    render(&err);
}

#[test]
fn nesting_is_bounded() {
    let nested = |n: usize| format!("{}x{}", "(".repeat(n), ")".repeat(n));

    let y = evaluate(&nested(100), &domain(&[2.])).unwrap();
    assert_eq!(y, vec![Some(2.)]);

    for e in [
        nested(300),
        nested(3000),
        format!("{}x", "-".repeat(3000)),
        format!("{}x", "x + ".repeat(3000)),
        format!("{}x", "x^".repeat(3000)),
    ] {
        let err = Eq::parse(&e).unwrap_err();
        assert!(matches!(err.cause(), Cause::TooDeep(_)), "{:?}", err.cause());
    }
}
