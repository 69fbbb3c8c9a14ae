//! Mathematical expression parsing and evaluation.
//!
//! Formulas are written in the single free variable `x` and may only use:
//!
//! | kind      | names                                               |
//! | --------- | --------------------------------------------------- |
//! | variable  | `x`                                                 |
//! | functions | `sin` `cos` `tan` `exp` `log` `log10` `sqrt` `abs`  |
//! | constants | `pi` `e`                                            |
//!
//! along with numbers, `+ - * /`, the power operator `^` (`**` is accepted as an alias) and
//! parentheses. Anything else is rejected before evaluation.

use super::*;
use simsearch::SimSearch;

pub mod v1;

/// The free variable.
pub const VARIABLE: &str = "x";

/// Elementwise functions which may be called.
pub const FUNCTIONS: &[&str] = &["sin", "cos", "tan", "exp", "log", "log10", "sqrt", "abs"];

/// Named constants.
pub const CONSTANTS: &[&str] = &["pi", "e"];

/// Result of evaluating a formula over a [`SampleDomain`].
///
/// Has the same length as the domain. Points where the formula has no finite value are `None`.
pub type Evaluation = Vec<Option<f64>>;

/// Parse and evaluate a formula.
pub trait Equation: Sized {
    /// Parse a text expression into an equation.
    fn parse(expr: &str) -> Result<Self, InvalidExpression>;

    /// Evaluate at a single value of `x`. The result may be non-finite.
    fn eval_at(&self, x: f64) -> f64;

    /// The string form of the expression.
    fn expr(&self) -> String;

    /// The whitelisted names the expression references.
    fn names(&self) -> Vec<String>;

    /// Evaluate at every point of the domain, mapping non-finite results to `None`.
    fn evaluate(&self, domain: &SampleDomain) -> Evaluation {
        domain
            .iter()
            .map(|&x| self.eval_at(x))
            .map(|y| y.is_finite().then_some(y))
            .collect()
    }
}

/// Parse `expr` and evaluate it over `domain` using the default resolver.
///
/// # Example
/// ```rust
/// use chartme::expr::{evaluate, SampleDomain};
///
/// let domain = SampleDomain::from(vec![-2., -1., 0., 1., 2.]);
/// let y = evaluate("x^2", &domain).unwrap();
/// assert_eq!(y, vec![Some(4.), Some(1.), Some(0.), Some(1.), Some(4.)]);
///
/// // division by zero is missing, not an error
/// let y = evaluate("1/x", &SampleDomain::from(vec![0.])).unwrap();
/// assert_eq!(y, vec![None]);
/// ```
pub fn evaluate(expr: &str, domain: &SampleDomain) -> Result<Evaluation, InvalidExpression> {
    evaluate_with::<v1::Eq>(expr, domain)
}

/// Parse `expr` with the resolver `E` and evaluate it over `domain`.
pub fn evaluate_with<E: Equation>(
    expr: &str,
    domain: &SampleDomain,
) -> Result<Evaluation, InvalidExpression> {
    E::parse(expr).map(|eq| eq.evaluate(domain))
}

/// Normalize the power operator and check every character against the whitelist.
///
/// `**` is rewritten to `^ ` so byte offsets into the returned string match the input.
pub fn sanitize(expr: &str) -> Result<String, InvalidExpression> {
    if let Some((at, ch)) = expr.char_indices().find(|(_, c)| !allowed_char(*c)) {
        return Err(InvalidExpression::new(expr, Cause::DisallowedChar(ch)).at(at, ch.len_utf8()));
    }

    if expr.trim().is_empty() {
        return Err(InvalidExpression::new(expr, Cause::Empty));
    }

    Ok(expr.replace("**", "^ "))
}

fn allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c.is_ascii_whitespace() || "_+-*/^().,".contains(c)
}

/// Suggest the closest whitelisted name to an unknown one.
pub fn suggest(name: &str) -> Option<&'static str> {
    let mut engine = SimSearch::new();
    for n in FUNCTIONS
        .iter()
        .chain(CONSTANTS)
        .chain(std::iter::once(&VARIABLE))
    {
        engine.insert(*n, n);
    }

    engine.search(name).into_iter().next()
}

/// The ordered grid of `x` values formulas are evaluated over.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleDomain(Vec<f64>);

impl SampleDomain {
    /// Number of points in a derived domain.
    pub const SAMPLES: usize = 500;

    /// Range used when there is no data to span.
    pub const DEFAULT_RANGE: (f64, f64) = (-10., 10.);

    /// `n` evenly spaced points from `start` to `end`, both included.
    pub fn linspace(start: f64, end: f64, n: usize) -> Self {
        let step = if n > 1 {
            (end - start) / (n - 1) as f64
        } else {
            0.
        };

        let mut xs = (0..n).map(|i| start + step * i as f64).collect::<Vec<_>>();
        if n > 1 {
            xs[n - 1] = end;
        }

        Self(xs)
    }

    /// [`SampleDomain::SAMPLES`] points spanning the smallest to the largest of `xs`.
    ///
    /// Falls back to [`SampleDomain::DEFAULT_RANGE`] when `xs` holds no finite value.
    pub fn spanning<I: IntoIterator<Item = f64>>(xs: I) -> Self {
        let (lo, hi) = xs
            .into_iter()
            .filter(|x| x.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, x| match acc {
                Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
                None => Some((x, x)),
            })
            .unwrap_or(Self::DEFAULT_RANGE);

        Self::linspace(lo, hi, Self::SAMPLES)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<f64> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl Default for SampleDomain {
    fn default() -> Self {
        let (lo, hi) = Self::DEFAULT_RANGE;
        Self::linspace(lo, hi, Self::SAMPLES)
    }
}

impl From<Vec<f64>> for SampleDomain {
    fn from(xs: Vec<f64>) -> Self {
        Self(xs)
    }
}

/// A formula which failed validation or parsing.
#[derive(Debug, Error, Diagnostic)]
#[error("invalid formula: {cause}")]
#[diagnostic(
    code(chartme::invalid_formula),
    help(
        "formulas may use x, numbers, + - * / ^, parentheses, \
         sin cos tan exp log log10 sqrt abs, and the constants pi and e"
    )
)]
pub struct InvalidExpression {
    #[source_code]
    expr: String,
    #[label("here")]
    span: Option<SourceSpan>,
    cause: Cause,
}

impl InvalidExpression {
    pub fn new<S: Into<String>>(expr: S, cause: Cause) -> Self {
        Self {
            expr: expr.into(),
            span: None,
            cause,
        }
    }

    /// Point the error at a byte range of the formula.
    pub fn at(mut self, offset: usize, len: usize) -> Self {
        self.span = Some((offset, len).into());
        self
    }

    /// The formula as it was supplied.
    pub fn expr(&self) -> &str {
        &self.expr
    }

    pub fn cause(&self) -> &Cause {
        &self.cause
    }
}

/// Why a formula was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Cause {
    #[error("formula is empty")]
    Empty,

    #[error("character '{0}' is not allowed")]
    DisallowedChar(char),


    #[error("unknown name '{name}'{}", did_you_mean(.suggestion))]
    UnknownName {
        name: String,
        suggestion: Option<&'static str>,
    },

    #[error("'{0}' is a function and must be called, for example {0}(x)")]
    UncalledFunction(String),

    #[error("'{0}' is not a function")]
    NotAFunction(String),

    #[error("function '{name}' takes exactly one argument, found {found}")]
    Arity { name: String, found: usize },

    #[error("unexpected {0}")]
    Unexpected(String),

    #[error("unexpected end of formula")]
    UnexpectedEnd,

    #[error("missing closing parenthesis")]
    MissingParen,

    #[error("formula is nested more than {0} levels deep")]
    TooDeep(usize),
}

fn did_you_mean(s: &Option<&'static str>) -> String {
    s.map(|s| format!(", did you mean '{s}'?"))
        .unwrap_or_default()
}
