use super::*;
use meval::{
    tokenizer::{tokenize, Operation, Token},
    ParseError,
};
use std::{iter::Peekable, vec};

/*** A note on the implementation ***
 *
 * `meval` is only used to split the formula into tokens. Its own evaluator resolves names
 * against a context which carries extra builtins (`max`, `floor`, ...), so the tree is built
 * here instead, by a small recursive descent parser:
 *
 *   expr   := term (('+' | '-') term)*
 *   term   := unary (('*' | '/') unary)*
 *   unary  := ('+' | '-') unary | power
 *   power  := atom ('^' unary)?
 *   atom   := number | name | func '(' expr ')' | '(' expr ')'
 *
 * `power` recurses through `unary`, so `^` is right associative, binds tighter than a leading
 * minus (`-x^2 == -(x^2)`), and accepts a signed exponent (`x^-1`).
 *
 * Names are resolved while parsing against the fixed whitelist. Constants are folded into
 * numbers, so the finished tree can only reference `x` and the whitelisted functions.
 */

#[derive(Debug, Clone, PartialEq)]
pub struct Eq {
    /// Formula text as supplied.
    src: String,

    /// Whitelisted names referenced, in order of first use.
    names: Vec<String>,

    root: Node,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Num(f64),
    X,
    Neg(Box<Node>),
    Bin(Op, Box<Node>, Box<Node>),
    Call(Func, Box<Node>),
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum Func {
    Sin,
    Cos,
    Tan,
    Exp,
    Log,
    Log10,
    Sqrt,
    Abs,
}

impl Func {
    fn resolve(name: &str) -> Option<Self> {
        use Func::*;
        Some(match name {
            "sin" => Sin,
            "cos" => Cos,
            "tan" => Tan,
            "exp" => Exp,
            "log" => Log,
            "log10" => Log10,
            "sqrt" => Sqrt,
            "abs" => Abs,
            _ => return None,
        })
    }

    fn apply(self, x: f64) -> f64 {
        use Func::*;
        match self {
            Sin => x.sin(),
            Cos => x.cos(),
            Tan => x.tan(),
            Exp => x.exp(),
            Log => x.ln(),
            Log10 => x.log10(),
            Sqrt => x.sqrt(),
            Abs => x.abs(),
        }
    }
}

fn constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        _ => None,
    }
}

impl Node {
    fn eval(&self, x: f64) -> f64 {
        match self {
            Node::Num(n) => *n,
            Node::X => x,
            Node::Neg(a) => -a.eval(x),
            Node::Bin(op, a, b) => {
                let (a, b) = (a.eval(x), b.eval(x));
                match op {
                    Op::Add => a + b,
                    Op::Sub => a - b,
                    Op::Mul => a * b,
                    Op::Div => a / b,
                    Op::Pow => a.powf(b),
                }
            }
            Node::Call(f, a) => f.apply(a.eval(x)),
        }
    }
}

impl Equation for Eq {
    fn parse(expr: &str) -> Result<Self, InvalidExpression> {
        let src = sanitize(expr)?;

        let tokens = tokenize(&src).map_err(|e| {
            let cause = match e {
                ParseError::MissingRParen(_) => Cause::MissingParen,
                ParseError::MissingArgument => Cause::UnexpectedEnd,
                ParseError::UnexpectedToken(at) => match expr.get(at..).and_then(|s| s.chars().next()) {
                    Some(c) => {
                        let err = InvalidExpression::new(expr, Cause::Unexpected(format!("'{c}'")));
                        return err.at(at, c.len_utf8());
                    }
                    None => Cause::UnexpectedEnd,
                },
            };
            InvalidExpression::new(expr, cause)
        })?;

        let mut parser = Parser {
            tokens: tokens.into_iter().peekable(),
            src: expr,
            names: Vec::new(),
            depth: 0,
        };

        let root = parser.expr()?;

        if let Some(t) = parser.tokens.next() {
            return Err(parser.fail(Cause::Unexpected(describe(&t))));
        }

        Ok(Self {
            src: expr.trim().to_string(),
            names: parser.names,
            root,
        })
    }

    fn eval_at(&self, x: f64) -> f64 {
        self.root.eval(x)
    }

    fn expr(&self) -> String {
        self.src.clone()
    }

    fn names(&self) -> Vec<String> {
        self.names.clone()
    }
}

/// Deepest nesting of parentheses, signs and chained operators the parser accepts.
const MAX_DEPTH: usize = 256;

struct Parser<'a> {
    tokens: Peekable<vec::IntoIter<Token>>,
    src: &'a str,
    names: Vec<String>,
    depth: usize,
}

type ParseResult = Result<Node, InvalidExpression>;

impl<'a> Parser<'a> {
    fn fail(&self, cause: Cause) -> InvalidExpression {
        InvalidExpression::new(self.src, cause)
    }

    fn deeper(&mut self) -> Result<(), InvalidExpression> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            Err(self.fail(Cause::TooDeep(MAX_DEPTH)))
        } else {
            Ok(())
        }
    }

    fn used(&mut self, name: &str) {
        if !self.names.iter().any(|n| n == name) {
            self.names.push(name.to_string());
        }
    }

    fn expr(&mut self) -> ParseResult {
        let mark = self.depth;
        let mut lhs = self.term()?;

        loop {
            let op = match self.tokens.peek() {
                Some(Token::Binary(Operation::Plus)) => Op::Add,
                Some(Token::Binary(Operation::Minus)) => Op::Sub,
                _ => break,
            };
            self.tokens.next();
            self.deeper()?;

            let rhs = self.term()?;
            lhs = Node::Bin(op, Box::new(lhs), Box::new(rhs));
        }

        self.depth = mark;
        Ok(lhs)
    }

    fn term(&mut self) -> ParseResult {
        let mark = self.depth;
        let mut lhs = self.unary()?;

        loop {
            let op = match self.tokens.peek() {
                Some(Token::Binary(Operation::Times)) => Op::Mul,
                Some(Token::Binary(Operation::Div)) => Op::Div,
                _ => break,
            };
            self.tokens.next();
            self.deeper()?;

            let rhs = self.unary()?;
            lhs = Node::Bin(op, Box::new(lhs), Box::new(rhs));
        }

        self.depth = mark;
        Ok(lhs)
    }

    fn unary(&mut self) -> ParseResult {
        let mark = self.depth;
        self.deeper()?;

        let node = match self.tokens.peek() {
            Some(Token::Unary(Operation::Minus)) => {
                self.tokens.next();
                Node::Neg(Box::new(self.unary()?))
            }
            Some(Token::Unary(Operation::Plus)) => {
                self.tokens.next();
                self.unary()?
            }
            _ => self.power()?,
        };

        self.depth = mark;
        Ok(node)
    }

    fn power(&mut self) -> ParseResult {
        let base = self.atom()?;

        if let Some(Token::Binary(Operation::Pow)) = self.tokens.peek() {
            self.tokens.next();
            let exp = self.unary()?;
            return Ok(Node::Bin(Op::Pow, Box::new(base), Box::new(exp)));
        }

        Ok(base)
    }

    fn atom(&mut self) -> ParseResult {
        match self.tokens.next() {
            Some(Token::Number(n)) => Ok(Node::Num(n)),
            Some(Token::Var(name)) => self.name(name),
            Some(Token::Func(name, _)) => self.call(name),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.tokens.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(t) => Err(self.fail(Cause::Unexpected(describe(&t)))),
                    None => Err(self.fail(Cause::MissingParen)),
                }
            }
            Some(t) => Err(self.fail(Cause::Unexpected(describe(&t)))),
            None => Err(self.fail(Cause::UnexpectedEnd)),
        }
    }

    fn name(&mut self, name: String) -> ParseResult {
        if name == VARIABLE {
            self.used(&name);
            return Ok(Node::X);
        }

        if let Some(c) = constant(&name) {
            self.used(&name);
            return Ok(Node::Num(c));
        }

        if Func::resolve(&name).is_some() {
            return Err(self.fail(Cause::UncalledFunction(name)));
        }

        let suggestion = suggest(&name);
        Err(self.fail(Cause::UnknownName { name, suggestion }))
    }

    /// The opening parenthesis has already been consumed with the function name.
    fn call(&mut self, name: String) -> ParseResult {
        let func = match Func::resolve(&name) {
            Some(f) => f,
            None if name == VARIABLE || constant(&name).is_some() => {
                return Err(self.fail(Cause::NotAFunction(name)))
            }
            None => {
                let suggestion = suggest(&name);
                return Err(self.fail(Cause::UnknownName { name, suggestion }));
            }
        };

        let mut args = Vec::new();
        if let Some(Token::RParen) = self.tokens.peek() {
            self.tokens.next();
        } else {
            loop {
                args.push(self.expr()?);
                match self.tokens.next() {
                    Some(Token::Comma) => continue,
                    Some(Token::RParen) => break,
                    Some(t) => return Err(self.fail(Cause::Unexpected(describe(&t)))),
                    None => return Err(self.fail(Cause::MissingParen)),
                }
            }
        }

        if args.len() != 1 {
            return Err(self.fail(Cause::Arity {
                name,
                found: args.len(),
            }));
        }

        self.used(&name);
        let arg = args.pop().map(Box::new).ok_or_else(|| self.fail(Cause::UnexpectedEnd))?;
        Ok(Node::Call(func, arg))
    }
}

#[allow(unreachable_patterns)]
fn describe(t: &Token) -> String {
    match t {
        Token::Binary(op) | Token::Unary(op) => format!("operator '{}'", symbol(op)),
        Token::LParen => "'('".into(),
        Token::RParen => "')'".into(),
        Token::Comma => "','".into(),
        Token::Number(n) => format!("number {n}"),
        Token::Var(n) => format!("name '{n}'"),
        Token::Func(n, _) => format!("call to '{n}'"),
        _ => "token".into(),
    }
}

#[allow(unreachable_patterns)]
fn symbol(op: &Operation) -> &'static str {
    match op {
        Operation::Plus => "+",
        Operation::Minus => "-",
        Operation::Times => "*",
        Operation::Div => "/",
        Operation::Rem => "%",
        Operation::Pow => "^",
        _ => "?",
    }
}
