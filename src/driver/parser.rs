use miette::SourceSpan;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, tag_no_case},
    character::complete::{alpha1, alphanumeric1, char, digit1, hex_digit1, multispace1, not_line_ending, one_of},
    combinator::{cut, map, opt, recognize, value},
    error::{context, VerboseError, VerboseErrorKind},
    multi::{many0, many1, separated_list0},
    sequence::{pair, preceded, tuple},
};
use std::cell::Cell;
use std::ops::Range;
use std::sync::Arc;

type PResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Deepest nesting of calls and `{}` bodies a script may use. Resolution and
/// evaluation recurse along the same path.
pub const MAX_NESTING: usize = 128;

const TOO_DEEP: &str = "nesting limit";

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Call {
        name: String,
        name_span: Range<usize>,
        args: Vec<Expr>,
    },
    /// `{ body }`, evaluated each time the resulting function is forced.
    Thunk(Arc<Expr>),
    Int(i128),
    Text(String),
    Tag(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub exprs: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub label: String,
    pub span: SourceSpan,
    pub help: Option<String>,
}

pub fn parse(source: &str) -> Result<Script, ParseError> {
    let parser = Parser {
        source,
        depth: Cell::new(0),
    };
    match parser.script(source) {
        Ok((_, exprs)) => Ok(Script { exprs }),
        Err(nom::Err::Error(error)) | Err(nom::Err::Failure(error)) => {
            Err(parser.convert_error(error))
        }
        Err(nom::Err::Incomplete(_)) => Err(ParseError {
            message: "unexpected end of input".into(),
            label: "input ends here".into(),
            span: (source.len(), 0).into(),
            help: None,
        }),
    }
}

struct Parser<'a> {
    source: &'a str,
    depth: Cell<usize>,
}

impl<'a> Parser<'a> {
    fn offset(&self, input: &str) -> usize {
        self.source.len() - input.len()
    }

    fn script(&self, input: &'a str) -> PResult<'a, Vec<Expr>> {
        let mut exprs = Vec::new();
        let (mut rest, _) = separators(input)?;
        while !rest.is_empty() {
            let (after, expr) = self.expr(rest)?;
            exprs.push(expr);
            let (after, _) = separators(after)?;
            rest = after;
        }
        Ok((rest, exprs))
    }

    fn expr(&self, input: &'a str) -> PResult<'a, Expr> {
        let depth = self.depth.get();
        if depth >= MAX_NESTING {
            return Err(nom::Err::Failure(VerboseError {
                errors: vec![(input, VerboseErrorKind::Context(TOO_DEEP))],
            }));
        }
        self.depth.set(depth + 1);
        let result = self.nested_expr(input);
        self.depth.set(depth);
        result
    }

    fn nested_expr(&self, input: &'a str) -> PResult<'a, Expr> {
        let start = self.offset(input);
        let (rest, kind) = context(
            "an expression",
            alt((
                |i: &'a str| self.thunk(i),
                text,
                int,
                |i: &'a str| self.call_or_tag(i),
            )),
        )(input)?;
        Ok((
            rest,
            Expr {
                kind,
                span: start..self.offset(rest),
            },
        ))
    }

    fn thunk(&self, input: &'a str) -> PResult<'a, ExprKind> {
        let (rest, _) = pair(char('{'), ws)(input)?;
        let (rest, body) = cut(|i: &'a str| self.expr(i))(rest)?;
        let (rest, _) = ws(rest)?;
        let (rest, _) = context("`}` to close the function", cut(char('}')))(rest)?;
        Ok((rest, ExprKind::Thunk(Arc::new(body))))
    }

    fn call_or_tag(&self, input: &'a str) -> PResult<'a, ExprKind> {
        let start = self.offset(input);
        let (rest, name) = identifier(input)?;
        if name.starts_with(|c: char| c.is_ascii_uppercase()) {
            return Ok((rest, ExprKind::Tag(name.to_string())));
        }
        let name_span = start..self.offset(rest);
        let (rest, _) = ws(rest)?;
        let (rest, _) = context("`(` after the function name", cut(char('(')))(rest)?;
        let (rest, _) = ws(rest)?;
        let (rest, args) = separated_list0(tuple((ws, char(','), ws)), |i: &'a str| self.expr(i))(rest)?;
        let (rest, _) = ws(rest)?;
        let (rest, _) = context("`)` to close the argument list", cut(char(')')))(rest)?;
        Ok((
            rest,
            ExprKind::Call {
                name: name.to_string(),
                name_span,
                args,
            },
        ))
    }

    fn convert_error(&self, error: VerboseError<&'a str>) -> ParseError {
        let at = error
            .errors
            .first()
            .map(|(input, _)| self.offset(input))
            .unwrap_or(self.source.len());
        if let Some((_, VerboseErrorKind::Context(TOO_DEEP))) = error.errors.first() {
            return ParseError {
                message: format!("expressions are nested more than {MAX_NESTING} levels deep"),
                label: "nesting limit reached here".into(),
                span: (at, 0).into(),
                help: Some("split the expression into separate statements".into()),
            };
        }
        let context = error.errors.iter().find_map(|(_, kind)| match kind {
            VerboseErrorKind::Context(what) => Some(what.to_string()),
            _ => None,
        });
        let expected = context.or_else(|| {
            error.errors.iter().find_map(|(_, kind)| match kind {
                VerboseErrorKind::Char(c) => Some(format!("`{c}`")),
                _ => None,
            })
        });
        let found = self.source[at..].chars().next();
        let label = match found {
            Some(c) => format!("unexpected `{}`", c.escape_default()),
            None => "input ends here".to_string(),
        };
        let width = found.map_or(0, char::len_utf8);
        let help = (found == Some('('))
            .then(|| "tags cannot be called; function names start lowercase".to_string());
        ParseError {
            message: match expected {
                Some(expected) => format!("expected {expected}"),
                None => "unexpected input".to_string(),
            },
            label,
            span: (at, width).into(),
            help,
        }
    }
}

fn ws(input: &str) -> PResult<'_, ()> {
    value(
        (),
        many0(alt((multispace1, recognize(pair(char('#'), not_line_ending))))),
    )(input)
}

fn separators(input: &str) -> PResult<'_, ()> {
    let (rest, _) = ws(input)?;
    value((), many0(pair(char(';'), ws)))(rest)
}

fn identifier(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn int(input: &str) -> PResult<'_, ExprKind> {
    let (rest, sign) = opt(char('-'))(input)?;
    let (rest, (radix, digits)) = alt((
        map(
            preceded(
                tag_no_case("0x"),
                context("hexadecimal digits", cut(recognize(many1(alt((hex_digit1, tag("_"))))))),
            ),
            |digits| (16, digits),
        ),
        map(
            preceded(
                tag_no_case("0b"),
                context("binary digits", cut(recognize(many1(one_of("01_"))))),
            ),
            |digits| (2, digits),
        ),
        map(
            recognize(pair(digit1, many0(alt((digit1, tag("_")))))),
            |digits| (10, digits),
        ),
    ))(rest)?;
    let mut literal: String = digits.chars().filter(|c| *c != '_').collect();
    if sign.is_some() {
        literal.insert(0, '-');
    }
    match i128::from_str_radix(&literal, radix) {
        Ok(value) => Ok((rest, ExprKind::Int(value))),
        Err(_) => Err(nom::Err::Failure(VerboseError {
            errors: vec![(
                input,
                VerboseErrorKind::Context("an integer that fits in 128 bits"),
            )],
        })),
    }
}

fn text(input: &str) -> PResult<'_, ExprKind> {
    let (rest, _) = char('"')(input)?;
    let (rest, content) = opt(escaped_transform(
        is_not("\\\""),
        '\\',
        context(
            "an escape sequence (\\n, \\t, \\\\, \\\", \\0)",
            cut(alt((
                value("\n", char('n')),
                value("\t", char('t')),
                value("\\", char('\\')),
                value("\"", char('"')),
                value("\0", char('0')),
            ))),
        ),
    ))(rest)?;
    let (rest, _) = context("a closing `\"`", cut(char('"')))(rest)?;
    Ok((rest, ExprKind::Text(content.unwrap_or_default())))
}
