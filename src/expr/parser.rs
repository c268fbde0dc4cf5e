//! nom grammar for the built-in expression language.
//!
//! Each token parser skips leading whitespace, so the grammar rules
//! compose without explicit spacing. Precedence is encoded in the layering
//! of rules, loosest first: conditional, `or`, `and`, `not`, comparison,
//! additive, multiplicative, unary minus, postfix, atom.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::{char, digit1, multispace0};
use nom::combinator::{all_consuming, map, opt, recognize, value};
use nom::error::{Error, ErrorKind};
use nom::multi::{many0, separated_list0};
use nom::sequence::{delimited, pair, preceded, tuple};
use nom::IResult;

use super::{BinOp, Expr, UnaryOp};

const KEYWORDS: &[&str] = &[
    "if", "else", "and", "or", "not", "True", "true", "False", "false", "None", "none", "null",
];

/// Parses a complete expression.
pub(crate) fn parse(input: &str) -> Result<Expr, String> {
    match all_consuming(delimited(multispace0, expr, multispace0))(input) {
        Ok((_, parsed)) => Ok(parsed),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let at = e.input.chars().take(16).collect::<String>();
            if at.is_empty() {
                Err("unexpected end of input".to_string())
            } else {
                Err(format!("unexpected input near `{}`", at))
            }
        }
        Err(nom::Err::Incomplete(_)) => Err("incomplete input".to_string()),
    }
}

fn expr(input: &str) -> IResult<&str, Expr> {
    conditional(input)
}

fn conditional(input: &str) -> IResult<&str, Expr> {
    let (input, then) = or_expr(input)?;
    let (input, tail) = opt(tuple((
        preceded(multispace0, keyword("if")),
        or_expr,
        preceded(multispace0, keyword("else")),
        conditional,
    )))(input)?;
    match tail {
        Some((_, test, _, other)) => Ok((
            input,
            Expr::Cond {
                then: Box::new(then),
                test: Box::new(test),
                other: Box::new(other),
            },
        )),
        None => Ok((input, then)),
    }
}

fn or_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(preceded(multispace0, keyword("or")), and_expr))(input)?;
    Ok((input, fold_logic(BinOp::Or, first, rest)))
}

fn and_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = not_expr(input)?;
    let (input, rest) = many0(preceded(preceded(multispace0, keyword("and")), not_expr))(input)?;
    Ok((input, fold_logic(BinOp::And, first, rest)))
}

fn fold_logic(op: BinOp, first: Expr, rest: Vec<Expr>) -> Expr {
    rest.into_iter().fold(first, |acc, rhs| {
        Expr::Binary(op, Box::new(acc), Box::new(rhs))
    })
}

fn not_expr(input: &str) -> IResult<&str, Expr> {
    alt((
        map(
            preceded(preceded(multispace0, keyword("not")), not_expr),
            |inner| Expr::Unary(UnaryOp::Not, Box::new(inner)),
        ),
        comparison,
    ))(input)
}

fn comparison(input: &str) -> IResult<&str, Expr> {
    binary_chain(input, additive, cmp_op)
}

fn additive(input: &str) -> IResult<&str, Expr> {
    binary_chain(input, multiplicative, add_op)
}

fn multiplicative(input: &str) -> IResult<&str, Expr> {
    binary_chain(input, unary, mul_op)
}

fn binary_chain(
    input: &str,
    operand: fn(&str) -> IResult<&str, Expr>,
    operator: fn(&str) -> IResult<&str, BinOp>,
) -> IResult<&str, Expr> {
    let (input, first) = operand(input)?;
    let (input, rest) = many0(pair(operator, operand))(input)?;
    Ok((
        input,
        rest.into_iter().fold(first, |acc, (op, rhs)| {
            Expr::Binary(op, Box::new(acc), Box::new(rhs))
        }),
    ))
}

fn cmp_op(input: &str) -> IResult<&str, BinOp> {
    preceded(
        multispace0,
        alt((
            value(BinOp::Eq, tag("==")),
            value(BinOp::Ne, tag("!=")),
            value(BinOp::Le, tag("<=")),
            value(BinOp::Ge, tag(">=")),
            value(BinOp::Lt, char('<')),
            value(BinOp::Gt, char('>')),
        )),
    )(input)
}

fn add_op(input: &str) -> IResult<&str, BinOp> {
    preceded(
        multispace0,
        alt((value(BinOp::Add, char('+')), value(BinOp::Sub, char('-')))),
    )(input)
}

fn mul_op(input: &str) -> IResult<&str, BinOp> {
    preceded(
        multispace0,
        alt((
            value(BinOp::Mul, char('*')),
            value(BinOp::Div, char('/')),
            value(BinOp::Mod, char('%')),
        )),
    )(input)
}

fn unary(input: &str) -> IResult<&str, Expr> {
    alt((
        map(preceded(token('-'), unary), |inner| {
            Expr::Unary(UnaryOp::Neg, Box::new(inner))
        }),
        postfix,
    ))(input)
}

fn postfix(input: &str) -> IResult<&str, Expr> {
    let (mut input, mut base) = atom(input)?;
    loop {
        if let Ok((rest, _)) = token('[')(input) {
            let (rest, index) = expr(rest)?;
            let (rest, _) = token(']')(rest)?;
            base = Expr::Index(Box::new(base), Box::new(index));
            input = rest;
        } else if let Ok((rest, _)) = token('.')(input) {
            let (rest, member) = identifier(rest)?;
            base = Expr::Attr(Box::new(base), member.to_string());
            input = rest;
        } else {
            return Ok((input, base));
        }
    }
}

fn atom(input: &str) -> IResult<&str, Expr> {
    alt((literal, name, paren_or_tuple, list))(input)
}

fn literal(input: &str) -> IResult<&str, Expr> {
    alt((
        value(
            Expr::None,
            preceded(
                multispace0,
                alt((keyword("None"), keyword("none"), keyword("null"))),
            ),
        ),
        value(
            Expr::Bool(true),
            preceded(multispace0, alt((keyword("True"), keyword("true")))),
        ),
        value(
            Expr::Bool(false),
            preceded(multispace0, alt((keyword("False"), keyword("false")))),
        ),
        number,
        string_literal,
    ))(input)
}

fn number(input: &str) -> IResult<&str, Expr> {
    let (rest, text) = preceded(
        multispace0,
        recognize(pair(digit1, opt(pair(char('.'), digit1)))),
    )(input)?;
    if text.contains('.') {
        match text.parse::<f64>() {
            Ok(parsed) => Ok((rest, Expr::Float(parsed))),
            Err(_) => Err(nom::Err::Error(Error::new(input, ErrorKind::Float))),
        }
    } else {
        match text.parse::<i64>() {
            Ok(parsed) => Ok((rest, Expr::Int(parsed))),
            Err(_) => Err(nom::Err::Error(Error::new(input, ErrorKind::Digit))),
        }
    }
}

fn string_literal(input: &str) -> IResult<&str, Expr> {
    preceded(multispace0, alt((quoted('\''), quoted('"'))))(input)
}

/// Quoted string with `\n`, `\t`, and pass-through escapes.
fn quoted(quote: char) -> impl Fn(&str) -> IResult<&str, Expr> {
    move |outer| {
        let (input, _) = char(quote)(outer)?;
        let mut text = String::new();
        let mut chars = input.char_indices();
        loop {
            match chars.next() {
                Some((i, c)) if c == quote => {
                    return Ok((&input[i + c.len_utf8()..], Expr::Str(text)));
                }
                Some((_, '\\')) => match chars.next() {
                    Some((_, 'n')) => text.push('\n'),
                    Some((_, 't')) => text.push('\t'),
                    Some((_, escaped)) => text.push(escaped),
                    None => return Err(nom::Err::Error(Error::new(outer, ErrorKind::Char))),
                },
                Some((_, c)) => text.push(c),
                None => return Err(nom::Err::Error(Error::new(outer, ErrorKind::Char))),
            }
        }
    }
}

fn name(input: &str) -> IResult<&str, Expr> {
    let (rest, id) = identifier(input)?;
    if KEYWORDS.contains(&id) {
        Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)))
    } else {
        Ok((rest, Expr::Name(id.to_string())))
    }
}

fn paren_or_tuple(input: &str) -> IResult<&str, Expr> {
    let (input, _) = token('(')(input)?;
    if let Ok((rest, _)) = token(')')(input) {
        return Ok((rest, Expr::Tuple(Vec::new())));
    }
    let (input, first) = expr(input)?;
    let (input, mut rest_items) = many0(preceded(token(','), expr))(input)?;
    let (input, trailing) = opt(token(','))(input)?;
    let (input, _) = token(')')(input)?;
    if rest_items.is_empty() && trailing.is_none() {
        Ok((input, first))
    } else {
        let mut items = vec![first];
        items.append(&mut rest_items);
        Ok((input, Expr::Tuple(items)))
    }
}

fn list(input: &str) -> IResult<&str, Expr> {
    let (input, _) = token('[')(input)?;
    let (input, items) = separated_list0(token(','), expr)(input)?;
    let (input, _) = opt(token(','))(input)?;
    let (input, _) = token(']')(input)?;
    Ok((input, Expr::List(items)))
}

fn identifier(input: &str) -> IResult<&str, &str> {
    preceded(
        multispace0,
        recognize(pair(
            take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
            take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        )),
    )(input)
}

fn keyword(expected: &'static str) -> impl Fn(&str) -> IResult<&str, &str> {
    move |input| {
        let (rest, id) = recognize(pair(
            take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
            take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        ))(input)?;
        if id == expected {
            Ok((rest, id))
        } else {
            Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)))
        }
    }
}

fn token(expected: char) -> impl Fn(&str) -> IResult<&str, char> {
    move |input| preceded(multispace0, char(expected))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_of_arithmetic() {
        let parsed = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            parsed,
            Expr::Binary(
                BinOp::Add,
                Box::new(Expr::Int(1)),
                Box::new(Expr::Binary(
                    BinOp::Mul,
                    Box::new(Expr::Int(2)),
                    Box::new(Expr::Int(3)),
                )),
            ),
        );
    }

    #[test]
    fn test_grouping_is_not_a_tuple() {
        assert_eq!(parse("(1)").unwrap(), Expr::Int(1));
        assert_eq!(
            parse("(1,)").unwrap(),
            Expr::Tuple(vec![Expr::Int(1)]),
        );
        assert_eq!(parse("()").unwrap(), Expr::Tuple(Vec::new()));
    }

    #[test]
    fn test_conditional_spans_tuples() {
        let parsed = parse("(a, a + 1) if a < 10 else (a, None)").unwrap();
        let Expr::Cond { test, .. } = parsed else {
            panic!("expected a conditional");
        };
        assert_eq!(
            *test,
            Expr::Binary(
                BinOp::Lt,
                Box::new(Expr::Name("a".to_string())),
                Box::new(Expr::Int(10)),
            ),
        );
    }

    #[test]
    fn test_keywords_are_not_names() {
        assert_eq!(parse("None").unwrap(), Expr::None);
        assert_eq!(parse("True").unwrap(), Expr::Bool(true));
        // `notx` is an ordinary name, not `not x`.
        assert_eq!(parse("notx").unwrap(), Expr::Name("notx".to_string()));
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            parse(r"'a\nb'").unwrap(),
            Expr::Str("a\nb".to_string()),
        );
        assert_eq!(parse("\"it's\"").unwrap(), Expr::Str("it's".to_string()));
    }

    #[test]
    fn test_postfix_chains() {
        let parsed = parse("m[0].len").unwrap();
        assert_eq!(
            parsed,
            Expr::Attr(
                Box::new(Expr::Index(
                    Box::new(Expr::Name("m".to_string())),
                    Box::new(Expr::Int(0)),
                )),
                "len".to_string(),
            ),
        );
    }

    #[test]
    fn test_trailing_input_is_rejected() {
        assert!(parse("1 +").is_err());
        assert!(parse("(1, 2").is_err());
    }
}
