use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, anychar, digit1, one_of},
    combinator::{map, recognize},
    multi::many0,
    sequence::pair,
    IResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Word,
    Number,
    Currency,
    Punct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawToken<'a> {
    pub text: &'a str,
    pub shape: Shape,
    pub start: usize,
}

impl<'a> RawToken<'a> {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

fn currency(i: &str) -> IResult<&str, &str> {
    alt((tag("US$"), tag("$"), tag("€"), tag("£"), tag("¥")))(i)
}

// Keeps separators only when digits follow, so "1.2.3" stays one token and
// a sentence-final period does not.
fn number(i: &str) -> IResult<&str, &str> {
    recognize(pair(digit1, many0(pair(one_of(",."), digit1))))(i)
}

fn word(i: &str) -> IResult<&str, &str> {
    recognize(pair(alpha1, many0(pair(one_of("'-"), alpha1))))(i)
}

fn token(i: &str) -> IResult<&str, (Shape, &str)> {
    alt((
        map(currency, |t| (Shape::Currency, t)),
        map(number, |t| (Shape::Number, t)),
        map(word, |t| (Shape::Word, t)),
        map(recognize(anychar), |t| (Shape::Punct, t)),
    ))(i)
}

pub fn tokenize(text: &str) -> Vec<RawToken<'_>> {
    let mut tokens = Vec::new();
    let mut rest = text.trim_start();

    while !rest.is_empty() {
        match token(rest) {
            Ok((remaining, (shape, matched))) => {
                tokens.push(RawToken {
                    text: matched,
                    shape,
                    start: text.len() - rest.len(),
                });
                rest = remaining.trim_start();
            }
            Err(_) => break,
        }
    }

    tokens
}
