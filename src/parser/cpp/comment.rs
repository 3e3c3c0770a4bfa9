use crate::types::{PResult, Parsable};
use nom::branch::alt;
use nom::bytes::complete::{tag, take_until};
use nom::character::complete::{line_ending, multispace0, not_line_ending};
use nom::combinator::opt;
use nom::multi::many1;
use nom::sequence::{delimited, preceded, terminated};
use nom::Parser;
use serde::Serialize;

/// Documentation text collected from `//`, `///` and `/* */` comments.
#[derive(Debug, Eq, PartialEq, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct CppComment {
    pub comment: String,
}

impl From<String> for CppComment {
    fn from(s: String) -> Self {
        CppComment { comment: s }
    }
}

impl<'a> Parsable<'a> for CppComment {
    fn parse(input: &'a str) -> PResult<'a, Self> {
        parse_comment(input)
    }
}

pub fn parse_comment(input: &str) -> PResult<CppComment> {
    let (input, lines) = alt((
        many1(preceded(multispace0, parse_one_line_comment)),
        parse_multiline_comment,
    ))
    .parse(input)?;

    Ok((input, CppComment::from(lines.join("\n"))))
}

/// Parses comments that starts with // or ///
fn parse_one_line_comment(input: &str) -> PResult<&str> {
    let (input, line) = preceded(
        alt((tag("///"), tag("//!"), tag("//"))),
        terminated(not_line_ending, opt(line_ending)),
    )
    .parse(input)?;

    Ok((input, strip_indent(line)))
}

fn parse_multiline_comment(input: &str) -> PResult<Vec<&str>> {
    let (input, lines) = delimited(tag("/*"), take_until("*/"), tag("*/")).parse(input)?;

    let stripped_content = lines
        .lines()
        .map(strip_indent)
        .filter(|line| !line.is_empty())
        .collect::<Vec<&str>>();

    Ok((input, stripped_content))
}

fn strip_indent(input: &str) -> &str {
    // Remove leading whitespace, tab characters before the '*' character
    input
        .trim_start_matches(|c: char| c.is_whitespace() || c == '*' || c == '/' || c == '!')
        .trim_start_matches('<')
        .trim()
}
