use crate::parser::{identifier, ws};
use crate::types::{PResult, Parsable};
use nom::branch::alt;
use nom::bytes::complete::{tag, take_until};
use nom::character::complete::{char, space0};
use nom::combinator::opt;
use nom::multi::separated_list0;
use nom::sequence::{delimited, preceded};
use nom::Parser;
use serde::Serialize;

#[derive(Debug, Eq, PartialEq, Clone, Serialize)]
pub struct CppInclude<'a> {
    pub path: &'a str,
    /// `<...>` rather than `"..."`
    pub system: bool,
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize)]
pub struct CppDefine<'a> {
    pub name: &'a str,
    /// Present for function-like macros.
    pub params: Option<Vec<&'a str>>,
    pub value: Option<String>,
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub enum CppDirective<'a> {
    Include(CppInclude<'a>),
    Define(CppDefine<'a>),
    Pragma(&'a str),
    /// `#if`, `#ifdef`, `#endif`, `#undef`, ... kept verbatim
    Conditional(&'a str),
}

impl<'a> Parsable<'a> for CppDirective<'a> {
    fn parse(input: &'a str) -> PResult<'a, Self> {
        parse_directive(input)
    }
}

/// Splits off one logical directive line, following `\` continuations.
fn logical_line(input: &str) -> (&str, &str) {
    let mut end = 0;
    loop {
        match input[end..].find('\n') {
            Some(newline) => {
                let line = input[end..end + newline].trim_end_matches('\r');
                end += newline + 1;
                if !line.ends_with('\\') {
                    return (&input[end..], input[..end].trim_end());
                }
            }
            None => return ("", input.trim_end()),
        }
    }
}

fn strip_trailing_comment(text: &str) -> &str {
    let cut = [text.find("//"), text.find("/*")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(text.len());
    text[..cut].trim()
}

/// `None` for an `#include` without a target.
fn parse_include_target(body: &str) -> Option<CppInclude> {
    let body = strip_trailing_comment(body);
    if body.is_empty() {
        return None;
    }
    let quoted = |open: char, close: char| {
        body.strip_prefix(open)
            .and_then(|rest| rest.find(close).map(|end| &rest[..end]))
    };

    Some(if let Some(path) = quoted('"', '"') {
        CppInclude { path, system: false }
    } else if let Some(path) = quoted('<', '>') {
        CppInclude { path, system: true }
    } else {
        CppInclude { path: body, system: false }
    })
}

fn parse_define(body: &str) -> PResult<CppDefine> {
    let (rest, name) = preceded(space0, identifier).parse(body)?;
    let (rest, params) = opt(delimited(
        char('('),
        separated_list0(ws(char(',')), ws(alt((identifier, tag("..."))))),
        char(')'),
    ))
    .parse(rest)?;

    let value = rest
        .lines()
        .map(|line| line.trim().trim_end_matches('\\').trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let value = strip_trailing_comment(&value).to_string();

    Ok((
        "",
        CppDefine {
            name,
            params,
            value: (!value.is_empty()).then_some(value),
        },
    ))
}

pub fn parse_directive(input: &str) -> PResult<CppDirective> {
    let start = input;
    let (input, _) = (char('#'), space0).parse(input)?;
    let (input, name) = identifier(input)?;
    let (rest, body) = logical_line(input);

    let text = &start[..start.len() - rest.len()];
    let verbatim = || CppDirective::Conditional(strip_trailing_comment(text));
    let directive = match name {
        "include" | "include_next" | "import" => parse_include_target(body.trim())
            .map_or_else(verbatim, CppDirective::Include),
        "define" => CppDirective::Define(parse_define(body)?.1),
        "pragma" => CppDirective::Pragma(strip_trailing_comment(body)),
        _ => verbatim(),
    };

    Ok((rest, directive))
}

/// `#include "file.h"` or `#include <file>`
pub fn parse_include(input: &str) -> PResult<CppInclude> {
    let (input, directive) = parse_directive(input)?;
    match directive {
        CppDirective::Include(include) => Ok((input, include)),
        _ => Err(nom::Err::Error(nom::error::ParseError::from_error_kind(
            input,
            nom::error::ErrorKind::Tag,
        ))),
    }
}
