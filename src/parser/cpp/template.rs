use crate::parser::cpp::ctype::{CType, parse_cpp_type};
use crate::parser::{identifier, keyword, scan_expression, sp, ws};
use crate::types::PResult;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::char;
use nom::combinator::opt;
use nom::multi::separated_list0;
use nom::sequence::{delimited, preceded, terminated};
use nom::Parser;
use serde::Serialize;

/// One parameter of a `template<...>` head.
#[derive(Debug, Eq, PartialEq, Clone, Default, Serialize)]
pub struct CppTemplateParam<'a> {
    pub name: Option<&'a str>,
    /// Set for non-type parameters such as `int N`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ctype: Option<CType<'a>>,
    pub default_value: Option<&'a str>,
    pub variadic: bool,
}

fn default_argument(input: &str) -> PResult<&str> {
    preceded(ws(char('=')), |i| scan_expression(i, &[','], true)).parse(input)
}

fn parse_type_param(input: &str) -> PResult<CppTemplateParam> {
    let (input, _) = opt(terminated(parse_template, sp)).parse(input)?;
    let (input, _) = alt((keyword("typename"), keyword("class"))).parse(input)?;
    let (input, variadic) = opt(preceded(sp, tag("..."))).parse(input)?;
    let (input, name) = opt(preceded(sp, identifier)).parse(input)?;
    let (input, default_value) = opt(default_argument).parse(input)?;

    Ok((
        input,
        CppTemplateParam {
            name,
            ctype: None,
            default_value,
            variadic: variadic.is_some(),
        },
    ))
}

fn parse_value_param(input: &str) -> PResult<CppTemplateParam> {
    let (input, ctype) = parse_cpp_type(input)?;
    let (input, name) = opt(preceded(sp, identifier)).parse(input)?;
    let (input, default_value) = opt(default_argument).parse(input)?;

    Ok((
        input,
        CppTemplateParam {
            name,
            variadic: matches!(ctype, CType::Pack(_)),
            ctype: Some(ctype),
            default_value,
        },
    ))
}

pub fn parse_template(input: &str) -> PResult<Vec<CppTemplateParam>> {
    let (input, _) = terminated(keyword("template"), sp).parse(input)?;
    let (input, params) = delimited(
        char('<'),
        separated_list0(ws(char(',')), ws(alt((parse_type_param, parse_value_param)))),
        preceded(sp, char('>')),
    )
    .parse(input)?;
    let (input, _) = sp(input)?;

    Ok((input, params))
}
