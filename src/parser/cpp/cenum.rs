use crate::parser::cpp::comment::{CppComment, parse_comment};
use crate::parser::cpp::ctype::{CType, is_reserved, parse_cpp_type};
use crate::parser::cpp::declarator::parse_instances;
use crate::parser::{api_macro, balanced, identifier, keyword, scan_expression, skip_attributes, sp, ws};
use crate::types::{PResult, Parsable};
use nom::branch::alt;
use nom::{
    Parser,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, hex_digit1, multispace0, oct_digit1, space0},
    combinator::{all_consuming, cut, map, map_res, opt, peek, recognize, value, verify},
    error::context,
    multi::separated_list0,
    sequence::{preceded, terminated},
};
use serde::Serialize;

#[derive(Debug, Eq, PartialEq, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum EnumValue<'a> {
    Int(i64),
    /// Anything that is not a plain integer literal, e.g. `1 << 3` or `Red | Green`
    Expr(&'a str),
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize)]
pub struct EnumVariant<'a> {
    pub name: &'a str,
    pub value: Option<EnumValue<'a>>,
    pub comment: Option<CppComment>,
}

#[derive(Debug, Eq, PartialEq, Clone, Default, Serialize)]
pub struct CppEnum<'a> {
    pub name: Option<&'a str>,
    /// `enum class` / `enum struct`
    pub is_scoped: bool,
    #[serde(rename = "type")]
    pub ctype: Option<CType<'a>>,
    pub variants: Vec<EnumVariant<'a>>,
    pub is_forward_declaration: bool,
    pub instances: Vec<&'a str>,
    pub comment: Option<CppComment>,
}

impl<'a> Parsable<'a> for CppEnum<'a> {
    fn parse(input: &'a str) -> PResult<'a, Self> {
        parse_cpp_enum(input)
    }
}

fn variant_name(input: &str) -> PResult<&str> {
    verify(identifier, |word: &str| !is_reserved(word)).parse(input)
}

/// Integer literal in decimal, hex, octal or binary, with optional sign and suffixes.
fn int_literal(input: &str) -> PResult<i64> {
    let (input, negative) = opt(terminated(char('-'), space0)).parse(input)?;
    let (input, value) = alt((
        map_res(
            preceded(alt((tag("0x"), tag("0X"))), hex_digit1),
            |digits: &str| i64::from_str_radix(digits, 16),
        ),
        map_res(
            preceded(
                alt((tag("0b"), tag("0B"))),
                take_while1(|c: char| c == '0' || c == '1'),
            ),
            |digits: &str| i64::from_str_radix(digits, 2),
        ),
        map_res(recognize((char('0'), oct_digit1)), |digits: &str| {
            i64::from_str_radix(&digits[1..], 8)
        }),
        map_res(digit1, |digits: &str| digits.parse::<i64>()),
    ))
    .parse(input)?;
    let (input, _) = take_while(|c: char| matches!(c, 'u' | 'U' | 'l' | 'L')).parse(input)?;

    Ok((input, if negative.is_some() { -value } else { value }))
}

fn enum_value(expression: &str) -> EnumValue {
    let digits = expression.replace('\'', "");
    match all_consuming(int_literal).parse(digits.as_str()) {
        Ok((_, value)) => EnumValue::Int(value),
        Err(_) => EnumValue::Expr(expression),
    }
}

// Parse one enum variant: identifier [= value]
fn enum_variant(input: &str) -> PResult<EnumVariant> {
    let (input, _) = multispace0(input)?;
    let (input, comment) = opt(parse_comment).parse(input)?;
    let (input, _) = sp(input)?;
    let (input, name) = variant_name(input)?;
    // Reflection markup such as `UMETA(DisplayName = "Red")`
    let (input, _) = opt((sp, api_macro, sp, balanced('(', ')'))).parse(input)?;
    let (input, _) = preceded(sp, skip_attributes).parse(input)?;
    let (input, value) = opt(preceded(ws(char('=')), |i| {
        scan_expression(i, &[','], false)
    }))
    .parse(input)?;

    Ok((
        input,
        EnumVariant {
            name,
            value: value.map(enum_value),
            comment,
        },
    ))
}

/// Fills in implicit values: one more than the previous integer, starting at 0.
fn assign_values(variants: &mut [EnumVariant<'_>]) {
    let mut next = Some(0i64);
    for variant in variants {
        match variant.value {
            Some(EnumValue::Int(value)) => next = value.checked_add(1),
            Some(EnumValue::Expr(_)) => next = None,
            None => {
                variant.value = next.map(EnumValue::Int);
                next = next.and_then(|value| value.checked_add(1));
            }
        }
    }
}

// Parse comma separated list of variants (allow trailing comma)
fn enum_variants(input: &str) -> PResult<Vec<EnumVariant>> {
    let (input, mut variants) = separated_list0(
        terminated(preceded(sp, char(',')), multispace0),
        enum_variant,
    )
    .parse(input)?;

    let (input, _) = opt(preceded(sp, char(','))).parse(input)?; // optional trailing comma
    let (input, _) = sp(input)?;

    assign_values(&mut variants);
    Ok((input, variants))
}

/// Parses an enum definition or forward declaration, stopping before
/// trailing declarators and the `;`.
pub fn parse_enum_definition(input: &str) -> PResult<CppEnum> {
    let (input, _) = multispace0(input)?;
    let (input, comment) = opt(parse_comment).parse(input)?;
    let (input, _) = sp(input)?;
    let (input, _) = terminated(keyword("enum"), sp).parse(input)?;
    let (input, scoped) =
        opt(terminated(alt((keyword("class"), keyword("struct"))), sp)).parse(input)?;
    let (input, _) = skip_attributes(input)?;
    let (input, name) = opt(terminated(variant_name, sp)).parse(input)?;
    let (input, ctype) = opt(preceded(ws(char(':')), parse_cpp_type)).parse(input)?;

    let (input, variants) = alt((
        map(
            preceded(
                preceded(sp, char('{')),
                cut(context(
                    "enumerator",
                    terminated(enum_variants, char('}')),
                )),
            ),
            Some,
        ),
        value(None, peek(preceded(sp, char(';')))),
    ))
    .parse(input)?;

    Ok((
        input,
        CppEnum {
            name,
            is_scoped: scoped.is_some(),
            ctype,
            is_forward_declaration: variants.is_none(),
            variants: variants.unwrap_or_default(),
            instances: vec![],
            comment,
        },
    ))
}

// Parse the full enum
pub fn parse_cpp_enum(input: &str) -> PResult<CppEnum> {
    let (input, mut cenum) = parse_enum_definition(input)?;
    if !cenum.is_forward_declaration {
        let (rest, instances) = opt(parse_instances).parse(input)?;
        cenum.instances = instances.unwrap_or_default();
        let (rest, _) = cut(context("`;` after enum", preceded(sp, char(';')))).parse(rest)?;
        return Ok((rest, cenum));
    }
    let (input, _) = preceded(sp, char(';')).parse(input)?;

    Ok((input, cenum))
}
