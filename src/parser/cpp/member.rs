use crate::parser::cpp::comment::{CppComment, parse_comment};
use crate::parser::cpp::ctype::{CType, parse_qualified_type};
use crate::parser::cpp::declarator::{Declarator, parse_declarator};
use crate::parser::cpp::template::parse_template;
use crate::parser::{identifier, keyword, skip_attributes, sp, ws};
use crate::types::PResult;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, multispace0};
use nom::combinator::{map, map_res, opt, value};
use nom::error::{ErrorKind, ParseError};
use nom::multi::many0;
use nom::sequence::{preceded, terminated};
use nom::Parser;
use nom_language::error::VerboseError;
use serde::Serialize;
use std::str::FromStr;

/// A data member of a class, or a variable at namespace scope.
#[derive(Debug, Eq, PartialEq, Clone, Default, Serialize)]
pub struct CppMember<'a> {
    /// Empty for unnamed bit-fields
    pub name: &'a str,
    #[serde(rename = "type")]
    pub ctype: CType<'a>,
    pub default_value: Option<&'a str>,
    pub bitfield: Option<&'a str>,
    pub modifiers: Vec<CppMemberModifier>,
    pub comment: Option<CppComment>,
}

#[derive(Debug, Eq, PartialEq, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CppMemberModifier {
    Static,
    Inline,
    Constexpr,
    Mutable,
    Extern,
    ThreadLocal,
}

impl FromStr for CppMemberModifier {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "static" => Ok(CppMemberModifier::Static),
            "inline" => Ok(CppMemberModifier::Inline),
            "constexpr" | "constinit" => Ok(CppMemberModifier::Constexpr),
            "mutable" => Ok(CppMemberModifier::Mutable),
            "extern" => Ok(CppMemberModifier::Extern),
            "thread_local" => Ok(CppMemberModifier::ThreadLocal),
            other => Err(format!("`{other}` is not a member modifier")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Specifier {
    Modifier(CppMemberModifier),
    Const,
    Volatile,
}

fn specifier(input: &str) -> PResult<Specifier> {
    terminated(
        alt((
            value(Specifier::Const, keyword("const")),
            value(Specifier::Volatile, keyword("volatile")),
            value(
                Specifier::Modifier(CppMemberModifier::Extern),
                (keyword("extern"), opt(preceded(sp, tag("\"C\"")))),
            ),
            map(
                map_res(identifier, |word: &str| word.parse::<CppMemberModifier>()),
                Specifier::Modifier,
            ),
        )),
        sp,
    )
    .parse(input)
}

fn into_member<'a>(
    declarator: Declarator<'a>,
    modifiers: &[CppMemberModifier],
    comment: &Option<CppComment>,
) -> CppMember<'a> {
    CppMember {
        name: declarator.name.unwrap_or_default(),
        ctype: declarator.ctype,
        default_value: declarator.default_value,
        bitfield: declarator.bitfield,
        modifiers: modifiers.to_vec(),
        comment: comment.clone(),
    }
}

/// Parses one declaration statement, which may declare several members:
/// `static const int a = 1, *b;`
pub fn parse_cpp_members(input: &str) -> PResult<Vec<CppMember>> {
    let (input, _) = multispace0(input)?;
    let (input, comment) = opt(parse_comment).parse(input)?;
    let (input, _) = sp(input)?;
    let (input, _) = opt(parse_template).parse(input)?;
    let (input, _) = skip_attributes(input)?;
    let (input, specifiers) = many0(specifier).parse(input)?;

    let leading_const = specifiers.iter().any(|s| matches!(s, Specifier::Const));
    let modifiers = specifiers
        .iter()
        .filter_map(|s| match s {
            Specifier::Modifier(modifier) => Some(*modifier),
            _ => None,
        })
        .collect::<Vec<_>>();

    let (input, ctype) = parse_qualified_type(input, leading_const)?;
    let (input, first) = parse_declarator(input, &ctype, false)?;
    if first.name.is_none() && first.bitfield.is_none() {
        return Err(nom::Err::Error(VerboseError::from_error_kind(
            input,
            ErrorKind::Alpha,
        )));
    }

    let base = ctype.declared_base();
    let (input, others) = many0(preceded(ws(char(',')), |i| {
        parse_declarator(i, &base, false)
    }))
    .parse(input)?;
    let (input, _) = preceded(sp, char(';')).parse(input)?;

    let members = std::iter::once(first)
        .chain(others)
        .map(|declarator| into_member(declarator, &modifiers, &comment))
        .collect();

    Ok((input, members))
}
