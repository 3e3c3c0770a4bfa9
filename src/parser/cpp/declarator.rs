use crate::parser::cpp::ctype::{CType, is_reserved, parse_type_suffixes};
use crate::parser::cpp::method::parse_method_params;
use crate::parser::{balanced, identifier, inner, is_api_macro, scan_expression, sp, ws};
use crate::types::PResult;
use nom::branch::alt;
use nom::character::complete::char;
use nom::combinator::{map, opt, verify};
use nom::error::{ErrorKind, ParseError};
use nom::multi::{many0, separated_list1};
use nom::sequence::{delimited, preceded, terminated};
use nom::Parser;
use nom_language::error::VerboseError;

/// The part of a declaration that follows the shared type: `*name[4] = {...}`.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct Declarator<'a> {
    pub name: Option<&'a str>,
    pub ctype: CType<'a>,
    pub bitfield: Option<&'a str>,
    pub default_value: Option<&'a str>,
}

fn declarator_name(input: &str) -> PResult<&str> {
    verify(identifier, |word: &str| !is_reserved(word)).parse(input)
}

/// `(*name)(params)`, also with a calling convention such as `(__stdcall *name)`
/// or an array of pointers such as `(*handlers[4])(int)`.
fn function_pointer<'a>(input: &'a str, ret: &CType<'a>) -> PResult<'a, (Option<&'a str>, CType<'a>)> {
    let (input, _) = (sp, char('('), sp).parse(input)?;
    let (input, _) = opt(terminated(
        verify(identifier, |word: &str| word.starts_with("__") || is_api_macro(word)),
        sp,
    ))
    .parse(input)?;
    let (input, pointer) = alt((char('*'), char('&'))).parse(input)?;
    let (input, name) = opt(preceded(sp, declarator_name)).parse(input)?;
    let (input, dimensions) = many0(preceded(sp, array_dimension)).parse(input)?;
    let (input, _) = preceded(sp, char(')')).parse(input)?;
    let (input, (params, variadic)) = preceded(sp, parse_method_params).parse(input)?;

    let mut param_types = params.into_iter().map(|param| param.ctype).collect::<Vec<_>>();
    if variadic {
        param_types.push(CType::Value("..."));
    }
    let function = Box::new(CType::Function(Box::new(ret.clone()), param_types));
    let ctype = match pointer {
        '*' => CType::Pointer(function),
        _ => CType::Reference(function),
    };
    let ctype = dimensions
        .into_iter()
        .fold(ctype, |ctype, size| CType::Array(Box::new(ctype), size));

    Ok((input, (name, ctype)))
}

fn array_dimension(input: &str) -> PResult<Option<&str>> {
    delimited(
        char('['),
        opt(|i| scan_expression(i, &[], false)),
        preceded(sp, char(']')),
    )
    .parse(input)
}

fn initializer(input: &str) -> PResult<&str> {
    alt((
        preceded(ws(char('=')), |i| scan_expression(i, &[','], false)),
        map(preceded(sp, balanced('{', '}')), inner),
        map(preceded(sp, balanced('(', ')')), inner),
    ))
    .parse(input)
}

/// Parses one declarator on top of `base`. A declarator without a name is
/// accepted only when `named` is false (parameters, abstract types).
pub fn parse_declarator<'a>(
    input: &'a str,
    base: &CType<'a>,
    named: bool,
) -> PResult<'a, Declarator<'a>> {
    let (input, ctype) = parse_type_suffixes(input, base.clone())?;
    let (input, (name, ctype)) = alt((
        |i| function_pointer(i, &ctype),
        map(opt(preceded(sp, declarator_name)), |name| (name, ctype.clone())),
    ))
    .parse(input)?;

    if named && name.is_none() {
        return Err(nom::Err::Error(VerboseError::from_error_kind(
            input,
            ErrorKind::Alpha,
        )));
    }

    // `int Fn(int)` declares a function type
    let (input, params) = opt(preceded(sp, parse_method_params)).parse(input)?;
    let ctype = match params {
        Some((params, _)) => CType::Function(
            Box::new(ctype),
            params.into_iter().map(|param| param.ctype).collect(),
        ),
        None => ctype,
    };

    let (input, dimensions) = many0(preceded(sp, array_dimension)).parse(input)?;
    let ctype = dimensions
        .into_iter()
        .fold(ctype, |ctype, size| CType::Array(Box::new(ctype), size));

    let (input, bitfield) = opt(preceded(ws(char(':')), |i| {
        scan_expression(i, &[',', ';'], false)
    }))
    .parse(input)?;
    let (input, default_value) = opt(initializer).parse(input)?;

    Ok((
        input,
        Declarator {
            name,
            ctype,
            bitfield,
            default_value,
        },
    ))
}

/// Declarators that follow a type definition: `struct { ... } first, *second;`
pub fn parse_instances(input: &str) -> PResult<Vec<&str>> {
    let placeholder = CType::Path(vec![]);
    let (input, declarators) = separated_list1(ws(char(',')), |i| {
        preceded(sp, |i| parse_declarator(i, &placeholder, true)).parse(i)
    })
    .parse(input)?;

    Ok((
        input,
        declarators.into_iter().filter_map(|d| d.name).collect(),
    ))
}
