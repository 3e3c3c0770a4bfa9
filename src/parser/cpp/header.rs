use crate::parser::cpp::namespace::{CppScope, parse_scope};
use crate::parser::cpp::preprocessor::{CppDefine, CppInclude};
use crate::types::{PResult, Parsable};
use serde::Serialize;

/// Everything declared in one header file.
#[derive(Debug, Eq, PartialEq, Clone, Default, Serialize)]
pub struct CppHeader<'a> {
    pub includes: Vec<CppInclude<'a>>,
    pub defines: Vec<CppDefine<'a>>,
    pub pragmas: Vec<&'a str>,
    pub conditionals: Vec<&'a str>,
    #[serde(flatten)]
    pub scope: CppScope<'a>,
}

impl<'a> Parsable<'a> for CppHeader<'a> {
    fn parse(input: &'a str) -> PResult<'a, Self> {
        parse_cpp_header(input)
    }
}

pub fn parse_cpp_header(input: &str) -> PResult<CppHeader> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let (input, mut scope) = parse_scope(input, false)?;

    Ok((
        input,
        CppHeader {
            includes: std::mem::take(&mut scope.includes),
            defines: std::mem::take(&mut scope.defines),
            pragmas: std::mem::take(&mut scope.pragmas),
            conditionals: std::mem::take(&mut scope.conditionals),
            scope,
        },
    ))
}
