use crate::parser::{Nesting, balanced, identifier, keyword, scan_expression, sp, ws};
use crate::types::{PResult, Parsable};
use nom::{
    Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, multispace1, one_of},
    combinator::{map, opt, peek, recognize, verify},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, preceded, terminated},
};
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Eq, PartialEq, Clone)]
pub enum CType<'a> {
    /// `int`, `unsigned long`, `std::string`; a leading empty segment marks `::global`
    Path(Vec<&'a str>),
    Generic(Box<CType<'a>>, Vec<CType<'a>>),
    /// `std::vector<int>::iterator`
    Scoped(Box<CType<'a>>, Box<CType<'a>>),
    Pointer(Box<CType<'a>>),
    Reference(Box<CType<'a>>),
    Const(Box<CType<'a>>),
    Function(Box<CType<'a>>, Vec<CType<'a>>),
    Array(Box<CType<'a>>, Option<&'a str>),
    Pack(Box<CType<'a>>),
    /// Non-type template argument such as `4` or `sizeof(T)`
    Value(&'a str),
}

impl Default for CType<'_> {
    fn default() -> Self {
        CType::Path(vec!["void"])
    }
}

impl<'a> CType<'a> {
    /// The type shared by all declarators of one declaration: `int* a, b` declares `b` as `int`.
    pub fn declared_base(&self) -> CType<'a> {
        match self {
            CType::Pointer(inner) | CType::Reference(inner) | CType::Array(inner, _) => {
                inner.declared_base()
            }
            CType::Const(inner) if matches!(**inner, CType::Pointer(_) | CType::Reference(_)) => {
                inner.declared_base()
            }
            other => other.clone(),
        }
    }

    /// Substitutes `base` for the empty path used while an anonymous type has no name yet.
    pub fn rebase(self, base: &CType<'a>) -> CType<'a> {
        match self {
            CType::Path(segments) if segments.is_empty() => base.clone(),
            CType::Pointer(inner) => CType::Pointer(Box::new(inner.rebase(base))),
            CType::Reference(inner) => CType::Reference(Box::new(inner.rebase(base))),
            CType::Const(inner) => CType::Const(Box::new(inner.rebase(base))),
            CType::Pack(inner) => CType::Pack(Box::new(inner.rebase(base))),
            CType::Array(inner, size) => CType::Array(Box::new(inner.rebase(base)), size),
            CType::Function(ret, params) => CType::Function(Box::new(ret.rebase(base)), params),
            other => other,
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, types: &[CType<'_>]) -> fmt::Result {
    for (i, ctype) in types.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{ctype}")?;
    }
    Ok(())
}

impl fmt::Display for CType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CType::Path(segments) => f.write_str(&segments.join("::")),
            CType::Generic(base, args) => {
                write!(f, "{base}<")?;
                write_list(f, args)?;
                f.write_str(">")
            }
            CType::Scoped(outer, inner) => write!(f, "{outer}::{inner}"),
            CType::Pointer(inner) => match inner.as_ref() {
                CType::Function(ret, params) => {
                    write!(f, "{ret}(*)(")?;
                    write_list(f, params)?;
                    f.write_str(")")
                }
                _ => write!(f, "{inner}*"),
            },
            CType::Reference(inner) => match inner.as_ref() {
                CType::Function(ret, params) => {
                    write!(f, "{ret}(&)(")?;
                    write_list(f, params)?;
                    f.write_str(")")
                }
                _ => write!(f, "{inner}&"),
            },
            CType::Const(inner) => match inner.as_ref() {
                CType::Pointer(_) | CType::Reference(_) => write!(f, "{inner} const"),
                _ => write!(f, "const {inner}"),
            },
            CType::Function(ret, params) => {
                write!(f, "{ret}(")?;
                write_list(f, params)?;
                f.write_str(")")
            }
            CType::Array(inner, size) => write!(f, "{inner}[{}]", size.unwrap_or("")),
            CType::Pack(inner) => write!(f, "{inner}..."),
            CType::Value(value) => f.write_str(value),
        }
    }
}

impl Serialize for CType<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'a> Parsable<'a> for CType<'a> {
    fn parse(input: &'a str) -> PResult<'a, Self> {
        parse_cpp_type(input)
    }
}

const RESERVED: &[&str] = &[
    "const",
    "volatile",
    "static",
    "inline",
    "virtual",
    "explicit",
    "friend",
    "typedef",
    "using",
    "namespace",
    "template",
    "typename",
    "operator",
    "extern",
    "constexpr",
    "consteval",
    "constinit",
    "mutable",
    "register",
    "thread_local",
    "public",
    "private",
    "protected",
    "return",
    "enum",
    "class",
    "struct",
    "union",
    "noexcept",
    "decltype",
    "sizeof",
    "throw",
    "new",
    "delete",
    "static_assert",
];

pub fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word)
}

fn type_segment(input: &str) -> PResult<&str> {
    verify(identifier, |word: &str| !is_reserved(word)).parse(input)
}

/// `unsigned`, `long long`, `unsigned short int`, ...
fn builtin(input: &str) -> PResult<&str> {
    recognize(separated_list1(
        multispace1,
        alt((
            keyword("unsigned"),
            keyword("signed"),
            keyword("short"),
            keyword("long"),
            keyword("int"),
            keyword("char"),
            keyword("double"),
        )),
    ))
    .parse(input)
}

fn path(input: &str) -> PResult<Vec<&str>> {
    let (input, global) = opt(tag("::")).parse(input)?;
    let (input, mut segments) = separated_list1(tag("::"), type_segment).parse(input)?;
    if global.is_some() {
        segments.insert(0, "");
    }

    Ok((input, segments))
}

fn decltype(input: &str) -> PResult<&str> {
    recognize((keyword("decltype"), sp, balanced('(', ')'))).parse(input)
}

fn named_type(input: &str) -> PResult<CType> {
    let (input, base) = alt((
        map(decltype, |d| CType::Path(vec![d])),
        map(builtin, |b| CType::Path(vec![b])),
        map(path, CType::Path),
    ))
    .parse(input)?;

    // Parse optional generic part: <Type, ...>
    let (input, generics) = opt(preceded(sp, template_args)).parse(input)?;
    let Some(args) = generics else {
        return Ok((input, base));
    };

    let generic = CType::Generic(Box::new(base), args);
    let (input, nested) = opt(preceded(tag("::"), named_type)).parse(input)?;
    let ctype = match nested {
        Some(nested) => CType::Scoped(Box::new(generic), Box::new(nested)),
        None => generic,
    };

    Ok((input, ctype))
}

/// A type argument, possibly a function type such as `int(int)`.
fn type_argument(input: &str) -> PResult<CType> {
    let (input, ctype) = parse_cpp_type(input)?;
    let (input, params) = opt(delimited(
        preceded(sp, char('(')),
        separated_list0(ws(char(',')), ws(parse_cpp_type)),
        preceded(sp, char(')')),
    ))
    .parse(input)?;
    let (input, _) = peek(preceded(sp, one_of(",>"))).parse(input)?;

    let ctype = match params {
        Some(params) => CType::Function(Box::new(ctype), params),
        None => ctype,
    };

    Ok((input, ctype))
}

fn template_arg(input: &str) -> PResult<CType> {
    alt((
        type_argument,
        map(|i| scan_expression(i, &[','], true), CType::Value),
    ))
    .parse(input)
}

pub fn template_args(input: &str) -> PResult<Vec<CType>> {
    let _nesting = Nesting::enter(input)?;
    delimited(
        char('<'),
        separated_list0(ws(char(',')), ws(template_arg)),
        preceded(sp, char('>')),
    )
    .parse(input)
}

/// Parse 0 or more `*`, `&`, `...` and trailing cv-qualifiers.
pub fn parse_type_suffixes<'a>(input: &'a str, ctype: CType<'a>) -> PResult<'a, CType<'a>> {
    let (input, suffixes) = many0(preceded(
        sp,
        alt((
            tag("*"),
            tag("&"),
            tag("..."),
            keyword("const"),
            keyword("volatile"),
        )),
    ))
    .parse(input)?;

    let ctype = suffixes
        .into_iter()
        .fold(ctype, |ctype, suffix| match suffix {
            "*" => CType::Pointer(Box::new(ctype)),
            "&" => CType::Reference(Box::new(ctype)),
            "..." => CType::Pack(Box::new(ctype)),
            "const" if !matches!(ctype, CType::Const(_)) => CType::Const(Box::new(ctype)),
            _ => ctype,
        });

    Ok((input, ctype))
}

/// Parses a type whose leading cv-qualifiers were already consumed by the caller.
pub fn parse_qualified_type(input: &str, leading_const: bool) -> PResult<CType> {
    let (input, _) = opt(terminated(
        alt((
            keyword("typename"),
            keyword("struct"),
            keyword("class"),
            keyword("enum"),
            keyword("union"),
        )),
        sp,
    ))
    .parse(input)?;
    let (input, ctype) = named_type(input)?;

    let ctype = if leading_const {
        CType::Const(Box::new(ctype))
    } else {
        ctype
    };

    parse_type_suffixes(input, ctype)
}

pub fn parse_cpp_type(input: &str) -> PResult<CType> {
    let (input, qualifiers) =
        many0(terminated(alt((keyword("const"), keyword("volatile"))), sp)).parse(input)?;

    parse_qualified_type(input, qualifiers.contains(&"const"))
}
