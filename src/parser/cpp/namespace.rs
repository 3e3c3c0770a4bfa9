use crate::parser::cpp::alias::{CppAlias, CppTypedef, parse_cpp_typedef, parse_using_alias, parse_using_declaration};
use crate::parser::cpp::cenum::{CppEnum, parse_cpp_enum};
use crate::parser::cpp::class::{CppClass, parse_cpp_class};
use crate::parser::cpp::comment::{CppComment, parse_comment};
use crate::parser::cpp::member::{CppMember, parse_cpp_members};
use crate::parser::cpp::method::{CppFunction, parse_cpp_method};
use crate::parser::cpp::preprocessor::{CppDefine, CppDirective, CppInclude, parse_directive};
use crate::parser::{
    Nesting, identifier, keyword, macro_invocation, skip_attributes, sp, static_assertion, unrecognized, ws,
};
use crate::types::{PResult, Parsable};
use nom::branch::alt;
use nom::bytes::complete::{is_not, tag};
use nom::character::complete::{char, multispace0};
use nom::combinator::{eof, map, not, opt, recognize, value};
use nom::multi::{many_till, separated_list1};
use nom::sequence::{preceded, terminated};
use nom::Parser;
use serde::Serialize;

/// Declarations found at namespace scope, or at the top level of a header.
#[derive(Debug, Eq, PartialEq, Clone, Default, Serialize)]
pub struct CppScope<'a> {
    pub namespaces: Vec<CppNamespace<'a>>,
    pub classes: Vec<CppClass<'a>>,
    pub functions: Vec<CppFunction<'a>>,
    pub variables: Vec<CppMember<'a>>,
    pub enums: Vec<CppEnum<'a>>,
    pub typedefs: Vec<CppAlias<'a>>,
    /// `using namespace std;`, `using Base::f;`
    pub using: Vec<&'a str>,
    pub comments: Vec<CppComment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<CppInclude<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub defines: Vec<CppDefine<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pragmas: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditionals: Vec<&'a str>,
}

impl<'a> CppScope<'a> {
    fn add_directive(&mut self, directive: CppDirective<'a>) {
        match directive {
            CppDirective::Include(include) => self.includes.push(include),
            CppDirective::Define(define) => self.defines.push(define),
            CppDirective::Pragma(pragma) => self.pragmas.push(pragma),
            CppDirective::Conditional(conditional) => self.conditionals.push(conditional),
        }
    }

    fn add_typedef(&mut self, typedef: CppTypedef<'a>) {
        self.classes.extend(typedef.class);
        self.enums.extend(typedef.cenum);
        self.typedefs.extend(typedef.aliases);
    }

    /// Moves the contents of an `extern "C"` block into this scope.
    fn merge(&mut self, other: CppScope<'a>) {
        self.namespaces.extend(other.namespaces);
        self.classes.extend(other.classes);
        self.functions.extend(other.functions);
        self.variables.extend(other.variables);
        self.enums.extend(other.enums);
        self.typedefs.extend(other.typedefs);
        self.using.extend(other.using);
        self.comments.extend(other.comments);
        self.includes.extend(other.includes);
        self.defines.extend(other.defines);
        self.pragmas.extend(other.pragmas);
        self.conditionals.extend(other.conditionals);
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Default, Serialize)]
pub struct CppNamespace<'a> {
    /// `None` for an anonymous namespace
    pub name: Option<&'a str>,
    #[serde(rename = "inline")]
    pub is_inline: bool,
    #[serde(flatten)]
    pub scope: CppScope<'a>,
}

impl<'a> Parsable<'a> for CppNamespace<'a> {
    fn parse(input: &'a str) -> PResult<'a, Self> {
        parse_namespace(input)
    }
}

#[derive(Debug, Clone)]
enum ScopeItem<'a> {
    Ignore,
    Directive(CppDirective<'a>),
    Namespace(CppNamespace<'a>),
    Linkage(CppScope<'a>),
    Class(CppClass<'a>),
    Enum(CppEnum<'a>),
    Typedef(CppTypedef<'a>),
    Alias(CppAlias<'a>),
    Using(&'a str),
    Function(CppFunction<'a>),
    Variables(Vec<CppMember<'a>>),
    Comment(CppComment),
}

/// `namespace fs = std::filesystem;`
fn namespace_alias(input: &str) -> PResult<&str> {
    recognize((
        keyword("namespace"),
        sp,
        identifier,
        ws(char('=')),
        is_not(";{}"),
        char(';'),
    ))
    .parse(input)
}

/// `template class Foo<int>;`, `extern template struct Bar<char>;`
fn explicit_instantiation(input: &str) -> PResult<&str> {
    recognize((
        opt((keyword("extern"), sp)),
        keyword("template"),
        sp,
        not(char('<')),
        is_not(";{}"),
        char(';'),
    ))
    .parse(input)
}

/// `extern "C" { ... }`
fn linkage_block(input: &str) -> PResult<CppScope> {
    let (input, _) = (
        keyword("extern"),
        sp,
        alt((tag("\"C\""), tag("\"C++\""))),
        sp,
        char('{'),
    )
        .parse(input)?;

    parse_scope(input, true)
}

fn unknown_declaration(input: &str) -> PResult<ScopeItem> {
    Err(unrecognized(input, "declaration"))
}

fn parse_scope_item(input: &str) -> PResult<ScopeItem> {
    preceded(
        multispace0,
        alt((
            value(ScopeItem::Ignore, char(';')),
            map(parse_directive, ScopeItem::Directive),
            value(ScopeItem::Ignore, namespace_alias),
            map(parse_namespace, ScopeItem::Namespace),
            map(linkage_block, ScopeItem::Linkage),
            value(ScopeItem::Ignore, static_assertion),
            value(ScopeItem::Ignore, explicit_instantiation),
            map(parse_cpp_typedef, ScopeItem::Typedef),
            map(parse_using_alias, ScopeItem::Alias),
            map(parse_using_declaration, ScopeItem::Using),
            map(parse_cpp_enum, ScopeItem::Enum),
            map(parse_cpp_class, ScopeItem::Class),
            map(parse_cpp_method, ScopeItem::Function),
            map(parse_cpp_members, ScopeItem::Variables),
            value(ScopeItem::Ignore, macro_invocation),
            map(parse_comment, ScopeItem::Comment),
            unknown_declaration,
        )),
    )
    .parse(input)
}

fn scope_end(input: &str, closing: bool) -> PResult<()> {
    if closing {
        value((), char('}')).parse(input)
    } else {
        value((), eof).parse(input)
    }
}

/// Parses declarations until the closing `}` of a block, or until the end of
/// input when `closing` is false.
pub fn parse_scope(input: &str, closing: bool) -> PResult<CppScope> {
    let _nesting = Nesting::enter(input)?;
    let (input, (items, _)) = many_till(
        parse_scope_item,
        preceded(multispace0, |i| scope_end(i, closing)),
    )
    .parse(input)?;

    let mut scope = CppScope::default();
    for item in items {
        match item {
            ScopeItem::Ignore => {}
            ScopeItem::Directive(directive) => scope.add_directive(directive),
            ScopeItem::Namespace(namespace) => scope.namespaces.push(namespace),
            ScopeItem::Linkage(block) => scope.merge(block),
            ScopeItem::Class(class) => scope.classes.push(class),
            ScopeItem::Enum(cenum) => scope.enums.push(cenum),
            ScopeItem::Typedef(typedef) => scope.add_typedef(typedef),
            ScopeItem::Alias(alias) => scope.typedefs.push(alias),
            ScopeItem::Using(target) => scope.using.push(target),
            ScopeItem::Function(function) => scope.functions.push(function),
            ScopeItem::Variables(variables) => scope.variables.extend(variables),
            ScopeItem::Comment(comment) => scope.comments.push(comment),
        }
    }

    Ok((input, scope))
}

fn namespace_segment(input: &str) -> PResult<&str> {
    preceded(opt(terminated(keyword("inline"), sp)), identifier).parse(input)
}

/// `namespace a {}`, `inline namespace v1 {}`, `namespace {}`, `namespace a::b {}`
pub fn parse_namespace(input: &str) -> PResult<CppNamespace> {
    let (input, _) = multispace0(input)?;
    let (input, is_inline) = opt(terminated(keyword("inline"), sp)).parse(input)?;
    let (input, _) = terminated(keyword("namespace"), sp).parse(input)?;
    let (input, _) = skip_attributes(input)?;
    let (input, names) =
        opt(terminated(separated_list1(ws(tag("::")), namespace_segment), sp)).parse(input)?;
    let (input, _) = (skip_attributes, char('{')).parse(input)?;
    let (input, scope) = parse_scope(input, true)?;
    let (input, _) = opt(preceded(sp, char(';'))).parse(input)?;

    // `a::b` nests `b` inside `a`
    let mut names = names.unwrap_or_default().into_iter().rev();
    let mut namespace = CppNamespace {
        name: names.next(),
        is_inline: false,
        scope,
    };
    for name in names {
        namespace = CppNamespace {
            name: Some(name),
            is_inline: false,
            scope: CppScope {
                namespaces: vec![namespace],
                ..Default::default()
            },
        };
    }
    namespace.is_inline = is_inline.is_some();

    Ok((input, namespace))
}
