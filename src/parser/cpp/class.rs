use crate::parser::cpp::alias::{CppAlias, CppTypedef, parse_cpp_typedef, parse_using_alias, parse_using_declaration};
use crate::parser::cpp::cenum::{CppEnum, parse_cpp_enum};
use crate::parser::cpp::comment::{CppComment, parse_comment};
use crate::parser::cpp::ctype::{CType, parse_cpp_type};
use crate::parser::cpp::declarator::parse_instances;
use crate::parser::cpp::member::{CppMember, parse_cpp_members};
use crate::parser::cpp::method::{CppFunction, parse_cpp_method};
use crate::parser::cpp::preprocessor::parse_directive;
use crate::parser::cpp::template::{CppTemplateParam, parse_template};
use crate::parser::{
    Nesting, api_macro, balanced, identifier, inner, keyword, macro_invocation, skip_attributes, sp,
    static_assertion, unrecognized, ws,
};
use crate::types::{PResult, Parsable};
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, multispace0};
use nom::combinator::{cut, map, not, opt, peek, recognize, value, verify};
use nom::error::context;
use nom::multi::{many0, many_till, separated_list1};
use nom::sequence::{preceded, terminated};
use nom::Parser;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InheritanceVisibility {
    Public,
    Protected,
    Private,
}

impl From<&str> for InheritanceVisibility {
    fn from(value: &str) -> Self {
        match value {
            "private" => InheritanceVisibility::Private,
            "protected" => InheritanceVisibility::Protected,
            _ => InheritanceVisibility::Public,
        }
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CppClassKind {
    #[default]
    Class,
    Struct,
    Union,
}

impl CppClassKind {
    /// Access of members and bases that are not preceded by an access specifier.
    pub fn default_visibility(self) -> InheritanceVisibility {
        match self {
            CppClassKind::Class => InheritanceVisibility::Private,
            CppClassKind::Struct | CppClassKind::Union => InheritanceVisibility::Public,
        }
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize)]
pub struct CppParentClass<'a> {
    pub name: CType<'a>,
    pub visibility: InheritanceVisibility,
    pub is_virtual: bool,
}

type ByAccess<T> = BTreeMap<InheritanceVisibility, Vec<T>>;

#[derive(Debug, Eq, PartialEq, Clone, Default, Serialize)]
pub struct CppClass<'a> {
    pub name: Option<&'a str>,
    pub kind: CppClassKind,
    pub api: Option<&'a str>,
    pub template_params: Vec<CppTemplateParam<'a>>,
    /// Arguments of an explicit specialization such as `Hash<int>`
    pub specialization: Option<&'a str>,
    pub parents: Vec<CppParentClass<'a>>,
    pub methods: ByAccess<CppFunction<'a>>,
    pub members: ByAccess<CppMember<'a>>,
    pub inner_classes: ByAccess<CppClass<'a>>,
    pub enums: ByAccess<CppEnum<'a>>,
    pub typedefs: ByAccess<CppAlias<'a>>,
    pub friends: Vec<&'a str>,
    pub is_final: bool,
    pub is_forward_declaration: bool,
    /// Variables declared after the closing brace
    pub instances: Vec<&'a str>,
    pub comment: Option<CppComment>,
}

impl<'a> Parsable<'a> for CppClass<'a> {
    fn parse(input: &'a str) -> PResult<'a, Self> {
        parse_cpp_class(input)
    }
}

#[derive(Debug, Clone)]
enum ClassItem<'a> {
    Ignore,
    Access(InheritanceVisibility),
    Method(CppFunction<'a>),
    Members(Vec<CppMember<'a>>),
    Class(CppClass<'a>),
    Enum(CppEnum<'a>),
    Typedef(CppTypedef<'a>),
    Alias(CppAlias<'a>),
    Friend(&'a str),
}

fn parse_class_kind(input: &str) -> PResult<CppClassKind> {
    alt((
        value(CppClassKind::Class, keyword("class")),
        value(CppClassKind::Struct, keyword("struct")),
        value(CppClassKind::Union, keyword("union")),
    ))
    .parse(input)
}

fn class_name(input: &str) -> PResult<&str> {
    recognize(separated_list1(tag("::"), identifier)).parse(input)
}

fn parse_single_inheritance(
    input: &str,
    default: InheritanceVisibility,
) -> PResult<CppParentClass> {
    let (input, specifiers) = many0(terminated(
        alt((
            keyword("virtual"),
            keyword("public"),
            keyword("protected"),
            keyword("private"),
        )),
        sp,
    ))
    .parse(input)?;
    let (input, name) = parse_cpp_type(input)?;

    let visibility = specifiers
        .iter()
        .find(|s| **s != "virtual")
        .map_or(default, |s| InheritanceVisibility::from(*s));

    Ok((
        input,
        CppParentClass {
            name,
            visibility,
            is_virtual: specifiers.contains(&"virtual"),
        },
    ))
}

fn parse_inheritance(
    input: &str,
    default: InheritanceVisibility,
) -> PResult<Vec<CppParentClass>> {
    let (input, _) = ws(char(':')).parse(input)?;
    separated_list1(ws(char(',')), |i| parse_single_inheritance(i, default)).parse(input)
}

/// `public:`, `protected slots:`, `signals:`
fn access_specifier(input: &str) -> PResult<InheritanceVisibility> {
    let (input, visibility) = alt((
        map(
            alt((keyword("public"), keyword("protected"), keyword("private"))),
            InheritanceVisibility::from,
        ),
        value(
            InheritanceVisibility::Public,
            alt((keyword("signals"), keyword("Q_SIGNALS"))),
        ),
    ))
    .parse(input)?;
    let (input, _) = opt(preceded(sp, alt((keyword("slots"), keyword("Q_SLOTS"))))).parse(input)?;
    let (input, _) = (sp, char(':'), not(char(':'))).parse(input)?;

    Ok((input, visibility))
}

/// `friend class Foo;`, also `template <typename U> friend class Foo;`
fn friend_class(input: &str) -> PResult<&str> {
    let (input, _) = opt(parse_template).parse(input)?;
    let (input, _) = (keyword("friend"), sp).parse(input)?;
    let (input, _) = opt(terminated(parse_class_kind, sp)).parse(input)?;
    let (input, name) = recognize(parse_cpp_type).parse(input)?;
    let (input, _) = preceded(sp, char(';')).parse(input)?;

    Ok((input, name))
}

fn unknown_member(input: &str) -> PResult<ClassItem> {
    Err(unrecognized(input, "class member"))
}

fn parse_class_item(input: &str) -> PResult<ClassItem> {
    preceded(
        multispace0,
        alt((
            value(ClassItem::Ignore, char(';')),
            value(ClassItem::Ignore, parse_directive),
            map(access_specifier, ClassItem::Access),
            value(ClassItem::Ignore, static_assertion),
            map(friend_class, ClassItem::Friend),
            map(parse_cpp_typedef, ClassItem::Typedef),
            map(parse_using_alias, ClassItem::Alias),
            value(ClassItem::Ignore, parse_using_declaration),
            map(parse_cpp_enum, ClassItem::Enum),
            map(parse_cpp_class, ClassItem::Class),
            map(parse_cpp_method, ClassItem::Method),
            map(parse_cpp_members, ClassItem::Members),
            value(ClassItem::Ignore, macro_invocation),
            value(ClassItem::Ignore, parse_comment),
            unknown_member,
        )),
    )
    .parse(input)
}

fn push<T>(map: &mut ByAccess<T>, access: InheritanceVisibility, item: T) {
    map.entry(access).or_default().push(item);
}

fn parse_class_body<'a>(input: &'a str, class: &mut CppClass<'a>) -> PResult<'a, ()> {
    let _nesting = Nesting::enter(input)?;
    let (input, (items, _)) =
        many_till(parse_class_item, preceded(multispace0, char('}'))).parse(input)?;

    let mut access = class.kind.default_visibility();
    for item in items {
        match item {
            ClassItem::Ignore => {}
            ClassItem::Access(a) => access = a,
            ClassItem::Method(m) => push(&mut class.methods, access, m),
            ClassItem::Members(members) => {
                class.members.entry(access).or_default().extend(members)
            }
            ClassItem::Class(inner_class) => push(&mut class.inner_classes, access, inner_class),
            ClassItem::Enum(cenum) => push(&mut class.enums, access, cenum),
            ClassItem::Alias(alias) => push(&mut class.typedefs, access, alias),
            ClassItem::Typedef(typedef) => {
                if let Some(inner_class) = typedef.class {
                    push(&mut class.inner_classes, access, inner_class);
                }
                if let Some(cenum) = typedef.cenum {
                    push(&mut class.enums, access, cenum);
                }
                class.typedefs.entry(access).or_default().extend(typedef.aliases);
            }
            ClassItem::Friend(name) => class.friends.push(name),
        }
    }

    Ok((input, ()))
}

/// Parses a class head and, when present, its body. Stops after the closing
/// brace, before trailing declarators and the `;`.
pub fn parse_class_definition(input: &str) -> PResult<CppClass> {
    let (input, _) = multispace0(input)?;
    let (input, comment) = opt(parse_comment).parse(input)?;
    let (input, _) = sp(input)?;
    let (input, template_params) = opt(parse_template).parse(input)?;
    let (input, kind) = terminated(parse_class_kind, sp).parse(input)?;
    let (input, _) = skip_attributes(input)?;
    let (input, api) = opt(terminated(
        api_macro,
        peek(preceded(sp, verify(identifier, |word: &str| word != "final"))),
    ))
    .parse(input)?;
    let (input, _) = preceded(sp, skip_attributes).parse(input)?;
    let (input, name) = opt(terminated(class_name, sp)).parse(input)?;
    let (input, specialization) = opt(terminated(map(balanced('<', '>'), inner), sp)).parse(input)?;
    let (input, is_final) = opt(terminated(keyword("final"), sp)).parse(input)?;
    let (input, parents) = opt(|i| parse_inheritance(i, kind.default_visibility())).parse(input)?;

    let mut class = CppClass {
        name,
        kind,
        api,
        template_params: template_params.unwrap_or_default(),
        specialization,
        parents: parents.unwrap_or_default(),
        is_final: is_final.is_some(),
        comment,
        ..Default::default()
    };

    let (input, forward) = match name {
        Some(_) => opt(peek(preceded(sp, char(';')))).parse(input)?,
        None => (input, None),
    };
    if forward.is_some() {
        class.is_forward_declaration = true;
        return Ok((input, class));
    }

    let (input, _) = preceded(sp, char('{')).parse(input)?;
    let (input, _) = parse_class_body(input, &mut class)?;

    Ok((input, class))
}

/// A full class statement including trailing declarators and the `;`.
pub fn parse_cpp_class(input: &str) -> PResult<CppClass> {
    let (input, mut class) = parse_class_definition(input)?;
    if class.is_forward_declaration {
        let (input, _) = preceded(sp, char(';')).parse(input)?;
        return Ok((input, class));
    }

    let (input, instances) = opt(parse_instances).parse(input)?;
    class.instances = instances.unwrap_or_default();
    let (input, _) = cut(context("`;` after class definition", preceded(sp, char(';')))).parse(input)?;

    Ok((input, class))
}
