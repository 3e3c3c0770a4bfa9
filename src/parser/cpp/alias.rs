use crate::parser::cpp::cenum::{CppEnum, parse_enum_definition};
use crate::parser::cpp::class::{CppClass, parse_class_definition};
use crate::parser::cpp::comment::{CppComment, parse_comment};
use crate::parser::cpp::ctype::{CType, parse_cpp_type};
use crate::parser::cpp::declarator::parse_declarator;
use crate::parser::cpp::template::{CppTemplateParam, parse_template};
use crate::parser::{identifier, keyword, skip_attributes, sp, ws};
use crate::types::{PResult, Parsable};
use nom::branch::alt;
use nom::bytes::complete::is_not;
use nom::character::complete::{char, multispace0};
use nom::combinator::{map, opt, verify};
use nom::multi::many0;
use nom::sequence::{preceded, terminated};
use nom::Parser;
use serde::Serialize;

#[derive(Debug, Eq, PartialEq, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CppAliasKind {
    #[default]
    Typedef,
    Using,
}

#[derive(Debug, Eq, PartialEq, Clone, Default, Serialize)]
pub struct CppAlias<'a> {
    pub name: &'a str,
    #[serde(rename = "type")]
    pub ctype: CType<'a>,
    pub kind: CppAliasKind,
    pub template_params: Vec<CppTemplateParam<'a>>,
    pub comment: Option<CppComment>,
}

impl<'a> Parsable<'a> for CppAlias<'a> {
    fn parse(input: &'a str) -> PResult<'a, Self> {
        parse_using_alias(input)
    }
}

/// A `typedef` statement. It can define a struct or enum inline, which is
/// returned next to the aliases.
#[derive(Debug, Eq, PartialEq, Clone, Default)]
pub struct CppTypedef<'a> {
    pub aliases: Vec<CppAlias<'a>>,
    pub class: Option<CppClass<'a>>,
    pub cenum: Option<CppEnum<'a>>,
}

enum Aliased<'a> {
    Type(CType<'a>),
    Class(CppClass<'a>),
    Enum(CppEnum<'a>),
}

fn aliased(input: &str) -> PResult<Aliased> {
    alt((
        map(
            verify(parse_class_definition, |class: &CppClass| !class.is_forward_declaration),
            Aliased::Class,
        ),
        map(
            verify(parse_enum_definition, |cenum: &CppEnum| !cenum.is_forward_declaration),
            Aliased::Enum,
        ),
        map(parse_cpp_type, Aliased::Type),
    ))
    .parse(input)
}

/// `typedef unsigned int uint;`, `typedef void (*Callback)(int);`,
/// `typedef struct { int x; } Point, *PPoint;`
pub fn parse_cpp_typedef(input: &str) -> PResult<CppTypedef> {
    let (input, _) = multispace0(input)?;
    let (input, comment) = opt(parse_comment).parse(input)?;
    let (input, _) = sp(input)?;
    let (input, _) = terminated(keyword("typedef"), sp).parse(input)?;
    let (input, aliased) = aliased(input)?;

    // A definition is aliased through a placeholder that gets its name below.
    let base = match &aliased {
        Aliased::Type(ctype) => ctype.clone(),
        Aliased::Class(_) | Aliased::Enum(_) => CType::Path(vec![]),
    };
    let (input, first) = preceded(sp, |i| parse_declarator(i, &base, true)).parse(input)?;
    let shared = base.declared_base();
    let (input, others) = many0(preceded(ws(char(',')), |i| {
        parse_declarator(i, &shared, true)
    }))
    .parse(input)?;
    let (input, _) = preceded(sp, char(';')).parse(input)?;

    let mut typedef = CppTypedef::default();
    let mut declarators = std::iter::once(first)
        .chain(others)
        .filter_map(|declarator| declarator.name.map(|name| (name, declarator.ctype)))
        .collect::<Vec<_>>();

    let defined_name = match aliased {
        Aliased::Type(_) => None,
        Aliased::Class(mut class) => {
            if class.name.is_none() {
                class.name = adopt_plain_alias(&mut declarators);
            }
            if class.comment.is_none() {
                class.comment = comment.clone();
            }
            let name = class.name;
            typedef.class = Some(class);
            name
        }
        Aliased::Enum(mut cenum) => {
            if cenum.name.is_none() {
                cenum.name = adopt_plain_alias(&mut declarators);
            }
            if cenum.comment.is_none() {
                cenum.comment = comment.clone();
            }
            let name = cenum.name;
            typedef.cenum = Some(cenum);
            name
        }
    };

    let named = CType::Path(defined_name.into_iter().collect());
    typedef.aliases = declarators
        .into_iter()
        .map(|(name, ctype)| CppAlias {
            name,
            ctype: ctype.rebase(&named),
            kind: CppAliasKind::Typedef,
            template_params: vec![],
            comment: comment.clone(),
        })
        .collect();

    Ok((input, typedef))
}

/// An anonymous definition takes the name of its first plain alias.
fn adopt_plain_alias<'a>(declarators: &mut Vec<(&'a str, CType<'a>)>) -> Option<&'a str> {
    let position = declarators
        .iter()
        .position(|(_, ctype)| *ctype == CType::Path(vec![]))?;
    Some(declarators.remove(position).0)
}

/// `using Name = Type;`, optionally templated.
pub fn parse_using_alias(input: &str) -> PResult<CppAlias> {
    let (input, _) = multispace0(input)?;
    let (input, comment) = opt(parse_comment).parse(input)?;
    let (input, _) = sp(input)?;
    let (input, template_params) = opt(parse_template).parse(input)?;
    let (input, _) = terminated(keyword("using"), sp).parse(input)?;
    let (input, name) = identifier(input)?;
    let (input, _) = preceded(sp, skip_attributes).parse(input)?;
    let (input, _) = ws(char('=')).parse(input)?;
    let (input, _) = opt(terminated(keyword("typename"), sp)).parse(input)?;
    let (input, ctype) = parse_cpp_type(input)?;
    let (input, declarator) = parse_declarator(input, &ctype, false)?;
    let (input, _) = preceded(sp, char(';')).parse(input)?;

    Ok((
        input,
        CppAlias {
            name,
            ctype: declarator.ctype,
            kind: CppAliasKind::Using,
            template_params: template_params.unwrap_or_default(),
            comment,
        },
    ))
}

/// `using namespace std;` or `using Base::method;`, returned without the keyword.
pub fn parse_using_declaration(input: &str) -> PResult<&str> {
    let (input, _) = preceded(sp, terminated(keyword("using"), sp)).parse(input)?;
    let (input, target) = is_not(";{}=").parse(input)?;
    let (input, _) = char(';').parse(input)?;

    Ok((input, target.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_alias_with_template() {
        let input = r#"template<class T>
                            using Vec = vector<T, Alloc<T>>;"#;
        let (rest, alias) = CppAlias::parse(input).unwrap();
        assert_eq!(rest, "");
        assert_eq!(alias.name, "Vec");
        assert_eq!(alias.kind, CppAliasKind::Using);
        assert_eq!(alias.template_params.len(), 1);
        assert_eq!(
            alias.ctype,
            CType::Generic(
                Box::from(CType::Path(vec!["vector"])),
                vec![
                    CType::Path(vec!["T"]),
                    CType::Generic(
                        Box::from(CType::Path(vec!["Alloc"])),
                        vec![CType::Path(vec!["T"])]
                    )
                ]
            )
        );
    }

    #[test]
    fn parse_alias_with_namespace() {
        let input = r#"using myNumber = path::subpath::value;"#;
        let result = CppAlias::parse(input);
        assert_eq!(
            result,
            Ok((
                "",
                CppAlias {
                    name: "myNumber",
                    ctype: CType::Path(vec!["path", "subpath", "value"]),
                    kind: CppAliasKind::Using,
                    ..Default::default()
                }
            ))
        )
    }

    #[test]
    fn parse_using_function_pointer() {
        let (_, alias) = CppAlias::parse("using Handler = void (*)(int, void*);").unwrap();
        assert_eq!(alias.ctype.to_string(), "void(*)(int, void*)");
    }

    #[test]
    fn parse_simple_typedef() {
        let (_, typedef) = parse_cpp_typedef("typedef unsigned long long u64, *pu64;").unwrap();
        let aliases = typedef
            .aliases
            .iter()
            .map(|alias| (alias.name, alias.ctype.to_string()))
            .collect::<Vec<_>>();
        assert_eq!(
            aliases,
            vec![
                ("u64", "unsigned long long".to_string()),
                ("pu64", "unsigned long long*".to_string())
            ]
        );
    }

    #[test]
    fn parse_function_pointer_typedef() {
        let (_, typedef) = parse_cpp_typedef("typedef int (*compare_fn)(const void*, const void*);").unwrap();
        assert_eq!(typedef.aliases[0].name, "compare_fn");
        assert_eq!(typedef.aliases[0].ctype.to_string(), "int(*)(const void*, const void*)");
    }

    #[test]
    fn parse_function_pointer_array_typedef() {
        let (rest, typedef) = parse_cpp_typedef("typedef void (*handlers_t[8])(int signal);").unwrap();
        assert_eq!(rest, "");
        assert_eq!(typedef.aliases[0].name, "handlers_t");
        assert_eq!(typedef.aliases[0].ctype.to_string(), "void(*)(int)[8]");
    }

    #[test]
    fn parse_array_typedef() {
        let (_, typedef) = parse_cpp_typedef("typedef float mat4[4][4];").unwrap();
        assert_eq!(typedef.aliases[0].ctype.to_string(), "float[4][4]");
    }

    #[test]
    fn parse_anonymous_struct_typedef() {
        let input = "typedef struct {\n    int x;\n    int y;\n} Point, *PPoint;";
        let (rest, typedef) = parse_cpp_typedef(input).unwrap();
        assert_eq!(rest, "");
        let class = typedef.class.unwrap();
        assert_eq!(class.name, Some("Point"));
        assert_eq!(typedef.aliases.len(), 1);
        assert_eq!(typedef.aliases[0].name, "PPoint");
        assert_eq!(typedef.aliases[0].ctype.to_string(), "Point*");
    }

    #[test]
    fn parse_named_enum_typedef() {
        let (_, typedef) = parse_cpp_typedef("typedef enum color_e { RED, GREEN } color_t;").unwrap();
        assert_eq!(typedef.cenum.unwrap().name, Some("color_e"));
        assert_eq!(typedef.aliases[0].ctype.to_string(), "color_e");
    }

    #[test]
    fn parse_elaborated_typedef() {
        let (_, typedef) = parse_cpp_typedef("typedef struct node node_t;").unwrap();
        assert!(typedef.class.is_none());
        assert_eq!(typedef.aliases[0].ctype.to_string(), "node");
    }

    #[test]
    fn parse_using_declarations() {
        assert_eq!(parse_using_declaration("using namespace std;"), Ok(("", "namespace std")));
        assert_eq!(parse_using_declaration("using Base::Base;"), Ok(("", "Base::Base")));
        assert!(parse_using_declaration("using T = int;").is_err());
    }
}
