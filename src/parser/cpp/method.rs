use crate::parser::cpp::comment::{CppComment, parse_comment};
use crate::parser::cpp::ctype::{CType, is_reserved, parse_cpp_type, parse_qualified_type};
use crate::parser::cpp::declarator::parse_declarator;
use crate::parser::cpp::template::{CppTemplateParam, parse_template};
use crate::parser::{api_macro, attribute, balanced, identifier, inner, is_api_macro, keyword, skip_attributes, sp, ws};
use crate::types::{PResult, Parsable};
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char, multispace0};
use nom::combinator::{map, opt, peek, recognize, success, value, verify};
use nom::multi::{many0, separated_list0, separated_list1};
use nom::sequence::{preceded, terminated};
use nom::Parser;
use serde::Serialize;

#[derive(Debug, Eq, PartialEq, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CppFunctionSpecifier {
    Virtual,
    Override,
    Final,
    Static,
    Inline,
    Explicit,
    Constexpr,
    Extern,
    Friend,
}

impl From<&str> for CppFunctionSpecifier {
    fn from(input: &str) -> Self {
        match input {
            "virtual" => CppFunctionSpecifier::Virtual,
            "override" => CppFunctionSpecifier::Override,
            "final" => CppFunctionSpecifier::Final,
            "static" => CppFunctionSpecifier::Static,
            "inline" => CppFunctionSpecifier::Inline,
            "explicit" => CppFunctionSpecifier::Explicit,
            "extern" => CppFunctionSpecifier::Extern,
            "friend" => CppFunctionSpecifier::Friend,
            _ => CppFunctionSpecifier::Constexpr,
        }
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize)]
pub struct CppFunction<'a> {
    pub name: &'a str,
    pub api: Option<&'a str>,
    /// `None` for constructors, destructors and conversion operators
    pub return_type: Option<CType<'a>>,
    pub template_params: Vec<CppTemplateParam<'a>>,
    pub params: Vec<CppMethodParam<'a>>,
    pub specifiers: Vec<CppFunctionSpecifier>,
    pub is_const: bool,
    pub is_noexcept: bool,
    pub is_pure_virtual: bool,
    pub is_deleted: bool,
    pub is_defaulted: bool,
    pub is_variadic: bool,
    pub has_body: bool,
    pub comment: Option<CppComment>,
}

impl Default for CppFunction<'_> {
    fn default() -> Self {
        Self {
            name: "",
            api: None,
            return_type: Some(CType::default()),
            template_params: vec![],
            params: vec![],
            specifiers: vec![],
            is_const: false,
            is_noexcept: false,
            is_pure_virtual: false,
            is_deleted: false,
            is_defaulted: false,
            is_variadic: false,
            has_body: false,
            comment: None,
        }
    }
}

impl<'a> Parsable<'a> for CppFunction<'a> {
    fn parse(input: &'a str) -> PResult<'a, Self> {
        parse_cpp_method(input)
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize)]
pub struct CppMethodParam<'a> {
    pub name: Option<&'a str>,
    #[serde(rename = "type")]
    pub ctype: CType<'a>,
    pub is_const: bool,
    pub default_value: Option<&'a str>,
}

fn parse_cpp_method_param(input: &str) -> PResult<CppMethodParam> {
    let (input, _) = skip_attributes(input)?;
    let (input, qualifiers) =
        many0(terminated(alt((keyword("const"), keyword("volatile"))), sp)).parse(input)?;
    let leading_const = qualifiers.contains(&"const");
    let (input, ctype) = parse_qualified_type(input, leading_const)?;
    let (input, declarator) = parse_declarator(input, &ctype, false)?;

    Ok((
        input,
        CppMethodParam {
            name: declarator.name,
            is_const: leading_const || matches!(declarator.ctype, CType::Const(_)),
            ctype: declarator.ctype,
            default_value: declarator.default_value,
        },
    ))
}

/// Parses `(...)` and reports whether the list ends in a C-style `...`.
pub fn parse_method_params(input: &str) -> PResult<(Vec<CppMethodParam>, bool)> {
    let (input, _) = (char('('), sp).parse(input)?;

    let (input, params) = alt((
        map(terminated(keyword("void"), peek(preceded(sp, char(')')))), |_| Vec::new()),
        separated_list0(ws(char(',')), parse_cpp_method_param),
    ))
    .parse(input)?;

    let (input, variadic) = opt(preceded((opt(ws(char(','))), sp), tag("..."))).parse(input)?;
    let (input, _) = preceded(sp, char(')')).parse(input)?;

    Ok((input, (params, variadic.is_some())))
}

fn specifier(input: &str) -> PResult<CppFunctionSpecifier> {
    map(
        alt((
            keyword("virtual"),
            keyword("static"),
            keyword("inline"),
            keyword("explicit"),
            keyword("constexpr"),
            keyword("consteval"),
            keyword("friend"),
            terminated(keyword("extern"), opt(preceded(sp, tag("\"C\"")))),
        )),
        CppFunctionSpecifier::from,
    )
    .parse(input)
}

fn parse_specifiers(input: &str) -> PResult<Vec<CppFunctionSpecifier>> {
    let (input, found) = many0(terminated(
        alt((map(specifier, Some), value(None, attribute))),
        sp,
    ))
    .parse(input)?;

    Ok((input, found.into_iter().flatten().collect()))
}

fn plain_name(input: &str) -> PResult<&str> {
    verify(identifier, |word: &str| !is_reserved(word)).parse(input)
}

fn operator_name(input: &str) -> PResult<&str> {
    recognize((
        keyword("operator"),
        sp,
        alt((
            tag("()"),
            tag("[]"),
            recognize((alt((keyword("new"), keyword("delete"))), opt((sp, tag("[]"))))),
            recognize((tag("\"\""), sp, identifier)),
            take_while1(|c: char| "+-*/%^&|~!=<>,".contains(c)),
            recognize(parse_cpp_type),
        )),
    ))
    .parse(input)
}

/// `name`, `Outer<T>::name`, `~Name`, `operator==`, `operator bool`
fn function_name(input: &str) -> PResult<&str> {
    recognize((
        many0((plain_name, opt(preceded(sp, balanced('<', '>'))), tag("::"))),
        alt((
            operator_name,
            recognize((char('~'), sp, identifier)),
            plain_name,
        )),
    ))
    .parse(input)
}

fn signature(input: &str) -> PResult<(Option<CType>, &str)> {
    alt((
        terminated(
            (map(parse_cpp_type, Some), preceded(sp, function_name)),
            peek(preceded(sp, char('('))),
        ),
        terminated(
            (
                success(None),
                verify(function_name, |name: &str| !is_api_macro(name)),
            ),
            peek(preceded(sp, char('('))),
        ),
    ))
    .parse(input)
}

#[derive(Debug, Clone)]
enum Qualifier<'a> {
    Const,
    Noexcept(bool),
    Specifier(CppFunctionSpecifier),
    ReturnType(CType<'a>),
    Ignored,
}

fn qualifier(input: &str) -> PResult<Qualifier> {
    alt((
        value(Qualifier::Const, keyword("const")),
        value(Qualifier::Ignored, keyword("volatile")),
        map(
            (keyword("noexcept"), opt(preceded(sp, balanced('(', ')')))),
            |(_, condition)| Qualifier::Noexcept(condition.is_none_or(|c| inner(c) != "false")),
        ),
        value(Qualifier::Ignored, (keyword("throw"), sp, balanced('(', ')'))),
        value(Qualifier::Specifier(CppFunctionSpecifier::Override), keyword("override")),
        value(Qualifier::Specifier(CppFunctionSpecifier::Final), keyword("final")),
        value(Qualifier::Ignored, alt((tag("&&"), tag("&")))),
        map(preceded((tag("->"), sp), parse_cpp_type), Qualifier::ReturnType),
        value(Qualifier::Ignored, attribute),
    ))
    .parse(input)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Definition {
    Pure,
    Default,
    Delete,
}

fn definition(input: &str) -> PResult<Definition> {
    preceded(
        ws(char('=')),
        alt((
            value(Definition::Pure, char('0')),
            value(Definition::Default, keyword("default")),
            value(Definition::Delete, keyword("delete")),
        )),
    )
    .parse(input)
}

/// `: base(x), member{y}` in front of a constructor body.
fn ctor_initializers(input: &str) -> PResult<()> {
    value(
        (),
        (
            char(':'),
            sp,
            separated_list1(
                ws(char(',')),
                (
                    function_name,
                    opt(balanced('<', '>')),
                    sp,
                    alt((balanced('(', ')'), balanced('{', '}'))),
                    opt(tag("...")),
                ),
            ),
        ),
    )
    .parse(input)
}

fn body(input: &str) -> PResult<bool> {
    alt((
        value(false, preceded(sp, char(';'))),
        value(
            true,
            preceded((sp, opt(ctor_initializers), sp), balanced('{', '}')),
        ),
    ))
    .parse(input)
}

pub fn parse_cpp_method(input: &str) -> PResult<CppFunction> {
    let (input, _) = multispace0(input)?;
    let (input, comment) = opt(parse_comment).parse(input)?;
    let (input, _) = sp(input)?;
    let (input, template_params) = opt(parse_template).parse(input)?;
    let (input, mut specifiers) = parse_specifiers(input)?;

    let (input, (api, trailing_specifiers, (return_type, name))) = alt((
        map(signature, |signature| (None, vec![], signature)),
        map(
            (terminated(api_macro, sp), parse_specifiers, signature),
            |(api, found, signature)| (Some(api), found, signature),
        ),
    ))
    .parse(input)?;
    specifiers.extend(trailing_specifiers);

    let (input, _) = sp(input)?;
    let (input, (params, is_variadic)) = parse_method_params(input)?;
    let (input, qualifiers) = many0(preceded(sp, qualifier)).parse(input)?;
    let (input, definition) = opt(definition).parse(input)?;
    let (input, has_body) = body(input)?;

    let mut function = CppFunction {
        name,
        api,
        return_type,
        template_params: template_params.unwrap_or_default(),
        params,
        is_variadic,
        is_pure_virtual: definition == Some(Definition::Pure),
        is_defaulted: definition == Some(Definition::Default),
        is_deleted: definition == Some(Definition::Delete),
        has_body,
        comment,
        ..Default::default()
    };

    for qualifier in qualifiers {
        match qualifier {
            Qualifier::Const => function.is_const = true,
            Qualifier::Noexcept(noexcept) => function.is_noexcept = noexcept,
            Qualifier::Specifier(specifier) => specifiers.push(specifier),
            Qualifier::ReturnType(ctype) => function.return_type = Some(ctype),
            Qualifier::Ignored => {}
        }
    }
    function.specifiers = specifiers;

    Ok((input, function))
}

#[cfg(test)]
mod tests {
    use crate::parser::cpp::comment::CppComment;
    use crate::parser::cpp::ctype::CType::{Const, Function, Generic, Path, Pointer, Reference};
    use crate::parser::cpp::method::CppFunctionSpecifier::{Final, Virtual};
    use crate::parser::cpp::method::{
        CppFunction, CppFunctionSpecifier, CppMethodParam, parse_cpp_method,
    };

    fn param<'a>(name: Option<&'a str>, ctype: crate::parser::cpp::ctype::CType<'a>) -> CppMethodParam<'a> {
        CppMethodParam {
            name,
            ctype,
            is_const: false,
            default_value: None,
        }
    }

    #[test]
    fn test_method_without_params() {
        let input = "void method();";
        assert_eq!(
            parse_cpp_method(&input[..]),
            Ok((
                "",
                CppFunction {
                    name: "method",
                    ..Default::default()
                }
            ))
        );
    }

    #[test]
    fn test_method_with_single_line_comment() {
        let input = r#"
            // does something
            void method();"#;

        assert_eq!(
            parse_cpp_method(&input[..]),
            Ok((
                "",
                CppFunction {
                    name: "method",
                    comment: Some(CppComment { comment: "does something".to_string() }),
                    ..Default::default()
                }
            ))
        );
    }

    #[test]
    fn test_method_with_multi_line_comment() {
        let input = r#"
            /**
             * does something
             *
             * @return nothing
             */
            void method();"#;

        assert_eq!(
            parse_cpp_method(&input[..]),
            Ok((
                "",
                CppFunction {
                    name: "method",
                    comment: Some(CppComment { comment: "does something\n@return nothing".to_string() }),
                    ..Default::default()
                }
            ))
        );
    }

    #[test]
    fn test_method_with_virtual_modifier() {
        for inheritance_modifier in ["", "virtual"] {
            let input = format!("{} void method();", inheritance_modifier);

            let specifiers = match inheritance_modifier {
                "virtual" => vec![Virtual],
                _ => vec![],
            };

            assert_eq!(
                parse_cpp_method(&input[..]),
                Ok((
                    "",
                    CppFunction {
                        name: "method",
                        specifiers,
                        ..Default::default()
                    }
                ))
            );
        }
    }

    #[test]
    fn test_method_with_inheritance_modifier() {
        for inheritance_modifier in ["override", "final"] {
            let input = format!("virtual void method() {};", inheritance_modifier);
            assert_eq!(
                parse_cpp_method(&input[..]),
                Ok((
                    "",
                    CppFunction {
                        name: "method",
                        specifiers: vec![
                            Virtual,
                            CppFunctionSpecifier::from(inheritance_modifier)
                        ],
                        ..Default::default()
                    }
                ))
            );
        }
    }

    #[test]
    fn test_method_with_param() {
        let input = "void method(int a) final;";
        assert_eq!(
            parse_cpp_method(&input[..]),
            Ok((
                "",
                CppFunction {
                    name: "method",
                    params: vec![param(Some("a"), Path(vec!["int"]))],
                    specifiers: vec![Final],
                    ..Default::default()
                }
            ))
        );
    }

    #[test]
    fn test_method_with_template_return_type() {
        let input = "TArray<int32> method();";
        assert_eq!(
            parse_cpp_method(&input[..]),
            Ok((
                "",
                CppFunction {
                    name: "method",
                    return_type: Some(Generic(
                        Box::from(Path(vec!["TArray"])),
                        vec![Path(vec!["int32"])]
                    )),
                    ..Default::default()
                }
            ))
        );
    }

    #[test]
    fn test_method_with_reference_and_pointer_params() {
        let input = "void method(int& a, int* b, std::string c);";
        let (_, function) = parse_cpp_method(input).unwrap();
        assert_eq!(
            function.params,
            vec![
                param(Some("a"), Reference(Box::from(Path(vec!["int"])))),
                param(Some("b"), Pointer(Box::from(Path(vec!["int"])))),
                param(Some("c"), Path(vec!["std", "string"])),
            ]
        );
    }

    #[test]
    fn test_method_with_const_reference_param() {
        let input = "void method(const int& a) final;";
        let (_, function) = parse_cpp_method(input).unwrap();
        assert_eq!(
            function.params,
            vec![CppMethodParam {
                name: Some("a"),
                is_const: true,
                ctype: Reference(Box::from(Const(Box::from(Path(vec!["int"]))))),
                default_value: None,
            }]
        );
    }

    #[test]
    fn test_const_method() {
        let input = "void method() const;";
        assert_eq!(
            parse_cpp_method(&input[..]),
            Ok((
                "",
                CppFunction {
                    name: "method",
                    is_const: true,
                    ..Default::default()
                }
            ))
        );
    }

    #[test]
    fn test_method_with_trailing_return_type() {
        let input = "auto method(int* a) -> int** final;";
        let (_, function) = parse_cpp_method(input).unwrap();
        assert_eq!(
            function.return_type,
            Some(Pointer(Box::from(Pointer(Box::from(Path(vec!["int"]))))))
        );
        assert_eq!(function.specifiers, vec![Final]);
    }

    #[test]
    fn test_method_with_lambda_param() {
        let input = "auto method(std::function<int(int)>& lambda) -> int;";

        let param_ctype = Reference(Box::from(Generic(
            Box::from(Path(vec!["std", "function"])),
            vec![Function(
                Box::from(Path(vec!["int"])),
                vec![Path(vec!["int"])],
            )],
        )));
        assert_eq!(
            parse_cpp_method(&input[..]),
            Ok((
                "",
                CppFunction {
                    name: "method",
                    return_type: Some(Path(vec!["int"])),
                    params: vec![param(Some("lambda"), param_ctype)],
                    ..Default::default()
                }
            ))
        );
    }

    #[test]
    fn test_template_method() {
        let (_, function) = parse_cpp_method("template<typename T>T method();").unwrap();
        assert_eq!(function.return_type, Some(Path(vec!["T"])));
        assert_eq!(function.template_params.len(), 1);
        assert_eq!(function.template_params[0].name, Some("T"));
    }

    #[test]
    fn test_template_enable_if_method() {
        let input = "template<typename Integer, typename = std::enable_if_t<std::is_integral<Integer>::value>> void method(Integer a);";
        let (rest, function) = parse_cpp_method(input).unwrap();
        assert_eq!(rest, "");
        assert_eq!(function.template_params.len(), 2);
        assert_eq!(function.params, vec![param(Some("a"), Path(vec!["Integer"]))]);
    }

    #[test]
    fn test_method_with_unnamed_param() {
        let (_, function) = parse_cpp_method("void method(int);").unwrap();
        assert_eq!(function.params, vec![param(None, Path(vec!["int"]))]);
    }

    #[test]
    fn test_void_param_list() {
        let (_, function) = parse_cpp_method("int count(void);").unwrap();
        assert!(function.params.is_empty());
    }

    #[test]
    fn test_default_arguments_and_variadic() {
        let (_, function) =
            parse_cpp_method("int log(const char* fmt, int level = (1 << 2), ...);").unwrap();
        assert!(function.is_variadic);
        assert_eq!(function.params.len(), 2);
        assert_eq!(function.params[1].default_value, Some("(1 << 2)"));
    }

    #[test]
    fn test_constructor_and_destructor() {
        let (_, ctor) = parse_cpp_method("explicit Widget(int size) : size_(size), data_{} {}").unwrap();
        assert_eq!(ctor.name, "Widget");
        assert_eq!(ctor.return_type, None);
        assert!(ctor.has_body);
        assert_eq!(ctor.specifiers, vec![CppFunctionSpecifier::Explicit]);

        let (_, dtor) = parse_cpp_method("virtual ~Widget() = default;").unwrap();
        assert_eq!(dtor.name, "~Widget");
        assert!(dtor.is_defaulted);
    }

    #[test]
    fn test_operators() {
        let (_, assign) = parse_cpp_method("Widget& operator=(const Widget&) = delete;").unwrap();
        assert_eq!(assign.name, "operator=");
        assert!(assign.is_deleted);

        let (_, call) = parse_cpp_method("int operator()(int x) const noexcept;").unwrap();
        assert_eq!(call.name, "operator()");
        assert!(call.is_const && call.is_noexcept);

        let (_, conversion) = parse_cpp_method("explicit operator bool() const;").unwrap();
        assert_eq!(conversion.name, "operator bool");
        assert_eq!(conversion.return_type, None);
    }

    #[test]
    fn test_pure_virtual_with_body_skipped() {
        let (_, function) = parse_cpp_method("virtual void draw() const = 0;").unwrap();
        assert!(function.is_pure_virtual);

        let input = "inline int twice(int x) { if (x) { return x * 2; } return 0; }\nint y;";
        let (rest, function) = parse_cpp_method(input).unwrap();
        assert_eq!(rest, "\nint y;");
        assert!(function.has_body);
    }

    #[test]
    fn test_api_macro_and_qualified_name() {
        let (_, function) = parse_cpp_method("MY_API static void Foo::bar();").unwrap();
        assert_eq!(function.api, Some("MY_API"));
        assert_eq!(function.name, "Foo::bar");
    }

    #[test]
    fn test_not_a_function() {
        assert!(parse_cpp_method("int x;").is_err());
        assert!(parse_cpp_method("GENERATED_BODY()").is_err());
    }
}
