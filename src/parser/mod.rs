use crate::types::PResult;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_until, take_while};
use nom::character::complete::{char, line_ending, multispace1, not_line_ending, satisfy, space0};
use nom::combinator::{not, opt, peek, recognize, value, verify};
use nom::error::{ErrorKind, ParseError};
use nom::multi::many0_count;
use nom::sequence::{delimited, pair, terminated};
use nom::Parser;
use nom_language::error::{VerboseError, VerboseErrorKind};
use std::cell::Cell;

pub mod cpp;

/// Skips whitespace and comments. Never fails.
pub fn sp(input: &str) -> PResult<&str> {
    recognize(many0_count(alt((
        multispace1,
        recognize((tag("//"), not_line_ending)),
        recognize((tag("/*"), take_until("*/"), tag("*/"))),
    ))))
    .parse(input)
}

pub fn ws<'a, O, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = VerboseError<&'a str>>
where
    F: Parser<&'a str, Output = O, Error = VerboseError<&'a str>>,
{
    delimited(sp, inner, sp)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub fn identifier(input: &str) -> PResult<&str> {
    recognize(pair(
        satisfy(|c: char| c.is_alphabetic() || c == '_'),
        take_while(is_ident_char),
    ))
    .parse(input)
}

/// Matches `kw` only when it is not the prefix of a longer identifier.
pub fn keyword<'a>(kw: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = VerboseError<&'a str>> {
    terminated(tag(kw), not(satisfy(is_ident_char)))
}

/// Export macros such as `MY_API` or `DLL_EXPORT`.
pub fn is_api_macro(word: &str) -> bool {
    word.len() > 1
        && word.chars().any(|c| c.is_ascii_uppercase())
        && word
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

pub fn api_macro(input: &str) -> PResult<&str> {
    verify(identifier, |word: &str| is_api_macro(word)).parse(input)
}

/// `[[nodiscard]]`, `__attribute__((packed))`, `__declspec(dllexport)`, `alignas(8)`
pub fn attribute(input: &str) -> PResult<&str> {
    alt((
        recognize((tag("[["), take_until("]]"), tag("]]"))),
        recognize((
            alt((
                keyword("__attribute__"),
                keyword("__declspec"),
                keyword("alignas"),
            )),
            sp,
            balanced('(', ')'),
        )),
    ))
    .parse(input)
}

pub fn skip_attributes(input: &str) -> PResult<()> {
    value((), many0_count(terminated(attribute, sp))).parse(input)
}

/// `static_assert(...);`
pub fn static_assertion(input: &str) -> PResult<&str> {
    recognize((
        alt((keyword("static_assert"), keyword("_Static_assert"))),
        sp,
        balanced('(', ')'),
        sp,
        char(';'),
    ))
    .parse(input)
}

/// Bare macro invocations such as `GENERATED_BODY()`, `DECLARE_FOO(Bar);` or a
/// lone `Q_OBJECT` line.
pub fn macro_invocation(input: &str) -> PResult<&str> {
    alt((
        recognize((api_macro, sp, balanced('(', ')'), opt((sp, char(';'))))),
        recognize((api_macro, space0, peek(line_ending))),
    ))
    .parse(input)
}

/// `'` inside a number such as `1'000` or `0xFF'FF`, as opposed to `u8'x'`.
fn is_digit_separator(bytes: &[u8], i: usize) -> bool {
    let token_start = bytes[..i]
        .iter()
        .rposition(|&b| !(b.is_ascii_alphanumeric() || b == b'_' || b == b'\''))
        .map_or(0, |position| position + 1);

    i > token_start
        && bytes[token_start].is_ascii_digit()
        && bytes[i - 1].is_ascii_hexdigit()
        && bytes.get(i + 1).is_some_and(|b| b.is_ascii_alphanumeric())
}

/// Returns the index just past a string/char literal or comment starting at `i`.
fn skip_literal_or_comment(bytes: &[u8], i: usize) -> Option<usize> {
    match bytes[i] {
        b'\'' if is_digit_separator(bytes, i) => Some(i + 1),
        quote @ (b'"' | b'\'') => {
            let mut j = i + 1;
            while j < bytes.len() {
                match bytes[j] {
                    b'\\' => j += 2,
                    c if c == quote => return Some(j + 1),
                    _ => j += 1,
                }
            }
            Some(bytes.len())
        }
        b'/' if bytes.get(i + 1) == Some(&b'/') => Some(
            bytes[i..]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(bytes.len(), |end| i + end),
        ),
        b'/' if bytes.get(i + 1) == Some(&b'*') => Some(
            bytes[i + 2..]
                .windows(2)
                .position(|w| w == b"*/")
                .map_or(bytes.len(), |end| i + 2 + end + 2),
        ),
        _ => None,
    }
}

/// Recognizes a block delimited by `open`/`close`, including nested blocks,
/// literals and comments. Used to skip function bodies and initializers.
pub fn balanced<'a>(open: char, close: char) -> impl Fn(&'a str) -> PResult<'a, &'a str> {
    move |input: &'a str| {
        if !input.starts_with(open) {
            return Err(nom::Err::Error(VerboseError::from_char(input, open)));
        }

        let bytes = input.as_bytes();
        let (open, close) = (open as u8, close as u8);
        let mut depth = 0usize;
        let mut i = 0;
        while i < bytes.len() {
            if let Some(next) = skip_literal_or_comment(bytes, i) {
                i = next;
                continue;
            }

            if bytes[i] == open {
                depth += 1;
            } else if bytes[i] == close {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[i + 1..], &input[..i + 1]));
                }
            }
            i += 1;
        }

        Err(nom::Err::Error(VerboseError::from_char(
            &input[input.len()..],
            close as char,
        )))
    }
}

/// Consumes an expression up to the first `stops` character or unbalanced closing
/// bracket outside of any brackets. `<`/`>` count as brackets when `angles` is
/// set and no parenthesis, square bracket or brace is open.
pub fn scan_expression<'a>(input: &'a str, stops: &[char], angles: bool) -> PResult<'a, &'a str> {
    let bytes = input.as_bytes();
    let mut open: Vec<u8> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if let Some(next) = skip_literal_or_comment(bytes, i) {
            i = next;
            continue;
        }

        let c = bytes[i];
        if open.is_empty() && (c == b';' || stops.contains(&(c as char))) {
            break;
        }
        match c {
            b'(' | b'[' | b'{' => open.push(c),
            b'<' if angles && !open.iter().any(|&b| b != b'<') => open.push(c),
            b'>' if angles && open.last() == Some(&b'<') => {
                open.pop();
            }
            b'>' if angles && open.is_empty() => break,
            b')' | b']' | b'}' => {
                let opener = match c {
                    b')' => b'(',
                    b']' => b'[',
                    _ => b'{',
                };
                match open.iter().rposition(|&b| b == opener) {
                    Some(position) => open.truncate(position),
                    None => break,
                }
            }
            _ => {}
        }
        i += 1;
    }

    let expression = input[..i].trim();
    if expression.is_empty() {
        return Err(nom::Err::Error(VerboseError::from_error_kind(
            input,
            ErrorKind::TakeUntil,
        )));
    }

    Ok((&input[i..], expression))
}

/// Strips the outer delimiters of a [`balanced`] block.
pub fn inner(block: &str) -> &str {
    block[1..block.len() - 1].trim()
}

/// Deepest nesting of blocks and template argument lists the parser descends into.
pub const MAX_NESTING: usize = 64;

thread_local! {
    static NESTING: Cell<usize> = const { Cell::new(0) };
}

/// One level of nesting, held while a nested block is parsed.
#[derive(Debug)]
pub struct Nesting(());

impl Nesting {
    /// Fails with "shallower nesting" once [`MAX_NESTING`] levels are open.
    pub fn enter(input: &str) -> Result<Nesting, nom::Err<VerboseError<&str>>> {
        NESTING.with(|depth| {
            if depth.get() >= MAX_NESTING {
                return Err(unrecognized(input, "shallower nesting"));
            }
            depth.set(depth.get() + 1);
            Ok(Nesting(()))
        })
    }
}

impl Drop for Nesting {
    fn drop(&mut self) {
        NESTING.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Commits to a failure at `input`, reporting that `what` was expected there.
pub fn unrecognized<'a>(input: &'a str, what: &'static str) -> nom::Err<VerboseError<&'a str>> {
    nom::Err::Failure(VerboseError {
        errors: vec![(input, VerboseErrorKind::Context(what))],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sp_skips_comments() {
        let input = "  // one\n /* two */\t x";
        assert_eq!(sp(input).map(|(rest, _)| rest), Ok("x"));
    }

    #[test]
    fn test_keyword_boundary() {
        assert!(keyword("const").parse("constexpr int").is_err());
        assert_eq!(keyword("const").parse("const int"), Ok((" int", "const")));
    }

    #[test]
    fn test_api_macro() {
        assert!(is_api_macro("MY_API"));
        assert!(is_api_macro("ENGINE_API2"));
        assert!(!is_api_macro("Foo"));
        assert!(!is_api_macro("A"));
        assert!(!is_api_macro("_"));
    }

    #[test]
    fn test_balanced_braces() {
        let input = "{ if (x) { y = \"}\"; } /* } */ } rest";
        let (rest, block) = balanced('{', '}')(input).unwrap();
        assert_eq!(rest, " rest");
        assert_eq!(block, "{ if (x) { y = \"}\"; } /* } */ }");
    }

    #[test]
    fn test_balanced_unterminated() {
        assert!(balanced('{', '}')("{ never closed").is_err());
    }

    #[test]
    fn test_scan_expression_stops() {
        assert_eq!(scan_expression("a + (b, c), d", &[','], false), Ok((", d", "a + (b, c)")));
        assert_eq!(scan_expression(" 42 ;", &[','], false), Ok((";", "42")));
        assert_eq!(scan_expression("std::pair<A, B>> x", &[','], true), Ok(("> x", "std::pair<A, B>")));
        assert!(scan_expression(" )", &[','], false).is_err());
    }

    #[test]
    fn test_scan_expression_comparison_in_parentheses() {
        assert_eq!(scan_expression("(1 > 0)> rest", &[','], true), Ok(("> rest", "(1 > 0)")));
        assert_eq!(
            scan_expression("std::enable_if_t<(sizeof(T) > 4)>> x", &[','], true),
            Ok(("> x", "std::enable_if_t<(sizeof(T) > 4)>"))
        );
        assert_eq!(scan_expression("a[i > 0 ? 1 : 2], b", &[','], true), Ok((", b", "a[i > 0 ? 1 : 2]")));
    }

    #[test]
    fn test_digit_separators_are_not_quotes() {
        assert_eq!(scan_expression("0xFF'FF, x", &[','], false), Ok((", x", "0xFF'FF")));
        let (rest, block) = balanced('{', '}')("{ return 1'000'000; } rest").unwrap();
        assert_eq!(rest, " rest");
        assert_eq!(block, "{ return 1'000'000; }");
        let (rest, _) = balanced('{', '}')("{ char c = '}'; auto d = u8'}'; } rest").unwrap();
        assert_eq!(rest, " rest");
    }

    #[test]
    fn test_nesting_limit() {
        let levels = (0..MAX_NESTING)
            .map(|_| Nesting::enter("{").unwrap())
            .collect::<Vec<_>>();
        assert!(matches!(Nesting::enter("{"), Err(nom::Err::Failure(_))));

        drop(levels);
        assert!(Nesting::enter("{").is_ok());
    }

    #[test]
    fn test_macro_invocation() {
        assert_eq!(macro_invocation("GENERATED_BODY()\n"), Ok(("\n", "GENERATED_BODY()")));
        assert_eq!(macro_invocation("DECLARE_DELEGATE(FOnDone);"), Ok(("", "DECLARE_DELEGATE(FOnDone);")));
        assert_eq!(macro_invocation("Q_OBJECT\n public:"), Ok(("\n public:", "Q_OBJECT")));
        assert!(macro_invocation("MY_API void run();").is_err());
    }

    #[test]
    fn test_static_assertion() {
        let input = "static_assert(sizeof(int) == 4, \"int size\");";
        assert_eq!(static_assertion(input), Ok(("", input)));
    }

    #[test]
    fn test_attributes() {
        let input = "[[nodiscard]] __attribute__((visibility(\"default\"))) int";
        assert_eq!(skip_attributes(input), Ok(("int", ())));
    }
}
