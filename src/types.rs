use nom::IResult;
use nom_language::error::VerboseError;

/// Result of every parser in this crate.
pub type PResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// Implement this trait for each logical code structure you want to transform into a rust struct.
/// Examples for structures are files, classes, enums, namespaces
pub trait Parsable<'a>: Sized {
    fn parse(input: &'a str) -> PResult<'a, Self>;
}
