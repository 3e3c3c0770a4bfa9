//! Reads a header, parses it and writes its JSON description.

use crate::error::{HeaderError, SyntaxError};
use crate::parser::cpp::header::{CppHeader, parse_cpp_header};
use crate::parser::cpp::namespace::CppScope;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Written next to the executable when no output path is given.
pub const DEFAULT_OUTPUT_FILE: &str = "data.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Indented output with 4 spaces, otherwise a single line
    pub pretty: bool,
}

impl ConvertOptions {
    /// Falls back to [`default_output_path`] when `output` is `None`.
    pub fn new(
        input: impl Into<PathBuf>,
        output: Option<PathBuf>,
        pretty: bool,
    ) -> Result<Self, HeaderError> {
        let output = match output {
            Some(output) => output,
            None => default_output_path()?,
        };

        Ok(ConvertOptions {
            input: input.into(),
            output,
            pretty,
        })
    }
}

/// `data.json` in the directory of the running executable.
pub fn default_output_path() -> Result<PathBuf, HeaderError> {
    let executable =
        std::env::current_exe().map_err(|source| HeaderError::OutputLocation { source })?;
    let directory = executable
        .parent()
        .ok_or_else(|| HeaderError::OutputLocation {
            source: io::Error::new(
                io::ErrorKind::NotFound,
                "the executable path has no parent directory",
            ),
        })?;

    Ok(directory.join(DEFAULT_OUTPUT_FILE))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeclarationCounts {
    pub namespaces: usize,
    pub classes: usize,
    pub functions: usize,
    pub variables: usize,
    pub enums: usize,
    pub typedefs: usize,
}

impl DeclarationCounts {
    /// Counts the declarations of `scope` and of every namespace nested in it.
    pub fn of(scope: &CppScope<'_>) -> Self {
        let mut counts = DeclarationCounts {
            namespaces: scope.namespaces.len(),
            classes: scope.classes.len(),
            functions: scope.functions.len(),
            variables: scope.variables.len(),
            enums: scope.enums.len(),
            typedefs: scope.typedefs.len(),
        };
        for namespace in &scope.namespaces {
            let nested = DeclarationCounts::of(&namespace.scope);
            counts.namespaces += nested.namespaces;
            counts.classes += nested.classes;
            counts.functions += nested.functions;
            counts.variables += nested.variables;
            counts.enums += nested.enums;
            counts.typedefs += nested.typedefs;
        }
        counts
    }
}

impl fmt::Display for DeclarationCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [
            (self.namespaces, "namespace", "namespaces"),
            (self.classes, "class", "classes"),
            (self.functions, "function", "functions"),
            (self.variables, "variable", "variables"),
            (self.enums, "enum", "enums"),
            (self.typedefs, "typedef", "typedefs"),
        ]
        .into_iter()
        .filter(|(count, _, _)| *count > 0)
        .map(|(count, one, many)| format!("{count} {}", if count == 1 { one } else { many }))
        .collect::<Vec<_>>();

        if parts.is_empty() {
            write!(f, "no declarations")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertSummary {
    pub output: PathBuf,
    pub bytes: usize,
    pub counts: DeclarationCounts,
}

/// The written document: the header description with the input path in front.
#[derive(Serialize)]
struct Document<'a> {
    file: Cow<'a, str>,
    #[serde(flatten)]
    header: &'a CppHeader<'a>,
}

pub fn read_header(path: &Path) -> Result<String, HeaderError> {
    let bytes = fs::read(path).map_err(|source| HeaderError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    match String::from_utf8(bytes) {
        Ok(source) => Ok(source),
        Err(err) => {
            warn!(path = %path.display(), "header is not valid UTF-8, replacing invalid bytes");
            Ok(String::from_utf8_lossy(err.as_bytes()).into_owned())
        }
    }
}

pub fn parse_header<'a>(path: &Path, source: &'a str) -> Result<CppHeader<'a>, HeaderError> {
    let syntax_error = |error| HeaderError::Parse {
        path: path.to_path_buf(),
        error,
    };

    match parse_cpp_header(source) {
        Ok(("", header)) => Ok(header),
        Ok((rest, _)) => Err(syntax_error(SyntaxError::at(source, rest, "end of input"))),
        Err(err) => Err(syntax_error(SyntaxError::from_nom(source, err))),
    }
}

/// Serializes the whole document in memory, followed by a newline.
pub fn to_json(path: &Path, header: &CppHeader<'_>, pretty: bool) -> Result<Vec<u8>, HeaderError> {
    let document = Document {
        file: path.to_string_lossy(),
        header,
    };
    let serialize_error = |source| HeaderError::Serialize {
        path: path.to_path_buf(),
        source,
    };

    let mut buffer = Vec::new();
    if pretty {
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        document.serialize(&mut serializer).map_err(serialize_error)?;
    } else {
        serde_json::to_writer(&mut buffer, &document).map_err(serialize_error)?;
    }
    buffer.push(b'\n');

    Ok(buffer)
}

/// Replaces `output` with `contents`. The data goes to a temporary file in the
/// same directory first, so a failed write leaves the previous file intact.
pub fn write_output(path: &Path, output: &Path, contents: &[u8]) -> Result<(), HeaderError> {
    let write_error = |source: io::Error| HeaderError::Write {
        path: path.to_path_buf(),
        output: output.to_path_buf(),
        source,
    };

    let directory = match output.parent() {
        Some(directory) if !directory.as_os_str().is_empty() => directory,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(directory).map_err(write_error)?;
    file.write_all(contents).map_err(write_error)?;
    file.flush().map_err(write_error)?;
    file.persist(output).map_err(|err| write_error(err.error))?;

    Ok(())
}

pub fn convert(options: &ConvertOptions) -> Result<ConvertSummary, HeaderError> {
    info!(input = %options.input.display(), output = %options.output.display(), "converting header");

    let source = read_header(&options.input)?;
    debug!(bytes = source.len(), "read header");

    let header = parse_header(&options.input, &source)?;
    let counts = DeclarationCounts::of(&header.scope);
    debug!(%counts, includes = header.includes.len(), "parsed header");

    let json = to_json(&options.input, &header, options.pretty)?;
    write_output(&options.input, &options.output, &json)?;
    info!(bytes = json.len(), "wrote {}", options.output.display());

    Ok(ConvertSummary {
        output: options.output.clone(),
        bytes: json.len(),
        counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn options(dir: &Path, source: &str, pretty: bool) -> ConvertOptions {
        let input = dir.join("input.h");
        fs::write(&input, source).unwrap();
        ConvertOptions {
            input,
            output: dir.join("data.json"),
            pretty,
        }
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_convert_describes_the_header() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path(), "class A { int x; };", true);

        let summary = convert(&options).unwrap();
        assert_eq!(summary.counts.classes, 1);

        let json = read_json(&options.output);
        assert_eq!(json["file"], &*options.input.to_string_lossy());
        assert_eq!(json["classes"][0]["name"], "A");
        assert_eq!(json["classes"][0]["kind"], "class");
        let member = &json["classes"][0]["members"]["private"][0];
        assert_eq!(member["name"], "x");
        assert_eq!(member["type"], "int");
        assert!(json["includes"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_pretty_output_uses_four_spaces() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path(), "int f();", true);
        convert(&options).unwrap();

        let text = fs::read_to_string(&options.output).unwrap();
        assert!(text.starts_with("{\n    \"file\": "));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_compact_output_is_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path(), "int f();", false);
        convert(&options).unwrap();

        let text = fs::read_to_string(&options.output).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_second_run_replaces_the_output() {
        let dir = tempfile::tempdir().unwrap();
        let first = options(dir.path(), "struct First {};", true);
        convert(&first).unwrap();

        let second = options(dir.path(), "enum Second { A, B };", true);
        convert(&second).unwrap();

        let json = read_json(&second.output);
        assert!(json["classes"].as_array().unwrap().is_empty());
        assert_eq!(json["enums"][0]["name"], "Second");
        assert_eq!(json["enums"][0]["variants"][1]["value"], 1);
    }

    #[test]
    fn test_parse_error_keeps_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path(), "class Broken { int x y; };", true);
        fs::write(&options.output, "previous").unwrap();

        let err = convert(&options).unwrap_err();
        assert!(matches!(err, HeaderError::Parse { .. }));
        assert!(err.to_string().contains("input.h"));
        assert_eq!(fs::read_to_string(&options.output).unwrap(), "previous");
    }

    #[test]
    fn test_missing_input_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = ConvertOptions {
            input: dir.path().join("missing.h"),
            output: dir.path().join("data.json"),
            pretty: true,
        };

        let err = convert(&options).unwrap_err();
        assert!(matches!(err, HeaderError::Read { .. }));
        assert!(!options.output.exists());
    }

    #[test]
    fn test_unwritable_output_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = options(dir.path(), "int x;", true);
        options.output = dir.path().join("missing").join("data.json");

        let err = convert(&options).unwrap_err();
        assert!(matches!(err, HeaderError::Write { .. }));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("latin1.h");
        fs::write(&input, b"// caf\xe9\nint x;\n").unwrap();

        let source = read_header(&input).unwrap();
        assert!(source.contains('\u{fffd}'));
    }

    #[test]
    fn test_counts_include_nested_namespaces() {
        let source = "namespace a { class B {}; namespace c { void f(); void g(); } }";
        let header = parse_header(Path::new("x.h"), source).unwrap();
        let counts = DeclarationCounts::of(&header.scope);
        assert_eq!(counts.to_string(), "2 namespaces, 1 class, 2 functions");
        assert_eq!(DeclarationCounts::default().to_string(), "no declarations");
    }

    #[test]
    fn test_default_output_is_next_to_the_executable() {
        let path = default_output_path().unwrap();
        assert_eq!(path.file_name().unwrap(), DEFAULT_OUTPUT_FILE);
    }
}
