//! Recursive descent parser for the solver text format.
//!
//! Every rule takes the immutable input and an offset, and returns the parsed
//! value with the offset right after it.

use thiserror::Error;

use super::value::{Document, Value};

#[derive(Debug, Error, PartialEq)]
#[error("Parse error at line {line}, column {column}: expected {expected}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub expected: String,
}

impl ParseError {
    fn at(input: &str, offset: usize, expected: impl Into<String>) -> Self {
        let consumed = &input[..offset.min(input.len())];
        let line = consumed.matches('\n').count() + 1;
        let column = consumed
            .rfind('\n')
            .map_or(consumed.chars().count(), |newline| {
                consumed[newline + 1..].chars().count()
            })
            + 1;

        Self {
            line,
            column,
            expected: expected.into(),
        }
    }
}

type ParseResult<T> = Result<(T, usize), ParseError>;

fn peek(input: &str, offset: usize) -> Option<u8> {
    input.as_bytes().get(offset).copied()
}

/// Skips whitespace and `!` comments.
fn skip_blank(input: &str, mut offset: usize) -> usize {
    while let Some(byte) = peek(input, offset) {
        match byte {
            b' ' | b'\t' | b'\r' | b'\n' => offset += 1,
            b'!' => {
                offset = input[offset..]
                    .find('\n')
                    .map_or(input.len(), |newline| offset + newline);
            }
            _ => break,
        }
    }

    offset
}

fn is_word_byte(byte: u8) -> bool {
    !matches!(
        byte,
        b' ' | b'\t' | b'\r' | b'\n' | b'[' | b']' | b'(' | b')' | b'"' | b'\'' | b'!' | b':'
    )
}

fn expect(input: &str, offset: usize, byte: u8) -> Result<usize, ParseError> {
    if peek(input, offset) == Some(byte) {
        Ok(offset + 1)
    } else {
        Err(ParseError::at(input, offset, format!("'{}'", byte as char)))
    }
}

fn parse_quoted(input: &str, offset: usize) -> ParseResult<Value> {
    let Some(quote) = peek(input, offset).filter(|byte| *byte == b'"' || *byte == b'\'') else {
        return Err(ParseError::at(input, offset, "a quoted string"));
    };

    let start = offset + 1;
    match input[start..].find(quote as char) {
        Some(length) => Ok((
            Value::text(&input[start..start + length]),
            start + length + 1,
        )),
        None => Err(ParseError::at(input, input.len(), "a closing quote")),
    }
}

/// Numbers, and bare words as text.
fn parse_word(input: &str, offset: usize) -> ParseResult<Value> {
    let end = input[offset..]
        .bytes()
        .position(|byte| !is_word_byte(byte))
        .map_or(input.len(), |length| offset + length);

    if end == offset {
        return Err(ParseError::at(input, offset, "a value"));
    }

    let word = &input[offset..end];
    let value = if let Ok(integer) = word.parse::<i64>() {
        Value::Integer(integer)
    } else if let Ok(real) = word.parse::<f64>() {
        Value::Real(real)
    } else {
        Value::text(word)
    };

    Ok((value, end))
}

fn parse_scalar(input: &str, offset: usize) -> ParseResult<Value> {
    match peek(input, offset) {
        Some(b'"') | Some(b'\'') => parse_quoted(input, offset),
        _ => parse_word(input, offset),
    }
}

/// `(a b) value`
fn parse_table_entry(input: &str, offset: usize) -> ParseResult<(Vec<Value>, Value)> {
    let mut offset = skip_blank(input, expect(input, offset, b'(')?);
    let mut index = Vec::new();

    while peek(input, offset) != Some(b')') {
        if peek(input, offset).is_none() {
            return Err(ParseError::at(input, offset, "')'"));
        }
        let (key, next) = parse_scalar(input, offset)?;
        index.push(key);
        offset = skip_blank(input, next);
    }

    if index.is_empty() {
        return Err(ParseError::at(input, offset, "an index"));
    }

    let offset = skip_blank(input, offset + 1);
    let (value, offset) = parse_value(input, offset)?;

    Ok(((index, value), offset))
}

/// `[...]`, a table when the first element is parenthesized.
fn parse_bracketed(input: &str, offset: usize) -> ParseResult<Value> {
    let mut offset = skip_blank(input, expect(input, offset, b'[')?);

    if peek(input, offset) == Some(b'(') {
        let mut entries = Vec::new();
        while peek(input, offset) != Some(b']') {
            let (entry, next) = parse_table_entry(input, offset)?;
            entries.push(entry);
            offset = skip_blank(input, next);
        }
        return Ok((Value::Table(entries), offset + 1));
    }

    let mut values = Vec::new();
    while peek(input, offset) != Some(b']') {
        if peek(input, offset).is_none() {
            return Err(ParseError::at(input, offset, "']'"));
        }
        let (value, next) = parse_value(input, offset)?;
        values.push(value);
        offset = skip_blank(input, next);
    }

    Ok((Value::List(values), offset + 1))
}

pub fn parse_value(input: &str, offset: usize) -> ParseResult<Value> {
    match peek(input, offset) {
        Some(b'[') => parse_bracketed(input, offset),
        Some(_) => parse_scalar(input, offset),
        None => Err(ParseError::at(input, offset, "a value")),
    }
}

fn parse_key(input: &str, offset: usize) -> ParseResult<String> {
    let end = input[offset..]
        .bytes()
        .position(|byte| !(byte.is_ascii_alphanumeric() || byte == b'_'))
        .map_or(input.len(), |length| offset + length);

    if end == offset {
        return Err(ParseError::at(input, offset, "a definition name"));
    }

    Ok((input[offset..end].to_owned(), end))
}

/// Parses a sequence of `Key: value` definitions.
pub fn parse_document(input: &str) -> Result<Document, ParseError> {
    let mut entries = Vec::new();
    let mut offset = skip_blank(input, 0);

    while offset < input.len() {
        let (key, next) = parse_key(input, offset)?;
        let next = skip_blank(input, next);
        let next = skip_blank(input, expect(input, next, b':')?);
        let (value, next) = parse_value(input, next)?;

        entries.push((key, value));
        offset = skip_blank(input, next);
    }

    Ok(entries.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mosel::writer::document_to_string;

    #[test]
    fn test_parse_scalars_and_lists() {
        let document = parse_document(
            "! generated\nDS: \"DEPOTSTART\"\nCount: 3\nRate: 1e-5\nItems: [a \"b c\" 2.5]\nEmpty: []\n",
        )
        .unwrap();

        assert_eq!(document.get("DS"), Some(&Value::text("DEPOTSTART")));
        assert_eq!(document.get("Count"), Some(&Value::Integer(3)));
        assert_eq!(document.get("Rate"), Some(&Value::Real(1e-5)));
        assert_eq!(
            document.get("Items"),
            Some(&Value::List(vec![
                Value::text("a"),
                Value::text("b c"),
                Value::Real(2.5)
            ]))
        );
        assert_eq!(document.get("Empty"), Some(&Value::List(vec![])));
    }

    #[test]
    fn test_parse_tables() {
        let document = parse_document(
            "Duties: [\n\t(Vehicle1) [\"Trip1\" \"\" \"RefuelPoint2\"]\n\t(\"Vehicle2\") []\n]\nFE: [(\"a\" \"b\") 0.5 (c d) 1]",
        )
        .unwrap();

        let duties = document.get("Duties").and_then(Value::as_table).unwrap();
        assert_eq!(duties.len(), 2);
        assert_eq!(duties[0].0, vec![Value::text("Vehicle1")]);
        assert_eq!(
            duties[0].1,
            Value::texts(["Trip1", "", "RefuelPoint2"])
        );
        assert_eq!(duties[1].1, Value::List(vec![]));

        let fe = document.get("FE").and_then(Value::as_table).unwrap();
        assert_eq!(fe[1].0, vec![Value::text("c"), Value::text("d")]);
        assert_eq!(fe[1].1, Value::Integer(1));
    }

    #[test]
    fn test_written_documents_parse_back() {
        let mut document = Document::new();
        document
            .insert("Vehicles", Value::texts(["Vehicle1"]))
            .insert(
                "Nout",
                Value::Table(vec![(
                    vec![Value::text("Vehicle1")],
                    Value::texts(["Trip1", "DEPOTEND"]),
                )]),
            )
            .insert("FuelPerMeter", 1e-5);

        let parsed = parse_document(&document_to_string(&document)).unwrap();

        assert_eq!(parsed, document);
    }

    #[test]
    fn test_error_position() {
        let error = parse_document("DS: \"DEPOTSTART\"\nVehicles: [a b\n").unwrap_err();

        assert_eq!(error.line, 3);
        assert_eq!(error.expected, "']'");

        let error = parse_document("DS \"DEPOTSTART\"").unwrap_err();
        assert_eq!((error.line, error.column), (1, 4));
        assert_eq!(error.expected, "':'");
    }
}
