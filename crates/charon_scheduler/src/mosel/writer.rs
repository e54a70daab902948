use std::{
    fmt::{self, Write},
    path::Path,
};

use crate::storage::write_bytes;

use super::value::Document;

/// Writes one `Key: value` line per definition.
pub fn write_document<W: Write>(writer: &mut W, document: &Document) -> fmt::Result {
    for (key, value) in document.entries() {
        writeln!(writer, "{key}: {value}")?;
    }

    Ok(())
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_document(f, self)
    }
}

pub fn document_to_string(document: &Document) -> String {
    document.to_string()
}

/// Saves `document` to `path`, gzip compressed when the path ends with `.gz`.
pub fn save_document(path: &Path, document: &Document) -> Result<(), std::io::Error> {
    write_bytes(document_to_string(document).as_bytes(), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mosel::value::Value;

    #[test]
    fn test_write_layout() {
        let mut document = Document::new();
        document
            .insert("DS", "DEPOTSTART")
            .insert("FuelPerMeter", 1e-5)
            .insert("Vehicles", Value::texts(["Vehicle1", "Vehicle2"]))
            .insert("Trips", Value::List(vec![]))
            .insert(
                "FE",
                Value::Table(vec![
                    (vec![Value::text("Vehicle1"), Value::text("Trip1")], Value::Real(0.55)),
                    (vec![Value::text("Trip1"), Value::text("Trip2")], Value::Real(0.0)),
                ]),
            )
            .insert("Routes", Value::Table(vec![(vec![Value::Integer(3)], Value::texts(["Trip1"]))]));

        let mut written = String::new();
        write_document(&mut written, &document).unwrap();
        assert_eq!(written, document.to_string());
        assert_eq!(
            document_to_string(&document),
            "DS: \"DEPOTSTART\"\n\
             FuelPerMeter: 1e-5\n\
             Vehicles: [\"Vehicle1\" \"Vehicle2\"]\n\
             Trips: []\n\
             FE: [\n\t(\"Vehicle1\" \"Trip1\") 0.55\n\t(\"Trip1\" \"Trip2\") 0.0\n]\n\
             Routes: [\n\t(3) [\"Trip1\"]\n]\n"
        );
    }
}
