use schemars::schema_for;

use crate::json::types;

pub fn generate_instance_schema() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&schema_for!(types::JsonInstance))
}

pub fn generate_taskgraph_schema() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&schema_for!(types::JsonTaskGraph))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_schema_names_fields() {
        let schema = generate_instance_schema().unwrap();

        assert!(schema.contains("fuelpermeter"));
        assert!(schema.contains("paretorefuelpoints"));
        assert!(schema.contains("start_longitude"));
    }
}
