//! Serde helpers writing non-finite values as `null`.
//!
//! A missing route is stored as `f64::INFINITY`, which JSON cannot represent.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub fn serialize<S>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    values
        .iter()
        .map(|value| value.is_finite().then_some(*value))
        .collect::<Vec<Option<f64>>>()
        .serialize(serializer)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Option<f64>>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .map(|value| value.unwrap_or(f64::INFINITY))
        .collect())
}

/// Same as the parent module for row-major nested matrices.
pub mod nested {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(rows: &[Vec<f64>], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        rows.iter()
            .map(|row| {
                row.iter()
                    .map(|value| value.is_finite().then_some(*value))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<Vec<Option<f64>>>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Vec<f64>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let rows = Vec::<Vec<Option<f64>>>::deserialize(deserializer)?;
        Ok(rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|value| value.unwrap_or(f64::INFINITY))
                    .collect()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Wrapper {
        #[serde(with = "super")]
        values: Vec<f64>,
    }

    #[test]
    fn test_infinity_is_written_as_null() {
        let wrapper = Wrapper {
            values: vec![1.5, f64::INFINITY],
        };

        let json = serde_json::to_string(&wrapper).unwrap();
        assert_eq!(json, r#"{"values":[1.5,null]}"#);

        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back, wrapper);
    }
}
