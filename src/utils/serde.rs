use serde::{Deserializer, de};
use std::fmt;
use std::str::FromStr;

use crate::types::DiffStatus;

/// Deserializes a status list from either a delimited string (environment
/// variables) or a sequence. Items may be separated by commas or newlines.
pub fn deserialize_statuses<'de, D>(deserializer: D) -> Result<Vec<DiffStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StatusListVisitor;

    impl<'de> de::Visitor<'de> for StatusListVisitor {
        type Value = Vec<DiffStatus>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a delimited string or a sequence of diff statuses")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            split_items(value)
                .into_iter()
                .map(|item| parse_status(&item))
                .collect()
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: de::SeqAccess<'de>,
        {
            let mut statuses = Vec::new();
            while let Some(item) = seq.next_element::<String>()? {
                statuses.push(parse_status(item.trim())?);
            }
            Ok(statuses)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(StatusListVisitor)
}

fn split_items(value: &str) -> Vec<String> {
    value
        .split([',', '\n'])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_status<E: de::Error>(item: &str) -> Result<DiffStatus, E> {
    // accept both `source_only` and the display form `source-only`
    let normalized = item.replace('-', "_");
    DiffStatus::from_str(&normalized)
        .map_err(|_| E::custom(format!("unknown diff status '{}'", item)))
}
