use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning for [`crate::ProfileEngine`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Overall budget for one reconstruction, covering every ledger call it
    /// makes. `None` waits indefinitely.
    #[serde(rename = "deadline_ms", with = "millis")]
    pub deadline: Option<Duration>,
    /// How many transfer hops back from the queried address are followed.
    /// Sources beyond this are treated as never established.
    pub max_transfer_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deadline: None,
            max_transfer_depth: 64,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
