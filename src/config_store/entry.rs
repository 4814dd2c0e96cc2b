use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ConfigError;

/// Configuration for a single agent, as stored and persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Instruction prompt for the agent.
    pub prompt: String,
    /// Tool identifiers, in the order the agent should see them.
    pub tools: Vec<String>,
    /// Free-form metadata.
    pub metadata: Map<String, Value>,
    /// When the store last accepted a write for this key.
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
}

/// The caller-supplied part of an entry.
///
/// `updated_at` is deliberately absent: the store always stamps it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryInput {
    /// Instruction prompt for the agent.
    pub prompt: String,
    /// Tool identifiers.
    pub tools: Vec<String>,
    /// Free-form metadata.
    pub metadata: Map<String, Value>,
}

impl EntryInput {
    /// Creates an input with the given prompt and no tools or metadata.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Appends a tool identifier.
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tools.push(tool.into());
        self
    }

    /// Sets a metadata field.
    pub fn with_metadata(mut self, field: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(field.into(), value);
        self
    }

    /// Parses a raw JSON payload into an input.
    ///
    /// All three of `prompt`, `tools` and `metadata` must be present with the
    /// right shape. A caller-supplied `updated_at` is ignored.
    ///
    /// # Errors
    /// Returns `ConfigError::Validation` naming the first missing or mistyped field.
    pub fn from_json(payload: &Value) -> Result<Self, ConfigError> {
        let object = payload
            .as_object()
            .ok_or_else(|| ConfigError::validation("payload", "expected a JSON object"))?;

        let prompt = match object.get("prompt") {
            Some(Value::String(prompt)) => prompt.clone(),
            Some(_) => return Err(ConfigError::validation("prompt", "expected a string")),
            None => return Err(ConfigError::validation("prompt", "field is required")),
        };

        let tools = match object.get("tools") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| ConfigError::validation("tools", "expected only strings"))
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(ConfigError::validation("tools", "expected an array")),
            None => return Err(ConfigError::validation("tools", "field is required")),
        };

        let metadata = match object.get("metadata") {
            Some(Value::Object(metadata)) => metadata.clone(),
            Some(_) => return Err(ConfigError::validation("metadata", "expected an object")),
            None => return Err(ConfigError::validation("metadata", "field is required")),
        };

        Ok(Self {
            prompt,
            tools,
            metadata,
        })
    }

    /// Checks the input is acceptable for storage.
    ///
    /// # Errors
    /// Returns `ConfigError::Validation` if the prompt is blank or a tool id is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prompt.trim().is_empty() {
            return Err(ConfigError::validation("prompt", "prompt cannot be empty"));
        }

        if let Some(index) = self.tools.iter().position(|tool| tool.trim().is_empty()) {
            return Err(ConfigError::validation(
                "tools",
                format!("tool at index {index} is empty"),
            ));
        }

        Ok(())
    }

    /// Builds the stored entry, stamping `updated_at`.
    ///
    /// The stamp never goes backwards relative to `previous`, so a key's
    /// timestamps are non-decreasing even if the wall clock steps back.
    pub(crate) fn into_entry(self, previous: Option<&ConfigEntry>) -> ConfigEntry {
        let now = Utc::now();
        let updated_at = match previous {
            Some(prev) if prev.updated_at > now => prev.updated_at,
            _ => now,
        };

        ConfigEntry {
            prompt: self.prompt,
            tools: self.tools,
            metadata: self.metadata,
            updated_at,
        }
    }
}

impl From<ConfigEntry> for EntryInput {
    fn from(entry: ConfigEntry) -> Self {
        Self {
            prompt: entry.prompt,
            tools: entry.tools,
            metadata: entry.metadata,
        }
    }
}

mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, de::Error};

    /// Accepts RFC 3339, or ISO-8601 without an offset (read as UTC).
    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;

        if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(parsed.with_timezone(&Utc));
        }

        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(D::Error::custom)
    }
}
