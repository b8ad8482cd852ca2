use std::{collections::BTreeMap, path::PathBuf, process::Command};

use serde::{Deserialize, Serialize, de::value::MapDeserializer};
use serde_json::Value;

/// One addon the driver script is asked to load: the directory to put on
/// Blender's addon path and the module name to enable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonToLoad {
    pub load_dir: PathBuf,
    pub module_name: String,
}

/// Environment variables consumed by the driver script running inside the
/// launched Blender process.
///
/// Values are plain strings because the consumer is a Python script reading
/// `os.environ`, not another Rust binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct LaunchVars {
    /// JSON-encoded sequence of [AddonToLoad] records, in registration order.
    pub addons_to_load: String,

    /// Port of the editor-side communication server, in decimal.
    pub editor_port: String,

    /// "yes" or "no": may the driver script install packages into the
    /// external Python environment?
    pub allow_modify_external_python: String,
}

pub trait EnvVars: Serialize + Sized {
    /// Flattens the variables into name/value pairs suitable for a child
    /// process environment.
    fn to_map(&self) -> Result<BTreeMap<String, String>, serde_json::Error> {
        serialize(self)
    }
}

impl EnvVars for LaunchVars {}

pub trait CommandExt {
    fn with_env_vars(&mut self, vars: &impl EnvVars) -> &mut Self;
}

impl CommandExt for Command {
    fn with_env_vars(&mut self, vars: &impl EnvVars) -> &mut Self {
        let map = vars.to_map().expect("failed to serialize env vars");
        for (name, value) in map {
            self.env(name, value);
        }
        self
    }
}

pub fn serialize<T: Serialize>(input: &T) -> Result<BTreeMap<String, String>, serde_json::Error> {
    let value = serde_json::to_value(input)?;
    let map: BTreeMap<String, Value> = serde_json::from_value(value)?;

    Ok(map
        .into_iter()
        .map(|(name, value)| {
            let text = match value {
                Value::String(text) => text,
                other => other.to_string(),
            };

            (name, text)
        })
        .collect())
}

pub fn deserialize<'de, T: Deserialize<'de>>(
    input: impl IntoIterator<Item = (String, String)>,
) -> Result<T, serde_json::Error> {
    T::deserialize(MapDeserializer::new(input.into_iter()))
}
