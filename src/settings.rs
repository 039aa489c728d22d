//! Client settings, layered from defaults, an optional file and the
//! environment (`BUILDLINK_*`, with `__` separating nested keys).

use std::io::Read;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::codec::{DEFAULT_MAX_STRING_LEN, Decoder};
use crate::compat::CompatibilityContext;
use crate::error::Result;

pub const ENV_PREFIX: &str = "BUILDLINK";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompatibilitySettings {
    pub root_dir: Option<PathBuf>,
    pub build_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodecSettings {
    pub max_string_len: usize,
}

impl CodecSettings {
    pub fn decoder<R: Read>(&self, reader: R) -> Decoder<R> {
        Decoder::with_max_string_len(reader, self.max_string_len)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    #[serde(default)]
    pub compatibility: CompatibilitySettings,
    pub log_filter: String,
    pub codec: CodecSettings,
}

impl ClientSettings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("log_filter", "info")?
            .set_default("codec.max_string_len", DEFAULT_MAX_STRING_LEN as u64)?;
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).prefix_separator("_").separator("__"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
    /// `None` unless a root directory is configured.
    pub fn compatibility_context(&self) -> Result<Option<CompatibilityContext>> {
        let Some(root_dir) = &self.compatibility.root_dir else {
            return Ok(None);
        };
        let context = match &self.compatibility.build_name {
            Some(name) => CompatibilityContext::new(name.clone(), root_dir.clone())?,
            None => CompatibilityContext::for_root_dir(root_dir.clone())?,
        };
        Ok(Some(context))
    }
}
