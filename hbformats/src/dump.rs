//! JSON diagnostic dumps of decoded databases.

use crate::Error;
use serde::Serialize;
use std::path::Path;

/// Serializes a decoded entity graph for inspection.
pub trait JsonDump: Serialize {
    fn to_json(&self, pretty: bool) -> Result<String, Error> {
        let out = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(out)
    }

    fn dump_json(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        std::fs::write(path, self.to_json(true)?)?;
        Ok(())
    }
}
