//! Config command: print the resolved configuration as TOML-ish key/values.

use std::io::Write;

use anyhow::Result;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let value = serde_json::to_value(config)?;
    if let serde_json::Value::Object(map) = value {
        for (key, value) in map {
            writeln!(writer, "{key} = {value}")?;
        }
    }
    Ok(())
}
