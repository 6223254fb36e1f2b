use anyhow::Result;
use serde_json::Value as JsonValue;
use std::io::{self, Write};

#[derive(Clone, Debug, PartialEq)]
pub enum OutputFormat {
    Yaml,
    Json,
    Raw,
}

pub fn render(fmt: &OutputFormat, data: &JsonValue) -> Result<String> {
    Ok(match fmt {
        OutputFormat::Yaml => serde_yaml::to_string(data)?.trim_end().to_string() + "\n",
        OutputFormat::Json => serde_json::to_string_pretty(data)? + "\n",
        OutputFormat::Raw => match data {
            JsonValue::String(s) => s.clone(),
            other => serde_json::to_string(other)?,
        },
    })
}

pub fn emit_data(fmt: &OutputFormat, data: &JsonValue) -> Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(render(fmt, data)?.as_bytes())?;
    out.flush()?;
    Ok(())
}

/// Writes `error: <message>` (with the context chain) to stderr as YAML.
pub fn emit_error(err: &anyhow::Error) -> Result<()> {
    let mut map = serde_json::Map::new();
    map.insert("error".into(), JsonValue::String(format!("{err:#}")));
    let s = serde_yaml::to_string(&JsonValue::Object(map))?;
    let _ = writeln!(io::stderr(), "{}", s.trim_end());
    Ok(())
}

/// Whole numbers as integers, non-finite ones as strings since JSON has no NaN.
pub fn number_value(ms: f64) -> JsonValue {
    if ms.is_finite() && ms.fract() == 0.0 && ms.abs() < 9.0e15 {
        JsonValue::from(ms as i64)
    } else if ms.is_finite() {
        JsonValue::from(ms)
    } else {
        JsonValue::String(format!("{ms}"))
    }
}
