#![deny(clippy::all, clippy::pedantic)]

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::CliError;

fn read_source(path: &Path) -> Result<String, CliError> {
    let input_error = |source| CliError::InputFile {
        path: path.display().to_string(),
        source,
    };
    if path.as_os_str() == "-" {
        let mut data = String::new();
        std::io::stdin()
            .read_to_string(&mut data)
            .map_err(input_error)?;
        Ok(data)
    } else {
        fs::read_to_string(path).map_err(input_error)
    }
}

/// Inline JSON or a file; the file wins when both are given. Absent input is `null`.
pub fn read_json(inline: Option<String>, file: Option<PathBuf>) -> Result<Value, CliError> {
    let text = match (inline, file) {
        (_, Some(path)) => read_source(&path)?,
        (Some(text), None) => text,
        (None, None) => return Ok(Value::Null),
    };
    serde_json::from_str(&text).map_err(|e| CliError::InvalidInput(format!("malformed JSON: {e}")))
}

pub fn read_body<T: DeserializeOwned>(
    inline: Option<String>,
    file: Option<PathBuf>,
) -> Result<T, CliError> {
    let value = read_json(inline, file)?;
    if value.is_null() {
        return Err(CliError::InvalidInput(
            "a JSON body is required (use --json or --file)".into(),
        ));
    }
    serde_json::from_value(value).map_err(|e| CliError::InvalidInput(e.to_string()))
}
