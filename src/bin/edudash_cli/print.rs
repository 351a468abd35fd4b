#![deny(clippy::all, clippy::pedantic)]

use edudash::cache::QueryState;
use serde::Serialize;
use serde_json::json;

use crate::client::CliError;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let out = serde_json::to_string_pretty(value).map_err(|e| CliError::Output(e.to_string()))?;
    println!("{out}");
    Ok(())
}

/// One line per settled state, for streaming output.
pub fn print_state(state: &QueryState) -> Result<(), CliError> {
    let line = match (&state.data, &state.error) {
        (_, Some(error)) => json!({
            "status": "error",
            "error": {
                "status": error.status(),
                "message": error.message(),
                "data": error.data(),
            },
        }),
        (Some(data), None) => json!({ "status": "success", "data": data.as_ref() }),
        (None, None) => json!({ "status": "pending" }),
    };
    let out = serde_json::to_string(&line).map_err(|e| CliError::Output(e.to_string()))?;
    println!("{out}");
    Ok(())
}
