use std::io::Write;
use std::path::Path;

/// Stdout marker accepted wherever an output path is
pub const STDOUT: &str = "-";

/// Write a JSON document to stdout (`None` or `-`) or to a file.
pub fn write_output(json: &str, target: Option<&str>) -> Result<(), String> {
    match target {
        Some(path) if path != STDOUT => {
            let mut contents = json.to_string();
            contents.push('\n');
            std::fs::write(Path::new(path), contents)
                .map_err(|e| format!("Failed to write output file '{}': {}", path, e))
        }
        _ => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{}", json).map_err(|e| format!("Failed to write to stdout: {}", e))
        }
    }
}

/// Serialize a value to JSON (pretty or compact).
pub fn to_json<T: serde::Serialize>(value: &T, compact: bool) -> Result<String, String> {
    let rendered = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    rendered.map_err(|e| format!("JSON serialization failed: {}", e))
}

/// Serialize and write in one step, for `--json` style flags
pub fn emit<T: serde::Serialize>(value: &T, compact: bool, target: Option<&str>) -> Result<(), String> {
    let json = to_json(value, compact)?;
    write_output(&json, target)
}
