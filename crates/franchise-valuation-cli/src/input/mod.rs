pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Load a JSON document from `--input`, falling back to piped stdin.
pub fn load<T: DeserializeOwned>(
    path: Option<&str>,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    match path {
        Some(p) => file::read_json(p).map(Some),
        None => stdin::read_stdin(),
    }
}
