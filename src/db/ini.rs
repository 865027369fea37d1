//! Minimal loader for `srcsafe.ini`: sectionless `key = value` lines.

use std::collections::HashMap;
use std::path::Path;

/// Parsed key/value pairs. `#` and `;` introduce comments to end of line;
/// keys and values are whitespace-trimmed.
#[derive(Debug, Default)]
pub struct SimpleIni {
    values: HashMap<String, String>,
}

impl SimpleIni {
    pub fn load(path: &Path) -> std::io::Result<Self> {
        Ok(Self::parse(&std::fs::read_to_string(path)?))
    }

    pub fn parse(text: &str) -> Self {
        let mut values = HashMap::new();
        for line in text.lines() {
            let line = match line.find(['#', ';']) {
                Some(comment) => &line[..comment],
                None => line,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                values.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        Self { values }
    }

    pub fn get<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.values.get(key).map_or(default, String::as_str)
    }
}
