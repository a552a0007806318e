use std::error::Error;
use std::fs;
use std::path::Path;
use yaml_rust2::{Yaml, YamlEmitter, YamlLoader};

const INCLUDE_DIRECTIVE: &str = "!include";

/// Loads a YAML file, resolving `!include <relative path>` lines first.
///
/// Included documents are merged in the order they appear, then the body of
/// the including file is merged on top, so local keys always win.
pub fn load_yaml_with_includes(path: &Path) -> Result<Yaml, Box<dyn Error>> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;
    let base_path = path.parent().unwrap_or(Path::new(""));

    let (includes, body): (Vec<&str>, Vec<&str>) = contents
        .lines()
        .partition(|line| line.trim_start().starts_with(INCLUDE_DIRECTIVE));

    let mut merged: Option<Yaml> = None;
    for line in includes {
        let include_path = line
            .trim()
            .trim_start_matches(INCLUDE_DIRECTIVE)
            .trim();
        if include_path.is_empty() {
            return Err(format!("Empty include in {}", path.display()).into());
        }
        let included = load_yaml_with_includes(&base_path.join(include_path))?;
        merged = Some(match merged {
            Some(acc) => merge_yaml(&acc, &included),
            None => included,
        });
    }

    let body = YamlLoader::load_from_str(&body.join("\n"))?
        .into_iter()
        .reduce(|acc, doc| merge_yaml(&acc, &doc));

    match (merged, body) {
        (Some(includes), Some(body)) => Ok(merge_yaml(&includes, &body)),
        (Some(includes), None) => Ok(includes),
        (None, Some(body)) => Ok(body),
        (None, None) => Err(format!("Config {} is empty", path.display()).into()),
    }
}

/// Serializes a resolved document back into YAML text.
pub fn render_yaml(yaml: &Yaml) -> Result<String, Box<dyn Error>> {
    let mut out = String::new();
    YamlEmitter::new(&mut out).dump(yaml)?;
    Ok(out)
}

fn merge_yaml(base: &Yaml, override_yaml: &Yaml) -> Yaml {
    match (base, override_yaml) {
        (Yaml::Hash(base_hash), Yaml::Hash(override_hash)) => {
            let mut result = base_hash.clone();
            for (key, value) in override_hash {
                let merged = match base_hash.get(key) {
                    Some(base_value) => merge_yaml(base_value, value),
                    None => value.clone(),
                };
                result.insert(key.clone(), merged);
            }
            Yaml::Hash(result)
        }
        (_, override_value) => override_value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_keys_override_included_ones() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("common.yaml"),
            "backend:\n  log_level: info\n  server_address: 0.0.0.0:8080\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("dev.yaml"),
            "!include common.yaml\nbackend:\n  log_level: debug\n",
        )
        .unwrap();

        let yaml = load_yaml_with_includes(&dir.path().join("dev.yaml")).unwrap();
        assert_eq!(yaml["backend"]["log_level"].as_str(), Some("debug"));
        assert_eq!(yaml["backend"]["server_address"].as_str(), Some("0.0.0.0:8080"));
    }

    #[test]
    fn missing_include_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("dev.yaml"), "!include nope.yaml\n").unwrap();

        assert!(load_yaml_with_includes(&dir.path().join("dev.yaml")).is_err());
    }
}
