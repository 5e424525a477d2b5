use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use trellis_engine::{Engine, TemplateRef, Value};

/// Render a template file against optional JSON data, returning markup.
pub fn render_cmd(input: &Path, data: Option<&Path>, partials: Option<&Path>) -> Result<String> {
    let source =
        fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))?;

    let value = match data {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let json: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("invalid JSON in {}", path.display()))?;
            json_to_value(&json)
        }
        None => Value::Null,
    };

    let engine = Engine::new();
    if let Some(dir) = partials {
        register_partials(&engine, dir)?;
    }

    let root = engine
        .render(TemplateRef::source(source), value)
        .with_context(|| format!("failed to render {}", input.display()))?;
    Ok(root.to_html())
}

/// Compile a template (and any partials) without rendering, surfacing
/// directive errors.
pub fn check_cmd(input: &Path, partials: Option<&Path>) -> Result<()> {
    let source =
        fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))?;

    let engine = Engine::new();
    let names = match partials {
        Some(dir) => register_partials(&engine, dir)?,
        None => Vec::new(),
    };
    for name in names {
        engine
            .template(name.as_str())
            .with_context(|| format!("partial `{name}` failed to compile"))?;
    }
    engine
        .template(TemplateRef::source(source))
        .with_context(|| format!("template error in {}", input.display()))?;
    Ok(())
}

/// Registers every `*.html` file in `dir` under its file stem, so
/// templates can `data-include` them by name. Returns the names.
fn register_partials(engine: &Engine, dir: &Path) -> Result<Vec<String>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    let mut names = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("html") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let markup = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        log::debug!("registered partial `{stem}`");
        engine.register(stem, markup);
        names.push(stem.to_string());
    }
    names.sort();
    Ok(names)
}

fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(flag) => Value::Bool(*flag),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => Value::Map(
            map.iter()
                .map(|(key, value)| (key.clone(), json_to_value(value)))
                .collect(),
        ),
    }
}
