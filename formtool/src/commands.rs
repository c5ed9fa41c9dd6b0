//! Command handlers.
//!
//! Every handler reads its input files and returns the text to emit; the
//! binary decides whether that goes to stdout or to `--out`.

use std::path::Path;

use anyhow::{Context, anyhow, bail};
use formschema::{
    CustomizeSchemas, EditMode, SubSchema, TabbedForm, customize_schemas, inline_all_refs,
    inliner::HttpFetcher, object_to_properties, parse_properties_by_schema, read_remote_schema,
};
use log::info;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::fs;

use crate::config::FormToolConfig;

/// Read and parse a JSON file.
pub async fn read_json(path: &Path) -> anyhow::Result<Value> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("can not open {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

async fn read_ui(path: Option<&Path>) -> anyhow::Result<Value> {
    match path {
        Some(path) => read_json(path).await,
        None => Ok(Value::Object(Map::new())),
    }
}

/// Write `content` to `out`, or print it when no file is given.
pub async fn write_output(out: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            fs::write(path, content)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("written to {}", path.display());
        }
        None if content.ends_with('\n') => print!("{content}"),
        None => println!("{content}"),
    }
    Ok(())
}

/// Apply the edit-mode rules; prints `{schema, uiSchema, editMode}`.
pub async fn customize(schema: &Path, ui: Option<&Path>, mode: EditMode) -> anyhow::Result<String> {
    let input = CustomizeSchemas {
        schema: read_json(schema).await?,
        ui_schema: read_ui(ui).await?,
        edit_mode: mode,
    };
    let output = customize_schemas(&input)
        .with_context(|| format!("failed to customize {}", schema.display()))?;
    Ok(serde_json::to_string_pretty(&output)?)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tab<'a> {
    #[serde(flatten)]
    group: &'a SubSchema,
    ui_schema: Value,
}

/// Split into tabs; prints one `{key, label, schema, uiSchema}` per tab,
/// the general group first.
pub async fn split(schema: &Path, ui: Option<&Path>) -> anyhow::Result<String> {
    let schema = read_json(schema).await?;
    let ui = match ui {
        Some(path) => Some(read_json(path).await?),
        None => None,
    };

    let form = TabbedForm::new(&schema, ui, Map::new());
    let tabs: Vec<Tab<'_>> = form
        .tabs()
        .iter()
        .map(|group| Tab {
            group,
            ui_schema: form.ui_schema(&group.key),
        })
        .collect();
    info!("split into {} group(s)", tabs.len());
    Ok(serde_json::to_string_pretty(&tabs)?)
}

/// Inline the remote references of a schema URL (`<url>#<pointer>`) or of a
/// local schema file.
pub async fn inline(source: &str, config: &FormToolConfig) -> anyhow::Result<String> {
    let fetcher = HttpFetcher::new(config.fetch_options()?)?;
    let schema = if source.starts_with("http://") || source.starts_with("https://") {
        read_remote_schema(&fetcher, source).await?
    } else {
        let schema = read_json(Path::new(source)).await?;
        inline_all_refs(&fetcher, &schema).await?
    };
    Ok(serde_json::to_string_pretty(&schema)?)
}

/// Encode JSON form data as `.properties` text.
pub async fn to_properties(data: &Path, namespace: Option<&str>) -> anyhow::Result<String> {
    let Value::Object(data) = read_json(data).await? else {
        bail!("form data must be a JSON object");
    };
    Ok(object_to_properties(&data, namespace))
}

/// Decode `.properties` text into JSON form data shaped by `schema`.
pub async fn from_properties(properties: &Path, schema: &Path) -> anyhow::Result<String> {
    let text = fs::read_to_string(properties)
        .await
        .with_context(|| format!("can not open {}", properties.display()))?;
    let schema = read_json(schema).await?;
    let data = parse_properties_by_schema(&text, &schema)
        .map_err(|e| anyhow!("{}: {e}", properties.display()))?;
    Ok(serde_json::to_string_pretty(&Value::Object(data))?)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn write_json(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
        write(dir, name, &value.to_string())
    }

    fn sample_schema() -> Value {
        json!({
            "type": "object",
            "required": ["id", "name"],
            "properties": {
                "id": {"type": "string"},
                "name": {"type": "string"},
                "port": {"type": "integer"},
                "server": {"type": "object", "properties": {"host": {"type": "string"}}}
            }
        })
    }

    #[tokio::test]
    async fn test_customize_command() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write_json(&dir, "schema.json", &sample_schema());
        let ui = write_json(&dir, "ui.json", &json!({"id": {"ui:update": "hidden"}}));

        let out = customize(&schema, Some(&ui), EditMode::Update).await.unwrap();
        let out: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(out["editMode"], json!("update"));
        assert_eq!(out["schema"]["required"], json!(["name"]));
        assert!(out["schema"]["properties"].get("id").is_none());

        let out = customize(&schema, None, EditMode::View).await.unwrap();
        let out: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(out["schema"]["readOnly"], json!(true));
    }

    #[tokio::test]
    async fn test_split_command() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write_json(&dir, "schema.json", &sample_schema());
        let ui = write_json(&dir, "ui.json", &json!({"server": {"ui:layout": "tab"}}));

        let out = split(&schema, Some(&ui)).await.unwrap();
        let out: Value = serde_json::from_str(&out).unwrap();
        let tabs = out.as_array().unwrap();
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs[0]["key"], json!("_root_"));
        assert_eq!(tabs[1]["key"], json!("server"));
        assert_eq!(tabs[1]["uiSchema"]["ui:rootFieldId"], json!("server"));
        assert_eq!(tabs[1]["schema"]["type"], json!("object"));
    }

    #[tokio::test]
    async fn test_properties_commands() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write_json(&dir, "schema.json", &sample_schema());
        let data = write_json(
            &dir,
            "data.json",
            &json!({"name": "demo", "port": 8080, "server": {"host": "a b"}}),
        );

        let text = to_properties(&data, None).await.unwrap();
        assert_eq!(text, "name=demo\nport=8080\nserver.host=a b\n");

        let props = write(&dir, "app.properties", &text);
        let out = from_properties(&props, &schema).await.unwrap();
        let out: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(out, json!({"name": "demo", "port": 8080, "server": {"host": "a b"}}));

        let not_object = write_json(&dir, "list.json", &json!([1, 2]));
        assert!(to_properties(&not_object, None).await.is_err());
    }

    #[tokio::test]
    async fn test_inline_local_file_without_remote_refs() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write_json(&dir, "schema.json", &sample_schema());

        let out = inline(schema.to_str().unwrap(), &FormToolConfig::default())
            .await
            .unwrap();
        let out: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(out["definitions"], json!({}));
        assert_eq!(out["properties"], sample_schema()["properties"]);
    }

    #[tokio::test]
    async fn test_missing_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_json(&dir.path().join("nope.json")).await.unwrap_err();
        assert!(err.to_string().contains("can not open"));
    }
}
