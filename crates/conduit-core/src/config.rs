use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use conduit_api::{ConduitError, ConnectionSpec, SessionFixture};
use serde::{Deserialize, Serialize};

const WIDGETS_EXAMPLE: &str = include_str!("../../../docs/conduit/examples/widgets.toml.example");
const SESSION_EXAMPLE: &str = include_str!("../../../docs/conduit/examples/session.json.example");

/// A widget instance as declared in `widgets.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetDeclaration {
    pub id: String,
    pub widget: String,
    pub connection: ConnectionSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclarationCatalog {
    pub widgets: BTreeMap<String, WidgetDeclaration>,
}

pub fn validate_catalog(catalog: &DeclarationCatalog) -> Result<(), ConduitError> {
    for (id, declaration) in &catalog.widgets {
        if id.trim().is_empty() {
            return Err(ConduitError::Validation("widget id is empty".to_string()));
        }
        if declaration.widget.trim().is_empty() {
            return Err(ConduitError::Validation(format!(
                "widget {id} has no widget type"
            )));
        }
        declaration
            .connection
            .validate()
            .map_err(|reason| ConduitError::Validation(format!("widget {id}: {reason}")))?;
    }
    Ok(())
}

/// The bundled example catalog.
pub fn demo_catalog() -> Result<DeclarationCatalog, ConduitError> {
    parse_catalog(WIDGETS_EXAMPLE, Path::new("widgets.toml.example"))
}

/// The bundled example session.
pub fn demo_session() -> Result<SessionFixture, ConduitError> {
    parse_session(SESSION_EXAMPLE, Path::new("session.json.example"))
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    widgets: BTreeMap<String, RawWidget>,
}

#[derive(Debug, Deserialize)]
struct RawWidget {
    widget: String,
    #[serde(default = "static_connection")]
    connection: ConnectionSpec,
}

fn static_connection() -> ConnectionSpec {
    ConnectionSpec::Static
}

pub fn default_config_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config").join("conduit")
    } else {
        PathBuf::from(".conduit")
    }
}

pub fn load_catalog_from_dir(dir: &Path) -> Result<DeclarationCatalog, ConduitError> {
    load_catalog_from_file(&dir.join("widgets.toml"))
}

pub fn load_catalog_from_file(path: &Path) -> Result<DeclarationCatalog, ConduitError> {
    let content = fs::read_to_string(path)
        .map_err(|e| ConduitError::NotFound(format!("failed to read {}: {e}", path.display())))?;
    parse_catalog(&content, path)
}

fn parse_catalog(content: &str, path: &Path) -> Result<DeclarationCatalog, ConduitError> {
    let raw: RawCatalog = toml::from_str(content).map_err(|e| {
        ConduitError::Validation(format!("invalid TOML in {}: {e}", path.display()))
    })?;

    let widgets = raw
        .widgets
        .into_iter()
        .map(|(id, w)| {
            (
                id.clone(),
                WidgetDeclaration {
                    id,
                    widget: w.widget,
                    connection: w.connection,
                },
            )
        })
        .collect();

    let catalog = DeclarationCatalog { widgets };
    validate_catalog(&catalog)?;
    Ok(catalog)
}

pub fn load_session_fixture_from_dir(dir: &Path) -> Result<SessionFixture, ConduitError> {
    load_session_fixture(&dir.join("session.json"))
}

pub fn load_session_fixture(path: &Path) -> Result<SessionFixture, ConduitError> {
    let content = fs::read_to_string(path)
        .map_err(|e| ConduitError::NotFound(format!("failed to read {}: {e}", path.display())))?;
    parse_session(&content, path)
}

fn parse_session(content: &str, path: &Path) -> Result<SessionFixture, ConduitError> {
    serde_json::from_str(content).map_err(|e| {
        ConduitError::Validation(format!("invalid JSON in {}: {e}", path.display()))
    })
}

/// Write the bundled examples into `dir`, keeping any file that already exists.
pub fn write_default_config_files(dir: &Path) -> Result<(), ConduitError> {
    fs::create_dir_all(dir)
        .map_err(|e| ConduitError::Internal(format!("failed to create {}: {e}", dir.display())))?;

    let files: [(&str, &str); 2] = [
        ("widgets.toml", WIDGETS_EXAMPLE),
        ("session.json", SESSION_EXAMPLE),
    ];

    for (name, body) in files {
        let path = dir.join(name);
        if !path.exists() {
            fs::write(&path, body).map_err(|e| {
                ConduitError::Internal(format!("failed to write {}: {e}", path.display()))
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_api::{ConnectionKind, SortField};
    use serde_json::json;

    #[test]
    fn bundled_examples_parse() {
        let catalog = demo_catalog().unwrap();
        assert_eq!(catalog.widgets.len(), 8);
        assert_eq!(catalog.widgets["banner"].connection, ConnectionSpec::Static);
        assert_eq!(
            catalog.widgets["order_ticker"].connection.kind(),
            ConnectionKind::Subscription
        );

        match &catalog.widgets["user_table"].connection {
            ConnectionSpec::ResourceQuery {
                resource_id,
                filter,
                sort,
                load,
                limit,
            } => {
                assert_eq!(resource_id, "users");
                assert_eq!(filter.as_ref().unwrap()["active"], json!(true));
                assert_eq!(sort.as_deref(), Some(&[SortField::asc("name")][..]));
                assert_eq!(load.as_deref(), Some(&["orders".to_string()][..]));
                assert_eq!(*limit, Some(25));
            }
            other => panic!("unexpected connection {other:?}"),
        }

        let session = demo_session().unwrap();
        assert!(session.connected);
        assert_eq!(session.resources["users"].len(), 3);
        assert_eq!(session.domain.unwrap().functions.len(), 2);
    }

    #[test]
    fn connection_defaults_to_static() {
        let catalog = parse_catalog(
            "[widgets.logo]\nwidget = \"image\"\n",
            Path::new("inline.toml"),
        )
        .unwrap();
        assert_eq!(catalog.widgets["logo"].connection, ConnectionSpec::Static);
        assert_eq!(catalog.widgets["logo"].id, "logo");
    }

    #[test]
    fn malformed_connection_is_rejected() {
        let err = parse_catalog(
            "[widgets.feed]\nwidget = \"feed\"\nconnection = { kind = \"subscription\", topic = \"\" }\n",
            Path::new("inline.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, ConduitError::Validation(msg) if msg.contains("feed")));

        let err = parse_catalog(
            "[widgets.feed]\nwidget = \"feed\"\nconnection = { kind = \"telepathy\" }\n",
            Path::new("inline.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, ConduitError::Validation(msg) if msg.contains("inline.toml")));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_catalog_from_dir(Path::new("/nonexistent/conduit")).unwrap_err();
        assert!(matches!(err, ConduitError::NotFound(_)));
    }

    #[test]
    fn default_files_are_not_overwritten() {
        let dir = std::env::temp_dir().join(format!("conduit-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("widgets.toml"), "[widgets]\n").unwrap();

        write_default_config_files(&dir).unwrap();

        assert_eq!(fs::read_to_string(dir.join("widgets.toml")).unwrap(), "[widgets]\n");
        assert!(load_session_fixture_from_dir(&dir).is_ok());
        assert!(load_catalog_from_dir(&dir).unwrap().widgets.is_empty());

        fs::remove_dir_all(&dir).unwrap();
    }
}
