//! Mode detection, resolution dispatch and declaration catalogs.

mod config;
mod mode;
mod resolver;

pub use config::{
    DeclarationCatalog, WidgetDeclaration, default_config_dir, demo_catalog, demo_session,
    load_catalog_from_dir, load_catalog_from_file, load_session_fixture,
    load_session_fixture_from_dir, validate_catalog, write_default_config_files,
};
pub use mode::detect_mode;
pub use resolver::{refresh, release, resolve};
