pub mod loader;
pub mod options;
pub mod schema;

pub use loader::{load_from_path, load_from_str, suggest, ConfigError, LoadedConfig};
pub use options::{parse_assignment, OptionValue, Options};
pub use schema::{
    CleanupConfig, CleanupValue, EngineSection, IndentValue, TemplateDefinition, ValidationError,
    ValidationIssue,
};
