mod builtin;
mod column_format;
mod dependencies;
mod loader;
mod parser;
mod registry;
mod resolver;
mod validator;

pub use column_format::ColumnFormat;
pub use dependencies::SqlDependencies;
pub use loader::QueryLoader;
pub use parser::{
    title_from_name, ChartDef, ChartType, FilterPreset, Placeholder, QueryConfig, QueryKind,
    RawQueryConfig,
};
pub use registry::QueryRegistry;
pub use resolver::{ParamResolver, QueryParams, RESERVED_KEYS};
pub use validator::{QueryValidator, ValidationError, ValidationResult, ValidationWarning};
