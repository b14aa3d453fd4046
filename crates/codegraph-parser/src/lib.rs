mod discovery;
mod languages;
mod registry;

pub use discovery::discover_files;
pub use languages::{PythonAnalyzer, RustAnalyzer};
pub use registry::AnalyzerRegistry;
