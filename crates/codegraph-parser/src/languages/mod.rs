mod python;
mod rust;

pub use python::PythonAnalyzer;
pub use rust::RustAnalyzer;
