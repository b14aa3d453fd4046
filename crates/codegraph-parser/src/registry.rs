use crate::languages::{PythonAnalyzer, RustAnalyzer};
use codegraph_core::{AnalysisResult, Analyzer, CodeGraphError, Result};
use std::collections::HashMap;

/// Dispatches a file to the analyzer registered for its extension
/// (§4.E). Unregistered extensions are reported per-file rather than
/// aborting a batch, matching `Analyzer`'s own error contract.
pub struct AnalyzerRegistry {
    by_extension: HashMap<&'static str, Box<dyn Analyzer>>,
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        let mut by_extension: HashMap<&'static str, Box<dyn Analyzer>> = HashMap::new();
        register(&mut by_extension, &["rs"], || Box::new(RustAnalyzer));
        register(&mut by_extension, &["py"], || Box::new(PythonAnalyzer));
        Self { by_extension }
    }

    pub fn supported_extensions(&self) -> Vec<&'static str> {
        self.by_extension.keys().copied().collect()
    }

    pub fn analyze_file(&self, file_path: &str, source_text: &str) -> Result<AnalysisResult> {
        let ext = file_path.rsplit('.').next().unwrap_or("");
        let analyzer = self.by_extension.get(ext).ok_or_else(|| {
            tracing::debug!(file = file_path, ext, "no analyzer registered for extension");
            CodeGraphError::AnalyzerError {
                file: file_path.to_string(),
                reason: format!("no analyzer registered for extension '{ext}'"),
            }
        })?;
        tracing::trace!(file = file_path, "analyzing file");
        analyzer.analyze(source_text, file_path)
    }
}

fn register(
    map: &mut HashMap<&'static str, Box<dyn Analyzer>>,
    extensions: &[&'static str],
    make: impl Fn() -> Box<dyn Analyzer>,
) {
    for ext in extensions {
        map.insert(ext, make());
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_by_extension() {
        let registry = AnalyzerRegistry::new();
        let result = registry.analyze_file("a.rs", "fn f() {}").unwrap();
        assert_eq!(result.functions.len(), 1);
    }

    #[test]
    fn unknown_extension_is_an_error() {
        let registry = AnalyzerRegistry::new();
        let err = registry.analyze_file("a.rb", "def f; end").unwrap_err();
        assert!(matches!(err, CodeGraphError::AnalyzerError { .. }));
    }
}
