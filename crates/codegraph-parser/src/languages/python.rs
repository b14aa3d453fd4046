use codegraph_core::{
    Analyzer, AnalysisResult, CallRecord, CodeGraphError, FunctionRecord, ImportKind,
    ImportRecord, ModuleRecord, Result,
};
use std::collections::HashMap;
use tree_sitter::{Node, Parser};

fn module_name(file_path: &str) -> String {
    let trimmed = file_path.trim_end_matches(".py");
    let trimmed = trimmed.strip_suffix("/__init__").unwrap_or(trimmed);
    trimmed.replace('/', ".")
}

fn node_text<'a>(node: Node, src: &'a str) -> &'a str {
    node.utf8_text(src.as_bytes()).unwrap_or("")
}

fn count_params(params: Node, src: &str) -> u32 {
    let mut cursor = params.walk();
    params
        .named_children(&mut cursor)
        .filter(|c| node_text(*c, src) != "self")
        .count() as u32
}

fn count_args(args: Node) -> u32 {
    let mut cursor = args.walk();
    args.named_children(&mut cursor).count() as u32
}

fn docstring(body: Node, src: &str) -> Option<String> {
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = first.named_child(0)?;
    if expr.kind() != "string" {
        return None;
    }
    Some(
        node_text(expr, src)
            .trim_matches(|c| c == '"' || c == '\'')
            .trim()
            .to_string(),
    )
}

/// Resolves a call target's name and, when the call goes through a
/// plain-identifier attribute access (`pkg.helper(...)`), the module it
/// targets. `self.helper(...)` and anything else stays in the caller's
/// own module, since `self`/`cls` name an instance, not a module.
fn callee_name(func_expr: Node, src: &str) -> Option<(Option<String>, String)> {
    match func_expr.kind() {
        "identifier" => Some((None, node_text(func_expr, src).to_string())),
        "attribute" => {
            let name = func_expr
                .child_by_field_name("attribute")
                .map(|a| node_text(a, src).to_string())?;
            let object = func_expr.child_by_field_name("object")?;
            let module = if object.kind() == "identifier" && node_text(object, src) != "self" && node_text(object, src) != "cls" {
                Some(node_text(object, src).to_string())
            } else {
                None
            };
            Some((module, name))
        }
        _ => None,
    }
}

struct Enclosing<'a> {
    name: &'a str,
    arity: u32,
}

fn walk(
    node: Node,
    src: &str,
    file: &str,
    module: &str,
    enclosing: Option<&Enclosing>,
    result: &mut AnalysisResult,
) {
    match node.kind() {
        "function_definition" => {
            let name = node
                .child_by_field_name("name")
                .map(|n| node_text(n, src).to_string())
                .unwrap_or_default();
            let arity = node
                .child_by_field_name("parameters")
                .map(|p| count_params(p, src))
                .unwrap_or(0);
            let line = node.start_position().row as u32 + 1;
            let doc = node.child_by_field_name("body").and_then(|b| docstring(b, src));

            result.functions.push(FunctionRecord {
                name: name.clone(),
                arity,
                module: module.to_string(),
                file: file.to_string(),
                line,
                doc,
                public: !name.starts_with('_'),
                metadata: HashMap::new(),
            });

            let inner = Enclosing {
                name: &name,
                arity,
            };
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                walk(child, src, file, module, Some(&inner), result);
            }
            return;
        }
        "call" => {
            if let Some(func_expr) = node.child_by_field_name("function") {
                if let (Some((target_module, callee)), Some(caller)) =
                    (callee_name(func_expr, src), enclosing)
                {
                    let arity = node
                        .child_by_field_name("arguments")
                        .map(count_args)
                        .unwrap_or(0);
                    result.calls.push(CallRecord {
                        from_module: module.to_string(),
                        from_function: caller.name.to_string(),
                        from_arity: caller.arity,
                        to_module: target_module.unwrap_or_else(|| module.to_string()),
                        to_function: callee,
                        to_arity: arity,
                        line: node.start_position().row as u32 + 1,
                    });
                }
            }
        }
        "import_statement" => {
            if let Some(name_node) = node.named_child(0) {
                result.imports.push(ImportRecord {
                    from_module: module.to_string(),
                    to_module: node_text(name_node, src).to_string(),
                    kind: ImportKind::Import,
                });
            }
        }
        "import_from_statement" => {
            if let Some(module_node) = node.child_by_field_name("module_name") {
                result.imports.push(ImportRecord {
                    from_module: module.to_string(),
                    to_module: node_text(module_node, src).to_string(),
                    kind: ImportKind::Require,
                });
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, src, file, module, enclosing, result);
    }
}

/// Tree-sitter backed analyzer for `.py` source files.
pub struct PythonAnalyzer;

impl Analyzer for PythonAnalyzer {
    fn supported_extensions(&self) -> &[&str] {
        &["py"]
    }

    fn analyze(&self, source_text: &str, file_path: &str) -> Result<AnalysisResult> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| CodeGraphError::AnalyzerError {
                file: file_path.to_string(),
                reason: e.to_string(),
            })?;
        let tree = parser
            .parse(source_text, None)
            .ok_or_else(|| CodeGraphError::AnalyzerError {
                file: file_path.to_string(),
                reason: "tree-sitter failed to produce a parse tree".to_string(),
            })?;

        let module = module_name(file_path);
        let mut result = AnalysisResult::default();
        result.modules.push(ModuleRecord {
            name: module.clone(),
            file: file_path.to_string(),
            line: 1,
            doc: None,
            metadata: HashMap::new(),
        });

        walk(tree.root_node(), source_text, file_path, &module, None, &mut result);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_function_docstring_and_call() {
        let source = r#"
def add(a, b):
    """Adds two numbers."""
    return helper(a, b)

def helper(a, b):
    return a + b
"#;
        let analyzer = PythonAnalyzer;
        let result = analyzer.analyze(source, "pkg/math.py").unwrap();

        assert_eq!(result.modules[0].name, "pkg.math");
        let add = result.functions.iter().find(|f| f.name == "add").unwrap();
        assert_eq!(add.arity, 2);
        assert_eq!(add.doc.as_deref(), Some("Adds two numbers."));
        assert!(result.calls.iter().any(|c| c.to_function == "helper"));
    }

    #[test]
    fn private_function_is_not_public() {
        let source = "def _internal():\n    pass\n";
        let analyzer = PythonAnalyzer;
        let result = analyzer.analyze(source, "pkg/util.py").unwrap();
        assert!(!result.functions[0].public);
    }

    #[test]
    fn qualified_call_targets_its_own_module() {
        let source = "import pkg\n\ndef f():\n    pkg.g()\n";
        let analyzer = PythonAnalyzer;
        let result = analyzer.analyze(source, "pkg/math.py").unwrap();
        let call = result.calls.iter().find(|c| c.to_function == "g").unwrap();
        assert_eq!(call.to_module, "pkg");
    }

    #[test]
    fn self_call_stays_in_the_caller_module() {
        let source = "class C:\n    def f(self):\n        self.helper()\n";
        let analyzer = PythonAnalyzer;
        let result = analyzer.analyze(source, "pkg/math.py").unwrap();
        let call = result.calls.iter().find(|c| c.to_function == "helper").unwrap();
        assert_eq!(call.to_module, "pkg.math");
    }

    #[test]
    fn extracts_from_import() {
        let source = "from collections import OrderedDict\n";
        let analyzer = PythonAnalyzer;
        let result = analyzer.analyze(source, "pkg/util.py").unwrap();
        assert_eq!(result.imports.len(), 1);
        assert_eq!(result.imports[0].to_module, "collections");
    }
}
