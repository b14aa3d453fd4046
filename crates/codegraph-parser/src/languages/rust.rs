use codegraph_core::{
    Analyzer, AnalysisResult, CallRecord, CodeGraphError, FunctionRecord, ImportKind,
    ImportRecord, ModuleRecord, Result,
};
use std::collections::HashMap;
use tree_sitter::{Node, Parser};

/// Derives a dotted module path from a file path, stripping the `.rs`
/// extension and `src/` prefix the way a crate's module tree usually
/// mirrors its directory layout.
fn module_name(file_path: &str) -> String {
    let trimmed = file_path.trim_end_matches(".rs");
    let trimmed = trimmed.strip_prefix("src/").unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("/mod").unwrap_or(trimmed);
    trimmed.replace('/', "::")
}

fn node_text<'a>(node: Node, src: &'a str) -> &'a str {
    node.utf8_text(src.as_bytes()).unwrap_or("")
}

fn has_pub_modifier(node: Node, src: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .any(|c| c.kind() == "visibility_modifier" && node_text(c, src).starts_with("pub"))
}

fn doc_comment(node: Node, src: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut cursor = node.prev_sibling();
    while let Some(sibling) = cursor {
        if sibling.kind() != "line_comment" {
            break;
        }
        let text = node_text(sibling, src);
        if let Some(stripped) = text.strip_prefix("///") {
            lines.push(stripped.trim().to_string());
            cursor = sibling.prev_sibling();
        } else {
            break;
        }
    }
    if lines.is_empty() {
        None
    } else {
        lines.reverse();
        Some(lines.join("\n"))
    }
}

fn count_params(params: Node) -> u32 {
    let mut cursor = params.walk();
    params
        .children(&mut cursor)
        .filter(|c| c.kind() == "parameter")
        .count() as u32
}

fn count_args(args: Node) -> u32 {
    let mut cursor = args.walk();
    args.named_children(&mut cursor).count() as u32
}

/// Resolves a call target's name and, when the call is qualified
/// (`b::g(...)`), the module it targets. Unqualified and
/// field-expression calls (`helper(...)`, `self.helper(...)`) stay in
/// the caller's own module.
fn callee_name(func_expr: Node, src: &str) -> Option<(Option<String>, String)> {
    match func_expr.kind() {
        "identifier" => Some((None, node_text(func_expr, src).to_string())),
        "field_expression" => func_expr
            .child_by_field_name("field")
            .map(|f| (None, node_text(f, src).to_string())),
        "scoped_identifier" => {
            let name = func_expr
                .child_by_field_name("name")
                .map(|f| node_text(f, src).to_string())?;
            let module = func_expr
                .child_by_field_name("path")
                .map(|p| node_text(p, src).to_string());
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
        "function_item" => {
            let name = node
                .child_by_field_name("name")
                .map(|n| node_text(n, src).to_string())
                .unwrap_or_default();
            let arity = node
                .child_by_field_name("parameters")
                .map(count_params)
                .unwrap_or(0);
            let line = node.start_position().row as u32 + 1;
            result.functions.push(FunctionRecord {
                name: name.clone(),
                arity,
                module: module.to_string(),
                file: file.to_string(),
                line,
                doc: doc_comment(node, src),
                public: has_pub_modifier(node, src),
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
        "call_expression" => {
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
        "use_declaration" => {
            if let Some(arg) = node.named_child(0) {
                result.imports.push(ImportRecord {
                    from_module: module.to_string(),
                    to_module: node_text(arg, src).replace(char::is_whitespace, ""),
                    kind: ImportKind::Use,
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

/// Tree-sitter backed analyzer for `.rs` source files.
pub struct RustAnalyzer;

impl Analyzer for RustAnalyzer {
    fn supported_extensions(&self) -> &[&str] {
        &["rs"]
    }

    fn analyze(&self, source_text: &str, file_path: &str) -> Result<AnalysisResult> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
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
    fn extracts_function_and_intra_module_call() {
        let source = r#"
/// Adds two numbers.
pub fn add(a: i32, b: i32) -> i32 {
    helper(a, b)
}

fn helper(a: i32, b: i32) -> i32 {
    a + b
}
"#;
        let analyzer = RustAnalyzer;
        let result = analyzer.analyze(source, "src/math.rs").unwrap();

        assert_eq!(result.modules[0].name, "math");
        assert_eq!(result.functions.len(), 2);
        let add = result.functions.iter().find(|f| f.name == "add").unwrap();
        assert!(add.public);
        assert_eq!(add.arity, 2);
        assert_eq!(add.doc.as_deref(), Some("Adds two numbers."));

        assert_eq!(result.calls.len(), 1);
        assert_eq!(result.calls[0].from_function, "add");
        assert_eq!(result.calls[0].to_function, "helper");
    }

    #[test]
    fn extracts_use_declarations() {
        let source = "use std::collections::HashMap;\n\nfn f() {}\n";
        let analyzer = RustAnalyzer;
        let result = analyzer.analyze(source, "src/lib.rs").unwrap();
        assert_eq!(result.imports.len(), 1);
        assert_eq!(result.imports[0].to_module, "std::collections::HashMap");
    }
}
