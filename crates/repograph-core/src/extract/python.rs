//! Python source extraction using tree-sitter.

use std::collections::BTreeSet;

use tree_sitter::{Node, Parser};

use super::{ExtractError, FileExtraction, FunctionRecord, ImportRecord, ModuleRecord};

/// Extracts modules, functions, imports, and call sets from Python files.
pub struct PythonExtractor {
    language: tree_sitter::Language,
}

/// Traversal state for one file.
///
/// `call_stack` holds one call set per enclosing function definition, so
/// a call expression is attributed to the innermost function around it.
/// Module-level calls have no enclosing function and are not recorded.
struct Accumulator {
    functions: Vec<FunctionRecord>,
    imports: BTreeSet<ImportRecord>,
    call_stack: Vec<BTreeSet<String>>,
}

impl PythonExtractor {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
        }
    }

    /// Extract all entities from one file. Pure function of `source`.
    pub fn extract_file(&self, path: &str, source: &str) -> Result<FileExtraction, ExtractError> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| ExtractError::Language(e.to_string()))?;

        let tree = parser.parse(source, None).ok_or(ExtractError::Parse {
            path: path.to_string(),
        })?;

        if tree.root_node().has_error() {
            return Err(ExtractError::Parse {
                path: path.to_string(),
            });
        }

        let mut acc = Accumulator {
            functions: Vec::new(),
            imports: BTreeSet::new(),
            call_stack: Vec::new(),
        };

        self.walk(tree.root_node(), source, path, &mut acc);

        Ok(FileExtraction {
            module: ModuleRecord {
                file_path: path.to_string(),
                language: "python".to_string(),
            },
            functions: acc.functions,
            imports: acc.imports.into_iter().collect(),
        })
    }

    fn walk(&self, node: Node, source: &str, path: &str, acc: &mut Accumulator) {
        match node.kind() {
            "function_definition" => {
                self.handle_function(&node, source, path, acc);
                return;
            }
            "import_statement" => {
                self.handle_import(&node, source, acc);
                return;
            }
            "import_from_statement" => {
                self.handle_import_from(&node, source, acc);
                return;
            }
            "call" => {
                self.handle_call(&node, source, acc);
                // fall through: arguments may contain further calls
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk(child, source, path, acc);
        }
    }

    fn handle_function(&self, node: &Node, source: &str, path: &str, acc: &mut Accumulator) {
        let name = match node.child_by_field_name("name") {
            Some(n) => node_text(&n, source).to_string(),
            None => return,
        };

        let line = node.start_position().row as i64 + 1;
        let parameters = self.extract_parameters(node, source);
        let return_type = node
            .child_by_field_name("return_type")
            .map(|n| node_text(&n, source).to_string());

        acc.call_stack.push(BTreeSet::new());
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk(child, source, path, acc);
        }
        let calls = acc.call_stack.pop().unwrap_or_default();

        acc.functions.push(FunctionRecord {
            id: format!("{}:{}", name, line),
            name,
            parameters,
            return_type,
            file_path: path.to_string(),
            line,
            calls: calls.into_iter().collect(),
        });
    }

    fn extract_parameters(&self, node: &Node, source: &str) -> Vec<String> {
        let mut params = Vec::new();

        if let Some(params_node) = node.child_by_field_name("parameters") {
            let mut cursor = params_node.walk();
            for child in params_node.children(&mut cursor) {
                match child.kind() {
                    "identifier" => {
                        params.push(node_text(&child, source).to_string());
                    }
                    "typed_parameter" => {
                        // typed_parameter has no name field; the pattern
                        // is its first child
                        if let Some(name) = child
                            .children(&mut child.walk())
                            .find(|c| c.kind() == "identifier")
                        {
                            params.push(node_text(&name, source).to_string());
                        }
                    }
                    "default_parameter" | "typed_default_parameter" => {
                        if let Some(name) = child.child_by_field_name("name") {
                            params.push(node_text(&name, source).to_string());
                        }
                    }
                    _ => {}
                }
            }
        }

        params
    }

    /// `import a.b.c` contributes the root name `a`.
    fn handle_import(&self, node: &Node, source: &str, acc: &mut Accumulator) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            let dotted = match child.kind() {
                "dotted_name" => Some(child),
                "aliased_import" => child.child_by_field_name("name"),
                _ => None,
            };
            if let Some(dotted) = dotted {
                acc.imports.insert(ImportRecord {
                    name: root_name(node_text(&dotted, source)),
                    level: None,
                });
            }
        }
    }

    /// `from a.b import c` contributes the root name `a`; a relative
    /// import with no module name (`from . import c`) is skipped.
    fn handle_import_from(&self, node: &Node, source: &str, acc: &mut Accumulator) {
        let module = match node.child_by_field_name("module_name") {
            Some(m) => m,
            None => return,
        };

        match module.kind() {
            "dotted_name" => {
                acc.imports.insert(ImportRecord {
                    name: root_name(node_text(&module, source)),
                    level: None,
                });
            }
            "relative_import" => {
                let level = module
                    .children(&mut module.walk())
                    .find(|c| c.kind() == "import_prefix")
                    .map(|p| node_text(&p, source).chars().filter(|c| *c == '.').count() as u32);

                if let Some(dotted) = module
                    .children(&mut module.walk())
                    .find(|c| c.kind() == "dotted_name")
                {
                    acc.imports.insert(ImportRecord {
                        name: root_name(node_text(&dotted, source)),
                        level,
                    });
                }
            }
            _ => {}
        }
    }

    /// Record the simple callee name: `foo()` gives `foo`, `obj.foo()`
    /// gives `foo`. Anything else (subscripts, nested calls) is ignored.
    fn handle_call(&self, node: &Node, source: &str, acc: &mut Accumulator) {
        let func = match node.child_by_field_name("function") {
            Some(f) => f,
            None => return,
        };

        let name = match func.kind() {
            "identifier" => Some(node_text(&func, source).to_string()),
            "attribute" => func
                .child_by_field_name("attribute")
                .map(|a| node_text(&a, source).to_string()),
            _ => None,
        };

        if let (Some(name), Some(calls)) = (name, acc.call_stack.last_mut()) {
            calls.insert(name);
        }
    }
}

impl Default for PythonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

fn root_name(dotted: &str) -> String {
    dotted.split('.').next().unwrap_or(dotted).to_string()
}
