//! Code-behind declaration collector.
//!
//! Walks a linked module graph and flattens its `var` declarations and
//! functions into two flat namespaces, as consumed by a host container.
//! Functions are rebuilt as arrow-expression trees so every collected
//! declaration is a uniform runtime value with reconstructed source text.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use log::debug;

use crate::module::{ModuleError, ModuleLinker, ModuleResolver, ScriptModule};
use crate::parser::ast::{
    next_node_id, ArrowBody, ArrowFn, Expr, FunctionDecl, Literal, Pattern, Stmt, VarKind,
};
use crate::parser::printer;

/// One collected declaration: a reconstructed source string plus the
/// tree the evaluator runs.
#[derive(Debug, Clone)]
pub struct CodeDeclaration {
    pub source: String,
    pub tree: Expr,
}

/// Everything the collector found in a module graph.
#[derive(Debug, Default)]
pub struct CollectedDeclarations {
    /// Root-module `var` declarations by name.
    pub vars: HashMap<String, CodeDeclaration>,
    /// Flattened function namespace across the whole import graph.
    pub functions: HashMap<String, CodeDeclaration>,
    /// Non-fatal link diagnostics keyed by module name.
    pub module_errors: HashMap<String, Vec<ModuleError>>,
}

/// A collection-level hard error. Unlike link diagnostics these abort
/// the whole collection call.
#[derive(Debug, Clone)]
pub enum CollectError {
    /// The root module did not parse or link at all.
    RootModule(Vec<ModuleError>),
    DuplicateVar { name: String },
    DuplicateFunction { module: String, name: String },
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::RootModule(errors) => {
                writeln!(f, "the root module could not be linked:")?;
                for error in errors {
                    writeln!(f, "  {}", error)?;
                }
                Ok(())
            }
            CollectError::DuplicateVar { name } => {
                write!(f, "variable '{}' is declared more than once", name)
            }
            CollectError::DuplicateFunction { module, name } => write!(
                f,
                "function '{}' (module '{}') collides with another collected function",
                name, module
            ),
        }
    }
}

impl std::error::Error for CollectError {}

/// Parse, link and collect a code-behind module graph.
///
/// The root module is parsed in restrictive mode: only `var`
/// declarations, functions and imports at top level. Root `var`s land in
/// [`CollectedDeclarations::vars`]; the functions of the root module and
/// every transitively imported module land in one flat namespace.
pub fn collect_code_behind(
    module_name: &str,
    source: &str,
    resolver: &ModuleResolver,
) -> Result<CollectedDeclarations, CollectError> {
    let mut linker = ModuleLinker::new();
    let (root, errors) = linker.parse_script_module_lenient(module_name, source, resolver, true);
    let root = match root {
        Some(root) => root,
        None => {
            let root_errors = errors
                .errors
                .get(module_name)
                .cloned()
                .unwrap_or_default();
            return Err(CollectError::RootModule(root_errors));
        }
    };

    let mut collected = CollectedDeclarations {
        module_errors: errors.errors,
        ..Default::default()
    };

    collect_root_vars(&root.borrow(), &mut collected)?;
    let mut visited = HashSet::new();
    flatten_module_functions(&root, &mut collected, &mut visited)?;
    debug!(
        "collected {} vars and {} functions from '{}'",
        collected.vars.len(),
        collected.functions.len(),
        module_name
    );
    Ok(collected)
}

fn collect_root_vars(
    root: &ScriptModule,
    collected: &mut CollectedDeclarations,
) -> Result<(), CollectError> {
    for stmt in &root.statements {
        let declarations = match stmt {
            Stmt::VarDecl {
                kind: VarKind::Var,
                declarations,
                ..
            } => declarations,
            _ => continue,
        };
        for declarator in declarations {
            let init = match &declarator.init {
                Some(init) => init.clone(),
                None => Expr::Literal {
                    id: next_node_id(),
                    span: declarator.span,
                    value: Literal::Undefined,
                },
            };
            let declaration = CodeDeclaration {
                source: printer::print_expr(&init),
                tree: init,
            };
            for name in pattern_names(&declarator.id) {
                if collected
                    .vars
                    .insert(name.clone(), declaration.clone())
                    .is_some()
                {
                    return Err(CollectError::DuplicateVar { name });
                }
            }
        }
    }
    Ok(())
}

/// Flattens every function reachable through imports into one namespace.
///
/// Visibility is deliberately transitive: a function imported by module B
/// is collectible through module A even if A never imports it directly.
/// Each module is walked once, so cyclic import graphs terminate; a
/// *simple-name* clash between two distinct functions is a hard error.
fn flatten_module_functions(
    module: &Rc<std::cell::RefCell<ScriptModule>>,
    collected: &mut CollectedDeclarations,
    visited: &mut HashSet<String>,
) -> Result<(), CollectError> {
    let module_name = module.borrow().name.clone();
    if !visited.insert(module_name.clone()) {
        return Ok(());
    }
    let functions: Vec<(String, Rc<FunctionDecl>)> = module
        .borrow()
        .functions
        .iter()
        .map(|(name, decl)| (name.clone(), Rc::clone(decl)))
        .collect();

    for (name, decl) in functions {
        if collected.functions.contains_key(&name) {
            return Err(CollectError::DuplicateFunction {
                module: module_name.clone(),
                name,
            });
        }
        collected
            .functions
            .insert(name, rebuild_as_arrow(&decl));
    }

    let imported: Vec<_> = module.borrow().imported_modules.to_vec();
    for imported_module in imported {
        flatten_module_functions(&imported_module, collected, visited)?;
    }
    Ok(())
}

/// Rebuilds a function declaration as a plain arrow-expression value.
///
/// The rebuilt arrow references nothing in its defining module, which
/// keeps collected declarations free of module back-references.
fn rebuild_as_arrow(decl: &FunctionDecl) -> CodeDeclaration {
    let func = Rc::new(ArrowFn {
        id: next_node_id(),
        span: decl.span,
        params: decl.params.clone(),
        body: ArrowBody::Block(decl.body.clone()),
    });
    CodeDeclaration {
        source: printer::arrow_source(&func),
        tree: Expr::Arrow {
            id: next_node_id(),
            span: decl.span,
            func,
        },
    }
}

fn pattern_names(pattern: &Pattern) -> Vec<String> {
    let mut names = Vec::new();
    collect_pattern_names(pattern, &mut names);
    names
}

fn collect_pattern_names(pattern: &Pattern, names: &mut Vec<String>) {
    match pattern {
        Pattern::Identifier(id) => names.push(id.name.clone()),
        Pattern::Array { elements, .. } => {
            for element in elements.iter().flatten() {
                collect_pattern_names(element, names);
            }
        }
        Pattern::Object { properties, .. } => {
            for property in properties {
                collect_pattern_names(&property.value, names);
            }
        }
        Pattern::Rest { argument, .. } => collect_pattern_names(argument, names),
        Pattern::Default { target, .. } => collect_pattern_names(target, names),
    }
}
