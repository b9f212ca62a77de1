//! Module resolution and linking.
//!
//! Source modules import functions from each other by name. The linker
//! asks a caller-supplied [`ModuleResolver`] for imported source text,
//! parses each module at most once (memoized by name, which also makes
//! diamond and circular import graphs safe), and wires the resulting
//! [`ScriptModule`] graph together.

pub mod collect;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use log::debug;

use crate::parser::ast::{FunctionDecl, Stmt};
use crate::parser::static_semantics::{classify_top_level, TopLevelKind};
use crate::parser::{Parser, ParserError};

/// Caller-supplied source lookup: `(source module, imported module)` →
/// source text, or `None` when the module cannot be found. A `None` is
/// surfaced as a per-module diagnostic, never thrown.
pub type ModuleResolver<'a> = dyn Fn(&str, &str) -> Option<String> + 'a;

/// A linked script module.
#[derive(Debug)]
pub struct ScriptModule {
    pub name: String,
    /// Back-reference to the importing module, for diagnostics only —
    /// never used for traversal.
    pub parent: Option<Weak<RefCell<ScriptModule>>>,
    /// Functions declared with `export`.
    pub exports: HashMap<String, Rc<FunctionDecl>>,
    /// Imported name → resolved exported function.
    pub imports: HashMap<String, Rc<FunctionDecl>>,
    pub imported_modules: Vec<Rc<RefCell<ScriptModule>>>,
    /// All functions declared in this module, exported or not.
    pub functions: HashMap<String, Rc<FunctionDecl>>,
    /// The module's parsed top-level statements.
    pub statements: Vec<Stmt>,
}

/// One linking diagnostic.
#[derive(Debug, Clone)]
pub enum ModuleError {
    Parse(ParserError),
    /// `let`/`const` at module top level; only `var` is legal there.
    InnerScopeStatement { line: usize, column: usize },
    /// A statement that is not legal at module scope at all.
    NotModuleStatement { line: usize, column: usize },
    /// The resolver returned `None` for an imported module.
    UnresolvedModule { from: String, name: String },
    /// The imported name is not exported by the target module.
    UnresolvedImport { module: String, symbol: String },
    /// Two functions with the same name in one module.
    DuplicateFunction { name: String },
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleError::Parse(err) => write!(f, "{}", err),
            ModuleError::InnerScopeStatement { line, column } => write!(
                f,
                "{}:{}: 'let'/'const' are not legal at module scope, use 'var'",
                line, column
            ),
            ModuleError::NotModuleStatement { line, column } => write!(
                f,
                "{}:{}: only variable, function and import declarations are legal at module scope",
                line, column
            ),
            ModuleError::UnresolvedModule { from, name } => {
                write!(f, "module '{}' imported by '{}' was not found", name, from)
            }
            ModuleError::UnresolvedImport { module, symbol } => {
                write!(f, "module '{}' does not export '{}'", module, symbol)
            }
            ModuleError::DuplicateFunction { name } => {
                write!(f, "function '{}' is declared more than once", name)
            }
        }
    }
}

/// Link diagnostics keyed by module name. Errors in one module do not
/// stop sibling modules from resolving.
#[derive(Debug, Default)]
pub struct ModuleErrors {
    pub errors: HashMap<String, Vec<ModuleError>>,
}

impl ModuleErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    fn push(&mut self, module: &str, error: ModuleError) {
        self.errors
            .entry(module.to_string())
            .or_default()
            .push(error);
    }
}

impl fmt::Display for ModuleErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (module, errors) in &self.errors {
            for error in errors {
                writeln!(f, "[{}] {}", module, error)?;
            }
        }
        Ok(())
    }
}

/// Recursive-descent module linker with a per-linker parse memo.
pub struct ModuleLinker {
    parsed_modules: HashMap<String, Rc<RefCell<ScriptModule>>>,
}

impl ModuleLinker {
    pub fn new() -> Self {
        ModuleLinker {
            parsed_modules: HashMap::new(),
        }
    }

    /// Parse and link one module and everything it transitively imports.
    ///
    /// In `restrictive` mode only `var`-kind declarations, function
    /// declarations and imports are legal at top level. A module already
    /// in the memo is returned as-is — the same `Rc`, not a re-parse.
    pub fn parse_script_module(
        &mut self,
        module_name: &str,
        source: &str,
        resolver: &ModuleResolver,
        restrictive: bool,
    ) -> Result<Rc<RefCell<ScriptModule>>, ModuleErrors> {
        let mut errors = ModuleErrors::default();
        let module = self.link_module(module_name, source, resolver, restrictive, &mut errors);
        match module {
            Some(module) if errors.is_empty() => Ok(module),
            _ => Err(errors),
        }
    }

    /// Like [`parse_script_module`](Self::parse_script_module), but hands
    /// back whatever linked even when diagnostics were collected. The
    /// collector uses this so errors in one imported module do not hide
    /// declarations from its siblings.
    pub fn parse_script_module_lenient(
        &mut self,
        module_name: &str,
        source: &str,
        resolver: &ModuleResolver,
        restrictive: bool,
    ) -> (Option<Rc<RefCell<ScriptModule>>>, ModuleErrors) {
        let mut errors = ModuleErrors::default();
        let module = self.link_module(module_name, source, resolver, restrictive, &mut errors);
        (module, errors)
    }

    fn link_module(
        &mut self,
        module_name: &str,
        source: &str,
        resolver: &ModuleResolver,
        restrictive: bool,
        errors: &mut ModuleErrors,
    ) -> Option<Rc<RefCell<ScriptModule>>> {
        if let Some(module) = self.parsed_modules.get(module_name) {
            debug!("module '{}' already linked, reusing", module_name);
            return Some(Rc::clone(module));
        }
        debug!("linking module '{}'", module_name);

        let mut parser = Parser::new(source);
        let statements = parser.parse_statements();
        let parse_errors = parser.take_errors();
        if !parse_errors.is_empty() {
            for err in parse_errors {
                errors.push(module_name, ModuleError::Parse(err));
            }
            return None;
        }

        if restrictive {
            for stmt in &statements {
                let span = stmt.span();
                match classify_top_level(stmt) {
                    TopLevelKind::Legal => {}
                    TopLevelKind::InnerScopeOnly => errors.push(
                        module_name,
                        ModuleError::InnerScopeStatement {
                            line: span.line,
                            column: span.column,
                        },
                    ),
                    TopLevelKind::NotModuleStatement => errors.push(
                        module_name,
                        ModuleError::NotModuleStatement {
                            line: span.line,
                            column: span.column,
                        },
                    ),
                }
            }
        }

        // Collect this module's own functions and exports before touching
        // imports, so modules in a cycle see complete export tables.
        let mut functions = HashMap::new();
        let mut exports = HashMap::new();
        for stmt in &statements {
            if let Stmt::FunctionDecl(decl) = stmt {
                let name = decl.name.name.clone();
                let shared = Rc::new(decl.clone());
                if functions.insert(name.clone(), Rc::clone(&shared)).is_some() {
                    errors.push(module_name, ModuleError::DuplicateFunction { name });
                    continue;
                }
                if decl.exported {
                    exports.insert(decl.name.name.clone(), shared);
                }
            }
        }

        let module = Rc::new(RefCell::new(ScriptModule {
            name: module_name.to_string(),
            parent: None,
            exports,
            imports: HashMap::new(),
            imported_modules: Vec::new(),
            functions,
            statements,
        }));
        // Memoize before resolving imports; a circular import then finds
        // this entry instead of recursing forever.
        self.parsed_modules
            .insert(module_name.to_string(), Rc::clone(&module));

        let import_stmts: Vec<Stmt> = module
            .borrow()
            .statements
            .iter()
            .filter(|s| matches!(s, Stmt::Import { .. }))
            .cloned()
            .collect();

        for stmt in import_stmts {
            if let Stmt::Import {
                specifiers,
                module: imported_name,
                ..
            } = stmt
            {
                let imported_source = match resolver(module_name, &imported_name) {
                    Some(source) => source,
                    None => {
                        errors.push(
                            module_name,
                            ModuleError::UnresolvedModule {
                                from: module_name.to_string(),
                                name: imported_name.clone(),
                            },
                        );
                        continue;
                    }
                };
                let imported = match self.link_module(
                    &imported_name,
                    &imported_source,
                    resolver,
                    true,
                    errors,
                ) {
                    Some(imported) => imported,
                    None => continue,
                };
                for specifier in &specifiers {
                    let export = imported.borrow().exports.get(&specifier.imported).cloned();
                    match export {
                        Some(function) => {
                            module
                                .borrow_mut()
                                .imports
                                .insert(specifier.local.clone(), function);
                        }
                        None => errors.push(
                            module_name,
                            ModuleError::UnresolvedImport {
                                module: imported_name.clone(),
                                symbol: specifier.imported.clone(),
                            },
                        ),
                    }
                }
                module.borrow_mut().imported_modules.push(imported);
            }
        }

        // Informational back-references only; `Weak` keeps ownership
        // acyclic. A self-import would alias the borrow, so skip it.
        let imported: Vec<_> = module.borrow().imported_modules.clone();
        for imported_module in &imported {
            if Rc::ptr_eq(imported_module, &module) {
                continue;
            }
            imported_module.borrow_mut().parent = Some(Rc::downgrade(&module));
        }

        Some(module)
    }
}

impl Default for ModuleLinker {
    fn default() -> Self {
        Self::new()
    }
}
