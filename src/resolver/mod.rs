use crate::context::LoxContext;
use crate::parser::ast::{
    ClassDeclaration, Expression, FunctionDeclaration, IfElseStatement, NodeId, Statement,
    VariableDeclarationStatement, WhileStatement,
};
use crate::scanner::Token;
use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Static lexical-scope analysis: walks the AST once, tracking a stack of
/// block scopes (`name -> is fully initialized yet`), and records, for
/// every `Variable`/`Assign`/`This`/`Super` node, how many scopes out its
/// binding lives. Absence from the output table means "resolve globally"
/// at runtime.
pub struct Resolver {
    scopes: Vec<HashMap<String, bool>>,
    locals: HashMap<NodeId, usize>,
    current_function: FunctionType,
    current_class: ClassType,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        Self {
            scopes: Vec::new(),
            locals: HashMap::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    pub fn resolve(mut self, statements: &[Statement], ctx: &mut LoxContext) -> HashMap<NodeId, usize> {
        self.resolve_statements(statements, ctx);
        ctx.trace(|| format!("resolver: recorded {} locals", self.locals.len()));
        self.locals
    }

    fn resolve_statements(&mut self, statements: &[Statement], ctx: &mut LoxContext) {
        for statement in statements {
            self.resolve_statement(statement, ctx);
        }
    }

    fn resolve_statement(&mut self, statement: &Statement, ctx: &mut LoxContext) {
        match statement {
            Statement::Panic(_) => {}
            Statement::Expression(e) => self.resolve_expr(&e.0, ctx),
            Statement::Print(p) => self.resolve_expr(&p.0, ctx),
            Statement::Return(r) => {
                if self.current_function == FunctionType::None {
                    ctx.report(r.keyword.line(), " at 'return'", "Can't return from top-level code.");
                }
                if let Some(value) = &r.value {
                    if self.current_function == FunctionType::Initializer {
                        ctx.report(
                            r.keyword.line(),
                            " at 'return'",
                            "Can't return a value from an initializer.",
                        );
                    }
                    self.resolve_expr(value, ctx);
                }
            }
            Statement::VariableDeclaration(VariableDeclarationStatement {
                initializer,
                identifier,
            }) => {
                // The initializer is resolved before `identifier` is declared, so
                // `var a = a + 1;` resolves the right-hand `a` to whatever binding
                // was already in scope rather than to the new, not-yet-initialized
                // one.
                if let Some(init) = initializer {
                    self.resolve_expr(init, ctx);
                }
                self.declare(identifier, ctx);
                self.define(identifier);
            }
            Statement::FunctionDeclaration(decl) => {
                self.declare(&decl.name, ctx);
                self.define(&decl.name);
                self.resolve_function(decl, FunctionType::Function, ctx);
            }
            Statement::ClassDeclaration(class_decl) => self.resolve_class(class_decl, ctx),
            Statement::Block(b) => {
                self.begin_scope();
                self.resolve_statements(&b.0, ctx);
                self.end_scope();
            }
            Statement::IfElse(IfElseStatement {
                condition,
                if_branch,
                else_branch,
            }) => {
                self.resolve_expr(condition, ctx);
                self.resolve_statement(if_branch, ctx);
                if let Some(else_branch) = else_branch {
                    self.resolve_statement(else_branch, ctx);
                }
            }
            Statement::While(WhileStatement { condition, body }) => {
                self.resolve_expr(condition, ctx);
                self.resolve_statement(body, ctx);
            }
        }
    }

    fn resolve_class(&mut self, decl: &ClassDeclaration, ctx: &mut LoxContext) {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(&decl.name, ctx);
        self.define(&decl.name);

        if let Some(superclass) = &decl.superclass {
            if superclass.identifier.lexeme == decl.name.lexeme {
                ctx.report(
                    superclass.identifier.line(),
                    &format!(" at '{}'", superclass.identifier.lexeme),
                    "A class can't inherit from itself.",
                );
            }
            self.current_class = ClassType::Subclass;
            self.resolve_expr(&Expression::VariableReference(superclass.clone()), ctx);
            self.begin_scope();
            self.scopes.last_mut().unwrap().insert("super".to_string(), true);
        }

        self.begin_scope();
        self.scopes.last_mut().unwrap().insert("this".to_string(), true);

        for method in &decl.methods {
            let function_type = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, function_type, ctx);
        }

        self.end_scope();
        if decl.superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_function(&mut self, decl: &FunctionDeclaration, kind: FunctionType, ctx: &mut LoxContext) {
        let enclosing_function = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param, ctx);
            self.define(param);
        }
        self.resolve_statements(&decl.body, ctx);
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn resolve_expr(&mut self, expr: &Expression, ctx: &mut LoxContext) {
        match expr {
            Expression::Literal(_) => {}
            Expression::Grouping(g) => self.resolve_expr(&g.0, ctx),
            Expression::Unary(u) => self.resolve_expr(&u.operand, ctx),
            Expression::Logical(l) => {
                self.resolve_expr(&l.left, ctx);
                self.resolve_expr(&l.right, ctx);
            }
            Expression::Binary(b) => {
                self.resolve_expr(&b.left, ctx);
                self.resolve_expr(&b.right, ctx);
            }
            Expression::VariableReference(v) => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&v.identifier.lexeme) == Some(&false) {
                        ctx.report(
                            v.identifier.line(),
                            &format!(" at '{}'", v.identifier.lexeme),
                            "Can't read local variable in its own initializer.",
                        );
                    }
                }
                self.resolve_local(v.id, &v.identifier);
            }
            Expression::VariableAssignment(v) => {
                self.resolve_expr(&v.value, ctx);
                self.resolve_local(v.id, &v.identifier);
            }
            Expression::Call(c) => {
                self.resolve_expr(&c.callee, ctx);
                for arg in &c.args {
                    self.resolve_expr(arg, ctx);
                }
            }
            Expression::Get(g) => self.resolve_expr(&g.object, ctx),
            Expression::Set(s) => {
                self.resolve_expr(&s.value, ctx);
                self.resolve_expr(&s.object, ctx);
            }
            Expression::This(t) => {
                if self.current_class == ClassType::None {
                    ctx.report(t.keyword.line(), " at 'this'", "Can't use 'this' outside of a class.");
                }
                self.resolve_local(t.id, &t.keyword);
            }
            Expression::Super(s) => {
                match self.current_class {
                    ClassType::None => ctx.report(
                        s.keyword.line(),
                        " at 'super'",
                        "Can't use 'super' outside of a class.",
                    ),
                    ClassType::Class => ctx.report(
                        s.keyword.line(),
                        " at 'super'",
                        "Can't use 'super' in a class with no superclass.",
                    ),
                    ClassType::Subclass => {}
                }
                self.resolve_local(s.id, &s.keyword);
            }
        }
    }

    /// Redefinition within a scope is reported when the *declaration*
    /// actually executes, not here: it is a runtime diagnostic (see
    /// `Interpreter::report_if_redefined`) so that it interleaves correctly
    /// with `print` output instead of aborting the whole program up front.
    fn declare(&mut self, name: &Token, _ctx: &mut LoxContext) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn resolve_local(&mut self, id: NodeId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                self.locals.insert(id, depth);
                return;
            }
        }
        // Not found in any tracked scope: resolves to global at runtime.
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }
}

#[cfg(test)]
mod tests {
    use crate::config::LoxConfig;
    use crate::context::LoxContext;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    fn resolve(source: &str) -> (bool, String) {
        let mut sink = Vec::new();
        let mut ctx = LoxContext::new(&mut sink, LoxConfig::default());
        let tokens = Scanner::new(source).scan_all(&mut ctx);
        let statements = Parser::new(tokens).parse(&mut ctx);
        super::Resolver::new().resolve(&statements, &mut ctx);
        (ctx.had_error(), String::from_utf8(sink).unwrap())
    }

    #[test]
    fn a_top_level_return_is_a_static_error() {
        let (had_error, out) = resolve("return 1;");
        assert!(had_error);
        assert!(out.contains("Can't return from top-level code."), "{out}");
    }

    #[test]
    fn this_outside_a_class_is_a_static_error() {
        let (had_error, out) = resolve("print this;");
        assert!(had_error);
        assert!(out.contains("Can't use 'this' outside of a class."), "{out}");
    }

    #[test]
    fn super_outside_a_class_is_a_static_error() {
        let (had_error, out) = resolve("print super.m();");
        assert!(had_error);
        assert!(out.contains("Can't use 'super' outside of a class."), "{out}");
    }

    #[test]
    fn super_in_a_class_with_no_superclass_is_a_static_error() {
        let (had_error, out) = resolve("class A { m() { super.m(); } }");
        assert!(had_error);
        assert!(out.contains("Can't use 'super' in a class with no superclass."), "{out}");
    }

    #[test]
    fn a_class_inheriting_from_itself_is_a_static_error() {
        let (had_error, out) = resolve("class A < A {}");
        assert!(had_error);
        assert!(out.contains("A class can't inherit from itself."), "{out}");
    }

    #[test]
    fn returning_a_value_from_an_initializer_is_a_static_error() {
        let (had_error, out) = resolve("class A { init() { return 1; } }");
        assert!(had_error);
        assert!(out.contains("Can't return a value from an initializer."), "{out}");
    }

    #[test]
    fn a_well_formed_program_resolves_without_errors() {
        let (had_error, _) = resolve("class A { init() { return; } m() { return this; } }");
        assert!(!had_error);
    }
}
