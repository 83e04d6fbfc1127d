use crate::context::LoxContext;
use crate::interpreter::callable::Callable;
use crate::interpreter::class::LoxClass;
use crate::interpreter::environment::{DefineOutcome, Environment};
use crate::interpreter::function::LoxFunction;
use crate::interpreter::instance::LoxInstance;
use crate::interpreter::native::NativeFunction;
use crate::interpreter::value::{Object, Value};
use crate::parser::ast::{
    ClassDeclaration, Expression, IfElseStatement, NodeId, Statement, VariableDeclarationStatement,
    WhileStatement,
};
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::{Scanner, Token, TokenKind};
use std::collections::HashMap;
use std::rc::Rc;

/// Why a statement stopped executing before reaching its end: either an
/// unrecoverable runtime error, or a `return` unwinding toward the call
/// that invoked the current function.
pub enum Flow {
    Error(RuntimeError),
    Return(Value),
}

impl From<RuntimeError> for Flow {
    fn from(e: RuntimeError) -> Self {
        Flow::Error(e)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("{message}")]
    Generic { token: Option<Token>, message: String },
}

impl RuntimeError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        Self::Generic {
            token: Some(token),
            message: message.into(),
        }
    }

    pub fn operands_must_be_numbers(operator: Token, left: &'static str, right: &'static str) -> Self {
        Self::new(
            operator,
            format!("Operands must be numbers. Got {left} and {right}."),
        )
    }

    pub fn operands_must_be_numbers_or_strings(
        operator: Token,
        left: &'static str,
        right: &'static str,
    ) -> Self {
        Self::new(
            operator,
            format!("Operands must be two numbers or two strings. Got {left} and {right}."),
        )
    }

    pub fn cannot_apply(operator: Token, op: &str, operand: &'static str) -> Self {
        Self::new(operator, format!("Cannot apply '{op}' to type {operand}."))
    }

    pub fn undefined_variable(name: &str, token: Token) -> Self {
        Self::new(token, format!("Undefined variable '{name}'."))
    }

    pub fn not_callable(token: Token) -> Self {
        Self::new(token, "Can only call functions and classes.")
    }

    pub fn wrong_arity(token: Token, expected: usize, got: usize) -> Self {
        Self::new(
            token,
            format!("Expected {expected} arguments but got {got}."),
        )
    }

    pub fn only_instances_have_properties(token: Token) -> Self {
        Self::new(token, "Only instances have properties.")
    }

    pub fn only_instances_have_fields(token: Token) -> Self {
        Self::new(token, "Only instances have fields.")
    }

    pub fn undefined_property(token: Token, name: &str) -> Self {
        Self::new(token, format!("Undefined property '{name}'."))
    }

    pub fn superclass_must_be_a_class(token: Token) -> Self {
        Self::new(token, "Superclass must be a class.")
    }

    /// A condition the resolver's invariants should have made unreachable
    /// (an unresolved local whose depth doesn't land on a bound name, or
    /// similar). Surfacing it as a runtime error rather than panicking
    /// keeps a REPL session alive even if an invariant is ever violated.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Generic {
            token: None,
            message: format!("[internal error] {}", message.into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error("had a compile-time error")]
    HadError,
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

pub struct Interpreter {
    globals: Environment,
    environment: Environment,
    locals: HashMap<NodeId, usize>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Environment::new_global();
        globals.define(
            "clock".to_string(),
            Value::Object(Object::Native(Rc::new(NativeFunction::clock()))),
        );
        globals.define(
            "str".to_string(),
            Value::Object(Object::Native(Rc::new(NativeFunction::str()))),
        );
        Self {
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
        }
    }

    /// Scans, parses, resolves and executes `source` against this
    /// interpreter's persistent global state (so a REPL session's later
    /// lines can see an earlier line's `var` and `fun` declarations).
    pub fn execute_source(&mut self, source: &str, ctx: &mut LoxContext) -> Result<(), ExecuteError> {
        let tokens = Scanner::new(source).scan_all(ctx);
        let statements = Parser::new(tokens).parse(ctx);
        let locals = Resolver::new().resolve(&statements, ctx);
        self.locals.extend(locals);

        if ctx.had_error() {
            return Err(ExecuteError::HadError);
        }

        for statement in &statements {
            if let Err(Flow::Error(e)) = self.execute(statement, ctx) {
                ctx.report_runtime_error(&e.to_string());
                return Err(ExecuteError::Runtime(e));
            }
        }
        Ok(())
    }

    fn execute(&mut self, stmt: &Statement, ctx: &mut LoxContext) -> Result<(), Flow> {
        match stmt {
            Statement::Panic(p) => {
                ctx.report_runtime_error(&p.message);
                Ok(())
            }
            Statement::Expression(e) => {
                self.eval(&e.0, ctx)?;
                Ok(())
            }
            Statement::Print(p) => {
                let value = self.eval(&p.0, ctx)?;
                ctx.print_line(&value.to_string());
                Ok(())
            }
            Statement::Return(r) => {
                let value = match &r.value {
                    Some(e) => self.eval(e, ctx)?,
                    None => Value::Nil,
                };
                Err(Flow::Return(value))
            }
            Statement::VariableDeclaration(VariableDeclarationStatement {
                initializer,
                identifier,
            }) => {
                let value = match initializer {
                    Some(e) => self.eval(e, ctx)?,
                    None => Value::Nil,
                };
                self.report_if_redefined(identifier, self.environment.define(identifier.lexeme.clone(), value), ctx);
                Ok(())
            }
            Statement::FunctionDeclaration(decl) => {
                let function = LoxFunction::new(Rc::clone(decl), self.environment.clone(), false);
                let outcome = self.environment.define(
                    decl.name.lexeme.clone(),
                    Value::Object(Object::Function(Rc::new(function))),
                );
                self.report_if_redefined(&decl.name, outcome, ctx);
                Ok(())
            }
            Statement::ClassDeclaration(class_decl) => self.execute_class_decl(class_decl, ctx),
            Statement::Block(b) => {
                let block_env = Environment::child(&self.environment);
                self.execute_block(&b.0, block_env, ctx)
            }
            Statement::IfElse(IfElseStatement {
                condition,
                if_branch,
                else_branch,
            }) => {
                if self.eval(condition, ctx)?.is_truthy() {
                    self.execute(if_branch, ctx)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch, ctx)
                } else {
                    Ok(())
                }
            }
            Statement::While(WhileStatement { condition, body }) => {
                while self.eval(condition, ctx)?.is_truthy() {
                    self.execute(body, ctx)?;
                }
                Ok(())
            }
        }
    }

    /// Runs `statements` in `env`, restoring the interpreter's previous
    /// environment on every exit path (normal completion, `return`, or
    /// error) so a function call or block never leaks its scope into the
    /// caller.
    pub(crate) fn execute_block(
        &mut self,
        statements: &[Statement],
        env: Environment,
        ctx: &mut LoxContext,
    ) -> Result<(), Flow> {
        let previous = std::mem::replace(&mut self.environment, env);
        let mut result = Ok(());
        for statement in statements {
            if let Err(e) = self.execute(statement, ctx) {
                result = Err(e);
                break;
            }
        }
        self.environment = previous;
        result
    }

    fn execute_class_decl(&mut self, decl: &ClassDeclaration, ctx: &mut LoxContext) -> Result<(), Flow> {
        let superclass = match &decl.superclass {
            Some(var) => {
                let value = self.eval(&Expression::VariableReference(var.clone()), ctx)?;
                match value {
                    Value::Object(Object::Class(c)) => Some(c),
                    _ => return Err(RuntimeError::superclass_must_be_a_class(var.identifier.clone()).into()),
                }
            }
            None => None,
        };

        let outcome = self.environment.define(decl.name.lexeme.clone(), Value::Nil);
        self.report_if_redefined(&decl.name, outcome, ctx);

        let method_env = match &superclass {
            Some(s) => {
                let env = Environment::child(&self.environment);
                env.define(
                    "super".to_string(),
                    Value::Object(Object::Class(Rc::clone(s))),
                );
                env
            }
            None => self.environment.clone(),
        };

        let mut methods = HashMap::new();
        for method in &decl.methods {
            let is_initializer = method.name.lexeme == "init";
            let function = LoxFunction::new(Rc::clone(method), method_env.clone(), is_initializer);
            methods.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        let class = LoxClass::new(decl.name.clone(), superclass, methods);
        self.environment
            .assign(&decl.name.lexeme, Value::Object(Object::Class(Rc::new(class))))
            .expect("class name was just defined in this scope");
        Ok(())
    }

    /// Global redefinition is silent; redefinition in any nested scope is
    /// reported (but the new value is still stored and execution continues).
    fn report_if_redefined(&self, name: &Token, outcome: DefineOutcome, ctx: &mut LoxContext) {
        if matches!(outcome, DefineOutcome::Redefined) {
            ctx.report(
                name.line(),
                &format!(" at '{}'", TokenKind::Identifier),
                &format!("Variable '{}' redefined.", name.lexeme),
            );
        }
    }

    fn eval(&mut self, expr: &Expression, ctx: &mut LoxContext) -> Result<Value, Flow> {
        match expr {
            Expression::Literal(l) => Ok(l.0.clone()),
            Expression::Grouping(g) => self.eval(&g.0, ctx),
            Expression::Unary(u) => {
                let value = self.eval(&u.operand, ctx)?;
                match u.operator.kind {
                    TokenKind::Minus => match value {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::new(u.operator.clone(), "Operand must be a number.").into()),
                    },
                    TokenKind::Bang => match value {
                        Value::Boolean(_) | Value::Nil => Ok(Value::Boolean(!value.is_truthy())),
                        _ => Err(RuntimeError::cannot_apply(u.operator.clone(), "!", value.type_name()).into()),
                    },
                    _ => unreachable!("parser never produces a unary operator other than `!`/`-`"),
                }
            }
            Expression::Logical(l) => {
                let left = self.eval(&l.left, ctx)?;
                match l.operator.kind {
                    TokenKind::Or if left.is_truthy() => Ok(left),
                    TokenKind::Or => self.eval(&l.right, ctx),
                    TokenKind::And if !left.is_truthy() => Ok(left),
                    TokenKind::And => self.eval(&l.right, ctx),
                    _ => unreachable!("parser never produces a logical operator other than `and`/`or`"),
                }
            }
            Expression::Binary(b) => {
                let left = self.eval(&b.left, ctx)?;
                let right = self.eval(&b.right, ctx)?;
                let op = b.operator.clone();
                match op.kind {
                    TokenKind::Minus => num_op(left, right, op, |l, r| Value::Number(l - r)),
                    TokenKind::Slash => num_op(left, right, op, |l, r| Value::Number(l / r)),
                    TokenKind::Star => num_op(left, right, op, |l, r| Value::Number(l * r)),
                    TokenKind::Greater => {
                        cmp_op(left, right, op, |l, r| l > r, |l, r| l > r)
                    }
                    TokenKind::GreaterEqual => {
                        cmp_op(left, right, op, |l, r| l >= r, |l, r| l >= r)
                    }
                    TokenKind::Less => cmp_op(left, right, op, |l, r| l < r, |l, r| l < r),
                    TokenKind::LessEqual => {
                        cmp_op(left, right, op, |l, r| l <= r, |l, r| l <= r)
                    }
                    TokenKind::Plus => {
                        let (left_type, right_type) = (left.type_name(), right.type_name());
                        match (left, right) {
                            (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
                            (Value::String(l), Value::String(r)) => Ok(Value::String(l + &r)),
                            // Appending `nil` to a string yields this literal
                            // placeholder rather than an error.
                            (Value::String(l), Value::Nil) => Ok(Value::String(l + "{([<nil>])}")),
                            _ => Err(RuntimeError::operands_must_be_numbers_or_strings(
                                op, left_type, right_type,
                            )
                            .into()),
                        }
                    }
                    TokenKind::EqualEqual => Ok(Value::Boolean(left == right)),
                    TokenKind::BangEqual => Ok(Value::Boolean(left != right)),
                    _ => unreachable!("parser never produces a binary operator outside this set"),
                }
            }
            Expression::VariableReference(v) => self.lookup_variable(&v.identifier, v.id, ctx),
            Expression::VariableAssignment(v) => {
                let value = self.eval(&v.value, ctx)?;
                match self.locals.get(&v.id) {
                    Some(&distance) => self
                        .environment
                        .assign_at(distance, &v.identifier.lexeme, value.clone())
                        .map_err(|_| RuntimeError::internal("resolved local missing at assign"))?,
                    None => self
                        .globals
                        .assign(&v.identifier.lexeme, value.clone())
                        .map_err(|_| RuntimeError::undefined_variable(&v.identifier.lexeme, v.identifier.clone()))?,
                }
                Ok(value)
            }
            Expression::Call(c) => {
                let callee = self.eval(&c.callee, ctx)?;
                let mut arguments = Vec::with_capacity(c.args.len());
                for arg in &c.args {
                    arguments.push(self.eval(arg, ctx)?);
                }
                self.call_value(callee, c.paren.clone(), arguments, ctx)
            }
            Expression::Get(g) => {
                let object = self.eval(&g.object, ctx)?;
                match object {
                    Value::Object(Object::Instance(instance)) => {
                        LoxInstance::get(&instance, &g.name.lexeme)
                            .ok_or_else(|| RuntimeError::undefined_property(g.name.clone(), &g.name.lexeme).into())
                    }
                    _ => Err(RuntimeError::only_instances_have_properties(g.name.clone()).into()),
                }
            }
            Expression::Set(s) => {
                let object = self.eval(&s.object, ctx)?;
                match object {
                    Value::Object(Object::Instance(instance)) => {
                        let value = self.eval(&s.value, ctx)?;
                        instance.borrow_mut().set(s.name.lexeme.clone(), value.clone());
                        Ok(value)
                    }
                    _ => Err(RuntimeError::only_instances_have_fields(s.name.clone()).into()),
                }
            }
            Expression::This(t) => self.lookup_variable(&t.keyword, t.id, ctx),
            Expression::Super(s) => {
                let distance = *self
                    .locals
                    .get(&s.id)
                    .ok_or_else(|| RuntimeError::internal("`super` resolved with no recorded depth"))?;
                let superclass = match self.environment.get_at(distance, "super") {
                    Some(Value::Object(Object::Class(c))) => c,
                    _ => return Err(RuntimeError::internal("`super` binding was not a class").into()),
                };
                // `this` always lives exactly one scope inside the scope binding `super`.
                let instance = match self.environment.get_at(distance - 1, "this") {
                    Some(Value::Object(Object::Instance(i))) => i,
                    _ => return Err(RuntimeError::internal("`this` missing alongside `super`").into()),
                };
                let method = superclass
                    .find_method(&s.method.lexeme)
                    .ok_or_else(|| RuntimeError::undefined_property(s.method.clone(), &s.method.lexeme))?;
                Ok(Value::Object(Object::Function(Rc::new(
                    method.bind(instance),
                ))))
            }
        }
    }

    fn lookup_variable(&mut self, name: &Token, id: NodeId, _ctx: &mut LoxContext) -> Result<Value, Flow> {
        match self.locals.get(&id) {
            Some(&distance) => self
                .environment
                .get_at(distance, &name.lexeme)
                .ok_or_else(|| RuntimeError::internal("resolved local missing at lookup").into()),
            None => self
                .globals
                .get(&name.lexeme)
                .ok_or_else(|| RuntimeError::undefined_variable(&name.lexeme, name.clone()).into()),
        }
    }

    fn call_value(
        &mut self,
        callee: Value,
        paren: Token,
        arguments: Vec<Value>,
        ctx: &mut LoxContext,
    ) -> Result<Value, Flow> {
        match callee {
            Value::Object(Object::Function(f)) => {
                check_arity(&paren, f.arity(), arguments.len())?;
                Ok(f.call(self, ctx, arguments)?)
            }
            Value::Object(Object::Native(f)) => {
                check_arity(&paren, f.arity(), arguments.len())?;
                Ok(f.call(self, ctx, arguments)?)
            }
            Value::Object(Object::Class(class)) => {
                check_arity(&paren, class.arity(), arguments.len())?;
                let instance = Rc::new(std::cell::RefCell::new(LoxInstance::new(Rc::clone(&class))));
                if let Some(init) = class.find_method("init") {
                    let bound = init.bind(Rc::clone(&instance));
                    bound.call(self, ctx, arguments)?;
                }
                Ok(Value::Object(Object::Instance(instance)))
            }
            _ => Err(RuntimeError::not_callable(paren).into()),
        }
    }
}

fn check_arity(paren: &Token, expected: usize, got: usize) -> Result<(), Flow> {
    if expected != got {
        Err(RuntimeError::wrong_arity(paren.clone(), expected, got).into())
    } else {
        Ok(())
    }
}

fn num_op<F>(left: Value, right: Value, operator: Token, op: F) -> Result<Value, Flow>
where
    F: Fn(f64, f64) -> Value,
{
    let (left_type, right_type) = (left.type_name(), right.type_name());
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => Ok(op(l, r)),
        _ => Err(RuntimeError::operands_must_be_numbers(operator, left_type, right_type).into()),
    }
}

/// Ordering comparisons accept two numbers or two strings (lexicographic).
/// Number comparisons use IEEE float comparison directly, so a `NaN`
/// operand makes every ordering comparison false rather than erroring.
fn cmp_op<N, S>(left: Value, right: Value, operator: Token, nums: N, strs: S) -> Result<Value, Flow>
where
    N: Fn(f64, f64) -> bool,
    S: Fn(&str, &str) -> bool,
{
    let (left_type, right_type) = (left.type_name(), right.type_name());
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => Ok(Value::Boolean(nums(l, r))),
        (Value::String(l), Value::String(r)) => Ok(Value::Boolean(strs(&l, &r))),
        _ => Err(RuntimeError::operands_must_be_numbers_or_strings(operator, left_type, right_type).into()),
    }
}
