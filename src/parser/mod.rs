pub mod ast;

use crate::context::LoxContext;
use crate::interpreter::value::Value;
use crate::parser::ast::{
    BlockStatement, ClassDeclaration, Expression, ExpressionStatement, FunctionDeclaration,
    IfElseStatement, NodeId, PanicStatement, PrintStatement, ReturnStatement, Statement,
    VariableDeclarationStatement, VariableReferenceExpression, WhileStatement,
};
use crate::scanner::{Literal, Token, TokenKind};
use std::iter::Peekable;
use std::rc::Rc;

const MAX_ARGS: usize = 255;

#[derive(PartialEq, Eq, Copy, Clone)]
enum ParsingMode {
    ErrorRecovery,
    Normal,
}

pub struct Parser<TokenIter>
where
    TokenIter: Iterator<Item = Token>,
{
    tokens: Peekable<Source<TokenIter>>,
    mode: ParsingMode,
    next_id: u64,
}

impl Parser<std::vec::IntoIter<Token>> {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: Source(tokens.into_iter()).peekable(),
            mode: ParsingMode::Normal,
            next_id: 0,
        }
    }
}

impl<TokenIter> Parser<TokenIter>
where
    TokenIter: Iterator<Item = Token>,
{
    /// Parses the whole token stream into a declaration list. A grammar
    /// violation never aborts the pass: the offending declaration is
    /// replaced by a synthetic [`Statement::Panic`] and parsing resumes at
    /// the next statement boundary (`synchronize`), so one typo surfaces
    /// one diagnostic instead of a cascade.
    pub fn parse(mut self, ctx: &mut LoxContext) -> Vec<Statement> {
        let mut statements = vec![];
        while !self.is_at_end() {
            match self.declaration(ctx) {
                Some(statement) => statements.push(statement),
                None => {
                    let panic_stmt = self.synchronize(ctx);
                    statements.push(panic_stmt);
                }
            }
            self.mode = ParsingMode::Normal;
        }
        statements
    }

    fn next_node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn declaration(&mut self, ctx: &mut LoxContext) -> Option<Statement> {
        if self.advance_on_match(&[TokenKind::Class]).is_some() {
            self.class_declaration(ctx)
        } else if self.advance_on_match(&[TokenKind::Fun]).is_some() {
            self.function(ctx).map(|f| Statement::FunctionDeclaration(Rc::new(f)))
        } else if self.advance_on_match(&[TokenKind::Var]).is_some() {
            let identifier = self.expect(TokenKind::Identifier, ctx)?;
            let mut initializer = None;
            if self.advance_on_match(&[TokenKind::Equal]).is_some() {
                initializer = Some(self.expression(ctx)?);
            }
            self.expect(TokenKind::Semicolon, ctx)?;
            Some(Statement::VariableDeclaration(
                VariableDeclarationStatement {
                    initializer,
                    identifier,
                },
            ))
        } else {
            self.statement(ctx)
        }
    }

    fn class_declaration(&mut self, ctx: &mut LoxContext) -> Option<Statement> {
        let name = self.expect(TokenKind::Identifier, ctx)?;
        let superclass = if self.advance_on_match(&[TokenKind::Less]).is_some() {
            let super_name = self.expect(TokenKind::Identifier, ctx)?;
            Some(VariableReferenceExpression {
                identifier: super_name,
                id: self.next_node_id(),
            })
        } else {
            None
        };
        self.expect(TokenKind::LeftBrace, ctx)?;

        let mut methods = vec![];
        while self.peek().map(|t| t.kind != TokenKind::RightBrace).unwrap_or(false) {
            methods.push(Rc::new(self.function(ctx)?));
        }
        self.expect(TokenKind::RightBrace, ctx)?;

        Some(Statement::ClassDeclaration(ClassDeclaration {
            name,
            superclass,
            methods,
        }))
    }

    fn function(&mut self, ctx: &mut LoxContext) -> Option<FunctionDeclaration> {
        let name = self.expect(TokenKind::Identifier, ctx)?;
        self.expect(TokenKind::LeftParen, ctx)?;

        let mut params = vec![];
        if self.peek()?.kind != TokenKind::RightParen {
            loop {
                if params.len() >= MAX_ARGS {
                    let line = self.peek().map(|t| t.line()).unwrap_or_default();
                    ctx.report(line, "", "Can't have more than 255 parameters.");
                }
                params.push(self.expect(TokenKind::Identifier, ctx)?);
                if self.advance_on_match(&[TokenKind::Comma]).is_none() {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, ctx)?;

        self.expect(TokenKind::LeftBrace, ctx)?;
        let body = self.block_statement(ctx)?;

        Some(FunctionDeclaration {
            name,
            params,
            body: body.0,
        })
    }

    fn statement(&mut self, ctx: &mut LoxContext) -> Option<Statement> {
        if self.advance_on_match(&[TokenKind::Print]).is_some() {
            self.print_statement(ctx).map(Statement::Print)
        } else if let Some(keyword) = self.advance_on_match(&[TokenKind::Return]) {
            self.return_statement(keyword, ctx)
        } else if self.advance_on_match(&[TokenKind::While]).is_some() {
            self.while_statement(ctx).map(Statement::While)
        } else if self.advance_on_match(&[TokenKind::For]).is_some() {
            self.for_statement(ctx)
        } else if self.advance_on_match(&[TokenKind::If]).is_some() {
            self.if_else_statement(ctx).map(Statement::IfElse)
        } else if self.advance_on_match(&[TokenKind::LeftBrace]).is_some() {
            self.block_statement(ctx).map(Statement::Block)
        } else {
            self.expression_statement(ctx).map(Statement::Expression)
        }
    }

    fn return_statement(&mut self, keyword: Token, ctx: &mut LoxContext) -> Option<Statement> {
        let value = if self.peek().map(|t| t.kind != TokenKind::Semicolon).unwrap_or(false) {
            Some(self.expression(ctx)?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, ctx)?;
        Some(Statement::Return(ReturnStatement { keyword, value }))
    }

    fn for_statement(&mut self, ctx: &mut LoxContext) -> Option<Statement> {
        self.expect(TokenKind::LeftParen, ctx)?;
        let initializer = if self.advance_on_match(&[TokenKind::Semicolon]).is_some() {
            None
        } else if self.peek().map(|t| t.kind == TokenKind::Var).unwrap_or(false) {
            self.advance_on_match(&[TokenKind::Var]);
            let identifier = self.expect(TokenKind::Identifier, ctx)?;
            let mut init = None;
            if self.advance_on_match(&[TokenKind::Equal]).is_some() {
                init = Some(self.expression(ctx)?);
            }
            self.expect(TokenKind::Semicolon, ctx)?;
            Some(Statement::VariableDeclaration(VariableDeclarationStatement {
                initializer: init,
                identifier,
            }))
        } else {
            Some(Statement::Expression(self.expression_statement(ctx)?))
        };
        let condition = if self.peek()?.kind == TokenKind::Semicolon {
            None
        } else {
            Some(self.expression(ctx)?)
        };
        self.expect(TokenKind::Semicolon, ctx)?;
        let increment = if self.peek()?.kind == TokenKind::RightParen {
            None
        } else {
            Some(self.expression(ctx)?)
        };
        self.expect(TokenKind::RightParen, ctx)?;
        let mut body = self.statement(ctx)?;

        if let Some(increment) = increment {
            body = Statement::Block(BlockStatement(vec![
                body,
                Statement::Expression(ExpressionStatement(increment)),
            ]));
        }

        body = Statement::While(WhileStatement {
            condition: condition.unwrap_or_else(|| Expression::value(Value::Boolean(true))),
            body: Box::new(body),
        });

        if let Some(initializer) = initializer {
            body = Statement::Block(BlockStatement(vec![initializer, body]));
        }

        Some(body)
    }

    fn block_statement(&mut self, ctx: &mut LoxContext) -> Option<BlockStatement> {
        let mut statements = vec![];
        loop {
            if self.is_at_end() {
                break;
            }
            if let Some(t) = self.peek() {
                if t.kind == TokenKind::RightBrace {
                    break;
                }
            }
            match self.declaration(ctx) {
                Some(s) => statements.push(s),
                None => statements.push(self.synchronize(ctx)),
            }
        }
        self.expect(TokenKind::RightBrace, ctx)?;
        Some(BlockStatement(statements))
    }

    fn while_statement(&mut self, ctx: &mut LoxContext) -> Option<WhileStatement> {
        self.expect(TokenKind::LeftParen, ctx)?;
        let condition = self.expression(ctx)?;
        self.expect(TokenKind::RightParen, ctx)?;
        let body = self.statement(ctx)?;
        Some(WhileStatement {
            condition,
            body: Box::new(body),
        })
    }

    fn if_else_statement(&mut self, ctx: &mut LoxContext) -> Option<IfElseStatement> {
        self.expect(TokenKind::LeftParen, ctx)?;
        let condition = self.expression(ctx)?;
        self.expect(TokenKind::RightParen, ctx)?;
        let if_branch = self.statement(ctx)?;
        let mut else_branch = None;
        if self.advance_on_match(&[TokenKind::Else]).is_some() {
            else_branch = Some(Box::new(self.statement(ctx)?));
        }
        Some(IfElseStatement {
            condition,
            if_branch: Box::new(if_branch),
            else_branch,
        })
    }

    fn print_statement(&mut self, ctx: &mut LoxContext) -> Option<PrintStatement> {
        let expr = self.expression(ctx)?;
        self.expect(TokenKind::Semicolon, ctx)?;
        Some(PrintStatement(expr))
    }

    fn expression_statement(&mut self, ctx: &mut LoxContext) -> Option<ExpressionStatement> {
        let expr = self.expression(ctx)?;
        self.expect(TokenKind::Semicolon, ctx)?;
        Some(ExpressionStatement(expr))
    }

    fn expression(&mut self, ctx: &mut LoxContext) -> Option<Expression> {
        self.assignment(ctx)
    }

    fn assignment(&mut self, ctx: &mut LoxContext) -> Option<Expression> {
        let expr = self.or(ctx)?;

        if let Some(equals) = self.advance_on_match(&[TokenKind::Equal]) {
            let value = self.assignment(ctx)?;
            match expr {
                Expression::VariableReference(v) => {
                    Some(Expression::variable_assignment(v.identifier, value, self.next_node_id()))
                }
                Expression::Get(g) => Some(Expression::set(*g.object, g.name, value)),
                _ => {
                    ctx.report(equals.line(), "", "Invalid assignment target.");
                    None
                }
            }
        } else {
            Some(expr)
        }
    }

    fn or(&mut self, ctx: &mut LoxContext) -> Option<Expression> {
        let mut expr = self.and(ctx)?;
        while let Some(operator) = self.advance_on_match(&[TokenKind::Or]) {
            expr = Expression::logical(expr, operator, self.and(ctx)?);
        }
        Some(expr)
    }

    fn and(&mut self, ctx: &mut LoxContext) -> Option<Expression> {
        let mut expr = self.equality(ctx)?;
        while let Some(operator) = self.advance_on_match(&[TokenKind::And]) {
            expr = Expression::logical(expr, operator, self.equality(ctx)?);
        }
        Some(expr)
    }

    fn equality(&mut self, ctx: &mut LoxContext) -> Option<Expression> {
        let mut expr = self.comparison(ctx)?;
        while let Some(operator) =
            self.advance_on_match(&[TokenKind::BangEqual, TokenKind::EqualEqual])
        {
            expr = Expression::binary(expr, operator, self.comparison(ctx)?);
        }
        Some(expr)
    }

    fn comparison(&mut self, ctx: &mut LoxContext) -> Option<Expression> {
        let mut expr = self.term(ctx)?;
        while let Some(operator) = self.advance_on_match(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            expr = Expression::binary(expr, operator, self.term(ctx)?);
        }
        Some(expr)
    }

    fn term(&mut self, ctx: &mut LoxContext) -> Option<Expression> {
        let mut expr = self.factor(ctx)?;
        while let Some(operator) = self.advance_on_match(&[TokenKind::Minus, TokenKind::Plus]) {
            expr = Expression::binary(expr, operator, self.factor(ctx)?);
        }
        Some(expr)
    }

    fn factor(&mut self, ctx: &mut LoxContext) -> Option<Expression> {
        let mut expr = self.unary(ctx)?;
        while let Some(operator) = self.advance_on_match(&[TokenKind::Slash, TokenKind::Star]) {
            expr = Expression::binary(expr, operator, self.unary(ctx)?);
        }
        Some(expr)
    }

    fn unary(&mut self, ctx: &mut LoxContext) -> Option<Expression> {
        if let Some(operator) = self.advance_on_match(&[TokenKind::Bang, TokenKind::Minus]) {
            Some(Expression::unary(operator, self.unary(ctx)?))
        } else {
            self.call(ctx)
        }
    }

    fn call(&mut self, ctx: &mut LoxContext) -> Option<Expression> {
        let mut expr = self.primary(ctx)?;

        loop {
            if self.advance_on_match(&[TokenKind::LeftParen]).is_some() {
                expr = self.finish_call(expr, ctx)?;
            } else if self.advance_on_match(&[TokenKind::Dot]).is_some() {
                let name = self.expect(TokenKind::Identifier, ctx)?;
                expr = Expression::get(expr, name);
            } else {
                break;
            }
        }
        Some(expr)
    }

    fn finish_call(&mut self, callee: Expression, ctx: &mut LoxContext) -> Option<Expression> {
        let mut args = vec![];
        if self.peek()?.kind != TokenKind::RightParen {
            loop {
                if args.len() >= MAX_ARGS {
                    let line = self.peek().map(|t| t.line()).unwrap_or_default();
                    ctx.report(line, "", "Can't have more than 255 arguments.");
                }
                args.push(self.expression(ctx)?);
                if self.advance_on_match(&[TokenKind::Comma]).is_none() {
                    break;
                }
            }
        }
        let paren = self.expect(TokenKind::RightParen, ctx)?;
        Some(Expression::call(callee, paren, args))
    }

    fn primary(&mut self, ctx: &mut LoxContext) -> Option<Expression> {
        if self.advance_on_match(&[TokenKind::True]).is_some() {
            Some(Expression::value(Value::Boolean(true)))
        } else if self.advance_on_match(&[TokenKind::False]).is_some() {
            Some(Expression::value(Value::Boolean(false)))
        } else if self.advance_on_match(&[TokenKind::Nil]).is_some() {
            Some(Expression::value(Value::Nil))
        } else if let Some(t) = self.advance_on_match(&[TokenKind::Number]) {
            match t.literal {
                Some(Literal::Number(n)) => Some(Expression::value(Value::Number(n))),
                _ => Some(Expression::value(Value::Number(f64::NAN))),
            }
        } else if let Some(t) = self.advance_on_match(&[TokenKind::String]) {
            match t.literal {
                Some(Literal::String(s)) => Some(Expression::value(Value::String(s))),
                _ => Some(Expression::value(Value::String(String::new()))),
            }
        } else if let Some(t) = self.advance_on_match(&[TokenKind::This]) {
            Some(Expression::this(t, self.next_node_id()))
        } else if let Some(keyword) = self.advance_on_match(&[TokenKind::Super]) {
            self.expect(TokenKind::Dot, ctx)?;
            let method = self.expect(TokenKind::Identifier, ctx)?;
            Some(Expression::super_(keyword, method, self.next_node_id()))
        } else if let Some(t) = self.advance_on_match(&[TokenKind::Identifier]) {
            Some(Expression::variable_reference(t, self.next_node_id()))
        } else if self.advance_on_match(&[TokenKind::LeftParen]).is_some() {
            let expr = self.expression(ctx)?;
            self.expect(TokenKind::RightParen, ctx)?;
            Some(Expression::grouping(expr))
        } else {
            let (line, where_) = match self.peek() {
                Some(t) => (t.line(), format!(" at '{}'", t.kind)),
                None => (0, " at end".to_string()),
            };
            ctx.report(line, &where_, "Expect expression.");
            self.mode = ParsingMode::ErrorRecovery;
            None
        }
    }

    /// Discards tokens until after a `;` or just before a keyword that
    /// typically begins a new statement, then returns the synthetic
    /// statement that stands in for the declaration that failed to parse.
    fn synchronize(&mut self, ctx: &mut LoxContext) -> Statement {
        let line = self.peek().map(|t| t.line()).unwrap_or_default();
        loop {
            match self.tokens.next() {
                None => break,
                Some(t) if t.kind == TokenKind::Semicolon => break,
                Some(_) => {}
            }
            match self.tokens.peek().map(|t| t.kind) {
                Some(
                    TokenKind::Class
                    | TokenKind::Fun
                    | TokenKind::Var
                    | TokenKind::For
                    | TokenKind::If
                    | TokenKind::While
                    | TokenKind::Print
                    | TokenKind::Return,
                ) => break,
                Some(TokenKind::Eof) | None => break,
                _ => {}
            }
        }
        self.mode = ParsingMode::Normal;
        let _ = ctx;
        Statement::Panic(PanicStatement {
            keyword: Token::eof(line),
            message: "Invalid declaration.".to_string(),
        })
    }

    fn advance_on_match(&mut self, kinds: &[TokenKind]) -> Option<Token> {
        let upcoming = self.tokens.peek()?;
        if kinds.contains(&upcoming.kind) {
            return self.advance();
        }
        None
    }

    fn expect(&mut self, kind: TokenKind, ctx: &mut LoxContext) -> Option<Token> {
        if let Some(t) = self.advance_on_match(&[kind]) {
            return Some(t);
        }
        let (line, where_) = match self.peek() {
            Some(t) => (t.line(), format!(" at '{}'", t.kind)),
            None => (0, " at end".to_string()),
        };
        ctx.report(line, &where_, &format!("Expect {kind}."));
        self.mode = ParsingMode::ErrorRecovery;
        None
    }

    fn advance(&mut self) -> Option<Token> {
        if self.mode == ParsingMode::Normal {
            self.tokens.next()
        } else {
            None
        }
    }

    fn peek(&mut self) -> Option<&Token> {
        if self.mode == ParsingMode::Normal {
            self.tokens.peek()
        } else {
            None
        }
    }

    fn is_at_end(&mut self) -> bool {
        self.tokens
            .peek()
            .map(|t| t.kind == TokenKind::Eof)
            .unwrap_or(true)
    }
}

/// The parser never sees trivia: `Source` filters it out of the raw token
/// stream so every other method can assume a clean grammar-relevant stream.
struct Source<TokenIter>(TokenIter)
where
    TokenIter: Iterator<Item = Token>;

impl<TokenIter> Iterator for Source<TokenIter>
where
    TokenIter: Iterator<Item = Token>,
{
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.0.next() {
                None => break None,
                Some(t) if t.kind == TokenKind::Trivia => continue,
                Some(t) => break Some(t),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoxConfig;
    use crate::scanner::Scanner;

    fn parse(source: &str) -> Vec<Statement> {
        let mut sink = Vec::new();
        let mut ctx = LoxContext::new(&mut sink, LoxConfig::default());
        let tokens = Scanner::new(source).scan_all(&mut ctx);
        Parser::new(tokens).parse(&mut ctx)
    }

    fn expr_of(stmt: &Statement) -> &Expression {
        match stmt {
            Statement::Expression(ExpressionStatement(e)) => e,
            _ => panic!("expected an expression statement"),
        }
    }

    #[test]
    fn parses_a_binary_expression_with_correct_precedence() {
        let statements = parse("1 + 2 * 3;");
        match expr_of(&statements[0]) {
            Expression::Binary(b) => {
                assert!(matches!(*b.left, Expression::Literal(_)));
                assert!(matches!(*b.right, Expression::Binary(_)));
            }
            _ => panic!("expected a binary expression"),
        }
    }

    #[test]
    fn parses_a_call_chained_onto_a_property_access() {
        let statements = parse("a.b();");
        match expr_of(&statements[0]) {
            Expression::Call(c) => assert!(matches!(*c.callee, Expression::Get(_))),
            _ => panic!("expected a call expression"),
        }
    }

    #[test]
    fn assignment_to_a_non_lvalue_reports_but_does_not_panic() {
        let mut sink = Vec::new();
        let mut ctx = LoxContext::new(&mut sink, LoxConfig::default());
        let tokens = Scanner::new("1 = 2;").scan_all(&mut ctx);
        let statements = Parser::new(tokens).parse(&mut ctx);
        assert!(ctx.had_error());
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn a_missing_semicolon_synthesizes_a_panic_statement_and_keeps_parsing() {
        let statements = parse("var a = 1\nvar b = 2;");
        assert_eq!(statements.len(), 2);
        assert!(matches!(statements[0], Statement::Panic(_)));
        assert!(matches!(statements[1], Statement::VariableDeclaration(_)));
    }

    #[test]
    fn k_syntax_errors_at_distinct_statement_boundaries_yield_k_panics() {
        let mut sink = Vec::new();
        let mut ctx = LoxContext::new(&mut sink, LoxConfig::default());
        let source = "var ; \nvar b = 1;\nfun () {}\nprint 1;\nclass { }";
        let tokens = Scanner::new(source).scan_all(&mut ctx);
        let statements = Parser::new(tokens).parse(&mut ctx);

        let panic_count = statements
            .iter()
            .filter(|s| matches!(s, Statement::Panic(_)))
            .count();
        assert_eq!(panic_count, 3);
        assert_eq!(statements.len(), 5);
    }

    #[test]
    fn for_loop_desugars_into_a_block_containing_a_while_loop() {
        let statements = parse("for (var i = 0; i < 3; i = i + 1) print i;");
        match &statements[0] {
            Statement::Block(b) => {
                assert_eq!(b.0.len(), 2);
                assert!(matches!(b.0[0], Statement::VariableDeclaration(_)));
                assert!(matches!(b.0[1], Statement::While(_)));
            }
            _ => panic!("expected the desugared for-loop block"),
        }
    }
}
