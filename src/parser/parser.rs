use log::debug;

use crate::{
    analyzer::{Addressing, Declare, ScopeChain},
    lexer::{Token, TokenKind},
};

use super::{GrammarError, GrammarErrorKind, Rule, SyntaxTree, TokenCursor};

type Result<T> = std::result::Result<T, GrammarError>;

#[derive(Debug)]
pub struct Parser {
    cursor: TokenCursor,
    current: Option<Token>,
    line: usize,
    scope: ScopeChain,
    tree: SyntaxTree,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            cursor: TokenCursor::new(tokens),
            current: None,
            line: 1,
            scope: ScopeChain::new(),
            tree: SyntaxTree::new(Rule::Program),
        }
    }

    pub fn parse(mut self) -> Result<SyntaxTree> {
        self.advance()?;
        self.parse_program()?;
        debug!("parsed {} syntax tree nodes", self.tree.len());
        Ok(self.tree)
    }

    /// Reads the next token. Braces read for the first time open and close
    /// scope frames; tokens replayed from the pushback buffer were already
    /// accounted for.
    fn advance(&mut self) -> Result<()> {
        let replayed = self.cursor.is_replaying();
        self.current = self.cursor.next();
        let Some(kind) = self.kind() else {
            return Ok(());
        };
        if let Some(t) = &self.current {
            self.line = t.line;
        }
        if replayed {
            return Ok(());
        }

        match kind {
            TokenKind::OpenCurlyBrace => self.scope.push(Addressing::Absolute),
            TokenKind::CloseCurlyBrace => {
                if self.scope.pop().is_err() {
                    return Err(self.error(GrammarErrorKind::UnbalancedBrace));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Hands the speculatively consumed tokens back, followed by the current
    /// lookahead, and makes the first of them current again.
    fn unread(&mut self, consumed: Vec<Token>) {
        let mut tokens = consumed.into_iter();
        let Some(first) = tokens.next() else {
            return;
        };
        let mut replay: Vec<Token> = tokens.collect();
        replay.extend(self.current.take());
        self.cursor.unread(replay);
        self.line = first.line;
        self.current = Some(first);
    }

    fn kind(&self) -> Option<TokenKind> {
        self.current.as_ref().map(|t| t.kind)
    }

    fn is(&self, kind: TokenKind) -> bool {
        self.kind() == Some(kind)
    }

    fn text(&self) -> String {
        self.current
            .as_ref()
            .map_or_else(String::new, |t| t.text.clone())
    }

    /// The rule currently being parsed, used as error context.
    fn context(&self) -> Rule {
        self.tree
            .node(self.tree.current())
            .rule()
            .unwrap_or(Rule::Program)
    }

    fn error(&self, kind: GrammarErrorKind) -> GrammarError {
        GrammarError {
            line: self.line,
            rule: self.context(),
            kind,
        }
    }

    /// Runs `f` inside a fresh tree node for `rule`, returning to the parent
    /// node afterwards.
    fn rule<T>(&mut self, rule: Rule, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.tree.enter(rule, self.line);
        let out = f(self)?;
        self.tree.back();
        Ok(out)
    }

    /// Moves the current token into the tree.
    fn take(&mut self) -> Result<Token> {
        let Some(token) = self.current.clone() else {
            return Err(self.error(GrammarErrorKind::UnexpectedEnd));
        };
        self.tree.leaf(token.clone());
        self.advance()?;
        Ok(token)
    }

    fn consume(&mut self, kind: TokenKind) -> Result<bool> {
        if !self.is(kind) {
            return Ok(false);
        }
        self.take()?;
        Ok(true)
    }

    fn expect(&mut self, kind: TokenKind, what: &'static str) -> Result<Token> {
        if !self.is(kind) {
            return Err(self.error(GrammarErrorKind::Missing(what)));
        }
        self.take()
    }

    fn expect_ident(&mut self, what: &'static str) -> Result<Token> {
        self.expect(TokenKind::Ident, what)
    }

    fn declare(&mut self, name: &Token, declare: Declare) -> Result<()> {
        match self.scope.put(&name.text, declare) {
            Ok(_) => Ok(()),
            Err(_) => Err(GrammarError {
                line: name.line,
                rule: self.context(),
                kind: GrammarErrorKind::Redeclared(name.text.clone()),
            }),
        }
    }

    fn check_declared(&self, name: &Token) -> Result<()> {
        if self.scope.lookup(&name.text).is_some() {
            return Ok(());
        }
        Err(GrammarError {
            line: name.line,
            rule: self.context(),
            kind: GrammarErrorKind::Undeclared(name.text.clone()),
        })
    }

    /// program = declaration_list? function_decl* main_decl
    fn parse_program(&mut self) -> Result<()> {
        if self.is(TokenKind::Int) {
            self.parse_declaration_list()?;
        }
        while self.is(TokenKind::Function) {
            self.parse_function_decl()?;
        }
        if !self.is(TokenKind::Main) {
            return Err(self.error(GrammarErrorKind::MissingMain));
        }
        self.parse_main_decl()?;

        if self.current.is_some() {
            return Err(self.error(GrammarErrorKind::TrailingInput(self.text())));
        }
        Ok(())
    }

    /// function_decl = "function" ID "(" param_list ")" function_body
    fn parse_function_decl(&mut self) -> Result<()> {
        self.rule(Rule::FunctionDecl, |p| {
            p.expect(TokenKind::Function, "function keyword")?;
            let name = p.expect_ident("function name")?;
            p.expect(TokenKind::OpenParen, "left parenthesis")?;
            let params = p.parse_param_list()?;
            // Bound before the body so that the function can call itself.
            p.declare(
                &name,
                Declare::Function {
                    entry: None,
                    arity: params.len(),
                },
            )?;
            p.expect(TokenKind::CloseParen, "right parenthesis")?;
            p.parse_function_body(&params)
        })
    }

    /// param_list = (param ("," param)*)?
    fn parse_param_list(&mut self) -> Result<Vec<Token>> {
        self.rule(Rule::ParamList, |p| {
            let mut params = vec![];
            if p.is(TokenKind::Int) {
                params.push(p.parse_param()?);
                while p.consume(TokenKind::Comma)? {
                    params.push(p.parse_param()?);
                }
            }
            Ok(params)
        })
    }

    /// param = "int" ID
    fn parse_param(&mut self) -> Result<Token> {
        self.rule(Rule::Param, |p| {
            p.expect(TokenKind::Int, "int keyword")?;
            p.expect_ident("parameter name")
        })
    }

    /// main_decl = "main" "(" ")" function_body
    fn parse_main_decl(&mut self) -> Result<()> {
        self.rule(Rule::MainDecl, |p| {
            p.expect(TokenKind::Main, "main function")?;
            p.expect(TokenKind::OpenParen, "left parenthesis")?;
            p.expect(TokenKind::CloseParen, "right parenthesis")?;
            p.parse_function_body(&[])
        })
    }

    /// function_body = "{" declaration_list statement_list "}"
    ///
    /// Parameters share the frame opened by the body's brace with the locals.
    fn parse_function_body(&mut self, params: &[Token]) -> Result<()> {
        self.rule(Rule::FunctionBody, |p| {
            if !p.is(TokenKind::OpenCurlyBrace) {
                return Err(p.error(GrammarErrorKind::Missing("left brace")));
            }
            for param in params {
                p.declare(param, Declare::Int)?;
            }
            p.take()?;
            p.parse_declaration_list()?;
            p.parse_statement_list(false)?;
            p.expect(TokenKind::CloseCurlyBrace, "right brace")?;
            Ok(())
        })
    }

    /// declaration_list = declaration*
    fn parse_declaration_list(&mut self) -> Result<()> {
        self.rule(Rule::DeclarationList, |p| {
            while p.is(TokenKind::Int) {
                p.parse_declaration()?;
            }
            Ok(())
        })
    }

    /// declaration = "int" simple_declaration ("," simple_declaration)* ";"
    fn parse_declaration(&mut self) -> Result<()> {
        self.rule(Rule::Declaration, |p| {
            p.expect(TokenKind::Int, "int keyword")?;
            p.parse_simple_declaration()?;
            while p.consume(TokenKind::Comma)? {
                p.parse_simple_declaration()?;
            }
            p.expect(TokenKind::SemiColon, "semicolon")?;
            Ok(())
        })
    }

    /// simple_declaration = ID ("=" bool_expr | "[" NUM "]" ("=" array_init)?)?
    fn parse_simple_declaration(&mut self) -> Result<()> {
        self.rule(Rule::SimpleDeclaration, |p| {
            let name = p.expect_ident("identifier")?;
            let declare = if p.consume(TokenKind::Equal)? {
                p.parse_bool_expr()?;
                Declare::Int
            } else if p.consume(TokenKind::OpenSquareBrace)? {
                let size = p.expect(TokenKind::Num, "array size")?;
                let Ok(size) = size.text.parse() else {
                    return Err(p.error(GrammarErrorKind::Missing("array size")));
                };
                p.expect(TokenKind::CloseSquareBrace, "right bracket")?;
                if p.consume(TokenKind::Equal)? {
                    p.parse_array_init()?;
                }
                Declare::Array(size)
            } else {
                Declare::Int
            };
            p.declare(&name, declare)
        })
    }

    /// array_init = "{" (bool_expr ("," bool_expr)*)? "}"
    fn parse_array_init(&mut self) -> Result<()> {
        self.rule(Rule::ArrayInit, |p| {
            p.expect(TokenKind::OpenCurlyBrace, "left brace")?;
            if !p.is(TokenKind::CloseCurlyBrace) {
                p.parse_bool_expr()?;
                while p.consume(TokenKind::Comma)? {
                    p.parse_bool_expr()?;
                }
            }
            p.expect(TokenKind::CloseCurlyBrace, "right brace")?;
            Ok(())
        })
    }

    /// statement_list = statement*
    ///
    /// The list ends at "}", "case" or "default".
    fn parse_statement_list(&mut self, breakable: bool) -> Result<()> {
        self.rule(Rule::StatementList, |p| {
            while !matches!(
                p.kind(),
                Some(TokenKind::CloseCurlyBrace | TokenKind::Case | TokenKind::Default)
            ) {
                p.parse_statement(breakable)?;
            }
            Ok(())
        })
    }

    /// statement = if_stat | while_stat | do_while_stat | for_stat
    ///           | switch_stat | break_continue_stat | read_stat
    ///           | write_stat | compound_stat | return_stat
    ///           | expression_stat
    fn parse_statement(&mut self, breakable: bool) -> Result<()> {
        self.rule(Rule::Statement, |p| {
            let Some(kind) = p.kind() else {
                return Err(p.error(GrammarErrorKind::UnexpectedEnd));
            };
            match kind {
                TokenKind::If => p.parse_if(breakable),
                TokenKind::While => p.parse_while(),
                TokenKind::Do => p.parse_do_while(),
                TokenKind::For => p.parse_for(),
                TokenKind::Switch => p.parse_switch(),
                TokenKind::Break | TokenKind::Continue => p.parse_break_continue(breakable),
                TokenKind::Read => p.parse_read(),
                TokenKind::Write => p.parse_write(),
                TokenKind::OpenCurlyBrace => p.parse_compound(breakable),
                TokenKind::Return => p.parse_return(),
                TokenKind::SemiColon
                | TokenKind::Ident
                | TokenKind::Num
                | TokenKind::OpenParen
                | TokenKind::Call => p.parse_expression_stat(),
                _ => Err(p.error(GrammarErrorKind::UnrecognizedStatement(p.text()))),
            }
        })
    }

    /// if_stat = "if" "(" expression ")" statement ("else" statement)?
    fn parse_if(&mut self, breakable: bool) -> Result<()> {
        self.rule(Rule::If, |p| {
            p.expect(TokenKind::If, "if keyword")?;
            p.expect(TokenKind::OpenParen, "left parenthesis")?;
            p.parse_expression()?;
            p.expect(TokenKind::CloseParen, "right parenthesis")?;
            p.parse_statement(breakable)?;
            if p.consume(TokenKind::Else)? {
                p.parse_statement(breakable)?;
            }
            Ok(())
        })
    }

    /// while_stat = "while" "(" expression ")" statement
    fn parse_while(&mut self) -> Result<()> {
        self.rule(Rule::While, |p| {
            p.expect(TokenKind::While, "while keyword")?;
            p.expect(TokenKind::OpenParen, "left parenthesis")?;
            p.parse_expression()?;
            p.expect(TokenKind::CloseParen, "right parenthesis")?;
            p.parse_statement(true)
        })
    }

    /// do_while_stat = "do" statement "while" "(" expression ")" ";"
    fn parse_do_while(&mut self) -> Result<()> {
        self.rule(Rule::DoWhile, |p| {
            p.expect(TokenKind::Do, "do keyword")?;
            p.parse_statement(true)?;
            p.expect(TokenKind::While, "while keyword")?;
            p.expect(TokenKind::OpenParen, "left parenthesis")?;
            p.parse_expression()?;
            p.expect(TokenKind::CloseParen, "right parenthesis")?;
            p.expect(TokenKind::SemiColon, "semicolon")?;
            Ok(())
        })
    }

    /// for_stat = "for" "(" expression ";" expression ";" expression ")" statement
    fn parse_for(&mut self) -> Result<()> {
        self.rule(Rule::For, |p| {
            p.expect(TokenKind::For, "for keyword")?;
            p.expect(TokenKind::OpenParen, "left parenthesis")?;
            p.parse_expression()?;
            p.expect(TokenKind::SemiColon, "semicolon")?;
            p.parse_expression()?;
            p.expect(TokenKind::SemiColon, "semicolon")?;
            p.parse_expression()?;
            p.expect(TokenKind::CloseParen, "right parenthesis")?;
            p.parse_statement(true)
        })
    }

    /// switch_stat = "switch" "(" expression ")" "{" case_stat+ default_stat? "}"
    fn parse_switch(&mut self) -> Result<()> {
        self.rule(Rule::Switch, |p| {
            p.expect(TokenKind::Switch, "switch keyword")?;
            p.expect(TokenKind::OpenParen, "left parenthesis")?;
            p.parse_expression()?;
            p.expect(TokenKind::CloseParen, "right parenthesis")?;
            p.expect(TokenKind::OpenCurlyBrace, "left brace")?;
            if !p.is(TokenKind::Case) {
                return Err(p.error(GrammarErrorKind::Missing("case clause")));
            }
            while p.is(TokenKind::Case) {
                p.parse_case()?;
            }
            if p.is(TokenKind::Default) {
                p.parse_default()?;
            }
            p.expect(TokenKind::CloseCurlyBrace, "right brace")?;
            Ok(())
        })
    }

    /// case_stat = "case" NUM ":" statement_list
    fn parse_case(&mut self) -> Result<()> {
        self.rule(Rule::Case, |p| {
            p.expect(TokenKind::Case, "case keyword")?;
            p.expect(TokenKind::Num, "case value")?;
            p.expect(TokenKind::Colon, "colon")?;
            p.parse_statement_list(true)
        })
    }

    /// default_stat = "default" ":" statement_list
    fn parse_default(&mut self) -> Result<()> {
        self.rule(Rule::Default, |p| {
            p.expect(TokenKind::Default, "default keyword")?;
            p.expect(TokenKind::Colon, "colon")?;
            p.parse_statement_list(true)
        })
    }

    /// break_continue_stat = ("break" | "continue") ";"
    fn parse_break_continue(&mut self, breakable: bool) -> Result<()> {
        self.rule(Rule::BreakContinue, |p| {
            if !breakable {
                return Err(p.error(GrammarErrorKind::Disallowed(p.text())));
            }
            p.take()?;
            p.expect(TokenKind::SemiColon, "semicolon")?;
            Ok(())
        })
    }

    /// read_stat = "read" id_stat ";"
    fn parse_read(&mut self) -> Result<()> {
        self.rule(Rule::Read, |p| {
            p.expect(TokenKind::Read, "read keyword")?;
            p.parse_id_stat()?;
            p.expect(TokenKind::SemiColon, "semicolon")?;
            Ok(())
        })
    }

    /// write_stat = "write" expression ";"
    fn parse_write(&mut self) -> Result<()> {
        self.rule(Rule::Write, |p| {
            p.expect(TokenKind::Write, "write keyword")?;
            p.parse_expression()?;
            p.expect(TokenKind::SemiColon, "semicolon")?;
            Ok(())
        })
    }

    /// compound_stat = "{" statement_list "}"
    fn parse_compound(&mut self, breakable: bool) -> Result<()> {
        self.rule(Rule::Compound, |p| {
            p.expect(TokenKind::OpenCurlyBrace, "left brace")?;
            p.parse_statement_list(breakable)?;
            p.expect(TokenKind::CloseCurlyBrace, "right brace")?;
            Ok(())
        })
    }

    /// return_stat = "return" expression ";"
    fn parse_return(&mut self) -> Result<()> {
        self.rule(Rule::Return, |p| {
            p.expect(TokenKind::Return, "return keyword")?;
            p.parse_expression()?;
            p.expect(TokenKind::SemiColon, "semicolon")?;
            Ok(())
        })
    }

    /// expression_stat = expression? ";"
    fn parse_expression_stat(&mut self) -> Result<()> {
        self.rule(Rule::ExpressionStat, |p| {
            if !p.is(TokenKind::SemiColon) {
                p.parse_expression()?;
            }
            p.expect(TokenKind::SemiColon, "semicolon")?;
            Ok(())
        })
    }

    /// call_stat = "call" ID "(" call_arguments? ")"
    fn parse_call(&mut self) -> Result<()> {
        self.rule(Rule::Call, |p| {
            p.expect(TokenKind::Call, "call keyword")?;
            let name = p.expect_ident("function name")?;
            p.check_declared(&name)?;
            p.expect(TokenKind::OpenParen, "left parenthesis")?;
            if !p.is(TokenKind::CloseParen) {
                p.parse_call_arguments()?;
            }
            p.expect(TokenKind::CloseParen, "right parenthesis")?;
            Ok(())
        })
    }

    /// call_arguments = expression ("," expression)*
    fn parse_call_arguments(&mut self) -> Result<()> {
        self.rule(Rule::CallArguments, |p| {
            p.parse_expression()?;
            while p.consume(TokenKind::Comma)? {
                p.parse_expression()?;
            }
            Ok(())
        })
    }

    /// expression = id_stat "=" bool_expr
    ///            | bool_expr
    ///
    /// A leading identifier is consumed speculatively. Unless it turns out
    /// to be an assignment target, its tokens are handed back and its node
    /// is pruned before parsing a plain boolean expression.
    fn parse_expression(&mut self) -> Result<()> {
        self.rule(Rule::Expression, |p| {
            if p.is(TokenKind::Ident) {
                let consumed = p.parse_id_stat()?;
                if p.consume(TokenKind::Equal)? {
                    return p.parse_bool_expr();
                }
                p.tree.prune_last();
                p.unread(consumed);
            }
            p.parse_bool_expr()
        })
    }

    /// bool_expr = additive (relop additive)?
    fn parse_bool_expr(&mut self) -> Result<()> {
        self.rule(Rule::BoolExpr, |p| {
            p.parse_additive()?;
            if p.kind().is_some_and(|k| k.is_relational()) {
                p.take()?;
                p.parse_additive()?;
            }
            Ok(())
        })
    }

    /// additive = term (("+" | "-") term)*
    fn parse_additive(&mut self) -> Result<()> {
        self.rule(Rule::Additive, |p| {
            p.parse_term()?;
            while matches!(p.kind(), Some(TokenKind::Plus | TokenKind::Minus)) {
                p.take()?;
                p.parse_term()?;
            }
            Ok(())
        })
    }

    /// term = factor (("*" | "/") factor)*
    fn parse_term(&mut self) -> Result<()> {
        self.rule(Rule::Term, |p| {
            p.parse_factor()?;
            while matches!(p.kind(), Some(TokenKind::Star | TokenKind::Slash)) {
                p.take()?;
                p.parse_factor()?;
            }
            Ok(())
        })
    }

    /// factor = "(" expression ")" | NUM | call_stat | id_stat
    fn parse_factor(&mut self) -> Result<()> {
        self.rule(Rule::Factor, |p| match p.kind() {
            Some(TokenKind::OpenParen) => {
                p.take()?;
                p.parse_expression()?;
                p.expect(TokenKind::CloseParen, "right parenthesis")?;
                Ok(())
            }
            Some(TokenKind::Num) => p.take().map(|_| ()),
            Some(TokenKind::Call) => p.parse_call(),
            Some(TokenKind::Ident) => p.parse_id_stat().map(|_| ()),
            _ => Err(p.error(GrammarErrorKind::Missing("operand"))),
        })
    }

    /// id_stat = ID ("[" NUM "]")?
    ///
    /// Returns every token it consumed, so that a speculative parse can be
    /// undone.
    fn parse_id_stat(&mut self) -> Result<Vec<Token>> {
        self.rule(Rule::IdStat, |p| {
            let name = p.expect_ident("identifier")?;
            p.check_declared(&name)?;
            let mut consumed = vec![name];
            if p.is(TokenKind::OpenSquareBrace) {
                consumed.push(p.take()?);
                consumed.push(p.expect(TokenKind::Num, "array index")?);
                consumed.push(p.expect(TokenKind::CloseSquareBrace, "right bracket")?);
            }
            Ok(consumed)
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::lexer::{Lexer, StrSource};

    fn parse(src: &str) -> Result<SyntaxTree> {
        let lexed = Lexer::tokenize(StrSource::new(src));
        assert!(lexed.errors.is_empty(), "{:?}", lexed.errors);
        Parser::new(lexed.tokens).parse()
    }

    fn kind(src: &str) -> GrammarErrorKind {
        parse(src).unwrap_err().kind
    }

    fn rules(tree: &SyntaxTree) -> Vec<Rule> {
        (0..tree.len()).filter_map(|id| tree.node(id).rule()).collect()
    }

    #[test]
    fn minimal_program() {
        let tree = parse("main(){}").unwrap();
        assert_eq!(
            rules(&tree),
            vec![
                Rule::Program,
                Rule::MainDecl,
                Rule::FunctionBody,
                Rule::DeclarationList,
                Rule::StatementList
            ]
        );
    }

    #[test]
    fn full_program() {
        let src = "
            int g = 2, t[3] = {1, 2};
            function add(int a, int b) {
                int s;
                s = a + b;
                return s;
            }
            main() {
                int i, x;
                read x;
                for (i = 0; i < 3; i = i + 1) {
                    if (i == 1) continue; else write i;
                }
                do { x = x - 1; } while (x > 0);
                while (1) { break; }
                switch (x) {
                    case 0: write 0; break;
                    case 1: write 1;
                    default: write call add(g, t[2]);
                }
                ;
            }";
        parse(src).unwrap();
    }

    #[test]
    fn assignment_is_resolved_by_lookahead() {
        let tree = parse("main(){ int a[2], b; a[1] = b; b + a[0]; }").unwrap();
        let rendered = tree.to_string();
        // The speculative id_stat of `b + a[0]` is pruned and parsed again
        // as an operand, so both expressions end up with one id_stat per
        // identifier.
        assert_eq!(rendered.matches("▼ <identifier>").count(), 4);
        assert_eq!(rendered.matches("▷ =").count(), 1);
    }

    #[test]
    fn undeclared_identifier() {
        assert_eq!(
            parse("main(){ x = 1; }").unwrap_err(),
            GrammarError {
                line: 1,
                rule: Rule::IdStat,
                kind: GrammarErrorKind::Undeclared("x".to_string()),
            }
        );
    }

    #[test]
    fn duplicate_in_same_block() {
        let err = parse("main(){\nint x;\nint x;\n}").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.kind, GrammarErrorKind::Redeclared("x".to_string()));
    }

    #[test]
    fn shadowing_a_global() {
        parse("int x; function f(int x) { return x; } main(){ int x; x = 1; }").unwrap();
    }

    #[test]
    fn local_cannot_shadow_parameter() {
        assert_eq!(
            kind("function f(int a) { int a; return a; } main(){}"),
            GrammarErrorKind::Redeclared("a".to_string())
        );
    }

    #[test]
    fn recursive_call() {
        parse("function f(int n) { return call f(n - 1); } main(){ write call f(1); }").unwrap();
    }

    #[test]
    fn locals_go_out_of_scope() {
        assert_eq!(
            kind("function f() { int y; return 0; } main(){ write y; }"),
            GrammarErrorKind::Undeclared("y".to_string())
        );
    }

    #[test]
    fn break_outside_loop() {
        assert_eq!(
            kind("main(){ break; }"),
            GrammarErrorKind::Disallowed("break".to_string())
        );
        parse("main(){ while (1) if (1) { break; } else continue; }").unwrap();
    }

    #[test]
    fn missing_tokens() {
        let err = parse("main(){ write 1 }").unwrap_err();
        assert_eq!(err.rule, Rule::Write);
        assert_eq!(err.kind, GrammarErrorKind::Missing("semicolon"));

        assert_matches!(kind("main(){ if 1) ; }"), GrammarErrorKind::Missing(_));
        assert_matches!(kind("main(){ write ; }"), GrammarErrorKind::Missing("operand"));
    }

    #[test]
    fn switch_needs_a_case() {
        assert_eq!(
            kind("main(){ switch (1) { default: ; } }"),
            GrammarErrorKind::Missing("case clause")
        );
    }

    #[test]
    fn structural_errors() {
        assert_eq!(kind("int x;"), GrammarErrorKind::MissingMain);
        assert_eq!(kind("main(){ write 1;"), GrammarErrorKind::UnexpectedEnd);
        assert_eq!(kind("main(){ } }"), GrammarErrorKind::UnbalancedBrace);
        assert_eq!(
            kind("main(){ } int"),
            GrammarErrorKind::TrailingInput("int".to_string())
        );
        assert_eq!(
            kind("main(){ else; }"),
            GrammarErrorKind::UnrecognizedStatement("else".to_string())
        );
    }
}
