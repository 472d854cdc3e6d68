use std::collections::HashSet;

use log::{debug, warn};

use crate::{
    analyzer::{Address, Addressing, Binding, Declare, ScopeChain},
    lexer::{Token, TokenKind},
    parser::{Children, NodeId, Rule, SyntaxTree},
};

use super::{
    Instruction, Label, LabelAllocator, Line, Opcode, Program, SemanticError, SemanticErrorKind,
    Warning, WarningKind,
};

type Result<T> = std::result::Result<T, SemanticError>;

/// Name of the hidden return slot. It is a keyword, so no identifier can
/// collide with it.
const RETURN_SLOT: &str = "return";

#[derive(Debug)]
pub struct Generated {
    pub program: Program,
    pub warnings: Vec<Warning>,
}

pub struct Codegen<'t> {
    tree: &'t SyntaxTree,
    scope: ScopeChain,
    labels: LabelAllocator,
    code: Vec<Line>,
    warnings: Vec<Warning>,
    break_to: Option<Label>,
    continue_to: Option<Label>,
    exit: Option<Label>,
}

impl<'t> Codegen<'t> {
    fn new(tree: &'t SyntaxTree) -> Self {
        Self {
            tree,
            scope: ScopeChain::new(),
            labels: LabelAllocator::new(),
            code: vec![],
            warnings: vec![],
            break_to: None,
            continue_to: None,
            exit: None,
        }
    }

    pub fn generate(tree: &'t SyntaxTree) -> Result<Generated> {
        let mut codegen = Codegen::new(tree);
        codegen.gen_program(tree.root())?;
        debug!(
            "generated {} lines using {} labels",
            codegen.code.len(),
            codegen.labels.allocated()
        );

        Ok(Generated {
            program: Program {
                lines: codegen.code,
            },
            warnings: codegen.warnings,
        })
    }

    fn emit(&mut self, instruction: Instruction) {
        self.code.push(Line::Instr(instruction));
    }

    fn emit_op(&mut self, opcode: Opcode) {
        self.emit(Instruction::new(opcode));
    }

    fn emit_label(&mut self, label: Label) {
        self.code.push(Line::Label(label));
    }

    fn new_label(&mut self) -> Label {
        self.labels.next()
    }

    fn warn(&mut self, line: usize, kind: WarningKind) {
        let warning = Warning { line, kind };
        warn!("{warning}");
        self.warnings.push(warning);
    }

    fn error(&self, id: NodeId, kind: SemanticErrorKind) -> SemanticError {
        let node = self.tree.node(id);
        SemanticError {
            line: node.line,
            rule: node.rule().unwrap_or(Rule::Program),
            kind,
        }
    }

    fn children(&self, id: NodeId) -> Children<'t> {
        self.tree.children(id)
    }

    fn expect_rule(&self, children: &mut Children<'t>, parent: NodeId, rule: Rule) -> Result<NodeId> {
        children
            .next()
            .filter(|&c| self.tree.node(c).rule() == Some(rule))
            .ok_or_else(|| self.error(parent, SemanticErrorKind::Malformed(rule)))
    }

    fn expect_token(&self, children: &mut Children<'t>, parent: NodeId) -> Result<&'t Token> {
        let tree = self.tree;
        children
            .next()
            .and_then(|c| tree.node(c).token())
            .ok_or_else(|| self.error(parent, SemanticErrorKind::Malformed(Rule::IdStat)))
    }

    fn number(&self, token: &Token, parent: NodeId) -> Result<i64> {
        token
            .text
            .parse()
            .map_err(|_| self.error(parent, SemanticErrorKind::Malformed(Rule::Factor)))
    }

    fn lookup(&self, name: &Token, id: NodeId) -> Result<Binding> {
        self.scope
            .lookup(&name.text)
            .copied()
            .ok_or_else(|| self.error(id, SemanticErrorKind::Undeclared(name.text.clone())))
    }

    fn declare(&mut self, name: &str, declare: Declare, id: NodeId) -> Result<Binding> {
        self.scope
            .put(name, declare)
            .map_err(|_| self.error(id, SemanticErrorKind::Malformed(Rule::Declaration)))
    }

    fn leave_scope(&mut self, id: NodeId) -> Result<()> {
        self.scope
            .pop()
            .map_err(|_| self.error(id, SemanticErrorKind::Malformed(Rule::FunctionBody)))
    }

    /// Runs `f` with the given break and continue targets, restoring the
    /// enclosing ones afterwards.
    fn with_targets<T>(
        &mut self,
        break_to: Option<Label>,
        continue_to: Option<Label>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved = (self.break_to, self.continue_to);
        self.break_to = break_to;
        self.continue_to = continue_to;
        let out = f(self);
        (self.break_to, self.continue_to) = saved;
        out
    }

    /// Generates a function body into a buffer of its own, then appends the
    /// entry label, the `ALLOCATE` sized after the body and the body itself.
    fn gen_frame(
        &mut self,
        entry: Label,
        min_size: usize,
        body: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        let outer = std::mem::take(&mut self.code);
        let result = body(self);
        let code = std::mem::replace(&mut self.code, outer);
        result?;

        let size = self.scope.frame_size().max(min_size);
        self.emit_label(entry);
        self.emit(Instruction::allocate(size));
        self.code.extend(code);
        Ok(())
    }

    fn gen_program(&mut self, id: NodeId) -> Result<()> {
        let mut children = self.children(id);
        if children.peek_rule() == Some(Rule::DeclarationList) {
            let decls = self.expect_rule(&mut children, id, Rule::DeclarationList)?;
            self.gen_declaration_list(decls)?;
        }

        let main = self.new_label();
        self.emit(Instruction::jump(Opcode::Br, main));

        while children.peek_rule() == Some(Rule::FunctionDecl) {
            let function = self.expect_rule(&mut children, id, Rule::FunctionDecl)?;
            self.gen_function_decl(function)?;
        }
        let main_decl = self.expect_rule(&mut children, id, Rule::MainDecl)?;
        self.gen_main_decl(main_decl, main)
    }

    fn param_names(&self, id: NodeId) -> Result<Vec<&'t Token>> {
        let mut names = vec![];
        for param in self.children(id) {
            if self.tree.node(param).rule() != Some(Rule::Param) {
                continue;
            }
            let mut children = self.children(param);
            children.next();
            names.push(self.expect_token(&mut children, param)?);
        }
        Ok(names)
    }

    /// Frame layout: the return slot at `:0`, then the parameters in order,
    /// then the locals. Arguments arrive on the operand stack, last one on
    /// top, and are stored into their slots in reverse.
    fn gen_function_decl(&mut self, id: NodeId) -> Result<()> {
        let mut children = self.children(id);
        children.next();
        let name = self.expect_token(&mut children, id)?;
        children.next();
        let param_list = self.expect_rule(&mut children, id, Rule::ParamList)?;
        let params = self.param_names(param_list)?;
        children.next();
        let body = self.expect_rule(&mut children, id, Rule::FunctionBody)?;

        let entry = self.new_label();
        self.declare(
            &name.text,
            Declare::Function {
                entry: Some(entry),
                arity: params.len(),
            },
            id,
        )?;

        self.scope.push(Addressing::Relative);
        let ret = self.declare(RETURN_SLOT, Declare::ReturnSlot, id)?;
        let mut slots = vec![];
        for param in &params {
            if let Some(address) = self.declare(&param.text, Declare::Int, id)?.address() {
                slots.push(address);
            }
        }
        let exit = self.new_label();
        let saved_exit = self.exit.replace(exit);

        let result = self.gen_frame(entry, 1, |g| {
            for &slot in slots.iter().rev() {
                g.emit(Instruction::sto(slot));
                g.emit_op(Opcode::Pop);
            }
            g.gen_function_body(body)?;
            g.emit_label(exit);
            if let Some(ret) = ret.address() {
                g.emit(Instruction::ret(ret));
            }
            Ok(())
        });

        self.exit = saved_exit;
        self.leave_scope(id)?;
        result
    }

    /// `main` runs in the first activation record, based at 0, so its frame
    /// continues the absolute layout of the globals.
    fn gen_main_decl(&mut self, id: NodeId, entry: Label) -> Result<()> {
        let mut children = self.children(id);
        let body = children
            .find(|&c| self.tree.node(c).rule() == Some(Rule::FunctionBody))
            .ok_or_else(|| self.error(id, SemanticErrorKind::Malformed(Rule::FunctionBody)))?;

        self.scope.push(Addressing::Absolute);
        let exit = self.new_label();
        let saved_exit = self.exit.replace(exit);

        let result = self.gen_frame(entry, 1, |g| {
            g.gen_function_body(body)?;
            g.emit_label(exit);
            g.emit_op(Opcode::Stop);
            Ok(())
        });

        self.exit = saved_exit;
        self.leave_scope(id)?;
        result
    }

    fn gen_function_body(&mut self, id: NodeId) -> Result<()> {
        let mut children = self.children(id);
        children.next();
        let decls = self.expect_rule(&mut children, id, Rule::DeclarationList)?;
        let stmts = self.expect_rule(&mut children, id, Rule::StatementList)?;

        self.gen_declaration_list(decls)?;
        if self.children(stmts).next().is_none() {
            self.warn(self.tree.node(id).line, WarningKind::EmptyBody);
        }
        self.gen_statement_list(stmts)
    }

    fn gen_declaration_list(&mut self, id: NodeId) -> Result<()> {
        for decl in self.children(id) {
            for simple in self.children(decl) {
                if self.tree.node(simple).rule() == Some(Rule::SimpleDeclaration) {
                    self.gen_simple_declaration(simple)?;
                }
            }
        }
        Ok(())
    }

    /// Initializers are generated before the name is bound, so they see the
    /// enclosing bindings.
    fn gen_simple_declaration(&mut self, id: NodeId) -> Result<()> {
        let mut children = self.children(id);
        let name = self.expect_token(&mut children, id)?;

        match children.peek_kind() {
            Some(TokenKind::Equal) => {
                children.next();
                let expr = self.expect_rule(&mut children, id, Rule::BoolExpr)?;
                self.gen_bool_expr(expr)?;
                if let Some(address) = self.declare(&name.text, Declare::Int, id)?.address() {
                    self.emit(Instruction::sto(address));
                    self.emit_op(Opcode::Pop);
                }
            }
            Some(TokenKind::OpenSquareBrace) => {
                children.next();
                let size_token = self.expect_token(&mut children, id)?;
                let size = usize::try_from(self.number(size_token, id)?)
                    .map_err(|_| self.error(id, SemanticErrorKind::Malformed(Rule::SimpleDeclaration)))?;
                children.next();

                let values = if children.peek_kind() == Some(TokenKind::Equal) {
                    children.next();
                    let init = self.expect_rule(&mut children, id, Rule::ArrayInit)?;
                    Some(self.gen_array_init(init)?)
                } else {
                    None
                };

                let binding = self.declare(&name.text, Declare::Array(size), id)?;
                if let (Some(values), Some(address)) = (values, binding.address()) {
                    self.store_array_init(id, name, address, size, values);
                }
            }
            _ => {
                self.declare(&name.text, Declare::Int, id)?;
            }
        }
        Ok(())
    }

    /// Generates every initializer value into its own buffer.
    fn gen_array_init(&mut self, id: NodeId) -> Result<Vec<Vec<Line>>> {
        let mut values = vec![];
        for child in self.children(id) {
            if self.tree.node(child).rule() != Some(Rule::BoolExpr) {
                continue;
            }
            let outer = std::mem::take(&mut self.code);
            let result = self.gen_bool_expr(child);
            values.push(std::mem::replace(&mut self.code, outer));
            result?;
        }
        Ok(values)
    }

    fn store_array_init(
        &mut self,
        id: NodeId,
        name: &Token,
        address: Address,
        size: usize,
        values: Vec<Vec<Line>>,
    ) {
        let found = values.len();
        for (i, value) in values.into_iter().enumerate() {
            self.code.extend(value);
            if i < size {
                self.emit(Instruction::sto(address.offset(i)));
            }
            self.emit_op(Opcode::Pop);
        }

        if found > size {
            self.warn(
                self.tree.node(id).line,
                WarningKind::SurplusInitializers {
                    name: name.text.clone(),
                    size,
                    found,
                },
            );
        }
        for i in found..size {
            self.emit(Instruction::loadi(0));
            self.emit(Instruction::sto(address.offset(i)));
            self.emit_op(Opcode::Pop);
        }
    }

    fn gen_statement_list(&mut self, id: NodeId) -> Result<()> {
        for stmt in self.children(id) {
            self.gen_statement(stmt)?;
        }
        Ok(())
    }

    fn gen_statement(&mut self, id: NodeId) -> Result<()> {
        let stmt = self
            .children(id)
            .next()
            .ok_or_else(|| self.error(id, SemanticErrorKind::Malformed(Rule::Statement)))?;

        match self.tree.node(stmt).rule() {
            Some(Rule::If) => self.gen_if(stmt),
            Some(Rule::While) => self.gen_while(stmt),
            Some(Rule::DoWhile) => self.gen_do_while(stmt),
            Some(Rule::For) => self.gen_for(stmt),
            Some(Rule::Switch) => self.gen_switch(stmt),
            Some(Rule::BreakContinue) => self.gen_break_continue(stmt),
            Some(Rule::Read) => self.gen_read(stmt),
            Some(Rule::Write) => self.gen_write(stmt),
            Some(Rule::Compound) => self.gen_compound(stmt),
            Some(Rule::ExpressionStat) => self.gen_expression_stat(stmt),
            Some(Rule::Return) => self.gen_return(stmt),
            _ => Err(self.error(id, SemanticErrorKind::Malformed(Rule::Statement))),
        }
    }

    /// Every rule node among the children of `id`, in order.
    fn rule_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .filter(|&c| !self.tree.node(c).is_leaf())
            .collect()
    }

    fn gen_if(&mut self, id: NodeId) -> Result<()> {
        let parts = self.rule_children(id);
        let [cond, then, rest @ ..] = parts.as_slice() else {
            return Err(self.error(id, SemanticErrorKind::Malformed(Rule::If)));
        };

        let else_label = self.new_label();
        let end = self.new_label();

        self.gen_expression(*cond)?;
        self.emit(Instruction::jump(Opcode::Brf, else_label));
        self.gen_statement(*then)?;
        self.emit(Instruction::jump(Opcode::Br, end));
        self.emit_label(else_label);
        if let Some(otherwise) = rest.first() {
            self.gen_statement(*otherwise)?;
        }
        self.emit_label(end);
        Ok(())
    }

    fn gen_while(&mut self, id: NodeId) -> Result<()> {
        let parts = self.rule_children(id);
        let [cond, body] = parts.as_slice() else {
            return Err(self.error(id, SemanticErrorKind::Malformed(Rule::While)));
        };

        let start = self.new_label();
        let end = self.new_label();

        self.emit_label(start);
        self.gen_expression(*cond)?;
        self.emit(Instruction::jump(Opcode::Brf, end));
        self.with_targets(Some(end), Some(start), |g| g.gen_statement(*body))?;
        self.emit(Instruction::jump(Opcode::Br, start));
        self.emit_label(end);
        Ok(())
    }

    fn gen_do_while(&mut self, id: NodeId) -> Result<()> {
        let parts = self.rule_children(id);
        let [body, cond] = parts.as_slice() else {
            return Err(self.error(id, SemanticErrorKind::Malformed(Rule::DoWhile)));
        };

        let start = self.new_label();
        let test = self.new_label();
        let end = self.new_label();

        self.emit_label(start);
        self.with_targets(Some(end), Some(test), |g| g.gen_statement(*body))?;
        self.emit_label(test);
        self.gen_expression(*cond)?;
        self.emit(Instruction::jump(Opcode::Brf, end));
        self.emit(Instruction::jump(Opcode::Br, start));
        self.emit_label(end);
        Ok(())
    }

    /// The step is laid out before the body so that the first iteration
    /// reaches the body straight from the condition.
    fn gen_for(&mut self, id: NodeId) -> Result<()> {
        let parts = self.rule_children(id);
        let [init, cond, step, body] = parts.as_slice() else {
            return Err(self.error(id, SemanticErrorKind::Malformed(Rule::For)));
        };

        let test = self.new_label();
        let body_label = self.new_label();
        let step_label = self.new_label();
        let end = self.new_label();

        self.gen_expression(*init)?;
        self.emit_op(Opcode::Pop);

        self.emit_label(test);
        self.gen_expression(*cond)?;
        self.emit(Instruction::jump(Opcode::Brf, end));
        self.emit(Instruction::jump(Opcode::Br, body_label));

        self.emit_label(step_label);
        self.gen_expression(*step)?;
        self.emit_op(Opcode::Pop);
        self.emit(Instruction::jump(Opcode::Br, test));

        self.emit_label(body_label);
        self.with_targets(Some(end), Some(step_label), |g| g.gen_statement(*body))?;
        self.emit(Instruction::jump(Opcode::Br, step_label));
        self.emit_label(end);
        Ok(())
    }

    /// The selector is evaluated once into a hidden slot. Each case tests it
    /// and falls through to the next case's body; a failed test moves on to
    /// the next test, and past the last one to the default clause.
    fn gen_switch(&mut self, id: NodeId) -> Result<()> {
        let parts = self.rule_children(id);
        let [selector, clauses @ ..] = parts.as_slice() else {
            return Err(self.error(id, SemanticErrorKind::Malformed(Rule::Switch)));
        };

        self.gen_expression(*selector)?;
        let slot = self.scope.reserve(1);
        self.emit(Instruction::sto(slot));
        self.emit_op(Opcode::Pop);

        let end = self.new_label();
        let continue_to = self.continue_to;
        self.with_targets(Some(end), continue_to, |g| {
            let mut seen = HashSet::new();
            let mut next_test: Option<Label> = None;
            let mut next_body: Option<Label> = None;

            for &clause in clauses {
                let mut children = g.children(clause);
                let (value, stmts) = match g.tree.node(clause).rule() {
                    Some(Rule::Case) => {
                        children.next();
                        let value = g.expect_token(&mut children, clause)?;
                        let value = g.number(value, clause)?;
                        children.next();
                        (Some(value), g.expect_rule(&mut children, clause, Rule::StatementList)?)
                    }
                    Some(Rule::Default) => {
                        children.next();
                        children.next();
                        (None, g.expect_rule(&mut children, clause, Rule::StatementList)?)
                    }
                    _ => return Err(g.error(clause, SemanticErrorKind::Malformed(Rule::Case))),
                };

                let Some(value) = value else {
                    next_test.into_iter().chain(next_body).for_each(|l| g.emit_label(l));
                    (next_test, next_body) = (None, None);
                    g.gen_statement_list(stmts)?;
                    continue;
                };

                if !seen.insert(value) {
                    return Err(g.error(clause, SemanticErrorKind::DuplicateCase(value)));
                }
                let test = g.new_label();
                let body = g.new_label();

                if let Some(label) = next_test {
                    g.emit_label(label);
                }
                g.emit(Instruction::load(slot));
                g.emit(Instruction::loadi(value));
                g.emit_op(Opcode::Eq);
                g.emit(Instruction::jump(Opcode::Brf, test));
                if let Some(label) = next_body {
                    g.emit_label(label);
                }
                g.gen_statement_list(stmts)?;
                g.emit(Instruction::jump(Opcode::Br, body));

                next_test = Some(test);
                next_body = Some(body);
            }

            next_test.into_iter().chain(next_body).for_each(|l| g.emit_label(l));
            Ok(())
        })?;
        self.emit_label(end);
        Ok(())
    }

    fn gen_break_continue(&mut self, id: NodeId) -> Result<()> {
        let keyword = self
            .children(id)
            .peek_kind()
            .ok_or_else(|| self.error(id, SemanticErrorKind::Malformed(Rule::BreakContinue)))?;

        let target = match keyword {
            TokenKind::Continue => self
                .continue_to
                .ok_or_else(|| self.error(id, SemanticErrorKind::ContinueOutsideLoop))?,
            _ => self
                .break_to
                .ok_or_else(|| self.error(id, SemanticErrorKind::Malformed(Rule::BreakContinue)))?,
        };
        self.emit(Instruction::jump(Opcode::Br, target));
        Ok(())
    }

    fn gen_read(&mut self, id: NodeId) -> Result<()> {
        let target = self.child_rule(id, Rule::IdStat)?;
        let address = self.gen_address(target)?;
        self.emit_op(Opcode::In);
        self.emit(Instruction::sto(address));
        self.emit_op(Opcode::Pop);
        Ok(())
    }

    fn gen_write(&mut self, id: NodeId) -> Result<()> {
        let expr = self.child_rule(id, Rule::Expression)?;
        self.gen_expression(expr)?;
        self.emit_op(Opcode::Out);
        Ok(())
    }

    fn gen_compound(&mut self, id: NodeId) -> Result<()> {
        let stmts = self.child_rule(id, Rule::StatementList)?;
        self.gen_statement_list(stmts)
    }

    fn gen_expression_stat(&mut self, id: NodeId) -> Result<()> {
        if let Some(expr) = self.rule_children(id).first() {
            self.gen_expression(*expr)?;
            self.emit_op(Opcode::Pop);
        }
        Ok(())
    }

    /// Stores the value in the return slot and leaves through the exit
    /// label. `main` has no return slot and just drops the value.
    fn gen_return(&mut self, id: NodeId) -> Result<()> {
        let expr = self.child_rule(id, Rule::Expression)?;
        let exit = self
            .exit
            .ok_or_else(|| self.error(id, SemanticErrorKind::Malformed(Rule::Return)))?;

        self.gen_expression(expr)?;
        if let Some(Binding::ReturnSlot(slot)) = self.scope.lookup(RETURN_SLOT).copied() {
            self.emit(Instruction::sto(slot));
        }
        self.emit_op(Opcode::Pop);
        self.emit(Instruction::jump(Opcode::Br, exit));
        Ok(())
    }

    fn child_rule(&self, id: NodeId, rule: Rule) -> Result<NodeId> {
        self.children(id)
            .find(|&c| self.tree.node(c).rule() == Some(rule))
            .ok_or_else(|| self.error(id, SemanticErrorKind::Malformed(rule)))
    }

    /// An assignment leaves the assigned value on the stack.
    fn gen_expression(&mut self, id: NodeId) -> Result<()> {
        let mut children = self.children(id);
        match children.peek_rule() {
            Some(Rule::IdStat) => {
                let target = self.expect_rule(&mut children, id, Rule::IdStat)?;
                let address = self.gen_address(target)?;
                children.next();
                let value = self.expect_rule(&mut children, id, Rule::BoolExpr)?;
                self.gen_bool_expr(value)?;
                self.emit(Instruction::sto(address));
                Ok(())
            }
            _ => {
                let value = self.expect_rule(&mut children, id, Rule::BoolExpr)?;
                self.gen_bool_expr(value)
            }
        }
    }

    /// Generates `operand (op operand)*`, applying each operator as soon as
    /// its right operand is on the stack.
    fn gen_operator_chain(
        &mut self,
        id: NodeId,
        operand: Rule,
        gen: fn(&mut Self, NodeId) -> Result<()>,
    ) -> Result<()> {
        let mut children = self.children(id);
        let first = self.expect_rule(&mut children, id, operand)?;
        gen(self, first)?;

        while let Some(op) = children.peek_kind() {
            children.next();
            let opcode = Opcode::for_operator(op)
                .ok_or_else(|| self.error(id, SemanticErrorKind::Malformed(operand)))?;
            let next = self.expect_rule(&mut children, id, operand)?;
            gen(self, next)?;
            self.emit_op(opcode);
        }
        Ok(())
    }

    fn gen_bool_expr(&mut self, id: NodeId) -> Result<()> {
        self.gen_operator_chain(id, Rule::Additive, Self::gen_additive)
    }

    fn gen_additive(&mut self, id: NodeId) -> Result<()> {
        self.gen_operator_chain(id, Rule::Term, Self::gen_term)
    }

    fn gen_term(&mut self, id: NodeId) -> Result<()> {
        self.gen_operator_chain(id, Rule::Factor, Self::gen_factor)
    }

    fn gen_factor(&mut self, id: NodeId) -> Result<()> {
        let mut children = self.children(id);
        let first = children
            .next()
            .ok_or_else(|| self.error(id, SemanticErrorKind::Malformed(Rule::Factor)))?;
        let tree = self.tree;
        let node = tree.node(first);

        match (node.rule(), node.token()) {
            (Some(Rule::Call), _) => self.gen_call(first),
            (Some(Rule::IdStat), _) => {
                let address = self.gen_address(first)?;
                self.emit(Instruction::load(address));
                Ok(())
            }
            (_, Some(t)) if t.kind == TokenKind::Num => {
                let value = self.number(t, id)?;
                self.emit(Instruction::loadi(value));
                Ok(())
            }
            (_, Some(t)) if t.kind == TokenKind::OpenParen => {
                let expr = self.expect_rule(&mut children, id, Rule::Expression)?;
                self.gen_expression(expr)
            }
            _ => Err(self.error(id, SemanticErrorKind::Malformed(Rule::Factor))),
        }
    }

    /// Arguments are pushed in order, then the callee is entered.
    fn gen_call(&mut self, id: NodeId) -> Result<()> {
        let mut children = self.children(id);
        children.next();
        let name = self.expect_token(&mut children, id)?;

        let Binding::Function { entry, arity } = self.lookup(name, id)? else {
            return Err(self.error(id, SemanticErrorKind::NotCallable(name.text.clone())));
        };
        let entry = entry.ok_or_else(|| self.error(id, SemanticErrorKind::Malformed(Rule::Call)))?;

        let args = match children.find(|&c| self.tree.node(c).rule() == Some(Rule::CallArguments)) {
            Some(list) => self.rule_children(list),
            None => vec![],
        };
        if args.len() != arity {
            return Err(self.error(
                id,
                SemanticErrorKind::ArgumentsMismatch {
                    name: name.text.clone(),
                    expected: arity,
                    found: args.len(),
                },
            ));
        }

        for arg in args {
            self.gen_expression(arg)?;
        }
        self.emit(Instruction::jump(Opcode::Jsr, entry));
        Ok(())
    }

    /// Resolves an id_stat to the address it names. Array indices must be
    /// literals within the declared bounds.
    fn gen_address(&self, id: NodeId) -> Result<Address> {
        let mut children = self.children(id);
        let name = self.expect_token(&mut children, id)?;
        let index = if children.peek_kind() == Some(TokenKind::OpenSquareBrace) {
            children.next();
            let index = self.expect_token(&mut children, id)?;
            Some(self.number(index, id)?)
        } else {
            None
        };

        let text = || name.text.clone();
        match (self.lookup(name, id)?, index) {
            (Binding::Int(address) | Binding::ReturnSlot(address), None) => Ok(address),
            (Binding::Int(_) | Binding::ReturnSlot(_), Some(_)) => {
                Err(self.error(id, SemanticErrorKind::NotAnArray(text())))
            }
            (Binding::Array { address, size }, Some(index)) => {
                match usize::try_from(index) {
                    Ok(i) if i < size => Ok(address.offset(i)),
                    _ => Err(self.error(
                        id,
                        SemanticErrorKind::IndexOutOfBounds {
                            name: text(),
                            max: size as i64 - 1,
                            index,
                        },
                    )),
                }
            }
            (Binding::Array { .. }, None) => {
                Err(self.error(id, SemanticErrorKind::MissingIndex(text())))
            }
            (Binding::Function { .. }, _) => {
                Err(self.error(id, SemanticErrorKind::NotAVariable(text())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{
        lexer::{Lexer, StrSource},
        parser::Parser,
    };

    fn generate(src: &str) -> Result<Generated> {
        let lexed = Lexer::tokenize(StrSource::new(src));
        let tree = Parser::new(lexed.tokens).parse().unwrap();
        Codegen::generate(&tree)
    }

    fn listing(src: &str) -> String {
        generate(src).unwrap().program.to_string()
    }

    fn kind(src: &str) -> SemanticErrorKind {
        generate(src).unwrap_err().kind
    }

    #[test]
    fn arithmetic() {
        assert_eq!(
            listing("main(){ write 1+2*3; }"),
            "BR LABEL1\nLABEL1:\nALLOCATE 1\nLOADI 1\nLOADI 2\nLOADI 3\nMULT\nADD\nOUT\nLABEL2:\nSTOP\n"
        );
    }

    #[test]
    fn globals_run_before_main() {
        assert_eq!(
            listing("int g = 4, h; main(){ int x; x = g; }"),
            "LOADI 4\nSTO 0\nPOP\nBR LABEL1\nLABEL1:\nALLOCATE 3\nLOAD 0\nSTO 2\nPOP\nLABEL2:\nSTOP\n"
        );
    }

    #[test]
    fn function_frame_layout() {
        let src = "function f(int a, int b) { int c; c = a - b; return c; } main(){ write call f(5, 2); }";
        let expected = "\
BR LABEL1
LABEL2:
ALLOCATE 4
STO :2
POP
STO :1
POP
LOAD :1
LOAD :2
SUB
STO :3
POP
LOAD :3
STO :0
POP
BR LABEL3
LABEL3:
RET :0
LABEL1:
ALLOCATE 1
LOADI 5
LOADI 2
JSR LABEL2
OUT
LABEL4:
STOP
";
        assert_eq!(listing(src), expected);
    }

    #[test]
    fn labels_are_deterministic() {
        let src = "main(){ int i; for (i = 0; i < 3; i = i + 1) { if (i == 1) continue; write i; } }";
        assert_eq!(listing(src), listing(src));
    }

    #[test]
    fn for_loop_shape() {
        let text = listing("main(){ int i; for (i = 0; i < 2; i = i + 1) write i; }");
        let expected = "\
LOADI 0
STO 0
POP
LABEL3:
LOAD 0
LOADI 2
LES
BRF LABEL6
BR LABEL4
LABEL5:
LOAD 0
LOADI 1
ADD
STO 0
POP
BR LABEL3
LABEL4:
LOAD 0
OUT
BR LABEL5
LABEL6:
";
        assert!(text.contains(expected), "{text}");
    }

    #[test]
    fn array_initializer() {
        let generated = generate("main(){ int a[3] = {7}; int b[1] = {1, 2}; write b[0]; }").unwrap();
        let text = generated.program.to_string();
        assert!(text.contains("LOADI 7\nSTO 0\nPOP\nLOADI 0\nSTO 1\nPOP\nLOADI 0\nSTO 2\nPOP\n"));
        assert!(text.contains("LOADI 1\nSTO 3\nPOP\nLOADI 2\nPOP\n"));
        assert_matches!(
            generated.warnings.as_slice(),
            [Warning {
                kind: WarningKind::SurplusInitializers { size: 1, found: 2, .. },
                ..
            }]
        );
    }

    #[test]
    fn empty_body_warns() {
        let generated = generate("main(){}").unwrap();
        assert_eq!(generated.warnings.len(), 1);
        assert_eq!(generated.warnings[0].kind, WarningKind::EmptyBody);
    }

    #[test]
    fn index_out_of_bounds() {
        assert_eq!(
            kind("main(){ int a[3]; a[3] = 1; }"),
            SemanticErrorKind::IndexOutOfBounds {
                name: "a".to_string(),
                max: 2,
                index: 3,
            }
        );
        assert_eq!(
            kind("main(){ int x; write x[0]; }"),
            SemanticErrorKind::NotAnArray("x".to_string())
        );
        assert_eq!(
            kind("main(){ int a[2]; write a; }"),
            SemanticErrorKind::MissingIndex("a".to_string())
        );
    }

    #[test]
    fn call_checks() {
        assert_eq!(
            kind("int x; main(){ write call x(); }"),
            SemanticErrorKind::NotCallable("x".to_string())
        );
        assert_eq!(
            kind("function f(int a) { return a; } main(){ write call f(); }"),
            SemanticErrorKind::ArgumentsMismatch {
                name: "f".to_string(),
                expected: 1,
                found: 0,
            }
        );
        assert_matches!(
            kind("function f() { return 1; } main(){ write call f(1, 2); }"),
            SemanticErrorKind::ArgumentsMismatch { expected: 0, found: 2, .. }
        );
        assert_eq!(
            kind("function f() { return 1; } main(){ f = 2; }"),
            SemanticErrorKind::NotAVariable("f".to_string())
        );
    }

    #[test]
    fn duplicate_case() {
        let err = generate("main(){ switch (1) { case 1: ; case 2: ; case 1: ; } }").unwrap_err();
        assert_eq!(err.rule, Rule::Case);
        assert_eq!(err.kind, SemanticErrorKind::DuplicateCase(1));
    }

    #[test]
    fn continue_in_switch_outside_loop() {
        assert_eq!(
            kind("main(){ switch (1) { case 1: continue; } }"),
            SemanticErrorKind::ContinueOutsideLoop
        );
    }

    #[test]
    fn switch_reserves_selector_slot() {
        let text = listing("main(){ int x; switch (x) { case 1: write 1; default: write 0; } }");
        assert!(text.starts_with("BR LABEL1\nLABEL1:\nALLOCATE 2\nLOAD 0\nSTO 1\nPOP\n"), "{text}");
        assert!(text.contains("LOAD 1\nLOADI 1\nEQ\nBRF LABEL4\n"), "{text}");
        assert!(text.contains("BR LABEL5\nLABEL4:\nLABEL5:\nLOADI 0\nOUT\nLABEL3:\n"), "{text}");
    }
}
