use std::fmt;

use crate::lexer::{Token, TokenKind};

/// Grammar rules, one per non-terminal node of the syntax tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rule {
    Program,
    FunctionDecl,
    ParamList,
    Param,
    MainDecl,
    FunctionBody,
    DeclarationList,
    Declaration,
    SimpleDeclaration,
    ArrayInit,
    StatementList,
    Statement,
    If,
    While,
    DoWhile,
    For,
    Switch,
    Case,
    Default,
    BreakContinue,
    Read,
    Write,
    Compound,
    ExpressionStat,
    Return,
    Call,
    CallArguments,
    Expression,
    BoolExpr,
    Additive,
    Term,
    Factor,
    IdStat,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::Program => "<program>",
            Rule::FunctionDecl => "<function declaration>",
            Rule::ParamList => "<parameter list>",
            Rule::Param => "<parameter>",
            Rule::MainDecl => "<main declaration>",
            Rule::FunctionBody => "<function body>",
            Rule::DeclarationList => "<declaration list>",
            Rule::Declaration => "<declaration>",
            Rule::SimpleDeclaration => "<simple declaration>",
            Rule::ArrayInit => "<array initializer>",
            Rule::StatementList => "<statement list>",
            Rule::Statement => "<statement>",
            Rule::If => "<if statement>",
            Rule::While => "<while statement>",
            Rule::DoWhile => "<do-while statement>",
            Rule::For => "<for statement>",
            Rule::Switch => "<switch statement>",
            Rule::Case => "<case clause>",
            Rule::Default => "<default clause>",
            Rule::BreakContinue => "<break/continue statement>",
            Rule::Read => "<read statement>",
            Rule::Write => "<write statement>",
            Rule::Compound => "<compound statement>",
            Rule::ExpressionStat => "<expression statement>",
            Rule::Return => "<return statement>",
            Rule::Call => "<call>",
            Rule::CallArguments => "<call arguments>",
            Rule::Expression => "<expression>",
            Rule::BoolExpr => "<boolean expression>",
            Rule::Additive => "<additive expression>",
            Rule::Term => "<term>",
            Rule::Factor => "<factor>",
            Rule::IdStat => "<identifier>",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type NodeId = usize;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeLabel {
    Rule(Rule),
    Token(Token),
}

#[derive(Clone, Debug)]
pub struct Node {
    pub label: NodeLabel,
    pub line: usize,
    pub depth: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        matches!(self.label, NodeLabel::Token(_))
    }

    pub fn rule(&self) -> Option<Rule> {
        match &self.label {
            NodeLabel::Rule(r) => Some(*r),
            NodeLabel::Token(_) => None,
        }
    }

    pub fn token(&self) -> Option<&Token> {
        match &self.label {
            NodeLabel::Token(t) => Some(t),
            NodeLabel::Rule(_) => None,
        }
    }
}

/// An n-ary syntax tree stored in an arena. Children are kept as index lists,
/// so the tree is built through a moving insertion point and read back by
/// plain recursion.
#[derive(Clone, Debug)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
    current: NodeId,
}

impl SyntaxTree {
    pub fn new(root: Rule) -> Self {
        Self {
            nodes: vec![Node {
                label: NodeLabel::Rule(root),
                line: 1,
                depth: 0,
                parent: None,
                children: vec![],
            }],
            current: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn current(&self) -> NodeId {
        self.current
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    fn push(&mut self, label: NodeLabel, line: usize) -> NodeId {
        let id = self.nodes.len();
        let parent = self.current;
        let depth = self.nodes[parent].depth + 1;
        self.nodes.push(Node {
            label,
            line,
            depth,
            parent: Some(parent),
            children: vec![],
        });
        self.nodes[parent].children.push(id);
        id
    }

    /// Adds a rule node under the insertion point and moves into it.
    pub fn enter(&mut self, rule: Rule, line: usize) {
        self.current = self.push(NodeLabel::Rule(rule), line);
    }

    pub fn leaf(&mut self, token: Token) {
        let line = token.line;
        self.push(NodeLabel::Token(token), line);
    }

    /// Moves the insertion point back to the parent of the current node.
    pub fn back(&mut self) {
        debug_assert!(self.current != self.root(), "left the tree root");
        if let Some(parent) = self.nodes[self.current].parent {
            self.current = parent;
        }
    }

    /// Drops the most recently added child of the insertion point along with
    /// its whole subtree. The subtree must be the newest part of the arena.
    pub fn prune_last(&mut self) {
        if let Some(id) = self.nodes[self.current].children.pop() {
            debug_assert!(id > self.current);
            self.nodes.truncate(id);
        }
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            ids: &self.nodes[id].children,
            pos: 0,
        }
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId) -> fmt::Result {
        let node = self.node(id);
        write!(f, "{}", "| ".repeat(node.depth))?;
        match &node.label {
            NodeLabel::Rule(r) => writeln!(f, "▼ {r}")?,
            NodeLabel::Token(t) if matches!(t.kind, TokenKind::Ident | TokenKind::Num) => {
                writeln!(f, "▷ {t}")?
            }
            NodeLabel::Token(t) => writeln!(f, "▷ {}", t.text)?,
        }
        for &child in &node.children {
            self.fmt_node(f, child)?;
        }
        Ok(())
    }
}

impl fmt::Display for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, self.root())
    }
}

/// A peekable walk over the children of one node.
#[derive(Clone)]
pub struct Children<'t> {
    tree: &'t SyntaxTree,
    ids: &'t [NodeId],
    pos: usize,
}

impl<'t> Children<'t> {
    pub fn peek(&self) -> Option<&'t Node> {
        self.ids.get(self.pos).map(|&id| self.tree.node(id))
    }

    pub fn peek_rule(&self) -> Option<Rule> {
        self.peek().and_then(Node::rule)
    }

    pub fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().and_then(Node::token).map(|t| t.kind)
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = *self.ids.get(self.pos)?;
        self.pos += 1;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: &str) -> Token {
        Token::new(TokenKind::Num, n, 1)
    }

    #[test]
    fn builds_and_walks() {
        let mut tree = SyntaxTree::new(Rule::Program);
        tree.enter(Rule::Factor, 1);
        tree.leaf(num("1"));
        tree.back();
        tree.leaf(num("2"));
        assert_eq!(tree.current(), tree.root());

        let mut children = tree.children(tree.root());
        assert_eq!(children.peek_rule(), Some(Rule::Factor));
        let factor = children.next().unwrap();
        assert_eq!(tree.node(factor).depth, 1);
        assert_eq!(children.peek_kind(), Some(TokenKind::Num));
        let leaf = children.next().unwrap();
        assert!(tree.node(leaf).is_leaf());
        assert_eq!(children.next(), None);
    }

    #[test]
    fn prune_drops_speculative_subtree() {
        let mut tree = SyntaxTree::new(Rule::Expression);
        tree.enter(Rule::IdStat, 1);
        tree.leaf(Token::new(TokenKind::Ident, "x", 1));
        tree.back();
        tree.prune_last();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.children(tree.root()).count(), 0);
    }

    #[test]
    fn renders_depth_first() {
        let mut tree = SyntaxTree::new(Rule::Program);
        tree.enter(Rule::Factor, 1);
        tree.leaf(num("7"));
        tree.back();
        assert_eq!(tree.to_string(), "▼ <program>\n| ▼ <factor>\n| | ▷ NUM 7\n");
    }
}
