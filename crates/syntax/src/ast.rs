//! Defines the Abstract Syntax Tree (AST) for Quill templates.
//!
//! The tree is a pure artifact of the template text. It is immutable once
//! built and may be rendered any number of times, from any number of threads.
use quill_types::Span;

/// The root of a parsed template.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    pub children: Vec<Node>,
    pub span: Span,
}

/// A statement-level node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    /// The source text the node was parsed from, when it maps to a single token.
    pub raw: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Literal text, emitted verbatim.
    Text(String),
    If {
        condition: Expr,
        body: Vec<Node>,
        /// The `else` branch. An `elif` is stored as a nested `If` here.
        else_body: Option<Vec<Node>>,
    },
    For {
        iterator: String,
        iterable: Expr,
        body: Vec<Node>,
    },
    Set {
        name: String,
        value: Expr,
    },
    Block {
        name: String,
        body: Vec<Node>,
    },
    /// An `{{ ... }}` tag.
    Expression(Expr),
    /// Malformed input the parser stepped over.
    Error { message: String, recovered: bool },
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub raw: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A root binding name followed by property or index lookups.
    Variable {
        name: String,
        path: Vec<PathSegment>,
    },
    Literal(Literal),
    /// `source | name(args) | name2`
    Filter {
        source: Box<Expr>,
        filters: Vec<FilterCall>,
    },
    /// `name(args)`, or `receiver.name(args)` with the receiver as first argument.
    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    Array(Vec<Expr>),
    /// Key/value pairs in source order.
    Object(Vec<(String, Expr)>),
    Paren(Box<Expr>),
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Error {
        message: String,
    },
}

/// A lookup step after a variable's root name.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// `.name`
    Property(String),
    /// `[expr]`
    Index(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub name: String,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Less => "<",
            BinaryOperator::LessOrEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterOrEqual => ">=",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::StrictEqual => "===",
            BinaryOperator::StrictNotEqual => "!==",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Minus,
    Plus,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span, raw: Option<String>) -> Self {
        Self { kind, span, raw }
    }
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            span,
            raw: None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, ExprKind::Error { .. })
    }
}

impl Template {
    /// Calls `visit` for every statement node, depth first, in source order.
    pub fn walk<F: FnMut(&Node)>(&self, mut visit: F) {
        fn walk_nodes<F: FnMut(&Node)>(nodes: &[Node], visit: &mut F) {
            for node in nodes {
                visit(node);
                match &node.kind {
                    NodeKind::If {
                        body, else_body, ..
                    } => {
                        walk_nodes(body, visit);
                        if let Some(else_body) = else_body {
                            walk_nodes(else_body, visit);
                        }
                    }
                    NodeKind::For { body, .. } | NodeKind::Block { body, .. } => {
                        walk_nodes(body, visit)
                    }
                    NodeKind::Text(_)
                    | NodeKind::Set { .. }
                    | NodeKind::Expression(_)
                    | NodeKind::Error { .. } => {}
                }
            }
        }
        walk_nodes(&self.children, &mut visit);
    }
}
