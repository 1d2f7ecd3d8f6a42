//! Syntax tree for the configuration language.

use crate::pos::SourceRange;

/// A sequence of attributes and blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub items: Vec<Structure>,
    pub range: SourceRange,
}

impl Body {
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.items.iter().filter_map(|item| match item {
            Structure::Attribute(attr) => Some(attr),
            Structure::Block(_) => None,
        })
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.items.iter().filter_map(|item| match item {
            Structure::Block(block) => Some(block),
            Structure::Attribute(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Structure {
    Attribute(Attribute),
    Block(Block),
}

impl Structure {
    pub fn range(&self) -> &SourceRange {
        match self {
            Self::Attribute(attr) => &attr.range,
            Self::Block(block) => &block.range,
        }
    }
}

/// `name = expr`
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub name_range: SourceRange,
    pub expr: Expression,
    pub range: SourceRange,
}

/// `type "label" ... { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: String,
    pub kind_range: SourceRange,
    pub labels: Vec<Label>,
    pub body: Body,
    /// From the block type through the closing brace.
    pub range: SourceRange,
}

impl Block {
    /// Range of the block header: type and labels.
    pub fn header_range(&self) -> SourceRange {
        match self.labels.last() {
            Some(label) => self.kind_range.to(&label.range),
            None => self.kind_range.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub value: String,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExprKind,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Null,
    Bool(bool),
    /// Numeric literal text, exactly as written.
    Number(String),
    String(String),
    Tuple(Vec<Expression>),
    Object(Vec<ObjectItem>),
    Traversal(Traversal),
    FunctionCall {
        name: String,
        args: Vec<Expression>,
    },
    Negate(Box<Expression>),
    Parens(Box<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectItem {
    pub key: ObjectKey,
    pub value: Expression,
}

/// The key of an object constructor item.
///
/// A key is either a single traversal (one root name followed by attribute
/// or index steps) or an arbitrary expression such as a quoted string. The
/// grammar never produces a key with more than one traversal root.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKey {
    Traversal(Traversal),
    Expression(Expression),
}

impl ObjectKey {
    pub fn range(&self) -> &SourceRange {
        match self {
            Self::Traversal(traversal) => &traversal.range,
            Self::Expression(expr) => &expr.range,
        }
    }
}

/// `root.attr[index]...`
#[derive(Debug, Clone, PartialEq)]
pub struct Traversal {
    pub root: String,
    pub root_range: SourceRange,
    pub steps: Vec<TraversalStep>,
    pub range: SourceRange,
}

impl Traversal {
    pub fn is_bare(&self) -> bool {
        self.steps.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TraversalStep {
    Attr { name: String, range: SourceRange },
    Index { key: Box<Expression>, range: SourceRange },
}

impl TraversalStep {
    pub fn range(&self) -> &SourceRange {
        match self {
            Self::Attr { range, .. } | Self::Index { range, .. } => range,
        }
    }
}
