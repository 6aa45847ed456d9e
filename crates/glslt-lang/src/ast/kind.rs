use std::fmt::{self, Display, Formatter};

use smol_str::SmolStr;
use strum::{EnumDiscriminants, EnumIter, IntoStaticStr};

use crate::literal::Literal;

/// Names a child slot in a node's layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum Role {
    Arguments,
    ArraySpecifier,
    Body,
    Callee,
    Condition,
    Declaration,
    Declarators,
    Dimensions,
    Else,
    Expression,
    Expressions,
    ExternalDeclarations,
    FalseBranch,
    Index,
    Init,
    Initializer,
    InstanceName,
    Left,
    Member,
    Members,
    Name,
    Names,
    Operand,
    Parameters,
    Parts,
    Prototype,
    Qualifier,
    ReturnType,
    Right,
    Specifier,
    Statements,
    Then,
    TrueBranch,
    Type,
    Update,
    Value,
}

/// One entry of a node layout: a single slot holds at most one child, a list
/// slot holds an ordered sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSpec {
    pub role: Role,
    pub many: bool,
}

macro_rules! layout {
    ($($slot:ident($role:ident)),* $(,)?) => {
        &[$(layout!(@ $slot $role)),*]
    };
    (@ one $role:ident) => {
        SlotSpec { role: Role::$role, many: false }
    };
    (@ many $role:ident) => {
        SlotSpec { role: Role::$role, many: true }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Empty,
    Version,
    Extension,
    Pragma,
    Line,
    Include,
    Custom,
}

impl DirectiveKind {
    pub fn name(self) -> &'static str {
        match self {
            DirectiveKind::Empty => "",
            DirectiveKind::Version => "version",
            DirectiveKind::Extension => "extension",
            DirectiveKind::Pragma => "pragma",
            DirectiveKind::Line => "line",
            DirectiveKind::Include => "include",
            DirectiveKind::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub content: SmolStr,
}

impl Directive {
    /// The line number a `#line` directive assigns to the line following it.
    pub fn line_number(&self) -> Option<u32> {
        match self.kind {
            DirectiveKind::Line => self.content.split_whitespace().next()?.parse().ok(),
            _ => None,
        }
    }
}

impl Display for Directive {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.content.is_empty() {
            write!(f, "#{}", self.kind.name())
        } else if self.kind == DirectiveKind::Empty {
            write!(f, "# {}", self.content)
        } else {
            write!(f, "#{} {}", self.kind.name(), self.content)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum QualifierKind {
    #[strum(serialize = "const")]
    Const,
    #[strum(serialize = "in")]
    In,
    #[strum(serialize = "out")]
    Out,
    #[strum(serialize = "inout")]
    Inout,
    #[strum(serialize = "attribute")]
    Attribute,
    #[strum(serialize = "uniform")]
    Uniform,
    #[strum(serialize = "varying")]
    Varying,
    #[strum(serialize = "buffer")]
    Buffer,
    #[strum(serialize = "shared")]
    Shared,
    #[strum(serialize = "centroid")]
    Centroid,
    #[strum(serialize = "sample")]
    Sample,
    #[strum(serialize = "patch")]
    Patch,
    #[strum(serialize = "smooth")]
    Smooth,
    #[strum(serialize = "flat")]
    Flat,
    #[strum(serialize = "noperspective")]
    NoPerspective,
    #[strum(serialize = "highp")]
    HighPrecision,
    #[strum(serialize = "mediump")]
    MediumPrecision,
    #[strum(serialize = "lowp")]
    LowPrecision,
    #[strum(serialize = "invariant")]
    Invariant,
    #[strum(serialize = "precise")]
    Precise,
    #[strum(serialize = "coherent")]
    Coherent,
    #[strum(serialize = "volatile")]
    Volatile,
    #[strum(serialize = "restrict")]
    Restrict,
    #[strum(serialize = "readonly")]
    Readonly,
    #[strum(serialize = "writeonly")]
    Writeonly,
    #[strum(serialize = "subroutine")]
    Subroutine,
    #[strum(serialize = "taskNV")]
    TaskNV,
    #[strum(serialize = "perprimitiveNV")]
    PerPrimitiveNV,
    #[strum(serialize = "perviewNV")]
    PerViewNV,
    #[strum(serialize = "perprimitiveEXT")]
    PerPrimitiveEXT,
    #[strum(serialize = "taskPayloadSharedEXT")]
    TaskPayloadSharedEXT,
}

impl QualifierKind {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum UnaryOp {
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "!")]
    Not,
    #[strum(serialize = "~")]
    BitNot,
    #[strum(serialize = "++")]
    PreIncrement,
    #[strum(serialize = "--")]
    PreDecrement,
    #[strum(serialize = "++")]
    PostIncrement,
    #[strum(serialize = "--")]
    PostDecrement,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        self.into()
    }

    pub fn is_postfix(self) -> bool {
        matches!(self, UnaryOp::PostIncrement | UnaryOp::PostDecrement)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum BinaryOp {
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Modulo,
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "<<")]
    ShiftLeft,
    #[strum(serialize = ">>")]
    ShiftRight,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "&")]
    BitAnd,
    #[strum(serialize = "^")]
    BitXor,
    #[strum(serialize = "|")]
    BitOr,
    #[strum(serialize = "&&")]
    LogicalAnd,
    #[strum(serialize = "^^")]
    LogicalXor,
    #[strum(serialize = "||")]
    LogicalOr,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        self.into()
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::LogicalOr => 1,
            BinaryOp::LogicalXor => 2,
            BinaryOp::LogicalAnd => 3,
            BinaryOp::BitOr => 4,
            BinaryOp::BitXor => 5,
            BinaryOp::BitAnd => 6,
            BinaryOp::Equal | BinaryOp::NotEqual => 7,
            BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessEqual | BinaryOp::GreaterEqual => 8,
            BinaryOp::ShiftLeft | BinaryOp::ShiftRight => 9,
            BinaryOp::Add | BinaryOp::Subtract => 10,
            BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => 11,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum AssignmentOp {
    #[strum(serialize = "=")]
    Assign,
    #[strum(serialize = "*=")]
    Multiply,
    #[strum(serialize = "/=")]
    Divide,
    #[strum(serialize = "%=")]
    Modulo,
    #[strum(serialize = "+=")]
    Add,
    #[strum(serialize = "-=")]
    Subtract,
    #[strum(serialize = "<<=")]
    ShiftLeft,
    #[strum(serialize = ">>=")]
    ShiftRight,
    #[strum(serialize = "&=")]
    BitAnd,
    #[strum(serialize = "^=")]
    BitXor,
    #[strum(serialize = "|=")]
    BitOr,
}

impl AssignmentOp {
    pub fn symbol(self) -> &'static str {
        self.into()
    }
}

/// The closed set of tree shapes. Each variant's children live in slots
/// described by [`Shape::layout`]; the variant itself only carries its payload.
#[derive(Debug, Clone, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(Shape), derive(Hash, PartialOrd, Ord, EnumIter, strum::Display))]
pub enum NodeKind {
    TranslationUnit,
    Directive(Directive),
    EmptyDeclaration,
    DeclarationExternalDeclaration,
    FunctionDefinition,
    FunctionDeclaration,
    FunctionPrototype,
    FunctionParameter,
    TypeAndInitDeclaration,
    DeclarationMember,
    InterfaceBlockDeclaration,
    PrecisionDeclaration,
    TypeQualifierDeclaration,
    FullySpecifiedType,
    TypeQualifier,
    Qualifier(QualifierKind),
    LayoutQualifier,
    LayoutQualifierPart,
    BuiltinTypeSpecifier(SmolStr),
    TypeReference,
    StructSpecifier,
    StructMember,
    StructDeclarator,
    ArraySpecifier,
    UnsizedDimension,
    CompoundStatement,
    DeclarationStatement,
    ExpressionStatement,
    EmptyStatement,
    SelectionStatement,
    ForStatement,
    WhileStatement,
    DoWhileStatement,
    SwitchStatement,
    CaseLabel,
    DefaultLabel,
    ReturnStatement,
    BreakStatement,
    ContinueStatement,
    DiscardStatement,
    ReferenceExpression,
    LiteralExpression(Literal),
    UnaryExpression(UnaryOp),
    BinaryExpression(BinaryOp),
    AssignmentExpression(AssignmentOp),
    ConditionalExpression,
    SequenceExpression,
    GroupingExpression,
    ArrayAccessExpression,
    MemberAccessExpression,
    FunctionCallExpression,
    InitializerList,
    Identifier(SmolStr),
}

impl NodeKind {
    pub fn shape(&self) -> Shape {
        Shape::from(self)
    }
}

impl Shape {
    pub fn layout(self) -> &'static [SlotSpec] {
        match self {
            Shape::TranslationUnit => layout![many(ExternalDeclarations)],
            Shape::DeclarationExternalDeclaration | Shape::DeclarationStatement => {
                layout![one(Declaration)]
            }
            Shape::FunctionDefinition => layout![one(Prototype), one(Body)],
            Shape::FunctionDeclaration => layout![one(Prototype)],
            Shape::FunctionPrototype => layout![one(ReturnType), one(Name), many(Parameters)],
            Shape::FunctionParameter => layout![one(Type), one(Name), one(ArraySpecifier)],
            Shape::TypeAndInitDeclaration => layout![one(Type), many(Members)],
            Shape::DeclarationMember => {
                layout![one(Name), one(ArraySpecifier), one(Initializer)]
            }
            Shape::InterfaceBlockDeclaration => layout![
                one(Qualifier),
                one(Name),
                many(Members),
                one(InstanceName),
                one(ArraySpecifier),
            ],
            Shape::PrecisionDeclaration => layout![one(Type)],
            Shape::TypeQualifierDeclaration => layout![one(Qualifier), many(Names)],
            Shape::FullySpecifiedType => layout![one(Qualifier), one(Specifier)],
            Shape::TypeQualifier | Shape::LayoutQualifier => layout![many(Parts)],
            Shape::LayoutQualifierPart => layout![one(Name), one(Value)],
            Shape::BuiltinTypeSpecifier => layout![one(ArraySpecifier)],
            Shape::TypeReference => layout![one(Name), one(ArraySpecifier)],
            Shape::StructSpecifier => layout![one(Name), many(Members), one(ArraySpecifier)],
            Shape::StructMember => layout![one(Type), many(Declarators)],
            Shape::StructDeclarator => layout![one(Name), one(ArraySpecifier)],
            Shape::ArraySpecifier => layout![many(Dimensions)],
            Shape::CompoundStatement => layout![many(Statements)],
            Shape::ExpressionStatement
            | Shape::ReturnStatement
            | Shape::CaseLabel
            | Shape::GroupingExpression => layout![one(Expression)],
            Shape::SelectionStatement => layout![one(Condition), one(Then), one(Else)],
            Shape::ForStatement => layout![one(Init), one(Condition), one(Update), one(Body)],
            Shape::WhileStatement | Shape::SwitchStatement => layout![one(Condition), one(Body)],
            Shape::DoWhileStatement => layout![one(Body), one(Condition)],
            Shape::ReferenceExpression => layout![one(Name)],
            Shape::UnaryExpression => layout![one(Operand)],
            Shape::BinaryExpression | Shape::AssignmentExpression => layout![one(Left), one(Right)],
            Shape::ConditionalExpression => {
                layout![one(Condition), one(TrueBranch), one(FalseBranch)]
            }
            Shape::SequenceExpression | Shape::InitializerList => layout![many(Expressions)],
            Shape::ArrayAccessExpression => layout![one(Operand), one(Index)],
            Shape::MemberAccessExpression => layout![one(Operand), one(Member)],
            Shape::FunctionCallExpression => layout![one(Callee), many(Arguments)],
            Shape::Directive
            | Shape::EmptyDeclaration
            | Shape::Qualifier
            | Shape::UnsizedDimension
            | Shape::EmptyStatement
            | Shape::DefaultLabel
            | Shape::BreakStatement
            | Shape::ContinueStatement
            | Shape::DiscardStatement
            | Shape::LiteralExpression
            | Shape::Identifier => layout![],
        }
    }

    pub fn slot_index(self, role: Role) -> Option<usize> {
        self.layout().iter().position(|spec| spec.role == role)
    }

    pub fn is_external_declaration(self) -> bool {
        matches!(
            self,
            Shape::Directive
                | Shape::EmptyDeclaration
                | Shape::DeclarationExternalDeclaration
                | Shape::FunctionDefinition
        )
    }

    pub fn is_declaration(self) -> bool {
        matches!(
            self,
            Shape::FunctionDeclaration
                | Shape::TypeAndInitDeclaration
                | Shape::InterfaceBlockDeclaration
                | Shape::PrecisionDeclaration
                | Shape::TypeQualifierDeclaration
        )
    }

    pub fn is_statement(self) -> bool {
        matches!(
            self,
            Shape::CompoundStatement
                | Shape::DeclarationStatement
                | Shape::ExpressionStatement
                | Shape::EmptyStatement
                | Shape::SelectionStatement
                | Shape::ForStatement
                | Shape::WhileStatement
                | Shape::DoWhileStatement
                | Shape::SwitchStatement
                | Shape::CaseLabel
                | Shape::DefaultLabel
                | Shape::ReturnStatement
                | Shape::BreakStatement
                | Shape::ContinueStatement
                | Shape::DiscardStatement
        )
    }

    pub fn is_expression(self) -> bool {
        matches!(
            self,
            Shape::ReferenceExpression
                | Shape::LiteralExpression
                | Shape::UnaryExpression
                | Shape::BinaryExpression
                | Shape::AssignmentExpression
                | Shape::ConditionalExpression
                | Shape::SequenceExpression
                | Shape::GroupingExpression
                | Shape::ArrayAccessExpression
                | Shape::MemberAccessExpression
                | Shape::FunctionCallExpression
                | Shape::InitializerList
        )
    }

    pub fn is_type_specifier(self) -> bool {
        matches!(
            self,
            Shape::BuiltinTypeSpecifier | Shape::TypeReference | Shape::StructSpecifier
        )
    }
}
