use itertools::chain;

use super::error::ParseError;
use super::kind::{AssignmentOp, BinaryOp, NodeKind, QualifierKind, Role, Shape, UnaryOp};
use super::node::Node;
use crate::lexer::token::{Keyword, Token, TokenKind};
use crate::range::Range;

type Result<T> = std::result::Result<T, ParseError>;

/// Deepest nesting of expressions, statements and initializer lists the
/// parser descends into before giving up.
#[cfg(debug_assertions)]
pub const MAX_NESTING_DEPTH: u32 = 64;
#[cfg(not(debug_assertions))]
pub const MAX_NESTING_DEPTH: u32 = 256;

/// Maps physical lines to the logical lines established by `#line`.
#[derive(Debug, Default, Clone, Copy)]
struct LineMap {
    anchor: Option<(u32, u32)>,
}

impl LineMap {
    fn logical(&self, physical: u32) -> u32 {
        match self.anchor {
            Some((directive_line, next)) => next + physical.saturating_sub(directive_line + 1),
            None => physical,
        }
    }
}

/// Recursive-descent parser over a token stream. Comment tokens are skipped.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    lines: LineMap,
    recover: bool,
    errors: Vec<ParseError>,
    depth: u32,
    max_depth: u32,
}

impl Parser {
    pub fn new(tokens: impl IntoIterator<Item = Token>) -> Self {
        let mut tokens: Vec<Token> = tokens.into_iter().filter(|t| !t.is_comment()).collect();

        if !tokens.last().is_some_and(Token::is_eof) {
            let range = tokens
                .last()
                .map(|token| Range::new(token.range.end, token.range.end))
                .unwrap_or_default();
            tokens.push(Token {
                range,
                kind: TokenKind::Eof,
            });
        }

        Self {
            tokens,
            pos: 0,
            lines: LineMap::default(),
            recover: false,
            errors: Vec::new(),
            depth: 0,
            max_depth: MAX_NESTING_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// When enabled, a malformed external declaration is recorded and skipped
    /// instead of aborting the translation unit.
    pub fn with_recovery(mut self, recover: bool) -> Self {
        self.recover = recover;
        self
    }

    /// Errors recorded while recovering.
    pub fn take_errors(&mut self) -> Vec<ParseError> {
        std::mem::take(&mut self.errors)
    }

    pub fn parse_translation_unit(&mut self) -> Result<Node> {
        let mut declarations = Vec::new();

        while !self.at_eof() {
            match self.external_declaration() {
                Ok(declaration) => declarations.push(declaration),
                Err(error) if self.recover => {
                    tracing::debug!(%error, "skipping malformed external declaration");
                    self.errors.push(error);
                    self.synchronize();
                }
                Err(error) => return Err(error),
            }
        }

        Ok(Node::build(
            NodeKind::TranslationUnit,
            declarations
                .into_iter()
                .map(|declaration| (Role::ExternalDeclarations, declaration)),
        )?)
    }

    pub fn parse_external_declaration(&mut self) -> Result<Node> {
        let node = self.external_declaration()?;
        self.expect_eof()?;
        Ok(node)
    }

    pub fn parse_statement(&mut self) -> Result<Node> {
        let node = self.statement()?;
        self.expect_eof()?;
        Ok(node)
    }

    pub fn parse_expression(&mut self) -> Result<Node> {
        let node = self.expression()?;
        self.expect_eof()?;
        Ok(node)
    }

    fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> &Token {
        let index = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn peek_keyword(&self) -> Option<Keyword> {
        match self.peek().kind {
            TokenKind::Keyword(keyword) => Some(keyword),
            _ => None,
        }
    }

    fn at_eof(&self) -> bool {
        self.peek().is_eof()
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !token.is_eof() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(&kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        self.eat(TokenKind::Keyword(keyword))
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.mismatch(expected))
        }
    }

    fn expect_eof(&self) -> Result<()> {
        if self.at_eof() {
            Ok(())
        } else {
            Err(self.mismatch("end of input"))
        }
    }

    fn mismatch(&self, expected: &'static str) -> ParseError {
        let found = self.peek().clone();
        if found.is_eof() {
            ParseError::UnexpectedEof(found)
        } else {
            ParseError::InputMismatch { expected, found }
        }
    }

    fn no_viable_alternative(&self) -> ParseError {
        let found = self.peek().clone();
        if found.is_eof() {
            ParseError::UnexpectedEof(found)
        } else {
            ParseError::NoViableAlternative(found)
        }
    }

    /// Runs `f` one nesting level deeper.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= self.max_depth {
            return Err(ParseError::NestingTooDeep {
                limit: self.max_depth,
                found: self.peek().clone(),
            });
        }

        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Skips past the next `;` or `}`.
    fn synchronize(&mut self) {
        while !self.at_eof() {
            let token = self.advance();
            if matches!(token.kind, TokenKind::SemiColon | TokenKind::RBrace) {
                break;
            }
        }
    }

    fn current_line(&self) -> u32 {
        self.lines.logical(self.peek().range.start.line)
    }

    fn identifier(&mut self) -> Result<Node> {
        match &self.peek().kind {
            TokenKind::Identifier(name) => {
                let node = Node::identifier(name.clone());
                self.advance();
                Ok(node)
            }
            _ => Err(self.mismatch("an identifier")),
        }
    }

    fn is_identifier(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Identifier(_))
    }

    fn external_declaration(&mut self) -> Result<Node> {
        let line = self.current_line();

        let node = match &self.peek().kind {
            TokenKind::Directive(directive) => {
                let directive = directive.clone();
                let physical = self.peek().range.start.line;
                self.advance();
                if let Some(next) = directive.line_number() {
                    self.lines.anchor = Some((physical, next));
                }
                Node::new(NodeKind::Directive(directive))
            }
            TokenKind::SemiColon => {
                self.advance();
                Node::new(NodeKind::EmptyDeclaration)
            }
            _ => {
                let declaration = self.declaration(true)?;
                if declaration.is(Shape::FunctionDefinition) {
                    declaration
                } else {
                    Node::build(
                        NodeKind::DeclarationExternalDeclaration,
                        [(Role::Declaration, declaration)],
                    )?
                }
            }
        };

        node.set_line(Some(line));
        Ok(node)
    }

    /// Parses any declaration form. Function definitions are only accepted at
    /// external scope.
    fn declaration(&mut self, external: bool) -> Result<Node> {
        if self.eat_keyword(Keyword::Precision) {
            return self.precision_declaration();
        }

        let qualifier = self.type_qualifier()?;
        if let Some(qualifier) = &qualifier {
            match (&self.peek().kind, &self.peek_nth(1).kind) {
                (TokenKind::SemiColon, _) => {
                    self.advance();
                    return Ok(Node::build(
                        NodeKind::TypeQualifierDeclaration,
                        [(Role::Qualifier, qualifier.clone())],
                    )?);
                }
                (TokenKind::Identifier(_), TokenKind::LBrace) => {
                    return self.interface_block(qualifier.clone());
                }
                (TokenKind::Identifier(_), TokenKind::SemiColon | TokenKind::Comma) => {
                    return self.qualifier_declaration(qualifier.clone());
                }
                _ => {}
            }
        }

        let specifier = self.type_specifier()?;
        let ty = fully_specified_type(qualifier, specifier)?;

        if self.eat(TokenKind::SemiColon) {
            return Ok(Node::build(
                NodeKind::TypeAndInitDeclaration,
                [(Role::Type, ty)],
            )?);
        }

        let name = self.identifier()?;

        if self.check(&TokenKind::LParen) {
            let prototype = self.function_prototype(ty, name)?;
            if self.eat(TokenKind::SemiColon) {
                return Ok(Node::build(
                    NodeKind::FunctionDeclaration,
                    [(Role::Prototype, prototype)],
                )?);
            }
            if external && self.check(&TokenKind::LBrace) {
                let body = self.compound_statement()?;
                return Ok(Node::build(
                    NodeKind::FunctionDefinition,
                    [(Role::Prototype, prototype), (Role::Body, body)],
                )?);
            }
            return Err(self.mismatch(if external { "`;` or `{`" } else { "`;`" }));
        }

        let mut members = vec![self.declaration_member(name)?];
        while self.eat(TokenKind::Comma) {
            let name = self.identifier()?;
            members.push(self.declaration_member(name)?);
        }
        self.expect(TokenKind::SemiColon, "`;`")?;

        Ok(Node::build(
            NodeKind::TypeAndInitDeclaration,
            chain!(
                [(Role::Type, ty)],
                members.into_iter().map(|member| (Role::Members, member))
            ),
        )?)
    }

    fn precision_declaration(&mut self) -> Result<Node> {
        let precision = match self.peek_keyword() {
            Some(Keyword::Highp) => QualifierKind::HighPrecision,
            Some(Keyword::Mediump) => QualifierKind::MediumPrecision,
            Some(Keyword::Lowp) => QualifierKind::LowPrecision,
            _ => return Err(self.mismatch("a precision qualifier")),
        };
        self.advance();

        let qualifier = Node::build(
            NodeKind::TypeQualifier,
            [(Role::Parts, Node::new(NodeKind::Qualifier(precision)))],
        )?;
        let specifier = self.type_specifier()?;
        self.expect(TokenKind::SemiColon, "`;`")?;

        Ok(Node::build(
            NodeKind::PrecisionDeclaration,
            [(Role::Type, fully_specified_type(Some(qualifier), specifier)?)],
        )?)
    }

    fn qualifier_declaration(&mut self, qualifier: Node) -> Result<Node> {
        let mut names = vec![self.identifier()?];
        while self.eat(TokenKind::Comma) {
            names.push(self.identifier()?);
        }
        self.expect(TokenKind::SemiColon, "`;`")?;

        Ok(Node::build(
            NodeKind::TypeQualifierDeclaration,
            chain!(
                [(Role::Qualifier, qualifier)],
                names.into_iter().map(|name| (Role::Names, name))
            ),
        )?)
    }

    fn interface_block(&mut self, qualifier: Node) -> Result<Node> {
        let name = self.identifier()?;
        self.expect(TokenKind::LBrace, "`{`")?;

        let mut members = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            members.push(self.struct_member()?);
        }
        self.expect(TokenKind::RBrace, "`}`")?;

        let instance = if self.is_identifier() {
            Some(self.identifier()?)
        } else {
            None
        };
        let array = match instance {
            Some(_) => self.array_specifier()?,
            None => None,
        };
        self.expect(TokenKind::SemiColon, "`;`")?;

        Ok(Node::build(
            NodeKind::InterfaceBlockDeclaration,
            chain!(
                [(Role::Qualifier, qualifier), (Role::Name, name)],
                members.into_iter().map(|member| (Role::Members, member)),
                instance.map(|instance| (Role::InstanceName, instance)),
                array.map(|array| (Role::ArraySpecifier, array)),
            ),
        )?)
    }

    fn declaration_member(&mut self, name: Node) -> Result<Node> {
        let array = self.array_specifier()?;
        let initializer = if self.eat(TokenKind::Assign) {
            Some(self.initializer()?)
        } else {
            None
        };

        Ok(Node::build(
            NodeKind::DeclarationMember,
            chain!(
                [(Role::Name, name)],
                array.map(|array| (Role::ArraySpecifier, array)),
                initializer.map(|initializer| (Role::Initializer, initializer)),
            ),
        )?)
    }

    fn initializer(&mut self) -> Result<Node> {
        if !self.eat(TokenKind::LBrace) {
            return self.assignment_expression();
        }

        let mut expressions = vec![self.nested(Self::initializer)?];
        while self.eat(TokenKind::Comma) {
            if self.check(&TokenKind::RBrace) {
                break;
            }
            expressions.push(self.nested(Self::initializer)?);
        }
        self.expect(TokenKind::RBrace, "`}`")?;

        Ok(Node::build(
            NodeKind::InitializerList,
            expressions
                .into_iter()
                .map(|expression| (Role::Expressions, expression)),
        )?)
    }

    fn type_qualifier(&mut self) -> Result<Option<Node>> {
        let mut parts = Vec::new();

        while let Some(keyword) = self.peek_keyword() {
            if keyword == Keyword::Layout {
                parts.push(self.layout_qualifier()?);
                continue;
            }
            match qualifier_kind(keyword) {
                Some(kind) => {
                    self.advance();
                    parts.push(Node::new(NodeKind::Qualifier(kind)));
                }
                None => break,
            }
        }

        if parts.is_empty() {
            return Ok(None);
        }

        Ok(Some(Node::build(
            NodeKind::TypeQualifier,
            parts.into_iter().map(|part| (Role::Parts, part)),
        )?))
    }

    fn layout_qualifier(&mut self) -> Result<Node> {
        self.advance();
        self.expect(TokenKind::LParen, "`(`")?;

        let mut parts = Vec::new();
        loop {
            let name = if self.eat_keyword(Keyword::Shared) {
                Node::identifier("shared")
            } else {
                self.identifier()?
            };
            let value = if self.eat(TokenKind::Assign) {
                Some(self.conditional_expression()?)
            } else {
                None
            };
            parts.push(Node::build(
                NodeKind::LayoutQualifierPart,
                chain!(
                    [(Role::Name, name)],
                    value.map(|value| (Role::Value, value))
                ),
            )?);

            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "`)`")?;

        Ok(Node::build(
            NodeKind::LayoutQualifier,
            parts.into_iter().map(|part| (Role::Parts, part)),
        )?)
    }

    fn type_specifier(&mut self) -> Result<Node> {
        let specifier = match &self.peek().kind {
            TokenKind::BuiltinType(name) => {
                let node = Node::new(NodeKind::BuiltinTypeSpecifier(name.clone()));
                self.advance();
                node
            }
            TokenKind::Identifier(_) => {
                let name = self.identifier()?;
                Node::build(NodeKind::TypeReference, [(Role::Name, name)])?
            }
            TokenKind::Keyword(Keyword::Struct) => return self.nested(Self::struct_specifier),
            _ => return Err(self.no_viable_alternative()),
        };

        if let Some(array) = self.array_specifier()? {
            specifier.set_child(Role::ArraySpecifier, Some(array))?;
        }
        Ok(specifier)
    }

    fn struct_specifier(&mut self) -> Result<Node> {
        self.advance();

        let name = if self.is_identifier() {
            Some(self.identifier()?)
        } else {
            None
        };
        self.expect(TokenKind::LBrace, "`{`")?;

        let mut members = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            members.push(self.struct_member()?);
        }
        self.expect(TokenKind::RBrace, "`}`")?;
        let array = self.array_specifier()?;

        Ok(Node::build(
            NodeKind::StructSpecifier,
            chain!(
                name.map(|name| (Role::Name, name)),
                members.into_iter().map(|member| (Role::Members, member)),
                array.map(|array| (Role::ArraySpecifier, array)),
            ),
        )?)
    }

    fn struct_member(&mut self) -> Result<Node> {
        let qualifier = self.type_qualifier()?;
        let specifier = self.type_specifier()?;
        let ty = fully_specified_type(qualifier, specifier)?;

        let mut declarators = vec![self.struct_declarator()?];
        while self.eat(TokenKind::Comma) {
            declarators.push(self.struct_declarator()?);
        }
        self.expect(TokenKind::SemiColon, "`;`")?;

        Ok(Node::build(
            NodeKind::StructMember,
            chain!(
                [(Role::Type, ty)],
                declarators
                    .into_iter()
                    .map(|declarator| (Role::Declarators, declarator))
            ),
        )?)
    }

    fn struct_declarator(&mut self) -> Result<Node> {
        let name = self.identifier()?;
        let array = self.array_specifier()?;

        Ok(Node::build(
            NodeKind::StructDeclarator,
            chain!(
                [(Role::Name, name)],
                array.map(|array| (Role::ArraySpecifier, array))
            ),
        )?)
    }

    fn array_specifier(&mut self) -> Result<Option<Node>> {
        let mut dimensions = Vec::new();

        while self.eat(TokenKind::LBracket) {
            if self.eat(TokenKind::RBracket) {
                dimensions.push(Node::new(NodeKind::UnsizedDimension));
            } else {
                dimensions.push(self.conditional_expression()?);
                self.expect(TokenKind::RBracket, "`]`")?;
            }
        }

        if dimensions.is_empty() {
            return Ok(None);
        }

        Ok(Some(Node::build(
            NodeKind::ArraySpecifier,
            dimensions
                .into_iter()
                .map(|dimension| (Role::Dimensions, dimension)),
        )?))
    }

    fn function_prototype(&mut self, return_type: Node, name: Node) -> Result<Node> {
        self.expect(TokenKind::LParen, "`(`")?;

        let mut parameters = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                parameters.push(self.function_parameter()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "`)`")?;

        Ok(Node::build(
            NodeKind::FunctionPrototype,
            chain!(
                [(Role::ReturnType, return_type), (Role::Name, name)],
                parameters
                    .into_iter()
                    .map(|parameter| (Role::Parameters, parameter))
            ),
        )?)
    }

    fn function_parameter(&mut self) -> Result<Node> {
        let qualifier = self.type_qualifier()?;
        let specifier = self.type_specifier()?;
        let ty = fully_specified_type(qualifier, specifier)?;

        let name = if self.is_identifier() {
            Some(self.identifier()?)
        } else {
            None
        };
        let array = match name {
            Some(_) => self.array_specifier()?,
            None => None,
        };

        Ok(Node::build(
            NodeKind::FunctionParameter,
            chain!(
                [(Role::Type, ty)],
                name.map(|name| (Role::Name, name)),
                array.map(|array| (Role::ArraySpecifier, array)),
            ),
        )?)
    }

    fn compound_statement(&mut self) -> Result<Node> {
        self.expect(TokenKind::LBrace, "`{`")?;

        let mut statements = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            statements.push(self.statement()?);
        }
        self.expect(TokenKind::RBrace, "`}`")?;

        Ok(Node::build(
            NodeKind::CompoundStatement,
            statements
                .into_iter()
                .map(|statement| (Role::Statements, statement)),
        )?)
    }

    /// Whether the upcoming tokens start a declaration rather than an
    /// expression statement.
    fn starts_declaration(&self) -> bool {
        match &self.peek().kind {
            TokenKind::Keyword(keyword) => {
                matches!(
                    keyword,
                    Keyword::Layout | Keyword::Precision | Keyword::Struct
                ) || qualifier_kind(*keyword).is_some()
            }
            TokenKind::BuiltinType(_) => !matches!(self.peek_nth(1).kind, TokenKind::LParen),
            TokenKind::Identifier(_) => matches!(self.peek_nth(1).kind, TokenKind::Identifier(_)),
            _ => false,
        }
    }

    fn statement(&mut self) -> Result<Node> {
        self.nested(Self::any_statement)
    }

    fn any_statement(&mut self) -> Result<Node> {
        let line = self.current_line();

        let node = match self.peek().kind {
            TokenKind::LBrace => self.compound_statement()?,
            TokenKind::SemiColon => {
                self.advance();
                Node::new(NodeKind::EmptyStatement)
            }
            TokenKind::Keyword(Keyword::If) => self.selection_statement()?,
            TokenKind::Keyword(Keyword::Switch) => {
                self.advance();
                let condition = self.parenthesized()?;
                let body = self.compound_statement()?;
                Node::build(
                    NodeKind::SwitchStatement,
                    [(Role::Condition, condition), (Role::Body, body)],
                )?
            }
            TokenKind::Keyword(Keyword::Case) => {
                self.advance();
                let expression = self.expression()?;
                self.expect(TokenKind::Colon, "`:`")?;
                Node::build(NodeKind::CaseLabel, [(Role::Expression, expression)])?
            }
            TokenKind::Keyword(Keyword::Default) => {
                self.advance();
                self.expect(TokenKind::Colon, "`:`")?;
                Node::new(NodeKind::DefaultLabel)
            }
            TokenKind::Keyword(Keyword::While) => {
                self.advance();
                let condition = self.parenthesized()?;
                let body = self.statement()?;
                Node::build(
                    NodeKind::WhileStatement,
                    [(Role::Condition, condition), (Role::Body, body)],
                )?
            }
            TokenKind::Keyword(Keyword::Do) => {
                self.advance();
                let body = self.statement()?;
                self.expect(TokenKind::Keyword(Keyword::While), "`while`")?;
                let condition = self.parenthesized()?;
                self.expect(TokenKind::SemiColon, "`;`")?;
                Node::build(
                    NodeKind::DoWhileStatement,
                    [(Role::Body, body), (Role::Condition, condition)],
                )?
            }
            TokenKind::Keyword(Keyword::For) => self.for_statement()?,
            TokenKind::Keyword(Keyword::Break) => self.jump(NodeKind::BreakStatement)?,
            TokenKind::Keyword(Keyword::Continue) => self.jump(NodeKind::ContinueStatement)?,
            TokenKind::Keyword(Keyword::Discard) => self.jump(NodeKind::DiscardStatement)?,
            TokenKind::Keyword(Keyword::Return) => {
                self.advance();
                let expression = if self.check(&TokenKind::SemiColon) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.expect(TokenKind::SemiColon, "`;`")?;
                Node::build(
                    NodeKind::ReturnStatement,
                    expression.map(|expression| (Role::Expression, expression)),
                )?
            }
            _ if self.starts_declaration() => {
                let declaration = self.declaration(false)?;
                Node::build(
                    NodeKind::DeclarationStatement,
                    [(Role::Declaration, declaration)],
                )?
            }
            _ => {
                let expression = self.expression()?;
                self.expect(TokenKind::SemiColon, "`;`")?;
                Node::build(
                    NodeKind::ExpressionStatement,
                    [(Role::Expression, expression)],
                )?
            }
        };

        node.set_line(Some(line));
        Ok(node)
    }

    fn jump(&mut self, kind: NodeKind) -> Result<Node> {
        self.advance();
        self.expect(TokenKind::SemiColon, "`;`")?;
        Ok(Node::new(kind))
    }

    fn parenthesized(&mut self) -> Result<Node> {
        self.expect(TokenKind::LParen, "`(`")?;
        let expression = self.expression()?;
        self.expect(TokenKind::RParen, "`)`")?;
        Ok(expression)
    }

    fn selection_statement(&mut self) -> Result<Node> {
        self.advance();
        let condition = self.parenthesized()?;
        let then = self.statement()?;
        let otherwise = if self.eat_keyword(Keyword::Else) {
            Some(self.statement()?)
        } else {
            None
        };

        Ok(Node::build(
            NodeKind::SelectionStatement,
            chain!(
                [(Role::Condition, condition), (Role::Then, then)],
                otherwise.map(|otherwise| (Role::Else, otherwise))
            ),
        )?)
    }

    fn for_statement(&mut self) -> Result<Node> {
        self.advance();
        self.expect(TokenKind::LParen, "`(`")?;

        let init = if self.eat(TokenKind::SemiColon) {
            None
        } else if self.starts_declaration() {
            let declaration = self.declaration(false)?;
            Some(Node::build(
                NodeKind::DeclarationStatement,
                [(Role::Declaration, declaration)],
            )?)
        } else {
            let expression = self.expression()?;
            self.expect(TokenKind::SemiColon, "`;`")?;
            Some(Node::build(
                NodeKind::ExpressionStatement,
                [(Role::Expression, expression)],
            )?)
        };

        let condition = if self.check(&TokenKind::SemiColon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(TokenKind::SemiColon, "`;`")?;

        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(TokenKind::RParen, "`)`")?;
        let body = self.statement()?;

        Ok(Node::build(
            NodeKind::ForStatement,
            chain!(
                init.map(|init| (Role::Init, init)),
                condition.map(|condition| (Role::Condition, condition)),
                update.map(|update| (Role::Update, update)),
                [(Role::Body, body)],
            ),
        )?)
    }

    fn expression(&mut self) -> Result<Node> {
        let first = self.assignment_expression()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let mut expressions = vec![first];
        while self.eat(TokenKind::Comma) {
            expressions.push(self.assignment_expression()?);
        }

        Ok(Node::build(
            NodeKind::SequenceExpression,
            expressions
                .into_iter()
                .map(|expression| (Role::Expressions, expression)),
        )?)
    }

    fn assignment_expression(&mut self) -> Result<Node> {
        self.nested(Self::assignment_or_conditional)
    }

    fn assignment_or_conditional(&mut self) -> Result<Node> {
        let left = self.conditional_expression()?;

        match assignment_op(&self.peek().kind) {
            Some(op) => {
                self.advance();
                let right = self.assignment_expression()?;
                Ok(Node::build(
                    NodeKind::AssignmentExpression(op),
                    [(Role::Left, left), (Role::Right, right)],
                )?)
            }
            None => Ok(left),
        }
    }

    fn conditional_expression(&mut self) -> Result<Node> {
        let condition = self.binary_expression(1)?;
        if !self.eat(TokenKind::Question) {
            return Ok(condition);
        }

        let true_branch = self.expression()?;
        self.expect(TokenKind::Colon, "`:`")?;
        let false_branch = self.assignment_expression()?;

        Ok(Node::build(
            NodeKind::ConditionalExpression,
            [
                (Role::Condition, condition),
                (Role::TrueBranch, true_branch),
                (Role::FalseBranch, false_branch),
            ],
        )?)
    }

    fn binary_expression(&mut self, min_precedence: u8) -> Result<Node> {
        let mut left = self.unary_expression()?;

        while let Some(op) = binary_op(&self.peek().kind) {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let right = self.binary_expression(precedence + 1)?;
            left = Node::build(
                NodeKind::BinaryExpression(op),
                [(Role::Left, left), (Role::Right, right)],
            )?;
        }

        Ok(left)
    }

    fn unary_expression(&mut self) -> Result<Node> {
        let op = match self.peek().kind {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::Inc => UnaryOp::PreIncrement,
            TokenKind::Dec => UnaryOp::PreDecrement,
            _ => return self.postfix_expression(),
        };
        self.advance();

        let operand = self.nested(Self::unary_expression)?;
        Ok(Node::build(
            NodeKind::UnaryExpression(op),
            [(Role::Operand, operand)],
        )?)
    }

    fn postfix_expression(&mut self) -> Result<Node> {
        let mut expression = self.primary_expression()?;

        loop {
            expression = match self.peek().kind {
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.expression()?;
                    self.expect(TokenKind::RBracket, "`]`")?;
                    Node::build(
                        NodeKind::ArrayAccessExpression,
                        [(Role::Operand, expression), (Role::Index, index)],
                    )?
                }
                TokenKind::Dot => {
                    self.advance();
                    let member = self.identifier()?;
                    let access = Node::build(
                        NodeKind::MemberAccessExpression,
                        [(Role::Operand, expression), (Role::Member, member)],
                    )?;
                    if self.check(&TokenKind::LParen) {
                        self.function_call(access)?
                    } else {
                        access
                    }
                }
                TokenKind::Inc => {
                    self.advance();
                    Node::build(
                        NodeKind::UnaryExpression(UnaryOp::PostIncrement),
                        [(Role::Operand, expression)],
                    )?
                }
                TokenKind::Dec => {
                    self.advance();
                    Node::build(
                        NodeKind::UnaryExpression(UnaryOp::PostDecrement),
                        [(Role::Operand, expression)],
                    )?
                }
                _ => return Ok(expression),
            };
        }
    }

    fn primary_expression(&mut self) -> Result<Node> {
        match &self.peek().kind {
            TokenKind::Identifier(_) => {
                let name = self.identifier()?;
                if self.check(&TokenKind::LParen) {
                    self.function_call(name)
                } else {
                    Ok(Node::build(
                        NodeKind::ReferenceExpression,
                        [(Role::Name, name)],
                    )?)
                }
            }
            TokenKind::BuiltinType(_) => {
                let specifier = self.type_specifier()?;
                self.function_call(specifier)
            }
            TokenKind::Literal(literal) => {
                let node = Node::literal_expression(literal.clone());
                self.advance();
                Ok(node)
            }
            TokenKind::LParen => {
                self.advance();
                let expression = self.expression()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(Node::build(
                    NodeKind::GroupingExpression,
                    [(Role::Expression, expression)],
                )?)
            }
            _ => Err(self.no_viable_alternative()),
        }
    }

    fn function_call(&mut self, callee: Node) -> Result<Node> {
        self.expect(TokenKind::LParen, "`(`")?;

        let mut arguments = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                arguments.push(self.assignment_expression()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "`)`")?;

        Ok(Node::build(
            NodeKind::FunctionCallExpression,
            chain!(
                [(Role::Callee, callee)],
                arguments
                    .into_iter()
                    .map(|argument| (Role::Arguments, argument))
            ),
        )?)
    }
}

fn fully_specified_type(qualifier: Option<Node>, specifier: Node) -> Result<Node> {
    Ok(Node::build(
        NodeKind::FullySpecifiedType,
        chain!(
            qualifier.map(|qualifier| (Role::Qualifier, qualifier)),
            [(Role::Specifier, specifier)]
        ),
    )?)
}

fn qualifier_kind(keyword: Keyword) -> Option<QualifierKind> {
    let kind = match keyword {
        Keyword::Const => QualifierKind::Const,
        Keyword::In => QualifierKind::In,
        Keyword::Out => QualifierKind::Out,
        Keyword::Inout => QualifierKind::Inout,
        Keyword::Attribute => QualifierKind::Attribute,
        Keyword::Uniform => QualifierKind::Uniform,
        Keyword::Varying => QualifierKind::Varying,
        Keyword::Buffer => QualifierKind::Buffer,
        Keyword::Shared => QualifierKind::Shared,
        Keyword::Centroid => QualifierKind::Centroid,
        Keyword::Sample => QualifierKind::Sample,
        Keyword::Patch => QualifierKind::Patch,
        Keyword::Smooth => QualifierKind::Smooth,
        Keyword::Flat => QualifierKind::Flat,
        Keyword::Noperspective => QualifierKind::NoPerspective,
        Keyword::Highp => QualifierKind::HighPrecision,
        Keyword::Mediump => QualifierKind::MediumPrecision,
        Keyword::Lowp => QualifierKind::LowPrecision,
        Keyword::Invariant => QualifierKind::Invariant,
        Keyword::Precise => QualifierKind::Precise,
        Keyword::Coherent => QualifierKind::Coherent,
        Keyword::Volatile => QualifierKind::Volatile,
        Keyword::Restrict => QualifierKind::Restrict,
        Keyword::Readonly => QualifierKind::Readonly,
        Keyword::Writeonly => QualifierKind::Writeonly,
        Keyword::Subroutine => QualifierKind::Subroutine,
        Keyword::TaskNV => QualifierKind::TaskNV,
        Keyword::PerprimitiveNV => QualifierKind::PerPrimitiveNV,
        Keyword::PerviewNV => QualifierKind::PerViewNV,
        Keyword::PerprimitiveEXT => QualifierKind::PerPrimitiveEXT,
        Keyword::TaskPayloadSharedEXT => QualifierKind::TaskPayloadSharedEXT,
        _ => return None,
    };
    Some(kind)
}

fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::Star => BinaryOp::Multiply,
        TokenKind::Slash => BinaryOp::Divide,
        TokenKind::Percent => BinaryOp::Modulo,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Subtract,
        TokenKind::ShiftLeft => BinaryOp::ShiftLeft,
        TokenKind::ShiftRight => BinaryOp::ShiftRight,
        TokenKind::Lt => BinaryOp::Less,
        TokenKind::Gt => BinaryOp::Greater,
        TokenKind::Lte => BinaryOp::LessEqual,
        TokenKind::Gte => BinaryOp::GreaterEqual,
        TokenKind::EqEq => BinaryOp::Equal,
        TokenKind::NeEq => BinaryOp::NotEqual,
        TokenKind::Ampersand => BinaryOp::BitAnd,
        TokenKind::Caret => BinaryOp::BitXor,
        TokenKind::Pipe => BinaryOp::BitOr,
        TokenKind::AndAnd => BinaryOp::LogicalAnd,
        TokenKind::XorXor => BinaryOp::LogicalXor,
        TokenKind::OrOr => BinaryOp::LogicalOr,
        _ => return None,
    };
    Some(op)
}

fn assignment_op(kind: &TokenKind) -> Option<AssignmentOp> {
    let op = match kind {
        TokenKind::Assign => AssignmentOp::Assign,
        TokenKind::MulAssign => AssignmentOp::Multiply,
        TokenKind::DivAssign => AssignmentOp::Divide,
        TokenKind::ModAssign => AssignmentOp::Modulo,
        TokenKind::AddAssign => AssignmentOp::Add,
        TokenKind::SubAssign => AssignmentOp::Subtract,
        TokenKind::LeftAssign => AssignmentOp::ShiftLeft,
        TokenKind::RightAssign => AssignmentOp::ShiftRight,
        TokenKind::AndAssign => AssignmentOp::BitAnd,
        TokenKind::XorAssign => AssignmentOp::BitXor,
        TokenKind::OrAssign => AssignmentOp::BitOr,
        _ => return None,
    };
    Some(op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{Lexer, Options};
    use crate::lexer::token::Version;
    use crate::literal::Literal;
    use rstest::rstest;

    fn parser(code: &str) -> Parser {
        Parser::new(Lexer::new(Options::default()).tokenize(code).unwrap())
    }

    fn shapes(node: &Node) -> Vec<Shape> {
        node.children().iter().map(Node::shape).collect()
    }

    #[rstest]
    #[case("int a;", vec![Shape::DeclarationExternalDeclaration])]
    #[case("#version 330\n;", vec![Shape::Directive, Shape::EmptyDeclaration])]
    #[case("void main() {}", vec![Shape::FunctionDefinition])]
    #[case("void f(); float g(vec2 p);", vec![Shape::DeclarationExternalDeclaration, Shape::DeclarationExternalDeclaration])]
    #[case("a;//present\nb;c;d;", vec![Shape::DeclarationExternalDeclaration; 4])]
    fn test_translation_unit(#[case] code: &str, #[case] expected: Vec<Shape>) {
        let unit = parser(code).parse_translation_unit().unwrap();
        assert_eq!(unit.shape(), Shape::TranslationUnit);
        assert_eq!(shapes(&unit), expected);
    }

    #[test]
    fn test_type_reference_declaration_without_members() {
        let unit = parser("a;").parse_translation_unit().unwrap();
        let declaration = unit.children()[0].child(Role::Declaration).unwrap();

        assert_eq!(declaration.shape(), Shape::TypeAndInitDeclaration);
        assert!(declaration.children_of(Role::Members).is_empty());
        let specifier = declaration
            .child(Role::Type)
            .and_then(|ty| ty.child(Role::Specifier))
            .unwrap();
        assert_eq!(specifier.shape(), Shape::TypeReference);
    }

    #[rstest]
    #[case("1 + 2 * 3", BinaryOp::Add)]
    #[case("1 * 2 + 3", BinaryOp::Add)]
    #[case("a || b && c", BinaryOp::LogicalOr)]
    #[case("a < b == c", BinaryOp::Equal)]
    fn test_binary_precedence(#[case] code: &str, #[case] top: BinaryOp) {
        let expression = parser(code).parse_expression().unwrap();
        assert_eq!(*expression.kind(), NodeKind::BinaryExpression(top));
    }

    #[test]
    fn test_left_associative() {
        let expression = parser("4 + a + aa").parse_expression().unwrap();
        let left = expression.child(Role::Left).unwrap();

        assert_eq!(left.shape(), Shape::BinaryExpression);
        assert_eq!(
            expression.child(Role::Right).unwrap().shape(),
            Shape::ReferenceExpression
        );
    }

    #[rstest]
    #[case("a = b = 1", Shape::AssignmentExpression)]
    #[case("x ? 1 : 2", Shape::ConditionalExpression)]
    #[case("(1, 2)", Shape::GroupingExpression)]
    #[case("1, 2", Shape::SequenceExpression)]
    #[case("v.xyz", Shape::MemberAccessExpression)]
    #[case("a[0]", Shape::ArrayAccessExpression)]
    #[case("vec3(1.0)", Shape::FunctionCallExpression)]
    #[case("f(a, b)", Shape::FunctionCallExpression)]
    #[case("i++", Shape::UnaryExpression)]
    #[case("-i", Shape::UnaryExpression)]
    #[case("a.length()", Shape::FunctionCallExpression)]
    fn test_expression_shapes(#[case] code: &str, #[case] expected: Shape) {
        assert_eq!(parser(code).parse_expression().unwrap().shape(), expected);
    }

    #[rstest]
    #[case("{ int a = 1; a += 2; }", Shape::CompoundStatement)]
    #[case("if (a) b(); else c();", Shape::SelectionStatement)]
    #[case("for (int i = 0; i < 3; i++) {}", Shape::ForStatement)]
    #[case("for (;;) break;", Shape::ForStatement)]
    #[case("while (true) continue;", Shape::WhileStatement)]
    #[case("do { } while (false);", Shape::DoWhileStatement)]
    #[case("switch (a) { case 1: break; default: break; }", Shape::SwitchStatement)]
    #[case("return;", Shape::ReturnStatement)]
    #[case("discard;", Shape::DiscardStatement)]
    #[case("vec3 v;", Shape::DeclarationStatement)]
    #[case("Light l;", Shape::DeclarationStatement)]
    #[case("vec3(1.0);", Shape::ExpressionStatement)]
    fn test_statement_shapes(#[case] code: &str, #[case] expected: Shape) {
        assert_eq!(parser(code).parse_statement().unwrap().shape(), expected);
    }

    #[rstest]
    #[case("precision highp float;", Shape::PrecisionDeclaration)]
    #[case("layout(location = 0) in vec3 position;", Shape::TypeAndInitDeclaration)]
    #[case("layout(local_size_x = 8) in;", Shape::TypeQualifierDeclaration)]
    #[case("invariant gl_Position;", Shape::TypeQualifierDeclaration)]
    #[case("uniform Block { mat4 mvp; } block;", Shape::InterfaceBlockDeclaration)]
    #[case("struct Light { vec3 color; float radius[2]; };", Shape::TypeAndInitDeclaration)]
    #[case("const float values[] = float[](1.0, 2.0);", Shape::TypeAndInitDeclaration)]
    #[case("int a[2] = { 1, 2, };", Shape::TypeAndInitDeclaration)]
    fn test_declaration_shapes(#[case] code: &str, #[case] expected: Shape) {
        let external = parser(code).parse_external_declaration().unwrap();
        assert_eq!(
            external.child(Role::Declaration).map(|d| d.shape()),
            Some(expected)
        );
    }

    #[test]
    fn test_declaration_members() {
        let external = parser("int a = 1, b = 2, c = (3, 1);")
            .parse_external_declaration()
            .unwrap();
        let members = external
            .child(Role::Declaration)
            .unwrap()
            .children_of(Role::Members);

        assert_eq!(members.len(), 3);
        assert_eq!(
            members[0].child(Role::Initializer).and_then(|i| i.literal()),
            Some(Literal::int(1))
        );
        assert_eq!(
            members[2].child(Role::Initializer).map(|i| i.shape()),
            Some(Shape::GroupingExpression)
        );
    }

    #[rstest]
    #[case("int a", "`;`")]
    #[case("int a b;", "`;`")]
    fn test_mismatch(#[case] code: &str, #[case] _expected: &str) {
        assert!(parser(code).parse_translation_unit().is_err());
    }

    #[test]
    fn test_unexpected_eof() {
        assert!(matches!(
            parser("void main() {").parse_translation_unit(),
            Err(ParseError::UnexpectedEof(_))
        ));
    }

    #[test]
    fn test_fragment_must_consume_input() {
        assert!(matches!(
            parser("a b").parse_expression(),
            Err(ParseError::InputMismatch { expected: "end of input", .. })
        ));
    }

    #[rstest]
    #[case::parentheses(format!("int a = {}1{};", "(".repeat(10_000), ")".repeat(10_000)))]
    #[case::calls(format!("int a = {}1{};", "f(".repeat(10_000), ")".repeat(10_000)))]
    #[case::unary(format!("int a = {}1;", "-".repeat(10_000)))]
    #[case::blocks(format!("void main() {}{}", "{".repeat(10_000), "}".repeat(10_000)))]
    #[case::initializers(format!("int a[1] = {}1{};", "{".repeat(10_000), "}".repeat(10_000)))]
    fn test_deep_nesting_is_an_error(#[case] code: String) {
        assert!(matches!(
            parser(&code).parse_translation_unit(),
            Err(ParseError::NestingTooDeep { limit: MAX_NESTING_DEPTH, .. })
        ));
    }

    #[test]
    fn test_nesting_within_limit() {
        let depth = 30;
        let code = format!("int a = {}1{};", "(".repeat(depth), ")".repeat(depth));

        assert!(parser(&code).parse_translation_unit().is_ok());
        assert!(matches!(
            parser(&code).with_max_depth(8).parse_translation_unit(),
            Err(ParseError::NestingTooDeep { limit: 8, .. })
        ));
    }

    #[test]
    fn test_recovery_continues_after_deep_nesting() {
        let code = format!("int a; int b = {}1{}; int c;", "(".repeat(200), ")".repeat(200));
        let mut parser = parser(&code).with_recovery(true).with_max_depth(16);
        let unit = parser.parse_translation_unit().unwrap();

        assert_eq!(unit.children().len(), 2);
        assert!(matches!(
            parser.take_errors().as_slice(),
            [ParseError::NestingTooDeep { .. }]
        ));
    }

    #[test]
    fn test_recovery_skips_bad_declarations() {
        let mut parser = parser("int a; int = 3; int b;").with_recovery(true);
        let unit = parser.parse_translation_unit().unwrap();

        assert_eq!(unit.children().len(), 2);
        assert_eq!(parser.take_errors().len(), 1);
    }

    #[test]
    fn test_line_directive_sets_logical_lines() {
        let unit = parser("int a;\n#line 10\nint b;\nint c;")
            .parse_translation_unit()
            .unwrap();
        let lines: Vec<_> = unit.children().iter().map(Node::line).collect();

        assert_eq!(lines, vec![Some(1), Some(2), Some(10), Some(11)]);
    }

    #[rstest]
    #[case(Version::GLSL460, false)]
    #[case(Version::GLSL400, false)]
    #[case(Version::GLSL330, true)]
    fn test_version_gated_parameter_name(#[case] version: Version, #[case] ok: bool) {
        let tokens = Lexer::new(Options {
            version,
            ..Default::default()
        })
        .tokenize("void foo(sampler2D sample) { }")
        .unwrap();

        assert_eq!(Parser::new(tokens).parse_translation_unit().is_ok(), ok);
    }
}
