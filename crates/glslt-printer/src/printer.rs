use glslt_lang::{Node, NodeKind, Role, Shape};

use crate::PrintType;

// Binding strength of expression forms; a child printed where a stronger
// form is required gets parentheses.
const SEQUENCE: u8 = 0;
const ASSIGNMENT: u8 = 1;
const CONDITIONAL: u8 = 2;
const PREFIX: u8 = 14;
const POSTFIX: u8 = 15;
const PRIMARY: u8 = 16;

#[derive(Clone, Debug)]
pub struct PrinterConfig {
    pub indent_width: usize,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self { indent_width: 4 }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Printer {
    config: PrinterConfig,
    print_type: PrintType,
    output: String,
    current_line: u32,
}

impl Printer {
    pub fn new(config: Option<PrinterConfig>) -> Self {
        Self {
            config: config.unwrap_or_default(),
            print_type: PrintType::default(),
            output: String::new(),
            current_line: 1,
        }
    }

    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    /// Prints `node` and everything below it.
    ///
    /// External declarations and statements are followed by their separator
    /// (a space in compact mode, a newline otherwise); any other node prints
    /// as a bare fragment.
    pub fn print(&mut self, node: &Node, print_type: PrintType) -> String {
        self.output.clear();
        self.print_type = print_type;
        self.current_line = 1;

        let shape = node.shape();
        if shape == Shape::TranslationUnit {
            self.format_translation_unit(node);
        } else if shape.is_external_declaration() || shape.is_statement() {
            self.format_node(node, 0);
            self.append_terminator(node);
        } else {
            self.format_node(node, 0);
        }

        tracing::trace!(id = %node.id(), ?print_type, len = self.output.len(), "printed");
        std::mem::take(&mut self.output)
    }

    fn is_compact(&self) -> bool {
        self.print_type == PrintType::Compact
    }

    fn format_translation_unit(&mut self, node: &Node) {
        for declaration in node.children() {
            if self.print_type == PrintType::IndentedAnnotated {
                self.append_line_annotation(&declaration);
            }

            let start = self.output.len();
            self.format_node(&declaration, 0);
            self.append_terminator(&declaration);

            let line_directive = match &*declaration.kind() {
                NodeKind::Directive(directive) => directive.line_number(),
                _ => None,
            };
            match line_directive {
                Some(line) => self.current_line = line,
                None => {
                    let printed = self.output[start..].matches('\n').count();
                    self.current_line += printed as u32;
                }
            }
        }
    }

    fn append_line_annotation(&mut self, declaration: &Node) {
        if declaration.is(Shape::Directive) {
            return;
        }

        if let Some(line) = declaration.line() {
            if line != self.current_line {
                self.output.push_str(&format!("#line {line}\n"));
                self.current_line = line;
            }
        }
    }

    fn append_terminator(&mut self, node: &Node) {
        if node.is(Shape::Directive) || !self.is_compact() {
            self.output.push('\n');
        } else {
            self.output.push(' ');
        }
    }

    fn append_indent(&mut self, level: usize) {
        self.output
            .push_str(&" ".repeat(level * self.config.indent_width));
    }

    fn append_space(&mut self) {
        self.output.push(' ');
    }

    fn format_node(&mut self, node: &Node, indent_level: usize) {
        let kind = node.kind().clone();

        match kind {
            NodeKind::TranslationUnit => self.format_translation_unit(node),
            NodeKind::Directive(directive) => self.output.push_str(&directive.to_string()),
            NodeKind::EmptyDeclaration | NodeKind::EmptyStatement => self.output.push(';'),
            NodeKind::DeclarationExternalDeclaration | NodeKind::DeclarationStatement => {
                self.format_child(node, Role::Declaration, indent_level);
            }
            NodeKind::FunctionDefinition => {
                self.format_child(node, Role::Prototype, indent_level);
                self.append_space();
                self.format_child(node, Role::Body, indent_level);
            }
            NodeKind::FunctionDeclaration => {
                self.format_child(node, Role::Prototype, indent_level);
                self.output.push(';');
            }
            NodeKind::FunctionPrototype => {
                self.format_child(node, Role::ReturnType, indent_level);
                self.append_space();
                self.format_child(node, Role::Name, indent_level);
                self.output.push('(');
                self.format_list(&node.children_of(Role::Parameters), ", ", indent_level);
                self.output.push(')');
            }
            NodeKind::FunctionParameter => {
                self.format_child(node, Role::Type, indent_level);
                if let Some(name) = node.child(Role::Name) {
                    self.append_space();
                    self.format_node(&name, indent_level);
                }
                self.format_child(node, Role::ArraySpecifier, indent_level);
            }
            NodeKind::TypeAndInitDeclaration => {
                self.format_child(node, Role::Type, indent_level);
                let members = node.children_of(Role::Members);
                if !members.is_empty() {
                    self.append_space();
                    self.format_list(&members, ", ", indent_level);
                }
                self.output.push(';');
            }
            NodeKind::DeclarationMember => {
                self.format_child(node, Role::Name, indent_level);
                self.format_child(node, Role::ArraySpecifier, indent_level);
                if let Some(initializer) = node.child(Role::Initializer) {
                    self.output.push_str(" = ");
                    self.format_expression(&initializer, ASSIGNMENT, indent_level);
                }
            }
            NodeKind::InterfaceBlockDeclaration => {
                self.format_child(node, Role::Qualifier, indent_level);
                self.append_space();
                self.format_child(node, Role::Name, indent_level);
                self.append_space();
                self.format_block(&node.children_of(Role::Members), indent_level);
                if let Some(instance) = node.child(Role::InstanceName) {
                    self.append_space();
                    self.format_node(&instance, indent_level);
                    self.format_child(node, Role::ArraySpecifier, indent_level);
                }
                self.output.push(';');
            }
            NodeKind::PrecisionDeclaration => {
                self.output.push_str("precision ");
                self.format_child(node, Role::Type, indent_level);
                self.output.push(';');
            }
            NodeKind::TypeQualifierDeclaration => {
                self.format_child(node, Role::Qualifier, indent_level);
                let names = node.children_of(Role::Names);
                if !names.is_empty() {
                    self.append_space();
                    self.format_list(&names, ", ", indent_level);
                }
                self.output.push(';');
            }
            NodeKind::FullySpecifiedType => {
                if let Some(qualifier) = node.child(Role::Qualifier) {
                    self.format_node(&qualifier, indent_level);
                    self.append_space();
                }
                self.format_child(node, Role::Specifier, indent_level);
            }
            NodeKind::TypeQualifier => {
                self.format_list(&node.children_of(Role::Parts), " ", indent_level);
            }
            NodeKind::Qualifier(qualifier) => self.output.push_str(qualifier.as_str()),
            NodeKind::LayoutQualifier => {
                self.output.push_str("layout(");
                self.format_list(&node.children_of(Role::Parts), ", ", indent_level);
                self.output.push(')');
            }
            NodeKind::LayoutQualifierPart => {
                self.format_child(node, Role::Name, indent_level);
                if let Some(value) = node.child(Role::Value) {
                    self.output.push_str(" = ");
                    self.format_expression(&value, CONDITIONAL, indent_level);
                }
            }
            NodeKind::BuiltinTypeSpecifier(name) => {
                self.output.push_str(&name);
                self.format_child(node, Role::ArraySpecifier, indent_level);
            }
            NodeKind::TypeReference | NodeKind::StructDeclarator => {
                self.format_child(node, Role::Name, indent_level);
                self.format_child(node, Role::ArraySpecifier, indent_level);
            }
            NodeKind::StructSpecifier => {
                self.output.push_str("struct ");
                if let Some(name) = node.child(Role::Name) {
                    self.format_node(&name, indent_level);
                    self.append_space();
                }
                self.format_block(&node.children_of(Role::Members), indent_level);
                self.format_child(node, Role::ArraySpecifier, indent_level);
            }
            NodeKind::StructMember => {
                self.format_child(node, Role::Type, indent_level);
                self.append_space();
                self.format_list(&node.children_of(Role::Declarators), ", ", indent_level);
                self.output.push(';');
            }
            NodeKind::ArraySpecifier => {
                for dimension in node.children_of(Role::Dimensions) {
                    self.output.push('[');
                    if !dimension.is(Shape::UnsizedDimension) {
                        self.format_expression(&dimension, CONDITIONAL, indent_level);
                    }
                    self.output.push(']');
                }
            }
            NodeKind::UnsizedDimension => {}
            NodeKind::CompoundStatement => {
                self.format_block(&node.children_of(Role::Statements), indent_level);
            }
            NodeKind::ExpressionStatement => {
                self.format_child_expression(node, Role::Expression, SEQUENCE, indent_level);
                self.output.push(';');
            }
            NodeKind::SelectionStatement => {
                self.output.push_str("if (");
                self.format_child_expression(node, Role::Condition, SEQUENCE, indent_level);
                self.output.push_str(") ");
                self.format_child(node, Role::Then, indent_level);
                if let Some(otherwise) = node.child(Role::Else) {
                    self.output.push_str(" else ");
                    self.format_node(&otherwise, indent_level);
                }
            }
            NodeKind::ForStatement => {
                self.output.push_str("for (");
                match node.child(Role::Init) {
                    Some(init) => self.format_node(&init, indent_level),
                    None => self.output.push(';'),
                }
                if let Some(condition) = node.child(Role::Condition) {
                    self.append_space();
                    self.format_expression(&condition, SEQUENCE, indent_level);
                }
                self.output.push(';');
                if let Some(update) = node.child(Role::Update) {
                    self.append_space();
                    self.format_expression(&update, SEQUENCE, indent_level);
                }
                self.output.push_str(") ");
                self.format_child(node, Role::Body, indent_level);
            }
            NodeKind::WhileStatement => {
                self.output.push_str("while (");
                self.format_child_expression(node, Role::Condition, SEQUENCE, indent_level);
                self.output.push_str(") ");
                self.format_child(node, Role::Body, indent_level);
            }
            NodeKind::DoWhileStatement => {
                self.output.push_str("do ");
                self.format_child(node, Role::Body, indent_level);
                self.output.push_str(" while (");
                self.format_child_expression(node, Role::Condition, SEQUENCE, indent_level);
                self.output.push_str(");");
            }
            NodeKind::SwitchStatement => {
                self.output.push_str("switch (");
                self.format_child_expression(node, Role::Condition, SEQUENCE, indent_level);
                self.output.push_str(") ");
                self.format_child(node, Role::Body, indent_level);
            }
            NodeKind::CaseLabel => {
                self.output.push_str("case ");
                self.format_child_expression(node, Role::Expression, SEQUENCE, indent_level);
                self.output.push(':');
            }
            NodeKind::DefaultLabel => self.output.push_str("default:"),
            NodeKind::ReturnStatement => {
                self.output.push_str("return");
                if let Some(value) = node.child(Role::Expression) {
                    self.append_space();
                    self.format_expression(&value, SEQUENCE, indent_level);
                }
                self.output.push(';');
            }
            NodeKind::BreakStatement => self.output.push_str("break;"),
            NodeKind::ContinueStatement => self.output.push_str("continue;"),
            NodeKind::DiscardStatement => self.output.push_str("discard;"),
            NodeKind::Identifier(name) => self.output.push_str(&name),
            NodeKind::ReferenceExpression
            | NodeKind::LiteralExpression(_)
            | NodeKind::UnaryExpression(_)
            | NodeKind::BinaryExpression(_)
            | NodeKind::AssignmentExpression(_)
            | NodeKind::ConditionalExpression
            | NodeKind::SequenceExpression
            | NodeKind::GroupingExpression
            | NodeKind::ArrayAccessExpression
            | NodeKind::MemberAccessExpression
            | NodeKind::FunctionCallExpression
            | NodeKind::InitializerList => self.format_expression(node, SEQUENCE, indent_level),
        }
    }

    fn format_child(&mut self, node: &Node, role: Role, indent_level: usize) {
        if let Some(child) = node.child(role) {
            self.format_node(&child, indent_level);
        }
    }

    fn format_child_expression(&mut self, node: &Node, role: Role, min: u8, indent_level: usize) {
        if let Some(child) = node.child(role) {
            self.format_expression(&child, min, indent_level);
        }
    }

    fn format_list(&mut self, nodes: &[Node], separator: &str, indent_level: usize) {
        for (i, node) in nodes.iter().enumerate() {
            if i > 0 {
                self.output.push_str(separator);
            }
            self.format_node(node, indent_level);
        }
    }

    fn format_block(&mut self, items: &[Node], indent_level: usize) {
        if self.is_compact() {
            self.output.push_str("{ ");
            for item in items {
                self.format_node(item, indent_level);
                self.append_space();
            }
            self.output.push('}');
            return;
        }

        self.output.push_str("{\n");
        for item in items {
            self.append_indent(indent_level + 1);
            self.format_node(item, indent_level + 1);
            self.output.push('\n');
        }
        self.append_indent(indent_level);
        self.output.push('}');
    }

    fn format_expression(&mut self, node: &Node, min: u8, indent_level: usize) {
        if !node.shape().is_expression() {
            self.format_node(node, indent_level);
            return;
        }

        let parenthesize = precedence(node) < min;
        if parenthesize {
            self.output.push('(');
        }

        let kind = node.kind().clone();
        match kind {
            NodeKind::ReferenceExpression => self.format_child(node, Role::Name, indent_level),
            NodeKind::LiteralExpression(literal) => self.output.push_str(&literal.to_string()),
            NodeKind::UnaryExpression(op) if op.is_postfix() => {
                self.format_child_expression(node, Role::Operand, POSTFIX, indent_level);
                self.output.push_str(op.symbol());
            }
            NodeKind::UnaryExpression(op) => {
                self.output.push_str(op.symbol());
                let start = self.output.len();
                self.format_child_expression(node, Role::Operand, PREFIX, indent_level);

                // `- -a` must not fuse into a decrement.
                let fused = op
                    .symbol()
                    .chars()
                    .last()
                    .zip(self.output[start..].chars().next())
                    .is_some_and(|(last, next)| last == next && matches!(last, '+' | '-'));
                if fused {
                    self.output.insert(start, ' ');
                }
            }
            NodeKind::BinaryExpression(op) => {
                let strength = CONDITIONAL + op.precedence();
                self.format_child_expression(node, Role::Left, strength, indent_level);
                self.output.push(' ');
                self.output.push_str(op.symbol());
                self.output.push(' ');
                self.format_child_expression(node, Role::Right, strength + 1, indent_level);
            }
            NodeKind::AssignmentExpression(op) => {
                self.format_child_expression(node, Role::Left, PREFIX, indent_level);
                self.output.push(' ');
                self.output.push_str(op.symbol());
                self.output.push(' ');
                self.format_child_expression(node, Role::Right, ASSIGNMENT, indent_level);
            }
            NodeKind::ConditionalExpression => {
                self.format_child_expression(node, Role::Condition, CONDITIONAL + 1, indent_level);
                self.output.push_str(" ? ");
                self.format_child_expression(node, Role::TrueBranch, SEQUENCE, indent_level);
                self.output.push_str(" : ");
                self.format_child_expression(node, Role::FalseBranch, ASSIGNMENT, indent_level);
            }
            NodeKind::SequenceExpression => {
                self.format_expressions(&node.children_of(Role::Expressions), indent_level);
            }
            NodeKind::GroupingExpression => {
                self.output.push('(');
                self.format_child_expression(node, Role::Expression, SEQUENCE, indent_level);
                self.output.push(')');
            }
            NodeKind::ArrayAccessExpression => {
                self.format_child_expression(node, Role::Operand, POSTFIX, indent_level);
                self.output.push('[');
                self.format_child_expression(node, Role::Index, SEQUENCE, indent_level);
                self.output.push(']');
            }
            NodeKind::MemberAccessExpression => {
                self.format_child_expression(node, Role::Operand, POSTFIX, indent_level);
                self.output.push('.');
                self.format_child(node, Role::Member, indent_level);
            }
            NodeKind::FunctionCallExpression => {
                self.format_child_expression(node, Role::Callee, POSTFIX, indent_level);
                self.output.push('(');
                self.format_expressions(&node.children_of(Role::Arguments), indent_level);
                self.output.push(')');
            }
            NodeKind::InitializerList => {
                self.output.push('{');
                self.format_expressions(&node.children_of(Role::Expressions), indent_level);
                self.output.push('}');
            }
            _ => self.format_node(node, indent_level),
        }

        if parenthesize {
            self.output.push(')');
        }
    }

    fn format_expressions(&mut self, expressions: &[Node], indent_level: usize) {
        for (i, expression) in expressions.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            self.format_expression(expression, ASSIGNMENT, indent_level);
        }
    }
}

fn precedence(node: &Node) -> u8 {
    match &*node.kind() {
        NodeKind::SequenceExpression => SEQUENCE,
        NodeKind::AssignmentExpression(_) => ASSIGNMENT,
        NodeKind::ConditionalExpression => CONDITIONAL,
        NodeKind::BinaryExpression(op) => CONDITIONAL + op.precedence(),
        NodeKind::UnaryExpression(op) if op.is_postfix() => POSTFIX,
        NodeKind::UnaryExpression(_) => PREFIX,
        NodeKind::LiteralExpression(literal) if literal.is_negative() => PREFIX,
        NodeKind::ArrayAccessExpression
        | NodeKind::MemberAccessExpression
        | NodeKind::FunctionCallExpression => POSTFIX,
        _ => PRIMARY,
    }
}
