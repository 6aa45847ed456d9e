use std::ops::ControlFlow;

use super::kind::{AssignmentOp, BinaryOp, Directive, NodeKind, QualifierKind, UnaryOp};
use super::node::Node;
use crate::literal::Literal;

/// What the walker does after a hook returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisitResult {
    #[default]
    Continue,
    /// Do not descend into this node's children. Its `exit` still runs.
    SkipChildren,
    /// End the walk without calling any further hooks.
    Stop,
}

/// Hooks called by [`walk`]. Every node first gets [`Visitor::enter`], then the
/// hook for its shape, then its children in slot order, then [`Visitor::exit`].
///
/// Shapes without a dedicated hook fall into the hook of their group, so each
/// node reaches exactly one shape hook. All hooks default to
/// [`VisitResult::Continue`].
#[allow(unused_variables)]
pub trait Visitor {
    fn enter(&mut self, node: &Node) -> VisitResult {
        VisitResult::Continue
    }

    fn exit(&mut self, node: &Node) {}

    fn visit_translation_unit(&mut self, node: &Node) -> VisitResult {
        VisitResult::Continue
    }

    fn visit_directive(&mut self, node: &Node, directive: &Directive) -> VisitResult {
        VisitResult::Continue
    }

    /// Empty and declaration wrappers at the top level.
    fn visit_external_declaration(&mut self, node: &Node) -> VisitResult {
        VisitResult::Continue
    }

    fn visit_function_definition(&mut self, node: &Node) -> VisitResult {
        VisitResult::Continue
    }

    fn visit_function_prototype(&mut self, node: &Node) -> VisitResult {
        VisitResult::Continue
    }

    fn visit_function_parameter(&mut self, node: &Node) -> VisitResult {
        VisitResult::Continue
    }

    fn visit_declaration(&mut self, node: &Node) -> VisitResult {
        VisitResult::Continue
    }

    /// Declared variables, struct members and struct declarators.
    fn visit_member(&mut self, node: &Node) -> VisitResult {
        VisitResult::Continue
    }

    /// Type, qualifier list, layout and array specifier nodes.
    fn visit_type(&mut self, node: &Node) -> VisitResult {
        VisitResult::Continue
    }

    fn visit_qualifier(&mut self, node: &Node, qualifier: QualifierKind) -> VisitResult {
        VisitResult::Continue
    }

    fn visit_builtin_type(&mut self, node: &Node, name: &str) -> VisitResult {
        VisitResult::Continue
    }

    fn visit_statement(&mut self, node: &Node) -> VisitResult {
        VisitResult::Continue
    }

    fn visit_reference(&mut self, node: &Node) -> VisitResult {
        VisitResult::Continue
    }

    fn visit_literal(&mut self, node: &Node, literal: &Literal) -> VisitResult {
        VisitResult::Continue
    }

    fn visit_unary(&mut self, node: &Node, op: UnaryOp) -> VisitResult {
        VisitResult::Continue
    }

    fn visit_binary(&mut self, node: &Node, op: BinaryOp) -> VisitResult {
        VisitResult::Continue
    }

    fn visit_assignment(&mut self, node: &Node, op: AssignmentOp) -> VisitResult {
        VisitResult::Continue
    }

    fn visit_function_call(&mut self, node: &Node) -> VisitResult {
        VisitResult::Continue
    }

    /// Conditional, sequence, grouping, access and initializer list expressions.
    fn visit_expression(&mut self, node: &Node) -> VisitResult {
        VisitResult::Continue
    }

    fn visit_identifier(&mut self, node: &Node, name: &str) -> VisitResult {
        VisitResult::Continue
    }
}

/// Walks `node` and its subtree depth first. Returns [`VisitResult::Stop`] if a
/// hook stopped the walk, otherwise [`VisitResult::Continue`].
///
/// Children are collected before they are visited, so hooks may edit the
/// subtree of the node they are called for.
pub fn walk<V: Visitor + ?Sized>(visitor: &mut V, node: &Node) -> VisitResult {
    match walk_node(visitor, node) {
        ControlFlow::Continue(()) => VisitResult::Continue,
        ControlFlow::Break(()) => VisitResult::Stop,
    }
}

fn walk_node<V: Visitor + ?Sized>(visitor: &mut V, node: &Node) -> ControlFlow<()> {
    let mut result = visitor.enter(node);
    if result == VisitResult::Continue {
        result = dispatch(visitor, node);
    }

    match result {
        VisitResult::Stop => return ControlFlow::Break(()),
        VisitResult::SkipChildren => {}
        VisitResult::Continue => {
            for child in node.children() {
                walk_node(visitor, &child)?;
            }
        }
    }

    visitor.exit(node);
    ControlFlow::Continue(())
}

fn dispatch<V: Visitor + ?Sized>(visitor: &mut V, node: &Node) -> VisitResult {
    // Hooks may change the node's kind, so the borrow ends here.
    let kind = node.kind().clone();

    match kind {
        NodeKind::TranslationUnit => visitor.visit_translation_unit(node),
        NodeKind::Directive(directive) => visitor.visit_directive(node, &directive),
        NodeKind::EmptyDeclaration | NodeKind::DeclarationExternalDeclaration => {
            visitor.visit_external_declaration(node)
        }
        NodeKind::FunctionDefinition => visitor.visit_function_definition(node),
        NodeKind::FunctionPrototype => visitor.visit_function_prototype(node),
        NodeKind::FunctionParameter => visitor.visit_function_parameter(node),
        NodeKind::FunctionDeclaration
        | NodeKind::TypeAndInitDeclaration
        | NodeKind::InterfaceBlockDeclaration
        | NodeKind::PrecisionDeclaration
        | NodeKind::TypeQualifierDeclaration => visitor.visit_declaration(node),
        NodeKind::DeclarationMember | NodeKind::StructMember | NodeKind::StructDeclarator => {
            visitor.visit_member(node)
        }
        NodeKind::FullySpecifiedType
        | NodeKind::TypeQualifier
        | NodeKind::LayoutQualifier
        | NodeKind::LayoutQualifierPart
        | NodeKind::TypeReference
        | NodeKind::StructSpecifier
        | NodeKind::ArraySpecifier
        | NodeKind::UnsizedDimension => visitor.visit_type(node),
        NodeKind::Qualifier(qualifier) => visitor.visit_qualifier(node, qualifier),
        NodeKind::BuiltinTypeSpecifier(name) => visitor.visit_builtin_type(node, &name),
        NodeKind::CompoundStatement
        | NodeKind::DeclarationStatement
        | NodeKind::ExpressionStatement
        | NodeKind::EmptyStatement
        | NodeKind::SelectionStatement
        | NodeKind::ForStatement
        | NodeKind::WhileStatement
        | NodeKind::DoWhileStatement
        | NodeKind::SwitchStatement
        | NodeKind::CaseLabel
        | NodeKind::DefaultLabel
        | NodeKind::ReturnStatement
        | NodeKind::BreakStatement
        | NodeKind::ContinueStatement
        | NodeKind::DiscardStatement => visitor.visit_statement(node),
        NodeKind::ReferenceExpression => visitor.visit_reference(node),
        NodeKind::LiteralExpression(literal) => visitor.visit_literal(node, &literal),
        NodeKind::UnaryExpression(op) => visitor.visit_unary(node, op),
        NodeKind::BinaryExpression(op) => visitor.visit_binary(node, op),
        NodeKind::AssignmentExpression(op) => visitor.visit_assignment(node, op),
        NodeKind::FunctionCallExpression => visitor.visit_function_call(node),
        NodeKind::ConditionalExpression
        | NodeKind::SequenceExpression
        | NodeKind::GroupingExpression
        | NodeKind::ArrayAccessExpression
        | NodeKind::MemberAccessExpression
        | NodeKind::InitializerList => visitor.visit_expression(node),
        NodeKind::Identifier(name) => visitor.visit_identifier(node, &name),
    }
}

impl Node {
    /// Walks this node's subtree with `visitor`. See [`walk`].
    pub fn walk<V: Visitor + ?Sized>(&self, visitor: &mut V) -> VisitResult {
        walk(visitor, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::kind::Shape;
    use crate::frontend::Frontend;
    use crate::root::Root;
    use rstest::rstest;

    fn parse(code: &str) -> Node {
        Frontend::default()
            .parse_translation_unit(&Root::default(), code)
            .unwrap()
    }

    #[derive(Default)]
    struct Trace {
        events: Vec<String>,
    }

    impl Visitor for Trace {
        fn enter(&mut self, node: &Node) -> VisitResult {
            self.events.push(format!("+{}", node.shape()));
            VisitResult::Continue
        }

        fn exit(&mut self, node: &Node) {
            self.events.push(format!("-{}", node.shape()));
        }
    }

    #[test]
    fn test_enter_and_exit_nest() {
        let root = Root::default();
        Frontend::default()
            .parse_translation_unit(&root, "void main() { x = 1; }")
            .unwrap();
        let expression = root.exactly_one_of_type(Shape::ExpressionStatement).unwrap();
        let mut trace = Trace::default();

        assert_eq!(expression.walk(&mut trace), VisitResult::Continue);

        assert_eq!(
            trace.events,
            vec![
                "+ExpressionStatement",
                "+AssignmentExpression",
                "+ReferenceExpression",
                "+Identifier",
                "-Identifier",
                "-ReferenceExpression",
                "+LiteralExpression",
                "-LiteralExpression",
                "-AssignmentExpression",
                "-ExpressionStatement",
            ]
        );
    }

    #[rstest]
    #[case("int a;")]
    #[case("#version 330\nlayout(location = 0) out vec4 c[2];")]
    #[case("struct L { vec3 c; } l; void main() { for (int i = 0; i < 2; i++) { l.c[i] = -f(i, 1.0); } }")]
    fn test_every_node_is_entered_once(#[case] code: &str) {
        let tree = parse(code);
        let mut trace = Trace::default();

        walk(&mut trace, &tree);

        let enters = trace.events.iter().filter(|e| e.starts_with('+')).count();
        let exits = trace.events.iter().filter(|e| e.starts_with('-')).count();
        assert_eq!(enters, tree.subtree().len());
        assert_eq!(exits, enters);
    }

    #[derive(Default)]
    struct Collect {
        identifiers: Vec<String>,
        literals: Vec<String>,
        binary: Vec<BinaryOp>,
        calls: usize,
        statements: usize,
    }

    impl Visitor for Collect {
        fn visit_identifier(&mut self, _node: &Node, name: &str) -> VisitResult {
            self.identifiers.push(name.to_string());
            VisitResult::Continue
        }

        fn visit_literal(&mut self, _node: &Node, literal: &Literal) -> VisitResult {
            self.literals.push(literal.to_string());
            VisitResult::Continue
        }

        fn visit_binary(&mut self, _node: &Node, op: BinaryOp) -> VisitResult {
            self.binary.push(op);
            VisitResult::Continue
        }

        fn visit_function_call(&mut self, _node: &Node) -> VisitResult {
            self.calls += 1;
            VisitResult::Continue
        }

        fn visit_statement(&mut self, _node: &Node) -> VisitResult {
            self.statements += 1;
            VisitResult::Continue
        }
    }

    #[test]
    fn test_shape_hooks_receive_payloads() {
        let tree = parse("int a = b + 2; void main() { g(a * 0x3); return; }");
        let mut collect = Collect::default();

        tree.walk(&mut collect);

        assert_eq!(collect.identifiers, vec!["a", "b", "main", "g", "a"]);
        assert_eq!(collect.literals, vec!["2", "0x3"]);
        assert_eq!(collect.binary, vec![BinaryOp::Add, BinaryOp::Multiply]);
        assert_eq!(collect.calls, 1);
        assert_eq!(collect.statements, 3);
    }

    struct SkipFunctions(Vec<String>);

    impl Visitor for SkipFunctions {
        fn visit_function_definition(&mut self, _node: &Node) -> VisitResult {
            VisitResult::SkipChildren
        }

        fn visit_identifier(&mut self, _node: &Node, name: &str) -> VisitResult {
            self.0.push(name.to_string());
            VisitResult::Continue
        }
    }

    #[test]
    fn test_skip_children() {
        let tree = parse("int a; void f() { int b; } int c;");
        let mut visitor = SkipFunctions(Vec::new());

        assert_eq!(walk(&mut visitor, &tree), VisitResult::Continue);
        assert_eq!(visitor.0, vec!["a", "c"]);
    }

    struct FindFirst {
        name: &'static str,
        found: Option<Node>,
        exits: usize,
    }

    impl Visitor for FindFirst {
        fn exit(&mut self, _node: &Node) {
            self.exits += 1;
        }

        fn visit_identifier(&mut self, node: &Node, name: &str) -> VisitResult {
            if name == self.name {
                self.found = Some(node.clone());
                VisitResult::Stop
            } else {
                VisitResult::Continue
            }
        }
    }

    #[test]
    fn test_stop_ends_the_walk() {
        let tree = parse("int a; int b; int c;");
        let mut visitor = FindFirst {
            name: "b",
            found: None,
            exits: 0,
        };

        assert_eq!(tree.walk(&mut visitor), VisitResult::Stop);

        let found = visitor.found.unwrap();
        assert_eq!(found.name().as_deref(), Some("b"));
        // Only the first declaration finished before the walk stopped.
        assert_eq!(visitor.exits, tree.children()[0].subtree().len());
    }

    struct Rename;

    impl Visitor for Rename {
        fn visit_identifier(&mut self, node: &Node, name: &str) -> VisitResult {
            if name == "a" {
                node.set_name("renamed").unwrap();
            }
            VisitResult::Continue
        }
    }

    #[test]
    fn test_hooks_may_edit_the_tree() {
        let root = Root::default();
        let tree = Frontend::default()
            .parse_translation_unit(&root, "int a = a + 1;")
            .unwrap();

        tree.walk(&mut Rename);

        assert!(!root.has_identifier("a"));
        assert_eq!(root.all_named("renamed").len(), 2);
    }
}
