use super::error::TreeError;
use super::kind::{NodeKind, Role, Shape};
use super::node::Node;

/// Positions in a translation unit where new external declarations can be
/// placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum InjectionPoint {
    /// Before everything, including `#version`.
    BeforeAll,
    /// After the leading directives and empty declarations.
    BeforeDeclarations,
    /// Before the first function definition, or at the end if there is none.
    BeforeFunctions,
    End,
}

impl InjectionPoint {
    /// The index in `unit`'s external declarations that this point refers to.
    pub fn index_in(self, unit: &Node) -> Result<usize, TreeError> {
        if !unit.is(Shape::TranslationUnit) {
            return Err(TreeError::WrongKind {
                expected: Shape::TranslationUnit,
                found: unit.shape(),
            });
        }

        let declarations = unit.children_of(Role::ExternalDeclarations);
        let first = |predicate: fn(&Node) -> bool| {
            declarations
                .iter()
                .position(predicate)
                .unwrap_or(declarations.len())
        };

        Ok(match self {
            InjectionPoint::BeforeAll => 0,
            InjectionPoint::BeforeDeclarations => first(|node| {
                !matches!(
                    &*node.kind(),
                    NodeKind::Directive(_) | NodeKind::EmptyDeclaration
                )
            }),
            InjectionPoint::BeforeFunctions => first(|node| node.is(Shape::FunctionDefinition)),
            InjectionPoint::End => declarations.len(),
        })
    }
}

impl Node {
    /// Inserts `nodes` in order at `point` of this translation unit.
    pub fn inject(
        &self,
        point: InjectionPoint,
        nodes: impl IntoIterator<Item = Node>,
    ) -> Result<(), TreeError> {
        let start = point.index_in(self)?;
        for (offset, node) in nodes.into_iter().enumerate() {
            self.insert_child(Role::ExternalDeclarations, start + offset, node)?;
        }
        tracing::trace!(%point, "injected external declarations");
        Ok(())
    }
}
