use glslt_lang::{InjectionPoint, Node, ParseUnit, Root, Shared};

use crate::error::Error;
use crate::transformer::Transformer;

/// Context handed to the transformation of a single transform call.
pub struct Job<'a, J> {
    transformer: &'a Transformer<J>,
    tree: Node,
    root: Root,
}

#[allow(clippy::result_large_err)]
impl<'a, J: 'static> Job<'a, J> {
    pub(crate) fn new(transformer: &'a Transformer<J>, tree: Node, root: Root) -> Self {
        Self {
            transformer,
            tree,
            root,
        }
    }

    /// The translation unit parsed from the input.
    pub fn tree(&self) -> &Node {
        &self.tree
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    pub fn parameters(&self) -> Option<Shared<J>> {
        self.transformer.job_parameters()
    }

    pub fn transformer(&self) -> &'a Transformer<J> {
        self.transformer
    }

    /// Parses an external declaration registered with this job's root. The
    /// result is not placed anywhere in the tree.
    pub fn parse_external_declaration(&self, input: &str) -> Result<Node, Error> {
        self.transformer
            .parse_into(&self.root, input, ParseUnit::ExternalDeclaration)
    }

    /// Parses `input` as a translation unit and moves its external
    /// declarations to `point` of this job's tree.
    pub fn parse_and_inject(&self, point: InjectionPoint, input: &str) -> Result<(), Error> {
        let (_, unit) = self.transformer.parse_separate_translation_unit(input)?;
        let declarations = unit.children();
        for declaration in &declarations {
            declaration.detach()?;
        }

        self.tree.inject(point, declarations)?;
        Ok(())
    }

    pub fn parse_statement(&self, input: &str) -> Result<Node, Error> {
        self.transformer
            .parse_into(&self.root, input, ParseUnit::Statement)
    }

    pub fn parse_expression(&self, input: &str) -> Result<Node, Error> {
        self.transformer
            .parse_into(&self.root, input, ParseUnit::Expression)
    }
}
