use std::cell::Cell;
use std::fmt::{self, Debug, Formatter};

use glslt_lang::{
    Frontend, Node, ParseErrorListener, ParseUnit, ParserOptions, Root, RootSupplier, Shared,
    SharedCell, Token,
};
use glslt_printer::{PrintType, Printer, PrinterConfig};
use scopeguard::ScopeGuard;

use crate::error::Error;
use crate::filter::{ParameterAccessor, TokenFilter};
use crate::job::Job;

/// Progress of the most recent transform call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display)]
pub enum State {
    #[default]
    Idle,
    Parsing,
    Built,
    Transforming,
    Printing,
    Done,
    Failed,
}

type Transformation<J> = Box<dyn Fn(&Job<'_, J>) -> Result<(), Error>>;

/// Parses a translation unit, runs a transformation over it and prints the
/// result.
///
/// `J` is the type of the per-call job parameters; use `()` when there are
/// none.
pub struct Transformer<J = ()> {
    frontend: Frontend,
    print_type: PrintType,
    printer_config: PrinterConfig,
    root_supplier: RootSupplier,
    transformation: Transformation<J>,
    token_filter: SharedCell<Option<Box<dyn TokenFilter<J>>>>,
    parameters: ParameterAccessor<J>,
    state: Cell<State>,
}

impl<J> Debug for Transformer<J> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer")
            .field("frontend", &self.frontend)
            .field("print_type", &self.print_type)
            .field("root_supplier", &self.root_supplier)
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}

impl<J: 'static> Default for Transformer<J> {
    fn default() -> Self {
        Self::new(|_| Ok(()))
    }
}

#[allow(clippy::result_large_err)]
impl<J: 'static> Transformer<J> {
    pub fn new(transformation: impl Fn(&Job<'_, J>) -> Result<(), Error> + 'static) -> Self {
        Self {
            frontend: Frontend::default(),
            print_type: PrintType::default(),
            printer_config: PrinterConfig::default(),
            root_supplier: RootSupplier::DEFAULT,
            transformation: Box::new(transformation),
            token_filter: SharedCell::new(None),
            parameters: ParameterAccessor::default(),
            state: Cell::new(State::Idle),
        }
    }

    pub fn set_transformation(
        &mut self,
        transformation: impl Fn(&Job<'_, J>) -> Result<(), Error> + 'static,
    ) {
        self.transformation = Box::new(transformation);
    }

    pub fn print_type(&self) -> PrintType {
        self.print_type
    }

    pub fn set_print_type(&mut self, print_type: PrintType) {
        self.print_type = print_type;
    }

    pub fn printer_config(&self) -> &PrinterConfig {
        &self.printer_config
    }

    pub fn set_printer_config(&mut self, config: PrinterConfig) {
        self.printer_config = config;
    }

    pub fn root_supplier(&self) -> RootSupplier {
        self.root_supplier
    }

    pub fn set_root_supplier(&mut self, supplier: RootSupplier) {
        self.root_supplier = supplier;
    }

    pub fn supply_root(&self) -> Root {
        self.root_supplier.supply()
    }

    pub fn parser_options(&self) -> &ParserOptions {
        self.frontend.options()
    }

    pub fn set_parser_options(&mut self, options: ParserOptions) {
        self.frontend.set_options(options);
    }

    pub fn add_error_listener(&mut self, listener: impl ParseErrorListener + 'static) {
        self.frontend.add_error_listener(listener);
    }

    /// Installs a filter between the lexer and the parser and gives it access
    /// to the job parameters.
    pub fn set_token_filter(&mut self, filter: impl TokenFilter<J> + 'static) {
        let mut filter: Box<dyn TokenFilter<J>> = Box::new(filter);
        filter.bind_parameters(self.parameters.clone());
        *self.token_filter.get_mut() = Some(filter);
    }

    pub fn clear_token_filter(&mut self) {
        *self.token_filter.get_mut() = None;
    }

    pub fn state(&self) -> State {
        self.state.get()
    }

    fn set_state(&self, state: State) {
        tracing::debug!(from = %self.state.get(), to = %state, "pipeline state");
        self.state.set(state);
    }

    /// The parameters bound for the current call, if any.
    pub fn job_parameters(&self) -> Option<Shared<J>> {
        self.parameters.get()
    }

    /// Runs `f` with `parameters` bound. The previous binding is restored when
    /// `f` returns or unwinds.
    pub fn with_job_parameters<T>(&self, parameters: J, f: impl FnOnce(&Self) -> T) -> T {
        let previous = self.parameters.replace(Some(Shared::new(parameters)));
        let accessor = self.parameters.clone();
        scopeguard::defer! {
            accessor.replace(previous);
        }
        f(self)
    }

    pub fn transform(&self, input: &str) -> Result<String, Error> {
        self.transform_with(self.root_supplier, input)
    }

    pub fn transform_with_parameters(&self, input: &str, parameters: J) -> Result<String, Error> {
        self.with_job_parameters(parameters, |transformer| transformer.transform(input))
    }

    /// Transforms `input` under a fresh root made by `supplier`.
    ///
    /// Any early return or unwind leaves the state at [`State::Failed`].
    pub fn transform_with(&self, supplier: RootSupplier, input: &str) -> Result<String, Error> {
        let failed = scopeguard::guard(self, |transformer| transformer.set_state(State::Failed));

        self.set_state(State::Parsing);
        let root = supplier.supply();
        let tree = self.parse_into(&root, input, ParseUnit::TranslationUnit)?;
        self.set_state(State::Built);

        self.set_state(State::Transforming);
        let job = Job::new(self, tree, root.clone());
        (self.transformation)(&job)
            .inspect_err(|error| tracing::debug!(%error, "transformation failed"))?;

        self.set_state(State::Printing);
        let output = root
            .tree()
            .map(|tree| self.print(&tree))
            .unwrap_or_default();

        let _ = ScopeGuard::into_inner(failed);
        self.set_state(State::Done);

        Ok(output)
    }

    pub fn print(&self, node: &Node) -> String {
        Printer::new(Some(self.printer_config.clone())).print(node, self.print_type)
    }

    /// Lexes, filters and parses `input` into `root`.
    pub fn parse_into(&self, root: &Root, input: &str, unit: ParseUnit) -> Result<Node, Error> {
        let tokens = self.frontend.tokenize(input)?;
        let tokens = self.filter_tokens(tokens);
        Ok(self.frontend.parse_tokens(root, input, tokens, unit)?)
    }

    fn filter_tokens(&self, tokens: Vec<Token>) -> Vec<Token> {
        let mut filter = self.token_filter.borrow_mut();
        let Some(filter) = filter.as_mut() else {
            return tokens;
        };

        filter.reset_state();
        let before = tokens.len();
        let tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|token| token.is_eof() || filter.is_token_allowed(token))
            .collect();
        tracing::debug!(removed = before - tokens.len(), "filtered tokens");

        tokens
    }

    fn parse_separate(&self, input: &str, unit: ParseUnit) -> Result<(Root, Node), Error> {
        let root = self.supply_root();
        let node = self.parse_into(&root, input, unit)?;
        Ok((root, node))
    }

    /// Parses `input` into a new root from the configured supplier. Attaching
    /// the result to another tree moves it into that tree's root.
    pub fn parse_separate_translation_unit(&self, input: &str) -> Result<(Root, Node), Error> {
        self.parse_separate(input, ParseUnit::TranslationUnit)
    }

    pub fn parse_separate_external_declaration(
        &self,
        input: &str,
    ) -> Result<(Root, Node), Error> {
        self.parse_separate(input, ParseUnit::ExternalDeclaration)
    }

    pub fn parse_separate_expression(&self, input: &str) -> Result<(Root, Node), Error> {
        self.parse_separate(input, ParseUnit::Expression)
    }

    pub fn parse_separate_statement(&self, input: &str) -> Result<(Root, Node), Error> {
        self.parse_separate(input, ParseUnit::Statement)
    }
}
