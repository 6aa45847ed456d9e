use std::fmt::{self, Debug, Formatter};

use glslt_lang::{Shared, SharedCell, Token};

/// Read access to the job parameters bound for the current transform call.
///
/// Every clone observes the same binding, so a filter holding one sees
/// parameters bound after it was installed.
pub struct ParameterAccessor<J>(Shared<SharedCell<Option<Shared<J>>>>);

impl<J> ParameterAccessor<J> {
    pub fn get(&self) -> Option<Shared<J>> {
        self.0.borrow().clone()
    }

    pub fn is_bound(&self) -> bool {
        self.0.borrow().is_some()
    }

    pub(crate) fn replace(&self, parameters: Option<Shared<J>>) -> Option<Shared<J>> {
        self.0.replace(parameters)
    }
}

impl<J> Clone for ParameterAccessor<J> {
    fn clone(&self) -> Self {
        Self(Shared::clone(&self.0))
    }
}

impl<J> Default for ParameterAccessor<J> {
    fn default() -> Self {
        Self(Shared::new(SharedCell::new(None)))
    }
}

impl<J: Debug> Debug for ParameterAccessor<J> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ParameterAccessor").field(&self.get()).finish()
    }
}

/// Decides which tokens reach the parser.
///
/// End-of-input tokens are always kept regardless of what the filter says.
pub trait TokenFilter<J> {
    /// Called once when the filter is installed on a transformer.
    fn bind_parameters(&mut self, _parameters: ParameterAccessor<J>) {}

    /// Called before each token stream is filtered.
    fn reset_state(&mut self) {}

    fn is_token_allowed(&mut self, token: &Token) -> bool;
}

/// Keeps the tokens a closure accepts.
pub struct PredicateFilter<F> {
    predicate: F,
}

impl<F> PredicateFilter<F>
where
    F: FnMut(&Token) -> bool,
{
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<J, F> TokenFilter<J> for PredicateFilter<F>
where
    F: FnMut(&Token) -> bool,
{
    fn is_token_allowed(&mut self, token: &Token) -> bool {
        (self.predicate)(token)
    }
}

/// Keeps the tokens a closure accepts, given the bound job parameters.
pub struct ParameterizedFilter<J, F> {
    parameters: ParameterAccessor<J>,
    predicate: F,
}

impl<J, F> ParameterizedFilter<J, F>
where
    F: FnMut(&Token, Option<&J>) -> bool,
{
    pub fn new(predicate: F) -> Self {
        Self {
            parameters: ParameterAccessor::default(),
            predicate,
        }
    }
}

impl<J, F> TokenFilter<J> for ParameterizedFilter<J, F>
where
    F: FnMut(&Token, Option<&J>) -> bool,
{
    fn bind_parameters(&mut self, parameters: ParameterAccessor<J>) {
        self.parameters = parameters;
    }

    fn is_token_allowed(&mut self, token: &Token) -> bool {
        let parameters = self.parameters.get();
        (self.predicate)(token, parameters.as_deref())
    }
}

/// Admits a token only if every inner filter does.
pub struct MultiFilter<J> {
    filters: Vec<Box<dyn TokenFilter<J>>>,
}

impl<J> Default for MultiFilter<J> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
        }
    }
}

impl<J> MultiFilter<J> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: impl TokenFilter<J> + 'static) -> Self {
        self.push(filter);
        self
    }

    pub fn push(&mut self, filter: impl TokenFilter<J> + 'static) {
        self.filters.push(Box::new(filter));
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl<J> TokenFilter<J> for MultiFilter<J> {
    fn bind_parameters(&mut self, parameters: ParameterAccessor<J>) {
        for filter in &mut self.filters {
            filter.bind_parameters(parameters.clone());
        }
    }

    fn reset_state(&mut self) {
        for filter in &mut self.filters {
            filter.reset_state();
        }
    }

    fn is_token_allowed(&mut self, token: &Token) -> bool {
        self.filters
            .iter_mut()
            .all(|filter| filter.is_token_allowed(token))
    }
}
