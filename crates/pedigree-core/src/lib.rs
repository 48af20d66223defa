#![forbid(unsafe_code)]

//! Family-description parser + pedigree graph builder (headless).
//!
//! Pipeline:
//! - [`parse::parse`] turns free text into a [`ParseResult`] (records + unresolved spans)
//! - [`assistant::parse_with_assistant`] produces the same shape through an external model call
//! - [`build::build`] validates the records and assigns generations, yielding a [`Pedigree`]
//!
//! Layout and drawing live in `pedigree-render`.

pub mod assistant;
pub mod build;
pub mod config;
pub mod error;
pub mod model;
pub mod parse;

pub use assistant::{AssistantConfig, AssistantError, AssistantTransport};
pub use build::build;
pub use config::PedigreeConfig;
pub use error::{Error, Result};
pub use model::{
    Generation, Individual, IndividualRecord, ParentChildEdge, ParseResult, ParseSource,
    Partnership, Pedigree, RelationshipKind, RelationshipRecord, Sex, Status, UnresolvedSpan,
};
pub use parse::{GrammarRegistry, parse};

/// An assistant endpoint together with the transport used to reach it.
#[derive(Clone, Copy)]
pub struct Assistant<'a> {
    pub config: &'a AssistantConfig,
    pub transport: &'a dyn AssistantTransport,
}

impl std::fmt::Debug for Assistant<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("endpoint", &self.config.endpoint)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Engine {
    grammars: GrammarRegistry,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grammars(mut self, grammars: GrammarRegistry) -> Self {
        self.grammars = grammars;
        self
    }

    pub fn grammars(&self) -> &GrammarRegistry {
        &self.grammars
    }

    pub fn grammars_mut(&mut self) -> &mut GrammarRegistry {
        &mut self.grammars
    }

    /// Runs the text grammars only.
    pub fn parse(&self, text: &str) -> Result<ParseResult> {
        parse::parse_with_grammars(text, &self.grammars)
    }

    /// Uses the assistant when one is given and falls back to the text grammars on any
    /// [`AssistantError`]. The two results are never merged.
    pub fn parse_with_fallback(
        &self,
        text: &str,
        assistant: Option<Assistant<'_>>,
    ) -> Result<ParseResult> {
        if text.trim().is_empty() {
            return Err(Error::EmptyInput);
        }
        if let Some(assistant) = assistant {
            match assistant::parse_with_assistant(text, assistant.config, assistant.transport) {
                Ok(result) => return Ok(result),
                Err(err) => {
                    tracing::warn!(error = %err, "assistant parse failed; using text grammars");
                }
            }
        }
        self.parse(text)
    }

    /// Parses and builds in one step.
    pub fn parse_pedigree(&self, text: &str, assistant: Option<Assistant<'_>>) -> Result<Pedigree> {
        let parsed = self.parse_with_fallback(text, assistant)?;
        if !parsed.unresolved.is_empty() {
            tracing::debug!(
                unresolved = parsed.unresolved.len(),
                "some clauses were not understood"
            );
        }
        build(&parsed)
    }
}

#[cfg(test)]
mod tests;
