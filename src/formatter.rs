//! The top-level report formatter.

use alloc::{format, string::String, vec::Vec};

use crate::{
    Failure, NEWLINE,
    extractor::ChainExtractor,
    registry::{RuleDescriptor, RuleRegistry, RegistrationError},
    rule::{RenderingRule, RuleError, RuleRef, RuleTemplate},
    template::{TemplateEngine, TemplateError},
};

/// Renders a failure and everything nested below it into one report.
///
/// Every failure in the chain is rendered by the most specific rule
/// registered for its type, innermost failure first. A rule that fails never
/// aborts the report: its entry is replaced by an annotated rendering of both
/// the rule's error and the original failure through the default rule.
///
/// # Examples
///
/// ```
/// use faultline::{ChainFormatter, failures::BasicFailure};
///
/// let failure = BasicFailure::new("could not load profile")
///     .with_cause(BasicFailure::new("connection refused"));
///
/// let report = ChainFormatter::new().format(&failure);
/// assert_eq!(
///     report.lines().collect::<Vec<_>>(),
///     ["[Failure: connection refused]", "[Failure: could not load profile]"]
/// );
/// ```
#[derive(Debug, Default)]
pub struct ChainFormatter {
    extractor: ChainExtractor,
    registry: RuleRegistry,
    engine: TemplateEngine,
}

impl ChainFormatter {
    /// Creates a formatter with only the default rule and the default
    /// template.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a formatter with the default rule plus every described rule.
    pub fn create<I>(descriptors: I) -> Result<Self, RegistrationError>
    where
        I: IntoIterator<Item = RuleDescriptor>,
    {
        let mut formatter = Self::new();
        formatter.registry.register_all(descriptors)?;
        Ok(formatter)
    }

    /// Registers a rule. See [`RuleRegistry::add_rule`].
    pub fn add_rule<R: RenderingRule>(mut self, rule: R) -> Result<Self, RegistrationError> {
        self.registry.add_rule(rule)?;
        Ok(self)
    }

    /// Registers a default-constructed rule of type `R`.
    pub fn add_rule_type<R: RenderingRule + Default>(mut self) -> Result<Self, RegistrationError> {
        self.registry.add_rule_type::<R>()?;
        Ok(self)
    }

    /// Registers a template. See [`RuleRegistry::add_template`].
    pub fn add_template<T: RuleTemplate>(mut self, template: T) -> Result<Self, RegistrationError> {
        self.registry.add_template(template)?;
        Ok(self)
    }

    /// Registers a default-constructed template of type `T`.
    pub fn add_template_type<T: RuleTemplate + Default>(
        mut self,
    ) -> Result<Self, RegistrationError> {
        self.registry.add_template_type::<T>()?;
        Ok(self)
    }

    /// Registers a described rule. See [`RuleRegistry::register`].
    pub fn register(mut self, descriptor: RuleDescriptor) -> Result<Self, RegistrationError> {
        self.registry.register(descriptor)?;
        Ok(self)
    }

    /// Replaces the template used by every rule.
    pub fn with_template(mut self, template: &str) -> Result<Self, TemplateError> {
        self.engine.set_template(template)?;
        Ok(self)
    }

    /// Replaces the extractor, e.g. to bound the chain depth.
    #[must_use]
    pub fn with_extractor(mut self, extractor: ChainExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Replaces the template used by every rule.
    ///
    /// On error the previous template stays in place.
    pub fn set_template(&mut self, template: &str) -> Result<(), TemplateError> {
        self.engine.set_template(template)
    }

    /// The rule registry.
    #[must_use]
    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Mutable access to the rule registry.
    pub fn registry_mut(&mut self) -> &mut RuleRegistry {
        &mut self.registry
    }

    /// The template engine handed to every rule.
    #[must_use]
    pub fn template_engine(&self) -> &TemplateEngine {
        &self.engine
    }

    /// All registered rules. See [`RuleRegistry::rules`].
    #[must_use]
    pub fn rules(&self) -> Vec<RuleRef> {
        self.registry.rules()
    }

    /// Renders `failure` and everything nested below it, innermost first,
    /// one entry per failure joined by the platform line separator.
    ///
    /// If the chain cannot be flattened, the outermost failure is rendered on
    /// its own, followed by a line describing why.
    #[must_use]
    pub fn format(&self, failure: &dyn Failure) -> String {
        match self.extractor.extract(Some(failure)) {
            Ok(chain) => chain
                .into_iter()
                .map(|failure| self.render_entry(failure))
                .collect::<Vec<_>>()
                .join(NEWLINE),
            Err(error) => {
                tracing::error!(%error, "could not extract failure chain");
                format!(
                    "{}{NEWLINE}Failure chain could not be extracted: {error}",
                    self.render_default(failure)
                )
            }
        }
    }

    /// Like [`format`](Self::format), returning an empty report for `None`.
    #[must_use]
    pub fn format_optional(&self, failure: Option<&dyn Failure>) -> String {
        failure.map(|failure| self.format(failure)).unwrap_or_default()
    }

    fn render_entry(&self, failure: &dyn Failure) -> String {
        let rule = self.registry.resolve(&failure.failure_type());
        match invoke(&*rule, &self.engine, failure) {
            Ok(rendered) => rendered,
            Err(error) => {
                tracing::warn!(
                    rule = %rule.name(),
                    failure_type = %failure.failure_type(),
                    %error,
                    "rendering rule failed, falling back to default rule"
                );
                format!(
                    "Failure in rendering rule '{}'\n{}\nFalling back to default rendering rule.\n\nOriginal failure:\n{}",
                    rule.name(),
                    self.render_default(&error),
                    self.render_default(failure),
                )
            }
        }
    }

    fn render_default(&self, failure: &dyn Failure) -> String {
        invoke(&**self.registry.default_rule(), &self.engine, failure).unwrap_or_else(|error| {
            tracing::warn!(%error, "default rendering rule failed, rendering template directly");
            self.engine.render(failure, None)
        })
    }
}

/// Runs a rule, turning a panic into a [`RuleError`] where unwinding is
/// available.
fn invoke(
    rule: &dyn RenderingRule,
    engine: &TemplateEngine,
    failure: &dyn Failure,
) -> Result<String, RuleError> {
    #[cfg(feature = "std")]
    {
        std::panic::catch_unwind(core::panic::AssertUnwindSafe(|| rule.render(engine, failure)))
            .unwrap_or_else(|payload| Err(RuleError::from_panic(&*payload)))
    }

    #[cfg(not(feature = "std"))]
    {
        rule.render(engine, failure)
    }
}
