//! Keyword-substitution templates for rendering a single failure.
//!
//! A template is plain text containing `${keyword}` placeholders. The
//! recognized keywords, matched case-insensitively, are:
//!
//! | Keyword          | Value                                                  |
//! |------------------|--------------------------------------------------------|
//! | `exceptionType`  | the failure's type name, e.g. `Fault<Timeout>`         |
//! | `message`        | the failure's message                                  |
//! | `stacktrace`     | the failure's stack trace                              |
//! | `additionalInfo` | the text supplied by the rendering rule                |
//! | `dictionary`     | the failure's extra data, pretty printed as JSON       |
//!
//! A placeholder whose value is empty is removed together with the run of
//! line breaks directly in front of it, so optional sections collapse without
//! leaving blank lines behind.
//!
//! # Examples
//!
//! ```
//! use faultline::{failures::BasicFailure, template::TemplateEngine};
//!
//! let mut engine = TemplateEngine::new();
//! engine.set_template("${message}\n\n${additionalInfo}").unwrap();
//!
//! let failure = BasicFailure::new("disk full");
//! assert_eq!(engine.render(&failure, Some("retry later")), "disk full\n\nretry later");
//! assert_eq!(engine.render(&failure, None), "disk full");
//! ```

use alloc::{
    borrow::Cow,
    string::{String, ToString},
    vec::Vec,
};
use core::{fmt, ops::Range};

use serde::Serialize;

use crate::Failure;

/// The template used until [`TemplateEngine::set_template`] is called.
pub const DEFAULT_TEMPLATE: &str =
    "[${exceptionType}: ${message}]\n${dictionary}\n${additionalInfo}\n${stacktrace}";

/// A placeholder keyword recognized in templates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Keyword {
    /// The rendered failure type name.
    ExceptionType,
    /// The failure message.
    Message,
    /// The failure stack trace.
    Stacktrace,
    /// Text supplied by the rendering rule.
    AdditionalInfo,
    /// The failure's extra data.
    Dictionary,
}

impl Keyword {
    /// Every recognized keyword.
    pub const ALL: [Keyword; 5] = [
        Keyword::ExceptionType,
        Keyword::Message,
        Keyword::Stacktrace,
        Keyword::AdditionalInfo,
        Keyword::Dictionary,
    ];

    /// The keyword as written in templates.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Keyword::ExceptionType => "exceptionType",
            Keyword::Message => "message",
            Keyword::Stacktrace => "stacktrace",
            Keyword::AdditionalInfo => "additionalInfo",
            Keyword::Dictionary => "dictionary",
        }
    }

    /// Looks up a keyword by name, ignoring ASCII case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|keyword| keyword.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a template is rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplateError {
    /// The template text is empty.
    Empty,
    /// A keyword appears more than once.
    DuplicateKeyword(String),
    /// The template uses names that are not recognized keywords.
    UnknownKeywords(Vec<String>),
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::Empty => f.write_str("template must not be empty"),
            TemplateError::DuplicateKeyword(keyword) => {
                write!(f, "duplicate keyword in template: {keyword}")
            }
            TemplateError::UnknownKeywords(keywords) => {
                write!(f, "unknown keywords in template: {}", keywords.join(", "))
            }
        }
    }
}

impl core::error::Error for TemplateError {}

#[derive(Clone, Debug)]
enum Segment {
    Literal(Range<usize>),
    Placeholder(Keyword),
}

/// A scanned piece of template text.
enum Token<'a> {
    Literal(Range<usize>),
    Placeholder(&'a str),
}

/// Splits `text` into literal runs and `${name}` placeholders.
///
/// A `${` without a closing `}` on the same line is literal text.
fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find("${") {
        let open = cursor + offset;
        let name_start = open + 2;
        match text[name_start..].find(['}', '\n']) {
            Some(length) if text.as_bytes()[name_start + length] == b'}' => {
                if literal_start < open {
                    tokens.push(Token::Literal(literal_start..open));
                }
                tokens.push(Token::Placeholder(&text[name_start..name_start + length]));
                cursor = name_start + length + 1;
                literal_start = cursor;
            }
            _ => cursor = name_start,
        }
    }

    if literal_start < text.len() {
        tokens.push(Token::Literal(literal_start..text.len()));
    }
    tokens
}

#[derive(Clone, Debug)]
struct Template {
    text: String,
    segments: Vec<Segment>,
}

impl Template {
    fn parse(text: &str) -> Result<Self, TemplateError> {
        if text.is_empty() {
            return Err(TemplateError::Empty);
        }

        let tokens = tokenize(text);
        let names: Vec<&str> = tokens
            .iter()
            .filter_map(|token| match token {
                Token::Placeholder(name) => Some(*name),
                Token::Literal(_) => None,
            })
            .collect();

        for (index, name) in names.iter().enumerate() {
            if names[..index]
                .iter()
                .any(|previous| previous.eq_ignore_ascii_case(name))
            {
                return Err(TemplateError::DuplicateKeyword((*name).to_string()));
            }
        }

        let mut unknown = Vec::new();
        let mut segments = Vec::with_capacity(tokens.len());
        for token in tokens {
            match token {
                Token::Literal(range) => segments.push(Segment::Literal(range)),
                Token::Placeholder(name) => match Keyword::from_name(name) {
                    Some(keyword) => segments.push(Segment::Placeholder(keyword)),
                    None => unknown.push(name.to_string()),
                },
            }
        }
        if !unknown.is_empty() {
            return Err(TemplateError::UnknownKeywords(unknown));
        }

        Ok(Self {
            text: text.to_string(),
            segments,
        })
    }
}

/// Renders one failure through a keyword-substitution template.
///
/// The engine also provides the pretty print capability rules use to dump
/// structured diagnostics into the `additionalInfo` section.
#[derive(Clone, Debug)]
pub struct TemplateEngine {
    template: Template,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    /// Creates an engine using [`DEFAULT_TEMPLATE`].
    #[must_use]
    pub fn new() -> Self {
        let template = Template::parse(DEFAULT_TEMPLATE).expect("default template is valid");
        Self { template }
    }

    /// Creates an engine using the given template.
    pub fn with_template(text: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            template: Template::parse(text)?,
        })
    }

    /// Replaces the template.
    ///
    /// On error the previous template stays in place.
    pub fn set_template(&mut self, text: &str) -> Result<(), TemplateError> {
        self.template = Template::parse(text)?;
        Ok(())
    }

    /// The current template text.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template.text
    }

    /// The keywords used by the current template, in order of appearance.
    pub fn keywords(&self) -> impl Iterator<Item = Keyword> + '_ {
        self.template.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(keyword) => Some(*keyword),
            Segment::Literal(_) => None,
        })
    }

    /// Renders `failure`, filling `additionalInfo` from `additional_info`.
    #[must_use]
    pub fn render(&self, failure: &dyn Failure, additional_info: Option<&str>) -> String {
        let mut output = String::with_capacity(self.template.text.len());

        for segment in &self.template.segments {
            match segment {
                Segment::Literal(range) => output.push_str(&self.template.text[range.clone()]),
                Segment::Placeholder(keyword) => {
                    match self.keyword_value(*keyword, failure, additional_info) {
                        Some(value) if !value.is_empty() => output.push_str(&value),
                        _ => {
                            let kept = output.trim_end_matches(['\r', '\n']).len();
                            output.truncate(kept);
                        }
                    }
                }
            }
        }

        output
    }

    /// Renders `failure`, joining `lines` with newlines for `additionalInfo`.
    #[must_use]
    pub fn render_lines<I>(&self, failure: &dyn Failure, lines: I) -> String
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut additional_info = String::new();
        for (index, line) in lines.into_iter().enumerate() {
            if index > 0 {
                additional_info.push('\n');
            }
            additional_info.push_str(line.as_ref());
        }
        self.render(failure, Some(&additional_info))
    }

    /// Pretty prints `item` as indented JSON.
    ///
    /// Returns `Ok(None)` for items that serialize to `null`.
    pub fn pretty_print<T>(&self, item: &T) -> Result<Option<String>, serde_json::Error>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(item)?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::to_string_pretty(&value).map(Some)
    }

    fn keyword_value<'a>(
        &self,
        keyword: Keyword,
        failure: &'a dyn Failure,
        additional_info: Option<&'a str>,
    ) -> Option<Cow<'a, str>> {
        match keyword {
            Keyword::ExceptionType => Some(Cow::Owned(failure.failure_type().to_string())),
            Keyword::Message => Some(failure.message()),
            Keyword::Stacktrace => failure.stacktrace(),
            Keyword::AdditionalInfo => additional_info.map(Cow::Borrowed),
            Keyword::Dictionary => failure
                .extra_data()
                .filter(|extra_data| !extra_data.is_empty())
                .and_then(|extra_data| self.pretty_print(extra_data).ok().flatten())
                .map(Cow::Owned),
        }
    }
}
