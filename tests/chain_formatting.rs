//! End-to-end tests rendering failure chains through the public API.

use std::borrow::Cow;

use faultline::{
    ChainFormatter, Failure, RegistrationError, RenderingRule, RuleDescriptor, RuleError,
    RuleRef, RuleTemplate, TemplateEngine, TypeInfo,
    failures::{AggregateFailure, BasicFailure},
    rule::rule_ref,
};
use serde::Serialize;
use serde_json::Value;

static_assertions::assert_impl_all!(ChainFormatter: Send, Sync);
static_assertions::assert_impl_all!(RuleRef: Send, Sync);

fn customer() -> TypeInfo {
    TypeInfo::subtype_of("CustomerFailure", &TypeInfo::failure())
}

fn customer_not_found() -> TypeInfo {
    TypeInfo::subtype_of("CustomerNotFoundFailure", &customer())
}

fn order() -> TypeInfo {
    TypeInfo::subtype_of("OrderFailure", &TypeInfo::failure())
}

fn fault_shape() -> TypeInfo {
    TypeInfo::generic("Fault", 1).with_base(TypeInfo::failure())
}

/// Renders every failure as its own name.
macro_rules! name_rule {
    ($name:ident, $failure_type:expr) => {
        #[derive(Default)]
        struct $name;

        impl RenderingRule for $name {
            fn failure_type(&self) -> TypeInfo {
                $failure_type
            }

            fn render(
                &self,
                _engine: &TemplateEngine,
                _failure: &dyn Failure,
            ) -> Result<String, RuleError> {
                Ok(stringify!($name).to_string())
            }

            fn name(&self) -> Cow<'static, str> {
                Cow::Borrowed(stringify!($name))
            }
        }
    };
}

name_rule!(NamingDefaultRule, TypeInfo::failure());
name_rule!(CustomerRule, customer());
name_rule!(CustomerNotFoundRule, customer_not_found());

#[derive(Debug, thiserror::Error)]
#[error("lookup table is not loaded")]
struct LookupError;

#[derive(Default)]
struct ThrowingOrderRule;

impl RenderingRule for ThrowingOrderRule {
    fn failure_type(&self) -> TypeInfo {
        order()
    }

    fn render(&self, _engine: &TemplateEngine, _failure: &dyn Failure) -> Result<String, RuleError> {
        Err(LookupError.into())
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("ThrowingOrderRule")
    }
}

/// Detail carried by a `Fault<T>` failure.
trait FaultDetail: Serialize + 'static {
    fn type_info() -> TypeInfo;
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CalculationError {
    reason: String,
}

impl FaultDetail for CalculationError {
    fn type_info() -> TypeInfo {
        TypeInfo::new("CalculationError")
    }
}

/// A failure carrying a typed detail, like a remote service fault.
struct Fault<T> {
    reason: String,
    detail: T,
}

impl<T: FaultDetail> Failure for Fault<T> {
    fn failure_type(&self) -> TypeInfo {
        fault_shape().instantiate([T::type_info()])
    }

    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.reason.as_str())
    }

    fn payload(&self) -> Option<Value> {
        serde_json::to_value(&self.detail).ok()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct FaultInfo<'a> {
    reason: Cow<'a, str>,
    detail_type: String,
    detail: Option<Value>,
}

struct FaultRule {
    failure_type: TypeInfo,
}

impl RenderingRule for FaultRule {
    fn failure_type(&self) -> TypeInfo {
        self.failure_type.clone()
    }

    fn render(&self, engine: &TemplateEngine, failure: &dyn Failure) -> Result<String, RuleError> {
        let detail_type = self
            .failure_type
            .arguments()
            .first()
            .map(ToString::to_string)
            .unwrap_or_default();
        let info = engine.pretty_print(&FaultInfo {
            reason: failure.message(),
            detail_type,
            detail: failure.payload(),
        })?;
        Ok(engine.render(failure, info.as_deref()))
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Owned(format!("FaultRule<{}>", self.failure_type))
    }
}

#[derive(Default)]
struct FaultRuleTemplate;

impl RuleTemplate for FaultRuleTemplate {
    fn shape(&self) -> TypeInfo {
        fault_shape()
    }

    fn instantiate(&self, arguments: &[TypeInfo]) -> RuleRef {
        rule_ref(FaultRule {
            failure_type: fault_shape().instantiate(arguments.iter().cloned()),
        })
    }
}

fn lines(report: &str) -> Vec<&str> {
    report.lines().collect()
}

#[test]
fn test_innermost_failure_comes_first() {
    let failure = BasicFailure::new("Ex1")
        .with_cause(BasicFailure::new("Ex2").with_cause(BasicFailure::new("Ex3")));

    let report = ChainFormatter::new().format(&failure);

    assert_eq!(
        lines(&report),
        ["[Failure: Ex3]", "[Failure: Ex2]", "[Failure: Ex1]"]
    );
}

#[test]
fn test_exact_rule_is_used() {
    let formatter = ChainFormatter::new()
        .add_rule_type::<CustomerRule>()
        .unwrap()
        .add_rule_type::<CustomerNotFoundRule>()
        .unwrap()
        .add_rule_type::<NamingDefaultRule>()
        .unwrap();

    let report = formatter.format(&BasicFailure::of_type(customer_not_found(), ""));

    assert_eq!(report, "CustomerNotFoundRule");
}

#[test]
fn test_ancestor_rule_is_used_when_exact_is_missing() {
    let formatter = ChainFormatter::new()
        .add_rule_type::<CustomerRule>()
        .unwrap();

    let report = formatter.format(&BasicFailure::of_type(customer_not_found(), ""));

    assert_eq!(report, "CustomerRule");
}

#[test]
fn test_default_rule_is_used_when_nothing_matches() {
    let formatter = ChainFormatter::new()
        .add_rule_type::<NamingDefaultRule>()
        .unwrap();

    let report = formatter.format(&BasicFailure::of_type(customer_not_found(), ""));

    assert_eq!(report, "NamingDefaultRule");
}

#[test]
fn test_each_entry_uses_its_own_rule() {
    let formatter = ChainFormatter::new()
        .add_rule_type::<CustomerRule>()
        .unwrap()
        .add_rule_type::<NamingDefaultRule>()
        .unwrap();
    let failure = AggregateFailure::new(
        "",
        [BasicFailure::of_type(customer_not_found(), "").with_cause(
            BasicFailure::of_type(customer(), "").with_cause(BasicFailure::new("")),
        )],
    );

    let report = formatter.format(&failure);

    assert_eq!(
        lines(&report),
        [
            "NamingDefaultRule",
            "CustomerRule",
            "CustomerRule",
            "NamingDefaultRule"
        ]
    );
}

#[test]
fn test_nested_fan_outs_render_every_failure() {
    let batch = |name: &str| {
        AggregateFailure::new(
            name,
            [
                BasicFailure::new(format!("{name}.1")),
                BasicFailure::new(format!("{name}.2")),
            ],
        )
    };
    let failure = AggregateFailure::new("outer", [batch("a"), batch("b"), batch("c")]);

    let report = ChainFormatter::new().format(&failure);

    let report_lines = lines(&report);
    assert_eq!(report_lines.len(), 10);
    assert_eq!(
        report_lines,
        [
            "[Failure: a.1]",
            "[Failure: a.2]",
            "[AggregateFailure: a]",
            "[Failure: b.1]",
            "[Failure: b.2]",
            "[AggregateFailure: b]",
            "[Failure: c.1]",
            "[Failure: c.2]",
            "[AggregateFailure: c]",
            "[AggregateFailure: outer]",
        ]
    );
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Person {
    name: String,
    address: String,
    lucky_numbers: Vec<u32>,
}

#[test]
fn test_extra_data_is_serialized() {
    let person = Person {
        name: "MyTest".to_string(),
        address: "MyAddress".to_string(),
        lucky_numbers: vec![10, 11, 12],
    };
    let failure = BasicFailure::new("MyTest")
        .with_extra("MyObject", serde_json::to_value(person).unwrap());

    let report = ChainFormatter::new().format(&failure);

    assert!(report.starts_with("[Failure: MyTest]\n{"));
    assert!(report.contains("\"Address\": \"MyAddress\""));
    assert!(report.contains("\"LuckyNumbers\": ["));
}

#[test]
fn test_extra_data_with_null_value() {
    let failure = BasicFailure::new("MyTest").with_extra("MyObject", Value::Null);

    let report = ChainFormatter::new().format(&failure);

    assert_eq!(report, "[Failure: MyTest]\n{\n  \"MyObject\": null\n}");
}

#[test]
fn test_absent_failure_renders_empty_report() {
    assert_eq!(ChainFormatter::new().format_optional(None), "");
}

#[test]
fn test_generic_template_renders_detail() {
    let formatter = ChainFormatter::new()
        .add_template_type::<FaultRuleTemplate>()
        .unwrap();
    let failure = Fault {
        reason: "Division by zero".to_string(),
        detail: CalculationError {
            reason: "X".to_string(),
        },
    };

    let report = formatter.format(&failure);

    assert!(report.starts_with("[Fault<CalculationError>: Division by zero]\n"));
    assert!(report.contains("\"DetailType\": \"CalculationError\""));
    assert!(report.contains("\"Reason\": \"X\""));
}

#[test]
fn test_generic_template_inside_chain() {
    let formatter = ChainFormatter::new()
        .add_template(FaultRuleTemplate)
        .unwrap();
    let failure = BasicFailure::of_type(order(), "could not price order").with_cause(Fault {
        reason: "Division by zero".to_string(),
        detail: CalculationError {
            reason: "X".to_string(),
        },
    });

    let report = formatter.format(&failure);

    assert!(report.starts_with("[Fault<CalculationError>: Division by zero]"));
    assert!(report.ends_with("[OrderFailure: could not price order]"));
}

#[test]
fn test_failing_rule_does_not_abort_report() {
    let formatter = ChainFormatter::new()
        .add_rule_type::<ThrowingOrderRule>()
        .unwrap();
    let failure = BasicFailure::new("checkout failed")
        .with_cause(BasicFailure::of_type(order(), "order 17 not found"));

    let report = formatter.format(&failure);

    let report_lines = lines(&report);
    assert_eq!(report_lines[0], "Failure in rendering rule 'ThrowingOrderRule'");
    assert!(report_lines[1].ends_with(": lookup table is not loaded]"));
    assert_eq!(
        report_lines[2..],
        [
            "Falling back to default rendering rule.",
            "",
            "Original failure:",
            "[OrderFailure: order 17 not found]",
            "[Failure: checkout failed]",
        ]
    );
}

#[cfg(feature = "std")]
#[test]
fn test_panicking_rule_does_not_abort_report() {
    struct PanickingOrderRule;

    impl RenderingRule for PanickingOrderRule {
        fn failure_type(&self) -> TypeInfo {
            order()
        }

        fn render(
            &self,
            _engine: &TemplateEngine,
            failure: &dyn Failure,
        ) -> Result<String, RuleError> {
            panic!("cannot render {}", failure.message())
        }
    }

    let formatter = ChainFormatter::new()
        .add_rule(PanickingOrderRule)
        .unwrap();

    let report = formatter.format(&BasicFailure::of_type(order(), "order 17"));

    assert!(report.contains("[Panic: cannot render order 17]"));
    assert!(report.ends_with("[OrderFailure: order 17]"));
}

fn construct_customer_rule() -> RuleRef {
    rule_ref(CustomerRule)
}

fn instantiate_fault_rule(arguments: &[TypeInfo]) -> RuleRef {
    FaultRuleTemplate.instantiate(arguments)
}

#[test]
fn test_create_from_descriptors() {
    let formatter = ChainFormatter::create([
        RuleDescriptor::rule("CustomerRule", customer(), construct_customer_rule),
        RuleDescriptor::template("FaultRuleTemplate", fault_shape(), instantiate_fault_rule),
        RuleDescriptor::of::<CustomerNotFoundRule>(),
    ])
    .unwrap();

    let names: Vec<String> = formatter
        .rules()
        .iter()
        .map(|rule| rule.name().into_owned())
        .collect();
    assert_eq!(names.len(), 4);
    assert!(names[0].ends_with("DefaultRule"));
    assert_eq!(
        names[1..],
        ["CustomerRule", "FaultRule<Fault<Failure>>", "CustomerNotFoundRule"]
    );
}

#[test]
fn test_create_rejects_descriptor_without_constructor() {
    let error = ChainFormatter::create([RuleDescriptor::new("Abstract", customer(), None)])
        .unwrap_err();

    assert!(matches!(error, RegistrationError::NotInstantiable { .. }));
    assert_eq!(error.to_string(), "rule 'Abstract' has no constructor");
}

#[test]
fn test_rule_for_non_failure_type_is_rejected() {
    struct PlainRule;

    impl RenderingRule for PlainRule {
        fn failure_type(&self) -> TypeInfo {
            TypeInfo::new("CalculationError")
        }

        fn render(&self, _engine: &TemplateEngine, _failure: &dyn Failure) -> Result<String, RuleError> {
            Ok(String::new())
        }
    }

    let error = ChainFormatter::new().add_rule(PlainRule).unwrap_err();

    assert!(matches!(error, RegistrationError::NotAFailureType { .. }));
}

#[derive(Debug, thiserror::Error)]
#[error("could not save settings")]
struct SaveError {
    #[source]
    source: std::io::Error,
}

#[test]
fn test_error_source_chain_is_formatted() {
    let error = SaveError {
        source: std::io::Error::other("disk full"),
    };
    let failure = BasicFailure::from_error(&error);

    let report = ChainFormatter::new().format(&failure);

    assert_eq!(
        lines(&report),
        ["[Error: disk full]", "[Error: could not save settings]"]
    );
}

#[test]
fn test_custom_template_applies_to_every_entry() {
    let formatter = ChainFormatter::new()
        .with_template("${exceptionType} -> ${message}")
        .unwrap();
    let failure = BasicFailure::of_type(order(), "outer")
        .with_cause(BasicFailure::of_type(customer(), "inner"));

    let report = formatter.format(&failure);

    assert_eq!(
        lines(&report),
        ["CustomerFailure -> inner", "OrderFailure -> outer"]
    );
}
