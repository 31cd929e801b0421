//! Render-time diagnostics: rendering always completes and each problem is
//! reported once with its call context and location

use std::sync::Arc;

use pretty_assertions::assert_eq;
use stencil::{DiagnosticKind, ErrorBuffer, Group, Record, Severity, Value, Visibility};

fn group(source: &str) -> Arc<Group> {
    Arc::new(Group::from_source("t", source).expect("Should load group"))
}

fn render(group: &Arc<Group>, template: &str) -> (String, ErrorBuffer) {
    let st = group.instance_of(template).expect("template exists");
    let mut errors = ErrorBuffer::new();
    let text = st.render(&mut errors);
    (text, errors)
}

#[test]
fn test_missing_embedded_template() {
    let group = group("t() ::= \"<foo()>\"\n");
    let (_, errors) = render(&group, "t");
    assert_eq!(errors.to_string(), "context [t] 1:0 no such template: foo\n");
}

#[test]
fn test_missing_super_template() {
    let mut group = Group::from_source("t", "t() ::= \"<super.t()>\"\n").expect("Should load");
    let imported = Group::from_source("t2", "u() ::= \"blech\"\n").expect("Should load");
    group.import(Arc::new(imported));
    let group = Arc::new(group);

    let (_, errors) = render(&group, "t");
    assert_eq!(
        errors.to_string(),
        "context [t] 1:1 no such template: super.t\n"
    );
}

#[test]
fn test_no_property_not_error() {
    let group = group("t(u) ::= \"<u.x>\"\n");
    let mut st = group.instance_of("t").expect("template exists");
    let user = Record::new("User")
        .with_field("id", Visibility::Public, 32)
        .with_field("name", Visibility::Public, "parrt")
        .into_value();
    st.add("u", user).expect("Should add");

    let mut errors = ErrorBuffer::new();
    st.render(&mut errors);
    assert_eq!(errors.to_string(), "");
}

#[test]
fn test_hidden_property_not_error() {
    let group = group("t(u) ::= \"<u.name>\"\n");
    let mut st = group.instance_of("t").expect("template exists");
    let user = Record::new("UserHiddenName")
        .with_field("name", Visibility::Protected, "parrt")
        .with_accessor("getName", Visibility::Protected, "parrt")
        .into_value();
    st.add("u", user).expect("Should add");

    let mut errors = ErrorBuffer::new();
    assert_eq!(st.render(&mut errors), "");
    assert_eq!(errors.to_string(), "");
}

#[test]
fn test_hidden_field_not_error() {
    let group = group("t(u) ::= \"<u.name>\"\n");
    let mut st = group.instance_of("t").expect("template exists");
    let user = Record::new("UserHiddenNameField")
        .with_field("name", Visibility::Protected, "parrt")
        .into_value();
    st.add("u", user).expect("Should add");

    let mut errors = ErrorBuffer::new();
    assert_eq!(st.render(&mut errors), "");
    assert_eq!(errors.to_string(), "");
}

#[test]
fn test_sole_arg() {
    let group = group("t() ::= \"<u({9})>\"\nu(x,y) ::= \"<x>\"\n");
    let (text, errors) = render(&group, "t");
    assert_eq!(text, "9");
    assert_eq!(
        errors.to_string(),
        "context [t] 1:1 passed 1 arg(s) to template u with 2 declared arg(s)\n"
    );
}

#[test]
fn test_sole_arg_using_apply_syntax() {
    let group = group("t() ::= \"<{9}:u()>\"\nu(x,y) ::= \"<x>\"\n");
    let (text, errors) = render(&group, "t");
    assert_eq!(text, "9");
    assert_eq!(
        errors.to_string(),
        "context [t] 1:5 passed 1 arg(s) to template u with 2 declared arg(s)\n"
    );
}

#[test]
fn test_undefined_attr() {
    let group = group("t() ::= \"<u()>\"\nu() ::= \"<x>\"\n");
    let (_, errors) = render(&group, "t");
    assert_eq!(errors.to_string(), "context [t u] 1:1 attribute x isn't defined\n");
}

#[test]
fn test_undefined_attr_reported_per_occurrence() {
    let group = group("t() ::= \"<x><x>\"\n");
    let (_, errors) = render(&group, "t");
    assert_eq!(errors.len(), 2);
    assert_eq!(errors.diagnostics()[1].location.column, 4);
}

#[test]
fn test_parallel_attribute_iteration_with_missing_args() {
    let group = Arc::new(Group::new("g"));
    let mut e = group
        .adhoc("<names,phones,salaries:{n,p | <n>@<p>}; separator=\", \">")
        .expect("Should compile");
    e.add("names", "Ter").expect("Should add");
    e.add("names", "Tom").expect("Should add");
    e.add("phones", "1").expect("Should add");
    e.add("phones", "2").expect("Should add");
    e.add("salaries", "big").expect("Should add");

    let mut errors = ErrorBuffer::new();
    let text = e.render(&mut errors);
    assert_eq!(text, "Ter@1, Tom@2");

    let kinds: Vec<_> = errors.diagnostics().iter().map(|d| d.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![
            DiagnosticKind::MapArityMismatch {
                template: "anonymous".into(),
                declared: 2,
                mapped: 3,
            },
            DiagnosticKind::ArityMismatch {
                template: "_sub1".into(),
                passed: 3,
                declared: 2,
            },
        ]
    );
    insta::assert_snapshot!(
        errors.diagnostics()[0].to_string(),
        @"context [anonymous] 1:23 anonymous template has 2 arg(s) but mapped across 3 value(s)"
    );
    insta::assert_snapshot!(
        errors.diagnostics()[1].to_string(),
        @"context [anonymous] 1:23 passed 3 arg(s) to template _sub1 with 2 declared arg(s)"
    );

    // a second render reports the same problems again and produces the same text
    let mut again = ErrorBuffer::new();
    assert_eq!(e.render(&mut again), "Ter@1, Tom@2");
    assert_eq!(again.len(), 2);
}

#[test]
fn test_string_type_mismatch() {
    let group = Arc::new(Group::new("g"));
    let mut e = group.adhoc("<trim(s)>").expect("Should compile");
    e.add("s", 34).expect("Should add");

    let mut errors = ErrorBuffer::new();
    assert_eq!(e.render(&mut errors), "");
    insta::assert_snapshot!(
        errors.diagnostics()[0].to_string(),
        @"context [anonymous] 1:1 function trim expects a string not i64"
    );
}

#[test]
fn test_string_type_mismatch2() {
    let group = Arc::new(Group::new("g"));
    let mut e = group.adhoc("<strlen(s)>").expect("Should compile");
    e.add("s", 34).expect("Should add");

    let mut errors = ErrorBuffer::new();
    e.render(&mut errors);
    assert_eq!(
        errors.to_string(),
        "context [anonymous] 1:1 function strlen expects a string not i64\n"
    );
}

#[test]
fn test_host_object_type_name_in_mismatch() {
    let group = Arc::new(Group::new("g"));
    let mut e = group.adhoc("<trim(u)>").expect("Should compile");
    e.add("u", Record::new("User").into_value()).expect("Should add");

    let mut errors = ErrorBuffer::new();
    e.render(&mut errors);
    assert_eq!(
        errors.to_string(),
        "context [anonymous] 1:1 function trim expects a string not User\n"
    );
}

#[test]
fn test_rendering_continues_after_errors() {
    let group = group("t(x) ::= \"a<nope()>b<u(1, 2)>c<trim(x)>d\"\nu(a) ::= \"<a>\"\n");
    let mut st = group.instance_of("t").expect("template exists");
    st.bind("x", Value::from(1.5)).expect("Should bind");

    let mut errors = ErrorBuffer::new();
    let text = st.render(&mut errors);
    assert_eq!(text, "ab1cd");
    let names: Vec<_> = errors.diagnostics().iter().map(|d| d.kind.name()).collect();
    assert_eq!(names, vec!["UnresolvedTemplate", "ArityMismatch", "TypeMismatch"]);
}

#[test]
fn test_diagnostic_arguments_are_structured() {
    let group = group("t() ::= \"<u(1)>\"\nu() ::= \"\"\n");
    let (_, errors) = render(&group, "t");
    let diagnostic = &errors.diagnostics()[0];
    assert_eq!(diagnostic.context, vec!["t"]);
    assert_eq!(diagnostic.location.line, 1);
    assert_eq!(diagnostic.location.column, 1);
    assert_eq!(diagnostic.args(), vec!["1", "u", "0"]);
    assert_eq!(diagnostic.severity, Severity::Error);
}

#[test]
fn test_location_on_later_line() {
    let group = group("t() ::= <<\nfirst\n  <x>\n>>\n");
    let (_, errors) = render(&group, "t");
    assert_eq!(errors.to_string(), "context [t] 2:3 attribute x isn't defined\n");
}

#[test]
fn test_closure_sink_sees_diagnostics_in_order() {
    let group = group("t() ::= \"<a><b>\"\n");
    let st = group.instance_of("t").expect("template exists");
    let mut seen = Vec::new();
    st.render(&mut |d: stencil::Diagnostic| seen.push(d.args()[0].clone()));
    assert_eq!(seen, vec!["a", "b"]);
}
