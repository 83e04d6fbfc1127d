use crate::helpers::execute;
use insta::assert_display_snapshot;

#[test]
fn clock_returns_a_number_that_advances() {
    let output = execute(
        r#"var t = clock();
print t >= 0;
print str(t) != "";"#,
    );
    assert_display_snapshot!(output, @r###"
    true
    true
    "###);
}

#[test]
fn str_stringifies_every_value_kind() {
    let source = r#"print str(1);
print str("already a string");
print str(true);
print str(nil);
class Cake {}
print str(Cake());
print str(Cake);"#;
    let output = execute(source);
    assert_display_snapshot!(output, @r###"
    1
    already a string
    true
    nil
    Cake instance
    Cake
    "###);
}

#[test]
fn calling_a_native_function_with_the_wrong_arity_is_a_runtime_error() {
    let output = execute("clock(1);");
    assert_display_snapshot!(output, @r###"
    runtime error: Expected 0 arguments but got 1.
    "###);
}
