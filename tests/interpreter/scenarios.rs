use crate::helpers::execute;
use insta::assert_display_snapshot;

#[test]
fn arithmetic_expressions_follow_usual_precedence() {
    let output = execute("print 6 * 9;");
    assert_display_snapshot!(output, @r###"
    54
    "###);
}

#[test]
fn assignment_is_right_associative_and_returns_the_assigned_value() {
    let source = r#"var a = 1;
var b = 2;
print a + b;
a = b = a + b;
print a + b;"#;
    let output = execute(source);
    assert_display_snapshot!(output, @r###"
    3
    6
    "###);
}

#[test]
fn a_for_loop_can_double_a_counter_until_it_overflows_the_bound() {
    let source = "for (var q = 1; q < 10000; q = q * 2) print q;";
    let output = execute(source);
    assert_display_snapshot!(output, @r###"
    1
    2
    4
    8
    16
    32
    64
    128
    256
    512
    1024
    2048
    4096
    8192
    "###);
}

#[test]
fn a_variable_initializer_can_read_the_enclosing_scopes_binding_of_the_same_name() {
    let source = r#"var a = "outer";
{
  var a = a;
  print a;
}"#;
    let output = execute(source);
    assert_display_snapshot!(output, @r###"
    outer
    "###);
}

#[test]
fn appending_nil_to_a_string_interpolates_a_placeholder() {
    let output = execute(r#"print "value: " + nil;"#);
    assert_display_snapshot!(output, @r###"
    value: {([<nil>])}
    "###);
}

#[test]
fn strings_compare_lexicographically() {
    let source = r#"print "a" < "b";
print "banana" < "apple";"#;
    let output = execute(source);
    assert_display_snapshot!(output, @r###"
    true
    false
    "###);
}

#[test]
fn recursive_fibonacci_produces_the_expected_sequence() {
    let source = r#"fun fib(n) {
  if (n <= 1) return n;
  return fib(n - 2) + fib(n - 1);
}
for (var i = 0; i < 6; i = i + 1) {
  print fib(i);
}"#;
    let output = execute(source);
    assert_display_snapshot!(output, @r###"
    0
    1
    1
    2
    3
    5
    "###);
}
