use crate::helpers::execute;
use insta::assert_display_snapshot;

#[test]
fn each_call_to_a_closure_factory_gets_its_own_captured_binding() {
    let source = r#"fun makeCounter() {
  var i = 0;
  fun count() {
    i = i + 1;
    return i;
  }
  return count;
}
var counterA = makeCounter();
var counterB = makeCounter();
print counterA();
print counterA();
print counterB();"#;
    let output = execute(source);
    assert_display_snapshot!(output, @r###"
    1
    2
    1
    "###);
}

#[test]
fn a_function_closes_over_the_binding_present_at_its_own_definition() {
    let source = r#"var a = "global";
{
  fun showA() { print a; }
  showA();
  var a = "local";
  showA();
}"#;
    let output = execute(source);
    assert_display_snapshot!(output, @r###"
    global
    global
    "###);
}
