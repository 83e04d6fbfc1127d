use crate::helpers::execute;
use insta::assert_display_snapshot;

#[test]
fn redefining_a_global_is_silent_but_redefining_a_local_is_reported() {
    let source = r#"var a = 1;
print a;
var a = 2;
print a;
{
  var a = 3;
  print a;
  var a = 4;
  print a;
}"#;
    let output = execute(source);
    assert_display_snapshot!(output, @r###"
    1
    2
    3
    [line 8] Error at 'Identifier': Variable 'a' redefined.
    4
    "###);
}

#[test]
fn redeclaring_a_function_parameter_inside_its_body_is_reported() {
    let source = r#"fun f(a) {
  print a;
  var a = "redefined";
  print a;
}
f(13);"#;
    let output = execute(source);
    assert_display_snapshot!(output, @r###"
    13
    [line 3] Error at 'Identifier': Variable 'a' redefined.
    redefined
    "###);
}
