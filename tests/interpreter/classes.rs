use crate::helpers::execute;
use insta::assert_display_snapshot;

#[test]
fn fields_can_be_set_and_read_back_through_this() {
    let source = r#"class Cake {
  taste() {
    print "The " + this.flavor + " cake is delicious!";
  }
}
var c = Cake();
c.flavor = "German chocolate";
c.taste();"#;
    let output = execute(source);
    assert_display_snapshot!(output, @r###"
    The German chocolate cake is delicious!
    "###);
}

#[test]
fn a_subclass_method_can_call_the_overridden_parent_method_via_super() {
    let source = r#"class A {
  m() { print "A"; }
}
class B < A {
  m() {
    super.m();
    print "B";
  }
}
B().m();"#;
    let output = execute(source);
    assert_display_snapshot!(output, @r###"
    A
    B
    "###);
}

#[test]
fn init_is_invoked_on_construction_and_the_instance_is_always_returned() {
    let source = r#"class Counter {
  init(start) {
    this.value = start;
  }
  increment() {
    this.value = this.value + 1;
    return this.value;
  }
}
var c = Counter(10);
print c.increment();
print c.increment();"#;
    let output = execute(source);
    assert_display_snapshot!(output, @r###"
    11
    12
    "###);
}
