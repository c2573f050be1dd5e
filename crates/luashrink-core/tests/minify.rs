use indoc::indoc;
use luashrink_core::{minify, LinePacking, MinifyOptions};

fn shrink(source: &str) -> String {
    minify(source, &MinifyOptions::default()).expect("minify failed")
}

fn shrink_with(source: &str, configure: impl FnOnce(&mut MinifyOptions)) -> String {
    let mut options = MinifyOptions::default();
    configure(&mut options);
    minify(source, &options).expect("minify failed")
}

#[test]
fn folds_and_propagates_constants() {
    assert_eq!(shrink("local value = 1 + 2 print(value)"), "print(3)");
}

#[test]
fn propagated_number_left_of_concat_is_parenthesized() {
    assert_eq!(shrink("local y = 4 print(y .. \"\")"), "print((4)..\"\")");
}

#[test]
fn shortest_numeric_forms() {
    assert_eq!(shrink("print(0.00012)"), "print(1.2e-4)");
    assert_eq!(shrink("print(12000000000)"), "print(12e9)");
    assert_eq!(shrink("print(0.5)"), "print(.5)");
}

#[test]
fn number_right_of_concat_keeps_its_leading_zero() {
    // `..0.5` would leave three dots in a row.
    let output = shrink("print(\"x\" .. 0.5)");
    assert_eq!(output, "print(\"x\"..0.5)");
}

#[test]
fn no_digit_ever_touches_the_concat_token() {
    let sources = [
        "local y = 4 print(y .. \"\")",
        "print(1 .. 2 .. 3)",
        "print(1.5 .. \"x\")",
        "print(-7 .. \"x\")",
    ];
    for source in sources {
        let output = shrink(source);
        let bytes = output.as_bytes();
        for i in 0..bytes.len().saturating_sub(2) {
            if &bytes[i + 1..i + 3] == b".." {
                assert!(
                    !bytes[i].is_ascii_digit() && bytes[i] != b'.',
                    "digit or dot touches `..` in {output:?}"
                );
            }
        }
    }
}

#[test]
fn dead_function_chain_is_removed_together() {
    let source = indoc! {r#"
        function helper()
          return 1
        end
        function outer()
          return helper()
        end
        print(1)
    "#};
    assert_eq!(shrink(source), "print(1)");
}

#[test]
fn kept_function_keeps_its_callees() {
    let source = indoc! {r#"
        function helper()
          return 1
        end
        function outer()
          return helper()
        end
        print(1)
    "#};
    let output = shrink_with(source, |options| {
        options.keep_functions.push("outer".to_string());
    });
    assert!(output.contains("function outer"));
    assert!(output.contains("function helper"));
}

#[test]
fn entry_points_are_roots() {
    let source = indoc! {r#"
        local function tick()
          print("tick")
        end
        function TIC()
          tick()
        end
    "#};
    let output = shrink(source);
    assert!(output.contains("function TIC"));
    assert!(output.contains("tick"));
}

#[test]
fn independent_declarations_pack() {
    let output = shrink_with("local first = 1 local second = 2 print(first, second)", |o| {
        o.fold_constants = false;
    });
    assert!(output.contains("local a,b=1,2"), "got {output:?}");
}

#[test]
fn dependent_declarations_never_pack() {
    let output = shrink_with(
        "local first = 1 local second = first + 1 print(second)",
        |o| o.fold_constants = false,
    );
    assert!(!output.contains("local a,b"), "got {output:?}");
}

#[test]
fn short_string_used_twice_is_not_aliased() {
    let output = shrink("print(\"abc\") print(\"abc\")");
    assert_eq!(output.matches("\"abc\"").count(), 2);
}

#[test]
fn short_string_used_often_is_aliased() {
    let calls = vec!["print(\"abc\")"; 20].join(" ");
    let output = shrink(&calls);
    assert_eq!(output.matches("\"abc\"").count(), 1);
    assert!(output.starts_with("local a=\"abc\""), "got {output:?}");
}

#[test]
fn repeated_library_access_is_aliased() {
    let calls = vec!["print(math.floor(value))"; 6].join(" ");
    let output = shrink(&calls);
    assert_eq!(output.matches("math.floor").count(), 1);
}

#[test]
fn string_bytes_survive_the_round_trip() {
    // Multi-byte source text stays the same bytes, escaped numerically.
    assert_eq!(shrink("print(\"héllo\")"), "print(\"h\\195\\169llo\")");
    // A numeric escape stays a single byte instead of widening to two.
    assert_eq!(shrink("print(\"\\233\")"), "print(\"\\233\")");
}

#[test]
fn string_length_folds_to_the_byte_count() {
    assert_eq!(shrink("print(#\"h\\233y\")"), "print(3)");
}

#[test]
fn side_effecting_dead_local_is_retained() {
    let output = shrink("local unused = print(\"hi\")");
    assert!(output.contains("print(\"hi\")"), "got {output:?}");
}

#[test]
fn pure_dead_local_is_removed() {
    assert_eq!(shrink("local unused = 42 print(1)"), "print(1)");
}

#[test]
fn minification_is_idempotent_on_its_own_output() {
    let source = indoc! {r#"
        local width = 10
        local height = 20
        function TIC()
          print(width * height)
        end
    "#};
    let once = shrink(source);
    let twice = shrink(&once);
    assert_eq!(once, twice);
}

#[test]
fn tight_mode_observes_the_line_ceiling() {
    let statements = vec!["print(\"some statement text\")"; 12].join(" ");
    let output = shrink_with(&statements, |o| o.max_line_length = 40);
    assert!(output.lines().count() > 1);
    for line in output.lines() {
        assert!(line.len() <= 40, "line over ceiling: {line:?}");
    }
}

#[test]
fn pretty_mode_keeps_comments() {
    let source = indoc! {r#"
        -- setup
        print(1)
    "#};
    let output = shrink_with(source, |options| {
        options.strip_comments = false;
        options.line_packing = LinePacking::Pretty;
    });
    assert!(output.contains("-- setup"));
    assert!(output.contains("print(1)"));
}

#[test]
fn pretty_mode_guards_paren_led_statements() {
    // A line opening with `(` would chain onto the call on the line above.
    let output = shrink_with("a=f();(\"x\"):rep(3)", |options| {
        *options = MinifyOptions::passthrough();
    });
    assert!(
        output.lines().any(|line| line.starts_with(";(")),
        "got {output:?}"
    );
}

#[test]
fn single_line_blocks_inline_short_statements() {
    let source = indoc! {r#"
        if ready then
          print(1)
        end
    "#};
    let output = shrink_with(source, |options| {
        options.line_packing = LinePacking::SingleLineBlocks;
    });
    assert!(output.contains("if ready then print(1)end"), "got {output:?}");
}

#[test]
fn table_key_renaming_shrinks_private_tables() {
    let source = indoc! {r#"
        local state = { counter = 0, velocity = 5 }
        state.counter = state.counter + state.velocity
        print(state.counter)
    "#};
    let output = shrink_with(source, |options| {
        options.rename_table_keys = true;
    });
    assert!(!output.contains("counter"), "got {output:?}");
    assert!(!output.contains("velocity"), "got {output:?}");
}

#[test]
fn parenthesized_call_loses_its_truncating_parentheses() {
    // The tree keeps no parenthesis nodes, so the single-value truncation
    // `(f())` forces in multi-value positions is not preserved.
    assert_eq!(shrink("return (f())"), "return f()");
}

#[test]
fn method_parameters_keep_the_receiver_name() {
    let source = indoc! {r#"
        function actor:update(dt)
          self.age = self.age + dt
        end
        function TIC()
          actor:update(1)
        end
    "#};
    let output = shrink_with(source, |o| o.keep_functions.push("actor".to_string()));
    assert!(output.contains("self.age"), "got {output:?}");
}
