use oxidized_bench::eval::{BinOp, TestItem, TestSet, TestSetError};

const MULTIPLE_USERS: &str = r#"
bin_op: and
test_items:
  - flag: "User"
    compare:
      op: nothave
      value: "root"
    set: true
  - flag: "User"
    compare:
      op: noteq
      value: ""
    set: true
  - flag: "User"
    compare:
      op: noteq
      value: "1"
    set: true
"#;

fn parse(yaml: &str) -> TestSet {
    serde_yaml::from_str(yaml).expect("valid test set")
}

fn passed(set: &TestSet, output: &str, multi_row: bool) -> bool {
    set.execute(output, "1.1", multi_row)
        .expect("known bin_op")
        .expect("non-empty test set")
        .passed
}

// ── deserialization ───────────────────────────────────────────────────────────

#[test]
fn missing_fields_take_defaults() {
    let set = parse("test_items:\n  - flag: \"--profiling\"\n");
    assert_eq!(set.bin_op, BinOp::And);
    let item = &set.test_items[0];
    assert!(item.set);
    assert!(item.path.is_empty());
    assert!(item.compare.is_none());
}

#[test]
fn scalar_compare_values_become_strings() {
    let set = parse(
        r#"
test_items:
  - flag: "--anonymous-auth"
    compare: { op: eq, value: false }
  - flag: "--port"
    compare: { op: gt, value: 1024 }
  - flag: "--mode"
    compare: { op: has, value: RBAC }
"#,
    );
    let values: Vec<&str> = set
        .test_items
        .iter()
        .map(|i| i.compare.as_ref().unwrap().value.as_str())
        .collect();
    assert_eq!(values, vec!["false", "1024", "RBAC"]);
}

#[test]
fn bin_op_names_are_recognised() {
    assert_eq!(parse("bin_op: or").bin_op, BinOp::Or);
    assert_eq!(parse("bin_op: and").bin_op, BinOp::And);
    assert_eq!(parse("bin_op: \"\"").bin_op, BinOp::And);
    assert_eq!(
        parse("bin_op: xor").bin_op,
        BinOp::Unknown("xor".to_string())
    );
}

// ── single items ──────────────────────────────────────────────────────────────

#[test]
fn presence_item_checks_for_the_flag() {
    let item = TestItem::present("--profiling");
    assert!(item.execute("kube-apiserver --profiling=false", false).passed);
    let result = item.execute("kube-apiserver", false);
    assert!(!result.passed);
    assert_eq!(result.explanation, "'--profiling' Is present");
}

#[test]
fn absence_item_checks_the_flag_is_missing() {
    let item = TestItem {
        set: false,
        ..TestItem::present("--insecure-port")
    };
    let result = item.execute("kube-apiserver --secure-port=6443", false);
    assert!(result.passed);
    assert_eq!(result.explanation, "'--insecure-port' Is not present");
    assert!(!item.execute("kube-apiserver --insecure-port=0", false).passed);
}

#[test]
fn absent_item_ignores_compare() {
    let item = TestItem {
        set: false,
        ..TestItem::comparing("--flag", "eq", "1")
    };
    assert!(item.execute("nothing here", false).passed);
}

#[test]
fn empty_compare_op_falls_back_to_presence() {
    let item = TestItem::comparing("--flag", "", "ignored");
    let result = item.execute("--flag", false);
    assert!(result.passed);
    assert_eq!(result.explanation, "'--flag' Is present");
}

#[test]
fn comparison_uses_extracted_value() {
    let item = TestItem::comparing("--anonymous-auth", "eq", "false");
    assert!(item.execute("kubelet --anonymous-auth=false", false).passed);
    assert!(!item.execute("kubelet --anonymous-auth=true", false).passed);
}

#[test]
fn trailing_spaces_and_newlines_are_ignored() {
    let item = TestItem::comparing("mode", "eq", "strict");
    assert!(item.execute("mode: strict  \n\n", false).passed);
}

// ── sets ──────────────────────────────────────────────────────────────────────

#[test]
fn or_passes_when_any_item_passes() {
    let set = parse(
        r#"
bin_op: or
test_items:
  - flag: "enabled"
    compare:
      op: has
      value: enabled
    set: true
"#,
    );
    assert!(passed(&set, "configuration is enabled", false));
    assert!(!passed(&set, "The cow jumped over the moon", false));
}

#[test]
fn and_requires_every_item() {
    let set = TestSet::new(
        vec![
            TestItem::comparing("--port", "gte", "1024"),
            TestItem::present("--tls"),
        ],
        BinOp::And,
    );
    assert!(passed(&set, "--port=8443 --tls", false));
    assert!(!passed(&set, "--port=8443", false));
}

#[test]
fn explanations_are_joined_by_the_operator() {
    let items = vec![
        TestItem::present("--a"),
        TestItem::comparing("--b", "eq", "1"),
    ];

    let and = TestSet::new(items.clone(), BinOp::And)
        .execute("--a --b=1", "1.1", false)
        .unwrap()
        .unwrap();
    assert_eq!(and.expected, "'--a' Is present AND '--b' is equal to '1'");

    let or = TestSet::new(items, BinOp::Or)
        .execute("--a --b=1", "1.1", false)
        .unwrap()
        .unwrap();
    assert_eq!(or.expected, "'--a' Is present OR '--b' is equal to '1'");
}

#[test]
fn outcome_carries_raw_output() {
    let set = TestSet::new(vec![TestItem::present("--a")], BinOp::And);
    let outcome = set.execute("--a\n", "1.1", false).unwrap().unwrap();
    assert_eq!(outcome.actual, "--a\n");
}

#[test]
fn empty_set_has_no_verdict() {
    let set = TestSet::default();
    assert!(set.is_empty());
    assert_eq!(set.execute("anything", "1.1", false), Ok(None));
}

#[test]
fn unknown_bin_op_is_an_error() {
    let set = TestSet::new(
        vec![TestItem::present("--a")],
        BinOp::Unknown("xor".to_string()),
    );
    assert_eq!(
        set.execute("--a", "1.1", false),
        Err(TestSetError::UnknownBinOp("xor".to_string()))
    );
}

#[test]
fn unknown_compare_op_fails_the_item() {
    let set = TestSet::new(
        vec![TestItem::comparing("--a", "blah", "1")],
        BinOp::Or,
    );
    assert!(!passed(&set, "--a=1", false));
}

// ── multiple values ───────────────────────────────────────────────────────────

const FIRST_PASSES: &str = "b24f2b421ec7: User=Pass
\t\t\t9bf99c968c5a: User=
\t\t\taf1072975e9e: User=";

const FIRST_FAILS: &str = "b24f2b421ec7: User=
\t\t\t9bf99c968c5a: User=ShouldFail
\t\t\taf1072975e9e: User=NoUse";

const ROOT_FIRST: &str = "b24f2b421ec7: User=root
\t\t\t9bf99c968c5a: User=a
\t\t\taf1072975e9e: User=b";

const ALL_PASS: &str = "b24f2b421ec7: User=Pass
\t\t\t9bf99c968c5a: User=Pass1
\t\t\taf1072975e9e: User=Pass";

#[test]
fn single_value_mode_only_sees_the_first_match() {
    let set = parse(MULTIPLE_USERS);
    assert!(passed(&set, FIRST_PASSES, false));
    assert!(!passed(&set, FIRST_FAILS, false));
}

#[test]
fn multiple_value_mode_tests_every_line() {
    let set = parse(MULTIPLE_USERS);
    assert!(!passed(&set, FIRST_PASSES, true));
    assert!(!passed(&set, ROOT_FIRST, true));
    assert!(passed(&set, ALL_PASS, true));
}

#[test]
fn multiple_value_mode_reports_first_failing_line() {
    let item = TestItem::comparing("User", "noteq", "");
    let result = item.execute(FIRST_PASSES, true);
    assert!(!result.passed);
    assert_eq!(result.explanation, "'User' is not equal to ''");
}
