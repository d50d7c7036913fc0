#[cfg(test)]
mod tests {
    use anyhow::{anyhow, bail};

    use crate::{
        env::Env,
        template::{CyclicReference, Engine},
        val::{Func, Indirection, Mapping, Record, Sequence, Type, Val, de::from_yaml_str},
        walk::{ErrorKind, PathSegment, Walker, evaluate},
    };

    fn yaml(src: &str) -> Val {
        from_yaml_str(src).unwrap()
    }

    /// echo, join, call and identity, shaped like the built-ins
    fn fn_env() -> Env {
        let mut env = Env::new();
        env.define_fn("echo", |arg| match arg {
            Val::Map(m) => Ok(m.get_str("message").cloned().unwrap_or_default()),
            other => Ok(other),
        });
        env.define_fn("join", |arg| {
            let Val::Map(m) = arg else { bail!("join expects a mapping") };
            let part = |k: &str| m.get_str(k).map(Val::render_text).unwrap_or_default();
            Ok(Val::from(format!("{}{}{}", part("prefix"), part("text"), part("suffix"))))
        });
        env.define_fn("call", |arg| {
            let Val::Map(m) = arg else { bail!("call expects a mapping") };
            match m.get_str("f") {
                Some(Val::Func(f)) => f.call(m.get_str("arg").cloned().unwrap_or_default()),
                _ => bail!("call expects a function in `f`"),
            }
        });
        env.define_fn("identity", Ok);
        env
    }

    #[test]
    fn template_free_documents_are_unchanged() {
        let doc = yaml(
            r#"
name: plain
items: [1, 2.5, true, null, "text"]
nested:
  empty_map: {}
  empty_seq: []
  "{ not a template }": 3
"#,
        );
        assert_eq!(evaluate(&doc, &Env::new()).unwrap(), doc);
        assert_eq!(evaluate(&Val::Nil, &Env::new()).unwrap(), Val::Nil);
        let empty = Val::Map(Mapping::new(Type::Str, Type::Int));
        assert_eq!(evaluate(&empty, &Env::new()).unwrap(), empty);
    }

    #[test]
    fn shape_and_order_are_preserved() {
        let env = Env::new().with("x", 1).with("y", "why");
        let doc = yaml(
            r#"
z: "{{x}}"
a: ["{{y}}", "lit", {k: "{{x + 1}}"}]
m: "{{y}}-{{x}}"
"#,
        );
        let out = evaluate(&doc, &env).unwrap();
        let Val::Map(out) = out else { panic!("expected a mapping") };
        let keys: Vec<_> = out.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(out.get_str("z"), Some(&Val::Int(1)));
        assert_eq!(out.get_str("m"), Some(&Val::from("why-1")));
        let Some(Val::Seq(a)) = out.get_str("a") else { panic!("expected a sequence") };
        assert_eq!(a.len(), 3);
        assert_eq!(a.items[0], Val::from("why"));
        assert_eq!(a.items[2], Val::Map(Mapping::open().entry("k", 2)));
    }

    #[test]
    fn chained_variables_resolve() {
        let env = Env::new().with("a", "{{b}}").with("b", "{{c}}").with("c", "test");
        assert_eq!(evaluate(&Val::from("{{a}}"), &env).unwrap(), Val::from("test"));
    }

    #[test]
    fn open_slot_integral_default() {
        let doc = yaml(r#"{"version": "{{1}}", "ratio": "{{3 / 2}}", "whole": "{{4.0}}"}"#);
        let Val::Map(out) = evaluate(&doc, &Env::new()).unwrap() else { panic!("expected a mapping") };
        assert_eq!(out.get_str("version"), Some(&Val::Int(1)));
        assert_eq!(out.get_str("ratio"), Some(&Val::Float(1.5)));
        assert_eq!(out.get_str("whole"), Some(&Val::Int(4)));
    }

    #[test]
    fn unsettable_fields_are_copied_verbatim() {
        let rec = Record::new("Request")
            .field("url", Type::Str, "{{host}}/path")
            .fixed_field("raw", Type::Str, "{{host}}")
            .field("port", Type::Int, "{{port}}");
        let env = Env::new().with("host", "http://localhost").with("port", "8080");
        let Val::Record(out) = evaluate(&Val::Record(rec), &env).unwrap() else { panic!("expected a record") };
        assert_eq!(out.get("url"), Some(&Val::from("http://localhost/path")));
        assert_eq!(out.get("raw"), Some(&Val::from("{{host}}")));
        assert_eq!(out.get("port"), Some(&Val::Int(8080)));
        let names: Vec<_> = out.fields.iter().map(|f| f.name.to_string()).collect();
        assert_eq!(names, vec!["url", "raw", "port"]);
    }

    #[test]
    fn nested_deferred_calls_resolve_innermost_first() {
        let doc = yaml(
            r#"
"{{echo <-}}":
  message:
    "{{join <-}}":
      prefix: "pre-"
      text:
        "{{call <-}}":
          f: "{{identity}}"
          arg: "test"
      suffix: "-suf"
"#,
        );
        assert_eq!(evaluate(&doc, &fn_env()).unwrap(), Val::from("pre-test-suf"));
    }

    #[test]
    fn deferred_call_inside_a_larger_document() {
        let doc = yaml(
            r#"
before: 1
result:
  "{{echo}}":
    message: "{{21 * 2}}"
"#,
        );
        let Val::Map(out) = evaluate(&doc, &fn_env()).unwrap() else { panic!("expected a mapping") };
        assert_eq!(out.get_str("before"), Some(&Val::Int(1)));
        assert_eq!(out.get_str("result"), Some(&Val::Int(42)));
    }

    #[test]
    fn deferred_call_result_is_coerced_to_the_position() {
        let call = Val::Map(Mapping::open().entry("{{echo <-}}", Mapping::open().entry("message", "7")));
        let rec = Record::new("Step").field("retries", Type::Int, call);
        let Val::Record(out) = evaluate(&Val::Record(rec), &fn_env()).unwrap() else { panic!("expected a record") };
        assert_eq!(out.get("retries"), Some(&Val::Int(7)));
    }

    #[test]
    fn reference_key_to_a_non_function_is_unresolvable() {
        let env = Env::new().with("name", "plain");
        let doc = Val::Map(Mapping::open().entry("{{name <-}}", 1));
        let err = evaluate(&doc, &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnresolvableReference);
        assert_eq!(err.path().to_string(), r#"$."{{name <-}}""#);
    }

    #[test]
    fn non_function_template_key_is_a_plain_key() {
        let env = Env::new().with("name", "k");
        let doc = Val::Map(Mapping::open().entry("{{name}}", "{{name}}"));
        assert_eq!(evaluate(&doc, &env).unwrap(), Val::Map(Mapping::open().entry("k", "k")));
    }

    #[test]
    fn invocation_errors_carry_the_call_path() {
        let mut env = Env::new();
        env.define_fn("boom", |_| Err(anyhow!("connection refused")));
        let doc = yaml(
            r#"
steps:
  - request:
      "{{boom}}": {}
"#,
        );
        let err = evaluate(&doc, &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invocation);
        assert_eq!(err.path().to_string(), "$.steps[0].request");
        assert!(err.to_string().contains("boom failed"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn argument_errors_stop_before_the_call() {
        let env = fn_env();
        let doc = yaml(
            r#"
"{{echo}}":
  message: "{{missing}}"
"#,
        );
        let err = evaluate(&doc, &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Expression);
        assert_eq!(err.path().to_string(), r#"$."{{echo}}".message"#);
    }

    #[test]
    fn absent_and_unchanged_indirections() {
        let absent = Val::Ref(Indirection::absent(Type::Int));
        assert_eq!(evaluate(&absent, &Env::new()).unwrap(), absent);

        let plain = Indirection::to(Type::Int, 5);
        match evaluate(&Val::Ref(plain.clone()), &Env::new()).unwrap() {
            Val::Ref(r) => {
                assert_eq!(r, plain);
                assert!(r.same_cell(&plain));
            }
            other => panic!("expected a reference, got {other:?}"),
        }
    }

    #[test]
    fn changed_indirection_gets_a_new_cell() {
        let env = Env::new().with("n", "12");
        let templated = Indirection::to(Type::Int, "{{n}}");
        match evaluate(&Val::Ref(templated.clone()), &env).unwrap() {
            Val::Ref(r) => {
                assert_eq!(r.get(), Some(&Val::Int(12)));
                assert!(!r.same_cell(&templated));
                assert_eq!(templated.get(), Some(&Val::from("{{n}}")));
            }
            other => panic!("expected a reference, got {other:?}"),
        }
    }

    #[test]
    fn error_paths_name_the_failing_node() {
        let doc = yaml(
            r#"
a:
  b: [1, 2, "{{nope}}"]
"#,
        );
        let err = evaluate(&doc, &Env::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Expression);
        assert_eq!(err.path().to_string(), "$.a.b[2]");
        assert!(err.to_string().starts_with("expression error at $.a.b[2]: "));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn cyclic_variables_fail_with_a_typed_error() {
        let env = Env::new().with("a", "{{b}}").with("b", "{{a}}");
        let doc = yaml("x: '{{a}}'");
        let err = evaluate(&doc, &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Expression);
        assert_eq!(err.path().to_string(), "$.x");
        let cyclic = err.downcast_source::<CyclicReference>().expect("cyclic error");
        assert_eq!(cyclic.chain, vec!["a", "b", "a"]);
    }

    #[test]
    fn keys_evaluating_to_the_same_value_are_rejected() {
        let env = Env::new().with("k", "same");
        let doc = yaml(
            r#"
same: 1
"{{k}}": 2
"#,
        );
        let err = evaluate(&doc, &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);
        assert_eq!(err.path().to_string(), "$.same");
    }

    #[test]
    fn template_keys_follow_the_key_type() {
        let open = Val::Map(Mapping::open().entry("{{1}}", "v"));
        let Val::Map(out) = evaluate(&open, &Env::new()).unwrap() else { panic!("expected a mapping") };
        assert_eq!(out.keys().next(), Some(&Val::Int(1)));

        let typed = Val::Map(Mapping::new(Type::Str, Type::Any).entry(r#"{{"1"}}"#, "v").entry("x", 0));
        let Val::Map(out) = evaluate(&typed, &Env::new()).unwrap() else { panic!("expected a mapping") };
        assert_eq!(out.keys().next(), Some(&Val::from("1")));

        let numeric = Val::Map(Mapping::new(Type::Str, Type::Any).entry("{{40 + 2}}", "v").entry("x", 0));
        let Val::Map(out) = evaluate(&numeric, &Env::new()).unwrap() else { panic!("expected a mapping") };
        assert_eq!(out.keys().next(), Some(&Val::from("42")));
    }

    #[test]
    fn typed_positions_reject_unconvertible_values() {
        let env = Env::new().with("word", "abc");
        let rec = Record::new("Limits").field("max", Type::Int, "{{word}}");
        let err = evaluate(&Val::Record(rec), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Coercion);
        assert_eq!(err.path().to_string(), "$.max");
        assert!(err.to_string().contains("cannot convert string `abc` to int"));

        let seq = Val::Seq(Sequence::with_items(Type::seq(Type::Int), vec![Val::from("{{ [1, 'x'] }}")]));
        let err = evaluate(&seq, &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Coercion);
        assert_eq!(err.path().to_string(), "$[0][1]");
    }

    #[test]
    fn typed_sequence_elements_are_converted() {
        let env = Env::new().with("n", "3");
        let seq = Val::Seq(Sequence::with_items(Type::Float, vec![Val::from("{{n}}"), Val::Int(1)]));
        let out = evaluate(&seq, &env).unwrap();
        assert_eq!(out, Val::Seq(Sequence::with_items(Type::Float, vec![Val::Float(3.0), Val::Int(1)])));
    }

    #[test]
    fn walk_as_uses_the_outer_position_type() {
        let env = Env::new().with("n", "5");
        let doc = yaml("['{{n}}']");
        let out = Walker::new(&Engine::new(), &env).walk_as(&doc, &Type::seq(Type::Int)).unwrap();
        let Val::Seq(out) = out else { panic!("expected a sequence") };
        assert_eq!(out.items, vec![Val::Int(5)]);
    }

    #[test]
    fn error_display_quotes_odd_keys() {
        let doc = Val::Map(Mapping::open().entry("a key", Val::seq(vec![Val::from("{{?}}")])));
        let err = evaluate(&doc, &Env::new()).unwrap_err();
        assert_eq!(err.path().to_string(), r#"$."a key"[0]"#);
        assert_eq!(
            err.path().segments(),
            &[PathSegment::Key(Val::from("a key")), PathSegment::Index(0)]
        );
    }

    #[test]
    fn shared_environment_across_threads() {
        let env = fn_env().with("who", "world");
        let docs: Vec<Val> = (0..8)
            .map(|i| Val::Map(Mapping::open().entry("n", i).entry("greeting", format!("hello {{{{who}}}} {i}"))))
            .collect();

        std::thread::scope(|s| {
            let handles: Vec<_> = docs
                .iter()
                .map(|doc| {
                    let env = &env;
                    s.spawn(move || evaluate(doc, env))
                })
                .collect();
            for (i, h) in handles.into_iter().enumerate() {
                let Val::Map(out) = h.join().unwrap().unwrap() else { panic!("expected a mapping") };
                assert_eq!(out.get_str("greeting"), Some(&Val::from(format!("hello world {i}"))));
            }
        });
        assert_eq!(env.lookup("who"), Some(&Val::from("world")));
    }

    #[test]
    fn functions_in_leaves_pass_through() {
        let f = Func::native("noop", |_| Ok(Val::Nil));
        let doc = Val::seq(vec![Val::Func(f.clone())]);
        assert_eq!(evaluate(&doc, &Env::new()).unwrap(), Val::seq(vec![Val::Func(f)]));
    }
}
