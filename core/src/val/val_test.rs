#[cfg(test)]
mod tests {
    use crate::val::{Func, Indirection, Mapping, Record, Sequence, Type, Val};
    use std::collections::HashMap;
    use std::sync::Arc;

    macro_rules! test_op {
        ($name:ident, $op:tt, $l:expr, $r:expr, $res:expr) => {
            #[test]
            fn $name() {
                let l: Val = $l.into();
                let r: Val = $r.into();
                let res: Val = $res.into();
                assert_eq!((&l $op &r).unwrap(), res);
            }
        };
    }

    test_op!(add, +, 1, 2, 3);
    test_op!(sub, -, 1, 2, -1);
    test_op!(mul, *, 2, 3, 6);
    test_op!(div, /, 3, 2, 1.5);
    test_op!(div_exact, /, 6, 2, 3);
    test_op!(list_add_list, +, vec![1], vec![2], vec![1, 2]);

    test_op!(mod_int, %, 7, 3, 1);
    test_op!(mod_float, %, 7.5, 2.0, 1.5);
    test_op!(mod_mixed1, %, 7, 2.5, 2.0);
    test_op!(mod_mixed2, %, 7.5, 2, 1.5);

    mod adv_arith_tests {
        use super::*;

        test_op!(str_add_int, +, "hello", 123, "hello123");
        test_op!(str_add_float, +, "hello", 12.34, "hello12.34");
        test_op!(int_add_str, +, 123, "hello", "123hello");
        test_op!(str_add_bool, +, "flag=", true, "flag=true");

        #[test]
        fn str_add_nil_is_invalid() {
            let err = (&Val::from("a") + &Val::Nil).unwrap_err();
            assert_eq!(err.to_string(), "Invalid op: string + nil");
        }
    }

    #[test]
    fn test_mapping_insert_keeps_position() {
        let mut map = Mapping::open().entry("a", 1).entry("b", 2);
        let old = map.insert("a", 10);
        assert_eq!(old, Some(Val::Int(1)));
        let pairs: Vec<_> = map.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        assert_eq!(pairs, vec![("a".to_string(), Val::Int(10)), ("b".to_string(), Val::Int(2))]);
    }

    #[test]
    fn test_mapping_single() {
        let single = Mapping::open().entry("{{f <-}}", Val::Nil);
        assert!(single.single().is_some());
        assert!(Mapping::open().single().is_none());
        assert!(Mapping::open().entry("a", 1).entry("b", 2).single().is_none());
    }

    #[test]
    fn test_sequence_negative_index() {
        let seq = Sequence::with_items(Type::Int, vec![Val::Int(1), Val::Int(2), Val::Int(3)]);
        assert_eq!(seq.get(-1), Some(&Val::Int(3)));
        assert_eq!(seq.get(0), Some(&Val::Int(1)));
        assert_eq!(seq.get(3), None);
        assert_eq!(seq.get(-4), None);
    }

    #[test]
    fn test_record_fields() {
        let rec = Record::new("Request")
            .field("url", Type::Str, "http://localhost")
            .fixed_field("secret", Type::Str, "{{token}}");
        assert_eq!(rec.get("url"), Some(&Val::from("http://localhost")));
        assert!(rec.fields[0].settable);
        assert!(!rec.fields[1].settable);
        assert_eq!(rec.get("missing"), None);
    }

    #[test]
    fn test_indirection_identity() {
        let a = Indirection::to(Type::Str, "x");
        let b = a.clone();
        let c = Indirection::to(Type::Str, "x");
        assert!(a.same_cell(&b));
        assert!(!a.same_cell(&c));
        assert_eq!(a, c);
        assert!(Indirection::absent(Type::Int).same_cell(&Indirection::absent(Type::Int)));
    }

    #[test]
    fn test_deref_follows_chains() {
        let inner = Val::Ref(Indirection::to(Type::Int, 5));
        let outer = Val::Ref(Indirection::to(Type::reference(Type::Int), inner));
        assert_eq!(outer.deref(), &Val::Int(5));
        assert_eq!(Val::Ref(Indirection::absent(Type::Int)).deref(), &Val::Nil);
    }

    #[test]
    fn test_partial_ord() {
        assert!(Val::Int(1) < Val::Int(2));
        assert!(Val::Float(1.5) > Val::Int(1));
        assert!(Val::from("a") < Val::from("b"));
        assert_eq!(Val::Int(1).partial_cmp(&Val::from("1")), None);
    }

    #[test]
    fn test_int_and_float_are_distinct_values() {
        assert_ne!(Val::Int(1), Val::Float(1.0));
    }

    #[test]
    fn test_func_equality_is_identity() {
        let f = Func::native("id", Ok);
        let g = Func::native("id", Ok);
        assert_eq!(Val::Func(f.clone()), Val::Func(f.clone()));
        assert_ne!(Val::Func(f), Val::Func(g));
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(Val::Nil.to_string(), "nil");
        assert_eq!(Val::Float(2.0).to_string(), "2.0");
        assert_eq!(Val::Int(-3).to_string(), "-3");
        assert_eq!(Val::from("hi").to_string(), "hi");
        assert_eq!(Val::Ref(Indirection::to(Type::Int, 1)).to_string(), "&1");
        assert_eq!(Val::from(vec![1, 2]).to_string(), "[1,2]");
        assert_eq!(Val::Func(Func::native("echo", Ok)).to_string(), "<function echo>");
    }

    #[test]
    fn test_render_text() {
        assert_eq!(Val::Nil.render_text(), "");
        assert_eq!(Val::Float(0.5).render_text(), "0.5");
        assert_eq!(Val::Map(Mapping::open().entry("a", 1)).render_text(), r#"{"a":1}"#);
        assert_eq!(Val::Ref(Indirection::to(Type::Str, "x")).render_text(), "x");
    }

    #[test]
    fn test_from_hash_map() {
        let mut host = HashMap::new();
        host.insert("k", 1);
        let Val::Map(map) = Val::from(host) else {
            panic!("Expected map");
        };
        assert_eq!(map.get_str("k"), Some(&Val::Int(1)));
    }

    #[test]
    fn test_from_yaml_value_keeps_non_string_keys() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("1: one\nname: x\n").unwrap();
        let Val::Map(map) = Val::from(yaml) else {
            panic!("Expected map");
        };
        assert_eq!(map.get(&Val::Int(1)), Some(&Val::Str(Arc::from("one"))));
        assert_eq!(map.get_str("name"), Some(&Val::from("x")));
    }

    #[test]
    fn test_try_from_serialize() {
        #[derive(serde::Serialize)]
        struct Host {
            name: &'static str,
            port: u16,
        }
        let val = Val::try_from(Host { name: "api", port: 443 }).unwrap();
        let Val::Map(map) = val else {
            panic!("Expected map");
        };
        assert_eq!(map.get_str("port"), Some(&Val::Int(443)));
    }

    #[test]
    fn test_try_from_keeps_field_order() {
        #[derive(serde::Serialize)]
        struct Request {
            url: &'static str,
            method: &'static str,
            body: Option<&'static str>,
        }
        let val = Val::try_from(Request {
            url: "/users",
            method: "POST",
            body: None,
        })
        .unwrap();
        let Val::Map(map) = val else {
            panic!("Expected map");
        };
        let keys: Vec<_> = map.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["url", "method", "body"]);
        assert_eq!(map.get_str("body"), Some(&Val::Nil));
    }
}
