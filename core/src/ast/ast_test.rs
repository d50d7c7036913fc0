#[cfg(test)]
mod test {
    use crate::{
        ast::Parser,
        expr::Expr,
        op::{BinOp, UnaryOp},
        token::{Token, Tokenizer},
        val::Val,
    };

    fn parse(src: &str) -> Expr {
        let tokens = Tokenizer::tokenize(src).unwrap();
        Parser::new(&tokens).parse().unwrap()
    }

    fn var(name: &str) -> Box<Expr> {
        Box::new(Expr::Var(name.to_string()))
    }

    fn field(name: &str) -> Box<Expr> {
        Box::new(Expr::Val(Val::Str(name.into())))
    }

    #[test]
    fn basic() {
        let tokens = vec![
            Token::Id("req".to_string()),
            Token::Dot,
            Token::Id("user".to_string()),
            Token::Dot,
            Token::Id("age".to_string()),
            Token::Gt,
            Token::Int(18),
        ];
        let expr = Expr::Bin(
            Box::new(Expr::Access(Box::new(Expr::Access(var("req"), field("user"))), field("age"))),
            BinOp::Gt,
            Box::new(Expr::Val(18.into())),
        );
        let parsed = Parser::new(&tokens).parse().unwrap();
        assert_eq!(parsed, expr);
    }

    #[test]
    fn empty_input_is_nil() {
        assert_eq!(Parser::new(&[]).parse().unwrap(), Expr::Val(Val::Nil));
    }

    #[test]
    fn paren() {
        let r = r#"
        (
            true
            ||
            false
        )
        "#;
        let expected = Expr::Paren(Box::new(Expr::Val(Val::Bool(true))));
        assert_eq!(parse(r), expected);
    }

    #[test]
    fn constant_folding() {
        assert_eq!(parse("1 + 2 * 3"), Expr::Val(Val::Int(7)));
        assert_eq!(parse("-(2)"), Expr::Unary(UnaryOp::Neg, Box::new(Expr::Paren(Box::new(Expr::Val(Val::Int(2)))))));
        assert_eq!(parse("-2"), Expr::Val(Val::Int(-2)));
        assert_eq!(parse(r#""a" + "b""#), Expr::Val(Val::from("ab")));
    }

    #[test]
    fn failing_constants_stay_unfolded() {
        assert_eq!(
            parse("1 / 0"),
            Expr::Bin(Box::new(Expr::Val(Val::Int(1))), BinOp::Div, Box::new(Expr::Val(Val::Int(0))))
        );
    }

    #[test]
    fn precedence() {
        // a || b && c  =>  a || (b && c)
        assert_eq!(parse("a || b && c"), Expr::Or(var("a"), Box::new(Expr::And(var("b"), var("c")))));
        // a ?? b || c  =>  a ?? (b || c)
        assert_eq!(
            parse("a ?? b || c"),
            Expr::NullishCoalescing(var("a"), Box::new(Expr::Or(var("b"), var("c"))))
        );
        // a - b - c is left associative
        assert_eq!(
            parse("a - b - c"),
            Expr::Bin(Box::new(Expr::Bin(var("a"), BinOp::Sub, var("b"))), BinOp::Sub, var("c"))
        );
    }

    #[test]
    fn conditional_is_right_associative() {
        let parsed = parse("a ? b : c ? d : e");
        let expected = Expr::Conditional(var("a"), var("b"), Box::new(Expr::Conditional(var("c"), var("d"), var("e"))));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn calls() {
        assert_eq!(parse("f()"), Expr::Call(var("f"), vec![]));
        assert_eq!(parse("f(a, 1)"), Expr::Call(var("f"), vec![var("a"), Box::new(Expr::Val(Val::Int(1)))]));
        assert_eq!(
            parse("join(prefix: \"pre-\", text: t)"),
            Expr::CallNamed(
                var("join"),
                vec![
                    ("prefix".to_string(), Box::new(Expr::Val(Val::from("pre-")))),
                    ("text".to_string(), var("t")),
                ]
            )
        );
        // chained postfix: a.b(c)[0]
        assert_eq!(
            parse("a.b(c)[0]"),
            Expr::Access(
                Box::new(Expr::Call(Box::new(Expr::Access(var("a"), field("b"))), vec![var("c")])),
                Box::new(Expr::Val(Val::Int(0)))
            )
        );
    }

    #[test]
    fn mixing_named_and_positional_fails() {
        let tokens = Tokenizer::tokenize("f(a: 1, 2)").unwrap();
        let err = Parser::new(&tokens).parse().unwrap_err();
        assert!(err.to_string().contains("Positional arguments cannot follow named arguments"));
    }

    #[test]
    fn list_and_map_literals() {
        assert_eq!(parse("[]"), Expr::List(vec![]));
        assert_eq!(parse("[1, a,]"), Expr::List(vec![Box::new(Expr::Val(Val::Int(1))), var("a")]));
        assert_eq!(
            parse(r#"{name: n, "x-id": 1}"#),
            Expr::Map(vec![
                (field("name"), var("n")),
                (field("x-id"), Box::new(Expr::Val(Val::Int(1)))),
            ])
        );
    }

    #[test]
    fn keyword_field_names() {
        assert_eq!(parse("a.true"), Expr::Access(var("a"), field("true")));
        assert_eq!(parse("a.nil"), Expr::Access(var("a"), field("nil")));
    }

    #[test]
    fn syntax_errors() {
        for src in ["(a", "[1 2]", "{a 1}", "a ? b", "a.", "f(a b)", "a b", "1 +"] {
            let tokens = Tokenizer::tokenize(src).unwrap();
            let result = Parser::new(&tokens).parse();
            assert!(result.is_err(), "expected a syntax error for {src:?}");
            assert!(result.unwrap_err().to_string().starts_with("Syntax error"));
        }
    }

    #[test]
    fn errors_point_at_the_offending_token() {
        let (tokens, spans) = Tokenizer::tokenize_with_spans("a + )").unwrap();
        let err = Parser::new_with_spans(&tokens, &spans)
            .parse_with_enhanced_errors()
            .unwrap_err();
        let span = err.span.expect("span");
        assert_eq!(span.start.column, 5);
    }
}
