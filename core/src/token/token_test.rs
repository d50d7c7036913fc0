#[cfg(test)]
mod tests {
    use crate::token::{Token, Tokenizer};

    #[test]
    fn basic() {
        let t1 = Tokenizer::tokenize(r#"1.3+*/ % ==  "str1" 'str2' true false nil null"#);
        let e1 = vec![
            Token::Float(1.3),
            Token::Add,
            Token::Mul,
            Token::Div,
            Token::Mod,
            Token::Eq,
            Token::Str("str1".to_string()),
            Token::Str("str2".to_string()),
            Token::Bool(true),
            Token::Bool(false),
            Token::Nil,
            Token::Nil,
        ];
        assert_eq!(t1.unwrap(), e1);
    }

    #[test]
    fn punctuations() {
        let t2 = Tokenizer::tokenize(">=<= && || == != ! > < ?? ? :");
        let e2 = vec![
            Token::Ge,
            Token::Le,
            Token::And,
            Token::Or,
            Token::Eq,
            Token::Ne,
            Token::Not,
            Token::Gt,
            Token::Lt,
            Token::NullishCoalescing,
            Token::Question,
            Token::Colon,
        ];
        assert_eq!(t2.unwrap(), e2);
    }

    #[test]
    fn minus_is_always_an_operator() {
        let tokens = Tokenizer::tokenize("5-3").unwrap();
        assert_eq!(tokens, vec![Token::Int(5), Token::Sub, Token::Int(3)]);

        let tokens = Tokenizer::tokenize("-1").unwrap();
        assert_eq!(tokens, vec![Token::Sub, Token::Int(1)]);
    }

    #[test]
    fn member_access_and_calls() {
        let tokens = Tokenizer::tokenize("vars.items[0].name").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Id("vars".to_string()),
                Token::Dot,
                Token::Id("items".to_string()),
                Token::LBracket,
                Token::Int(0),
                Token::RBracket,
                Token::Dot,
                Token::Id("name".to_string()),
            ]
        );

        let tokens = Tokenizer::tokenize("list.0.id").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Id("list".to_string()),
                Token::Dot,
                Token::Int(0),
                Token::Dot,
                Token::Id("id".to_string()),
            ]
        );

        let tokens = Tokenizer::tokenize("join(a, 'b')").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Id("join".to_string()),
                Token::LParen,
                Token::Id("a".to_string()),
                Token::Comma,
                Token::Str("b".to_string()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn numbers() {
        let tokens = Tokenizer::tokenize("42 0.5 1e3 2.5E-1").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Int(42), Token::Float(0.5), Token::Float(1000.0), Token::Float(0.25)]
        );
        assert!(Tokenizer::tokenize("1e").is_err());
        assert!(Tokenizer::tokenize("99999999999999999999").is_err());
    }

    #[test]
    fn string_escapes() {
        let tokens = Tokenizer::tokenize(r#""a\"b\n" 'it\'s'"#).unwrap();
        assert_eq!(
            tokens,
            vec![Token::Str("a\"b\n".to_string()), Token::Str("it's".to_string())]
        );
    }

    #[test]
    fn identifiers_keep_underscores_and_unicode() {
        let tokens = Tokenizer::tokenize("TEST_ADDR + 名前").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Id("TEST_ADDR".to_string()),
                Token::Add,
                Token::Id("名前".to_string())
            ]
        );
    }

    #[test]
    fn errors_carry_position() {
        assert!(Tokenizer::tokenize("'open").is_err());
        assert!(Tokenizer::tokenize("a = b").is_err());
        assert!(Tokenizer::tokenize("a & b").is_err());

        let err = Tokenizer::tokenize_with_spans("a\n  #").unwrap_err();
        let span = err.span.expect("span");
        assert_eq!(span.start.line, 2);
        assert_eq!(span.start.column, 3);
    }

    #[test]
    fn spans_align_with_tokens() {
        let (tokens, spans) = Tokenizer::tokenize_with_spans("ab == 'c'").unwrap();
        assert_eq!(tokens.len(), spans.len());
        assert_eq!(spans[0].start.column, 1);
        assert_eq!(spans[0].end.column, 3);
        assert_eq!(spans[1].start.column, 4);
        assert_eq!(spans[2].start.column, 7);
    }
}
