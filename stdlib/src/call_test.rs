#[cfg(test)]
mod tests {
    use anyhow::Result;
    use scena_core::val::{Callable, Func, Mapping, Val};

    use crate::call::{Call, Echo, Join};

    #[test]
    fn echo_returns_the_message() -> Result<()> {
        let arg = Val::Map(Mapping::open().entry("message", 42));
        assert_eq!(Echo.call(arg)?, Val::Int(42));
        assert_eq!(Echo.call(Val::from("plain"))?, Val::from("plain"));
        let other = Val::Map(Mapping::open().entry("other", 1));
        assert_eq!(Echo.call(other.clone())?, other);
        Ok(())
    }

    #[test]
    fn join_concatenates_named_parts() -> Result<()> {
        let arg = Val::Map(Mapping::open().entry("prefix", "pre-").entry("text", 7).entry("suffix", "-suf"));
        assert_eq!(Join.call(arg)?, Val::from("pre-7-suf"));

        let partial = Val::Map(Mapping::open().entry("text", "only"));
        assert_eq!(Join.call(partial)?, Val::from("only"));
        Ok(())
    }

    #[test]
    fn join_concatenates_positional_parts() -> Result<()> {
        let arg = Val::seq(vec![Val::from("a"), Val::Int(1), Val::Nil, Val::Bool(true)]);
        assert_eq!(Join.call(arg)?, Val::from("a1true"));
        assert_eq!(Join.call(Val::Nil)?, Val::from(""));
        assert!(Join.call(Val::Func(Func::new(Echo))).is_err());
        Ok(())
    }

    #[test]
    fn call_forwards_the_argument() -> Result<()> {
        let upper = Func::native("upper", |v| Ok(Val::from(v.render_text().to_uppercase())));
        let named = Val::Map(Mapping::open().entry("f", upper.clone()).entry("arg", "abc"));
        assert_eq!(Call.call(named)?, Val::from("ABC"));

        let positional = Val::seq(vec![Val::Func(upper), Val::from("xyz")]);
        assert_eq!(Call.call(positional)?, Val::from("XYZ"));
        Ok(())
    }

    #[test]
    fn call_rejects_non_functions() {
        let arg = Val::Map(Mapping::open().entry("f", "echo").entry("arg", 1));
        let err = Call.call(arg).unwrap_err();
        assert_eq!(err.to_string(), "call() `f` must be a function, got string");
        assert!(Call.call(Val::Int(1)).is_err());
    }
}
