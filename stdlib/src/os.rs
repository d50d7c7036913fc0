use scena_core::val::{Mapping, Type, Val};

/// Snapshot of the process environment as a string-keyed mapping, sorted by name.
///
/// Variables whose name or value is not valid UTF-8 are left out.
pub fn process_env() -> Mapping {
    let mut vars: Vec<(String, String)> = std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect();
    vars.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    let mut out = Mapping::with_capacity(Type::Str, Type::Str, vars.len());
    for (k, v) in vars {
        out.insert(Val::from(k), Val::from(v));
    }
    out
}
