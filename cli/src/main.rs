use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::sync::Once;

use anyhow::Context;
use clap::{Parser, Subcommand};
use scena_core::{
    Env,
    template::{Template, is_template},
    val::{
        Val,
        de::{Format, from_yaml_str, parse_with_format},
    },
    walk::{Path as DocPath, PathSegment},
};
use tracing::debug;


static TRACE_INIT: Once = Once::new();
const DEFAULT_TRACE_FILTER: &str = "scena_core=debug,scena_stdlib=debug,scena=info";

#[derive(Debug, Parser)]
#[command(
    name = "scena",
    author,
    version,
    about = "Render scenario documents by resolving their {{ }} templates",
    long_about = None
)]
struct CliArgs {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve every template in a document and print the result.
    Render {
        /// Document to render (`-` reads stdin)
        #[arg(value_name = "DOC")]
        doc: PathBuf,
        /// Variables file (JSON, YAML or TOML mapping); later files override earlier ones
        #[arg(long = "vars", value_name = "FILE")]
        vars: Vec<PathBuf>,
        /// Single variable binding, applied after all variables files
        #[arg(long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,
        /// Output format
        #[arg(long, value_name = "FORMAT", value_parser = parse_format, default_value = "json")]
        format: Format,
        /// Input format of DOC and variables files (detected when omitted)
        #[arg(long, value_name = "FORMAT", value_parser = parse_format)]
        input_format: Option<Format>,
        /// Do not expose the process environment as `env`
        #[arg(long)]
        no_env: bool,
    },
    /// Check that every template in a document parses, without evaluating it.
    Check {
        /// Document to check (`-` reads stdin)
        #[arg(value_name = "DOC")]
        doc: PathBuf,
        #[arg(long, value_name = "FORMAT", value_parser = parse_format)]
        input_format: Option<Format>,
    },
}

fn read_file_content(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read document from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("Failed to read file '{}': {}", path.display(), e))
}

fn parse_format(raw: &str) -> Result<Format, String> {
    raw.parse::<Format>().map_err(|e| e.to_string())
}

fn env_toggle_enabled(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return false;
    }
    !(trimmed.eq_ignore_ascii_case("0") || trimmed.eq_ignore_ascii_case("false") || trimmed.eq_ignore_ascii_case("off"))
}

fn filter_expr_from(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("1")
        || trimmed.eq_ignore_ascii_case("true")
        || trimmed.eq_ignore_ascii_case("on")
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn maybe_init_tracing() {
    let raw = match std::env::var("SCENA_TRACE") {
        Ok(value) => value,
        Err(_) => return,
    };

    if !env_toggle_enabled(&raw) {
        return;
    }

    TRACE_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        use tracing_subscriber::fmt;

        let filter_expr = filter_expr_from(&raw).or_else(|| std::env::var("RUST_LOG").ok());

        let builder = fmt().with_writer(std::io::stderr);

        let builder = match filter_expr.and_then(|expr| EnvFilter::try_new(expr).ok()) {
            Some(filter) => builder.with_env_filter(filter),
            None => builder.with_env_filter(DEFAULT_TRACE_FILTER),
        };

        let _ = builder.try_init();
    });
}

fn load_document(path: &Path, format: Option<Format>) -> anyhow::Result<Val> {
    let src = read_file_content(path)?;
    parse_with_format(&src, format).with_context(|| format!("Failed to load '{}'", path.display()))
}

/// Split `NAME=VALUE`. Scalars are typed the YAML way (`n=3` binds an int); anything
/// else, templates included, stays a string.
pub(crate) fn parse_set(raw: &str) -> anyhow::Result<(String, Val)> {
    let (name, value) = raw
        .split_once('=')
        .filter(|(name, _)| !name.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("invalid --set '{raw}': expected NAME=VALUE"))?;
    let typed = match from_yaml_str(value) {
        Ok(v @ (Val::Nil | Val::Bool(_) | Val::Int(_) | Val::Float(_))) if !value.trim().is_empty() => v,
        _ => Val::from(value),
    };
    Ok((name.trim().to_string(), typed))
}

pub(crate) fn build_env(
    vars: &[PathBuf],
    set: &[String],
    input_format: Option<Format>,
    process_env: bool,
) -> anyhow::Result<Env> {
    let mut env = Env::new();
    scena_stdlib::register_stdlib_globals(&mut env);
    if process_env {
        scena_stdlib::register_process_env(&mut env);
    }
    for path in vars {
        let doc = load_document(path, input_format)?;
        let file_env = Env::from_document(&doc).with_context(|| format!("Invalid variables file '{}'", path.display()))?;
        debug!(file = %path.display(), count = file_env.len(), "loaded variables");
        env.extend_from(&file_env);
    }
    for raw in set {
        let (name, value) = parse_set(raw)?;
        env.define(name, value);
    }
    Ok(env)
}

/// Parse every template in `doc` (keys included), recording failures with their path.
/// Returns the number of templates seen.
pub(crate) fn check_templates(doc: &Val, path: &mut Vec<PathSegment>, errors: &mut Vec<String>) -> usize {
    match doc {
        Val::Str(s) if is_template(s) => {
            if let Err(e) = Template::parse(s) {
                errors.push(format!("{}: {}", DocPath(path.clone()), e));
            }
            1
        }
        Val::Seq(seq) => {
            let mut n = 0;
            for (i, item) in seq.items.iter().enumerate() {
                path.push(PathSegment::Index(i));
                n += check_templates(item, path, errors);
                path.pop();
            }
            n
        }
        Val::Map(map) => {
            let mut n = 0;
            for (k, v) in map.iter() {
                path.push(PathSegment::Key(k.clone()));
                n += check_templates(k, path, errors);
                n += check_templates(v, path, errors);
                path.pop();
            }
            n
        }
        Val::Record(rec) => {
            let mut n = 0;
            for field in rec.fields.iter().filter(|f| f.settable) {
                path.push(PathSegment::Field(field.name.clone()));
                n += check_templates(&field.value, path, errors);
                path.pop();
            }
            n
        }
        Val::Ref(r) => r.get().map_or(0, |v| check_templates(v, path, errors)),
        _ => 0,
    }
}

fn main() -> anyhow::Result<()> {
    maybe_init_tracing();

    let CliArgs { command } = CliArgs::parse();

    match command {
        Commands::Render {
            doc,
            vars,
            set,
            format,
            input_format,
            no_env,
        } => {
            let document = load_document(&doc, input_format)?;
            let env = build_env(&vars, &set, input_format, !no_env)?;
            let rendered = match scena_core::evaluate(&document, &env) {
                Ok(v) => v,
                Err(err) => {
                    eprintln!("Error: {}", err);
                    std::process::exit(1);
                }
            };
            let out = format.render(&rendered)?;
            if out.ends_with('\n') {
                print!("{out}");
            } else {
                println!("{out}");
            }
        }
        Commands::Check { doc, input_format } => {
            let document = load_document(&doc, input_format)?;
            let mut errors = Vec::new();
            let count = check_templates(&document, &mut Vec::new(), &mut errors);
            if !errors.is_empty() {
                for e in &errors {
                    eprintln!("Error: {}", e);
                }
                std::process::exit(1);
            }
            println!("{}: {} templates ok", doc.display(), count);
        }
    }

    Ok(())
}
