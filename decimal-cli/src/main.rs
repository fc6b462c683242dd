//! Thin command-line front end over `decimal-expr`. Not part of the
//! evaluator itself, just a place to point stdin or argv at it.
//!
//! Usage:
//!   decimal-cli "2*(3+sin(1))"
//!   decimal-cli --acc 50 "sqrt(2)"
//!   decimal-cli --config overrides.json "sqrt(2)"
//!   decimal-cli --f "[x]^2+1" "f(3)"
//!   decimal-cli --check "1/2pi"
//!   decimal-cli            (reads one expression per line from stdin)

use decimal_core::{ConfigOverrides, GlobalConfig, Value};
use decimal_expr::Bindings;
use std::env;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

struct Options {
    acc: Option<u32>,
    config_path: Option<String>,
    f_body: Option<String>,
    g_body: Option<String>,
    check_only: bool,
    expr: Option<String>,
}

fn parse_args() -> Options {
    let mut opts = Options { acc: None, config_path: None, f_body: None, g_body: None, check_only: false, expr: None };
    let mut rest = Vec::new();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--acc" | "-a" => {
                if let Some(v) = args.next() {
                    opts.acc = v.parse().ok();
                }
            }
            "--config" => opts.config_path = args.next(),
            "--f" => opts.f_body = args.next(),
            "--g" => opts.g_body = args.next(),
            "--check" => opts.check_only = true,
            other => rest.push(other.to_string()),
        }
    }
    if !rest.is_empty() {
        opts.expr = Some(rest.join(" "));
    }
    opts
}

/// Builds the effective `GlobalConfig`: a `--config` JSON file supplies the
/// base (falling back to `ConfigOverrides::default()` on read/parse
/// failure, with a warning on stderr), then `--acc` overrides its
/// `default_acc`/`output_acc` (`SPEC_FULL.md` §B "Configuration").
fn build_config(opts: &Options) -> GlobalConfig {
    let mut overrides = match &opts.config_path {
        Some(path) => match std::fs::read_to_string(path).map_err(|e| e.to_string()).and_then(|s| serde_json::from_str::<ConfigOverrides>(&s).map_err(|e| e.to_string())) {
            Ok(overrides) => overrides,
            Err(e) => {
                eprintln!("warning: could not load config '{path}' ({e}); using defaults");
                ConfigOverrides::default()
            }
        },
        None => ConfigOverrides::default(),
    };
    if let Some(acc) = opts.acc {
        overrides.default_acc = acc;
        overrides.output_acc = acc;
    }
    GlobalConfig::from_overrides(overrides)
}

fn format_value(value: &Value, acc: u32, max_output_len: usize) -> decimal_core::Result<String> {
    match value {
        Value::Real(d) => d.to_auto_string(acc, max_output_len),
        Value::Complex(c) => c.to_algebraic_string(acc, max_output_len),
    }
}

fn run_one(expr: &str, cfg: &GlobalConfig, acc: u32, bindings: &Bindings, check_only: bool, out: &mut impl Write) -> bool {
    if check_only {
        return match decimal_expr::syntax_check(expr, cfg) {
            Ok(canonical) => {
                let _ = writeln!(out, "{canonical}");
                true
            }
            Err(e) => {
                eprintln!("{e} ({})", e.code());
                false
            }
        };
    }

    match decimal_expr::calc(expr, cfg, acc, bindings) {
        Ok(outcome) => {
            for warning in &outcome.warnings {
                tracing::warn!("{warning}");
            }
            match format_value(&outcome.value, acc, cfg.max_output_len) {
                Ok(rendered) => {
                    let _ = writeln!(out, "{rendered}");
                    true
                }
                Err(e) => {
                    eprintln!("{e} ({})", e.code());
                    false
                }
            }
        }
        Err(e) => {
            eprintln!("{e} ({})", e.code());
            false
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opts = parse_args();
    let cfg = build_config(&opts);
    let acc = cfg.default_acc;
    let bindings = Bindings { f: opts.f_body.as_deref(), g: opts.g_body.as_deref() };
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Some(expr) = &opts.expr {
        return if run_one(expr, &cfg, acc, &bindings, opts.check_only, &mut out) {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    let stdin = io::stdin();
    let mut reader = io::BufReader::new(stdin.lock());
    let mut all_ok = true;
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if !run_one(line, &cfg, acc, &bindings, opts.check_only, &mut out) {
                    all_ok = false;
                }
            }
            Err(e) => {
                eprintln!("error reading stdin: {e}");
                all_ok = false;
                break;
            }
        }
    }

    if all_ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
