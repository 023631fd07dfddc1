use std::env;
use std::io::{self, BufRead};

use anyhow::{bail, Context, Result};
use thompson_nfa::parser::DEPTH_CEILING;
use thompson_nfa::{Config, Error, Fault};

// Prints a fault with a caret under its position in the pattern.
fn report(kind: &str, pattern: &str, fault: &Fault) {
    eprintln!("{}: {}", kind, fault);
    eprintln!("  {}", pattern);
    eprintln!("  {}^", " ".repeat(fault.pos()));
}

// Prints the parse tree and numbered NFA for one pattern.
fn show(config: &Config, pattern: &str, dot: bool) {
    match config.compile(pattern) {
        Ok(compiled) => {
            for warning in compiled.warnings.iter() {
                report("warning", pattern, warning);
            }
            print!("{}", compiled.tree);
            if dot {
                print!("{}", compiled.nfa.dot());
            } else {
                print!("{}", compiled.nfa);
            }
        }
        Err(Error::Pattern(diagnostics)) => {
            for fault in diagnostics.iter() {
                report("error", pattern, fault);
            }
        }
        Err(err @ Error::Construction(_)) => eprintln!("error: {}", err),
    }
}

// Usage: thompson-nfa [--dot] [--max-depth N] [PATTERN...]
// With no patterns, reads one pattern per line from stdin.
fn main() -> Result<()> {
    env_logger::init();

    let mut config = Config::default();
    let mut dot = false;
    let mut patterns = Vec::new();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dot" => dot = true,
            "--max-depth" => {
                let value = args.next().context("--max-depth needs a value")?;
                let depth = value
                    .parse()
                    .with_context(|| format!("invalid --max-depth {:?}", value))?;
                if depth > DEPTH_CEILING {
                    bail!("--max-depth may be at most {}", DEPTH_CEILING);
                }
                config = config.max_depth(depth);
            }
            flag if flag.starts_with("--") => bail!("unknown option {}", flag),
            _ => patterns.push(arg),
        }
    }

    if !patterns.is_empty() {
        for pattern in &patterns {
            show(&config, pattern, dot);
        }
        return Ok(());
    }

    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read pattern from stdin")?;
        show(&config, line.trim_end_matches('\r'), dot);
    }
    Ok(())
}
