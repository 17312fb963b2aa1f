//! Brace templates CLI
//!
//! Usage:
//!   brace [OPTIONS] [TEMPLATE]
//!
//! Options:
//!   -d, --data <FILE>       JSON data to render against
//!   -t, --templates <DIR>   Directory of templates for `tmpl` and --id
//!       --id <ID>           Render a template from the directory by id
//!   -c, --config <FILE>     Engine configuration (TOML format)
//!       --dump              Print the generated representation
//!   -s, --syntax            Show tag syntax reference
//!   -h, --help              Print help

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use brace_templates::{Engine, EngineConfig, Error};

#[derive(Parser)]
#[command(name = "brace")]
#[command(about = "Render brace templates against JSON data")]
struct Cli {
    /// Template file (reads from stdin if not provided)
    template: Option<PathBuf>,

    /// JSON data file (defaults to an empty mapping)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Directory searched for `tmpl` inclusions and --id
    #[arg(short, long)]
    templates: Option<PathBuf>,

    /// Render the template with this id instead of a file
    #[arg(long, conflicts_with = "template")]
    id: Option<String>,

    /// Engine configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the generated representation instead of rendering
    #[arg(long)]
    dump: bool,

    /// Show tag syntax reference
    #[arg(short, long)]
    syntax: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.syntax {
        print_syntax();
        return;
    }

    if cli.template.is_none() && cli.id.is_none() && io::stdin().is_terminal() {
        print_intro();
        return;
    }

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path).unwrap_or_else(|e| {
            fail(&format!("Error loading config '{}': {}", path.display(), e))
        }),
        None => EngineConfig::default(),
    };
    if let Some(dir) = &cli.templates {
        config = config.with_template_dir(dir);
    }
    let engine = Engine::with_config(config);

    let data = match &cli.data {
        Some(path) => read_data(path),
        None => Value::Object(Default::default()),
    };

    if let Some(id) = &cli.id {
        run_by_id(&engine, id, &data, cli.dump);
        return;
    }

    let (source, name) = match &cli.template {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => fail(&format!("Error reading file '{}': {}", path.display(), e)),
        },
        None => {
            let mut buffer = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut buffer) {
                fail(&format!("Error reading from stdin: {}", e));
            }
            (buffer, "<stdin>".to_string())
        }
    };

    if cli.dump {
        match engine.compile(&source) {
            Ok(compiled) => print!("{}", compiled.generated()),
            Err(e) => report(&e, &source, &name),
        }
        return;
    }

    match engine.render(&source, &data) {
        Ok(output) => print!("{}", output),
        Err(e) => report(&e, &source, &name),
    }
}

fn run_by_id(engine: &Engine, id: &str, data: &Value, dump: bool) {
    let result = if dump {
        engine
            .compile_by_id(id)
            .map(|compiled| compiled.map(|c| c.generated().to_string()))
    } else {
        engine.render_by_id(id, data)
    };

    match result {
        Ok(Some(output)) => print!("{}", output),
        Ok(None) => fail(&format!("Error: no template with id '{}'", id)),
        Err(e) => {
            let source = engine
                .last_error()
                .map(|record| record.template)
                .unwrap_or_default();
            report(&e, &source, id)
        }
    }
}

fn read_data(path: &Path) -> Value {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| fail(&format!("Error reading data '{}': {}", path.display(), e)));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| fail(&format!("Error parsing data '{}': {}", path.display(), e)))
}

/// Structural errors get a source report; everything else a single line
fn report(error: &Error, source: &str, name: &str) -> ! {
    match error {
        Error::Compile(e) => {
            tracing::debug!(line = e.line(), "structural error");
            eprint!("{}", e.format(source, name))
        }
        other => eprintln!("Error: {}", other),
    }
    process::exit(1);
}

fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    process::exit(1);
}

fn print_intro() {
    println!(
        r#"Brace - render {{...}}-tagged text templates against JSON data

USAGE:
    brace [OPTIONS] [TEMPLATE]
    echo 'Hello {{name}}!' | brace --data data.json

OPTIONS:
    -d, --data        JSON data file
    -t, --templates   Directory of templates for {{tmpl ...}} and --id
        --id          Render a template from the directory by id
    -c, --config      Engine configuration (TOML file)
        --dump        Print the compiled node tree instead of rendering
    -s, --syntax      Show tag syntax reference
    -h, --help        Print help

Set RUST_LOG=brace_templates=debug to trace compile and cache activity."#
    );
}

fn print_syntax() {
    println!(
        r#"BRACE TEMPLATE SYNTAX
=====================

INSERTS
-------
{{expr}}               HTML-escaped value
{{esc expr}}           Same as above
{{raw expr}}           Unescaped value
{{json expr}}          JSON text, HTML-escaped
{{raw-json expr}}      JSON text, unescaped

EXPRESSIONS
-----------
user.name  items[0]  rows.0.1      Paths into the data
'text'  "text"  42  -1.5           Literals
{{a: 1, b}}  [1, 2]                  Object and array literals
num(x)  name.upper()               Function calls
a + b - c  a == b  a > b && c      Operators, strictly left to right

LOOPS
-----
{{each items}} {{$}} {{$k}} {{$i}} {{/each}}
{{each v as k at i in items}} {{k}}={{v}} {{/each}}

Slots: $ element, $k key, $i position, $$ collection,
       $n length, $keys key list

CONDITIONALS
------------
{{if expr}} ... {{else-if expr}} ... {{else}} ... {{/if}}
{{unless expr}} ... {{/unless}}
{{if-empty list}}  {{if-key 'a' in obj}}  {{if-val 3 in list}}
{{if-first}}  {{if-last}}           Position inside an each
Add -not (if-not-empty) or use unless to invert.
$0 and $1 hold the tested operands inside the branch.

OTHER
-----
{{tmpl id name: expr}}  Render another template with extra locals
{{* comment *}}         Removed, with surrounding whitespace
{{{{}}  {{}}}}              Literal braces
{{expr *}}             Also drops whitespace after the tag"#
    );
}
