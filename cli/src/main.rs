//! rfx: the command-line entry point for reflective documents.
//!
//! # Usage
//!
//! ```text
//! rfx get config.yaml app/authors/0/name
//! rfx --format yaml get config.yaml app
//! rfx set config.yaml app/version '"2.0.0"' --in-place
//! rfx delete config.json app/tags/-1
//! rfx keys config.yaml app
//! ```
//!
//! Settings are read from the YAML file named by `RFX_CONFIG` when set,
//! then overlaid with `RFX_*` environment variables and `--delimiter`.

mod args;

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use reflective_core::settings::{self, Settings};
use reflective_core::{export, Address, Document, Error, Handle, Result, View};

use args::{Cli, Commands, Format};


fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = match load_settings(resolve_config_path().as_deref(), cli.delimiter.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("rfx: {}", e);
            process::exit(1);
        }
    };

    match run(&cli, settings) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("rfx error: {}", e);
            process::exit(1);
        }
    }
}


fn resolve_config_path() -> Option<PathBuf> {
    std::env::var("RFX_CONFIG").ok().map(PathBuf::from)
}


/// Settings file (if any), then environment, then the command line.
fn load_settings(config: Option<&Path>, delimiter: Option<&str>) -> Result<Settings> {
    let base = match config {
        Some(path) => settings::load(path)?,
        None => settings::default_settings(),
    };
    let mut s = base.apply_env()?;
    if let Some(d) = delimiter {
        s.delimiter = d.to_string();
        s.validate()?;
    }
    Ok(s)
}


fn run(cli: &Cli, settings: Settings) -> Result<String> {
    match &cli.command {
        Commands::Get { file, address } => {
            let doc = Document::load(file, settings)?;
            let value = match address {
                Some(a) => read_address(&doc, a, cli.raw)?,
                None => read_handle(&doc.root(), cli.raw)?,
            };
            format_value(&value, cli.format)
        }
        Commands::Set {
            file,
            address,
            value,
            in_place,
        } => {
            let doc = Document::load(file, settings)?;
            doc.set(address.as_str(), parse_value(value))?;
            finish(cli, &doc, file, *in_place)
        }
        Commands::Delete {
            file,
            address,
            in_place,
        } => {
            let doc = Document::load(file, settings)?;
            let removed = doc.delete(address.as_str())?;
            debug!(address = %address, removed = %removed, "deleted entry");
            finish(cli, &doc, file, *in_place)
        }
        Commands::Keys { file, address } => {
            let doc = Document::load(file, settings)?;
            let handle = locate(&doc, address.as_deref())?;
            let keys: Vec<String> = match handle.view()? {
                view @ View::Sequence(_) => (0..view.len()?).map(|i| i.to_string()).collect(),
                view => view.keys()?,
            };
            Ok(keys.join("\n"))
        }
    }
}


fn locate(doc: &Document, address: Option<&str>) -> Result<Handle> {
    match address {
        Some(a) => doc.at(a),
        None => Ok(doc.root()),
    }
}


/// Value at `query`. A slice-terminated address always reads as a
/// sequence of the selected elements.
fn read_address(doc: &Document, query: &str, raw: bool) -> Result<Value> {
    let address = Address::parse(query, doc.delimiter());
    let handles = doc.query(query);
    if address.ends_with_slice() {
        return handles
            .iter()
            .map(|h| read_handle(h, raw))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array);
    }
    match handles.first() {
        Some(handle) => read_handle(handle, raw),
        None => Err(Error::MissingMember(address.canonical(&[]))),
    }
}


fn read_handle(handle: &Handle, raw: bool) -> Result<Value> {
    if raw {
        handle.raw_value()
    } else {
        handle.parsed_value()
    }
}


/// JSON when it parses, otherwise the text itself as a string.
fn parse_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}


/// Print the edited document, or write it back to `file`. Written files
/// keep their references unexpanded.
fn finish(cli: &Cli, doc: &Document, file: &Path, in_place: bool) -> Result<String> {
    if in_place {
        let text = if is_json(file) {
            export::to_json_pretty(&doc.raw_value())? + "\n"
        } else {
            export::to_yaml(&doc.raw_value())?
        };
        std::fs::write(file, text).map_err(|e| Error::Io(file.to_path_buf(), e))?;
        return Ok(String::new());
    }
    let value = if cli.raw {
        doc.raw_value()
    } else {
        doc.parsed_value()?
    };
    format_value(&value, cli.format)
}


fn format_value(value: &Value, format: Format) -> Result<String> {
    match format {
        Format::Json => export::to_json(value),
        Format::Pretty => export::to_json_pretty(value),
        Format::Yaml => Ok(export::to_yaml(value)?.trim_end().to_string()),
    }
}


fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scratch(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rfx-cli-test-{}", std::process::id()));
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("rfx").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn resolve_config_path_from_env() {
        std::env::set_var("RFX_CONFIG", "/tmp/test-rfx-settings.yaml");
        assert_eq!(resolve_config_path(), Some(PathBuf::from("/tmp/test-rfx-settings.yaml")));
        std::env::remove_var("RFX_CONFIG");
        assert_eq!(resolve_config_path(), None);
    }

    #[test]
    fn load_settings_layers() {
        let path = scratch("settings.yaml", "delimiter: \".\"\nuse_cache: false\n");
        let s = load_settings(Some(path.as_path()), None).unwrap();
        assert_eq!(s.delimiter, ".");
        assert!(!s.use_cache);
        let s = load_settings(Some(path.as_path()), Some("::")).unwrap();
        assert_eq!(s.delimiter, "::");
        assert!(matches!(load_settings(None, Some("")), Err(Error::Config(_))));
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let c = cli(&["get", "doc.yaml", "app/name", "--raw", "-f", "yaml"]);
        assert!(c.raw);
        assert_eq!(c.format, Format::Yaml);
        assert!(matches!(c.command, Commands::Get { ref address, .. } if address.as_deref() == Some("app/name")));
    }

    #[test]
    fn get_resolves_references_unless_raw() {
        let path = scratch("get.json", r#"{"a": 5, "b": "$r{a}"}"#);
        let file = path.to_str().unwrap();
        let out = run(&cli(&["-f", "json", "get", file, "b"]), Settings::default()).unwrap();
        assert_eq!(out, "5");
        let out = run(&cli(&["-f", "json", "--raw", "get", file, "b"]), Settings::default()).unwrap();
        assert_eq!(out, r#""$r{a}""#);
    }

    #[test]
    fn get_slice_prints_every_selected_element() {
        let path = scratch("slice.json", r#"{"list": [10, 20, "$r{list/0}", 40]}"#);
        let file = path.to_str().unwrap();
        let out = run(&cli(&["-f", "json", "get", file, "list/1:3"]), Settings::default()).unwrap();
        assert_eq!(out, "[20,10]");
        let out = run(&cli(&["-f", "json", "--raw", "get", file, "list/1:3"]), Settings::default()).unwrap();
        assert_eq!(out, r#"[20,"$r{list/0}"]"#);
        let out = run(&cli(&["-f", "json", "get", file, "list/-1:"]), Settings::default()).unwrap();
        assert_eq!(out, "[40]");
    }

    #[test]
    fn get_missing_address_fails() {
        let path = scratch("missing.yaml", "a: 1\n");
        let err = run(&cli(&["get", path.to_str().unwrap(), "nope"]), Settings::default()).unwrap_err();
        assert!(matches!(err, Error::MissingMember(_)));
    }

    #[test]
    fn set_in_place_keeps_templates() {
        let path = scratch("set.yaml", "name: demo\ntitle: $r{name}\n");
        let file = path.to_str().unwrap();
        let out = run(&cli(&["set", file, "version", "3", "--in-place"]), Settings::default()).unwrap();
        assert!(out.is_empty());
        let reloaded = Document::load(&path, Settings::default()).unwrap();
        assert_eq!(
            reloaded.raw_value(),
            json!({"name": "demo", "title": "$r{name}", "version": 3})
        );
    }

    #[test]
    fn set_plain_text_value_and_print() {
        let path = scratch("print.json", r#"{"a": {"b": 1}}"#);
        let out = run(
            &cli(&["-f", "json", "set", path.to_str().unwrap(), "a/c", "hello"]),
            Settings::default(),
        )
        .unwrap();
        assert_eq!(out, r#"{"a":{"b":1,"c":"hello"}}"#);
    }

    #[test]
    fn delete_in_place_json() {
        let path = scratch("delete.json", r#"{"keep": 1, "drop": 2}"#);
        run(&cli(&["delete", path.to_str().unwrap(), "drop", "-i"]), Settings::default()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\n    \"keep\": 1\n}\n");
    }

    #[test]
    fn keys_for_mapping_and_sequence() {
        let path = scratch("keys.yaml", "app:\n  name: x\n  tags: [a, b, c]\n");
        let file = path.to_str().unwrap();
        assert_eq!(run(&cli(&["keys", file, "app"]), Settings::default()).unwrap(), "name\ntags");
        assert_eq!(run(&cli(&["keys", file, "app/tags"]), Settings::default()).unwrap(), "0\n1\n2");
        assert!(matches!(
            run(&cli(&["keys", file, "app/name"]), Settings::default()),
            Err(Error::TypeConversion { .. })
        ));
    }
}
