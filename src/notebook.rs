// notebook.rs — Template discovery and notebook rendering.
//
// Rendering is the only piece of the blueprint that touches notebook
// content: the template file is parsed as nbformat JSON, the caller's
// parameters become one new code cell placed after the first cell, and the
// result is serialized back with the 1-space indentation Jupyter uses on
// disk. Everything else about the notebook passes through untouched.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::BlueprintError;

/// Find all notebook templates under `template_dir`.
///
/// Recurses into subdirectories and returns `.ipynb` paths relative to the
/// directory, `/`-separated and sorted. Symlinks are skipped so the
/// template list cannot reach outside the directory.
pub fn scan_templates(template_dir: &Path) -> Result<Vec<String>> {
    let mut templates = Vec::new();
    walk(template_dir, "", &mut templates)
        .with_context(|| format!("scanning {}", template_dir.display()))?;
    templates.sort();
    Ok(templates)
}

fn walk(dir: &Path, prefix: &str, out: &mut Vec<String>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_symlink() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let relative = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        };
        if file_type.is_dir() {
            walk(&entry.path(), &relative, out)?;
        } else if name.ends_with(".ipynb") {
            out.push(relative);
        }
    }
    Ok(())
}

/// Render the template at `template_path` with the given parameters and
/// return the notebook as UTF-8 encoded nbformat JSON.
pub fn render_template(template_path: &Path, params: &Map<String, Value>) -> Result<Vec<u8>> {
    let contents = fs::read_to_string(template_path)
        .with_context(|| format!("reading template {}", template_path.display()))?;
    let mut notebook: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parsing template {}", template_path.display()))?;

    insert_params_cell(&mut notebook, params)?;
    serialize_notebook(&notebook)
}

/// nbformat writes with 1-space indentation and a trailing newline.
fn serialize_notebook(notebook: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    notebook
        .serialize(&mut ser)
        .context("serializing notebook")?;
    buf.push(b'\n');
    Ok(buf)
}

/// Insert the parameters as a new code cell placed after the first cell
/// (appended when the notebook is empty). No parameters, no new cell.
///
/// The cell source depends on the notebook's kernel language. Python, Julia
/// and C are supported; a generic `name = <json>` fallback covers the rest
/// and may produce incorrect source for other languages.
fn insert_params_cell(notebook: &mut Value, params: &Map<String, Value>) -> Result<()> {
    if params.is_empty() {
        return Ok(());
    }

    let language = notebook
        .pointer("/metadata/kernelspec/language")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_lowercase();

    let cell = json!({
        "cell_type": "code",
        "execution_count": null,
        "metadata": {},
        "outputs": [],
        "source": params_source(&language, params),
    });

    let cells = notebook
        .get_mut("cells")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| anyhow!("template has no cells array"))?;
    let index = cells.len().min(1);
    cells.insert(index, cell);
    Ok(())
}

fn params_source(language: &str, params: &Map<String, Value>) -> Vec<String> {
    let mut source = Vec::with_capacity(params.len());
    for (key, value) in params {
        let line = match (language, value) {
            ("python", Value::Null) => format!("{key} = None # not set\n"),
            ("julia", Value::Null) => format!("{key} = nothing # not set\n"),
            ("c", Value::Null) => format!("int {key} = 0; /* not set */\n"),
            (_, Value::Null) => format!("{key} = 0\n"),
            ("c", value) => c_declaration(key, value),
            (_, value) => format!("{key} = {value}\n"),
        };
        source.push(line);
    }
    source
}

fn c_declaration(key: &str, value: &Value) -> String {
    match value {
        Value::String(_) => format!("const char *{key} = {value};\n"),
        Value::Bool(b) => format!("int {key} = {};\n", i32::from(*b)),
        Value::Number(n) if n.is_i64() || n.is_u64() => format!("int {key} = {value};\n"),
        Value::Number(_) => format!("double {key} = {value};\n"),
        _ => format!("{key} = {value};\n"),
    }
}

/// Substitute `{name}` placeholders in a template path with parameter
/// values to form the relative destination path. `{{` and `}}` escape
/// literal braces.
pub fn format_destination(
    path: &str,
    params: &Map<String, Value>,
) -> Result<String, BlueprintError> {
    let mut out = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') | None => break,
                        Some(c) => name.push(c),
                    }
                }
                match params.get(&name) {
                    Some(Value::String(s)) => out.push_str(s),
                    Some(value) => out.push_str(&value.to_string()),
                    None => return Err(BlueprintError::MissingParameter(name)),
                }
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn notebook_with_language(language: &str) -> Value {
        json!({
            "cells": [
                { "cell_type": "markdown", "metadata": {}, "source": ["# Title\n"] },
                { "cell_type": "code", "execution_count": null, "metadata": {}, "outputs": [], "source": ["run()\n"] }
            ],
            "metadata": { "kernelspec": { "language": language } },
            "nbformat": 4,
            "nbformat_minor": 5
        })
    }

    fn params(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn scan_finds_nested_templates_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.ipynb"), b"{}").unwrap();
        fs::write(dir.path().join("sub").join("a.ipynb"), b"{}").unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let templates = scan_templates(dir.path()).unwrap();
        assert_eq!(templates, vec!["b.ipynb".to_string(), "sub/a.ipynb".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn scan_skips_symlinks() {
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("escape.ipynb"), b"{}").unwrap();

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("real.ipynb"), b"{}").unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("escape.ipynb"),
            dir.path().join("linked.ipynb"),
        )
        .unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("linked_dir")).unwrap();

        let templates = scan_templates(dir.path()).unwrap();
        assert_eq!(templates, vec!["real.ipynb".to_string()]);
    }

    #[test]
    fn no_params_leaves_cells_unchanged() {
        let mut nb = notebook_with_language("python");
        insert_params_cell(&mut nb, &Map::new()).unwrap();
        assert_eq!(nb["cells"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn params_cell_lands_after_the_first_cell() {
        let mut nb = notebook_with_language("python");
        insert_params_cell(&mut nb, &params(&[("x", json!(1))])).unwrap();
        let cells = nb["cells"].as_array().unwrap();
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[1]["cell_type"], "code");
        assert_eq!(cells[1]["source"][0], "x = 1\n");
    }

    #[test]
    fn params_cell_appends_to_an_empty_notebook() {
        let mut nb = json!({ "cells": [], "metadata": {} });
        insert_params_cell(&mut nb, &params(&[("x", json!(1))])).unwrap();
        assert_eq!(nb["cells"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn missing_cells_array_is_an_error() {
        let mut nb = json!({ "metadata": {} });
        assert!(insert_params_cell(&mut nb, &params(&[("x", json!(1))])).is_err());
    }

    #[test]
    fn python_source_lines() {
        let source = params_source(
            "python",
            &params(&[("name", json!("Ada")), ("count", json!(3)), ("unset", Value::Null)]),
        );
        assert!(source.contains(&"name = \"Ada\"\n".to_string()));
        assert!(source.contains(&"count = 3\n".to_string()));
        assert!(source.contains(&"unset = None # not set\n".to_string()));
    }

    #[test]
    fn julia_unset_uses_nothing() {
        let source = params_source("julia", &params(&[("unset", Value::Null)]));
        assert_eq!(source, vec!["unset = nothing # not set\n".to_string()]);
    }

    #[test]
    fn c_source_declares_types() {
        let source = params_source(
            "c",
            &params(&[
                ("s", json!("hi")),
                ("i", json!(2)),
                ("f", json!(1.5)),
                ("b", json!(true)),
                ("unset", Value::Null),
            ]),
        );
        assert!(source.contains(&"const char *s = \"hi\";\n".to_string()));
        assert!(source.contains(&"int i = 2;\n".to_string()));
        assert!(source.contains(&"double f = 1.5;\n".to_string()));
        assert!(source.contains(&"int b = 1;\n".to_string()));
        assert!(source.contains(&"int unset = 0; /* not set */\n".to_string()));
    }

    #[test]
    fn unknown_language_falls_back() {
        let source = params_source("r", &params(&[("x", json!(1)), ("unset", Value::Null)]));
        assert!(source.contains(&"x = 1\n".to_string()));
        assert!(source.contains(&"unset = 0\n".to_string()));
    }

    #[test]
    fn rendered_notebook_uses_one_space_indent_and_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.ipynb");
        fs::write(&path, serde_json::to_vec(&notebook_with_language("python")).unwrap()).unwrap();

        let rendered = render_template(&path, &params(&[("x", json!(1))])).unwrap();
        let text = String::from_utf8(rendered).unwrap();
        assert!(text.starts_with("{\n \"cells\""));
        assert!(text.ends_with('\n'));

        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back["cells"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn render_rejects_a_non_json_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ipynb");
        fs::write(&path, b"not json").unwrap();
        assert!(render_template(&path, &Map::new()).is_err());
    }

    #[test]
    fn destination_substitutes_placeholders() {
        let p = params(&[("user", json!("ada")), ("run", json!(7))]);
        let out = format_destination("runs/{user}/report-{run}.ipynb", &p).unwrap();
        assert_eq!(out, "runs/ada/report-7.ipynb");
    }

    #[test]
    fn destination_escapes_double_braces() {
        let out = format_destination("literal-{{x}}.ipynb", &Map::new()).unwrap();
        assert_eq!(out, "literal-{x}.ipynb");
    }

    #[test]
    fn destination_names_the_missing_parameter() {
        let err = format_destination("report-{user}.ipynb", &Map::new()).unwrap_err();
        match err {
            BlueprintError::MissingParameter(name) => assert_eq!(name, "user"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
