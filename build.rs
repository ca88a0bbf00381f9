use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const ENV_PREFIX: &str = "DATAFINDER_";
const ALLOWLIST_FILE: &str = "datafinder_env_allowlist.rs";

fn source_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut pending = vec![dir.to_path_buf()];
    let mut files = Vec::new();
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'
}

/// Settings are read through whole string literals such as
/// `"DATAFINDER_SYNDA_BIN"`. Prefixes of longer strings (warning lines,
/// messages) and identifiers are not settings.
fn literal_keys(source: &str) -> Vec<&str> {
    let mut keys = Vec::new();
    for (start, _) in source.match_indices(ENV_PREFIX) {
        if !source[..start].ends_with('"') {
            continue;
        }
        let rest = &source[start..];
        let end = rest.find(|c: char| !is_key_char(c)).unwrap_or(rest.len());
        if end > ENV_PREFIX.len() && rest[end..].starts_with('"') {
            keys.push(&rest[..end]);
        }
    }
    keys
}

/// Only the non-test part of a module can read settings.
fn runtime_part(source: &str) -> &str {
    match source.find("#[cfg(test)]") {
        Some(at) => &source[..at],
        None => source,
    }
}

fn render_allowlist(keys: &BTreeSet<String>) -> String {
    let mut out = String::from("pub const GENERATED_DATAFINDER_ENV_ALLOWLIST: &[&str] = &[\n");
    for key in keys {
        out.push_str(&format!("    {key:?},\n"));
    }
    out.push_str("];\n");
    out
}

fn main() {
    let files = source_files(Path::new("src")).expect("list src/ for env keys");
    let mut keys = BTreeSet::new();
    for file in &files {
        let source = fs::read_to_string(file)
            .unwrap_or_else(|err| panic!("read {}: {err}", file.display()));
        keys.extend(literal_keys(runtime_part(&source)).into_iter().map(str::to_string));
    }

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    fs::write(Path::new(&out_dir).join(ALLOWLIST_FILE), render_allowlist(&keys))
        .expect("write env allowlist");

    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .expect("system clock before unix epoch");
    println!(
        "cargo:rustc-env=BUILD_UUID={:x}-{:x}",
        now.as_secs(),
        now.subsec_nanos()
    );
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src");
}
