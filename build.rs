//! Embeds the `assets/` tree into the binary.
//!
//! Generates `$OUT_DIR/bundle.rs` containing a sorted static table of
//! `(logical_path, bytes)` pairs, consumed by `assets::embedded`.

#![allow(clippy::expect_used)]

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use walkdir::WalkDir;

fn main() {
    let manifest_dir =
        PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo"));
    let assets_dir = manifest_dir.join("assets");
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));

    println!("cargo:rerun-if-changed=assets");

    let mut entries: Vec<(String, PathBuf)> = WalkDir::new(&assets_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(|e| {
            let relative = e.path().strip_prefix(&assets_dir).ok()?;
            let logical = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            Some((logical, e.path().to_path_buf()))
        })
        .collect();

    // Sorted so the generated table is stable across builds
    entries.sort();

    let mut generated = String::from("pub static BUNDLE: &[(&str, &[u8])] = &[\n");
    for (logical, path) in &entries {
        writeln!(
            generated,
            "    ({:?}, include_bytes!({:?})),",
            logical,
            path.display().to_string()
        )
        .expect("writing to a String cannot fail");
    }
    generated.push_str("];\n");

    fs::write(out_dir.join("bundle.rs"), generated).expect("failed to write bundle.rs");
}
