use std::{
    env, fs,
    path::{Path, PathBuf},
};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=vendor/libretro.h");

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is not set"));
    let manifest_dir =
        PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is not set"));

    let header = out_dir.join("libretro.h");
    fs::copy(manifest_dir.join("vendor/libretro.h"), &header)
        .unwrap_or_else(|err| panic!("failed to copy vendored libretro.h: {err}"));

    generate_bindings(&header, &out_dir.join("libretro_bindings.rs"));
}

fn generate_bindings(header: &Path, output: &Path) {
    // Entry points are defined by `export_libretro_core!`, so only types and
    // constants are bound.
    let mut builder = bindgen::Builder::default()
        .header(header.to_string_lossy())
        .parse_callbacks(Box::new(bindgen::CargoCallbacks::new()))
        .generate_comments(false)
        .allowlist_type("retro_.*")
        .allowlist_var("RETRO_.*")
        .prepend_enum_name(false)
        .layout_tests(false)
        .derive_copy(true)
        .derive_debug(true)
        .derive_default(true);

    if cfg!(target_os = "windows") {
        builder = builder.clang_arg("-D_CRT_SECURE_NO_WARNINGS");
    }

    let bindings = builder
        .generate()
        .expect("bindgen failed to produce libretro bindings");

    let patched = bindings
        .to_string()
        .replace("unsafe extern \"C\" {", "extern \"C\" {")
        .replace("extern \"C\" {", "unsafe extern \"C\" {");

    fs::write(output, patched)
        .unwrap_or_else(|err| panic!("failed to write bindings to {}: {err}", output.display()));
}
