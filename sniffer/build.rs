fn main() {
    use std::env;
    use std::path::Path;

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(value) => value,
        Err(err) => {
            eprintln!("The CARGO_MANIFEST_DIR environment variable is not set: {err}");
            std::process::exit(1);
        },
    };

    // Packet.lib / wpcap.lib for Windows builds may be dropped into <workspace>/lib.
    if let Some(workspace_root) = Path::new(&manifest_dir).parent() {
        let lib_path = workspace_root.join("lib");
        println!("cargo:rustc-link-search=native={}", lib_path.display());
    }
}
