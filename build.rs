//! Build script for CodeDupe
//!
//! On Windows, embeds `codedupe.manifest` (via `codedupe.rc`) so the binary
//! is long-path aware. Deep source trees such as vendored `node_modules`
//! routinely exceed the 260-character MAX_PATH limit.
//!
//! On other platforms the script does nothing.

fn main() {
    #[cfg(windows)]
    {
        embed_resource::compile("codedupe.rc", embed_resource::NONE);

        println!("cargo:rerun-if-changed=codedupe.rc");
        println!("cargo:rerun-if-changed=codedupe.manifest");
    }
}
