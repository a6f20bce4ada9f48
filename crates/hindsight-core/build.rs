//! Build script for hindsight-core
//!
//! Checks the toolchain before compilation:
//! - Minimum Rust version (1.74.0)
//! - Pointer width (core files are read into memory and indexed with `usize`)

fn main()
{
    println!("cargo:rerun-if-changed=build.rs");

    match (rustc_version::version(), rustc_version::Version::parse("1.74.0")) {
        (Ok(found), Ok(minimum)) if found < minimum => {
            panic!("hindsight-core requires Rust {minimum} or newer, found {found}");
        }
        (Ok(_), Ok(_)) => {}
        // Some build environments hide rustc; don't fail for that.
        _ => println!("cargo:warning=could not verify Rust version"),
    }

    check_pointer_width();
}

fn check_pointer_width()
{
    let width = std::env::var("CARGO_CFG_TARGET_POINTER_WIDTH").unwrap_or_default();
    if width != "64" {
        println!("cargo:warning=hindsight-core is only tested on 64-bit hosts (found {width}-bit)");
    }
}
