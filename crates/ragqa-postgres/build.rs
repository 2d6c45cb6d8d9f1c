#![forbid(unsafe_code)]

/// `embed_migrations!` is a proc-macro and cannot observe the migration
/// directory on its own, so changes to the SQL files would not trigger a
/// rebuild without this hint.
fn main() {
    println!("cargo:rerun-if-changed=./migrations");
}
