//! Subcommand implementations

pub mod id;
pub mod keygen;
pub mod pack;
pub mod verify;

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
