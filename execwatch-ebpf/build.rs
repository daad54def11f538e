use which::which;

/// The bpf crate has an undeclared dependency on the `bpf-linker` binary.
/// Rebuild whenever the resolved linker changes.
fn main() -> Result<(), which::Error> {
	let bpf_linker = which("bpf-linker")?;
	println!("cargo:rerun-if-changed={}", bpf_linker.display());
	Ok(())
}
