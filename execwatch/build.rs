use aya_build::cargo_metadata::{MetadataCommand, Package};
use derive_more::Display;

const EBPF_PACKAGE: &str = "execwatch-ebpf";

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display)]
#[display("{self:?}")]
pub enum Error {
	#[display("execwatch-ebpf is not a member of this workspace")]
	EbpfPackageMissing,
	#[display("cargo metadata failed: {_0}")]
	Metadata(String),
	#[display("building execwatch-ebpf failed: {_0}")]
	EbpfBuild(String),
}

fn main() -> Result<()> {
	let metadata = MetadataCommand::new()
		.no_deps()
		.exec()
		.map_err(|err| Error::Metadata(err.to_string()))?;
	let ebpf_package = metadata
		.packages
		.into_iter()
		.find(|Package { name, .. }| name == EBPF_PACKAGE)
		.ok_or(Error::EbpfPackageMissing)?;

	aya_build::build_ebpf([ebpf_package]).map_err(|err| Error::EbpfBuild(err.to_string()))?;
	Ok(())
}
