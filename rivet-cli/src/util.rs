use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use rivet::asm::AssembleError;

/// Logs an error, for use where one failing file should not stop the others.
///
/// Stands in for `eyre_span::emit` without its span-trace hook, so no `ErrorLayer` is installed.
/// Per-file callers call it inside a span naming the file, which the log line carries instead.
pub fn emit<A>(r: eyre::Result<A>) -> Option<A> {
	match r {
		Ok(v) => Some(v),
		Err(e) => {
			tracing::error!("{e:#}");
			None
		}
	}
}

/// Picks where to write the output for `input`.
///
/// With no `--output`, the file is placed next to the input, or on stdout if the input is stdin. If there are several inputs or the
/// output is an existing directory, it is treated as a directory.
pub fn output_path(output: Option<&Path>, input: &Path, many: bool, suffix: &str) -> PathBuf {
	match output {
		Some(out) if many || out.is_dir() => {
			let name = input.file_name().map_or_else(|| "out".into(), PathBuf::from);
			out.join(name).with_extension(suffix)
		}
		Some(out) => out.to_path_buf(),
		None if input.as_os_str() == "-" => input.to_path_buf(),
		None => input.with_extension(suffix),
	}
}

pub fn read_input(input: &Path) -> std::io::Result<Vec<u8>> {
	if input.as_os_str() == "-" {
		let mut buf = Vec::new();
		std::io::stdin().read_to_end(&mut buf)?;
		Ok(buf)
	} else {
		std::fs::read(input)
	}
}

pub fn get_output(path: &Path) -> std::io::Result<Box<dyn Write>> {
	if path.as_os_str() == "-" {
		Ok(Box::new(std::io::stdout()))
	} else {
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		Ok(Box::new(std::fs::File::create(path)?))
	}
}

pub fn print_diags(filename: &str, source: &str, err: &AssembleError) {
	use codespan_reporting::diagnostic::{Diagnostic, Label};
	use codespan_reporting::files::SimpleFiles;
	use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

	let writer = StandardStream::stderr(ColorChoice::Auto);
	let config = codespan_reporting::term::Config::default();
	let mut files = SimpleFiles::new();
	let file_id = files.add(filename, source);

	for d in &err.diags {
		let d = Diagnostic::error()
			.with_message(d.kind.to_string())
			.with_labels(vec![Label::primary(file_id, d.loc.span.as_range())]);
		if let Err(e) = codespan_reporting::term::emit(&mut writer.lock(), &config, &files, &d) {
			tracing::warn!("failed to print diagnostic: {e}");
		}
	}
}
