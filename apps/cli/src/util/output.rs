use serde::Serialize;

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) {
	match serde_json::to_string_pretty(value) {
		Ok(json) => println!("{json}"),
		Err(e) => eprintln!("Failed to serialize output: {e}"),
	}
}

pub fn yes_no(value: bool) -> &'static str {
	if value {
		"yes"
	} else {
		"no"
	}
}
