pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_feedback_records.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_feedback_records.sql")),
				"tables/002_feedback_items.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_feedback_items.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn includes_are_inlined() {
		let sql = render_schema();

		assert!(!sql.contains("\\ir "), "Unexpanded include left in schema: {sql}");
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS feedback_records"));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS feedback_items"));
	}

	#[test]
	fn unknown_includes_pass_through() {
		let sql = expand_includes("\\ir tables/999_unknown.sql\nSELECT 1");

		assert_eq!(sql, "\\ir tables/999_unknown.sql\nSELECT 1\n");
	}
}
