// Property-based tests for output parsing and argument handling
// Checks invariants over random inputs rather than fixed examples

use proptest::prelude::*;

use script_runner::models::field::{FieldKind, FieldSchema, FieldValue};
use script_runner::services::command::{split_custom_args, CommandLine};
use script_runner::services::output::{parse_progress, LineAssembler, OutputParser};

fn assemble(chunks: &[Vec<u8>]) -> Vec<String> {
    let mut assembler = LineAssembler::new();
    let mut lines: Vec<String> = chunks.iter().flat_map(|c| assembler.push(c)).collect();
    lines.extend(assembler.finish());
    lines
}

proptest! {
    /// Progress values are clamped to 0..=100
    #[test]
    fn prop_progress_is_clamped(value in 0u16..=999) {
        let parsed = parse_progress(&format!("PROGRESS {}", value));
        prop_assert_eq!(parsed, Some(value.min(100) as u8));
    }

    /// Progress lines always classify as progress, whatever came before
    #[test]
    fn prop_progress_lines_win(value in 0u8..=100, prefix in prop::collection::vec("[ -~]{0,20}", 0..5)) {
        let mut parser = OutputParser::new();
        for line in &prefix {
            parser.classify(line);
        }
        let kind = parser.classify(&format!("PROGRESS {}", value));
        prop_assert!(kind.is_progress());
    }

    /// How the output is chunked never changes the lines that come out
    #[test]
    fn prop_line_assembly_ignores_chunking(
        text in "[a-z \n\r]{0,200}",
        cuts in prop::collection::vec(0usize..200, 0..10),
    ) {
        let bytes = text.as_bytes();
        let mut points: Vec<usize> = cuts.into_iter().map(|c| c.min(bytes.len())).collect();
        points.sort_unstable();

        let mut chunks = Vec::new();
        let mut start = 0;
        for point in points {
            chunks.push(bytes[start..point].to_vec());
            start = point;
        }
        chunks.push(bytes[start..].to_vec());

        prop_assert_eq!(assemble(&chunks), assemble(&[bytes.to_vec()]));
    }

    /// The copyable command preview splits back into the same argv
    #[test]
    fn prop_preview_splits_back(args in prop::collection::vec("[a-zA-Z0-9 _.'\"=/\\\\:-]{0,12}", 0..6)) {
        let mut command = CommandLine::new("python3");
        command.args = args;

        let split = split_custom_args(&command.preview()).unwrap();
        prop_assert_eq!(split, command.argv());
    }

    /// Pasted integers always land inside the field's bounds
    #[test]
    fn prop_int_paste_respects_bounds(value in -10_000i64..10_000) {
        let schema = FieldSchema::new("--n", "n", FieldKind::Int).with_range(-100.0, 100.0);
        match FieldValue::parse_for(&schema, &value.to_string()) {
            Ok(FieldValue::Int(n)) => prop_assert!((-100..=100).contains(&n)),
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }
}
