// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell
#![no_main]

use bizagi_docs::content::{list_performers, to_content_map};
use bizagi_docs::parser::parse;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(xml) = std::str::from_utf8(data) {
        let result = parse(xml);
        let malformed = result.errors.iter().any(|e| e.starts_with("Failed to parse XML"));
        assert!(!malformed || result.processes.is_empty());

        let content = to_content_map(&result);
        assert!(content.len() <= result.element_count());
        let _ = list_performers(&result);
    }
});
