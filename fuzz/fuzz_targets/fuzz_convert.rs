// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell
#![no_main]

use bizagi_docs::archive::convert;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let conversion = convert(data, "fuzz.bpm");
    assert_eq!(conversion.success, conversion.bpmn_xml.is_some());
    assert_eq!(conversion.success, conversion.error.is_none());
});
