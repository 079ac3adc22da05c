// fuzz_targets/parse_source.rs
#![no_main]

use goparser::lexer::{Lexer, Tok};
use goparser::parse_file;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let s = String::from_utf8_lossy(data);

    let mut max_end = 0usize;
    let mut last_real_end = 0usize;
    let max_steps = s.len().saturating_mul(4) + 64;

    for (steps, (start, tok, end)) in Lexer::new(&s).enumerate() {
        assert!(start <= end);
        assert!(end <= s.len());

        let injected = matches!(tok, Tok::Semi) && start == end;
        if injected {
            assert!(start >= max_end);
        } else {
            assert!(start >= last_real_end);
            last_real_end = end;
        }
        max_end = max_end.max(end);
        assert!(steps <= max_steps);
    }

    // Diagnostics must point inside the input.
    if let Err(failure) = parse_file(&s) {
        assert!(!failure.diags.is_empty());
        for d in &failure.diags {
            assert!(d.span.end as usize <= s.len());
        }
    }
});
