//! Fuzz testing for the SQL lexer and parser.
//!
//! Tokenizes and parses arbitrary input in an arena. Parsing may fail but
//! must not panic, loop forever or report a span outside the input.

#![no_main]

use bumpalo::Bump;
use libfuzzer_sys::fuzz_target;

use sqlfence::sql::{Lexer, Parser, Token};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let mut lexer = Lexer::new(input);
    loop {
        let before = lexer.position();
        let token = lexer.next_token();
        let (start, end) = lexer.span().range();
        assert!(start <= end && end <= input.len());
        if token == Token::Eof || lexer.position() == before {
            break;
        }
    }

    let arena = Bump::new();
    let mut parser = Parser::new(input, &arena);
    if let Err(report) = parser.parse_statement() {
        let error = parser.error_from_report(report);
        let (start, end) = error.span.range();
        assert!(start <= end && end <= input.len());
    }
});
