// crates/parser/tests/lexer_semis.rs
use goparser::lexer::{Lexer, Tok};

fn tok_name(t: &Tok<'_>) -> String {
    match t {
        Tok::Ident(_) => "IDENT".into(),
        Tok::Int(_) => "INT".into(),
        Tok::Float(_) => "FLOAT".into(),
        Tok::Imag(_) => "IMAG".into(),
        Tok::Rune(_) => "CHAR".into(),
        Tok::Str(_) | Tok::RawStr(_) => "STRING".into(),
        Tok::Keyword(k) | Tok::Op(k) => (*k).into(),
        Tok::Error => "ERROR".into(),
        other => other.describe().trim_matches('`').to_string(),
    }
}

fn lex_names(input: &str) -> String {
    Lexer::new(input)
        .map(|(_, t, _)| tok_name(&t))
        .collect::<Vec<_>>()
        .join(" ")
}

fn injected_semis(input: &str) -> Vec<usize> {
    Lexer::new(input)
        .filter_map(|(s, t, e)| (t == Tok::Semi && s == e).then_some(s))
        .collect()
}

#[rustfmt::skip]
const SEMICOLON_TESTS: &[(&str, &str)] = &[
    ("", ""),
    ("\u{FEFF};", ";"),
    (";", ";"),

    ("foo\n", "IDENT ;"),
    ("123\n", "INT ;"),
    ("1.2\n", "FLOAT ;"),
    ("2i\n", "IMAG ;"),
    ("'x'\n", "CHAR ;"),
    ("\"x\"\n", "STRING ;"),
    ("`x`\n", "STRING ;"),

    ("+\n", "+"),
    ("*\n", "*"),
    ("<<=\n", "<<="),
    ("&^\n", "&^"),
    ("<-\n", "<-"),
    ("~\n", "~"),
    ("|\n", "|"),
    ("++\n", "++ ;"),
    ("--\n", "-- ;"),
    ("...\n", "..."),

    ("(\n", "("),
    ("[\n", "["),
    ("{\n", "{"),
    (",\n", ","),
    (".\n", "."),
    (")\n", ") ;"),
    ("]\n", "] ;"),
    ("}\n", "} ;"),

    ("break\n", "break ;"),
    ("continue\n", "continue ;"),
    ("fallthrough\n", "fallthrough ;"),
    ("return\n", "return ;"),
    ("case\n", "case"),
    ("chan\n", "chan"),
    ("func\n", "func"),
    ("interface\n", "interface"),
    ("map\n", "map"),
    ("struct\n", "struct"),
    ("type\n", "type"),

    ("foo//comment\n", "IDENT ;"),
    ("foo/*comment*/\n", "IDENT ;"),
    ("foo/*\n*/", "IDENT ;"),
    ("foo/*\n*/ bar", "IDENT ; IDENT"),
    ("foo    /* no newline */ \n", "IDENT ;"),
    ("foo", "IDENT ;"),
    ("foo\r\n", "IDENT ;"),

    ("package main\n\nfunc main() {\n\tif {\n\t\treturn /* */ }\n}\n",
     "package IDENT ; func IDENT ( ) { if { return } ; } ;"),
];

#[test]
fn semicolon_insertion_table() {
    for (input, want) in SEMICOLON_TESTS {
        assert_eq!(lex_names(input), *want, "input=<<{input}>>");
    }
}

#[test]
fn injected_semis_are_zero_width_at_the_newline() {
    assert_eq!(injected_semis("a\nb\n"), [1, 3]);
    assert_eq!(injected_semis("x /* one\ntwo */"), [8]);
    // End of input without a trailing newline.
    assert_eq!(injected_semis("return"), [6]);
    assert!(injected_semis("a;\n").is_empty());
}

#[test]
fn declaration_level_tokens() {
    assert_eq!(
        lex_names("type G[T ~int | string] interface{ M(...any) <-chan T }"),
        "type IDENT [ IDENT ~ IDENT | IDENT ] interface { IDENT ( ... IDENT ) <- chan IDENT } ;"
    );
}
