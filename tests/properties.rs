//! Property tests for the tokenizer and literal handling.

use proptest::prelude::*;
use relay::dsl::{Literal, Node, TokenKind, tokenize};
use relay::{FilterParser, Registry};

fn kinds_and_texts(source: &str) -> Vec<(TokenKind, &str)> {
    tokenize(source).map(|t| (t.kind(), t.text())).collect()
}

fn self_parser() -> FilterParser {
    let registry = Registry::builder()
        .configure::<String>(|t| t.field("Value", |s: &String| s))
        .build()
        .unwrap();
    FilterParser::new(registry)
}

proptest! {
    #[test]
    fn whitespace_is_one_token(source in "[ \t\r\n]{1,24}") {
        let tokens = kinds_and_texts(&source);
        prop_assert_eq!(
            tokens,
            vec![(TokenKind::Whitespace, source.as_str()), (TokenKind::EndOfFile, "")]
        );
    }

    #[test]
    fn numerals_are_one_token(source in "[0-9]{1,12}(\\.[0-9]{1,8})?") {
        let tokens = kinds_and_texts(&source);
        prop_assert_eq!(
            tokens,
            vec![(TokenKind::Number, source.as_str()), (TokenKind::EndOfFile, "")]
        );
    }

    #[test]
    fn plain_strings_decode_unchanged(text in "[a-zA-Z0-9 _.,:]{0,24}") {
        let parser = self_parser();
        let predicate = parser.parse::<String>(&format!("Value = '{}'", text)).unwrap();

        let Node::Compare { rhs, .. } = predicate.body() else {
            panic!("expected a comparison");
        };
        prop_assert_eq!(&**rhs, &Node::literal(Literal::String(text.clone())));
        prop_assert!(predicate.evaluate(&text).unwrap());
    }

    #[test]
    fn tokens_cover_the_source(source in "\\PC{0,40}") {
        let mut offset = 0;
        let mut rebuilt = String::new();
        for token in tokenize(&source) {
            prop_assert_eq!(token.offset(), offset);
            offset += token.len();
            rebuilt.push_str(token.text());
        }
        prop_assert_eq!(rebuilt, source);
    }

    #[test]
    fn parsing_never_panics(source in "\\PC{0,40}") {
        let parser = self_parser();
        if let Err(err) = parser.parse::<String>(&source) {
            prop_assert!(err.offset() <= source.len());
        }
    }
}
