use csstok::{to_source_all, tokenize, tokenize_utf16, Token, TokenKind};
use proptest::prelude::*;

/// Snippets made of characters that can never form comments, strings or escapes.
fn plain_css() -> impl Strategy<Value = String> {
    r"[a-zA-Z0-9 \t\n.#%+\-:;,(){}\[\]@<>!*~|^$=_]{0,64}"
}

fn check_stream(tokens: &[Token]) {
    let eofs = tokens.iter().filter(|t| t.kind.is_eof()).count();
    assert_eq!(eofs, 1, "exactly one EOF token");
    assert!(tokens.last().map(|t| t.kind.is_eof()).unwrap_or_default());
    assert!(tokens.iter().all(|t| !t.kind.is_error()));
    assert!(tokens.windows(2).all(|w| w[0].position <= w[1].position));
}

proptest! {
    #[test]
    fn prop_any_text_terminates(source in any::<String>()) {
        let (tokens, _) = tokenize(&source, 1, 0);
        check_stream(&tokens);
    }

    #[test]
    fn prop_any_utf16_terminates(units in prop::collection::vec(any::<u16>(), 0..128)) {
        let (tokens, _) = tokenize_utf16(&units, 1, 0);
        check_stream(&tokens);
    }

    #[test]
    fn prop_css_like_text_terminates(source in r#"[a-z0-9 \n"'()\\/*#@.,:;{}<>!-]{0,128}"#) {
        let (tokens, errors) = tokenize(&source, 1, 0);
        check_stream(&tokens);
        prop_assert!(errors.len() <= source.len());
    }

    #[test]
    fn prop_round_trip(source in plain_css()) {
        let (tokens, errors) = tokenize(&source, 1, 0);
        prop_assume!(errors.is_empty());

        let (again, errors) = tokenize(&to_source_all(&tokens), 1, 0);
        prop_assert!(errors.is_empty());
        let kinds = |tokens: &[Token]| tokens.iter().map(|t| t.kind.clone()).collect::<Vec<TokenKind>>();
        prop_assert_eq!(kinds(&tokens), kinds(&again));
    }

    #[test]
    fn prop_whitespace_collapses(words in prop::collection::vec("[a-z]{1,8}", 1..8), gaps in prop::collection::vec("[ \t\n]{1,4}", 8)) {
        let mut source = String::new();
        for (word, gap) in words.iter().zip(gaps.iter()) {
            source.push_str(word);
            source.push_str(gap);
        }
        let (tokens, _) = tokenize(&source, 1, 0);
        prop_assert_eq!(tokens.len(), words.len() * 2 + 1);
        prop_assert!(tokens.windows(2).all(|w| !(w[0].kind.is_whitespace() && w[1].kind.is_whitespace())));
    }
}
