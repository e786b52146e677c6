use crate::diagnostic::Diagnostic;
use crate::lexeme::Lexeme;
use crate::span::{Span, Spanned};

pub struct Lexer<'src> {
    source: &'src [u8],
    pos: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
        }
    }

    /// Tokenize the whole source. The returned sequence always ends with
    /// `Eof`. Stops at the first unrecognized character.
    pub fn tokenize(mut self) -> Result<Vec<Spanned<Lexeme>>, Diagnostic> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.node == Lexeme::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Spanned<Lexeme>, Diagnostic> {
        self.skip_whitespace_and_comments();

        if self.pos >= self.source.len() {
            return Ok(self.make_token(Lexeme::Eof, self.pos, self.pos));
        }

        let ch = self.source[self.pos];

        if is_ident_start(ch) {
            return Ok(self.scan_ident_or_keyword());
        }

        if ch.is_ascii_digit() {
            return self.scan_number();
        }

        if ch == b'"' {
            return self.scan_string();
        }

        self.scan_symbol()
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }

            // Line comments are discarded
            if self.pos + 1 < self.source.len()
                && self.source[self.pos] == b'/'
                && self.source[self.pos + 1] == b'/'
            {
                while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }

            break;
        }
    }

    fn scan_ident_or_keyword(&mut self) -> Spanned<Lexeme> {
        let start = self.pos;
        while self.pos < self.source.len() && is_ident_continue(self.source[self.pos]) {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or_default();
        let token = Lexeme::from_keyword(text).unwrap_or_else(|| Lexeme::Ident(text.to_string()));
        self.make_token(token, start, self.pos)
    }

    fn scan_number(&mut self) -> Result<Spanned<Lexeme>, Diagnostic> {
        let start = self.pos;
        while self.pos < self.source.len() && self.source[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or_default();
        match text.parse::<i64>() {
            Ok(n) => Ok(self.make_token(Lexeme::Integer(n), start, self.pos)),
            Err(_) => Err(Diagnostic::lexical(
                format!("integer literal '{}' is too large", text),
                Span::new(start as u32, self.pos as u32),
            )
            .with_help(format!("maximum integer value is {}", i64::MAX))),
        }
    }

    /// Scan a double-quoted string literal. The delivered text has the
    /// quotes stripped; newlines and embedded quotes are not allowed.
    fn scan_string(&mut self) -> Result<Spanned<Lexeme>, Diagnostic> {
        let start = self.pos;
        self.pos += 1; // skip opening '"'
        let body_start = self.pos;
        while self.pos < self.source.len()
            && self.source[self.pos] != b'"'
            && self.source[self.pos] != b'\n'
        {
            self.pos += 1;
        }
        if self.pos >= self.source.len() || self.source[self.pos] == b'\n' {
            return Err(Diagnostic::lexical(
                "unterminated string literal".to_string(),
                Span::new(start as u32, self.pos as u32),
            )
            .with_help("string literals may not span lines".to_string()));
        }
        let text = std::str::from_utf8(&self.source[body_start..self.pos])
            .unwrap_or_default()
            .to_string();
        self.pos += 1; // skip closing '"'
        Ok(self.make_token(Lexeme::Str(text), start, self.pos))
    }

    fn scan_symbol(&mut self) -> Result<Spanned<Lexeme>, Diagnostic> {
        let start = self.pos;
        let ch = self.source[self.pos];
        self.pos += 1;

        let token = match ch {
            b'(' => Lexeme::LParen,
            b')' => Lexeme::RParen,
            b'{' => Lexeme::LBrace,
            b'}' => Lexeme::RBrace,
            b',' => Lexeme::Comma,
            b';' => Lexeme::Semicolon,
            b'+' => Lexeme::Plus,
            b'-' => Lexeme::Minus,
            b'*' => Lexeme::Star,
            b'/' => Lexeme::Slash,
            b'=' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    Lexeme::EqEq
                } else {
                    Lexeme::Assign
                }
            }
            b'!' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    Lexeme::NotEq
                } else {
                    return Err(Diagnostic::lexical(
                        "unexpected '!'".to_string(),
                        Span::new(start as u32, self.pos as u32),
                    )
                    .with_help("the only operator starting with '!' is '!='".to_string()));
                }
            }
            b'<' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    Lexeme::LtEq
                } else {
                    Lexeme::Lt
                }
            }
            b'>' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    Lexeme::GtEq
                } else {
                    Lexeme::Gt
                }
            }
            _ => {
                return Err(Diagnostic::lexical(
                    format!("unexpected character '{}' (U+{:04X})", ch as char, ch),
                    Span::new(start as u32, self.pos as u32),
                ));
            }
        };

        Ok(self.make_token(token, start, self.pos))
    }

    fn peek(&self) -> Option<u8> {
        if self.pos < self.source.len() {
            Some(self.source[self.pos])
        } else {
            None
        }
    }

    fn make_token(&self, token: Lexeme, start: usize, end: usize) -> Spanned<Lexeme> {
        Spanned::new(token, Span::new(start as u32, end as u32))
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Lexeme> {
        Lexer::new(source)
            .tokenize()
            .expect("lexing should succeed")
            .into_iter()
            .map(|t| t.node)
            .collect()
    }

    #[test]
    fn test_empty_source_yields_eof() {
        assert_eq!(lex(""), vec![Lexeme::Eof]);
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let toks = lex("int main intx return0");
        assert_eq!(
            toks,
            vec![
                Lexeme::Int,
                Lexeme::Ident("main".to_string()),
                Lexeme::Ident("intx".to_string()),
                Lexeme::Ident("return0".to_string()),
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_operators_longest_match() {
        let toks = lex("= == != < <= > >= + - * /");
        assert_eq!(
            toks,
            vec![
                Lexeme::Assign,
                Lexeme::EqEq,
                Lexeme::NotEq,
                Lexeme::Lt,
                Lexeme::LtEq,
                Lexeme::Gt,
                Lexeme::GtEq,
                Lexeme::Plus,
                Lexeme::Minus,
                Lexeme::Star,
                Lexeme::Slash,
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_adjacent_comparison_tokens() {
        // '<==' must lex as '<=' then '='
        assert_eq!(
            lex("<=="),
            vec![Lexeme::LtEq, Lexeme::Assign, Lexeme::Eof]
        );
    }

    #[test]
    fn test_string_literal_strips_quotes() {
        assert_eq!(
            lex(r#"print("hello")"#),
            vec![
                Lexeme::Print,
                Lexeme::LParen,
                Lexeme::Str("hello".to_string()),
                Lexeme::RParen,
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_discarded() {
        let toks = lex("int x; // trailing comment\n// full line\nx = 1;");
        assert_eq!(
            toks,
            vec![
                Lexeme::Int,
                Lexeme::Ident("x".to_string()),
                Lexeme::Semicolon,
                Lexeme::Ident("x".to_string()),
                Lexeme::Assign,
                Lexeme::Integer(1),
                Lexeme::Semicolon,
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string_is_fatal() {
        let err = Lexer::new("\"oops\nint x;").tokenize().unwrap_err();
        assert!(err.message.contains("unterminated string"));
    }

    #[test]
    fn test_unexpected_character_is_fatal() {
        let err = Lexer::new("int x = 1 @ 2;").tokenize().unwrap_err();
        assert!(err.message.contains("unexpected character '@'"));
        assert_eq!(err.span.start, 10);
    }

    #[test]
    fn test_bare_bang_is_fatal() {
        let err = Lexer::new("if (!x) {}").tokenize().unwrap_err();
        assert!(err.message.contains("unexpected '!'"));
    }

    #[test]
    fn test_integer_overflow_is_fatal() {
        let err = Lexer::new("int x = 99999999999999999999;").tokenize().unwrap_err();
        assert!(err.message.contains("too large"));
    }

    #[test]
    fn test_spans_cover_token_text() {
        let toks = Lexer::new("while (i < 3)").tokenize().unwrap();
        assert_eq!(toks[0].span.start, 0);
        assert_eq!(toks[0].span.end, 5);
        let lt = &toks[3];
        assert_eq!(lt.node, Lexeme::Lt);
        assert_eq!(lt.span.start, 9);
        assert_eq!(lt.span.end, 10);
    }
}
