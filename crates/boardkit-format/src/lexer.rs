//! Token reader for the s-expression board grammar.
//!
//! The grammar is token based, not tree based: the parser pulls one token
//! at a time and each production routine consumes its own closing
//! parenthesis (or explicitly documents that its caller does). Keeping that
//! boundary exact is what keeps the token stream synchronized.

use crate::error::ParseError;

/// One lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tok {
    Left,
    Right,
    /// A bare symbol, number, or quoted string; text via [`Lexer::cur_text`].
    Sym,
    Eof,
}

pub struct Lexer<'a> {
    source_name: String,
    input: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
    /// Position of the current token, for error reporting.
    tok_line: u32,
    tok_col: u32,
    cur: Tok,
    buf: Vec<u8>,
    text: String,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, source_name: &str) -> Self {
        Self {
            source_name: source_name.to_string(),
            input: input.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
            tok_line: 1,
            tok_col: 1,
            cur: Tok::Eof,
            buf: Vec::new(),
            text: String::new(),
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Text of the current `Sym` token, unquoted.
    pub fn cur_text(&self) -> &str {
        &self.text
    }

    pub fn cur_tok(&self) -> Tok {
        self.cur
    }

    fn bump(&mut self) -> Option<u8> {
        let b = *self.input.get(self.pos)?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(b)
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// Advances to the next token.
    pub fn next_tok(&mut self) -> Result<Tok, ParseError> {
        self.skip_whitespace();
        self.tok_line = self.line;
        self.tok_col = self.col;
        self.buf.clear();
        self.text.clear();

        let Some(b) = self.peek() else {
            self.cur = Tok::Eof;
            return Ok(Tok::Eof);
        };

        self.cur = match b {
            b'(' => {
                self.bump();
                Tok::Left
            }
            b')' => {
                self.bump();
                Tok::Right
            }
            b'"' => {
                self.bump();
                loop {
                    match self.bump() {
                        Some(b'"') => break,
                        Some(b'\\') => {
                            if let Some(escaped) = self.bump() {
                                self.buf.push(escaped);
                            }
                        }
                        Some(c) => self.buf.push(c),
                        None => {
                            return Err(self.error("unterminated quoted string"));
                        }
                    }
                }
                self.decode_text()?;
                Tok::Sym
            }
            _ => {
                while let Some(c) = self.peek() {
                    if c.is_ascii_whitespace() || c == b'(' || c == b')' {
                        break;
                    }
                    self.buf.push(c);
                    self.bump();
                }
                self.decode_text()?;
                Tok::Sym
            }
        };
        Ok(self.cur)
    }

    /// Token text accumulates as raw bytes; the file is UTF-8, so the
    /// accumulated run must decode as a whole, not byte by byte.
    fn decode_text(&mut self) -> Result<(), ParseError> {
        match std::str::from_utf8(&self.buf) {
            Ok(s) => {
                self.text.push_str(s);
                Ok(())
            }
            Err(_) => Err(self.error("invalid UTF-8 in input")),
        }
    }

    /// Builds a parse error located at the current token.
    pub fn error(&self, message: &str) -> ParseError {
        ParseError {
            source_name: self.source_name.clone(),
            line: self.tok_line,
            column: self.tok_col,
            message: message.to_string(),
        }
    }

    /// Builds the standard "Expecting" error for an unexpected token.
    pub fn expecting(&self, alternatives: &str) -> ParseError {
        let found = match self.cur {
            Tok::Left => "(",
            Tok::Right => ")",
            Tok::Eof => "end of input",
            Tok::Sym => self.text.as_str(),
        };
        self.error(&format!("Expecting: {alternatives}, found \"{found}\""))
    }

    pub fn need_left(&mut self) -> Result<(), ParseError> {
        match self.next_tok()? {
            Tok::Left => Ok(()),
            _ => Err(self.expecting("(")),
        }
    }

    pub fn need_right(&mut self) -> Result<(), ParseError> {
        match self.next_tok()? {
            Tok::Right => Ok(()),
            _ => Err(self.expecting(")")),
        }
    }

    /// Advances and requires a symbol, number, or quoted string.
    pub fn need_sym(&mut self) -> Result<(), ParseError> {
        match self.next_tok()? {
            Tok::Sym => Ok(()),
            _ => Err(self.expecting("a symbol or number")),
        }
    }

    /// Skips tokens until the currently open list is balanced again. Used
    /// by the deliberately tolerant sections to step over unknown keys.
    /// The caller has just consumed the `(`; this consumes through the
    /// matching `)`.
    pub fn skip_balanced(&mut self) -> Result<(), ParseError> {
        let mut depth = 1u32;
        loop {
            match self.next_tok()? {
                Tok::Left => depth += 1,
                Tok::Right => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Tok::Sym => {}
                Tok::Eof => return Err(self.error("unexpected end of input inside a list")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(input: &str) -> Vec<(Tok, String)> {
        let mut lexer = Lexer::new(input, "test");
        let mut out = Vec::new();
        loop {
            let t = lexer.next_tok().unwrap();
            if t == Tok::Eof {
                break;
            }
            out.push((t, lexer.cur_text().to_string()));
        }
        out
    }

    #[test]
    fn basic_tokens() {
        let t = toks("(net 1 GND)");
        assert_eq!(t[0].0, Tok::Left);
        assert_eq!(t[1], (Tok::Sym, "net".to_string()));
        assert_eq!(t[2], (Tok::Sym, "1".to_string()));
        assert_eq!(t[3], (Tok::Sym, "GND".to_string()));
        assert_eq!(t[4].0, Tok::Right);
    }

    #[test]
    fn quoted_strings_with_spaces() {
        let t = toks("(title \"my board\")");
        assert_eq!(t[2], (Tok::Sym, "my board".to_string()));
    }

    #[test]
    fn quoted_empty_string() {
        let t = toks("(net 0 \"\")");
        assert_eq!(t[3], (Tok::Sym, String::new()));
    }

    #[test]
    fn multibyte_text_decodes_whole() {
        let t = toks("(title \"Плата управления\") (net 1 ШИНА_5В)");
        assert_eq!(t[2], (Tok::Sym, "Плата управления".to_string()));
        assert_eq!(t[7], (Tok::Sym, "ШИНА_5В".to_string()));
    }

    #[test]
    fn error_carries_position() {
        let mut lexer = Lexer::new("(net\n  !", "board.kicad_pcb");
        lexer.next_tok().unwrap();
        lexer.next_tok().unwrap();
        lexer.next_tok().unwrap();
        let err = lexer.expecting("(");
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 3);
        assert_eq!(err.source_name, "board.kicad_pcb");
    }

    #[test]
    fn skip_balanced_consumes_nested_lists() {
        let mut lexer = Lexer::new("(unknown (a (b c)) d) (next)", "test");
        assert_eq!(lexer.next_tok().unwrap(), Tok::Left);
        lexer.next_tok().unwrap(); // unknown
        lexer.skip_balanced().unwrap();
        assert_eq!(lexer.next_tok().unwrap(), Tok::Left);
        lexer.next_tok().unwrap();
        assert_eq!(lexer.cur_text(), "next");
    }
}
