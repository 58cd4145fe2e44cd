// Interpreter alphabet.
//
// The expanded grammar string is tokenized once into an immutable
// `Vec<Symbol>`; the interpreter then walks it with an integer cursor. Any
// character outside the interpreter's vocabulary (including leftover
// nonterminals such as `S`) becomes `Symbol::Other` and is skipped.

use crate::geometry::Axis;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Symbol {
    /// `H` or `V`.
    Split(Axis),
    /// `F`.
    Fill,
    /// `[`.
    Open,
    /// `]`.
    Close,
    Other(char),
}

impl Symbol {
    pub fn from_char(c: char) -> Self {
        match c {
            'H' => Symbol::Split(Axis::Horizontal),
            'V' => Symbol::Split(Axis::Vertical),
            'F' => Symbol::Fill,
            '[' => Symbol::Open,
            ']' => Symbol::Close,
            other => Symbol::Other(other),
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Symbol::Split(Axis::Horizontal) => 'H',
            Symbol::Split(Axis::Vertical) => 'V',
            Symbol::Fill => 'F',
            Symbol::Open => '[',
            Symbol::Close => ']',
            Symbol::Other(c) => *c,
        }
    }
}

pub fn tokenize(s: &str) -> Vec<Symbol> {
    s.chars().map(Symbol::from_char).collect()
}

/// Cursor position just past the node starting at `cursor`.
///
/// A split skips itself plus up to two bracketed child groups; a stray `[`
/// skips its whole group; anything else skips one symbol. Unmatched
/// brackets run to the end of input. Used when a node terminates
/// degenerately, so its parent resumes at a well-formed position.
pub fn skip_node(symbols: &[Symbol], cursor: usize) -> usize {
    match symbols.get(cursor) {
        None => cursor,
        Some(Symbol::Split(_)) => {
            let mut next = cursor + 1;
            for _ in 0..2 {
                if symbols.get(next) == Some(&Symbol::Open) {
                    next = skip_group(symbols, next);
                }
            }
            next
        }
        Some(Symbol::Open) => skip_group(symbols, cursor),
        Some(_) => cursor + 1,
    }
}

/// Position after the `]` matching the `[` at `open`.
fn skip_group(symbols: &[Symbol], open: usize) -> usize {
    let mut depth = 0usize;
    for (i, symbol) in symbols.iter().enumerate().skip(open) {
        match symbol {
            Symbol::Open => depth += 1,
            Symbol::Close => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
    }
    symbols.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(symbols: &[Symbol]) -> String {
        symbols.iter().map(Symbol::as_char).collect()
    }

    #[test]
    fn tokenize_roundtrips_through_chars() {
        let text = "H[F][V[S][F]]x";
        let symbols = tokenize(text);
        assert_eq!(symbols[0], Symbol::Split(Axis::Horizontal));
        assert_eq!(symbols[8], Symbol::Other('S'));
        assert_eq!(render(&symbols), text);
    }

    #[test]
    fn skip_node_consumes_split_with_children() {
        let symbols = tokenize("H[F][V[F][F]]]F");
        assert_eq!(skip_node(&symbols, 0), 13);
        assert_eq!(symbols[13], Symbol::Close);
    }

    #[test]
    fn skip_node_single_symbols() {
        let symbols = tokenize("F]S");
        assert_eq!(skip_node(&symbols, 0), 1);
        assert_eq!(skip_node(&symbols, 1), 2);
        assert_eq!(skip_node(&symbols, 2), 3);
        assert_eq!(skip_node(&symbols, 3), 3);
    }

    #[test]
    fn skip_node_split_without_children() {
        let symbols = tokenize("VF");
        assert_eq!(skip_node(&symbols, 0), 1);
    }

    #[test]
    fn skip_node_unmatched_bracket_runs_to_end() {
        let symbols = tokenize("H[F[F]");
        assert_eq!(skip_node(&symbols, 0), symbols.len());
    }
}
