// Quote-aware field splitting plus the running column width used to square up ragged rows.
pub const DEFAULT_DELIMITER: char = ',';
pub const QUOTE: char = '"';

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    Normal,
    InQuotedField,
    /// A quote seen inside a quoted field: either its end or the first half of `""`.
    SawClosingQuote,
}

/// Splits one line into fields.
///
/// Fields are trimmed. A quoted field may contain the delimiter, and `""`
/// inside it stands for one literal quote. An empty buffer at end of input
/// emits nothing, so `a,b,` yields two fields rather than three.
pub fn tokenize(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut state = State::Normal;

    for ch in line.chars() {
        if ch == QUOTE {
            state = match state {
                State::Normal => State::InQuotedField,
                State::InQuotedField => State::SawClosingQuote,
                State::SawClosingQuote => {
                    field.push(QUOTE);
                    State::InQuotedField
                }
            };
        } else if ch == delimiter && state != State::InQuotedField {
            fields.push(field.trim().to_string());
            field.clear();
            state = State::Normal;
        } else {
            field.push(ch);
        }
    }

    if !field.is_empty() {
        fields.push(field.trim().to_string());
    }
    fields
}

/// Running maximum field count; never decreases.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ColumnWidth(usize);

impl ColumnWidth {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn get(&self) -> usize {
        self.0
    }

    /// Widens to fit `fields`, or pads `fields` with empty strings up to the current width.
    pub fn normalize(&mut self, fields: &mut Vec<String>) {
        if fields.len() > self.0 {
            self.0 = fields.len();
        } else {
            fields.resize(self.0, String::new());
        }
    }
}
