//! Contest exchange numbering

/// Source of the exchange sent to the other station
pub trait ExchangeSequence: Send {
    /// Current exchange
    fn get(&self) -> String;

    /// Advance after a logged contact. Returns `false` when the exchange is
    /// fixed and did not change.
    fn next(&mut self) -> bool;
}

/// `prefix` + serial number + `suffix`
///
/// The serial number keeps the width of the configured infix, so an infix
/// of `001` counts `001`, `002`, ... `999`, `1000`. A non-numeric or empty
/// infix never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialExchange {
    prefix: String,
    infix: Infix,
    suffix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Infix {
    Serial { number: u64, width: usize },
    Fixed(String),
}

impl SerialExchange {
    pub fn new(prefix: &str, infix: &str, suffix: &str) -> Self {
        let infix = if !infix.is_empty() && infix.bytes().all(|b| b.is_ascii_digit()) {
            match infix.parse() {
                Ok(number) => Infix::Serial {
                    number,
                    width: infix.len(),
                },
                Err(_) => Infix::Fixed(infix.to_string()),
            }
        } else {
            Infix::Fixed(infix.to_string())
        };

        Self {
            prefix: prefix.to_string(),
            infix,
            suffix: suffix.to_string(),
        }
    }

    /// Whether all parts are empty
    pub fn is_empty(&self) -> bool {
        self.get().is_empty()
    }
}

impl ExchangeSequence for SerialExchange {
    fn get(&self) -> String {
        let infix = match &self.infix {
            Infix::Serial { number, width } => format!("{:0width$}", number, width = *width),
            Infix::Fixed(s) => s.clone(),
        };
        format!("{}{}{}", self.prefix, infix, self.suffix)
    }

    fn next(&mut self) -> bool {
        match &mut self.infix {
            Infix::Serial { number, .. } => match number.checked_add(1) {
                Some(n) => {
                    *number = n;
                    true
                }
                None => false,
            },
            Infix::Fixed(_) => false,
        }
    }
}
