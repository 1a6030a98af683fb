//! Canned contest messages

use crate::error::UserError;

/// Number of presets, one per digit key
pub const PRESET_COUNT: usize = 10;

enum Template {
    Fixed(String),
    /// `{before}{exchange}`
    Exchange(&'static str),
}

/// The ten contest messages, bound to keys `1`..`9` and `0`
pub struct Presets {
    templates: Vec<Template>,
}

impl Presets {
    pub fn new(callsign: &str) -> Self {
        let callsign = callsign.to_uppercase();
        Self {
            templates: vec![
                Template::Fixed(format!("CQ {} TEST", callsign)),
                Template::Fixed(callsign),
                Template::Exchange("5NN "),
                Template::Exchange("TU 5NN "),
                Template::Exchange(""),
                Template::Fixed("NR NR".into()),
                Template::Fixed("AGN".into()),
                Template::Fixed("QRS".into()),
                Template::Fixed("QRL?".into()),
                Template::Fixed("TU".into()),
            ],
        }
    }

    /// Text of the preset at `index` (0-based) with the exchange filled in
    pub fn get(&self, index: usize, exchange: &str) -> Option<String> {
        self.templates.get(index).map(|t| match t {
            Template::Fixed(s) => s.clone(),
            Template::Exchange(before) => format!("{before}{exchange}"),
        })
    }

    /// Text of the preset bound to digit `key`
    pub fn for_key(&self, key: u8, exchange: &str) -> Result<String, UserError> {
        key_to_index(key)
            .and_then(|i| self.get(i, exchange))
            .ok_or(UserError::UnknownPreset(key))
    }

    /// All presets as `(key, text)` pairs, in key order `1`..`9`, `0`
    pub fn list(&self, exchange: &str) -> Vec<(u8, String)> {
        (0..self.templates.len())
            .filter_map(|i| Some((index_to_key(i), self.get(i, exchange)?)))
            .collect()
    }
}

/// Key `0` selects the tenth preset
pub fn key_to_index(key: u8) -> Option<usize> {
    match key {
        0 => Some(9),
        1..=9 => Some(key as usize - 1),
        _ => None,
    }
}

fn index_to_key(index: usize) -> u8 {
    ((index + 1) % PRESET_COUNT) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_fill_exchange() {
        let presets = Presets::new("sq9xyz");
        assert_eq!(presets.for_key(1, "001").unwrap(), "CQ SQ9XYZ TEST");
        assert_eq!(presets.for_key(2, "001").unwrap(), "SQ9XYZ");
        assert_eq!(presets.for_key(3, "001").unwrap(), "5NN 001");
        assert_eq!(presets.for_key(4, "001").unwrap(), "TU 5NN 001");
        assert_eq!(presets.for_key(5, "001").unwrap(), "001");
        assert_eq!(presets.for_key(0, "001").unwrap(), "TU");
    }

    #[test]
    fn test_unknown_key() {
        let presets = Presets::new("N0CALL");
        assert_eq!(presets.for_key(10, ""), Err(UserError::UnknownPreset(10)));
    }

    #[test]
    fn test_list_order() {
        let presets = Presets::new("N0CALL");
        let keys: Vec<u8> = presets.list("1").into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 0]);
    }
}
