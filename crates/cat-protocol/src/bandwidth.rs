//! Receive filter width table
//!
//! The radio reports and accepts filter width as a two digit index
//! (`SH0nn;`). A [`WidthTable`] maps those indices to widths in Hz and
//! steps between neighbouring entries.

use crate::command::Direction;

/// FT-891 SSB widths, index 1 upwards (index 0 selects the menu default and is never reported)
const FT891_SSB_WIDTHS_HZ: [u32; 21] = [
    200, 400, 600, 850, 1100, 1350, 1500, 1650, 1800, 1950, 2100, 2200, 2300, 2400, 2500, 2600,
    2700, 2800, 2900, 3000, 3200,
];

/// Ordered table of selectable filter widths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidthTable {
    /// Width for wire index `first_index + i`, strictly increasing
    widths_hz: Vec<u32>,
    first_index: u8,
}

impl WidthTable {
    /// Build a table from strictly increasing widths starting at `first_index`.
    ///
    /// Returns `None` when the widths are empty, unsorted, or would need
    /// an index above 99.
    pub fn new(first_index: u8, widths_hz: Vec<u32>) -> Option<Self> {
        let sorted = widths_hz.windows(2).all(|w| w[0] < w[1]);
        let fits = (first_index as usize + widths_hz.len()) <= 100;
        if widths_hz.is_empty() || !sorted || !fits {
            return None;
        }
        Some(Self {
            widths_hz,
            first_index,
        })
    }

    /// SSB widths of the FT-891
    pub fn ft891_ssb() -> Self {
        Self {
            widths_hz: FT891_SSB_WIDTHS_HZ.to_vec(),
            first_index: 1,
        }
    }

    /// Width in Hz for a wire index
    pub fn hz_for_index(&self, index: u8) -> Option<u32> {
        let offset = index.checked_sub(self.first_index)?;
        self.widths_hz.get(offset as usize).copied()
    }

    /// Wire index for an exact width
    pub fn index_for_hz(&self, hz: u32) -> Option<u8> {
        self.widths_hz
            .iter()
            .position(|&w| w == hz)
            .map(|i| self.first_index + i as u8)
    }

    /// Neighbouring width in the requested direction, saturating at either end.
    ///
    /// A width not present in the table snaps to the nearest entry on the
    /// requested side.
    pub fn step(&self, hz: u32, direction: Direction) -> u32 {
        let last = self.widths_hz.len() - 1;
        match direction {
            Direction::Wider => self
                .widths_hz
                .iter()
                .copied()
                .find(|&w| w > hz)
                .unwrap_or(self.widths_hz[last]),
            Direction::Narrower => self
                .widths_hz
                .iter()
                .rev()
                .copied()
                .find(|&w| w < hz)
                .unwrap_or(self.widths_hz[0]),
        }
    }

    pub fn narrowest(&self) -> u32 {
        self.widths_hz[0]
    }

    pub fn widest(&self) -> u32 {
        self.widths_hz[self.widths_hz.len() - 1]
    }
}

impl Default for WidthTable {
    fn default() -> Self {
        Self::ft891_ssb()
    }
}
