//! Morse keyer
//!
//! Text is translated to Morse and expanded into a queue of
//! `(delay in dot units, edge)` steps. The keyer timer is armed for the
//! head's delay; when it fires the head is popped, its edge (if any) is
//! put on the [`KeyLine`], and the timer is armed for the new head.
//!
//! | Element               | Steps                          |
//! |-----------------------|--------------------------------|
//! | dash                  | `(0, down) (3, up) (1, none)`  |
//! | dot                   | `(0, down) (1, up) (1, none)`  |
//! | gap between characters| `(2, none)`                    |
//!
//! A word space is a space character, which adds three more gaps, giving
//! the usual seven units between words.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::error::{Result, UserError};
use crate::timer::Timer;

/// Slowest supported speed
pub const MIN_WPM: u32 = 1;

/// Fastest supported speed
pub const MAX_WPM: u32 = 100;

/// Key state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyEdge {
    Down,
    Up,
}

/// Output that keys the transmitter
pub trait KeyLine: Send {
    fn key_down(&mut self) -> Result<()>;
    fn key_up(&mut self) -> Result<()>;

    fn apply(&mut self, edge: KeyEdge) -> Result<()> {
        match edge {
            KeyEdge::Down => self.key_down(),
            KeyEdge::Up => self.key_up(),
        }
    }
}

/// One scheduled step: wait `units` dot lengths, then emit `edge`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStep {
    pub units: u32,
    pub edge: Option<KeyEdge>,
}

impl KeyStep {
    const fn new(units: u32, edge: Option<KeyEdge>) -> Self {
        Self { units, edge }
    }
}

const DOT: [KeyStep; 3] = [
    KeyStep::new(0, Some(KeyEdge::Down)),
    KeyStep::new(1, Some(KeyEdge::Up)),
    KeyStep::new(1, None),
];

const DASH: [KeyStep; 3] = [
    KeyStep::new(0, Some(KeyEdge::Down)),
    KeyStep::new(3, Some(KeyEdge::Up)),
    KeyStep::new(1, None),
];

const CHAR_GAP: KeyStep = KeyStep::new(2, None);

/// Length of one dot at `wpm` (PARIS timing, `1200 / wpm` ms)
pub fn dot_duration(wpm: u32) -> Duration {
    Duration::from_micros(1_200_000 / u64::from(wpm.max(MIN_WPM)))
}

/// Morse pattern for a character, case-insensitive
fn morse_pattern(c: char) -> Option<&'static str> {
    let pattern = match c.to_ascii_lowercase() {
        ' ' => " ",
        'a' => ".-",
        'b' => "-...",
        'c' => "-.-.",
        'd' => "-..",
        'e' => ".",
        'f' => "..-.",
        'g' => "--.",
        'h' => "....",
        'i' => "..",
        'j' => ".---",
        'k' => "-.-",
        'l' => ".-..",
        'm' => "--",
        'n' => "-.",
        'o' => "---",
        'p' => ".--.",
        'q' => "--.-",
        'r' => ".-.",
        's' => "...",
        't' => "-",
        'u' => "..-",
        'v' => "...-",
        'w' => ".--",
        'x' => "-..-",
        'y' => "-.--",
        'z' => "--..",
        '1' => ".----",
        '2' => "..---",
        '3' => "...--",
        '4' => "....-",
        '5' => ".....",
        '6' => "-....",
        '7' => "--...",
        '8' => "---..",
        '9' => "----.",
        '0' => "-----",
        ',' => "..-..",
        '.' => ".-.-.-",
        '?' => "..--..",
        ';' => "-.-.-",
        ':' => "---...",
        '/' => "-..-.",
        '+' => ".-.-.",
        '-' => "-....-",
        '=' => "-...-",
        _ => return None,
    };
    Some(pattern)
}

/// Translate text to a Morse string of `.`, `-` and spaces.
///
/// Characters are separated by one space; unsupported characters are
/// skipped.
pub fn to_morse(text: &str) -> String {
    let mut morse = String::new();
    for c in text.chars() {
        let Some(pattern) = morse_pattern(c) else {
            debug!("keyer skipping unsupported character {:?}", c);
            continue;
        };
        if !morse.is_empty() {
            morse.push(' ');
        }
        morse.push_str(pattern);
    }
    morse
}

/// Timer-driven Morse keyer
pub struct KeyerScheduler {
    wpm: u32,
    pending: VecDeque<KeyStep>,
    timer: Timer,
    line: Box<dyn KeyLine>,
}

impl KeyerScheduler {
    /// Create an idle keyer. Must be called inside a tokio runtime.
    pub fn new(wpm: u32, line: Box<dyn KeyLine>) -> std::result::Result<Self, UserError> {
        if !(MIN_WPM..=MAX_WPM).contains(&wpm) {
            return Err(UserError::InvalidWpm(wpm));
        }
        Ok(Self {
            wpm,
            pending: VecDeque::new(),
            timer: Timer::new(dot_duration(wpm)),
            line,
        })
    }

    pub fn wpm(&self) -> u32 {
        self.wpm
    }

    pub fn wpm_up(&mut self) -> u32 {
        self.wpm = (self.wpm + 1).min(MAX_WPM);
        self.wpm
    }

    pub fn wpm_down(&mut self) -> u32 {
        self.wpm = self.wpm.saturating_sub(1).max(MIN_WPM);
        self.wpm
    }

    pub fn is_sending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Steps not yet emitted, head first
    pub fn pending(&self) -> impl Iterator<Item = KeyStep> + '_ {
        self.pending.iter().copied()
    }

    /// Queue `text` for sending.
    ///
    /// Text queued while already sending is appended without disturbing
    /// the element in progress.
    pub fn send(&mut self, text: &str) -> std::result::Result<(), UserError> {
        if text.is_empty() {
            return Err(UserError::EmptyText);
        }
        let morse = to_morse(text);
        if morse.trim().is_empty() {
            return Err(UserError::NothingSendable(text.to_string()));
        }

        let was_idle = self.pending.is_empty();
        for symbol in morse.chars() {
            match symbol {
                '.' => self.pending.extend(DOT),
                '-' => self.pending.extend(DASH),
                _ => self.pending.push_back(CHAR_GAP),
            }
        }
        debug!("keyer queued {:?} as {:?}", text, morse);

        if was_idle {
            self.schedule_head();
        }
        Ok(())
    }

    /// Drop everything queued and release the key at once
    pub fn abort(&mut self) {
        self.pending.clear();
        self.pending.push_back(KeyStep::new(0, Some(KeyEdge::Up)));
        self.schedule_head();
    }

    /// Wait for the keyer timer
    pub async fn fired(&mut self) -> Result<()> {
        self.timer.fired().await
    }

    /// Handle a keyer timer firing: emit the head step and arm for the next
    pub fn advance(&mut self) -> Result<Option<KeyEdge>> {
        let Some(step) = self.pending.pop_front() else {
            warn!("keyer timer fired with nothing queued");
            return Ok(None);
        };
        if let Some(edge) = step.edge {
            trace!("key {:?}", edge);
            self.line.apply(edge)?;
        }
        if !self.pending.is_empty() {
            self.schedule_head();
        }
        Ok(step.edge)
    }

    /// Arm for the head step at the current speed
    fn schedule_head(&mut self) {
        if let Some(step) = self.pending.front() {
            self.timer.arm(dot_duration(self.wpm) * step.units);
        }
    }
}

impl Drop for KeyerScheduler {
    fn drop(&mut self) {
        if let Err(e) = self.line.key_up() {
            warn!("could not release key on shutdown: {}", e);
        }
    }
}

impl std::fmt::Debug for KeyerScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyerScheduler")
            .field("wpm", &self.wpm)
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// Key line that does nothing, for running without a PTT port
#[derive(Debug, Default)]
pub struct NullKeyLine;

impl KeyLine for NullKeyLine {
    fn key_down(&mut self) -> Result<()> {
        Ok(())
    }

    fn key_up(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tokio::time::Instant;

    use super::*;

    #[derive(Clone, Default)]
    struct RecordingLine {
        edges: Arc<Mutex<Vec<(Instant, KeyEdge)>>>,
    }

    impl KeyLine for RecordingLine {
        fn key_down(&mut self) -> Result<()> {
            self.edges.lock().unwrap().push((Instant::now(), KeyEdge::Down));
            Ok(())
        }

        fn key_up(&mut self) -> Result<()> {
            self.edges.lock().unwrap().push((Instant::now(), KeyEdge::Up));
            Ok(())
        }
    }

    fn new_keyer(wpm: u32) -> (KeyerScheduler, RecordingLine) {
        let line = RecordingLine::default();
        (KeyerScheduler::new(wpm, Box::new(line.clone())).unwrap(), line)
    }

    async fn drain(keyer: &mut KeyerScheduler) {
        while keyer.is_sending() {
            keyer.fired().await.unwrap();
            keyer.advance().unwrap();
        }
    }

    #[test]
    fn test_to_morse() {
        assert_eq!(to_morse("e"), ".");
        assert_eq!(to_morse("CQ"), "-.-. --.-");
        assert_eq!(to_morse("e e"), ".   .");
        assert_eq!(to_morse("5nn"), "..... -. -.");
        assert_eq!(to_morse("a#b"), ".- -...");
        assert_eq!(to_morse("#"), "");
    }

    #[test]
    fn test_dot_duration() {
        assert_eq!(dot_duration(25), Duration::from_millis(48));
        assert_eq!(dot_duration(20), Duration::from_millis(60));
        assert_eq!(dot_duration(1), Duration::from_millis(1200));
    }

    #[tokio::test]
    async fn test_single_dot_steps() {
        let (mut keyer, _line) = new_keyer(25);
        keyer.send("e").unwrap();
        assert_eq!(
            keyer.pending().collect::<Vec<_>>(),
            vec![
                KeyStep::new(0, Some(KeyEdge::Down)),
                KeyStep::new(1, Some(KeyEdge::Up)),
                KeyStep::new(1, None),
            ]
        );
    }

    #[tokio::test]
    async fn test_dash_and_gap_steps() {
        let (mut keyer, _line) = new_keyer(25);
        keyer.send("te").unwrap();
        let units: Vec<u32> = keyer.pending().map(|s| s.units).collect();
        assert_eq!(units, vec![0, 3, 1, 2, 0, 1, 1]);
    }

    #[tokio::test]
    async fn test_rejects_empty_and_unsendable() {
        let (mut keyer, _line) = new_keyer(25);
        assert_eq!(keyer.send(""), Err(UserError::EmptyText));
        assert!(matches!(keyer.send("##"), Err(UserError::NothingSendable(_))));
        assert!(!keyer.is_sending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timing_of_letter_a() {
        let (mut keyer, line) = new_keyer(25);
        let start = Instant::now();
        keyer.send("a").unwrap();
        drain(&mut keyer).await;

        let edges: Vec<(Duration, KeyEdge)> = line
            .edges
            .lock()
            .unwrap()
            .iter()
            .map(|(at, edge)| (*at - start, *edge))
            .collect();
        let ms = Duration::from_millis;
        assert_eq!(
            edges,
            vec![
                (ms(0), KeyEdge::Down),
                (ms(48), KeyEdge::Up),
                (ms(96), KeyEdge::Down),
                (ms(240), KeyEdge::Up),
            ]
        );
        assert_eq!(start.elapsed(), ms(288));
    }

    #[tokio::test(start_paused = true)]
    async fn test_speed_change_applies_to_next_wait() {
        let (mut keyer, line) = new_keyer(20);
        let start = Instant::now();
        keyer.send("e").unwrap();

        keyer.fired().await.unwrap();
        keyer.advance().unwrap(); // key down, next wait armed at 20 WPM
        keyer.wpm_up();
        keyer.fired().await.unwrap();
        keyer.advance().unwrap(); // key up after 60 ms
        keyer.fired().await.unwrap();
        keyer.advance().unwrap();

        let edges = line.edges.lock().unwrap();
        assert_eq!(edges[1].0 - start, Duration::from_millis(60));
        assert!(!keyer.is_sending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_releases_key() {
        let (mut keyer, line) = new_keyer(25);
        keyer.send("test").unwrap();
        keyer.fired().await.unwrap();
        assert_eq!(keyer.advance().unwrap(), Some(KeyEdge::Down));

        keyer.abort();
        assert_eq!(
            keyer.pending().collect::<Vec<_>>(),
            vec![KeyStep::new(0, Some(KeyEdge::Up))]
        );
        drain(&mut keyer).await;

        let edges = line.edges.lock().unwrap();
        assert_eq!(edges.last().map(|(_, e)| *e), Some(KeyEdge::Up));
        assert!(!keyer.is_sending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_when_idle_still_releases() {
        let (mut keyer, line) = new_keyer(25);
        keyer.abort();
        drain(&mut keyer).await;
        assert_eq!(line.edges.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_while_sending_appends() {
        let (mut keyer, line) = new_keyer(25);
        let start = Instant::now();
        keyer.send("e").unwrap();
        keyer.fired().await.unwrap();
        keyer.advance().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        keyer.send("e").unwrap();
        drain(&mut keyer).await;

        let edges = line.edges.lock().unwrap();
        // first element keeps its timing
        assert_eq!(edges[1].0 - start, Duration::from_millis(48));
        assert_eq!(edges.len(), 4);
    }

    #[tokio::test]
    async fn test_wpm_bounds() {
        let (mut keyer, _line) = new_keyer(100);
        assert_eq!(keyer.wpm_up(), 100);
        let (mut keyer, _line) = new_keyer(1);
        assert_eq!(keyer.wpm_down(), 1);
        assert_eq!(keyer.wpm_up(), 2);
        assert!(matches!(
            KeyerScheduler::new(0, Box::new(NullKeyLine)),
            Err(UserError::InvalidWpm(0))
        ));
        assert!(KeyerScheduler::new(101, Box::new(NullKeyLine)).is_err());
    }
}
